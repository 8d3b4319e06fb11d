//! Shared types used across labwatch.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The immutable input of a run: which sample to look up and its service date.
///
/// Both values are passed to the portal verbatim; no format is enforced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    sample_id: String,
    service_date: String,
}

impl LookupRequest {
    /// Create a lookup request.
    pub fn new(sample_id: impl Into<String>, service_date: impl Into<String>) -> Self {
        Self {
            sample_id: sample_id.into(),
            service_date: service_date.into(),
        }
    }

    /// Sample (requisition) identifier.
    #[must_use]
    pub fn sample_id(&self) -> &str {
        &self.sample_id
    }

    /// Date of service as typed into the portal form.
    #[must_use]
    pub fn service_date(&self) -> &str {
        &self.service_date
    }
}

impl fmt::Display for LookupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sample {} ({})", self.sample_id, self.service_date)
    }
}

/// What to do when the portal's result text matches none of the known phrases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnrecognizedPolicy {
    /// Stop polling and report the text for manual review
    #[default]
    Review,
    /// Treat the text as a completed result and capture evidence
    Complete,
    /// Keep polling as if the sample were still in progress
    Retry,
}

impl fmt::Display for UnrecognizedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Review => "review",
            Self::Complete => "complete",
            Self::Retry => "retry",
        };
        f.write_str(name)
    }
}

impl FromStr for UnrecognizedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "review" => Ok(Self::Review),
            "complete" => Ok(Self::Complete),
            "retry" => Ok(Self::Retry),
            other => Err(format!(
                "unknown policy '{other}', expected review, complete or retry"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_request_accessors() {
        let request = LookupRequest::new("ABC123", "2024-01-02");
        assert_eq!(request.sample_id(), "ABC123");
        assert_eq!(request.service_date(), "2024-01-02");
        assert_eq!(request.to_string(), "sample ABC123 (2024-01-02)");
    }

    #[test]
    fn test_lookup_request_is_verbatim() {
        let request = LookupRequest::new("  odd id ", "not a date");
        assert_eq!(request.sample_id(), "  odd id ");
        assert_eq!(request.service_date(), "not a date");
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("review".parse::<UnrecognizedPolicy>(), Ok(UnrecognizedPolicy::Review));
        assert_eq!(" Complete ".parse::<UnrecognizedPolicy>(), Ok(UnrecognizedPolicy::Complete));
        assert_eq!("RETRY".parse::<UnrecognizedPolicy>(), Ok(UnrecognizedPolicy::Retry));
        assert!("ignore".parse::<UnrecognizedPolicy>().is_err());
    }

    #[test]
    fn test_policy_default_is_review() {
        assert_eq!(UnrecognizedPolicy::default(), UnrecognizedPolicy::Review);
        assert_eq!(UnrecognizedPolicy::default().to_string(), "review");
    }
}
