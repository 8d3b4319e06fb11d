//! Result classification.
//!
//! The portal answers in free text. A result is classified by looking for
//! one of three known sentences, each rendered with the submitted sample
//! identifier, as a literal substring. The sentences are the only contract
//! with the portal's wording and live in [`PhraseConfig`].

use labwatch_core::{PhraseConfig, SAMPLE_ID_PLACEHOLDER};
use std::fmt;

/// Meaning of a result text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleStatus {
    /// The lab has not received the sample yet
    NotReceived,
    /// The sample is being tested
    InProgress,
    /// Testing is complete
    Complete,
    /// The text matched none of the known sentences
    Unrecognized,
}

impl SampleStatus {
    /// Short label used in log lines.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::NotReceived => "not_received",
            Self::InProgress => "in_progress",
            Self::Complete => "complete",
            Self::Unrecognized => "unrecognized",
        }
    }
}

impl fmt::Display for SampleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A classified result together with the text that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    status: SampleStatus,
    raw_text: String,
}

impl Outcome {
    /// Pair a status with its source text.
    pub fn new(status: SampleStatus, raw_text: impl Into<String>) -> Self {
        Self {
            status,
            raw_text: raw_text.into(),
        }
    }

    /// Classified status.
    #[must_use]
    pub fn status(&self) -> SampleStatus {
        self.status
    }

    /// Result text exactly as read from the portal.
    #[must_use]
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }
}

/// Maps portal result text to an [`Outcome`].
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    phrases: PhraseConfig,
}

impl Classifier {
    /// Classifier using the given phrase templates.
    #[must_use]
    pub fn new(phrases: PhraseConfig) -> Self {
        Self { phrases }
    }

    /// Classify `raw_text` for `sample_id`.
    ///
    /// Templates are checked in the order not received, in progress,
    /// complete; the first one found wins. Text containing none of them is
    /// [`SampleStatus::Unrecognized`].
    #[must_use]
    pub fn classify(&self, raw_text: &str, sample_id: &str) -> Outcome {
        let status = [
            SampleStatus::NotReceived,
            SampleStatus::InProgress,
            SampleStatus::Complete,
        ]
        .into_iter()
        .find(|status| {
            self.phrase(*status, sample_id)
                .is_some_and(|phrase| raw_text.contains(&phrase))
        })
        .unwrap_or(SampleStatus::Unrecognized);

        Outcome::new(status, raw_text)
    }

    /// Sentence the portal shows for `status`, rendered for `sample_id`.
    ///
    /// Returns `None` for [`SampleStatus::Unrecognized`], which has no sentence.
    #[must_use]
    pub fn phrase(&self, status: SampleStatus, sample_id: &str) -> Option<String> {
        let template = match status {
            SampleStatus::NotReceived => &self.phrases.not_received,
            SampleStatus::InProgress => &self.phrases.in_progress,
            SampleStatus::Complete => &self.phrases.complete,
            SampleStatus::Unrecognized => return None,
        };
        Some(template.replace(SAMPLE_ID_PLACEHOLDER, sample_id))
    }
}

/// Classify with the default portal sentences.
#[must_use]
pub fn classify(raw_text: &str, sample_id: &str) -> Outcome {
    Classifier::default().classify(raw_text, sample_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_received() {
        let outcome = classify(
            "Sample ABC123 has not been received at our laboratory",
            "ABC123",
        );
        assert_eq!(outcome.status(), SampleStatus::NotReceived);
    }

    #[test]
    fn test_in_progress() {
        let outcome = classify(
            "Sample ABC123 has been received and testing is in progress",
            "ABC123",
        );
        assert_eq!(outcome.status(), SampleStatus::InProgress);
    }

    #[test]
    fn test_complete() {
        let text = "Sample ABC123 was found and testing is complete. Enter the following as they appear on the requisition.";
        let outcome = classify(text, "ABC123");
        assert_eq!(outcome.status(), SampleStatus::Complete);
        assert_eq!(outcome.raw_text(), text);
    }

    #[test]
    fn test_phrase_embedded_in_surrounding_text() {
        let text = "Status\nSample ABC123 has been received and testing is in progress.\nCheck back later.";
        assert_eq!(classify(text, "ABC123").status(), SampleStatus::InProgress);
    }

    #[test]
    fn test_other_sample_id_is_unrecognized() {
        let outcome = classify(
            "Sample XYZ999 has not been received at our laboratory",
            "ABC123",
        );
        assert_eq!(outcome.status(), SampleStatus::Unrecognized);
    }

    #[test]
    fn test_unknown_text_is_unrecognized() {
        let outcome = classify("Service temporarily unavailable", "ABC123");
        assert_eq!(outcome.status(), SampleStatus::Unrecognized);
        assert_eq!(outcome.raw_text(), "Service temporarily unavailable");

        assert_eq!(classify("", "ABC123").status(), SampleStatus::Unrecognized);
    }

    #[test]
    fn test_matching_is_literal() {
        // The period in the complete sentence must not act as a wildcard
        let text = "Sample ABC123 was found and testing is completeX Enter the following as they appear on the requisition.";
        assert_eq!(classify(text, "ABC123").status(), SampleStatus::Unrecognized);
    }

    #[test]
    fn test_first_match_wins() {
        let text = "Sample ABC123 has not been received at our laboratory. \
                    Sample ABC123 has been received and testing is in progress";
        assert_eq!(classify(text, "ABC123").status(), SampleStatus::NotReceived);
    }

    #[test]
    fn test_classification_is_pure() {
        let classifier = Classifier::default();
        let text = "Sample ABC123 has been received and testing is in progress";
        assert_eq!(
            classifier.classify(text, "ABC123"),
            classifier.classify(text, "ABC123")
        );
    }

    #[test]
    fn test_custom_phrases() {
        let classifier = Classifier::new(PhraseConfig {
            not_received: "{sample_id}: pending".to_string(),
            in_progress: "{sample_id}: testing".to_string(),
            complete: "{sample_id}: done".to_string(),
        });
        assert_eq!(
            classifier.classify("Result - S1: done", "S1").status(),
            SampleStatus::Complete
        );
        assert_eq!(
            classifier.phrase(SampleStatus::NotReceived, "S1").as_deref(),
            Some("S1: pending")
        );
        assert_eq!(classifier.phrase(SampleStatus::Unrecognized, "S1"), None);
    }
}
