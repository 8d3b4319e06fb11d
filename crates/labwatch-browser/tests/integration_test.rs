use labwatch_browser::actions::BrowserActions;
use labwatch_browser::{BrowserEngine, BrowserError, LaunchOptions};
use std::time::Duration;

fn headless() -> LaunchOptions {
    LaunchOptions {
        headless: true,
        element_timeout: Duration::from_secs(2),
        ..LaunchOptions::default()
    }
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_browser_engine_creation() {
    let engine = BrowserEngine::launch(headless()).await;
    assert!(engine.is_ok(), "Failed to create browser engine");
    let mut engine = engine.unwrap();
    engine.close().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_navigation_and_text() {
    let mut engine = BrowserEngine::launch(headless()).await.unwrap();

    engine.navigate("https://example.com").await.unwrap();
    let heading = engine.extract_text("h1").await.unwrap();
    assert!(heading.contains("Example"));

    let png = engine.screenshot().await.unwrap();
    assert_eq!(&png[..4], b"\x89PNG");

    engine.close().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_missing_selector_times_out() {
    let mut engine = BrowserEngine::launch(headless()).await.unwrap();
    engine.navigate("https://example.com").await.unwrap();

    let result = engine.wait_for_selector("#does-not-exist", 500).await;
    assert!(matches!(result, Err(BrowserError::Timeout(_))));

    engine.close().await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Chrome/Chromium installed
async fn test_actions_after_close_fail() {
    let mut engine = BrowserEngine::launch(headless()).await.unwrap();
    engine.close().await.unwrap();
    // A second close is a no-op
    engine.close().await.unwrap();

    let result = engine.navigate("https://example.com").await;
    assert!(matches!(result, Err(BrowserError::SessionClosed)));

    // Waiting on a closed session is not reported as a timeout
    let result = engine.wait_for_selector("h1", 500).await;
    assert!(matches!(result, Err(BrowserError::SessionClosed)));
}
