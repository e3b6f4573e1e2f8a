//! End-to-end coverage against a real browser binary. Ignored by default:
//! this sandbox (and most CI) has no Chrome/Chromium to launch. Run with
//! `CHROBOT_TEST_BROWSER_PATH=/path/to/chromium cargo test -- --ignored`.

use chrobot::{Browser, BrowserConfig};

fn browser_path() -> Option<String> {
    std::env::var("CHROBOT_TEST_BROWSER_PATH").ok()
}

#[tokio::test]
#[ignore]
async fn launch_get_version_and_quit() {
    let path = browser_path().expect("CHROBOT_TEST_BROWSER_PATH must be set for this test");
    let config = BrowserConfig::builder().executable(path).build();

    let (browser, handle) = Browser::launch(config).await.expect("browser should launch");
    let driver = tokio::spawn(handle);

    let version = browser.get_version().await.expect("Browser.getVersion should succeed");
    assert!(!version.product.is_empty());

    browser.quit().await.expect("quit should resolve once the process exits");
    driver.await.expect("event loop task should not panic");
}

#[tokio::test]
#[ignore]
async fn navigation_events_fan_out_to_listeners() {
    let path = browser_path().expect("CHROBOT_TEST_BROWSER_PATH must be set for this test");
    let config = BrowserConfig::builder().executable(path).build();

    let (browser, handle) = Browser::launch(config).await.expect("browser should launch");
    tokio::spawn(handle);

    let mut events = browser
        .add_listener("Page.loadEventFired")
        .await
        .expect("add_listener should succeed while running");

    browser
        .call("Page.enable", None, None, std::time::Duration::from_secs(30))
        .await
        .expect("Page.enable should succeed");
    browser
        .call(
            "Page.navigate",
            Some(serde_json::json!({"url": "about:blank"})),
            None,
            std::time::Duration::from_secs(30),
        )
        .await
        .expect("Page.navigate should succeed");

    use futures::StreamExt;
    let event = tokio::time::timeout(std::time::Duration::from_secs(10), events.next())
        .await
        .expect("Page.loadEventFired should fire within the timeout")
        .expect("the listener channel should not be closed");
    assert!(event.is_object());

    browser.quit().await.expect("quit should resolve once the process exits");
}
