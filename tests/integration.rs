//! Integration tests against a real browser.
//!
//! These tests require Chrome to be installed and available.
//! Run with: cargo test --test integration -- --ignored

use std::sync::Arc;

use eoka::Browser;
use formwright::browser::EokaSession;
use formwright::oracle::OfflineOracle;
use formwright::{ActionContext, ActionExecutor, ExecutorConfig, FormFrame, FrameProvider, Toolkit};

/// Check if Chrome is available
fn chrome_available() -> bool {
    eoka::stealth::patcher::find_chrome().is_ok()
}

async fn open(html: &str) -> (Browser, EokaSession) {
    let browser = Browser::launch().await.expect("Failed to launch browser");
    let page = browser
        .new_page("about:blank")
        .await
        .expect("Failed to create page");
    page.goto(&format!("data:text/html,{}", html))
        .await
        .expect("Failed to navigate");
    (browser, EokaSession::new(page))
}

fn executor(session: &EokaSession) -> ActionExecutor {
    let toolkit = Toolkit::new(
        Arc::new(session.clone()),
        Arc::new(OfflineOracle::default()),
    );
    ActionExecutor::new(toolkit, ExecutorConfig::default())
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_fill_text_and_select() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let (browser, session) = open(
        r#"
        <label for="first_name">First name</label>
        <input type="text" id="first_name">
        <label for="sponsor">Visa sponsorship</label>
        <select id="sponsor"><option>Select...</option><option>Yes</option><option>No</option></select>
        <label><input type="checkbox" id="terms"> I agree</label>
    "#,
    )
    .await;

    let plan = vec![
        ActionContext::new("#first_name", "Ada").with_field_type("text"),
        ActionContext::new("#sponsor", "no").with_field_type("select"),
        ActionContext::bare("#terms").with_field_type("checkbox"),
    ];
    let summary = executor(&session).execute_plan(&plan).await;
    assert_eq!(summary.filled, 3, "{}", summary);

    let frame = session.frame(None).await.expect("main frame");
    assert_eq!(
        frame.input_value("#first_name").await.unwrap().as_deref(),
        Some("Ada")
    );
    assert_eq!(
        frame.selected_text("#sponsor").await.unwrap().as_deref(),
        Some("No")
    );

    browser.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_describe_select() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let (browser, session) = open(
        r#"
        <label for="degree">Degree</label>
        <select id="degree"><option>Bachelor's</option><option>Master's</option></select>
    "#,
    )
    .await;

    let frame = session.main_frame();
    let element = frame
        .describe("#degree")
        .await
        .expect("describe")
        .expect("element exists");
    assert_eq!(element.widget_type, formwright::WidgetType::StandardSelect);
    assert_eq!(element.label_text, "Degree");
    assert_eq!(element.options, vec!["Bachelor's", "Master's"]);

    assert!(frame.describe("#nothing").await.unwrap().is_none());

    browser.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_missing_frame() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let (browser, session) = open("<input id=\"a\">").await;

    let err = session.frame(Some("no-such-frame")).await.err().expect("error");
    assert!(matches!(err, formwright::Error::FrameNotFound(_)), "{}", err);

    browser.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_hidden_file_input_upload() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let path = std::env::temp_dir().join("formwright-integration-resume.txt");
    tokio::fs::write(&path, b"resume").await.unwrap();

    let (browser, session) = open(
        r#"
        <input type="file" id="resume" style="display:none">
        <span id="picked"></span>
        <script>
            document.getElementById('resume').addEventListener('change', (e) => {
                document.getElementById('picked').textContent = e.target.files[0].name;
            });
        </script>
    "#,
    )
    .await;

    let ctx = ActionContext::new("#resume", path.to_string_lossy().to_string())
        .with_field_type("resume");
    let filled = executor(&session).execute_action(&ctx).await.expect("upload");
    assert_eq!(filled, Some(true));

    let frame = session.main_frame();
    assert_eq!(
        frame.text_content("#picked").await.unwrap().as_deref(),
        Some("formwright-integration-resume.txt")
    );

    let _ = tokio::fs::remove_file(&path).await;
    browser.close().await.expect("Failed to close browser");
}
