//! Element locator: frame resolution, selector sanitizing, visibility.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::frame::{FormFrame, FrameProvider};
use crate::Result;

/// Frame ids that refer to the top-level document.
const MAIN_FRAME_IDS: &[&str] = &["main", "main_frame", "top", "_top"];

/// Rewrite `#id` selectors whose id is not a valid CSS identifier into
/// attribute form, e.g. `#123` becomes `[id='123']`.
///
/// Anything else is returned unchanged, so sanitizing twice is a no-op.
pub fn sanitize_selector(selector: &str) -> String {
    let Some(id) = selector.trim().strip_prefix('#') else {
        return selector.to_string();
    };
    if id.is_empty() || !needs_attribute_form(id) {
        return selector.to_string();
    }
    let escaped = id.replace('\\', "\\\\").replace('\'', "\\'");
    format!("[id='{}']", escaped)
}

fn needs_attribute_form(id: &str) -> bool {
    let mut chars = id.chars();
    let first = chars.next();
    let starts_badly = match first {
        Some(c) if c.is_ascii_digit() => true,
        Some('-') => chars.next().is_some_and(|c| c.is_ascii_digit() || c == '-'),
        _ => false,
    };
    starts_badly
        || id
            .chars()
            .any(|c| c.is_ascii() && !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
}

/// Whether `frame_id` names the main document.
pub fn is_main_frame(frame_id: Option<&str>) -> bool {
    match frame_id.map(str::trim) {
        None | Some("") => true,
        Some(id) => MAIN_FRAME_IDS.iter().any(|m| m.eq_ignore_ascii_case(id)),
    }
}

/// Resolve a frame id. Main-document aliases map to `None`.
pub async fn resolve_frame(
    frames: &dyn FrameProvider,
    frame_id: Option<&str>,
) -> Result<Arc<dyn FormFrame>> {
    let id = if is_main_frame(frame_id) {
        None
    } else {
        frame_id.map(str::trim)
    };
    let frame = frames.frame(id).await?;
    debug!("Resolved frame '{}'", frame.name());
    Ok(frame)
}

/// Wait for the element to be visible and scroll it into view.
///
/// Never fails: any error or timeout is reported as `false`.
pub async fn ensure_visible(frame: &dyn FormFrame, selector: &str, timeout_ms: u64) -> bool {
    match frame.wait_visible(selector, timeout_ms).await {
        Ok(true) => {}
        Ok(false) => {
            warn!("Element {} not visible after {}ms", selector, timeout_ms);
            return false;
        }
        Err(e) => {
            warn!("Visibility check failed for {}: {}", selector, e);
            return false;
        }
    }
    if let Err(e) = frame.scroll_into_view(selector).await {
        debug!("Scroll into view failed for {}: {}", selector, e);
    }
    frame.is_visible(selector).await.unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_numeric_id() {
        assert_eq!(sanitize_selector("#123"), "[id='123']");
        assert_eq!(sanitize_selector("#4abc"), "[id='4abc']");
    }

    #[test]
    fn test_sanitize_punctuation_id() {
        assert_eq!(
            sanitize_selector("#job_application[answers][0]"),
            "[id='job_application[answers][0]']"
        );
        assert_eq!(sanitize_selector("#q:r1:"), "[id='q:r1:']");
        assert_eq!(sanitize_selector("#first.name"), "[id='first.name']");
        assert_eq!(sanitize_selector("#o'brien"), "[id='o\\'brien']");
    }

    #[test]
    fn test_sanitize_leaves_plain_selectors() {
        for s in [
            "#first_name",
            "#email-address",
            "input[name='email']",
            ".select__control",
            "[id='123']",
            "select",
        ] {
            assert_eq!(sanitize_selector(s), s);
        }
    }

    #[test]
    fn test_sanitize_keeps_padding_when_nothing_to_rewrite() {
        for s in ["  #first_name", "select ", " div > span "] {
            assert_eq!(sanitize_selector(s), s);
        }
        assert_eq!(sanitize_selector(" #123 "), "[id='123']");
    }

    #[test]
    fn test_sanitize_idempotent() {
        for s in [
            "#123",
            "#a.b",
            "#x[y]",
            "#it's",
            "#back\\slash",
            "#ok",
            "div > span",
            "#-1",
        ] {
            let once = sanitize_selector(s);
            assert_eq!(sanitize_selector(&once), once, "input: {}", s);
        }
    }

    #[test]
    fn test_sanitize_output_is_attribute_selector() {
        for s in ["#1", "#a b", "#a/b", "#a@b", "#9-lives"] {
            let out = sanitize_selector(s);
            assert!(out.starts_with("[id='") && out.ends_with("']"), "{}", out);
        }
    }

    #[test]
    fn test_is_main_frame() {
        assert!(is_main_frame(None));
        assert!(is_main_frame(Some("")));
        assert!(is_main_frame(Some("Main")));
        assert!(!is_main_frame(Some("grnhse_iframe")));
    }
}
