//! Post-action verification.
//!
//! A click or fill that "worked" is not enough: the widget's observable value
//! is read back and compared to the intended one.

use tracing::{debug, warn};

use crate::frame::FormFrame;
use crate::matching::normalized_similarity;

/// Minimum normalized similarity for a value to count as set.
pub const VERIFY_THRESHOLD: f64 = 0.90;

/// Weaker threshold for the location typeahead's last-resort check.
pub const LOCATION_FALLBACK_THRESHOLD: f64 = 0.6;

/// How the effective value of a widget is read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadBack {
    /// Native `<select>`: checked option text, then its value.
    NativeSelect,
    /// Inputs and custom widgets: input value, then text content.
    Input,
}

/// Whether `actual` is close enough to `expected`.
pub fn is_verified(expected: &str, actual: &str) -> bool {
    normalized_similarity(expected, actual) >= VERIFY_THRESHOLD
}

/// Read the widget's value back and compare it to `expected`.
///
/// Tries each retrieval in order and passes on the first that clears
/// [`VERIFY_THRESHOLD`]. Read errors count as a miss.
pub async fn verify_selection(
    frame: &dyn FormFrame,
    selector: &str,
    expected: &str,
    kind: ReadBack,
) -> bool {
    let mut seen: Vec<String> = Vec::new();
    for step in 0..2 {
        let read = match (kind, step) {
            (ReadBack::NativeSelect, 0) => frame.selected_text(selector).await,
            (ReadBack::NativeSelect, _) => frame.input_value(selector).await,
            (ReadBack::Input, 0) => frame.input_value(selector).await,
            (ReadBack::Input, _) => frame.text_content(selector).await,
        };
        let actual = match read {
            Ok(Some(v)) if !v.trim().is_empty() => v,
            Ok(_) => continue,
            Err(e) => {
                debug!("Read-back of {} failed: {}", selector, e);
                continue;
            }
        };
        let score = normalized_similarity(expected, &actual);
        debug!(
            "Verify {}: expected '{}', actual '{}', similarity {:.2}",
            selector, expected, actual, score
        );
        if score >= VERIFY_THRESHOLD {
            return true;
        }
        seen.push(actual);
    }
    warn!(
        "Verification failed for {}: expected '{}', found {:?}",
        selector, expected, seen
    );
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_boundary() {
        let expected = "University of California, Berkeley";
        // one dropped letter in the campus name stays above 0.90
        assert!(is_verified(expected, "University of California, Berkley"));
        assert!(normalized_similarity(expected, "University of California, Berkley") >= 0.90);
        // abbreviated head word drops well below
        assert!(!is_verified(expected, "Univ of California, Berkeley"));
        assert!(normalized_similarity(expected, "Univ of California, Berkeley") < 0.90);
        // truncated campus sits just under
        assert!(!is_verified(expected, "University of California, Berk"));
    }

    #[test]
    fn test_punctuation_and_case_are_ignored() {
        assert!(is_verified("Yes", "yes"));
        assert!(is_verified(
            "University of California, Berkeley",
            "university of california berkeley"
        ));
        assert!(!is_verified("Yes", "No"));
    }

    #[test]
    fn test_thresholds_are_distinct() {
        assert!(LOCATION_FALLBACK_THRESHOLD < VERIFY_THRESHOLD);
    }
}
