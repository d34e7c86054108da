//! Typeahead / autocomplete handler.
//!
//! Location fields get progressive typing: prefixes of the city first, then
//! the full value. Everything else reuses the dropdown flow.

use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

use super::dropdown;
use super::select::run_dropdown_strategy;
use super::Toolkit;
use crate::context::{TypeaheadAction, WidgetType};
use crate::frame::{FormFrame, Scope};
use crate::matching::{generate_variants, normalized_similarity, FieldCategory};
use crate::strategy::default_strategy;
use crate::verify::{verify_selection, ReadBack, LOCATION_FALLBACK_THRESHOLD};
use crate::{Error, Result};

const SUGGESTION_SELECTOR: &str = "[role='option']";

const LOCATION_TYPE_WORDS: &[&str] = &["location", "city", "country", "address"];
const LOCATION_ID_WORDS: &[&str] = &[
    "location", "city", "state", "country", "address", "zip", "postal",
];

fn city_state_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z ]+,\s*[A-Z]{2}\b").expect("valid regex"))
}

/// Heuristic: is this a location field?
pub fn is_location_field(action: &TypeaheadAction) -> bool {
    let contains_any = |text: &str, words: &[&str]| {
        let text = text.to_lowercase();
        words.iter().any(|w| text.contains(w))
    };
    action
        .field_type
        .as_deref()
        .is_some_and(|t| contains_any(t, LOCATION_TYPE_WORDS))
        || contains_any(&action.target.selector, LOCATION_ID_WORDS)
        || action
            .field_name
            .as_deref()
            .is_some_and(|n| contains_any(n, LOCATION_ID_WORDS))
        || city_state_re().is_match(action.value.trim())
}

/// Text typed at each step, with the pause after it.
pub fn typing_steps(value: &str) -> Vec<(String, u64)> {
    let parts: Vec<&str> = value
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    let city = parts.first().copied().unwrap_or(value).trim();
    let prefix = |n: usize| city.chars().take(n).collect::<String>();
    let len = city.chars().count();

    let mut steps: Vec<(String, u64)> = Vec::new();
    if len >= 3 {
        steps.push((prefix(3), 400));
    }
    if len >= 5 {
        steps.push((prefix(5), 600));
    }
    steps.push((city.to_string(), 800));
    if parts.len() > 1 {
        steps.push((value.trim().to_string(), 1000));
    }

    let mut seen = Vec::new();
    steps.retain(|(text, _)| {
        if seen.contains(text) {
            false
        } else {
            seen.push(text.clone());
            true
        }
    });
    steps
}

pub struct TypeaheadHandler {
    tk: Toolkit,
}

impl TypeaheadHandler {
    pub fn new(tk: Toolkit) -> Self {
        Self { tk }
    }

    pub async fn handle(&self, action: &TypeaheadAction) -> Result<bool> {
        self.run(action)
            .await
            .map_err(|e| Error::action(&action.target.selector, e))
    }

    async fn run(&self, action: &TypeaheadAction) -> Result<bool> {
        let (frame, selector) = self.tk.locate(&action.target).await?;
        let frame = frame.as_ref();

        if !self.tk.ensure_visible(frame, &selector).await {
            return Ok(false);
        }

        if is_location_field(action) {
            info!("Location typeahead for {} with '{}'", selector, action.value);
            self.location(frame, &selector, action).await
        } else {
            let strategy = match &action.element {
                Some(element) if element.widget_type == WidgetType::Autocomplete => {
                    self.tk.selector.select_strategy(element, &action.value).await
                }
                _ => default_strategy(WidgetType::Autocomplete),
            };
            let category = FieldCategory::from_field_type(action.field_type.as_deref());
            run_dropdown_strategy(
                &self.tk,
                frame,
                &selector,
                &action.value,
                strategy,
                category,
                action.element.as_ref(),
            )
            .await
        }
    }

    async fn location(
        &self,
        frame: &dyn FormFrame,
        selector: &str,
        action: &TypeaheadAction,
    ) -> Result<bool> {
        let value = action.value.trim();

        if let Err(e) = self.tk.click(frame, selector).await {
            warn!("Could not focus {}: {}", selector, e);
        }
        if let Err(e) = frame.fill(selector, "").await {
            warn!("Could not clear {}: {}", selector, e);
        }
        self.tk.timings.settle(300).await;

        let variants = generate_variants(value, FieldCategory::Location);
        // `Some(None)` means a keyboard pick: something was chosen, but not known what.
        let mut selected: Option<Option<String>> = None;

        for (text, pause) in typing_steps(value) {
            debug!("Typing '{}' into {}", text, selector);
            if let Err(e) = frame.fill(selector, &text).await {
                warn!("Typing '{}' failed: {}", text, e);
                continue;
            }
            self.tk.timings.settle(pause).await;

            let suggestions = match frame.option_texts(SUGGESTION_SELECTOR, Scope::Global).await {
                Ok(s) => s,
                Err(e) => {
                    debug!("Suggestion scrape failed: {}", e);
                    continue;
                }
            };
            if suggestions.is_empty() {
                debug!("No suggestions after typing '{}'", text);
                continue;
            }

            let Some(matched) = self
                .tk
                .selector
                .find_best_match(
                    value,
                    &suggestions,
                    action.element.as_ref(),
                    &variants,
                    FieldCategory::Location,
                )
                .await
            else {
                debug!("No suggestion matched '{}' after '{}'", value, text);
                continue;
            };

            if dropdown::click_option_by_text(&self.tk, frame, &matched).await {
                if let Err(e) = frame.press_key(None, "Escape").await {
                    debug!("Escape after selection failed: {}", e);
                }
                selected = Some(Some(matched));
                break;
            }

            warn!("Clicking '{}' failed, selecting with the keyboard", matched);
            match self.keyboard_pick(frame, selector).await {
                Ok(()) => {
                    selected = Some(None);
                    break;
                }
                Err(e) => warn!("Keyboard selection failed: {}", e),
            }
        }

        match selected {
            Some(choice) => {
                self.tk.timings.settle(500).await;
                let expected = choice.as_deref().unwrap_or(value);
                Ok(verify_selection(frame, selector, expected, ReadBack::Input).await)
            }
            None => Ok(self.fallback_check(frame, selector, value).await),
        }
    }

    async fn keyboard_pick(&self, frame: &dyn FormFrame, selector: &str) -> Result<()> {
        frame.press_key(Some(selector), "ArrowDown").await?;
        self.tk.timings.settle(200).await;
        frame.press_key(Some(selector), "Enter").await
    }

    /// Accept whatever ended up in the field if it is close enough.
    async fn fallback_check(&self, frame: &dyn FormFrame, selector: &str, value: &str) -> bool {
        let current = match frame.input_value(selector).await {
            Ok(Some(v)) => v,
            Ok(None) => return false,
            Err(e) => {
                debug!("Could not read {}: {}", selector, e);
                return false;
            }
        };
        let score = normalized_similarity(value, &current);
        if score > LOCATION_FALLBACK_THRESHOLD {
            info!(
                "Accepting typed location '{}' for '{}' (similarity {:.2})",
                current, value, score
            );
            true
        } else {
            warn!(
                "Location '{}' not selected; field holds '{}' (similarity {:.2})",
                value, current, score
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Target;

    fn action(selector: &str, value: &str, field_type: Option<&str>) -> TypeaheadAction {
        TypeaheadAction {
            target: Target {
                selector: selector.into(),
                frame_id: None,
            },
            value: value.into(),
            field_type: field_type.map(Into::into),
            field_name: None,
            element: None,
        }
    }

    #[test]
    fn test_typing_steps_city_state() {
        let steps = typing_steps("San Francisco, CA");
        let texts: Vec<&str> = steps.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(texts, vec!["San", "San F", "San Francisco", "San Francisco, CA"]);
        let pauses: Vec<u64> = steps.iter().map(|(_, p)| *p).collect();
        assert_eq!(pauses, vec![400, 600, 800, 1000]);
    }

    #[test]
    fn test_typing_steps_dedup_short_city() {
        let steps = typing_steps("Rome");
        let texts: Vec<&str> = steps.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(texts, vec!["Rom", "Rome"]);

        let steps = typing_steps("Paris");
        let texts: Vec<&str> = steps.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(texts, vec!["Par", "Paris"]);
    }

    #[test]
    fn test_location_detection() {
        assert!(is_location_field(&action("#q1", "Berkeley", Some("location"))));
        assert!(is_location_field(&action("#candidate-city", "Berkeley", None)));
        assert!(is_location_field(&action("#q7", "Austin, TX", None)));
        assert!(!is_location_field(&action("#school", "MIT", Some("school"))));
        assert!(!is_location_field(&action("#q7", "Austin, Texas", None)));
    }
}
