//! Strategy selection and semantic option matching.

use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::context::{ElementData, WidgetType};
use crate::matching::{self, FieldCategory};
use crate::oracle::Oracle;

/// Sentinel the oracle answers when no option fits.
pub const NO_MATCH: &str = "NO_MATCH_FOUND";

/// Options shown in debug logs.
const LOGGED_OPTIONS: usize = 20;

/// A named interaction recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Fill,
    ClearAndFill,
    TypeSlowly,
    SelectByLabel,
    SelectByValue,
    SelectByFuzzyMatch,
    ClickAndSelectFuzzy,
    ClickAndSelectExact,
    TypeAndSelectExact,
    TypeAndSelectFuzzy,
    FillAndConfirm,
    ClearAndTypeAndSelect,
    Check,
    Uncheck,
    Click,
    ClickByValue,
    ClickByLabel,
    DelegateToUploadHandler,
    JsClick,
    PressEnter,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Fill => "fill",
            Strategy::ClearAndFill => "clear_and_fill",
            Strategy::TypeSlowly => "type_slowly",
            Strategy::SelectByLabel => "select_by_label",
            Strategy::SelectByValue => "select_by_value",
            Strategy::SelectByFuzzyMatch => "select_by_fuzzy_match",
            Strategy::ClickAndSelectFuzzy => "click_and_select_fuzzy",
            Strategy::ClickAndSelectExact => "click_and_select_exact",
            Strategy::TypeAndSelectExact => "type_and_select_exact",
            Strategy::TypeAndSelectFuzzy => "type_and_select_fuzzy",
            Strategy::FillAndConfirm => "fill_and_confirm",
            Strategy::ClearAndTypeAndSelect => "clear_and_type_and_select",
            Strategy::Check => "check",
            Strategy::Uncheck => "uncheck",
            Strategy::Click => "click",
            Strategy::ClickByValue => "click_by_value",
            Strategy::ClickByLabel => "click_by_label",
            Strategy::DelegateToUploadHandler => "delegate_to_upload_handler",
            Strategy::JsClick => "js_click",
            Strategy::PressEnter => "press_enter",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Admissible strategies per widget type, default first.
pub fn menu(widget: WidgetType) -> &'static [Strategy] {
    use Strategy::*;
    match widget {
        WidgetType::TextInput
        | WidgetType::Email
        | WidgetType::Tel
        | WidgetType::Url
        | WidgetType::Date => &[Fill, ClearAndFill, TypeSlowly],
        WidgetType::TextArea | WidgetType::RichTextEditor => &[Fill, TypeSlowly, ClearAndFill],
        WidgetType::StandardSelect => &[SelectByLabel, SelectByValue, SelectByFuzzyMatch],
        WidgetType::CustomSelect => &[
            ClickAndSelectFuzzy,
            ClickAndSelectExact,
            TypeAndSelectExact,
            TypeAndSelectFuzzy,
        ],
        WidgetType::Autocomplete => &[
            TypeAndSelectFuzzy,
            TypeAndSelectExact,
            FillAndConfirm,
            ClearAndTypeAndSelect,
        ],
        WidgetType::Checkbox => &[Check, Uncheck, Click],
        WidgetType::RadioButton => &[ClickByValue, ClickByLabel],
        WidgetType::FileInput => &[DelegateToUploadHandler],
        WidgetType::Button => &[Click, JsClick, PressEnter],
    }
}

/// Default strategy for a widget type.
pub fn default_strategy(widget: WidgetType) -> Strategy {
    menu(widget)[0]
}

/// Resolve a strategy name against the widget's menu.
///
/// Case-insensitive; anything outside the menu yields the default.
pub fn validate_strategy(widget: WidgetType, name: Option<&str>) -> Strategy {
    name.and_then(|n| lookup(widget, n))
        .unwrap_or_else(|| default_strategy(widget))
}

fn lookup(widget: WidgetType, name: &str) -> Option<Strategy> {
    let name = name.trim();
    menu(widget)
        .iter()
        .copied()
        .find(|s| s.as_str().eq_ignore_ascii_case(name))
}

/// Extract a strategy name from a free-form oracle reply.
///
/// Tolerates surrounding whitespace, quotes, a trailing period and a
/// `label:` prefix (the text after the last colon is used).
pub fn parse_strategy_reply(widget: WidgetType, reply: &str) -> Option<Strategy> {
    let last_line = reply.lines().rev().find(|l| !l.trim().is_empty())?;
    let tail = last_line.rsplit(':').next().unwrap_or(last_line);
    let cleaned = tail.trim().trim_matches(|c| matches!(c, '`' | '"' | '\'' | '.' | '*'));
    lookup(widget, cleaned)
}

fn strategy_prompt(element: &ElementData, desired: &str) -> String {
    let sample: Vec<&String> = element.options.iter().take(5).collect();
    let sample = matching::truncate_chars(&format!("{:?}", sample), 200);
    let admissible: Vec<&str> = menu(element.widget_type).iter().map(|s| s.as_str()).collect();
    format!(
        "You are choosing how to operate a web form widget.\n\
         Widget type: {}\n\
         Tag: {}\n\
         Role: {}\n\
         Label: {}\n\
         Selector: {}\n\
         HTML: {}\n\
         Options sample: {}\n\
         Desired value: {}\n\n\
         Admissible strategies: {}\n\
         Reply with exactly one strategy name from the list and nothing else.",
        element.widget_type,
        element.tag_name,
        element.role.as_deref().unwrap_or("none"),
        matching::truncate_chars(&element.label_text, 100),
        matching::truncate_chars(&element.selector, 150),
        matching::truncate_chars(&element.html_snippet, 300),
        sample,
        matching::truncate_chars(desired, 100),
        admissible.join(", "),
    )
}

fn match_prompt(
    desired: &str,
    options: &[String],
    context: Option<&ElementData>,
    variants: &[String],
) -> String {
    let mut prompt = String::from(
        "Pick the option that best matches the desired value for a job application form.\n",
    );
    if let Some(ctx) = context {
        prompt.push_str(&format!(
            "Field: {} ({})\n",
            matching::truncate_chars(&ctx.label_text, 100),
            ctx.widget_type
        ));
    }
    prompt.push_str(&format!("Desired value: {}\n", desired));
    if !variants.is_empty() {
        prompt.push_str(&format!("Equivalent spellings: {}\n", variants.join(" | ")));
    }
    prompt.push_str("Options:\n");
    for (i, option) in options.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, option));
    }
    prompt.push_str(&format!(
        "\nReply with the chosen option copied exactly as listed, or {} if none fits.",
        NO_MATCH
    ));
    prompt
}

/// Chooses strategies and matches options, consulting an injected oracle.
pub struct StrategySelector {
    oracle: Arc<dyn Oracle>,
}

impl StrategySelector {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self { oracle }
    }

    /// Pick a strategy for driving `element` to `desired`.
    ///
    /// Always returns a member of the widget's menu. Oracle failures and
    /// unusable replies fall back to the default.
    pub async fn select_strategy(&self, element: &ElementData, desired: &str) -> Strategy {
        let widget = element.widget_type;
        let fallback = default_strategy(widget);
        if menu(widget).len() == 1 {
            return fallback;
        }

        let prompt = strategy_prompt(element, desired);
        match self.oracle.complete(&prompt).await {
            Ok(reply) => match parse_strategy_reply(widget, &reply) {
                Some(strategy) => {
                    info!("Oracle chose '{}' for {} widget", strategy, widget);
                    strategy
                }
                None => {
                    warn!(
                        "Oracle reply '{}' is not admissible for {}, using '{}'",
                        matching::truncate_chars(reply.trim(), 60),
                        widget,
                        fallback
                    );
                    fallback
                }
            },
            Err(e) => {
                warn!("Strategy oracle failed ({}), using '{}'", e, fallback);
                fallback
            }
        }
    }

    /// Ask the oracle for the option that best matches `desired`.
    ///
    /// The answer is only accepted if it names one of `options`
    /// (case-insensitive); the option is returned verbatim. If the oracle
    /// call itself fails, a local lexical match is used instead.
    pub async fn find_best_match(
        &self,
        desired: &str,
        options: &[String],
        context: Option<&ElementData>,
        variants: &[String],
        category: FieldCategory,
    ) -> Option<String> {
        if options.is_empty() {
            return None;
        }
        debug!(
            "Matching '{}' against {} options: {:?}",
            desired,
            options.len(),
            &options[..options.len().min(LOGGED_OPTIONS)]
        );

        let prompt = match_prompt(desired, options, context, variants);
        let reply = match self.oracle.complete(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Match oracle failed ({}), using lexical match", e);
                return matching::best_lexical_match(desired, options, category).map(|m| m.text);
            }
        };

        let answer = reply
            .trim()
            .trim_matches(|c| matches!(c, '`' | '"' | '\''))
            .trim();
        if answer.is_empty() || answer.eq_ignore_ascii_case(NO_MATCH) {
            info!("Oracle found no match for '{}'", desired);
            return None;
        }

        let found = options
            .iter()
            .find(|o| o.trim().eq_ignore_ascii_case(answer))
            .cloned();
        match &found {
            Some(option) => info!("Oracle matched '{}' -> '{}'", desired, option),
            None => warn!(
                "Oracle answered '{}', which is not among the options",
                matching::truncate_chars(answer, 60)
            ),
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{OfflineOracle, OracleError};
    use async_trait::async_trait;

    struct Scripted(&'static str);

    #[async_trait]
    impl Oracle for Scripted {
        async fn complete(&self, _prompt: &str) -> Result<String, OracleError> {
            Ok(self.0.to_string())
        }
    }

    fn selector(reply: &'static str) -> StrategySelector {
        StrategySelector::new(Arc::new(Scripted(reply)))
    }

    #[test]
    fn test_defaults() {
        assert_eq!(default_strategy(WidgetType::TextInput), Strategy::Fill);
        assert_eq!(default_strategy(WidgetType::StandardSelect), Strategy::SelectByLabel);
        assert_eq!(
            default_strategy(WidgetType::CustomSelect),
            Strategy::ClickAndSelectFuzzy
        );
        assert_eq!(
            default_strategy(WidgetType::Autocomplete),
            Strategy::TypeAndSelectFuzzy
        );
        assert_eq!(default_strategy(WidgetType::RadioButton), Strategy::ClickByValue);
        assert_eq!(default_strategy(WidgetType::Button), Strategy::Click);
    }

    #[test]
    fn test_validate_strategy() {
        assert_eq!(
            validate_strategy(WidgetType::TextArea, Some("TYPE_SLOWLY")),
            Strategy::TypeSlowly
        );
        // valid name, wrong widget
        assert_eq!(
            validate_strategy(WidgetType::TextInput, Some("select_by_label")),
            Strategy::Fill
        );
        assert_eq!(
            validate_strategy(WidgetType::Checkbox, None),
            Strategy::Check
        );
    }

    #[test]
    fn test_parse_strategy_reply() {
        assert_eq!(
            parse_strategy_reply(WidgetType::TextInput, "Chosen Strategy: type_slowly"),
            Some(Strategy::TypeSlowly)
        );
        assert_eq!(
            parse_strategy_reply(WidgetType::Autocomplete, "  `fill_and_confirm`.\n"),
            Some(Strategy::FillAndConfirm)
        );
        assert_eq!(
            parse_strategy_reply(WidgetType::Autocomplete, "I would type carefully"),
            None
        );
    }

    #[tokio::test]
    async fn test_select_strategy_always_admissible() {
        let widgets = [
            WidgetType::TextInput,
            WidgetType::RichTextEditor,
            WidgetType::StandardSelect,
            WidgetType::CustomSelect,
            WidgetType::Autocomplete,
            WidgetType::Checkbox,
            WidgetType::RadioButton,
            WidgetType::FileInput,
            WidgetType::Button,
        ];
        let selectors = [
            selector("select_by_value"),
            selector(""),
            selector("\u{1F600} garbage"),
            StrategySelector::new(Arc::new(OfflineOracle)),
        ];
        for widget in widgets {
            let element = ElementData::new(widget);
            for s in &selectors {
                let chosen = s.select_strategy(&element, "value").await;
                assert!(menu(widget).contains(&chosen), "{} -> {}", widget, chosen);
            }
        }
    }

    #[tokio::test]
    async fn test_select_strategy_uses_oracle_answer() {
        let element = ElementData::new(WidgetType::StandardSelect);
        let chosen = selector("select_by_value").select_strategy(&element, "US").await;
        assert_eq!(chosen, Strategy::SelectByValue);
    }

    #[tokio::test]
    async fn test_match_rejects_invented_option() {
        let options = vec!["California".to_string(), "Colorado".to_string()];
        let found = selector("Californie")
            .find_best_match("Californie", &options, None, &[], FieldCategory::Location)
            .await;
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_match_returns_option_verbatim() {
        let options = vec!["California".to_string(), "Colorado".to_string()];
        let found = selector("  california ")
            .find_best_match("Californie", &options, None, &[], FieldCategory::Location)
            .await;
        assert_eq!(found.as_deref(), Some("California"));
    }

    #[tokio::test]
    async fn test_match_sentinel() {
        let options = vec!["Yes".to_string(), "No".to_string()];
        let found = selector(NO_MATCH)
            .find_best_match("Maybe", &options, None, &[], FieldCategory::Other)
            .await;
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_match_falls_back_to_lexical_on_oracle_error() {
        let options = vec!["California".to_string(), "Colorado".to_string()];
        let found = StrategySelector::new(Arc::new(OfflineOracle))
            .find_best_match("Californie", &options, None, &[], FieldCategory::Other)
            .await;
        assert_eq!(found.as_deref(), Some("California"));
    }

    #[test]
    fn test_strategy_prompt_is_bounded() {
        let mut element = ElementData::new(WidgetType::CustomSelect)
            .with_label("x".repeat(500))
            .with_options((0..50).map(|i| format!("Option number {}", i)));
        element.html_snippet = "<div>".repeat(200);
        let prompt = strategy_prompt(&element, &"v".repeat(400));
        assert!(!prompt.contains(&"x".repeat(101)));
        assert!(!prompt.contains(&"v".repeat(101)));
        assert!(!prompt.contains("Option number 5"));
        assert!(prompt.contains("click_and_select_exact"));
    }
}
