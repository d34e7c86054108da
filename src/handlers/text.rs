//! Plain text inputs, text areas and rich text editors.

use tracing::{debug, info, warn};

use super::Toolkit;
use crate::context::TextAction;
use crate::frame::FormFrame;
use crate::matching::{best_lexical_match, FieldCategory};
use crate::strategy::{default_strategy, validate_strategy, Strategy};
use crate::{Error, Result};

pub struct TextHandler {
    tk: Toolkit,
}

impl TextHandler {
    pub fn new(tk: Toolkit) -> Self {
        Self { tk }
    }

    pub async fn handle(&self, action: &TextAction) -> Result<bool> {
        self.run(action)
            .await
            .map_err(|e| Error::action(&action.target.selector, e))
    }

    async fn run(&self, action: &TextAction) -> Result<bool> {
        let (frame, selector) = self.tk.locate(&action.target).await?;
        let frame = frame.as_ref();

        if !self.tk.ensure_visible(frame, &selector).await {
            return Ok(false);
        }

        let (strategy, value) = self.plan(action).await;
        info!("Text '{}' into {} using '{}'", value, selector, strategy);
        self.apply(frame, &selector, &value, strategy).await?;
        Ok(true)
    }

    /// Pick a strategy and the exact text to enter.
    ///
    /// Pre-scraped options that already contain a match skip the oracle.
    async fn plan(&self, action: &TextAction) -> (Strategy, String) {
        let Some(element) = &action.element else {
            return (default_strategy(action.widget), action.value.clone());
        };
        if !element.options.is_empty() {
            if let Some(m) =
                best_lexical_match(&action.value, &element.options, FieldCategory::Other)
            {
                debug!("Pre-scraped option '{}' (score {:.2})", m.text, m.score);
                return (validate_strategy(action.widget, Some("fill")), m.text);
            }
        }
        let strategy = self.tk.selector.select_strategy(element, &action.value).await;
        (strategy, action.value.clone())
    }

    async fn apply(
        &self,
        frame: &dyn FormFrame,
        selector: &str,
        value: &str,
        strategy: Strategy,
    ) -> Result<()> {
        match strategy {
            Strategy::ClearAndFill => {
                frame.clear(selector).await?;
                frame.fill(selector, value).await
            }
            Strategy::TypeSlowly => {
                if let Err(e) = frame.clear(selector).await {
                    warn!("Clear before typing failed on {}: {}", selector, e);
                }
                frame.type_text(selector, value).await
            }
            _ => frame.fill(selector, value).await,
        }
    }
}
