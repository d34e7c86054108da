//! Buttons and other click targets.

use tracing::{debug, info, warn};

use super::Toolkit;
use crate::context::{ClickAction, WidgetType};
use crate::frame::FormFrame;
use crate::strategy::{menu, Strategy};
use crate::{Error, Result};

pub struct ClickHandler {
    tk: Toolkit,
}

impl ClickHandler {
    pub fn new(tk: Toolkit) -> Self {
        Self { tk }
    }

    pub async fn handle(&self, action: &ClickAction) -> Result<bool> {
        self.run(action)
            .await
            .map_err(|e| Error::action(&action.target.selector, e))
    }

    async fn run(&self, action: &ClickAction) -> Result<bool> {
        let (frame, selector) = self.tk.locate(&action.target).await?;
        let frame = frame.as_ref();

        if !self.tk.ensure_visible(frame, &selector).await {
            return Ok(false);
        }

        for strategy in self.order(action).await {
            match self.attempt(frame, &selector, strategy).await {
                Ok(()) => {
                    info!("Clicked {} using '{}'", selector, strategy);
                    return Ok(true);
                }
                Err(e) => debug!("'{}' on {} failed: {}", strategy, selector, e),
            }
        }
        warn!("Every click strategy failed on {}", selector);
        Ok(false)
    }

    /// Button strategies in the order they are tried. An oracle pick for a
    /// described button goes first; the rest of the menu follows.
    async fn order(&self, action: &ClickAction) -> Vec<Strategy> {
        let mut order = menu(WidgetType::Button).to_vec();
        if let Some(element) = action
            .element
            .as_ref()
            .filter(|e| e.widget_type == WidgetType::Button)
        {
            let first = self.tk.selector.select_strategy(element, "click").await;
            order.retain(|s| *s != first);
            order.insert(0, first);
        }
        order
    }

    async fn attempt(
        &self,
        frame: &dyn FormFrame,
        selector: &str,
        strategy: Strategy,
    ) -> Result<()> {
        match strategy {
            Strategy::JsClick => frame.js_click(selector).await,
            Strategy::PressEnter => frame.press_key(Some(selector), "Enter").await,
            _ => self.tk.click(frame, selector).await,
        }
    }
}
