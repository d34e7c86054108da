//! Checkboxes and radio buttons.

use tracing::info;

use super::Toolkit;
use crate::context::{ToggleAction, ToggleKind};
use crate::{Error, Result};

pub struct ToggleHandler {
    tk: Toolkit,
}

impl ToggleHandler {
    pub fn new(tk: Toolkit) -> Self {
        Self { tk }
    }

    pub async fn handle(&self, action: &ToggleAction) -> Result<bool> {
        self.run(action)
            .await
            .map_err(|e| Error::action(&action.target.selector, e))
    }

    async fn run(&self, action: &ToggleAction) -> Result<bool> {
        let (frame, selector) = self.tk.locate(&action.target).await?;
        let frame = frame.as_ref();

        if !self.tk.ensure_visible(frame, &selector).await {
            return Ok(false);
        }

        let checked = match action.kind {
            ToggleKind::Radio => true,
            ToggleKind::Checkbox { checked } => checked,
        };
        info!(
            "{} {}",
            if checked { "Checking" } else { "Unchecking" },
            selector
        );
        frame.set_checked(&selector, checked).await?;
        Ok(true)
    }
}
