//! Standard `<select>` and custom dropdown handler.

use tracing::{debug, info, warn};

use super::dropdown::{self, Match, Open};
use super::Toolkit;
use crate::context::{ElementData, SelectAction, WidgetType};
use crate::frame::{FormFrame, OptionChoice};
use crate::matching::{generate_variants, FieldCategory};
use crate::strategy::{default_strategy, Strategy};
use crate::verify::{verify_selection, ReadBack};
use crate::{Error, Result};

pub struct SelectHandler {
    tk: Toolkit,
}

impl SelectHandler {
    pub fn new(tk: Toolkit) -> Self {
        Self { tk }
    }

    pub async fn handle(&self, action: &SelectAction) -> Result<bool> {
        self.run(action)
            .await
            .map_err(|e| Error::action(&action.target.selector, e))
    }

    async fn run(&self, action: &SelectAction) -> Result<bool> {
        let (frame, selector) = self.tk.locate(&action.target).await?;
        let frame = frame.as_ref();

        let widget = match action.widget {
            Some(w) => w,
            None => probe_widget(frame, &selector).await,
        };
        info!("Select '{}' on {} ({})", action.value, selector, widget);

        let visible = self.tk.ensure_visible(frame, &selector).await;
        let category = FieldCategory::from_field_type(action.field_type.as_deref());

        match widget {
            WidgetType::CustomSelect | WidgetType::Autocomplete => {
                if !visible {
                    return Ok(false);
                }
                let strategy = self.choose(action, widget).await;
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
            _ => {
                // Native selects are often visually replaced but still scriptable.
                if !visible {
                    debug!("{} is not visible; selecting through script", selector);
                }
                let strategy = self.choose(action, WidgetType::StandardSelect).await;
                self.standard(frame, &selector, action, strategy, category)
                    .await
            }
        }
    }

    async fn choose(&self, action: &SelectAction, widget: WidgetType) -> Strategy {
        match &action.element {
            Some(element) if element.widget_type == widget => {
                self.tk.selector.select_strategy(element, &action.value).await
            }
            _ => default_strategy(widget),
        }
    }

    async fn standard(
        &self,
        frame: &dyn FormFrame,
        selector: &str,
        action: &SelectAction,
        strategy: Strategy,
        category: FieldCategory,
    ) -> Result<bool> {
        info!("Using '{}' for standard select {}", strategy, selector);
        match strategy {
            Strategy::SelectByValue => {
                if !frame
                    .select_option(selector, OptionChoice::Value(&action.value))
                    .await?
                {
                    warn!("No option with value '{}' in {}", action.value, selector);
                    return Ok(false);
                }
                self.tk.timings.settle(500).await;
                Ok(verify_selection(frame, selector, &action.value, ReadBack::NativeSelect).await)
            }
            Strategy::SelectByFuzzyMatch => {
                self.semantic(frame, selector, action, category).await
            }
            _ => {
                if frame
                    .select_option(selector, OptionChoice::Label(&action.value))
                    .await?
                {
                    self.tk.timings.settle(500).await;
                    return Ok(verify_selection(
                        frame,
                        selector,
                        &action.value,
                        ReadBack::NativeSelect,
                    )
                    .await);
                }
                debug!("Exact label '{}' not found, trying semantic match", action.value);
                self.semantic(frame, selector, action, category).await
            }
        }
    }

    /// Match against the declared options (or the native ones) and select by label.
    async fn semantic(
        &self,
        frame: &dyn FormFrame,
        selector: &str,
        action: &SelectAction,
        category: FieldCategory,
    ) -> Result<bool> {
        let declared = action
            .element
            .as_ref()
            .map(|e| e.options.clone())
            .unwrap_or_default();
        let options = if declared.is_empty() {
            frame.native_options(selector).await?
        } else {
            declared
        };
        if options.is_empty() {
            warn!("No options available for {}", selector);
            return Ok(false);
        }

        let variants = generate_variants(&action.value, category);
        let Some(matched) = self
            .tk
            .selector
            .find_best_match(
                &action.value,
                &options,
                action.element.as_ref(),
                &variants,
                category,
            )
            .await
        else {
            return Ok(false);
        };

        if !frame
            .select_option(selector, OptionChoice::Label(&matched))
            .await?
        {
            warn!("Matched option '{}' could not be selected", matched);
            return Ok(false);
        }
        self.tk.timings.settle(500).await;
        Ok(verify_selection(frame, selector, &matched, ReadBack::NativeSelect).await)
    }
}

/// Decide between native and custom when the analyzer gave no widget type.
async fn probe_widget(frame: &dyn FormFrame, selector: &str) -> WidgetType {
    match frame.describe(selector).await {
        Ok(Some(ElementData { widget_type, .. }))
            if matches!(
                widget_type,
                WidgetType::StandardSelect | WidgetType::CustomSelect | WidgetType::Autocomplete
            ) =>
        {
            widget_type
        }
        Ok(Some(ElementData { tag_name, .. })) if tag_name.eq_ignore_ascii_case("select") => {
            WidgetType::StandardSelect
        }
        Ok(_) => WidgetType::CustomSelect,
        Err(e) => {
            debug!("Could not inspect {}: {}", selector, e);
            WidgetType::StandardSelect
        }
    }
}

/// Run one custom-dropdown or autocomplete strategy.
pub(crate) async fn run_dropdown_strategy(
    tk: &Toolkit,
    frame: &dyn FormFrame,
    selector: &str,
    value: &str,
    strategy: Strategy,
    category: FieldCategory,
    context: Option<&ElementData>,
) -> Result<bool> {
    info!("Using '{}' for {}", strategy, selector);
    let (open, matching) = match strategy {
        Strategy::ClickAndSelectExact => (Open::Click, Match::Exact),
        Strategy::TypeAndSelectExact => (Open::Type, Match::Exact),
        Strategy::TypeAndSelectFuzzy => (Open::Type, Match::Fuzzy),
        Strategy::FillAndConfirm => return fill_and_confirm(tk, frame, selector, value).await,
        Strategy::ClearAndTypeAndSelect => {
            if let Err(e) = frame.clear(selector).await {
                warn!("Could not clear {}: {}", selector, e);
                return Ok(false);
            }
            (Open::Type, Match::Fuzzy)
        }
        _ => (Open::Click, Match::Fuzzy),
    };
    dropdown::open_and_select(tk, frame, selector, value, open, matching, category, context).await
}

/// Fill, then blur with Tab so the widget commits the value.
async fn fill_and_confirm(
    tk: &Toolkit,
    frame: &dyn FormFrame,
    selector: &str,
    value: &str,
) -> Result<bool> {
    if let Err(e) = frame.fill(selector, value).await {
        warn!("Fill failed for {}: {}", selector, e);
        return Ok(false);
    }
    if let Err(e) = frame.press_key(Some(selector), "Tab").await {
        debug!("Blur on {} failed: {}", selector, e);
    }
    tk.timings.settle(500).await;
    Ok(verify_selection(frame, selector, value, ReadBack::Input).await)
}
