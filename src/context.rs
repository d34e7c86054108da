//! Action plan data model.
//!
//! [`ActionContext`] is the loosely-shaped record the planner hands us. Before
//! dispatch the executor turns it into a [`FieldAction`], a tagged union with
//! one struct per handler family carrying only what that family needs.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;

use crate::{Error, Result};

/// Functional category of a form control, independent of its markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetType {
    TextInput,
    #[serde(alias = "email_input")]
    Email,
    #[serde(alias = "tel_input", alias = "phone")]
    Tel,
    #[serde(alias = "url_input")]
    Url,
    #[serde(alias = "date_input")]
    Date,
    #[serde(alias = "textarea")]
    TextArea,
    RichTextEditor,
    StandardSelect,
    CustomSelect,
    Autocomplete,
    Checkbox,
    RadioButton,
    FileInput,
    Button,
}

impl WidgetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WidgetType::TextInput => "text_input",
            WidgetType::Email => "email",
            WidgetType::Tel => "tel",
            WidgetType::Url => "url",
            WidgetType::Date => "date",
            WidgetType::TextArea => "text_area",
            WidgetType::RichTextEditor => "rich_text_editor",
            WidgetType::StandardSelect => "standard_select",
            WidgetType::CustomSelect => "custom_select",
            WidgetType::Autocomplete => "autocomplete",
            WidgetType::Checkbox => "checkbox",
            WidgetType::RadioButton => "radio_button",
            WidgetType::FileInput => "file_input",
            WidgetType::Button => "button",
        }
    }

    /// Handler family that drives this widget.
    pub fn family(&self) -> HandlerFamily {
        match self {
            WidgetType::TextInput
            | WidgetType::Email
            | WidgetType::Tel
            | WidgetType::Url
            | WidgetType::Date
            | WidgetType::TextArea
            | WidgetType::RichTextEditor => HandlerFamily::Text,
            WidgetType::StandardSelect | WidgetType::CustomSelect => HandlerFamily::Select,
            WidgetType::Autocomplete => HandlerFamily::Typeahead,
            WidgetType::Checkbox | WidgetType::RadioButton => HandlerFamily::Toggle,
            WidgetType::FileInput => HandlerFamily::Upload,
            WidgetType::Button => HandlerFamily::Click,
        }
    }
}

impl fmt::Display for WidgetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Descriptor of a concrete DOM widget, as produced by form analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementData {
    pub widget_type: WidgetType,
    #[serde(default)]
    pub tag_name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub label_text: String,
    #[serde(default)]
    pub selector: String,
    #[serde(default)]
    pub html_snippet: String,
    /// Pre-scraped option labels, when available.
    #[serde(default)]
    pub options: Vec<String>,
}

impl ElementData {
    pub fn new(widget_type: WidgetType) -> Self {
        Self {
            widget_type,
            tag_name: String::new(),
            role: None,
            label_text: String::new(),
            selector: String::new(),
            html_snippet: String::new(),
            options: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label_text = label.into();
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }
}

/// Extra bag carried alongside an action.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionOptions {
    #[serde(default)]
    pub element_data: Option<ElementData>,
    /// The element's `name` attribute, used by location heuristics.
    #[serde(default)]
    pub field_name: Option<String>,
}

/// One unit of work from the planner. Never mutated by handlers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionContext {
    /// Logical selector of the target element.
    pub field_id: String,
    /// Target value. Absent or empty means skip.
    #[serde(default, alias = "value")]
    pub field_value: Option<Value>,
    /// Declared semantic type (school, location, demographic, ...).
    #[serde(default)]
    pub field_type: Option<String>,
    /// Frame holding the element. `None` is the main document.
    #[serde(default)]
    pub frame_id: Option<String>,
    #[serde(default)]
    pub options: ActionOptions,
}

impl ActionContext {
    pub fn new(field_id: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field_id: field_id.into(),
            field_value: Some(value.into()),
            ..Default::default()
        }
    }

    /// An action with no value (clicks, default-checked boxes, skips).
    pub fn bare(field_id: impl Into<String>) -> Self {
        Self {
            field_id: field_id.into(),
            ..Default::default()
        }
    }

    pub fn with_field_type(mut self, field_type: impl Into<String>) -> Self {
        self.field_type = Some(field_type.into());
        self
    }

    pub fn with_frame(mut self, frame_id: impl Into<String>) -> Self {
        self.frame_id = Some(frame_id.into());
        self
    }

    pub fn with_element(mut self, element: ElementData) -> Self {
        self.options.element_data = Some(element);
        self
    }

    pub fn with_field_name(mut self, name: impl Into<String>) -> Self {
        self.options.field_name = Some(name.into());
        self
    }

    fn element(&self) -> Option<&ElementData> {
        self.options.element_data.as_ref()
    }

    /// Scalar value rendered as text; `None` when absent or blank.
    fn scalar_text(&self) -> Result<Option<String>> {
        match &self.field_value {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(Value::Bool(b)) => Ok(Some(b.to_string())),
            Some(other) => Err(Error::InvalidAction(format!(
                "{}: expected a scalar value, got {}",
                self.field_id, other
            ))),
        }
    }

    /// Pick the handler family. Analyzer widget type wins over declared type.
    pub fn family(&self) -> HandlerFamily {
        if let Some(element) = self.element() {
            return element.widget_type.family();
        }
        self.field_type
            .as_deref()
            .map(HandlerFamily::for_field_type)
            .unwrap_or(HandlerFamily::Text)
    }
}

/// Handler family an action is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerFamily {
    Text,
    Select,
    Typeahead,
    Toggle,
    Upload,
    Click,
}

impl HandlerFamily {
    /// Map a declared field type to its family. Unknown types are text.
    pub fn for_field_type(field_type: &str) -> Self {
        match field_type.trim().to_lowercase().as_str() {
            "select" | "dropdown" | "degree" | "discipline" | "gender" | "race" | "ethnicity"
            | "veteran" | "disability" | "demographic" | "hispanic" => HandlerFamily::Select,
            "typeahead" | "autocomplete" | "combobox" | "school" | "location" => {
                HandlerFamily::Typeahead
            }
            "checkbox" | "radio" => HandlerFamily::Toggle,
            "file" | "upload" | "resume" | "cover_letter" => HandlerFamily::Upload,
            "click" | "button" => HandlerFamily::Click,
            _ => HandlerFamily::Text,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HandlerFamily::Text => "text",
            HandlerFamily::Select => "select",
            HandlerFamily::Typeahead => "typeahead",
            HandlerFamily::Toggle => "toggle",
            HandlerFamily::Upload => "upload",
            HandlerFamily::Click => "click",
        }
    }
}

impl fmt::Display for HandlerFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Where an action lands: logical selector plus owning frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub selector: String,
    pub frame_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TextAction {
    pub target: Target,
    pub value: String,
    pub widget: WidgetType,
    pub element: Option<ElementData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleKind {
    /// Radios are only ever driven to checked.
    Radio,
    Checkbox { checked: bool },
}

#[derive(Debug, Clone)]
pub struct ToggleAction {
    pub target: Target,
    pub kind: ToggleKind,
}

#[derive(Debug, Clone)]
pub struct SelectAction {
    pub target: Target,
    pub value: String,
    /// Known widget type; probed from the DOM when absent.
    pub widget: Option<WidgetType>,
    pub field_type: Option<String>,
    pub element: Option<ElementData>,
}

#[derive(Debug, Clone)]
pub struct TypeaheadAction {
    pub target: Target,
    pub value: String,
    pub field_type: Option<String>,
    pub field_name: Option<String>,
    pub element: Option<ElementData>,
}

#[derive(Debug, Clone)]
pub struct UploadAction {
    pub target: Target,
    /// `None` means nothing to upload.
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ClickAction {
    pub target: Target,
    pub element: Option<ElementData>,
}

/// A validated action, one variant per handler family.
#[derive(Debug, Clone)]
pub enum FieldAction {
    Text(TextAction),
    Toggle(ToggleAction),
    Select(SelectAction),
    Typeahead(TypeaheadAction),
    Upload(UploadAction),
    Click(ClickAction),
}

impl FieldAction {
    /// Validate a planner record. `Ok(None)` means the action is skipped.
    pub fn from_context(ctx: &ActionContext) -> Result<Option<FieldAction>> {
        if ctx.field_id.trim().is_empty() {
            return Err(Error::InvalidAction("field_id is required".into()));
        }

        let target = Target {
            selector: ctx.field_id.trim().to_string(),
            frame_id: ctx.frame_id.clone().filter(|f| !f.trim().is_empty()),
        };
        let element = ctx.element().cloned();

        let action = match ctx.family() {
            HandlerFamily::Toggle => {
                let radio = element
                    .as_ref()
                    .map(|e| e.widget_type == WidgetType::RadioButton)
                    .unwrap_or_else(|| {
                        ctx.field_type
                            .as_deref()
                            .is_some_and(|t| t.eq_ignore_ascii_case("radio"))
                    });
                let kind = if radio {
                    ToggleKind::Radio
                } else {
                    ToggleKind::Checkbox {
                        checked: checkbox_target(ctx.field_value.as_ref()),
                    }
                };
                FieldAction::Toggle(ToggleAction { target, kind })
            }
            HandlerFamily::Click => FieldAction::Click(ClickAction { target, element }),
            HandlerFamily::Upload => FieldAction::Upload(UploadAction {
                target,
                file: ctx.scalar_text()?.map(PathBuf::from),
            }),
            family => {
                let Some(value) = ctx.scalar_text()? else {
                    return Ok(None);
                };
                match family {
                    HandlerFamily::Select => FieldAction::Select(SelectAction {
                        target,
                        value,
                        widget: element.as_ref().map(|e| e.widget_type),
                        field_type: ctx.field_type.clone(),
                        element,
                    }),
                    HandlerFamily::Typeahead => FieldAction::Typeahead(TypeaheadAction {
                        target,
                        value,
                        field_type: ctx.field_type.clone(),
                        field_name: ctx.options.field_name.clone(),
                        element,
                    }),
                    _ => FieldAction::Text(TextAction {
                        target,
                        value,
                        widget: element
                            .as_ref()
                            .map(|e| e.widget_type)
                            .unwrap_or(WidgetType::TextInput),
                        element,
                    }),
                }
            }
        };
        Ok(Some(action))
    }

    pub fn family(&self) -> HandlerFamily {
        match self {
            FieldAction::Text(_) => HandlerFamily::Text,
            FieldAction::Toggle(_) => HandlerFamily::Toggle,
            FieldAction::Select(_) => HandlerFamily::Select,
            FieldAction::Typeahead(_) => HandlerFamily::Typeahead,
            FieldAction::Upload(_) => HandlerFamily::Upload,
            FieldAction::Click(_) => HandlerFamily::Click,
        }
    }

    pub fn target(&self) -> &Target {
        match self {
            FieldAction::Text(a) => &a.target,
            FieldAction::Toggle(a) => &a.target,
            FieldAction::Select(a) => &a.target,
            FieldAction::Typeahead(a) => &a.target,
            FieldAction::Upload(a) => &a.target,
            FieldAction::Click(a) => &a.target,
        }
    }
}

const TRUTHY: &[&str] = &["true", "yes", "1", "on", "checked"];

/// Desired checkbox state for a plan value. Absent means check.
pub fn checkbox_target(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => TRUTHY.contains(&s.trim().to_lowercase().as_str()),
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_checkbox_target() {
        assert!(checkbox_target(None));
        assert!(!checkbox_target(Some(&json!("no"))));
        assert!(checkbox_target(Some(&json!("On"))));
        assert!(checkbox_target(Some(&json!(" YES "))));
        assert!(checkbox_target(Some(&json!({"consent": true}))));
        assert!(!checkbox_target(Some(&json!("maybe"))));
        assert!(!checkbox_target(Some(&json!(0))));
        assert!(checkbox_target(Some(&json!(true))));
    }

    #[test]
    fn test_family_from_field_type() {
        assert_eq!(HandlerFamily::for_field_type("email"), HandlerFamily::Text);
        assert_eq!(HandlerFamily::for_field_type("Gender"), HandlerFamily::Select);
        assert_eq!(HandlerFamily::for_field_type("school"), HandlerFamily::Typeahead);
        assert_eq!(HandlerFamily::for_field_type("resume"), HandlerFamily::Upload);
        assert_eq!(HandlerFamily::for_field_type("radio"), HandlerFamily::Toggle);
        assert_eq!(HandlerFamily::for_field_type("button"), HandlerFamily::Click);
        assert_eq!(HandlerFamily::for_field_type("favorite_color"), HandlerFamily::Text);
    }

    #[test]
    fn test_widget_type_wins_over_field_type() {
        let ctx = ActionContext::new("#school", "MIT")
            .with_field_type("school")
            .with_element(ElementData::new(WidgetType::CustomSelect));
        assert_eq!(ctx.family(), HandlerFamily::Select);
    }

    #[test]
    fn test_blank_value_skips_text() {
        let ctx = ActionContext::new("#first_name", "   ").with_field_type("text");
        assert!(FieldAction::from_context(&ctx).unwrap().is_none());

        let ctx = ActionContext::bare("#first_name");
        assert!(FieldAction::from_context(&ctx).unwrap().is_none());
    }

    #[test]
    fn test_empty_upload_is_not_skipped() {
        let ctx = ActionContext::new("#resume", "").with_field_type("resume");
        match FieldAction::from_context(&ctx).unwrap() {
            Some(FieldAction::Upload(a)) => assert!(a.file.is_none()),
            other => panic!("expected upload, got {:?}", other),
        }
    }

    #[test]
    fn test_radio_from_element() {
        let ctx = ActionContext::new("#veteran_no", "No")
            .with_element(ElementData::new(WidgetType::RadioButton));
        match FieldAction::from_context(&ctx).unwrap() {
            Some(FieldAction::Toggle(a)) => assert_eq!(a.kind, ToggleKind::Radio),
            other => panic!("expected toggle, got {:?}", other),
        }
    }

    #[test]
    fn test_checkbox_without_value_checks() {
        let ctx = ActionContext::bare("#terms").with_field_type("checkbox");
        match FieldAction::from_context(&ctx).unwrap() {
            Some(FieldAction::Toggle(a)) => {
                assert_eq!(a.kind, ToggleKind::Checkbox { checked: true })
            }
            other => panic!("expected toggle, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_field_id_is_invalid() {
        let ctx = ActionContext::new("", "x");
        assert!(matches!(
            FieldAction::from_context(&ctx),
            Err(Error::InvalidAction(_))
        ));
    }

    #[test]
    fn test_list_value_is_invalid() {
        let ctx = ActionContext::new("#skills", json!(["rust", "go"])).with_field_type("text");
        assert!(FieldAction::from_context(&ctx).is_err());
    }

    #[test]
    fn test_numbers_render_as_text() {
        let ctx = ActionContext::new("#years", 5).with_field_type("number");
        match FieldAction::from_context(&ctx).unwrap() {
            Some(FieldAction::Text(a)) => assert_eq!(a.value, "5"),
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn test_deserialize_value_alias() {
        let ctx: ActionContext = serde_json::from_value(json!({
            "field_id": "#city",
            "value": "Berkeley, CA",
            "field_type": "location",
            "options": {"element_data": {"widget_type": "autocomplete", "label_text": "City"}}
        }))
        .unwrap();
        assert_eq!(ctx.field_value, Some(json!("Berkeley, CA")));
        assert_eq!(ctx.family(), HandlerFamily::Typeahead);
    }
}
