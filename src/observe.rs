//! Element inspection: describe one form control so matching has context.

use serde::Deserialize;

use crate::context::{ElementData, WidgetType};
use crate::matching::truncate_chars;

const HTML_SNIPPET_LIMIT: usize = 300;
const LABEL_LIMIT: usize = 200;

/// Script body run inside the frame wrapper; reads `arg.sel`.
pub(crate) const INSPECT_JS: &str = r#"
    const el = doc.querySelector(arg.sel);
    if (!el) return null;

    function getLabel(el) {
        const aria = el.getAttribute('aria-label');
        if (aria) return aria.trim();
        if (el.id) {
            const label = doc.querySelector('label[for=' + JSON.stringify(el.id) + ']');
            if (label) return label.textContent.trim();
        }
        const parentLabel = el.closest('label');
        if (parentLabel) {
            const clone = parentLabel.cloneNode(true);
            clone.querySelectorAll('input, select, textarea').forEach(c => c.remove());
            const t = clone.textContent.trim();
            if (t) return t;
        }
        const labelledBy = el.getAttribute('aria-labelledby');
        if (labelledBy) {
            const text = labelledBy.split(/\s+/)
                .map(id => doc.getElementById(id))
                .filter(Boolean)
                .map(l => l.textContent.trim())
                .join(' ');
            if (text) return text;
        }
        const prev = el.previousElementSibling;
        if (prev && prev.tagName === 'LABEL') return prev.textContent.trim();
        const fieldset = el.closest('fieldset');
        const legend = fieldset && fieldset.querySelector('legend');
        if (legend) return legend.textContent.trim();
        return el.getAttribute('placeholder') || el.getAttribute('name') || '';
    }

    const tag = el.tagName.toLowerCase();
    const options = tag === 'select' && el.options
        ? Array.from(el.options).map(o => o.text.trim()).filter(t => t)
        : [];
    return {
        tag,
        input_type: tag === 'input' ? (el.getAttribute('type') || 'text').toLowerCase() : null,
        role: el.getAttribute('role'),
        aria_autocomplete: el.getAttribute('aria-autocomplete'),
        aria_haspopup: el.getAttribute('aria-haspopup'),
        contenteditable: el.isContentEditable === true,
        class_name: typeof el.className === 'string' ? el.className : '',
        label: getLabel(el).replace(/\s+/g, ' '),
        html: el.outerHTML.substring(0, 600),
        options,
    };
"#;

/// Raw facts about one element, as read from the DOM.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Inspection {
    pub tag: String,
    #[serde(default)]
    pub input_type: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub aria_autocomplete: Option<String>,
    #[serde(default)]
    pub aria_haspopup: Option<String>,
    #[serde(default)]
    pub contenteditable: bool,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub options: Vec<String>,
}

impl Inspection {
    /// Classify the element into a widget type.
    pub fn widget_type(&self) -> WidgetType {
        let tag = self.tag.to_lowercase();
        let role = self.role.as_deref().unwrap_or("").to_lowercase();
        let class = self.class_name.to_lowercase();
        let autocompletes = matches!(
            self.aria_autocomplete.as_deref(),
            Some("list") | Some("both") | Some("inline")
        );
        let popup_list = matches!(self.aria_haspopup.as_deref(), Some("listbox") | Some("true"));

        match tag.as_str() {
            "select" => return WidgetType::StandardSelect,
            "textarea" => return WidgetType::TextArea,
            "button" => return WidgetType::Button,
            "input" => {
                return match self.input_type.as_deref().unwrap_or("text") {
                    "file" => WidgetType::FileInput,
                    "checkbox" => WidgetType::Checkbox,
                    "radio" => WidgetType::RadioButton,
                    "email" => WidgetType::Email,
                    "tel" => WidgetType::Tel,
                    "url" => WidgetType::Url,
                    "date" => WidgetType::Date,
                    "submit" | "button" | "reset" | "image" => WidgetType::Button,
                    _ if role == "combobox" || autocompletes || popup_list => {
                        WidgetType::Autocomplete
                    }
                    _ if class.contains("autocomplete") || class.contains("typeahead") => {
                        WidgetType::Autocomplete
                    }
                    _ => WidgetType::TextInput,
                };
            }
            _ => {}
        }

        if self.contenteditable {
            return WidgetType::RichTextEditor;
        }
        match role.as_str() {
            "checkbox" | "switch" => WidgetType::Checkbox,
            "radio" => WidgetType::RadioButton,
            "button" if !popup_list => WidgetType::Button,
            "combobox" | "listbox" => WidgetType::CustomSelect,
            "textbox" => WidgetType::TextInput,
            _ if popup_list || class.contains("select") || class.contains("dropdown") => {
                WidgetType::CustomSelect
            }
            _ => WidgetType::TextInput,
        }
    }

    /// Build an [`ElementData`] for `selector`.
    pub fn into_element(self, selector: &str) -> ElementData {
        let mut element = ElementData::new(self.widget_type());
        element.tag_name = self.tag.to_lowercase();
        element.role = self.role.filter(|r| !r.is_empty());
        element.label_text = truncate_chars(self.label.trim(), LABEL_LIMIT);
        element.selector = selector.to_string();
        element.html_snippet = truncate_chars(&self.html, HTML_SNIPPET_LIMIT);
        element.options = self.options;
        element
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(kind: &str) -> Inspection {
        Inspection {
            tag: "input".into(),
            input_type: Some(kind.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_classify_native_controls() {
        assert_eq!(input("text").widget_type(), WidgetType::TextInput);
        assert_eq!(input("email").widget_type(), WidgetType::Email);
        assert_eq!(input("file").widget_type(), WidgetType::FileInput);
        assert_eq!(input("radio").widget_type(), WidgetType::RadioButton);
        assert_eq!(input("submit").widget_type(), WidgetType::Button);

        let select = Inspection {
            tag: "SELECT".into(),
            ..Default::default()
        };
        assert_eq!(select.widget_type(), WidgetType::StandardSelect);
    }

    #[test]
    fn test_classify_combobox_input_as_autocomplete() {
        let mut i = input("text");
        i.role = Some("combobox".into());
        assert_eq!(i.widget_type(), WidgetType::Autocomplete);

        let mut i = input("text");
        i.aria_autocomplete = Some("list".into());
        assert_eq!(i.widget_type(), WidgetType::Autocomplete);
    }

    #[test]
    fn test_classify_custom_widgets() {
        let div = |role: Option<&str>, class: &str| Inspection {
            tag: "div".into(),
            role: role.map(Into::into),
            class_name: class.into(),
            ..Default::default()
        };
        assert_eq!(div(Some("listbox"), "").widget_type(), WidgetType::CustomSelect);
        assert_eq!(div(None, "select__control").widget_type(), WidgetType::CustomSelect);
        assert_eq!(div(Some("checkbox"), "").widget_type(), WidgetType::Checkbox);
        assert_eq!(div(Some("button"), "").widget_type(), WidgetType::Button);

        let editor = Inspection {
            tag: "div".into(),
            contenteditable: true,
            ..Default::default()
        };
        assert_eq!(editor.widget_type(), WidgetType::RichTextEditor);
    }

    #[test]
    fn test_into_element_bounds_snippet() {
        let i = Inspection {
            tag: "SELECT".into(),
            label: "  Degree ".into(),
            html: "x".repeat(600),
            options: vec!["Bachelor's".into(), "Master's".into()],
            ..Default::default()
        };
        let e = i.into_element("#degree");
        assert_eq!(e.widget_type, WidgetType::StandardSelect);
        assert_eq!(e.tag_name, "select");
        assert_eq!(e.label_text, "Degree");
        assert_eq!(e.html_snippet.chars().count(), HTML_SNIPPET_LIMIT);
        assert_eq!(e.options.len(), 2);
    }
}
