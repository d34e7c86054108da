//! `eoka`-backed interaction primitives.
//!
//! Every primitive is a script evaluated in the page and scoped to the
//! resolved frame's document. Main-frame clicks and keystrokes go through
//! eoka's input pipeline instead, so they look like real user input.

mod scripts;

use async_trait::async_trait;
use eoka::Page;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::context::ElementData;
use crate::frame::{
    FormFrame, FrameProvider, OptionChoice, Scope, StyleSnapshot, TextMatch, UploadFile,
};
use crate::observe::{Inspection, INSPECT_JS};
use crate::{Error, Result};

/// Script reply envelope produced by the frame wrapper.
#[derive(Debug, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Reply {
    Ok { value: Value },
    Missing { selector: String },
    FrameMissing,
    Error { message: String },
}

fn build_script(body: &str, arg: &Value) -> String {
    scripts::FRAME_WRAPPER
        .replace("__BODY__", body)
        .replace("__ARG__", &arg.to_string())
}

fn file_arg(file: &UploadFile) -> Value {
    json!({ "name": file.name, "mime": file.mime, "data": file.data })
}

/// One page shared by every frame handle.
#[derive(Clone)]
pub struct EokaSession {
    page: Arc<Mutex<Page>>,
}

impl EokaSession {
    pub fn new(page: Page) -> Self {
        Self::shared(Arc::new(Mutex::new(page)))
    }

    /// Wrap a page that is also used elsewhere (navigation, screenshots).
    pub fn shared(page: Arc<Mutex<Page>>) -> Self {
        Self { page }
    }

    pub fn main_frame(&self) -> EokaFrame {
        EokaFrame {
            page: Arc::clone(&self.page),
            frame_id: None,
        }
    }
}

#[async_trait]
impl FrameProvider for EokaSession {
    async fn frame(&self, frame_id: Option<&str>) -> Result<Arc<dyn FormFrame>> {
        let frame = EokaFrame {
            page: Arc::clone(&self.page),
            frame_id: frame_id.map(str::to_string),
        };
        if frame.frame_id.is_some() {
            let _: bool = frame.run(scripts::PROBE, json!({})).await?;
        }
        Ok(Arc::new(frame))
    }
}

/// A document context: the top-level page or a same-origin iframe.
pub struct EokaFrame {
    page: Arc<Mutex<Page>>,
    frame_id: Option<String>,
}

impl EokaFrame {
    fn is_main(&self) -> bool {
        self.frame_id.is_none()
    }

    /// Evaluate `body` in this frame with `arg` merged into the script argument.
    async fn run<T: DeserializeOwned>(&self, body: &str, mut arg: Value) -> Result<T> {
        if let Value::Object(map) = &mut arg {
            map.insert("frame".into(), json!(self.frame_id));
        }
        let js = build_script(body, &arg);
        let raw: String = {
            let page = self.page.lock().await;
            page.evaluate(&js).await?
        };
        let reply: Reply = serde_json::from_str(&raw)
            .map_err(|e| Error::Script(format!("unreadable reply: {}", e)))?;
        match reply {
            Reply::Ok { value } => serde_json::from_value(value)
                .map_err(|e| Error::Script(format!("unexpected result: {}", e))),
            Reply::Missing { selector } => Err(Error::ElementNotFound(selector)),
            Reply::FrameMissing => Err(Error::FrameNotFound(
                self.frame_id.clone().unwrap_or_default(),
            )),
            Reply::Error { message } => Err(Error::Script(message)),
        }
    }

    async fn on(&self, body: &str, selector: &str) -> Result<()> {
        let _: bool = self.run(body, json!({ "sel": selector })).await?;
        Ok(())
    }
}

#[async_trait]
impl FormFrame for EokaFrame {
    fn name(&self) -> &str {
        self.frame_id.as_deref().unwrap_or("main")
    }

    async fn is_visible(&self, selector: &str) -> Result<bool> {
        self.run(scripts::IS_VISIBLE, json!({ "sel": selector })).await
    }

    async fn scroll_into_view(&self, selector: &str) -> Result<()> {
        self.on(scripts::SCROLL_INTO_VIEW, selector).await
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        self.run(scripts::COUNT, json!({ "sel": selector })).await
    }

    async fn location(&self) -> Result<String> {
        self.run(scripts::LOCATION, json!({})).await
    }

    async fn click(&self, selector: &str) -> Result<()> {
        if !self.is_main() {
            return self.on(scripts::CLICK, selector).await;
        }
        let page = self.page.lock().await;
        page.click(selector).await?;
        Ok(())
    }

    async fn js_click(&self, selector: &str) -> Result<()> {
        self.on(scripts::JS_CLICK, selector).await
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        let _: bool = self
            .run(scripts::FILL, json!({ "sel": selector, "value": value }))
            .await?;
        Ok(())
    }

    async fn clear(&self, selector: &str) -> Result<()> {
        self.fill(selector, "").await
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        self.on(scripts::FOCUS, selector).await?;
        let page = self.page.lock().await;
        page.type_text(text).await?;
        Ok(())
    }

    async fn press_key(&self, selector: Option<&str>, key: &str) -> Result<()> {
        if let Some(selector) = selector {
            self.on(scripts::FOCUS, selector).await?;
        }
        let page = self.page.lock().await;
        page.human().press_key(key).await?;
        Ok(())
    }

    async fn set_checked(&self, selector: &str, checked: bool) -> Result<()> {
        let ok: bool = self
            .run(
                scripts::SET_CHECKED,
                json!({ "sel": selector, "checked": checked }),
            )
            .await?;
        if ok {
            Ok(())
        } else {
            Err(Error::Script(format!(
                "{} did not become {}",
                selector,
                if checked { "checked" } else { "unchecked" }
            )))
        }
    }

    async fn select_option(&self, selector: &str, choice: OptionChoice<'_>) -> Result<bool> {
        let (by, value) = match choice {
            OptionChoice::Label(v) => ("label", v),
            OptionChoice::Value(v) => ("value", v),
        };
        self.run(
            scripts::SELECT_OPTION,
            json!({ "sel": selector, "by": by, "choice": value }),
        )
        .await
    }

    async fn native_options(&self, selector: &str) -> Result<Vec<String>> {
        self.run(scripts::NATIVE_OPTIONS, json!({ "sel": selector }))
            .await
    }

    async fn input_value(&self, selector: &str) -> Result<Option<String>> {
        self.run(scripts::INPUT_VALUE, json!({ "sel": selector })).await
    }

    async fn selected_text(&self, selector: &str) -> Result<Option<String>> {
        self.run(scripts::SELECTED_TEXT, json!({ "sel": selector }))
            .await
    }

    async fn text_content(&self, selector: &str) -> Result<Option<String>> {
        self.run(scripts::TEXT_CONTENT, json!({ "sel": selector }))
            .await
    }

    async fn option_texts(&self, option_selector: &str, scope: Scope<'_>) -> Result<Vec<String>> {
        let near = match scope {
            Scope::Near(trigger) => Some(trigger),
            Scope::Global => None,
        };
        self.run(
            scripts::OPTION_TEXTS,
            json!({ "css": option_selector, "near": near }),
        )
        .await
    }

    async fn find_by_text(&self, css: &str, text: &str, mode: TextMatch) -> Result<Vec<String>> {
        self.run(
            scripts::FIND_BY_TEXT,
            json!({ "css": css, "text": text, "exact": mode == TextMatch::Exact }),
        )
        .await
    }

    async fn set_files(
        &self,
        selector: &str,
        file: &UploadFile,
        require_visible: bool,
    ) -> Result<()> {
        let delivered: usize = self
            .run(
                scripts::SET_FILES,
                json!({
                    "sel": selector,
                    "file": file_arg(file),
                    "require_visible": require_visible,
                }),
            )
            .await?;
        debug!("{} now holds {} file(s)", selector, delivered);
        Ok(())
    }

    async fn force_visible(&self, selector: &str) -> Result<StyleSnapshot> {
        let original: String = self
            .run(scripts::FORCE_VISIBLE, json!({ "sel": selector }))
            .await?;
        Ok(StyleSnapshot(original))
    }

    async fn restore_style(&self, selector: &str, snapshot: &StyleSnapshot) -> Result<()> {
        let _: bool = self
            .run(
                scripts::RESTORE_STYLE,
                json!({ "sel": selector, "style": snapshot.0 }),
            )
            .await?;
        Ok(())
    }

    async fn upload_via_trigger(
        &self,
        trigger: &str,
        input: &str,
        file: &UploadFile,
    ) -> Result<bool> {
        let target: Option<String> = self
            .run(
                scripts::UPLOAD_VIA_TRIGGER,
                json!({ "trigger": trigger, "input": input, "file": file_arg(file) }),
            )
            .await?;
        match target.as_deref() {
            None => Ok(false),
            Some("expected") => Ok(true),
            Some(_) => {
                debug!("{} activated a file input other than {}", trigger, input);
                Ok(true)
            }
        }
    }

    async fn describe(&self, selector: &str) -> Result<Option<ElementData>> {
        let inspection: Option<Inspection> =
            self.run(INSPECT_JS, json!({ "sel": selector })).await?;
        Ok(inspection.map(|i| i.into_element(selector)))
    }
}
