//! Interaction primitives.
//!
//! A [`FormFrame`] is one document context (the page or a same-origin iframe).
//! Every primitive is scoped to that document and fails with a typed error
//! rather than blocking; bounded waits live in the callers.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::context::ElementData;
use crate::Result;

/// How a native `<option>` is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionChoice<'a> {
    /// Visible label, compared case-insensitively.
    Label(&'a str),
    /// The option's `value` attribute.
    Value(&'a str),
}

/// Text comparison used when locating elements by their text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMatch {
    Contains,
    Exact,
}

/// Where option texts are scraped from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    /// The dropdown container inferred from this trigger's ancestors.
    Near(&'a str),
    Global,
}

/// A file ready to be delivered into an `<input type=file>`.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub path: PathBuf,
    pub name: String,
    pub mime: String,
    /// Base64-encoded contents.
    pub data: String,
}

impl UploadFile {
    /// Read a file from disk.
    pub async fn load(path: &Path) -> Result<Self> {
        use base64::Engine as _;

        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self {
            path: path.to_path_buf(),
            mime: mime_guess::from_path(path)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
            name,
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        })
    }
}

/// Inline styles captured by [`FormFrame::force_visible`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleSnapshot(pub String);

/// Low-level, frame-scoped operations on form elements.
#[async_trait]
pub trait FormFrame: Send + Sync {
    /// Frame identifier, for logs.
    fn name(&self) -> &str;

    async fn is_visible(&self, selector: &str) -> Result<bool>;

    /// Poll until the element is visible or `timeout_ms` passes.
    async fn wait_visible(&self, selector: &str, timeout_ms: u64) -> Result<bool> {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            if self.is_visible(selector).await? {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    async fn scroll_into_view(&self, selector: &str) -> Result<()>;

    /// Number of elements matching `selector`.
    async fn count(&self, selector: &str) -> Result<usize>;

    /// `location.href` of this frame's document.
    async fn location(&self) -> Result<String>;

    async fn click(&self, selector: &str) -> Result<()>;

    /// `element.click()` from script, bypassing hit-testing.
    async fn js_click(&self, selector: &str) -> Result<()>;

    async fn fill(&self, selector: &str, value: &str) -> Result<()>;

    async fn clear(&self, selector: &str) -> Result<()>;

    /// Focus the element and send keystrokes.
    async fn type_text(&self, selector: &str, text: &str) -> Result<()>;

    /// Press a named key, on the focused element or on `selector` after focusing it.
    async fn press_key(&self, selector: Option<&str>, key: &str) -> Result<()>;

    async fn set_checked(&self, selector: &str, checked: bool) -> Result<()>;

    /// Choose a native option. `Ok(false)` when no option matches.
    async fn select_option(&self, selector: &str, choice: OptionChoice<'_>) -> Result<bool>;

    /// Labels of a native `<select>`'s options.
    async fn native_options(&self, selector: &str) -> Result<Vec<String>>;

    async fn input_value(&self, selector: &str) -> Result<Option<String>>;

    /// Text of the checked option of a native `<select>`.
    async fn selected_text(&self, selector: &str) -> Result<Option<String>>;

    async fn text_content(&self, selector: &str) -> Result<Option<String>>;

    /// Trimmed texts of visible elements matching `option_selector` within `scope`.
    async fn option_texts(&self, option_selector: &str, scope: Scope<'_>) -> Result<Vec<String>>;

    /// Selectors for each element matching `css` whose text matches `text`.
    async fn find_by_text(&self, css: &str, text: &str, mode: TextMatch) -> Result<Vec<String>>;

    /// Put `file` into the input. With `require_visible`, hidden inputs are an error.
    async fn set_files(&self, selector: &str, file: &UploadFile, require_visible: bool)
        -> Result<()>;

    /// Override inline styles so the element is rendered; returns the originals.
    async fn force_visible(&self, selector: &str) -> Result<StyleSnapshot>;

    async fn restore_style(&self, selector: &str, snapshot: &StyleSnapshot) -> Result<()>;

    /// Click `trigger`, capture the file input it activates and deliver `file` to it.
    /// `Ok(false)` when no chooser was opened.
    async fn upload_via_trigger(
        &self,
        trigger: &str,
        input: &str,
        file: &UploadFile,
    ) -> Result<bool>;

    /// Inspect the element and describe it.
    async fn describe(&self, selector: &str) -> Result<Option<ElementData>>;
}

/// Resolves frame identifiers to document contexts.
#[async_trait]
pub trait FrameProvider: Send + Sync {
    /// `None` is the main document. Fails with [`crate::Error::FrameNotFound`].
    async fn frame(&self, frame_id: Option<&str>) -> Result<Arc<dyn FormFrame>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_file_mime_types() {
        let dir = std::env::temp_dir().join("formwright-mime-test");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let cases = [
            ("resume.PDF", "application/pdf"),
            ("grades.csv", "text/csv"),
            ("portfolio.html", "text/html"),
            (
                "transcript.xlsx",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            ),
            ("samples.zip", "application/zip"),
            ("notes", "application/octet-stream"),
        ];
        for (name, expected) in cases {
            let path = dir.join(name);
            tokio::fs::write(&path, b"x").await.unwrap();
            let file = UploadFile::load(&path).await.unwrap();
            assert_eq!(file.mime, expected, "{}", name);
        }
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_upload_file_load() {
        let path = std::env::temp_dir().join("formwright-upload-test.txt");
        tokio::fs::write(&path, b"hello").await.unwrap();
        let file = UploadFile::load(&path).await.unwrap();
        assert_eq!(file.name, "formwright-upload-test.txt");
        assert_eq!(file.mime, "text/plain");
        assert_eq!(file.data, "aGVsbG8=");
        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_upload_file_missing() {
        let err = UploadFile::load(Path::new("/nonexistent/formwright.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
    }
}
