//! File inputs. An ordered chain of upload strategies, first success wins.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::Toolkit;
use crate::context::UploadAction;
use crate::frame::{FormFrame, TextMatch, UploadFile};
use crate::{Error, Result};

/// Page markers of a hosted applicant-tracking form with its own upload buttons.
const PLATFORM_MARKERS: &[&str] = &[
    "meta[name='greenhouse-form']",
    "form[action*='greenhouse']",
    "[data-greenhouse-job-id]",
];

const PLATFORM_HOST: &str = "greenhouse.io";

/// One way of getting a file into an input.
#[async_trait]
pub trait UploadStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this strategy should be attempted in `frame`.
    async fn applies(&self, frame: &dyn FormFrame) -> bool;

    /// `Ok(false)` or an error both move the chain on to the next strategy.
    async fn upload(
        &self,
        tk: &Toolkit,
        frame: &dyn FormFrame,
        selector: &str,
        file: &UploadFile,
    ) -> Result<bool>;
}

/// Bare id of an `#id` or `[id='..']` selector.
fn id_of(selector: &str) -> Option<String> {
    if let Some(id) = selector.strip_prefix('#') {
        return Some(id.to_string());
    }
    selector
        .strip_prefix("[id='")
        .and_then(|rest| rest.strip_suffix("']"))
        .map(|id| id.replace("\\'", "'").replace("\\\\", "\\"))
}

/// Hosted-form uploads through the visible button next to a hidden input.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlatformUpload;

impl PlatformUpload {
    /// Trigger selectors for `selector`, in the order they are tried.
    async fn triggers(&self, frame: &dyn FormFrame, selector: &str) -> Vec<String> {
        let mut triggers = Vec::new();
        let id = id_of(selector);
        if let Some(id) = &id {
            triggers.push(format!("label[for='{}']", id));
        }
        triggers.push("button[data-qa='attach-button']".to_string());
        for text in ["Attach", "Upload"] {
            match frame.find_by_text("button", text, TextMatch::Contains).await {
                Ok(found) => triggers.extend(found.into_iter().take(1)),
                Err(e) => debug!("Looking for '{}' button failed: {}", text, e),
            }
        }
        triggers.push(format!("{} ~ label.upload-button", selector));
        triggers.push(format!("{} ~ .upload-file-button", selector));
        triggers.push(format!("{} ~ button.btn-file", selector));
        if let Some(id) = &id {
            triggers.push(format!("div[data-input='{}'] button", id));
        }
        triggers
    }
}

#[async_trait]
impl UploadStrategy for PlatformUpload {
    fn name(&self) -> &'static str {
        "platform"
    }

    async fn applies(&self, frame: &dyn FormFrame) -> bool {
        match frame.location().await {
            Ok(href) if href.contains(PLATFORM_HOST) => return true,
            Ok(_) => {}
            Err(e) => debug!("Could not read location: {}", e),
        }
        for marker in PLATFORM_MARKERS {
            if frame.count(marker).await.unwrap_or(0) > 0 {
                return true;
            }
        }
        false
    }

    async fn upload(
        &self,
        tk: &Toolkit,
        frame: &dyn FormFrame,
        selector: &str,
        file: &UploadFile,
    ) -> Result<bool> {
        for trigger in self.triggers(frame, selector).await {
            match frame.wait_visible(&trigger, tk.timings.visibility(2000)).await {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    debug!("Trigger {} check failed: {}", trigger, e);
                    continue;
                }
            }
            debug!("Trying upload trigger {}", trigger);
            match frame.upload_via_trigger(&trigger, selector, file).await {
                Ok(true) => {
                    info!("Uploaded {} through {}", file.name, trigger);
                    tk.timings.settle(2000).await;
                    return Ok(true);
                }
                Ok(false) => debug!("{} opened no file chooser", trigger),
                Err(e) => debug!("Upload through {} failed: {}", trigger, e),
            }
        }
        warn!("No usable upload button for {}", selector);
        Ok(false)
    }
}

/// Direct delivery into the input, visible or not.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardUpload;

impl StandardUpload {
    async fn with_forced_style(
        &self,
        frame: &dyn FormFrame,
        selector: &str,
        file: &UploadFile,
    ) -> Result<()> {
        let snapshot = frame.force_visible(selector).await?;
        let res = frame.set_files(selector, file, false).await;
        if let Err(e) = frame.restore_style(selector, &snapshot).await {
            warn!("Could not restore styles on {}: {}", selector, e);
        }
        res
    }
}

#[async_trait]
impl UploadStrategy for StandardUpload {
    fn name(&self) -> &'static str {
        "standard"
    }

    async fn applies(&self, _frame: &dyn FormFrame) -> bool {
        true
    }

    async fn upload(
        &self,
        tk: &Toolkit,
        frame: &dyn FormFrame,
        selector: &str,
        file: &UploadFile,
    ) -> Result<bool> {
        if frame.is_visible(selector).await.unwrap_or(false) {
            match frame.set_files(selector, file, true).await {
                Ok(()) => {
                    tk.timings.settle(1000).await;
                    return Ok(true);
                }
                Err(e) => debug!("Visible input upload failed on {}: {}", selector, e),
            }
        }

        match frame.set_files(selector, file, false).await {
            Ok(()) => {
                tk.timings.settle(1000).await;
                return Ok(true);
            }
            Err(e) => debug!("Direct upload failed on {}: {}", selector, e),
        }

        info!("Making {} visible for upload", selector);
        match self.with_forced_style(frame, selector, file).await {
            Ok(()) => {
                tk.timings.settle(1000).await;
                Ok(true)
            }
            Err(e) => {
                warn!("Upload failed on {} even when visible: {}", selector, e);
                Ok(false)
            }
        }
    }
}

pub struct UploadHandler {
    tk: Toolkit,
    strategies: Vec<Box<dyn UploadStrategy>>,
}

impl UploadHandler {
    pub fn new(tk: Toolkit) -> Self {
        Self {
            tk,
            strategies: vec![Box::new(PlatformUpload), Box::new(StandardUpload)],
        }
    }

    /// Replace the strategy chain.
    pub fn with_strategies(mut self, strategies: Vec<Box<dyn UploadStrategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    pub async fn handle(&self, action: &UploadAction) -> Result<bool> {
        let Some(path) = &action.file else {
            info!("No file for {}, nothing to upload", action.target.selector);
            return Ok(true);
        };
        self.run(action, path)
            .await
            .map_err(|e| Error::action(&action.target.selector, e))
    }

    async fn run(&self, action: &UploadAction, path: &std::path::Path) -> Result<bool> {
        let file = UploadFile::load(path).await?;
        let (frame, selector) = self.tk.locate(&action.target).await?;
        let frame = frame.as_ref();
        info!("Uploading {} into {}", file.path.display(), selector);

        for strategy in &self.strategies {
            if !strategy.applies(frame).await {
                debug!("Upload strategy '{}' does not apply", strategy.name());
                continue;
            }
            match strategy.upload(&self.tk, frame, &selector, &file).await {
                Ok(true) => {
                    info!("Uploaded {} with '{}'", file.name, strategy.name());
                    return Ok(true);
                }
                Ok(false) => warn!("Upload strategy '{}' failed, trying next", strategy.name()),
                Err(e) => warn!("Upload strategy '{}' errored: {}", strategy.name(), e),
            }
        }
        warn!("Every upload strategy failed for {}", selector);
        Ok(false)
    }
}
