//! Per-widget action handlers.
//!
//! Each handler drives one widget family to a target value and reports
//! `Ok(true)` for verified success, `Ok(false)` for "handled but not
//! confirmed", and an [`Error::ActionExecution`] when it could not attempt
//! the action at all.

pub mod click;
pub mod dropdown;
pub mod select;
pub mod text;
pub mod toggle;
pub mod typeahead;
pub mod upload;

pub use click::ClickHandler;
pub use select::SelectHandler;
pub use text::TextHandler;
pub use toggle::ToggleHandler;
pub use typeahead::TypeaheadHandler;
pub use upload::{PlatformUpload, StandardUpload, UploadHandler, UploadStrategy};

use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::context::Target;
use crate::frame::{FormFrame, FrameProvider};
use crate::locator;
use crate::oracle::Oracle;
use crate::strategy::StrategySelector;
use crate::{Error, Result};

fn default_visibility_timeout_ms() -> u64 {
    5000
}

fn default_click_timeout_ms() -> u64 {
    10_000
}

fn default_pace() -> f64 {
    1.0
}

/// Bounded waits and settle pauses.
#[derive(Debug, Clone, Deserialize)]
pub struct Timings {
    /// How long to wait for an element to become visible.
    #[serde(default = "default_visibility_timeout_ms")]
    pub visibility_timeout_ms: u64,

    /// Upper bound for a single click.
    #[serde(default = "default_click_timeout_ms")]
    pub click_timeout_ms: u64,

    /// Multiplier for fixed settle pauses (option rendering, typing steps).
    /// 0 disables them.
    #[serde(default = "default_pace")]
    pub pace: f64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            visibility_timeout_ms: default_visibility_timeout_ms(),
            click_timeout_ms: default_click_timeout_ms(),
            pace: default_pace(),
        }
    }
}

impl Timings {
    /// No pauses and no waiting; for in-memory frames.
    pub fn instant() -> Self {
        Self {
            visibility_timeout_ms: 0,
            click_timeout_ms: 1000,
            pace: 0.0,
        }
    }

    /// Scale a nominal visibility wait by `pace`, capped at the configured timeout.
    pub fn visibility(&self, nominal_ms: u64) -> u64 {
        nominal_ms.min(self.visibility_timeout_ms)
    }

    /// Pause for `ms` scaled by `pace`.
    pub async fn settle(&self, ms: u64) {
        let scaled = (ms as f64 * self.pace.max(0.0)).round() as u64;
        if scaled > 0 {
            tokio::time::sleep(Duration::from_millis(scaled)).await;
        }
    }

    /// Run `fut`, failing with [`Error::Timeout`] after the click timeout.
    pub async fn bounded<T, F>(&self, what: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(Duration::from_millis(self.click_timeout_ms), fut).await {
            Ok(res) => res,
            Err(_) => Err(Error::Timeout(format!(
                "{} exceeded {}ms",
                what, self.click_timeout_ms
            ))),
        }
    }
}

/// What every handler shares: the page session, the strategy selector and timings.
#[derive(Clone)]
pub struct Toolkit {
    pub frames: Arc<dyn FrameProvider>,
    pub selector: Arc<StrategySelector>,
    pub timings: Timings,
}

impl Toolkit {
    pub fn new(frames: Arc<dyn FrameProvider>, oracle: Arc<dyn Oracle>) -> Self {
        Self {
            frames,
            selector: Arc::new(StrategySelector::new(oracle)),
            timings: Timings::default(),
        }
    }

    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    /// Resolve the target's frame and sanitize its selector.
    pub async fn locate(&self, target: &Target) -> Result<(Arc<dyn FormFrame>, String)> {
        let frame = locator::resolve_frame(self.frames.as_ref(), target.frame_id.as_deref()).await?;
        Ok((frame, locator::sanitize_selector(&target.selector)))
    }

    pub async fn ensure_visible(&self, frame: &dyn FormFrame, selector: &str) -> bool {
        locator::ensure_visible(frame, selector, self.timings.visibility_timeout_ms).await
    }

    /// Click with the configured timeout.
    pub async fn click(&self, frame: &dyn FormFrame, selector: &str) -> Result<()> {
        self.timings
            .bounded(&format!("click {}", selector), frame.click(selector))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timings_defaults() {
        let t: Timings = serde_json::from_str("{}").unwrap();
        assert_eq!(t.visibility_timeout_ms, 5000);
        assert_eq!(t.click_timeout_ms, 10_000);
        assert_eq!(t.pace, 1.0);
        assert_eq!(t.visibility(1500), 1500);
        assert_eq!(Timings::instant().visibility(1500), 0);
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let t = Timings {
            click_timeout_ms: 10,
            ..Timings::instant()
        };
        let res: Result<()> = t
            .bounded("slow", async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(())
            })
            .await;
        assert!(matches!(res, Err(Error::Timeout(_))));
    }

    #[tokio::test]
    async fn test_settle_zero_pace_returns_immediately() {
        let start = std::time::Instant::now();
        Timings::instant().settle(5000).await;
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
