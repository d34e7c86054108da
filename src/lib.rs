//! # formwright
//!
//! Form interaction engine. Given a plan of field assignments, it locates each
//! widget (across iframes), drives it with a per-widget strategy, and verifies
//! that the value actually took effect.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use formwright::{ActionContext, ActionExecutor, ExecutorConfig, Toolkit};
//! use formwright::browser::EokaSession;
//! use formwright::oracle::OfflineOracle;
//!
//! # #[tokio::main]
//! # async fn main() -> formwright::Result<()> {
//! let browser = eoka::Browser::launch().await?;
//! let page = browser.new_page("https://example.com/apply").await?;
//!
//! let toolkit = Toolkit::new(
//!     Arc::new(EokaSession::new(page)),
//!     Arc::new(OfflineOracle::default()),
//! );
//! let executor = ActionExecutor::new(toolkit, ExecutorConfig::default());
//!
//! let plan = vec![ActionContext::new("#first_name", "Ada").with_field_type("text")];
//! let summary = executor.execute_plan(&plan).await;
//! println!("{}", summary);
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod context;
pub mod executor;
pub mod frame;
pub mod handlers;
pub mod locator;
pub mod matching;
pub mod observe;
pub mod oracle;
pub mod strategy;
pub mod verify;

pub use context::{ActionContext, ElementData, FieldAction, WidgetType};
pub use executor::{ActionExecutor, ActionOutcome, ExecutionSummary, ExecutorConfig, Outcome};
pub use frame::{FormFrame, FrameProvider};
pub use handlers::{Timings, Toolkit};
pub use matching::MatchResult;
pub use strategy::{Strategy, StrategySelector};

/// Result type for formwright operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while locating or operating form widgets.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("frame not found: {0}")]
    FrameNotFound(String),

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("action failed on '{selector}': {cause}")]
    ActionExecution { selector: String, cause: String },

    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("script error: {0}")]
    Script(String),

    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap an error as a handler-level failure on `selector`.
    ///
    /// Errors that already are [`Error::ActionExecution`] pass through unchanged.
    pub fn action(selector: &str, err: Error) -> Self {
        match err {
            Error::ActionExecution { .. } => err,
            other => Error::ActionExecution {
                selector: selector.to_string(),
                cause: other.to_string(),
            },
        }
    }
}
