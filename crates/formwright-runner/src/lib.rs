//! # formwright-runner
//!
//! Fill job-application forms from a YAML plan.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use formwright_runner::{build_oracle, Plan, Runner};
//!
//! # #[tokio::main]
//! # async fn main() -> formwright_runner::Result<()> {
//! let plan = Plan::load("application.yaml")?;
//! let mut runner = Runner::new(&plan.browser).await?;
//! let result = runner.run(&plan, build_oracle(&plan.oracle)).await?;
//! println!("{}", result.summary);
//! runner.close().await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod runner;

pub use config::{
    BrowserConfig, Execution, OracleProvider, OracleSettings, ParamDef, Params, Plan, TargetUrl,
    Viewport,
};
pub use runner::{build_oracle, RunResult, Runner};

/// Result type for formwright-runner operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during plan loading or execution.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),

    #[error("engine error: {0}")]
    Engine(#[from] formwright::Error),
}
