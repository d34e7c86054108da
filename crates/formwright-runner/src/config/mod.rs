pub mod params;
pub mod plan;

pub use params::{ParamDef, Params};
pub use plan::{BrowserConfig, Execution, OracleProvider, OracleSettings, Plan, TargetUrl, Viewport};
