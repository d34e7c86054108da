use crate::config::{BrowserConfig, OracleProvider, OracleSettings, Plan};
use crate::Result;
use eoka::{Browser, Page};
use formwright::browser::EokaSession;
use formwright::oracle::{AnthropicOracle, OfflineOracle, Oracle};
use formwright::{ActionExecutor, ExecutionSummary, Toolkit};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Settle time after navigation before the first field is touched.
const LOAD_SETTLE_MS: u64 = 1000;

/// Result of running a plan.
#[derive(Debug)]
pub struct RunResult {
    /// Every field filled or skipped, none failed.
    pub success: bool,
    pub summary: ExecutionSummary,
    /// Total duration in milliseconds, navigation included.
    pub duration_ms: u64,
}

/// Build the oracle a plan asks for. Falls back to offline without an API key.
pub fn build_oracle(settings: &OracleSettings) -> Arc<dyn Oracle> {
    match settings.provider {
        OracleProvider::Offline => Arc::new(OfflineOracle),
        OracleProvider::Anthropic => match AnthropicOracle::from_env(settings.config.clone()) {
            Ok(oracle) => {
                info!("Using oracle model {}", settings.config.model);
                Arc::new(oracle)
            }
            Err(e) => {
                warn!("Oracle unavailable ({}), using local defaults", e);
                Arc::new(OfflineOracle)
            }
        },
    }
}

/// Drives one browser through fill plans.
pub struct Runner {
    browser: Browser,
    page: Arc<Mutex<Page>>,
}

impl Runner {
    /// Launch a browser with the plan's browser config.
    pub async fn new(config: &BrowserConfig) -> Result<Self> {
        let stealth = eoka::StealthConfig {
            headless: config.headless,
            proxy: config.proxy.clone(),
            user_agent: config.user_agent.clone(),
            viewport_width: config.viewport.as_ref().map(|v| v.width).unwrap_or(1280),
            viewport_height: config.viewport.as_ref().map(|v| v.height).unwrap_or(720),
            ..Default::default()
        };

        debug!(
            "Launching browser (headless: {}, proxy: {:?})",
            config.headless, config.proxy
        );
        let browser = Browser::launch_with_config(stealth).await?;
        let page = browser.new_page("about:blank").await?;

        Ok(Self {
            browser,
            page: Arc::new(Mutex::new(page)),
        })
    }

    /// Navigate to the plan's target and fill every field.
    pub async fn run(&mut self, plan: &Plan, oracle: Arc<dyn Oracle>) -> Result<RunResult> {
        let start = Instant::now();
        {
            let page = self.page.lock().await;
            info!("Navigating to: {}", plan.target.url);
            page.goto(&plan.target.url).await?;
            page.wait(LOAD_SETTLE_MS).await;
        }

        let session = EokaSession::shared(Arc::clone(&self.page));
        let toolkit = Toolkit::new(Arc::new(session), oracle)
            .with_timings(plan.execution.timings.clone());
        let executor = ActionExecutor::new(toolkit, plan.execution.executor.clone());
        let summary = executor.execute_plan(&plan.fields).await;

        Ok(RunResult {
            success: summary.is_success(),
            summary,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Save a PNG of the current page.
    pub async fn screenshot(&self, path: &Path) -> Result<()> {
        let data = self.page.lock().await.screenshot().await?;
        std::fs::write(path, data)?;
        Ok(())
    }

    pub async fn close(self) -> Result<()> {
        self.browser.close().await?;
        Ok(())
    }
}
