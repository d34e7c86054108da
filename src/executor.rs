//! Sequential plan execution.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::context::{ActionContext, FieldAction, HandlerFamily};
use crate::handlers::{
    ClickHandler, SelectHandler, TextHandler, ToggleHandler, Toolkit, TypeaheadHandler,
    UploadHandler, UploadStrategy,
};
use crate::Result;

fn default_continue_on_error() -> bool {
    true
}

fn default_action_delay_ms() -> u64 {
    100
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorConfig {
    /// Keep going after a failed action.
    #[serde(default = "default_continue_on_error")]
    pub continue_on_error: bool,

    /// Pause between consecutive actions.
    #[serde(default = "default_action_delay_ms")]
    pub action_delay_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            continue_on_error: default_continue_on_error(),
            action_delay_ms: default_action_delay_ms(),
        }
    }
}

/// What happened to one action.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Filled and verified.
    Filled,
    /// No value provided.
    Skipped,
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    pub field_id: String,
    /// `None` when the action was rejected before dispatch.
    pub family: Option<HandlerFamily>,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Result of running a plan.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionSummary {
    /// One entry per action that ran, in plan order.
    pub outcomes: Vec<ActionOutcome>,
    pub filled: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Number of actions in the plan, including any not reached.
    pub total: usize,
    #[serde(with = "millis")]
    pub elapsed: Duration,
}

mod millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}

impl ExecutionSummary {
    /// Filled actions over the whole plan, 0.0 for an empty plan.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.filled as f64 / self.total as f64
        }
    }

    /// True when nothing failed and every action was reached.
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.outcomes.len() == self.total
    }

    pub fn failures(&self) -> impl Iterator<Item = &ActionOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, Outcome::Failed { .. }))
    }
}

impl fmt::Display for ExecutionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}/{} filled, {} failed, {} skipped ({:.1}%) in {:.2}s",
            self.filled,
            self.total,
            self.failed,
            self.skipped,
            self.success_rate() * 100.0,
            self.elapsed.as_secs_f64()
        )?;
        for o in &self.outcomes {
            let family = o.family.map(|f| f.as_str()).unwrap_or("-");
            match &o.outcome {
                Outcome::Filled => writeln!(f, "  ok    {:<9} {}", family, o.field_id)?,
                Outcome::Skipped => writeln!(f, "  skip  {:<9} {}", family, o.field_id)?,
                Outcome::Failed { error } => {
                    writeln!(f, "  FAIL  {:<9} {}: {}", family, o.field_id, error)?
                }
            }
        }
        Ok(())
    }
}

/// Dispatches actions to the handler for their widget family.
pub struct ActionExecutor {
    config: ExecutorConfig,
    text: TextHandler,
    toggle: ToggleHandler,
    select: SelectHandler,
    typeahead: TypeaheadHandler,
    upload: UploadHandler,
    click: ClickHandler,
}

impl ActionExecutor {
    pub fn new(tk: Toolkit, config: ExecutorConfig) -> Self {
        Self {
            config,
            text: TextHandler::new(tk.clone()),
            toggle: ToggleHandler::new(tk.clone()),
            select: SelectHandler::new(tk.clone()),
            typeahead: TypeaheadHandler::new(tk.clone()),
            upload: UploadHandler::new(tk.clone()),
            click: ClickHandler::new(tk),
        }
    }

    /// Replace the upload strategy chain.
    pub fn with_upload_strategies(mut self, strategies: Vec<Box<dyn UploadStrategy>>) -> Self {
        self.upload = self.upload.with_strategies(strategies);
        self
    }

    /// Run one action. `Ok(None)` means it was skipped.
    pub async fn execute_action(&self, ctx: &ActionContext) -> Result<Option<bool>> {
        let Some(action) = FieldAction::from_context(ctx)? else {
            debug!("Skipping {}: no value", ctx.field_id);
            return Ok(None);
        };
        self.dispatch(&action).await.map(Some)
    }

    async fn dispatch(&self, action: &FieldAction) -> Result<bool> {
        match action {
            FieldAction::Text(a) => self.text.handle(a).await,
            FieldAction::Toggle(a) => self.toggle.handle(a).await,
            FieldAction::Select(a) => self.select.handle(a).await,
            FieldAction::Typeahead(a) => self.typeahead.handle(a).await,
            FieldAction::Upload(a) => self.upload.handle(a).await,
            FieldAction::Click(a) => self.click.handle(a).await,
        }
    }

    /// Run the plan in order and summarize.
    pub async fn execute_plan(&self, plan: &[ActionContext]) -> ExecutionSummary {
        let start = Instant::now();
        let total = plan.len();
        let mut outcomes = Vec::with_capacity(total);
        info!("Executing {} actions", total);

        for (i, ctx) in plan.iter().enumerate() {
            if i > 0 && self.config.action_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.action_delay_ms)).await;
            }
            info!(
                "Action {}/{}: {} ({})",
                i + 1,
                total,
                ctx.field_id,
                ctx.field_type.as_deref().unwrap_or("untyped")
            );

            let (family, outcome) = match FieldAction::from_context(ctx) {
                Ok(None) => (Some(ctx.family()), Outcome::Skipped),
                Ok(Some(action)) => {
                    let family = Some(action.family());
                    match self.dispatch(&action).await {
                        Ok(true) => (family, Outcome::Filled),
                        Ok(false) => {
                            warn!("Action on {} was not confirmed", ctx.field_id);
                            (
                                family,
                                Outcome::Failed {
                                    error: "value not confirmed".to_string(),
                                },
                            )
                        }
                        Err(e) => {
                            error!("Action on {} failed: {}", ctx.field_id, e);
                            (family, Outcome::Failed { error: e.to_string() })
                        }
                    }
                }
                Err(e) => {
                    error!("Rejected action {}: {}", ctx.field_id, e);
                    (None, Outcome::Failed { error: e.to_string() })
                }
            };

            let failed = matches!(outcome, Outcome::Failed { .. });
            outcomes.push(ActionOutcome {
                field_id: ctx.field_id.clone(),
                family,
                outcome,
            });
            if failed && !self.config.continue_on_error {
                warn!("Stopping after failure on {}", ctx.field_id);
                break;
            }
        }

        let count =
            |pred: fn(&Outcome) -> bool| outcomes.iter().filter(|o| pred(&o.outcome)).count();
        let summary = ExecutionSummary {
            filled: count(|o| matches!(o, Outcome::Filled)),
            failed: count(|o| matches!(o, Outcome::Failed { .. })),
            skipped: count(|o| matches!(o, Outcome::Skipped)),
            total,
            elapsed: start.elapsed(),
            outcomes,
        };
        info!(
            "Plan finished: {}/{} filled, {} failed, {} skipped in {:.2}s",
            summary.filled,
            summary.total,
            summary.failed,
            summary.skipped,
            summary.elapsed.as_secs_f64()
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(field_id: &str, outcome: Outcome) -> ActionOutcome {
        ActionOutcome {
            field_id: field_id.into(),
            family: Some(HandlerFamily::Text),
            outcome,
        }
    }

    #[test]
    fn test_config_defaults() {
        let c: ExecutorConfig = serde_json::from_str("{}").unwrap();
        assert!(c.continue_on_error);
        assert_eq!(c.action_delay_ms, 100);
    }

    #[test]
    fn test_summary_rate_and_display() {
        let summary = ExecutionSummary {
            outcomes: vec![
                outcome("#a", Outcome::Filled),
                outcome("#b", Outcome::Skipped),
                outcome(
                    "#c",
                    Outcome::Failed {
                        error: "boom".into(),
                    },
                ),
                outcome("#d", Outcome::Filled),
            ],
            filled: 2,
            failed: 1,
            skipped: 1,
            total: 4,
            elapsed: Duration::from_millis(1500),
        };
        assert_eq!(summary.success_rate(), 0.5);
        assert!(!summary.is_success());
        assert_eq!(summary.failures().count(), 1);

        let text = summary.to_string();
        assert!(text.starts_with("2/4 filled, 1 failed, 1 skipped (50.0%)"));
        assert!(text.contains("FAIL  text      #c: boom"));
    }

    #[test]
    fn test_empty_summary() {
        let summary = ExecutionSummary {
            outcomes: vec![],
            filled: 0,
            failed: 0,
            skipped: 0,
            total: 0,
            elapsed: Duration::ZERO,
        };
        assert_eq!(summary.success_rate(), 0.0);
        assert!(summary.is_success());
    }

    #[test]
    fn test_outcome_serializes_flat() {
        let o = outcome("#x", Outcome::Failed { error: "nope".into() });
        let v = serde_json::to_value(&o).unwrap();
        assert_eq!(v["status"], "failed");
        assert_eq!(v["error"], "nope");
        assert_eq!(v["family"], "text");
    }
}
