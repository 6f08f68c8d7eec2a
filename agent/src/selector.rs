//! Per-cycle decision making: one oracle consultation, layered
//! interpretation, and a deterministic fallback when the oracle is unusable.

use tracing::{debug, instrument, warn};

use crate::core::decision::{self, Decision, FallbackContext};
use crate::core::score::QualityThresholds;
use crate::core::state::AgentState;
use crate::io::prompt::PromptEngine;
use crate::oracle::Oracle;
use crate::tools::{ToolName, ToolSchema};

/// Chooses the next action for the control loop.
///
/// Exactly one oracle call is made per decision. A failed call is not an
/// error at this level; the fallback tree produces the decision instead.
pub struct ToolSelector<'a> {
    oracle: &'a dyn Oracle,
    engine: PromptEngine,
    thresholds: QualityThresholds,
}

impl<'a> ToolSelector<'a> {
    pub fn new(oracle: &'a dyn Oracle, thresholds: QualityThresholds) -> Self {
        Self {
            oracle,
            engine: PromptEngine::new(),
            thresholds,
        }
    }

    /// Decide the next action from the current ledger.
    #[instrument(skip_all, fields(calls_used = state.tool_calls().len()))]
    pub fn decide(&self, state: &AgentState, schemas: &[ToolSchema]) -> Decision {
        let registered: Vec<ToolName> = schemas
            .iter()
            .filter_map(|schema| ToolName::parse(&schema.name))
            .collect();
        let ctx = FallbackContext {
            problem: &state.problem,
            has_artifacts: !state.artifacts().is_empty(),
            latest_artifact: state.latest_artifact().map(|a| a.name.as_str()),
            has_executions: !state.executions().is_empty(),
            best_quality: state.best_quality(),
            remaining_calls: state.remaining_calls(),
        };

        let reply = self
            .engine
            .render_decision(state, schemas)
            .and_then(|messages| self.oracle.complete(&messages));
        match reply {
            Ok(reply) => {
                debug!(reply_bytes = reply.len(), "interpreting oracle reply");
                decision::interpret(&reply, &registered, &ctx, &self.thresholds)
            }
            Err(e) => {
                warn!(err = format!("{e:#}"), "oracle unusable, using fallback");
                decision::fallback_decision(&ctx, &self.thresholds)
            }
        }
    }
}
