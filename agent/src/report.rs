//! End-of-session report assembled from the ledger.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::Serialize;

use crate::core::state::AgentState;
use crate::looping::StopCause;

/// Full account of one session, persisted as JSON under `logs/`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub session: SessionInfo,
    pub results: SessionResults,
    pub activity: ActivitySummary,
    pub tool_usage: ToolUsage,
    pub decision_trail: Vec<DecisionTrailEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub problem: String,
    pub started_at: String,
    pub finished_at: String,
    pub duration_secs: f64,
    pub stop_cause: StopCause,
    pub stop_reason: String,
    /// Whether the session ended by its own judgment rather than by running
    /// out of budget or being interrupted.
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionResults {
    pub best_solution: Option<String>,
    pub best_quality: u8,
    pub satisfaction: u8,
    pub confidence: u8,
    pub artifacts: Vec<String>,
    pub executions: usize,
    pub average_quality: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivitySummary {
    pub thoughts: Vec<String>,
    pub issues: Vec<String>,
}

/// Per-tool invocation statistics.
#[derive(Debug, Clone, Serialize)]
pub struct ToolUsage {
    pub total_calls: usize,
    pub successful_calls: usize,
    pub success_rate: f64,
    pub by_tool: BTreeMap<String, u32>,
    pub most_used: Option<String>,
}

/// One entry in the chronological decision trail.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionTrailEntry {
    pub tool: String,
    pub reasoning: String,
    pub success: bool,
    pub timestamp: String,
}

impl SessionReport {
    /// Build the report from the final ledger. Infallible: a report exists
    /// for every session, however it ended.
    pub fn from_state(state: &AgentState, stop_cause: StopCause, duration_secs: f64) -> Self {
        let calls = state.tool_calls();
        let successful = calls.iter().filter(|c| c.success).count();
        let mut by_tool: BTreeMap<String, u32> = BTreeMap::new();
        for call in calls {
            *by_tool.entry(call.tool.to_string()).or_default() += 1;
        }
        let most_used = by_tool
            .iter()
            .max_by_key(|(_, count)| **count)
            .map(|(name, _)| name.clone());
        let success_rate = if calls.is_empty() {
            0.0
        } else {
            successful as f64 / calls.len() as f64
        };

        Self {
            session: SessionInfo {
                problem: state.problem.clone(),
                started_at: state.started_at.clone(),
                finished_at: Utc::now().to_rfc3339(),
                duration_secs,
                stop_cause,
                stop_reason: state.stop_reason().to_string(),
                completed: matches!(stop_cause, StopCause::OracleStop | StopCause::HighQuality),
            },
            results: SessionResults {
                best_solution: state.best_solution().map(str::to_string),
                best_quality: state.best_quality(),
                satisfaction: state.satisfaction(),
                confidence: state.confidence(),
                artifacts: state.artifacts().iter().map(|a| a.name.clone()).collect(),
                executions: state.executions().len(),
                average_quality: state.execution_summary().map(|s| s.average_quality),
            },
            activity: ActivitySummary {
                thoughts: state.thoughts().to_vec(),
                issues: state.issues().to_vec(),
            },
            tool_usage: ToolUsage {
                total_calls: calls.len(),
                successful_calls: successful,
                success_rate,
                by_tool,
                most_used,
            },
            decision_trail: calls
                .iter()
                .map(|call| DecisionTrailEntry {
                    tool: call.tool.to_string(),
                    reasoning: call.reasoning.clone(),
                    success: call.success,
                    timestamp: call.timestamp.clone(),
                })
                .collect(),
        }
    }
}
