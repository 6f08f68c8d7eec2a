//! The bounded control loop: decide, dispatch, record, reassess.
//!
//! Each cycle consults the selector exactly once, dispatches at most one
//! tool, folds the outcome into the ledger, and re-derives the agent's
//! self-assessment. Termination is guaranteed by the invocation budget; the
//! oracle can end a session early but can never extend it.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::core::decision::Decision;
use crate::core::score::{self, QualityThresholds, TestSummary};
use crate::core::state::{AgentState, ArtifactRecord, ToolCallRecord};
use crate::io::session_log::write_session_report;
use crate::report::SessionReport;
use crate::selector::ToolSelector;
use crate::tools::{ToolName, ToolParams, ToolRegistry, ToolResult};

/// Longest excerpt of tool output folded into thoughts and issues.
const NOTE_EXCERPT_CHARS: usize = 150;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopCause {
    /// The oracle decided the work is done.
    OracleStop,
    /// The best quality score reached the auto-stop threshold.
    HighQuality,
    /// The invocation budget ran out.
    BudgetExhausted,
    /// An external cancellation request was observed.
    Interrupted,
}

/// Snapshot handed to the observer after each completed cycle.
#[derive(Debug)]
pub struct CycleOutcome<'a> {
    pub cycle: u32,
    pub tool: ToolName,
    pub success: bool,
    pub reasoning: &'a str,
    pub best_quality: u8,
    pub remaining_calls: u32,
}

/// Final result of a session run.
#[derive(Debug)]
pub struct SessionOutcome {
    pub stop_cause: StopCause,
    pub report: SessionReport,
    /// Where the report was persisted; `None` if persistence failed.
    pub report_path: Option<PathBuf>,
}

/// Run one session to completion.
///
/// The loop always terminates and always produces a report; a failure to
/// persist the report is logged, not propagated. `cancel` is checked at the
/// top of each cycle, never mid-dispatch.
#[instrument(skip_all, fields(max_calls = state.max_tool_calls()))]
pub fn run_session(
    state: &mut AgentState,
    selector: &ToolSelector<'_>,
    registry: &ToolRegistry<'_>,
    thresholds: &QualityThresholds,
    logs_dir: &Path,
    cancel: Option<&AtomicBool>,
    mut on_cycle: impl FnMut(&CycleOutcome<'_>),
) -> Result<SessionOutcome> {
    let started = Instant::now();
    let schemas = registry.schemas();
    let mut cycle: u32 = 0;

    let stop_cause = loop {
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            info!("cancellation requested, stopping");
            state.add_thought("session interrupted by external request");
            break StopCause::Interrupted;
        }
        if state.remaining_calls() == 0 {
            info!("invocation budget exhausted, stopping");
            break StopCause::BudgetExhausted;
        }
        cycle += 1;

        match selector.decide(state, &schemas) {
            Decision::Stop { reasoning } => {
                info!(reasoning = %reasoning, "oracle decided to stop");
                state.mark_satisfied(reasoning);
                break StopCause::OracleStop;
            }
            Decision::UseTool {
                tool,
                parameters,
                reasoning,
            } => {
                debug!(%tool, reasoning = %reasoning, "dispatching");
                let timestamp = Utc::now().to_rfc3339();
                let dispatch_started = Instant::now();
                let result = match registry.get(tool) {
                    Some(tool_impl) => tool_impl.execute(&parameters),
                    None => ToolResult::fail(format!("tool {tool} is not registered")),
                };
                let duration_ms = dispatch_started.elapsed().as_millis() as u64;

                fold_result(state, tool, &parameters, &result, &reasoning);
                let success = result.success;
                state.record_tool_call(ToolCallRecord {
                    tool,
                    parameters,
                    result,
                    timestamp,
                    reasoning,
                    success,
                    duration_ms,
                })?;
                reassess(state, thresholds);

                let last = state
                    .tool_calls()
                    .last()
                    .context("ledger empty after recording")?;
                on_cycle(&CycleOutcome {
                    cycle,
                    tool,
                    success,
                    reasoning: &last.reasoning,
                    best_quality: state.best_quality(),
                    remaining_calls: state.remaining_calls(),
                });

                if state.best_quality() >= thresholds.auto_stop {
                    let reason =
                        format!("high quality achieved: {}/100", state.best_quality());
                    info!(reason = %reason, "auto-stop threshold reached");
                    state.mark_satisfied(reason);
                    break StopCause::HighQuality;
                }
            }
        }
    };

    let report = SessionReport::from_state(state, stop_cause, started.elapsed().as_secs_f64());
    let report_path = match write_session_report(logs_dir, &report) {
        Ok(path) => Some(path),
        Err(e) => {
            warn!(err = format!("{e:#}"), "failed to persist session report");
            None
        }
    };

    Ok(SessionOutcome {
        stop_cause,
        report,
        report_path,
    })
}

/// Fold one tool result into the ledger.
///
/// Only the loop mutates the ledger; tools just return data.
fn fold_result(
    state: &mut AgentState,
    tool: ToolName,
    parameters: &ToolParams,
    result: &ToolResult,
    reasoning: &str,
) {
    if !result.success {
        let error = result.error.as_deref().unwrap_or("unknown error");
        state.add_issue(format!("{tool} failed: {}", excerpt(error)));
        return;
    }

    match tool {
        ToolName::Think => {
            let approach = result.result["approach"].as_str().unwrap_or("");
            if !approach.is_empty() {
                state.current_approach = approach.to_string();
            }
            let plan = result.result["plan"].as_str().unwrap_or("");
            let note = if plan.is_empty() {
                result.result["thinking_process"].as_str().unwrap_or("")
            } else {
                plan
            };
            if !note.is_empty() {
                state.add_thought(format!("plan: {}", excerpt(note)));
            }
        }
        ToolName::GenerateCode => {
            let code_len = result.result["generated_code"]
                .as_str()
                .map_or(0, str::len);
            state.add_thought(format!("generated {code_len} bytes of code"));
        }
        ToolName::WriteFile => {
            let name = parameters
                .get("filename")
                .and_then(Value::as_str)
                .unwrap_or("unnamed");
            state.add_artifact(ArtifactRecord {
                name: name.to_string(),
                path: result.result["path"].as_str().unwrap_or("").to_string(),
                kind: parameters
                    .get("directory")
                    .and_then(Value::as_str)
                    .unwrap_or("solutions")
                    .to_string(),
                created_at: Utc::now().to_rfc3339(),
                size: result.result["bytes_written"].as_u64().unwrap_or(0),
                purpose: reasoning.to_string(),
            });
        }
        ToolName::ReadFile => {}
        ToolName::ExecuteCode => {
            let artifact = parameters
                .get("filename")
                .and_then(Value::as_str)
                .unwrap_or("unnamed");
            let exit_code = result.result["exit_code"].as_i64().unwrap_or(-1) as i32;
            let stdout = result.result["stdout"].as_str().unwrap_or("").to_string();
            let stderr = result.result["stderr"].as_str().unwrap_or("").to_string();
            let duration_ms = result.result["duration_ms"].as_u64().unwrap_or(0);
            let tests: TestSummary =
                serde_json::from_value(result.result["tests"].clone()).unwrap_or_default();

            if exit_code != 0 && !stderr.is_empty() {
                state.add_issue(format!("{artifact} run failed: {}", excerpt(&stderr)));
            }
            let quality = state.add_execution(
                artifact, exit_code, stdout, stderr, duration_ms, tests,
            );
            debug!(artifact, quality, "execution scored");
        }
    }
}

/// Re-derive satisfaction and confidence from the ledger.
fn reassess(state: &mut AgentState, thresholds: &QualityThresholds) {
    state.update_satisfaction(score::satisfaction_level(
        !state.artifacts().is_empty(),
        !state.executions().is_empty(),
        state.best_quality(),
    ));
    state.update_confidence(score::confidence_level(
        !state.tool_calls().is_empty(),
        state.best_quality(),
        thresholds.satisfactory,
        state.issues().is_empty(),
    ));
}

fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= NOTE_EXCERPT_CHARS {
        trimmed.to_string()
    } else {
        let head: String = trimmed.chars().take(NOTE_EXCERPT_CHARS).collect();
        format!("{head}...")
    }
}
