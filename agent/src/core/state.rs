//! Session ledger: the append-only record of everything a session has done.
//!
//! The ledger is owned exclusively by the control loop; tools return data and
//! only the loop folds it in. Append methods never delete or reorder entries,
//! and the remaining invocation budget is derived from the recorded history so
//! it cannot drift out of sync.

use anyhow::{Result, bail};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::core::score::{self, TestSummary};
use crate::tools::{ToolName, ToolParams, ToolResult};

/// Longest parameter value rendered verbatim in an action summary.
const PARAM_PREVIEW_CHARS: usize = 30;

/// One completed tool invocation.
///
/// Records are built after dispatch finishes and appended in one step, so the
/// ledger never holds a half-written invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub tool: ToolName,
    pub parameters: ToolParams,
    pub result: ToolResult,
    /// RFC 3339 timestamp of when the call was dispatched.
    pub timestamp: String,
    /// Free-text rationale supplied by the oracle (or the fallback tier).
    pub reasoning: String,
    pub success: bool,
    pub duration_ms: u64,
}

/// One artifact produced by a successful write.
///
/// Artifacts are never mutated; a later write with a different name
/// supersedes, it does not delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub name: String,
    pub path: String,
    /// Content classification, e.g. "solution" or "log".
    pub kind: String,
    pub created_at: String,
    pub size: u64,
    pub purpose: String,
}

/// One artifact execution and its derived quality score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub artifact: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    pub tests: TestSummary,
    /// Derived by the evaluator; never set directly by a caller.
    pub quality: u8,
}

/// Aggregate execution statistics for the decision prompt.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionSummary {
    pub executions: usize,
    pub average_quality: f64,
    pub best_quality: u8,
    pub latest_quality: u8,
    pub latest_exit_code: i32,
}

/// Session-scoped ledger of invocations, artifacts, outcomes, and the agent's
/// self-assessment.
#[derive(Debug, Clone, Serialize)]
pub struct AgentState {
    pub problem: String,
    pub started_at: String,
    max_tool_calls: u32,
    tool_calls: Vec<ToolCallRecord>,
    artifacts: Vec<ArtifactRecord>,
    executions: Vec<ExecutionRecord>,
    /// Artifact name with the highest quality score seen so far.
    best_solution: Option<String>,
    best_quality: u8,
    thoughts: Vec<String>,
    pub current_approach: String,
    issues: Vec<String>,
    satisfaction: u8,
    confidence: u8,
    satisfied: bool,
    stop_reason: String,
}

impl AgentState {
    pub fn new(problem: impl Into<String>, max_tool_calls: u32) -> Self {
        Self {
            problem: problem.into(),
            started_at: Utc::now().to_rfc3339(),
            max_tool_calls,
            tool_calls: Vec::new(),
            artifacts: Vec::new(),
            executions: Vec::new(),
            best_solution: None,
            best_quality: 0,
            thoughts: Vec::new(),
            current_approach: String::new(),
            issues: Vec::new(),
            satisfaction: 0,
            confidence: 0,
            satisfied: false,
            stop_reason: String::new(),
        }
    }

    pub fn max_tool_calls(&self) -> u32 {
        self.max_tool_calls
    }

    /// Invocation budget left: `configured maximum − recorded invocations`.
    pub fn remaining_calls(&self) -> u32 {
        self.max_tool_calls
            .saturating_sub(self.tool_calls.len() as u32)
    }

    pub fn tool_calls(&self) -> &[ToolCallRecord] {
        &self.tool_calls
    }

    pub fn artifacts(&self) -> &[ArtifactRecord] {
        &self.artifacts
    }

    pub fn latest_artifact(&self) -> Option<&ArtifactRecord> {
        self.artifacts.last()
    }

    pub fn executions(&self) -> &[ExecutionRecord] {
        &self.executions
    }

    pub fn best_solution(&self) -> Option<&str> {
        self.best_solution.as_deref()
    }

    pub fn best_quality(&self) -> u8 {
        self.best_quality
    }

    pub fn issues(&self) -> &[String] {
        &self.issues
    }

    pub fn thoughts(&self) -> &[String] {
        &self.thoughts
    }

    pub fn satisfaction(&self) -> u8 {
        self.satisfaction
    }

    pub fn confidence(&self) -> u8 {
        self.confidence
    }

    pub fn is_satisfied(&self) -> bool {
        self.satisfied
    }

    pub fn stop_reason(&self) -> &str {
        &self.stop_reason
    }

    /// Append a completed invocation, consuming one unit of budget.
    ///
    /// Errors if the budget is already exhausted; the loop must stop
    /// dispatching before that point regardless of oracle intent.
    pub fn record_tool_call(&mut self, record: ToolCallRecord) -> Result<()> {
        if self.remaining_calls() == 0 {
            bail!("invocation budget exhausted ({} calls)", self.max_tool_calls);
        }
        self.tool_calls.push(record);
        Ok(())
    }

    pub fn add_artifact(&mut self, record: ArtifactRecord) {
        self.artifacts.push(record);
    }

    /// Append an execution outcome, deriving its quality score and updating
    /// the best-known solution when strictly better.
    pub fn add_execution(
        &mut self,
        artifact: impl Into<String>,
        exit_code: i32,
        stdout: String,
        stderr: String,
        duration_ms: u64,
        tests: TestSummary,
    ) -> u8 {
        let artifact = artifact.into();
        let quality = score::quality_score(exit_code, &stdout, &stderr, &tests);
        if quality > self.best_quality {
            self.best_quality = quality;
            self.best_solution = Some(artifact.clone());
        }
        self.executions.push(ExecutionRecord {
            artifact,
            exit_code,
            stdout,
            stderr,
            duration_ms,
            tests,
            quality,
        });
        quality
    }

    pub fn add_thought(&mut self, thought: impl Into<String>) {
        let stamped = format!("[{}] {}", Utc::now().format("%H:%M:%S"), thought.into());
        self.thoughts.push(stamped);
    }

    /// Record an identified issue, ignoring exact duplicates.
    pub fn add_issue(&mut self, issue: impl Into<String>) {
        let issue = issue.into();
        if !self.issues.contains(&issue) {
            self.issues.push(issue);
        }
    }

    pub fn update_satisfaction(&mut self, level: u8) {
        self.satisfaction = level.min(100);
    }

    pub fn update_confidence(&mut self, level: u8) {
        self.confidence = level.min(100);
    }

    /// Set the terminal satisfied flag. Repeated calls only overwrite the
    /// stored reason.
    pub fn mark_satisfied(&mut self, reason: impl Into<String>) {
        self.satisfied = true;
        self.stop_reason = reason.into();
        let reason = self.stop_reason.clone();
        self.add_thought(format!("satisfied: {reason}"));
    }

    /// One-line summaries of the most recent `count` invocations, newest
    /// last, for the decision prompt.
    pub fn recent_actions(&self, count: usize) -> Vec<String> {
        let start = self.tool_calls.len().saturating_sub(count);
        self.tool_calls[start..]
            .iter()
            .map(|call| {
                let params = call
                    .parameters
                    .iter()
                    .map(|(key, value)| {
                        let rendered = match value.as_str() {
                            Some(s) => s.to_string(),
                            None => value.to_string(),
                        };
                        if rendered.chars().count() < PARAM_PREVIEW_CHARS {
                            format!("{key}={rendered}")
                        } else {
                            format!("{key}=...")
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                let glyph = if call.success { "✓" } else { "✗" };
                format!("{}({params}) {glyph} {}", call.tool, call.reasoning)
            })
            .collect()
    }

    /// Aggregate statistics over all executions, `None` before the first run.
    pub fn execution_summary(&self) -> Option<ExecutionSummary> {
        let latest = self.executions.last()?;
        let qualities: Vec<u32> = self.executions.iter().map(|e| u32::from(e.quality)).collect();
        let sum: u32 = qualities.iter().sum();
        Some(ExecutionSummary {
            executions: self.executions.len(),
            average_quality: f64::from(sum) / qualities.len() as f64,
            best_quality: self.best_quality,
            latest_quality: latest.quality,
            latest_exit_code: latest.exit_code,
        })
    }
}
