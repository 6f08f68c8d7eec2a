//! Prompt pack builder for oracle transcripts.
//!
//! Templates are embedded at compile time and rendered from serializable
//! context structs, so every prompt is reproducible from ledger state.

use anyhow::{Context as _, Result};
use minijinja::{Environment, context};
use serde::Serialize;

use crate::core::state::{AgentState, ExecutionSummary};
use crate::oracle::Message;
use crate::tools::ToolSchema;

const DECISION_SYSTEM_TEMPLATE: &str = include_str!("prompts/decision_system.md");
const DECISION_TEMPLATE: &str = include_str!("prompts/decision.md");
const THINK_SYSTEM_TEMPLATE: &str = include_str!("prompts/think_system.md");
const THINK_TEMPLATE: &str = include_str!("prompts/think.md");
const GENERATE_SYSTEM_TEMPLATE: &str = include_str!("prompts/generate_system.md");
const GENERATE_TEMPLATE: &str = include_str!("prompts/generate.md");

/// Progress block for the decision template.
#[derive(Debug, Clone, Serialize)]
struct ProgressContext {
    calls_used: usize,
    max_calls: u32,
    calls_remaining: u32,
    artifacts_created: usize,
    executions_done: usize,
    satisfaction: u8,
    confidence: u8,
}

/// State block for the decision template.
#[derive(Debug, Clone, Serialize)]
struct StateContext {
    artifacts: Vec<String>,
    best_solution: Option<String>,
    best_quality: u8,
    current_approach: String,
    recent_issues: Vec<String>,
    recent_thoughts: Vec<String>,
}

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("decision_system", DECISION_SYSTEM_TEMPLATE)
            .expect("decision system template should be valid");
        env.add_template("decision", DECISION_TEMPLATE)
            .expect("decision template should be valid");
        env.add_template("think_system", THINK_SYSTEM_TEMPLATE)
            .expect("think system template should be valid");
        env.add_template("think", THINK_TEMPLATE)
            .expect("think template should be valid");
        env.add_template("generate_system", GENERATE_SYSTEM_TEMPLATE)
            .expect("generate system template should be valid");
        env.add_template("generate", GENERATE_TEMPLATE)
            .expect("generate template should be valid");
        Self { env }
    }

    /// Render the per-cycle decision transcript from the ledger.
    pub fn render_decision(
        &self,
        state: &AgentState,
        tools: &[ToolSchema],
    ) -> Result<Vec<Message>> {
        let progress = ProgressContext {
            calls_used: state.tool_calls().len(),
            max_calls: state.max_tool_calls(),
            calls_remaining: state.remaining_calls(),
            artifacts_created: state.artifacts().len(),
            executions_done: state.executions().len(),
            satisfaction: state.satisfaction(),
            confidence: state.confidence(),
        };
        let state_block = StateContext {
            artifacts: state
                .artifacts()
                .iter()
                .map(|a| a.name.clone())
                .collect(),
            best_solution: state.best_solution().map(str::to_string),
            best_quality: state.best_quality(),
            current_approach: state.current_approach.clone(),
            recent_issues: last_n(state.issues(), 3),
            recent_thoughts: last_n(state.thoughts(), 2),
        };
        let execution_summary: Option<ExecutionSummary> = state.execution_summary();

        let template = self.env.get_template("decision")?;
        let rendered = template
            .render(context! {
                problem => state.problem,
                progress => progress,
                state => state_block,
                recent_actions => state.recent_actions(3),
                execution_summary => execution_summary,
                tools => tools,
            })
            .context("render decision prompt")?;

        Ok(vec![
            Message::system(self.env.get_template("decision_system")?.render(context! {})?),
            Message::user(rendered),
        ])
    }

    /// Render the reasoning transcript for the think tool.
    pub fn render_think(
        &self,
        problem: &str,
        previous_attempts: &[String],
        extra_context: Option<&str>,
    ) -> Result<Vec<Message>> {
        let template = self.env.get_template("think")?;
        let rendered = template
            .render(context! {
                problem => problem,
                previous_attempts => previous_attempts,
                context => extra_context.map(str::trim).filter(|s| !s.is_empty()),
            })
            .context("render think prompt")?;
        Ok(vec![
            Message::system(self.env.get_template("think_system")?.render(context! {})?),
            Message::user(rendered),
        ])
    }

    /// Render the generation transcript for the generate_code tool.
    pub fn render_generate(
        &self,
        problem: &str,
        plan: Option<&str>,
        previous_code: Option<&str>,
        execution_feedback: Option<&str>,
    ) -> Result<Vec<Message>> {
        let template = self.env.get_template("generate")?;
        let rendered = template
            .render(context! {
                problem => problem,
                plan => plan.map(str::trim).filter(|s| !s.is_empty()),
                previous_code => previous_code,
                execution_feedback => execution_feedback,
            })
            .context("render generate prompt")?;
        Ok(vec![
            Message::system(self.env.get_template("generate_system")?.render(context! {})?),
            Message::user(rendered),
        ])
    }
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn last_n(items: &[String], n: usize) -> Vec<String> {
    let start = items.len().saturating_sub(n);
    items[start..].to_vec()
}
