//! Oracle-backed reasoning: analyze a problem and produce a plan before any
//! code is written.

use serde_json::{Value, json};

use crate::io::prompt::PromptEngine;
use crate::oracle::Oracle;
use crate::tools::{ParamSpec, Tool, ToolParams, ToolResult, optional_str, require_str};

const SECTION_HEADERS: [&str; 4] = ["ANALYSIS", "APPROACH", "PLAN", "PSEUDOCODE"];

const PARAMS: [ParamSpec; 4] = [
    ParamSpec {
        name: "problem",
        required: true,
        purpose: "the problem to analyze and plan for",
    },
    ParamSpec {
        name: "previous_attempts",
        required: false,
        purpose: "summaries of failed attempts to learn from",
    },
    ParamSpec {
        name: "context",
        required: false,
        purpose: "additional context or constraints",
    },
    ParamSpec {
        name: "focus",
        required: false,
        purpose: "what to concentrate the analysis on",
    },
];

pub struct ThinkTool<'a> {
    oracle: &'a dyn Oracle,
    engine: PromptEngine,
}

impl<'a> ThinkTool<'a> {
    pub fn new(oracle: &'a dyn Oracle) -> Self {
        Self {
            oracle,
            engine: PromptEngine::new(),
        }
    }
}

impl Tool for ThinkTool<'_> {
    fn description(&self) -> &'static str {
        "Analyze a problem and create a detailed implementation plan using logical reasoning"
    }

    fn params(&self) -> &'static [ParamSpec] {
        &PARAMS
    }

    fn execute(&self, params: &ToolParams) -> ToolResult {
        let problem = match require_str(params, "problem") {
            Ok(problem) => problem,
            Err(fail) => return fail,
        };
        let previous_attempts: Vec<String> = params
            .get("previous_attempts")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let extra_context = match (optional_str(params, "context"), optional_str(params, "focus")) {
            (Some(context), Some(focus)) => Some(format!("{context}\nFocus: {focus}")),
            (Some(context), None) => Some(context.to_string()),
            (None, Some(focus)) => Some(format!("Focus: {focus}")),
            (None, None) => None,
        };

        let messages = match self
            .engine
            .render_think(problem, &previous_attempts, extra_context.as_deref())
        {
            Ok(messages) => messages,
            Err(e) => return ToolResult::fail(format!("think prompt error: {e:#}")),
        };

        match self.oracle.complete(&messages) {
            Ok(reply) => ToolResult::ok(json!({
                "thinking_process": reply,
                "analysis": extract_section(&reply, "ANALYSIS"),
                "approach": extract_section(&reply, "APPROACH"),
                "plan": extract_section(&reply, "PLAN"),
                "pseudocode": extract_section(&reply, "PSEUDOCODE"),
            })),
            Err(e) => ToolResult::fail(format!("think oracle error: {e:#}")),
        }
    }
}

/// Best-effort extraction of one named section from structured prose.
///
/// A section starts at a line containing `NAME` and a colon and runs until
/// the next known header. Absent sections yield an empty string; this is not
/// an error.
pub fn extract_section(response: &str, section: &str) -> String {
    let mut in_section = false;
    let mut collected: Vec<&str> = Vec::new();

    for line in response.lines() {
        let upper = line.to_uppercase();
        if upper.contains(section) && upper.contains(':') && !in_section {
            in_section = true;
            continue;
        }
        if in_section
            && upper.contains(':')
            && SECTION_HEADERS
                .iter()
                .any(|header| *header != section && upper.contains(header))
        {
            break;
        }
        if in_section {
            collected.push(line);
        }
    }

    collected.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedOracle;
    use serde_json::json;

    const STRUCTURED_REPLY: &str = "\
1. ANALYSIS: inputs are strings
the output is reversed
2. APPROACH: two pointers
3. PLAN:
- read input
- swap ends
4. PSEUDOCODE:
for i in 0..n/2: swap";

    #[test]
    fn extracts_each_section() {
        assert_eq!(
            extract_section(STRUCTURED_REPLY, "ANALYSIS"),
            "the output is reversed"
        );
        assert_eq!(
            extract_section(STRUCTURED_REPLY, "PLAN"),
            "- read input\n- swap ends"
        );
        assert_eq!(
            extract_section(STRUCTURED_REPLY, "PSEUDOCODE"),
            "for i in 0..n/2: swap"
        );
    }

    #[test]
    fn absent_section_yields_empty_string() {
        assert_eq!(extract_section("free-form prose, no headers", "PLAN"), "");
    }

    #[test]
    fn think_returns_sections_from_the_oracle_reply() {
        let oracle = ScriptedOracle::new(vec![STRUCTURED_REPLY.to_string()]);
        let tool = ThinkTool::new(&oracle);
        let mut params = ToolParams::new();
        params.insert("problem".to_string(), json!("reverse a string"));

        let result = tool.execute(&params);
        assert!(result.success);
        assert_eq!(result.result["plan"], "- read input\n- swap ends");
        assert_eq!(result.result["thinking_process"], STRUCTURED_REPLY);
    }

    #[test]
    fn missing_problem_is_an_envelope_failure() {
        let oracle = ScriptedOracle::new(Vec::new());
        let tool = ThinkTool::new(&oracle);
        let result = tool.execute(&ToolParams::new());
        assert!(!result.success);
        assert!(result.error.as_deref().is_some_and(|e| e.contains("problem")));
    }

    #[test]
    fn oracle_failure_is_an_envelope_failure() {
        let oracle = ScriptedOracle::failing("backend unreachable");
        let tool = ThinkTool::new(&oracle);
        let mut params = ToolParams::new();
        params.insert("problem".to_string(), json!("p"));
        let result = tool.execute(&params);
        assert!(!result.success);
        assert!(
            result
                .error
                .as_deref()
                .is_some_and(|e| e.contains("backend unreachable"))
        );
    }
}
