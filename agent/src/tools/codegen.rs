//! Oracle-backed code generation with code-fence extraction.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::json;

use crate::io::prompt::PromptEngine;
use crate::oracle::Oracle;
use crate::tools::{ParamSpec, Tool, ToolParams, ToolResult, optional_str, require_str};

/// A fenced code block, tolerating a language tag after the opening fence.
static CODE_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[a-zA-Z0-9_+-]*\n(.*?)```").expect("code fence regex should compile")
});

const PARAMS: [ParamSpec; 4] = [
    ParamSpec {
        name: "problem",
        required: true,
        purpose: "the problem the solution must solve",
    },
    ParamSpec {
        name: "plan",
        required: false,
        purpose: "prior reasoning output to implement",
    },
    ParamSpec {
        name: "previous_code",
        required: false,
        purpose: "previous attempt to improve upon",
    },
    ParamSpec {
        name: "execution_feedback",
        required: false,
        purpose: "feedback from the previous execution",
    },
];

pub struct GenerateCodeTool<'a> {
    oracle: &'a dyn Oracle,
    engine: PromptEngine,
}

impl<'a> GenerateCodeTool<'a> {
    pub fn new(oracle: &'a dyn Oracle) -> Self {
        Self {
            oracle,
            engine: PromptEngine::new(),
        }
    }
}

impl Tool for GenerateCodeTool<'_> {
    fn description(&self) -> &'static str {
        "Generate a complete self-testing solution with comprehensive test cases"
    }

    fn params(&self) -> &'static [ParamSpec] {
        &PARAMS
    }

    fn execute(&self, params: &ToolParams) -> ToolResult {
        let problem = match require_str(params, "problem") {
            Ok(problem) => problem,
            Err(fail) => return fail,
        };

        let messages = match self.engine.render_generate(
            problem,
            optional_str(params, "plan"),
            optional_str(params, "previous_code"),
            optional_str(params, "execution_feedback"),
        ) {
            Ok(messages) => messages,
            Err(e) => return ToolResult::fail(format!("generate prompt error: {e:#}")),
        };

        match self.oracle.complete(&messages) {
            Ok(reply) => {
                let code = extract_code(&reply);
                ToolResult::ok(json!({
                    "generated_code": code,
                    "full_response": reply,
                }))
            }
            Err(e) => ToolResult::fail(format!("generate oracle error: {e:#}")),
        }
    }
}

/// Pull a clean code block out of an oracle reply.
///
/// Prefers the first fenced block; a reply without fences is assumed to be
/// bare code.
pub fn extract_code(response: &str) -> String {
    if let Some(captures) = CODE_FENCE_RE.captures(response) {
        return captures[1].trim().to_string();
    }
    response.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedOracle;
    use serde_json::json;

    #[test]
    fn fenced_code_with_language_tag_is_unwrapped() {
        let reply = "Here you go:\n```python\ndef f():\n    return 1\n```\nEnjoy!";
        assert_eq!(extract_code(reply), "def f():\n    return 1");
    }

    #[test]
    fn bare_fences_and_bare_replies_both_work() {
        assert_eq!(extract_code("```\nx = 1\n```"), "x = 1");
        assert_eq!(extract_code("x = 1\n"), "x = 1");
    }

    #[test]
    fn only_the_first_fenced_block_is_taken() {
        let reply = "```python\nfirst\n```\ntext\n```python\nsecond\n```";
        assert_eq!(extract_code(reply), "first");
    }

    #[test]
    fn generate_returns_extracted_code_and_full_reply() {
        let oracle = ScriptedOracle::new(vec![
            "```python\nprint('hi')\n```".to_string(),
        ]);
        let tool = GenerateCodeTool::new(&oracle);
        let mut params = ToolParams::new();
        params.insert("problem".to_string(), json!("greet"));

        let result = tool.execute(&params);
        assert!(result.success);
        assert_eq!(result.result["generated_code"], "print('hi')");
        assert!(
            result.result["full_response"]
                .as_str()
                .expect("string")
                .contains("```")
        );
    }

    #[test]
    fn oracle_failure_is_an_envelope_failure() {
        let oracle = ScriptedOracle::failing("no backend");
        let tool = GenerateCodeTool::new(&oracle);
        let mut params = ToolParams::new();
        params.insert("problem".to_string(), json!("p"));
        let result = tool.execute(&params);
        assert!(!result.success);
    }
}
