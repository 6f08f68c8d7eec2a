//! Decision types and the layered interpretation of oracle output.
//!
//! The oracle is asked for JSON but is free text in practice, so decisions
//! are recovered through three tiers: structured extraction, textual
//! interpretation, then a deterministic fallback tree. The chain always
//! yields a usable decision; malformed output is absorbed, never an error.

use serde_json::Value;

use crate::core::score::QualityThresholds;
use crate::tools::{ToolName, ToolParams};

/// Phrases that read as "I am done" in free-text oracle replies.
const STOP_SYNONYMS: [&str; 5] = ["stop", "satisfied", "complete", "finished", "done"];

/// Longest reply excerpt quoted in interpreted reasoning strings.
const EXCERPT_CHARS: usize = 100;

/// A validated next action for the control loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    UseTool {
        tool: ToolName,
        parameters: ToolParams,
        reasoning: String,
    },
    Stop {
        reasoning: String,
    },
}

impl Decision {
    pub fn reasoning(&self) -> &str {
        match self {
            Decision::UseTool { reasoning, .. } | Decision::Stop { reasoning } => reasoning,
        }
    }
}

/// Ledger facts the fallback tree needs to pick a sensible default action.
#[derive(Debug, Clone)]
pub struct FallbackContext<'a> {
    pub problem: &'a str,
    pub has_artifacts: bool,
    /// Most recently created artifact, if any.
    pub latest_artifact: Option<&'a str>,
    pub has_executions: bool,
    pub best_quality: u8,
    pub remaining_calls: u32,
}

/// Interpret an oracle reply, trying each tier in order. Never fails.
pub fn interpret(
    response: &str,
    registered: &[ToolName],
    ctx: &FallbackContext<'_>,
    thresholds: &QualityThresholds,
) -> Decision {
    parse_structured(response, registered)
        .or_else(|| interpret_text(response, registered))
        .unwrap_or_else(|| fallback_decision(ctx, thresholds))
}

/// Tier 1: locate the first `{` and last `}` and parse the span as JSON.
///
/// Returns `None` when no span exists, the span is not valid JSON, or the
/// parsed value fails validation.
pub fn parse_structured(response: &str, registered: &[ToolName]) -> Option<Decision> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end < start {
        return None;
    }
    let value: Value = serde_json::from_str(&response[start..=end]).ok()?;
    validate(value, registered)
}

/// Validate a parsed decision and repair missing optional fields in place.
///
/// `action` must be `use_tool` or `stop`; a `use_tool` decision must name a
/// registered tool. Absent `parameters` and `reasoning` become empty/default
/// values so the loop never sees a structurally incomplete decision.
fn validate(value: Value, registered: &[ToolName]) -> Option<Decision> {
    let object = value.as_object()?;
    match object.get("action").and_then(Value::as_str)? {
        "use_tool" => {
            let name = object.get("tool").and_then(Value::as_str)?;
            let tool = ToolName::parse(name).filter(|t| registered.contains(t))?;
            let parameters = object
                .get("parameters")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            let reasoning = object
                .get("reasoning")
                .and_then(Value::as_str)
                .unwrap_or("no reasoning provided")
                .to_string();
            Some(Decision::UseTool {
                tool,
                parameters,
                reasoning,
            })
        }
        "stop" => {
            let reasoning = object
                .get("reasoning")
                .and_then(Value::as_str)
                .unwrap_or("oracle decided to stop")
                .to_string();
            Some(Decision::Stop { reasoning })
        }
        _ => None,
    }
}

/// Tier 2: scan the lowercased reply for stop synonyms, then for any
/// registered tool name appearing verbatim.
pub fn interpret_text(response: &str, registered: &[ToolName]) -> Option<Decision> {
    let lower = response.to_lowercase();

    if STOP_SYNONYMS.iter().any(|word| lower.contains(word)) {
        return Some(Decision::Stop {
            reasoning: format!("interpreted from reply: {}", excerpt(response)),
        });
    }

    for tool in registered {
        if lower.contains(tool.as_str()) {
            return Some(Decision::UseTool {
                tool: *tool,
                parameters: ToolParams::new(),
                reasoning: format!("interpreted {tool} from reply: {}", excerpt(response)),
            });
        }
    }

    None
}

/// Tier 3: deterministic fallback tree, evaluated in fixed priority order.
pub fn fallback_decision(ctx: &FallbackContext<'_>, thresholds: &QualityThresholds) -> Decision {
    // No artifacts yet: start by analyzing the problem.
    if !ctx.has_artifacts {
        let mut parameters = ToolParams::new();
        parameters.insert("problem".to_string(), Value::from(ctx.problem));
        parameters.insert("focus".to_string(), Value::from("problem analysis"));
        return Decision::UseTool {
            tool: ToolName::Think,
            parameters,
            reasoning: "fallback: starting with problem analysis".to_string(),
        };
    }

    // Artifacts without executions: run the most recent one.
    if !ctx.has_executions {
        if let Some(artifact) = ctx.latest_artifact {
            let mut parameters = ToolParams::new();
            parameters.insert("filename".to_string(), Value::from(artifact));
            return Decision::UseTool {
                tool: ToolName::ExecuteCode,
                parameters,
                reasoning: "fallback: testing the latest artifact".to_string(),
            };
        }
    }

    // Quality not yet satisfactory: reason about improvements.
    if ctx.best_quality < thresholds.satisfactory {
        let mut parameters = ToolParams::new();
        parameters.insert("problem".to_string(), Value::from(ctx.problem));
        parameters.insert("focus".to_string(), Value::from("solution improvement"));
        parameters.insert(
            "context".to_string(),
            Value::from(format!("best quality so far is {}/100", ctx.best_quality)),
        );
        return Decision::UseTool {
            tool: ToolName::Think,
            parameters,
            reasoning: "fallback: analyzing ways to improve quality".to_string(),
        };
    }

    // Budget nearly gone or the result is already good: stop.
    if ctx.remaining_calls <= 1 || ctx.best_quality >= thresholds.stop {
        let cause = if ctx.remaining_calls <= 1 {
            "call budget nearly exhausted"
        } else {
            "good quality achieved"
        };
        return Decision::Stop {
            reasoning: format!("fallback: stopping, {cause}"),
        };
    }

    // Otherwise regenerate an improved solution.
    let mut parameters = ToolParams::new();
    parameters.insert("problem".to_string(), Value::from(ctx.problem));
    parameters.insert(
        "plan".to_string(),
        Value::from("improve on the previous attempt"),
    );
    Decision::UseTool {
        tool: ToolName::GenerateCode,
        parameters,
        reasoning: "fallback: generating an improved solution".to_string(),
    }
}

fn excerpt(response: &str) -> String {
    let trimmed = response.trim();
    if trimmed.chars().count() <= EXCERPT_CHARS {
        trimmed.to_string()
    } else {
        let head: String = trimmed.chars().take(EXCERPT_CHARS).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(problem: &'static str) -> FallbackContext<'static> {
        FallbackContext {
            problem,
            has_artifacts: false,
            latest_artifact: None,
            has_executions: false,
            best_quality: 0,
            remaining_calls: 10,
        }
    }

    fn registered() -> Vec<ToolName> {
        ToolName::ALL.to_vec()
    }

    #[test]
    fn structured_decision_is_extracted_from_surrounding_prose() {
        let reply = r#"Sure, here's my decision:
{"action": "use_tool", "tool": "write_file", "parameters": {"filename": "a.py"}, "reasoning": "save it"}
Hope that helps!"#;
        let decision = parse_structured(reply, &registered()).expect("decision");
        match decision {
            Decision::UseTool {
                tool,
                parameters,
                reasoning,
            } => {
                assert_eq!(tool, ToolName::WriteFile);
                assert_eq!(parameters["filename"], "a.py");
                assert_eq!(reasoning, "save it");
            }
            Decision::Stop { .. } => panic!("expected use_tool"),
        }
    }

    #[test]
    fn missing_optional_fields_are_repaired_not_rejected() {
        let reply = r#"{"action": "use_tool", "tool": "think"}"#;
        match parse_structured(reply, &registered()).expect("decision") {
            Decision::UseTool {
                parameters,
                reasoning,
                ..
            } => {
                assert!(parameters.is_empty());
                assert_eq!(reasoning, "no reasoning provided");
            }
            Decision::Stop { .. } => panic!("expected use_tool"),
        }

        match parse_structured(r#"{"action": "stop"}"#, &registered()).expect("decision") {
            Decision::Stop { reasoning } => assert_eq!(reasoning, "oracle decided to stop"),
            Decision::UseTool { .. } => panic!("expected stop"),
        }
    }

    #[test]
    fn unknown_tool_or_action_fails_structured_validation() {
        assert!(
            parse_structured(r#"{"action": "use_tool", "tool": "teleport"}"#, &registered())
                .is_none()
        );
        assert!(parse_structured(r#"{"action": "ponder"}"#, &registered()).is_none());
        // A registered name outside this session's registry is also rejected.
        assert!(
            parse_structured(
                r#"{"action": "use_tool", "tool": "execute_code"}"#,
                &[ToolName::Think]
            )
            .is_none()
        );
    }

    #[test]
    fn textual_tier_prefers_stop_synonyms_over_tool_names() {
        let decision =
            interpret_text("I think we are done, no need to execute_code", &registered())
                .expect("decision");
        assert!(matches!(decision, Decision::Stop { .. }));
    }

    #[test]
    fn textual_tier_finds_verbatim_tool_names() {
        let decision =
            interpret_text("Next I would use generate_code here", &registered()).expect("decision");
        match decision {
            Decision::UseTool {
                tool, parameters, ..
            } => {
                assert_eq!(tool, ToolName::GenerateCode);
                assert!(parameters.is_empty());
            }
            Decision::Stop { .. } => panic!("expected use_tool"),
        }
    }

    #[test]
    fn malformed_replies_always_yield_a_valid_decision() {
        let thresholds = QualityThresholds::default();
        let context = ctx("reverse a string");
        let replies = [
            "",
            "no braces at all",
            "}{",
            "{not json at all",
            "{ this is { garbage } inside braces }",
            "{\"action\":",
        ];
        for reply in replies {
            let decision = interpret(reply, &registered(), &context, &thresholds);
            match decision {
                Decision::UseTool { tool, .. } => {
                    assert!(registered().contains(&tool), "reply {reply:?}");
                }
                Decision::Stop { .. } => {}
            }
        }
    }

    #[test]
    fn fallback_starts_with_analysis_when_nothing_exists() {
        let decision = fallback_decision(&ctx("p"), &QualityThresholds::default());
        match decision {
            Decision::UseTool {
                tool, parameters, ..
            } => {
                assert_eq!(tool, ToolName::Think);
                assert_eq!(parameters["problem"], "p");
            }
            Decision::Stop { .. } => panic!("expected think"),
        }
    }

    #[test]
    fn fallback_executes_the_latest_untested_artifact() {
        let mut context = ctx("p");
        context.has_artifacts = true;
        context.latest_artifact = Some("solution.py");
        let decision = fallback_decision(&context, &QualityThresholds::default());
        match decision {
            Decision::UseTool {
                tool, parameters, ..
            } => {
                assert_eq!(tool, ToolName::ExecuteCode);
                assert_eq!(parameters["filename"], "solution.py");
            }
            Decision::Stop { .. } => panic!("expected execute_code"),
        }
    }

    #[test]
    fn fallback_reasons_about_improvement_below_satisfactory_quality() {
        let mut context = ctx("p");
        context.has_artifacts = true;
        context.latest_artifact = Some("solution.py");
        context.has_executions = true;
        context.best_quality = 55;
        let decision = fallback_decision(&context, &QualityThresholds::default());
        assert!(matches!(
            decision,
            Decision::UseTool {
                tool: ToolName::Think,
                ..
            }
        ));
    }

    #[test]
    fn fallback_stops_on_low_budget_or_good_quality() {
        let mut context = ctx("p");
        context.has_artifacts = true;
        context.latest_artifact = Some("solution.py");
        context.has_executions = true;
        context.best_quality = 75;
        context.remaining_calls = 1;
        assert!(matches!(
            fallback_decision(&context, &QualityThresholds::default()),
            Decision::Stop { .. }
        ));

        context.remaining_calls = 10;
        context.best_quality = 85;
        assert!(matches!(
            fallback_decision(&context, &QualityThresholds::default()),
            Decision::Stop { .. }
        ));
    }

    #[test]
    fn fallback_regenerates_in_the_middle_ground() {
        let mut context = ctx("p");
        context.has_artifacts = true;
        context.latest_artifact = Some("solution.py");
        context.has_executions = true;
        context.best_quality = 75;
        context.remaining_calls = 10;
        assert!(matches!(
            fallback_decision(&context, &QualityThresholds::default()),
            Decision::UseTool {
                tool: ToolName::GenerateCode,
                ..
            }
        ));
    }

    #[test]
    fn thresholds_are_honored_rather_than_hardcoded() {
        let thresholds = QualityThresholds {
            satisfactory: 10,
            stop: 20,
            auto_stop: 30,
        };
        let mut context = ctx("p");
        context.has_artifacts = true;
        context.latest_artifact = Some("solution.py");
        context.has_executions = true;
        context.best_quality = 25;
        assert!(matches!(
            fallback_decision(&context, &thresholds),
            Decision::Stop { .. }
        ));
    }
}
