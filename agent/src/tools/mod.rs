//! The capability set the loop can dispatch to.
//!
//! Every tool implements [`Tool`]: a named operation with a description and a
//! parameter schema (used only to build the decision prompt) and an
//! `execute` method returning a uniform [`ToolResult`] envelope. A tool never
//! lets a fault escape its boundary; internal errors become
//! `{success: false, error}` envelopes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod codegen;
pub mod execute;
pub mod file;
pub mod think;

use crate::io::workspace::WorkspacePaths;
use crate::oracle::Oracle;

/// Named parameters for a tool invocation, as decided by the oracle.
pub type ToolParams = serde_json::Map<String, Value>;

/// Closed enumeration of dispatchable tools.
///
/// Decisions are validated against this set by name; there is no open-ended
/// dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    Think,
    GenerateCode,
    ReadFile,
    WriteFile,
    ExecuteCode,
}

impl ToolName {
    pub const ALL: [ToolName; 5] = [
        ToolName::Think,
        ToolName::GenerateCode,
        ToolName::ReadFile,
        ToolName::WriteFile,
        ToolName::ExecuteCode,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::Think => "think",
            ToolName::GenerateCode => "generate_code",
            ToolName::ReadFile => "read_file",
            ToolName::WriteFile => "write_file",
            ToolName::ExecuteCode => "execute_code",
        }
    }

    pub fn parse(name: &str) -> Option<ToolName> {
        ToolName::ALL.iter().copied().find(|t| t.as_str() == name)
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform result envelope returned by every tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    #[serde(default)]
    pub result: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn ok(result: Value) -> Self {
        Self {
            success: true,
            result,
            error: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: Value::Null,
            error: Some(error.into()),
        }
    }
}

/// One named parameter in a tool's schema.
///
/// Descriptive only: the selector validates tool names, not parameter types.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub required: bool,
    pub purpose: &'static str,
}

/// A single dispatchable capability.
pub trait Tool {
    /// Human-readable description, rendered into the decision prompt.
    fn description(&self) -> &'static str;

    /// Parameter schema, rendered into the decision prompt.
    fn params(&self) -> &'static [ParamSpec];

    /// Run the tool. Must not panic or return early on internal faults;
    /// failures are reported through the envelope.
    fn execute(&self, params: &ToolParams) -> ToolResult;
}

/// Prompt-facing view of one registered tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
}

/// Fixed mapping from tool names to implementations.
pub struct ToolRegistry<'a> {
    entries: Vec<(ToolName, Box<dyn Tool + 'a>)>,
}

impl<'a> ToolRegistry<'a> {
    /// The standard five-tool set backed by the given oracle and workspace.
    pub fn standard(
        oracle: &'a dyn Oracle,
        paths: &WorkspacePaths,
        settings: &execute::ExecSettings,
    ) -> Self {
        let entries: Vec<(ToolName, Box<dyn Tool + 'a>)> = vec![
            (ToolName::Think, Box::new(think::ThinkTool::new(oracle))),
            (
                ToolName::GenerateCode,
                Box::new(codegen::GenerateCodeTool::new(oracle)),
            ),
            (
                ToolName::ReadFile,
                Box::new(file::ReadFileTool::new(paths.clone())),
            ),
            (
                ToolName::WriteFile,
                Box::new(file::WriteFileTool::new(paths.clone())),
            ),
            (
                ToolName::ExecuteCode,
                Box::new(execute::ExecuteCodeTool::new(paths.clone(), settings.clone())),
            ),
        ];
        Self { entries }
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn from_entries(entries: Vec<(ToolName, Box<dyn Tool + 'a>)>) -> Self {
        Self { entries }
    }

    pub fn get(&self, name: ToolName) -> Option<&dyn Tool> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, tool)| tool.as_ref())
    }

    pub fn names(&self) -> Vec<ToolName> {
        self.entries.iter().map(|(n, _)| *n).collect()
    }

    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.entries
            .iter()
            .map(|(name, tool)| ToolSchema {
                name: name.to_string(),
                description: tool.description().to_string(),
                params: tool.params().to_vec(),
            })
            .collect()
    }
}

/// Fetch a required string parameter, or build the standard missing-parameter
/// failure envelope.
pub(crate) fn require_str<'p>(
    params: &'p ToolParams,
    key: &str,
) -> Result<&'p str, ToolResult> {
    match params.get(key).and_then(Value::as_str) {
        Some(value) => Ok(value),
        None => Err(ToolResult::fail(format!(
            "missing required parameter `{key}`"
        ))),
    }
}

/// Fetch an optional string parameter, treating non-strings as absent.
pub(crate) fn optional_str<'p>(params: &'p ToolParams, key: &str) -> Option<&'p str> {
    params.get(key).and_then(Value::as_str)
}
