//! Scripted doubles for deterministic tests.

use std::cell::RefCell;
use std::collections::VecDeque;

use anyhow::{Result, anyhow};

use crate::oracle::{Message, Oracle};
use crate::tools::{ParamSpec, Tool, ToolParams, ToolResult};

/// An oracle that replays canned replies in order.
///
/// Running past the script is a test bug and returns an error, which the
/// layers under test must absorb like any oracle fault.
pub struct ScriptedOracle {
    replies: RefCell<VecDeque<String>>,
    failure: Option<String>,
    transcripts: RefCell<Vec<Vec<Message>>>,
}

impl ScriptedOracle {
    pub fn new(replies: Vec<String>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
            failure: None,
            transcripts: RefCell::new(Vec::new()),
        }
    }

    /// An oracle whose every call fails with the given message.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            replies: RefCell::new(VecDeque::new()),
            failure: Some(message.into()),
            transcripts: RefCell::new(Vec::new()),
        }
    }

    /// Number of completed oracle calls so far.
    pub fn calls(&self) -> usize {
        self.transcripts.borrow().len()
    }

    /// The transcripts seen so far, in call order.
    pub fn transcripts(&self) -> Vec<Vec<Message>> {
        self.transcripts.borrow().clone()
    }
}

impl Oracle for ScriptedOracle {
    fn complete(&self, messages: &[Message]) -> Result<String> {
        self.transcripts.borrow_mut().push(messages.to_vec());
        if let Some(message) = &self.failure {
            return Err(anyhow!("{message}"));
        }
        self.replies
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted oracle exhausted"))
    }
}

/// A tool that replays canned result envelopes and records the parameters it
/// was called with.
pub struct ScriptedTool {
    description: &'static str,
    params: &'static [ParamSpec],
    results: RefCell<VecDeque<ToolResult>>,
    invocations: RefCell<Vec<ToolParams>>,
}

impl ScriptedTool {
    pub fn new(results: Vec<ToolResult>) -> Self {
        Self {
            description: "scripted tool",
            params: &[],
            results: RefCell::new(results.into()),
            invocations: RefCell::new(Vec::new()),
        }
    }

    pub fn invocations(&self) -> Vec<ToolParams> {
        self.invocations.borrow().clone()
    }
}

impl Tool for ScriptedTool {
    fn description(&self) -> &'static str {
        self.description
    }

    fn params(&self) -> &'static [ParamSpec] {
        self.params
    }

    fn execute(&self, params: &ToolParams) -> ToolResult {
        self.invocations.borrow_mut().push(params.clone());
        self.results
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| ToolResult::fail("scripted tool exhausted"))
    }
}
