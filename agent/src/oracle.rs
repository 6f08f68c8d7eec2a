//! Reasoning-oracle abstraction.
//!
//! The [`Oracle`] trait decouples the loop from the actual LLM backend. The
//! production backend spawns a configured chat CLI; tests use scripted
//! oracles that return predetermined replies without spawning processes.
//!
//! The oracle is free text with no guaranteed determinism: callers must
//! tolerate any reply, including an empty string, and never assume JSON-only
//! output.

use std::process::Command;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{debug, instrument};

use crate::io::process::run_command_with_timeout;

/// Speaker of one transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One message in an oracle transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Abstraction over completion backends.
pub trait Oracle {
    /// Complete the transcript, returning the raw free-text reply.
    fn complete(&self, messages: &[Message]) -> Result<String>;
}

/// Oracle that spawns a chat CLI, feeds the role-tagged transcript on stdin,
/// and reads the completion from stdout.
pub struct CommandOracle {
    command: Vec<String>,
    timeout: Duration,
    output_limit_bytes: usize,
}

impl CommandOracle {
    pub fn new(command: Vec<String>, timeout: Duration, output_limit_bytes: usize) -> Self {
        Self {
            command,
            timeout,
            output_limit_bytes,
        }
    }
}

impl Oracle for CommandOracle {
    #[instrument(skip_all, fields(timeout_secs = self.timeout.as_secs()))]
    fn complete(&self, messages: &[Message]) -> Result<String> {
        if self.command.is_empty() {
            return Err(anyhow!("oracle command is empty"));
        }
        let mut cmd = Command::new(&self.command[0]);
        cmd.args(&self.command[1..]);

        let transcript = render_transcript(messages);
        let output = run_command_with_timeout(
            cmd,
            Some(transcript.as_bytes()),
            self.timeout,
            self.output_limit_bytes,
        )?;

        if output.timed_out {
            return Err(anyhow!("oracle call timed out after {:?}", self.timeout));
        }
        if !output.status.success() {
            return Err(anyhow!(
                "oracle command failed with status {:?}: {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        let reply = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(reply_bytes = reply.len(), "oracle replied");
        Ok(reply)
    }
}

fn render_transcript(messages: &[Message]) -> String {
    let mut buf = String::new();
    for message in messages {
        buf.push_str("### ");
        buf.push_str(message.role.as_str());
        buf.push('\n');
        buf.push_str(&message.content);
        buf.push_str("\n\n");
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_tags_each_role() {
        let transcript = render_transcript(&[
            Message::system("be brief"),
            Message::user("hello"),
        ]);
        assert!(transcript.starts_with("### system\nbe brief\n\n"));
        assert!(transcript.contains("### user\nhello\n\n"));
    }

    #[test]
    fn command_oracle_pipes_transcript_and_returns_stdout() {
        let oracle = CommandOracle::new(
            vec!["cat".to_string(), "-".to_string()],
            Duration::from_secs(5),
            10_000,
        );
        let reply = oracle.complete(&[Message::user("echo me")]).expect("reply");
        assert!(reply.contains("echo me"));
    }

    #[test]
    fn failing_command_is_an_error() {
        let oracle = CommandOracle::new(
            vec!["sh".to_string(), "-c".to_string(), "exit 7".to_string()],
            Duration::from_secs(5),
            10_000,
        );
        let err = oracle.complete(&[Message::user("x")]).unwrap_err();
        assert!(err.to_string().contains("oracle command failed"));
    }
}
