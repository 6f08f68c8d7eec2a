//! Agent configuration stored as `agent.toml` in the workspace root.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::score::QualityThresholds;

/// Agent configuration (TOML).
///
/// This file is intended to be edited by humans and must remain stable and
/// automatable. Missing fields default to sensible values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    /// Maximum tool invocations per session.
    pub max_tool_calls: u32,

    /// Wall-clock budget in seconds for one artifact execution.
    pub exec_timeout_secs: u64,

    /// Wall-clock budget in seconds for one oracle call.
    pub oracle_timeout_secs: u64,

    /// Truncate captured stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,

    /// Quality score below which fallback decisions keep improving.
    pub satisfactory_quality: u8,

    /// Quality score at which a fallback decision may stop.
    pub stop_quality: u8,

    /// Quality score at which the loop self-terminates.
    pub auto_stop_quality: u8,

    /// Command prefix used to execute artifacts (e.g. `["python3"]`).
    pub interpreter: Vec<String>,

    pub oracle: OracleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OracleConfig {
    /// Command to invoke for completions; the transcript is fed on stdin and
    /// the completion read from stdout.
    pub command: Vec<String>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            command: vec!["ollama".to_string(), "run".to_string(), "llama3".to_string()],
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_calls: 15,
            exec_timeout_secs: 30,
            oracle_timeout_secs: 120,
            output_limit_bytes: 100_000,
            satisfactory_quality: 70,
            stop_quality: 80,
            auto_stop_quality: 90,
            interpreter: vec!["python3".to_string()],
            oracle: OracleConfig::default(),
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_tool_calls == 0 {
            return Err(anyhow!("max_tool_calls must be > 0"));
        }
        if self.exec_timeout_secs == 0 {
            return Err(anyhow!("exec_timeout_secs must be > 0"));
        }
        if self.oracle_timeout_secs == 0 {
            return Err(anyhow!("oracle_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.interpreter.is_empty() || self.interpreter[0].trim().is_empty() {
            return Err(anyhow!("interpreter must be a non-empty array"));
        }
        if self.oracle.command.is_empty() || self.oracle.command[0].trim().is_empty() {
            return Err(anyhow!("oracle.command must be a non-empty array"));
        }
        if !(self.satisfactory_quality <= self.stop_quality
            && self.stop_quality <= self.auto_stop_quality
            && self.auto_stop_quality <= 100)
        {
            return Err(anyhow!(
                "quality thresholds must satisfy satisfactory <= stop <= auto_stop <= 100"
            ));
        }
        Ok(())
    }

    pub fn thresholds(&self) -> QualityThresholds {
        QualityThresholds {
            satisfactory: self.satisfactory_quality,
            stop: self.stop_quality,
            auto_stop: self.auto_stop_quality,
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AgentConfig::default()`.
pub fn load_config(path: &Path) -> Result<AgentConfig> {
    if !path.exists() {
        let cfg = AgentConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AgentConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &AgentConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
