//! Durable session artifacts under `logs/`: per-execution logs and the
//! session report.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::core::score::TestSummary;

/// Everything recorded about one artifact execution, for the log file.
#[derive(Debug, Clone)]
pub struct ExecutionLogEntry<'a> {
    pub script_path: &'a Path,
    pub exit_code: i32,
    pub timed_out: bool,
    pub duration_ms: u64,
    pub stdout: &'a str,
    pub stderr: &'a str,
    pub tests: &'a TestSummary,
}

/// Write a timestamped execution log, returning its path.
pub fn write_execution_log(logs_dir: &Path, entry: &ExecutionLogEntry<'_>) -> Result<PathBuf> {
    fs::create_dir_all(logs_dir)
        .with_context(|| format!("create log dir {}", logs_dir.display()))?;
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S_%3f");
    let path = logs_dir.join(format!("execution_{timestamp}.log"));

    let status = if entry.exit_code == 0 && !entry.timed_out {
        "SUCCESS"
    } else {
        "FAILED"
    };
    let mut buf = String::new();
    buf.push_str(&format!("EXECUTION LOG - {timestamp}\n"));
    buf.push_str(&format!("SCRIPT: {}\n", entry.script_path.display()));
    buf.push_str(&format!("EXIT CODE: {}\n", entry.exit_code));
    buf.push_str(&format!("DURATION: {} ms\n", entry.duration_ms));
    buf.push_str(&format!("STATUS: {status}\n"));
    if entry.timed_out {
        buf.push_str("TIMED OUT: true\n");
    }
    buf.push_str(&format!(
        "TESTS: total={} passed={} failed={} detected={}\n",
        entry.tests.total, entry.tests.passed, entry.tests.failed, entry.tests.detected
    ));
    buf.push_str("\n=== stdout ===\n");
    buf.push_str(entry.stdout);
    buf.push_str("\n=== stderr ===\n");
    buf.push_str(entry.stderr);
    buf.push('\n');

    fs::write(&path, buf).with_context(|| format!("write execution log {}", path.display()))?;
    Ok(path)
}

/// Persist the session report as pretty JSON under `logs/`, returning its
/// path.
pub fn write_session_report<T: Serialize>(logs_dir: &Path, report: &T) -> Result<PathBuf> {
    fs::create_dir_all(logs_dir)
        .with_context(|| format!("create log dir {}", logs_dir.display()))?;
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let path = logs_dir.join(format!("session_report_{timestamp}.json"));

    let mut buf = serde_json::to_string_pretty(report).context("serialize session report")?;
    buf.push('\n');
    fs::write(&path, buf).with_context(|| format!("write session report {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_log_records_streams_and_summary() {
        let temp = tempfile::tempdir().expect("tempdir");
        let tests = TestSummary {
            total: 3,
            passed: 2,
            failed: 1,
            detected: true,
        };
        let path = write_execution_log(
            temp.path(),
            &ExecutionLogEntry {
                script_path: Path::new("solutions/a.py"),
                exit_code: 0,
                timed_out: false,
                duration_ms: 42,
                stdout: "2 passed\n1 failed\n",
                stderr: "",
                tests: &tests,
            },
        )
        .expect("write");

        let contents = fs::read_to_string(&path).expect("read");
        assert!(contents.contains("SCRIPT: solutions/a.py"));
        assert!(contents.contains("STATUS: SUCCESS"));
        assert!(contents.contains("total=3 passed=2 failed=1"));
        assert!(contents.contains("=== stdout ===\n2 passed"));
    }

    #[test]
    fn session_report_is_pretty_json_with_trailing_newline() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = write_session_report(temp.path(), &serde_json::json!({"status": "ok"}))
            .expect("write");
        let contents = fs::read_to_string(&path).expect("read");
        assert!(contents.starts_with("{\n"));
        assert!(contents.ends_with("}\n"));
        assert!(
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("session_report_") && n.ends_with(".json"))
        );
    }
}
