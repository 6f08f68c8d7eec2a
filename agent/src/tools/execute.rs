//! Run a workspace artifact through the configured interpreter and score the
//! run.

use std::process::Command;
use std::time::{Duration, Instant};

use serde_json::{Value, json};
use tracing::warn;

use crate::core::score::TestSummary;
use crate::io::process::run_command_with_timeout;
use crate::io::session_log::{ExecutionLogEntry, write_execution_log};
use crate::io::workspace::WorkspacePaths;
use crate::tools::{ParamSpec, Tool, ToolParams, ToolResult, optional_str, require_str};

/// Synthetic exit code reported when the interpreter was killed on timeout.
pub const EXIT_TIMED_OUT: i32 = -1;
/// Synthetic exit code reported when the interpreter could not be started.
pub const EXIT_SPAWN_FAILED: i32 = -2;

const PARAMS: [ParamSpec; 3] = [
    ParamSpec {
        name: "filename",
        required: true,
        purpose: "name of the artifact to execute",
    },
    ParamSpec {
        name: "directory",
        required: false,
        purpose: "subdirectory within the workspace (default 'solutions')",
    },
    ParamSpec {
        name: "timeout_secs",
        required: false,
        purpose: "per-run timeout override in seconds",
    },
];

/// Execution knobs, taken from the agent configuration.
#[derive(Debug, Clone)]
pub struct ExecSettings {
    /// Interpreter argv prefix, e.g. `["python3"]`; the script path is
    /// appended.
    pub interpreter: Vec<String>,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

pub struct ExecuteCodeTool {
    paths: WorkspacePaths,
    settings: ExecSettings,
}

impl ExecuteCodeTool {
    pub fn new(paths: WorkspacePaths, settings: ExecSettings) -> Self {
        Self { paths, settings }
    }
}

impl Tool for ExecuteCodeTool {
    fn description(&self) -> &'static str {
        "Execute a solution artifact, capture its output and detect test results"
    }

    fn params(&self) -> &'static [ParamSpec] {
        &PARAMS
    }

    fn execute(&self, params: &ToolParams) -> ToolResult {
        let filename = match require_str(params, "filename") {
            Ok(filename) => filename,
            Err(fail) => return fail,
        };
        let directory = Some(optional_str(params, "directory").unwrap_or("solutions"));
        let timeout = params
            .get("timeout_secs")
            .and_then(Value::as_u64)
            .map(Duration::from_secs)
            .unwrap_or(self.settings.timeout);

        let path = match self.paths.resolve(directory, filename) {
            Ok(path) => path,
            Err(e) => return ToolResult::fail(format!("{e:#}")),
        };
        if !path.is_file() {
            return ToolResult::fail(format!("script not found: {}", path.display()));
        }
        let Some((program, args)) = self.settings.interpreter.split_first() else {
            return ToolResult::fail("no interpreter configured");
        };

        let mut cmd = Command::new(program);
        cmd.args(args).arg(&path).current_dir(&self.paths.root);

        let started = Instant::now();
        let run = run_command_with_timeout(cmd, None, timeout, self.settings.output_limit_bytes);
        let duration_ms = started.elapsed().as_millis() as u64;

        // Runner faults (a missing interpreter, most commonly) are reported as
        // a failed run rather than a tool fault, so the loop can still score
        // and react to them.
        let (exit_code, stdout, stderr, timed_out) = match run {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
                let stderr = if output.timed_out {
                    format!("execution timed out after {}s", timeout.as_secs())
                } else {
                    String::from_utf8_lossy(&output.stderr).into_owned()
                };
                let exit_code = if output.timed_out {
                    EXIT_TIMED_OUT
                } else {
                    output.status.code().unwrap_or(EXIT_SPAWN_FAILED)
                };
                (exit_code, stdout, stderr, output.timed_out)
            }
            Err(e) => (EXIT_SPAWN_FAILED, String::new(), format!("{e:#}"), false),
        };

        let tests = parse_test_results(&stdout);
        let log_file = match write_execution_log(
            &self.paths.logs_dir,
            &ExecutionLogEntry {
                script_path: &path,
                exit_code,
                timed_out,
                duration_ms,
                stdout: &stdout,
                stderr: &stderr,
                tests: &tests,
            },
        ) {
            Ok(log_path) => Some(log_path.display().to_string()),
            Err(e) => {
                warn!(err = format!("{e:#}"), "failed to write execution log");
                None
            }
        };

        ToolResult::ok(json!({
            "stdout": stdout,
            "stderr": stderr,
            "exit_code": exit_code,
            "duration_ms": duration_ms,
            "timed_out": timed_out,
            "tests": tests,
            "log_file": log_file,
        }))
    }
}

/// Scan stdout for self-test markers.
///
/// Any line reporting a pass or a fail counts once; lines merely mentioning
/// tests flag detection without contributing a result.
pub fn parse_test_results(stdout: &str) -> TestSummary {
    let mut summary = TestSummary::default();
    for line in stdout.lines() {
        let lower = line.to_lowercase();
        if lower.contains('\u{2705}') || lower.contains("passed") {
            summary.passed += 1;
            summary.detected = true;
        } else if lower.contains('\u{274c}') || lower.contains("failed") {
            summary.failed += 1;
            summary.detected = true;
        } else if lower.contains("test case") || lower.contains("testing") {
            summary.detected = true;
        }
    }
    summary.total = summary.passed + summary.failed;
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn shell_settings() -> ExecSettings {
        ExecSettings {
            interpreter: vec!["sh".to_string()],
            timeout: Duration::from_secs(5),
            output_limit_bytes: 100_000,
        }
    }

    fn workspace_with(script: &str, body: &str) -> (tempfile::TempDir, WorkspacePaths) {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = WorkspacePaths::new(temp.path());
        paths.init().expect("init");
        std::fs::write(paths.solutions_dir.join(script), body).expect("write script");
        (temp, paths)
    }

    fn params(filename: &str) -> ToolParams {
        let mut params = ToolParams::new();
        params.insert("filename".to_string(), json!(filename));
        params
    }

    #[test]
    fn successful_run_reports_output_and_tests() {
        let (_temp, paths) = workspace_with(
            "ok.sh",
            "echo 'test case 1 passed'\necho 'test case 2 passed'\n",
        );
        let tool = ExecuteCodeTool::new(paths.clone(), shell_settings());
        let result = tool.execute(&params("ok.sh"));

        assert!(result.success);
        assert_eq!(result.result["exit_code"], 0);
        assert_eq!(result.result["tests"]["passed"], 2);
        assert_eq!(result.result["tests"]["total"], 2);
        assert_eq!(result.result["tests"]["detected"], true);
        let log_file = result.result["log_file"].as_str().expect("log path");
        assert!(std::path::Path::new(log_file).is_file());
    }

    #[test]
    fn missing_script_is_a_tool_failure() {
        let (_temp, paths) = workspace_with("ok.sh", "true\n");
        let tool = ExecuteCodeTool::new(paths, shell_settings());
        let result = tool.execute(&params("absent.sh"));
        assert!(!result.success);
        assert!(
            result
                .error
                .as_deref()
                .is_some_and(|e| e.contains("script not found"))
        );
    }

    #[test]
    fn timeout_yields_a_synthetic_exit_code() {
        let (_temp, paths) = workspace_with("slow.sh", "sleep 30\n");
        let mut settings = shell_settings();
        settings.timeout = Duration::from_millis(100);
        let tool = ExecuteCodeTool::new(paths, settings);

        let result = tool.execute(&params("slow.sh"));
        assert!(result.success);
        assert_eq!(result.result["exit_code"], EXIT_TIMED_OUT);
        assert_eq!(result.result["timed_out"], true);
        assert!(
            result.result["stderr"]
                .as_str()
                .expect("stderr")
                .contains("timed out")
        );
    }

    #[test]
    fn missing_interpreter_reports_a_failed_run() {
        let (_temp, paths) = workspace_with("ok.sh", "true\n");
        let mut settings = shell_settings();
        settings.interpreter = vec!["definitely-not-an-interpreter".to_string()];
        let tool = ExecuteCodeTool::new(paths, settings);

        let result = tool.execute(&params("ok.sh"));
        assert!(result.success);
        assert_eq!(result.result["exit_code"], EXIT_SPAWN_FAILED);
        assert!(!result.result["stderr"].as_str().expect("stderr").is_empty());
    }

    #[test]
    fn nonzero_exit_and_failed_tests_are_both_visible() {
        let (_temp, paths) = workspace_with("bad.sh", "echo 'case failed'\nexit 2\n");
        let tool = ExecuteCodeTool::new(paths, shell_settings());
        let result = tool.execute(&params("bad.sh"));
        assert!(result.success);
        assert_eq!(result.result["exit_code"], 2);
        assert_eq!(result.result["tests"]["failed"], 1);
    }

    #[test]
    fn test_markers_without_results_set_detected_only() {
        let summary = parse_test_results("testing the widget\nall good\n");
        assert!(summary.detected);
        assert_eq!(summary.total, 0);
    }
}
