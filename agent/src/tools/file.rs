//! Workspace file access: read and write artifacts under the workspace root.

use std::fs;

use serde_json::{Value, json};

use crate::io::workspace::WorkspacePaths;
use crate::tools::{ParamSpec, Tool, ToolParams, ToolResult, optional_str, require_str};

const READ_PARAMS: [ParamSpec; 2] = [
    ParamSpec {
        name: "filename",
        required: true,
        purpose: "name of the artifact to read",
    },
    ParamSpec {
        name: "directory",
        required: false,
        purpose: "subdirectory within the workspace (e.g. 'solutions', 'logs')",
    },
];

const WRITE_PARAMS: [ParamSpec; 4] = [
    ParamSpec {
        name: "filename",
        required: true,
        purpose: "name of the artifact to write",
    },
    ParamSpec {
        name: "content",
        required: true,
        purpose: "content to write",
    },
    ParamSpec {
        name: "directory",
        required: false,
        purpose: "subdirectory within the workspace (default 'solutions')",
    },
    ParamSpec {
        name: "overwrite",
        required: false,
        purpose: "whether an existing artifact may be replaced (default true)",
    },
];

pub struct ReadFileTool {
    paths: WorkspacePaths,
}

impl ReadFileTool {
    pub fn new(paths: WorkspacePaths) -> Self {
        Self { paths }
    }
}

impl Tool for ReadFileTool {
    fn description(&self) -> &'static str {
        "Read the content of an artifact in the agent workspace"
    }

    fn params(&self) -> &'static [ParamSpec] {
        &READ_PARAMS
    }

    fn execute(&self, params: &ToolParams) -> ToolResult {
        let filename = match require_str(params, "filename") {
            Ok(filename) => filename,
            Err(fail) => return fail,
        };
        let directory = optional_str(params, "directory");

        let path = match self.paths.resolve(directory, filename) {
            Ok(path) => path,
            Err(e) => return ToolResult::fail(format!("{e:#}")),
        };
        if !path.exists() {
            return ToolResult::fail(format!("file not found: {}", path.display()));
        }
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                return ToolResult::fail(format!("cannot read {}: {e}", path.display()));
            }
        };
        let content = match String::from_utf8(bytes) {
            Ok(content) => content,
            Err(_) => {
                return ToolResult::fail(format!(
                    "cannot read {filename}: not valid UTF-8 text"
                ));
            }
        };

        ToolResult::ok(json!({
            "content": content,
            "path": path.display().to_string(),
            "size": content.len(),
            "line_count": content.lines().count(),
        }))
    }
}

pub struct WriteFileTool {
    paths: WorkspacePaths,
}

impl WriteFileTool {
    pub fn new(paths: WorkspacePaths) -> Self {
        Self { paths }
    }
}

impl Tool for WriteFileTool {
    fn description(&self) -> &'static str {
        "Write content to an artifact in the agent workspace, creating directories as needed"
    }

    fn params(&self) -> &'static [ParamSpec] {
        &WRITE_PARAMS
    }

    fn execute(&self, params: &ToolParams) -> ToolResult {
        let filename = match require_str(params, "filename") {
            Ok(filename) => filename,
            Err(fail) => return fail,
        };
        let content = match require_str(params, "content") {
            Ok(content) => content,
            Err(fail) => return fail,
        };
        let directory = optional_str(params, "directory").unwrap_or("solutions");
        let overwrite = params
            .get("overwrite")
            .and_then(Value::as_bool)
            .unwrap_or(true);

        let path = match self.paths.resolve(Some(directory), filename) {
            Ok(path) => path,
            Err(e) => return ToolResult::fail(format!("{e:#}")),
        };
        if path.exists() && !overwrite {
            return ToolResult::fail(format!(
                "artifact {filename} already exists and overwrite is false"
            ));
        }
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                return ToolResult::fail(format!("create {}: {e}", parent.display()));
            }
        }
        if let Err(e) = fs::write(&path, content) {
            return ToolResult::fail(format!("write {}: {e}", path.display()));
        }

        ToolResult::ok(json!({
            "path": path.display().to_string(),
            "bytes_written": content.len(),
            "line_count": content.lines().count(),
        }))
    }
}
