//! Workspace layout: a root directory with `solutions/` for generated
//! artifacts and `logs/` for execution logs and session reports.
//!
//! All tool file paths resolve relative to this root and must not escape it.

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, anyhow};

/// Resolved workspace directories for one session.
#[derive(Debug, Clone)]
pub struct WorkspacePaths {
    pub root: PathBuf,
    pub solutions_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl WorkspacePaths {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            solutions_dir: root.join("solutions"),
            logs_dir: root.join("logs"),
        }
    }

    /// Create the workspace directories if missing.
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.solutions_dir)
            .with_context(|| format!("create {}", self.solutions_dir.display()))?;
        fs::create_dir_all(&self.logs_dir)
            .with_context(|| format!("create {}", self.logs_dir.display()))?;
        Ok(())
    }

    /// Resolve `filename` (optionally under `directory`) inside the
    /// workspace, rejecting absolute paths and parent traversal.
    pub fn resolve(&self, directory: Option<&str>, filename: &str) -> Result<PathBuf> {
        let mut path = self.root.clone();
        if let Some(dir) = directory.filter(|d| !d.is_empty()) {
            path.push(check_relative(dir)?);
        }
        path.push(check_relative(filename)?);
        Ok(path)
    }
}

fn check_relative(part: &str) -> Result<&Path> {
    let path = Path::new(part);
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => {
                return Err(anyhow!("path {part:?} escapes the workspace"));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(anyhow!("path {part:?} must be relative to the workspace"));
            }
        }
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_creates_solutions_and_logs() {
        let temp = tempfile::tempdir().expect("tempdir");
        let paths = WorkspacePaths::new(temp.path());
        paths.init().expect("init");
        assert!(paths.solutions_dir.is_dir());
        assert!(paths.logs_dir.is_dir());
    }

    #[test]
    fn resolve_joins_directory_and_filename() {
        let paths = WorkspacePaths::new(Path::new("/ws"));
        let resolved = paths.resolve(Some("solutions"), "a.py").expect("resolve");
        assert_eq!(resolved, PathBuf::from("/ws/solutions/a.py"));

        let resolved = paths.resolve(None, "notes.txt").expect("resolve");
        assert_eq!(resolved, PathBuf::from("/ws/notes.txt"));
    }

    #[test]
    fn resolve_rejects_escapes() {
        let paths = WorkspacePaths::new(Path::new("/ws"));
        assert!(paths.resolve(None, "../outside.txt").is_err());
        assert!(paths.resolve(Some("../logs"), "a.txt").is_err());
        assert!(paths.resolve(None, "/etc/passwd").is_err());
        assert!(paths.resolve(Some("solutions"), "nested/../../x").is_err());
    }
}
