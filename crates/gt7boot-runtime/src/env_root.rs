//! Resolve the interpreter inside an environment root (venv / conda prefix).
//!
//! Every stage runs through the same interpreter, so packages installed by the
//! provisioner are the ones the downloader and the server see.

use std::path::{Path, PathBuf};

/// Executables the pipeline needs, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeTools {
    /// Environment root, if one was configured
    pub root: Option<PathBuf>,
    /// Python interpreter (inside the root, or found on PATH)
    pub python: PathBuf,
}

impl RuntimeTools {
    pub fn resolve(root: Option<&Path>) -> Self {
        let python = match root {
            Some(root) => tool_path(root, "python"),
            None => system_python(),
        };
        tracing::debug!(python = %python.display(), "Resolved interpreter");
        Self {
            root: root.map(Path::to_path_buf),
            python,
        }
    }
}

/// Location of `name` inside an environment root: `bin/<name>` on Unix layouts,
/// `Scripts/<name>.exe` for Windows venvs, `<name>.exe` at a conda root.
/// Falls back to the platform's usual layout when nothing exists yet.
pub fn tool_path(root: &Path, name: &str) -> PathBuf {
    let exe = format!("{}.exe", name);
    let candidates = [
        root.join("bin").join(name),
        root.join("Scripts").join(&exe),
        root.join(&exe),
    ];
    if let Some(found) = candidates.iter().find(|p| p.is_file()) {
        return found.clone();
    }
    if cfg!(windows) {
        root.join("Scripts").join(exe)
    } else {
        root.join("bin").join(name)
    }
}

fn system_python() -> PathBuf {
    for name in ["python3", "python"] {
        if let Ok(path) = which::which(name) {
            return path;
        }
    }
    // Let the installer spawn fail with a clear "not found".
    PathBuf::from("python3")
}
