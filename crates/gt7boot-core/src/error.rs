//! Errors shared by every stage, and the process exit codes they map to.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Process exit codes for failures before the dashboard server runs.
///
/// sysexits-flavoured so each stage is distinguishable from the others and
/// from an ordinary server crash (which is forwarded verbatim).
pub mod exit_code {
    /// EX_NOINPUT: manifest missing or invalid
    pub const MANIFEST: i32 = 66;
    /// EX_UNAVAILABLE: package installation failed
    pub const INSTALL: i32 = 69;
    /// EX_SOFTWARE: lost track of the running server
    pub const LAUNCH_WAIT: i32 = 70;
    /// EX_TEMPFAIL: reference data download failed
    pub const FETCH: i32 = 75;
    /// EX_CONFIG: invalid runtime configuration
    pub const CONFIG: i32 = 78;
    /// Server binary could not be started (shell convention for "not found")
    pub const LAUNCH_SPAWN: i32 = 127;
    /// Interrupted by the operator before the server started (128 + SIGINT)
    pub const INTERRUPTED: i32 = 130;
}

/// Invalid launcher configuration. Raised before any stage runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("DEVICE_IP '{value}' is not a valid IPv4 address")]
    InvalidDeviceIp { value: String },

    #[error("environment root does not exist: {}", .0.display())]
    EnvRootMissing(PathBuf),

    #[error("working directory {} is not usable: {source}", path.display())]
    Workdir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A single manifest line that could not be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("line {line}: '{content}': {reason}")]
pub struct RequirementError {
    /// 1-based line number
    pub line: usize,
    pub content: String,
    pub reason: String,
}

/// Dependency manifest missing or syntactically invalid.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("dependency manifest not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("cannot read dependency manifest {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid dependency manifest {}: {source}", path.display())]
    Invalid {
        path: PathBuf,
        #[source]
        source: RequirementError,
    },
}
