//! Typed configuration structs, grouped by concern.
//!
//! Each struct is built once at startup from an [`EnvSource`] and passed by
//! reference to the stage that needs it.

use super::env_keys::{commands as cmd_keys, launch, observability as obv_keys, paths, server};
use super::loader::{env_bool, env_optional, env_or, EnvSource};
use crate::error::ConfigError;
use serde::Serialize;
use std::fmt;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default dependency manifest, relative to the working directory.
pub const DEFAULT_MANIFEST: &str = "requirements.txt";
/// Default reference dataset written by the downloader.
pub const DEFAULT_DATASET: &str = "db/cars.csv";
/// Launcher state (provision stamp), relative to the working directory.
pub const STATE_DIR: &str = ".gt7boot";

/// Dashboard log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARNING" | "WARN" => Ok(Self::Warning),
            "ERROR" => Ok(Self::Error),
            "CRITICAL" => Ok(Self::Critical),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

/// Runtime configuration exported to the dashboard server.
///
/// Unset fields are simply not exported, leaving the server's own defaults in
/// charge (INFO logging; a missing device address fails in the server).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchConfig {
    pub log_level: Option<LogLevel>,
    pub device_address: Option<Ipv4Addr>,
    pub load_laps_path: Option<PathBuf>,
    pub add_brakepoints: Option<bool>,
    /// Open a browser tab once the server is up
    pub open_viewer: bool,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            log_level: None,
            device_address: None,
            load_laps_path: None,
            add_brakepoints: None,
            open_viewer: true,
        }
    }
}

impl LaunchConfig {
    pub fn from_source(src: &dyn EnvSource) -> Result<Self, ConfigError> {
        let log_level = env_optional(src, launch::LOG_LEVEL, launch::LOG_LEVEL_ALIASES).map(
            |raw| match raw.parse::<LogLevel>() {
                Ok(level) => level,
                Err(e) => {
                    tracing::warn!("{}, falling back to {}", e, LogLevel::default());
                    LogLevel::default()
                }
            },
        );

        let device_address = env_optional(src, launch::DEVICE_IP, launch::DEVICE_IP_ALIASES)
            .map(|raw| {
                raw.parse::<Ipv4Addr>()
                    .map_err(|_| ConfigError::InvalidDeviceIp { value: raw })
            })
            .transpose()?;

        let load_laps_path =
            env_optional(src, launch::LOAD_LAPS_PATH, launch::LOAD_LAPS_PATH_ALIASES)
                .map(PathBuf::from);

        let add_brakepoints =
            env_optional(src, launch::ADD_BRAKEPOINTS, launch::ADD_BRAKEPOINTS_ALIASES).map(|s| {
                matches!(s.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
            });

        let open_viewer = env_bool(src, launch::OPEN_VIEWER, launch::OPEN_VIEWER_ALIASES, true);

        Ok(Self {
            log_level,
            device_address,
            load_laps_path,
            add_brakepoints,
            open_viewer,
        })
    }

    /// Level the dashboard will actually run at.
    pub fn effective_log_level(&self) -> LogLevel {
        self.log_level.unwrap_or_default()
    }

    /// Variables to set in the server's environment, in a stable order.
    pub fn server_env(&self) -> Vec<(String, String)> {
        let mut env = Vec::new();
        if let Some(level) = self.log_level {
            env.push((server::GT7_LOG_LEVEL.to_string(), level.to_string()));
        }
        if let Some(ip) = self.device_address {
            env.push((server::GT7_PLAYSTATION_IP.to_string(), ip.to_string()));
        }
        if let Some(ref path) = self.load_laps_path {
            env.push((
                server::GT7_LOAD_LAPS_PATH.to_string(),
                path.to_string_lossy().to_string(),
            ));
        }
        if let Some(flag) = self.add_brakepoints {
            env.push((server::GT7_ADD_BRAKEPOINTS.to_string(), flag.to_string()));
        }
        env
    }
}

/// Values given on the command line; they win over the environment.
#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub env_root: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
}

/// Filesystem locations used by the pipeline, all absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapPaths {
    pub workdir: PathBuf,
    /// Isolated Python installation; `None` means "use whatever is on PATH"
    pub env_root: Option<PathBuf>,
    pub manifest: PathBuf,
    pub dataset: PathBuf,
    pub state_dir: PathBuf,
}

impl BootstrapPaths {
    /// Resolve the working directory: explicit override, else the current directory.
    pub fn resolve_workdir(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
        match explicit {
            Some(dir) => std::fs::canonicalize(dir).map_err(|source| ConfigError::Workdir {
                path: dir.to_path_buf(),
                source,
            }),
            None => std::env::current_dir().map_err(|source| ConfigError::Workdir {
                path: PathBuf::from("."),
                source,
            }),
        }
    }

    pub fn from_source(
        src: &dyn EnvSource,
        workdir: PathBuf,
        overrides: &PathOverrides,
    ) -> Result<Self, ConfigError> {
        let env_root = overrides
            .env_root
            .clone()
            .or_else(|| env_optional(src, paths::GT7BOOT_ENV_ROOT, paths::ENV_ROOT_CONVENTIONS).map(PathBuf::from))
            .map(|root| absolutize(&workdir, &root));
        if let Some(ref root) = env_root {
            if !root.is_dir() {
                return Err(ConfigError::EnvRootMissing(root.clone()));
            }
        }

        let manifest = overrides.manifest.clone().unwrap_or_else(|| {
            PathBuf::from(env_or(src, paths::GT7BOOT_MANIFEST, &[], || {
                DEFAULT_MANIFEST.to_string()
            }))
        });
        let dataset = PathBuf::from(env_or(src, paths::GT7BOOT_DATASET_PATH, &[], || {
            DEFAULT_DATASET.to_string()
        }));

        Ok(Self {
            manifest: absolutize(&workdir, &manifest),
            dataset: absolutize(&workdir, &dataset),
            state_dir: workdir.join(STATE_DIR),
            env_root,
            workdir,
        })
    }
}

fn absolutize(base: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}

/// Replacement command lines for the fetch and serve stages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageCommands {
    pub fetch: Option<Vec<String>>,
    pub serve: Option<Vec<String>>,
}

impl StageCommands {
    pub fn from_source(src: &dyn EnvSource) -> Self {
        let split = |key: &str| {
            env_optional(src, key, &[])
                .map(|s| s.split_whitespace().map(String::from).collect::<Vec<_>>())
        };
        Self {
            fetch: split(cmd_keys::GT7BOOT_FETCH_COMMAND),
            serve: split(cmd_keys::GT7BOOT_SERVE_COMMAND),
        }
    }
}

/// Everything the pipeline needs, resolved once per invocation.
#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    pub paths: BootstrapPaths,
    pub launch: LaunchConfig,
    pub commands: StageCommands,
    /// Reinstall even when the manifest is unchanged since the last success
    pub force_provision: bool,
}

impl BootstrapConfig {
    pub fn from_source(
        src: &dyn EnvSource,
        workdir: PathBuf,
        overrides: &PathOverrides,
        force_provision: bool,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            paths: BootstrapPaths::from_source(src, workdir, overrides)?,
            launch: LaunchConfig::from_source(src)?,
            commands: StageCommands::from_source(src),
            force_provision: force_provision
                || env_bool(src, cmd_keys::GT7BOOT_FORCE_PROVISION, &[], false),
        })
    }
}

/// Logging configuration for the launcher itself.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_filter: String,
    pub log_json: bool,
    pub audit_log: Option<PathBuf>,
}

impl ObservabilityConfig {
    pub const DEFAULT_FILTER: &'static str = "gt7boot=info,gt7boot_core=info,gt7boot_runtime=info";
    pub const QUIET_FILTER: &'static str = "gt7boot=warn,gt7boot_core=warn,gt7boot_runtime=warn";

    pub fn from_source(src: &dyn EnvSource) -> Self {
        Self {
            quiet: env_bool(src, obv_keys::GT7BOOT_QUIET, &[], false),
            log_filter: env_or(src, obv_keys::GT7BOOT_LOG, &[], || {
                Self::DEFAULT_FILTER.to_string()
            }),
            log_json: env_bool(src, obv_keys::GT7BOOT_LOG_JSON, &[], false),
            audit_log: env_optional(src, obv_keys::GT7BOOT_AUDIT_LOG, &[]).map(PathBuf::from),
        }
    }
}
