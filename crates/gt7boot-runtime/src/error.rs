//! Stage errors and the umbrella [`BootstrapError`] the pipeline returns.

use std::io;
use std::path::PathBuf;

use gt7boot_core::error::{exit_code, ConfigError, ManifestError};
use thiserror::Error;

use crate::process::ProcessExit;

/// Package installation failed. The environment may be partially provisioned
/// and is never used to launch the dashboard.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("failed to start installer {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("installer exited with {status}")]
    Failed { status: ProcessExit },
}

/// The reference data download did not produce a usable dataset.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to start downloader {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("downloader exited with {status}")]
    Failed { status: ProcessExit },

    #[error("downloader succeeded but {} was not written", .0.display())]
    MissingDataset(PathBuf),

    #[error("downloader succeeded but {} is empty", .0.display())]
    EmptyDataset(PathBuf),
}

/// The dashboard server could not be started or waited on.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to start dashboard server {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("lost track of dashboard server: {0}")]
    Wait(#[source] io::Error),
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("provisioning: {0}")]
    Manifest(#[from] ManifestError),

    #[error("provisioning: {0}")]
    Install(#[from] InstallError),

    #[error("fetching reference data: {0}")]
    Fetch(#[from] FetchError),

    #[error("launching dashboard: {0}")]
    Launch(#[from] LaunchError),

    #[error("interrupted before the dashboard started")]
    Interrupted,
}

impl BootstrapError {
    /// Exit code reported to the invoking shell.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => exit_code::CONFIG,
            Self::Manifest(_) => exit_code::MANIFEST,
            Self::Install(_) => exit_code::INSTALL,
            Self::Fetch(_) => exit_code::FETCH,
            Self::Launch(LaunchError::Spawn { .. }) => exit_code::LAUNCH_SPAWN,
            Self::Launch(LaunchError::Wait(_)) => exit_code::LAUNCH_WAIT,
            Self::Interrupted => exit_code::INTERRUPTED,
        }
    }

    /// Short error class name, used in the audit trail.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Manifest(_) => "manifest",
            Self::Install(_) => "install",
            Self::Fetch(_) => "fetch",
            Self::Launch(_) => "launch",
            Self::Interrupted => "interrupted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_per_class() {
        let errors = [
            BootstrapError::Config(ConfigError::InvalidDeviceIp { value: "x".into() }),
            BootstrapError::Manifest(ManifestError::Missing("requirements.txt".into())),
            BootstrapError::Install(InstallError::Failed {
                status: ProcessExit::Code(1),
            }),
            BootstrapError::Fetch(FetchError::Failed {
                status: ProcessExit::Code(1),
            }),
            BootstrapError::Launch(LaunchError::Spawn {
                program: "bokeh".into(),
                source: io::Error::from(io::ErrorKind::NotFound),
            }),
            BootstrapError::Interrupted,
        ];
        let mut codes: Vec<i32> = errors.iter().map(BootstrapError::exit_code).collect();
        assert!(codes.iter().all(|c| *c != 0));
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_messages_name_the_stage() {
        let install = BootstrapError::from(InstallError::Failed {
            status: ProcessExit::Code(1),
        });
        let launch = BootstrapError::from(LaunchError::Wait(io::Error::from(
            io::ErrorKind::Interrupted,
        )));
        assert_eq!(install.to_string(), "provisioning: installer exited with exit status 1");
        assert!(launch.to_string().starts_with("launching dashboard:"));
    }
}
