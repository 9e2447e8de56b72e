//! Dashboard launch: export runtime configuration and start the server.
//!
//! Configuration reaches the server only through its process environment; the
//! launcher's own environment is never modified.

use gt7boot_core::config::{BootstrapPaths, LaunchConfig};

use crate::env_root::RuntimeTools;
use crate::error::LaunchError;
use crate::process::{CommandSpec, ProcessRunner, RunningProcess};

#[derive(Debug, Clone)]
pub struct Launcher {
    pub command: CommandSpec,
    /// Settings the command was built from, recorded in the audit trail
    pub config: LaunchConfig,
}

impl Launcher {
    /// `python -m bokeh serve [--show] .`, unless `override_cmd` replaces it.
    /// The runtime configuration is attached to either command.
    pub fn new(
        paths: &BootstrapPaths,
        tools: &RuntimeTools,
        config: &LaunchConfig,
        override_cmd: Option<&[String]>,
    ) -> Self {
        let command = override_cmd
            .and_then(|tokens| CommandSpec::from_tokens(tokens, &paths.workdir))
            .unwrap_or_else(|| default_serve_command(paths, tools, config.open_viewer));
        Self {
            command: command.envs(config.server_env()),
            config: config.clone(),
        }
    }

    /// Spawn the server. The caller blocks on the returned process.
    pub fn start(&self, runner: &dyn ProcessRunner) -> Result<Box<dyn RunningProcess>, LaunchError> {
        tracing::info!(cmd = %self.command, "Starting dashboard server");
        for (key, value) in &self.command.env {
            tracing::debug!("{}={}", key, value);
        }
        runner.spawn(&self.command).map_err(|source| LaunchError::Spawn {
            program: self.command.program.clone(),
            source,
        })
    }
}

fn default_serve_command(paths: &BootstrapPaths, tools: &RuntimeTools, open_viewer: bool) -> CommandSpec {
    let mut cmd = CommandSpec::new(&tools.python, &paths.workdir).args(["-m", "bokeh", "serve"]);
    if open_viewer {
        cmd = cmd.arg("--show");
    }
    cmd.arg(".")
}
