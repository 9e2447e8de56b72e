//! Pipeline orchestration: provision → fetch → launch, short-circuiting on the
//! first failure.
//!
//! ```text
//! INIT -> PROVISIONING -> FETCHING -> LAUNCHING -> RUNNING -> TERMINATED
//!   |          |              |           |
//!   +----------+--------------+-----------+------> ABORTED
//! ```
//!
//! ABORTED and TERMINATED are terminal. A `Bootstrap` runs once; every
//! invocation of the launcher builds a fresh one.

use std::fmt;
use std::time::Instant;

use gt7boot_core::config::BootstrapConfig;
use gt7boot_core::observability;

use crate::env_root::RuntimeTools;
use crate::error::{BootstrapError, LaunchError};
use crate::fetch::Fetcher;
use crate::launch::Launcher;
use crate::process::{ProcessExit, ProcessRunner};
use crate::provision::Provisioner;
use crate::signals;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    Provisioning,
    Fetching,
    Launching,
    Running,
    Terminated,
    Aborted,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Terminated | Self::Aborted)
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Init, Provisioning)
                | (Provisioning, Fetching)
                | (Fetching, Launching)
                | (Launching, Running)
                | (Running, Terminated)
                | (Init | Provisioning | Fetching | Launching, Aborted)
        )
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Init => "init",
            Self::Provisioning => "provisioning",
            Self::Fetching => "fetching",
            Self::Launching => "launching",
            Self::Running => "running",
            Self::Terminated => "terminated",
            Self::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

pub struct Bootstrap {
    provisioner: Provisioner,
    fetcher: Fetcher,
    launcher: Launcher,
    history: Vec<PipelineState>,
    interrupted: fn() -> bool,
}

impl Bootstrap {
    pub fn new(provisioner: Provisioner, fetcher: Fetcher, launcher: Launcher) -> Self {
        Self {
            provisioner,
            fetcher,
            launcher,
            history: vec![PipelineState::Init],
            interrupted: signals::interrupted,
        }
    }

    /// Build all three stages from the resolved configuration.
    pub fn plan(config: &BootstrapConfig) -> Self {
        let tools = RuntimeTools::resolve(config.paths.env_root.as_deref());
        Self::new(
            Provisioner::new(&config.paths, &tools, config.force_provision),
            Fetcher::new(&config.paths, &tools, config.commands.fetch.as_deref()),
            Launcher::new(
                &config.paths,
                &tools,
                &config.launch,
                config.commands.serve.as_deref(),
            ),
        )
    }

    /// Replace the interrupt check (defaults to the signal handler's flag).
    pub fn with_interrupt_check(mut self, check: fn() -> bool) -> Self {
        self.interrupted = check;
        self
    }

    pub fn state(&self) -> PipelineState {
        self.history
            .last()
            .copied()
            .unwrap_or(PipelineState::Init)
    }

    /// Every state entered so far, starting with `Init`.
    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    fn enter(&mut self, next: PipelineState) {
        let current = self.state();
        debug_assert!(
            current.can_transition_to(next),
            "illegal pipeline transition {} -> {}",
            current,
            next
        );
        tracing::debug!(from = %current, to = %next, "Pipeline transition");
        self.history.push(next);
    }

    /// Run the pipeline to completion. Returns the server's exit status when
    /// every stage before it succeeded.
    pub fn run(&mut self, runner: &dyn ProcessRunner) -> Result<ProcessExit, BootstrapError> {
        // Provisioning
        self.check_interrupt()?;
        self.enter(PipelineState::Provisioning);
        let manifest = self.provisioner.manifest.to_string_lossy().to_string();
        observability::audit_stage_started("provision", &[manifest], &self.provisioner.workdir);
        let started = Instant::now();
        match self.provisioner.provision(runner) {
            Ok(outcome) => {
                tracing::info!(outcome = outcome.as_str(), "Provisioning complete");
                observability::audit_stage_completed("provision", elapsed_ms(started), outcome.as_str());
            }
            Err(e) => return Err(self.abort("provision", started, e)),
        }

        // Fetching
        self.check_interrupt()?;
        self.enter(PipelineState::Fetching);
        observability::audit_stage_started(
            "fetch",
            &self.fetcher.command.argv(),
            &self.fetcher.command.cwd,
        );
        let started = Instant::now();
        match self.fetcher.fetch(runner) {
            Ok(outcome) => {
                tracing::info!(
                    dataset = %outcome.dataset.display(),
                    bytes = outcome.bytes,
                    "Reference data ready"
                );
                observability::audit_stage_completed("fetch", elapsed_ms(started), "fetched");
            }
            Err(e) => return Err(self.abort("fetch", started, e.into())),
        }

        // Launching
        self.check_interrupt()?;
        self.enter(PipelineState::Launching);
        observability::audit_launch_config(&self.launcher.config);
        observability::audit_stage_started(
            "launch",
            &self.launcher.command.argv(),
            &self.launcher.command.cwd,
        );
        let started = Instant::now();
        let server = match self.launcher.start(runner) {
            Ok(server) => server,
            Err(e) => return Err(self.abort("launch", started, e.into())),
        };

        self.enter(PipelineState::Running);
        tracing::info!(pid = server.id(), "Dashboard server running");
        let waited = server.wait();
        self.enter(PipelineState::Terminated);
        let exit = waited.map_err(|e| BootstrapError::from(LaunchError::Wait(e)))?;

        let code = exit.exit_code();
        observability::audit_server_exited(code, elapsed_ms(started));
        if exit.success() {
            tracing::info!("Dashboard server exited cleanly");
        } else {
            tracing::warn!("Dashboard server exited with {}", exit);
        }
        Ok(exit)
    }

    fn check_interrupt(&mut self) -> Result<(), BootstrapError> {
        if (self.interrupted)() {
            tracing::info!(state = %self.state(), "Interrupted, not starting the next stage");
            self.enter(PipelineState::Aborted);
            return Err(BootstrapError::Interrupted);
        }
        Ok(())
    }

    /// A stage child killed by an operator signal fails like any other; report the
    /// interrupt instead of the stage error in that case.
    fn abort(&mut self, stage: &str, started: Instant, err: BootstrapError) -> BootstrapError {
        let err = if (self.interrupted)() {
            tracing::debug!(stage, "Stage failed after interrupt: {}", err);
            BootstrapError::Interrupted
        } else {
            err
        };
        observability::audit_stage_failed(
            stage,
            elapsed_ms(started),
            err.kind(),
            &err.to_string(),
            err.exit_code(),
        );
        self.enter(PipelineState::Aborted);
        err
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
