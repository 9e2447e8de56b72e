//! gt7boot library: CLI entry and configuration wiring for the bootstrap launcher.
//!
//! The binary is a thin wrapper over [`run_cli`]; the pipeline itself lives in
//! `gt7boot-runtime`.

mod cli;

use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use gt7boot_core::config::{
    BootstrapConfig, BootstrapPaths, EnvSource, LayeredEnv, ObservabilityConfig, PathOverrides,
};
use gt7boot_core::observability;
use gt7boot_runtime::{signals, Bootstrap, BootstrapError, SystemRunner};

pub use cli::Cli;

/// Parse arguments, run the pipeline, and return the process exit code.
pub fn run_cli() -> i32 {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            exit_code_for(&e)
        }
    }
}

fn run(cli: &Cli) -> Result<i32> {
    let workdir = BootstrapPaths::resolve_workdir(cli.workdir.as_deref())
        .map_err(BootstrapError::from)?;
    let env = LayeredEnv::load(&workdir);
    observability::init_tracing(&ObservabilityConfig::from_source(&env));

    let config = load_config(&env, cli, &workdir)?;
    log_startup(&config);

    if let Err(e) = signals::install() {
        tracing::warn!("Could not install signal handlers: {}", e);
    }

    let started = Instant::now();
    let exit = Bootstrap::plan(&config).run(&SystemRunner)?;
    tracing::debug!(elapsed_ms = started.elapsed().as_millis() as u64, "Pipeline finished");
    Ok(exit.exit_code())
}

fn load_config(env: &dyn EnvSource, cli: &Cli, workdir: &Path) -> Result<BootstrapConfig> {
    let overrides = PathOverrides {
        env_root: cli.env_root.clone(),
        manifest: cli.manifest.clone(),
    };
    BootstrapConfig::from_source(env, workdir.to_path_buf(), &overrides, cli.force_provision)
        .map_err(|e| {
            let e = BootstrapError::from(e);
            observability::audit_stage_failed("config", 0, e.kind(), &e.to_string(), e.exit_code());
            e.into()
        })
}

fn log_startup(config: &BootstrapConfig) {
    let launch = &config.launch;
    tracing::info!(
        workdir = %config.paths.workdir.display(),
        log_level = %launch.effective_log_level(),
        "Starting GT7 dashboard bootstrap"
    );
    match launch.device_address {
        Some(ip) => tracing::info!(device = %ip, "PlayStation address configured"),
        None => tracing::warn!(
            "DEVICE_IP not set; the dashboard starts without a PlayStation address"
        ),
    }
    match config.paths.env_root {
        Some(ref root) => tracing::info!(env_root = %root.display(), "Using environment root"),
        None => tracing::info!("No environment root configured, using the interpreter on PATH"),
    }
}

/// Map a failure to the exit code of its error class; anything outside the
/// pipeline's taxonomy exits with 1.
fn exit_code_for(e: &anyhow::Error) -> i32 {
    e.downcast_ref::<BootstrapError>()
        .map(BootstrapError::exit_code)
        .unwrap_or(1)
}
