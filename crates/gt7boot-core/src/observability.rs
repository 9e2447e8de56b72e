//! Observability: tracing init and the JSONL audit trail of pipeline stages.
//!
//! Uses [`ObservabilityConfig`] for GT7BOOT_LOG, GT7BOOT_QUIET, GT7BOOT_LOG_JSON
//! and GT7BOOT_AUDIT_LOG. Logs go to stderr so the dashboard's own stdout stays
//! untouched.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use serde_json::{json, Value};
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::config::{LaunchConfig, ObservabilityConfig};

static AUDIT_PATH: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Initialize tracing and remember the audit log path. Call once at startup.
/// When GT7BOOT_QUIET is set, only WARN and above are logged.
pub fn init_tracing(cfg: &ObservabilityConfig) {
    let filter = EnvFilter::try_new(filter_directives(cfg))
        .unwrap_or_else(|_| EnvFilter::new(ObservabilityConfig::DEFAULT_FILTER));

    let _ = if cfg.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .try_init()
    };

    if let Some(ref path) = cfg.audit_log {
        set_audit_path(path);
    }
}

/// Quiet mode ignores GT7BOOT_LOG entirely.
fn filter_directives(cfg: &ObservabilityConfig) -> &str {
    if cfg.quiet {
        ObservabilityConfig::QUIET_FILTER
    } else {
        &cfg.log_filter
    }
}

/// Route audit records to `path`, creating its parent directory.
pub fn set_audit_path(path: &Path) {
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Ok(mut guard) = AUDIT_PATH.lock() {
        *guard = Some(path.to_path_buf());
    }
}

fn audit_path() -> Option<PathBuf> {
    AUDIT_PATH.lock().ok()?.clone()
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn append_jsonl(path: &Path, record: &Value) {
    if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(path) {
        if let Ok(line) = serde_json::to_string(record) {
            let _ = writeln!(f, "{}", line);
        }
    }
}

fn emit(record: Value) {
    if let Some(path) = audit_path() {
        append_jsonl(&path, &record);
    }
}

pub fn stage_started_record(stage: &str, cmd: &[String], cwd: &Path) -> Value {
    json!({
        "ts": now(),
        "event": "stage_started",
        "stage": stage,
        "cmd": cmd,
        "cwd": cwd.to_string_lossy(),
    })
}

pub fn stage_completed_record(stage: &str, duration_ms: u64, outcome: &str) -> Value {
    json!({
        "ts": now(),
        "event": "stage_completed",
        "stage": stage,
        "duration_ms": duration_ms,
        "outcome": outcome,
    })
}

/// Settings handed to the dashboard server; unset fields appear as `null`.
pub fn launch_config_record(config: &LaunchConfig) -> Value {
    json!({
        "ts": now(),
        "event": "launch_config",
        "config": serde_json::to_value(config).unwrap_or(Value::Null),
    })
}

pub fn stage_failed_record(
    stage: &str,
    duration_ms: u64,
    kind: &str,
    error: &str,
    exit_code: i32,
) -> Value {
    json!({
        "ts": now(),
        "event": "stage_failed",
        "stage": stage,
        "duration_ms": duration_ms,
        "kind": kind,
        "error": error,
        "exit_code": exit_code,
    })
}

pub fn server_exited_record(exit_code: i32, duration_ms: u64) -> Value {
    json!({
        "ts": now(),
        "event": "server_exited",
        "exit_code": exit_code,
        "duration_ms": duration_ms,
        "success": exit_code == 0,
    })
}

/// Audit: a stage is about to run `cmd` in `cwd`
pub fn audit_stage_started(stage: &str, cmd: &[String], cwd: &Path) {
    emit(stage_started_record(stage, cmd, cwd));
}

/// Audit: stage finished successfully
pub fn audit_stage_completed(stage: &str, duration_ms: u64, outcome: &str) {
    emit(stage_completed_record(stage, duration_ms, outcome));
}

/// Audit: configuration the server is about to be started with
pub fn audit_launch_config(config: &LaunchConfig) {
    emit(launch_config_record(config));
}

/// Audit: stage failed with an error of class `kind`; the pipeline aborts with `exit_code`
pub fn audit_stage_failed(stage: &str, duration_ms: u64, kind: &str, error: &str, exit_code: i32) {
    emit(stage_failed_record(stage, duration_ms, kind, error, exit_code));
}

/// Audit: the dashboard server terminated
pub fn audit_server_exited(exit_code: i32, duration_ms: u64) {
    emit(server_exited_record(exit_code, duration_ms));
}
