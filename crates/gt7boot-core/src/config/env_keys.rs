//! Environment variable keys and alias definitions.
//!
//! Launcher-facing keys are short (`LOG_LEVEL`, `DEVICE_IP`); the dashboard's own
//! `GT7_*` names are accepted as aliases so an existing dashboard `.env` keeps working.

/// Runtime configuration handed to the dashboard server
pub mod launch {
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
    pub const LOG_LEVEL_ALIASES: &[&str] = &["GT7_LOG_LEVEL"];

    pub const DEVICE_IP: &str = "DEVICE_IP";
    pub const DEVICE_IP_ALIASES: &[&str] = &["GT7_PLAYSTATION_IP"];

    pub const LOAD_LAPS_PATH: &str = "LOAD_LAPS_PATH";
    pub const LOAD_LAPS_PATH_ALIASES: &[&str] = &["GT7_LOAD_LAPS_PATH"];

    pub const ADD_BRAKEPOINTS: &str = "ADD_BRAKEPOINTS";
    pub const ADD_BRAKEPOINTS_ALIASES: &[&str] = &["GT7_ADD_BRAKEPOINTS"];

    /// Whether the server opens a browser tab (`bokeh serve --show`). Default on.
    pub const OPEN_VIEWER: &str = "OPEN_VIEWER";
    pub const OPEN_VIEWER_ALIASES: &[&str] = &["GT7BOOT_OPEN_VIEWER"];
}

/// Names exported into the server process environment.
pub mod server {
    pub const GT7_LOG_LEVEL: &str = "GT7_LOG_LEVEL";
    pub const GT7_PLAYSTATION_IP: &str = "GT7_PLAYSTATION_IP";
    pub const GT7_LOAD_LAPS_PATH: &str = "GT7_LOAD_LAPS_PATH";
    pub const GT7_ADD_BRAKEPOINTS: &str = "GT7_ADD_BRAKEPOINTS";
}

/// Environment root, manifest and working-directory locations
pub mod paths {
    pub const GT7BOOT_ENV_ROOT: &str = "GT7BOOT_ENV_ROOT";
    /// Standard conventions, consulted in order after `GT7BOOT_ENV_ROOT`.
    pub const ENV_ROOT_CONVENTIONS: &[&str] = &["VIRTUAL_ENV", "CONDA_PREFIX"];

    pub const GT7BOOT_MANIFEST: &str = "GT7BOOT_MANIFEST";
    pub const GT7BOOT_DATASET_PATH: &str = "GT7BOOT_DATASET_PATH";
}

/// Stage command overrides
///
/// The command values are split on whitespace with no quoting or escaping, so a
/// program path containing spaces cannot be expressed; put such a program on
/// PATH or behind a wrapper script instead.
pub mod commands {
    pub const GT7BOOT_FETCH_COMMAND: &str = "GT7BOOT_FETCH_COMMAND";
    pub const GT7BOOT_SERVE_COMMAND: &str = "GT7BOOT_SERVE_COMMAND";
    pub const GT7BOOT_FORCE_PROVISION: &str = "GT7BOOT_FORCE_PROVISION";
}

/// Logging and audit trail
pub mod observability {
    pub const GT7BOOT_LOG: &str = "GT7BOOT_LOG";
    pub const GT7BOOT_QUIET: &str = "GT7BOOT_QUIET";
    pub const GT7BOOT_LOG_JSON: &str = "GT7BOOT_LOG_JSON";
    pub const GT7BOOT_AUDIT_LOG: &str = "GT7BOOT_AUDIT_LOG";
}
