//! gt7boot configuration layer
//!
//! All environment reads go through this module; stages receive typed config
//! structs and never call `std::env::var` themselves.
//!
//! - `loader`: `EnvSource`, `.env` parsing, env_or / env_optional / env_bool helpers
//! - `schema`: BootstrapConfig, BootstrapPaths, LaunchConfig, ObservabilityConfig
//! - `env_keys`: key constants and alias chains

pub mod env_keys;
pub mod loader;
pub mod schema;

pub use loader::{env_bool, env_optional, env_or, parse_dotenv, EnvSource, LayeredEnv};
pub use schema::{
    BootstrapConfig, BootstrapPaths, LaunchConfig, LogLevel, ObservabilityConfig, PathOverrides,
    StageCommands,
};
