//! Bootstrap pipeline for the GT7 telemetry dashboard.
//!
//! `provision` → `fetch` → `launch`, strictly in that order, each stage a
//! single attempt. [`pipeline::Bootstrap`] owns the ordering and the state
//! machine; stages only know how to build and judge their own command.

pub mod env_root;
pub mod error;
pub mod fetch;
pub mod launch;
pub mod pipeline;
pub mod process;
pub mod provision;
pub mod signals;

#[cfg(test)]
pub(crate) mod testing;

pub use error::BootstrapError;
pub use pipeline::{Bootstrap, PipelineState};
pub use process::{CommandSpec, ProcessExit, ProcessRunner, SystemRunner};
