pub mod config;
pub mod error;
pub mod manifest;
pub mod observability;
