//! This crate contains the logging setup shared by the deployment binaries:
//! subscriber initialization and a panic hook that reports through `tracing`.
pub mod config;
pub mod panic_hook;
pub mod tracing;

pub use config::Config;
