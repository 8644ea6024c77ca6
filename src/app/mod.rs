//! Application layer: configuration and backend wiring.

pub mod config;
pub mod factory;

pub use config::{AppConfig, BackendKind};
pub use factory::{ChainBackend, SetupError, build_backend};
