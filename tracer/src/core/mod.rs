//! Core application infrastructure

pub mod cli;
pub mod config;
pub mod constants;
pub mod install;

pub use crate::app::CoreApp;
pub use cli::{CliConfig, Commands};
pub use config::{AppConfig, BackendConfig};
