//! tabpilot command-line front end
//!
//! Exposes modules for integration testing

pub mod cli;
pub mod config;
pub mod llm;

pub use config::{Provider, TabpilotConfig};
