//! Shared types for the voxgate call orchestrator: the configuration tree,
//! the prompt catalog, the common error type, and structured trace events.

pub mod catalog;
pub mod config;
pub mod error;
pub mod trace;

pub use catalog::PromptCatalog;
pub use config::Config;
pub use error::{Error, Result};
