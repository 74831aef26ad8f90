//! Core functionality for renaming images with titles from a local vision model.
//!
//! This library provides the building blocks of the rename pipeline:
//! - Image discovery in a working directory
//! - Vision model catalog lookup on an Ollama server
//! - Title generation and sanitation
//! - Collision-safe renaming
//! - Batch and single-image orchestration with progress events

// -- Internal Modules --
mod error;

// -- Public Re-exports --
pub use catalog::{ModelCatalog, ModelChoice};
pub use config::*;
pub use endpoint::{ModelEndpoint, OllamaClient};
pub use error::{Error, Result};
pub use events::{channel, Control, EventQueue, EventSink, RenameEvent};
pub use gate::{CancellationToken, ProcessingGate, ProcessingPermit};
pub use orchestrator::{Precondition, RenameOrchestrator, StartOutcome};
pub use rename::RenameEngine;
pub use title::TitleGenerator;
pub use types::*;

// -- Public Modules --
pub mod catalog;
pub mod config;
pub mod discovery;
pub mod endpoint;
pub mod events;
pub mod gate;
pub mod logging;
pub mod orchestrator;
pub mod rename;
pub mod title;
pub mod types;

// -- Test Modules --
#[cfg(test)]
pub mod test_utils;
