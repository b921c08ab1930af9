//! Lineage Runtime - Applying signed events to both graphs
//!
//! This crate ties the layers together:
//! 1. Configuration and logging setup
//! 2. The ingestion pipeline: verify, sequence, commit, apply side effects
//! 3. The bootstrap orchestrator growing a population generation by
//!    generation through the same pipeline

pub mod config;
pub mod logging;
pub mod pipeline;
pub mod bootstrap;

pub use config::*;
pub use logging::*;
pub use pipeline::*;
pub use bootstrap::*;
