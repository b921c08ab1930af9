//! Lineage DAG - Append-only directed acyclic graph
//!
//! This crate implements the storage layer both lineage graphs share:
//! - Immutable vertices with a growable child set
//! - Root quota and parent-count limits
//! - Strict insertion, or lenient insertion that buffers edges to parents
//!   which have not arrived yet and backfills them on arrival
//! - Bounded snapshots for export

pub mod vertex;
pub mod graph;
pub mod dump;

pub use vertex::*;
pub use graph::*;
pub use dump::*;
