//! Lineage Core - Fundamental types and primitives
//!
//! This crate defines the types shared by every layer of the dual graph:
//! - Identifiers (VertexId, IdentityId)
//! - The closed error taxonomy
//! - Event payloads as a tagged sum type
//! - The signed wire envelope

pub mod id;
pub mod error;
pub mod payload;
pub mod envelope;

pub use id::*;
pub use error::*;
pub use payload::*;
pub use envelope::*;
