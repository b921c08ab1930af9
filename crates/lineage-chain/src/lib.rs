//! Lineage Chain - Event causality layer
//!
//! Every identity writes one linear self-chain of events. Events may also
//! reference other authors' events, which weaves the chains into one DAG.
//! The chain enforces:
//! - An identity's first event extends its own birth event
//! - At most one continuation per author from any given event
//! - `nonce = 1 + max(parent nonce)`

pub mod event;
pub mod chain;

pub use event::*;
pub use chain::*;
