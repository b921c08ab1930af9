//! Error types for the lineage graphs
//!
//! One closed taxonomy shared by every layer. Each variant carries the
//! reason that made the operation fail.

use thiserror::Error;

/// Causal-rule and missing-ancestor failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceFault {
    #[error("parent {0} not present")]
    MissingParent(String),

    #[error("no references supplied")]
    NoReferences,

    #[error("root vertex {0} declares parents")]
    RootHasParents(String),

    #[error("inserting {0} would close a cycle")]
    Cycle(String),

    #[error("author {author} cannot extend {primary}: neither own chain nor own birth")]
    NotOwnBirth { author: String, primary: String },

    #[error("author {author} already extended {primary}")]
    Equivocation { author: String, primary: String },

    #[error("author {0} has ended its chain")]
    AuthorEnded(String),

    #[error("author {0} is not a known identity")]
    UnknownAuthor(String),

    #[error("claimed author {claimed} but signed by {recovered}")]
    SignerMismatch { claimed: String, recovered: String },

    #[error("cosigner {0} is not a known identity")]
    UnknownCosigner(String),

    #[error("nonce {claimed} does not match expected {expected}")]
    NonceMismatch { claimed: u64, expected: u64 },

    #[error("genesis event must be the root of the chain")]
    GenesisNotRoot,
}

/// Quota, budget and feasibility failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapacityFault {
    #[error("root quota of {0} reached")]
    RootQuota(usize),

    #[error("seed vertex {0} declares parents")]
    SeedHasParents(String),

    #[error("{count} parents exceed the limit of {max}")]
    TooManyParents { count: usize, max: usize },

    #[error("cosigner {identity} already has {max} children")]
    ChildrenBudget { identity: String, max: usize },

    #[error("{have} distinct cosigners, generation {generation} needs {need}")]
    TooFewCosigners {
        generation: usize,
        have: usize,
        need: usize,
    },

    #[error("no generation limit configured for generation {0}")]
    NoGenerationLimit(usize),

    #[error("generation {generation}: {requested} requested beyond theoretical limit {limit}")]
    BeyondTheoreticalLimit {
        generation: usize,
        requested: usize,
        limit: usize,
    },
}

/// Core lineage errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineageError {
    #[error("{0} already exists")]
    Conflict(String),

    #[error("reference error: {0}")]
    Reference(ReferenceFault),

    #[error("capacity exceeded: {0}")]
    Capacity(CapacityFault),

    #[error("{0} not found")]
    NotFound(String),

    #[error("vertex {0} still has children")]
    HasChildren(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("signature error: {0}")]
    Signature(String),
}

impl LineageError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, LineageError::Conflict(_))
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, LineageError::Reference(_))
    }

    pub fn is_capacity(&self) -> bool {
        matches!(self, LineageError::Capacity(_))
    }
}

impl From<ReferenceFault> for LineageError {
    fn from(fault: ReferenceFault) -> Self {
        LineageError::Reference(fault)
    }
}

impl From<CapacityFault> for LineageError {
    fn from(fault: CapacityFault) -> Self {
        LineageError::Capacity(fault)
    }
}

impl From<serde_json::Error> for LineageError {
    fn from(err: serde_json::Error) -> Self {
        LineageError::Malformed(err.to_string())
    }
}

/// Result type for lineage operations
pub type LineageResult<T> = Result<T, LineageError>;
