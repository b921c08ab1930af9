//! Generation policy table

use serde::{Deserialize, Serialize};

/// Policy for one generation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationLimit {
    /// Distinct cosigners an identity of this generation needs
    pub min_cosigners: usize,
    /// Children an identity of this generation may cosign
    pub max_children_per_cosigner: usize,
}

impl GenerationLimit {
    pub const fn new(min_cosigners: usize, max_children_per_cosigner: usize) -> Self {
        GenerationLimit {
            min_cosigners,
            max_children_per_cosigner,
        }
    }
}

/// Five-generation table used when nothing is configured
pub fn default_limits() -> Vec<GenerationLimit> {
    vec![
        GenerationLimit::new(0, 3),
        GenerationLimit::new(1, 1),
        GenerationLimit::new(1, 2),
        GenerationLimit::new(2, 2),
        GenerationLimit::new(2, 8),
    ]
}
