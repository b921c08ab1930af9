//! Lineage Society - Identity growth layer
//!
//! New identities are minted only with the cooperation of existing ones.
//! Each generation has a policy entry:
//! - how many distinct cosigners a new identity needs
//! - how many children one cosigner may parent
//!
//! The planner partitions a generation into cosigning groups and predicts
//! how large each generation can grow.

pub mod limits;
pub mod individual;
pub mod society;
pub mod planner;

pub use limits::*;
pub use individual::*;
pub use society::*;
pub use planner::*;
