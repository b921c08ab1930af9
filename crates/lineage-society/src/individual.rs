//! Individual - one identity in the growth graph

use lineage_core::IdentityId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Individual {
    pub id: IdentityId,
    /// Cosigning hops from the root identities
    pub generation: usize,
}

impl Individual {
    pub fn root(id: IdentityId) -> Self {
        Individual { id, generation: 0 }
    }

    pub fn is_root(&self) -> bool {
        self.generation == 0
    }
}
