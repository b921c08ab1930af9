//! Event - one accepted author action

use lineage_core::{IdentityId, Payload, PayloadType, VertexId};

/// Event stored in the [`EventChain`](crate::EventChain)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    pub id: VertexId,
    pub author: IdentityId,
    /// Causal depth: 0 for the root, else 1 + max parent nonce
    pub nonce: u64,
    pub payload: Payload,
    /// References as declared; `refs[0]` is the primary reference
    pub refs: Vec<VertexId>,
}

impl Event {
    pub fn kind(&self) -> PayloadType {
        self.payload.payload_type()
    }

    /// Primary (self-chain) reference
    pub fn primary(&self) -> Option<&VertexId> {
        self.refs.first()
    }

    /// Does this event bring `identity` into existence?
    pub fn births(&self, identity: &IdentityId) -> bool {
        self.payload.births().contains(identity)
    }

    pub fn is_root(&self) -> bool {
        self.refs.is_empty()
    }
}
