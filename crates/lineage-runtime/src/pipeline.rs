//! Ingestion pipeline
//!
//! Single synchronous entry point applying one signed envelope to both
//! graphs. Stages:
//! 1. Reject already-known event ids
//! 2. Authenticate: known author, signature recovers to the author
//! 3. Decode the payload, recover birth cosigners
//! 4. Check the claimed nonce
//! 5. Commit to the event chain
//! 6. Apply the structural side effect to the identity graph
//!
//! One lock covers the chain, the identity graph and the counters, so the
//! reference checks of stage 5 cannot race a concurrent commit by the same
//! author.

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

use lineage_chain::{Event, EventChain};
use lineage_core::{
    Birth, Envelope, IdentityId, LineageError, LineageResult, Payload, Profile, ReferenceFault,
    VertexId,
};
use lineage_crypto::{Ed25519Recovery, Recover};
use lineage_society::{GenerationLimit, IdentityGraph, Individual};

/// Ingestion failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    /// Nothing was committed
    #[error("event rejected: {0}")]
    Rejected(#[from] LineageError),

    /// The event is in the chain but its side effect failed
    #[error("event {event} accepted but its side effect failed: {source}")]
    SideEffect {
        event: VertexId,
        #[source]
        source: LineageError,
    },
}

impl IngestError {
    /// Underlying lineage error
    pub fn error(&self) -> &LineageError {
        match self {
            IngestError::Rejected(e) => e,
            IngestError::SideEffect { source, .. } => source,
        }
    }

    /// Was the event committed despite the error?
    pub fn is_partial(&self) -> bool {
        matches!(self, IngestError::SideEffect { .. })
    }
}

/// Pipeline counters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Events committed to the chain
    pub accepted: u64,
    pub births: u64,
    pub profiles: u64,
    pub ended: u64,
    /// Envelopes rejected before commit
    pub rejected: u64,
    /// Events committed whose side effect failed
    pub partial: u64,
}

struct PipelineState {
    chain: EventChain,
    society: IdentityGraph,
    stats: PipelineStats,
}

/// Applies signed envelopes to the event chain and the identity graph
pub struct IngestionPipeline<R = Ed25519Recovery> {
    state: Mutex<PipelineState>,
    recover: R,
}

impl<R: Recover> IngestionPipeline<R> {
    /// Create a pipeline whose identity graph is seeded with `roots`
    pub fn new(
        limits: Vec<GenerationLimit>,
        roots: &[IdentityId],
        recover: R,
    ) -> LineageResult<Self> {
        Ok(IngestionPipeline {
            state: Mutex::new(PipelineState {
                chain: EventChain::new(),
                society: IdentityGraph::new(limits, roots)?,
                stats: PipelineStats::default(),
            }),
            recover,
        })
    }

    /// Apply one envelope claimed to be authored by `author`
    pub fn receive(&self, author: IdentityId, envelope: &Envelope) -> Result<Event, IngestError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let (id, payload, cosigners) = match self.admit(state, author, envelope) {
            Ok(admitted) => admitted,
            Err(e) => return Err(Self::reject(state, author, e)),
        };

        let event = match state
            .chain
            .add_event(id, author, payload, envelope.refs.clone())
        {
            Ok(event) => event,
            Err(e) => return Err(Self::reject(state, author, e)),
        };
        state.stats.accepted += 1;

        let applied = match &event.payload {
            Payload::Birth(birth) => state
                .society
                .add_individual(birth.identity, &cosigners)
                .map(|child| {
                    state.stats.births += 1;
                    debug!(identity = %child.id, generation = child.generation, "birth applied");
                }),
            Payload::Profile(profile) => {
                state.society.update_profile(&author, profile.clone()).map(|()| {
                    state.stats.profiles += 1;
                })
            }
            Payload::End => {
                state.stats.ended += 1;
                Ok(())
            }
            Payload::Info { .. } | Payload::Genesis { .. } => Ok(()),
        };

        if let Err(source) = applied {
            state.stats.partial += 1;
            warn!(
                event = %event.id.short(),
                author = %author,
                error = %source,
                "side effect failed"
            );
            return Err(IngestError::SideEffect {
                event: event.id.clone(),
                source,
            });
        }
        Ok(event)
    }

    /// Stages 1 to 4; nothing is mutated
    fn admit(
        &self,
        state: &PipelineState,
        author: IdentityId,
        envelope: &Envelope,
    ) -> LineageResult<(VertexId, Payload, Vec<IdentityId>)> {
        // Stage 1: duplicate
        let id = envelope.id()?;
        if state.chain.is_known(&id) {
            return Err(LineageError::Conflict(format!("event {}", id)));
        }

        // Stage 2: authenticate
        if !state.society.contains(&author) {
            return Err(ReferenceFault::UnknownAuthor(author.to_string()).into());
        }
        let signer = self.recover.recover(&envelope.signing_bytes()?, &envelope.sig)?;
        if signer != author {
            return Err(ReferenceFault::SignerMismatch {
                claimed: author.to_string(),
                recovered: signer.to_string(),
            }
            .into());
        }

        // Stage 3: payload
        let payload = envelope.payload()?;
        let cosigners = match &payload {
            Payload::Birth(birth) => self.cosigners(birth)?,
            Payload::Genesis { roots } => {
                for root in roots {
                    let individual: Individual = state.society.get(root)?;
                    if !individual.is_root() {
                        return Err(LineageError::InvalidArgument(format!(
                            "{} is not a generation-0 identity",
                            root
                        )));
                    }
                }
                Vec::new()
            }
            _ => Vec::new(),
        };

        // Stage 4: sequencing
        let expected = state.chain.expected_nonce(&envelope.refs)?;
        if envelope.nonce != expected {
            return Err(ReferenceFault::NonceMismatch {
                claimed: envelope.nonce,
                expected,
            }
            .into());
        }

        Ok((id, payload, cosigners))
    }

    /// Recover the identities that cosigned a birth
    fn cosigners(&self, birth: &Birth) -> LineageResult<Vec<IdentityId>> {
        let message = Birth::signing_bytes(&birth.identity);
        birth
            .signatures
            .iter()
            .map(|sig| self.recover.recover(&message, sig))
            .collect()
    }

    fn reject(state: &mut PipelineState, author: IdentityId, error: LineageError) -> IngestError {
        state.stats.rejected += 1;
        warn!(author = %author, error = %error, "envelope rejected");
        IngestError::Rejected(error)
    }

    /// Event the next envelope by `author` must extend
    pub fn head(&self, author: &IdentityId) -> Option<VertexId> {
        self.state.lock().chain.head(author)
    }

    /// Nonce an envelope with these references must claim
    pub fn expected_nonce(&self, refs: &[VertexId]) -> LineageResult<u64> {
        self.state.lock().chain.expected_nonce(refs)
    }

    pub fn is_known(&self, id: &VertexId) -> bool {
        self.state.lock().chain.is_known(id)
    }

    pub fn event(&self, id: &VertexId) -> Option<Event> {
        self.state.lock().chain.get(id)
    }

    pub fn individual(&self, id: &IdentityId) -> LineageResult<Individual> {
        self.state.lock().society.get(id)
    }

    pub fn profile(&self, id: &IdentityId) -> Option<Profile> {
        self.state.lock().society.profile(id).cloned()
    }

    pub fn stats(&self) -> PipelineStats {
        self.state.lock().stats.clone()
    }

    /// Run `f` against the event chain under the pipeline lock
    pub fn with_chain<T>(&self, f: impl FnOnce(&EventChain) -> T) -> T {
        f(&self.state.lock().chain)
    }

    /// Run `f` against the identity graph under the pipeline lock
    pub fn with_society<T>(&self, f: impl FnOnce(&IdentityGraph) -> T) -> T {
        f(&self.state.lock().society)
    }
}

impl<R> std::fmt::Debug for IngestionPipeline<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("IngestionPipeline")
            .field("chain", &state.chain)
            .field("society", &state.society)
            .field("stats", &state.stats)
            .finish()
    }
}
