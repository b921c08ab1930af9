//! Bootstrap orchestrator
//!
//! Grows a population one generation per step. Generation 0 is published
//! as a single genesis event listing every root. Each later generation is
//! partitioned into cosigning groups; every group mints one identity with
//! a birth event authored by its first member and cosigned by all members.
//!
//! Every event goes through the same [`IngestionPipeline`] a remote node
//! would use, so the recorded envelopes replay into a fresh pipeline.
//!
//! A failure aborts the run. Generations already committed stay
//! committed; the orchestrator moves to [`BootstrapState::Failed`] and
//! keeps returning the stored failure.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tracing::{debug, info};

use lineage_core::{
    Birth, CapacityFault, Envelope, IdentityId, LineageError, LineageResult, Payload,
    ReferenceFault, VertexId,
};
use lineage_crypto::{Ed25519Recovery, Identity, Signer};
use lineage_society::assign_groups;

use crate::{BootstrapConfig, IngestError, IngestionPipeline, PipelineStats};

/// Bootstrap failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BootstrapError {
    #[error("bootstrap planning failed: {0}")]
    Plan(#[from] LineageError),

    #[error("generation {generation}: {source}")]
    Ingest {
        generation: usize,
        #[source]
        source: IngestError,
    },
}

/// Orchestrator state
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BootstrapState {
    /// Roots known, genesis not yet published
    Seeding,
    /// Next step mints `generation`
    Growing { generation: usize },
    Done,
    Failed(BootstrapError),
}

/// Envelope together with its claimed author
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthoredEnvelope {
    pub author: IdentityId,
    pub envelope: Envelope,
}

/// Everything a finished bootstrap produced
pub struct BootstrapOutput {
    /// Accepted envelopes in ingestion order
    pub envelopes: Vec<AuthoredEnvelope>,
    /// Identities per generation
    pub generations: Vec<Vec<IdentityId>>,
    pub keys: HashMap<IdentityId, Identity>,
    pub pipeline: IngestionPipeline<Ed25519Recovery>,
}

impl BootstrapOutput {
    pub fn stats(&self) -> PipelineStats {
        self.pipeline.stats()
    }

    pub fn population(&self) -> usize {
        self.generations.iter().map(Vec::len).sum()
    }
}

/// Generation-by-generation population builder
pub struct Bootstrap {
    config: BootstrapConfig,
    plan: Vec<usize>,
    rng: StdRng,
    pipeline: IngestionPipeline<Ed25519Recovery>,
    keys: HashMap<IdentityId, Identity>,
    generations: Vec<Vec<IdentityId>>,
    envelopes: Vec<AuthoredEnvelope>,
    state: BootstrapState,
}

impl Bootstrap {
    /// Validate the configuration, plan the population and create the roots
    pub fn new(config: BootstrapConfig) -> Result<Self, BootstrapError> {
        let plan = config.plan()?;
        let mut rng = StdRng::seed_from_u64(config.seed);

        let roots: Vec<Identity> = (0..plan[0]).map(|_| Identity::from_rng(&mut rng)).collect();
        let root_ids: Vec<IdentityId> = roots.iter().map(Identity::id).collect();
        let pipeline = IngestionPipeline::new(config.limits.clone(), &root_ids, Ed25519Recovery)?;

        info!(
            generations = plan.len(),
            roots = root_ids.len(),
            planned = ?plan,
            "bootstrap planned"
        );

        Ok(Bootstrap {
            config,
            plan,
            rng,
            pipeline,
            keys: roots.into_iter().map(|k| (k.id(), k)).collect(),
            generations: vec![root_ids],
            envelopes: Vec::new(),
            state: BootstrapState::Seeding,
        })
    }

    pub fn state(&self) -> &BootstrapState {
        &self.state
    }

    /// Planned population per generation
    pub fn plan(&self) -> &[usize] {
        &self.plan
    }

    pub fn pipeline(&self) -> &IngestionPipeline<Ed25519Recovery> {
        &self.pipeline
    }

    pub fn generations(&self) -> &[Vec<IdentityId>] {
        &self.generations
    }

    pub fn envelopes(&self) -> &[AuthoredEnvelope] {
        &self.envelopes
    }

    /// Advance by one generation
    pub fn step(&mut self) -> Result<&BootstrapState, BootstrapError> {
        let generation = match &self.state {
            BootstrapState::Done => return Ok(&self.state),
            BootstrapState::Failed(err) => return Err(err.clone()),
            BootstrapState::Seeding => 0,
            BootstrapState::Growing { generation } => *generation,
        };

        let result = if generation == 0 {
            self.publish_genesis()
        } else {
            self.grow(generation)
        };

        match result {
            Ok(()) => {
                info!(
                    generation,
                    identities = self.generations[generation].len(),
                    events = self.envelopes.len(),
                    "generation complete"
                );
                self.state = if generation + 1 < self.plan.len() {
                    BootstrapState::Growing {
                        generation: generation + 1,
                    }
                } else {
                    BootstrapState::Done
                };
                Ok(&self.state)
            }
            Err(source) => {
                let err = BootstrapError::Ingest { generation, source };
                self.state = BootstrapState::Failed(err.clone());
                Err(err)
            }
        }
    }

    /// Drive to completion
    pub fn run(mut self) -> Result<BootstrapOutput, BootstrapError> {
        while self.step()? != &BootstrapState::Done {}
        Ok(self.finish())
    }

    /// Hand over what has been built so far
    pub fn finish(self) -> BootstrapOutput {
        BootstrapOutput {
            envelopes: self.envelopes,
            generations: self.generations,
            keys: self.keys,
            pipeline: self.pipeline,
        }
    }

    fn publish_genesis(&mut self) -> Result<(), IngestError> {
        let roots = self.generations[0].clone();
        let author = roots[0];
        self.publish(author, &Payload::Genesis { roots }, Vec::new())?;
        Ok(())
    }

    fn grow(&mut self, generation: usize) -> Result<(), IngestError> {
        let parent_limit = self.config.limits[generation - 1];
        let limit = self.config.limits[generation];
        let wanted = self.plan[generation];

        let groups = assign_groups(
            &self.generations[generation - 1],
            parent_limit.max_children_per_cosigner,
            limit.min_cosigners,
        );
        if groups.len() < wanted {
            return Err(LineageError::from(CapacityFault::BeyondTheoreticalLimit {
                generation,
                requested: wanted,
                limit: groups.len(),
            })
            .into());
        }

        let mut born = Vec::with_capacity(wanted);
        for group in groups.into_iter().take(wanted) {
            let child = Identity::from_rng(&mut self.rng);
            let mut birth = Birth::new(child.id());
            let message = Birth::signing_bytes(&child.id());
            for member in &group {
                birth.add_signature(self.key(member)?.sign(&message)?);
            }

            let author = group[0];
            let head = self
                .pipeline
                .head(&author)
                .ok_or_else(|| LineageError::NotFound(format!("head of {}", author)))?;
            let mut refs = vec![head];
            if let Some(latest) = self.latest() {
                if !refs.contains(&latest) {
                    refs.push(latest);
                }
            }

            self.publish(author, &Payload::Birth(birth), refs)?;
            debug!(identity = %child.id(), generation, cosigners = group.len(), "identity born");
            born.push(child.id());
            self.keys.insert(child.id(), child);
        }

        self.generations.push(born);
        Ok(())
    }

    /// Sign an envelope as `author`, ingest it and record it
    fn publish(
        &mut self,
        author: IdentityId,
        payload: &Payload,
        refs: Vec<VertexId>,
    ) -> Result<VertexId, IngestError> {
        let nonce = self.pipeline.expected_nonce(&refs)?;
        let envelope = Envelope::new(payload, nonce, refs)?;
        let signature = self.key(&author)?.sign(&envelope.signing_bytes()?)?;
        let envelope = envelope.with_signature(signature);

        let event = self.pipeline.receive(author, &envelope)?;
        self.envelopes.push(AuthoredEnvelope { author, envelope });
        Ok(event.id)
    }

    fn key(&self, id: &IdentityId) -> LineageResult<&Identity> {
        self.keys
            .get(id)
            .ok_or_else(|| ReferenceFault::UnknownAuthor(id.to_string()).into())
    }

    fn latest(&self) -> Option<VertexId> {
        self.envelopes.last().and_then(|e| e.envelope.id().ok())
    }
}

impl std::fmt::Debug for Bootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bootstrap")
            .field("state", &self.state)
            .field("plan", &self.plan)
            .field("events", &self.envelopes.len())
            .finish()
    }
}
