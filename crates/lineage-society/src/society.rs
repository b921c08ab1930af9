//! IdentityGraph - generation-limited identity growth
//!
//! Minting an identity costs the cooperation of several existing
//! identities and spends part of each one's finite children budget, so a
//! single compromised identity cannot grow the population on its own.

use std::collections::HashMap;

use serde::{Serialize, Serializer};
use tracing::debug;

use lineage_core::{
    CapacityFault, IdentityId, LineageError, LineageResult, Profile, ReferenceFault,
};
use lineage_dag::{DumpLimits, Graph, GraphDump, Vertex};

use crate::{GenerationLimit, Individual};

/// Graph of identities linked to their cosigning parents
pub struct IdentityGraph {
    graph: Graph<IdentityId, Individual>,
    limits: Vec<GenerationLimit>,
    /// Identities per generation in insertion order
    generations: Vec<Vec<IdentityId>>,
    profiles: HashMap<IdentityId, Profile>,
}

impl IdentityGraph {
    /// Create a graph seeded with the generation-0 identities
    pub fn new(limits: Vec<GenerationLimit>, roots: &[IdentityId]) -> LineageResult<Self> {
        if roots.is_empty() {
            return Err(LineageError::InvalidArgument(
                "at least one root identity required".into(),
            ));
        }
        let graph = Graph::new(
            roots.len(),
            roots.iter().map(|id| Vertex::root(*id, Individual::root(*id))),
        )?;

        Ok(IdentityGraph {
            graph,
            limits,
            generations: vec![roots.to_vec()],
            profiles: HashMap::new(),
        })
    }

    /// Mint `id`, cosigned by `cosigners`
    pub fn add_individual(
        &mut self,
        id: IdentityId,
        cosigners: &[IdentityId],
    ) -> LineageResult<Individual> {
        if self.graph.contains(&id) {
            return Err(LineageError::Conflict(format!("identity {}", id)));
        }
        if cosigners.is_empty() {
            return Err(ReferenceFault::NoReferences.into());
        }

        let mut parents: Vec<Individual> = Vec::with_capacity(cosigners.len());
        for cosigner in cosigners {
            let parent = self
                .graph
                .with_vertex(cosigner, |v| *v.payload())
                .ok_or_else(|| ReferenceFault::UnknownCosigner(cosigner.to_string()))?;
            if !parents.contains(&parent) {
                parents.push(parent);
            }
        }

        let generation = 1 + parents.iter().map(|p| p.generation).max().unwrap_or(0);

        for parent in &parents {
            let limit = self.limit(parent.generation)?;
            if self.graph.children_of(&parent.id).len() >= limit.max_children_per_cosigner {
                return Err(CapacityFault::ChildrenBudget {
                    identity: parent.id.to_string(),
                    max: limit.max_children_per_cosigner,
                }
                .into());
            }
        }

        let need = self.limit(generation)?.min_cosigners;
        if parents.len() < need {
            return Err(CapacityFault::TooFewCosigners {
                generation,
                have: parents.len(),
                need,
            }
            .into());
        }

        let individual = Individual { id, generation };
        self.graph
            .add_vertex(Vertex::new(id, individual, parents.iter().map(|p| p.id)))?;

        if self.generations.len() <= generation {
            self.generations.resize_with(generation + 1, Vec::new);
        }
        self.generations[generation].push(id);

        debug!(identity = %id, generation, cosigners = parents.len(), "identity minted");
        Ok(individual)
    }

    fn limit(&self, generation: usize) -> LineageResult<GenerationLimit> {
        self.limits
            .get(generation)
            .copied()
            .ok_or_else(|| CapacityFault::NoGenerationLimit(generation).into())
    }

    pub fn get(&self, id: &IdentityId) -> LineageResult<Individual> {
        self.graph
            .with_vertex(id, |v| *v.payload())
            .ok_or_else(|| LineageError::NotFound(format!("identity {}", id)))
    }

    pub fn contains(&self, id: &IdentityId) -> bool {
        self.graph.contains(id)
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Identities of generation `g` in insertion order
    pub fn generation(&self, g: usize) -> &[IdentityId] {
        self.generations.get(g).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Highest generation with at least one identity
    pub fn max_generation(&self) -> usize {
        self.generations
            .iter()
            .rposition(|ids| !ids.is_empty())
            .unwrap_or(0)
    }

    pub fn children_of(&self, id: &IdentityId) -> Vec<IdentityId> {
        self.graph.children_of(id)
    }

    pub fn cosigners_of(&self, id: &IdentityId) -> Vec<IdentityId> {
        self.graph
            .with_vertex(id, |v| v.parents().to_vec())
            .unwrap_or_default()
    }

    /// Children `id` may still cosign
    pub fn remaining_budget(&self, id: &IdentityId) -> LineageResult<usize> {
        let individual = self.get(id)?;
        let limit = self.limit(individual.generation)?;
        Ok(limit
            .max_children_per_cosigner
            .saturating_sub(self.graph.children_of(id).len()))
    }

    pub fn limits(&self) -> &[GenerationLimit] {
        &self.limits
    }

    /// Bounded snapshot around `keys` (generation 0 when empty)
    pub fn dump(
        &self,
        keys: &[IdentityId],
        limits: DumpLimits,
    ) -> LineageResult<GraphDump<IdentityId>> {
        self.graph.dump(keys, limits, |v| {
            format!("{} g{}", v.id().short(), v.payload().generation)
        })
    }

    /// Replace the public profile of a known identity
    pub fn update_profile(&mut self, id: &IdentityId, profile: Profile) -> LineageResult<()> {
        if !self.graph.contains(id) {
            return Err(LineageError::NotFound(format!("identity {}", id)));
        }
        self.profiles.insert(*id, profile);
        Ok(())
    }

    pub fn profile(&self, id: &IdentityId) -> Option<&Profile> {
        self.profiles.get(id)
    }
}

/// Serializes as an unbounded dump
impl Serialize for IdentityGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.dump(&[], DumpLimits::unbounded())
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl std::fmt::Debug for IdentityGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityGraph")
            .field("identities", &self.graph.len())
            .field("generations", &self.generations.len())
            .field("profiles", &self.profiles.len())
            .finish()
    }
}
