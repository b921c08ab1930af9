//! Dump - bounded, serializable snapshot of a graph
//!
//! A dump starts from a set of vertices (the parentless ones when no keys
//! are given) and walks a limited number of hops up through parents and
//! down through children. Edge lists only name vertices inside the dump;
//! a vertex that lost edges to the bounds is flagged `truncated`.

use serde::{Deserialize, Serialize};

/// Hop limits for a dump. `None` is unbounded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpLimits {
    /// Hops walked towards ancestors of the start vertices
    pub parents: Option<usize>,
    /// Hops walked towards descendants of the start vertices
    pub children: Option<usize>,
}

impl DumpLimits {
    pub fn new(parents: usize, children: usize) -> Self {
        DumpLimits {
            parents: Some(parents),
            children: Some(children),
        }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }
}

/// One vertex of a dump
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpVertex<K> {
    pub id: K,
    pub label: String,
    pub parents: Vec<K>,
    pub children: Vec<K>,
    /// Some edge points outside the dump
    pub truncated: bool,
}

/// Snapshot of part of a graph, vertices in insertion order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDump<K> {
    pub vertices: Vec<DumpVertex<K>>,
}

impl<K: PartialEq> GraphDump<K> {
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn get(&self, id: &K) -> Option<&DumpVertex<K>> {
        self.vertices.iter().find(|v| v.id == *id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &K> {
        self.vertices.iter().map(|v| &v.id)
    }
}
