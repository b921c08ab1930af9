//! Vertex - one node of the append-only graph

use std::sync::Arc;

/// Graph vertex
///
/// Id, payload and parents are fixed at construction. Only the child set
/// grows, and only through the owning [`Graph`](crate::Graph).
#[derive(Debug)]
pub struct Vertex<K, V> {
    id: K,
    payload: Arc<V>,
    parents: Vec<K>,
    children: Vec<K>,
}

impl<K: Clone, V> Clone for Vertex<K, V> {
    fn clone(&self) -> Self {
        Vertex {
            id: self.id.clone(),
            payload: Arc::clone(&self.payload),
            parents: self.parents.clone(),
            children: self.children.clone(),
        }
    }
}

impl<K: PartialEq, V> Vertex<K, V> {
    /// Create a vertex. Duplicate parents collapse, first occurrence wins.
    pub fn new(id: K, payload: V, parents: impl IntoIterator<Item = K>) -> Self {
        let mut unique: Vec<K> = Vec::new();
        for parent in parents {
            if !unique.contains(&parent) {
                unique.push(parent);
            }
        }
        Vertex {
            id,
            payload: Arc::new(payload),
            parents: unique,
            children: Vec::new(),
        }
    }

    /// Create a parentless vertex
    pub fn root(id: K, payload: V) -> Self {
        Self::new(id, payload, std::iter::empty())
    }

    pub fn id(&self) -> &K {
        &self.id
    }

    pub fn payload(&self) -> &V {
        &self.payload
    }

    /// Shared handle to the payload, valid after the graph lock is released
    pub fn shared_payload(&self) -> Arc<V> {
        Arc::clone(&self.payload)
    }

    /// Parents in declaration order
    pub fn parents(&self) -> &[K] {
        &self.parents
    }

    /// Children in arrival order
    pub fn children(&self) -> &[K] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn has_parent(&self, id: &K) -> bool {
        self.parents.contains(id)
    }

    pub fn has_child(&self, id: &K) -> bool {
        self.children.contains(id)
    }

    pub(crate) fn add_child(&mut self, id: K) {
        if !self.children.contains(&id) {
            self.children.push(id);
        }
    }

    pub(crate) fn remove_child(&mut self, id: &K) {
        self.children.retain(|c| c != id);
    }
}
