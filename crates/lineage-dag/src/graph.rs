//! Graph - thread-safe append-only vertex store
//!
//! Acyclicity holds by construction: a vertex names its parents by id
//! before it exists, so in strict mode every edge points at an older
//! vertex. Lenient mode tolerates parents that have not arrived yet; the
//! edge waits in `pending` and is backfilled when the parent is inserted.
//! Every mutation runs under one coarse lock per graph.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

use parking_lot::Mutex;
use tracing::debug;

use lineage_core::{CapacityFault, LineageError, LineageResult, ReferenceFault};

use crate::{DumpLimits, DumpVertex, GraphDump, Vertex};

/// Default maximum number of parents per vertex
pub const DEFAULT_MAX_PARENTS: usize = 255;

/// Requirements on a vertex id
pub trait VertexKey: Clone + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync {}

impl<T> VertexKey for T where T: Clone + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync {}

struct GraphInner<K, V> {
    store: HashMap<K, Vertex<K, V>>,
    /// Insertion order
    ids: Vec<K>,
    root_quota: usize,
    roots_left: usize,
    max_parents: usize,
    /// Missing parent -> children waiting for it. `None` while strict.
    pending: Option<HashMap<K, Vec<K>>>,
}

/// Append-only directed acyclic graph
pub struct Graph<K, V> {
    inner: Mutex<GraphInner<K, V>>,
}

impl<K: VertexKey, V> Graph<K, V> {
    /// Create a graph seeded with `roots`; at most `root_quota` parentless
    /// vertices will ever be accepted.
    pub fn new(
        root_quota: usize,
        roots: impl IntoIterator<Item = Vertex<K, V>>,
    ) -> LineageResult<Self> {
        let mut inner = GraphInner {
            store: HashMap::new(),
            ids: Vec::new(),
            root_quota,
            roots_left: root_quota,
            max_parents: DEFAULT_MAX_PARENTS,
            pending: None,
        };

        for root in roots {
            if inner.roots_left == 0 {
                return Err(CapacityFault::RootQuota(root_quota).into());
            }
            if !root.is_root() {
                return Err(CapacityFault::SeedHasParents(root.id().to_string()).into());
            }
            if inner.store.contains_key(root.id()) {
                return Err(LineageError::Conflict(format!("vertex {}", root.id())));
            }
            inner.roots_left -= 1;
            inner.ids.push(root.id().clone());
            inner.store.insert(root.id().clone(), root);
        }

        Ok(Graph {
            inner: Mutex::new(inner),
        })
    }

    /// Create an empty graph
    pub fn with_quota(root_quota: usize) -> Self {
        Graph {
            inner: Mutex::new(GraphInner {
                store: HashMap::new(),
                ids: Vec::new(),
                root_quota,
                roots_left: root_quota,
                max_parents: DEFAULT_MAX_PARENTS,
                pending: None,
            }),
        }
    }

    /// Insert a vertex
    pub fn add_vertex(&self, vertex: Vertex<K, V>) -> LineageResult<()> {
        let mut inner = self.inner.lock();
        let id = vertex.id().clone();

        if inner.store.contains_key(&id) {
            return Err(LineageError::Conflict(format!("vertex {}", id)));
        }

        let count = vertex.parents().len();
        if count > inner.max_parents {
            return Err(CapacityFault::TooManyParents {
                count,
                max: inner.max_parents,
            }
            .into());
        }

        if vertex.has_parent(&id) {
            return Err(ReferenceFault::Cycle(id.to_string()).into());
        }

        let strict = inner.pending.is_none();
        let mut missing = Vec::new();
        for parent in vertex.parents() {
            if !inner.store.contains_key(parent) {
                if strict {
                    return Err(ReferenceFault::MissingParent(parent.to_string()).into());
                }
                missing.push(parent.clone());
            }
        }

        if vertex.is_root() && inner.roots_left == 0 {
            return Err(CapacityFault::RootQuota(inner.root_quota).into());
        }

        // Children already waiting for this id become its children on
        // insertion; none of them may be an ancestor of the new vertex.
        let waiting: Vec<K> = inner
            .pending
            .as_ref()
            .and_then(|p| p.get(&id).cloned())
            .unwrap_or_default();
        if !waiting.is_empty() && inner.reaches_any(vertex.parents(), &waiting) {
            return Err(ReferenceFault::Cycle(id.to_string()).into());
        }

        if vertex.is_root() {
            inner.roots_left -= 1;
        }

        for parent in vertex.parents() {
            if let Some(p) = inner.store.get_mut(parent) {
                p.add_child(id.clone());
            }
        }
        if let Some(pending) = inner.pending.as_mut() {
            for parent in &missing {
                pending.entry(parent.clone()).or_default().push(id.clone());
            }
            pending.remove(&id);
        }

        let mut vertex = vertex;
        for child in &waiting {
            vertex.add_child(child.clone());
        }
        if !waiting.is_empty() {
            debug!(vertex = %id, children = waiting.len(), "backfilled pending children");
        }

        inner.ids.push(id.clone());
        inner.store.insert(id, vertex);
        Ok(())
    }

    /// Remove a vertex that has no children
    pub fn del_vertex(&self, id: &K) -> LineageResult<()> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let parents = match inner.store.get(id) {
            None => return Err(LineageError::NotFound(format!("vertex {}", id))),
            Some(v) if !v.children().is_empty() => {
                return Err(LineageError::HasChildren(id.to_string()))
            }
            Some(v) => v.parents().to_vec(),
        };

        for parent in &parents {
            if let Some(p) = inner.store.get_mut(parent) {
                p.remove_child(id);
            } else if let Some(pending) = inner.pending.as_mut() {
                if let Some(waiting) = pending.get_mut(parent) {
                    waiting.retain(|c| c != id);
                    if waiting.is_empty() {
                        pending.remove(parent);
                    }
                }
            }
        }

        inner.store.remove(id);
        inner.ids.retain(|i| i != id);
        Ok(())
    }

    /// Snapshot of a vertex
    pub fn get_vertex(&self, id: &K) -> Option<Vertex<K, V>> {
        self.inner.lock().store.get(id).cloned()
    }

    /// Run `f` against a vertex without cloning it
    pub fn with_vertex<R>(&self, id: &K, f: impl FnOnce(&Vertex<K, V>) -> R) -> Option<R> {
        self.inner.lock().store.get(id).map(f)
    }

    pub fn contains(&self, id: &K) -> bool {
        self.inner.lock().store.contains_key(id)
    }

    /// All ids in insertion order
    pub fn ids(&self) -> Vec<K> {
        self.inner.lock().ids.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().store.is_empty()
    }

    /// Parentless vertices in insertion order
    pub fn roots(&self) -> Vec<K> {
        let inner = self.inner.lock();
        inner
            .ids
            .iter()
            .filter(|id| inner.store.get(*id).is_some_and(|v| v.is_root()))
            .cloned()
            .collect()
    }

    pub fn children_of(&self, id: &K) -> Vec<K> {
        self.with_vertex(id, |v| v.children().to_vec()).unwrap_or_default()
    }

    /// Children buffered while waiting for `id` to arrive
    pub fn pending_children(&self, id: &K) -> Vec<K> {
        self.inner
            .lock()
            .pending
            .as_ref()
            .and_then(|p| p.get(id).cloned())
            .unwrap_or_default()
    }

    /// Number of missing parents that still have children waiting
    pub fn pending_len(&self) -> usize {
        self.inner.lock().pending.as_ref().map_or(0, |p| p.len())
    }

    /// Every ancestor of `id`, nearest first
    pub fn ancestors(&self, id: &K) -> Vec<K> {
        let inner = self.inner.lock();
        let Some(start) = inner.store.get(id) else {
            return Vec::new();
        };

        let mut seen: HashSet<K> = HashSet::new();
        let mut out = Vec::new();
        let mut stack: Vec<K> = start.parents().iter().rev().cloned().collect();
        while let Some(next) = stack.pop() {
            if !seen.insert(next.clone()) {
                continue;
            }
            if let Some(v) = inner.store.get(&next) {
                stack.extend(v.parents().iter().rev().cloned());
                out.push(next);
            }
        }
        out
    }

    /// Bounded snapshot around `keys`, or around the roots when `keys` is
    /// empty. `label` renders each vertex.
    pub fn dump(
        &self,
        keys: &[K],
        limits: DumpLimits,
        label: impl Fn(&Vertex<K, V>) -> String,
    ) -> LineageResult<GraphDump<K>> {
        let inner = self.inner.lock();

        let starts: Vec<K> = if keys.is_empty() {
            inner
                .ids
                .iter()
                .filter(|id| inner.store.get(*id).is_some_and(|v| v.is_root()))
                .cloned()
                .collect()
        } else {
            if let Some(missing) = keys.iter().find(|k| !inner.store.contains_key(*k)) {
                return Err(LineageError::NotFound(format!("vertex {}", missing)));
            }
            keys.to_vec()
        };

        let mut keep: HashSet<K> = starts.iter().cloned().collect();
        inner.collect_within(&starts, limits.parents, Direction::Up, &mut keep);
        inner.collect_within(&starts, limits.children, Direction::Down, &mut keep);

        let vertices = inner
            .ids
            .iter()
            .filter(|id| keep.contains(*id))
            .filter_map(|id| inner.store.get(id))
            .map(|v| {
                let parents: Vec<K> =
                    v.parents().iter().filter(|p| keep.contains(*p)).cloned().collect();
                let children: Vec<K> =
                    v.children().iter().filter(|c| keep.contains(*c)).cloned().collect();
                DumpVertex {
                    id: v.id().clone(),
                    label: label(v),
                    truncated: parents.len() != v.parents().len()
                        || children.len() != v.children().len(),
                    parents,
                    children,
                }
            })
            .collect();

        Ok(GraphDump { vertices })
    }

    pub fn set_max_parents(&self, max: usize) {
        self.inner.lock().max_parents = max;
    }

    pub fn max_parents(&self) -> usize {
        self.inner.lock().max_parents
    }

    pub fn root_quota(&self) -> usize {
        self.inner.lock().root_quota
    }

    /// Switch to lenient insertion. There is no way back to strict.
    pub fn enable_lenient(&self) {
        let mut inner = self.inner.lock();
        if inner.pending.is_none() {
            inner.pending = Some(HashMap::new());
        }
    }

    pub fn is_strict(&self) -> bool {
        self.inner.lock().pending.is_none()
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Up,
    Down,
}

impl<K: VertexKey, V> GraphInner<K, V> {
    /// Add everything within `depth` hops of `starts` to `keep`
    fn collect_within(
        &self,
        starts: &[K],
        depth: Option<usize>,
        direction: Direction,
        keep: &mut HashSet<K>,
    ) {
        let mut seen: HashSet<K> = starts.iter().cloned().collect();
        let mut frontier: Vec<K> = starts.to_vec();
        let mut hops = 0;
        while !frontier.is_empty() && depth.map_or(true, |d| hops < d) {
            hops += 1;
            let mut next = Vec::new();
            for id in &frontier {
                let Some(v) = self.store.get(id) else {
                    continue;
                };
                let edges = match direction {
                    Direction::Up => v.parents(),
                    Direction::Down => v.children(),
                };
                for edge in edges {
                    if self.store.contains_key(edge) && seen.insert(edge.clone()) {
                        next.push(edge.clone());
                    }
                }
            }
            keep.extend(next.iter().cloned());
            frontier = next;
        }
    }

    /// Does a walk up the parent links from `from` hit any of `targets`?
    fn reaches_any(&self, from: &[K], targets: &[K]) -> bool {
        let mut seen: HashSet<&K> = HashSet::new();
        let mut stack: Vec<&K> = from.iter().collect();
        while let Some(next) = stack.pop() {
            if targets.contains(next) {
                return true;
            }
            if !seen.insert(next) {
                continue;
            }
            if let Some(v) = self.store.get(next) {
                stack.extend(v.parents().iter());
            }
        }
        false
    }
}

impl<K: VertexKey, V> fmt::Debug for Graph<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Graph")
            .field("vertices", &inner.store.len())
            .field("roots_left", &inner.roots_left)
            .field("max_parents", &inner.max_parents)
            .field("strict", &inner.pending.is_none())
            .finish()
    }
}
