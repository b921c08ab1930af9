//! EventChain - causal event graph with per-author self-chains
//!
//! Beyond the underlying [`Graph`] the chain keeps a birth index (the
//! event that created each identity), a tip index (each author's latest
//! event) and the set of authors that have ended their chain. These maps
//! are not synchronized on their own: mutation takes `&mut self`, so a
//! shared chain must sit behind a single lock together with any state
//! that is updated alongside it.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use lineage_core::{IdentityId, LineageError, LineageResult, Payload, ReferenceFault, VertexId};
use lineage_dag::{DumpLimits, Graph, GraphDump, Vertex};

use crate::Event;

/// Append-only graph of events
pub struct EventChain {
    graph: Graph<VertexId, Event>,
    births: HashMap<IdentityId, VertexId>,
    tips: HashMap<IdentityId, VertexId>,
    ended: HashSet<IdentityId>,
}

impl EventChain {
    /// Create an empty chain. The first accepted event becomes its only root.
    pub fn new() -> Self {
        EventChain {
            graph: Graph::with_quota(1),
            births: HashMap::new(),
            tips: HashMap::new(),
            ended: HashSet::new(),
        }
    }

    /// Accept an event
    pub fn add_event(
        &mut self,
        id: VertexId,
        author: IdentityId,
        payload: Payload,
        refs: Vec<VertexId>,
    ) -> LineageResult<Event> {
        if self.graph.contains(&id) {
            return Err(LineageError::Conflict(format!("event {}", id)));
        }

        let event = if self.graph.is_empty() {
            if !refs.is_empty() {
                return Err(ReferenceFault::RootHasParents(id.to_string()).into());
            }
            let event = Event {
                id: id.clone(),
                author,
                nonce: 0,
                payload,
                refs,
            };
            self.graph.add_vertex(Vertex::root(id.clone(), event.clone()))?;

            // A genesis event births every root it lists. Any other root
            // event stands in for its author's birth.
            if !matches!(event.payload, Payload::Genesis { .. }) {
                self.births.insert(author, id.clone());
            }
            event
        } else {
            if matches!(payload, Payload::Genesis { .. }) {
                return Err(ReferenceFault::GenesisNotRoot.into());
            }
            if self.ended.contains(&author) {
                return Err(ReferenceFault::AuthorEnded(author.to_string()).into());
            }
            self.check_refs(&author, &refs)?;
            if let Some(born) = payload.births().iter().find(|x| self.births.contains_key(*x)) {
                return Err(LineageError::Conflict(format!("birth of identity {}", born)));
            }

            let nonce = self.expected_nonce(&refs)?;
            let event = Event {
                id: id.clone(),
                author,
                nonce,
                payload,
                refs,
            };
            self.graph
                .add_vertex(Vertex::new(id.clone(), event.clone(), event.refs.iter().cloned()))?;
            event
        };

        for born in event.payload.births() {
            self.births.insert(*born, id.clone());
        }
        if matches!(event.payload, Payload::End) {
            self.ended.insert(author);
        }
        self.tips.insert(author, id);

        debug!(
            event = %event.id.short(),
            author = %author,
            nonce = event.nonce,
            kind = ?event.kind(),
            "event accepted"
        );
        Ok(event)
    }

    /// Validate the references of a non-root event by `author`
    pub fn check_refs(&self, author: &IdentityId, refs: &[VertexId]) -> LineageResult<()> {
        let Some(primary) = refs.first() else {
            return Err(ReferenceFault::NoReferences.into());
        };
        if let Some(missing) = refs.iter().find(|r| !self.graph.contains(r)) {
            return Err(ReferenceFault::MissingParent(missing.to_string()).into());
        }

        let own_chain = self
            .graph
            .with_vertex(primary, |v| {
                let p0 = v.payload();
                p0.author == *author || p0.births(author)
            })
            .unwrap_or(false);
        if !own_chain {
            return Err(ReferenceFault::NotOwnBirth {
                author: author.to_string(),
                primary: primary.to_string(),
            }
            .into());
        }

        let forked = self
            .graph
            .children_of(primary)
            .iter()
            .any(|child| self.author_of(child) == Some(*author));
        if forked {
            return Err(ReferenceFault::Equivocation {
                author: author.to_string(),
                primary: primary.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Nonce an event with these references must carry
    pub fn expected_nonce(&self, refs: &[VertexId]) -> LineageResult<u64> {
        let mut max: Option<u64> = None;
        for r in refs {
            let nonce = self
                .graph
                .with_vertex(r, |v| v.payload().nonce)
                .ok_or_else(|| ReferenceFault::MissingParent(r.to_string()))?;
            max = Some(max.map_or(nonce, |m| m.max(nonce)));
        }
        Ok(max.map_or(0, |m| m + 1))
    }

    /// Latest event by `author`
    pub fn tip(&self, author: &IdentityId) -> Option<VertexId> {
        self.tips.get(author).cloned()
    }

    /// Event that created `identity`
    pub fn birth_of(&self, identity: &IdentityId) -> Option<VertexId> {
        self.births.get(identity).cloned()
    }

    /// Event the next self-authored event must extend: the tip, or the
    /// birth event for an identity that has not written yet.
    pub fn head(&self, author: &IdentityId) -> Option<VertexId> {
        self.tip(author).or_else(|| self.birth_of(author))
    }

    pub fn is_known(&self, id: &VertexId) -> bool {
        self.graph.contains(id)
    }

    pub fn is_ended(&self, author: &IdentityId) -> bool {
        self.ended.contains(author)
    }

    pub fn get(&self, id: &VertexId) -> Option<Event> {
        self.graph.with_vertex(id, |v| v.payload().clone())
    }

    pub fn author_of(&self, id: &VertexId) -> Option<IdentityId> {
        self.graph.with_vertex(id, |v| v.payload().author)
    }

    pub fn children_of(&self, id: &VertexId) -> Vec<VertexId> {
        self.graph.children_of(id)
    }

    /// Event ids in acceptance order
    pub fn ids(&self) -> Vec<VertexId> {
        self.graph.ids()
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Bounded snapshot of the chain around `keys` (genesis when empty)
    pub fn dump(
        &self,
        keys: &[VertexId],
        limits: DumpLimits,
    ) -> LineageResult<GraphDump<VertexId>> {
        self.graph.dump(keys, limits, event_label)
    }

    /// Bounded snapshot of `author`'s self-chain. Only references between
    /// the author's own events are kept.
    pub fn dump_by_author(
        &self,
        author: &IdentityId,
        keys: &[VertexId],
        limits: DumpLimits,
    ) -> LineageResult<GraphDump<VertexId>> {
        let events = self.self_chain(author)?;
        let own: HashSet<VertexId> = events.iter().map(|e| e.id.clone()).collect();

        let sub: Graph<VertexId, Event> = Graph::with_quota(1);
        for event in events {
            let refs: Vec<VertexId> =
                event.refs.iter().filter(|r| own.contains(*r)).cloned().collect();
            sub.add_vertex(Vertex::new(event.id.clone(), event, refs))?;
        }
        sub.dump(keys, limits, event_label)
    }

    /// The events `author` wrote, in self-chain order
    pub fn self_chain(&self, author: &IdentityId) -> LineageResult<Vec<Event>> {
        let start = self
            .birth_of(author)
            .ok_or_else(|| LineageError::NotFound(format!("birth of {}", author)))?;

        let mut out = Vec::new();
        let mut seen: HashSet<VertexId> = HashSet::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if !seen.insert(id.clone()) {
                continue;
            }
            let Some((event, children)) = self
                .graph
                .with_vertex(&id, |v| (v.payload().clone(), v.children().to_vec()))
            else {
                continue;
            };

            for child in children {
                let extends = self
                    .graph
                    .with_vertex(&child, |v| {
                        v.payload().author == *author && v.parents().first() == Some(&id)
                    })
                    .unwrap_or(false);
                if extends {
                    stack.push(child);
                }
            }
            if event.author == *author {
                out.push(event);
            }
        }
        Ok(out)
    }
}

fn event_label(v: &Vertex<VertexId, Event>) -> String {
    format!("{} {:?}", v.id().short(), v.payload().kind())
}

impl Default for EventChain {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventChain")
            .field("events", &self.graph.len())
            .field("authors", &self.tips.len())
            .field("ended", &self.ended.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineage_core::Birth;
    use proptest::prelude::*;

    fn ident(n: u8) -> IdentityId {
        IdentityId::new([n; 20])
    }

    fn eid(n: u32) -> VertexId {
        VertexId::from(n.to_be_bytes().to_vec())
    }

    fn genesis(chain: &mut EventChain, roots: &[u8]) -> VertexId {
        let roots: Vec<IdentityId> = roots.iter().map(|r| ident(*r)).collect();
        chain
            .add_event(eid(0), roots[0], Payload::Genesis { roots }, vec![])
            .unwrap();
        eid(0)
    }

    fn birth(x: u8) -> Payload {
        Payload::Birth(Birth::new(ident(x)))
    }

    #[test]
    fn test_root_event() {
        let mut chain = EventChain::new();
        let ev = chain
            .add_event(eid(0), ident(1), Payload::info("hi"), vec![])
            .unwrap();
        assert_eq!(ev.nonce, 0);
        assert_eq!(chain.birth_of(&ident(1)), Some(eid(0)));
        assert_eq!(chain.tip(&ident(1)), Some(eid(0)));
    }

    #[test]
    fn test_root_with_refs_rejected() {
        let mut chain = EventChain::new();
        let err = chain
            .add_event(eid(1), ident(1), Payload::info("hi"), vec![eid(0)])
            .unwrap_err();
        assert!(matches!(
            err,
            LineageError::Reference(ReferenceFault::RootHasParents(_))
        ));
    }

    #[test]
    fn test_genesis_births_every_root() {
        let mut chain = EventChain::new();
        let g = genesis(&mut chain, &[1, 2, 3]);
        for r in 1..=3 {
            assert_eq!(chain.birth_of(&ident(r)), Some(g.clone()));
        }
        assert_eq!(chain.head(&ident(2)), Some(g.clone()));

        // every root may extend genesis once
        for r in 1..=3u8 {
            chain
                .add_event(eid(r as u32), ident(r), Payload::info("first"), vec![g.clone()])
                .unwrap();
        }
        assert_eq!(chain.head(&ident(2)), Some(eid(2)));
    }

    #[test]
    fn test_genesis_only_as_root() {
        let mut chain = EventChain::new();
        let g = genesis(&mut chain, &[1]);
        let err = chain
            .add_event(eid(1), ident(1), Payload::Genesis { roots: vec![ident(1)] }, vec![g])
            .unwrap_err();
        assert_eq!(err, LineageError::Reference(ReferenceFault::GenesisNotRoot));
    }

    #[test]
    fn test_second_continuation_of_birth_rejected() {
        let mut chain = EventChain::new();
        let g = genesis(&mut chain, &[1]);
        let b = eid(10);
        chain.add_event(b.clone(), ident(1), birth(9), vec![g]).unwrap();

        chain
            .add_event(eid(11), ident(9), Payload::info("e1"), vec![b.clone()])
            .unwrap();
        let err = chain
            .add_event(eid(12), ident(9), Payload::info("e2"), vec![b])
            .unwrap_err();
        assert!(matches!(
            err,
            LineageError::Reference(ReferenceFault::Equivocation { .. })
        ));
    }

    #[test]
    fn test_first_event_must_extend_own_birth() {
        let mut chain = EventChain::new();
        let g = genesis(&mut chain, &[1]);
        chain.add_event(eid(10), ident(1), birth(9), vec![g.clone()]).unwrap();

        let err = chain
            .add_event(eid(11), ident(8), Payload::info("stranger"), vec![eid(10)])
            .unwrap_err();
        assert!(matches!(
            err,
            LineageError::Reference(ReferenceFault::NotOwnBirth { .. })
        ));

        // cross-references are fine once the primary is our own
        chain
            .add_event(eid(12), ident(9), Payload::info("mine"), vec![eid(10), g])
            .unwrap();
    }

    #[test]
    fn test_refs_checked() {
        let mut chain = EventChain::new();
        genesis(&mut chain, &[1]);

        let err = chain
            .add_event(eid(1), ident(1), Payload::info("x"), vec![])
            .unwrap_err();
        assert_eq!(err, LineageError::Reference(ReferenceFault::NoReferences));

        let err = chain
            .add_event(eid(1), ident(1), Payload::info("x"), vec![eid(0), eid(77)])
            .unwrap_err();
        assert!(matches!(
            err,
            LineageError::Reference(ReferenceFault::MissingParent(_))
        ));
    }

    #[test]
    fn test_duplicate_event() {
        let mut chain = EventChain::new();
        let g = genesis(&mut chain, &[1]);
        let err = chain
            .add_event(g, ident(1), Payload::info("x"), vec![])
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_double_birth_rejected() {
        let mut chain = EventChain::new();
        let g = genesis(&mut chain, &[1]);
        chain.add_event(eid(1), ident(1), birth(9), vec![g]).unwrap();
        let err = chain
            .add_event(eid(2), ident(1), birth(9), vec![eid(1)])
            .unwrap_err();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_nonce_follows_deepest_parent() {
        let mut chain = EventChain::new();
        let g = genesis(&mut chain, &[1, 2]);
        chain.add_event(eid(1), ident(1), Payload::info("a"), vec![g.clone()]).unwrap();
        chain.add_event(eid(2), ident(1), Payload::info("b"), vec![eid(1)]).unwrap();
        let ev = chain
            .add_event(eid(3), ident(2), Payload::info("c"), vec![g, eid(2)])
            .unwrap();
        assert_eq!(ev.nonce, 3);
        assert_eq!(chain.expected_nonce(&[eid(3)]).unwrap(), 4);
        assert_eq!(chain.expected_nonce(&[]).unwrap(), 0);
    }

    #[test]
    fn test_end_closes_chain() {
        let mut chain = EventChain::new();
        let g = genesis(&mut chain, &[1]);
        chain.add_event(eid(1), ident(1), Payload::End, vec![g]).unwrap();
        assert!(chain.is_ended(&ident(1)));

        let err = chain
            .add_event(eid(2), ident(1), Payload::info("late"), vec![eid(1)])
            .unwrap_err();
        assert!(matches!(
            err,
            LineageError::Reference(ReferenceFault::AuthorEnded(_))
        ));
    }

    #[test]
    fn test_self_chain() {
        let mut chain = EventChain::new();
        let g = genesis(&mut chain, &[1, 2]);
        chain.add_event(eid(1), ident(2), Payload::info("other"), vec![g.clone()]).unwrap();
        chain.add_event(eid(2), ident(1), Payload::info("a"), vec![g]).unwrap();
        chain.add_event(eid(3), ident(1), Payload::info("b"), vec![eid(2), eid(1)]).unwrap();
        chain.add_event(eid(4), ident(2), Payload::info("c"), vec![eid(1), eid(3)]).unwrap();

        let own: Vec<VertexId> = chain
            .self_chain(&ident(1))
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(own, vec![eid(0), eid(2), eid(3)]);

        let other: Vec<VertexId> = chain
            .self_chain(&ident(2))
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(other, vec![eid(1), eid(4)]);

        assert!(matches!(
            chain.self_chain(&ident(7)),
            Err(LineageError::NotFound(_))
        ));
    }

    #[test]
    fn test_dump() {
        let mut chain = EventChain::new();
        let g = genesis(&mut chain, &[1, 2]);
        chain.add_event(eid(1), ident(1), Payload::info("a"), vec![g.clone()]).unwrap();
        chain.add_event(eid(2), ident(1), Payload::info("b"), vec![eid(1)]).unwrap();

        let dump = chain.dump(&[], DumpLimits::unbounded()).unwrap();
        assert_eq!(dump.ids().cloned().collect::<Vec<_>>(), vec![g.clone(), eid(1), eid(2)]);
        assert!(dump.get(&g).unwrap().label.ends_with("Genesis"));

        let dump = chain.dump(&[eid(2)], DumpLimits::new(1, 0)).unwrap();
        assert_eq!(dump.ids().cloned().collect::<Vec<_>>(), vec![eid(1), eid(2)]);
        assert!(dump.get(&eid(1)).unwrap().truncated);

        let json = serde_json::to_string(&dump).unwrap();
        let back: GraphDump<VertexId> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, dump);
    }

    #[test]
    fn test_dump_by_author() {
        let mut chain = EventChain::new();
        let g = genesis(&mut chain, &[1, 2]);
        chain.add_event(eid(1), ident(2), Payload::info("other"), vec![g.clone()]).unwrap();
        chain.add_event(eid(2), ident(1), Payload::info("a"), vec![g]).unwrap();
        chain.add_event(eid(3), ident(1), Payload::info("b"), vec![eid(2), eid(1)]).unwrap();
        chain.add_event(eid(4), ident(2), Payload::info("c"), vec![eid(1), eid(3)]).unwrap();

        let dump = chain.dump_by_author(&ident(2), &[], DumpLimits::unbounded()).unwrap();
        assert_eq!(dump.ids().cloned().collect::<Vec<_>>(), vec![eid(1), eid(4)]);
        let last = dump.get(&eid(4)).unwrap();
        assert_eq!(last.parents, vec![eid(1)]);
        assert!(!last.truncated);

        // rooted at the first own event, one hop down
        let dump = chain
            .dump_by_author(&ident(1), &[eid(2)], DumpLimits::new(0, 1))
            .unwrap();
        assert_eq!(dump.ids().cloned().collect::<Vec<_>>(), vec![eid(2), eid(3)]);

        assert!(matches!(
            chain.dump_by_author(&ident(7), &[], DumpLimits::unbounded()),
            Err(LineageError::NotFound(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_nonce_and_linearity(
            ops in proptest::collection::vec((0u8..3, any::<bool>(), 0usize..64, 0usize..64), 1..60)
        ) {
            let mut chain = EventChain::new();
            genesis(&mut chain, &[0, 1, 2]);

            for (i, (author, use_head, pick, extra)) in ops.into_iter().enumerate() {
                let ids = chain.ids();
                let author = ident(author);
                let primary = if use_head {
                    chain.head(&author).unwrap()
                } else {
                    ids[pick % ids.len()].clone()
                };
                let refs = vec![primary, ids[extra % ids.len()].clone()];
                let _ = chain.add_event(eid(i as u32 + 1), author, Payload::info("p"), refs);
            }

            let mut continuations: HashSet<(IdentityId, VertexId)> = HashSet::new();
            for id in chain.ids() {
                let ev = chain.get(&id).unwrap();
                if ev.is_root() {
                    prop_assert_eq!(ev.nonce, 0);
                    continue;
                }
                let max = ev.refs.iter().map(|r| chain.get(r).unwrap().nonce).max().unwrap();
                prop_assert_eq!(ev.nonce, max + 1);
                prop_assert!(continuations.insert((ev.author, ev.refs[0].clone())));
            }
        }
    }
}
