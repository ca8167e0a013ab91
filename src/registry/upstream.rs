//! Upstream group registry: the peer chain and its aggregates.

use crate::region::arena::Arena;
use crate::region::slab::SlabAllocator;
use crate::registry::peer::{Peer, PeerId, PeerView};

/// Peers of one upstream group.
///
/// Aggregates are only ever written by [`Registry::recompute`], which walks
/// the whole chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    name: String,
    head: Option<PeerId>,
    count: usize,
    total_weight: i64,
    single: bool,
    weighted: bool,
}

impl Registry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            head: None,
            count: 0,
            total_weight: 0,
            single: false,
            weighted: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn head(&self) -> Option<PeerId> {
        self.head
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn total_weight(&self) -> i64 {
        self.total_weight
    }

    /// Exactly one peer.
    pub fn single(&self) -> bool {
        self.single
    }

    /// Not every weight equals 1.
    pub fn weighted(&self) -> bool {
        self.weighted
    }

    pub(crate) fn set_head(&mut self, head: Option<PeerId>) {
        self.head = head;
    }

    /// Walk the chain in insertion order.
    pub fn peers<'a>(&self, arena: &'a Arena<Peer>, alloc: &'a SlabAllocator) -> Peers<'a> {
        Peers {
            next: self.head,
            arena,
            alloc,
            remaining: arena.len(),
        }
    }

    /// Rebuild count, total weight and the derived flags from the chain.
    pub(crate) fn recompute(&mut self, arena: &Arena<Peer>, alloc: &SlabAllocator) {
        let (count, total_weight) = self
            .peers(arena, alloc)
            .fold((0usize, 0i64), |(count, total), peer| {
                (count + 1, total + peer.weight() as i64)
            });

        self.count = count;
        self.total_weight = total_weight;
        self.single = count == 1;
        self.weighted = total_weight != count as i64;
    }
}

/// Iterator over a registry's chain.
///
/// Bounded by the arena size, so a corrupted link can never loop forever.
#[derive(Debug)]
pub struct Peers<'a> {
    next: Option<PeerId>,
    arena: &'a Arena<Peer>,
    alloc: &'a SlabAllocator,
    remaining: usize,
}

impl<'a> Iterator for Peers<'a> {
    type Item = PeerView<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.next?;
        let peer = self.arena.get(id)?;
        self.next = peer.next;
        self.remaining -= 1;
        Some(PeerView::new(id, peer, self.alloc))
    }
}
