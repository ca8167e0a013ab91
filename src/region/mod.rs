//! Shared region subsystem.
//!
//! # Data Flow
//! ```text
//! SharedRegion (Arc<Mutex<Region>>)
//!     └── Region
//!           ├── slab.rs   SlabAllocator: fixed byte region, pages + size classes
//!           ├── arena.rs  Arena<Peer>: handle-indexed peer slots
//!           └── upstreams: name → Registry (peer chain + aggregates)
//!
//! Mutation (engine, lock held throughout):
//!     allocate → link/unlink → free → recompute aggregates
//! ```
//!
//! # Design Decisions
//! - One coarse lock per region; readers and writers both take it
//! - Every region-owned value is a `Block`; configuration-loaded names and
//!   addresses are typed as static and can never reach `free`
//! - A poisoned lock is recovered: the state is consistent at every point
//!   where the guard can be dropped

pub mod arena;
pub mod slab;

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use serde::Serialize;

use crate::registry::peer::{
    encode_addr, Peer, PeerAddr, PeerId, PeerParams, PeerText, PeerView, RecordMut,
    PEER_RECORD_SIZE,
};
use crate::registry::snapshot::UpstreamSnapshot;
use crate::registry::upstream::{Peers, Registry};
use self::arena::Arena;
use self::slab::{AllocError, Block, SlabAllocator};

/// Position of a peer in its chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Located {
    pub prev: Option<PeerId>,
    pub id: PeerId,
}

/// Allocator usage and registry totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionStats {
    pub total_bytes: usize,
    pub used_bytes: usize,
    pub page_size: usize,
    pub free_pages: usize,
    pub live_blocks: usize,
    pub upstreams: usize,
    pub peers: usize,
}

/// Allocator, peer slots and every upstream registry of one region.
#[derive(Debug)]
pub struct Region {
    alloc: SlabAllocator,
    peers: Arena<Peer>,
    upstreams: BTreeMap<String, Registry>,
}

impl Region {
    pub fn new(size: usize, page_size: usize) -> Result<Self, AllocError> {
        let alloc = SlabAllocator::new(size, page_size)?;
        let peers = Arena::new(alloc.tag());
        Ok(Self {
            alloc,
            peers,
            upstreams: BTreeMap::new(),
        })
    }

    pub fn allocator(&self) -> &SlabAllocator {
        &self.alloc
    }

    pub fn stats(&self) -> RegionStats {
        RegionStats {
            total_bytes: self.alloc.total_bytes(),
            used_bytes: self.alloc.used_bytes(),
            page_size: self.alloc.page_size(),
            free_pages: self.alloc.free_pages(),
            live_blocks: self.alloc.live_blocks(),
            upstreams: self.upstreams.len(),
            peers: self.peers.len(),
        }
    }

    /// Register an empty upstream group. Returns false if it already exists.
    pub fn create_upstream(&mut self, name: &str) -> bool {
        if self.upstreams.contains_key(name) {
            return false;
        }
        self.upstreams.insert(name.to_string(), Registry::new(name));
        true
    }

    pub fn upstream(&self, name: &str) -> Option<&Registry> {
        self.upstreams.get(name)
    }

    pub fn upstreams(&self) -> impl Iterator<Item = &Registry> {
        self.upstreams.values()
    }

    /// Peers of `upstream` in chain order; empty for an unknown group.
    pub fn peers(&self, upstream: &str) -> impl Iterator<Item = PeerView<'_>> {
        self.upstreams
            .get(upstream)
            .map(|registry| registry.peers(&self.peers, &self.alloc))
            .into_iter()
            .flatten()
    }

    pub fn peer(&self, id: PeerId) -> Option<PeerView<'_>> {
        self.peers
            .get(id)
            .map(|peer| PeerView::new(id, peer, &self.alloc))
    }

    pub fn snapshot(&self, upstream: &str) -> Option<UpstreamSnapshot> {
        let registry = self.upstreams.get(upstream)?;
        Some(UpstreamSnapshot::new(
            registry,
            registry.peers(&self.peers, &self.alloc),
        ))
    }

    pub fn snapshots(&self) -> Vec<UpstreamSnapshot> {
        self.upstreams
            .values()
            .map(|registry| {
                UpstreamSnapshot::new(registry, registry.peers(&self.peers, &self.alloc))
            })
            .collect()
    }

    /// Find a peer by exact name.
    pub fn locate(&self, upstream: &str, name: &str) -> Option<Located> {
        let mut prev = None;
        for peer in self.chain(upstream)? {
            if peer.name().as_bytes() == name.as_bytes() {
                return Some(Located { prev, id: peer.id() });
            }
            prev = Some(peer.id());
        }
        None
    }

    /// Add a configuration-loaded peer to the tail of `upstream`, creating
    /// the group if needed. Only the scalar record is drawn from the region.
    pub fn add_static_peer(
        &mut self,
        upstream: &str,
        name: &str,
        address: SocketAddr,
        params: &PeerParams,
    ) -> Result<PeerId, AllocError> {
        let record = self.alloc.allocate_zeroed(PEER_RECORD_SIZE)?;
        let peer = Peer {
            record,
            name: PeerText::Static(Arc::from(name)),
            address: PeerAddr::Static(address),
            next: None,
        };
        let id = self.link_tail(upstream, peer, params);
        self.recompute(upstream);
        Ok(id)
    }

    /// Allocate a detached peer whose record, name and address all live in
    /// the region. On failure every block taken so far is returned.
    pub(crate) fn allocate_peer(
        &mut self,
        name: &str,
        address: SocketAddr,
    ) -> Result<Peer, AllocError> {
        let record = self.alloc.allocate_zeroed(PEER_RECORD_SIZE)?;
        let name_block = match self.alloc.allocate_copy(name.as_bytes()) {
            Ok(block) => block,
            Err(e) => {
                self.release_block(record);
                return Err(e);
            }
        };
        let addr_block = match self.alloc.allocate_copy(&encode_addr(address)) {
            Ok(block) => block,
            Err(e) => {
                self.release_block(name_block);
                self.release_block(record);
                return Err(e);
            }
        };

        Ok(Peer {
            record,
            name: PeerText::Region(name_block),
            address: PeerAddr::Region(addr_block),
            next: None,
        })
    }

    /// Write `params` into a detached peer and append it to `upstream`.
    pub(crate) fn link_tail(&mut self, upstream: &str, mut peer: Peer, params: &PeerParams) -> PeerId {
        peer.next = None;
        if let Some(bytes) = self.alloc.bytes_mut(&peer.record) {
            RecordMut::new(bytes).apply(params);
        }

        let tail = self.chain(upstream).and_then(|chain| chain.last()).map(|p| p.id());
        let id = self.peers.insert(peer);

        match tail.and_then(|tail| self.peers.get_mut(tail)) {
            Some(last) => last.next = Some(id),
            None => {
                self.upstreams
                    .entry(upstream.to_string())
                    .or_insert_with(|| Registry::new(upstream))
                    .set_head(Some(id));
            }
        }
        id
    }

    /// Detach a located peer from its chain and take it out of the arena.
    pub(crate) fn unlink(&mut self, upstream: &str, located: Located) -> Option<Peer> {
        let next = self.peers.get(located.id)?.next;
        match located.prev {
            Some(prev) => self.peers.get_mut(prev)?.next = next,
            None => self.upstreams.get_mut(upstream)?.set_head(next),
        }
        self.peers.remove(located.id)
    }

    /// Return a detached peer's region-owned storage to the allocator.
    pub(crate) fn release(&mut self, peer: Peer) {
        if let PeerText::Region(block) = peer.name {
            self.release_block(block);
        }
        if let PeerAddr::Region(block) = peer.address {
            self.release_block(block);
        }
        self.release_block(peer.record);
    }

    /// Write access to a linked peer's record.
    pub(crate) fn record_mut(&mut self, id: PeerId) -> Option<RecordMut<'_>> {
        let peer = self.peers.get(id)?;
        self.alloc.bytes_mut(&peer.record).map(RecordMut::new)
    }

    pub(crate) fn recompute(&mut self, upstream: &str) {
        if let Some(registry) = self.upstreams.get_mut(upstream) {
            registry.recompute(&self.peers, &self.alloc);
        }
    }

    fn chain(&self, upstream: &str) -> Option<Peers<'_>> {
        self.upstreams
            .get(upstream)
            .map(|registry| registry.peers(&self.peers, &self.alloc))
    }

    fn release_block(&mut self, block: Block) {
        if !self.alloc.owns(&block) {
            tracing::warn!(offset = block.offset(), "Skipping release of block outside region");
            return;
        }
        if let Err(e) = self.alloc.free(block) {
            tracing::warn!(error = %e, "Failed to release block");
        }
    }
}

/// Cloneable handle to a region guarded by a single lock.
#[derive(Debug, Clone)]
pub struct SharedRegion {
    inner: Arc<Mutex<Region>>,
}

impl SharedRegion {
    pub fn new(region: Region) -> Self {
        Self {
            inner: Arc::new(Mutex::new(region)),
        }
    }

    /// Acquire the region lock.
    pub fn lock(&self) -> MutexGuard<'_, Region> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
