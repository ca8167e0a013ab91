//! Smooth weighted round-robin strategy.

use std::net::SocketAddr;

use crate::region::{Region, SharedRegion};
use crate::registry::PeerId;

/// Peer chosen for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selected {
    pub name: String,
    pub address: SocketAddr,
}

/// Weighted round-robin selector over one region.
/// The rotation state lives in each peer's record, so every selector
/// sharing the region observes the same rotation.
#[derive(Debug, Clone)]
pub struct WeightedRoundRobin {
    region: SharedRegion,
}

impl WeightedRoundRobin {
    pub fn new(region: SharedRegion) -> Self {
        Self { region }
    }

    /// Pick the next peer of `upstream`, or `None` if every peer is down.
    pub fn select(&self, upstream: &str) -> Option<Selected> {
        let mut region = self.region.lock();
        select_in(&mut region, upstream)
    }
}

/// One selection round with the region lock already held.
pub fn select_in(region: &mut Region, upstream: &str) -> Option<Selected> {
    let eligible: Vec<PeerId> = region
        .peers(upstream)
        .filter(|peer| !peer.is_down() && peer.address().is_some())
        .map(|peer| peer.id())
        .collect();

    let mut total = 0i32;
    let mut best: Option<(PeerId, i32)> = None;

    for id in eligible {
        let Some(mut record) = region.record_mut(id) else {
            continue;
        };
        let effective = record.effective_weight();
        let current = record.current_weight().saturating_add(effective);
        record.set_current_weight(current);
        total = total.saturating_add(effective);
        if effective < record.weight() {
            record.set_effective_weight(effective + 1);
        }

        if best.map_or(true, |(_, top)| current > top) {
            best = Some((id, current));
        }
    }

    let (id, current) = best?;
    if let Some(mut record) = region.record_mut(id) {
        record.set_current_weight(current.saturating_sub(total));
    }

    let peer = region.peer(id)?;
    Some(Selected {
        name: peer.name().to_string(),
        address: peer.address()?,
    })
}
