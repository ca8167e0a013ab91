//! Mutation handlers. Each runs with the region lock held and either
//! commits completely or returns an error with nothing changed.

use crate::engine::resolver::Resolver;
use crate::operation::descriptor::{Availability, Operation};
use crate::operation::error::OpError;
use crate::region::Region;
use crate::registry::peer::PeerParams;

/// Committed change, forwarded to the durable store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Added(PeerParams),
    Removed,
    Updated(PeerParams),
}

pub fn add(region: &mut Region, resolver: &Resolver, op: &Operation) -> Result<Change, OpError> {
    let upstream = op.upstream();
    let server = op.server();
    require_upstream(region, upstream)?;

    if region.locate(upstream, server).is_some() {
        return Err(OpError::Conflict {
            upstream: upstream.to_string(),
            server: server.to_string(),
        });
    }

    let address = resolver.resolve(server)?;
    let peer = region.allocate_peer(server, address)?;
    let params = op.params().apply_to(PeerParams::default());

    let id = region.link_tail(upstream, peer, &params);
    region.recompute(upstream);

    tracing::debug!(upstream, server, slot = id.index(), "Peer linked");
    Ok(Change::Added(params))
}

pub fn remove(region: &mut Region, op: &Operation) -> Result<Change, OpError> {
    let upstream = op.upstream();
    let server = op.server();
    let count = require_upstream(region, upstream)?;

    if count < 2 {
        return Err(OpError::LastPeer {
            upstream: upstream.to_string(),
        });
    }

    let located = region
        .locate(upstream, server)
        .ok_or_else(|| not_found(op))?;
    let peer = region
        .unlink(upstream, located)
        .ok_or_else(|| not_found(op))?;
    region.release(peer);
    region.recompute(upstream);

    Ok(Change::Removed)
}

pub fn update(region: &mut Region, op: &Operation) -> Result<Change, OpError> {
    let upstream = op.upstream();
    require_upstream(region, upstream)?;

    let located = region
        .locate(upstream, op.server())
        .ok_or_else(|| not_found(op))?;
    let params = op.params();
    let mut record = region.record_mut(located.id).ok_or_else(|| not_found(op))?;

    if let Some(weight) = params.weight {
        record.set_weight(weight);
    }
    if let Some(max_fails) = params.max_fails {
        record.set_max_fails(max_fails);
    }
    if let Some(fail_timeout) = params.fail_timeout {
        record.set_fail_timeout(fail_timeout);
    }
    match params.availability {
        Some(Availability::Up) => record.set_down(false),
        Some(Availability::Down) => record.set_down(true),
        None => {}
    }

    let resulting = region
        .peer(located.id)
        .map(|view| view.params())
        .ok_or_else(|| not_found(op))?;
    Ok(Change::Updated(resulting))
}

/// Peer count of `upstream`, or `UpstreamNotFound`.
fn require_upstream(region: &Region, upstream: &str) -> Result<usize, OpError> {
    region
        .upstream(upstream)
        .map(|registry| registry.count())
        .ok_or_else(|| OpError::UpstreamNotFound(upstream.to_string()))
}

fn not_found(op: &Operation) -> OpError {
    OpError::NotFound {
        upstream: op.upstream().to_string(),
        server: op.server().to_string(),
    }
}
