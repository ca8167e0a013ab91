//! Owned snapshots of an upstream group, taken under the region lock.

use std::fmt::Write as _;
use std::net::SocketAddr;
use serde::Serialize;

use crate::registry::peer::PeerView;
use crate::registry::upstream::Registry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerSnapshot {
    pub name: String,
    pub address: Option<SocketAddr>,
    pub weight: i32,
    pub effective_weight: i32,
    pub current_weight: i32,
    pub max_fails: u32,
    pub fail_timeout: u32,
    pub down: bool,
    pub dynamic: bool,
}

impl From<PeerView<'_>> for PeerSnapshot {
    fn from(peer: PeerView<'_>) -> Self {
        Self {
            name: peer.name().to_string(),
            address: peer.address(),
            weight: peer.weight(),
            effective_weight: peer.effective_weight(),
            current_weight: peer.current_weight(),
            max_fails: peer.max_fails(),
            fail_timeout: peer.fail_timeout(),
            down: peer.is_down(),
            dynamic: peer.is_dynamic(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpstreamSnapshot {
    pub name: String,
    pub count: usize,
    pub total_weight: i64,
    pub single: bool,
    pub weighted: bool,
    pub peers: Vec<PeerSnapshot>,
}

impl UpstreamSnapshot {
    pub(crate) fn new<'a>(registry: &Registry, peers: impl Iterator<Item = PeerView<'a>>) -> Self {
        Self {
            name: registry.name().to_string(),
            count: registry.count(),
            total_weight: registry.total_weight(),
            single: registry.single(),
            weighted: registry.weighted(),
            peers: peers.map(PeerSnapshot::from).collect(),
        }
    }

    pub fn peer(&self, name: &str) -> Option<&PeerSnapshot> {
        self.peers.iter().find(|p| p.name == name)
    }

    /// Text listing, one `server` line per peer.
    ///
    /// ```text
    /// server 127.0.0.1:8080;
    /// server 127.0.0.1:8081 weight=5 max_fails=1 fail_timeout=10 down;
    /// ```
    /// The second form is produced when `verbose` is set.
    pub fn render(&self, verbose: bool) -> String {
        let mut out = String::new();
        for peer in &self.peers {
            out.push_str("server ");
            out.push_str(&peer.name);
            if verbose {
                let _ = write!(
                    out,
                    " weight={} max_fails={} fail_timeout={}",
                    peer.weight, peer.max_fails, peer.fail_timeout
                );
            }
            if peer.down {
                out.push_str(" down");
            }
            out.push_str(";\n");
        }
        out
    }
}
