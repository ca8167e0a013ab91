//! Peer records.
//!
//! # Responsibilities
//! - Fixed little-endian layout of a peer's scalar fields inside a region block
//! - Name and address storage, either copied into the region or static
//! - Read views for the routing reader, write access for the engine
//!
//! # Record Layout
//! ```text
//! 0   weight            i32
//! 4   effective_weight  i32
//! 8   current_weight    i32
//! 12  max_fails         u32
//! 16  fail_timeout      u32
//! 20  down              u8
//! ```
//! A zeroed record reads as weight 0, not down.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use serde::{Deserialize, Serialize};

use crate::region::arena::SlotId;
use crate::region::slab::{Block, SlabAllocator};

/// Handle of a peer inside its region.
pub type PeerId = SlotId;

/// Size of the scalar record allocated per peer.
pub const PEER_RECORD_SIZE: usize = 24;

const WEIGHT: usize = 0;
const EFFECTIVE_WEIGHT: usize = 4;
const CURRENT_WEIGHT: usize = 8;
const MAX_FAILS: usize = 12;
const FAIL_TIMEOUT: usize = 16;
const DOWN: usize = 20;

pub const DEFAULT_WEIGHT: i32 = 1;
pub const DEFAULT_MAX_FAILS: u32 = 1;
pub const DEFAULT_FAIL_TIMEOUT: u32 = 10;

/// Peer name storage.
#[derive(Debug)]
pub enum PeerText {
    /// Owned copy inside the region.
    Region(Block),
    /// Loaded from configuration, lives outside the region.
    Static(Arc<str>),
}

/// Peer address storage.
#[derive(Debug)]
pub enum PeerAddr {
    /// Encoded copy inside the region.
    Region(Block),
    /// Resolved from configuration, lives outside the region.
    Static(SocketAddr),
}

/// One backend server entry, linked into its upstream's chain.
#[derive(Debug)]
pub struct Peer {
    pub(crate) record: Block,
    pub(crate) name: PeerText,
    pub(crate) address: PeerAddr,
    pub(crate) next: Option<PeerId>,
}

/// Tunable parameters of a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerParams {
    pub weight: i32,
    pub max_fails: u32,
    pub fail_timeout: u32,
    pub down: bool,
}

impl Default for PeerParams {
    fn default() -> Self {
        Self {
            weight: DEFAULT_WEIGHT,
            max_fails: DEFAULT_MAX_FAILS,
            fail_timeout: DEFAULT_FAIL_TIMEOUT,
            down: false,
        }
    }
}

/// Read-only view of a linked peer.
#[derive(Debug, Clone, Copy)]
pub struct PeerView<'a> {
    id: PeerId,
    peer: &'a Peer,
    alloc: &'a SlabAllocator,
}

impl<'a> PeerView<'a> {
    pub(crate) fn new(id: PeerId, peer: &'a Peer, alloc: &'a SlabAllocator) -> Self {
        Self { id, peer, alloc }
    }

    pub fn id(&self) -> PeerId {
        self.id
    }

    pub fn next(&self) -> Option<PeerId> {
        self.peer.next
    }

    pub fn name(&self) -> &'a str {
        match &self.peer.name {
            PeerText::Region(block) => self
                .alloc
                .bytes(block)
                .and_then(|bytes| std::str::from_utf8(bytes).ok())
                .unwrap_or_default(),
            PeerText::Static(name) => name.as_ref(),
        }
    }

    pub fn address(&self) -> Option<SocketAddr> {
        match &self.peer.address {
            PeerAddr::Region(block) => self.alloc.bytes(block).and_then(decode_addr),
            PeerAddr::Static(addr) => Some(*addr),
        }
    }

    /// True when the name lives in region memory rather than configuration.
    pub fn is_dynamic(&self) -> bool {
        matches!(self.peer.name, PeerText::Region(_))
    }

    pub fn weight(&self) -> i32 {
        read_i32(self.record(), WEIGHT)
    }

    pub fn effective_weight(&self) -> i32 {
        read_i32(self.record(), EFFECTIVE_WEIGHT)
    }

    pub fn current_weight(&self) -> i32 {
        read_i32(self.record(), CURRENT_WEIGHT)
    }

    pub fn max_fails(&self) -> u32 {
        read_u32(self.record(), MAX_FAILS)
    }

    pub fn fail_timeout(&self) -> u32 {
        read_u32(self.record(), FAIL_TIMEOUT)
    }

    pub fn is_down(&self) -> bool {
        self.record().get(DOWN).is_some_and(|b| *b != 0)
    }

    pub fn params(&self) -> PeerParams {
        PeerParams {
            weight: self.weight(),
            max_fails: self.max_fails(),
            fail_timeout: self.fail_timeout(),
            down: self.is_down(),
        }
    }

    fn record(&self) -> &'a [u8] {
        self.alloc.bytes(&self.peer.record).unwrap_or(&[])
    }
}

/// Write access to a peer's scalar record.
#[derive(Debug)]
pub struct RecordMut<'a> {
    bytes: &'a mut [u8],
}

impl<'a> RecordMut<'a> {
    pub(crate) fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes }
    }

    /// Write every parameter and restart the round robin cursor.
    pub fn apply(&mut self, params: &PeerParams) {
        self.set_weight(params.weight);
        self.set_max_fails(params.max_fails);
        self.set_fail_timeout(params.fail_timeout);
        self.set_down(params.down);
    }

    /// Sets weight and effective weight, resets the current weight.
    pub fn set_weight(&mut self, weight: i32) {
        write_i32(self.bytes, WEIGHT, weight);
        write_i32(self.bytes, EFFECTIVE_WEIGHT, weight);
        write_i32(self.bytes, CURRENT_WEIGHT, 0);
    }

    pub fn set_max_fails(&mut self, max_fails: u32) {
        write_i32(self.bytes, MAX_FAILS, max_fails as i32);
    }

    pub fn set_fail_timeout(&mut self, fail_timeout: u32) {
        write_i32(self.bytes, FAIL_TIMEOUT, fail_timeout as i32);
    }

    pub fn set_down(&mut self, down: bool) {
        if let Some(byte) = self.bytes.get_mut(DOWN) {
            *byte = down as u8;
        }
    }

    pub fn weight(&self) -> i32 {
        read_i32(self.bytes, WEIGHT)
    }

    pub fn effective_weight(&self) -> i32 {
        read_i32(self.bytes, EFFECTIVE_WEIGHT)
    }

    pub fn set_effective_weight(&mut self, weight: i32) {
        write_i32(self.bytes, EFFECTIVE_WEIGHT, weight);
    }

    pub fn current_weight(&self) -> i32 {
        read_i32(self.bytes, CURRENT_WEIGHT)
    }

    pub fn set_current_weight(&mut self, weight: i32) {
        write_i32(self.bytes, CURRENT_WEIGHT, weight);
    }

    pub fn is_down(&self) -> bool {
        self.bytes.get(DOWN).is_some_and(|b| *b != 0)
    }
}

fn read_i32(bytes: &[u8], offset: usize) -> i32 {
    bytes
        .get(offset..offset + 4)
        .and_then(|raw| raw.try_into().ok())
        .map(i32::from_le_bytes)
        .unwrap_or(0)
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    read_i32(bytes, offset) as u32
}

fn write_i32(bytes: &mut [u8], offset: usize, value: i32) {
    if let Some(raw) = bytes.get_mut(offset..offset + 4) {
        raw.copy_from_slice(&value.to_le_bytes());
    }
}

/// Encode a socket address as `family | ip | port(be)`.
pub(crate) fn encode_addr(addr: SocketAddr) -> Vec<u8> {
    let mut out = Vec::with_capacity(19);
    match addr.ip() {
        IpAddr::V4(ip) => {
            out.push(4);
            out.extend_from_slice(&ip.octets());
        }
        IpAddr::V6(ip) => {
            out.push(6);
            out.extend_from_slice(&ip.octets());
        }
    }
    out.extend_from_slice(&addr.port().to_be_bytes());
    out
}

pub(crate) fn decode_addr(bytes: &[u8]) -> Option<SocketAddr> {
    let (family, rest) = bytes.split_first()?;
    let (ip, port) = match family {
        4 if rest.len() == 6 => {
            let octets: [u8; 4] = rest[..4].try_into().ok()?;
            (IpAddr::V4(Ipv4Addr::from(octets)), &rest[4..])
        }
        6 if rest.len() == 18 => {
            let octets: [u8; 16] = rest[..16].try_into().ok()?;
            (IpAddr::V6(Ipv6Addr::from(octets)), &rest[16..])
        }
        _ => return None,
    };
    let port = u16::from_be_bytes(port.try_into().ok()?);
    Some(SocketAddr::new(ip, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addr_encoding() {
        for raw in ["127.0.0.1:8080", "[::1]:443", "10.1.2.3:80"] {
            let addr: SocketAddr = raw.parse().unwrap();
            assert_eq!(decode_addr(&encode_addr(addr)), Some(addr));
        }
        assert_eq!(decode_addr(&[4, 1, 2]), None);
        assert_eq!(decode_addr(&[]), None);
    }

    #[test]
    fn test_zeroed_record_defaults() {
        let mut record = [0u8; PEER_RECORD_SIZE];
        let view = RecordMut::new(&mut record);
        assert_eq!(view.weight(), 0);
        assert_eq!(view.current_weight(), 0);
        assert!(!view.is_down());
    }

    #[test]
    fn test_set_weight_resets_cursor() {
        let mut record = [0u8; PEER_RECORD_SIZE];
        let mut rec = RecordMut::new(&mut record);
        rec.set_current_weight(-7);
        rec.set_effective_weight(2);
        rec.set_weight(5);

        assert_eq!(rec.weight(), 5);
        assert_eq!(rec.effective_weight(), 5);
        assert_eq!(rec.current_weight(), 0);
    }

    #[test]
    fn test_apply_params() {
        let mut record = [0u8; PEER_RECORD_SIZE];
        let mut rec = RecordMut::new(&mut record);
        rec.apply(&PeerParams {
            weight: 3,
            max_fails: 2,
            fail_timeout: 30,
            down: true,
        });

        assert_eq!(read_u32(&record, MAX_FAILS), 2);
        assert_eq!(read_u32(&record, FAIL_TIMEOUT), 30);
        assert_eq!(record[DOWN], 1);
    }
}
