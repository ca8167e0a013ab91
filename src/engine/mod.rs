//! Mutation engine.
//!
//! # Data Flow
//! ```text
//! OpRequest ──TryFrom──▶ Operation
//!     → Engine::apply
//!         lock region
//!           List         → snapshot only
//!           Add          → handlers::add    (resolve, allocate, link, recompute)
//!           Remove       → handlers::remove (unlink, free, recompute)
//!           UpdateParam  → handlers::update (rewrite record in place)
//!           snapshot of the group
//!         unlock
//!     → DurableStore notification (best effort)
//!     → Outcome (listing) or OpError
//! ```
//!
//! # Design Decisions
//! - The whole allocate → link/unlink → free → recompute sequence runs
//!   under one lock acquisition
//! - Store I/O happens after the guard is dropped, in commit order: a
//!   ticket is taken under the guard and notifications wait their turn
//! - Every outcome is counted in `dyn_upstream_operations_total`

pub mod handlers;
pub mod notify;
pub mod resolver;

use std::sync::Arc;
use serde::Serialize;

use crate::observability::metrics;
use crate::operation::{OpError, OpKind, OpRequest, Operation};
use crate::region::{Region, RegionStats, SharedRegion};
use crate::registry::UpstreamSnapshot;
use crate::store::DurableStore;
use self::handlers::Change;
use self::notify::NotifyOrder;
use self::resolver::Resolver;

/// Result of a successful operation: the group as it stands afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub kind: OpKind,
    pub snapshot: UpstreamSnapshot,
    pub verbose: bool,
}

impl Outcome {
    /// Text listing returned to administrative callers.
    pub fn render(&self) -> String {
        self.snapshot.render(self.verbose)
    }
}

/// Applies operations to one shared region.
#[derive(Debug, Clone)]
pub struct Engine {
    region: SharedRegion,
    resolver: Resolver,
    store: Arc<dyn DurableStore>,
    order: Arc<NotifyOrder>,
}

impl Engine {
    pub fn new(region: SharedRegion, resolver: Resolver, store: Arc<dyn DurableStore>) -> Self {
        Self {
            region,
            resolver,
            store,
            order: Arc::new(NotifyOrder::default()),
        }
    }

    pub fn region(&self) -> &SharedRegion {
        &self.region
    }

    /// Validate a raw request and apply it.
    pub fn apply_request(&self, request: &OpRequest) -> Result<Outcome, OpError> {
        let op = Operation::try_from(request).inspect_err(|e| {
            metrics::record_operation("invalid", e.label());
            tracing::debug!(error = %e, "Rejected operation request");
        })?;
        self.apply(&op)
    }

    pub fn apply(&self, op: &Operation) -> Result<Outcome, OpError> {
        let mut region = self.region.lock();
        let result = self.dispatch(&mut region, op);
        let ticket = match &result {
            Ok((_, Some(_))) => Some(self.order.ticket()),
            _ => None,
        };
        drop(region);

        let kind = op.kind().as_str();

        match &result {
            Ok((outcome, change)) => {
                metrics::record_operation(kind, "ok");
                if op.kind().is_mutation() {
                    tracing::info!(
                        kind,
                        upstream = %op.upstream(),
                        server = %op.server(),
                        peers = outcome.snapshot.count,
                        total_weight = outcome.snapshot.total_weight,
                        "Upstream updated"
                    );
                }
                if let (Some(change), Some(ticket)) = (change, ticket) {
                    let _turn = self.order.wait_turn(ticket);
                    self.notify_store(op, *change);
                }
            }
            Err(e) => {
                metrics::record_operation(kind, e.label());
                tracing::warn!(
                    kind,
                    upstream = %op.upstream(),
                    server = %op.server(),
                    error = %e,
                    "Operation rejected"
                );
            }
        }

        result.map(|(outcome, _)| outcome)
    }

    /// Snapshots of every group, ordered by name.
    pub fn snapshots(&self) -> Vec<UpstreamSnapshot> {
        self.region.lock().snapshots()
    }

    pub fn snapshot(&self, upstream: &str) -> Option<UpstreamSnapshot> {
        self.region.lock().snapshot(upstream)
    }

    pub fn stats(&self) -> RegionStats {
        self.region.lock().stats()
    }

    fn dispatch(&self, region: &mut Region, op: &Operation) -> Result<(Outcome, Option<Change>), OpError> {
        let upstream = op.upstream();

        let change = match op.kind() {
            OpKind::List => None,
            OpKind::Add => Some(handlers::add(region, &self.resolver, op)?),
            OpKind::Remove => Some(handlers::remove(region, op)?),
            OpKind::UpdateParam => Some(handlers::update(region, op)?),
        };

        let snapshot = region
            .snapshot(upstream)
            .ok_or_else(|| OpError::UpstreamNotFound(upstream.to_string()))?;

        if change.is_some() {
            metrics::record_peer_count(upstream, snapshot.count);
            metrics::record_region_usage(region.allocator().used_bytes());
        }

        Ok((
            Outcome {
                kind: op.kind(),
                snapshot,
                verbose: op.verbose(),
            },
            change,
        ))
    }

    fn notify_store(&self, op: &Operation, change: Change) {
        let upstream = op.upstream();
        let server = op.server();
        let result = match change {
            Change::Added(params) => self.store.record_add(upstream, server, &params),
            Change::Removed => self.store.record_remove(upstream, server),
            Change::Updated(params) => self.store.record_update(upstream, server, &params),
        };
        if let Err(e) = result {
            tracing::warn!(upstream, server, error = %e, "Failed to persist upstream change");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ServerConfig, UpstreamConfig};
    use crate::operation::ParamSet;
    use crate::registry::PeerParams;
    use crate::store::{NullStore, StoreError, TomlStore};
    use std::sync::mpsc;
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct RecordingStore {
        calls: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingStore {
        fn push(&self, call: String) -> Result<(), StoreError> {
            self.calls.lock().unwrap().push(call);
            if self.fail {
                return Err(StoreError::UnknownServer {
                    upstream: "web".into(),
                    server: "x".into(),
                });
            }
            Ok(())
        }
    }

    impl DurableStore for RecordingStore {
        fn record_add(&self, upstream: &str, server: &str, params: &PeerParams) -> Result<(), StoreError> {
            self.push(format!("add {upstream} {server} {}", params.weight))
        }

        fn record_remove(&self, upstream: &str, server: &str) -> Result<(), StoreError> {
            self.push(format!("remove {upstream} {server}"))
        }

        fn record_update(&self, upstream: &str, server: &str, params: &PeerParams) -> Result<(), StoreError> {
            self.push(format!("update {upstream} {server} {}", params.down))
        }
    }

    fn engine(store: Arc<dyn DurableStore>) -> Engine {
        let mut region = Region::new(16 * 1024, 1024).unwrap();
        region
            .add_static_peer("web", "10.0.0.1:80", "10.0.0.1:80".parse().unwrap(), &PeerParams::default())
            .unwrap();
        Engine::new(SharedRegion::new(region), Resolver::default(), store)
    }

    #[test]
    fn test_store_notified_after_commit() {
        let store = Arc::new(RecordingStore::default());
        let engine = engine(store.clone());

        engine
            .apply(&Operation::add("web", "10.0.0.2:80", ParamSet::default().weight(4)).unwrap())
            .unwrap();
        engine
            .apply(&Operation::update("web", "10.0.0.2:80", ParamSet::default().down()).unwrap())
            .unwrap();
        engine.apply(&Operation::list("web").unwrap()).unwrap();
        engine.apply(&Operation::remove("web", "10.0.0.1:80").unwrap()).unwrap();
        // Rejected operations never reach the store.
        let _ = engine.apply(&Operation::remove("web", "10.0.0.2:80").unwrap());

        assert_eq!(
            *store.calls.lock().unwrap(),
            [
                "add web 10.0.0.2:80 4",
                "update web 10.0.0.2:80 true",
                "remove web 10.0.0.1:80",
            ]
        );
    }

    /// Holds the first `record_add` until released.
    #[derive(Debug)]
    struct GatedStore {
        inner: TomlStore,
        gate: Mutex<Option<(mpsc::Sender<()>, mpsc::Receiver<()>)>>,
    }

    impl DurableStore for GatedStore {
        fn record_add(&self, upstream: &str, server: &str, params: &PeerParams) -> Result<(), StoreError> {
            let gate = self.gate.lock().unwrap().take();
            if let Some((entered, release)) = gate {
                entered.send(()).unwrap();
                release.recv().unwrap();
            }
            self.inner.record_add(upstream, server, params)
        }

        fn record_remove(&self, upstream: &str, server: &str) -> Result<(), StoreError> {
            self.inner.record_remove(upstream, server)
        }

        fn record_update(&self, upstream: &str, server: &str, params: &PeerParams) -> Result<(), StoreError> {
            self.inner.record_update(upstream, server, params)
        }
    }

    #[test]
    fn test_store_sees_commit_order_under_contention() {
        let path = std::env::temp_dir().join(format!(
            "dyn_upstream_engine_order_{}.toml",
            std::process::id()
        ));
        let seed = [UpstreamConfig {
            name: "web".into(),
            servers: vec![ServerConfig::new("10.0.0.1:80", &PeerParams::default())],
        }];
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let store = Arc::new(GatedStore {
            inner: TomlStore::open(&path, &seed).unwrap(),
            gate: Mutex::new(Some((entered_tx, release_rx))),
        });
        let engine = engine(store.clone());

        let adder = {
            let engine = engine.clone();
            thread::spawn(move || {
                engine.apply(&Operation::add("web", "10.0.0.2:80", ParamSet::default()).unwrap())
            })
        };
        entered_rx.recv().unwrap();

        let remover = {
            let engine = engine.clone();
            thread::spawn(move || engine.apply(&Operation::remove("web", "10.0.0.2:80").unwrap()))
        };
        while engine.snapshot("web").unwrap().peer("10.0.0.2:80").is_some() {
            thread::sleep(Duration::from_millis(1));
        }
        release_tx.send(()).unwrap();

        assert!(adder.join().unwrap().is_ok());
        assert!(remover.join().unwrap().is_ok());

        let live: Vec<String> = engine
            .snapshot("web")
            .unwrap()
            .peers
            .into_iter()
            .map(|p| p.name)
            .collect();
        let durable: Vec<String> = store.inner.upstreams()[0]
            .servers
            .iter()
            .map(|s| s.address.clone())
            .collect();
        assert_eq!(live, ["10.0.0.1:80"]);
        assert_eq!(live, durable);

        std::fs::remove_file(&path).unwrap_or_default();
    }

    #[test]
    fn test_store_failure_keeps_mutation() {
        let store = Arc::new(RecordingStore {
            fail: true,
            ..RecordingStore::default()
        });
        let engine = engine(store);

        let outcome = engine
            .apply(&Operation::add("web", "10.0.0.2:80", ParamSet::default()).unwrap())
            .unwrap();
        assert_eq!(outcome.snapshot.count, 2);
        assert_eq!(engine.snapshot("web").unwrap().count, 2);
    }

    #[test]
    fn test_outcome_render() {
        let engine = engine(Arc::new(NullStore));
        let outcome = engine
            .apply_request(&OpRequest::new("web").server("10.0.0.1:80").weight(2))
            .unwrap();
        assert_eq!(outcome.kind, OpKind::UpdateParam);
        assert_eq!(
            outcome.render(),
            "server 10.0.0.1:80 weight=2 max_fails=1 fail_timeout=10;\n"
        );
    }
}
