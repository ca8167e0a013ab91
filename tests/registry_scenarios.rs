//! End-to-end registry behavior through the engine.

use dyn_upstream::operation::{OpError, OpKind, OpRequest, Operation, ParamSet};

mod common;

const A: &str = "127.0.0.1:6001";
const B: &str = "127.0.0.1:6002";

#[test]
fn test_add_update_remove_scenario() {
    let engine = common::engine_with("backends", &[(A, 1)]);

    let outcome = engine
        .apply(&Operation::add("backends", B, ParamSet::default().weight(5)).unwrap())
        .unwrap();
    let snapshot = outcome.snapshot;
    assert_eq!(snapshot.count, 2);
    assert_eq!(snapshot.total_weight, 6);
    assert!(snapshot.weighted);
    assert!(!snapshot.single);
    assert_eq!(common::peer_names(&engine, "backends"), [A, B]);

    let outcome = engine
        .apply(&Operation::update("backends", B, ParamSet::default().down()).unwrap())
        .unwrap();
    assert!(outcome.snapshot.peer(B).unwrap().down);
    assert_eq!(outcome.snapshot.count, 2);
    assert_eq!(outcome.snapshot.total_weight, 6);

    let outcome = engine.apply(&Operation::remove("backends", A).unwrap()).unwrap();
    assert_eq!(outcome.snapshot.count, 1);
    assert_eq!(outcome.snapshot.total_weight, 5);
    assert!(outcome.snapshot.single);

    let err = engine.apply(&Operation::remove("backends", B).unwrap()).unwrap_err();
    assert_eq!(
        err,
        OpError::LastPeer {
            upstream: "backends".into()
        }
    );
    assert_eq!(common::peer_names(&engine, "backends"), [B]);
}

#[test]
fn test_list_never_mutates() {
    let engine = common::engine_with("backends", &[(A, 1), (B, 3)]);
    let before = engine.stats();

    let first = engine.apply(&Operation::list("backends").unwrap()).unwrap();
    let second = engine.apply(&Operation::list("backends").unwrap()).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.kind, OpKind::List);
    assert_eq!(engine.stats(), before);
    assert_eq!(first.render(), format!("server {A};\nserver {B};\n"));
}

#[test]
fn test_duplicate_add_conflicts() {
    let engine = common::engine_with("backends", &[(A, 1)]);
    engine
        .apply(&Operation::add("backends", B, ParamSet::default()).unwrap())
        .unwrap();
    let before = engine.snapshot("backends").unwrap();
    let usage = engine.stats();

    for server in [A, B, " 127.0.0.1:6001 "] {
        let err = engine
            .apply(&Operation::add("backends", server, ParamSet::default().weight(9)).unwrap())
            .unwrap_err();
        assert!(matches!(err, OpError::Conflict { .. }));
    }
    assert_eq!(engine.snapshot("backends").unwrap(), before);
    assert_eq!(engine.stats(), usage);
}

#[test]
fn test_add_then_remove_restores_region() {
    let engine = common::engine_with("backends", &[(A, 2)]);
    let before = engine.snapshot("backends").unwrap();
    let usage = engine.stats();

    engine
        .apply(&Operation::add("backends", B, ParamSet::default().weight(7)).unwrap())
        .unwrap();
    assert!(engine.stats().used_bytes > usage.used_bytes);

    engine.apply(&Operation::remove("backends", B).unwrap()).unwrap();
    let after = engine.snapshot("backends").unwrap();
    assert_eq!(after.count, before.count);
    assert_eq!(after.total_weight, before.total_weight);
    assert_eq!(engine.stats(), usage);
}

#[test]
fn test_conflicting_flags_rejected_before_dispatch() {
    let engine = common::engine_with("backends", &[(A, 1)]);
    let before = engine.snapshot("backends").unwrap();

    let add_remove = OpRequest::new("backends").server(B).flag_add().flag_remove();
    assert!(matches!(
        engine.apply_request(&add_remove),
        Err(OpError::InvalidDescriptor(_))
    ));

    let up_down = OpRequest::new("backends").server(A).flag_up().flag_down();
    assert!(matches!(
        engine.apply_request(&up_down),
        Err(OpError::InvalidDescriptor(_))
    ));

    assert_eq!(engine.snapshot("backends").unwrap(), before);
}

#[test]
fn test_exhaustion_leaves_region_unchanged() {
    // Two 64 byte pages. Both records share the first page's 32 byte
    // slots, the new name claims the second page and the address has
    // nowhere to go.
    let engine = common::small_engine(128, 64, &[(A, 1)]);
    let before = engine.snapshot("backends").unwrap();
    let usage = engine.stats();

    let err = engine
        .apply(&Operation::add("backends", B, ParamSet::default()).unwrap())
        .unwrap_err();
    assert!(matches!(err, OpError::ResourceExhausted(_)));
    assert_eq!(engine.snapshot("backends").unwrap(), before);
    assert_eq!(engine.stats(), usage);
}

#[test]
fn test_unknown_upstream_and_server() {
    let engine = common::engine_with("backends", &[(A, 1), (B, 1)]);

    assert_eq!(
        engine.apply(&Operation::list("api").unwrap()).unwrap_err(),
        OpError::UpstreamNotFound("api".into())
    );
    assert!(matches!(
        engine.apply(&Operation::remove("backends", "127.0.0.1:6003").unwrap()),
        Err(OpError::NotFound { .. })
    ));
    assert!(matches!(
        engine.apply(&Operation::update("backends", "127.0.0.1:6003", ParamSet::default().up()).unwrap()),
        Err(OpError::NotFound { .. })
    ));
}

#[test]
fn test_request_verbose_listing() {
    let engine = common::engine_with("backends", &[(A, 1)]);
    let outcome = engine
        .apply_request(
            &OpRequest::new("backends")
                .server(B)
                .flag_add()
                .weight(3)
                .max_fails(2)
                .fail_timeout(30),
        )
        .unwrap();

    assert_eq!(outcome.kind, OpKind::Add);
    assert_eq!(
        outcome.render(),
        format!(
            "server {A} weight=1 max_fails=1 fail_timeout=10;\n\
             server {B} weight=3 max_fails=2 fail_timeout=30;\n"
        )
    );
}
