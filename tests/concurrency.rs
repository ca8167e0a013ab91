//! Selection racing against structural changes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use dyn_upstream::load_balancer::round_robin::select_in;
use dyn_upstream::operation::{Operation, ParamSet};

mod common;

const SERVERS: [&str; 4] = [
    "127.0.0.1:7001",
    "127.0.0.1:7002",
    "127.0.0.1:7003",
    "127.0.0.1:7004",
];

#[test]
fn test_select_sees_consistent_chain_while_mutating() {
    let engine = common::engine_with("pool", &[("127.0.0.1:7000", 2)]);
    let done = Arc::new(AtomicBool::new(false));

    let writer = {
        let engine = engine.clone();
        let done = done.clone();
        thread::spawn(move || {
            for round in 0..200 {
                for (i, &server) in SERVERS.iter().enumerate() {
                    let weight = ((round + i) % 5 + 1) as i32;
                    engine
                        .apply(&Operation::add("pool", server, ParamSet::default().weight(weight)).unwrap())
                        .unwrap();
                }
                for &server in SERVERS.iter().rev() {
                    engine.apply(&Operation::remove("pool", server).unwrap()).unwrap();
                }
            }
            done.store(true, Ordering::Release);
        })
    };

    let reader = {
        let engine = engine.clone();
        thread::spawn(move || {
            let mut picks = 0usize;
            while !done.load(Ordering::Acquire) || picks == 0 {
                let mut region = engine.region().lock();
                let selected = select_in(&mut region, "pool").expect("pool always has a live peer");
                assert!(region.locate("pool", &selected.name).is_some(), "{} is not linked", selected.name);

                let upstream = region.upstream("pool").unwrap();
                let (count, total_weight) = (upstream.count(), upstream.total_weight());
                let walked = region.peers("pool").count();
                let walked_weight: i64 = region.peers("pool").map(|p| i64::from(p.weight())).sum();
                assert_eq!(count, walked);
                assert_eq!(total_weight, walked_weight);
                picks += 1;
            }
            picks
        })
    };

    writer.join().unwrap();
    assert!(reader.join().unwrap() > 0);
    assert_eq!(common::peer_names(&engine, "pool"), ["127.0.0.1:7000"]);
}
