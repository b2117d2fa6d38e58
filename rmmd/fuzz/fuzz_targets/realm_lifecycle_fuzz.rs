#![no_main]

use islet_rmmd::config::MAX_REALM_NUMS;
use islet_rmmd::lifecycle::State;
use islet_rmmd::rmi::{REALM_ACTIVATE, REALM_CREATE, REALM_DESTROY, REQ_COMPLETE};
use islet_rmmd::smc::World;
use islet_rmmd::test_utils::*;

use libfuzzer_sys::{arbitrary, fuzz_target};

#[derive(Debug, arbitrary::Arbitrary)]
enum Event {
    Create { realm: u8 },
    Activate { realm: u8 },
    Destroy { realm: u8 },
    Complete { x1: u8 },
    Fire { elapsed: u8, from_ns: bool },
}

fn rd(realm: u8) -> u64 {
    0x8800_0000 + (realm as u64 % 16) * 0x1000
}

fuzz_target!(|events: Vec<Event>| {
    let rmmd = booted();
    let mut now = 0u64;

    for event in events.iter().take(128) {
        match *event {
            Event::Create { realm } => {
                ns_call(&rmmd, [REALM_CREATE as u64, rd(realm), 0, 0, 0, 0, 0, 0]);
            }
            Event::Activate { realm } => {
                ns_call(&rmmd, [REALM_ACTIVATE as u64, rd(realm), 0, 0, 0, 0, 0, 0]);
            }
            Event::Destroy { realm } => {
                ns_call(&rmmd, [REALM_DESTROY as u64, rd(realm), 0, 0, 0, 0, 0, 0]);
            }
            Event::Complete { x1 } => {
                realm_call(&rmmd, [REQ_COMPLETE as u64, x1 as u64, 0, 0, 0, 0, 0, 0]);
            }
            Event::Fire { elapsed, from_ns } => {
                now += elapsed as u64;
                let world = if from_ns { World::NonSecure } else { World::Realm };
                fire_timer(&rmmd, now, world);
            }
        }

        let tracker = rmmd.tracker();
        let registry = tracker.registry();
        assert!(registry.len() <= MAX_REALM_NUMS);
        assert!(tracker.queue().len() <= registry.len());
        for record in registry.iter() {
            if tracker.queue().contains(record.rd) {
                assert_ne!(record.state, State::Idle);
            }
        }
    }
});
