#![no_main]

use arbitrary::Arbitrary;
use keymirror_core::{Hub, StorageEvent};
use libfuzzer_sys::fuzz_target;

/// One engine operation against a small, fixed key space.
#[derive(Debug, Arbitrary)]
enum Op {
    Snapshot { key: u8 },
    Set { key: u8, value: i64 },
    Update { key: u8, delta: i64 },
    Remove { key: u8 },
    Deliver { key: u8 },
    ForeignDeliver { key: u8 },
}

const KEYS: [&str; 3] = ["alpha", "beta", "gamma"];

fuzz_target!(|ops: Vec<Op>| {
    let hub = Hub::new();
    let bindings: Vec<_> = KEYS
        .iter()
        .map(|key| hub.bind(*key, 0_i64).seed_default(true).finish())
        .collect();
    let own_origin = hub.fallback().origin();
    let foreign_origin = keymirror_core::OriginToken::next();

    for op in ops {
        match op {
            Op::Snapshot { key } => {
                let _ = bindings[key as usize % KEYS.len()].snapshot();
            }
            Op::Set { key, value } => {
                bindings[key as usize % KEYS.len()].set(value);
            }
            Op::Update { key, delta } => {
                bindings[key as usize % KEYS.len()].update(|v| v.wrapping_add(delta));
            }
            Op::Remove { key } => {
                bindings[key as usize % KEYS.len()].remove();
            }
            Op::Deliver { key } => {
                hub.deliver(&StorageEvent::new(KEYS[key as usize % KEYS.len()], own_origin));
            }
            Op::ForeignDeliver { key } => {
                hub.deliver(&StorageEvent::new(
                    KEYS[key as usize % KEYS.len()],
                    foreign_origin,
                ));
            }
        }
    }

    // Every binding must still produce a coherent snapshot.
    for binding in &bindings {
        let _ = binding.snapshot();
    }
});
