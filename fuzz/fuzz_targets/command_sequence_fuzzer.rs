//! Fuzz target for the connection simulator
//!
//! Drive arbitrary command and time sequences through the simulator and the
//! reference model at once.
//!
//! # Strategy
//!
//! - Seed: picks the RNG stream, so record content varies between runs
//! - Operations: every command plus clock advances and polling switches
//! - Timing: advances land before, on and after the recovery deadlines
//!
//! # Invariants
//!
//! - Command results and observable state match the model after every step
//! - Buffers never exceed capacity and keep their ordering
//! - Streams tick only while connected; recovery timers only while down
//! - Each recorded transition differs from the one before it

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use wiresim_harness::{InvariantRegistry, ModelSession, Operation, SimWorld};

#[derive(Debug, Arbitrary)]
struct Session {
    seed: u64,
    ops: Vec<Operation>,
}

fuzz_target!(|session: Session| {
    let registry = InvariantRegistry::standard();
    let mut model = ModelSession::default();
    let Ok(mut world) = SimWorld::new(session.seed) else {
        panic!("default configuration rejected");
    };

    for (step, op) in session.ops.iter().take(256).enumerate() {
        let expected = model.apply(op);
        let actual = world.apply(op);

        assert_eq!(actual, expected, "step {step}: {op:?}");
        assert_eq!(world.observable(), model.observable(), "step {step}: {op:?}");
        registry.assert_all(&world.snapshot(), &format!("step {step}: {op:?}"));
    }

    let timeline = world.timeline();
    for pair in timeline.windows(2) {
        assert_ne!(pair[0].1, pair[1].1, "duplicate transition recorded: {timeline:?}");
        assert!(pair[0].0 <= pair[1].0, "timeline went backwards: {timeline:?}");
    }
});
