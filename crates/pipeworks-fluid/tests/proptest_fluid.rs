//! Property-based tests for the fluid crate.
//!
//! Random buffer operation sequences, random networks, and random points are
//! checked against the invariants the simulation promises.

use pipeworks_core::fixed::Fixed64;
use pipeworks_core::id::FluidTypeId;
use pipeworks_core::test_utils::{fixed, lava, pos, water};
use pipeworks_fluid::test_utils::*;
use pipeworks_fluid::{
    AllowedFluids, FluidBuffer, FluidManager, FluidSettings, decode_point, effective_rate,
    encode_point,
};
use proptest::prelude::*;

// ===========================================================================
// Generators
// ===========================================================================

#[derive(Debug, Clone)]
enum BufferOp {
    Insert(u32, i32),
    Withdraw(u32, i32),
    SetCapacity(i32),
    Clear,
}

fn arb_buffer_ops(max_ops: usize) -> impl Strategy<Value = Vec<BufferOp>> {
    proptest::collection::vec(
        prop_oneof![
            (0..3u32, -50..200i32).prop_map(|(f, a)| BufferOp::Insert(f, a)),
            (0..3u32, -50..200i32).prop_map(|(f, a)| BufferOp::Withdraw(f, a)),
            (-10..300i32).prop_map(BufferOp::SetCapacity),
            Just(BufferOp::Clear),
        ],
        1..=max_ops,
    )
}

/// A row of points along x: producers, pipes and consumers in random order.
fn arb_row(max_len: usize) -> impl Strategy<Value = Vec<(u8, u16)>> {
    proptest::collection::vec((0..3u8, 1..200u16), 1..=max_len)
}

fn build_row(row: &[(u8, u16)]) -> FluidManager {
    let mut manager = FluidManager::new(FluidSettings::unscaled());
    for (i, &(kind, amount)) in row.iter().enumerate() {
        let n = i as u128 + 1;
        let at = pos(i as i32, 0, 0);
        let point = match kind {
            0 => producer_point(n, at, water(), f64::from(amount)),
            1 => pipe_point(n, at),
            _ => consumer_point(n, at, water(), f64::from(amount)),
        };
        manager.add(point).unwrap();
    }
    manager
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Stored amount stays within [0, capacity] under any operation sequence.
    #[test]
    fn buffer_amount_stays_in_bounds(ops in arb_buffer_ops(40), tank in any::<bool>()) {
        let mut buffer = if tank {
            FluidBuffer::tank(AllowedFluids::any_of([water(), lava()]), fixed(100.0), true, true)
        } else {
            FluidBuffer::single(water(), fixed(100.0), true, true)
        };
        for op in ops {
            match op {
                BufferOp::Insert(f, a) => {
                    let accepted = buffer.insert(FluidTypeId(f), fixed(f64::from(a)));
                    prop_assert!(accepted >= Fixed64::ZERO);
                }
                BufferOp::Withdraw(f, a) => {
                    let removed = buffer.withdraw(FluidTypeId(f), fixed(f64::from(a)));
                    prop_assert!(removed >= Fixed64::ZERO);
                }
                BufferOp::SetCapacity(c) => buffer.set_capacity(fixed(f64::from(c))),
                BufferOp::Clear => buffer.clear(),
            }
            prop_assert!(buffer.amount() >= Fixed64::ZERO);
            prop_assert!(buffer.amount() <= buffer.capacity());
            // Nothing but the held fluid ever reads non-zero.
            for f in 0..3u32 {
                let fluid = FluidTypeId(f);
                if buffer.fluid() != Some(fluid) {
                    prop_assert_eq!(buffer.fluid_amount(fluid), Fixed64::ZERO);
                }
            }
        }
    }

    /// Effective rate is never negative and scales linearly with the interval.
    #[test]
    fn effective_rate_is_linear(rate in -1000i32..10_000, interval in 1u32..200) {
        let settings = FluidSettings::default().with_tick_interval(interval);
        let once = effective_rate(fixed(f64::from(rate)), &settings);
        prop_assert!(once >= Fixed64::ZERO);

        let doubled = FluidSettings::default().with_tick_interval(interval * 2);
        let twice = effective_rate(fixed(f64::from(rate)), &doubled);
        let diff = (twice - once * 2).abs();
        prop_assert!(diff <= Fixed64::from_bits(4), "{twice} vs 2 * {once}");
    }

    /// Delivered plus lost never exceeds what was supplied, and every
    /// consumer stays within its capacity across ticks.
    #[test]
    fn ticks_conserve_fluid(row in arb_row(12), ticks in 1u64..5) {
        let mut manager = build_row(&row);
        let mut delivered_total = Fixed64::ZERO;
        for t in 1..=ticks {
            let report = manager.tick(t).unwrap();
            prop_assert!(report.delivered + report.lost <= report.supplied);
            delivered_total += report.delivered;
        }
        let mut stored = Fixed64::ZERO;
        for id in manager.point_ids().collect::<Vec<_>>() {
            if let Some(buffer) = manager.get(id).and_then(|p| p.buffer()) {
                prop_assert!(buffer.amount() <= buffer.capacity());
                stored += buffer.amount();
            }
        }
        prop_assert_eq!(stored, delivered_total);
    }

    /// Persisted points decode to the same simulation state.
    #[test]
    fn point_round_trip(n in 1u128..u128::MAX, x in -1000i32..1000, amount in 0u16..500, cap in 0u16..500) {
        let mut point = consumer_point(n, pos(x, 64, -x), water(), f64::from(cap));
        if let Some(buffer) = point.buffer_mut() {
            buffer.insert(water(), fixed(f64::from(amount)));
        }
        let back = decode_point(&encode_point(&point).unwrap()).unwrap();
        prop_assert_eq!(back.id(), point.id());
        prop_assert_eq!(back.kind(), point.kind());
        prop_assert_eq!(back.location(), point.location());
        prop_assert_eq!(back.buffer(), point.buffer());
    }
}
