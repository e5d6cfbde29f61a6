//! Property-based tests for the core building blocks.
//!
//! Uses proptest to generate positions, registries and amounts, then
//! verifies the structural invariants the fluid crate relies on.

use pipeworks_core::fixed::{AMOUNT_EPSILON, Fixed64, snap_to_zero};
use pipeworks_core::id::FluidTypeId;
use pipeworks_core::location::{BlockPos, Face};
use pipeworks_core::registry::FluidRegistryBuilder;
use proptest::prelude::*;

// ===========================================================================
// Generators
// ===========================================================================

fn arb_pos() -> impl Strategy<Value = BlockPos> {
    (-10_000i32..10_000, -64i32..320, -10_000i32..10_000).prop_map(|(x, y, z)| BlockPos::new(x, y, z))
}

/// Distinct fluid names, in insertion order.
fn arb_names(max: usize) -> impl Strategy<Value = Vec<String>> {
    proptest::collection::btree_set("[a-z]{1,8}", 1..=max).prop_map(|set| set.into_iter().collect())
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #[test]
    fn neighbors_are_one_step_away(pos in arb_pos()) {
        for n in pos.neighbors() {
            prop_assert_eq!(pos.manhattan_distance(&n), 1);
        }
    }

    #[test]
    fn opposite_face_walks_back(pos in arb_pos()) {
        for face in Face::all() {
            prop_assert_eq!(pos.relative(face).relative(face.opposite()), pos);
        }
    }

    #[test]
    fn registry_ids_are_dense(names in arb_names(16)) {
        let mut builder = FluidRegistryBuilder::new();
        for name in &names {
            builder.register_fluid(name).unwrap();
        }
        let registry = builder.build();
        prop_assert_eq!(registry.len(), names.len());
        for (i, name) in names.iter().enumerate() {
            let id = FluidTypeId(i as u32);
            prop_assert_eq!(registry.fluid_id(name), Some(id));
            prop_assert_eq!(registry.name(id), Some(name.as_str()));
        }
    }

    #[test]
    fn snapping_is_idempotent(bits in -(1i64 << 62)..(1i64 << 62)) {
        let v = Fixed64::from_bits(bits);
        let once = snap_to_zero(v);
        prop_assert_eq!(snap_to_zero(once), once);
        prop_assert!(once == Fixed64::ZERO || once.abs() >= AMOUNT_EPSILON);
    }
}
