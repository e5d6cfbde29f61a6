//! Shared test helpers for unit tests, integration tests, and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use crate::fixed::{Fixed64, f64_to_fixed64};
use crate::id::{FluidTypeId, PointId};
use crate::location::BlockPos;
use crate::registry::{FluidRegistry, FluidRegistryBuilder, FluidTag, FluidTemperature};

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    f64_to_fixed64(v)
}

// ===========================================================================
// Fluid constructors (match the ids assigned by `test_registry`)
// ===========================================================================

pub fn water() -> FluidTypeId {
    FluidTypeId(0)
}

pub fn lava() -> FluidTypeId {
    FluidTypeId(1)
}

pub fn steam() -> FluidTypeId {
    FluidTypeId(2)
}

/// Registry with water (normal), lava (hot) and steam (hot, gaseous).
pub fn test_registry() -> FluidRegistry {
    let mut b = FluidRegistryBuilder::new();
    for (name, temperature) in [
        ("water", FluidTemperature::Normal),
        ("lava", FluidTemperature::Hot),
        ("steam", FluidTemperature::Hot),
    ] {
        b.register_fluid(name)
            .expect("test fluid names are unique");
        b.add_tag(name, FluidTag::Temperature(temperature))
            .expect("one temperature per test fluid");
    }
    b.add_tag("steam", FluidTag::Gaseous)
        .expect("steam has no gaseous tag yet");
    b.build()
}

// ===========================================================================
// Ids and positions
// ===========================================================================

/// Deterministic point id; smaller `n` sorts first.
pub fn pid(n: u128) -> PointId {
    PointId::from_u128(n)
}

pub fn pos(x: i32, y: i32, z: i32) -> BlockPos {
    BlockPos::new(x, y, z)
}
