//! Point builders shared by unit tests, integration tests, and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use pipeworks_core::id::{FluidTypeId, PointId};
use pipeworks_core::location::BlockPos;
use pipeworks_core::test_utils::fixed;

use crate::buffer::AllowedFluids;
use crate::point::{ConnectionPoint, PointKind};
use crate::producer::ConstantProducer;

/// Output point emitting `rate` of `fluid` per reference interval.
pub fn producer_point(n: u128, at: BlockPos, fluid: FluidTypeId, rate: f64) -> ConnectionPoint {
    let mut p = ConnectionPoint::restore(PointId::from_u128(n), PointKind::Output, at);
    p.set_producer(Box::new(ConstantProducer::new(fluid, fixed(rate))))
        .expect("outputs accept producers");
    p
}

/// Input point with an empty single-fluid buffer open to the network.
pub fn consumer_point(n: u128, at: BlockPos, fluid: FluidTypeId, capacity: f64) -> ConnectionPoint {
    let mut p = ConnectionPoint::restore(PointId::from_u128(n), PointKind::Input, at);
    p.create_fluid_buffer(fluid, fixed(capacity), true, false)
        .expect("fresh point has no buffer");
    p
}

/// Input point with an empty tank open to the network.
pub fn tank_point(n: u128, at: BlockPos, allowed: AllowedFluids, capacity: f64) -> ConnectionPoint {
    let mut p = ConnectionPoint::restore(PointId::from_u128(n), PointKind::Input, at);
    p.create_fluid_tank(allowed, fixed(capacity), true, false)
        .expect("fresh point has no buffer");
    p
}

/// Output point offering `amount` of stored `fluid` to the network.
pub fn stored_supplier_point(
    n: u128,
    at: BlockPos,
    fluid: FluidTypeId,
    capacity: f64,
    amount: f64,
) -> ConnectionPoint {
    let mut p = ConnectionPoint::restore(PointId::from_u128(n), PointKind::Output, at);
    p.create_fluid_tank(AllowedFluids::Any, fixed(capacity), false, true)
        .expect("fresh point has no buffer");
    if let Some(buffer) = p.buffer_mut() {
        buffer.insert(fluid, fixed(amount));
    }
    p
}

pub fn pipe_point(n: u128, at: BlockPos) -> ConnectionPoint {
    ConnectionPoint::restore(PointId::from_u128(n), PointKind::Intersection, at)
}
