//! Double-buffered per-tick flow amounts.
//!
//! Each tick builds a fresh [`FlowSnapshot`] and swaps it in whole, so a
//! [`FlowReader`] on another thread sees either the previous tick or the new
//! one, never a mix.

use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use pipeworks_core::fixed::{Fixed64, Ticks};
use pipeworks_core::id::{FluidTypeId, PointId};

/// Amounts moved during one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowSnapshot {
    pub tick: Ticks,
    /// Delivered to consumers, drawn from suppliers, or passed through
    /// intersections.
    pub flows: BTreeMap<(PointId, FluidTypeId), Fixed64>,
    /// Lost emission per component anchor and fluid.
    pub lost: BTreeMap<(PointId, FluidTypeId), Fixed64>,
}

impl FlowSnapshot {
    pub fn flow_amount(&self, point: PointId, fluid: FluidTypeId) -> Fixed64 {
        self.flows
            .get(&(point, fluid))
            .copied()
            .unwrap_or(Fixed64::ZERO)
    }

    pub(crate) fn record(&mut self, point: PointId, fluid: FluidTypeId, amount: Fixed64) {
        if amount > Fixed64::ZERO {
            let total = self.flows.entry((point, fluid)).or_insert(Fixed64::ZERO);
            *total = total.saturating_add(amount);
        }
    }

    pub fn total_lost(&self) -> Fixed64 {
        self.lost
            .values()
            .fold(Fixed64::ZERO, |total, lost| total.saturating_add(*lost))
    }
}

/// Cloneable, thread-safe read handle onto the latest published snapshot.
#[derive(Debug, Clone)]
pub struct FlowReader {
    current: Arc<ArcSwap<FlowSnapshot>>,
}

impl FlowReader {
    pub(crate) fn new() -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(FlowSnapshot::default())),
        }
    }

    pub(crate) fn publish(&self, snapshot: FlowSnapshot) {
        self.current.store(Arc::new(snapshot));
    }

    /// Most recent amount for `point`; zero if it moved nothing last tick.
    pub fn flow_amount(&self, point: PointId, fluid: FluidTypeId) -> Fixed64 {
        self.current.load().flow_amount(point, fluid)
    }

    /// The whole latest snapshot.
    pub fn snapshot(&self) -> Arc<FlowSnapshot> {
        self.current.load_full()
    }

    /// Tick the latest snapshot was computed for.
    pub fn tick(&self) -> Ticks {
        self.current.load().tick
    }
}
