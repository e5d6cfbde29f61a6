//! Events and per-tick reports produced by [`FluidManager::tick`](crate::manager::FluidManager::tick).

use pipeworks_core::fixed::{Fixed64, Ticks};
use pipeworks_core::id::{FluidTypeId, PointId};

// ---------------------------------------------------------------------------
// Fluid events
// ---------------------------------------------------------------------------

/// Notable things that happened during a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FluidEvent {
    /// Producer emission that no consumer in the component could take.
    /// `anchor` is the lowest point id of the component.
    FlowLost {
        anchor: PointId,
        fluid: FluidTypeId,
        amount: Fixed64,
        tick: Ticks,
    },
    /// A consumer's buffer reached capacity this tick.
    BufferFull {
        point: PointId,
        fluid: FluidTypeId,
        tick: Ticks,
    },
    /// A stored-fluid supplier was drained this tick.
    BufferEmpty {
        point: PointId,
        fluid: FluidTypeId,
        tick: Ticks,
    },
    /// A producer's `on_fluid_removed` hook returned an error or panicked.
    HookFailed {
        point: PointId,
        fluid: FluidTypeId,
        reason: String,
        tick: Ticks,
    },
    /// A queued structural change could not be applied.
    QueuedChangeRejected { point: PointId, tick: Ticks },
}

impl FluidEvent {
    pub fn tick(&self) -> Ticks {
        match self {
            FluidEvent::FlowLost { tick, .. }
            | FluidEvent::BufferFull { tick, .. }
            | FluidEvent::BufferEmpty { tick, .. }
            | FluidEvent::HookFailed { tick, .. }
            | FluidEvent::QueuedChangeRejected { tick, .. } => *tick,
        }
    }
}

// ---------------------------------------------------------------------------
// Tick report
// ---------------------------------------------------------------------------

/// Summary of one tick.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TickReport {
    pub tick: Ticks,
    pub events: Vec<FluidEvent>,
    /// Total offered by producers and stored-fluid suppliers.
    pub supplied: Fixed64,
    /// Total inserted into consumer buffers.
    pub delivered: Fixed64,
    /// Producer emission discarded for lack of demand.
    pub lost: Fixed64,
    /// Number of connected components simulated.
    pub components: usize,
    /// Queued additions applied at the start of the tick.
    pub points_added: usize,
    /// Queued removals applied at the start of the tick.
    pub points_removed: usize,
}

impl TickReport {
    pub fn lost_events(&self) -> impl Iterator<Item = &FluidEvent> {
        self.events
            .iter()
            .filter(|e| matches!(e, FluidEvent::FlowLost { .. }))
    }

    pub fn hook_failures(&self) -> impl Iterator<Item = &FluidEvent> {
        self.events
            .iter()
            .filter(|e| matches!(e, FluidEvent::HookFailed { .. }))
    }
}
