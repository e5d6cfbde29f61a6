//! Simulation settings for the fluid manager.

use pipeworks_core::fixed::{AMOUNT_EPSILON, Fixed64};

/// Game ticks per second; rates are expressed per this many ticks.
pub const DEFAULT_REFERENCE_INTERVAL: u32 = 20;

/// Game ticks between two fluid ticks.
pub const DEFAULT_TICK_INTERVAL: u32 = 10;

/// Order in which competing consumers are served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    /// Lowest point id first.
    #[default]
    AscendingId,
    /// Highest point id first.
    DescendingId,
    /// Ascending id, with the starting consumer rotating every tick.
    RoundRobin,
    /// Equal shares. Suppliers and consumers whose amount is below the even
    /// share are served in full, the rest split what remains equally.
    EvenSplit,
}

/// Knobs shared by every network the manager simulates.
#[derive(Debug, Clone, PartialEq)]
pub struct FluidSettings {
    /// Game ticks between fluid ticks. Scales every producer rate.
    pub tick_interval: u32,
    /// Game ticks per rate unit. Must be non-zero.
    pub reference_interval: u32,
    /// Maximum flow per edge, per reference interval. `None` is unlimited.
    pub max_edge_rate: Option<Fixed64>,
    /// Maximum flow of one fluid through a component, per reference
    /// interval. `None` is unlimited.
    pub max_component_rate: Option<Fixed64>,
    pub tie_break: TieBreak,
    /// Emissions and demands below this are ignored.
    pub supply_epsilon: Fixed64,
}

impl Default for FluidSettings {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            reference_interval: DEFAULT_REFERENCE_INTERVAL,
            max_edge_rate: None,
            max_component_rate: None,
            tie_break: TieBreak::AscendingId,
            supply_epsilon: AMOUNT_EPSILON,
        }
    }
}

impl FluidSettings {
    /// Settings where one fluid tick equals one rate unit, so producer rates
    /// are emitted unscaled.
    pub fn unscaled() -> Self {
        Self {
            tick_interval: 1,
            reference_interval: 1,
            ..Self::default()
        }
    }

    pub fn with_tick_interval(mut self, tick_interval: u32) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn with_max_edge_rate(mut self, rate: Fixed64) -> Self {
        self.max_edge_rate = Some(rate);
        self
    }

    pub fn with_max_component_rate(mut self, rate: Fixed64) -> Self {
        self.max_component_rate = Some(rate);
        self
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// `tick_interval / reference_interval`. A zero reference interval is
    /// treated as one.
    pub fn scale(&self) -> Fixed64 {
        Fixed64::saturating_from_num(self.tick_interval)
            .saturating_div(Fixed64::saturating_from_num(self.reference_interval.max(1)))
    }

    /// Convert a per-reference-interval rate into an amount for one fluid tick.
    pub fn scale_rate(&self, rate: Fixed64) -> Fixed64 {
        // Multiply before dividing so whole-number rates stay exact.
        rate.max(Fixed64::ZERO)
            .saturating_mul_int(i64::from(self.tick_interval))
            / i64::from(self.reference_interval.max(1))
    }

    /// Per-tick edge limit, if any.
    pub fn edge_limit(&self) -> Option<Fixed64> {
        self.max_edge_rate.map(|rate| self.scale_rate(rate))
    }

    /// Per-tick limit on one fluid's flow through a component, if any.
    pub fn component_limit(&self) -> Option<Fixed64> {
        self.max_component_rate.map(|rate| self.scale_rate(rate))
    }
}
