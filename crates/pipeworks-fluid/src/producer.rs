//! Producer behavior: points that emit fluid at a configured rate.

use std::fmt;

use pipeworks_core::fixed::Fixed64;
use pipeworks_core::id::FluidTypeId;

use crate::settings::FluidSettings;

/// Error type returned by producer hooks.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Emits fluid into the network every tick.
///
/// Producers are stateless emitters as far as the network is concerned: the
/// manager never decrements anything on them. Rates are expressed per
/// reference interval and scaled by the manager's tick interval.
pub trait Producer: fmt::Debug + Send {
    /// Fluids emitted and their rates. Queried once per tick.
    fn supplied_fluids(&self) -> Vec<(FluidTypeId, Fixed64)>;

    /// Called after the tick's routing is final, only for fluid that a
    /// consumer actually took. Errors and panics are isolated to this
    /// producer and reported in the tick report.
    fn on_fluid_removed(&mut self, fluid: FluidTypeId, amount: Fixed64) -> Result<(), HookError> {
        let _ = (fluid, amount);
        Ok(())
    }
}

/// Emitted amount for one fluid tick: `rate * tick_interval / reference_interval`.
/// Never negative.
pub fn effective_rate(rate: Fixed64, settings: &FluidSettings) -> Fixed64 {
    settings.scale_rate(rate)
}

/// A producer emitting one fluid at a constant rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantProducer {
    pub fluid: FluidTypeId,
    /// Rate per reference interval.
    pub rate: Fixed64,
}

impl ConstantProducer {
    pub fn new(fluid: FluidTypeId, rate: Fixed64) -> Self {
        Self {
            fluid,
            rate: rate.max(Fixed64::ZERO),
        }
    }
}

impl Producer for ConstantProducer {
    fn supplied_fluids(&self) -> Vec<(FluidTypeId, Fixed64)> {
        vec![(self.fluid, self.rate)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeworks_core::test_utils::{fixed, water};

    #[test]
    fn effective_rate_scales_linearly() {
        let rate = fixed(200.0);
        let one = FluidSettings::default().with_tick_interval(1);
        let ten = FluidSettings::default().with_tick_interval(10);
        let twenty = FluidSettings::default().with_tick_interval(20);
        assert_eq!(effective_rate(rate, &one), fixed(10.0));
        assert_eq!(effective_rate(rate, &ten), fixed(100.0));
        assert_eq!(effective_rate(rate, &twenty), fixed(200.0));
    }

    #[test]
    fn constant_producer_clamps_negative_rate() {
        let p = ConstantProducer::new(water(), fixed(-3.0));
        assert_eq!(p.supplied_fluids(), vec![(water(), Fixed64::ZERO)]);
    }

    #[test]
    fn default_hook_is_noop() {
        let mut p = ConstantProducer::new(water(), fixed(5.0));
        assert!(p.on_fluid_removed(water(), fixed(5.0)).is_ok());
    }
}
