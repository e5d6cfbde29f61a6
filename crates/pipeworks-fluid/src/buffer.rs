//! Capacity-bounded fluid storage mixed into connection points.
//!
//! Two flavours share one type:
//!
//! - **Single-fluid buffers** ([`FluidBuffer::single`]) only ever hold their
//!   configured fluid and keep that type when empty.
//! - **Tanks** ([`FluidBuffer::tank`]) hold one fluid at a time from an
//!   allow-list. The tank adopts the type of the first fluid it receives and
//!   forgets it once drained.
//!
//! Overflow and over-withdrawal are clamped, never reported as errors.

use std::collections::BTreeSet;

use pipeworks_core::fixed::{Fixed64, snap_to_zero};
use pipeworks_core::id::FluidTypeId;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Allow-lists
// ---------------------------------------------------------------------------

/// Anything that can decide whether a fluid is acceptable.
pub trait AllowedFluidFilter {
    fn is_allowed_fluid(&self, fluid: FluidTypeId) -> bool;
}

/// A serializable allow-list of fluids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllowedFluids {
    /// Exactly one fluid.
    Only(FluidTypeId),
    /// Any fluid in the set.
    AnyOf(BTreeSet<FluidTypeId>),
    /// Every fluid.
    Any,
}

impl AllowedFluids {
    pub fn any_of(fluids: impl IntoIterator<Item = FluidTypeId>) -> Self {
        AllowedFluids::AnyOf(fluids.into_iter().collect())
    }
}

impl AllowedFluidFilter for AllowedFluids {
    fn is_allowed_fluid(&self, fluid: FluidTypeId) -> bool {
        match self {
            AllowedFluids::Only(f) => *f == fluid,
            AllowedFluids::AnyOf(set) => set.contains(&fluid),
            AllowedFluids::Any => true,
        }
    }
}

// ---------------------------------------------------------------------------
// Buffer
// ---------------------------------------------------------------------------

/// Fluid storage owned by a single connection point.
///
/// Invariants: `0 <= amount <= capacity`, and the amount reported for any
/// fluid other than the one currently held is zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FluidBuffer {
    allowed: AllowedFluids,
    /// Fluid currently held. Always `Some` for single-fluid buffers.
    fluid: Option<FluidTypeId>,
    /// Single-fluid buffers keep their type when empty.
    locked: bool,
    capacity: Fixed64,
    amount: Fixed64,
    accepts_from_network: bool,
    exposes_to_network: bool,
}

impl FluidBuffer {
    /// A buffer that only ever holds `fluid`.
    pub fn single(
        fluid: FluidTypeId,
        capacity: Fixed64,
        accepts_from_network: bool,
        exposes_to_network: bool,
    ) -> Self {
        Self {
            allowed: AllowedFluids::Only(fluid),
            fluid: Some(fluid),
            locked: true,
            capacity: capacity.max(Fixed64::ZERO),
            amount: Fixed64::ZERO,
            accepts_from_network,
            exposes_to_network,
        }
    }

    /// A tank holding one fluid at a time from `allowed`.
    pub fn tank(
        allowed: AllowedFluids,
        capacity: Fixed64,
        accepts_from_network: bool,
        exposes_to_network: bool,
    ) -> Self {
        Self {
            allowed,
            fluid: None,
            locked: false,
            capacity: capacity.max(Fixed64::ZERO),
            amount: Fixed64::ZERO,
            accepts_from_network,
            exposes_to_network,
        }
    }

    pub fn allowed(&self) -> &AllowedFluids {
        &self.allowed
    }

    /// The fluid currently held, if any.
    pub fn fluid(&self) -> Option<FluidTypeId> {
        self.fluid
    }

    pub fn capacity(&self) -> Fixed64 {
        self.capacity
    }

    /// Total stored amount, regardless of fluid.
    pub fn amount(&self) -> Fixed64 {
        self.amount
    }

    pub fn space_remaining(&self) -> Fixed64 {
        self.capacity - self.amount
    }

    pub fn is_full(&self) -> bool {
        self.capacity > Fixed64::ZERO && self.amount >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.amount == Fixed64::ZERO
    }

    pub fn accepts_from_network(&self) -> bool {
        self.accepts_from_network
    }

    pub fn exposes_to_network(&self) -> bool {
        self.exposes_to_network
    }

    pub fn set_accepts_from_network(&mut self, accepts: bool) {
        self.accepts_from_network = accepts;
    }

    pub fn set_exposes_to_network(&mut self, exposes: bool) {
        self.exposes_to_network = exposes;
    }

    /// Amount of `fluid` stored. Zero for any fluid not currently held.
    pub fn fluid_amount(&self, fluid: FluidTypeId) -> Fixed64 {
        if self.fluid == Some(fluid) {
            self.amount
        } else {
            Fixed64::ZERO
        }
    }

    /// How much of `fluid` this buffer would take from the network right now.
    pub fn requested(&self, fluid: FluidTypeId) -> Fixed64 {
        if !self.accepts_from_network || !self.allowed.is_allowed_fluid(fluid) {
            return Fixed64::ZERO;
        }
        match self.fluid {
            None => self.capacity,
            Some(current) if current == fluid => snap_to_zero(self.space_remaining()),
            Some(_) => Fixed64::ZERO,
        }
    }

    /// Change the capacity. Stored fluid above the new capacity is discarded.
    pub fn set_capacity(&mut self, capacity: Fixed64) {
        self.capacity = capacity.max(Fixed64::ZERO);
        if self.amount > self.capacity {
            self.amount = self.capacity;
        }
        if self.amount == Fixed64::ZERO && !self.locked {
            self.fluid = None;
        }
    }

    /// Add up to `amount` of `fluid`. Returns how much was accepted; the rest
    /// does not fit or is not allowed.
    pub fn insert(&mut self, fluid: FluidTypeId, amount: Fixed64) -> Fixed64 {
        if amount <= Fixed64::ZERO || !self.allowed.is_allowed_fluid(fluid) {
            return Fixed64::ZERO;
        }
        if self.fluid.is_some_and(|current| current != fluid) {
            return Fixed64::ZERO;
        }
        let accepted = amount.min(self.space_remaining()).max(Fixed64::ZERO);
        if accepted == Fixed64::ZERO {
            return Fixed64::ZERO;
        }
        self.fluid = Some(fluid);
        self.amount += accepted;
        accepted
    }

    /// Remove up to `amount` of `fluid`. Returns how much was actually
    /// removed, which is less than requested when the buffer runs dry.
    pub fn withdraw(&mut self, fluid: FluidTypeId, amount: Fixed64) -> Fixed64 {
        if amount <= Fixed64::ZERO || self.fluid != Some(fluid) {
            return Fixed64::ZERO;
        }
        let removed = amount.min(self.amount);
        self.amount = snap_to_zero(self.amount - removed);
        if self.amount == Fixed64::ZERO && !self.locked {
            self.fluid = None;
        }
        removed
    }

    /// Re-establish the buffer invariants on state read back from bytes.
    /// Amounts are clamped into `0..=capacity` and fluid the allow-list
    /// rejects is dropped.
    pub(crate) fn sanitized(mut self) -> Self {
        if self.locked && self.fluid.is_none() {
            self.locked = false;
        }
        self.capacity = self.capacity.max(Fixed64::ZERO);
        self.amount = snap_to_zero(self.amount.clamp(Fixed64::ZERO, self.capacity));
        if self.fluid.is_some_and(|fluid| !self.allowed.is_allowed_fluid(fluid)) {
            self.amount = Fixed64::ZERO;
        }
        if self.amount == Fixed64::ZERO && !self.locked {
            self.fluid = None;
        }
        self
    }

    /// Empty the buffer.
    pub fn clear(&mut self) {
        self.amount = Fixed64::ZERO;
        if !self.locked {
            self.fluid = None;
        }
    }
}

impl AllowedFluidFilter for FluidBuffer {
    fn is_allowed_fluid(&self, fluid: FluidTypeId) -> bool {
        self.allowed.is_allowed_fluid(fluid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeworks_core::test_utils::{fixed, lava, water};

    fn water_buffer(capacity: f64) -> FluidBuffer {
        FluidBuffer::single(water(), fixed(capacity), true, false)
    }

    #[test]
    fn sanitized_restores_invariants() {
        let overfull = FluidBuffer {
            amount: fixed(150.0),
            ..water_buffer(100.0)
        }
        .sanitized();
        assert_eq!(overfull.amount(), fixed(100.0));

        let negative = FluidBuffer {
            amount: fixed(-5.0),
            ..water_buffer(100.0)
        }
        .sanitized();
        assert_eq!(negative.amount(), Fixed64::ZERO);
        assert_eq!(negative.fluid(), Some(water()));

        let smuggled = FluidBuffer {
            fluid: Some(lava()),
            amount: fixed(20.0),
            ..FluidBuffer::tank(AllowedFluids::Only(water()), fixed(100.0), true, false)
        }
        .sanitized();
        assert_eq!(smuggled.amount(), Fixed64::ZERO);
        assert_eq!(smuggled.fluid(), None);
    }

    #[test]
    fn single_buffer_starts_empty_with_type() {
        let b = water_buffer(100.0);
        assert_eq!(b.fluid(), Some(water()));
        assert_eq!(b.amount(), Fixed64::ZERO);
        assert_eq!(b.requested(water()), fixed(100.0));
        assert_eq!(b.requested(lava()), Fixed64::ZERO);
    }

    #[test]
    fn insert_clamps_at_capacity() {
        let mut b = water_buffer(100.0);
        assert_eq!(b.insert(water(), fixed(80.0)), fixed(80.0));
        assert_eq!(b.insert(water(), fixed(30.0)), fixed(20.0));
        assert_eq!(b.amount(), fixed(100.0));
        assert!(b.is_full());
        assert_eq!(b.requested(water()), Fixed64::ZERO);
    }

    #[test]
    fn disallowed_fluid_is_rejected_and_reads_zero() {
        let mut b = water_buffer(100.0);
        assert_eq!(b.insert(lava(), fixed(10.0)), Fixed64::ZERO);
        assert_eq!(b.fluid_amount(lava()), Fixed64::ZERO);
        assert_eq!(b.amount(), Fixed64::ZERO);
    }

    #[test]
    fn withdraw_is_partial_and_never_negative() {
        let mut b = water_buffer(100.0);
        b.insert(water(), fixed(30.0));
        assert_eq!(b.withdraw(water(), fixed(50.0)), fixed(30.0));
        assert_eq!(b.amount(), Fixed64::ZERO);
        assert_eq!(b.withdraw(water(), fixed(5.0)), Fixed64::ZERO);
        assert_eq!(b.withdraw(water(), fixed(-5.0)), Fixed64::ZERO);
        // Single-fluid buffers keep their type when empty.
        assert_eq!(b.fluid(), Some(water()));
    }

    #[test]
    fn negative_insert_is_ignored() {
        let mut b = water_buffer(100.0);
        assert_eq!(b.insert(water(), fixed(-10.0)), Fixed64::ZERO);
        assert_eq!(b.amount(), Fixed64::ZERO);
    }

    #[test]
    fn tank_adopts_and_forgets_fluid_type() {
        let mut t = FluidBuffer::tank(AllowedFluids::Any, fixed(50.0), true, true);
        assert_eq!(t.fluid(), None);
        assert_eq!(t.requested(lava()), fixed(50.0));

        t.insert(lava(), fixed(20.0));
        assert_eq!(t.fluid(), Some(lava()));
        assert_eq!(t.requested(water()), Fixed64::ZERO);
        assert_eq!(t.insert(water(), fixed(5.0)), Fixed64::ZERO);

        t.withdraw(lava(), fixed(20.0));
        assert_eq!(t.fluid(), None);
        assert_eq!(t.requested(water()), fixed(50.0));
    }

    #[test]
    fn tank_allow_list_filters() {
        let t = FluidBuffer::tank(AllowedFluids::any_of([water()]), fixed(50.0), true, false);
        assert!(t.is_allowed_fluid(water()));
        assert!(!t.is_allowed_fluid(lava()));
        assert_eq!(t.requested(lava()), Fixed64::ZERO);
    }

    #[test]
    fn closed_buffer_requests_nothing() {
        let mut b = water_buffer(100.0);
        b.set_accepts_from_network(false);
        assert_eq!(b.requested(water()), Fixed64::ZERO);
        // Direct insertion by the owner still works.
        assert_eq!(b.insert(water(), fixed(10.0)), fixed(10.0));
    }

    #[test]
    fn shrinking_capacity_clamps_amount() {
        let mut b = water_buffer(100.0);
        b.insert(water(), fixed(90.0));
        b.set_capacity(fixed(40.0));
        assert_eq!(b.amount(), fixed(40.0));
        b.set_capacity(fixed(-1.0));
        assert_eq!(b.capacity(), Fixed64::ZERO);
        assert_eq!(b.amount(), Fixed64::ZERO);
    }

    #[test]
    fn zero_capacity_is_never_full() {
        let b = water_buffer(0.0);
        assert!(!b.is_full());
        assert_eq!(b.requested(water()), Fixed64::ZERO);
    }

    #[test]
    fn clear_resets_tank_type() {
        let mut t = FluidBuffer::tank(AllowedFluids::Any, fixed(50.0), true, false);
        t.insert(water(), fixed(10.0));
        t.clear();
        assert!(t.is_empty());
        assert_eq!(t.fluid(), None);
    }
}
