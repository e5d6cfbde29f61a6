//! Pipeworks Core -- shared building blocks for the fluid simulation.
//!
//! This crate holds the pieces every other Pipeworks crate depends on:
//! deterministic fixed-point amounts, identifiers, block positions, the
//! immutable fluid type registry, and the versioned binary envelope used to
//! persist simulation state.
//!
//! # Key Types
//!
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type used for every amount,
//!   rate and capacity in the simulation.
//! - [`id::FluidTypeId`] / [`id::PointId`] -- fluid kind and connection point
//!   identity. Point ids survive save/restore.
//! - [`location::BlockPos`] -- the spatial coordinate a point is attached to.
//! - [`registry::FluidRegistry`] -- immutable catalog of fluid types, frozen
//!   at startup via [`registry::FluidRegistryBuilder`].
//! - [`serialize`] -- magic/version header plus `bitcode` payload.

pub mod fixed;
pub mod id;
pub mod location;
pub mod registry;
pub mod serialize;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
