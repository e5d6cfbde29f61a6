//! Fluid networks for Pipeworks.
//!
//! Connection points are attached to block positions and registered with a
//! [`FluidManager`]. Every tick the manager derives directed edges between
//! face-adjacent points (or whatever its [`AdjacencyOracle`] says), splits them
//! into connected components, and routes producer emission and stored fluid
//! into consumer buffers. Emission nobody takes is lost.
//!
//! # Design
//!
//! - Points have a fixed [`PointKind`]; fluid moves OUTPUT to INPUT, possibly
//!   through any number of INTERSECTION points.
//! - Behaviors are optional capabilities on the point: a [`FluidBuffer`], a
//!   [`Producer`], a pass filter, a throughput limit.
//! - Allocation is deterministic: by default a greedy over consumers in
//!   [`TieBreak`] order and suppliers in id order, or equal shares with
//!   [`TieBreak::EvenSplit`]. Fluids go in ascending id order.
//! - Per-tick amounts are published through an atomically swapped
//!   [`FlowSnapshot`] readable from any thread via [`FlowReader`].

pub mod adjacency;
pub mod buffer;
pub mod error;
pub mod event;
pub mod manager;
pub mod network;
pub mod persist;
pub mod point;
pub mod producer;
pub mod settings;
pub mod snapshot;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use adjacency::{AdjacencyOracle, ExplicitLinks, GridAdjacency, PointLookup};
pub use buffer::{AllowedFluidFilter, AllowedFluids, FluidBuffer};
pub use error::FluidError;
pub use event::{FluidEvent, TickReport};
pub use manager::FluidManager;
pub use network::Component;
pub use persist::{PointRecord, decode_point, encode_point};
pub use point::{ConnectionPoint, PointKind};
pub use producer::{ConstantProducer, HookError, Producer, effective_rate};
pub use settings::{FluidSettings, TieBreak};
pub use snapshot::{FlowReader, FlowSnapshot};
