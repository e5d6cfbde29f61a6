//! Connection points: the nodes of a fluid network.
//!
//! A point is created (or restored) by the block or entity that owns it, armed
//! with whatever behavior it needs, and only then handed to the
//! [`FluidManager`](crate::manager::FluidManager). Construction never
//! registers anything.

use pipeworks_core::fixed::Fixed64;
use pipeworks_core::id::{FluidTypeId, PointId};
use pipeworks_core::location::BlockPos;
use serde::{Deserialize, Serialize};

use crate::buffer::{AllowedFluidFilter, AllowedFluids, FluidBuffer};
use crate::error::FluidError;
use crate::producer::Producer;

/// Role of a point in the network. Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PointKind {
    /// Receives fluid from the network.
    Input,
    /// Emits fluid into the network.
    Output,
    /// Neither produces nor consumes; only extends reachability.
    Intersection,
}

impl PointKind {
    /// Whether fluid can travel along an edge from a `self` point to a `to` point.
    pub fn carries_to(self, to: PointKind) -> bool {
        matches!(
            (self, to),
            (PointKind::Output, PointKind::Input)
                | (PointKind::Output, PointKind::Intersection)
                | (PointKind::Intersection, PointKind::Input)
                | (PointKind::Intersection, PointKind::Intersection)
        )
    }
}

/// A typed node attached to a block position.
#[derive(Debug)]
pub struct ConnectionPoint {
    id: PointId,
    kind: PointKind,
    location: BlockPos,
    buffer: Option<FluidBuffer>,
    producer: Option<Box<dyn Producer>>,
    /// Intersections only: fluids this point lets through.
    pass_filter: Option<AllowedFluids>,
    /// Inputs only: inbound flow limit per reference interval.
    throughput: Option<Fixed64>,
}

impl ConnectionPoint {
    /// Create a brand-new point with a fresh id.
    pub fn create(kind: PointKind, location: BlockPos) -> Self {
        Self::restore(PointId::new_random(), kind, location)
    }

    /// Recreate a point with a previously persisted id.
    pub fn restore(id: PointId, kind: PointKind, location: BlockPos) -> Self {
        Self {
            id,
            kind,
            location,
            buffer: None,
            producer: None,
            pass_filter: None,
            throughput: None,
        }
    }

    pub fn id(&self) -> PointId {
        self.id
    }

    pub fn kind(&self) -> PointKind {
        self.kind
    }

    pub fn location(&self) -> BlockPos {
        self.location
    }

    // -----------------------------------------------------------------------
    // Buffer capability
    // -----------------------------------------------------------------------

    /// Arm a single-fluid buffer. May only be called once per point.
    pub fn create_fluid_buffer(
        &mut self,
        fluid: FluidTypeId,
        capacity: Fixed64,
        accepts_input: bool,
        exposes_output: bool,
    ) -> Result<(), FluidError> {
        self.arm_buffer(FluidBuffer::single(
            fluid,
            capacity,
            accepts_input,
            exposes_output,
        ))
    }

    /// Arm a one-fluid-at-a-time tank. May only be called once per point.
    pub fn create_fluid_tank(
        &mut self,
        allowed: AllowedFluids,
        capacity: Fixed64,
        accepts_input: bool,
        exposes_output: bool,
    ) -> Result<(), FluidError> {
        self.arm_buffer(FluidBuffer::tank(
            allowed,
            capacity,
            accepts_input,
            exposes_output,
        ))
    }

    fn arm_buffer(&mut self, buffer: FluidBuffer) -> Result<(), FluidError> {
        if self.kind == PointKind::Intersection {
            return Err(FluidError::IllegalState("intersections cannot hold a buffer"));
        }
        if self.buffer.is_some() {
            return Err(FluidError::IllegalState("fluid buffer already created"));
        }
        self.buffer = Some(buffer);
        Ok(())
    }

    pub fn buffer(&self) -> Option<&FluidBuffer> {
        self.buffer.as_ref()
    }

    pub fn buffer_mut(&mut self) -> Option<&mut FluidBuffer> {
        self.buffer.as_mut()
    }

    /// Stored amount of `fluid`; zero without a buffer.
    pub fn fluid_amount(&self, fluid: FluidTypeId) -> Fixed64 {
        self.buffer
            .as_ref()
            .map_or(Fixed64::ZERO, |b| b.fluid_amount(fluid))
    }

    // -----------------------------------------------------------------------
    // Producer capability
    // -----------------------------------------------------------------------

    /// Attach the producer behavior. Only outputs can produce.
    pub fn set_producer(&mut self, producer: Box<dyn Producer>) -> Result<(), FluidError> {
        if self.kind != PointKind::Output {
            return Err(FluidError::IllegalState("only output points can produce"));
        }
        self.producer = Some(producer);
        Ok(())
    }

    pub fn producer(&self) -> Option<&dyn Producer> {
        self.producer.as_deref()
    }

    pub fn producer_mut(&mut self) -> Option<&mut (dyn Producer + 'static)> {
        self.producer.as_deref_mut()
    }

    pub fn take_producer(&mut self) -> Option<Box<dyn Producer>> {
        self.producer.take()
    }

    // -----------------------------------------------------------------------
    // Pipe capabilities
    // -----------------------------------------------------------------------

    /// Restrict the fluids an intersection lets through.
    pub fn set_pass_filter(&mut self, filter: AllowedFluids) -> Result<(), FluidError> {
        if self.kind != PointKind::Intersection {
            return Err(FluidError::IllegalState("only intersections filter fluids"));
        }
        self.pass_filter = Some(filter);
        Ok(())
    }

    pub fn pass_filter(&self) -> Option<&AllowedFluids> {
        self.pass_filter.as_ref()
    }

    /// Limit inbound flow, per reference interval.
    pub fn set_throughput(&mut self, rate: Fixed64) -> Result<(), FluidError> {
        if self.kind != PointKind::Input {
            return Err(FluidError::IllegalState("only input points limit throughput"));
        }
        self.throughput = Some(rate.max(Fixed64::ZERO));
        Ok(())
    }

    pub fn throughput(&self) -> Option<Fixed64> {
        self.throughput
    }

    // -----------------------------------------------------------------------
    // Capability queries used by the tick
    // -----------------------------------------------------------------------

    /// Whether `fluid` may travel through this point.
    pub fn passes(&self, fluid: FluidTypeId) -> bool {
        self.pass_filter
            .as_ref()
            .is_none_or(|filter| filter.is_allowed_fluid(fluid))
    }

    pub fn is_producer(&self) -> bool {
        self.producer.is_some()
    }

    /// An input whose buffer takes fluid from the network.
    pub fn is_consumer(&self) -> bool {
        self.kind == PointKind::Input
            && self.buffer.as_ref().is_some_and(FluidBuffer::accepts_from_network)
    }

    /// An output whose buffer offers its stored fluid to the network.
    pub fn is_stored_supplier(&self) -> bool {
        self.kind == PointKind::Output
            && self.buffer.as_ref().is_some_and(FluidBuffer::exposes_to_network)
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    pub(crate) fn into_parts(self) -> PointParts {
        PointParts {
            id: self.id,
            kind: self.kind,
            location: self.location,
            buffer: self.buffer,
            pass_filter: self.pass_filter,
            throughput: self.throughput,
        }
    }

    pub(crate) fn from_parts(parts: PointParts) -> Self {
        Self {
            id: parts.id,
            kind: parts.kind,
            location: parts.location,
            buffer: parts.buffer,
            producer: None,
            pass_filter: parts.pass_filter,
            throughput: parts.throughput,
        }
    }

    pub(crate) fn parts(&self) -> PointParts {
        PointParts {
            id: self.id,
            kind: self.kind,
            location: self.location,
            buffer: self.buffer.clone(),
            pass_filter: self.pass_filter.clone(),
            throughput: self.throughput,
        }
    }
}

/// The persistable fields of a point (everything but the producer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PointParts {
    pub id: PointId,
    pub kind: PointKind,
    pub location: BlockPos,
    pub buffer: Option<FluidBuffer>,
    pub pass_filter: Option<AllowedFluids>,
    pub throughput: Option<Fixed64>,
}
