//! Binary persistence of connection points.
//!
//! A point is saved as a [`PointRecord`] inside the core record envelope.
//! Producers carry no per-instance state and are re-armed by the owner after
//! [`decode_point`].

use pipeworks_core::fixed::Fixed64;
use pipeworks_core::id::PointId;
use pipeworks_core::location::BlockPos;
use pipeworks_core::serialize::{
    DeserializeError, SerializeError, decode_record, encode_record,
};
use serde::{Deserialize, Serialize};

use crate::buffer::{AllowedFluids, FluidBuffer};
use crate::point::{ConnectionPoint, PointKind, PointParts};

/// Magic number identifying a persisted connection point.
pub const POINT_RECORD_MAGIC: u32 = 0x50F1_0001;

/// Persisted form of a connection point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointRecord {
    /// Point id as a raw `u128`.
    pub id: u128,
    pub kind: PointKind,
    pub location: BlockPos,
    pub buffer: Option<FluidBuffer>,
    pub pass_filter: Option<AllowedFluids>,
    pub throughput: Option<Fixed64>,
}

impl PointRecord {
    pub fn of(point: &ConnectionPoint) -> Self {
        Self::from_parts(point.parts())
    }

    fn from_parts(parts: PointParts) -> Self {
        Self {
            id: parts.id.0.as_u128(),
            kind: parts.kind,
            location: parts.location,
            buffer: parts.buffer,
            pass_filter: parts.pass_filter,
            throughput: parts.throughput,
        }
    }

    /// Rebuild the point. The producer, if any, must be re-attached. Buffer
    /// amounts outside `0..=capacity` are clamped.
    pub fn into_point(self) -> ConnectionPoint {
        ConnectionPoint::from_parts(PointParts {
            id: PointId::from_u128(self.id),
            kind: self.kind,
            location: self.location,
            buffer: self.buffer.map(FluidBuffer::sanitized),
            pass_filter: self.pass_filter,
            throughput: self.throughput.map(|rate| rate.max(Fixed64::ZERO)),
        })
    }
}

impl From<ConnectionPoint> for PointRecord {
    fn from(point: ConnectionPoint) -> Self {
        Self::from_parts(point.into_parts())
    }
}

/// Encode a point to bytes.
pub fn encode_point(point: &ConnectionPoint) -> Result<Vec<u8>, SerializeError> {
    encode_record(POINT_RECORD_MAGIC, &PointRecord::of(point))
}

/// Decode a point written by [`encode_point`].
pub fn decode_point(data: &[u8]) -> Result<ConnectionPoint, DeserializeError> {
    decode_record::<PointRecord>(POINT_RECORD_MAGIC, data).map(PointRecord::into_point)
}
