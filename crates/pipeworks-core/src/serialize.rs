//! Versioned binary envelope for persisted simulation records.
//!
//! Every record is written as a [`RecordHeader`] followed by a `bitcode`
//! payload. The header carries a per-record-type magic number and the format
//! version so stale or foreign data is rejected before it is trusted.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during serialization.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

/// Errors that can occur during deserialization.
#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("data too short for record header")]
    TooShort,
    #[error("invalid magic number: expected 0x{expected:08X}, got 0x{found:08X}")]
    InvalidMagic { expected: u32, found: u32 },
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("record from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
}

// ---------------------------------------------------------------------------
// Record header
// ---------------------------------------------------------------------------

/// Header prepended to every serialized record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordHeader {
    /// Magic number for format detection.
    pub magic: u32,
    /// Format version for forward compatibility.
    pub version: u32,
}

impl RecordHeader {
    /// Create a header for the current format version.
    pub fn new(magic: u32) -> Self {
        Self {
            magic,
            version: FORMAT_VERSION,
        }
    }

    /// Validate the header against the expected magic number.
    pub fn validate(&self, expected_magic: u32) -> Result<(), DeserializeError> {
        if self.magic != expected_magic {
            return Err(DeserializeError::InvalidMagic {
                expected: expected_magic,
                found: self.magic,
            });
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Encode / decode
// ---------------------------------------------------------------------------

/// Serialize `payload` behind a header carrying `magic`.
pub fn encode_record<T: Serialize>(magic: u32, payload: &T) -> Result<Vec<u8>, SerializeError> {
    let header = RecordHeader::new(magic);
    bitcode::serialize(&(header, payload)).map_err(|e| SerializeError::Encode(e.to_string()))
}

/// Deserialize a record written by [`encode_record`], checking its header.
pub fn decode_record<T: DeserializeOwned>(
    expected_magic: u32,
    data: &[u8],
) -> Result<T, DeserializeError> {
    if data.is_empty() {
        return Err(DeserializeError::TooShort);
    }
    let (header, payload): (RecordHeader, T) =
        bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
    header.validate(expected_magic)?;
    Ok(payload)
}
