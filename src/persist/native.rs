//! Native `.srfm` storage format.
//!
//! A 32-byte header followed by a postcard-encoded payload.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                    Header (32 bytes)                        │
//! ├────────────────────────────────────────────────────────────┤
//! │                    Payload (variable)                       │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! The codec here only frames bytes; [`super::serialize_forest`] and
//! [`super::deserialize_forest`] decide what goes into the payload.

use std::io::{Read, Write};

use thiserror::Error;

// ============================================================================
// Constants
// ============================================================================

/// Magic bytes identifying a surrogate forest file.
pub const MAGIC: &[u8; 4] = b"SRFM";

pub const CURRENT_VERSION_MAJOR: u8 = 1;
pub const CURRENT_VERSION_MINOR: u8 = 0;

/// Size of the format header in bytes.
pub const HEADER_SIZE: usize = 32;

// ============================================================================
// Format Flags
// ============================================================================

/// Bitfield flags describing the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatFlags(u16);

impl FormatFlags {
    /// At least one design-matrix column is categorical.
    pub const HAS_CATEGORICAL: u16 = 1 << 0;
    /// Responses were log10-transformed before training.
    pub const LOG_MODEL: u16 = 1 << 1;
    /// The payload carries the training data next to the forest.
    pub const HAS_TRAINING_DATA: u16 = 1 << 2;

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn contains(self, flag: u16) -> bool {
        (self.0 & flag) != 0
    }

    pub fn set(&mut self, flag: u16) {
        self.0 |= flag;
    }

    pub fn clear(&mut self, flag: u16) {
        self.0 &= !flag;
    }
}

// ============================================================================
// Format Header
// ============================================================================

/// 32-byte header for the native storage format.
///
/// # Layout
///
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       4     Magic ("SRFM")
/// 4       1     Version major
/// 5       1     Version minor
/// 6       2     Reserved
/// 8       2     Flags (bitfield)
/// 10      2     Reserved
/// 12      4     Payload size (bytes)
/// 16      4     CRC32 checksum of payload
/// 20      4     Number of trees
/// 24      4     Number of design-matrix features
/// 28      4     Reserved
/// ```
///
/// Multi-byte fields are little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatHeader {
    pub version_major: u8,
    pub version_minor: u8,
    pub flags: FormatFlags,
    pub payload_size: u32,
    pub checksum: u32,
    pub n_trees: u32,
    pub n_features: u32,
}

impl FormatHeader {
    /// Header with the current version and no payload yet.
    pub fn new(n_trees: u32, n_features: u32) -> Self {
        Self {
            version_major: CURRENT_VERSION_MAJOR,
            version_minor: CURRENT_VERSION_MINOR,
            flags: FormatFlags::empty(),
            payload_size: 0,
            checksum: 0,
            n_trees,
            n_features,
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(MAGIC);
        buf[4] = self.version_major;
        buf[5] = self.version_minor;
        buf[8..10].copy_from_slice(&self.flags.bits().to_le_bytes());
        buf[12..16].copy_from_slice(&self.payload_size.to_le_bytes());
        buf[16..20].copy_from_slice(&self.checksum.to_le_bytes());
        buf[20..24].copy_from_slice(&self.n_trees.to_le_bytes());
        buf[24..28].copy_from_slice(&self.n_features.to_le_bytes());
        buf
    }

    /// Parse a header, rejecting foreign files and newer major versions.
    pub fn from_bytes(buf: &[u8; HEADER_SIZE]) -> Result<Self, DeserializeError> {
        if &buf[0..4] != MAGIC {
            return Err(DeserializeError::NotAModel);
        }

        let version_major = buf[4];
        let version_minor = buf[5];
        if version_major > CURRENT_VERSION_MAJOR {
            return Err(DeserializeError::UnsupportedVersion {
                major: version_major,
                minor: version_minor,
            });
        }

        let le_u32 = |at: usize| u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]]);

        Ok(Self {
            version_major,
            version_minor,
            flags: FormatFlags::from_bits(u16::from_le_bytes([buf[8], buf[9]])),
            payload_size: le_u32(12),
            checksum: le_u32(16),
            n_trees: le_u32(20),
            n_features: le_u32(24),
        })
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during serialization.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encoding error: {0}")]
    Encoding(#[from] postcard::Error),

    /// A count does not fit the header's 32-bit fields.
    #[error("{field} of {value} does not fit in the format header")]
    TooLarge { field: &'static str, value: usize },
}

/// Errors that can occur during deserialization.
#[derive(Debug, Error)]
pub enum DeserializeError {
    /// Wrong magic bytes.
    #[error("not a surrogate forest model file")]
    NotAModel,

    #[error("model requires format version {major}.{minor} or later support")]
    UnsupportedVersion { major: u8, minor: u8 },

    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("file truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// Payload decoded but disagrees with the header or its own invariants.
    #[error("corrupt payload: {0}")]
    CorruptPayload(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decoding error: {0}")]
    Decoding(#[from] postcard::Error),
}

// ============================================================================
// CRC32 Helper
// ============================================================================

pub fn compute_checksum(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

// ============================================================================
// Framing
// ============================================================================

/// Fill in size and checksum, then write header and payload.
pub fn write_frame<W: Write>(
    writer: &mut W,
    header: &mut FormatHeader,
    payload: &[u8],
) -> Result<(), SerializeError> {
    header.payload_size = u32::try_from(payload.len()).map_err(|_| SerializeError::TooLarge {
        field: "payload size",
        value: payload.len(),
    })?;
    header.checksum = compute_checksum(payload);

    writer.write_all(&header.to_bytes())?;
    writer.write_all(payload)?;
    Ok(())
}

/// Read a header and its payload, verifying the checksum.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<(FormatHeader, Vec<u8>), DeserializeError> {
    let mut header_buf = [0u8; HEADER_SIZE];
    let got = read_up_to(reader, &mut header_buf)?;
    if got < HEADER_SIZE {
        return Err(DeserializeError::Truncated {
            expected: HEADER_SIZE,
            actual: got,
        });
    }

    let header = FormatHeader::from_bytes(&header_buf)?;

    let expected = header.payload_size as usize;
    let mut payload = vec![0u8; expected];
    let got = read_up_to(reader, &mut payload)?;
    if got < expected {
        return Err(DeserializeError::Truncated { expected, actual: got });
    }

    let actual = compute_checksum(&payload);
    if actual != header.checksum {
        return Err(DeserializeError::ChecksumMismatch {
            expected: header.checksum,
            actual,
        });
    }

    Ok((header, payload))
}

/// Like `read_exact`, but reports how many bytes arrived before EOF.
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip() {
        let header = FormatHeader {
            version_major: 1,
            version_minor: 2,
            flags: FormatFlags::from_bits(FormatFlags::HAS_CATEGORICAL | FormatFlags::LOG_MODEL),
            payload_size: 12345,
            checksum: 0xDEADBEEF,
            n_trees: 10,
            n_features: 7,
        };

        let bytes = header.to_bytes();
        assert_eq!(&bytes[0..4], b"SRFM");
        assert_eq!(FormatHeader::from_bytes(&bytes).unwrap(), header);
    }

    #[test]
    fn header_wrong_magic() {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(b"BSTR");
        assert!(matches!(FormatHeader::from_bytes(&buf), Err(DeserializeError::NotAModel)));
    }

    #[test]
    fn header_unsupported_version() {
        let mut header = FormatHeader::new(3, 2);
        header.version_major = 99;
        let result = FormatHeader::from_bytes(&header.to_bytes());
        assert!(matches!(
            result,
            Err(DeserializeError::UnsupportedVersion { major: 99, .. })
        ));
    }

    #[test]
    fn frame_roundtrip() {
        let mut header = FormatHeader::new(4, 3);
        let mut buffer = Vec::new();
        write_frame(&mut buffer, &mut header, b"forest bytes").unwrap();
        assert_eq!(buffer.len(), HEADER_SIZE + 12);

        let (read_header, payload) = read_frame(&mut buffer.as_slice()).unwrap();
        assert_eq!(read_header.n_trees, 4);
        assert_eq!(read_header.n_features, 3);
        assert_eq!(read_header.payload_size, 12);
        assert_eq!(payload, b"forest bytes");
    }

    #[test]
    fn frame_detects_corruption() {
        let mut header = FormatHeader::new(1, 1);
        let mut buffer = Vec::new();
        write_frame(&mut buffer, &mut header, b"some model data").unwrap();
        buffer[HEADER_SIZE + 5] ^= 0xFF;

        let result = read_frame(&mut buffer.as_slice());
        assert!(matches!(result, Err(DeserializeError::ChecksumMismatch { .. })));
    }

    #[test]
    fn frame_reports_truncation() {
        let mut header = FormatHeader::new(1, 1);
        let mut buffer = Vec::new();
        write_frame(&mut buffer, &mut header, b"0123456789").unwrap();
        buffer.truncate(HEADER_SIZE + 4);

        let result = read_frame(&mut buffer.as_slice());
        assert!(matches!(
            result,
            Err(DeserializeError::Truncated { expected: 10, actual: 4 })
        ));

        let result = read_frame(&mut &buffer[..10]);
        assert!(matches!(
            result,
            Err(DeserializeError::Truncated { expected: HEADER_SIZE, actual: 10 })
        ));
    }

    #[test]
    fn flags_operations() {
        let mut flags = FormatFlags::empty();
        flags.set(FormatFlags::LOG_MODEL);
        flags.set(FormatFlags::HAS_TRAINING_DATA);
        assert!(flags.contains(FormatFlags::LOG_MODEL));
        assert!(!flags.contains(FormatFlags::HAS_CATEGORICAL));

        flags.clear(FormatFlags::LOG_MODEL);
        assert!(!flags.contains(FormatFlags::LOG_MODEL));
        assert!(flags.contains(FormatFlags::HAS_TRAINING_DATA));
    }
}
