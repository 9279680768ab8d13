//! Binary layouts of the host's vertex and color payloads.
//!
//! Payloads are sequences of fixed-width records. The exact field layout is a
//! contract between host and client that stays the same for a session, so it is
//! carried in [`RendererOptions`](crate::RendererOptions) instead of being inferred.

use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, DecodeResult};

/// Size in bytes of a single `f32` field.
const F32_SIZE: usize = std::mem::size_of::<f32>();

/// Byte order of multi-byte fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ByteOrder {
    /// Little endian (the host's native order).
    #[default]
    Little,
    /// Big endian (network order).
    Big,
}

impl ByteOrder {
    /// Reads an `f32` from exactly four bytes.
    pub fn read_f32(self, bytes: [u8; 4]) -> f32 {
        match self {
            Self::Little => f32::from_le_bytes(bytes),
            Self::Big => f32::from_be_bytes(bytes),
        }
    }

    /// Writes an `f32` into four bytes.
    pub fn write_f32(self, value: f32) -> [u8; 4] {
        match self {
            Self::Little => value.to_le_bytes(),
            Self::Big => value.to_be_bytes(),
        }
    }
}

/// Number of position coordinates per vertex record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Dimensions {
    /// `x, y`
    #[default]
    Two,
    /// `x, y, z` (z is kept but not used for the 2D projection)
    Three,
}

impl Dimensions {
    /// Number of coordinates.
    pub const fn count(self) -> usize {
        match self {
            Self::Two => 2,
            Self::Three => 3,
        }
    }
}

/// Layout of a vertex record: position coordinates followed by one impedance value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct VertexLayout {
    /// Position dimensionality.
    pub dimensions: Dimensions,
    /// Byte order of every field.
    pub byte_order: ByteOrder,
}

impl VertexLayout {
    /// Creates a layout.
    pub const fn new(dimensions: Dimensions, byte_order: ByteOrder) -> Self {
        Self {
            dimensions,
            byte_order,
        }
    }

    /// Record size in bytes.
    pub const fn stride(&self) -> usize {
        (self.dimensions.count() + 1) * F32_SIZE
    }
}

/// Layout of a color record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ColorFormat {
    /// Four `f32` channels in `0..=1`.
    #[default]
    Rgba32Float,
    /// Four `u8` channels scaled to `0..=1`.
    Rgba8Unorm,
}

impl ColorFormat {
    /// Record size in bytes.
    pub const fn stride(self) -> usize {
        match self {
            Self::Rgba32Float => 4 * F32_SIZE,
            Self::Rgba8Unorm => 4,
        }
    }
}

/// Splits a payload into records of `stride` bytes.
///
/// An empty payload yields no records; callers decide whether that is an error.
pub(crate) fn records(
    bytes: &[u8],
    stride: usize,
) -> DecodeResult<std::slice::ChunksExact<'_, u8>> {
    if bytes.len() % stride != 0 {
        return Err(DecodeError::TruncatedBuffer {
            len: bytes.len(),
            stride,
        });
    }
    Ok(bytes.chunks_exact(stride))
}

/// Reads the `index`-th `f32` field of a record.
pub(crate) fn field(record: &[u8], index: usize, byte_order: ByteOrder) -> f32 {
    let start = index * F32_SIZE;
    let mut raw = [0u8; F32_SIZE];
    raw.copy_from_slice(&record[start..start + F32_SIZE]);
    byte_order.read_f32(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_vertex_stride() {
        assert_eq!(VertexLayout::default().stride(), 12);
        assert_eq!(
            VertexLayout::new(Dimensions::Three, ByteOrder::Big).stride(),
            16
        );
    }

    #[test]
    fn test_color_strides() {
        assert_eq!(ColorFormat::Rgba32Float.stride(), 16);
        assert_eq!(ColorFormat::Rgba8Unorm.stride(), 4);
    }

    #[test]
    fn test_byte_order_fields() {
        let little = ByteOrder::Little.write_f32(1.5);
        let big = ByteOrder::Big.write_f32(1.5);
        assert_ne!(little, big);
        assert_eq!(ByteOrder::Little.read_f32(little), 1.5);
        assert_eq!(ByteOrder::Big.read_f32(big), 1.5);
    }

    #[test]
    fn test_records_rejects_partial_record() {
        let err = records(&[0u8; 13], 12).unwrap_err();
        assert_eq!(err, DecodeError::TruncatedBuffer { len: 13, stride: 12 });
        assert_eq!(records(&[], 12).unwrap().count(), 0);
    }
}
