//! Per-vertex color table.

use crate::error::{DecodeError, DecodeResult};
use crate::layout::{self, ByteOrder, ColorFormat};

/// RGBA color with channels in `0..=1`.
pub type Rgba = [f32; 4];

/// Colors indexed by vertex, with the same cardinality as the mesh.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColorTable {
    colors: Vec<Rgba>,
}

impl ColorTable {
    /// Creates a table from colors.
    pub fn new(colors: Vec<Rgba>) -> Self {
        Self { colors }
    }

    /// Decodes a color payload produced by the host.
    ///
    /// Fails with [`DecodeError::TruncatedBuffer`] for partial records and
    /// [`DecodeError::EmptyBuffer`] when no record decodes.
    pub fn decode(bytes: &[u8], format: ColorFormat, byte_order: ByteOrder) -> DecodeResult<Self> {
        let colors = decode_colors(bytes, format, byte_order)?;
        if colors.is_empty() {
            return Err(DecodeError::EmptyBuffer);
        }
        Ok(Self { colors })
    }

    /// Decodes a color update and checks it against the expected record count.
    pub fn decode_update(
        bytes: &[u8],
        format: ColorFormat,
        byte_order: ByteOrder,
        expected: usize,
    ) -> DecodeResult<Self> {
        let colors = decode_colors(bytes, format, byte_order)?;
        if colors.len() != expected {
            return Err(DecodeError::CountMismatch {
                expected,
                actual: colors.len(),
            });
        }
        Ok(Self { colors })
    }

    /// Number of colors.
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Returns true if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// The colors in vertex order.
    pub fn as_slice(&self) -> &[Rgba] {
        &self.colors
    }
}

fn decode_colors(
    bytes: &[u8],
    format: ColorFormat,
    byte_order: ByteOrder,
) -> DecodeResult<Vec<Rgba>> {
    let colors = layout::records(bytes, format.stride())?
        .map(|record| -> Rgba {
            match format {
                ColorFormat::Rgba32Float => {
                    std::array::from_fn(|channel| layout::field(record, channel, byte_order))
                }
                ColorFormat::Rgba8Unorm => {
                    std::array::from_fn(|channel| f32::from(record[channel]) / 255.0)
                }
            }
        })
        .collect();

    Ok(colors)
}
