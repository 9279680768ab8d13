//! Configuration options for the impedance renderer.

use serde::{Deserialize, Serialize};

use crate::color_table::Rgba;
use crate::layout::{ColorFormat, VertexLayout};

/// Options fixed for the lifetime of a renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererOptions {
    /// Layout of vertex records in vertices config and update payloads.
    pub vertex_layout: VertexLayout,

    /// Layout of color records in color config and update payloads.
    pub color_format: ColorFormat,

    /// Where the displayed colors come from.
    pub color_source: ColorSource,

    /// Name of the color map used for mapped colors.
    pub color_map: String,

    /// Value range covered by the color map.
    pub value_range: ValueRange,

    /// Alpha of mapped colors.
    pub mesh_alpha: f32,

    /// Whether to draw the electrode ring once an electrodes config is known.
    pub show_electrodes: bool,

    /// Color of the electrode ring.
    pub electrode_color: Rgba,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            vertex_layout: VertexLayout::default(),
            color_format: ColorFormat::default(),
            color_source: ColorSource::Host,
            color_map: "viridis".to_string(),
            value_range: ValueRange::Auto,
            mesh_alpha: 1.0,
            show_electrodes: true,
            electrode_color: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

/// Source of the per-vertex colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ColorSource {
    /// Colors computed by the host arrive in color payloads.
    #[default]
    Host,
    /// Colors are mapped locally from the impedance values on every vertex update.
    Mapped,
}

/// Value range of the color map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum ValueRange {
    /// Range of the initial mesh values, fixed afterwards.
    #[default]
    Auto,
    /// Explicit range.
    Fixed { min: f32, max: f32 },
}

impl ValueRange {
    /// Resolves the range for a set of initial values.
    ///
    /// `Auto` over no finite values falls back to `0..1`; over a single distinct value
    /// it falls back to a unit range centered on that value.
    pub fn resolve(self, values: impl IntoIterator<Item = f32>) -> (f32, f32) {
        match self {
            Self::Fixed { min, max } => (min, max),
            Self::Auto => {
                let (min, max) = values
                    .into_iter()
                    .filter(|v| v.is_finite())
                    .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
                        (lo.min(v), hi.max(v))
                    });
                if !min.is_finite() || !max.is_finite() {
                    (0.0, 1.0)
                } else if min == max {
                    (min - 0.5, max + 0.5)
                } else {
                    (min, max)
                }
            }
        }
    }

    /// Returns true unless a fixed range is inverted, empty or non-finite.
    pub fn is_valid(self) -> bool {
        match self {
            Self::Auto => true,
            Self::Fixed { min, max } => min.is_finite() && max.is_finite() && min < max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_round_trip_json() {
        let options = RendererOptions::default();
        let json = serde_json::to_string(&options).unwrap();
        let parsed: RendererOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, options);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let parsed: RendererOptions =
            serde_json::from_str(r#"{"color_map": "jet", "color_source": "Mapped"}"#).unwrap();
        assert_eq!(parsed.color_map, "jet");
        assert_eq!(parsed.color_source, ColorSource::Mapped);
        assert_eq!(parsed.vertex_layout.stride(), 12);
    }

    #[test]
    fn test_value_range_resolve() {
        assert_eq!(ValueRange::Auto.resolve([3.0, -1.0, f32::NAN, 2.0]), (-1.0, 3.0));
        assert_eq!(ValueRange::Auto.resolve([]), (0.0, 1.0));
        assert_eq!(ValueRange::Auto.resolve([5.0, 5.0, 5.0]), (4.5, 5.5));
        assert_eq!(ValueRange::Auto.resolve([f32::NAN, -2.0]), (-2.5, -1.5));
        assert_eq!(
            ValueRange::Fixed { min: 0.0, max: 5.0 }.resolve([100.0]),
            (0.0, 5.0)
        );
    }

    #[test]
    fn test_value_range_validity() {
        assert!(ValueRange::Auto.is_valid());
        assert!(ValueRange::Fixed { min: 0.0, max: 1.0 }.is_valid());
        assert!(!ValueRange::Fixed { min: 1.0, max: 0.0 }.is_valid());
        assert!(!ValueRange::Fixed { min: 1.0, max: 1.0 }.is_valid());
        assert!(!ValueRange::Fixed {
            min: f32::NAN,
            max: 1.0
        }
        .is_valid());
    }
}
