//! Electrode configuration and the electrode ring overlay.

use std::f32::consts::TAU;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, DecodeResult};
use crate::geometry::Bounds;

/// Electrode setup reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElectrodesConfig {
    /// Number of electrodes around the boundary.
    pub count: u32,
    /// Arc length of a single electrode, in mesh units.
    pub length: f32,
}

impl ElectrodesConfig {
    /// Parses the host's JSON electrodes payload.
    pub fn from_json(bytes: &[u8]) -> DecodeResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| DecodeError::InvalidElectrodesConfig(e.to_string()))
    }
}

/// Electrodes laid out evenly on a circle, as line segments in mesh space.
#[derive(Debug, Clone, PartialEq)]
pub struct ElectrodeRing {
    segments: Vec<[Vec2; 2]>,
}

impl ElectrodeRing {
    /// Places the electrodes on the circle around the mesh bounds.
    ///
    /// Electrode `i` is centered at angle `i / count` of a full turn, starting on the
    /// +x axis and going counter-clockwise. Each electrode is the chord spanning its
    /// arc length, capped so neighbours never overlap.
    pub fn new(config: &ElectrodesConfig, bounds: &Bounds) -> Self {
        let radius = bounds.circumradius();
        if config.count == 0 || radius <= 0.0 || config.length.is_nan() || config.length <= 0.0 {
            return Self {
                segments: Vec::new(),
            };
        }

        let center = bounds.center();
        let pitch = TAU / config.count as f32;
        let half_width = (config.length / radius).min(pitch) * 0.5;

        let segments = (0..config.count)
            .map(|i| {
                let angle = i as f32 * pitch;
                [
                    center + Vec2::from_angle(angle - half_width) * radius,
                    center + Vec2::from_angle(angle + half_width) * radius,
                ]
            })
            .collect();

        Self { segments }
    }

    /// The electrode segments.
    pub fn segments(&self) -> &[[Vec2; 2]] {
        &self.segments
    }

    /// Number of electrodes drawn.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns true if no electrode is drawn.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Bounds {
        Bounds {
            min: Vec2::new(-1.0, -1.0),
            max: Vec2::new(1.0, 1.0),
        }
    }

    #[test]
    fn test_from_json() {
        let config = ElectrodesConfig::from_json(br#"{"count": 16, "length": 0.05}"#).unwrap();
        assert_eq!(config.count, 16);
        assert!((config.length - 0.05).abs() < 1e-7);

        assert!(matches!(
            ElectrodesConfig::from_json(b"not json"),
            Err(DecodeError::InvalidElectrodesConfig(_))
        ));
    }

    #[test]
    fn test_ring_places_electrodes_on_circle() {
        let config = ElectrodesConfig {
            count: 16,
            length: 0.1,
        };
        let bounds = unit_square();
        let ring = ElectrodeRing::new(&config, &bounds);
        let radius = bounds.circumradius();

        assert_eq!(ring.len(), 16);
        for [a, b] in ring.segments() {
            assert!((a.length() - radius).abs() < 1e-5);
            assert!((b.length() - radius).abs() < 1e-5);
            assert!(a.distance(*b) <= 0.1 + 1e-5);
        }
    }

    #[test]
    fn test_ring_caps_overlapping_electrodes() {
        let config = ElectrodesConfig {
            count: 4,
            length: 100.0,
        };
        let ring = ElectrodeRing::new(&config, &unit_square());
        let [a, b] = ring.segments()[0];
        // Capped at a quarter turn: endpoints at -45 and +45 degrees
        assert!((b.y.atan2(b.x) - a.y.atan2(a.x) - TAU / 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_ring_without_electrodes() {
        let none = ElectrodesConfig {
            count: 0,
            length: 1.0,
        };
        assert!(ElectrodeRing::new(&none, &unit_square()).is_empty());

        let flat = ElectrodesConfig {
            count: 8,
            length: 0.0,
        };
        assert!(ElectrodeRing::new(&flat, &unit_square()).is_empty());
    }
}
