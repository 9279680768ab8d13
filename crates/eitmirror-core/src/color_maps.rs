//! Color maps and the impedance-to-color transfer function.

use std::collections::HashMap;

use glam::Vec3;

use crate::color_table::{ColorTable, Rgba};
use crate::mesh::MeshBuffer;

/// A color map for mapping normalized scalar values to colors.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorMap {
    /// Color map name.
    pub name: String,
    /// Color samples (evenly spaced from 0 to 1).
    pub colors: Vec<Vec3>,
}

impl ColorMap {
    /// Creates a new color map.
    pub fn new(name: impl Into<String>, colors: Vec<Vec3>) -> Self {
        Self {
            name: name.into(),
            colors,
        }
    }

    /// Samples the color map at a given value (0 to 1). Out-of-range and NaN
    /// inputs saturate to the endpoint colors.
    pub fn sample(&self, t: f32) -> Vec3 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };

        match self.colors.len() {
            0 => return Vec3::ZERO,
            1 => return self.colors[0],
            _ => {}
        }

        let n = self.colors.len() - 1;
        let idx = ((t * n as f32).floor() as usize).min(n - 1);
        let frac = t * n as f32 - idx as f32;

        self.colors[idx].lerp(self.colors[idx + 1], frac)
    }
}

/// Registry for looking up color maps by name.
#[derive(Default)]
pub struct ColorMapRegistry {
    color_maps: HashMap<String, ColorMap>,
}

impl ColorMapRegistry {
    /// Creates a new color map registry with the built-in color maps.
    pub fn new() -> Self {
        let mut registry = Self::default();
        registry.register_defaults();
        registry
    }

    fn register_defaults(&mut self) {
        self.register(ColorMap::new(
            "viridis",
            vec![
                Vec3::new(0.267, 0.004, 0.329),
                Vec3::new(0.282, 0.140, 0.457),
                Vec3::new(0.253, 0.265, 0.529),
                Vec3::new(0.206, 0.371, 0.553),
                Vec3::new(0.163, 0.471, 0.558),
                Vec3::new(0.127, 0.566, 0.550),
                Vec3::new(0.134, 0.658, 0.517),
                Vec3::new(0.266, 0.749, 0.440),
                Vec3::new(0.477, 0.821, 0.318),
                Vec3::new(0.741, 0.873, 0.150),
                Vec3::new(0.993, 0.906, 0.144),
            ],
        ));

        // Diverging map, the usual choice for conductivity changes around a reference frame
        self.register(ColorMap::new(
            "coolwarm",
            vec![
                Vec3::new(0.230, 0.299, 0.754),
                Vec3::new(0.552, 0.690, 0.996),
                Vec3::new(0.866, 0.866, 0.866),
                Vec3::new(0.956, 0.604, 0.486),
                Vec3::new(0.706, 0.016, 0.150),
            ],
        ));

        self.register(ColorMap::new(
            "jet",
            vec![
                Vec3::new(0.0, 0.0, 0.5),
                Vec3::new(0.0, 0.0, 1.0),
                Vec3::new(0.0, 1.0, 1.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(0.5, 0.0, 0.0),
            ],
        ));

        self.register(ColorMap::new(
            "blues",
            vec![
                Vec3::new(0.969, 0.984, 1.000),
                Vec3::new(0.776, 0.859, 0.937),
                Vec3::new(0.419, 0.682, 0.839),
                Vec3::new(0.129, 0.443, 0.710),
                Vec3::new(0.031, 0.188, 0.420),
            ],
        ));

        self.register(ColorMap::new(
            "reds",
            vec![
                Vec3::new(1.000, 0.961, 0.941),
                Vec3::new(0.988, 0.733, 0.631),
                Vec3::new(0.984, 0.416, 0.290),
                Vec3::new(0.796, 0.094, 0.114),
                Vec3::new(0.404, 0.000, 0.051),
            ],
        ));

        self.register(ColorMap::new("grays", vec![Vec3::ZERO, Vec3::ONE]));
    }

    /// Registers a color map, replacing any map with the same name.
    pub fn register(&mut self, color_map: ColorMap) {
        self.color_maps.insert(color_map.name.clone(), color_map);
    }

    /// Gets a color map by name.
    pub fn get(&self, name: &str) -> Option<&ColorMap> {
        self.color_maps.get(name)
    }

    /// Returns all color map names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.color_maps.keys().map(String::as_str)
    }
}

/// Maps impedance values onto a color map over a fixed value range.
///
/// Values below `min` or above `max` take the endpoint colors. The mapper holds
/// no mutable state, so one instance can recolor every live update.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorMapper {
    color_map: ColorMap,
    min: f32,
    max: f32,
    alpha: f32,
}

impl ColorMapper {
    /// Creates a mapper over `[min, max]`.
    pub fn new(color_map: ColorMap, min: f32, max: f32) -> Self {
        Self {
            color_map,
            min,
            max,
            alpha: 1.0,
        }
    }

    /// Sets the alpha channel of every mapped color.
    #[must_use]
    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha.clamp(0.0, 1.0);
        self
    }

    /// Lower end of the value range.
    pub fn min(&self) -> f32 {
        self.min
    }

    /// Upper end of the value range.
    pub fn max(&self) -> f32 {
        self.max
    }

    /// The underlying color map.
    pub fn color_map(&self) -> &ColorMap {
        &self.color_map
    }

    /// Maps a single impedance value to a color.
    pub fn map(&self, value: f32) -> Rgba {
        let range = self.max - self.min;
        let t = if range.abs() < 1e-10 {
            // Degenerate range: split at the single value
            if value > self.max {
                1.0
            } else {
                0.0
            }
        } else {
            (value - self.min) / range
        };
        self.color_map.sample(t).extend(self.alpha).to_array()
    }

    /// Maps every vertex value of a mesh.
    pub fn map_mesh(&self, mesh: &MeshBuffer) -> ColorTable {
        ColorTable::new(mesh.values().map(|v| self.map(v)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn grays() -> ColorMapper {
        let registry = ColorMapRegistry::new();
        ColorMapper::new(registry.get("grays").unwrap().clone(), 0.0, 10.0)
    }

    #[test]
    fn test_registry_defaults() {
        let registry = ColorMapRegistry::new();
        for name in ["viridis", "coolwarm", "jet", "blues", "reds", "grays"] {
            assert!(registry.get(name).is_some(), "missing color map {name}");
        }
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn test_sample_endpoints() {
        let registry = ColorMapRegistry::new();
        let viridis = registry.get("viridis").unwrap();
        assert_eq!(viridis.sample(0.0), viridis.colors[0]);
        assert_eq!(viridis.sample(1.0), *viridis.colors.last().unwrap());
        assert_eq!(viridis.sample(f32::NAN), viridis.colors[0]);
    }

    #[test]
    fn test_map_interpolates_inside_range() {
        let color = grays().map(5.0);
        assert!((color[0] - 0.5).abs() < 1e-6);
        assert_eq!(color[3], 1.0);
    }

    #[test]
    fn test_map_degenerate_range() {
        let registry = ColorMapRegistry::new();
        let mapper = ColorMapper::new(registry.get("grays").unwrap().clone(), 2.0, 2.0);
        assert_eq!(mapper.map(1.0), [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(mapper.map(3.0), [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_with_alpha() {
        let mapper = grays().with_alpha(0.5);
        assert_eq!(mapper.map(0.0)[3], 0.5);
    }

    proptest! {
        #[test]
        fn prop_map_is_deterministic(v in -100.0f32..100.0) {
            let mapper = grays();
            prop_assert_eq!(mapper.map(v), mapper.map(v));
        }

        #[test]
        fn prop_out_of_range_saturates(below in -1e6f32..0.0, above in 10.0f32..1e6) {
            let mapper = grays();
            prop_assert_eq!(mapper.map(below), mapper.map(0.0));
            prop_assert_eq!(mapper.map(above), mapper.map(10.0));
        }
    }
}
