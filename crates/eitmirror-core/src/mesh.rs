//! Decoded impedance mesh.

use glam::{Vec2, Vec3};

use crate::error::{DecodeError, DecodeResult};
use crate::geometry::Bounds;
use crate::layout::{self, VertexLayout};

/// A mesh vertex: position plus the impedance value measured or reconstructed there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Position in mesh space (z is zero for two-dimensional layouts).
    pub position: Vec3,
    /// Impedance value.
    pub value: f32,
}

impl Vertex {
    /// Creates a vertex.
    pub const fn new(position: Vec3, value: f32) -> Self {
        Self { position, value }
    }

    /// Position projected onto the drawing plane.
    pub fn planar(&self) -> Vec2 {
        self.position.truncate()
    }
}

/// Ordered vertices of the impedance mesh.
///
/// Every three consecutive vertices form one triangle. The vertex count is fixed
/// when the buffer is decoded; updates must carry exactly the same number of
/// records.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshBuffer {
    layout: VertexLayout,
    vertices: Vec<Vertex>,
}

impl MeshBuffer {
    /// Decodes a vertices payload.
    ///
    /// Fails with [`DecodeError::TruncatedBuffer`] when the payload is not a whole
    /// number of records and with [`DecodeError::EmptyBuffer`] when it holds none.
    pub fn decode(bytes: &[u8], layout: VertexLayout) -> DecodeResult<Self> {
        let vertices = decode_vertices(bytes, layout)?;
        if vertices.is_empty() {
            return Err(DecodeError::EmptyBuffer);
        }
        Ok(Self { layout, vertices })
    }

    /// Creates a mesh with no vertices.
    pub fn empty(layout: VertexLayout) -> Self {
        Self {
            layout,
            vertices: Vec::new(),
        }
    }

    /// Creates a mesh from already decoded vertices.
    pub fn from_vertices(layout: VertexLayout, vertices: Vec<Vertex>) -> Self {
        Self { layout, vertices }
    }

    /// Decodes an update payload and checks it against the expected record count.
    ///
    /// This is the decode half of [`apply_update`](Self::apply_update); it touches
    /// no existing state so it can run away from the render thread.
    pub fn decode_update(
        bytes: &[u8],
        layout: VertexLayout,
        expected: usize,
    ) -> DecodeResult<Vec<Vertex>> {
        let vertices = decode_vertices(bytes, layout)?;
        if vertices.len() != expected {
            return Err(DecodeError::CountMismatch {
                expected,
                actual: vertices.len(),
            });
        }
        Ok(vertices)
    }

    /// Replaces all vertices with the contents of an update payload.
    ///
    /// On error the buffer is left untouched.
    pub fn apply_update(&mut self, bytes: &[u8]) -> DecodeResult<()> {
        self.vertices = Self::decode_update(bytes, self.layout, self.vertices.len())?;
        Ok(())
    }

    /// Number of vertices.
    pub fn count(&self) -> usize {
        self.vertices.len()
    }

    /// Returns true if the mesh has no vertices.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Record layout this mesh was decoded with.
    pub fn layout(&self) -> VertexLayout {
        self.layout
    }

    /// The vertices in drawing order.
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Iterates the impedance values in drawing order.
    pub fn values(&self) -> impl Iterator<Item = f32> + '_ {
        self.vertices.iter().map(|v| v.value)
    }

    /// Planar positions in drawing order.
    pub fn planar_positions(&self) -> Vec<[f32; 2]> {
        self.vertices.iter().map(|v| v.planar().to_array()).collect()
    }

    /// Bounding box of the planar positions, or `None` for an empty mesh.
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(self.vertices.iter().map(Vertex::planar))
    }

    /// Number of vertices that belong to complete triangles.
    pub fn triangle_vertex_count(&self) -> usize {
        self.vertices.len() - self.vertices.len() % 3
    }
}

fn decode_vertices(bytes: &[u8], layout: VertexLayout) -> DecodeResult<Vec<Vertex>> {
    let dims = layout.dimensions.count();
    let order = layout.byte_order;

    let vertices = layout::records(bytes, layout.stride())?
        .map(|record| {
            let mut position = Vec3::ZERO;
            for axis in 0..dims {
                position[axis] = layout::field(record, axis, order);
            }
            Vertex::new(position, layout::field(record, dims, order))
        })
        .collect();

    Ok(vertices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{ByteOrder, Dimensions};
    use proptest::prelude::*;

    fn encode(records: &[[f32; 3]], order: ByteOrder) -> Vec<u8> {
        records
            .iter()
            .flat_map(|r| r.iter().flat_map(move |&f| order.write_f32(f)))
            .collect()
    }

    #[test]
    fn test_decode_two_dimensional_records() {
        let bytes = encode(&[[0.0, 1.0, 5.0], [2.0, 3.0, 7.5]], ByteOrder::Little);
        let mesh = MeshBuffer::decode(&bytes, VertexLayout::default()).unwrap();

        assert_eq!(mesh.count(), 2);
        assert_eq!(mesh.vertices()[1].position, Vec3::new(2.0, 3.0, 0.0));
        assert_eq!(mesh.values().collect::<Vec<_>>(), vec![5.0, 7.5]);
    }

    #[test]
    fn test_decode_three_dimensional_big_endian() {
        let layout = VertexLayout::new(Dimensions::Three, ByteOrder::Big);
        let bytes: Vec<u8> = [1.0f32, 2.0, 3.0, 4.0]
            .iter()
            .flat_map(|&f| f.to_be_bytes())
            .collect();
        let mesh = MeshBuffer::decode(&bytes, layout).unwrap();

        assert_eq!(mesh.count(), 1);
        assert_eq!(mesh.vertices()[0].position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(mesh.vertices()[0].value, 4.0);
    }

    #[test]
    fn test_decode_empty_buffer() {
        assert_eq!(
            MeshBuffer::decode(&[], VertexLayout::default()),
            Err(DecodeError::EmptyBuffer)
        );
    }

    #[test]
    fn test_apply_update_count_mismatch_keeps_mesh() {
        let initial = encode(&[[0.0, 0.0, 1.0]; 10], ByteOrder::Little);
        let mut mesh = MeshBuffer::decode(&initial, VertexLayout::default()).unwrap();
        let before = mesh.clone();

        let short = encode(&[[9.0, 9.0, 9.0]; 9], ByteOrder::Little);
        assert_eq!(
            mesh.apply_update(&short),
            Err(DecodeError::CountMismatch {
                expected: 10,
                actual: 9
            })
        );
        assert_eq!(mesh, before);

        let truncated = &initial[..initial.len() - 1];
        assert!(matches!(
            mesh.apply_update(truncated),
            Err(DecodeError::TruncatedBuffer { .. })
        ));
        assert_eq!(mesh, before);
    }

    #[test]
    fn test_apply_update_replaces_values() {
        let initial = encode(&[[0.0, 0.0, 1.0]; 10], ByteOrder::Little);
        let mut mesh = MeshBuffer::decode(&initial, VertexLayout::default()).unwrap();

        let zeros = vec![0u8; 10 * 12];
        mesh.apply_update(&zeros).unwrap();
        assert_eq!(mesh.count(), 10);
        assert!(mesh.values().all(|v| v == 0.0));
    }

    #[test]
    fn test_bounds_and_triangles() {
        let bytes = encode(
            &[
                [-1.0, 0.0, 0.0],
                [3.0, 2.0, 0.0],
                [0.0, -2.0, 0.0],
                [0.5, 0.5, 0.0],
            ],
            ByteOrder::Little,
        );
        let mesh = MeshBuffer::decode(&bytes, VertexLayout::default()).unwrap();
        let bounds = mesh.bounds().unwrap();

        assert_eq!(bounds.min, Vec2::new(-1.0, -2.0));
        assert_eq!(bounds.max, Vec2::new(3.0, 2.0));
        assert_eq!(mesh.triangle_vertex_count(), 3);
        assert!(MeshBuffer::empty(VertexLayout::default()).bounds().is_none());
    }

    proptest! {
        #[test]
        fn prop_whole_records_decode(records in 1usize..64) {
            let bytes = vec![0u8; records * 12];
            let mesh = MeshBuffer::decode(&bytes, VertexLayout::default()).unwrap();
            prop_assert_eq!(mesh.count(), bytes.len() / 12);
        }

        #[test]
        fn prop_partial_records_are_truncated(records in 0usize..64, extra in 1usize..12) {
            let bytes = vec![0u8; records * 12 + extra];
            let result = MeshBuffer::decode(&bytes, VertexLayout::default());
            prop_assert_eq!(
                result,
                Err(DecodeError::TruncatedBuffer { len: bytes.len(), stride: 12 })
            );
        }
    }
}
