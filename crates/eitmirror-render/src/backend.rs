//! The seam between the renderer and a graphics API.

use eitmirror_core::{FitTransform, Rect, Rgba, Vec2};

use crate::error::RenderResult;

/// A mesh draw: the first `vertex_count` vertices as a triangle list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshDraw {
    /// Host rect the draw is clipped to.
    pub clip: Rect,
    /// Mesh-space to host-space transform.
    pub transform: FitTransform,
    /// Number of vertices drawn (a multiple of three).
    pub vertex_count: u32,
}

/// A batch of line segments already in host coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineDraw<'a> {
    /// Host rect the draw is clipped to.
    pub clip: Rect,
    /// Segment endpoints.
    pub segments: &'a [[Vec2; 2]],
    /// Line color.
    pub color: Rgba,
}

/// GPU operations the [`ImpedanceRenderer`](crate::ImpedanceRenderer) needs.
///
/// A backend hands out one `Mesh` per renderer. The renderer creates it on the first
/// draw, writes positions and colors into it only when they changed, and gives it
/// back through [`release_mesh`](Self::release_mesh) when it is dropped.
pub trait RenderBackend {
    /// GPU-resident storage for one mesh.
    type Mesh;

    /// Allocates storage for `vertex_count` positions and colors.
    fn create_mesh(&mut self, vertex_count: usize) -> RenderResult<Self::Mesh>;

    /// Overwrites the planar positions of a mesh.
    fn upload_positions(&mut self, mesh: &mut Self::Mesh, positions: &[[f32; 2]]);

    /// Overwrites the per-vertex colors of a mesh.
    fn upload_colors(&mut self, mesh: &mut Self::Mesh, colors: &[Rgba]);

    /// Draws a mesh.
    fn draw_mesh(&mut self, mesh: &Self::Mesh, draw: &MeshDraw);

    /// Draws line segments.
    fn draw_lines(&mut self, lines: &LineDraw<'_>);

    /// Frees a mesh's storage.
    fn release_mesh(&mut self, mesh: Self::Mesh);
}
