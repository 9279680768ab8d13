//! A backend that records calls instead of talking to a GPU.

use std::sync::{Arc, Mutex, PoisonError};

use eitmirror_core::{Rect, Rgba, Vec2};

use crate::backend::{LineDraw, MeshDraw, RenderBackend};
use crate::error::{RenderError, RenderResult};

/// A recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    CreateMesh { id: usize, vertex_count: usize },
    UploadPositions { id: usize, positions: Vec<[f32; 2]> },
    UploadColors { id: usize, colors: Vec<Rgba> },
    DrawMesh { id: usize, draw: MeshDraw },
    DrawLines { clip: Rect, segments: Vec<[Vec2; 2]>, color: Rgba },
    ReleaseMesh { id: usize },
}

impl DrawCommand {
    /// Returns true for calls that put pixels on screen.
    pub fn is_draw(&self) -> bool {
        matches!(self, Self::DrawMesh { .. } | Self::DrawLines { .. })
    }
}

/// Shared, cloneable view of the commands recorded by a [`RecordingBackend`].
///
/// The log outlives the backend, so tests can check what happened on teardown.
#[derive(Debug, Clone, Default)]
pub struct CommandLog {
    commands: Arc<Mutex<Vec<DrawCommand>>>,
}

impl CommandLog {
    fn push(&self, command: DrawCommand) {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(command);
    }

    /// Copy of all commands recorded so far.
    pub fn snapshot(&self) -> Vec<DrawCommand> {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Removes all recorded commands.
    pub fn clear(&self) {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of recorded commands.
    pub fn len(&self) -> usize {
        self.commands
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of recorded draw calls.
    pub fn draw_count(&self) -> usize {
        self.snapshot().iter().filter(|c| c.is_draw()).count()
    }
}

/// Mesh handle of the [`RecordingBackend`], holding the last uploaded data.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedMesh {
    pub id: usize,
    pub vertex_count: usize,
    pub positions: Vec<[f32; 2]>,
    pub colors: Vec<Rgba>,
}

/// Backend that appends every call to a [`CommandLog`].
#[derive(Debug, Default)]
pub struct RecordingBackend {
    log: CommandLog,
    next_id: usize,
    live_meshes: usize,
    failed_allocations: usize,
    fail_create: bool,
}

impl RecordingBackend {
    /// Creates a backend with an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent [`create_mesh`](RenderBackend::create_mesh) fail.
    #[must_use]
    pub fn failing_allocation(mut self) -> Self {
        self.fail_create = true;
        self
    }

    /// The shared command log.
    pub fn log(&self) -> CommandLog {
        self.log.clone()
    }

    /// Number of meshes created and not yet released.
    pub fn live_meshes(&self) -> usize {
        self.live_meshes
    }

    /// Number of `create_mesh` calls that failed.
    pub fn failed_allocations(&self) -> usize {
        self.failed_allocations
    }
}

impl RenderBackend for RecordingBackend {
    type Mesh = RecordedMesh;

    fn create_mesh(&mut self, vertex_count: usize) -> RenderResult<RecordedMesh> {
        if self.fail_create {
            self.failed_allocations += 1;
            return Err(RenderError::BufferCreationFailed(
                "allocation disabled".to_string(),
            ));
        }
        let id = self.next_id;
        self.next_id += 1;
        self.live_meshes += 1;
        self.log.push(DrawCommand::CreateMesh { id, vertex_count });
        Ok(RecordedMesh {
            id,
            vertex_count,
            positions: Vec::new(),
            colors: Vec::new(),
        })
    }

    fn upload_positions(&mut self, mesh: &mut RecordedMesh, positions: &[[f32; 2]]) {
        mesh.positions = positions.to_vec();
        self.log.push(DrawCommand::UploadPositions {
            id: mesh.id,
            positions: mesh.positions.clone(),
        });
    }

    fn upload_colors(&mut self, mesh: &mut RecordedMesh, colors: &[Rgba]) {
        mesh.colors = colors.to_vec();
        self.log.push(DrawCommand::UploadColors {
            id: mesh.id,
            colors: mesh.colors.clone(),
        });
    }

    fn draw_mesh(&mut self, mesh: &RecordedMesh, draw: &MeshDraw) {
        self.log.push(DrawCommand::DrawMesh {
            id: mesh.id,
            draw: *draw,
        });
    }

    fn draw_lines(&mut self, lines: &LineDraw<'_>) {
        self.log.push(DrawCommand::DrawLines {
            clip: lines.clip,
            segments: lines.segments.to_vec(),
            color: lines.color,
        });
    }

    fn release_mesh(&mut self, mesh: RecordedMesh) {
        self.live_meshes = self.live_meshes.saturating_sub(1);
        self.log.push(DrawCommand::ReleaseMesh { id: mesh.id });
    }
}
