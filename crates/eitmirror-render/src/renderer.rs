//! The impedance mesh renderer.
//!
//! The renderer keeps the accepted scene (mesh, colors, electrodes) behind a mutex
//! shared with any number of [`UpdateHandle`]s. Updates decode and recolor outside
//! the lock and only swap `Arc` snapshots while holding it. Drawing picks up the
//! newest snapshot with `try_lock`, so the render thread never waits on an update:
//! if a swap is in progress the previous snapshot is drawn and the new one is
//! picked up on the next frame.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError, Weak};

use eitmirror_core::{
    Bounds, ColorMapRegistry, ColorMapper, ColorSource, ColorTable, DecodeError, DecodeResult,
    ElectrodeRing, ElectrodesConfig, FitTransform, MeshBuffer, Rect, RendererOptions,
};

use crate::backend::{LineDraw, MeshDraw, RenderBackend};
use crate::error::{ConstructionError, UpdateError};

/// Accepted scene data. Replaced wholesale on every accepted update.
#[derive(Debug)]
struct Scene {
    mesh: Arc<MeshBuffer>,
    bounds: Option<Bounds>,
    colors: Arc<ColorTable>,
    electrodes: Option<ElectrodesConfig>,
    mesh_revision: u64,
    color_revision: u64,
}

/// State shared between a renderer and its update handles.
#[derive(Debug)]
struct SharedScene {
    count: usize,
    options: RendererOptions,
    mapper: ColorMapper,
    scene: Mutex<Scene>,
}

impl SharedScene {
    fn lock(&self) -> MutexGuard<'_, Scene> {
        // Every write is a complete field swap, so a poisoned scene is still consistent
        self.scene.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply_vertex_update(&self, bytes: &[u8]) -> DecodeResult<()> {
        let layout = self.options.vertex_layout;
        let vertices = MeshBuffer::decode_update(bytes, layout, self.count)?;
        let mesh = Arc::new(MeshBuffer::from_vertices(layout, vertices));
        let bounds = mesh.bounds();
        let colors = match self.options.color_source {
            ColorSource::Mapped => Some(Arc::new(self.mapper.map_mesh(&mesh))),
            ColorSource::Host => None,
        };

        let mut scene = self.lock();
        scene.mesh = mesh;
        scene.bounds = bounds;
        scene.mesh_revision += 1;
        if let Some(colors) = colors {
            scene.colors = colors;
            scene.color_revision += 1;
        }
        log::debug!("accepted vertex update (revision {})", scene.mesh_revision);
        Ok(())
    }

    fn apply_color_update(&self, bytes: &[u8]) -> DecodeResult<()> {
        let colors = ColorTable::decode_update(
            bytes,
            self.options.color_format,
            self.options.vertex_layout.byte_order,
            self.count,
        )?;
        let colors = Arc::new(colors);

        let mut scene = self.lock();
        scene.colors = colors;
        scene.color_revision += 1;
        log::debug!("accepted color update (revision {})", scene.color_revision);
        Ok(())
    }

    fn set_electrodes(&self, config: ElectrodesConfig) {
        self.lock().electrodes = Some(config);
        log::debug!("electrodes configured: {} x {}", config.count, config.length);
    }
}

/// The render thread's copy of the scene and what has been uploaded from it.
struct FrameState {
    mesh: Arc<MeshBuffer>,
    bounds: Option<Bounds>,
    colors: Arc<ColorTable>,
    electrodes: Option<ElectrodesConfig>,
    mesh_revision: u64,
    color_revision: u64,
    uploaded_mesh_revision: Option<u64>,
    uploaded_color_revision: Option<u64>,
}

/// Draws an impedance mesh into a host rectangle and keeps it current with updates.
///
/// The vertex count is fixed at construction; every update must carry exactly that
/// many records or it is rejected and the displayed data stays as it was. GPU storage
/// is acquired from the backend on the first draw that has something to show and is
/// released when the renderer is dropped. If that acquisition fails it is not retried
/// and only the electrode overlay is drawn.
pub struct ImpedanceRenderer<B: RenderBackend> {
    shared: Arc<SharedScene>,
    backend: B,
    gpu_mesh: Option<B::Mesh>,
    allocation_failed: bool,
    frame: FrameState,
}

impl<B: RenderBackend> ImpedanceRenderer<B> {
    /// Creates a renderer from the initial vertices payload using the built-in color maps.
    ///
    /// An empty payload yields an empty renderer that draws nothing.
    pub fn new(
        backend: B,
        bytes: &[u8],
        options: RendererOptions,
    ) -> Result<Self, ConstructionError> {
        Self::with_color_maps(backend, bytes, options, &ColorMapRegistry::new())
    }

    /// Creates a renderer, looking the configured color map up in `color_maps`.
    pub fn with_color_maps(
        backend: B,
        bytes: &[u8],
        options: RendererOptions,
        color_maps: &ColorMapRegistry,
    ) -> Result<Self, ConstructionError> {
        let mesh = match MeshBuffer::decode(bytes, options.vertex_layout) {
            Ok(mesh) => mesh,
            Err(DecodeError::EmptyBuffer) => MeshBuffer::empty(options.vertex_layout),
            Err(e) => return Err(ConstructionError::InvalidMesh(e)),
        };

        let color_map = color_maps
            .get(&options.color_map)
            .cloned()
            .ok_or_else(|| ConstructionError::UnknownColorMap(options.color_map.clone()))?;
        let (min, max) = options.value_range.resolve(mesh.values());
        let mapper = ColorMapper::new(color_map, min, max).with_alpha(options.mesh_alpha);

        let count = mesh.count();
        let bounds = mesh.bounds();
        let mesh = Arc::new(mesh);
        let colors = Arc::new(mapper.map_mesh(&mesh));

        let frame = FrameState {
            mesh: Arc::clone(&mesh),
            bounds,
            colors: Arc::clone(&colors),
            electrodes: None,
            mesh_revision: 0,
            color_revision: 0,
            uploaded_mesh_revision: None,
            uploaded_color_revision: None,
        };

        let shared = Arc::new(SharedScene {
            count,
            options,
            mapper,
            scene: Mutex::new(Scene {
                mesh,
                bounds,
                colors,
                electrodes: None,
                mesh_revision: 0,
                color_revision: 0,
            }),
        });

        log::info!("impedance renderer created with {count} vertices");

        Ok(Self {
            shared,
            backend,
            gpu_mesh: None,
            allocation_failed: false,
            frame,
        })
    }

    /// Number of vertices of the accepted mesh.
    pub fn count(&self) -> usize {
        self.shared.count
    }

    /// Options the renderer was created with.
    pub fn options(&self) -> &RendererOptions {
        &self.shared.options
    }

    /// The color mapper used for mapped colors.
    pub fn color_mapper(&self) -> &ColorMapper {
        &self.shared.mapper
    }

    /// Latest accepted mesh.
    pub fn mesh(&self) -> Arc<MeshBuffer> {
        Arc::clone(&self.shared.lock().mesh)
    }

    /// Latest accepted colors.
    pub fn colors(&self) -> Arc<ColorTable> {
        Arc::clone(&self.shared.lock().colors)
    }

    /// Latest electrodes config, if any.
    pub fn electrodes(&self) -> Option<ElectrodesConfig> {
        self.shared.lock().electrodes
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The backend, mutably (e.g. to change the render target between frames).
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Returns true once GPU storage has been acquired.
    pub fn has_gpu_resources(&self) -> bool {
        self.gpu_mesh.is_some()
    }

    /// Returns a handle for applying updates from other threads.
    ///
    /// The handle does not keep the renderer alive.
    pub fn update_handle(&self) -> UpdateHandle {
        UpdateHandle {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Replaces the mesh with a vertices update payload.
    ///
    /// Fails with [`DecodeError::CountMismatch`] if the record count differs from
    /// [`count`](Self::count); the previous mesh is kept on any error.
    pub fn apply_vertex_update(&self, bytes: &[u8]) -> DecodeResult<()> {
        self.shared.apply_vertex_update(bytes).inspect_err(|e| {
            log::warn!("rejected vertex update: {e}");
        })
    }

    /// Replaces the colors with a color config or update payload.
    pub fn apply_color_update(&self, bytes: &[u8]) -> DecodeResult<()> {
        self.shared.apply_color_update(bytes).inspect_err(|e| {
            log::warn!("rejected color update: {e}");
        })
    }

    /// Sets the electrode ring drawn around the mesh.
    pub fn set_electrodes(&self, config: ElectrodesConfig) {
        self.shared.set_electrodes(config);
    }

    /// Draws the mesh fitted into `rect`.
    ///
    /// The mesh keeps its aspect ratio and is centered in the rect. Positions and
    /// colors are uploaded only if they changed since the last draw. A rect with
    /// zero or non-finite area draws nothing and leaves the renderer untouched.
    pub fn draw_in_rect(&mut self, rect: Rect) {
        if rect.is_degenerate() {
            return;
        }

        self.sync_scene();

        let Some(bounds) = self.frame.bounds else {
            return;
        };
        let transform = FitTransform::fit(&bounds, &rect);

        let vertex_count = self.frame.mesh.triangle_vertex_count();
        if vertex_count > 0 && self.upload_dirty() {
            if let Some(gpu_mesh) = &self.gpu_mesh {
                self.backend.draw_mesh(
                    gpu_mesh,
                    &MeshDraw {
                        clip: rect,
                        transform,
                        vertex_count: vertex_count as u32,
                    },
                );
            }
        }

        self.draw_electrodes(&bounds, &transform, rect);
    }

    /// Picks up the latest accepted scene without blocking.
    fn sync_scene(&mut self) {
        let scene = match self.shared.scene.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return,
        };

        if scene.mesh_revision != self.frame.mesh_revision {
            self.frame.mesh = Arc::clone(&scene.mesh);
            self.frame.bounds = scene.bounds;
            self.frame.mesh_revision = scene.mesh_revision;
        }
        if scene.color_revision != self.frame.color_revision {
            self.frame.colors = Arc::clone(&scene.colors);
            self.frame.color_revision = scene.color_revision;
        }
        self.frame.electrodes = scene.electrodes;
    }

    /// Acquires GPU storage if needed and uploads whatever changed.
    ///
    /// Returns false if the storage could not be acquired, now or on an earlier frame.
    fn upload_dirty(&mut self) -> bool {
        if self.gpu_mesh.is_none() {
            if self.allocation_failed {
                return false;
            }
            match self.backend.create_mesh(self.shared.count) {
                Ok(mesh) => {
                    log::debug!("acquired GPU mesh for {} vertices", self.shared.count);
                    self.gpu_mesh = Some(mesh);
                }
                Err(e) => {
                    log::warn!("failed to acquire GPU mesh, the mesh will not be drawn: {e}");
                    self.allocation_failed = true;
                    return false;
                }
            }
        }

        let Some(gpu_mesh) = self.gpu_mesh.as_mut() else {
            return false;
        };

        if self.frame.uploaded_mesh_revision != Some(self.frame.mesh_revision) {
            self.backend
                .upload_positions(gpu_mesh, &self.frame.mesh.planar_positions());
            self.frame.uploaded_mesh_revision = Some(self.frame.mesh_revision);
        }
        if self.frame.uploaded_color_revision != Some(self.frame.color_revision) {
            self.backend
                .upload_colors(gpu_mesh, self.frame.colors.as_slice());
            self.frame.uploaded_color_revision = Some(self.frame.color_revision);
        }
        true
    }

    fn draw_electrodes(&mut self, bounds: &Bounds, transform: &FitTransform, rect: Rect) {
        if !self.shared.options.show_electrodes {
            return;
        }
        let Some(config) = self.frame.electrodes else {
            return;
        };

        let ring = ElectrodeRing::new(&config, bounds);
        if ring.is_empty() {
            return;
        }
        let segments: Vec<_> = ring
            .segments()
            .iter()
            .map(|[a, b]| [transform.apply(*a), transform.apply(*b)])
            .collect();

        self.backend.draw_lines(&LineDraw {
            clip: rect,
            segments: &segments,
            color: self.shared.options.electrode_color,
        });
    }
}

impl<B: RenderBackend> Drop for ImpedanceRenderer<B> {
    fn drop(&mut self) {
        if let Some(mesh) = self.gpu_mesh.take() {
            self.backend.release_mesh(mesh);
            log::debug!("released GPU mesh");
        }
    }
}

/// Weak, cloneable handle for applying updates to a renderer from any thread.
///
/// Once the renderer is dropped every call fails with [`UpdateError::RendererDropped`],
/// which lets a pending network completion notice it has gone stale.
#[derive(Debug, Clone)]
pub struct UpdateHandle {
    shared: Weak<SharedScene>,
}

impl UpdateHandle {
    fn upgrade(&self) -> Result<Arc<SharedScene>, UpdateError> {
        self.shared.upgrade().ok_or(UpdateError::RendererDropped)
    }

    /// Returns true while the renderer exists.
    pub fn is_alive(&self) -> bool {
        self.shared.strong_count() > 0
    }

    /// Vertex count of the renderer, if it still exists.
    pub fn count(&self) -> Option<usize> {
        self.shared.upgrade().map(|shared| shared.count)
    }

    /// See [`ImpedanceRenderer::apply_vertex_update`].
    pub fn apply_vertex_update(&self, bytes: &[u8]) -> Result<(), UpdateError> {
        self.upgrade()?.apply_vertex_update(bytes).map_err(|e| {
            log::warn!("rejected vertex update: {e}");
            UpdateError::from(e)
        })
    }

    /// See [`ImpedanceRenderer::apply_color_update`].
    pub fn apply_color_update(&self, bytes: &[u8]) -> Result<(), UpdateError> {
        self.upgrade()?.apply_color_update(bytes).map_err(|e| {
            log::warn!("rejected color update: {e}");
            UpdateError::from(e)
        })
    }

    /// See [`ImpedanceRenderer::set_electrodes`].
    pub fn set_electrodes(&self, config: ElectrodesConfig) -> Result<(), UpdateError> {
        self.upgrade()?.set_electrodes(config);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{DrawCommand, RecordingBackend};

    fn triangle_bytes(value: f32) -> Vec<u8> {
        [[0.0f32, 0.0, value], [1.0, 0.0, value], [0.0, 1.0, value]]
            .iter()
            .flatten()
            .flat_map(|f| f.to_le_bytes())
            .collect()
    }

    fn triangle_renderer(backend: RecordingBackend) -> ImpedanceRenderer<RecordingBackend> {
        ImpedanceRenderer::new(backend, &triangle_bytes(1.0), RendererOptions::default()).unwrap()
    }

    #[test]
    fn test_gpu_mesh_acquired_on_first_draw() {
        let renderer = triangle_renderer(RecordingBackend::new());
        assert!(!renderer.has_gpu_resources());
        assert!(renderer.backend().log().is_empty());
    }

    #[test]
    fn test_unknown_color_map() {
        let options = RendererOptions {
            color_map: "nope".to_string(),
            ..RendererOptions::default()
        };
        let result = ImpedanceRenderer::new(RecordingBackend::new(), &triangle_bytes(1.0), options);
        assert!(matches!(result, Err(ConstructionError::UnknownColorMap(name)) if name == "nope"));
    }

    #[test]
    fn test_failed_allocation_skips_mesh_draw() {
        let mut renderer = triangle_renderer(RecordingBackend::new().failing_allocation());
        renderer.draw_in_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(!renderer.has_gpu_resources());
        assert_eq!(renderer.backend().log().draw_count(), 0);
    }

    #[test]
    fn test_failed_allocation_not_retried() {
        let mut renderer = triangle_renderer(RecordingBackend::new().failing_allocation());
        for _ in 0..3 {
            renderer.draw_in_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        }
        assert_eq!(renderer.backend().failed_allocations(), 1);
        assert!(!renderer.has_gpu_resources());
    }

    #[test]
    fn test_uploads_only_when_dirty() {
        let mut renderer = triangle_renderer(RecordingBackend::new());
        let log = renderer.backend().log();
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);

        renderer.draw_in_rect(rect);
        renderer.draw_in_rect(rect);
        renderer.apply_color_update(&[0u8; 3 * 16]).unwrap();
        renderer.draw_in_rect(rect);

        let uploads: Vec<_> = log
            .snapshot()
            .into_iter()
            .filter(|c| {
                matches!(
                    c,
                    DrawCommand::UploadPositions { .. } | DrawCommand::UploadColors { .. }
                )
            })
            .collect();
        // Initial positions and colors, then only the new colors
        assert_eq!(uploads.len(), 3);
        assert!(matches!(uploads[2], DrawCommand::UploadColors { .. }));
    }
}
