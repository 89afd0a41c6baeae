//! The render-thread side of the chunk pipeline.
//!
//! Each frame the [`ChunkRenderer`] requests remeshes for dirty chunks,
//! installs a bounded number of finished meshes, drops meshes whose chunk has
//! been unloaded, culls by region distance and then per-chunk frustum sphere,
//! and draws what is left front to back. All backend calls happen here.

use glam::Vec3;
use rustc_hash::FxHashMap;
use strata_mesh::{MeshUpload, MeshingPipeline, UploadQueue, VERTEX_STRIDE};
use strata_voxel::{ChunkManager, ChunkPos};

use crate::RenderError;
use crate::backend::RenderBackend;
use crate::frustum::ViewVolume;

/// Renderer settings.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderConfig {
    /// World-space distance beyond which nothing is drawn.
    pub render_distance: f32,
    /// Mesh uploads installed per frame.
    pub uploads_per_frame: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            render_distance: 256.0,
            uploads_per_frame: 4,
        }
    }
}

/// Counters for one rendered frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub remesh_requests: usize,
    pub uploads: usize,
    /// Uploads dropped because a newer mesh was resident or the chunk was gone.
    pub stale_uploads: usize,
    pub failed_uploads: usize,
    pub pruned: usize,
    pub regions_tested: usize,
    pub regions_visible: usize,
    pub chunks_tested: usize,
    pub chunks_visible: usize,
    pub draw_calls: usize,
    pub triangles: usize,
}

/// What happened to one upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadOutcome {
    Installed,
    /// The chunk has been unloaded or a newer version is resident.
    Stale,
    Failed,
}

struct ResidentMesh<M> {
    version: u64,
    /// `None` for chunks whose mesh is empty.
    gpu: Option<M>,
    vertex_count: usize,
}

/// Owns every resident chunk mesh and drives the backend.
pub struct ChunkRenderer<B: RenderBackend> {
    backend: B,
    config: RenderConfig,
    meshes: FxHashMap<ChunkPos, ResidentMesh<B::Mesh>>,
}

impl<B: RenderBackend> ChunkRenderer<B> {
    /// # Errors
    ///
    /// Returns [`RenderError::LayoutMismatch`] if the backend's vertex stride
    /// differs from the mesher's.
    pub fn new(backend: B, config: RenderConfig) -> Result<Self, RenderError> {
        let found = backend.vertex_stride();
        if found != VERTEX_STRIDE as u64 {
            return Err(RenderError::LayoutMismatch {
                expected: VERTEX_STRIDE as u64,
                found,
            });
        }
        Ok(Self {
            backend,
            config,
            meshes: FxHashMap::default(),
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Number of chunks with an installed mesh, empty meshes included.
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Version of the mesh installed for `pos`.
    pub fn resident_version(&self, pos: ChunkPos) -> Option<u64> {
        self.meshes.get(&pos).map(|mesh| mesh.version)
    }

    /// Runs one frame.
    pub fn render_frame(
        &mut self,
        manager: &ChunkManager,
        meshing: &MeshingPipeline,
        view: &dyn ViewVolume,
    ) -> FrameStats {
        let mut stats = FrameStats {
            remesh_requests: request_remeshes(manager, meshing),
            ..FrameStats::default()
        };
        self.drain_uploads(manager, meshing.uploads(), &mut stats);
        stats.pruned = self.prune(manager);
        self.draw_visible(manager, view, &mut stats);
        stats
    }

    /// Installs up to `uploads_per_frame` meshes from `uploads`.
    pub fn drain_uploads(&mut self, manager: &ChunkManager, uploads: &UploadQueue, stats: &mut FrameStats) {
        for upload in uploads.drain(self.config.uploads_per_frame) {
            match self.install(manager, upload) {
                UploadOutcome::Installed => stats.uploads += 1,
                UploadOutcome::Stale => stats.stale_uploads += 1,
                UploadOutcome::Failed => stats.failed_uploads += 1,
            }
        }
    }

    /// Uploads one finished mesh, replacing an older one for the same chunk.
    /// A mesh whose version is not newer than the resident one is stale: the
    /// chunk version moves on every change to mesh inputs, so two builds of
    /// one version saw the same data. The CPU-side vertex buffer is dropped
    /// before returning.
    pub fn install(&mut self, manager: &ChunkManager, upload: MeshUpload) -> UploadOutcome {
        let MeshUpload { pos, version, mesh } = upload;
        if !manager.contains(pos) {
            return UploadOutcome::Stale;
        }
        if self.meshes.get(&pos).is_some_and(|resident| resident.version >= version) {
            tracing::trace!("dropping stale mesh for {pos} (v{version})");
            return UploadOutcome::Stale;
        }
        if !mesh.is_well_formed() {
            tracing::error!("{}", RenderError::MalformedMesh(pos));
            return UploadOutcome::Failed;
        }

        let gpu = if mesh.is_empty() {
            None
        } else {
            match self.backend.upload(pos, &mesh) {
                Ok(gpu) => Some(gpu),
                Err(err) => {
                    tracing::warn!("{err}");
                    return UploadOutcome::Failed;
                }
            }
        };
        let vertex_count = mesh.vertex_count();
        drop(mesh);

        let replaced = self.meshes.insert(
            pos,
            ResidentMesh {
                version,
                gpu,
                vertex_count,
            },
        );
        if let Some(old) = replaced.and_then(|old| old.gpu) {
            self.backend.release(old);
        }
        UploadOutcome::Installed
    }

    /// Releases meshes whose chunk is no longer loaded. Returns how many.
    pub fn prune(&mut self, manager: &ChunkManager) -> usize {
        let gone: Vec<ChunkPos> = self.meshes.keys().copied().filter(|pos| !manager.contains(*pos)).collect();
        for pos in &gone {
            if let Some(gpu) = self.meshes.remove(pos).and_then(|mesh| mesh.gpu) {
                self.backend.release(gpu);
            }
        }
        gone.len()
    }

    /// Releases every resident mesh.
    pub fn release_all(&mut self) {
        for (_, mesh) in self.meshes.drain() {
            if let Some(gpu) = mesh.gpu {
                self.backend.release(gpu);
            }
        }
    }

    fn draw_visible(&mut self, manager: &ChunkManager, view: &dyn ViewVolume, stats: &mut FrameStats) {
        let eye = view.position();
        let distance = self.config.render_distance;
        let size = manager.chunk_size() as f32;
        let radius = size * 3f32.sqrt() * 0.5;

        stats.regions_tested = manager.region_count();
        let mut visible: Vec<(f32, ChunkPos)> = Vec::new();
        let (mut tested, mut in_view) = (0, 0);
        let regions_visible = manager.for_each_visible_region(eye, distance, |region| {
            for &pos in region.chunks() {
                tested += 1;
                let origin = pos.world_origin(manager.chunk_size());
                let center = Vec3::new(origin.x as f32, origin.y as f32, origin.z as f32) + Vec3::splat(size * 0.5);
                if !view.is_sphere_visible_within(center, radius, distance) {
                    continue;
                }
                in_view += 1;
                visible.push((center.distance_squared(eye), pos));
            }
        });
        stats.regions_visible = regions_visible;
        stats.chunks_tested += tested;
        stats.chunks_visible += in_view;
        visible.sort_by(|a, b| a.0.total_cmp(&b.0));

        for (_, pos) in visible {
            let Some(mesh) = self.meshes.get(&pos) else {
                continue;
            };
            let Some(gpu) = &mesh.gpu else {
                continue;
            };
            self.backend.draw(gpu);
            stats.draw_calls += 1;
            stats.triangles += mesh.vertex_count / 3;
        }
    }
}

impl<B: RenderBackend> Drop for ChunkRenderer<B> {
    fn drop(&mut self) {
        self.release_all();
    }
}

/// Hands every dirty generated chunk to the meshing pipeline.
fn request_remeshes(manager: &ChunkManager, meshing: &MeshingPipeline) -> usize {
    let dirty = manager.take_dirty_generated();
    let mut submitted = 0;
    for pos in dirty {
        if meshing.submit(pos) {
            submitted += 1;
        }
    }
    if submitted > 0 {
        meshing.wake();
    }
    submitted
}
