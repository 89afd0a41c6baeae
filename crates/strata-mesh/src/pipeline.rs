//! Background meshing: a deduplicated work set feeding a worker pool, and a
//! bounded upload queue drained by the render thread.
//!
//! Workers never touch GPU state. Each task snapshots the chunk through the
//! [`ChunkManager`], meshes the snapshot, and hands the result to the upload
//! queue tagged with the chunk version it was built from. A chunk unloaded
//! between submission and meshing is simply skipped.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, SendTimeoutError, Sender};
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use strata_voxel::{BlockRegistry, ChunkManager, ChunkPos};

use crate::MeshError;
use crate::atlas::TextureAtlas;
use crate::mesher::{ChunkMesh, build_mesh};
use crate::neighborhood::ChunkSnapshot;

/// A finished mesh waiting for the render thread.
#[derive(Debug)]
pub struct MeshUpload {
    pub pos: ChunkPos,
    /// Chunk version the mesh was built from.
    pub version: u64,
    pub mesh: ChunkMesh,
}

/// Meshing pool settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MeshingConfig {
    /// Number of worker threads.
    pub threads: usize,
    /// Park timeout while the work set is empty.
    pub idle_backoff: Duration,
    /// How long [`MeshingPipeline::shutdown`] waits for workers to exit.
    pub shutdown_timeout: Duration,
    /// Finished meshes held before workers start backing off.
    pub upload_capacity: usize,
}

impl Default for MeshingConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            idle_backoff: Duration::from_millis(2),
            shutdown_timeout: Duration::from_secs(2),
            upload_capacity: 64,
        }
    }
}

/// Counters shared by all meshing workers.
#[derive(Debug, Default)]
pub struct MeshingStats {
    meshed: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    requeued: AtomicU64,
}

impl MeshingStats {
    /// Meshes handed to the upload queue.
    pub fn meshed(&self) -> u64 {
        self.meshed.load(Ordering::Relaxed)
    }

    /// Tasks dropped because the chunk was gone or not generated.
    pub fn skipped(&self) -> u64 {
        self.skipped.load(Ordering::Relaxed)
    }

    /// Tasks that panicked.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Tasks put back because the upload queue stayed full.
    pub fn requeued(&self) -> u64 {
        self.requeued.load(Ordering::Relaxed)
    }
}

/// Positions waiting to be meshed. Repeat submissions collapse.
#[derive(Debug, Default)]
struct WorkSet {
    pending: Mutex<FxHashSet<ChunkPos>>,
}

impl WorkSet {
    fn insert(&self, pos: ChunkPos) -> bool {
        self.pending.lock().insert(pos)
    }

    fn pop(&self) -> Option<ChunkPos> {
        let mut pending = self.pending.lock();
        let pos = pending.iter().next().copied()?;
        pending.remove(&pos);
        Some(pos)
    }

    fn len(&self) -> usize {
        self.pending.lock().len()
    }

    fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    fn clear(&self) {
        self.pending.lock().clear();
    }
}

/// Receiving end of the mesh hand-off. Cheap to clone.
#[derive(Clone, Debug)]
pub struct UploadQueue {
    receiver: Receiver<MeshUpload>,
}

impl UploadQueue {
    /// Takes up to `max` finished meshes without blocking.
    pub fn drain(&self, max: usize) -> Vec<MeshUpload> {
        self.receiver.try_iter().take(max).collect()
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Drops every pending upload, returning how many were released.
    pub fn clear(&self) -> usize {
        self.receiver.try_iter().count()
    }
}

struct WorkerContext {
    manager: Arc<ChunkManager>,
    registry: Arc<BlockRegistry>,
    atlas: Arc<dyn TextureAtlas>,
    work: Arc<WorkSet>,
    uploads: Sender<MeshUpload>,
    running: Arc<AtomicBool>,
    stats: Arc<MeshingStats>,
    idle_backoff: Duration,
}

/// A pool of meshing threads bound to one chunk manager.
pub struct MeshingPipeline {
    running: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
    work: Arc<WorkSet>,
    uploads: UploadQueue,
    stats: Arc<MeshingStats>,
    shutdown_timeout: Duration,
}

impl MeshingPipeline {
    /// Starts `config.threads` workers (named `chunk-mesh-N`).
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::Spawn`] if a thread cannot be started; any
    /// workers already running are stopped first.
    pub fn spawn(
        config: &MeshingConfig,
        manager: Arc<ChunkManager>,
        registry: Arc<BlockRegistry>,
        atlas: Arc<dyn TextureAtlas>,
    ) -> Result<Self, MeshError> {
        let running = Arc::new(AtomicBool::new(true));
        let stats = Arc::new(MeshingStats::default());
        let work = Arc::new(WorkSet::default());
        let (sender, receiver) = crossbeam_channel::bounded(config.upload_capacity.max(1));
        let mut pipeline = Self {
            running: Arc::clone(&running),
            workers: Vec::with_capacity(config.threads),
            work: Arc::clone(&work),
            uploads: UploadQueue { receiver },
            stats: Arc::clone(&stats),
            shutdown_timeout: config.shutdown_timeout,
        };

        for index in 0..config.threads.max(1) {
            let context = WorkerContext {
                manager: Arc::clone(&manager),
                registry: Arc::clone(&registry),
                atlas: Arc::clone(&atlas),
                work: Arc::clone(&work),
                uploads: sender.clone(),
                running: Arc::clone(&running),
                stats: Arc::clone(&stats),
                idle_backoff: config.idle_backoff,
            };
            let spawned = thread::Builder::new()
                .name(format!("chunk-mesh-{index}"))
                .spawn(move || worker_loop(context));
            match spawned {
                Ok(handle) => pipeline.workers.push(handle),
                Err(err) => {
                    pipeline.shutdown();
                    return Err(MeshError::Spawn(err));
                }
            }
        }

        tracing::info!("meshing pipeline started with {} workers", pipeline.workers.len());
        Ok(pipeline)
    }

    /// Schedules `pos` for meshing. Returns `false` if it was already
    /// pending or the pipeline has stopped.
    pub fn submit(&self, pos: ChunkPos) -> bool {
        if !self.is_running() {
            return false;
        }
        self.work.insert(pos)
    }

    /// Number of positions waiting for a worker.
    pub fn pending(&self) -> usize {
        self.work.len()
    }

    /// The render-side end of the hand-off.
    pub fn uploads(&self) -> &UploadQueue {
        &self.uploads
    }

    pub fn stats(&self) -> &Arc<MeshingStats> {
        &self.stats
    }

    /// Wakes idle workers so new submissions are picked up immediately.
    pub fn wake(&self) {
        for worker in &self.workers {
            worker.thread().unpark();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stops all workers, clears pending work, joins each thread within the
    /// configured timeout, then releases any meshes still waiting for upload.
    /// Idempotent.
    pub fn shutdown(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        self.running.store(false, Ordering::Release);
        self.work.clear();
        self.wake();

        let deadline = Instant::now() + self.shutdown_timeout;
        for worker in self.workers.drain(..) {
            while !worker.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(1));
            }
            if worker.is_finished() {
                if worker.join().is_err() {
                    tracing::error!("meshing worker exited with a panic");
                }
            } else {
                tracing::warn!(
                    "meshing worker {:?} did not stop within {:?}; detaching",
                    worker.thread().name(),
                    self.shutdown_timeout
                );
            }
        }
        let released = self.uploads.clear();
        tracing::info!("meshing pipeline stopped, released {released} pending meshes");
    }
}

impl Drop for MeshingPipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(context: WorkerContext) {
    while context.running.load(Ordering::Acquire) {
        let Some(pos) = context.work.pop() else {
            thread::park_timeout(context.idle_backoff);
            continue;
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| mesh_one(&context, pos)));
        match outcome {
            Ok(Some(upload)) => deliver(&context, upload),
            Ok(None) => {
                tracing::trace!("chunk {pos} not meshable, skipping");
                context.stats.skipped.fetch_add(1, Ordering::Relaxed);
            }
            Err(payload) => {
                tracing::error!("meshing of chunk {pos} panicked: {}", panic_message(payload.as_ref()));
                context.stats.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

fn mesh_one(context: &WorkerContext, pos: ChunkPos) -> Option<MeshUpload> {
    let started = Instant::now();
    let snapshot = ChunkSnapshot::capture(&context.manager, pos)?;
    let mesh = build_mesh(&snapshot, &context.registry, context.atlas.as_ref());
    tracing::trace!(
        "meshed chunk {pos} v{} ({} faces) in {:?}",
        snapshot.version(),
        mesh.face_count(),
        started.elapsed()
    );
    Some(MeshUpload {
        pos,
        version: snapshot.version(),
        mesh,
    })
}

fn deliver(context: &WorkerContext, mut upload: MeshUpload) {
    while context.running.load(Ordering::Acquire) {
        match context.uploads.send_timeout(upload, context.idle_backoff) {
            Ok(()) => {
                context.stats.meshed.fetch_add(1, Ordering::Relaxed);
                return;
            }
            Err(SendTimeoutError::Timeout(returned)) => {
                // Let other chunks through; this one is remeshed later.
                if !context.work.is_empty() {
                    context.work.insert(returned.pos);
                    context.stats.requeued.fetch_add(1, Ordering::Relaxed);
                    return;
                }
                upload = returned;
            }
            Err(SendTimeoutError::Disconnected(_)) => return,
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use strata_voxel::{ChunkData, ChunkLoadConfig};

    use super::*;
    use crate::atlas::GridAtlas;

    fn setup() -> (Arc<ChunkManager>, Arc<BlockRegistry>, Arc<dyn TextureAtlas>) {
        let config = ChunkLoadConfig {
            height_chunks: 1,
            ..ChunkLoadConfig::default()
        };
        let manager = Arc::new(ChunkManager::new(16, 8, config).unwrap());
        let registry = Arc::new(BlockRegistry::with_defaults());
        let atlas: Arc<dyn TextureAtlas> = Arc::new(GridAtlas::from_registry(&registry));
        (manager, registry, atlas)
    }

    fn populate(manager: &ChunkManager, registry: &BlockRegistry, pos: ChunkPos) {
        let stone = registry.lookup("stone").unwrap();
        let mut data = ChunkData::new(16);
        data.set(3, 3, 3, stone);
        manager.get_or_create_chunk(pos).write().populate(data);
    }

    fn wait_until(mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(10);
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        done()
    }

    #[test]
    fn test_submitted_chunk_reaches_upload_queue() {
        let (manager, registry, atlas) = setup();
        let pos = ChunkPos::new(2, 0, -1);
        populate(&manager, &registry, pos);

        let mut pipeline =
            MeshingPipeline::spawn(&MeshingConfig::default(), Arc::clone(&manager), registry, atlas).unwrap();
        assert!(pipeline.submit(pos));
        pipeline.wake();

        let mut uploads = Vec::new();
        assert!(wait_until(|| {
            uploads.extend(pipeline.uploads().drain(4));
            !uploads.is_empty()
        }));
        let upload = &uploads[0];
        assert_eq!(upload.pos, pos);
        assert_eq!(upload.version, manager.get_chunk(pos).unwrap().read().version());
        assert_eq!(upload.mesh.face_count(), 6);
        pipeline.shutdown();
    }

    #[test]
    fn test_ungenerated_and_missing_chunks_are_skipped() {
        let (manager, registry, atlas) = setup();
        manager.get_or_create_chunk(ChunkPos::new(0, 0, 0));

        let mut pipeline =
            MeshingPipeline::spawn(&MeshingConfig::default(), Arc::clone(&manager), registry, atlas).unwrap();
        pipeline.submit(ChunkPos::new(0, 0, 0));
        pipeline.submit(ChunkPos::new(40, 0, 40));
        pipeline.wake();

        assert!(wait_until(|| pipeline.stats().skipped() == 2));
        assert!(pipeline.uploads().is_empty());
        pipeline.shutdown();
    }

    #[test]
    fn test_repeat_submissions_collapse() {
        let work = WorkSet::default();
        let pos = ChunkPos::new(1, 0, 1);
        assert!(work.insert(pos));
        assert!(!work.insert(pos));
        assert!(work.insert(ChunkPos::new(2, 0, 1)));
        assert_eq!(work.len(), 2);

        let first = work.pop().unwrap();
        let second = work.pop().unwrap();
        assert_ne!(first, second);
        assert!(work.pop().is_none());
        assert!(work.is_empty());
    }

    #[test]
    fn test_full_upload_queue_backs_off() {
        let (manager, registry, atlas) = setup();
        let positions: Vec<ChunkPos> = (0..4).map(|x| ChunkPos::new(x, 0, 0)).collect();
        for &pos in &positions {
            populate(&manager, &registry, pos);
        }

        let config = MeshingConfig {
            upload_capacity: 1,
            ..MeshingConfig::default()
        };
        let mut pipeline = MeshingPipeline::spawn(&config, Arc::clone(&manager), registry, atlas).unwrap();
        for &pos in &positions {
            pipeline.submit(pos);
        }
        pipeline.wake();

        let mut seen = FxHashSet::default();
        assert!(wait_until(|| {
            for upload in pipeline.uploads().drain(1) {
                seen.insert(upload.pos);
            }
            seen.len() == positions.len()
        }));
        pipeline.shutdown();
    }

    #[test]
    fn test_shutdown_stops_accepting_work() {
        let (manager, registry, atlas) = setup();
        let pos = ChunkPos::new(0, 0, 0);
        populate(&manager, &registry, pos);

        let mut pipeline =
            MeshingPipeline::spawn(&MeshingConfig::default(), Arc::clone(&manager), registry, atlas).unwrap();
        pipeline.shutdown();
        assert!(!pipeline.is_running());
        assert!(!pipeline.submit(pos));
        pipeline.shutdown();
        assert_eq!(pipeline.stats().meshed(), 0);
    }
}
