//! Background terrain generation workers.
//!
//! Workers pull positions from the chunk manager's [`GenerationQueue`],
//! generate block data, install it into the chunk, link neighbours, run the
//! completion hook (lighting), and flag the neighbourhood for remeshing. A
//! worker idles with a short park timeout when the queue is empty.
//!
//! [`GenerationQueue`]: strata_voxel::GenerationQueue

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use strata_voxel::{ChunkManager, ChunkPos};

use crate::GenerationError;
use crate::generator::TerrainSource;

/// Called after a chunk has been populated and linked, before its
/// neighbourhood is flagged for remeshing.
pub type CompletionHook = Arc<dyn Fn(&ChunkManager, ChunkPos) + Send + Sync>;

/// Worker pool settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Number of worker threads.
    pub threads: usize,
    /// Park timeout while the queue is empty.
    pub idle_backoff: Duration,
    /// How long [`TerrainGenerator::shutdown`] waits for workers to exit.
    pub shutdown_timeout: Duration,
}

impl GeneratorConfig {
    /// Thread count derived from available cores, leaving headroom for the
    /// render and logic threads.
    pub fn with_defaults() -> Self {
        let cpus = num_cpus::get().max(2);
        Self {
            threads: (cpus - 2).clamp(1, 3),
            ..Self::default()
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            threads: 2,
            idle_backoff: Duration::from_millis(2),
            shutdown_timeout: Duration::from_secs(2),
        }
    }
}

/// Counters shared by all workers.
#[derive(Debug, Default)]
pub struct GenerationStats {
    generated: AtomicU64,
    failed: AtomicU64,
    evicted: AtomicU64,
}

impl GenerationStats {
    /// Chunks successfully generated.
    pub fn generated(&self) -> u64 {
        self.generated.load(Ordering::Relaxed)
    }

    /// Chunks whose generation returned an error or panicked.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Chunks unloaded before their data could be installed.
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }
}

struct WorkerContext {
    manager: Arc<ChunkManager>,
    source: Arc<dyn TerrainSource>,
    on_complete: Option<CompletionHook>,
    running: Arc<AtomicBool>,
    stats: Arc<GenerationStats>,
    idle_backoff: Duration,
}

/// A pool of terrain generation threads bound to one chunk manager.
pub struct TerrainGenerator {
    running: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
    stats: Arc<GenerationStats>,
    manager: Arc<ChunkManager>,
    shutdown_timeout: Duration,
}

impl TerrainGenerator {
    /// Starts `config.threads` workers (named `chunk-gen-N`).
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Spawn`] if a thread cannot be started; any
    /// workers already running are stopped first.
    pub fn spawn(
        config: &GeneratorConfig,
        manager: Arc<ChunkManager>,
        source: Arc<dyn TerrainSource>,
        on_complete: Option<CompletionHook>,
    ) -> Result<Self, GenerationError> {
        let running = Arc::new(AtomicBool::new(true));
        let stats = Arc::new(GenerationStats::default());
        let mut generator = Self {
            running: Arc::clone(&running),
            workers: Vec::with_capacity(config.threads),
            stats: Arc::clone(&stats),
            manager: Arc::clone(&manager),
            shutdown_timeout: config.shutdown_timeout,
        };

        for index in 0..config.threads.max(1) {
            let context = WorkerContext {
                manager: Arc::clone(&manager),
                source: Arc::clone(&source),
                on_complete: on_complete.clone(),
                running: Arc::clone(&running),
                stats: Arc::clone(&stats),
                idle_backoff: config.idle_backoff,
            };
            let spawned = thread::Builder::new()
                .name(format!("chunk-gen-{index}"))
                .spawn(move || worker_loop(context));
            match spawned {
                Ok(handle) => generator.workers.push(handle),
                Err(err) => {
                    generator.shutdown();
                    return Err(GenerationError::Spawn(err));
                }
            }
        }

        tracing::info!("terrain generator started with {} workers", generator.workers.len());
        Ok(generator)
    }

    /// Shared counters.
    pub fn stats(&self) -> &Arc<GenerationStats> {
        &self.stats
    }

    /// Wakes idle workers so new requests are picked up immediately.
    pub fn wake(&self) {
        for worker in &self.workers {
            worker.thread().unpark();
        }
    }

    /// Whether workers are still accepting work.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stops all workers, clears queued requests, and joins each thread,
    /// waiting at most the configured timeout in total. Idempotent.
    pub fn shutdown(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        self.running.store(false, Ordering::Release);
        self.manager.generation_queue().clear();
        self.wake();

        let deadline = Instant::now() + self.shutdown_timeout;
        for worker in self.workers.drain(..) {
            while !worker.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(1));
            }
            if worker.is_finished() {
                if worker.join().is_err() {
                    tracing::error!("terrain worker exited with a panic");
                }
            } else {
                tracing::warn!(
                    "terrain worker {:?} did not stop within {:?}; detaching",
                    worker.thread().name(),
                    self.shutdown_timeout
                );
            }
        }
        tracing::info!("terrain generator stopped");
    }
}

impl Drop for TerrainGenerator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(context: WorkerContext) {
    let queue = Arc::clone(context.manager.generation_queue());
    while context.running.load(Ordering::Acquire) {
        let Some(pos) = queue.pop() else {
            thread::park_timeout(context.idle_backoff);
            continue;
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| generate_one(&context, pos)));
        queue.finish(pos);

        match outcome {
            Ok(Ok(())) => {
                context.stats.generated.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Err(GenerationError::Evicted(pos))) => {
                tracing::trace!("chunk {pos} unloaded during generation");
                context.stats.evicted.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Err(err)) => {
                tracing::error!("generation of chunk {pos} failed: {err}");
                context.stats.failed.fetch_add(1, Ordering::Relaxed);
            }
            Err(payload) => {
                tracing::error!("generation of chunk {pos} panicked: {}", panic_message(payload.as_ref()));
                context.stats.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

fn generate_one(context: &WorkerContext, pos: ChunkPos) -> Result<(), GenerationError> {
    let manager = &context.manager;
    if !manager.contains(pos) {
        return Err(GenerationError::Evicted(pos));
    }

    let started = Instant::now();
    let data = context.source.generate(pos, manager.chunk_size())?;

    let handle = manager.get_chunk(pos).ok_or(GenerationError::Evicted(pos))?;
    handle.write().populate(data);
    drop(handle);

    manager.update_chunk_neighbors(pos);
    if let Some(hook) = &context.on_complete {
        hook(manager, pos);
    }
    manager.mark_neighbors_for_remesh(pos);

    tracing::trace!("generated chunk {pos} in {:?}", started.elapsed());
    Ok(())
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
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
    use std::sync::atomic::AtomicUsize;

    use strata_voxel::{BlockId, BlockRegistry, ChunkData, ChunkLoadConfig};

    use super::*;
    use crate::generator::{HeightmapTerrain, TerrainBlocks, TerrainConfig};

    fn manager() -> Arc<ChunkManager> {
        let config = ChunkLoadConfig {
            load_radius: 2,
            unload_buffer: 2,
            height_chunks: 2,
            ..ChunkLoadConfig::default()
        };
        Arc::new(ChunkManager::new(16, 8, config).unwrap())
    }

    fn heightmap_source() -> Arc<dyn TerrainSource> {
        let registry = BlockRegistry::with_defaults();
        let blocks = TerrainBlocks::from_registry(&registry).unwrap();
        Arc::new(HeightmapTerrain::new(TerrainConfig::default(), blocks))
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

    /// Fails on odd x, panics on x == 3, otherwise fills with stone.
    struct FlakySource;

    impl TerrainSource for FlakySource {
        fn generate(&self, pos: ChunkPos, size: usize) -> Result<ChunkData, GenerationError> {
            if pos.x == 3 {
                panic!("bad chunk");
            }
            if pos.x % 2 != 0 {
                return Err(GenerationError::Source(format!("odd column {}", pos.x)));
            }
            let mut data = ChunkData::new(size);
            data.fill(BlockId(1));
            Ok(data)
        }
    }

    #[test]
    fn test_generates_all_requested_chunks() {
        let manager = manager();
        let mut generator =
            TerrainGenerator::spawn(&GeneratorConfig::default(), Arc::clone(&manager), heightmap_source(), None)
                .unwrap();

        let positions: Vec<ChunkPos> = (0..4)
            .flat_map(|x| (0..2).map(move |y| ChunkPos::new(x, y, 0)))
            .collect();
        for &pos in &positions {
            manager.get_or_create_chunk(pos);
        }
        generator.wake();

        let all_generated = wait_until(|| {
            positions
                .iter()
                .all(|&pos| manager.get_chunk(pos).is_some_and(|c| c.read().is_generated()))
        });
        assert!(all_generated, "generated {} chunks", generator.stats().generated());
        generator.shutdown();
        assert!(!generator.is_running());
    }

    #[test]
    fn test_completion_links_and_flags_neighbors() {
        let manager = manager();
        let hook_calls = Arc::new(AtomicUsize::new(0));
        let calls = Arc::clone(&hook_calls);
        let hook: CompletionHook = Arc::new(move |_, _| {
            calls.fetch_add(1, Ordering::SeqCst);
        });

        let a = ChunkPos::new(0, 0, 0);
        let b = ChunkPos::new(1, 0, 0);
        manager.get_or_create_chunk(a);
        manager.get_or_create_chunk(b);

        let mut generator =
            TerrainGenerator::spawn(&GeneratorConfig::default(), Arc::clone(&manager), heightmap_source(), Some(hook))
                .unwrap();
        assert!(wait_until(|| generator.stats().generated() == 2));
        generator.shutdown();

        assert_eq!(hook_calls.load(Ordering::SeqCst), 2);
        assert!(manager.neighbor(a, strata_voxel::Direction::PosX).is_some());
        let dirty = manager.take_dirty_generated();
        assert!(dirty.contains(&a) && dirty.contains(&b));
    }

    #[test]
    fn test_failures_do_not_kill_workers() {
        let manager = manager();
        let config = GeneratorConfig {
            threads: 1,
            ..GeneratorConfig::default()
        };
        let mut generator = TerrainGenerator::spawn(&config, Arc::clone(&manager), Arc::new(FlakySource), None).unwrap();

        for x in 0..6 {
            manager.get_or_create_chunk(ChunkPos::new(x, 0, 0));
        }
        // x = 0, 2, 4 succeed; 1 and 5 fail; 3 panics
        assert!(wait_until(|| generator.stats().generated() == 3 && generator.stats().failed() == 3));

        let failed = manager.get_chunk(ChunkPos::new(3, 0, 0)).unwrap();
        assert!(!failed.read().is_generated());
        assert!(!manager.generation_queue().is_pending(ChunkPos::new(3, 0, 0)));
        generator.shutdown();
    }

    #[test]
    fn test_evicted_chunk_is_skipped() {
        let manager = manager();
        let pos = ChunkPos::new(9, 0, 9);
        manager.get_or_create_chunk(pos);
        // Simulate unload racing a dequeue: the position is handed out but the chunk is gone.
        let queue = Arc::clone(manager.generation_queue());
        let popped = queue.pop().unwrap();
        manager.remove_chunk(pos);
        queue.finish(popped);
        queue.request(popped, 0);

        let mut generator =
            TerrainGenerator::spawn(&GeneratorConfig::default(), Arc::clone(&manager), heightmap_source(), None)
                .unwrap();
        assert!(wait_until(|| generator.stats().evicted() == 1));
        assert!(!manager.contains(pos));
        generator.shutdown();
    }

    #[test]
    fn test_shutdown_is_idempotent_and_clears_queue() {
        let manager = manager();
        let mut generator = TerrainGenerator::spawn(
            &GeneratorConfig {
                threads: 2,
                idle_backoff: Duration::from_millis(50),
                shutdown_timeout: Duration::from_secs(1),
            },
            Arc::clone(&manager),
            heightmap_source(),
            None,
        )
        .unwrap();
        generator.shutdown();
        for x in 0..20 {
            manager.get_or_create_chunk(ChunkPos::new(x, 0, 0));
        }
        generator.shutdown();
        assert_eq!(generator.stats().generated(), 0);
    }
}
