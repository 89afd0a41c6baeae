//! Per-chunk lighting passes and incremental updates after block edits.

use std::sync::Arc;

use parking_lot::Mutex;
use strata_voxel::{
    BlockId, BlockPos, BlockRegistry, ChunkData, ChunkManager, ChunkPos, Direction, LightChannel,
    LightVolume, MAX_LIGHT, MESH_DIRTY,
};

use crate::cross_chunk::{BorderLayer, face_coords, pull_in};
use crate::cursor::{ChunkCursor, LightNode};
use crate::propagation::{FloodBudget, FloodOutcome, flood, remove, retract, transfer};

/// Node budgets for the propagation passes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LightingConfig {
    /// Nodes each sky seed may visit while leaking sideways.
    pub sky_node_budget: usize,
    /// Nodes a whole block-light flood may visit.
    pub block_node_budget: usize,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            sky_node_budget: 1_000,
            block_node_budget: 10_000,
        }
    }
}

/// What a lighting pass touched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LightingReport {
    /// Chunks whose light changed, sorted.
    pub changed_chunks: Vec<ChunkPos>,
    /// Propagation nodes processed.
    pub nodes: usize,
    /// Whether a node budget cut a flood short.
    pub budget_exhausted: bool,
}

impl LightingReport {
    fn absorb(&mut self, outcome: FloodOutcome) {
        self.nodes += outcome.nodes;
        self.budget_exhausted |= outcome.exhausted;
    }

    fn finish(&mut self, cursor: ChunkCursor<'_>) {
        let mut changed: Vec<ChunkPos> = cursor.into_changed().into_iter().collect();
        changed.extend(self.changed_chunks.drain(..));
        changed.sort_by_key(|pos| (pos.x, pos.y, pos.z));
        changed.dedup();
        self.changed_chunks = changed;
    }

    fn merge(&mut self, other: LightingReport) {
        self.nodes += other.nodes;
        self.budget_exhausted |= other.budget_exhausted;
        self.changed_chunks.extend(other.changed_chunks);
        self.changed_chunks.sort_by_key(|pos| (pos.x, pos.y, pos.z));
        self.changed_chunks.dedup();
    }
}

/// Computes sky and block light for generated chunks.
///
/// Passes are serialized internally; a pass never holds more than one chunk
/// lock at a time.
pub struct LightingEngine {
    registry: Arc<BlockRegistry>,
    config: LightingConfig,
    pass: Mutex<()>,
}

impl LightingEngine {
    pub fn new(registry: Arc<BlockRegistry>, config: LightingConfig) -> Self {
        Self {
            registry,
            config,
            pass: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &LightingConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<BlockRegistry> {
        &self.registry
    }

    /// Lights a freshly generated chunk, then relights lit chunks below it
    /// while its bottom sky layer keeps changing.
    pub fn light_chunk(&self, manager: &ChunkManager, pos: ChunkPos) -> LightingReport {
        let _pass = self.pass.lock();
        let mut report = LightingReport::default();
        let mut current = pos;
        loop {
            let Some((pass, bottom_changed)) = self.light_single(manager, current) else {
                break;
            };
            report.merge(pass);
            if !bottom_changed || current.y == 0 {
                break;
            }
            let below = current.offset(Direction::NegY);
            let relight = manager
                .get_chunk(below)
                .is_some_and(|handle| {
                    let chunk = handle.read();
                    chunk.is_generated() && chunk.is_lit()
                });
            if !relight {
                break;
            }
            tracing::trace!("Sky changed above {}, relighting", below);
            current = below;
        }
        report
    }

    /// Returns the pass report and whether the bottom sky layer changed.
    fn light_single(&self, manager: &ChunkManager, pos: ChunkPos) -> Option<(LightingReport, bool)> {
        let handle = manager.get_chunk(pos)?;
        if !handle.read().is_generated() {
            tracing::trace!("Skipping lighting for ungenerated chunk {}", pos);
            return None;
        }
        let registry = self.registry.as_ref();
        let mut report = LightingReport {
            changed_chunks: vec![pos],
            ..LightingReport::default()
        };
        let mut cursor = ChunkCursor::new(manager);

        // Light this chunk already pushed into its neighbours is taken back
        // before the rebuild, or their borders would feed it straight back in.
        let mut sky_seeds = Vec::new();
        let mut block_seeds = Vec::new();
        if handle.read().is_lit() {
            for channel in [LightChannel::Sky, LightChannel::Block] {
                let outflow = outflow_nodes(&mut cursor, pos, channel);
                if outflow.is_empty() {
                    continue;
                }
                let removal = retract(
                    &mut cursor,
                    registry,
                    channel,
                    pos,
                    outflow,
                    self.config.block_node_budget,
                );
                report.absorb(removal.outcome);
                match channel {
                    LightChannel::Sky => sky_seeds.extend(removal.relight),
                    LightChannel::Block => block_seeds.extend(removal.relight),
                }
            }
        }

        // Neighbour data is copied out first so the chunk's own lock is taken alone.
        let above = lit_border(manager, pos.offset(Direction::PosY), Direction::NegY);
        let borders: Vec<(Direction, BorderLayer)> = Direction::ALL
            .into_iter()
            .filter(|dir| *dir != Direction::PosY)
            .filter_map(|dir| {
                lit_border(manager, pos.offset(dir), dir.opposite()).map(|layer| (dir, layer))
            })
            .collect();

        let bottom_changed;
        {
            let mut chunk = handle.write();
            let was_lit = chunk.is_lit();
            let before = BorderLayer::extract(&chunk, Direction::NegY);
            let (data, light) = chunk.data_and_light_mut();
            light.clear();

            sky_columns(data, light, registry, above.as_ref());
            for (x, y, z) in interior_sky_seeds(data, light, registry) {
                sky_seeds.push(local_node(pos, (x, y, z), light.channel(LightChannel::Sky, x, y, z)));
            }
            for (x, y, z) in seed_emitters(data, light, registry) {
                block_seeds.push(local_node(pos, (x, y, z), light.channel(LightChannel::Block, x, y, z)));
            }
            if let Some(layer) = &above {
                for (x, y, z) in pull_in(data, light, registry, Direction::PosY, layer, &[LightChannel::Block]) {
                    block_seeds.push(local_node(pos, (x, y, z), light.channel(LightChannel::Block, x, y, z)));
                }
            }
            for (dir, layer) in &borders {
                let channels = [LightChannel::Sky, LightChannel::Block];
                for (x, y, z) in pull_in(data, light, registry, *dir, layer, &channels) {
                    let voxel = light.get(x, y, z);
                    sky_seeds.push(local_node(pos, (x, y, z), voxel.sky()));
                    block_seeds.push(local_node(pos, (x, y, z), voxel.block()));
                }
            }

            chunk.mark_dirty(MESH_DIRTY);
            bottom_changed = !was_lit || BorderLayer::extract(&chunk, Direction::NegY).changed(&before);
        }

        report.absorb(flood(
            &mut cursor,
            registry,
            LightChannel::Sky,
            sky_seeds,
            FloodBudget::PerSeed(self.config.sky_node_budget),
        ));
        report.absorb(flood(
            &mut cursor,
            registry,
            LightChannel::Block,
            block_seeds,
            FloodBudget::Shared(self.config.block_node_budget),
        ));
        handle.write().set_lit(true);
        report.finish(cursor);

        if report.budget_exhausted {
            tracing::debug!("Lighting budget exhausted in chunk {} after {} nodes", pos, report.nodes);
        }
        Some((report, bottom_changed))
    }

    /// Recomputes light around `pos` after its block changed from `previous`.
    ///
    /// Light the old block provided or let through is removed first, the sky
    /// column below is cleared with it, and the edited voxel is then relaxed
    /// from its six neighbours before flooding outward again.
    pub fn update_lighting_at(
        &self,
        manager: &ChunkManager,
        pos: BlockPos,
        previous: BlockId,
    ) -> LightingReport {
        let _pass = self.pass.lock();
        let registry = self.registry.as_ref();
        let size = manager.chunk_size();
        let mut report = LightingReport::default();
        let mut cursor = ChunkCursor::new(manager);

        let Some((block, light)) = cursor.voxel(pos) else {
            return report;
        };
        let opaque = registry.is_opaque(block);
        let emission = registry.light_emission(block);

        for channel in [LightChannel::Sky, LightChannel::Block] {
            let current = channel.read(light);
            let darkens = match channel {
                LightChannel::Sky => !block.is_air(),
                LightChannel::Block => {
                    current > emission && (opaque || registry.light_emission(previous) > emission)
                }
            };

            let mut seeds = Vec::new();
            if current > 0 && darkens {
                let removal = remove(
                    &mut cursor,
                    registry,
                    channel,
                    pos,
                    current,
                    self.config.block_node_budget,
                );
                report.absorb(removal.outcome);
                seeds = removal.relight;
            }

            if !opaque {
                let mut level = match channel {
                    LightChannel::Sky => 0,
                    LightChannel::Block => emission,
                };
                for dir in Direction::ALL {
                    let from = pos.offset(dir.opposite());
                    let incoming = match cursor.level(from, channel) {
                        Some(incoming) => incoming,
                        // Nothing generated above: open sky.
                        None if channel == LightChannel::Sky && dir == Direction::NegY => MAX_LIGHT,
                        None => 0,
                    };
                    level = level.max(transfer(registry, channel, dir, incoming, block));
                }
                if cursor.raise(pos, channel, level) {
                    seeds.push(LightNode::at(pos, level, size));
                }
            } else if channel == LightChannel::Block && emission > 0 && cursor.raise(pos, channel, emission) {
                seeds.push(LightNode::at(pos, emission, size));
            }

            let budget = match channel {
                LightChannel::Sky => FloodBudget::PerSeed(self.config.sky_node_budget),
                LightChannel::Block => FloodBudget::Shared(self.config.block_node_budget),
            };
            report.absorb(flood(&mut cursor, registry, channel, seeds, budget));
        }

        report.finish(cursor);
        tracing::trace!(
            "Relit {} after edit: {} nodes across {} chunks",
            pos.to_chunk_local(size).0,
            report.nodes,
            report.changed_chunks.len()
        );
        report
    }
}

/// Border layer of a loaded, lit neighbour on its `face` side.
fn lit_border(manager: &ChunkManager, neighbor: ChunkPos, face: Direction) -> Option<BorderLayer> {
    let handle = manager.get_chunk(neighbor)?;
    let chunk = handle.read();
    (chunk.is_generated() && chunk.is_lit()).then(|| BorderLayer::extract(&chunk, face))
}

/// Voxels just across the sides and top of `pos` whose `channel` light is
/// dimmer than the voxel facing them, and so came out of `pos`. The bottom
/// face is left to the relight of the chunk below.
fn outflow_nodes(cursor: &mut ChunkCursor<'_>, pos: ChunkPos, channel: LightChannel) -> Vec<LightNode> {
    let size = cursor.chunk_size();
    let mut nodes = Vec::new();
    for dir in Direction::ALL {
        if dir == Direction::NegY || cursor.chunk(pos.offset(dir)).is_none() {
            continue;
        }
        for a in 0..size {
            for b in 0..size {
                let (x, y, z) = face_coords(size, dir, a, b);
                let inside = BlockPos::from_chunk_local(pos, (x as usize, y as usize, z as usize), size);
                let outside = inside.offset(dir);
                let own = cursor.level(inside, channel).unwrap_or(0);
                let across = cursor.level(outside, channel).unwrap_or(0);
                if across > 0 && across < own {
                    nodes.push(LightNode::at(outside, across, size));
                }
            }
        }
    }
    nodes
}

fn local_node(chunk: ChunkPos, (x, y, z): (i32, i32, i32), level: u8) -> LightNode {
    LightNode {
        chunk,
        local: (x as u8, y as u8, z as u8),
        level,
    }
}

/// Straight-down sky pass. Each column starts from the layer above, or full
/// sky when nothing lit sits above.
fn sky_columns(data: &ChunkData, light: &mut LightVolume, registry: &BlockRegistry, above: Option<&BorderLayer>) {
    let size = data.size();
    for x in 0..size {
        for z in 0..size {
            let mut level = above.map_or(MAX_LIGHT, |layer| layer.get(x, z).sky());
            for y in (0..size as i32).rev() {
                let (x, z) = (x as i32, z as i32);
                level = transfer(registry, LightChannel::Sky, Direction::NegY, level, data.get(x, y, z));
                light.set_channel(LightChannel::Sky, x, y, z, level);
            }
        }
    }
}

/// Lit voxels that can still brighten a neighbour, either inside the chunk
/// or across its faces.
fn interior_sky_seeds(data: &ChunkData, light: &LightVolume, registry: &BlockRegistry) -> Vec<(i32, i32, i32)> {
    let size = data.size() as i32;
    let mut seeds = Vec::new();
    for (index, _) in data.iter() {
        let (x, y, z) = data.coords_of(index);
        let (x, y, z) = (x as i32, y as i32, z as i32);
        let level = light.channel(LightChannel::Sky, x, y, z);
        if level <= 1 {
            continue;
        }
        let spreads = Direction::ALL.into_iter().any(|dir| {
            let (dx, dy, dz) = dir.offset();
            let (nx, ny, nz) = (x + dx, y + dy, z + dz);
            if !(0..size).contains(&nx) || !(0..size).contains(&ny) || !(0..size).contains(&nz) {
                return true;
            }
            let arriving = transfer(registry, LightChannel::Sky, dir, level, data.get(nx, ny, nz));
            arriving > light.channel(LightChannel::Sky, nx, ny, nz)
        });
        if spreads {
            seeds.push((x, y, z));
        }
    }
    seeds
}

/// Writes each emitter's level into the block channel.
fn seed_emitters(data: &ChunkData, light: &mut LightVolume, registry: &BlockRegistry) -> Vec<(i32, i32, i32)> {
    if data.palette().iter().all(|id| registry.light_emission(*id) == 0) {
        return Vec::new();
    }
    let mut seeds = Vec::new();
    for (index, block) in data.iter() {
        let emission = registry.light_emission(block);
        if emission == 0 {
            continue;
        }
        let (x, y, z) = data.coords_of(index);
        let (x, y, z) = (x as i32, y as i32, z as i32);
        light.set_channel(LightChannel::Block, x, y, z, emission);
        seeds.push((x, y, z));
    }
    seeds
}
