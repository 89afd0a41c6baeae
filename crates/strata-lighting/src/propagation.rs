//! Breadth-first light flood and reverse-BFS removal over world coordinates.
//!
//! Light moves one voxel per step and loses one level per step, except sky
//! light travelling straight down through air, which keeps its level. Opaque
//! voxels never receive light. Propagation stops at chunks the cursor cannot
//! resolve.

use std::collections::VecDeque;

use strata_voxel::{BlockId, BlockPos, BlockRegistry, ChunkPos, Direction, LightChannel};

use crate::cursor::{ChunkCursor, LightNode};

/// Limit on how many queue nodes a flood may process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FloodBudget {
    /// One budget shared by every seed.
    Shared(usize),
    /// A fresh budget for each seed.
    PerSeed(usize),
}

/// Work done by a flood or removal pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FloodOutcome {
    /// Queue nodes processed.
    pub nodes: usize,
    /// Whether any budget ran out before its queue drained.
    pub exhausted: bool,
}

impl FloodOutcome {
    pub(crate) fn merge(&mut self, other: FloodOutcome) {
        self.nodes += other.nodes;
        self.exhausted |= other.exhausted;
    }
}

/// Level that arrives in a voxel holding `into` when light of `level` moves
/// one step in `dir`.
pub fn transfer(
    registry: &BlockRegistry,
    channel: LightChannel,
    dir: Direction,
    level: u8,
    into: BlockId,
) -> u8 {
    if registry.is_opaque(into) {
        0
    } else if channel == LightChannel::Sky && dir == Direction::NegY && into.is_air() {
        level
    } else {
        level.saturating_sub(1)
    }
}

/// Spreads light outward from `seeds`, whose levels are already stored.
pub fn flood(
    cursor: &mut ChunkCursor<'_>,
    registry: &BlockRegistry,
    channel: LightChannel,
    seeds: Vec<LightNode>,
    budget: FloodBudget,
) -> FloodOutcome {
    let mut outcome = FloodOutcome::default();
    match budget {
        FloodBudget::Shared(limit) => {
            outcome.merge(run_flood(cursor, registry, channel, seeds.into(), limit));
        }
        FloodBudget::PerSeed(limit) => {
            for seed in seeds {
                outcome.merge(run_flood(cursor, registry, channel, VecDeque::from([seed]), limit));
            }
        }
    }
    outcome
}

fn run_flood(
    cursor: &mut ChunkCursor<'_>,
    registry: &BlockRegistry,
    channel: LightChannel,
    mut queue: VecDeque<LightNode>,
    limit: usize,
) -> FloodOutcome {
    let size = cursor.chunk_size();
    let mut nodes = 0;

    while let Some(node) = queue.pop_front() {
        if nodes >= limit {
            return FloodOutcome {
                nodes,
                exhausted: true,
            };
        }
        nodes += 1;

        let pos = node.world(size);
        // A removal pass may have lowered this voxel since it was queued.
        let Some(level) = cursor.level(pos, channel) else {
            continue;
        };
        if level == 0 {
            continue;
        }

        for dir in Direction::ALL {
            let next = pos.offset(dir);
            let Some(block) = cursor.block(next) else {
                continue;
            };
            let arriving = transfer(registry, channel, dir, level, block);
            if arriving == 0 {
                continue;
            }
            if cursor.raise(next, channel, arriving) {
                queue.push_back(LightNode::at(next, arriving, size));
            }
        }
    }

    FloodOutcome {
        nodes,
        exhausted: false,
    }
}

/// Result of a removal pass.
#[derive(Debug, Default)]
pub struct Removal {
    /// Surviving light at the edge of the cleared area, to flood again.
    pub relight: Vec<LightNode>,
    /// Work done.
    pub outcome: FloodOutcome,
}

/// Clears light that was derived from `origin`, which held `level` before
/// the edit, and collects the boundary light that must flow back in.
///
/// `origin` is left at zero. Emitters cleared along the way are restored
/// to their emission level and returned as relight seeds.
pub fn remove(
    cursor: &mut ChunkCursor<'_>,
    registry: &BlockRegistry,
    channel: LightChannel,
    origin: BlockPos,
    level: u8,
    limit: usize,
) -> Removal {
    let size = cursor.chunk_size();
    if level == 0 || cursor.replace(origin, channel, 0).is_none() {
        return Removal::default();
    }
    drain(cursor, registry, channel, VecDeque::from([LightNode::at(origin, level, size)]), limit, None)
}

/// Clears light that flowed out of `source` into the surrounding chunks.
///
/// `seeds` are voxels just outside `source` whose light came from it. They
/// are zeroed and removal spreads from them without re-entering `source`,
/// whose own light the caller rebuilds. Relight seeds all lie outside it.
pub fn retract(
    cursor: &mut ChunkCursor<'_>,
    registry: &BlockRegistry,
    channel: LightChannel,
    source: ChunkPos,
    seeds: Vec<LightNode>,
    limit: usize,
) -> Removal {
    let size = cursor.chunk_size();
    let mut queue = VecDeque::with_capacity(seeds.len());
    for seed in seeds {
        if seed.chunk == source || seed.level == 0 {
            continue;
        }
        if cursor.replace(seed.world(size), channel, 0).is_some() {
            queue.push_back(seed);
        }
    }
    drain(cursor, registry, channel, queue, limit, Some(source))
}

fn drain(
    cursor: &mut ChunkCursor<'_>,
    registry: &BlockRegistry,
    channel: LightChannel,
    mut queue: VecDeque<LightNode>,
    limit: usize,
    fence: Option<ChunkPos>,
) -> Removal {
    let size = cursor.chunk_size();
    let mut removal = Removal::default();
    let mut emitters = Vec::new();

    while let Some(node) = queue.pop_front() {
        if removal.outcome.nodes >= limit {
            removal.outcome.exhausted = true;
            break;
        }
        removal.outcome.nodes += 1;
        let pos = node.world(size);

        for dir in Direction::ALL {
            let next = pos.offset(dir);
            if fence.is_some_and(|fenced| next.to_chunk_local(size).0 == fenced) {
                continue;
            }
            let Some((block, light)) = cursor.voxel(next) else {
                continue;
            };
            let neighbor = channel.read(light);
            if neighbor == 0 {
                continue;
            }
            let derived = neighbor < node.level
                || (channel == LightChannel::Sky
                    && dir == Direction::NegY
                    && block.is_air()
                    && neighbor == node.level);
            if derived {
                cursor.replace(next, channel, 0);
                queue.push_back(LightNode::at(next, neighbor, size));
                if channel == LightChannel::Block {
                    let emission = registry.light_emission(block);
                    if emission > 0 {
                        emitters.push((next, emission));
                    }
                }
            } else {
                removal.relight.push(LightNode::at(next, neighbor, size));
            }
        }
    }

    for (pos, emission) in emitters {
        if cursor.raise(pos, channel, emission) {
            removal.relight.push(LightNode::at(pos, emission, size));
        }
    }
    removal
}

#[cfg(test)]
mod tests {
    use strata_voxel::{ChunkData, ChunkLoadConfig, ChunkManager, ChunkPos};

    use super::*;

    fn world(columns: &[(i32, i32)]) -> ChunkManager {
        let config = ChunkLoadConfig {
            height_chunks: 1,
            ..ChunkLoadConfig::default()
        };
        let manager = ChunkManager::new(16, 8, config).unwrap();
        for &(x, z) in columns {
            let handle = manager.get_or_create_chunk(ChunkPos::new(x, 0, z));
            handle.write().populate(ChunkData::new(16));
        }
        manager
    }

    fn seed(cursor: &mut ChunkCursor<'_>, pos: BlockPos, level: u8) -> Vec<LightNode> {
        cursor.raise(pos, LightChannel::Block, level);
        vec![LightNode::at(pos, level, cursor.chunk_size())]
    }

    #[test]
    fn test_transfer_rules() {
        let registry = BlockRegistry::with_defaults();
        let stone = registry.lookup("stone").unwrap();
        let glass = registry.lookup("glass").unwrap();
        let sky = LightChannel::Sky;
        assert_eq!(transfer(&registry, sky, Direction::NegY, 15, BlockId::AIR), 15);
        assert_eq!(transfer(&registry, sky, Direction::NegY, 15, glass), 14);
        assert_eq!(transfer(&registry, sky, Direction::PosX, 15, BlockId::AIR), 14);
        assert_eq!(transfer(&registry, sky, Direction::NegY, 15, stone), 0);
        assert_eq!(
            transfer(&registry, LightChannel::Block, Direction::NegY, 9, BlockId::AIR),
            8
        );
    }

    #[test]
    fn test_flood_decays_with_manhattan_distance() {
        let registry = BlockRegistry::with_defaults();
        let manager = world(&[(0, 0)]);
        let mut cursor = ChunkCursor::new(&manager);
        let source = BlockPos::new(8, 8, 8);
        let seeds = seed(&mut cursor, source, 12);
        let outcome = flood(&mut cursor, &registry, LightChannel::Block, seeds, FloodBudget::Shared(10_000));
        assert!(!outcome.exhausted);

        for (pos, expected) in [
            (BlockPos::new(9, 8, 8), 11),
            (BlockPos::new(11, 8, 8), 9),
            (BlockPos::new(10, 10, 9), 7),
            (BlockPos::new(8, 0, 8), 4),
            (BlockPos::new(0, 0, 8), 0),
        ] {
            assert_eq!(cursor.level(pos, LightChannel::Block), Some(expected), "at {pos:?}");
        }
    }

    #[test]
    fn test_flood_stops_at_unloaded_chunks() {
        let registry = BlockRegistry::with_defaults();
        let manager = world(&[(0, 0)]);
        let mut cursor = ChunkCursor::new(&manager);
        let seeds = seed(&mut cursor, BlockPos::new(0, 8, 8), 15);
        flood(&mut cursor, &registry, LightChannel::Block, seeds, FloodBudget::Shared(10_000));
        assert_eq!(cursor.level(BlockPos::new(-1, 8, 8), LightChannel::Block), None);
        let changed = cursor.into_changed();
        assert_eq!(changed.len(), 1);
    }

    #[test]
    fn test_flood_crosses_loaded_chunk_boundary() {
        let registry = BlockRegistry::with_defaults();
        let manager = world(&[(0, 0), (1, 0)]);
        let mut cursor = ChunkCursor::new(&manager);
        let seeds = seed(&mut cursor, BlockPos::new(14, 8, 8), 10);
        flood(&mut cursor, &registry, LightChannel::Block, seeds, FloodBudget::Shared(10_000));
        assert_eq!(cursor.level(BlockPos::new(16, 8, 8), LightChannel::Block), Some(8));
        assert_eq!(cursor.level(BlockPos::new(20, 8, 8), LightChannel::Block), Some(4));
    }

    #[test]
    fn test_shared_budget_exhausts() {
        let registry = BlockRegistry::with_defaults();
        let manager = world(&[(0, 0)]);
        let mut cursor = ChunkCursor::new(&manager);
        let seeds = seed(&mut cursor, BlockPos::new(8, 8, 8), 15);
        let outcome = flood(&mut cursor, &registry, LightChannel::Block, seeds, FloodBudget::Shared(10));
        assert!(outcome.exhausted);
        assert_eq!(outcome.nodes, 10);
    }

    #[test]
    fn test_remove_clears_derived_light() {
        let registry = BlockRegistry::with_defaults();
        let manager = world(&[(0, 0)]);
        let mut cursor = ChunkCursor::new(&manager);
        let source = BlockPos::new(8, 8, 8);
        let seeds = seed(&mut cursor, source, 10);
        flood(&mut cursor, &registry, LightChannel::Block, seeds, FloodBudget::Shared(10_000));

        let removal = remove(&mut cursor, &registry, LightChannel::Block, source, 10, 10_000);
        assert!(removal.relight.is_empty());
        assert!(!removal.outcome.exhausted);
        for pos in [source, BlockPos::new(9, 8, 8), BlockPos::new(8, 3, 8)] {
            assert_eq!(cursor.level(pos, LightChannel::Block), Some(0));
        }
    }

    #[test]
    fn test_remove_keeps_other_sources() {
        let registry = BlockRegistry::with_defaults();
        let manager = world(&[(0, 0)]);
        let mut cursor = ChunkCursor::new(&manager);
        let a = BlockPos::new(3, 8, 8);
        let b = BlockPos::new(12, 8, 8);
        let mut seeds = seed(&mut cursor, a, 8);
        seeds.extend(seed(&mut cursor, b, 8));
        flood(&mut cursor, &registry, LightChannel::Block, seeds, FloodBudget::Shared(10_000));

        let removal = remove(&mut cursor, &registry, LightChannel::Block, a, 8, 10_000);
        assert!(!removal.relight.is_empty());
        flood(&mut cursor, &registry, LightChannel::Block, removal.relight, FloodBudget::Shared(10_000));

        assert_eq!(cursor.level(a, LightChannel::Block), Some(0));
        assert_eq!(cursor.level(b, LightChannel::Block), Some(8));
        assert_eq!(cursor.level(BlockPos::new(6, 8, 8), LightChannel::Block), Some(2));
        assert_eq!(cursor.level(BlockPos::new(5, 8, 8), LightChannel::Block), Some(1));
    }

    #[test]
    fn test_retract_clears_outflow_and_spares_source() {
        let registry = BlockRegistry::with_defaults();
        let manager = world(&[(0, 0), (1, 0)]);
        let mut cursor = ChunkCursor::new(&manager);
        let seeds = seed(&mut cursor, BlockPos::new(14, 8, 8), 10);
        flood(&mut cursor, &registry, LightChannel::Block, seeds, FloodBudget::Shared(10_000));
        assert_eq!(cursor.level(BlockPos::new(16, 9, 8), LightChannel::Block), Some(7));

        let outflow = vec![LightNode::at(BlockPos::new(16, 8, 8), 8, 16)];
        let source = ChunkPos::new(0, 0, 0);
        let removal = retract(&mut cursor, &registry, LightChannel::Block, source, outflow, 10_000);

        assert!(removal.relight.is_empty());
        for pos in [BlockPos::new(16, 8, 8), BlockPos::new(16, 9, 8), BlockPos::new(20, 8, 8)] {
            assert_eq!(cursor.level(pos, LightChannel::Block), Some(0), "at {pos:?}");
        }
        assert_eq!(cursor.level(BlockPos::new(15, 8, 8), LightChannel::Block), Some(9));
        assert_eq!(cursor.level(BlockPos::new(14, 8, 8), LightChannel::Block), Some(10));
    }
}
