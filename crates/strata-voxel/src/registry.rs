//! Block registry: maps `namespace:name` identifiers to immutable [`Block`] definitions
//! and assigns each a dense numeric [`BlockId`] used for compact chunk storage.
//!
//! The registry is built once during session startup. Air is always ID 0 so that
//! zero-initialized palette indices represent empty space.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Namespace used when an identifier is registered without one.
pub const DEFAULT_NAMESPACE: &str = "strata";

/// Maximum light emission level a block may declare.
pub const MAX_LIGHT_EMISSION: u8 = 15;

/// Compact numeric block identifier (2 bytes).
///
/// Assigned densely at registration. Stable for a process run only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub u16);

impl BlockId {
    /// The empty block.
    pub const AIR: BlockId = BlockId(0);

    /// Returns `true` if this is the air block.
    pub fn is_air(self) -> bool {
        self == Self::AIR
    }
}

/// Textual block identifier of the form `namespace:name`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockIdentifier {
    namespace: String,
    name: String,
}

impl BlockIdentifier {
    /// Creates an identifier from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidIdentifier`] if either part is empty or
    /// contains characters outside `[a-z0-9_./-]`.
    pub fn new(namespace: &str, name: &str) -> Result<Self, RegistryError> {
        if !is_valid_part(namespace) || !is_valid_part(name) {
            return Err(RegistryError::InvalidIdentifier(format!("{namespace}:{name}")));
        }
        Ok(Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        })
    }

    /// Parses `namespace:name`, or a bare `name` in the default namespace.
    pub fn parse(raw: &str) -> Result<Self, RegistryError> {
        match raw.split_once(':') {
            Some((namespace, name)) => Self::new(namespace, name),
            None => Self::new(DEFAULT_NAMESPACE, raw),
        }
    }

    /// The namespace part.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The name part.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for BlockIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)
    }
}

fn is_valid_part(part: &str) -> bool {
    !part.is_empty()
        && part
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.' | '/' | '-'))
}

/// Physical properties of a block type.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockProperties {
    /// Occupies its voxel (not air-like).
    pub solid: bool,
    /// Fully blocks light and hides adjacent faces.
    pub opaque: bool,
    /// Light emission level (0 = none, 15 = max).
    pub light_emission: u8,
    /// Mining hardness; negative means unbreakable.
    pub hardness: f32,
    /// Whether entities collide with this block.
    pub collidable: bool,
}

impl BlockProperties {
    /// Properties of the air block.
    pub const AIR: BlockProperties = BlockProperties {
        solid: false,
        opaque: false,
        light_emission: 0,
        hardness: 0.0,
        collidable: false,
    };

    /// A solid, opaque, collidable block with the given hardness.
    pub fn opaque_solid(hardness: f32) -> Self {
        Self {
            solid: true,
            opaque: true,
            light_emission: 0,
            hardness,
            collidable: true,
        }
    }

    /// A solid but see-through block (glass, leaves).
    pub fn transparent_solid(hardness: f32) -> Self {
        Self {
            opaque: false,
            ..Self::opaque_solid(hardness)
        }
    }

    /// Returns a copy emitting the given light level.
    pub fn with_emission(mut self, level: u8) -> Self {
        self.light_emission = level;
        self
    }
}

/// Which atlas tiles a block's faces use.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockTextures {
    /// No geometry texture (air).
    None,
    /// All six faces use the same tile.
    Uniform {
        /// Tile name.
        texture: String,
    },
    /// Top, side, and bottom are distinct.
    TopSideBottom {
        /// Tile for the +Y face.
        top: String,
        /// Tile for the four lateral faces.
        side: String,
        /// Tile for the -Y face.
        bottom: String,
    },
}

impl BlockTextures {
    /// Shorthand for [`BlockTextures::Uniform`].
    pub fn uniform(texture: &str) -> Self {
        Self::Uniform {
            texture: texture.to_string(),
        }
    }

    /// Tile for the +Y face.
    pub fn top(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Uniform { texture } => Some(texture),
            Self::TopSideBottom { top, .. } => Some(top),
        }
    }

    /// Tile for lateral faces.
    pub fn side(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Uniform { texture } => Some(texture),
            Self::TopSideBottom { side, .. } => Some(side),
        }
    }

    /// Tile for the -Y face.
    pub fn bottom(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Uniform { texture } => Some(texture),
            Self::TopSideBottom { bottom, .. } => Some(bottom),
        }
    }

    /// Every distinct tile name referenced.
    pub fn tile_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = [self.top(), self.side(), self.bottom()]
            .into_iter()
            .flatten()
            .collect();
        names.dedup();
        names
    }
}

/// An immutable, registry-owned block definition.
#[derive(Clone, Debug)]
pub struct Block {
    /// Textual identifier.
    pub identifier: BlockIdentifier,
    /// Dense numeric ID.
    pub id: BlockId,
    /// Physical properties.
    pub properties: BlockProperties,
    /// Per-face textures.
    pub textures: BlockTextures,
}

impl Block {
    /// Returns `true` if the block fully blocks light.
    pub fn is_opaque(&self) -> bool {
        self.properties.opaque
    }

    /// Light emission level (0–15).
    pub fn light_emission(&self) -> u8 {
        self.properties.light_emission
    }
}

/// Errors that can occur during block registration.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A block with the same identifier has already been registered.
    #[error("duplicate block identifier: {0}")]
    DuplicateIdentifier(String),
    /// The identifier is not of the form `namespace:name`.
    #[error("invalid block identifier: {0}")]
    InvalidIdentifier(String),
    /// Emission above [`MAX_LIGHT_EMISSION`].
    #[error("block {identifier} emits light level {level} (max 15)")]
    InvalidLightEmission {
        /// Offending identifier.
        identifier: String,
        /// Declared level.
        level: u8,
    },
    /// All 65 536 slots have been consumed.
    #[error("block registry is full (max 65536 blocks)")]
    RegistryFull,
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Maps [`BlockId`] → [`Block`] with O(1) lookup by ID and by identifier.
pub struct BlockRegistry {
    /// Dense array where `index == BlockId.0`.
    blocks: Vec<Block>,
    /// Reverse lookup: identifier → ID.
    by_identifier: HashMap<BlockIdentifier, BlockId>,
}

impl BlockRegistry {
    /// Creates a registry with `strata:air` pre-registered as ID 0.
    pub fn new() -> Self {
        let identifier = BlockIdentifier {
            namespace: DEFAULT_NAMESPACE.to_string(),
            name: "air".to_string(),
        };
        let air = Block {
            identifier: identifier.clone(),
            id: BlockId::AIR,
            properties: BlockProperties::AIR,
            textures: BlockTextures::None,
        };

        let mut by_identifier = HashMap::new();
        by_identifier.insert(identifier, BlockId::AIR);

        Self {
            blocks: vec![air],
            by_identifier,
        }
    }

    /// Creates a registry holding the built-in terrain and light blocks.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let defaults = [
            ("stone", BlockProperties::opaque_solid(1.5), BlockTextures::uniform("stone")),
            ("dirt", BlockProperties::opaque_solid(0.5), BlockTextures::uniform("dirt")),
            (
                "grass",
                BlockProperties::opaque_solid(0.6),
                BlockTextures::TopSideBottom {
                    top: "grass_top".to_string(),
                    side: "grass_side".to_string(),
                    bottom: "dirt".to_string(),
                },
            ),
            ("sand", BlockProperties::opaque_solid(0.5), BlockTextures::uniform("sand")),
            ("glass", BlockProperties::transparent_solid(0.3), BlockTextures::uniform("glass")),
            ("leaves", BlockProperties::transparent_solid(0.2), BlockTextures::uniform("leaves")),
            (
                "glowstone",
                BlockProperties::opaque_solid(0.3).with_emission(15),
                BlockTextures::uniform("glowstone"),
            ),
            (
                "torch",
                BlockProperties {
                    solid: true,
                    opaque: false,
                    light_emission: 14,
                    hardness: 0.0,
                    collidable: false,
                },
                BlockTextures::uniform("torch"),
            ),
        ];
        for (name, properties, textures) in defaults {
            // The built-in table is static and collision-free.
            if let Err(err) = registry.register(name, properties, textures) {
                tracing::error!("failed to register built-in block {name}: {err}");
            }
        }
        registry
    }

    /// Registers a new block and returns its assigned ID.
    ///
    /// IDs are assigned sequentially starting from 1 (0 is air).
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateIdentifier`] if the identifier already
    /// exists, [`RegistryError::InvalidIdentifier`] if it cannot be parsed,
    /// [`RegistryError::InvalidLightEmission`] for emission above 15, or
    /// [`RegistryError::RegistryFull`] if all slots are consumed.
    pub fn register(
        &mut self,
        identifier: &str,
        properties: BlockProperties,
        textures: BlockTextures,
    ) -> Result<BlockId, RegistryError> {
        let identifier = BlockIdentifier::parse(identifier)?;
        if self.by_identifier.contains_key(&identifier) {
            return Err(RegistryError::DuplicateIdentifier(identifier.to_string()));
        }
        if properties.light_emission > MAX_LIGHT_EMISSION {
            return Err(RegistryError::InvalidLightEmission {
                identifier: identifier.to_string(),
                level: properties.light_emission,
            });
        }
        if self.blocks.len() > u16::MAX as usize {
            return Err(RegistryError::RegistryFull);
        }

        let id = BlockId(self.blocks.len() as u16);
        self.by_identifier.insert(identifier.clone(), id);
        self.blocks.push(Block {
            identifier,
            id,
            properties,
            textures,
        });
        Ok(id)
    }

    /// Returns the block for a numeric ID, or `None` if it was never assigned.
    pub fn get_by_id(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.0 as usize)
    }

    /// Returns the block registered under `identifier` (bare names use the
    /// default namespace).
    pub fn get(&self, identifier: &str) -> Option<&Block> {
        self.lookup(identifier).and_then(|id| self.get_by_id(id))
    }

    /// Returns the ID for an identifier, or `None` if not found.
    pub fn lookup(&self, identifier: &str) -> Option<BlockId> {
        let identifier = BlockIdentifier::parse(identifier).ok()?;
        self.by_identifier.get(&identifier).copied()
    }

    /// Properties for an ID. Unknown IDs are treated like air.
    pub fn properties(&self, id: BlockId) -> &BlockProperties {
        match self.blocks.get(id.0 as usize) {
            Some(block) => &block.properties,
            None => &BlockProperties::AIR,
        }
    }

    /// Returns `true` if the block fully blocks light.
    pub fn is_opaque(&self, id: BlockId) -> bool {
        self.properties(id).opaque
    }

    /// Light emission level of the block (0 for unknown IDs).
    pub fn light_emission(&self, id: BlockId) -> u8 {
        self.properties(id).light_emission
    }

    /// Total number of registered blocks (including air).
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns `true` if only air is registered.
    pub fn is_empty(&self) -> bool {
        self.blocks.len() <= 1
    }

    /// Iterates over all blocks in ID order.
    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
