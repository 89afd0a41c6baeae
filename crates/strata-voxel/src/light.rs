//! Per-voxel light storage.
//!
//! Each voxel stores two 4-bit light levels packed into a single byte:
//! the high nibble for sky light and the low nibble for block (emissive) light.

/// Maximum light level for either channel.
pub const MAX_LIGHT: u8 = 15;

/// Packed light value: high nibble = sky light, low nibble = block light.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VoxelLight(pub u8);

impl VoxelLight {
    /// Builds a packed value from both channels.
    pub fn new(sky: u8, block: u8) -> Self {
        debug_assert!(sky <= MAX_LIGHT && block <= MAX_LIGHT);
        Self(((sky & 0xF) << 4) | (block & 0xF))
    }

    /// Returns the sky light level (0–15).
    pub fn sky(self) -> u8 {
        (self.0 >> 4) & 0xF
    }

    /// Returns the block light level (0–15).
    pub fn block(self) -> u8 {
        self.0 & 0xF
    }

    /// Sets the sky light level (0–15).
    pub fn set_sky(&mut self, level: u8) {
        debug_assert!(level <= MAX_LIGHT);
        self.0 = (self.0 & 0x0F) | ((level & 0xF) << 4);
    }

    /// Sets the block light level (0–15).
    pub fn set_block(&mut self, level: u8) {
        debug_assert!(level <= MAX_LIGHT);
        self.0 = (self.0 & 0xF0) | (level & 0x0F);
    }

    /// The brighter of the two channels.
    pub fn max_level(self) -> u8 {
        self.sky().max(self.block())
    }
}

/// Which light channel an operation targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LightChannel {
    /// Light from the open sky.
    Sky,
    /// Light from emissive blocks.
    Block,
}

impl LightChannel {
    /// Reads this channel from a packed value.
    pub fn read(self, light: VoxelLight) -> u8 {
        match self {
            LightChannel::Sky => light.sky(),
            LightChannel::Block => light.block(),
        }
    }

    /// Writes this channel into a packed value.
    pub fn write(self, light: &mut VoxelLight, level: u8) {
        match self {
            LightChannel::Sky => light.set_sky(level),
            LightChannel::Block => light.set_block(level),
        }
    }
}

/// Light values for every voxel of a chunk, indexed like its block volume.
#[derive(Clone, Debug)]
pub struct LightVolume {
    size: usize,
    data: Vec<VoxelLight>,
}

impl LightVolume {
    /// A fully dark volume.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            data: vec![VoxelLight(0); size * size * size],
        }
    }

    /// Side length in voxels.
    pub fn size(&self) -> usize {
        self.size
    }

    fn index(&self, x: i32, y: i32, z: i32) -> Option<usize> {
        let s = self.size as i32;
        if x < 0 || y < 0 || z < 0 || x >= s || y >= s || z >= s {
            return None;
        }
        let s = self.size;
        Some(x as usize + y as usize * s + z as usize * s * s)
    }

    /// Light at `(x, y, z)`; dark when out of bounds.
    pub fn get(&self, x: i32, y: i32, z: i32) -> VoxelLight {
        self.index(x, y, z).map(|i| self.data[i]).unwrap_or_default()
    }

    /// Overwrites the light at `(x, y, z)`. Out-of-bounds writes are ignored.
    pub fn set(&mut self, x: i32, y: i32, z: i32, light: VoxelLight) {
        if let Some(i) = self.index(x, y, z) {
            self.data[i] = light;
        }
    }

    /// Reads one channel.
    pub fn channel(&self, channel: LightChannel, x: i32, y: i32, z: i32) -> u8 {
        channel.read(self.get(x, y, z))
    }

    /// Writes one channel, leaving the other untouched.
    pub fn set_channel(&mut self, channel: LightChannel, x: i32, y: i32, z: i32, level: u8) {
        if let Some(i) = self.index(x, y, z) {
            channel.write(&mut self.data[i], level);
        }
    }

    /// Resets both channels everywhere.
    pub fn clear(&mut self) {
        self.data.fill(VoxelLight(0));
    }

    /// Raw packed values in flat-index order.
    pub fn as_slice(&self) -> &[VoxelLight] {
        &self.data
    }
}
