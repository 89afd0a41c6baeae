//! Scripted camera flight and per-run frame totals.

use glam::Vec3;
use strata_render::{Camera, FrameStats};

/// Flies in a straight line over the terrain at constant height, looking
/// slightly down along the direction of travel.
#[derive(Debug, Clone)]
pub struct FlightPath {
    start: Vec3,
    velocity: Vec3,
}

impl FlightPath {
    pub fn new(start: Vec3, velocity: Vec3) -> Self {
        Self { start, velocity }
    }

    pub fn position_at(&self, seconds: f32) -> Vec3 {
        self.start + self.velocity * seconds
    }

    /// Camera for time `seconds` into the flight.
    pub fn camera_at(&self, seconds: f32, fov_degrees: f32) -> Camera {
        let position = self.position_at(seconds);
        let heading = self.velocity.normalize_or_zero();
        let target = position + heading * 32.0 - Vec3::Y * 12.0;
        let mut camera = Camera::looking_at(position, target);
        camera.fov_y = fov_degrees.to_radians();
        camera
    }
}

/// Running sums over every frame of a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FrameTotals {
    pub frames: u64,
    pub uploads: u64,
    pub stale_uploads: u64,
    pub failed_uploads: u64,
    pub pruned: u64,
    pub draw_calls: u64,
    pub triangles: u64,
    pub peak_visible_chunks: usize,
}

impl FrameTotals {
    pub fn add(&mut self, stats: &FrameStats) {
        self.frames += 1;
        self.uploads += stats.uploads as u64;
        self.stale_uploads += stats.stale_uploads as u64;
        self.failed_uploads += stats.failed_uploads as u64;
        self.pruned += stats.pruned as u64;
        self.draw_calls += stats.draw_calls as u64;
        self.triangles += stats.triangles as u64;
        self.peak_visible_chunks = self.peak_visible_chunks.max(stats.chunks_visible);
    }

    pub fn average_draw_calls(&self) -> f64 {
        if self.frames == 0 {
            0.0
        } else {
            self.draw_calls as f64 / self.frames as f64
        }
    }
}
