//! Shared school-wide parameters.

use glam::{Vec2, Vec3};
use shoal_config::SchoolConfig;

/// Read-mostly state governing collective motion.
///
/// The scheduler refreshes `center` once per tick before dispatch; the
/// update step only ever reads.
#[derive(Debug, Clone)]
pub struct SchoolState {
    /// Anchor point the oscillating center moves around.
    pub home: Vec3,
    /// Current school center, a function of elapsed time.
    pub center: Vec3,
    /// Home boundary radius. Always positive.
    pub radius: f32,
    pub move_speed: f32,
    /// Per-tick orientation interpolation factor in [0, 1].
    pub agility_damping: f32,
    /// Pitch/yaw angular shove for coincident neighbors, radians.
    pub repel_angle: Vec2,
    pub neighbor_sample_count: usize,
    /// World up axis the look-rotation references.
    pub up: Vec3,
    oscillation_amplitude: Vec3,
    oscillation_frequency: Vec3,
}

impl SchoolState {
    pub fn from_config(config: &SchoolConfig) -> Self {
        let home = Vec3::from(config.home_position);
        Self {
            home,
            center: home,
            radius: config.school_radius,
            move_speed: config.move_speed,
            agility_damping: config.agility_damping,
            repel_angle: Vec2::new(config.repel_angle.0, config.repel_angle.1),
            neighbor_sample_count: config.neighbor_sample_count,
            up: Vec3::Y,
            oscillation_amplitude: Vec3::from(config.oscillation_amplitude),
            oscillation_frequency: Vec3::from(config.oscillation_frequency),
        }
    }

    /// Move the center along its harmonic path: simple harmonic motion per
    /// axis, independently parameterized by frequency and amplitude.
    pub fn advance(&mut self, elapsed_seconds: f32) {
        let phase = self.oscillation_frequency * elapsed_seconds;
        let offset = Vec3::new(phase.x.sin(), phase.y.sin(), phase.z.sin());
        self.center = self.home + offset * self.oscillation_amplitude;
    }
}
