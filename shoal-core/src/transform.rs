//! Agent transform value type and orientation helpers.
//!
//! Conventions: right-handed basis, local forward is +Z, local up is +Y.

use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Local forward axis of every agent.
pub const FORWARD: Vec3 = Vec3::Z;
/// Local up axis of every agent.
pub const UP: Vec3 = Vec3::Y;
/// Local right axis of every agent.
pub const RIGHT: Vec3 = Vec3::X;

/// Position, orientation and scale of one agent.
///
/// A tick produces a fresh `Transform` per agent; no component mutates one
/// that another component may still be reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Transform at `position` with identity orientation and unit scale.
    pub fn from_position(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY, Vec3::ONE)
    }

    /// World-space forward axis.
    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.rotation * FORWARD
    }

    /// World-space right axis.
    #[inline]
    pub fn right(&self) -> Vec3 {
        self.rotation * RIGHT
    }

    /// World-space up axis.
    #[inline]
    pub fn up(&self) -> Vec3 {
        self.rotation * UP
    }
}

/// Rotation that points the local +Z axis down `forward`, with `up` as the
/// reference up axis.
///
/// Builds the orthonormal basis (right, up', forward) and reads it back as a
/// quaternion. Degenerate inputs (zero-length forward, or forward parallel
/// to up) fall back to a valid basis instead of producing NaNs.
pub fn look_rotation(forward: Vec3, up: Vec3) -> Quat {
    let f = forward.normalize_or_zero();
    if f == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    let mut right = up.cross(f);
    if right.length_squared() < 1e-12 {
        right = FORWARD.cross(f);
        if right.length_squared() < 1e-12 {
            right = RIGHT;
        }
    }
    let right = right.normalize();
    let new_up = f.cross(right);
    Quat::from_mat3(&Mat3::from_cols(right, new_up, f))
}
