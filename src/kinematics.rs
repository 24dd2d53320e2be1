//! Climb kinematics helpers.
//!
//! Pure velocity and rotation math used by the per-tick climb integration,
//! plus the [`RootMotion`] component through which the animation side
//! drives the character during montages.

use bevy::prelude::*;

/// Root-motion velocity published by the animation side.
///
/// While `animation_velocity` or `override_velocity` is set, the climb
/// integration leaves velocity and rotation to the animation and only
/// moves the character.
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct RootMotion {
    /// Velocity extracted from the playing montage this tick.
    pub animation_velocity: Option<Vec3>,
    /// Velocity forced by a root-motion source (overrides physics).
    pub override_velocity: Option<Vec3>,
    /// Velocity blended on top of the physics velocity.
    pub additive_velocity: Vec3,
    /// Additive contribution applied last tick, removed before re-integrating.
    pub(crate) applied_additive: Option<Vec3>,
}

impl RootMotion {
    /// Whether animation root motion drives this tick.
    #[inline]
    pub fn has_anim_root_motion(&self) -> bool {
        self.animation_velocity.is_some()
    }

    /// Whether a root-motion source overrides velocity this tick.
    #[inline]
    pub fn has_override_velocity(&self) -> bool {
        self.override_velocity.is_some()
    }

    /// Whether either root motion or an override governs this tick.
    #[inline]
    pub fn is_driving(&self) -> bool {
        self.has_anim_root_motion() || self.has_override_velocity()
    }

    /// Remove last tick's additive contribution from `velocity`.
    pub fn restore_pre_additive_velocity(&mut self, velocity: Vec3) -> Vec3 {
        match self.applied_additive.take() {
            Some(additive) => velocity - additive,
            None => velocity,
        }
    }

    /// Blend root motion into `velocity`.
    ///
    /// Animation velocity replaces the physics velocity, then an override
    /// replaces that; otherwise the additive velocity is applied and
    /// remembered so the next tick can undo it.
    pub fn apply_to_velocity(&mut self, velocity: Vec3) -> Vec3 {
        if let Some(animation) = self.animation_velocity {
            return animation;
        }
        if let Some(forced) = self.override_velocity {
            return forced;
        }
        if self.additive_velocity != Vec3::ZERO {
            self.applied_additive = Some(self.additive_velocity);
            return velocity + self.additive_velocity;
        }
        velocity
    }
}

/// Integrate velocity toward the input acceleration without friction.
///
/// With no acceleration the character brakes at `braking_deceleration`
/// until it rests, never reversing direction. With acceleration the
/// velocity gains `acceleration * delta_time` and is clamped to `max_speed`.
pub fn calc_velocity(
    velocity: Vec3,
    acceleration: Vec3,
    delta_time: f32,
    max_speed: f32,
    braking_deceleration: f32,
) -> Vec3 {
    if acceleration.length_squared() <= f32::EPSILON {
        return apply_braking(velocity, delta_time, braking_deceleration);
    }

    (velocity + acceleration * delta_time).clamp_length_max(max_speed)
}

/// Decelerate toward rest without overshooting.
pub fn apply_braking(velocity: Vec3, delta_time: f32, braking_deceleration: f32) -> Vec3 {
    if velocity == Vec3::ZERO || braking_deceleration <= 0.0 {
        return velocity;
    }

    let braked = velocity - velocity.normalize() * braking_deceleration * delta_time;

    // Stop instead of reversing
    if braked.dot(velocity) <= 0.0 {
        Vec3::ZERO
    } else {
        braked
    }
}

/// Exponentially approach `target` from `current` at `speed` per second.
pub fn interp_rotation(current: Quat, target: Quat, delta_time: f32, speed: f32) -> Quat {
    if speed <= 0.0 {
        return target;
    }
    if current.abs_diff_eq(target, 1e-6) {
        return target;
    }

    let alpha = (speed * delta_time).clamp(0.0, 1.0);
    current.slerp(target, alpha).normalize()
}

/// Rotation whose forward axis (`-Z`) points along `direction`, with +Y kept up.
///
/// Returns `None` for a degenerate direction.
pub fn rotation_facing(direction: Vec3) -> Option<Quat> {
    let forward = direction.try_normalize()?;
    let right = forward.cross(Vec3::Y).try_normalize()?;
    let up = right.cross(forward);
    Some(Quat::from_mat3(&Mat3::from_cols(right, up, -forward)))
}

/// Remove pitch and roll, keeping only rotation about world up.
pub fn yaw_only(rotation: Quat) -> Quat {
    let (yaw, _, _) = rotation.to_euler(EulerRot::YXZ);
    Quat::from_rotation_y(yaw)
}

/// Express a world-space vector in the frame of `rotation`.
#[inline]
pub fn unrotate(rotation: Quat, vector: Vec3) -> Vec3 {
    rotation.inverse() * vector
}

/// Limit a root-motion velocity for the current mode.
///
/// While falling with a montage playing (a vault arc, for example) root
/// motion passes through untouched. Otherwise the horizontal part comes
/// from root motion and the vertical part keeps the current velocity.
pub fn constrain_root_motion_velocity(
    root_motion_velocity: Vec3,
    current_velocity: Vec3,
    falling: bool,
    montage_playing: bool,
) -> Vec3 {
    if falling && montage_playing {
        return root_motion_velocity;
    }

    Vec3::new(
        root_motion_velocity.x,
        current_velocity.y,
        root_motion_velocity.z,
    )
}
