//! Climbing configuration components.
//!
//! This module defines the tuning parameters for the climbing controller:
//! scanner geometry, climb speeds, capsule sizes, climb-down and vault probe
//! offsets, and the montage handles used for animated transitions.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Collision layer of static world geometry.
pub const WORLD_STATIC_LAYER: u32 = 1 << 0;

/// Errors produced while loading or validating a [`ClimbConfig`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClimbConfigError {
    #[error("RON parse error: {0}")]
    Ron(String),

    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f32 },

    #[error("climbing capsule half height {climbing} must not exceed standing half height {standing}")]
    InvalidCapsule { climbing: f32, standing: f32 },

    #[error("no climbable collision layers configured")]
    EmptyLayers,
}

/// Geometry of the forward/downward trace ladder used to find vault anchors.
///
/// Rung `i` starts `up_offset` above the character and
/// `forward_amount * (i + 1)` ahead of it (with `rung_forward_reduction`
/// subtracted from `forward_amount` on every rung but the first), then
/// traces `down_distance * (i + 1)` downward.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultProbeConfig {
    /// Number of rungs. The first hit rung is the vault start, the last the landing.
    pub rungs: usize,
    /// Base forward distance per rung.
    pub forward_amount: f32,
    /// Amount removed from `forward_amount` on every rung after the first.
    pub rung_forward_reduction: f32,
    /// Height above the character the rungs start from.
    pub up_offset: f32,
    /// Base downward trace length per rung.
    pub down_distance: f32,
}

impl Default for VaultProbeConfig {
    fn default() -> Self {
        Self {
            rungs: 5,
            forward_amount: 150.0,
            rung_forward_reduction: 20.0,
            up_offset: 100.0,
            down_distance: 100.0,
        }
    }
}

impl VaultProbeConfig {
    /// Forward distance of rung `index`, measured from the character.
    pub fn rung_forward(&self, index: usize) -> f32 {
        let amount = if index == 0 {
            self.forward_amount
        } else {
            self.forward_amount - self.rung_forward_reduction
        };
        amount * (index + 1) as f32
    }

    /// Downward trace length of rung `index`.
    pub fn rung_down(&self, index: usize) -> f32 {
        self.down_distance * (index + 1) as f32
    }
}

/// Configuration parameters for the climbing controller.
///
/// Defaults are tuned for centimetre-scale scenes (a 96 unit standing
/// capsule half height).
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[reflect(Component)]
#[serde(default)]
pub struct ClimbConfig {
    // === Scanner Settings ===
    /// Bitmask of collision layers considered climbable.
    pub climbable_layers: u32,

    /// Radius of the climbable-surface capsule sweep.
    pub capsule_trace_radius: f32,

    /// Half height of the climbable-surface capsule sweep.
    pub capsule_trace_half_height: f32,

    /// How far in front of the character the surface sweep starts.
    pub surface_trace_forward_offset: f32,

    /// Height of the eyes above the character origin.
    pub eye_height: f32,

    /// Surfaces whose normal is within this many degrees of world up are floors.
    pub max_floor_angle_degrees: f32,

    // === Climb Movement Settings ===
    /// Maximum climbing speed (units/second).
    pub max_climb_speed: f32,

    /// Climbing acceleration from input (units/second^2).
    pub max_climb_acceleration: f32,

    /// Braking deceleration applied without climb input (units/second^2).
    pub max_brake_climb_deceleration: f32,

    /// Rate of the exponential approach to the wall-facing rotation (per second).
    pub rotation_interp_speed: f32,

    /// Ticks shorter than this are skipped entirely.
    pub min_tick_time: f32,

    // === Ground Movement Settings ===
    /// Maximum speed outside of climbing, reported by [`ClimbConfig::max_speed`].
    pub max_walk_speed: f32,

    /// Acceleration outside of climbing, reported by [`ClimbConfig::max_acceleration`].
    pub max_walk_acceleration: f32,

    // === Capsule Settings ===
    /// Capsule half height while climbing.
    pub climbing_capsule_half_height: f32,

    /// Capsule half height while standing or falling.
    pub standing_capsule_half_height: f32,

    // === Transition Settings ===
    /// Local downward speed above which a floor below ends the climb.
    pub floor_reach_speed: f32,

    /// Local upward speed above which a detected ledge triggers climb-to-top.
    pub ledge_climb_speed: f32,

    /// Minimum |dot(input, up)| for a hop request to pick a direction.
    pub hop_input_threshold: f32,

    /// Forward offset of the walkable-surface trace when climbing down.
    pub climb_down_walkable_offset: f32,

    /// Additional forward offset of the open-air trace when climbing down.
    pub climb_down_ledge_offset: f32,

    /// Vault probe geometry.
    pub vault: VaultProbeConfig,
}

impl Default for ClimbConfig {
    fn default() -> Self {
        Self {
            // Scanner settings
            climbable_layers: WORLD_STATIC_LAYER,
            capsule_trace_radius: 50.0,
            capsule_trace_half_height: 72.0,
            surface_trace_forward_offset: 30.0,
            eye_height: 64.0,
            max_floor_angle_degrees: 60.0,

            // Climb movement settings
            max_climb_speed: 100.0,
            max_climb_acceleration: 300.0,
            max_brake_climb_deceleration: 400.0,
            rotation_interp_speed: 5.0,
            min_tick_time: 1e-6,

            // Ground movement settings
            max_walk_speed: 600.0,
            max_walk_acceleration: 2048.0,

            // Capsule settings
            climbing_capsule_half_height: 48.0,
            standing_capsule_half_height: 96.0,

            // Transition settings
            floor_reach_speed: 10.0,
            ledge_climb_speed: 10.0,
            hop_input_threshold: 0.9,
            climb_down_walkable_offset: 100.0,
            climb_down_ledge_offset: 50.0,
            vault: VaultProbeConfig::default(),
        }
    }
}

impl ClimbConfig {
    /// Create a config for responsive player climbing.
    pub fn player() -> Self {
        Self {
            max_climb_speed: 120.0,
            max_climb_acceleration: 400.0,
            ..default()
        }
    }

    /// Config of `entity`, or the defaults when it has none.
    pub fn of(world: &World, entity: Entity) -> Self {
        world.get::<ClimbConfig>(entity).copied().unwrap_or_default()
    }

    /// Parse a config from RON and validate it.
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_ron_str(source: &str) -> Result<Self, ClimbConfigError> {
        let config: Self =
            ron::from_str(source).map_err(|e| ClimbConfigError::Ron(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the config describes a usable climber.
    pub fn validate(&self) -> Result<(), ClimbConfigError> {
        if self.climbable_layers == 0 {
            return Err(ClimbConfigError::EmptyLayers);
        }

        let positive = [
            ("capsule_trace_radius", self.capsule_trace_radius),
            ("capsule_trace_half_height", self.capsule_trace_half_height),
            ("max_climb_speed", self.max_climb_speed),
            ("max_climb_acceleration", self.max_climb_acceleration),
            ("rotation_interp_speed", self.rotation_interp_speed),
            ("climbing_capsule_half_height", self.climbing_capsule_half_height),
            ("standing_capsule_half_height", self.standing_capsule_half_height),
        ];
        for (field, value) in positive {
            if !(value > 0.0) {
                return Err(ClimbConfigError::NonPositive { field, value });
            }
        }

        if self.climbing_capsule_half_height > self.standing_capsule_half_height {
            return Err(ClimbConfigError::InvalidCapsule {
                climbing: self.climbing_capsule_half_height,
                standing: self.standing_capsule_half_height,
            });
        }

        Ok(())
    }

    /// Cosine of the floor angle limit.
    #[inline]
    pub fn max_floor_angle_cos(&self) -> f32 {
        self.max_floor_angle_degrees.to_radians().cos()
    }

    /// Maximum speed for the given mode.
    pub fn max_speed(&self, climbing: bool) -> f32 {
        if climbing {
            self.max_climb_speed
        } else {
            self.max_walk_speed
        }
    }

    /// Maximum acceleration for the given mode.
    pub fn max_acceleration(&self, climbing: bool) -> f32 {
        if climbing {
            self.max_climb_acceleration
        } else {
            self.max_walk_acceleration
        }
    }

    /// Builder: set climbable layers.
    pub fn with_climbable_layers(mut self, layers: u32) -> Self {
        self.climbable_layers = layers;
        self
    }

    /// Builder: set climb speed and acceleration.
    pub fn with_climb_movement(mut self, max_speed: f32, acceleration: f32) -> Self {
        self.max_climb_speed = max_speed;
        self.max_climb_acceleration = acceleration;
        self
    }

    /// Builder: set braking deceleration.
    pub fn with_brake_deceleration(mut self, deceleration: f32) -> Self {
        self.max_brake_climb_deceleration = deceleration;
        self
    }

    /// Builder: set eye height.
    pub fn with_eye_height(mut self, height: f32) -> Self {
        self.eye_height = height;
        self
    }

    /// Builder: set the surface sweep capsule.
    pub fn with_capsule_trace(mut self, radius: f32, half_height: f32) -> Self {
        self.capsule_trace_radius = radius;
        self.capsule_trace_half_height = half_height;
        self
    }

    /// Builder: set climbing and standing capsule half heights.
    pub fn with_capsule_half_heights(mut self, climbing: f32, standing: f32) -> Self {
        self.climbing_capsule_half_height = climbing;
        self.standing_capsule_half_height = standing;
        self
    }

    /// Builder: set climb-down trace offsets.
    pub fn with_climb_down_offsets(mut self, walkable: f32, ledge: f32) -> Self {
        self.climb_down_walkable_offset = walkable;
        self.climb_down_ledge_offset = ledge;
        self
    }

    /// Builder: set vault probe geometry.
    pub fn with_vault_probe(mut self, vault: VaultProbeConfig) -> Self {
        self.vault = vault;
        self
    }
}

/// Animation clips for each climbing transition.
///
/// The controller never inspects the clips; it only hands them to the
/// [`MontagePlayer`](crate::transition::MontagePlayer) and compares handles
/// when a montage finishes. Unset slots disable that transition.
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct ClimbMontages {
    pub idle_to_climb: Option<Handle<AnimationClip>>,
    pub climb_to_top: Option<Handle<AnimationClip>>,
    pub climb_down_ledge: Option<Handle<AnimationClip>>,
    pub vault: Option<Handle<AnimationClip>>,
    pub hop_up: Option<Handle<AnimationClip>>,
    pub hop_down: Option<Handle<AnimationClip>>,
}
