//! Climbing movement component and the movement-mode hook.
//!
//! [`ClimbingMovement`] owns the climb state, the kinematics integrated while
//! climbing, and the latest surface scan. The mode only changes through
//! [`set_movement_mode`], which applies the entry/exit side effects and then
//! notifies observers.

use bevy::prelude::*;

use crate::backend::ClimbPhysicsBackend;
use crate::collision::CollisionData;
use crate::config::ClimbConfig;
use crate::detection::AggregatedSurface;
use crate::kinematics::{unrotate, yaw_only};
use crate::state::{ClimbState, ClimbStateEntered, ClimbStateExited};

/// Movement state of a climbing-capable character.
///
/// # Example
///
/// ```rust
/// use msg_climbing_controller::prelude::*;
///
/// let movement = ClimbingMovement::default();
/// assert_eq!(movement.state(), ClimbState::Grounded);
/// assert!(movement.orient_rotation_to_movement);
/// ```
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct ClimbingMovement {
    pub(crate) state: ClimbState,

    /// Current velocity (units/second).
    pub velocity: Vec3,

    /// Input acceleration for this tick, written by the intent system.
    pub acceleration: Vec3,

    /// Last non-zero world-space input direction.
    pub last_input_vector: Vec3,

    /// Whether the host controller should turn the character toward its
    /// movement direction. Disabled while climbing.
    pub orient_rotation_to_movement: bool,

    /// Capsule half height currently requested from the backend.
    pub(crate) capsule_half_height: f32,

    /// Hits of the latest climbable-surface sweep.
    #[reflect(ignore)]
    pub(crate) surface_hits: Vec<CollisionData>,

    /// Aggregate of `surface_hits`.
    pub(crate) surface: AggregatedSurface,
}

impl Default for ClimbingMovement {
    fn default() -> Self {
        Self {
            state: ClimbState::Grounded,
            velocity: Vec3::ZERO,
            acceleration: Vec3::ZERO,
            last_input_vector: Vec3::ZERO,
            orient_rotation_to_movement: true,
            capsule_half_height: ClimbConfig::default().standing_capsule_half_height,
            surface_hits: Vec::new(),
            surface: AggregatedSurface::default(),
        }
    }
}

impl ClimbingMovement {
    /// Create a grounded movement component.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a movement component that starts in `state`.
    ///
    /// No side effects are applied; use this only when spawning.
    pub fn with_state(state: ClimbState) -> Self {
        let climbing = state.is_climbing();
        Self {
            state,
            orient_rotation_to_movement: !climbing,
            capsule_half_height: if climbing {
                ClimbConfig::default().climbing_capsule_half_height
            } else {
                ClimbConfig::default().standing_capsule_half_height
            },
            ..default()
        }
    }

    /// Current movement mode.
    #[inline]
    pub fn state(&self) -> ClimbState {
        self.state
    }

    #[inline]
    pub fn is_climbing(&self) -> bool {
        self.state.is_climbing()
    }

    #[inline]
    pub fn is_falling(&self) -> bool {
        self.state.is_falling()
    }

    /// Capsule half height last requested from the backend.
    #[inline]
    pub fn capsule_half_height(&self) -> f32 {
        self.capsule_half_height
    }

    /// Hits of the latest surface sweep.
    pub fn surface_hits(&self) -> &[CollisionData] {
        &self.surface_hits
    }

    /// Aggregated surface of the latest sweep.
    #[inline]
    pub fn surface(&self) -> AggregatedSurface {
        self.surface
    }

    /// Normal of the tracked climbable surface, zero when none is known.
    #[inline]
    pub fn climbable_surface_normal(&self) -> Vec3 {
        self.surface.normal
    }

    /// Velocity expressed in the character's local frame.
    pub fn unrotated_climb_velocity(&self, rotation: Quat) -> Vec3 {
        unrotate(rotation, self.velocity)
    }

    /// Maximum speed for the current mode.
    pub fn max_speed(&self, config: &ClimbConfig) -> f32 {
        config.max_speed(self.is_climbing())
    }

    /// Maximum acceleration for the current mode.
    pub fn max_acceleration(&self, config: &ClimbConfig) -> f32 {
        config.max_acceleration(self.is_climbing())
    }
}

/// Change the movement mode of `entity`, applying the entry/exit side effects.
///
/// Entering climbing disables auto-orientation and shrinks the capsule.
/// Leaving climbing restores both, strips pitch and roll from the rotation
/// and zeroes velocity. Observers are triggered after the side effects.
/// Setting the current mode again does nothing.
pub fn set_movement_mode<B: ClimbPhysicsBackend>(world: &mut World, entity: Entity, mode: ClimbState) {
    let config = ClimbConfig::of(world, entity);

    let previous = {
        let Some(mut movement) = world.get_mut::<ClimbingMovement>(entity) else {
            return;
        };
        let previous = movement.state;
        if previous == mode {
            return;
        }
        movement.state = mode;

        if mode.is_climbing() {
            movement.orient_rotation_to_movement = false;
            movement.capsule_half_height = config.climbing_capsule_half_height;
        } else if previous.is_climbing() {
            movement.orient_rotation_to_movement = true;
            movement.capsule_half_height = config.standing_capsule_half_height;
            movement.velocity = Vec3::ZERO;
        }
        previous
    };

    debug!("{entity}: movement mode {previous:?} -> {mode:?}");

    if mode.is_climbing() {
        B::set_capsule_half_height(world, entity, config.climbing_capsule_half_height);
        world.trigger_targets(ClimbStateEntered, entity);
    } else if previous.is_climbing() {
        B::set_capsule_half_height(world, entity, config.standing_capsule_half_height);
        let rotation = yaw_only(B::get_rotation(world, entity));
        B::set_rotation(world, entity, rotation);
        world.trigger_targets(ClimbStateExited { next: mode }, entity);
    }
}

/// Zero the velocity and pending input acceleration of `entity`.
pub fn stop_movement_immediately(world: &mut World, entity: Entity) {
    if let Some(mut movement) = world.get_mut::<ClimbingMovement>(entity) {
        movement.velocity = Vec3::ZERO;
        movement.acceleration = Vec3::ZERO;
    }
}
