//! Animation bridge.
//!
//! Values the animation side reads every frame to drive its own locomotion
//! state machine. The controller writes them; the animation side only reads.

use bevy::prelude::*;

use crate::backend::ClimbPhysicsBackend;
use crate::kinematics::unrotate;
use crate::movement::ClimbingMovement;
use crate::state::ClimbState;

/// Ground speed above which the character counts as moving.
pub const SHOULD_MOVE_MIN_SPEED: f32 = 5.0;

/// Locomotion values published for the animation side.
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq)]
#[reflect(Component)]
pub struct ClimbAnimState {
    /// Horizontal speed (length of the velocity's XZ part).
    pub ground_speed: f32,
    /// Vertical velocity.
    pub air_speed: f32,
    pub is_falling: bool,
    pub is_climbing: bool,
    /// Has input acceleration, is moving faster than
    /// [`SHOULD_MOVE_MIN_SPEED`] and is not falling.
    pub should_move: bool,
    /// Velocity in the character's local frame.
    pub climb_velocity: Vec3,
}

impl ClimbAnimState {
    /// Derive the published values from movement state and rotation.
    pub fn from_movement(movement: &ClimbingMovement, rotation: Quat) -> Self {
        Self::from_kinematics(movement.state(), movement.velocity, movement.acceleration, rotation)
    }

    /// Derive the published values from the mode, velocity and input acceleration.
    pub fn from_kinematics(state: ClimbState, velocity: Vec3, acceleration: Vec3, rotation: Quat) -> Self {
        let ground_speed = Vec2::new(velocity.x, velocity.z).length();
        let is_falling = state.is_falling();

        Self {
            ground_speed,
            air_speed: velocity.y,
            is_falling,
            is_climbing: state.is_climbing(),
            should_move: acceleration.length() > 0.0 && ground_speed > SHOULD_MOVE_MIN_SPEED && !is_falling,
            climb_velocity: unrotate(rotation, velocity),
        }
    }
}

/// Publish [`ClimbAnimState`] for every character that has one.
pub fn publish_anim_state<B: ClimbPhysicsBackend>(world: &mut World) {
    let entities: Vec<(Entity, ClimbState, Vec3, Vec3)> = world
        .query_filtered::<(Entity, &ClimbingMovement), With<ClimbAnimState>>()
        .iter(world)
        .map(|(e, movement)| (e, movement.state(), movement.velocity, movement.acceleration))
        .collect();

    for (entity, state, velocity, acceleration) in entities {
        let rotation = B::get_rotation(world, entity);
        if let Some(mut anim) = world.get_mut::<ClimbAnimState>(entity) {
            *anim = ClimbAnimState::from_kinematics(state, velocity, acceleration, rotation);
        }
    }
}
