//! Climb state controller.
//!
//! Entry and exit decisions for climbing: whether a climb can start, whether
//! the character can climb down a ledge, toggling, and hopping between holds.
//! Mode changes themselves go through
//! [`set_movement_mode`](crate::movement::set_movement_mode).

use bevy::prelude::*;

use crate::backend::ClimbPhysicsBackend;
use crate::config::ClimbConfig;
use crate::detection::{line_trace, trace_climbable_surfaces, trace_from_eye_height, CharacterFrame};
use crate::kinematics::unrotate;
use crate::movement::{set_movement_mode, ClimbingMovement};
use crate::state::ClimbState;
use crate::transition::{
    play_climb_montage, set_motion_warp_target, try_start_vaulting, ClimbMontage, HOP_DOWN, HOP_UP,
};

/// Direction of a hop between holds.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HopDirection {
    Up,
    Down,
}

/// Pick a hop direction from a local-frame input vector.
///
/// The normalized input must point within `threshold` (a cosine) of local
/// up or down; anything in between is ambiguous.
pub fn hop_direction(local_input: Vec3, threshold: f32) -> Option<HopDirection> {
    let alignment = local_input.normalize_or_zero().dot(Vec3::Y);

    if alignment >= threshold {
        Some(HopDirection::Up)
    } else if alignment <= -threshold {
        Some(HopDirection::Down)
    } else {
        None
    }
}

/// Enter climbing.
pub fn start_climbing<B: ClimbPhysicsBackend>(world: &mut World, entity: Entity) {
    set_movement_mode::<B>(world, entity, ClimbState::Climbing);
}

/// Leave climbing for falling.
pub fn stop_climbing<B: ClimbPhysicsBackend>(world: &mut World, entity: Entity) {
    set_movement_mode::<B>(world, entity, ClimbState::Falling);
}

/// Whether a climb can start from where the character stands.
///
/// Requires not falling, a climbable surface in front, and a wall at eye
/// height.
pub fn can_start_climbing<B: ClimbPhysicsBackend>(world: &mut World, entity: Entity) -> bool {
    let Some(movement) = world.get::<ClimbingMovement>(entity) else {
        return false;
    };
    if movement.is_falling() {
        return false;
    }
    if !trace_climbable_surfaces::<B>(world, entity) {
        return false;
    }

    trace_from_eye_height::<B>(world, entity, 100.0, 0.0).is_blocking_hit()
}

/// Whether the character stands at a ledge it can climb down.
///
/// A walkable surface must be found ahead, and open air just past it.
pub fn can_climb_down<B: ClimbPhysicsBackend>(world: &mut World, entity: Entity) -> bool {
    let Some(movement) = world.get::<ClimbingMovement>(entity) else {
        return false;
    };
    if movement.is_falling() {
        return false;
    }

    let config = ClimbConfig::of(world, entity);
    let frame = CharacterFrame::of::<B>(world, entity);
    let down = -frame.up();

    let walkable_start = frame.position + frame.forward() * config.climb_down_walkable_offset;
    let walkable = line_trace::<B>(
        world,
        entity,
        walkable_start,
        walkable_start + down * 100.0,
        config.climbable_layers,
    );

    let ledge_start = walkable.start + frame.forward() * config.climb_down_ledge_offset;
    let ledge = line_trace::<B>(
        world,
        entity,
        ledge_start,
        ledge_start + down * 200.0,
        config.climbable_layers,
    );

    walkable.is_blocking_hit() && !ledge.is_blocking_hit()
}

/// Start or stop climbing.
///
/// Enabling tries a regular climb entry first, then climbing down a ledge,
/// then a vault. Disabling always stops.
pub fn toggle_climbing<B: ClimbPhysicsBackend>(world: &mut World, entity: Entity, enable: bool) {
    if !enable {
        stop_climbing::<B>(world, entity);
        return;
    }

    if can_start_climbing::<B>(world, entity) {
        play_climb_montage(world, entity, ClimbMontage::IdleToClimb);
    } else if can_climb_down::<B>(world, entity) {
        play_climb_montage(world, entity, ClimbMontage::ClimbDownLedge);
    } else {
        try_start_vaulting::<B>(world, entity);
    }
}

/// Hop up or down depending on the last input direction.
///
/// Returns the direction that was attempted, if any.
pub fn request_hopping<B: ClimbPhysicsBackend>(world: &mut World, entity: Entity) -> Option<HopDirection> {
    let rotation = B::get_rotation(world, entity);
    let last_input = world.get::<ClimbingMovement>(entity)?.last_input_vector;
    let threshold = ClimbConfig::of(world, entity).hop_input_threshold;

    let direction = hop_direction(unrotate(rotation, last_input), threshold)?;
    match direction {
        HopDirection::Up => handle_hop_up::<B>(world, entity),
        HopDirection::Down => handle_hop_down::<B>(world, entity),
    };
    Some(direction)
}

/// Target point of a hop up, if there is a hold above.
///
/// Both a trace just below eye height and one well above it must hit.
pub fn check_can_hop_up<B: ClimbPhysicsBackend>(world: &mut World, entity: Entity) -> Option<Vec3> {
    let hit = trace_from_eye_height::<B>(world, entity, 100.0, -10.0);
    let upper = trace_from_eye_height::<B>(world, entity, 100.0, 150.0);

    if !upper.is_blocking_hit() {
        return None;
    }
    hit.impact_point()
}

/// Target point of a hop down, if there is a wall below.
pub fn check_can_hop_down<B: ClimbPhysicsBackend>(world: &mut World, entity: Entity) -> Option<Vec3> {
    trace_from_eye_height::<B>(world, entity, 100.0, -300.0).impact_point()
}

/// Warp to the hop-up target and request the hop-up montage.
pub fn handle_hop_up<B: ClimbPhysicsBackend>(world: &mut World, entity: Entity) -> bool {
    let Some(target) = check_can_hop_up::<B>(world, entity) else {
        return false;
    };
    set_motion_warp_target(world, entity, HOP_UP, target);
    play_climb_montage(world, entity, ClimbMontage::HopUp)
}

/// Warp to the hop-down target and request the hop-down montage.
pub fn handle_hop_down<B: ClimbPhysicsBackend>(world: &mut World, entity: Entity) -> bool {
    let Some(target) = check_can_hop_down::<B>(world, entity) else {
        return false;
    };
    set_motion_warp_target(world, entity, HOP_DOWN, target);
    play_climb_montage(world, entity, ClimbMontage::HopDown)
}
