//! Core controller systems.
//!
//! The per-tick climb integration and the systems that drive it. Everything
//! here is generic over the physics backend so the same integration runs
//! against Rapier or a scripted test scene.

use bevy::prelude::*;

use crate::backend::ClimbPhysicsBackend;
use crate::config::ClimbConfig;
use crate::controller::stop_climbing;
use crate::detection::{
    check_has_reached_floor, check_should_stop_climbing, ledge_detected, process_climbable_surface_info,
    trace_climbable_surfaces, CharacterFrame,
};
use crate::kinematics::{
    calc_velocity, constrain_root_motion_velocity, interp_rotation, rotation_facing, unrotate, RootMotion,
};
use crate::movement::ClimbingMovement;
use crate::transition::{play_climb_montage, ClimbMontage, MontagePlayer};

/// Run one climb integration step for `entity`.
///
/// Does nothing unless the character is climbing. Ticks shorter than
/// `min_tick_time` are skipped. If the surface is lost or a floor is
/// reached the climb ends immediately, but the rest of the step still
/// moves the character with the velocity it had before.
pub fn phys_climb<B: ClimbPhysicsBackend>(world: &mut World, entity: Entity, delta_time: f32) {
    let config = ClimbConfig::of(world, entity);
    let Some(movement) = world.get::<ClimbingMovement>(entity) else {
        return;
    };
    if !movement.is_climbing() {
        return;
    }
    if delta_time < config.min_tick_time {
        trace!("{entity}: skipping degenerate climb tick ({delta_time}s)");
        return;
    }

    trace_climbable_surfaces::<B>(world, entity);
    process_climbable_surface_info(world, entity);

    let Some(movement) = world.get::<ClimbingMovement>(entity) else {
        return;
    };
    let mut velocity = movement.velocity;
    let acceleration = movement.acceleration;

    let exited = check_should_stop_climbing(world, entity) || check_has_reached_floor::<B>(world, entity);
    if exited {
        stop_climbing::<B>(world, entity);
    }

    let mut root_motion = world.get::<RootMotion>(entity).cloned().unwrap_or_default();
    velocity = root_motion.restore_pre_additive_velocity(velocity);

    let driven = root_motion.is_driving();
    if !driven {
        velocity = calc_velocity(
            velocity,
            acceleration,
            delta_time,
            config.max_climb_speed,
            config.max_brake_climb_deceleration,
        );
    }

    velocity = root_motion.apply_to_velocity(velocity);
    if let Some(mut stored) = world.get_mut::<RootMotion>(entity) {
        stored.applied_additive = root_motion.applied_additive;
    }

    let old_location = B::get_position(world, entity);
    let adjusted = velocity * delta_time;
    // Hold the current rotation when root motion drives it, or when the exit
    // hook already reset it to yaw only; re-tilting here would undo that reset.
    let rotation = climb_rotation::<B>(world, entity, delta_time, driven || exited);

    if let Some(hit) = B::safe_move(world, entity, adjusted, rotation) {
        B::handle_impact(world, entity, &hit, delta_time, adjusted);
        B::slide_along_surface(world, entity, adjusted, 1.0 - hit.time, hit.normal, rotation);
    }

    if !driven {
        velocity = (B::get_position(world, entity) - old_location) / delta_time;
    }

    // The exit hook already zeroed the stored velocity
    let still_climbing = match world.get_mut::<ClimbingMovement>(entity) {
        Some(mut movement) if movement.is_climbing() => {
            movement.velocity = velocity;
            true
        }
        _ => false,
    };

    snap_movement_to_surface::<B>(world, entity, delta_time);

    if still_climbing && ledge_detected::<B>(world, entity) {
        let local_velocity = unrotate(B::get_rotation(world, entity), velocity);
        if local_velocity.y > config.ledge_climb_speed {
            play_climb_montage(world, entity, ClimbMontage::ClimbToTop);
        }
    }
}

/// Rotation the character should have after this tick.
///
/// `hold` (root motion driving, or the climb just ended) keeps the current
/// rotation. Otherwise the character turns toward facing into the tracked
/// surface at `rotation_interp_speed`.
pub fn climb_rotation<B: ClimbPhysicsBackend>(
    world: &World,
    entity: Entity,
    delta_time: f32,
    hold: bool,
) -> Quat {
    let current = B::get_rotation(world, entity);
    if hold {
        return current;
    }

    let config = ClimbConfig::of(world, entity);
    let normal = world
        .get::<ClimbingMovement>(entity)
        .map(|movement| movement.climbable_surface_normal())
        .unwrap_or(Vec3::ZERO);

    match rotation_facing(-normal) {
        Some(target) => interp_rotation(current, target, delta_time, config.rotation_interp_speed),
        None => current,
    }
}

/// Nudge the character toward the tracked surface.
///
/// The distance to the surface along the character's forward axis, scaled
/// by `delta_time * max_climb_speed`, is applied against the surface normal
/// through a collision-aware move.
pub fn snap_movement_to_surface<B: ClimbPhysicsBackend>(world: &mut World, entity: Entity, delta_time: f32) {
    let config = ClimbConfig::of(world, entity);
    let Some(surface) = world.get::<ClimbingMovement>(entity).map(|movement| movement.surface()) else {
        return;
    };
    if !surface.is_known() {
        return;
    }

    let frame = CharacterFrame::of::<B>(world, entity);
    let to_surface = (surface.location - frame.position).project_onto(frame.forward());
    let snap = -surface.normal * to_surface.length();

    B::safe_move(world, entity, snap * delta_time * config.max_climb_speed, frame.rotation);
}

/// Run the climb integration for every climbing character.
pub fn climb_physics<B: ClimbPhysicsBackend>(world: &mut World) {
    let dt = B::get_fixed_timestep(world);

    let entities: Vec<Entity> = world
        .query::<(Entity, &ClimbingMovement)>()
        .iter(world)
        .filter(|(_, movement)| movement.is_climbing())
        .map(|(e, _)| e)
        .collect();

    for entity in entities {
        phys_climb::<B>(world, entity, dt);
    }
}

/// Feed animation root motion into characters that are not climbing.
///
/// Climbing characters take root motion inside [`phys_climb`].
pub fn apply_ground_root_motion(
    mut q_movement: Query<(&mut ClimbingMovement, &RootMotion, Option<&MontagePlayer>)>,
) {
    for (mut movement, root_motion, player) in &mut q_movement {
        let Some(animation) = root_motion.animation_velocity else {
            continue;
        };
        if movement.is_climbing() {
            continue;
        }

        let falling = movement.is_falling();
        let montage_playing = player.is_some_and(|p| p.is_any_playing());
        movement.velocity = constrain_root_motion_velocity(animation, movement.velocity, falling, montage_playing);
    }
}
