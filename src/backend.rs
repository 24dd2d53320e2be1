//! Physics backend abstraction.
//!
//! This module defines the trait that physics backends must implement
//! to drive the climbing controller. The controller never talks to a
//! physics engine directly: every sweep, trace and collision-aware move
//! goes through [`ClimbPhysicsBackend`], which allows easy swapping
//! between physics engines (Rapier3D, Avian, a scripted test scene, etc.).

use bevy::prelude::*;

use crate::collision::{CollisionData, MoveHit};

/// Trait for physics backend implementations.
///
/// Implement this trait to integrate a physics engine with the climbing
/// controller. The backend handles the kinematic actor: shape queries
/// against the scene, collision-safe moves and capsule resizing.
///
/// Query methods take `&mut World` because most engines need to build a
/// query context (system state) before they can read their broad phase.
///
/// For an example implementation, see the `rapier` module's
/// `Rapier3dBackend` (enabled with the `rapier3d` feature).
pub trait ClimbPhysicsBackend: 'static + Send + Sync {
    /// Returns the plugin that sets up this backend.
    fn plugin() -> impl Plugin;

    /// Sweep an upright capsule from `start` to `end` and return every hit.
    ///
    /// Initial overlaps count as hits. Only colliders whose collision layer
    /// intersects `layers` are considered.
    ///
    /// # Arguments
    /// * `world` - The ECS world for queries
    /// * `start` - Capsule center at the start of the sweep
    /// * `end` - Capsule center at the end of the sweep
    /// * `radius` - Capsule radius
    /// * `half_height` - Capsule half height, including the hemispherical caps
    /// * `layers` - Bitmask of collision layers to test against
    /// * `exclude_entity` - Entity to exclude from the sweep (usually self)
    fn capsule_sweep(
        world: &mut World,
        start: Vec3,
        end: Vec3,
        radius: f32,
        half_height: f32,
        layers: u32,
        exclude_entity: Entity,
    ) -> Vec<CollisionData>;

    /// Trace a line segment from `start` to `end` and return the first blocking hit.
    ///
    /// # Arguments
    /// * `world` - The ECS world for queries
    /// * `start` - Segment start in world space
    /// * `end` - Segment end in world space
    /// * `layers` - Bitmask of collision layers to test against
    /// * `exclude_entity` - Entity to exclude from the trace (usually self)
    fn line_trace(
        world: &mut World,
        start: Vec3,
        end: Vec3,
        layers: u32,
        exclude_entity: Entity,
    ) -> Option<CollisionData>;

    /// Get the current position of an entity.
    fn get_position(world: &World, entity: Entity) -> Vec3;

    /// Get the current rotation of an entity.
    fn get_rotation(world: &World, entity: Entity) -> Quat;

    /// Set the rotation of an entity without moving it.
    fn set_rotation(world: &mut World, entity: Entity, rotation: Quat);

    /// Move an entity by `delta` while sweeping its collider, and apply `rotation`.
    ///
    /// Returns `None` when the full move was applied, or the blocking hit
    /// (with the applied fraction in [`MoveHit::time`]) when it was cut short.
    fn safe_move(world: &mut World, entity: Entity, delta: Vec3, rotation: Quat) -> Option<MoveHit>;

    /// Resize the entity's capsule collider.
    ///
    /// `half_height` includes the hemispherical caps.
    fn set_capsule_half_height(world: &mut World, entity: Entity, half_height: f32);

    /// Get the fixed timestep delta time.
    fn get_fixed_timestep(world: &World) -> f32;

    /// React to a blocked move before sliding.
    ///
    /// The default does nothing. Backends that push rigid bodies or fire
    /// gameplay hit events can override this.
    fn handle_impact(_world: &mut World, _entity: Entity, _hit: &MoveHit, _delta_time: f32, _move_delta: Vec3) {}

    /// Slide along a blocking surface for the remaining `time` fraction of `delta`.
    ///
    /// Returns the fraction of `time` that was actually applied.
    fn slide_along_surface(
        world: &mut World,
        entity: Entity,
        delta: Vec3,
        time: f32,
        normal: Vec3,
        rotation: Quat,
    ) -> f32 {
        let slide_delta = (delta - normal * delta.dot(normal)) * time;

        // Sliding back into the direction we came from would only jitter
        if slide_delta.dot(delta) <= 0.0 {
            return 0.0;
        }

        match Self::safe_move(world, entity, slide_delta, rotation) {
            Some(hit) => time * hit.time,
            None => time,
        }
    }
}

/// Empty plugin for backends that don't need additional setup.
pub struct NoOpBackendPlugin;

impl Plugin for NoOpBackendPlugin {
    fn build(&self, _app: &mut App) {}
}
