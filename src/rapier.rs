//! Rapier3D physics backend implementation.
//!
//! This module provides the physics backend for Bevy Rapier3D.
//! Enable with the `rapier3d` feature.
//!
//! The climber is a kinematic, position-based body: the controller moves it
//! with shape casts through [`Rapier3dBackend::safe_move`] rather than with
//! forces.

use bevy::ecs::system::SystemState;
use bevy::prelude::*;
use bevy_rapier3d::geometry::Group;
use bevy_rapier3d::parry::shape::{Capsule, SharedShape};
use bevy_rapier3d::prelude::*;

use crate::backend::{ClimbPhysicsBackend, NoOpBackendPlugin};
use crate::collision::{CollisionData, MoveHit};
use crate::config::{ClimbConfig, WORLD_STATIC_LAYER};

/// Gap kept between the climber and whatever blocks a move.
pub const MOVE_SKIN: f32 = 0.5;

/// Upper bound on hits collected by one capsule sweep.
pub const MAX_SWEEP_HITS: usize = 16;

/// Rapier3D physics backend for the climbing controller.
///
/// Queries run against the default Rapier context, read through
/// [`ReadRapierContext`] from the world on demand.
pub struct Rapier3dBackend;

impl ClimbPhysicsBackend for Rapier3dBackend {
    fn plugin() -> impl Plugin {
        NoOpBackendPlugin
    }

    fn capsule_sweep(
        world: &mut World,
        start: Vec3,
        end: Vec3,
        radius: f32,
        half_height: f32,
        layers: u32,
        exclude_entity: Entity,
    ) -> Vec<CollisionData> {
        let capsule = Collider::from(SharedShape::new(Capsule::new_y((half_height - radius).max(0.0), radius)));
        let delta = end - start;
        let distance = delta.length();
        let direction = delta.try_normalize().unwrap_or(Vec3::NEG_Y);

        with_context(world, |context| {
            let mut hits: Vec<CollisionData> = Vec::new();

            // One cast per collider, excluding everything already hit
            while hits.len() < MAX_SWEEP_HITS {
                let found = {
                    let seen = |entity: Entity| !hits.iter().any(|hit| hit.entity == Some(entity));
                    let filter = climb_filter(exclude_entity, layers).predicate(&seen);
                    context.cast_shape(
                        start,
                        Quat::IDENTITY,
                        direction,
                        &capsule,
                        ShapeCastOptions {
                            max_time_of_impact: distance,
                            stop_at_penetration: true,
                            ..default()
                        },
                        filter,
                    )
                };

                let Some((hit_entity, hit)) = found else {
                    break;
                };
                let normal = hit.details.map(|d| d.normal1).unwrap_or(-direction);
                // Contact on the hit collider; the capsule center is not level with it
                let point = hit.details.map(|d| d.witness1).unwrap_or_else(|| {
                    let center = start + direction * hit.time_of_impact;
                    center - normal * radius
                });
                hits.push(CollisionData::new(hit.time_of_impact, normal, point, Some(hit_entity)));
            }

            hits
        })
        .unwrap_or_default()
    }

    fn line_trace(
        world: &mut World,
        start: Vec3,
        end: Vec3,
        layers: u32,
        exclude_entity: Entity,
    ) -> Option<CollisionData> {
        let delta = end - start;
        let distance = delta.length();
        let direction = delta.try_normalize()?;

        with_context(world, |context| {
            context
                .cast_ray_and_get_normal(
                    start,
                    direction,
                    distance,
                    true,
                    climb_filter(exclude_entity, layers),
                )
                .map(|(hit_entity, hit)| {
                    CollisionData::new(hit.time_of_impact, hit.normal, hit.point, Some(hit_entity))
                })
        })
        .flatten()
    }

    fn get_position(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Transform>(entity)
            .map(|t| t.translation)
            .or_else(|| world.get::<GlobalTransform>(entity).map(|t| t.translation()))
            .unwrap_or(Vec3::ZERO)
    }

    fn get_rotation(world: &World, entity: Entity) -> Quat {
        world
            .get::<Transform>(entity)
            .map(|t| t.rotation)
            .or_else(|| {
                world.get::<GlobalTransform>(entity).map(|t| {
                    let (_, rotation, _) = t.to_scale_rotation_translation();
                    rotation
                })
            })
            .unwrap_or(Quat::IDENTITY)
    }

    fn set_rotation(world: &mut World, entity: Entity, rotation: Quat) {
        if let Some(mut transform) = world.get_mut::<Transform>(entity) {
            transform.rotation = rotation;
        }
    }

    fn safe_move(world: &mut World, entity: Entity, delta: Vec3, rotation: Quat) -> Option<MoveHit> {
        let position = Self::get_position(world, entity);
        let distance = delta.length();
        let collider = world.get::<Collider>(entity).cloned();

        let blocked = match (collider, delta.try_normalize()) {
            (Some(collider), Some(direction)) => with_context(world, |context| {
                context.cast_shape(
                    position,
                    rotation,
                    direction,
                    &collider,
                    ShapeCastOptions {
                        max_time_of_impact: distance + MOVE_SKIN,
                        stop_at_penetration: false,
                        ..default()
                    },
                    climb_filter(entity, u32::MAX),
                )
            })
            .flatten()
            .map(|(hit_entity, hit)| (hit_entity, hit, direction)),
            _ => None,
        };

        let (applied, result) = match blocked {
            Some((hit_entity, hit, direction)) => {
                let allowed = (hit.time_of_impact - MOVE_SKIN).clamp(0.0, distance);
                let normal = hit.details.map(|d| d.normal1).unwrap_or(-direction);
                let point = hit
                    .details
                    .map(|d| d.witness1)
                    .unwrap_or(position + direction * hit.time_of_impact);
                let time = if distance > 0.0 { allowed / distance } else { 1.0 };
                (
                    direction * allowed,
                    Some(MoveHit::new(time, normal, point, Some(hit_entity))),
                )
            }
            None => (delta, None),
        };

        if let Some(mut transform) = world.get_mut::<Transform>(entity) {
            transform.translation += applied;
            transform.rotation = rotation;
        }
        result
    }

    fn set_capsule_half_height(world: &mut World, entity: Entity, half_height: f32) {
        let Some(mut collider) = world.get_mut::<Collider>(entity) else {
            return;
        };
        let Some(radius) = collider.as_capsule().map(|capsule| capsule.radius()) else {
            return;
        };
        *collider = Collider::capsule_y((half_height - radius).max(0.0), radius);
    }

    fn get_fixed_timestep(world: &World) -> f32 {
        world
            .get_resource::<Time<Fixed>>()
            .map(|t| t.delta_secs())
            .filter(|&d| d > 0.0)
            .unwrap_or(1.0 / 60.0)
    }
}

/// Run `f` against the default Rapier context, if there is one.
fn with_context<R>(world: &mut World, f: impl FnOnce(&RapierContext) -> R) -> Option<R> {
    let mut state = SystemState::<ReadRapierContext>::new(world);
    let rapier_context = state.get(world);
    let context = rapier_context.single().ok()?;
    Some(f(&context))
}

/// Query filter for climber traces: skip the climber and sensors, and only
/// hit colliders that are members of `layers`.
fn climb_filter<'a>(exclude_entity: Entity, layers: u32) -> QueryFilter<'a> {
    QueryFilter::default()
        .exclude_rigid_body(exclude_entity)
        .exclude_collider(exclude_entity)
        .exclude_sensors()
        .groups(CollisionGroups::new(
            Group::ALL,
            Group::from_bits_truncate(layers),
        ))
}

/// Bundle for creating a climber with Rapier3D physics.
///
/// The climber is a kinematic position-based capsule sized to the standing
/// half height of the default [`ClimbConfig`].
///
/// # Example
///
/// ```ignore
/// use bevy::prelude::*;
/// use msg_climbing_controller::prelude::*;
///
/// fn spawn_player(mut commands: Commands) {
///     commands.spawn((
///         Transform::from_xyz(0.0, 96.0, 0.0),
///         ClimbingMovement::default(),
///         ClimbConfig::player(),
///         ClimbIntent::default(),
///         Rapier3dClimberBundle::new(),
///     ));
/// }
/// ```
#[derive(Bundle)]
pub struct Rapier3dClimberBundle {
    /// Kinematic body moved by the controller.
    pub rigid_body: RigidBody,
    /// Upright capsule. Resized when climbing starts and ends.
    pub collider: Collider,
    /// Collision groups of the climber itself.
    pub collision_groups: CollisionGroups,
}

impl Default for Rapier3dClimberBundle {
    fn default() -> Self {
        Self::new()
    }
}

impl Rapier3dClimberBundle {
    /// Radius of the default climber capsule.
    pub const DEFAULT_RADIUS: f32 = 42.0;

    /// Create a climber bundle with the default capsule.
    pub fn new() -> Self {
        let half_height = ClimbConfig::default().standing_capsule_half_height;
        Self::with_capsule(half_height, Self::DEFAULT_RADIUS)
    }

    /// Create a climber bundle with a capsule of `half_height` (caps included)
    /// and `radius`.
    pub fn with_capsule(half_height: f32, radius: f32) -> Self {
        Self {
            rigid_body: RigidBody::KinematicPositionBased,
            collider: Collider::capsule_y((half_height - radius).max(0.0), radius),
            collision_groups: CollisionGroups::new(Group::ALL, Group::ALL),
        }
    }

    /// Builder: put the climber itself in `memberships` and let it collide with `filters`.
    pub fn with_groups(mut self, memberships: u32, filters: u32) -> Self {
        self.collision_groups = CollisionGroups::new(
            Group::from_bits_truncate(memberships),
            Group::from_bits_truncate(filters),
        );
        self
    }
}

/// Collision groups for climbable static geometry.
pub fn climbable_groups() -> CollisionGroups {
    CollisionGroups::new(Group::from_bits_truncate(WORLD_STATIC_LAYER), Group::ALL)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_app() -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, TransformPlugin));
        app.add_plugins(RapierPhysicsPlugin::<NoUserData>::default());
        app.insert_resource(Time::<Fixed>::from_hz(60.0));
        app
    }

    #[test]
    fn rapier_backend_get_position() {
        let mut app = create_test_app();

        let entity = app
            .world_mut()
            .spawn((Transform::from_xyz(100.0, 200.0, -50.0), RigidBody::KinematicPositionBased))
            .id();

        app.update();

        let pos = Rapier3dBackend::get_position(app.world(), entity);
        assert!((pos - Vec3::new(100.0, 200.0, -50.0)).length() < 0.01);
    }

    #[test]
    fn rapier_backend_rotation() {
        let mut app = create_test_app();
        let entity = app.world_mut().spawn(Transform::default()).id();

        let rotation = Quat::from_rotation_y(0.7);
        Rapier3dBackend::set_rotation(app.world_mut(), entity, rotation);

        let read = Rapier3dBackend::get_rotation(app.world(), entity);
        assert!(read.abs_diff_eq(rotation, 1e-6));
    }

    #[test]
    fn capsule_resize_keeps_radius() {
        let mut app = create_test_app();
        let entity = app
            .world_mut()
            .spawn((Transform::default(), Rapier3dClimberBundle::new()))
            .id();

        Rapier3dBackend::set_capsule_half_height(app.world_mut(), entity, 48.0);

        let collider = app.world().get::<Collider>(entity).unwrap();
        let capsule = collider.as_capsule().unwrap();
        assert!((capsule.radius() - Rapier3dClimberBundle::DEFAULT_RADIUS).abs() < 1e-4);
        assert!((capsule.half_height() - (48.0 - Rapier3dClimberBundle::DEFAULT_RADIUS)).abs() < 1e-4);
    }

    #[test]
    fn rapier_climber_bundle_creates_valid_entity() {
        let mut app = create_test_app();

        let entity = app
            .world_mut()
            .spawn((Transform::default(), Rapier3dClimberBundle::new()))
            .id();

        app.update();

        assert_eq!(
            app.world().get::<RigidBody>(entity),
            Some(&RigidBody::KinematicPositionBased)
        );
        assert!(app.world().get::<Collider>(entity).is_some());
        assert!(app.world().get::<CollisionGroups>(entity).is_some());
    }

    #[test]
    fn line_trace_hits_wall() {
        let mut app = create_test_app();

        app.world_mut().spawn((
            Transform::from_xyz(0.0, 0.0, -100.0),
            RigidBody::Fixed,
            Collider::cuboid(500.0, 500.0, 40.0),
            climbable_groups(),
        ));
        let climber = app
            .world_mut()
            .spawn((Transform::default(), Rapier3dClimberBundle::new()))
            .id();

        app.update();
        app.update();

        let hit = Rapier3dBackend::line_trace(
            app.world_mut(),
            Vec3::new(0.0, 64.0, 0.0),
            Vec3::new(0.0, 64.0, -100.0),
            WORLD_STATIC_LAYER,
            climber,
        )
        .expect("wall should block the trace");

        assert!((hit.point.z + 60.0).abs() < 0.1);
        assert!((hit.normal - Vec3::Z).length() < 1e-3);
    }

    #[test]
    fn sweep_reports_contact_point_on_hit_collider() {
        let mut app = create_test_app();

        // Step with its top front edge at y = -40, z = -60
        app.world_mut().spawn((
            Transform::from_xyz(0.0, -270.0, -100.0),
            RigidBody::Fixed,
            Collider::cuboid(500.0, 230.0, 40.0),
            climbable_groups(),
        ));
        let climber = app
            .world_mut()
            .spawn((Transform::default(), Rapier3dClimberBundle::new()))
            .id();

        app.update();
        app.update();

        // The lower hemisphere catches the edge, 18 units below the capsule center
        let hits = Rapier3dBackend::capsule_sweep(
            app.world_mut(),
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, -100.0),
            50.0,
            72.0,
            WORLD_STATIC_LAYER,
            climber,
        );

        assert_eq!(hits.len(), 1);
        let hit = hits[0];
        assert!((hit.point.y + 40.0).abs() < 0.5, "point {:?} is not on the edge", hit.point);
        assert!((hit.point.z + 60.0).abs() < 0.5, "point {:?} is not on the edge", hit.point);
        assert!(hit.normal.y > 0.2 && hit.normal.z > 0.8);
    }
}
