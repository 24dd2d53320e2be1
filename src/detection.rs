//! Climbable surface scanner.
//!
//! Capsule sweeps and line traces against the climbable layers, plus the
//! classification of what they find: wall or floor, ledge or not, floor
//! reached or not. Every query goes through the physics backend and is
//! measured from the character's own frame (its forward `-Z` and up `+Y`).

use bevy::prelude::*;

use crate::backend::ClimbPhysicsBackend;
use crate::collision::{CollisionData, LineTrace};
use crate::config::ClimbConfig;
use crate::movement::ClimbingMovement;

/// Mean impact point and normalized mean impact normal of a surface scan.
///
/// Both are zero when the scan found nothing; a zero normal means no
/// known surface.
#[derive(Reflect, Debug, Clone, Copy, Default, PartialEq)]
pub struct AggregatedSurface {
    /// Average impact point.
    pub location: Vec3,
    /// Normalized average impact normal.
    pub normal: Vec3,
}

impl AggregatedSurface {
    /// Whether a surface is known.
    #[inline]
    pub fn is_known(&self) -> bool {
        self.normal != Vec3::ZERO
    }
}

/// Position and orientation a query is measured from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacterFrame {
    pub position: Vec3,
    pub rotation: Quat,
}

impl CharacterFrame {
    /// Read the frame of `entity` through the backend.
    pub fn of<B: ClimbPhysicsBackend>(world: &World, entity: Entity) -> Self {
        Self {
            position: B::get_position(world, entity),
            rotation: B::get_rotation(world, entity),
        }
    }

    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    #[inline]
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    #[inline]
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }
}

/// Average a set of hits.
pub fn aggregate_surface(hits: &[CollisionData]) -> AggregatedSurface {
    if hits.is_empty() {
        return AggregatedSurface::default();
    }

    let count = hits.len() as f32;
    let (location_sum, normal_sum) = hits
        .iter()
        .fold((Vec3::ZERO, Vec3::ZERO), |(location, normal), hit| {
            (location + hit.point, normal + hit.normal)
        });

    AggregatedSurface {
        location: location_sum / count,
        normal: normal_sum.normalize_or_zero(),
    }
}

/// Whether an aggregated surface should end the climb.
///
/// True without a known surface, or when the surface normal is within
/// `max_floor_angle_degrees` of world up (inclusive), which makes it a floor.
pub fn surface_ends_climb(surface: &AggregatedSurface, has_hits: bool, config: &ClimbConfig) -> bool {
    if !has_hits || !surface.is_known() {
        return true;
    }

    // angle <= limit, compared on cosines
    surface.normal.dot(Vec3::Y) >= config.max_floor_angle_cos()
}

/// Sweep for climbable surfaces in front of the character and store the hits.
///
/// Returns whether anything was hit.
pub fn trace_climbable_surfaces<B: ClimbPhysicsBackend>(world: &mut World, entity: Entity) -> bool {
    let config = ClimbConfig::of(world, entity);
    let frame = CharacterFrame::of::<B>(world, entity);

    let start = frame.position + frame.forward() * config.surface_trace_forward_offset;
    let end = start + frame.forward();

    let hits = B::capsule_sweep(
        world,
        start,
        end,
        config.capsule_trace_radius,
        config.capsule_trace_half_height,
        config.climbable_layers,
        entity,
    );

    let found = !hits.is_empty();
    if let Some(mut movement) = world.get_mut::<ClimbingMovement>(entity) {
        movement.surface_hits = hits;
    }
    found
}

/// Trace forward from eye height.
///
/// The trace starts `eye_height + start_offset` above the character along
/// its up axis and runs `distance` along its forward axis.
pub fn trace_from_eye_height<B: ClimbPhysicsBackend>(
    world: &mut World,
    entity: Entity,
    distance: f32,
    start_offset: f32,
) -> LineTrace {
    let config = ClimbConfig::of(world, entity);
    let frame = CharacterFrame::of::<B>(world, entity);

    let start = frame.position + frame.up() * (config.eye_height + start_offset);
    let end = start + frame.forward() * distance;

    line_trace::<B>(world, entity, start, end, config.climbable_layers)
}

/// Trace a line against `layers` and keep the segment.
pub(crate) fn line_trace<B: ClimbPhysicsBackend>(
    world: &mut World,
    entity: Entity,
    start: Vec3,
    end: Vec3,
    layers: u32,
) -> LineTrace {
    let hit = B::line_trace(world, start, end, layers, entity);
    LineTrace::new(start, end, hit)
}

/// Recompute the aggregated surface from the stored hits.
pub fn process_climbable_surface_info(world: &mut World, entity: Entity) -> AggregatedSurface {
    let Some(mut movement) = world.get_mut::<ClimbingMovement>(entity) else {
        return AggregatedSurface::default();
    };

    let surface = aggregate_surface(&movement.surface_hits);
    movement.surface = surface;
    surface
}

/// Whether the tracked surface no longer supports climbing.
pub fn check_should_stop_climbing(world: &World, entity: Entity) -> bool {
    let config = ClimbConfig::of(world, entity);
    let Some(movement) = world.get::<ClimbingMovement>(entity) else {
        return true;
    };

    surface_ends_climb(&movement.surface, !movement.surface_hits.is_empty(), &config)
}

/// Whether a descending climber has reached a floor.
///
/// Sweeps just below the character; a hit whose normal is parallel to world
/// up counts only while the local vertical velocity is below
/// `-floor_reach_speed`.
pub fn check_has_reached_floor<B: ClimbPhysicsBackend>(world: &mut World, entity: Entity) -> bool {
    let config = ClimbConfig::of(world, entity);
    let frame = CharacterFrame::of::<B>(world, entity);
    let Some(local_velocity) = world
        .get::<ClimbingMovement>(entity)
        .map(|movement| movement.unrotated_climb_velocity(frame.rotation))
    else {
        return false;
    };

    let down = -frame.up();
    let start = frame.position + down * 50.0;
    let end = start + down;

    let hits = B::capsule_sweep(
        world,
        start,
        end,
        config.capsule_trace_radius,
        config.capsule_trace_half_height,
        config.climbable_layers,
        entity,
    );

    let descending = local_velocity.y < -config.floor_reach_speed;
    descending && hits.iter().any(|hit| hit.is_parallel_to(Vec3::Y))
}

/// Whether the wall ends just above the character's eyes with a walkable top.
///
/// An eye trace 50 units above eye height must miss; a 100 unit downward
/// trace from its end must then hit.
pub fn ledge_detected<B: ClimbPhysicsBackend>(world: &mut World, entity: Entity) -> bool {
    let eye = trace_from_eye_height::<B>(world, entity, 100.0, 50.0);
    if eye.is_blocking_hit() {
        return false;
    }

    let config = ClimbConfig::of(world, entity);
    let down = -CharacterFrame::of::<B>(world, entity).up();
    line_trace::<B>(world, entity, eye.end, eye.end + down * 100.0, config.climbable_layers)
        .is_blocking_hit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(point: Vec3, normal: Vec3) -> CollisionData {
        CollisionData::new(0.0, normal, point, None)
    }

    #[test]
    fn empty_scan_aggregates_to_zero() {
        let surface = aggregate_surface(&[]);
        assert_eq!(surface.location, Vec3::ZERO);
        assert_eq!(surface.normal, Vec3::ZERO);
        assert!(!surface.is_known());
    }

    #[test]
    fn aggregate_averages_points_and_normalizes_normals() {
        let hits = [
            hit(Vec3::new(-10.0, 0.0, -60.0), Vec3::Z),
            hit(Vec3::new(10.0, 20.0, -60.0), Vec3::X),
        ];

        let surface = aggregate_surface(&hits);
        assert_eq!(surface.location, Vec3::new(0.0, 10.0, -60.0));
        assert!((surface.normal.length() - 1.0).abs() < 1e-5);
        assert!((surface.normal - Vec3::new(1.0, 0.0, 1.0).normalize()).length() < 1e-5);
    }

    #[test]
    fn opposing_normals_leave_no_known_surface() {
        let hits = [hit(Vec3::ZERO, Vec3::Z), hit(Vec3::ZERO, Vec3::NEG_Z)];
        let surface = aggregate_surface(&hits);
        assert_eq!(surface.normal, Vec3::ZERO);
        assert!(surface_ends_climb(&surface, true, &ClimbConfig::default()));
    }

    #[test]
    fn walls_keep_climbing() {
        let config = ClimbConfig::default();
        let wall = AggregatedSurface {
            location: Vec3::ZERO,
            normal: Vec3::Z,
        };
        assert!(!surface_ends_climb(&wall, true, &config));

        // 80 degrees from up: steep, still a wall
        let steep = AggregatedSurface {
            location: Vec3::ZERO,
            normal: Vec3::new(0.0, 80f32.to_radians().cos(), 80f32.to_radians().sin()),
        };
        assert!(!surface_ends_climb(&steep, true, &config));
    }

    #[test]
    fn floors_end_climbing() {
        let config = ClimbConfig::default();
        let floor = AggregatedSurface {
            location: Vec3::ZERO,
            normal: Vec3::Y,
        };
        assert!(surface_ends_climb(&floor, true, &config));

        let slope_45 = AggregatedSurface {
            location: Vec3::ZERO,
            normal: Vec3::new(0.0, 1.0, 1.0).normalize(),
        };
        assert!(surface_ends_climb(&slope_45, true, &config));
    }

    #[test]
    fn exactly_sixty_degrees_ends_climbing() {
        let config = ClimbConfig::default();
        let boundary = AggregatedSurface {
            location: Vec3::ZERO,
            normal: Vec3::new(0.866_025_4, 0.5, 0.0),
        };
        assert!(surface_ends_climb(&boundary, true, &config));
    }

    #[test]
    fn no_hits_ends_climbing() {
        let config = ClimbConfig::default();
        let stale = AggregatedSurface {
            location: Vec3::ZERO,
            normal: Vec3::Z,
        };
        assert!(surface_ends_climb(&stale, false, &config));
    }

    #[test]
    fn character_frame_axes() {
        let frame = CharacterFrame {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        };
        assert_eq!(frame.forward(), Vec3::NEG_Z);
        assert_eq!(frame.up(), Vec3::Y);
        assert_eq!(frame.right(), Vec3::X);
    }
}
