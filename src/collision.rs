//! Collision result structures.
//!
//! These structures hold the results of physics queries (capsule sweeps,
//! line traces and collision-aware moves) used by the climbing scanner.

use bevy::prelude::*;

/// Cosine above which two unit normals are considered parallel.
pub const PARALLEL_COSINE_THRESHOLD: f32 = 0.999845;

/// Information about a sweep/trace collision.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CollisionData {
    /// Distance along the query to the hit.
    pub distance: f32,
    /// Normal of the surface at the impact point.
    pub normal: Vec3,
    /// World position of the impact point.
    pub point: Vec3,
    /// Entity that was hit (if any).
    pub entity: Option<Entity>,
}

impl CollisionData {
    /// Create a collision result.
    pub fn new(distance: f32, normal: Vec3, point: Vec3, entity: Option<Entity>) -> Self {
        Self {
            distance,
            normal,
            point,
            entity,
        }
    }

    /// Whether the impact normal is parallel (or anti-parallel) to `axis`.
    pub fn is_parallel_to(&self, axis: Vec3) -> bool {
        self.normal.dot(axis).abs() >= PARALLEL_COSINE_THRESHOLD
    }
}

/// Result of a single line trace, kept even when nothing was hit.
///
/// Ledge and climb-down checks chain further traces from the end of a
/// missed trace, so the segment is always available.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LineTrace {
    /// Where the trace started.
    pub start: Vec3,
    /// Where the trace ended.
    pub end: Vec3,
    /// Blocking hit, if any.
    pub hit: Option<CollisionData>,
}

impl LineTrace {
    /// Create a trace result.
    pub fn new(start: Vec3, end: Vec3, hit: Option<CollisionData>) -> Self {
        Self { start, end, hit }
    }

    /// Whether the trace was blocked.
    #[inline]
    pub fn is_blocking_hit(&self) -> bool {
        self.hit.is_some()
    }

    /// Impact point of the blocking hit.
    #[inline]
    pub fn impact_point(&self) -> Option<Vec3> {
        self.hit.map(|h| h.point)
    }
}

/// Result of a blocked collision-aware move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveHit {
    /// Fraction of the requested move that was applied (0.0 - 1.0).
    pub time: f32,
    /// Normal of the blocking surface.
    pub normal: Vec3,
    /// Contact point on the blocking surface.
    pub point: Vec3,
    /// Entity that blocked the move.
    pub entity: Option<Entity>,
}

impl MoveHit {
    /// Create a move hit.
    pub fn new(time: f32, normal: Vec3, point: Vec3, entity: Option<Entity>) -> Self {
        Self {
            time: time.clamp(0.0, 1.0),
            normal,
            point,
            entity,
        }
    }
}
