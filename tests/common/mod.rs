//! Scripted physics backend for integration tests.
//!
//! The scene is a list of axis-aligned boxes. Line traces are exact slab
//! tests; capsule sweeps approximate the capsule by spheres sampled along its
//! core segment, which is plenty for walls, ledges and floors.

#![allow(dead_code)]

use bevy::prelude::*;
use msg_climbing_controller::collision::{CollisionData, MoveHit};
use msg_climbing_controller::config::WORLD_STATIC_LAYER;
use msg_climbing_controller::prelude::*;

/// Radius of the character capsule used by [`ScriptedBackend::safe_move`].
pub const CHARACTER_RADIUS: f32 = 42.0;

/// Distance kept between the character capsule and blocking boxes.
const MOVE_SKIN: f32 = 0.01;

/// Spheres sampled along a capsule's core segment.
const CAPSULE_SAMPLES: usize = 5;

/// Static box in the test scene.
#[derive(Debug, Clone, Copy)]
pub struct TestBox {
    pub min: Vec3,
    pub max: Vec3,
    pub layers: u32,
}

impl TestBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min,
            max,
            layers: WORLD_STATIC_LAYER,
        }
    }

    pub fn with_layers(mut self, layers: u32) -> Self {
        self.layers = layers;
        self
    }

    fn distance_to(&self, point: Vec3) -> f32 {
        (point - point.clamp(self.min, self.max)).length()
    }
}

/// Boxes the scripted backend queries against.
#[derive(Resource, Debug, Clone, Default)]
pub struct TestScene {
    pub boxes: Vec<TestBox>,
}

/// Capsule half height last applied by the backend.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct CapsuleHalfHeight(pub f32);

/// Number of capsule resizes the backend performed.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct CapsuleResizes(pub u32);

pub struct TestScenePlugin;

impl Plugin for TestScenePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TestScene>();
    }
}

/// Physics backend answering queries from [`TestScene`].
pub struct ScriptedBackend;

/// Entry parameter and outward normal of a segment against a box.
///
/// A segment starting inside the box hits at `t = 0` facing back along it.
fn segment_box(start: Vec3, end: Vec3, min: Vec3, max: Vec3) -> Option<(f32, Vec3)> {
    let delta = end - start;
    let mut t_enter = 0.0f32;
    let mut t_exit = 1.0f32;
    let mut normal = Vec3::ZERO;

    for axis in 0..3 {
        let s = start[axis];
        let d = delta[axis];
        if d.abs() < 1e-8 {
            if s < min[axis] || s > max[axis] {
                return None;
            }
            continue;
        }

        let mut t0 = (min[axis] - s) / d;
        let mut t1 = (max[axis] - s) / d;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }

        if t0 > t_enter {
            t_enter = t0;
            normal = Vec3::ZERO;
            normal[axis] = -d.signum();
        }
        t_exit = t_exit.min(t1);
        if t_enter > t_exit {
            return None;
        }
    }

    if normal == Vec3::ZERO {
        return Some((0.0, -delta.normalize_or_zero()));
    }
    Some((t_enter, normal))
}

/// Face normal of the shallowest exit out of `b` for a point inside it.
fn shallowest_face(point: Vec3, b: &TestBox) -> Vec3 {
    let faces = [
        (point.x - b.min.x, Vec3::NEG_X),
        (b.max.x - point.x, Vec3::X),
        (point.y - b.min.y, Vec3::NEG_Y),
        (b.max.y - point.y, Vec3::Y),
        (point.z - b.min.z, Vec3::NEG_Z),
        (b.max.z - point.z, Vec3::Z),
    ];
    faces
        .into_iter()
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, normal)| normal)
        .unwrap_or(Vec3::Y)
}

fn capsule_samples(center: Vec3, radius: f32, half_height: f32) -> [Vec3; CAPSULE_SAMPLES] {
    let core = (half_height - radius).max(0.0);
    let mut samples = [center; CAPSULE_SAMPLES];
    for (i, sample) in samples.iter_mut().enumerate() {
        let k = i as f32 / (CAPSULE_SAMPLES - 1) as f32 * 2.0 - 1.0;
        *sample = center + Vec3::Y * core * k;
    }
    samples
}

/// Sweep a sampled capsule against one box.
///
/// Returns `(t, normal, point)`. Overlaps at the start report `t = 0`.
fn sweep_box(samples: &[Vec3], delta: Vec3, radius: f32, b: &TestBox) -> Option<(f32, Vec3, Vec3)> {
    let deepest = samples
        .iter()
        .map(|s| (*s, b.distance_to(*s)))
        .min_by(|a, b| a.1.total_cmp(&b.1))?;

    if deepest.1 <= radius {
        let sample = deepest.0;
        let closest = sample.clamp(b.min, b.max);
        let offset = sample - closest;
        let normal = if offset.length() > 1e-6 {
            offset.normalize()
        } else {
            shallowest_face(sample, b)
        };
        return Some((0.0, normal, closest));
    }

    let grown_min = b.min - Vec3::splat(radius);
    let grown_max = b.max + Vec3::splat(radius);
    samples
        .iter()
        .filter_map(|s| {
            let (t, normal) = segment_box(*s, *s + delta, grown_min, grown_max)?;
            let contact = (*s + delta * t).clamp(b.min, b.max);
            Some((t, normal, contact))
        })
        .min_by(|a, b| a.0.total_cmp(&b.0))
}

impl ClimbPhysicsBackend for ScriptedBackend {
    fn plugin() -> impl Plugin {
        TestScenePlugin
    }

    fn capsule_sweep(
        world: &mut World,
        start: Vec3,
        end: Vec3,
        radius: f32,
        half_height: f32,
        layers: u32,
        _exclude_entity: Entity,
    ) -> Vec<CollisionData> {
        let Some(scene) = world.get_resource::<TestScene>() else {
            return Vec::new();
        };

        let delta = end - start;
        let samples = capsule_samples(start, radius, half_height);
        scene
            .boxes
            .iter()
            .filter(|b| b.layers & layers != 0)
            .filter_map(|b| sweep_box(&samples, delta, radius, b))
            .map(|(t, normal, point)| CollisionData::new(delta.length() * t, normal, point, None))
            .collect()
    }

    fn line_trace(
        world: &mut World,
        start: Vec3,
        end: Vec3,
        layers: u32,
        _exclude_entity: Entity,
    ) -> Option<CollisionData> {
        let scene = world.get_resource::<TestScene>()?;
        let delta = end - start;

        scene
            .boxes
            .iter()
            .filter(|b| b.layers & layers != 0)
            .filter_map(|b| segment_box(start, end, b.min, b.max))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(t, normal)| CollisionData::new(delta.length() * t, normal, start + delta * t, None))
    }

    fn get_position(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Transform>(entity)
            .map(|t| t.translation)
            .unwrap_or(Vec3::ZERO)
    }

    fn get_rotation(world: &World, entity: Entity) -> Quat {
        world
            .get::<Transform>(entity)
            .map(|t| t.rotation)
            .unwrap_or(Quat::IDENTITY)
    }

    fn set_rotation(world: &mut World, entity: Entity, rotation: Quat) {
        if let Some(mut transform) = world.get_mut::<Transform>(entity) {
            transform.rotation = rotation;
        }
    }

    fn safe_move(world: &mut World, entity: Entity, delta: Vec3, rotation: Quat) -> Option<MoveHit> {
        let position = Self::get_position(world, entity);
        let half_height = world
            .get::<CapsuleHalfHeight>(entity)
            .map(|h| h.0)
            .unwrap_or(ClimbConfig::default().standing_capsule_half_height);
        let length = delta.length();

        let mut hit: Option<MoveHit> = None;
        if length > 0.0 {
            if let Some(scene) = world.get_resource::<TestScene>() {
                let samples = capsule_samples(position, CHARACTER_RADIUS, half_height);
                for b in &scene.boxes {
                    // Boxes we already overlap never block
                    let overlapping = samples.iter().any(|s| b.distance_to(*s) < CHARACTER_RADIUS - 1e-3);
                    if overlapping {
                        continue;
                    }
                    let Some((t, normal, point)) = sweep_box(&samples, delta, CHARACTER_RADIUS, b) else {
                        continue;
                    };
                    let t = (t - MOVE_SKIN / length).max(0.0);
                    if hit.as_ref().is_none_or(|h| t < h.time) {
                        hit = Some(MoveHit::new(t, normal, point, None));
                    }
                }
            }
        }

        let applied = hit.as_ref().map_or(1.0, |h| h.time);
        if let Some(mut transform) = world.get_mut::<Transform>(entity) {
            transform.translation = position + delta * applied;
            transform.rotation = rotation;
        }
        hit
    }

    fn set_capsule_half_height(world: &mut World, entity: Entity, half_height: f32) {
        let resizes = world.get::<CapsuleResizes>(entity).map_or(0, |r| r.0);
        if let Ok(mut entity_mut) = world.get_entity_mut(entity) {
            entity_mut.insert((CapsuleHalfHeight(half_height), CapsuleResizes(resizes + 1)));
        }
    }

    fn get_fixed_timestep(_world: &World) -> f32 {
        1.0 / 60.0
    }
}

/// Clip handle for a test montage.
pub fn clip(id: u128) -> Handle<AnimationClip> {
    Handle::weak_from_u128(id)
}

/// Montage set with every slot filled by a distinct clip.
pub fn test_montages() -> ClimbMontages {
    ClimbMontages {
        idle_to_climb: Some(clip(1)),
        climb_to_top: Some(clip(2)),
        climb_down_ledge: Some(clip(3)),
        vault: Some(clip(4)),
        hop_up: Some(clip(5)),
        hop_down: Some(clip(6)),
    }
}
