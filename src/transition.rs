//! Transition orchestration.
//!
//! Animated transitions (entering a climb, climbing over the top, climbing
//! down a ledge, vaulting, hopping) are requested as montages on the
//! character's [`MontagePlayer`], with anchor points placed in its
//! [`MotionWarping`] targets. The animation side plays the clip and reports
//! back with [`MontageEnded`] / [`MontageBlendingOut`]; only then is the
//! mode change committed.

use bevy::ecs::event::EventCursor;
use bevy::prelude::*;

use crate::backend::ClimbPhysicsBackend;
use crate::config::{ClimbConfig, ClimbMontages};
use crate::controller::start_climbing;
use crate::detection::{line_trace, CharacterFrame};
use crate::movement::{set_movement_mode, stop_movement_immediately, ClimbingMovement};
use crate::state::ClimbState;

/// Warp target for the vault take-off point.
pub const VAULT_START: &str = "VaultStart";
/// Warp target for the vault landing point.
pub const VAULT_END: &str = "VaultEnd";
/// Warp target for a hop up.
pub const HOP_UP: &str = "HopUp";
/// Warp target for a hop down.
pub const HOP_DOWN: &str = "HopDown";

/// Montage slots of [`ClimbMontages`].
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClimbMontage {
    IdleToClimb,
    ClimbToTop,
    ClimbDownLedge,
    Vault,
    HopUp,
    HopDown,
}

impl ClimbMontages {
    /// Clip assigned to `slot`, if any.
    pub fn get(&self, slot: ClimbMontage) -> Option<&Handle<AnimationClip>> {
        match slot {
            ClimbMontage::IdleToClimb => self.idle_to_climb.as_ref(),
            ClimbMontage::ClimbToTop => self.climb_to_top.as_ref(),
            ClimbMontage::ClimbDownLedge => self.climb_down_ledge.as_ref(),
            ClimbMontage::Vault => self.vault.as_ref(),
            ClimbMontage::HopUp => self.hop_up.as_ref(),
            ClimbMontage::HopDown => self.hop_down.as_ref(),
        }
    }

    /// Whether `clip` is the clip assigned to `slot`.
    pub fn is(&self, slot: ClimbMontage, clip: &Handle<AnimationClip>) -> bool {
        self.get(slot).is_some_and(|assigned| assigned == clip)
    }
}

/// Montage playback state shared with the animation side.
///
/// At most one montage plays at a time. The animation side reads
/// [`MontagePlayer::current`] to start playback and reports completion
/// with [`MontageEnded`].
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct MontagePlayer {
    current: Option<Handle<AnimationClip>>,
    plays: u32,
}

impl MontagePlayer {
    /// Whether any montage is playing.
    #[inline]
    pub fn is_any_playing(&self) -> bool {
        self.current.is_some()
    }

    /// Clip currently playing.
    pub fn current(&self) -> Option<&Handle<AnimationClip>> {
        self.current.as_ref()
    }

    /// Number of montages started so far.
    #[inline]
    pub fn play_count(&self) -> u32 {
        self.plays
    }

    /// Start `clip`. Returns false if a montage is already playing.
    pub fn play(&mut self, clip: Handle<AnimationClip>) -> bool {
        if self.is_any_playing() {
            return false;
        }
        self.current = Some(clip);
        self.plays += 1;
        true
    }

    /// Mark `clip` as finished. Returns whether it was the playing clip.
    pub fn finish(&mut self, clip: &Handle<AnimationClip>) -> bool {
        if self.current.as_ref() == Some(clip) {
            self.current = None;
            true
        } else {
            false
        }
    }
}

/// A named anchor point for motion warping.
#[derive(Reflect, Debug, Clone, PartialEq)]
pub struct WarpTarget {
    pub name: String,
    pub location: Vec3,
}

/// Motion warping targets of a character.
///
/// Targets are upserted by name and read by the animation side when a
/// montage plays.
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct MotionWarping {
    targets: Vec<WarpTarget>,
}

impl MotionWarping {
    /// Add a target or move an existing one.
    pub fn add_or_update(&mut self, name: &str, location: Vec3) {
        match self.targets.iter_mut().find(|target| target.name == name) {
            Some(target) => target.location = location,
            None => self.targets.push(WarpTarget {
                name: name.to_owned(),
                location,
            }),
        }
    }

    /// Location of the target called `name`.
    pub fn get(&self, name: &str) -> Option<Vec3> {
        self.targets
            .iter()
            .find(|target| target.name == name)
            .map(|target| target.location)
    }

    /// Remove the target called `name`.
    pub fn remove(&mut self, name: &str) -> Option<Vec3> {
        let index = self.targets.iter().position(|target| target.name == name)?;
        Some(self.targets.remove(index).location)
    }

    pub fn targets(&self) -> &[WarpTarget] {
        &self.targets
    }
}

/// Sent by the animation side when a montage has finished.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct MontageEnded {
    pub entity: Entity,
    pub clip: Handle<AnimationClip>,
    pub interrupted: bool,
}

/// Sent by the animation side when a montage starts blending out.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct MontageBlendingOut {
    pub entity: Entity,
    pub clip: Handle<AnimationClip>,
    pub interrupted: bool,
}

/// Request the montage in `slot`.
///
/// Does nothing if the slot is unset, the character has no player, or a
/// montage is already playing. Returns whether playback was requested.
pub fn play_climb_montage(world: &mut World, entity: Entity, slot: ClimbMontage) -> bool {
    let Some(clip) = world
        .get::<ClimbMontages>(entity)
        .and_then(|montages| montages.get(slot))
        .cloned()
    else {
        return false;
    };
    let Some(mut player) = world.get_mut::<MontagePlayer>(entity) else {
        return false;
    };

    if player.play(clip) {
        debug!("{entity}: playing {slot:?} montage");
        true
    } else {
        trace!("{entity}: {slot:?} montage dropped, another montage is playing");
        false
    }
}

/// Upsert a warp target on the character's [`MotionWarping`].
pub fn set_motion_warp_target(world: &mut World, entity: Entity, name: &str, location: Vec3) {
    if let Some(mut warping) = world.get_mut::<MotionWarping>(entity) {
        warping.add_or_update(name, location);
    }
}

/// Probe for a vault over a low obstacle in front of the character.
///
/// Runs the rung ladder from [`VaultProbeConfig`](crate::config::VaultProbeConfig).
/// The first rung's hit is the take-off point and the last rung's hit the
/// landing point; both must be found.
pub fn can_start_vaulting<B: ClimbPhysicsBackend>(world: &mut World, entity: Entity) -> Option<(Vec3, Vec3)> {
    let falling = world.get::<ClimbingMovement>(entity)?.is_falling();
    if falling {
        return None;
    }

    let config = ClimbConfig::of(world, entity);
    let vault = config.vault;
    if vault.rungs == 0 {
        return None;
    }

    let frame = CharacterFrame::of::<B>(world, entity);
    let last = vault.rungs - 1;
    let mut start_point = Vec3::ZERO;
    let mut land_point = Vec3::ZERO;

    for rung in 0..vault.rungs {
        let start = frame.position
            + frame.up() * vault.up_offset
            + frame.forward() * vault.rung_forward(rung);
        let end = start - frame.up() * vault.rung_down(rung);

        let trace = line_trace::<B>(world, entity, start, end, config.climbable_layers);
        let Some(point) = trace.impact_point() else {
            continue;
        };

        if rung == 0 {
            start_point = point;
        }
        if rung == last {
            land_point = point;
        }
    }

    (start_point != Vec3::ZERO && land_point != Vec3::ZERO).then_some((start_point, land_point))
}

/// Start a vault if the probe finds take-off and landing points.
pub fn try_start_vaulting<B: ClimbPhysicsBackend>(world: &mut World, entity: Entity) -> bool {
    let Some((start, land)) = can_start_vaulting::<B>(world, entity) else {
        return false;
    };

    set_motion_warp_target(world, entity, VAULT_START, start);
    set_motion_warp_target(world, entity, VAULT_END, land);

    start_climbing::<B>(world, entity);
    play_climb_montage(world, entity, ClimbMontage::Vault);
    true
}

/// Commit the mode change that a finished montage was waiting for.
///
/// Entering clips commit climbing and stop residual motion; exit clips
/// return the character to the ground. Other clips are ignored.
pub fn on_climb_montage_ended<B: ClimbPhysicsBackend>(
    world: &mut World,
    entity: Entity,
    clip: &Handle<AnimationClip>,
    interrupted: bool,
) {
    let Some(montages) = world.get::<ClimbMontages>(entity) else {
        return;
    };

    let enters = montages.is(ClimbMontage::IdleToClimb, clip)
        || montages.is(ClimbMontage::ClimbDownLedge, clip);
    let leaves = montages.is(ClimbMontage::ClimbToTop, clip) || montages.is(ClimbMontage::Vault, clip);

    if enters {
        debug!("{entity}: climb entry montage finished (interrupted: {interrupted})");
        start_climbing::<B>(world, entity);
        stop_movement_immediately(world, entity);
    }
    if leaves {
        debug!("{entity}: climb exit montage finished (interrupted: {interrupted})");
        set_movement_mode::<B>(world, entity, ClimbState::Grounded);
    }
}

/// Route montage completion events to [`on_climb_montage_ended`].
///
/// Blending out and ended both commit; only ended frees the player. Events
/// are read through private cursors and left buffered for other readers.
pub fn handle_montage_events<B: ClimbPhysicsBackend>(
    world: &mut World,
    mut blending_out: Local<EventCursor<MontageBlendingOut>>,
    mut ended: Local<EventCursor<MontageEnded>>,
) {
    let mut finished: Vec<(Entity, Handle<AnimationClip>, bool, bool)> = Vec::new();

    if let Some(events) = world.get_resource::<Events<MontageBlendingOut>>() {
        finished.extend(
            blending_out
                .read(events)
                .map(|event| (event.entity, event.clip.clone(), event.interrupted, false)),
        );
    }
    if let Some(events) = world.get_resource::<Events<MontageEnded>>() {
        finished.extend(
            ended
                .read(events)
                .map(|event| (event.entity, event.clip.clone(), event.interrupted, true)),
        );
    }

    for (entity, clip, interrupted, frees_player) in finished {
        if frees_player {
            if let Some(mut player) = world.get_mut::<MontagePlayer>(entity) {
                player.finish(&clip);
            }
        }
        on_climb_montage_ended::<B>(world, entity, &clip, interrupted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(id: u128) -> Handle<AnimationClip> {
        Handle::weak_from_u128(id)
    }

    #[test]
    fn player_is_exclusive() {
        let mut player = MontagePlayer::default();
        assert!(player.play(clip(1)));
        assert!(!player.play(clip(2)));
        assert_eq!(player.play_count(), 1);
        assert_eq!(player.current(), Some(&clip(1)));
    }

    #[test]
    fn finishing_other_clip_keeps_playing() {
        let mut player = MontagePlayer::default();
        player.play(clip(1));
        assert!(!player.finish(&clip(2)));
        assert!(player.is_any_playing());
        assert!(player.finish(&clip(1)));
        assert!(!player.is_any_playing());
        assert!(player.play(clip(2)));
    }

    #[test]
    fn warp_targets_upsert_by_name() {
        let mut warping = MotionWarping::default();
        warping.add_or_update(HOP_UP, Vec3::ONE);
        warping.add_or_update(HOP_UP, Vec3::Y);
        warping.add_or_update(HOP_DOWN, Vec3::NEG_Y);

        assert_eq!(warping.targets().len(), 2);
        assert_eq!(warping.get(HOP_UP), Some(Vec3::Y));
        assert_eq!(warping.remove(HOP_DOWN), Some(Vec3::NEG_Y));
        assert_eq!(warping.get(HOP_DOWN), None);
    }

    #[test]
    fn montage_slots_resolve() {
        let montages = ClimbMontages {
            vault: Some(clip(7)),
            ..default()
        };
        assert!(montages.is(ClimbMontage::Vault, &clip(7)));
        assert!(!montages.is(ClimbMontage::Vault, &clip(8)));
        assert!(montages.get(ClimbMontage::HopUp).is_none());
    }

    #[test]
    fn unset_slot_plays_nothing() {
        let mut world = World::new();
        let entity = world
            .spawn((ClimbMontages::default(), MontagePlayer::default()))
            .id();

        assert!(!play_climb_montage(&mut world, entity, ClimbMontage::IdleToClimb));
        assert_eq!(world.get::<MontagePlayer>(entity).unwrap().play_count(), 0);
    }

    #[test]
    fn second_request_is_dropped() {
        let mut world = World::new();
        let entity = world
            .spawn((
                ClimbMontages {
                    idle_to_climb: Some(clip(1)),
                    hop_up: Some(clip(2)),
                    ..default()
                },
                MontagePlayer::default(),
            ))
            .id();

        assert!(play_climb_montage(&mut world, entity, ClimbMontage::IdleToClimb));
        assert!(!play_climb_montage(&mut world, entity, ClimbMontage::HopUp));

        let player = world.get::<MontagePlayer>(entity).unwrap();
        assert_eq!(player.play_count(), 1);
        assert_eq!(player.current(), Some(&clip(1)));
    }
}
