//! Climb state and state marker components.
//!
//! [`ClimbState`] is owned by [`ClimbingMovement`](crate::movement::ClimbingMovement)
//! and only changes through its movement-mode hook. The marker components
//! mirror it so gameplay code can filter queries with `With<Climbing>` and
//! friends; they are synced once per fixed tick.
//!
//! Mode changes are also announced through observer events
//! ([`ClimbStateEntered`], [`ClimbStateExited`]), triggered after the
//! capsule, rotation and velocity side effects have been applied.

use bevy::prelude::*;

use crate::movement::ClimbingMovement;

/// Movement mode of a climbing-capable character.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClimbState {
    /// Standing or walking on the ground.
    #[default]
    Grounded,
    /// In the air, not attached to a surface.
    Falling,
    /// Attached to a climbable surface.
    Climbing,
}

impl ClimbState {
    /// Whether this is the climbing mode.
    #[inline]
    pub fn is_climbing(self) -> bool {
        self == ClimbState::Climbing
    }

    /// Whether this is the falling mode.
    #[inline]
    pub fn is_falling(self) -> bool {
        self == ClimbState::Falling
    }
}

/// Marker component indicating the character is climbing.
///
/// This is a marker component - it has no data, just indicates state.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use msg_climbing_controller::prelude::*;
///
/// fn climbers(q: Query<Entity, With<Climbing>>) -> usize {
///     q.iter().count()
/// }
/// ```
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Climbing;

/// Marker component indicating the character is on the ground.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grounded;

/// Marker component indicating the character is falling.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Airborne;

/// Triggered on a character when it enters climbing.
///
/// The capsule has already shrunk and auto-orientation is already off when
/// observers run.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct ClimbStateEntered;

/// Triggered on a character when it leaves climbing.
///
/// The capsule has already been restored, rotation reduced to yaw and
/// velocity zeroed when observers run.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct ClimbStateExited {
    /// Mode the character left climbing for.
    pub next: ClimbState,
}

/// Sync state marker components with each character's [`ClimbState`].
pub fn sync_state_markers(
    mut commands: Commands,
    q_movement: Query<(
        Entity,
        &ClimbingMovement,
        Has<Climbing>,
        Has<Grounded>,
        Has<Airborne>,
    )>,
) {
    for (entity, movement, has_climbing, has_grounded, has_airborne) in &q_movement {
        let state = movement.state();
        let mut entity_commands = commands.entity(entity);

        match state {
            ClimbState::Climbing if !has_climbing => {
                entity_commands.insert(Climbing);
            }
            ClimbState::Grounded if !has_grounded => {
                entity_commands.insert(Grounded);
            }
            ClimbState::Falling if !has_airborne => {
                entity_commands.insert(Airborne);
            }
            _ => {}
        }

        if state != ClimbState::Climbing && has_climbing {
            entity_commands.remove::<Climbing>();
        }
        if state != ClimbState::Grounded && has_grounded {
            entity_commands.remove::<Grounded>();
        }
        if state != ClimbState::Falling && has_airborne {
            entity_commands.remove::<Airborne>();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::system::RunSystemOnce;

    #[test]
    fn grounded_is_default_state() {
        assert_eq!(ClimbState::default(), ClimbState::Grounded);
    }

    #[test]
    fn state_predicates() {
        assert!(ClimbState::Climbing.is_climbing());
        assert!(!ClimbState::Climbing.is_falling());
        assert!(ClimbState::Falling.is_falling());
        assert!(!ClimbState::Grounded.is_climbing());
    }

    #[test]
    fn markers_follow_state() {
        let mut world = World::new();
        let mut movement = ClimbingMovement::default();
        movement.state = ClimbState::Climbing;
        let entity = world.spawn((movement, Grounded)).id();

        world.run_system_once(sync_state_markers).unwrap();

        assert!(world.get::<Climbing>(entity).is_some());
        assert!(world.get::<Grounded>(entity).is_none());
        assert!(world.get::<Airborne>(entity).is_none());

        world.get_mut::<ClimbingMovement>(entity).unwrap().state = ClimbState::Falling;
        world.run_system_once(sync_state_markers).unwrap();

        assert!(world.get::<Climbing>(entity).is_none());
        assert!(world.get::<Airborne>(entity).is_some());
    }
}
