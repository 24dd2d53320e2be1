//! Climb intent component.
//!
//! Intents represent what the player (or AI) wants the climber to do. The
//! controller reads them once per fixed tick: the move vector becomes input
//! acceleration, and toggle/hop presses become climb transitions.

use bevy::prelude::*;

use crate::backend::ClimbPhysicsBackend;
use crate::config::ClimbConfig;
use crate::controller::{request_hopping, toggle_climbing};
use crate::detection::CharacterFrame;
use crate::movement::ClimbingMovement;

/// Desired climbing input.
///
/// `move_input` is read continuously. Climb and hop are buttons: set their
/// pressed state every frame and the controller acts on the press edge, or
/// call the `request_*` methods for a one-shot request.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use msg_climbing_controller::prelude::*;
///
/// let mut intent = ClimbIntent::new();
/// intent.set_move(Vec2::new(0.0, 1.0));
/// assert!(intent.is_moving());
///
/// intent.request_climb_toggle();
/// assert!(intent.has_toggle_request());
/// ```
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct ClimbIntent {
    /// Movement input: `x` is right, `y` is forward (or up while climbing).
    /// Clamped to unit length.
    pub move_input: Vec2,
    /// Whether the climb button is held.
    pub climb_pressed: bool,
    /// Whether the hop button is held.
    pub hop_pressed: bool,
    pub(crate) climb_pressed_prev: bool,
    pub(crate) hop_pressed_prev: bool,
    toggle_requested: bool,
    hop_requested: bool,
}

impl ClimbIntent {
    /// Create an empty intent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the movement input.
    pub fn set_move(&mut self, input: Vec2) {
        self.move_input = input.clamp_length_max(1.0);
    }

    pub fn clear_move(&mut self) {
        self.move_input = Vec2::ZERO;
    }

    #[inline]
    pub fn is_moving(&self) -> bool {
        self.move_input.length_squared() > f32::EPSILON
    }

    /// Set the climb button state.
    pub fn set_climb_pressed(&mut self, pressed: bool) {
        self.climb_pressed = pressed;
    }

    /// Set the hop button state.
    pub fn set_hop_pressed(&mut self, pressed: bool) {
        self.hop_pressed = pressed;
    }

    /// Request a climb toggle on the next tick.
    pub fn request_climb_toggle(&mut self) {
        self.toggle_requested = true;
    }

    /// Request a hop on the next tick.
    pub fn request_hop(&mut self) {
        self.hop_requested = true;
    }

    pub fn has_toggle_request(&self) -> bool {
        self.toggle_requested
    }

    pub fn has_hop_request(&self) -> bool {
        self.hop_requested
    }

    /// Turn button press edges into requests.
    pub(crate) fn update_edges(&mut self) {
        if self.climb_pressed && !self.climb_pressed_prev {
            self.toggle_requested = true;
        }
        if self.hop_pressed && !self.hop_pressed_prev {
            self.hop_requested = true;
        }
        self.climb_pressed_prev = self.climb_pressed;
        self.hop_pressed_prev = self.hop_pressed;
    }

    /// Take the pending toggle request.
    pub fn take_toggle_request(&mut self) -> bool {
        std::mem::take(&mut self.toggle_requested)
    }

    /// Take the pending hop request.
    pub fn take_hop_request(&mut self) -> bool {
        std::mem::take(&mut self.hop_requested)
    }
}

/// World-space direction of a movement input.
///
/// While climbing, input moves along the wall: up follows the wall toward
/// the character's up, right follows it toward the character's right. On the
/// ground, input maps to the flattened forward and right axes.
pub fn input_direction(frame: &CharacterFrame, surface_normal: Vec3, climbing: bool, input: Vec2) -> Vec3 {
    if climbing && surface_normal != Vec3::ZERO {
        let up = frame.right().cross(-surface_normal).normalize_or_zero();
        let right = frame.up().cross(surface_normal).normalize_or_zero();
        return up * input.y + right * input.x;
    }

    let forward = Vec3::new(frame.forward().x, 0.0, frame.forward().z).normalize_or_zero();
    let right = Vec3::new(frame.right().x, 0.0, frame.right().z).normalize_or_zero();
    forward * input.y + right * input.x
}

/// Apply climb intents: input acceleration, then toggle and hop requests.
pub fn apply_climb_intents<B: ClimbPhysicsBackend>(world: &mut World) {
    let entities: Vec<Entity> = world
        .query_filtered::<Entity, (With<ClimbIntent>, With<ClimbingMovement>)>()
        .iter(world)
        .collect();

    for entity in entities {
        let config = ClimbConfig::of(world, entity);
        let frame = CharacterFrame::of::<B>(world, entity);

        let Some(mut intent) = world.get_mut::<ClimbIntent>(entity) else {
            continue;
        };
        intent.update_edges();
        let input = intent.move_input;
        let toggle = intent.take_toggle_request();
        let hop = intent.take_hop_request();

        let Some(mut movement) = world.get_mut::<ClimbingMovement>(entity) else {
            continue;
        };
        let climbing = movement.is_climbing();
        let direction = input_direction(&frame, movement.climbable_surface_normal(), climbing, input);
        movement.acceleration = direction * movement.max_acceleration(&config);
        if direction != Vec3::ZERO {
            movement.last_input_vector = direction;
        }

        if toggle {
            toggle_climbing::<B>(world, entity, !climbing);
        }

        let climbing = world
            .get::<ClimbingMovement>(entity)
            .is_some_and(|movement| movement.is_climbing());
        if hop && climbing {
            request_hopping::<B>(world, entity);
        }
    }
}
