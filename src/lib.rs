//! # `msg_climbing_controller`
//!
//! Climbing, vaulting and ledge hopping for 3D Bevy characters, with physics
//! backend abstraction.
//!
//! This crate layers a climbing locomotion mode on top of an existing
//! character controller:
//! - Sweeps for climbable surfaces and tells walls from floors
//! - Integrates velocity and rotation while climbing, hugging the wall
//! - Detects ledges, floors, climb-down spots and vaults
//! - Orchestrates animated transitions (montages) with motion warping targets
//! - Publishes locomotion values for the animation side
//! - Abstracts the physics backend for easy swapping (Rapier3D included)
//!
//! ## Architecture
//!
//! Each character owns a [`ClimbingMovement`](movement::ClimbingMovement)
//! holding its [`ClimbState`](state::ClimbState). Every fixed tick:
//! 1. Intents are turned into input acceleration and climb/hop requests
//! 2. Finished montages commit the mode changes they were waiting for
//! 3. Climbing characters are re-scanned, integrated and snapped to the wall;
//!    other characters get their animation root motion constrained
//! 4. Animation values and state markers are published
//!
//! Mode changes go through a single hook that resizes the capsule, locks or
//! restores rotation, and triggers [`ClimbStateEntered`](state::ClimbStateEntered)
//! / [`ClimbStateExited`](state::ClimbStateExited) observers afterwards.
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use msg_climbing_controller::prelude::*;
//!
//! // Components for a climbing character
//! let movement = ClimbingMovement::default();
//! let config = ClimbConfig::player();
//! let intent = ClimbIntent::default();
//!
//! // These can be spawned alongside physics components
//! ```

use bevy::prelude::*;

pub mod anim;
pub mod backend;
pub mod collision;
pub mod config;
pub mod controller;
pub mod detection;
pub mod intent;
pub mod kinematics;
pub mod movement;
pub mod state;
pub mod systems;
pub mod transition;

#[cfg(feature = "rapier3d")]
pub mod rapier;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::anim::ClimbAnimState;
    pub use crate::backend::ClimbPhysicsBackend;
    pub use crate::collision::{CollisionData, LineTrace, MoveHit};
    pub use crate::config::{ClimbConfig, ClimbConfigError, ClimbMontages, VaultProbeConfig};
    pub use crate::controller::HopDirection;
    pub use crate::detection::AggregatedSurface;
    pub use crate::intent::ClimbIntent;
    pub use crate::kinematics::RootMotion;
    pub use crate::movement::ClimbingMovement;
    pub use crate::state::{Airborne, ClimbState, ClimbStateEntered, ClimbStateExited, Climbing, Grounded};
    pub use crate::transition::{
        ClimbMontage, MontageBlendingOut, MontageEnded, MontagePlayer, MotionWarping, WarpTarget,
    };
    pub use crate::{ClimbingControllerPlugin, ClimbingSet};

    #[cfg(feature = "rapier3d")]
    pub use crate::rapier::{Rapier3dBackend, Rapier3dClimberBundle};
}

/// System sets of the climbing controller, run in this order in `FixedUpdate`.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClimbingSet {
    /// Read [`ClimbIntent`](intent::ClimbIntent)s.
    Input,
    /// Commit montage-driven transitions.
    Transitions,
    /// Climb integration.
    Physics,
    /// Publish animation values and state markers.
    Publish,
}

/// Main plugin for the climbing controller.
///
/// This plugin is generic over a physics backend `B` which provides the actual
/// physics operations (sweeps, traces, collision-aware moves).
///
/// # Type Parameters
/// - `B`: The physics backend implementation (e.g., `Rapier3dBackend`)
///
/// # Examples
///
/// With Rapier3D backend:
/// ```rust,ignore
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use msg_climbing_controller::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
///     .add_plugins(ClimbingControllerPlugin::<Rapier3dBackend>::default())
///     .run();
/// ```
pub struct ClimbingControllerPlugin<B: backend::ClimbPhysicsBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::ClimbPhysicsBackend> Default for ClimbingControllerPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::ClimbPhysicsBackend> Plugin for ClimbingControllerPlugin<B> {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<config::ClimbConfig>();
        app.register_type::<config::VaultProbeConfig>();
        app.register_type::<config::ClimbMontages>();
        app.register_type::<movement::ClimbingMovement>();
        app.register_type::<intent::ClimbIntent>();
        app.register_type::<kinematics::RootMotion>();
        app.register_type::<transition::MontagePlayer>();
        app.register_type::<transition::MotionWarping>();
        app.register_type::<anim::ClimbAnimState>();
        app.register_type::<state::ClimbState>();
        app.register_type::<state::Climbing>();
        app.register_type::<state::Grounded>();
        app.register_type::<state::Airborne>();

        app.add_event::<transition::MontageEnded>();
        app.add_event::<transition::MontageBlendingOut>();

        // Add the physics backend plugin
        app.add_plugins(B::plugin());

        app.configure_sets(
            FixedUpdate,
            (
                ClimbingSet::Input,
                ClimbingSet::Transitions,
                ClimbingSet::Physics,
                ClimbingSet::Publish,
            )
                .chain(),
        );

        // Add core systems in FixedUpdate for consistent physics behavior
        app.add_systems(FixedUpdate, intent::apply_climb_intents::<B>.in_set(ClimbingSet::Input));
        app.add_systems(
            FixedUpdate,
            transition::handle_montage_events::<B>.in_set(ClimbingSet::Transitions),
        );
        app.add_systems(
            FixedUpdate,
            (systems::climb_physics::<B>, systems::apply_ground_root_motion).in_set(ClimbingSet::Physics),
        );
        app.add_systems(
            FixedUpdate,
            (anim::publish_anim_state::<B>, state::sync_state_markers)
                .chain()
                .in_set(ClimbingSet::Publish),
        );
    }
}
