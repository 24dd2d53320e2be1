//! Climbing against real Rapier3D colliders.

#![cfg(feature = "rapier3d")]

use bevy::ecs::system::RunSystemOnce;
use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use msg_climbing_controller::controller::{can_start_climbing, toggle_climbing};
use msg_climbing_controller::prelude::*;
use msg_climbing_controller::rapier::climbable_groups;
use msg_climbing_controller::transition::handle_montage_events;

fn create_test_app() -> App {
    let mut app = App::new();
    app.add_plugins((MinimalPlugins, TransformPlugin));
    app.add_plugins(RapierPhysicsPlugin::<NoUserData>::default());
    app.add_plugins(ClimbingControllerPlugin::<Rapier3dBackend>::default());
    app.insert_resource(Time::<Fixed>::from_hz(60.0));
    app
}

/// Wall whose front face is the plane z = -60.
fn spawn_wall(app: &mut App) -> Entity {
    app.world_mut()
        .spawn((
            Transform::from_xyz(0.0, 0.0, -100.0),
            RigidBody::Fixed,
            Collider::cuboid(500.0, 300.0, 40.0),
            climbable_groups(),
        ))
        .id()
}

fn spawn_climber(app: &mut App, position: Vec3) -> Entity {
    app.world_mut()
        .spawn((
            Transform::from_translation(position),
            ClimbingMovement::new(),
            ClimbConfig::default(),
            ClimbIntent::default(),
            ClimbMontages {
                idle_to_climb: Some(Handle::weak_from_u128(1)),
                ..default()
            },
            MontagePlayer::default(),
            MotionWarping::default(),
            Rapier3dClimberBundle::new(),
        ))
        .id()
}

/// Let Rapier pick up the spawned colliders.
fn settle(app: &mut App) {
    app.update();
    app.update();
}

#[test]
fn climber_facing_wall_can_start_climbing() {
    let mut app = create_test_app();
    spawn_wall(&mut app);
    let climber = spawn_climber(&mut app, Vec3::ZERO);
    settle(&mut app);

    let can_climb = can_start_climbing::<Rapier3dBackend>(app.world_mut(), climber);

    let hits = app
        .world()
        .get::<ClimbingMovement>(climber)
        .unwrap()
        .surface_hits()
        .len();
    println!("PROOF: can_start_climbing={can_climb}, surface hits={hits}");
    assert!(can_climb);
    assert!(hits > 0);
}

#[test]
fn climber_in_open_space_cannot_climb() {
    let mut app = create_test_app();
    spawn_wall(&mut app);
    let climber = spawn_climber(&mut app, Vec3::new(0.0, 0.0, 600.0));
    settle(&mut app);

    assert!(!can_start_climbing::<Rapier3dBackend>(app.world_mut(), climber));
}

#[test]
fn idle_to_climb_end_shrinks_collider() {
    let mut app = create_test_app();
    spawn_wall(&mut app);
    let climber = spawn_climber(&mut app, Vec3::ZERO);
    settle(&mut app);

    toggle_climbing::<Rapier3dBackend>(app.world_mut(), climber, true);
    assert!(app.world().get::<MontagePlayer>(climber).unwrap().is_any_playing());

    app.world_mut().send_event(MontageEnded {
        entity: climber,
        clip: Handle::weak_from_u128(1),
        interrupted: false,
    });
    app.world_mut()
        .run_system_once(handle_montage_events::<Rapier3dBackend>)
        .unwrap();

    let movement = app.world().get::<ClimbingMovement>(climber).unwrap();
    let capsule = app.world().get::<Collider>(climber).unwrap().as_capsule().unwrap();
    let half_height = capsule.half_height() + capsule.radius();
    println!("PROOF: state={:?}, collider half height={half_height}", movement.state());
    assert!(movement.is_climbing());
    assert!((half_height - 48.0).abs() < 1e-3);
}
