//! Climb Wall Demo
//!
//! A climber standing in front of a wall with a walkable top, with the
//! surface scanner's traces drawn as gizmos:
//! - small spheres and arrows for every capsule sweep hit
//! - a large sphere and arrow for the aggregated surface
//! - crosses for motion warp targets
//!
//! ## Controls
//! - **Space**: Toggle climbing
//! - **W/A/S/D**: Move along the wall
//! - **E**: Hop in the last input direction
//! - **G**: Toggle trace drawing
//!
//! There is no animation graph here. A stand-in ends each montage after
//! [`MONTAGE_SECONDS`], which is what commits the mode change.

use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use msg_climbing_controller::prelude::*;
use msg_climbing_controller::rapier::climbable_groups;

// ==================== Constants ====================

const WALL_HALF_WIDTH: f32 = 300.0;
const WALL_HEIGHT: f32 = 400.0;
const WALL_THICKNESS: f32 = 300.0;
/// Front face of the wall is the plane z = WALL_FACE_Z.
const WALL_FACE_Z: f32 = -60.0;

const MONTAGE_SECONDS: f32 = 0.6;

// ==================== Main ====================

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Climb Wall - Climbing Controller Demo".into(),
                resolution: (1280.0, 720.0).into(),
                ..default()
            }),
            ..default()
        }))
        // Physics
        .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
        .add_plugins(RapierDebugRenderPlugin::default())
        // Climbing controller
        .add_plugins(ClimbingControllerPlugin::<Rapier3dBackend>::default())
        .init_resource::<ClimbDebugDraw>()
        .add_systems(Startup, setup)
        .add_systems(Update, (read_input, toggle_debug_draw, draw_climb_traces))
        .add_systems(FixedUpdate, finish_montages.before(ClimbingSet::Transitions))
        .run();
}

// ==================== Components ====================

#[derive(Component)]
struct Player;

/// Seconds the current montage has been playing.
#[derive(Component, Default)]
struct MontageClock(f32);

/// Whether scanner traces are drawn.
#[derive(Resource)]
struct ClimbDebugDraw(bool);

impl Default for ClimbDebugDraw {
    fn default() -> Self {
        Self(true)
    }
}

// ==================== Setup ====================

fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(500.0, 350.0, 700.0).looking_at(Vec3::new(0.0, 150.0, WALL_FACE_Z), Vec3::Y),
    ));
    commands.spawn((
        DirectionalLight {
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(200.0, 800.0, 400.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    // Floor
    spawn_static_box(
        &mut commands,
        &mut meshes,
        &mut materials,
        Vec3::new(0.0, -10.0, 0.0),
        Vec3::new(1000.0, 10.0, 1000.0),
        Color::srgb(0.3, 0.3, 0.3),
    );

    // Wall, walkable on top
    spawn_static_box(
        &mut commands,
        &mut meshes,
        &mut materials,
        Vec3::new(0.0, WALL_HEIGHT / 2.0, WALL_FACE_Z - WALL_THICKNESS / 2.0),
        Vec3::new(WALL_HALF_WIDTH, WALL_HEIGHT / 2.0, WALL_THICKNESS / 2.0),
        Color::srgb(0.45, 0.4, 0.35),
    );

    spawn_player(&mut commands, &mut meshes, &mut materials);

    commands.spawn((
        Text::new("Space: Climb | WASD: Move | E: Hop | G: Traces"),
        TextFont {
            font_size: 20.0,
            ..default()
        },
        TextColor(Color::WHITE),
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(10.0),
            left: Val::Px(10.0),
            ..default()
        },
    ));
}

fn spawn_static_box(
    commands: &mut Commands,
    meshes: &mut ResMut<Assets<Mesh>>,
    materials: &mut ResMut<Assets<StandardMaterial>>,
    center: Vec3,
    half_extents: Vec3,
    color: Color,
) {
    commands.spawn((
        Transform::from_translation(center),
        Mesh3d(meshes.add(Cuboid::from_size(half_extents * 2.0))),
        MeshMaterial3d(materials.add(color)),
        RigidBody::Fixed,
        Collider::cuboid(half_extents.x, half_extents.y, half_extents.z),
        climbable_groups(),
    ));
}

fn spawn_player(
    commands: &mut Commands,
    meshes: &mut ResMut<Assets<Mesh>>,
    materials: &mut ResMut<Assets<StandardMaterial>>,
) {
    let config = ClimbConfig::default();
    let half_height = config.standing_capsule_half_height;
    let radius = Rapier3dClimberBundle::DEFAULT_RADIUS;

    commands.spawn((
        Player,
        Transform::from_xyz(0.0, half_height, 20.0),
        Mesh3d(meshes.add(Capsule3d::new(radius, (half_height - radius) * 2.0))),
        MeshMaterial3d(materials.add(Color::srgb(0.2, 0.6, 0.9))),
        ClimbingMovement::new(),
        config,
        ClimbIntent::default(),
        demo_montages(),
        MontagePlayer::default(),
        MotionWarping::default(),
        ClimbAnimState::default(),
        MontageClock::default(),
        Rapier3dClimberBundle::new(),
    ));
}

/// Placeholder clips; only their identity matters to the controller.
fn demo_montages() -> ClimbMontages {
    ClimbMontages {
        idle_to_climb: Some(Handle::weak_from_u128(1)),
        climb_to_top: Some(Handle::weak_from_u128(2)),
        climb_down_ledge: Some(Handle::weak_from_u128(3)),
        vault: Some(Handle::weak_from_u128(4)),
        hop_up: Some(Handle::weak_from_u128(5)),
        hop_down: Some(Handle::weak_from_u128(6)),
    }
}

// ==================== Systems ====================

fn read_input(keys: Res<ButtonInput<KeyCode>>, mut intents: Query<&mut ClimbIntent, With<Player>>) {
    let mut input = Vec2::ZERO;
    if keys.pressed(KeyCode::KeyW) {
        input.y += 1.0;
    }
    if keys.pressed(KeyCode::KeyS) {
        input.y -= 1.0;
    }
    if keys.pressed(KeyCode::KeyD) {
        input.x += 1.0;
    }
    if keys.pressed(KeyCode::KeyA) {
        input.x -= 1.0;
    }

    for mut intent in &mut intents {
        intent.set_move(input);
        intent.set_climb_pressed(keys.pressed(KeyCode::Space));
        intent.set_hop_pressed(keys.pressed(KeyCode::KeyE));
    }
}

fn toggle_debug_draw(keys: Res<ButtonInput<KeyCode>>, mut draw: ResMut<ClimbDebugDraw>) {
    if keys.just_pressed(KeyCode::KeyG) {
        draw.0 = !draw.0;
    }
}

/// Stand-in for an animation graph: end whatever montage is playing once
/// it has run for [`MONTAGE_SECONDS`].
fn finish_montages(
    time: Res<Time>,
    mut players: Query<(Entity, &MontagePlayer, &mut MontageClock)>,
    mut ended: EventWriter<MontageEnded>,
) {
    for (entity, player, mut clock) in &mut players {
        let Some(clip) = player.current() else {
            clock.0 = 0.0;
            continue;
        };

        clock.0 += time.delta_secs();
        if clock.0 >= MONTAGE_SECONDS {
            clock.0 = 0.0;
            ended.write(MontageEnded {
                entity,
                clip: clip.clone(),
                interrupted: false,
            });
        }
    }
}

fn draw_climb_traces(
    draw: Res<ClimbDebugDraw>,
    climbers: Query<(&ClimbingMovement, &MotionWarping)>,
    mut gizmos: Gizmos,
) {
    if !draw.0 {
        return;
    }

    for (movement, warping) in &climbers {
        for hit in movement.surface_hits() {
            gizmos.sphere(Isometry3d::from_translation(hit.point), 4.0, Color::srgb(1.0, 0.8, 0.1));
            gizmos.arrow(hit.point, hit.point + hit.normal * 30.0, Color::srgb(1.0, 0.5, 0.1));
        }

        let surface = movement.surface();
        if surface.is_known() {
            gizmos.sphere(Isometry3d::from_translation(surface.location), 10.0, Color::srgb(0.2, 1.0, 0.3));
            gizmos.arrow(
                surface.location,
                surface.location + surface.normal * 60.0,
                Color::srgb(0.2, 1.0, 0.3),
            );
        }

        for target in warping.targets() {
            gizmos.cross(Isometry3d::from_translation(target.location), 12.0, Color::srgb(0.9, 0.2, 0.9));
        }
    }
}
