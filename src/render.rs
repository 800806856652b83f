use crate::simulation::Simulation;
use bevy::prelude::*;
use std::f32::consts::FRAC_PI_2;

/// Screen pixels per world unit in the top-down view
pub const PIXELS_PER_UNIT: f32 = 12.0;

/// Emissive tint bugs blend toward as they glow
const HEAT_COLOR: LinearRgba = LinearRgba::new(1.0, 0.12, 0.0, 1.0);
/// Share of the body color a full glow replaces
const GLOW_TINT: f32 = 0.8;

/// Ground-plane `(x, z)` to 2D screen space; world +Z points down the screen
pub fn ground_to_screen(x: f32, z: f32) -> Vec2 {
    Vec2::new(x * PIXELS_PER_UNIT, -z * PIXELS_PER_UNIT)
}

/// Inverse of [`ground_to_screen`]; the result's `y` holds world Z
pub fn screen_to_ground(screen: Vec2) -> Vec2 {
    Vec2::new(screen.x / PIXELS_PER_UNIT, -screen.y / PIXELS_PER_UNIT)
}

/// Body color blended toward the heat tint by `glow`
pub fn glow_tint(body: Color, glow: f32) -> Color {
    let base = LinearRgba::from(body);
    Color::LinearRgba(base.mix(&HEAT_COLOR, (glow * GLOW_TINT).clamp(0.0, 1.0)))
}

#[derive(Component)]
pub struct MainCamera;

/// Sprite drawing the agent in one population slot
#[derive(Component)]
pub struct BugSprite {
    pub slot: usize,
}

#[derive(Component)]
pub struct NutrientMarker;

pub fn setup_camera(mut commands: Commands) {
    commands.spawn((
        Camera2d,
        MainCamera,
        Transform::from_xyz(0.0, 0.0, 0.0),
        OrthographicProjection {
            scale: 1.0,
            ..OrthographicProjection::default_2d()
        },
    ));
}

/// One elongated body per slot; dead slots are hidden, never despawned
pub fn spawn_bug_sprites(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    simulation: Res<Simulation>,
) {
    let body = meshes.add(Ellipse::new(0.45 * PIXELS_PER_UNIT, 0.7 * PIXELS_PER_UNIT));
    for boid in simulation.boids() {
        let screen = ground_to_screen(boid.position.x, boid.position.z);
        commands.spawn((
            BugSprite { slot: boid.slot() },
            Mesh2d(body.clone()),
            MeshMaterial2d(materials.add(ColorMaterial::from_color(boid.phenotype().body_color))),
            Transform::from_translation(screen.extend(1.0)),
        ));
    }
}

pub fn spawn_nutrient_markers(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    simulation: Res<Simulation>,
) {
    let mesh = meshes.add(Circle::new(0.6 * PIXELS_PER_UNIT));
    let material = materials.add(ColorMaterial::from_color(Color::srgb(0.2, 0.8, 0.2)));
    for point in simulation.nutrients().points() {
        commands.spawn((
            NutrientMarker,
            Mesh2d(mesh.clone()),
            MeshMaterial2d(material.clone()),
            Transform::from_translation(ground_to_screen(point.x, point.y).extend(-1.0)),
        ));
    }
}

/// Copy each agent's pose, size and glow onto its sprite
pub fn sync_bug_sprites(
    simulation: Res<Simulation>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    mut sprites: Query<(
        &BugSprite,
        &mut Transform,
        &mut Visibility,
        &MeshMaterial2d<ColorMaterial>,
    )>,
) {
    let frame = simulation.render_frame();
    for (sprite, mut transform, mut visibility, material) in sprites.iter_mut() {
        let Some(view) = frame.agents.get(sprite.slot).filter(|v| v.visible) else {
            *visibility = Visibility::Hidden;
            continue;
        };
        *visibility = Visibility::Inherited;

        // Height only decides draw order so hopping bugs pass over resting ones
        let screen = ground_to_screen(view.position.x, view.position.z);
        transform.translation = screen.extend(1.0 + view.position.y * 0.01);

        let nose = view.orientation * Vec3::Z;
        transform.rotation = Quat::from_rotation_z((-nose.z).atan2(nose.x) - FRAC_PI_2);
        transform.scale = Vec3::splat(view.scale.max(1e-3));

        if let Some(material) = materials.get_mut(&material.0) {
            material.color = glow_tint(view.body_color, view.glow);
        }
    }
}

/// Trail polylines and the heat ring
pub fn draw_trails_and_heat(simulation: Res<Simulation>, mut gizmos: Gizmos) {
    let frame = simulation.render_frame();
    for trail in frame.trails.iter().filter(|t| t.visible && t.points.len() >= 2) {
        gizmos.linestrip_2d(
            trail.points.iter().map(|p| ground_to_screen(p.x, p.z)),
            trail.color.with_alpha(trail.opacity),
        );
    }

    let ring = frame.heat_ring;
    let center = Isometry2d::from_translation(ground_to_screen(ring.center.x, ring.center.z));
    let radius = ring.radius * PIXELS_PER_UNIT;
    gizmos.circle_2d(center, radius * 0.98, Color::srgba(1.0, 0.85, 0.35, 0.34));
    gizmos.circle_2d(center, radius * 0.86, Color::srgba(1.0, 0.97, 0.9, 0.28));
}
