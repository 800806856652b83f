use crate::plugin::SimulationState;
use crate::render::{screen_to_ground, MainCamera};
use crate::simulation::Simulation;
use bevy::input::mouse::{MouseMotion, MouseWheel};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use bevy_egui::EguiContexts;

#[derive(Resource)]
pub struct CameraState {
    pub zoom: f32,
    pub position: Vec2,
    pub is_panning: bool,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            position: Vec2::ZERO,
            is_panning: false,
        }
    }
}

pub fn camera_zoom(
    mut scroll_events: EventReader<MouseWheel>,
    mut camera_state: ResMut<CameraState>,
    mut query: Query<&mut OrthographicProjection, With<MainCamera>>,
) {
    for event in scroll_events.read() {
        camera_state.zoom = (camera_state.zoom - event.y * 0.1).clamp(0.2, 8.0);
        if let Ok(mut projection) = query.get_single_mut() {
            projection.scale = camera_state.zoom;
        }
    }
}

/// Middle-drag pans the view
pub fn camera_pan(
    mouse_button: Res<ButtonInput<MouseButton>>,
    mut motion_events: EventReader<MouseMotion>,
    mut camera_state: ResMut<CameraState>,
    mut query: Query<&mut Transform, With<MainCamera>>,
) {
    if mouse_button.just_pressed(MouseButton::Middle) {
        camera_state.is_panning = true;
    }
    if mouse_button.just_released(MouseButton::Middle) {
        camera_state.is_panning = false;
    }
    if !camera_state.is_panning {
        motion_events.clear();
        return;
    }

    let Ok(mut transform) = query.get_single_mut() else {
        return;
    };
    for event in motion_events.read() {
        // Screen Y grows downward
        let delta = Vec2::new(-event.delta.x, event.delta.y) * camera_state.zoom;
        camera_state.position += delta;
        transform.translation.x = camera_state.position.x;
        transform.translation.y = camera_state.position.y;
    }
}

/// The pointer drags the heat source over the ground; a left click pulses it.
/// Pointer input claimed by the egui panel never reaches the world.
pub fn pointer_heat(
    mouse_button: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    camera_query: Query<(&Camera, &GlobalTransform), With<MainCamera>>,
    mut contexts: EguiContexts,
    mut simulation: ResMut<Simulation>,
) {
    let Ok(window) = windows.get_single() else {
        return;
    };
    let Ok((camera, camera_transform)) = camera_query.get_single() else {
        return;
    };
    let Some(cursor) = window.cursor_position() else {
        return;
    };

    let ctx = contexts.ctx_mut();
    if ctx.wants_pointer_input() || ctx.is_pointer_over_area() {
        return;
    }

    let Ok(world) = camera.viewport_to_world_2d(camera_transform, cursor) else {
        return;
    };
    let ground = screen_to_ground(world);
    simulation.set_heat_position(ground.x, ground.y);

    if mouse_button.just_pressed(MouseButton::Left) {
        simulation.pulse_heat();
    }
}

/// `H` forces the next generation, `Space` pauses
pub fn keyboard_controls(
    keys: Res<ButtonInput<KeyCode>>,
    mut state: ResMut<SimulationState>,
    mut simulation: ResMut<Simulation>,
) {
    if keys.just_pressed(KeyCode::KeyH) && !simulation.trigger_next_generation() {
        debug!("next generation requested while a transition is pending");
    }
    if keys.just_pressed(KeyCode::Space) {
        *state = state.toggled();
        info!("simulation {:?}", *state);
    }
}
