use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPlugin};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thermobug::config::*;
use thermobug::input::{camera_pan, camera_zoom, keyboard_controls, pointer_heat, CameraState};
use thermobug::nutrient;
use thermobug::render::{
    draw_trails_and_heat, setup_camera, spawn_bug_sprites, spawn_nutrient_markers, sync_bug_sprites,
};
use thermobug::{RollingTerrain, Simulation, SimulationPlugin, SimulationState};

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "ThermoBug".to_string(),
                resolution: (1280.0, 720.0).into(),
                ..default()
            }),
            ..default()
        }))
        .add_plugins(EguiPlugin)
        .add_plugins(SimulationPlugin)
        .init_resource::<CameraState>()
        .add_systems(
            Startup,
            (
                start_simulation,
                (setup_camera, spawn_bug_sprites, spawn_nutrient_markers)
                    .run_if(resource_exists::<Simulation>),
            )
                .chain(),
        )
        .add_systems(Update, (camera_zoom, camera_pan))
        .add_systems(
            Update,
            (
                pointer_heat,
                keyboard_controls,
                sync_bug_sprites,
                draw_trails_and_heat,
                ui_system,
            )
                .run_if(resource_exists::<Simulation>),
        )
        .run();
}

/// Build the world, or close the app if the settings are invalid
fn start_simulation(mut commands: Commands, mut exit: EventWriter<AppExit>) {
    let config = SimConfig::default();
    let nutrient_seed = config.seed.wrapping_add(2);
    let mut simulation = match Simulation::new(config, Some(Box::new(RollingTerrain::default()))) {
        Ok(simulation) => simulation,
        Err(err) => {
            error!("cannot start simulation: {err}");
            exit.send(AppExit::error());
            return;
        }
    };

    let mut rng = ChaCha8Rng::seed_from_u64(nutrient_seed);
    simulation.set_nutrient_points(nutrient::scatter(
        &mut rng,
        NUTRIENT_PATCH_COUNT,
        NUTRIENT_SCATTER_RADIUS,
    ));
    commands.insert_resource(simulation);
}

fn ui_system(
    mut contexts: EguiContexts,
    camera_state: Res<CameraState>,
    mut simulation_state: ResMut<SimulationState>,
    mut simulation: ResMut<Simulation>,
) {
    let summary = simulation.summary();
    let progress = simulation.generation_progress();

    egui::Window::new("ThermoBug")
        .default_pos(egui::pos2(10.0, 10.0))
        .show(contexts.ctx_mut(), |ui| {
            ui.horizontal(|ui| {
                let button_text = if *simulation_state == SimulationState::Running {
                    "⏸ Pause"
                } else {
                    "▶ Resume"
                };
                if ui.button(button_text).clicked() {
                    *simulation_state = simulation_state.toggled();
                }
                ui.label(format!("State: {:?}", *simulation_state));
            });

            ui.horizontal(|ui| {
                let next = ui.add_enabled(!summary.transitioning, egui::Button::new("⏭ Next Generation"));
                if next.clicked() {
                    simulation.trigger_next_generation();
                }

                let mut auto_run = simulation.auto_run();
                if ui.checkbox(&mut auto_run, "Auto-run").changed() {
                    simulation.set_auto_run(auto_run);
                }
            });

            let bar_text = if summary.transitioning {
                "replacing the weakest...".to_string()
            } else {
                format!("{}%", (progress * 100.0) as u32)
            };
            ui.add(egui::ProgressBar::new(progress).text(bar_text));

            ui.separator();
            ui.heading("Population");
            ui.separator();

            ui.label(format!("Generation: {}", summary.generation));
            for (pattern, count) in summary.population.pattern_counts.iter().enumerate() {
                ui.label(format!("  Pattern P{pattern}: {count}"));
            }
            ui.label(format!("Mean Scale: {:.2}", summary.population.mean_body_scale));
            ui.label(format!("Mean Base Speed: {:.2}", summary.population.mean_base_speed));
            ui.label(format!("Mean Speed: {:.2}", summary.mean_speed));
            ui.add(
                egui::ProgressBar::new(summary.activity / ACTIVITY_SCALE)
                    .text(format!("Activity {:.1}", summary.activity)),
            );

            ui.separator();
            ui.label(format!(
                "Alive {} | Dying {} | Dead {} | Newborn {}",
                summary.alive, summary.dying, summary.dead, summary.newborn
            ));

            ui.separator();
            ui.heading("Controls");
            ui.separator();
            ui.label(format!("Zoom: {:.2}x", camera_state.zoom));
            ui.label("• Move Pointer - Drag the heat source");
            ui.label("• Left Click - Heat pulse");
            ui.label("• H - Next generation");
            ui.label("• Space - Pause/resume");
            ui.label("• Mouse Wheel - Zoom in/out");
            ui.label("• Middle Mouse - Pan camera");
        });
}
