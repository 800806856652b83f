use crate::simulation::Simulation;
use bevy::prelude::*;

/// Whether the world advances each frame
#[derive(Resource, PartialEq, Eq, Clone, Copy, Debug, Default)]
pub enum SimulationState {
    #[default]
    Running,
    Paused,
}

impl SimulationState {
    pub fn toggled(self) -> Self {
        match self {
            SimulationState::Running => SimulationState::Paused,
            SimulationState::Paused => SimulationState::Running,
        }
    }
}

/// Ticks a [`Simulation`] resource from Bevy's clock.
///
/// The app inserts the `Simulation` itself so it can handle construction
/// errors; until then these systems stay idle.
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SimulationState>()
            .add_systems(
                Update,
                advance_simulation
                    .run_if(resource_exists::<Simulation>)
                    .run_if(|state: Res<SimulationState>| *state == SimulationState::Running),
            )
            .add_systems(Last, dispose_on_exit.run_if(resource_exists::<Simulation>));
    }
}

/// Advance the world by the frame's delta
pub fn advance_simulation(time: Res<Time>, mut simulation: ResMut<Simulation>) {
    simulation.tick(time.delta_secs());
}

/// Cancel pending transitions once the app is shutting down
pub fn dispose_on_exit(mut exits: EventReader<AppExit>, mut simulation: ResMut<Simulation>) {
    if exits.read().next().is_some() {
        simulation.dispose();
    }
}
