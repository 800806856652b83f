use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use std::time::Duration;
use thermobug::config::*;
use thermobug::{FlatTerrain, GaConfig, Genome, LifeState, SimConfig, Simulation, SimulationPlugin, SimulationState};

const DT: f32 = 1.0 / 60.0;

fn headless_app(simulation: Simulation) -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .add_plugins(SimulationPlugin)
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f32(DT)))
        .insert_resource(simulation);
    app
}

fn tick_until(sim: &mut Simulation, limit: f64, mut done: impl FnMut(&Simulation) -> bool) -> f64 {
    let start = sim.time();
    while !done(sim) {
        assert!(sim.time() - start < limit, "condition not reached within {limit}s");
        sim.tick(DT);
    }
    sim.time() - start
}

fn assert_life_values_in_range(sim: &Simulation) {
    for boid in sim.boids() {
        let vitality = boid.vitality();
        assert!((0.0..=1.0).contains(&vitality.scale()), "scale {}", vitality.scale());
        assert!((0.0..=1.0).contains(&vitality.visibility()), "visibility {}", vitality.visibility());
    }
}

/// The plugin advances the world from Bevy's clock
#[test]
fn test_plugin_advances_simulation() {
    let sim = Simulation::new(SimConfig::default(), None).unwrap();
    let mut app = headless_app(sim);

    for _ in 0..31 {
        app.update();
    }

    let time = app.world().resource::<Simulation>().time();
    assert!(time > 0.4 && time < 0.6, "time {time}");
}

/// A paused simulation keeps its clock still
#[test]
fn test_paused_simulation_does_not_advance() {
    let sim = Simulation::new(SimConfig::default(), None).unwrap();
    let mut app = headless_app(sim);
    for _ in 0..5 {
        app.update();
    }
    let before = app.world().resource::<Simulation>().time();

    *app.world_mut().resource_mut::<SimulationState>() = SimulationState::Paused;
    for _ in 0..10 {
        app.update();
    }

    assert_eq!(app.world().resource::<Simulation>().time(), before);
}

/// Exiting the app tears the simulation down
#[test]
fn test_exit_disposes_simulation() {
    let sim = Simulation::new(SimConfig::default(), None).unwrap();
    let mut app = headless_app(sim);
    app.update();
    app.world_mut().resource_mut::<Simulation>().trigger_next_generation();

    app.world_mut().send_event(AppExit::Success);
    app.update();

    let sim = app.world().resource::<Simulation>();
    assert!(sim.is_disposed());
    assert!(!sim.is_transitioning());
}

#[test]
fn test_default_population_splits_sixteen_to_twenty_four() {
    let mut sim = Simulation::new(SimConfig::default(), None).unwrap();
    assert!(sim.trigger_next_generation());

    let summary = sim.summary();
    assert_eq!(summary.alive, 16);
    assert_eq!(summary.dying, 24);
    assert!(summary.transitioning);
}

/// Full auto-run cycle: timer fires, the doomed die, newborns replace them
#[test]
fn test_generation_cycle_runs_on_timer() {
    let mut sim = Simulation::new(SimConfig::default(), Some(Box::new(FlatTerrain::default()))).unwrap();
    assert_eq!(sim.generation(), 0);

    let waited = tick_until(&mut sim, 11.0, |s| {
        assert_life_values_in_range(s);
        s.is_transitioning()
    });
    assert!((waited - f64::from(GENERATION_PERIOD)).abs() < 0.05, "waited {waited}");
    assert_eq!(sim.summary().dying, 24);

    let doomed: Vec<usize> = sim
        .boids()
        .iter()
        .filter(|b| b.state() == LifeState::Dying)
        .map(|b| b.slot())
        .collect();

    let mut saw_dead = false;
    let transition = tick_until(&mut sim, 4.0, |s| {
        assert_life_values_in_range(s);
        saw_dead |= s.summary().dead == 24;
        !s.is_transitioning()
    });
    assert!(saw_dead);
    assert!((transition - f64::from(DEATH_ANIM_DURATION + SURVIVORS_WINDOW)).abs() < 0.05);

    assert_eq!(sim.generation(), 1);
    let summary = sim.summary();
    assert_eq!(summary.newborn, 24);
    assert_eq!(summary.alive, 16);
    for slot in doomed {
        assert_eq!(sim.boids()[slot].state(), LifeState::Newborn);
        assert_eq!(sim.boids()[slot].genome(), &sim.population()[slot]);
    }

    tick_until(&mut sim, 2.0, |s| {
        assert_life_values_in_range(s);
        s.summary().newborn == 0
    });
    assert_eq!(sim.summary().alive, 40);
}

/// Manual triggers while a transition is pending change nothing
#[test]
fn test_manual_trigger_is_ignored_mid_transition() {
    let mut sim = Simulation::new(SimConfig::default(), None).unwrap();
    assert!(sim.trigger_next_generation());
    for _ in 0..30 {
        sim.tick(DT);
    }
    let dying = sim.summary().dying;
    assert!(!sim.trigger_next_generation());
    assert_eq!(sim.summary().dying, dying);
    assert_eq!(sim.generation(), 0);
}

#[test]
fn test_dispose_cancels_pending_transition() {
    let mut sim = Simulation::new(SimConfig::default(), None).unwrap();
    sim.trigger_next_generation();
    for _ in 0..60 {
        sim.tick(DT);
    }

    sim.dispose();
    let time = sim.time();
    for _ in 0..300 {
        sim.tick(DT);
    }

    assert!(sim.is_disposed());
    assert!(!sim.is_transitioning());
    assert!(sim.boids().is_empty());
    assert_eq!(sim.time(), time);
    assert_eq!(sim.generation(), 0);
    assert!(!sim.trigger_next_generation());
}

/// With two showy and two drab genomes, the drab slots are replaced
#[test]
fn test_engineered_population_replaces_weak_slots() {
    let ideal = Genome::new(230.0, 0.5, 1, 1.6, 1.0, 0.65).unwrap();
    let poor = Genome::new(40.0, 0.95, 4, 2.8, 1.45, 0.05).unwrap();
    let config = SimConfig {
        ga: GaConfig {
            population_size: 4,
            survival_rate: 0.5,
            mutation_rate: 1.0,
            crossover_rate: 1.0,
            ..GaConfig::default()
        },
        auto_run: false,
        ..SimConfig::default()
    };
    let mut sim = Simulation::with_genomes(config, vec![ideal, ideal, poor, poor], None).unwrap();

    assert!(sim.trigger_next_generation());
    let states: Vec<LifeState> = sim.boids().iter().map(|b| b.state()).collect();
    assert_eq!(
        states,
        vec![LifeState::Alive, LifeState::Alive, LifeState::Dying, LifeState::Dying]
    );

    tick_until(&mut sim, 4.0, |s| !s.is_transitioning());

    assert_eq!(sim.boids()[0].genome(), &ideal);
    assert_eq!(sim.boids()[1].genome(), &ideal);
    assert_ne!(sim.boids()[2].genome(), &poor);
    assert_ne!(sim.boids()[3].genome(), &poor);
    assert_eq!(sim.boids()[2].state(), LifeState::Newborn);
}

/// Without auto-run the timer never fires
#[test]
fn test_auto_run_off_never_triggers() {
    let config = SimConfig {
        auto_run: false,
        ..SimConfig::default()
    };
    let mut sim = Simulation::new(config, None).unwrap();
    for _ in 0..((GENERATION_PERIOD * 1.5 / DT) as usize) {
        sim.tick(DT);
    }
    assert!(!sim.is_transitioning());
    assert_eq!(sim.generation(), 0);
}
