use crate::boid::{Boid, TickContext};
use crate::config::*;
use crate::field::{EmitterOptions, ThermalField};
use crate::ga::{GeneticAlgorithm, PopulationSummary};
use crate::genome::Genome;
use crate::life::LifeState;
use crate::nutrient::NutrientField;
use crate::schedule::EventQueue;
use crate::steering::NeighborSnapshot;
use crate::terrain::{GroundHit, TerrainSampler};
use crate::trail::TrailGrid;
use bevy::color::Color;
use bevy::prelude::Resource;
use bevy::log::{debug, info, warn};
use bevy::math::{Quat, Vec2, Vec3};
use bevy::time::{Timer, TimerMode};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::VecDeque;
use std::f32::consts::TAU;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Deferred second half of a generation change
#[derive(Debug, Clone, PartialEq)]
enum Transition {
    Replace { doomed: Vec<usize> },
}

/// Per-agent values the renderer draws
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentView {
    pub slot: usize,
    pub state: LifeState,
    /// False once the agent is dead
    pub visible: bool,
    pub position: Vec3,
    pub orientation: Quat,
    pub scale: f32,
    pub glow: f32,
    pub body_color: Color,
    pub pattern_id: u8,
}

/// One agent's trail line
#[derive(Debug, Clone, Copy)]
pub struct TrailView<'a> {
    pub slot: usize,
    pub points: &'a VecDeque<Vec3>,
    pub color: Color,
    pub opacity: f32,
    pub visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatRing {
    /// Sun position on the ground, lifted slightly
    pub center: Vec3,
    pub radius: f32,
    pub pulse: f32,
}

/// Everything rendering needs for one frame; read-only
#[derive(Debug, Clone)]
pub struct RenderFrame<'a> {
    pub agents: Vec<AgentView>,
    pub trails: Vec<TrailView<'a>>,
    pub heat_ring: HeatRing,
}

/// Population and runtime statistics for display
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SimSummary {
    pub generation: u32,
    pub population: PopulationSummary,
    /// Mean planar speed of living agents
    pub mean_speed: f32,
    /// Smoothed activity level in `[0, ACTIVITY_SCALE]`
    pub activity: f32,
    pub alive: usize,
    pub dying: usize,
    pub dead: usize,
    pub newborn: usize,
    pub transitioning: bool,
}

/// The whole ThermoBug world: field, trails, agents and the GA driving them.
///
/// Construct with [`Simulation::new`], advance with [`Simulation::tick`] once
/// per frame and tear down with [`Simulation::dispose`].
#[derive(Resource)]
pub struct Simulation {
    config: SimConfig,
    /// Simulated seconds; `f64` so small frame steps still advance it
    /// after days of uptime
    time: f64,
    field: ThermalField,
    trail: TrailGrid,
    nutrients: NutrientField,
    boids: Vec<Boid>,
    ga: GeneticAlgorithm,
    terrain: Option<Box<dyn TerrainSampler>>,
    panic_until: f64,
    generation_timer: Timer,
    pending: EventQueue<Transition>,
    activity: f32,
    disposed: bool,
}

/// Push genomes into agent slots: every shared slot when `indices` is
/// empty or absent, otherwise only the listed in-range slots
fn apply_genomes(boids: &mut [Boid], population: &[Genome], indices: Option<&[usize]>) {
    match indices {
        Some(indices) if !indices.is_empty() => {
            for &slot in indices {
                match (boids.get_mut(slot), population.get(slot)) {
                    (Some(boid), Some(genome)) => boid.apply_genome(*genome),
                    _ => debug!("ignoring genome for out-of-range slot {slot}"),
                }
            }
        }
        _ => {
            for (boid, genome) in boids.iter_mut().zip(population) {
                boid.apply_genome(*genome);
            }
        }
    }
}

impl Simulation {
    /// Build a world with a random first generation
    pub fn new(config: SimConfig, terrain: Option<Box<dyn TerrainSampler>>) -> Result<Self, SimError> {
        config.validate()?;
        let ga = GeneticAlgorithm::new(config.ga.clone(), config.seed)?;
        Ok(Self::build(config, ga, terrain))
    }

    /// Build a world around a hand-picked population; its length becomes
    /// the population size
    pub fn with_genomes(
        config: SimConfig,
        genomes: Vec<Genome>,
        terrain: Option<Box<dyn TerrainSampler>>,
    ) -> Result<Self, SimError> {
        let ga = GeneticAlgorithm::with_population(config.ga.clone(), genomes, config.seed)?;
        let config = SimConfig {
            ga: ga.config().clone(),
            ..config
        };
        config.validate()?;
        Ok(Self::build(config, ga, terrain))
    }

    fn build(config: SimConfig, ga: GeneticAlgorithm, terrain: Option<Box<dyn TerrainSampler>>) -> Self {
        if terrain.is_none() {
            warn!("no terrain sampler supplied; agents walk on flat ground at y = 0");
        }

        let mut sim = Self {
            trail: TrailGrid::new(
                config.trail_grid_size,
                config.trail_bound_radius,
                config.trail_decay_rate,
            ),
            generation_timer: Timer::from_seconds(config.generation_period, TimerMode::Repeating),
            time: 0.0,
            field: ThermalField::new(),
            nutrients: NutrientField::new(),
            boids: Vec::new(),
            ga,
            terrain,
            panic_until: f64::NEG_INFINITY,
            pending: EventQueue::new(),
            activity: 0.0,
            disposed: false,
            config,
        };
        sim.spawn_boids();
        info!(
            "simulation ready: {} agents, seed {}, generation period {}s",
            sim.boids.len(),
            sim.config.seed,
            sim.config.generation_period
        );
        sim
    }

    fn ground(&self, x: f32, z: f32) -> GroundHit {
        match &self.terrain {
            Some(terrain) => terrain.height_at(x, z),
            None => GroundHit::flat(x, z),
        }
    }

    /// Rejection-sample spawn points in a disc so agents start apart
    fn spawn_boids(&mut self) {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed.wrapping_add(1));
        let radius = self.config.spawn_radius();
        let min_gap = SEPARATION_RADIUS * 2.0;

        let mut used: Vec<Vec2> = Vec::with_capacity(self.ga.population().len());
        let mut boids = Vec::with_capacity(used.capacity());
        for (slot, genome) in self.ga.population().iter().enumerate() {
            let mut point = Vec2::ZERO;
            for _ in 0..SPAWN_MAX_TRIES {
                let angle = rng.gen_range(0.0..TAU);
                let r = rng.gen_range(0.0f32..1.0).sqrt() * radius;
                point = Vec2::new(angle.cos() * r, angle.sin() * r);
                if used.iter().all(|q| q.distance(point) > min_gap) {
                    break;
                }
            }
            used.push(point);

            let hit = self.ground(point.x, point.y);
            let position = hit.point + Vec3::Y * FOOT_OFFSET;
            boids.push(Boid::spawn(slot, position, *genome, &mut rng));
        }
        self.boids = boids;
    }

    /// Advance the world by one frame of `dt` seconds
    pub fn tick(&mut self, dt: f32) {
        if self.disposed {
            return;
        }
        let dt = if dt.is_finite() { dt.clamp(0.0, MAX_FRAME_DT) } else { 0.0 };
        self.time += f64::from(dt);
        let now = self.time;

        self.trail.decay_for(dt);

        let neighbors: Vec<NeighborSnapshot> = self.boids.iter().map(Boid::snapshot).collect();
        let panic_radius = self.is_panicking().then(|| self.field.visual_radius());
        let mut ctx = TickContext {
            now,
            dt,
            field: &self.field,
            trail: &mut self.trail,
            nutrients: &self.nutrients,
            terrain: self.terrain.as_deref(),
            neighbors: &neighbors,
            panic_radius,
            death_duration: self.config.death_duration,
            newborn_duration: self.config.newborn_duration,
        };
        for boid in &mut self.boids {
            boid.update(&mut ctx);
        }

        self.field.step(now, dt);
        self.update_activity(dt);

        for transition in self.pending.drain_due(now) {
            match transition {
                Transition::Replace { doomed } => self.complete_generation(&doomed),
            }
        }

        if self.config.auto_run && !self.is_transitioning() {
            self.generation_timer.tick(Duration::from_secs_f32(dt));
            if self.generation_timer.just_finished() {
                self.trigger_next_generation();
            }
        }
    }

    fn update_activity(&mut self, dt: f32) {
        let raw = (self.mean_speed() / ACTIVITY_SPEED_MAX).clamp(0.0, 1.0) * ACTIVITY_SCALE;
        let blend = 1.0 - (1.0 - ACTIVITY_SMOOTHING).powf(dt / REFERENCE_DT);
        self.activity += (raw - self.activity) * blend;
    }

    // ------------------------------------------------------------------
    // Input feed
    // ------------------------------------------------------------------

    /// Move the sun to the pointer's ground position
    pub fn set_heat_position(&mut self, x: f32, z: f32) {
        if x.is_finite() && z.is_finite() {
            self.field.set_sun_position(x, z);
        }
    }

    /// Click: drop an emitter under the sun, boost the sun and scare nearby agents
    pub fn pulse_heat(&mut self) {
        let sun = self.field.sun.position;
        self.field
            .add_emitter(sun.x, sun.y, self.time, EmitterOptions::default());
        self.field.add_heat_pulse(HEAT_PULSE_INCREMENT);
        self.panic_until = self.time + f64::from(PANIC_WINDOW);
    }

    /// Whether agents near the sun are still fleeing the last click
    pub fn is_panicking(&self) -> bool {
        self.time < self.panic_until
    }

    pub fn set_nutrient_points<I: IntoIterator<Item = Vec2>>(&mut self, points: I) {
        self.nutrients.set_points(points);
    }

    pub fn add_nutrient_point(&mut self, point: Vec2) {
        self.nutrients.add_point(point);
    }

    // ------------------------------------------------------------------
    // Population bridge
    // ------------------------------------------------------------------

    pub fn population(&self) -> &[Genome] {
        self.ga.population()
    }

    pub fn generation(&self) -> u32 {
        self.ga.generation()
    }

    /// Push genomes into the listed agent slots, or every slot for `None`
    pub fn apply_population_genomes(&mut self, population: &[Genome], indices: Option<&[usize]>) {
        apply_genomes(&mut self.boids, population, indices);
    }

    // ------------------------------------------------------------------
    // Selection bridge
    // ------------------------------------------------------------------

    /// Revive dead survivors and start the death animation of doomed slots
    pub fn mark_selection(&mut self, survivors: &[usize], doomed: &[usize]) {
        for &slot in survivors {
            match self.boids.get_mut(slot) {
                Some(boid) => {
                    boid.resurrect();
                }
                None => debug!("ignoring out-of-range survivor slot {slot}"),
            }
        }
        for &slot in doomed {
            match self.boids.get_mut(slot) {
                Some(boid) => boid.mark_doomed(),
                None => debug!("ignoring out-of-range doomed slot {slot}"),
            }
        }
    }

    /// Start the birth animation of freshly bred slots
    pub fn mark_newborn(&mut self, slots: &[usize]) {
        for &slot in slots {
            match self.boids.get_mut(slot) {
                Some(boid) => boid.mark_newborn(),
                None => debug!("ignoring out-of-range newborn slot {slot}"),
            }
        }
    }

    // ------------------------------------------------------------------
    // Generation control
    // ------------------------------------------------------------------

    pub fn is_transitioning(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Evaluate now, animate deaths, and schedule replacement after the
    /// death animation and survivors window. Ignored while a transition is
    /// already pending; returns whether one started.
    pub fn trigger_next_generation(&mut self) -> bool {
        if self.disposed || self.is_transitioning() {
            return false;
        }
        self.generation_timer.reset();

        let evaluation = self.ga.evaluate();
        self.mark_selection(&evaluation.survivors, &evaluation.doomed);
        info!(
            "generation {}: {} survivors, {} doomed",
            self.ga.generation(),
            evaluation.survivors.len(),
            evaluation.doomed.len()
        );
        if let Some(best) = evaluation.survivors.first().and_then(|&i| self.ga.population().get(i)) {
            debug!("fittest genome: {best}");
        }

        let due = self.time + f64::from(self.config.transition_delay());
        self.pending.schedule(
            due,
            Transition::Replace {
                doomed: evaluation.doomed,
            },
        );
        true
    }

    fn complete_generation(&mut self, doomed: &[usize]) {
        self.ga.next_generation(doomed);
        apply_genomes(&mut self.boids, self.ga.population(), Some(doomed));
        self.mark_newborn(doomed);
        info!(
            "generation {} born: {} slots replaced",
            self.ga.generation(),
            doomed.len()
        );
    }

    pub fn auto_run(&self) -> bool {
        self.config.auto_run
    }

    pub fn set_auto_run(&mut self, enabled: bool) {
        self.config.auto_run = enabled;
    }

    /// Fraction of the generation period elapsed, in `[0, 1]`
    pub fn generation_progress(&self) -> f32 {
        self.generation_timer.fraction()
    }

    // ------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------

    /// Cancel any pending transition and drop every agent; later ticks do nothing
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        let cancelled = self.pending.cancel_all();
        self.boids.clear();
        self.disposed = true;
        info!("simulation disposed ({cancelled} pending transition(s) cancelled)");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Simulated seconds since construction
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn boids(&self) -> &[Boid] {
        &self.boids
    }

    pub fn field(&self) -> &ThermalField {
        &self.field
    }

    pub fn trail(&self) -> &TrailGrid {
        &self.trail
    }

    pub fn nutrients(&self) -> &NutrientField {
        &self.nutrients
    }

    pub fn genetic_algorithm(&self) -> &GeneticAlgorithm {
        &self.ga
    }

    /// Mean planar speed of agents that are not dead
    pub fn mean_speed(&self) -> f32 {
        let (sum, n) = self
            .boids
            .iter()
            .filter(|b| b.vitality().is_active())
            .fold((0.0, 0usize), |(sum, n), b| (sum + b.planar_speed(), n + 1));
        if n == 0 { 0.0 } else { sum / n as f32 }
    }

    pub fn summary(&self) -> SimSummary {
        let mut summary = SimSummary {
            generation: self.ga.generation(),
            population: self.ga.summary(),
            mean_speed: self.mean_speed(),
            activity: self.activity,
            transitioning: self.is_transitioning(),
            ..SimSummary::default()
        };
        for boid in &self.boids {
            match boid.state() {
                LifeState::Alive => summary.alive += 1,
                LifeState::Dying => summary.dying += 1,
                LifeState::Dead => summary.dead += 1,
                LifeState::Newborn => summary.newborn += 1,
            }
        }
        summary
    }

    pub fn render_frame(&self) -> RenderFrame<'_> {
        let mut agents = Vec::with_capacity(self.boids.len());
        let mut trails = Vec::with_capacity(self.boids.len());
        for boid in &self.boids {
            let pose = boid.pose();
            let visible = boid.vitality().is_active();
            agents.push(AgentView {
                slot: boid.slot(),
                state: boid.state(),
                visible,
                position: pose.position,
                orientation: pose.orientation,
                scale: pose.scale,
                glow: pose.glow,
                body_color: boid.phenotype().body_color,
                pattern_id: boid.phenotype().pattern_id,
            });
            trails.push(TrailView {
                slot: boid.slot(),
                points: boid.trail_points(),
                color: boid.phenotype().trail_color,
                opacity: pose.trail_opacity,
                visible,
            });
        }

        let sun = self.field.sun.position;
        let ground = self.ground(sun.x, sun.y);
        RenderFrame {
            agents,
            trails,
            heat_ring: HeatRing {
                center: Vec3::new(sun.x, ground.point.y + 0.01, sun.y),
                radius: self.field.visual_radius(),
                pulse: self.field.sun.heat_pulse,
            },
        }
    }
}
