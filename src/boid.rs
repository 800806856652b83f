use crate::config::*;
use crate::field::ThermalField;
use crate::genome::{Genome, Phenotype};
use crate::life::{LifeState, LifeStep, Vitality};
use crate::nutrient::NutrientField;
use crate::steering::{self, NeighborSnapshot};
use crate::terrain::{GroundHit, TerrainSampler};
use crate::trail::TrailGrid;
use bevy::math::{Quat, Vec2, Vec3};
use rand::Rng;
use std::collections::VecDeque;
use std::f32::consts::TAU;

/// What rendering reads back from one agent after a tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoidPose {
    /// Body position: ground + foot offset + slope lift + hop
    pub position: Vec3,
    pub orientation: Quat,
    pub scale: f32,
    pub glow: f32,
    /// Local trail intensity in `[0, 1]`
    pub trail_strength: f32,
    pub trail_opacity: f32,
}

impl Default for BoidPose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            scale: 1.0,
            glow: 0.0,
            trail_strength: 0.0,
            trail_opacity: 0.2,
        }
    }
}

/// Shared, read-mostly world state one agent sees during a tick
pub struct TickContext<'a> {
    pub now: f64,
    pub dt: f32,
    pub field: &'a ThermalField,
    pub trail: &'a mut TrailGrid,
    pub nutrients: &'a NutrientField,
    pub terrain: Option<&'a dyn TerrainSampler>,
    pub neighbors: &'a [NeighborSnapshot],
    /// Panic ring radius while a click panic is running
    pub panic_radius: Option<f32>,
    pub death_duration: f32,
    pub newborn_duration: f32,
}

impl TickContext<'_> {
    fn ground(&self, x: f32, z: f32) -> GroundHit {
        match self.terrain {
            Some(terrain) => terrain.height_at(x, z),
            None => GroundHit::flat(x, z),
        }
    }
}

/// One ThermoBug occupying a fixed population slot
#[derive(Debug, Clone)]
pub struct Boid {
    slot: usize,
    /// World position; `y` is the body height the hover check runs against
    pub position: Vec3,
    /// Planar velocity (`y` holds world Z)
    pub velocity: Vec2,
    pub yaw: f32,
    pub hop_phase: f32,
    pub wander_phase: f32,
    genome: Genome,
    phenotype: Phenotype,
    vitality: Vitality,
    /// How far a dying body has sunk into the ground
    sink_depth: f32,
    trail: VecDeque<Vec3>,
    pose: BoidPose,
}

impl Boid {
    /// A fresh agent at `position` with small random motion and phases
    pub fn spawn<R: Rng + ?Sized>(slot: usize, position: Vec3, genome: Genome, rng: &mut R) -> Self {
        let velocity = Vec2::new(rng.gen_range(-0.15..0.15), rng.gen_range(-0.15..0.15));
        let yaw = rng.gen_range(0.0..TAU);
        let mut trail = VecDeque::with_capacity(TRAIL_MAX_POINTS);
        trail.push_back(position);
        Self {
            slot,
            position,
            velocity,
            yaw,
            hop_phase: rng.gen_range(0.0..TAU),
            wander_phase: rng.gen_range(0.0..1000.0),
            phenotype: Phenotype::from(&genome),
            genome,
            vitality: Vitality::default(),
            sink_depth: 0.0,
            trail,
            pose: BoidPose {
                position,
                orientation: steering::orientation(yaw, Vec3::Y),
                ..BoidPose::default()
            },
        }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn genome(&self) -> &Genome {
        &self.genome
    }

    pub fn phenotype(&self) -> &Phenotype {
        &self.phenotype
    }

    pub fn vitality(&self) -> &Vitality {
        &self.vitality
    }

    pub fn state(&self) -> LifeState {
        self.vitality.state()
    }

    pub fn pose(&self) -> &BoidPose {
        &self.pose
    }

    pub fn trail_points(&self) -> &VecDeque<Vec3> {
        &self.trail
    }

    pub fn planar_speed(&self) -> f32 {
        self.velocity.length()
    }

    pub fn snapshot(&self) -> NeighborSnapshot {
        NeighborSnapshot {
            position: Vec2::new(self.position.x, self.position.z),
            velocity: self.velocity,
            active: self.vitality.is_active(),
        }
    }

    /// Swap in a new genome and re-derive the phenotype
    pub fn apply_genome(&mut self, genome: Genome) {
        self.phenotype = Phenotype::from(&genome);
        self.genome = genome;
    }

    fn restart_trail(&mut self) {
        self.trail.clear();
        self.trail.push_back(self.position);
    }

    pub fn mark_doomed(&mut self) {
        self.vitality.mark_doomed();
    }

    /// Revive a dead survivor; returns whether anything changed
    pub fn resurrect(&mut self) -> bool {
        if !self.vitality.resurrect() {
            return false;
        }
        self.sink_depth = 0.0;
        if self.trail.is_empty() {
            self.trail.push_back(self.position);
        }
        true
    }

    pub fn mark_newborn(&mut self) {
        self.vitality.mark_newborn();
        self.sink_depth = 0.0;
        self.restart_trail();
    }

    /// Advance this agent by one tick: life animation, forces, integration,
    /// trail deposit, ground conforming and pose
    pub fn update(&mut self, ctx: &mut TickContext<'_>) -> LifeStep {
        let dt = ctx.dt;
        let step = self.vitality.advance(dt, ctx.death_duration, ctx.newborn_duration);
        match step {
            LifeStep::Skip | LifeStep::Died => return step,
            LifeStep::Live { sink } => {
                self.position.y -= sink;
                self.sink_depth += sink;
            }
        }
        let visibility = self.vitality.visibility();

        // Forces
        let here = Vec2::new(self.position.x, self.position.z);
        let flock = steering::flock_forces(self.slot, ctx.neighbors);
        let sample = ctx.field.sample(here.x, here.y, ctx.now);
        let to_sun = ctx.field.sun.position - here;
        let far_boost = steering::far_boost(to_sun.length());

        let mut acceleration = flock.weighted() + steering::heat_steer(to_sun, &sample, &ctx.field.sun);
        if let Some(radius) = ctx.panic_radius {
            acceleration += steering::panic_force(to_sun, radius);
        }
        acceleration += ctx.nutrients.force(here) * NUTRIENT_WEIGHT;
        acceleration += ctx.trail.follow_force(here, self.velocity);

        self.wander_phase += dt * WANDER_RATE;
        acceleration += steering::wander(self.wander_phase);
        acceleration += steering::fallback_bias(acceleration, to_sun);

        // Integration
        self.velocity =
            steering::integrate_velocity(self.velocity, acceleration, self.phenotype.speed_factor, dt);
        self.position.x += self.velocity.x * dt;
        self.position.z += self.velocity.y * dt;
        ctx.trail
            .deposit(self.position.x, self.position.z, TRAIL_DEPOSIT_AMOUNT * visibility);

        // Ground conforming
        let ground = ctx.ground(self.position.x, self.position.z);
        if !self.position.y.is_finite() || (self.position.y - ground.point.y).abs() > MAX_HOVER {
            self.position.y = ground.point.y + FOOT_OFFSET;
        }
        let base_y = ground.point.y + FOOT_OFFSET + steering::slope_lift(ground.normal);

        self.yaw = steering::yaw_towards(self.yaw, self.velocity, dt);
        let up = steering::blended_up(ground.normal);

        self.hop_phase = (self.hop_phase + steering::hop_rate(far_boost) * dt) % TAU;
        let hop = steering::hop_height(self.hop_phase, self.phenotype.show_off);

        // Visual feedback
        let trail_strength = ctx.trail.strength(self.position.x, self.position.z);
        self.pose = BoidPose {
            position: Vec3::new(self.position.x, base_y + hop - self.sink_depth, self.position.z),
            orientation: steering::orientation(self.yaw, up),
            scale: self.phenotype.base_scale * (0.8 + 0.5 * trail_strength) * self.vitality.scale(),
            glow: steering::glow(sample.rho_sun, trail_strength, visibility),
            trail_strength,
            trail_opacity: (0.2 + 0.8 * trail_strength) * visibility,
        };

        self.trail.push_back(Vec3::new(
            self.position.x,
            base_y + TRAIL_LINE_LIFT,
            self.position.z,
        ));
        while self.trail.len() > TRAIL_MAX_POINTS {
            self.trail.pop_front();
        }

        step
    }
}
