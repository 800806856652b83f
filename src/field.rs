use crate::config::*;
use bevy::log::debug;
use bevy::math::Vec2;

/// Heat density and gradient at one point of the ground plane
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FieldSample {
    /// Total density from the sun and all emitters
    pub rho: f32,
    pub grad: Vec2,
    /// Density contributed by the sun alone
    pub rho_sun: f32,
    pub grad_sun: Vec2,
}

/// The persistent heat source following the pointer
#[derive(Debug, Clone, PartialEq)]
pub struct Sun {
    /// Ground-plane position (`y` holds world Z)
    pub position: Vec2,
    pub base_intensity: f32,
    pub spread: f32,
    /// Decaying extra intensity added by clicks
    pub heat_pulse: f32,
}

impl Default for Sun {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            base_intensity: SUN_BASE_INTENSITY,
            spread: SUN_SPREAD,
            heat_pulse: 0.0,
        }
    }
}

impl Sun {
    pub fn intensity(&self) -> f32 {
        self.base_intensity + self.heat_pulse
    }
}

/// Options for a transient heat source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmitterOptions {
    pub intensity: f32,
    pub spread: f32,
    pub decay_rate: f32,
}

impl Default for EmitterOptions {
    fn default() -> Self {
        Self {
            intensity: EMITTER_INTENSITY,
            spread: EMITTER_SPREAD,
            decay_rate: EMITTER_DECAY,
        }
    }
}

/// A transient source that fades while it diffuses outward
#[derive(Debug, Clone, PartialEq)]
pub struct Emitter {
    pub position: Vec2,
    pub initial_intensity: f32,
    pub initial_spread: f32,
    /// Simulated time the emitter was added
    pub birth: f64,
    pub decay_rate: f32,
}

impl Emitter {
    fn age(&self, now: f64) -> f32 {
        (now - self.birth).max(0.0) as f32
    }

    /// `I0 · exp(-decay · age)`
    pub fn intensity_at(&self, now: f64) -> f32 {
        self.initial_intensity * (-self.decay_rate * self.age(now)).exp()
    }

    /// `σ0² + 2·D·age`
    pub fn variance_at(&self, now: f64, diffusion: f32) -> f32 {
        self.initial_spread * self.initial_spread + 2.0 * diffusion * self.age(now)
    }
}

/// Gaussian `I · exp(-r²/2σ²)` at `offset` from its center and its gradient
fn gaussian(intensity: f32, variance: f32, offset: Vec2) -> (f32, Vec2) {
    let variance = variance.max(1e-4);
    let value = intensity * (-offset.length_squared() / (2.0 * variance)).exp();
    (value, -offset * (value / variance))
}

/// Scalar heat field over the ground plane: one sun plus transient emitters
#[derive(Debug, Clone, PartialEq)]
pub struct ThermalField {
    pub sun: Sun,
    pub diffusion: f32,
    pub epsilon: f32,
    emitters: Vec<Emitter>,
}

impl Default for ThermalField {
    fn default() -> Self {
        Self {
            sun: Sun::default(),
            diffusion: DIFFUSION,
            epsilon: EMITTER_EPSILON,
            emitters: Vec::new(),
        }
    }
}

impl ThermalField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emitters(&self) -> &[Emitter] {
        &self.emitters
    }

    pub fn set_sun_position(&mut self, x: f32, z: f32) {
        self.sun.position = Vec2::new(x, z);
    }

    pub fn add_emitter(&mut self, x: f32, z: f32, now: f64, options: EmitterOptions) {
        self.emitters.push(Emitter {
            position: Vec2::new(x, z),
            initial_intensity: options.intensity,
            initial_spread: options.spread,
            birth: now,
            decay_rate: options.decay_rate,
        });
    }

    pub fn add_heat_pulse(&mut self, amount: f32) {
        self.sun.heat_pulse += amount;
    }

    /// Sample density and gradient at `(x, z)`. Pure: expired emitters are
    /// skipped here and only removed by [`ThermalField::step`].
    pub fn sample(&self, x: f32, z: f32, now: f64) -> FieldSample {
        let point = Vec2::new(x, z);

        let (rho_sun, grad_sun) = gaussian(
            self.sun.intensity(),
            self.sun.spread * self.sun.spread,
            point - self.sun.position,
        );

        let mut sample = FieldSample {
            rho: rho_sun,
            grad: grad_sun,
            rho_sun,
            grad_sun,
        };

        for emitter in &self.emitters {
            let intensity = emitter.intensity_at(now);
            if intensity < self.epsilon {
                continue;
            }
            let (rho, grad) = gaussian(
                intensity,
                emitter.variance_at(now, self.diffusion),
                point - emitter.position,
            );
            sample.rho += rho;
            sample.grad += grad;
        }

        sample
    }

    /// Drop emitters that have faded below epsilon; returns how many went
    pub fn prune(&mut self, now: f64) -> usize {
        let before = self.emitters.len();
        let epsilon = self.epsilon;
        self.emitters.retain(|e| e.intensity_at(now) >= epsilon);
        before - self.emitters.len()
    }

    /// Once-per-tick maintenance: prune emitters and decay the heat pulse
    pub fn step(&mut self, now: f64, dt: f32) {
        let pruned = self.prune(now);
        if pruned > 0 {
            debug!("pruned {pruned} faded heat emitters");
        }
        self.sun.heat_pulse *= HEAT_PULSE_DECAY.powf(dt / REFERENCE_DT);
    }

    /// Radius of the heat ring drawn around the sun; grows with the pulse
    pub fn visual_radius(&self) -> f32 {
        let pulse = self.sun.heat_pulse.clamp(0.0, 3.0);
        HEAT_RING_RADIUS * (0.78 + 0.22 * pulse)
    }
}
