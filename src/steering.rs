//! Force and pose helpers for one agent step. Everything here is a pure
//! function of its inputs so each rule can be checked in isolation.

use crate::config::*;
use crate::field::{FieldSample, Sun};
use bevy::math::{Quat, Vec2, Vec3};
use bevy::transform::components::Transform;
use std::f32::consts::{PI, TAU};

/// Hermite smoothstep: 0 at or below `edge0`, 1 at or above `edge1`
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if x <= edge0 {
        return 0.0;
    }
    if x >= edge1 {
        return 1.0;
    }
    let t = (x - edge0) / (edge1 - edge0);
    t * t * (3.0 - 2.0 * t)
}

/// Signed shortest rotation from `from` to `to`, in `[-π, π]`
pub fn angle_diff(from: f32, to: f32) -> f32 {
    let d = (to - from).rem_euclid(TAU);
    if d > PI { d - TAU } else { d }
}

/// Critically damped turn toward the heading of `velocity` (`y` holds
/// world Z). Keeps the last heading while nearly still.
pub fn yaw_towards(yaw: f32, velocity: Vec2, dt: f32) -> f32 {
    if velocity.length() < YAW_MIN_SPEED {
        return yaw;
    }
    let target = velocity.x.atan2(velocity.y);
    yaw + angle_diff(yaw, target) * (1.0 - (-YAW_TURN_RATE * dt).exp())
}

/// Kinematic state of one agent frozen at the start of a tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborSnapshot {
    pub position: Vec2,
    pub velocity: Vec2,
    pub active: bool,
}

/// Raw flocking sums for one agent
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlockForces {
    /// Mean neighbor velocity
    pub alignment: Vec2,
    /// Mean neighbor position relative to self
    pub cohesion: Vec2,
    pub separation: Vec2,
    pub neighbors: usize,
}

impl FlockForces {
    pub fn weighted(&self) -> Vec2 {
        self.alignment * ALIGNMENT_WEIGHT
            + self.cohesion * COHESION_WEIGHT
            + self.separation * SEPARATION_WEIGHT
    }
}

/// Alignment, cohesion and separation of agent `index` against every other
/// active agent within the neighbor radius
pub fn flock_forces(index: usize, snapshot: &[NeighborSnapshot]) -> FlockForces {
    let Some(me) = snapshot.get(index) else {
        return FlockForces::default();
    };

    let mut forces = FlockForces::default();
    let mut center = Vec2::ZERO;
    for (j, other) in snapshot.iter().enumerate() {
        if j == index || !other.active {
            continue;
        }
        let offset = other.position - me.position;
        let d2 = offset.length_squared();
        if d2 > NEIGHBOR_RADIUS * NEIGHBOR_RADIUS {
            continue;
        }
        forces.neighbors += 1;
        forces.alignment += other.velocity;
        center += other.position;

        if d2 < SEPARATION_RADIUS * SEPARATION_RADIUS {
            forces.separation -= offset / d2.sqrt().max(1e-4);
        }
    }

    if forces.neighbors > 0 {
        let n = forces.neighbors as f32;
        forces.alignment /= n;
        forces.cohesion = center / n - me.position;
    }
    forces
}

/// 0 near the sun, easing to 1 once an agent is far away
pub fn far_boost(distance_to_sun: f32) -> f32 {
    smoothstep(FAR_BOOST_INNER, FAR_BOOST_OUTER, distance_to_sun)
}

/// Whether an agent should flee the sun instead of seeking it
pub fn is_overheated(sun: &Sun, sample: &FieldSample) -> bool {
    sun.heat_pulse > OVERHEAT_PULSE && sample.rho_sun > OVERHEAT_TEMP
}

/// Direct bearing to the sun plus the sun gradient pull, which flips into a
/// flee while overheated
pub fn heat_steer(to_sun: Vec2, sample: &FieldSample, sun: &Sun) -> Vec2 {
    let distance = to_sun.length();
    let bearing = if distance > 0.0 { to_sun / distance } else { to_sun };
    let seek = bearing * SEEK_GAIN;

    let gradient = if is_overheated(sun, sample) {
        -sample.grad_sun * REPEL_GAIN
    } else {
        sample.grad_sun * (SUN_PULL * (0.6 + 0.7 * far_boost(distance)))
    };
    seek + gradient
}

/// Radial push away from the sun for agents inside the panic ring
pub fn panic_force(to_sun: Vec2, ring_radius: f32) -> Vec2 {
    let distance = to_sun.length();
    if distance >= ring_radius * PANIC_RADIUS_MUL {
        return Vec2::ZERO;
    }
    -(to_sun / distance.max(1e-4)) * PANIC_PUSH
}

/// Small sinusoidal jitter driven by a per-agent phase
pub fn wander(phase: f32) -> Vec2 {
    Vec2::new((phase * 1.7).sin(), (phase * 1.3).cos()) * WANDER_AMPLITUDE
}

/// Weak pull toward the sun when the other forces nearly cancel out
pub fn fallback_bias(acceleration: Vec2, to_sun: Vec2) -> Vec2 {
    if acceleration.length() >= FALLBACK_THRESHOLD {
        return Vec2::ZERO;
    }
    let distance = to_sun.length();
    let d = if distance > 0.0 { distance } else { 1.0 };
    to_sun / d * FALLBACK_GAIN
}

/// Clamp steering, apply damping and cap speed; returns the new velocity
pub fn integrate_velocity(velocity: Vec2, acceleration: Vec2, speed_factor: f32, dt: f32) -> Vec2 {
    let speed_factor = speed_factor.clamp(SPEED_FACTOR_MIN, SPEED_FACTOR_MAX);
    let acceleration = acceleration.clamp_length_max(STEER_MAX * speed_factor);
    let damped = (velocity + acceleration * dt) * (-DAMPING * dt).exp();
    damped.clamp_length_max(MAX_SPEED * speed_factor)
}

/// Up vector blended from world up toward the ground normal
pub fn blended_up(ground_normal: Vec3) -> Vec3 {
    Vec3::Y.lerp(ground_normal, SLOPE_ALIGN).normalize_or(Vec3::Y)
}

/// Extra height keeping bodies clear of steep slopes
pub fn slope_lift(ground_normal: Vec3) -> f32 {
    (1.0 - ground_normal.y.clamp(0.0, 1.0)) * SLOPE_LIFT
}

/// Body orientation facing `yaw` with the given up vector. The body's
/// local +Z is its nose.
pub fn orientation(yaw: f32, up: Vec3) -> Quat {
    let heading = Vec3::new(yaw.sin(), 0.0, yaw.cos());
    Transform::IDENTITY.looking_to(-heading, up).rotation
}

/// Hop phase advance per second; agents far from the sun bounce faster
pub fn hop_rate(far_boost: f32) -> f32 {
    (HOP_FREQ_BASE + HOP_FREQ_FAR_BOOST * far_boost.clamp(0.0, 1.0)) * TAU
}

/// Parabolic hop height for the current phase
pub fn hop_height(phase: f32, show_off: f32) -> f32 {
    let s = 0.5 + 0.5 * phase.sin();
    let boost = 1.0 + 0.4 * show_off.clamp(0.0, 1.0);
    4.0 * s * (1.0 - s) * HOP_AMPLITUDE * boost
}

/// Emissive glow from sun proximity and trail strength, gated by visibility
pub fn glow(rho_sun: f32, trail_strength: f32, visibility: f32) -> f32 {
    let g = ((rho_sun - GLOW_INNER) / (GLOW_OUTER - GLOW_INNER)).clamp(0.0, 1.0);
    let g = (g * g * g + GLOW_TRAIL_BOOST * trail_strength).clamp(0.0, 1.0);
    g * visibility.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(x: f32, z: f32, vx: f32, vz: f32) -> NeighborSnapshot {
        NeighborSnapshot {
            position: Vec2::new(x, z),
            velocity: Vec2::new(vx, vz),
            active: true,
        }
    }

    #[test]
    fn smoothstep_edges() {
        assert_eq!(smoothstep(4.0, 14.0, 2.0), 0.0);
        assert_eq!(smoothstep(4.0, 14.0, 20.0), 1.0);
        assert!((smoothstep(4.0, 14.0, 9.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn angle_diff_takes_short_way_round() {
        assert!((angle_diff(0.1, TAU - 0.1) + 0.2).abs() < 1e-5);
        assert!((angle_diff(-3.0, 3.0) - (6.0 - TAU)).abs() < 1e-5);
    }

    #[test]
    fn yaw_holds_when_still_and_turns_toward_motion() {
        assert_eq!(yaw_towards(1.0, Vec2::ZERO, 0.1), 1.0);
        // Moving along +X means yaw π/2
        let turned = yaw_towards(0.0, Vec2::new(1.0, 0.0), 0.1);
        assert!(turned > 0.0 && turned < PI / 2.0);
    }

    #[test]
    fn flocking_skips_dead_and_distant_agents() {
        let mut snapshot = vec![
            snap(0.0, 0.0, 0.0, 0.0),
            snap(1.0, 0.0, 2.0, 0.0),
            snap(0.0, 3.0, 0.0, 2.0),
            snap(50.0, 0.0, 9.0, 9.0),
        ];
        snapshot[2].active = false;
        let forces = flock_forces(0, &snapshot);
        assert_eq!(forces.neighbors, 1);
        assert_eq!(forces.alignment, Vec2::new(2.0, 0.0));
        assert_eq!(forces.cohesion, Vec2::new(1.0, 0.0));
        assert_eq!(forces.separation, Vec2::new(-1.0, 0.0));
    }

    #[test]
    fn coincident_neighbors_do_not_blow_up() {
        let snapshot = vec![snap(2.0, 2.0, 0.0, 0.0), snap(2.0, 2.0, 0.0, 0.0)];
        let forces = flock_forces(0, &snapshot);
        assert!(forces.separation.is_finite());
    }

    #[test]
    fn heat_steer_seeks_until_overheated() {
        let sun = Sun::default();
        let to_sun = Vec2::new(6.0, 0.0);
        let sample = FieldSample {
            rho_sun: 0.5,
            grad_sun: Vec2::new(0.2, 0.0),
            ..FieldSample::default()
        };
        assert!(heat_steer(to_sun, &sample, &sun).x > 0.0);

        let hot_sun = Sun {
            heat_pulse: 1.0,
            ..Sun::default()
        };
        let hot = FieldSample {
            rho_sun: 3.0,
            grad_sun: Vec2::new(0.2, 0.0),
            ..FieldSample::default()
        };
        assert!(is_overheated(&hot_sun, &hot));
        let cool = heat_steer(to_sun, &sample, &sun);
        let flee = heat_steer(to_sun, &hot, &hot_sun);
        assert!(flee.x < cool.x);
        assert!((flee.x - (SEEK_GAIN - 0.2 * REPEL_GAIN)).abs() < 1e-5);
    }

    #[test]
    fn panic_pushes_outward_inside_ring_only() {
        let inside = panic_force(Vec2::new(3.0, 0.0), 6.0);
        assert!((inside - Vec2::new(-PANIC_PUSH, 0.0)).length() < 1e-4);
        assert_eq!(panic_force(Vec2::new(30.0, 0.0), 6.0), Vec2::ZERO);
    }

    #[test]
    fn fallback_only_when_forces_cancel() {
        let to_sun = Vec2::new(0.0, 10.0);
        assert_eq!(fallback_bias(Vec2::new(5.0, 0.0), to_sun), Vec2::ZERO);
        let bias = fallback_bias(Vec2::ZERO, to_sun);
        assert!((bias - Vec2::new(0.0, FALLBACK_GAIN)).length() < 1e-6);
        assert!(fallback_bias(Vec2::ZERO, Vec2::ZERO).is_finite());
    }

    #[test]
    fn velocity_never_exceeds_scaled_max_speed() {
        let mut v = Vec2::ZERO;
        for _ in 0..600 {
            v = integrate_velocity(v, Vec2::new(100.0, 100.0), 5.0, 1.0 / 60.0);
            assert!(v.length() <= MAX_SPEED * SPEED_FACTOR_MAX + 1e-4);
        }
        let slow = integrate_velocity(Vec2::new(100.0, 0.0), Vec2::ZERO, 0.1, 1.0 / 60.0);
        assert!(slow.length() <= MAX_SPEED * SPEED_FACTOR_MIN + 1e-4);
    }

    #[test]
    fn orientation_noses_along_yaw() {
        let q = orientation(PI / 2.0, Vec3::Y);
        let nose = q * Vec3::Z;
        assert!((nose - Vec3::X).length() < 1e-4);
        assert!(((q * Vec3::Y) - Vec3::Y).length() < 1e-4);
    }

    #[test]
    fn hop_stays_within_amplitude() {
        for i in 0..100 {
            let h = hop_height(i as f32 * 0.13, 1.0);
            assert!((0.0..=HOP_AMPLITUDE * 1.4 + 1e-6).contains(&h));
        }
    }

    #[test]
    fn glow_is_gated_by_visibility() {
        assert_eq!(glow(10.0, 0.0, 0.0), 0.0);
        assert!((glow(10.0, 0.0, 1.0) - 1.0).abs() < 1e-6);
        assert_eq!(glow(0.0, 0.0, 1.0), 0.0);
        assert!((glow(0.0, 1.0, 0.5) - 0.35).abs() < 1e-6);
    }
}
