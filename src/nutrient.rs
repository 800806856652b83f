use crate::config::*;
use crate::steering::smoothstep;
use bevy::math::Vec2;
use rand::Rng;
use std::f32::consts::TAU;

/// Uniform random points in a disc of `radius` around the origin
pub fn scatter<R: Rng + ?Sized>(rng: &mut R, count: usize, radius: f32) -> Vec<Vec2> {
    (0..count)
        .map(|_| {
            let angle = rng.gen_range(0.0..TAU);
            let r = rng.gen_range(0.0f32..1.0).sqrt() * radius;
            Vec2::new(angle.cos() * r, angle.sin() * r)
        })
        .collect()
}

/// Registered food attractors on the ground plane (`y` holds world Z)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NutrientField {
    points: Vec<Vec2>,
}

impl NutrientField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    /// Replace every attractor; non-finite points are dropped
    pub fn set_points<I: IntoIterator<Item = Vec2>>(&mut self, points: I) {
        self.points.clear();
        self.points
            .extend(points.into_iter().filter(|p| p.is_finite()));
    }

    pub fn add_point(&mut self, point: Vec2) {
        if point.is_finite() {
            self.points.push(point);
        }
    }

    /// Unit direction toward nearby nutrients, each weighted by how deep the
    /// agent is inside its attraction ring. Zero when nothing is in reach.
    pub fn force(&self, position: Vec2) -> Vec2 {
        let mut sum = Vec2::ZERO;
        for point in &self.points {
            let offset = *point - position;
            let d2 = offset.length_squared();
            if d2 <= 1e-6 || d2 > NUTRIENT_OUTER_RADIUS * NUTRIENT_OUTER_RADIUS {
                continue;
            }
            let d = d2.sqrt();
            let w = 1.0 - smoothstep(NUTRIENT_INNER_RADIUS, NUTRIENT_OUTER_RADIUS, d);
            if w <= 0.0 {
                continue;
            }
            sum += offset / d * w;
        }

        if sum.length_squared() < 1e-6 {
            Vec2::ZERO
        } else {
            sum.normalize()
        }
    }
}
