use crate::config::*;
use bevy::math::Vec2;

/// Which sensor won a chemotaxis reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sensor {
    Forward,
    Left,
    Right,
}

/// Strongest of the three trail sensors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub sensor: Sensor,
    /// Unit direction on the ground plane (`y` holds world Z)
    pub direction: Vec2,
    pub value: f32,
}

/// Pheromone field over a square `[-R, R]²` region split into `N×N` cells.
/// Written and read through the nearest cell.
#[derive(Debug, Clone, PartialEq)]
pub struct TrailGrid {
    resolution: usize,
    bound_radius: f32,
    decay_rate: f32,
    cells: Vec<f32>,
}

impl Default for TrailGrid {
    fn default() -> Self {
        Self::new(TRAIL_GRID_SIZE, TRAIL_BOUND_RADIUS, TRAIL_DECAY_RATE)
    }
}

impl TrailGrid {
    pub fn new(resolution: usize, bound_radius: f32, decay_rate: f32) -> Self {
        let resolution = resolution.max(1);
        Self {
            resolution,
            bound_radius,
            decay_rate: decay_rate.clamp(0.0, 1.0),
            cells: vec![0.0; resolution * resolution],
        }
    }

    pub fn resolution(&self) -> usize {
        self.resolution
    }

    pub fn cell_size(&self) -> f32 {
        2.0 * self.bound_radius / self.resolution as f32
    }

    pub fn cells(&self) -> &[f32] {
        &self.cells
    }

    fn axis_index(&self, coord: f32) -> usize {
        let u = (coord + self.bound_radius) / (2.0 * self.bound_radius);
        let i = (u * self.resolution as f32).floor();
        if i.is_nan() {
            return 0;
        }
        (i.max(0.0) as usize).min(self.resolution - 1)
    }

    /// Flat index of the cell nearest to `(x, z)`; points outside the region
    /// map onto the border cells
    pub fn index(&self, x: f32, z: f32) -> usize {
        self.axis_index(x) + self.axis_index(z) * self.resolution
    }

    /// Add `amount` to the nearest cell; negative amounts are ignored
    pub fn deposit(&mut self, x: f32, z: f32, amount: f32) {
        if amount <= 0.0 || !amount.is_finite() {
            return;
        }
        let i = self.index(x, z);
        self.cells[i] += amount;
    }

    pub fn sample(&self, x: f32, z: f32) -> f32 {
        self.cells[self.index(x, z)]
    }

    /// Sample normalised to `[0, 1]` for visual feedback
    pub fn strength(&self, x: f32, z: f32) -> f32 {
        (self.sample(x, z) / TRAIL_VISUAL_MAX).clamp(0.0, 1.0)
    }

    /// Multiply every cell by the decay rate once
    pub fn decay(&mut self) {
        let rate = self.decay_rate;
        self.cells.iter_mut().for_each(|c| *c *= rate);
    }

    /// Decay scaled to an arbitrary frame time, equal to [`TrailGrid::decay`]
    /// when `dt == REFERENCE_DT`
    pub fn decay_for(&mut self, dt: f32) {
        let rate = self.decay_rate.powf(dt.max(0.0) / REFERENCE_DT);
        self.cells.iter_mut().for_each(|c| *c *= rate);
    }

    /// Three-ray slime-mold sensing: probe ahead, ahead-left and ahead-right
    /// and report the strongest reading above the activation threshold
    pub fn sense(&self, position: Vec2, velocity: Vec2) -> Option<SensorReading> {
        let forward = velocity.try_normalize()?;
        // Rotation about world +Y turns clockwise in the (x, z) plane
        let left = Vec2::from_angle(-SENSOR_ANGLE).rotate(forward);
        let right = Vec2::from_angle(SENSOR_ANGLE).rotate(forward);

        let read = |sensor, direction: Vec2| {
            let probe = position + direction * SENSOR_DISTANCE;
            SensorReading {
                sensor,
                direction,
                value: self.sample(probe.x, probe.y),
            }
        };

        let mut best = read(Sensor::Forward, forward);
        for candidate in [read(Sensor::Left, left), read(Sensor::Right, right)] {
            if candidate.value > best.value {
                best = candidate;
            }
        }

        (best.value > SENSOR_THRESHOLD).then_some(best)
    }

    /// Steering contribution toward the strongest sensed trail
    pub fn follow_force(&self, position: Vec2, velocity: Vec2) -> Vec2 {
        self.sense(position, velocity)
            .map(|r| r.direction * (TRAIL_FOLLOW_WEIGHT * r.value))
            .unwrap_or(Vec2::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_size_covers_region() {
        let grid = TrailGrid::default();
        assert!((grid.cell_size() * grid.resolution() as f32 - 2.0 * TRAIL_BOUND_RADIUS).abs() < 1e-4);
    }

    #[test]
    fn deposit_reads_back_from_same_cell() {
        let mut grid = TrailGrid::default();
        grid.deposit(10.2, -33.7, 2.5);
        assert_eq!(grid.sample(10.3, -33.6), 2.5);
        assert_eq!(grid.sample(-10.0, 33.0), 0.0);
    }

    #[test]
    fn outside_points_clamp_to_border() {
        let mut grid = TrailGrid::new(4, 10.0, 0.9);
        grid.deposit(500.0, 500.0, 1.0);
        assert_eq!(grid.index(500.0, 500.0), 15);
        assert_eq!(grid.sample(9.9, 9.9), 1.0);
        assert_eq!(grid.index(-500.0, -500.0), 0);
    }

    #[test]
    fn negative_deposits_keep_cells_non_negative() {
        let mut grid = TrailGrid::default();
        grid.deposit(0.0, 0.0, -5.0);
        grid.deposit(0.0, 0.0, f32::NAN);
        assert!(grid.cells().iter().all(|&c| c >= 0.0));
    }

    #[test]
    fn constant_deposit_converges_geometrically() {
        let amount = 3.0;
        let rate = 0.96;
        let mut grid = TrailGrid::new(8, 10.0, rate);
        for n in 1..=400 {
            grid.deposit(0.0, 0.0, amount);
            grid.decay();
            // Partial sum A·D·(1 - Dⁿ)/(1 - D)
            let expected = amount * rate * (1.0 - rate.powi(n)) / (1.0 - rate);
            let actual = grid.sample(0.0, 0.0);
            assert!((actual - expected).abs() <= 1e-3 * expected, "tick {n}: {actual} vs {expected}");
        }
        let limit = amount * rate / (1.0 - rate);
        assert!((grid.sample(0.0, 0.0) - limit).abs() < 1e-2);
    }

    #[test]
    fn scaled_decay_matches_fixed_decay_at_reference_dt() {
        let mut fixed = TrailGrid::default();
        let mut scaled = TrailGrid::default();
        fixed.deposit(1.0, 1.0, 1.0);
        scaled.deposit(1.0, 1.0, 1.0);
        fixed.decay();
        scaled.decay_for(REFERENCE_DT);
        assert!((fixed.sample(1.0, 1.0) - scaled.sample(1.0, 1.0)).abs() < 1e-6);

        // Two half-steps equal one full step
        let mut halves = TrailGrid::default();
        halves.deposit(1.0, 1.0, 1.0);
        halves.decay_for(REFERENCE_DT * 0.5);
        halves.decay_for(REFERENCE_DT * 0.5);
        assert!((halves.sample(1.0, 1.0) - fixed.sample(1.0, 1.0)).abs() < 1e-6);
    }

    #[test]
    fn sensing_steers_toward_strongest_ray() {
        let mut grid = TrailGrid::default();
        let position = Vec2::ZERO;
        let velocity = Vec2::new(0.0, 1.0);
        let right = Vec2::from_angle(SENSOR_ANGLE).rotate(velocity) * SENSOR_DISTANCE;
        grid.deposit(right.x, right.y, 2.0);

        let reading = grid.sense(position, velocity).unwrap();
        assert_eq!(reading.sensor, Sensor::Right);
        assert_eq!(reading.value, 2.0);
        let force = grid.follow_force(position, velocity);
        assert!((force.length() - TRAIL_FOLLOW_WEIGHT * 2.0).abs() < 1e-4);
    }

    #[test]
    fn sensing_ignores_faint_trails_and_still_agents() {
        let mut grid = TrailGrid::default();
        grid.deposit(0.0, SENSOR_DISTANCE, SENSOR_THRESHOLD * 0.5);
        assert!(grid.sense(Vec2::ZERO, Vec2::Y).is_none());
        grid.deposit(0.0, SENSOR_DISTANCE, 1.0);
        assert!(grid.sense(Vec2::ZERO, Vec2::ZERO).is_none());
        assert_eq!(grid.sense(Vec2::ZERO, Vec2::Y).map(|r| r.sensor), Some(Sensor::Forward));
    }
}
