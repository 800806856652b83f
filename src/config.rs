/// Configuration constants and validated settings for the ThermoBug simulation
use std::f32::consts::FRAC_PI_4;
use thiserror::Error;

// ============================================================================
// GENETIC ALGORITHM
// ============================================================================

/// Number of genome slots (and agents) in the population
pub const POPULATION_SIZE: usize = 40;

/// Fraction of the population kept unchanged every generation
pub const SURVIVAL_RATE: f32 = 0.4;

/// Per-gene probability that a gene is mutated
pub const MUTATION_RATE: f32 = 0.15;

/// Probability that a child is bred by crossover instead of cloning a parent
pub const CROSSOVER_RATE: f32 = 0.9;

/// Number of random draws in a tournament selection
pub const TOURNAMENT_SIZE: usize = 3;

/// Generations over which selection pressure ramps toward the survivor pattern
pub const PATTERN_PRESSURE_GENERATIONS: f32 = 20.0;

/// Seed used when none is supplied
pub const DEFAULT_SEED: u64 = 0x7468_6572_6d6f;

// ============================================================================
// GENERATION TIMING
// ============================================================================

/// Seconds between automatic generation transitions
pub const GENERATION_PERIOD: f32 = 10.0;

/// Seconds a doomed agent takes to fade out
pub const DEATH_ANIM_DURATION: f32 = 2.0;

/// Extra seconds survivors are shown alone before replacement
pub const SURVIVORS_WINDOW: f32 = 1.0;

/// Seconds a newborn agent takes to fade in
pub const NEWBORN_ANIM_DURATION: f32 = 1.0;

/// Speed at which a dying agent sinks into the ground (units per second at full fade)
pub const DEATH_SINK_SPEED: f32 = 0.15;

/// Frame time the per-tick decay factors were tuned against
pub const REFERENCE_DT: f32 = 1.0 / 60.0;

/// Largest frame time fed into the integrator
pub const MAX_FRAME_DT: f32 = 0.05;

// ============================================================================
// FLOCKING
// ============================================================================

pub const NEIGHBOR_RADIUS: f32 = 4.0;
pub const SEPARATION_RADIUS: f32 = 2.0;
pub const SEPARATION_WEIGHT: f32 = 1.7;
pub const ALIGNMENT_WEIGHT: f32 = 0.36;
pub const COHESION_WEIGHT: f32 = 0.24;

// ============================================================================
// KINEMATICS
// ============================================================================

pub const MAX_SPEED: f32 = 4.2;
pub const STEER_MAX: f32 = 8.0;
pub const DAMPING: f32 = 0.88;

/// Allowed range for the genome-driven speed multiplier
pub const SPEED_FACTOR_MIN: f32 = 0.5;
pub const SPEED_FACTOR_MAX: f32 = 1.8;

/// Turn rate of the critically damped yaw model
pub const YAW_TURN_RATE: f32 = 8.0;

/// Speed under which yaw keeps its last heading
pub const YAW_MIN_SPEED: f32 = 1e-3;

// ============================================================================
// HEAT SEEKING
// ============================================================================

/// Constant gain of the direct bearing-to-sun force
pub const SEEK_GAIN: f32 = 6.2;

/// Gain of the sun gradient pull
pub const SUN_PULL: f32 = 6.0;

/// Distance to the sun where the far boost starts / saturates
pub const FAR_BOOST_INNER: f32 = 4.0;
pub const FAR_BOOST_OUTER: f32 = 14.0;

/// Gain of the gradient flee when overheated
pub const REPEL_GAIN: f32 = 3.8;

/// Local sun density over which an agent counts as overheated
pub const OVERHEAT_TEMP: f32 = 0.9;

/// Heat pulse over which overheating is possible at all
pub const OVERHEAT_PULSE: f32 = 0.6;

/// Steering magnitude below which the fallback sun bias kicks in
pub const FALLBACK_THRESHOLD: f32 = 0.18;
pub const FALLBACK_GAIN: f32 = 0.45;

// ============================================================================
// PANIC
// ============================================================================

/// Seconds after a click during which agents near the heat ring flee
pub const PANIC_WINDOW: f32 = 0.9;
pub const PANIC_RADIUS_MUL: f32 = 1.15;
pub const PANIC_PUSH: f32 = 14.0;

// ============================================================================
// WANDER
// ============================================================================

pub const WANDER_AMPLITUDE: f32 = 0.3;
pub const WANDER_RATE: f32 = 0.8;

// ============================================================================
// NUTRIENTS
// ============================================================================

pub const NUTRIENT_INNER_RADIUS: f32 = 1.0;
pub const NUTRIENT_OUTER_RADIUS: f32 = 6.0;
pub const NUTRIENT_WEIGHT: f32 = 0.7;

/// Food patches scattered by the interactive app
pub const NUTRIENT_PATCH_COUNT: usize = 18;
pub const NUTRIENT_SCATTER_RADIUS: f32 = 40.0;

// ============================================================================
// THERMAL FIELD
// ============================================================================

pub const SUN_BASE_INTENSITY: f32 = 4.8;
pub const SUN_SPREAD: f32 = 12.0;

/// Diffusion coefficient widening emitter spread over time
pub const DIFFUSION: f32 = 0.8;

/// Emitters weaker than this are pruned
pub const EMITTER_EPSILON: f32 = 1e-3;

pub const EMITTER_INTENSITY: f32 = 6.0;
pub const EMITTER_SPREAD: f32 = 1.2;
pub const EMITTER_DECAY: f32 = 1.0;

/// Amount a click adds to the heat pulse
pub const HEAT_PULSE_INCREMENT: f32 = 0.9;

/// Heat pulse multiplier per reference tick
pub const HEAT_PULSE_DECAY: f32 = 0.98;

/// Base radius of the heat ring drawn around the sun
pub const HEAT_RING_RADIUS: f32 = 6.0;

// ============================================================================
// TRAIL GRID
// ============================================================================

/// Half side of the square region covered by the trail grid
pub const TRAIL_BOUND_RADIUS: f32 = 100.0;
pub const TRAIL_GRID_SIZE: usize = 128;
pub const TRAIL_DEPOSIT_AMOUNT: f32 = 3.0;

/// Trail multiplier per reference tick
pub const TRAIL_DECAY_RATE: f32 = 0.96;
pub const TRAIL_FOLLOW_WEIGHT: f32 = 1.5;
pub const SENSOR_DISTANCE: f32 = 12.0;
pub const SENSOR_ANGLE: f32 = FRAC_PI_4;

/// Sensor readings at or below this are ignored
pub const SENSOR_THRESHOLD: f32 = 0.001;

/// Trail value mapped to full visual strength
pub const TRAIL_VISUAL_MAX: f32 = 1.5;

/// Points kept in each agent's trail history
pub const TRAIL_MAX_POINTS: usize = 220;

// ============================================================================
// POSE
// ============================================================================

pub const FOOT_OFFSET: f32 = 0.06;
pub const SLOPE_ALIGN: f32 = 0.92;
pub const SLOPE_LIFT: f32 = 0.15;
pub const MAX_HOVER: f32 = 1.0;
pub const HOP_AMPLITUDE: f32 = 0.22;
pub const HOP_FREQ_BASE: f32 = 2.0;
pub const HOP_FREQ_FAR_BOOST: f32 = 1.8;

/// Height of the trail line above the ground
pub const TRAIL_LINE_LIFT: f32 = 0.1;

// ============================================================================
// GLOW
// ============================================================================

pub const GLOW_INNER: f32 = 1.2;
pub const GLOW_OUTER: f32 = 5.8;
pub const GLOW_TRAIL_BOOST: f32 = 0.7;

// ============================================================================
// ACTIVITY
// ============================================================================

/// Mean planar speed mapped to full activity
pub const ACTIVITY_SPEED_MAX: f32 = 2.2;

/// Activity reported at full speed
pub const ACTIVITY_SCALE: f32 = 5.0;

/// Fraction the smoothed activity closes toward the raw value per reference tick
pub const ACTIVITY_SMOOTHING: f32 = 0.055;

// ============================================================================
// SPAWN
// ============================================================================

/// Side length of the terrain agents are spawned on
pub const TERRAIN_SIZE: f32 = 200.0;
pub const SPAWN_RADIUS_MAX: f32 = 16.0;
pub const SPAWN_MAX_TRIES: usize = 240;

/// Errors raised by configuration validation
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("population size must be at least 1")]
    EmptyPopulation,
    #[error("{name} must be within [0, 1], got {value}")]
    RateOutOfRange { name: &'static str, value: f32 },
    #[error("{name} must be positive and finite, got {value}")]
    NonPositive { name: &'static str, value: f32 },
    #[error("trail grid resolution must be at least 1")]
    EmptyTrailGrid,
    #[error("locked pattern table has {actual} entries, population has {expected}")]
    PatternTableLength { expected: usize, actual: usize },
    #[error("locked pattern id {0} is outside 0..=4")]
    PatternIdOutOfRange(u8),
}

fn check_rate(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::RateOutOfRange { name, value })
    }
}

fn check_positive(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { name, value })
    }
}

/// Settings of the genetic algorithm
#[derive(Debug, Clone, PartialEq)]
pub struct GaConfig {
    pub population_size: usize,
    pub survival_rate: f32,
    pub mutation_rate: f32,
    pub crossover_rate: f32,
    /// Pattern id pinned to each slot when `lock_pattern_slots` is set
    pub slot_pattern_ids: Option<Vec<u8>>,
    pub lock_pattern_slots: bool,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_size: POPULATION_SIZE,
            survival_rate: SURVIVAL_RATE,
            mutation_rate: MUTATION_RATE,
            crossover_rate: CROSSOVER_RATE,
            slot_pattern_ids: None,
            lock_pattern_slots: false,
        }
    }
}

impl GaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        check_rate("survival rate", self.survival_rate)?;
        check_rate("mutation rate", self.mutation_rate)?;
        check_rate("crossover rate", self.crossover_rate)?;

        if let Some(ids) = &self.slot_pattern_ids {
            if self.lock_pattern_slots && ids.len() != self.population_size {
                return Err(ConfigError::PatternTableLength {
                    expected: self.population_size,
                    actual: ids.len(),
                });
            }
            if let Some(&bad) = ids.iter().find(|&&id| id > 4) {
                return Err(ConfigError::PatternIdOutOfRange(bad));
            }
        }
        Ok(())
    }

    /// Number of survivors kept each generation
    pub fn survivor_count(&self) -> usize {
        ((self.population_size as f32) * self.survival_rate).floor() as usize
    }
}

/// Settings of the simulation world and its timing
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Deterministic seed for agent spawning, wander phases and the GA
    pub seed: u64,
    pub ga: GaConfig,
    pub generation_period: f32,
    pub auto_run: bool,
    pub death_duration: f32,
    pub survivors_window: f32,
    pub newborn_duration: f32,
    pub terrain_size: f32,
    pub trail_bound_radius: f32,
    pub trail_grid_size: usize,
    pub trail_decay_rate: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            ga: GaConfig::default(),
            generation_period: GENERATION_PERIOD,
            auto_run: true,
            death_duration: DEATH_ANIM_DURATION,
            survivors_window: SURVIVORS_WINDOW,
            newborn_duration: NEWBORN_ANIM_DURATION,
            terrain_size: TERRAIN_SIZE,
            trail_bound_radius: TRAIL_BOUND_RADIUS,
            trail_grid_size: TRAIL_GRID_SIZE,
            trail_decay_rate: TRAIL_DECAY_RATE,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ga.validate()?;
        check_positive("generation period", self.generation_period)?;
        check_positive("death duration", self.death_duration)?;
        check_positive("newborn duration", self.newborn_duration)?;
        check_positive("terrain size", self.terrain_size)?;
        check_positive("trail bound radius", self.trail_bound_radius)?;
        if self.survivors_window < 0.0 || !self.survivors_window.is_finite() {
            return Err(ConfigError::NonPositive {
                name: "survivors window",
                value: self.survivors_window,
            });
        }
        if self.trail_grid_size == 0 {
            return Err(ConfigError::EmptyTrailGrid);
        }
        if !(self.trail_decay_rate > 0.0 && self.trail_decay_rate <= 1.0) {
            return Err(ConfigError::RateOutOfRange {
                name: "trail decay rate",
                value: self.trail_decay_rate,
            });
        }
        Ok(())
    }

    /// Radius of the disc agents are spawned in
    pub fn spawn_radius(&self) -> f32 {
        SPAWN_RADIUS_MAX.min(self.terrain_size * 0.25)
    }

    /// Delay between evaluation and genome replacement
    pub fn transition_delay(&self) -> f32 {
        self.death_duration + self.survivors_window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(SimConfig::default().validate(), Ok(()));
    }

    #[test]
    fn default_survivor_count_is_sixteen() {
        assert_eq!(GaConfig::default().survivor_count(), 16);
    }

    #[test]
    fn rejects_rates_outside_unit_interval() {
        let ga = GaConfig {
            mutation_rate: 1.5,
            ..GaConfig::default()
        };
        assert!(matches!(
            ga.validate(),
            Err(ConfigError::RateOutOfRange { name: "mutation rate", .. })
        ));
    }

    #[test]
    fn rejects_locked_table_with_wrong_length() {
        let ga = GaConfig {
            population_size: 4,
            slot_pattern_ids: Some(vec![0, 1]),
            lock_pattern_slots: true,
            ..GaConfig::default()
        };
        assert_eq!(
            ga.validate(),
            Err(ConfigError::PatternTableLength { expected: 4, actual: 2 })
        );
    }

    #[test]
    fn rejects_zero_trail_grid() {
        let config = SimConfig {
            trail_grid_size: 0,
            ..SimConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyTrailGrid));
    }
}
