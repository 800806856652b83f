//! ThermoBug: a flock of bugs chasing a movable heat source over rolling
//! ground, bred by a genetic algorithm that favors the showiest of them.

pub mod boid;
pub mod config;
pub mod field;
pub mod ga;
pub mod genome;
pub mod input;
pub mod life;
pub mod nutrient;
pub mod plugin;
pub mod render;
pub mod schedule;
pub mod simulation;
pub mod steering;
pub mod terrain;
pub mod trail;

pub use config::{ConfigError, GaConfig, SimConfig};
pub use ga::GeneticAlgorithm;
pub use genome::{Genome, GenomeError, Phenotype};
pub use life::LifeState;
pub use plugin::{SimulationPlugin, SimulationState};
pub use simulation::{SimError, SimSummary, Simulation};
pub use terrain::{FlatTerrain, RollingTerrain, TerrainSampler};
