use crate::config::{ConfigError, GaConfig, PATTERN_PRESSURE_GENERATIONS, TOURNAMENT_SIZE};
use crate::genome::{
    BASE_SPEED_RANGE, BODY_SCALE_RANGE, Genome, INITIAL_PATTERN_ID, MAX_PATTERN_ID,
    PATTERN_COUNT, SHOW_OFF_RANGE, VALUE_RANGE, pattern_meta, shift_hue, wrap_hue,
};
use bevy::log::debug;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

// ============================================================================
// ENVIRONMENT PREFERENCES
// ============================================================================

/// Cold hues favoured by the low-temperature world
pub const COLD_HUE: (f32, f32) = (200.0, 260.0);
/// Mid brightness band
pub const MID_VALUE: (f32, f32) = (0.3, 0.8);
/// Warm yellow/orange band that is penalised
pub const WARM_HUE: (f32, f32) = (20.0, 80.0);
/// Reds and pinks wrap around 0°: hue >= .0 or hue <= .1
pub const RED_HUE: (f32, f32) = (320.0, 10.0);

pub const COLD_BONUS: f32 = 0.6;
pub const VALUE_BONUS: f32 = 0.4;
pub const WARM_PENALTY: f32 = 0.35;

/// Pattern id the environment converges on
pub const SURVIVOR_PATTERN_ID: u8 = 2;
pub const GOOD_SPOT_COUNT: (u32, u32) = (15, 30);
pub const GOOD_SPOT_SIZE: (f32, f32) = (0.10, 0.25);

pub const GOOD_BODY_SCALE: (f32, f32) = (1.3, 1.9);
pub const GOOD_SPEED: (f32, f32) = (0.85, 1.15);
pub const GOOD_SHOW_OFF: (f32, f32) = (0.4, 0.9);

/// Largest hue shift a single mutation applies
pub const HUE_MUTATION_DEGREES: f32 = 40.0;

/// Palette preference: cold hue and mid brightness, warm hues penalised
pub fn palette_score(genome: &Genome) -> f32 {
    let hue = wrap_hue(genome.hue());
    let value = genome.value();
    let mut score = 0.0;

    if hue >= COLD_HUE.0 && hue <= COLD_HUE.1 {
        score += COLD_BONUS;
    }
    if value >= MID_VALUE.0 && value <= MID_VALUE.1 {
        score += VALUE_BONUS;
    }

    let warm = (hue >= WARM_HUE.0 && hue <= WARM_HUE.1) || hue >= RED_HUE.0 || hue <= RED_HUE.1;
    if warm {
        score -= WARM_PENALTY;
    }

    score.clamp(0.0, 1.0)
}

/// Pattern preference, blending from spot statistics to the survivor pattern
/// as generations pass
pub fn pattern_score(genome: &Genome, generation: u32) -> f32 {
    let meta = pattern_meta(genome.pattern_id());

    let mut base = 0.0;
    if meta.spot_count >= GOOD_SPOT_COUNT.0 && meta.spot_count <= GOOD_SPOT_COUNT.1 {
        base += 0.5;
    }
    if meta.spot_size >= GOOD_SPOT_SIZE.0 && meta.spot_size <= GOOD_SPOT_SIZE.1 {
        base += 0.5;
    }

    let target = if genome.pattern_id() == SURVIVOR_PATTERN_ID { 1.0 } else { 0.0 };
    let phase = (generation as f32 / PATTERN_PRESSURE_GENERATIONS).clamp(0.0, 1.0);

    ((1.0 - phase) * base + phase * target).clamp(0.0, 1.0)
}

pub fn size_score(genome: &Genome) -> f32 {
    let scale = genome.body_scale();
    if scale >= GOOD_BODY_SCALE.0 && scale <= GOOD_BODY_SCALE.1 {
        1.0
    } else {
        0.0
    }
}

/// Tent function: 1 at the band midpoint, 0 at two half-widths away
fn tent(value: f32, band: (f32, f32)) -> f32 {
    let mid = 0.5 * (band.0 + band.1);
    let half = 0.5 * (band.1 - band.0);
    if half <= 0.0 {
        return 0.0;
    }
    let d = ((value - mid).abs() / half).min(2.0);
    (1.0 - 0.5 * d).max(0.0)
}

pub fn movement_score(genome: &Genome) -> f32 {
    let speed = tent(genome.base_speed(), GOOD_SPEED);
    let show = tent(genome.show_off(), GOOD_SHOW_OFF);
    (0.5 * (speed + show)).clamp(0.0, 1.0)
}

/// Weighted fitness in `[0, 1]`; palette and pattern weigh 1.5, size and movement 1.0
pub fn fitness_of(genome: &Genome, generation: u32) -> f32 {
    let sum = 1.5 * palette_score(genome)
        + 1.5 * pattern_score(genome, generation)
        + 1.0 * size_score(genome)
        + 1.0 * movement_score(genome);
    (sum / 5.0).clamp(0.0, 1.0)
}

/// Outcome of ranking the population
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Slots kept this generation, best first
    pub survivors: Vec<usize>,
    /// Slots to be replaced, best first
    pub doomed: Vec<usize>,
}

/// Aggregate view of the population for display
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PopulationSummary {
    pub pattern_counts: [usize; PATTERN_COUNT as usize],
    pub mean_body_scale: f32,
    pub mean_base_speed: f32,
}

impl PopulationSummary {
    pub fn of(population: &[Genome]) -> Self {
        let mut summary = Self::default();
        if population.is_empty() {
            return summary;
        }
        for genome in population {
            summary.pattern_counts[genome.pattern_id() as usize] += 1;
            summary.mean_body_scale += genome.body_scale();
            summary.mean_base_speed += genome.base_speed();
        }
        let n = population.len() as f32;
        summary.mean_body_scale /= n;
        summary.mean_base_speed /= n;
        summary
    }
}

/// Move `value` by up to `strength` of its range and clamp
fn mutate_float<R: Rng + ?Sized>(rng: &mut R, value: f32, range: (f32, f32), strength: f32) -> f32 {
    let span = range.1 - range.0;
    let delta = rng.gen_range(-1.0..=1.0) * span * strength;
    (value + delta).clamp(range.0, range.1)
}

/// Generational GA over a fixed number of genome slots
pub struct GeneticAlgorithm {
    config: GaConfig,
    population: Vec<Genome>,
    fitness: Vec<f32>,
    generation: u32,
    /// Ranking from the last evaluation; empty once invalidated
    sorted_indices: Vec<usize>,
    rng: ChaCha8Rng,
}

impl GeneticAlgorithm {
    /// Create a GA with a random first generation sharing one pattern
    pub fn new(config: GaConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut ga = Self {
            population: Vec::new(),
            fitness: Vec::new(),
            generation: 0,
            sorted_indices: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            config,
        };
        ga.init_population();
        Ok(ga)
    }

    /// Create a GA around an existing population; its length becomes the
    /// population size
    pub fn with_population(
        config: GaConfig,
        population: Vec<Genome>,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        let config = GaConfig {
            population_size: population.len(),
            ..config
        };
        config.validate()?;
        Ok(Self {
            fitness: vec![0.0; population.len()],
            population,
            generation: 0,
            sorted_indices: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            config,
        })
    }

    /// Reset to generation 0 with fresh random genomes
    pub fn init_population(&mut self) -> &[Genome] {
        let n = self.config.population_size;
        let mut population = Vec::with_capacity(n);
        for slot in 0..n {
            let pattern = self.locked_pattern(slot).unwrap_or(INITIAL_PATTERN_ID);
            population.push(Genome::random(&mut self.rng, pattern));
        }
        self.population = population;
        self.fitness = vec![0.0; n];
        self.generation = 0;
        self.sorted_indices.clear();
        &self.population
    }

    pub fn config(&self) -> &GaConfig {
        &self.config
    }

    pub fn population(&self) -> &[Genome] {
        &self.population
    }

    pub fn fitness(&self) -> &[f32] {
        &self.fitness
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Ranking produced by the last evaluation, best first
    pub fn sorted_indices(&self) -> &[usize] {
        &self.sorted_indices
    }

    pub fn summary(&self) -> PopulationSummary {
        PopulationSummary::of(&self.population)
    }

    fn locked_pattern(&self, slot: usize) -> Option<u8> {
        if !self.config.lock_pattern_slots {
            return None;
        }
        self.config
            .slot_pattern_ids
            .as_ref()
            .and_then(|ids| ids.get(slot).copied())
    }

    /// Score every genome and split the slots into survivors and doomed
    pub fn evaluate(&mut self) -> Evaluation {
        let generation = self.generation;
        self.fitness = self
            .population
            .iter()
            .map(|g| fitness_of(g, generation))
            .collect();

        let fitness = &self.fitness;
        let mut indices: Vec<usize> = (0..self.population.len()).collect();
        // Stable sort keeps lower slots first among equal fitness
        indices.sort_by(|&a, &b| fitness[b].total_cmp(&fitness[a]));

        let survivor_count = self.config.survivor_count().min(indices.len());
        let doomed = indices[survivor_count..].to_vec();
        let survivors = indices[..survivor_count].to_vec();
        self.sorted_indices = indices;

        Evaluation { survivors, doomed }
    }

    /// Tournament selection: best of `TOURNAMENT_SIZE` uniform draws
    pub fn select(&mut self) -> usize {
        let n = self.population.len();
        if n == 0 {
            return 0;
        }
        let mut best: Option<usize> = None;
        for _ in 0..TOURNAMENT_SIZE {
            let candidate = self.rng.gen_range(0..n);
            let better = match best {
                None => true,
                Some(b) => self.fitness.get(candidate) > self.fitness.get(b),
            };
            if better {
                best = Some(candidate);
            }
        }
        best.unwrap_or(0)
    }

    /// Uniform crossover gated by the crossover rate; otherwise a clone of
    /// one parent
    pub fn crossover(&mut self, first: &Genome, second: &Genome, slot: usize) -> Genome {
        let child = if self.rng.gen_bool(self.config.crossover_rate as f64) {
            let rng = &mut self.rng;
            let mut pick = |a: f32, b: f32| if rng.gen_bool(0.5) { a } else { b };
            let hue = pick(first.hue(), second.hue());
            let value = pick(first.value(), second.value());
            let body_scale = pick(first.body_scale(), second.body_scale());
            let base_speed = pick(first.base_speed(), second.base_speed());
            let show_off = pick(first.show_off(), second.show_off());
            let pattern = pick(first.pattern_id() as f32, second.pattern_id() as f32);
            Genome::clamped(
                hue,
                value,
                pattern.round() as i32,
                body_scale,
                base_speed,
                show_off,
            )
        } else if self.rng.gen_bool(0.5) {
            *first
        } else {
            *second
        };

        match self.locked_pattern(slot) {
            Some(pinned) => child.with_pattern(pinned),
            None => child,
        }
    }

    /// Independently mutate each gene with probability `mutation_rate`
    pub fn mutate(&mut self, genome: &Genome, slot: usize) -> Genome {
        let rate = self.config.mutation_rate as f64;
        let locked = self.locked_pattern(slot);
        if rate <= 0.0 {
            return match locked {
                Some(pinned) => genome.with_pattern(pinned),
                None => *genome,
            };
        }

        let rng = &mut self.rng;
        let mut hue = genome.hue();
        let mut value = genome.value();
        let mut body_scale = genome.body_scale();
        let mut base_speed = genome.base_speed();
        let mut show_off = genome.show_off();
        let mut pattern = genome.pattern_id() as i32;

        if rng.gen_bool(rate) {
            hue = shift_hue(hue, rng.gen_range(-HUE_MUTATION_DEGREES..=HUE_MUTATION_DEGREES));
        }
        if rng.gen_bool(rate) {
            value = mutate_float(rng, value, VALUE_RANGE, 0.2);
        }
        if rng.gen_bool(rate) {
            body_scale = mutate_float(rng, body_scale, BODY_SCALE_RANGE, 0.2);
        }
        if rng.gen_bool(rate) {
            base_speed = mutate_float(rng, base_speed, BASE_SPEED_RANGE, 0.2);
        }
        if rng.gen_bool(rate) {
            show_off = mutate_float(rng, show_off, SHOW_OFF_RANGE, 0.3);
        }
        match locked {
            Some(pinned) => pattern = pinned as i32,
            None => {
                if rng.gen_bool(rate) {
                    let step = if rng.gen_bool(0.5) { -1 } else { 1 };
                    pattern = (pattern + step).clamp(0, MAX_PATTERN_ID as i32);
                }
            }
        }

        Genome::clamped(hue, value, pattern, body_scale, base_speed, show_off)
    }

    /// Replace every doomed slot with a bred child; survivors pass through
    /// untouched
    pub fn next_generation(&mut self, doomed: &[usize]) -> &[Genome] {
        let n = self.population.len();
        if self.sorted_indices.len() != n {
            self.evaluate();
        }

        let mut next = self.population.clone();
        for &slot in doomed {
            if slot >= n {
                debug!("ignoring out-of-range doomed slot {slot}");
                continue;
            }
            let (a, b) = (self.select(), self.select());
            let (first, second) = (self.population[a], self.population[b]);
            let child = self.crossover(&first, &second, slot);
            next[slot] = self.mutate(&child, slot);
        }

        self.population = next;
        self.generation += 1;
        self.sorted_indices.clear();
        &self.population
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genome(hue: f32, value: f32, pattern: u8, scale: f32, speed: f32, show: f32) -> Genome {
        Genome::new(hue, value, pattern, scale, speed, show).unwrap()
    }

    fn ideal() -> Genome {
        genome(230.0, 0.5, 1, 1.6, 1.0, 0.65)
    }

    fn poor() -> Genome {
        genome(40.0, 0.95, 4, 2.8, 1.45, 0.05)
    }

    #[test]
    fn default_population_splits_sixteen_to_twenty_four() {
        let mut ga = GeneticAlgorithm::new(GaConfig::default(), 1).unwrap();
        let eval = ga.evaluate();
        assert_eq!(eval.survivors.len(), 16);
        assert_eq!(eval.doomed.len(), 24);
    }

    #[test]
    fn evaluation_ranks_by_fitness() {
        let mut ga = GeneticAlgorithm::new(GaConfig::default(), 2).unwrap();
        ga.evaluate();
        let fitness = ga.fitness().to_vec();
        for pair in ga.sorted_indices().windows(2) {
            assert!(fitness[pair[0]] >= fitness[pair[1]]);
        }
    }

    #[test]
    fn palette_rewards_cold_mid_tones() {
        assert!((palette_score(&genome(230.0, 0.5, 0, 1.5, 1.0, 0.5)) - 1.0).abs() < 1e-6);
        assert_eq!(palette_score(&genome(40.0, 0.95, 0, 1.5, 1.0, 0.5)), 0.0);
        // Red wraps around zero
        assert_eq!(palette_score(&genome(355.0, 0.95, 0, 1.5, 1.0, 0.5)), 0.0);
        assert!((palette_score(&genome(5.0, 0.5, 0, 1.5, 1.0, 0.5)) - 0.05).abs() < 1e-6);
    }

    #[test]
    fn pattern_pressure_ramps_toward_survivor_pattern() {
        let p1 = genome(230.0, 0.5, 1, 1.5, 1.0, 0.5);
        let p2 = genome(230.0, 0.5, SURVIVOR_PATTERN_ID, 1.5, 1.0, 0.5);
        assert_eq!(pattern_score(&p1, 0), 1.0);
        assert_eq!(pattern_score(&p2, 0), 0.5);
        assert!((pattern_score(&p1, 10) - 0.5).abs() < 1e-6);
        assert_eq!(pattern_score(&p1, 40), 0.0);
        assert_eq!(pattern_score(&p2, 40), 1.0);
    }

    #[test]
    fn movement_tents_peak_at_band_midpoints() {
        assert!((movement_score(&genome(0.0, 0.5, 0, 1.5, 1.0, 0.65)) - 1.0).abs() < 1e-6);
        assert_eq!(movement_score(&genome(0.0, 0.5, 0, 1.5, 1.45, 0.05)), 0.0);
    }

    #[test]
    fn fitness_stays_in_unit_interval() {
        let mut ga = GeneticAlgorithm::new(GaConfig::default(), 3).unwrap();
        ga.evaluate();
        assert!(ga.fitness().iter().all(|f| (0.0..=1.0).contains(f)));
        assert!((fitness_of(&ideal(), 0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn zero_mutation_rate_is_identity() {
        let config = GaConfig {
            mutation_rate: 0.0,
            ..GaConfig::default()
        };
        let mut ga = GeneticAlgorithm::new(config, 4).unwrap();
        let population = ga.population().to_vec();
        for (slot, g) in population.iter().enumerate() {
            assert_eq!(ga.mutate(g, slot), *g);
        }
    }

    #[test]
    fn full_mutation_keeps_genes_in_range() {
        let config = GaConfig {
            mutation_rate: 1.0,
            ..GaConfig::default()
        };
        let mut ga = GeneticAlgorithm::new(config, 5).unwrap();
        let mut g = poor();
        for _ in 0..1_000 {
            g = ga.mutate(&g, 0);
            let rebuilt = Genome::new(
                g.hue(),
                g.value(),
                g.pattern_id(),
                g.body_scale(),
                g.base_speed(),
                g.show_off(),
            );
            assert_eq!(rebuilt, Ok(g));
        }
    }

    #[test]
    fn crossover_only_draws_parental_values() {
        let config = GaConfig {
            crossover_rate: 1.0,
            ..GaConfig::default()
        };
        let mut ga = GeneticAlgorithm::new(config, 6).unwrap();
        let a = ideal();
        let b = poor();
        for _ in 0..200 {
            let child = ga.crossover(&a, &b, 0);
            assert!(child.hue() == a.hue() || child.hue() == b.hue());
            assert!(child.value() == a.value() || child.value() == b.value());
            assert!(child.pattern_id() == a.pattern_id() || child.pattern_id() == b.pattern_id());
            assert!(child.body_scale() == a.body_scale() || child.body_scale() == b.body_scale());
            assert!(child.base_speed() == a.base_speed() || child.base_speed() == b.base_speed());
            assert!(child.show_off() == a.show_off() || child.show_off() == b.show_off());
        }
    }

    #[test]
    fn locked_slots_pin_the_pattern() {
        let config = GaConfig {
            population_size: 2,
            mutation_rate: 1.0,
            slot_pattern_ids: Some(vec![3, 1]),
            lock_pattern_slots: true,
            ..GaConfig::default()
        };
        let mut ga = GeneticAlgorithm::new(config, 7).unwrap();
        assert_eq!(ga.population()[0].pattern_id(), 3);
        assert_eq!(ga.population()[1].pattern_id(), 1);
        let child = ga.crossover(&ideal(), &poor(), 0);
        assert_eq!(child.pattern_id(), 3);
        assert_eq!(ga.mutate(&child, 1).pattern_id(), 1);
    }

    #[test]
    fn tournament_favours_fitter_slots() {
        let population = vec![poor(), poor(), poor(), ideal()];
        let mut ga = GeneticAlgorithm::with_population(GaConfig::default(), population, 8).unwrap();
        ga.evaluate();
        let picks = (0..400).filter(|_| ga.select() == 3).count();
        // A single slot wins any tournament it is drawn into: 1 - (3/4)^3 ≈ 0.58
        assert!(picks > 160, "picked best slot only {picks} times");
    }

    #[test]
    fn next_generation_replaces_only_doomed_slots() {
        let population = vec![ideal(), ideal(), poor(), poor()];
        let config = GaConfig {
            survival_rate: 0.5,
            mutation_rate: 1.0,
            crossover_rate: 1.0,
            ..GaConfig::default()
        };
        let mut ga = GeneticAlgorithm::with_population(config, population.clone(), 9).unwrap();

        let eval = ga.evaluate();
        let mut survivors = eval.survivors.clone();
        survivors.sort();
        let mut doomed = eval.doomed.clone();
        doomed.sort();
        assert_eq!(survivors, vec![0, 1]);
        assert_eq!(doomed, vec![2, 3]);

        let next = ga.next_generation(&doomed).to_vec();
        assert_eq!(ga.generation(), 1);
        assert_eq!(next[0], population[0]);
        assert_eq!(next[1], population[1]);
        for slot in [2, 3] {
            let before = population[slot];
            let after = next[slot];
            assert_ne!(after.hue(), before.hue());
            assert_ne!(after.value(), before.value());
            assert_ne!(after.body_scale(), before.body_scale());
            assert_ne!(after.base_speed(), before.base_speed());
            assert_ne!(after.show_off(), before.show_off());
            assert!(after.pattern_id() <= MAX_PATTERN_ID);
        }
        assert!(ga.sorted_indices().is_empty());
    }

    #[test]
    fn out_of_range_doomed_slots_are_ignored() {
        let mut ga = GeneticAlgorithm::new(GaConfig::default(), 10).unwrap();
        let before = ga.population().to_vec();
        let after = ga.next_generation(&[999]).to_vec();
        assert_eq!(before, after);
        assert_eq!(ga.generation(), 1);
    }

    #[test]
    fn same_seed_same_population() {
        let a = GeneticAlgorithm::new(GaConfig::default(), 11).unwrap();
        let b = GeneticAlgorithm::new(GaConfig::default(), 11).unwrap();
        assert_eq!(a.population(), b.population());
    }

    #[test]
    fn summary_counts_patterns() {
        let summary = PopulationSummary::of(&[ideal(), ideal(), poor()]);
        assert_eq!(summary.pattern_counts, [0, 2, 0, 0, 1]);
        assert!((summary.mean_body_scale - (1.6 + 1.6 + 2.8) / 3.0).abs() < 1e-5);
    }
}
