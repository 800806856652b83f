use bevy::color::{Color, Hsla};
use rand::Rng;
use std::fmt;
use thiserror::Error;

/// Valid range of the brightness gene
pub const VALUE_RANGE: (f32, f32) = (0.0, 1.0);
/// Valid range of the body scale gene
pub const BODY_SCALE_RANGE: (f32, f32) = (1.0, 3.0);
/// Valid range of the base speed gene
pub const BASE_SPEED_RANGE: (f32, f32) = (0.7, 1.5);
/// Valid range of the show-off gene
pub const SHOW_OFF_RANGE: (f32, f32) = (0.0, 1.0);
/// Number of distinct skin patterns
pub const PATTERN_COUNT: u8 = 5;
/// Highest valid pattern id
pub const MAX_PATTERN_ID: u8 = PATTERN_COUNT - 1;

/// Pattern every genome of the first generation carries
pub const INITIAL_PATTERN_ID: u8 = 0;

/// Reaction-diffusion skin statistics for one pattern id
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternMeta {
    pub spot_count: u32,
    pub spot_size: f32,
    pub roughness: f32,
    pub kind: f32,
}

pub const PATTERN_META: [PatternMeta; PATTERN_COUNT as usize] = [
    PatternMeta { spot_count: 32, spot_size: 0.18, roughness: 0.18, kind: 0.65 },
    PatternMeta { spot_count: 24, spot_size: 0.20, roughness: 0.10, kind: 0.75 },
    PatternMeta { spot_count: 38, spot_size: 0.22, roughness: 0.22, kind: 0.55 },
    PatternMeta { spot_count: 27, spot_size: 0.25, roughness: 0.20, kind: 0.45 },
    PatternMeta { spot_count: 100, spot_size: 0.12, roughness: 0.12, kind: 0.40 },
];

/// Statistics for a pattern id, falling back to pattern 0 for unknown ids
pub fn pattern_meta(pattern_id: u8) -> &'static PatternMeta {
    PATTERN_META
        .get(pattern_id as usize)
        .unwrap_or(&PATTERN_META[0])
}

/// Wrap a hue in degrees into `[0, 360)`
pub fn wrap_hue(hue: f32) -> f32 {
    let wrapped = hue.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Shift a hue by `delta` degrees with wraparound
pub fn shift_hue(hue: f32, delta: f32) -> f32 {
    wrap_hue(hue + delta)
}

#[derive(Debug, Error, PartialEq)]
pub enum GenomeError {
    #[error("{gene} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        gene: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
    #[error("{0} is not a finite number")]
    NonFinite(&'static str),
    #[error("pattern id {0} is outside 0..=4")]
    PatternId(u8),
}

fn check_gene(gene: &'static str, value: f32, range: (f32, f32)) -> Result<f32, GenomeError> {
    if !value.is_finite() {
        return Err(GenomeError::NonFinite(gene));
    }
    if value < range.0 || value > range.1 {
        return Err(GenomeError::OutOfRange {
            gene,
            value,
            min: range.0,
            max: range.1,
        });
    }
    Ok(value)
}

fn clamp_gene(value: f32, range: (f32, f32)) -> f32 {
    if value.is_finite() {
        value.clamp(range.0, range.1)
    } else {
        0.5 * (range.0 + range.1)
    }
}

/// Heritable traits of one ThermoBug.
///
/// Genomes are immutable values: every field is checked on construction and
/// the GA replaces a slot's genome wholesale instead of editing it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Genome {
    hue: f32,
    value: f32,
    pattern_id: u8,
    body_scale: f32,
    base_speed: f32,
    show_off: f32,
}

impl Genome {
    /// Build a genome, rejecting any field outside its range
    pub fn new(
        hue: f32,
        value: f32,
        pattern_id: u8,
        body_scale: f32,
        base_speed: f32,
        show_off: f32,
    ) -> Result<Self, GenomeError> {
        if !hue.is_finite() {
            return Err(GenomeError::NonFinite("hue"));
        }
        if !(0.0..360.0).contains(&hue) {
            return Err(GenomeError::OutOfRange {
                gene: "hue",
                value: hue,
                min: 0.0,
                max: 360.0,
            });
        }
        if pattern_id > MAX_PATTERN_ID {
            return Err(GenomeError::PatternId(pattern_id));
        }
        Ok(Self {
            hue,
            value: check_gene("value", value, VALUE_RANGE)?,
            pattern_id,
            body_scale: check_gene("body scale", body_scale, BODY_SCALE_RANGE)?,
            base_speed: check_gene("base speed", base_speed, BASE_SPEED_RANGE)?,
            show_off: check_gene("show-off", show_off, SHOW_OFF_RANGE)?,
        })
    }

    /// Build a genome by wrapping the hue and clamping every other field
    pub fn clamped(
        hue: f32,
        value: f32,
        pattern_id: i32,
        body_scale: f32,
        base_speed: f32,
        show_off: f32,
    ) -> Self {
        Self {
            hue: if hue.is_finite() { wrap_hue(hue) } else { 0.0 },
            value: clamp_gene(value, VALUE_RANGE),
            pattern_id: pattern_id.clamp(0, MAX_PATTERN_ID as i32) as u8,
            body_scale: clamp_gene(body_scale, BODY_SCALE_RANGE),
            base_speed: clamp_gene(base_speed, BASE_SPEED_RANGE),
            show_off: clamp_gene(show_off, SHOW_OFF_RANGE),
        }
    }

    /// Uniformly random traits carrying the given pattern
    pub fn random<R: Rng + ?Sized>(rng: &mut R, pattern_id: u8) -> Self {
        Self {
            hue: rng.gen_range(0.0..360.0),
            value: rng.gen_range(VALUE_RANGE.0..=VALUE_RANGE.1),
            pattern_id: pattern_id.min(MAX_PATTERN_ID),
            body_scale: rng.gen_range(BODY_SCALE_RANGE.0..=BODY_SCALE_RANGE.1),
            base_speed: rng.gen_range(BASE_SPEED_RANGE.0..=BASE_SPEED_RANGE.1),
            show_off: rng.gen_range(SHOW_OFF_RANGE.0..=SHOW_OFF_RANGE.1),
        }
    }

    pub fn hue(&self) -> f32 {
        self.hue
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn pattern_id(&self) -> u8 {
        self.pattern_id
    }

    pub fn body_scale(&self) -> f32 {
        self.body_scale
    }

    pub fn base_speed(&self) -> f32 {
        self.base_speed
    }

    pub fn show_off(&self) -> f32 {
        self.show_off
    }

    /// Copy of this genome carrying another pattern id
    pub fn with_pattern(self, pattern_id: u8) -> Self {
        Self {
            pattern_id: pattern_id.min(MAX_PATTERN_ID),
            ..self
        }
    }
}

impl Default for Genome {
    fn default() -> Self {
        Self {
            hue: 220.0,
            value: 0.8,
            pattern_id: INITIAL_PATTERN_ID,
            body_scale: 1.0,
            base_speed: 1.0,
            show_off: 0.5,
        }
    }
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hue {:.0}° value {:.2} pattern P{} scale {:.2} speed {:.2} show-off {:.2}",
            self.hue, self.value, self.pattern_id, self.body_scale, self.base_speed, self.show_off
        )
    }
}

/// Traits an agent actually expresses, derived from its genome
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Phenotype {
    pub body_color: Color,
    pub trail_color: Color,
    pub base_scale: f32,
    pub speed_factor: f32,
    pub show_off: f32,
    pub pattern_id: u8,
    pub pattern: PatternMeta,
}

impl From<&Genome> for Phenotype {
    fn from(genome: &Genome) -> Self {
        let show_off = genome.show_off();
        let saturation = (0.3 + show_off * 0.6).clamp(0.0, 1.0);
        let body_color = Color::hsv(genome.hue(), saturation, genome.value());

        // Trail is a brighter, more saturated tint of the body color
        let body_hsl = Hsla::from(body_color);
        let trail_color = Color::hsl(
            body_hsl.hue,
            (body_hsl.saturation + 0.2).clamp(0.0, 1.0),
            (0.55 + 0.25 * show_off).clamp(0.0, 1.0),
        );

        Self {
            body_color,
            trail_color,
            base_scale: genome.body_scale(),
            speed_factor: genome.base_speed(),
            show_off,
            pattern_id: genome.pattern_id(),
            pattern: *pattern_meta(genome.pattern_id()),
        }
    }
}
