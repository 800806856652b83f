use bevy::math::Vec3;

/// Ground point and surface normal under a query position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundHit {
    pub point: Vec3,
    pub normal: Vec3,
}

impl GroundHit {
    /// Level ground at height zero
    pub fn flat(x: f32, z: f32) -> Self {
        Self {
            point: Vec3::new(x, 0.0, z),
            normal: Vec3::Y,
        }
    }
}

/// Height and normal lookup the agents conform to every tick
pub trait TerrainSampler: Send + Sync {
    fn height_at(&self, x: f32, z: f32) -> GroundHit;
}

impl<F> TerrainSampler for F
where
    F: Fn(f32, f32) -> GroundHit + Send + Sync,
{
    fn height_at(&self, x: f32, z: f32) -> GroundHit {
        self(x, z)
    }
}

/// Level plane at a fixed height
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlatTerrain {
    pub height: f32,
}

impl TerrainSampler for FlatTerrain {
    fn height_at(&self, x: f32, z: f32) -> GroundHit {
        GroundHit {
            point: Vec3::new(x, self.height, z),
            normal: Vec3::Y,
        }
    }
}

/// Gentle hills built from a few summed sines
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollingTerrain {
    pub amplitude: f32,
    pub wavelength: f32,
}

impl Default for RollingTerrain {
    fn default() -> Self {
        Self {
            amplitude: 1.2,
            wavelength: 40.0,
        }
    }
}

impl RollingTerrain {
    /// Step used for the finite-difference normal
    const NORMAL_STEP: f32 = 0.25;

    pub fn height(&self, x: f32, z: f32) -> f32 {
        let k = std::f32::consts::TAU / self.wavelength.max(1e-3);
        let primary = (x * k).sin() * (z * k * 0.8).cos();
        let ripple = 0.5 * ((x + z) * k * 1.7).sin();
        let swell = 0.25 * (x * k * 0.3 - z * k * 0.45).cos();
        self.amplitude * (primary + ripple + swell)
    }
}

impl TerrainSampler for RollingTerrain {
    fn height_at(&self, x: f32, z: f32) -> GroundHit {
        let h = Self::NORMAL_STEP;
        let dx = (self.height(x + h, z) - self.height(x - h, z)) / (2.0 * h);
        let dz = (self.height(x, z + h) - self.height(x, z - h)) / (2.0 * h);
        GroundHit {
            point: Vec3::new(x, self.height(x, z), z),
            normal: Vec3::new(-dx, 1.0, -dz).normalize_or(Vec3::Y),
        }
    }
}
