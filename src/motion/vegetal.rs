use crate::{
    foundation::core::{Point, Seconds, Vec2},
    noise::fractal::{FractalParams, NoiseField, TimeDomain},
};

/// Knobs for the wind recipe.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VegetalParams {
    /// Travel speed of the gust field across the outline.
    pub wind_speed: f64,
    /// Overall push strength along the wind direction.
    pub strength: f64,
    /// Wind direction in radians.
    pub angle: f64,
    /// Spatial frequency of the gust field.
    pub gust_scale: f64,
    /// Exponent shaping rectified gust intensity (higher = gustier).
    pub gust_power: f64,
    /// Amplitude of the recovery bounce when a gust releases.
    pub spring_back: f64,
    /// Independent high-frequency leaf tremor.
    pub flutter: f64,
}

impl Default for VegetalParams {
    fn default() -> Self {
        Self {
            wind_speed: 1.5,
            strength: 10.0,
            angle: 0.0,
            gust_scale: 0.015,
            gust_power: 2.0,
            spring_back: 0.4,
            flutter: 1.0,
        }
    }
}

/// Directional external force, not internal writhing: a traveling gust field
/// that only pushes, a release bounce, and independent flutter.
#[derive(Clone, Debug)]
pub struct Vegetal {
    field: NoiseField,
    fractal: FractalParams,
    params: VegetalParams,
}

impl Vegetal {
    pub fn new(seed: u64, domain: TimeDomain, params: VegetalParams) -> Self {
        Self {
            field: NoiseField::new(seed, domain),
            fractal: FractalParams::default(),
            params,
        }
    }

    pub fn params(&self) -> &VegetalParams {
        &self.params
    }

    /// Raw gust sample at a point for a given time, before rectification.
    fn gust_raw(&self, p: Point, t: Seconds) -> f64 {
        let pr = &self.params;
        let dir = Vec2::new(pr.angle.cos(), pr.angle.sin());
        // Shift sampling coordinates upstream so the field travels with time.
        let gx = p.x * pr.gust_scale - dir.x * t * pr.wind_speed;
        let gy = p.y * pr.gust_scale - dir.y * t * pr.wind_speed;
        self.field.fbm(gx, gy, t * 0.2, &self.fractal)
    }

    pub fn displace(&self, p: Point, t: Seconds) -> Vec2 {
        let pr = &self.params;
        let dir = Vec2::new(pr.angle.cos(), pr.angle.sin());

        // Rectified gust: [-1,1] -> [0,1] then shaped, so wind pushes and
        // never pulls backward.
        let raw = self.gust_raw(p, t);
        let gust = ((raw * 0.5 + 0.5).max(0.0)).powf(pr.gust_power);

        // Secondary slower gust layer for variation.
        let raw2 = self.field.fbm(
            p.x * pr.gust_scale * 0.35 + 13.1,
            p.y * pr.gust_scale * 0.35,
            t * 0.07,
            &self.fractal,
        );
        let gust2 = ((raw2 * 0.5 + 0.5).max(0.0)).powf(2.0) * 0.5;

        // Spring-back: finite-difference gust derivative; only the release
        // side contributes, rectified so the bounce cannot overshoot
        // backward.
        let eps = 0.05;
        let ddt = (raw - self.gust_raw(p, t - eps)) / eps;
        let spring = (-ddt).max(0.0) * pr.spring_back;

        // Flutter: independent high-frequency tremor on both axes.
        let flx = self.field.sample(p.x * 0.3, p.y * 0.3, t * 6.0);
        let fly = self.field.sample(p.x * 0.3 + 23.0, p.y * 0.3 + 23.0, t * 6.0);
        let flutter = Vec2::new(flx, fly) * pr.flutter;

        dir * ((gust + gust2 + spring) * pr.strength) + flutter
    }
}
