use crate::{
    foundation::core::{Point, Seconds, Vec2},
    noise::fractal::{FractalParams, NoiseField, TimeDomain},
};

/// Knobs for the flowing/melting recipe.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PsychedelicParams {
    /// Spatial frequency applied to path coordinates before sampling.
    pub noise_scale: f64,
    pub fractal: FractalParams,
    /// Strength of the two-pass coordinate distortion.
    pub warp_strength: f64,
    /// Amplitude of the warped-fbm flow term.
    pub warp_amount: f64,
    /// Amplitude of the slow large-scale swell term.
    pub breathing: f64,
    /// Amplitude of the high-frequency shimmer term.
    pub shimmer: f64,
    /// Time multiplier for the whole recipe.
    pub speed: f64,
}

impl Default for PsychedelicParams {
    fn default() -> Self {
        Self {
            noise_scale: 0.01,
            fractal: FractalParams::default(),
            warp_strength: 4.0,
            warp_amount: 8.0,
            breathing: 5.0,
            shimmer: 1.0,
            speed: 1.0,
        }
    }
}

/// Weighted sum of a breathing swell, a domain-warped flow and a shimmer
/// layer. The domain warp is what makes the outline melt rather than jitter.
#[derive(Clone, Debug)]
pub struct Psychedelic {
    field: NoiseField,
    params: PsychedelicParams,
}

impl Psychedelic {
    pub fn new(seed: u64, domain: TimeDomain, params: PsychedelicParams) -> Self {
        Self {
            field: NoiseField::new(seed, domain),
            params,
        }
    }

    pub fn params(&self) -> &PsychedelicParams {
        &self.params
    }

    pub fn displace(&self, p: Point, t: Seconds) -> Vec2 {
        let pr = &self.params;
        let t = t * pr.speed;
        let sx = p.x * pr.noise_scale;
        let sy = p.y * pr.noise_scale;

        // Slow large-scale breathing.
        let bx = self.field.fbm(sx * 0.3, sy * 0.3, t * 0.25, &pr.fractal);
        let by = self.field.fbm(sx * 0.3 + 77.7, sy * 0.3 + 77.7, t * 0.25, &pr.fractal);

        // Domain-warped flow.
        let (wx, wy) = self.field.warped_fbm(sx, sy, t * 0.5, &pr.fractal, pr.warp_strength);

        // High-frequency, low-amplitude shimmer from raw noise.
        let shx = self.field.sample(sx * 8.0, sy * 8.0, t * 2.0);
        let shy = self.field.sample(sx * 8.0 + 31.3, sy * 8.0 + 31.3, t * 2.0);

        Vec2::new(
            bx * pr.breathing + wx * pr.warp_amount + shx * pr.shimmer,
            by * pr.breathing + wy * pr.warp_amount + shy * pr.shimmer,
        )
    }
}
