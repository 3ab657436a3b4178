use crate::{
    foundation::core::{LoopSpec, Seconds},
    noise::perlin::Perlin,
};

/// Octave-stacking parameters shared by the fractal samplers.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FractalParams {
    pub octaves: u32,
    pub persistence: f64,
    pub lacunarity: f64,
}

impl Default for FractalParams {
    fn default() -> Self {
        Self {
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
        }
    }
}

/// How simulation time maps into noise space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TimeDomain {
    /// Time is the third noise axis directly.
    Linear,
    /// Time traces a circle through the last two axes of 4D noise, so
    /// `sample(t = 0)` and `sample(t = period)` hit the same 4D point and the
    /// loop closes exactly. 3D sampling cannot guarantee that.
    Looped(LoopSpec),
}

/// A seeded noise field with fractal, ridged and domain-warped samplers.
#[derive(Clone, Debug)]
pub struct NoiseField {
    perlin: Perlin,
    domain: TimeDomain,
}

impl NoiseField {
    pub fn new(seed: u64, domain: TimeDomain) -> Self {
        Self {
            perlin: Perlin::new(seed),
            domain,
        }
    }

    pub fn perlin(&self) -> &Perlin {
        &self.perlin
    }

    pub fn domain(&self) -> TimeDomain {
        self.domain
    }

    /// One raw noise sample at `(x, y)` and time `t`, routed through the
    /// configured time domain.
    pub fn sample(&self, x: f64, y: f64, t: Seconds) -> f64 {
        match self.domain {
            TimeDomain::Linear => self.perlin.noise3(x, y, t),
            TimeDomain::Looped(spec) => {
                let angle = std::f64::consts::TAU * t / spec.period;
                self.perlin
                    .noise4(x, y, angle.cos() * spec.radius, angle.sin() * spec.radius)
            }
        }
    }

    /// Fractal Brownian motion: octaves of [`Self::sample`] at decreasing
    /// amplitude and increasing frequency, normalized by total amplitude.
    pub fn fbm(&self, x: f64, y: f64, t: Seconds, p: &FractalParams) -> f64 {
        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = 1.0;
        let mut max_amplitude = 0.0;
        for _ in 0..p.octaves.max(1) {
            total += amplitude * self.sample(x * frequency, y * frequency, t);
            max_amplitude += amplitude;
            amplitude *= p.persistence;
            frequency *= p.lacunarity;
        }
        total / max_amplitude
    }

    /// Ridged sample: `1 - |noise|`, creases instead of rounded hills.
    pub fn ridged(&self, x: f64, y: f64, t: Seconds) -> f64 {
        1.0 - self.sample(x, y, t).abs()
    }

    /// Fractal composition of [`Self::ridged`].
    pub fn ridged_fbm(&self, x: f64, y: f64, t: Seconds, p: &FractalParams) -> f64 {
        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = 1.0;
        let mut max_amplitude = 0.0;
        for _ in 0..p.octaves.max(1) {
            total += amplitude * self.ridged(x * frequency, y * frequency, t);
            max_amplitude += amplitude;
            amplitude *= p.persistence;
            frequency *= p.lacunarity;
        }
        total / max_amplitude
    }

    /// Two-pass domain-warped fbm, returning a decorrelated `(dx, dy)` pair.
    ///
    /// The offsets (+100 per warp channel, +50/+50/+1000 for the second
    /// output channel) and the two-pass structure with a half-weight second
    /// warp are part of the visual contract; changing them changes the
    /// character of the flowing/melting motion.
    pub fn warped_fbm(
        &self,
        x: f64,
        y: f64,
        t: Seconds,
        p: &FractalParams,
        warp_strength: f64,
    ) -> (f64, f64) {
        let w1x = self.fbm(x + 100.0, y, t, p);
        let w1y = self.fbm(x, y + 100.0, t, p);
        let x1 = x + w1x * warp_strength * 0.01;
        let y1 = y + w1y * warp_strength * 0.01;

        let w2x = self.fbm(x1 + 100.0, y1, t, p);
        let w2y = self.fbm(x1, y1 + 100.0, t, p);
        let x2 = x1 + w2x * warp_strength * 0.005;
        let y2 = y1 + w2y * warp_strength * 0.005;

        let dx = self.fbm(x2, y2, t, p);
        let dy = self.fbm(x2 + 50.0, y2 + 50.0, t + 1000.0, p);
        (dx, dy)
    }
}
