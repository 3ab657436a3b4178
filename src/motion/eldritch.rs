use crate::{
    foundation::core::{Point, Seconds, Vec2},
    foundation::math::lerp,
    noise::fractal::{FractalParams, NoiseField, TimeDomain},
};

/// Knobs for the tentacle-writhe recipe.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EldritchParams {
    /// Movable origin the motion radiates from.
    pub origin_x: f64,
    pub origin_y: f64,
    pub writhe_speed: f64,
    pub intensity: f64,
    /// 0 = smooth sine writhe, 1 = ridged/cubed writhe.
    pub tension: f64,
    /// Corkscrew coiling amount.
    pub coil: f64,
    /// How tightly coil turns wind along the radius.
    pub coil_tightness: f64,
    /// Medium-frequency fbm layer.
    pub tremor: f64,
    /// Very-high-frequency raw-noise layer; its frequency is fixed so it
    /// stays decoupled from `writhe_speed`.
    pub shiver: f64,
    /// Slow radial swell.
    pub pulse: f64,
}

impl Default for EldritchParams {
    fn default() -> Self {
        Self {
            origin_x: 0.0,
            origin_y: 0.0,
            writhe_speed: 1.0,
            intensity: 6.0,
            tension: 0.4,
            coil: 2.0,
            coil_tightness: 0.05,
            tremor: 1.5,
            shiver: 0.6,
            pulse: 2.0,
        }
    }
}

/// Radial writhe around a movable origin: tension-blended sine, coil,
/// tremor, shiver and pulse layers, desynchronized per point by a
/// low-frequency time warp.
#[derive(Clone, Debug)]
pub struct Eldritch {
    field: NoiseField,
    fractal: FractalParams,
    params: EldritchParams,
}

impl Eldritch {
    pub fn new(seed: u64, domain: TimeDomain, params: EldritchParams) -> Self {
        Self {
            field: NoiseField::new(seed, domain),
            fractal: FractalParams::default(),
            params,
        }
    }

    pub fn params(&self) -> &EldritchParams {
        &self.params
    }

    pub fn displace(&self, p: Point, t: Seconds) -> Vec2 {
        let pr = &self.params;
        let rel = p - Point::new(pr.origin_x, pr.origin_y);
        let dist = rel.hypot();
        let (radial, perp) = if dist > 1e-9 {
            let r = rel / dist;
            (r, Vec2::new(-r.y, r.x))
        } else {
            (Vec2::ZERO, Vec2::ZERO)
        };
        let angle = rel.y.atan2(rel.x);

        // Per-point phase jitter so regions do not move in lockstep.
        let jitter = self.field.sample(p.x * 0.01, p.y * 0.01, t * 0.1) * 2.0;
        let wt = t * pr.writhe_speed + jitter;

        // Primary writhe: smooth sine blended against a cubed sine.
        let phase = wt + dist * 0.05 + angle * 2.0;
        let s = phase.sin();
        let writhe = lerp(s, s * s * s, pr.tension.clamp(0.0, 1.0)) * pr.intensity;

        // Coiling: noise-driven radius, angle wound along the polar angle.
        let coil_r = (self.field.sample(p.x * 0.02, p.y * 0.02, wt * 0.5) * 0.5 + 0.5) * pr.coil;
        let coil_a = wt * 1.7 + angle + dist * pr.coil_tightness;
        let coil = Vec2::new(coil_a.cos(), coil_a.sin()) * coil_r;

        // Tremor: medium-frequency fractal wobble.
        let trx = self.field.fbm(p.x * 0.05, p.y * 0.05, t * 1.3, &self.fractal);
        let try_ = self.field.fbm(p.x * 0.05 + 41.0, p.y * 0.05 + 41.0, t * 1.3, &self.fractal);
        let tremor = Vec2::new(trx, try_) * pr.tremor;

        // Shiver: raw noise at a fixed high frequency.
        let shx = self.field.sample(p.x * 0.4, p.y * 0.4, t * 8.0);
        let shy = self.field.sample(p.x * 0.4 + 17.0, p.y * 0.4 + 17.0, t * 8.0);
        let shiver = Vec2::new(shx, shy) * pr.shiver;

        // Slow radial pulse.
        let pulse = radial * (t * 0.8).sin() * pr.pulse;

        perp * writhe + coil + tremor + shiver + pulse
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displacement_is_deterministic() {
        let m = Eldritch::new(9, TimeDomain::Linear, EldritchParams::default());
        let p = Point::new(40.0, -12.0);
        assert_eq!(m.displace(p, 1.25), m.displace(p, 1.25));
    }

    #[test]
    fn origin_point_has_no_radial_component() {
        let params = EldritchParams {
            intensity: 0.0,
            coil: 0.0,
            tremor: 0.0,
            shiver: 0.0,
            pulse: 3.0,
            ..EldritchParams::default()
        };
        let m = Eldritch::new(9, TimeDomain::Linear, params);
        // At the origin the radial direction is undefined; pulse contributes
        // nothing rather than NaN.
        let d = m.displace(Point::new(0.0, 0.0), 0.5);
        assert!(d.x.is_finite() && d.y.is_finite());
        assert_eq!(d, Vec2::ZERO);
    }

    #[test]
    fn tension_changes_the_writhe_shape() {
        let smooth = Eldritch::new(
            4,
            TimeDomain::Linear,
            EldritchParams {
                tension: 0.0,
                coil: 0.0,
                tremor: 0.0,
                shiver: 0.0,
                pulse: 0.0,
                ..EldritchParams::default()
            },
        );
        let tense = Eldritch::new(
            4,
            TimeDomain::Linear,
            EldritchParams {
                tension: 1.0,
                ..*smooth.params()
            },
        );
        let p = Point::new(25.0, 10.0);
        assert_ne!(smooth.displace(p, 0.4), tense.displace(p, 0.4));
    }
}
