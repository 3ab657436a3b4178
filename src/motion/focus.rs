use std::f64::consts::TAU;

use crate::{
    anchors::influence::InfluenceField,
    foundation::core::{LoopSpec, Point, Seconds, Vec2},
    foundation::math::{Rng64, smoothstep},
    noise::fractal::{FractalParams, NoiseField, TimeDomain},
    path::model::ParsedPath,
};

/// Motion sub-style of one scheduled burst.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FocusStyle {
    /// Decaying lateral sine.
    Whip,
    /// Sustained noise-perturbed oscillation.
    Quiver,
    /// Smoothstep-ramped pull along the radial direction.
    Strain,
    /// Chaotic noise plus a fast alternating-sign sinusoid.
    Thrash,
}

/// Relative weights for picking a sub-style. All-zero falls back to uniform.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FocusWeights {
    pub whip: f64,
    pub quiver: f64,
    pub strain: f64,
    pub thrash: f64,
}

impl Default for FocusWeights {
    fn default() -> Self {
        Self {
            whip: 1.0,
            quiver: 1.0,
            strain: 1.0,
            thrash: 1.0,
        }
    }
}

/// Knobs for the focus-burst director.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FocusParams {
    pub min_foci: usize,
    pub max_foci: usize,
    /// Burst total-duration range in seconds (split 20/50/30 into
    /// ramp/sustain/decay).
    pub burst_duration: (f64, f64),
    /// Rest-period duration range between waves, in seconds.
    pub rest_duration: (f64, f64),
    pub weights: FocusWeights,
    /// Wave propagation speed along the path, units of path length per second.
    pub wave_speed: f64,
    /// Exponential falloff rate per unit of path distance.
    pub falloff: f64,
    /// Base burst intensity before the per-focus jitter.
    pub intensity: f64,
    /// Amplitude of the always-on resting drift.
    pub resting_drift: f64,
    /// Minimum path distance between foci placed in the same wave.
    pub min_spacing: f64,
    /// Influence below this marks a neighborhood as pinned for placement.
    pub pin_threshold: f64,
}

impl Default for FocusParams {
    fn default() -> Self {
        Self {
            min_foci: 1,
            max_foci: 3,
            burst_duration: (1.5, 4.0),
            rest_duration: (1.0, 3.0),
            weights: FocusWeights::default(),
            wave_speed: 120.0,
            falloff: 0.02,
            intensity: 8.0,
            resting_drift: 0.8,
            min_spacing: 40.0,
            pin_threshold: 0.35,
        }
    }
}

impl FocusParams {
    /// Clamp degenerate values instead of propagating NaN/negative schedules.
    fn sanitized(mut self) -> Self {
        if self.min_foci > self.max_foci {
            tracing::debug!(
                min = self.min_foci,
                max = self.max_foci,
                "min_foci > max_foci, clamping"
            );
            self.max_foci = self.min_foci;
        }
        self.burst_duration.0 = self.burst_duration.0.max(MIN_DURATION);
        self.burst_duration.1 = self.burst_duration.1.max(self.burst_duration.0);
        self.rest_duration.0 = self.rest_duration.0.max(MIN_DURATION);
        self.rest_duration.1 = self.rest_duration.1.max(self.rest_duration.0);
        self.weights.whip = self.weights.whip.max(0.0);
        self.weights.quiver = self.weights.quiver.max(0.0);
        self.weights.strain = self.weights.strain.max(0.0);
        self.weights.thrash = self.weights.thrash.max(0.0);
        self.wave_speed = self.wave_speed.max(1e-3);
        self.falloff = self.falloff.max(0.0);
        self
    }
}

const MIN_DURATION: f64 = 0.1;
/// Horizon used when no loop period is configured.
const DEFAULT_HORIZON: Seconds = 60.0;
const PLACEMENT_ATTEMPTS: usize = 20;

/// One scheduled, time-bounded, localized motion burst.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Focus {
    /// Arc-length fraction along the path.
    pub path_parameter: f64,
    pub start_time: Seconds,
    pub ramp: Seconds,
    pub sustain: Seconds,
    pub decay: Seconds,
    pub style: FocusStyle,
    /// Lateral bias in `[-1, 1]`.
    pub direction: f64,
    pub frequency: f64,
    pub intensity: f64,
    pub wave_speed: f64,
    /// Resolved position on the path.
    pub anchor: Point,
}

impl Focus {
    pub fn total_duration(&self) -> Seconds {
        self.ramp + self.sustain + self.decay
    }

    /// Smoothstep ramp, flat sustain, inverse-smoothstep decay.
    fn envelope(&self, local: Seconds) -> f64 {
        if local < self.ramp {
            smoothstep(local / self.ramp.max(1e-9))
        } else if local < self.ramp + self.sustain {
            1.0
        } else {
            1.0 - smoothstep((local - self.ramp - self.sustain) / self.decay.max(1e-9))
        }
    }
}

/// A generated schedule: foci, rest windows, and a total duration that ends
/// exactly on a rest boundary.
#[derive(Clone, Debug, PartialEq)]
pub struct Schedule {
    pub foci: Vec<Focus>,
    /// Rest windows as `(start, end)` pairs, sorted by start.
    pub rests: Vec<(Seconds, Seconds)>,
    pub total_duration: Seconds,
}

impl Schedule {
    fn in_rest(&self, t: Seconds) -> bool {
        self.rests.iter().any(|&(s, e)| t >= s && t < e)
    }
}

/// Scheduling layer over the noise engine: generates a deterministic schedule
/// of localized bursts and converts (schedule, time) into displacement.
#[derive(Clone, Debug)]
pub struct FocusDirector {
    field: NoiseField,
    fractal: FractalParams,
    params: FocusParams,
    schedule: Schedule,
    /// Evaluation wrap point: the loop period when one is configured,
    /// otherwise the schedule's own duration.
    period: Seconds,
    /// Arc-length parameter per path point.
    point_params: Vec<f64>,
    closed: bool,
    total_length: f64,
}

impl FocusDirector {
    /// Build the director and generate its schedule.
    ///
    /// Generation is a pure function of (seed, loop period, params, path,
    /// influence); rebuilding with identical inputs yields an identical
    /// schedule. With a loop period, evaluation wraps at the period and the
    /// trimmed tail between the schedule's last rest boundary and the wrap
    /// stays at rest, so no burst is ever cut by the loop. Without one the
    /// schedule targets a fixed horizon and wraps at its own duration.
    #[tracing::instrument(skip(path, influence), fields(points = path.len()))]
    pub fn generate(
        seed: u64,
        params: FocusParams,
        path: &ParsedPath,
        influence: &InfluenceField,
        loop_period: Option<Seconds>,
    ) -> Self {
        let params = params.sanitized();
        let loop_period = loop_period.filter(|p| *p > 0.0 && p.is_finite());
        let horizon = loop_period.unwrap_or(DEFAULT_HORIZON).max(MIN_DURATION);
        let schedule = generate_schedule(seed, horizon, &params, path, influence);
        tracing::debug!(
            foci = schedule.foci.len(),
            rests = schedule.rests.len(),
            total = schedule.total_duration,
            "focus schedule generated"
        );
        // The drift and style layers sample the same looped domain the other
        // recipes use, so their noise closes at the loop boundary too.
        let (period, domain) = match loop_period {
            Some(p) => (p, TimeDomain::Looped(LoopSpec { period: p, radius: 1.0 })),
            None => (schedule.total_duration, TimeDomain::Linear),
        };
        Self {
            field: NoiseField::new(seed, domain),
            fractal: FractalParams::default(),
            params,
            schedule,
            period,
            point_params: (0..path.len()).map(|i| path.parameter_at(i)).collect(),
            closed: path.is_closed(),
            total_length: path.total_length(),
        }
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn params(&self) -> &FocusParams {
        &self.params
    }

    /// Path distance between two arc-length parameters; closed paths take
    /// the shorter wrap direction.
    fn path_distance(&self, a: f64, b: f64) -> f64 {
        let d = (a - b).abs() * self.total_length;
        if self.closed {
            d.min(self.total_length - d)
        } else {
            d
        }
    }

    fn resting_drift(&self, p: Point, t: Seconds) -> Vec2 {
        // The looped domain's 4D circle already bounds how far drift travels
        // per revolution; linear time gets slowed explicitly instead.
        let ts = match self.field.domain() {
            TimeDomain::Looped(_) => t,
            TimeDomain::Linear => t * 0.3,
        };
        let dx = self.field.fbm(p.x * 0.01, p.y * 0.01, ts, &self.fractal);
        let dy = self.field.fbm(p.x * 0.01 + 61.0, p.y * 0.01 + 61.0, ts, &self.fractal);
        Vec2::new(dx, dy) * self.params.resting_drift
    }

    pub fn displace(&self, idx: usize, p: Point, t: Seconds) -> Vec2 {
        if self.period <= 0.0 || idx >= self.point_params.len() {
            return Vec2::ZERO;
        }
        let t = t.rem_euclid(self.period);
        let drift = self.resting_drift(p, t);
        // Past the last rest boundary the loop tail is a rest: a burst that
        // started there would be cut mid-window by the wrap.
        if t >= self.schedule.total_duration || self.schedule.in_rest(t) {
            return drift;
        }

        let param = self.point_params[idx];
        let mut acc = drift;
        for f in &self.schedule.foci {
            let pd = self.path_distance(param, f.path_parameter);
            // Motion travels outward along the path instead of appearing
            // everywhere at once.
            let local = t - f.start_time - pd / f.wave_speed;
            if local < 0.0 || local > f.total_duration() {
                continue;
            }
            let falloff = (-pd * self.params.falloff).exp();
            let gain = f.envelope(local) * falloff * f.intensity;
            acc += self.style_displacement(f, p, local) * gain;
        }
        acc
    }

    fn style_displacement(&self, f: &Focus, p: Point, local: Seconds) -> Vec2 {
        let rel = p - f.anchor;
        let dist = rel.hypot();
        let (radial, perp) = if dist > 1e-9 {
            let r = rel / dist;
            (r, Vec2::new(-r.y, r.x))
        } else {
            (Vec2::ZERO, Vec2::ZERO)
        };
        let total = f.total_duration().max(1e-9);

        match f.style {
            FocusStyle::Whip => {
                let swing = (local * f.frequency * TAU).sin() * (-2.0 * local / total).exp();
                perp * (swing * f.direction)
            }
            FocusStyle::Quiver => {
                let wobble = self.field.sample(p.x * 0.1, p.y * 0.1, local * 2.0);
                let osc = (local * f.frequency * TAU * 3.0 + wobble * 2.0).sin();
                perp * (osc * 0.6)
            }
            FocusStyle::Strain => {
                let pull = smoothstep((local / f.ramp.max(1e-9)).min(1.0));
                radial * (pull * f.direction)
            }
            FocusStyle::Thrash => {
                let chaos = self.field.sample(p.x * 0.2, p.y * 0.2, local * 5.0);
                let alternating = (local * f.frequency * TAU * 4.0).sin();
                perp * (chaos * 1.2) + radial * (alternating * 0.8)
            }
        }
    }
}

fn generate_schedule(
    seed: u64,
    horizon: Seconds,
    params: &FocusParams,
    path: &ParsedPath,
    influence: &InfluenceField,
) -> Schedule {
    let mut rng = Rng64::new(seed);
    let mut foci: Vec<Focus> = Vec::new();
    let mut rests: Vec<(Seconds, Seconds)> = Vec::new();
    let mut t = 0.0;

    if path.is_empty() {
        return Schedule {
            foci,
            rests,
            total_duration: horizon,
        };
    }

    loop {
        let count = rng.next_usize_inclusive(params.min_foci, params.max_foci);
        let mut placed: Vec<f64> = Vec::with_capacity(count);
        let mut wave_end = t;

        for _ in 0..count {
            let param = place_focus(&mut rng, params, path, influence, &placed);
            placed.push(param);

            let style = pick_style(&mut rng, &params.weights);
            let total = rng.next_range(params.burst_duration.0, params.burst_duration.1);
            let start = t + rng.next_range(0.0, 0.25);
            let anchor = path.points()[path.index_at_parameter(param)];

            wave_end = wave_end.max(start + total);
            foci.push(Focus {
                path_parameter: param,
                start_time: start,
                ramp: total * 0.2,
                sustain: total * 0.5,
                decay: total * 0.3,
                style,
                direction: rng.next_range(-1.0, 1.0),
                frequency: rng.next_range(0.8, 2.5),
                intensity: params.intensity * rng.next_range(0.7, 1.3),
                wave_speed: params.wave_speed,
                anchor,
            });
        }

        let rest = rng.next_range(params.rest_duration.0, params.rest_duration.1);
        rests.push((wave_end, wave_end + rest));
        t = wave_end + rest;
        if t >= horizon {
            break;
        }
    }

    // Trim to the rest boundary closest to (not exceeding) the horizon, so
    // the loop never wraps mid-burst. A single wave longer than the horizon
    // keeps its own rest boundary instead.
    let boundary = rests
        .iter()
        .map(|&(_, end)| end)
        .filter(|&end| end <= horizon)
        .next_back()
        .unwrap_or(t);
    foci.retain(|f| f.start_time + f.total_duration() <= boundary);
    rests.retain(|&(_, end)| end <= boundary);

    Schedule {
        foci,
        rests,
        total_duration: boundary,
    }
}

/// Rejection placement: avoid pinned neighborhoods and crowding within a
/// wave; after the attempt budget, accept the last candidate.
fn place_focus(
    rng: &mut Rng64,
    params: &FocusParams,
    path: &ParsedPath,
    influence: &InfluenceField,
    placed: &[f64],
) -> f64 {
    let mut candidate = rng.next_f64_01();
    for _ in 0..PLACEMENT_ATTEMPTS {
        let pinned = neighborhood_pinned(candidate, path, influence, params.pin_threshold);
        let crowded = placed.iter().any(|&other| {
            let d = (candidate - other).abs() * path.total_length();
            let d = if path.is_closed() {
                d.min(path.total_length() - d)
            } else {
                d
            };
            d < params.min_spacing
        });
        if !pinned && !crowded {
            return candidate;
        }
        candidate = rng.next_f64_01();
    }
    candidate
}

fn neighborhood_pinned(
    param: f64,
    path: &ParsedPath,
    influence: &InfluenceField,
    threshold: f64,
) -> bool {
    if influence.is_empty() {
        return false;
    }
    let idx = path.index_at_parameter(param) as i64;
    let len = path.len() as i64;
    (-2..=2).any(|off| {
        let i = (idx + off).clamp(0, len - 1) as usize;
        influence.get(i) < threshold
    })
}

fn pick_style(rng: &mut Rng64, w: &FocusWeights) -> FocusStyle {
    const STYLES: [FocusStyle; 4] = [
        FocusStyle::Whip,
        FocusStyle::Quiver,
        FocusStyle::Strain,
        FocusStyle::Thrash,
    ];
    let weights = [w.whip, w.quiver, w.strain, w.thrash];
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return STYLES[rng.next_usize_inclusive(0, 3)];
    }
    let mut r = rng.next_range(0.0, total);
    for (style, weight) in STYLES.iter().zip(weights) {
        if r < weight {
            return *style;
        }
        r -= weight;
    }
    FocusStyle::Thrash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchors::record::AnchorShape;
    use crate::path::parse::parse;

    fn wavy_path() -> ParsedPath {
        parse(
            "M0,0 C50,40 100,-40 150,0 C200,40 250,-40 300,0 L300,100 L0,100 Z",
            (0.0, 0.0),
        )
        .unwrap()
    }

    fn director(seed: u64, params: FocusParams, period: Option<f64>) -> FocusDirector {
        let path = wavy_path();
        let influence = InfluenceField::free(path.len());
        FocusDirector::generate(seed, params, &path, &influence, period)
    }

    #[test]
    fn schedule_is_reproducible_for_a_seed() {
        let params = FocusParams {
            min_foci: 1,
            max_foci: 1,
            ..FocusParams::default()
        };
        let a = director(42, params, Some(10.0));
        let b = director(42, params, Some(10.0));
        assert_eq!(a.schedule(), b.schedule());
        assert!(!a.schedule().foci.is_empty());
    }

    #[test]
    fn different_seeds_give_different_schedules() {
        let a = director(1, FocusParams::default(), Some(20.0));
        let b = director(2, FocusParams::default(), Some(20.0));
        assert_ne!(a.schedule(), b.schedule());
    }

    #[test]
    fn total_duration_ends_on_a_rest_boundary() {
        let d = director(7, FocusParams::default(), Some(15.0));
        let sched = d.schedule();
        assert!(sched.total_duration <= 15.0 || sched.rests.is_empty());
        if let Some(&(_, last_end)) = sched.rests.last() {
            assert_eq!(last_end, sched.total_duration);
        }
    }

    #[test]
    fn no_focus_window_extends_past_total_duration() {
        let d = director(3, FocusParams::default(), Some(25.0));
        let sched = d.schedule();
        for f in &sched.foci {
            assert!(f.start_time + f.total_duration() <= sched.total_duration + 1e-9);
        }
    }

    #[test]
    fn foci_avoid_pinned_regions() {
        let path = wavy_path();
        // Pin the start of the path hard.
        let anchors = [AnchorShape::Point(path.points()[0])];
        let influence = InfluenceField::compute(path.points(), &anchors, 120.0).unwrap();
        let params = FocusParams {
            min_foci: 2,
            max_foci: 3,
            pin_threshold: 0.5,
            min_spacing: 10.0,
            ..FocusParams::default()
        };
        let d = FocusDirector::generate(5, params, &path, &influence, Some(30.0));
        for f in &d.schedule().foci {
            let idx = path.index_at_parameter(f.path_parameter);
            assert!(
                influence.get(idx) >= params.pin_threshold,
                "focus landed on pinned region at parameter {}",
                f.path_parameter
            );
        }
    }

    #[test]
    fn rest_windows_produce_only_drift() {
        let d = director(11, FocusParams::default(), Some(20.0));
        let sched = d.schedule();
        let (rest_start, rest_end) = sched.rests[0];
        let t = (rest_start + rest_end) / 2.0;
        let p = Point::new(150.0, 50.0);
        let got = d.displace(0, p, t);
        let drift = d.resting_drift(p, t);
        assert_eq!(got, drift);
    }

    #[test]
    fn loop_tail_past_the_schedule_is_rest_only() {
        let period = 10.0;
        let d = director(5, FocusParams::default(), Some(period));
        let b = d.schedule().total_duration;
        // This seed trims well short of the period, leaving a real tail.
        assert!(b < period);
        let p = Point::new(150.0, 50.0);
        // Sample the gap between the last rest boundary and the wrap point:
        // no burst may be active there in any point's frame.
        for i in 0..8 {
            let t = b + (period - b) * (i as f64 + 0.5) / 8.0;
            for idx in [0, 3, 7] {
                assert_eq!(
                    d.displace(idx, p, t),
                    d.resting_drift(p, t),
                    "burst active in the loop tail at t={t}"
                );
            }
        }
    }

    #[test]
    fn displacement_is_continuous_across_the_loop_wrap() {
        let period = 10.0;
        let d = director(5, FocusParams::default(), Some(period));
        let p = Point::new(150.0, 50.0);
        let eps = 1e-6;
        for idx in [0, 3, 7] {
            let before = d.displace(idx, p, period - eps);
            let after = d.displace(idx, p, 0.0);
            assert!(
                (before - after).hypot() < 1e-3,
                "displacement jumps by {} at the wrap",
                (before - after).hypot()
            );
        }
    }

    #[test]
    fn drift_is_continuous_across_the_loop_wrap() {
        let period = 12.0;
        let d = director(8, FocusParams::default(), Some(period));
        let p = Point::new(40.0, 80.0);
        let before = d.resting_drift(p, period - 1e-6);
        let after = d.resting_drift(p, 0.0);
        assert!(
            (before - after).hypot() < 1e-3,
            "drift jumps by {} at the wrap",
            (before - after).hypot()
        );
    }

    #[test]
    fn degenerate_params_are_clamped_not_propagated() {
        let params = FocusParams {
            min_foci: 5,
            max_foci: 2,
            burst_duration: (-1.0, -2.0),
            rest_duration: (0.0, 0.0),
            weights: FocusWeights {
                whip: -3.0,
                quiver: 0.0,
                strain: 0.0,
                thrash: 0.0,
            },
            ..FocusParams::default()
        };
        let d = director(13, params, Some(12.0));
        let sched = d.schedule();
        assert!(sched.total_duration > 0.0);
        for f in &sched.foci {
            assert!(f.total_duration() > 0.0);
            assert!(f.intensity.is_finite());
        }
    }

    #[test]
    fn displacement_is_deterministic_and_finite() {
        let d = director(99, FocusParams::default(), None);
        let p = Point::new(120.0, 30.0);
        let a = d.displace(4, p, 3.3);
        assert_eq!(a, d.displace(4, p, 3.3));
        assert!(a.x.is_finite() && a.y.is_finite());
    }
}
