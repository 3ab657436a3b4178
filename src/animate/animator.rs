use rayon::prelude::*;

use crate::{
    anchors::influence::InfluenceField,
    anchors::record::{AnchorRecord, resolve_anchors},
    foundation::core::{MAX_TICK_STEP, Point, Seconds, Vec2},
    foundation::error::{UndulaError, UndulaResult},
    motion::Motion,
    path::model::ParsedPath,
    solver::pbd::{PbdSolver, SolverParams},
};

/// Shared orchestrator knobs.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnimatorConfig {
    /// Global multiplier on every displacement.
    pub global_intensity: f64,
    /// Simulation-time multiplier on real elapsed time.
    pub speed: f64,
    /// Loop period in seconds; time wraps modulo this when set.
    pub loop_period: Option<Seconds>,
    /// Enable the continuity solver with these parameters.
    pub solver: Option<SolverParams>,
}

impl Default for AnimatorConfig {
    fn default() -> Self {
        Self {
            global_intensity: 1.0,
            speed: 1.0,
            loop_period: None,
            solver: None,
        }
    }
}

/// Owns the per-frame loop: advances the clock, asks the motion engine for
/// raw displacements, scales by influence and intensity, optionally runs the
/// continuity solver, and exposes the final point buffer.
///
/// The output buffer is reused across frames: treat a returned slice as valid
/// only until the next call, and copy out to retain it.
pub struct Animator {
    path: ParsedPath,
    influence: InfluenceField,
    motion: Motion,
    config: AnimatorConfig,
    solver: Option<PbdSolver>,

    time: Seconds,
    running: bool,
    last_tick: Option<Seconds>,

    out: Vec<Point>,
    raw: Vec<Vec2>,
}

impl Animator {
    pub fn new(
        path: ParsedPath,
        influence: InfluenceField,
        motion: Motion,
        config: AnimatorConfig,
    ) -> UndulaResult<Self> {
        if influence.len() != path.len() {
            return Err(UndulaError::config(format!(
                "influence field has {} values for {} path points",
                influence.len(),
                path.len()
            )));
        }
        if let Some(period) = config.loop_period
            && !(period > 0.0)
        {
            return Err(UndulaError::config("loop period must be > 0"));
        }
        let solver = config
            .solver
            .map(|params| PbdSolver::new(&path, &influence, params));
        let out = path.points().to_vec();
        let raw = vec![Vec2::ZERO; path.len()];
        Ok(Self {
            path,
            influence,
            motion,
            config,
            solver,
            time: 0.0,
            running: false,
            last_tick: None,
            out,
            raw,
        })
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn time(&self) -> Seconds {
        self.time
    }

    pub fn config(&self) -> &AnimatorConfig {
        &self.config
    }

    pub fn start(&mut self) {
        self.running = true;
        self.last_tick = None;
    }

    /// Stop ticking. Cooperative: future ticks simply do nothing.
    pub fn stop(&mut self) {
        self.running = false;
        self.last_tick = None;
    }

    /// Swap the influence field (anchors or falloff radius changed) and
    /// synchronously rebuild the solver's constraints.
    ///
    /// Must not race a `tick` on the same instance; single-threaded hosts get
    /// this for free.
    pub fn update_influence(&mut self, influence: InfluenceField) -> UndulaResult<()> {
        if influence.len() != self.path.len() {
            return Err(UndulaError::config(format!(
                "influence field has {} values for {} path points",
                influence.len(),
                self.path.len()
            )));
        }
        self.influence = influence;
        if let Some(params) = self.config.solver {
            self.solver = Some(PbdSolver::new(&self.path, &self.influence, params));
        }
        Ok(())
    }

    /// Re-resolve raw anchor records and swap in the resulting influence
    /// field. `origin` must match the offset the path was parsed with.
    pub fn update_anchors(
        &mut self,
        records: &[AnchorRecord],
        origin: (f64, f64),
        falloff_radius: f64,
    ) -> UndulaResult<()> {
        let shapes = resolve_anchors(records, origin)?;
        let influence = InfluenceField::compute(self.path.points(), &shapes, falloff_radius)?;
        self.update_influence(influence)
    }

    /// Replace the motion engine (style or parameters changed).
    pub fn set_motion(&mut self, motion: Motion) {
        self.motion = motion;
    }

    /// Advance the live clock and render one frame. `now` is the host's
    /// monotonic timestamp in seconds.
    pub fn tick(&mut self, now: Seconds) -> &[Point] {
        if !self.running {
            return &self.out;
        }
        let elapsed = match self.last_tick {
            // Clamped so a throttled background tab cannot teleport us.
            Some(prev) => (now - prev).clamp(0.0, MAX_TICK_STEP),
            None => 0.0,
        };
        self.last_tick = Some(now);
        self.time += elapsed * self.config.speed;
        if let Some(period) = self.config.loop_period {
            self.time = self.time.rem_euclid(period);
        }
        self.render_into(self.time);
        &self.out
    }

    /// Deterministic render for an explicit time, for export frame capture.
    ///
    /// Wraps `t` into the loop period when looping, resets the solver first
    /// so the output is a pure function of `t`, and leaves the live clock
    /// untouched.
    pub fn render_at_time(&mut self, t: Seconds) -> &[Point] {
        let t = match self.config.loop_period {
            Some(period) => t.rem_euclid(period),
            None => t,
        };
        if let Some(solver) = &mut self.solver {
            solver.reset();
        }
        self.render_into(t);
        &self.out
    }

    /// Per-point stretch ratios from the last solve, if the solver is active.
    pub fn stretch(&self) -> Option<&[f64]> {
        self.solver.as_ref().map(|s| s.stretch())
    }

    fn render_into(&mut self, t: Seconds) {
        let intensity = self.config.global_intensity;
        let motion = &self.motion;
        let base = self.path.points();

        // Points are independent here; the raw pass parallelizes cleanly.
        self.raw
            .par_iter_mut()
            .enumerate()
            .for_each(|(i, slot)| *slot = motion.displace(i, base[i], t) * intensity);

        match &mut self.solver {
            Some(solver) => {
                // The solver scales by inverse mass (the influence value), so
                // raw stays unscaled here and pinned points never move.
                solver.apply_displacements(&self.raw);
                solver.solve();
                solver.write_positions(&mut self.out);
            }
            None => {
                for i in 0..base.len() {
                    let influence = self.influence.get(i);
                    // Explicit early-exit for pinned points: copy the base
                    // position rather than trusting near-zero displacement.
                    self.out[i] = if influence == 0.0 {
                        base[i]
                    } else {
                        base[i] + self.raw[i] * influence
                    };
                }
            }
        }
    }
}
