use crate::{
    anchors::influence::InfluenceField,
    foundation::core::{Point, Vec2},
    path::model::{ParsedPath, PointKind},
};

/// Tuning for the continuity solver.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SolverParams {
    /// Constraint-projection passes per solve.
    pub iterations: u32,
    /// Implicit-velocity damping factor per solve.
    pub damping: f64,
    /// Structural constraints only engage once `len/rest` leaves
    /// `[1/ratio, ratio]`.
    pub max_stretch_ratio: f64,
    /// Blend rate for tangent-direction correction per iteration.
    pub tangent_blend: f64,
    /// Pull strength of anchor constraints per iteration.
    pub anchor_stiffness: f64,
    /// Influence at or below this gets an anchor constraint.
    pub pin_threshold: f64,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            iterations: 4,
            damping: 0.85,
            max_stretch_ratio: 1.25,
            tangent_blend: 0.35,
            anchor_stiffness: 0.8,
            pin_threshold: 0.05,
        }
    }
}

/// Whether a distance link holds a curve joint together or spans a longer
/// structural run. Set from topology at build time rather than inferred from
/// a rest-length threshold: joints touch a Bézier control point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkKind {
    /// Corrected fully every iteration; a torn joint is immediately visible.
    Joint,
    /// Slack; corrected only beyond the configured stretch ratio.
    Structural,
}

#[derive(Clone, Copy, Debug)]
struct DistanceConstraint {
    a: usize,
    b: usize,
    rest: f64,
    kind: LinkKind,
}

/// Keeps a control point's tangent direction near its rest direction
/// relative to the adjacent on-curve endpoint, preserving length.
#[derive(Clone, Copy, Debug)]
struct TangentConstraint {
    endpoint: usize,
    control: usize,
    rest_dir: Vec2,
}

#[derive(Clone, Copy, Debug)]
struct AnchorConstraint {
    idx: usize,
    /// 1 at influence 0, fading out toward the pin threshold.
    strength: f64,
}

#[derive(Clone, Copy, Debug)]
struct Particle {
    pos: Point,
    prev: Point,
    base: Point,
    inv_mass: f64,
}

/// Iterative position-based continuity solver.
///
/// After raw noise displacement moves each point independently, this nudges
/// them back toward locally consistent configurations without undoing the
/// motion. Not a physics engine: it only preserves local curve continuity.
#[derive(Clone, Debug)]
pub struct PbdSolver {
    params: SolverParams,
    particles: Vec<Particle>,
    distances: Vec<DistanceConstraint>,
    tangents: Vec<TangentConstraint>,
    anchors: Vec<AnchorConstraint>,
    stretch: Vec<f64>,
}

impl PbdSolver {
    /// Build particles and constraints from path topology and the influence
    /// field. Rebuilt whenever either changes.
    #[tracing::instrument(skip(path, influence), fields(points = path.len()))]
    pub fn new(path: &ParsedPath, influence: &InfluenceField, params: SolverParams) -> Self {
        let particles: Vec<Particle> = path
            .points()
            .iter()
            .zip(influence.values())
            .map(|(&p, &w)| Particle {
                pos: p,
                prev: p,
                base: p,
                inv_mass: w,
            })
            .collect();

        let kinds = path.kinds();
        let mut distances = Vec::new();
        let mut tangents = Vec::new();

        for (range, closed) in path.subpaths() {
            let idxs: Vec<usize> = range.collect();
            for w in idxs.windows(2) {
                let (a, b) = (w[0], w[1]);
                distances.push(make_distance(a, b, &particles, kinds));
            }
            if closed && idxs.len() > 2 {
                let (a, b) = (*idxs.last().unwrap(), idxs[0]);
                distances.push(make_distance(a, b, &particles, kinds));
            }

            // Tangent constraints tie each control point to its on-curve
            // neighbor: cp1 to the previous endpoint, cp2 to the curve end.
            let mut i = 0;
            while i < idxs.len() {
                if kinds[idxs[i]] == PointKind::Control {
                    // Control points come in cp1/cp2 pairs.
                    let cp1 = idxs[i];
                    if i > 0 {
                        tangents.push(make_tangent(idxs[i - 1], cp1, &particles));
                    }
                    if i + 2 < idxs.len() {
                        let cp2 = idxs[i + 1];
                        let end = idxs[i + 2];
                        tangents.push(make_tangent(end, cp2, &particles));
                    }
                    i += 2;
                } else {
                    i += 1;
                }
            }
        }

        let anchors = influence
            .values()
            .iter()
            .enumerate()
            .filter(|&(_, &w)| w <= params.pin_threshold)
            .map(|(idx, &w)| AnchorConstraint {
                idx,
                strength: 1.0 - w / params.pin_threshold.max(1e-9),
            })
            .collect();

        let stretch = vec![1.0; particles.len()];
        Self {
            params,
            particles,
            distances,
            tangents,
            anchors,
            stretch,
        }
    }

    /// Move each particle to `base + raw * inv_mass`, keeping the previous
    /// position for implicit-velocity damping. Pinned points stay put.
    pub fn apply_displacements(&mut self, raw: &[Vec2]) {
        for (particle, &d) in self.particles.iter_mut().zip(raw) {
            particle.prev = particle.pos;
            particle.pos = particle.base + d * particle.inv_mass;
        }
    }

    /// Run the constraint passes and refresh per-point stretch ratios.
    pub fn solve(&mut self) {
        let damping = self.params.damping;
        for p in &mut self.particles {
            let vel = p.pos - p.prev;
            p.prev = p.pos - vel * damping;
        }

        for _ in 0..self.params.iterations {
            self.project_anchors();
            self.project_tangents();
            self.project_distances();
        }

        self.update_stretch();
    }

    /// Current positions after the last solve (or apply).
    pub fn positions(&self) -> impl Iterator<Item = Point> + '_ {
        self.particles.iter().map(|p| p.pos)
    }

    pub fn write_positions(&self, out: &mut [Point]) {
        for (slot, p) in out.iter_mut().zip(&self.particles) {
            *slot = p.pos;
        }
    }

    /// Average incident length ratio per point; 1 means unstretched.
    /// Exposed for thickness modulation and similar effects.
    pub fn stretch(&self) -> &[f64] {
        &self.stretch
    }

    /// Restore all particles to base positions; clears velocity and stretch.
    pub fn reset(&mut self) {
        for p in &mut self.particles {
            p.pos = p.base;
            p.prev = p.base;
        }
        self.stretch.fill(1.0);
    }

    fn project_anchors(&mut self) {
        let stiffness = self.params.anchor_stiffness;
        for c in &self.anchors {
            let p = &mut self.particles[c.idx];
            let pull = (p.base - p.pos) * (c.strength * stiffness);
            p.pos += pull;
        }
    }

    fn project_tangents(&mut self) {
        let blend = self.params.tangent_blend;
        for c in &self.tangents {
            let endpoint = self.particles[c.endpoint].pos;
            let control = &mut self.particles[c.control];
            if control.inv_mass <= 0.0 {
                continue;
            }
            let d = control.pos - endpoint;
            let len = d.hypot();
            if len <= 1e-9 {
                continue;
            }
            // Correct direction, keep magnitude: curve smoothness without
            // freezing the motion's reach.
            let dir = d / len;
            let mixed = dir + (c.rest_dir - dir) * blend;
            let mixed_len = mixed.hypot();
            if mixed_len <= 1e-9 {
                continue;
            }
            control.pos = endpoint + (mixed / mixed_len) * len;
        }
    }

    fn project_distances(&mut self) {
        let ratio = self.params.max_stretch_ratio.max(1.0);
        for c in &self.distances {
            let (pa, pb) = (self.particles[c.a].pos, self.particles[c.b].pos);
            let delta = pb - pa;
            let len = delta.hypot();
            if len <= 1e-9 || c.rest <= 1e-9 {
                // Degenerate joint; nothing meaningful to project.
                continue;
            }
            let engaged = match c.kind {
                LinkKind::Joint => true,
                LinkKind::Structural => {
                    let r = len / c.rest;
                    r > ratio || r < 1.0 / ratio
                }
            };
            if !engaged {
                continue;
            }

            let wa = self.particles[c.a].inv_mass;
            let wb = self.particles[c.b].inv_mass;
            let wsum = wa + wb;
            if wsum <= 0.0 {
                continue;
            }
            // Structural links correct only the excess past the slack band.
            let target = match c.kind {
                LinkKind::Joint => c.rest,
                LinkKind::Structural => {
                    if len > c.rest * ratio {
                        c.rest * ratio
                    } else {
                        c.rest / ratio
                    }
                }
            };
            let diff = (len - target) / len;
            let correction = delta * diff;
            self.particles[c.a].pos += correction * (wa / wsum);
            self.particles[c.b].pos -= correction * (wb / wsum);
        }
    }

    fn update_stretch(&mut self) {
        let mut sums = vec![0.0; self.particles.len()];
        let mut counts = vec![0u32; self.particles.len()];
        for c in &self.distances {
            if c.rest <= 1e-9 {
                continue;
            }
            let len = (self.particles[c.b].pos - self.particles[c.a].pos).hypot();
            let r = len / c.rest;
            sums[c.a] += r;
            sums[c.b] += r;
            counts[c.a] += 1;
            counts[c.b] += 1;
        }
        for (i, s) in self.stretch.iter_mut().enumerate() {
            *s = if counts[i] > 0 {
                sums[i] / f64::from(counts[i])
            } else {
                1.0
            };
        }
    }
}

fn make_distance(
    a: usize,
    b: usize,
    particles: &[Particle],
    kinds: &[PointKind],
) -> DistanceConstraint {
    let rest = (particles[b].base - particles[a].base).hypot();
    let kind = if kinds[a] == PointKind::Control || kinds[b] == PointKind::Control {
        LinkKind::Joint
    } else {
        LinkKind::Structural
    };
    DistanceConstraint { a, b, rest, kind }
}

fn make_tangent(endpoint: usize, control: usize, particles: &[Particle]) -> TangentConstraint {
    let d = particles[control].base - particles[endpoint].base;
    let len = d.hypot();
    let rest_dir = if len > 1e-9 { d / len } else { Vec2::ZERO };
    TangentConstraint {
        endpoint,
        control,
        rest_dir,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::parse::parse;

    fn curvy() -> ParsedPath {
        parse("M0,0 C10,20 30,20 40,0 L80,0", (0.0, 0.0)).unwrap()
    }

    fn uniform_displacements(n: usize, v: Vec2) -> Vec<Vec2> {
        vec![v; n]
    }

    #[test]
    fn fully_pinned_path_never_moves() {
        let path = curvy();
        // Influence of zero everywhere: inverse mass 0 for every particle.
        let anchors: Vec<_> = path
            .points()
            .iter()
            .map(|&p| crate::anchors::record::AnchorShape::Point(p))
            .collect();
        let influence = InfluenceField::compute(path.points(), &anchors, 10.0).unwrap();
        assert!(influence.values().iter().all(|&v| v == 0.0));

        let mut solver = PbdSolver::new(&path, &influence, SolverParams::default());
        solver.apply_displacements(&uniform_displacements(path.len(), Vec2::new(50.0, -30.0)));
        solver.solve();
        for (got, &want) in solver.positions().zip(path.points()) {
            assert_eq!(got, want);
        }
    }

    #[test]
    fn free_points_keep_their_displacement_direction() {
        let path = curvy();
        let influence = InfluenceField::free(path.len());
        let mut solver = PbdSolver::new(&path, &influence, SolverParams::default());
        solver.apply_displacements(&uniform_displacements(path.len(), Vec2::new(5.0, 5.0)));
        solver.solve();
        // A rigid translation satisfies every distance constraint; the solver
        // should not fight it.
        for (got, &base) in solver.positions().zip(path.points()) {
            assert!((got - (base + Vec2::new(5.0, 5.0))).hypot() < 1e-6);
        }
    }

    #[test]
    fn stretch_stays_bounded_under_iteration() {
        let path = curvy();
        let influence = InfluenceField::free(path.len());
        let params = SolverParams::default();
        let mut solver = PbdSolver::new(&path, &influence, params);

        // Tear the path apart point by point.
        let raw: Vec<Vec2> = (0..path.len())
            .map(|i| Vec2::new((i as f64 * 13.7).sin() * 60.0, (i as f64 * 7.3).cos() * 60.0))
            .collect();
        solver.apply_displacements(&raw);
        for _ in 0..8 {
            solver.solve();
        }
        // Joint links (touching control points) must be restored to near
        // rest; structural links may keep at most the slack band.
        for c in &solver.distances {
            if c.rest <= 1e-9 {
                continue;
            }
            let len = (solver.particles[c.b].pos - solver.particles[c.a].pos).hypot();
            let r = len / c.rest;
            assert!(
                r < params.max_stretch_ratio * 1.5,
                "edge {} -> {} stretched to {r}",
                c.a,
                c.b
            );
        }
    }

    #[test]
    fn reset_restores_base_positions() {
        let path = curvy();
        let influence = InfluenceField::free(path.len());
        let mut solver = PbdSolver::new(&path, &influence, SolverParams::default());
        solver.apply_displacements(&uniform_displacements(path.len(), Vec2::new(9.0, 9.0)));
        solver.solve();
        solver.reset();
        for (got, &want) in solver.positions().zip(path.points()) {
            assert_eq!(got, want);
        }
        assert!(solver.stretch().iter().all(|&s| s == 1.0));
    }

    #[test]
    fn tangent_projection_preserves_control_arm_length() {
        let path = curvy();
        let influence = InfluenceField::free(path.len());
        let mut solver = PbdSolver::new(&path, &influence, SolverParams::default());

        let raw: Vec<Vec2> = (0..path.len())
            .map(|i| {
                if i == 1 {
                    Vec2::new(0.0, 15.0)
                } else {
                    Vec2::ZERO
                }
            })
            .collect();
        solver.apply_displacements(&raw);
        let arm_before = (solver.particles[1].pos - solver.particles[0].pos).hypot();
        solver.project_tangents();
        let arm_after = (solver.particles[1].pos - solver.particles[0].pos).hypot();
        assert!((arm_before - arm_after).abs() < 1e-9);
    }

    #[test]
    fn degenerate_zero_length_links_do_not_nan() {
        // Coincident consecutive points give zero rest lengths.
        let path = parse("M5,5 L5,5 L5,5", (0.0, 0.0)).unwrap();
        let influence = InfluenceField::free(path.len());
        let mut solver = PbdSolver::new(&path, &influence, SolverParams::default());
        solver.apply_displacements(&uniform_displacements(path.len(), Vec2::new(1.0, 0.0)));
        solver.solve();
        for p in solver.positions() {
            assert!(p.x.is_finite() && p.y.is_finite());
        }
    }
}
