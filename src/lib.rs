//! Undula deforms decorative vector outlines so they flow, writhe or sway in
//! real time while designated anchor regions stay spatially fixed.
//!
//! # Pipeline overview
//!
//! 1. **Parse**: path data string -> [`ParsedPath`] (flat, index-stable
//!    point buffer; control points are points too)
//! 2. **Pin**: anchor records -> [`InfluenceField`] (per-point freedom in
//!    `[0, 1]`, quintic-smoothstep falloff)
//! 3. **Displace**: a seeded [`Motion`] engine turns (point, time) into a
//!    raw displacement (psychedelic warp, eldritch writhe, vegetal wind, or
//!    the scheduled focus-burst director)
//! 4. **Repair** (optional): the [`PbdSolver`] projects distance, tangent
//!    and anchor constraints so the outline never visibly tears
//! 5. **Emit**: the [`Animator`] writes the final point buffer, index-aligned
//!    with the parsed path, for an external rasterizer to replay
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Deterministic-by-default**: every engine is seeded; identical inputs
//!   produce bit-identical output, which is what the export path relies on.
//! - **No IO**: the crate only consumes already-decoded path strings, anchor
//!   records and parameter values; persistence and rasterization live with
//!   the host.
//! - **Copy-out buffers**: the animator reuses its output buffer every frame;
//!   returned slices are valid until the next call.
#![forbid(unsafe_code)]

mod anchors;
mod animate;
mod foundation;
mod motion;
mod noise;
mod path;
mod solver;

pub use anchors::influence::InfluenceField;
pub use anchors::record::{AnchorKind, AnchorRecord, AnchorShape, Coord, decode_anchors, resolve_anchors};
pub use animate::animator::{Animator, AnimatorConfig};
pub use foundation::core::{LoopSpec, MAX_TICK_STEP, Point, Seconds, Vec2};
pub use foundation::error::{UndulaError, UndulaResult};
pub use foundation::math::{Rng64, smoothstep};
pub use motion::Motion;
pub use motion::eldritch::{Eldritch, EldritchParams};
pub use motion::focus::{
    Focus, FocusDirector, FocusParams, FocusStyle, FocusWeights, Schedule,
};
pub use motion::psychedelic::{Psychedelic, PsychedelicParams};
pub use motion::vegetal::{Vegetal, VegetalParams};
pub use noise::fractal::{FractalParams, NoiseField, TimeDomain};
pub use noise::perlin::Perlin;
pub use path::model::{ParsedPath, PathCmd, PointKind};
pub use path::parse::parse;
pub use solver::pbd::{LinkKind, PbdSolver, SolverParams};
