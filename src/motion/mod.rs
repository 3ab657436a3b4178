pub mod eldritch;
pub mod focus;
pub mod psychedelic;
pub mod vegetal;

use crate::foundation::core::{Point, Seconds, Vec2};

/// The active displacement engine, one per motion style.
///
/// Each variant owns its seeded noise state; instances are independently
/// seedable and there is no global noise singleton.
#[derive(Clone, Debug)]
pub enum Motion {
    Psychedelic(psychedelic::Psychedelic),
    Eldritch(eldritch::Eldritch),
    Vegetal(vegetal::Vegetal),
    Focus(focus::FocusDirector),
}

impl Motion {
    /// Raw displacement for the point at `idx` (its base position `p`) at
    /// simulation time `t`. Pure for fixed seed and parameters.
    pub fn displace(&self, idx: usize, p: Point, t: Seconds) -> Vec2 {
        match self {
            Self::Psychedelic(m) => m.displace(p, t),
            Self::Eldritch(m) => m.displace(p, t),
            Self::Vegetal(m) => m.displace(p, t),
            Self::Focus(m) => m.displace(idx, p, t),
        }
    }
}
