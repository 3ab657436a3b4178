pub use kurbo::{Point, Vec2};

/// Simulation time in seconds.
pub type Seconds = f64;

/// Maximum real-time step folded into the simulation clock per tick.
///
/// Hosts that throttle background tabs can hand us multi-second gaps; folding
/// them in whole would teleport the animation.
pub const MAX_TICK_STEP: Seconds = 1.0 / 30.0;

/// Loop configuration shared by the animator and the looped noise domain.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LoopSpec {
    /// Loop period in seconds. Must be > 0.
    pub period: Seconds,
    /// Radius of the circle traced through 4D noise space.
    pub radius: f64,
}

impl LoopSpec {
    /// Build a loop spec with the default noise-circle radius.
    pub fn new(period: Seconds) -> crate::foundation::error::UndulaResult<Self> {
        if !(period > 0.0) {
            return Err(crate::foundation::error::UndulaError::config(
                "loop period must be > 0",
            ));
        }
        Ok(Self {
            period,
            radius: 1.0,
        })
    }

    /// Wrap an arbitrary non-negative time into `[0, period)`.
    pub fn wrap(&self, t: Seconds) -> Seconds {
        t.rem_euclid(self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_spec_rejects_non_positive_period() {
        assert!(LoopSpec::new(0.0).is_err());
        assert!(LoopSpec::new(-3.0).is_err());
        assert!(LoopSpec::new(f64::NAN).is_err());
    }

    #[test]
    fn wrap_is_exact_at_period_boundary() {
        let spec = LoopSpec::new(8.0).unwrap();
        assert_eq!(spec.wrap(0.0), 0.0);
        assert_eq!(spec.wrap(8.0), 0.0);
        assert_eq!(spec.wrap(20.0), 4.0);
    }
}
