/// Convenience result type used across Undula.
pub type UndulaResult<T> = Result<T, UndulaError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum UndulaError {
    /// Malformed path data or anchor records.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid configuration values (radii, focus counts, durations).
    #[error("config error: {0}")]
    Config(String),

    /// Errors while evaluating motion for a frame.
    #[error("animation error: {0}")]
    Animation(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl UndulaError {
    /// Build a [`UndulaError::Parse`] value.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Build a [`UndulaError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Build a [`UndulaError::Animation`] value.
    pub fn animation(msg: impl Into<String>) -> Self {
        Self::Animation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_category_prefix() {
        let e = UndulaError::parse("bad token");
        assert_eq!(e.to_string(), "parse error: bad token");
        let e = UndulaError::config("falloff radius must be > 0");
        assert!(e.to_string().starts_with("config error:"));
    }
}
