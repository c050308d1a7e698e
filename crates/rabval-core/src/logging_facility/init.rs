//! Subscriber installation

use std::sync::Once;
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

/// Output profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Human-readable output at debug level
    Development,
    /// JSON lines at info level, for log shippers
    Production,
    /// Bare registry; tests install their capture layer instead
    Test,
}

impl Profile {
    /// Pick the profile from the value of `RABVAL_LOG_FORMAT`
    pub fn from_format(format: Option<&str>) -> Self {
        match format {
            Some(f) if f.eq_ignore_ascii_case("json") => Profile::Production,
            _ => Profile::Development,
        }
    }

    fn default_filter(&self) -> &'static str {
        match self {
            Profile::Development => "rabval=debug",
            Profile::Production | Profile::Test => "rabval=info",
        }
    }
}

static INIT_ONCE: Once = Once::new();

/// Install the global subscriber for `profile`
///
/// Only the first call has an effect, and a subscriber installed elsewhere
/// (such as the test capture layer) is left in place. `RUST_LOG` overrides
/// the profile's default filter. Logs go to stderr so command output on stdout stays
/// machine-readable.
pub fn init(profile: Profile) {
    INIT_ONCE.call_once(|| {
        let filter = || {
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(profile.default_filter()))
        };
        match profile {
            Profile::Development => {
                tracing_subscriber::fmt()
                    .with_writer(std::io::stderr)
                    .with_env_filter(filter())
                    .try_init()
                    .ok();
            }
            Profile::Production => {
                tracing_subscriber::fmt()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_env_filter(filter())
                    .try_init()
                    .ok();
            }
            Profile::Test => {
                tracing_subscriber::registry().try_init().ok();
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_idempotent() {
        init(Profile::Test);
        init(Profile::Test);
    }

    #[test]
    fn test_profile_from_format() {
        assert_eq!(Profile::from_format(Some("json")), Profile::Production);
        assert_eq!(Profile::from_format(Some("JSON")), Profile::Production);
        assert_eq!(Profile::from_format(Some("text")), Profile::Development);
        assert_eq!(Profile::from_format(None), Profile::Development);
    }
}
