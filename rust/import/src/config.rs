// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Import settings, with defaults overridable from the environment.

/// Conversion settings shared by every root of a file.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportConfig {
    /// Model-space tolerance in millimetres. A larger uncertainty declared
    /// by a representation context takes precedence.
    pub tolerance: f64,
    /// Samples per edge when pulling trims back onto a surface.
    pub trim_samples: usize,
    /// Reject files whose FILE_SCHEMA is not a known AP203 schema.
    pub strict_schema: bool,
    /// Run the B-rep validator before handing a solid to the sink.
    pub validate: bool,
    /// Convert roots on the rayon pool.
    pub parallel: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-3,
            trim_samples: 24,
            strict_schema: true,
            validate: true,
            parallel: true,
        }
    }
}

/// Fewest samples per edge that still give a trim curve
pub const MIN_TRIM_SAMPLES: usize = 2;

impl ImportConfig {
    /// Load configuration from `STEPG_*` environment variables.
    /// Out-of-range values are logged and replaced by the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            tolerance: tolerance_from(
                std::env::var("STEPG_TOLERANCE").ok().as_deref(),
                defaults.tolerance,
            ),
            trim_samples: trim_samples_from(
                std::env::var("STEPG_TRIM_SAMPLES").ok().as_deref(),
                defaults.trim_samples,
            ),
            strict_schema: std::env::var("STEPG_STRICT_SCHEMA")
                .unwrap_or_else(|_| "true".into())
                .parse()
                .unwrap_or(defaults.strict_schema),
            validate: std::env::var("STEPG_VALIDATE")
                .unwrap_or_else(|_| "true".into())
                .parse()
                .unwrap_or(defaults.validate),
            parallel: std::env::var("STEPG_PARALLEL")
                .unwrap_or_else(|_| "true".into())
                .parse()
                .unwrap_or(defaults.parallel),
        }
    }

    /// A tolerance must be finite and positive
    pub fn is_valid_tolerance(tolerance: f64) -> bool {
        tolerance.is_finite() && tolerance > 0.0
    }
}

fn tolerance_from(raw: Option<&str>, default: f64) -> f64 {
    match raw.map(|s| s.trim().parse::<f64>()) {
        None => default,
        Some(Ok(value)) if ImportConfig::is_valid_tolerance(value) => value,
        Some(_) => {
            tracing::warn!(value = raw.unwrap_or_default(), default, "Ignoring STEPG_TOLERANCE");
            default
        }
    }
}

fn trim_samples_from(raw: Option<&str>, default: usize) -> usize {
    match raw.map(|s| s.trim().parse::<usize>()) {
        None => default,
        Some(Ok(value)) if value >= MIN_TRIM_SAMPLES => value,
        Some(_) => {
            tracing::warn!(value = raw.unwrap_or_default(), default, "Ignoring STEPG_TRIM_SAMPLES");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ImportConfig::default();
        assert_eq!(config.tolerance, 1e-3);
        assert_eq!(config.trim_samples, 24);
        assert!(config.strict_schema);
        assert!(config.validate);
        assert!(config.parallel);
    }

    #[test]
    fn test_tolerance_must_be_positive() {
        assert_eq!(tolerance_from(None, 1e-3), 1e-3);
        assert_eq!(tolerance_from(Some("0.05"), 1e-3), 0.05);
        assert_eq!(tolerance_from(Some("-1"), 1e-3), 1e-3);
        assert_eq!(tolerance_from(Some("0"), 1e-3), 1e-3);
        assert_eq!(tolerance_from(Some("inf"), 1e-3), 1e-3);
        assert_eq!(tolerance_from(Some("abc"), 1e-3), 1e-3);
    }

    #[test]
    fn test_trim_samples_lower_bound() {
        assert_eq!(trim_samples_from(Some("8"), 24), 8);
        assert_eq!(trim_samples_from(Some("1"), 24), 24);
        assert_eq!(trim_samples_from(Some("-3"), 24), 24);
    }
}
