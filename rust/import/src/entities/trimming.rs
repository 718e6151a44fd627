// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::factory::EntityKey;
use slotmap::Key;

/// One end of a trimmed curve: a point on the basis curve or a basis
/// curve parameter.
///
/// Read the tag with [`is_parameter_trim`](Self::is_parameter_trim)
/// before taking a payload; asking for the other payload is a bug and
/// trips a debug assertion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrimmingSelect {
    CartesianPoint(EntityKey),
    ParameterValue(f64),
}

impl TrimmingSelect {
    pub fn is_parameter_trim(&self) -> bool {
        matches!(self, TrimmingSelect::ParameterValue(_))
    }

    /// Raw basis curve parameter
    pub fn parameter_trim(&self) -> f64 {
        match self {
            TrimmingSelect::ParameterValue(t) => *t,
            TrimmingSelect::CartesianPoint(_) => {
                debug_assert!(false, "parameter requested from a cartesian point trim");
                f64::NAN
            }
        }
    }

    /// Trimming point
    pub fn point_trim(&self) -> EntityKey {
        match self {
            TrimmingSelect::CartesianPoint(key) => *key,
            TrimmingSelect::ParameterValue(_) => {
                debug_assert!(false, "point requested from a parameter trim");
                EntityKey::null()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags() {
        let parameter = TrimmingSelect::ParameterValue(0.5);
        assert!(parameter.is_parameter_trim());
        assert_eq!(parameter.parameter_trim(), 0.5);

        let point = TrimmingSelect::CartesianPoint(EntityKey::null());
        assert!(!point.is_parameter_trim());
        assert!(point.point_trim().is_null());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "point requested from a parameter trim")]
    fn test_point_from_parameter_trim_panics() {
        TrimmingSelect::ParameterValue(1.0).point_trim();
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "parameter requested from a cartesian point trim")]
    fn test_parameter_from_point_trim_panics() {
        TrimmingSelect::CartesianPoint(EntityKey::null()).parameter_trim();
    }
}
