// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Complex instance dispatch
//!
//! A complex instance lists every entity record it satisfies, e.g.
//! `(BOUNDED_CURVE() B_SPLINE_CURVE(..) B_SPLINE_CURVE_WITH_KNOTS(..)
//! RATIONAL_B_SPLINE_CURVE(..) ..)`. The instance is first assigned to a
//! family by a marker record, tested in a fixed order. Each family has a
//! closed table mapping the exact set of distinguishing records present
//! to the registered name of the wrapper that handles it. Combinations
//! outside the tables are rejected.

use crate::error::{Error, Result};

struct Family {
    name: &'static str,
    /// Record whose presence puts an instance in this family
    marker: &'static str,
    /// Records that distinguish members of the family
    distinguishing: &'static [&'static str],
    /// Exact distinguishing set to registered name
    table: &'static [(&'static [&'static str], &'static str)],
}

const CURVES: Family = Family {
    name: "curve",
    marker: "B_SPLINE_CURVE",
    distinguishing: &[
        "B_SPLINE_CURVE_WITH_KNOTS",
        "BEZIER_CURVE",
        "UNIFORM_CURVE",
        "QUASI_UNIFORM_CURVE",
        "RATIONAL_B_SPLINE_CURVE",
    ],
    table: &[
        (&["B_SPLINE_CURVE_WITH_KNOTS"], "B_SPLINE_CURVE_WITH_KNOTS"),
        (&["BEZIER_CURVE"], "BEZIER_CURVE"),
        (&["UNIFORM_CURVE"], "UNIFORM_CURVE"),
        (&["QUASI_UNIFORM_CURVE"], "QUASI_UNIFORM_CURVE"),
        (
            &["B_SPLINE_CURVE_WITH_KNOTS", "RATIONAL_B_SPLINE_CURVE"],
            "RATIONAL_B_SPLINE_CURVE_WITH_KNOTS",
        ),
        (
            &["BEZIER_CURVE", "RATIONAL_B_SPLINE_CURVE"],
            "RATIONAL_BEZIER_CURVE",
        ),
        (
            &["UNIFORM_CURVE", "RATIONAL_B_SPLINE_CURVE"],
            "RATIONAL_UNIFORM_CURVE",
        ),
        (
            &["QUASI_UNIFORM_CURVE", "RATIONAL_B_SPLINE_CURVE"],
            "RATIONAL_QUASI_UNIFORM_CURVE",
        ),
    ],
};

const SURFACES: Family = Family {
    name: "surface",
    marker: "B_SPLINE_SURFACE",
    distinguishing: &[
        "B_SPLINE_SURFACE_WITH_KNOTS",
        "BEZIER_SURFACE",
        "UNIFORM_SURFACE",
        "QUASI_UNIFORM_SURFACE",
        "RATIONAL_B_SPLINE_SURFACE",
    ],
    table: &[
        (&["B_SPLINE_SURFACE_WITH_KNOTS"], "B_SPLINE_SURFACE_WITH_KNOTS"),
        (&["BEZIER_SURFACE"], "BEZIER_SURFACE"),
        (&["UNIFORM_SURFACE"], "UNIFORM_SURFACE"),
        (&["QUASI_UNIFORM_SURFACE"], "QUASI_UNIFORM_SURFACE"),
        (
            &["B_SPLINE_SURFACE_WITH_KNOTS", "RATIONAL_B_SPLINE_SURFACE"],
            "RATIONAL_B_SPLINE_SURFACE_WITH_KNOTS",
        ),
        (
            &["BEZIER_SURFACE", "RATIONAL_B_SPLINE_SURFACE"],
            "RATIONAL_BEZIER_SURFACE",
        ),
        (
            &["UNIFORM_SURFACE", "RATIONAL_B_SPLINE_SURFACE"],
            "RATIONAL_UNIFORM_SURFACE",
        ),
        (
            &["QUASI_UNIFORM_SURFACE", "RATIONAL_B_SPLINE_SURFACE"],
            "RATIONAL_QUASI_UNIFORM_SURFACE",
        ),
    ],
};

const NAMED_UNITS: Family = Family {
    name: "named unit",
    marker: "NAMED_UNIT",
    distinguishing: &[
        "SI_UNIT",
        "CONVERSION_BASED_UNIT",
        "CONTEXT_DEPENDENT_UNIT",
        "LENGTH_UNIT",
        "PLANE_ANGLE_UNIT",
        "SOLID_ANGLE_UNIT",
        "MASS_UNIT",
        "AREA_UNIT",
        "VOLUME_UNIT",
        "TIME_UNIT",
    ],
    table: &[
        (&["SI_UNIT", "LENGTH_UNIT"], "LENGTH_SI_UNIT"),
        (&["SI_UNIT", "PLANE_ANGLE_UNIT"], "PLANE_ANGLE_SI_UNIT"),
        (&["SI_UNIT", "SOLID_ANGLE_UNIT"], "SOLID_ANGLE_SI_UNIT"),
        (&["SI_UNIT", "MASS_UNIT"], "MASS_SI_UNIT"),
        (&["SI_UNIT", "AREA_UNIT"], "AREA_SI_UNIT"),
        (&["SI_UNIT", "VOLUME_UNIT"], "VOLUME_SI_UNIT"),
        (&["SI_UNIT", "TIME_UNIT"], "TIME_SI_UNIT"),
        (
            &["CONVERSION_BASED_UNIT", "LENGTH_UNIT"],
            "LENGTH_CONVERSION_BASED_UNIT",
        ),
        (
            &["CONVERSION_BASED_UNIT", "PLANE_ANGLE_UNIT"],
            "PLANE_ANGLE_CONVERSION_BASED_UNIT",
        ),
        (
            &["CONVERSION_BASED_UNIT", "SOLID_ANGLE_UNIT"],
            "SOLID_ANGLE_CONVERSION_BASED_UNIT",
        ),
        (
            &["CONVERSION_BASED_UNIT", "MASS_UNIT"],
            "MASS_CONVERSION_BASED_UNIT",
        ),
        (
            &["CONVERSION_BASED_UNIT", "AREA_UNIT"],
            "AREA_CONVERSION_BASED_UNIT",
        ),
        (
            &["CONVERSION_BASED_UNIT", "VOLUME_UNIT"],
            "VOLUME_CONVERSION_BASED_UNIT",
        ),
        (
            &["CONVERSION_BASED_UNIT", "TIME_UNIT"],
            "TIME_CONVERSION_BASED_UNIT",
        ),
        (
            &["CONTEXT_DEPENDENT_UNIT", "LENGTH_UNIT"],
            "LENGTH_CONTEXT_DEPENDENT_UNIT",
        ),
        (
            &["CONTEXT_DEPENDENT_UNIT", "PLANE_ANGLE_UNIT"],
            "PLANE_ANGLE_CONTEXT_DEPENDENT_UNIT",
        ),
        (
            &["CONTEXT_DEPENDENT_UNIT", "SOLID_ANGLE_UNIT"],
            "SOLID_ANGLE_CONTEXT_DEPENDENT_UNIT",
        ),
    ],
};

const CONTEXTS: Family = Family {
    name: "representation context",
    marker: "REPRESENTATION_CONTEXT",
    distinguishing: &[
        "GEOMETRIC_REPRESENTATION_CONTEXT",
        "GLOBAL_UNIT_ASSIGNED_CONTEXT",
        "GLOBAL_UNCERTAINTY_ASSIGNED_CONTEXT",
    ],
    table: &[
        (
            &[
                "GEOMETRIC_REPRESENTATION_CONTEXT",
                "GLOBAL_UNIT_ASSIGNED_CONTEXT",
                "GLOBAL_UNCERTAINTY_ASSIGNED_CONTEXT",
            ],
            "GEOMETRIC_UNIT_UNCERTAINTY_CONTEXT",
        ),
        (
            &[
                "GEOMETRIC_REPRESENTATION_CONTEXT",
                "GLOBAL_UNIT_ASSIGNED_CONTEXT",
            ],
            "GEOMETRIC_UNIT_CONTEXT",
        ),
        (
            &[
                "GEOMETRIC_REPRESENTATION_CONTEXT",
                "GLOBAL_UNCERTAINTY_ASSIGNED_CONTEXT",
            ],
            "GEOMETRIC_UNCERTAINTY_CONTEXT",
        ),
        (
            &["GEOMETRIC_REPRESENTATION_CONTEXT"],
            "GEOMETRIC_REPRESENTATION_CONTEXT",
        ),
        (
            &[
                "GLOBAL_UNIT_ASSIGNED_CONTEXT",
                "GLOBAL_UNCERTAINTY_ASSIGNED_CONTEXT",
            ],
            "UNIT_UNCERTAINTY_CONTEXT",
        ),
        (&["GLOBAL_UNIT_ASSIGNED_CONTEXT"], "GLOBAL_UNIT_ASSIGNED_CONTEXT"),
    ],
};

const MEASURES: Family = Family {
    name: "measure with unit",
    marker: "MEASURE_WITH_UNIT",
    distinguishing: &[
        "LENGTH_MEASURE_WITH_UNIT",
        "PLANE_ANGLE_MEASURE_WITH_UNIT",
        "SOLID_ANGLE_MEASURE_WITH_UNIT",
        "UNCERTAINTY_MEASURE_WITH_UNIT",
    ],
    table: &[
        (&[], "MEASURE_WITH_UNIT"),
        (&["LENGTH_MEASURE_WITH_UNIT"], "LENGTH_MEASURE_WITH_UNIT"),
        (
            &["PLANE_ANGLE_MEASURE_WITH_UNIT"],
            "PLANE_ANGLE_MEASURE_WITH_UNIT",
        ),
        (
            &["SOLID_ANGLE_MEASURE_WITH_UNIT"],
            "SOLID_ANGLE_MEASURE_WITH_UNIT",
        ),
        (
            &["UNCERTAINTY_MEASURE_WITH_UNIT"],
            "UNCERTAINTY_MEASURE_WITH_UNIT",
        ),
    ],
};

/// Families in dispatch priority order
const FAMILIES: [&Family; 5] = [&CURVES, &SURFACES, &NAMED_UNITS, &CONTEXTS, &MEASURES];

/// Registered names the dispatch tables can produce
pub fn resolved_names() -> impl Iterator<Item = &'static str> {
    FAMILIES
        .into_iter()
        .flat_map(|family| family.table.iter().map(|(_, name)| *name))
}

/// Map the record names of complex instance `id` to a registered name
pub fn resolve<S: AsRef<str>>(id: u32, parts: &[S]) -> Result<&'static str> {
    let has = |record: &str| parts.iter().any(|p| p.as_ref().eq_ignore_ascii_case(record));

    let unsupported = || Error::UnsupportedComplex {
        id,
        parts: parts.iter().map(|p| p.as_ref().to_string()).collect(),
    };

    let family = FAMILIES
        .into_iter()
        .find(|family| has(family.marker))
        .ok_or_else(unsupported)?;

    let present: Vec<&str> = family
        .distinguishing
        .iter()
        .copied()
        .filter(|record| has(record))
        .collect();

    let name = family
        .table
        .iter()
        .find(|(records, _)| {
            records.len() == present.len() && records.iter().all(|r| present.contains(r))
        })
        .map(|(_, name)| *name)
        .ok_or_else(unsupported)?;

    tracing::trace!(id, family = family.name, entity = name, "Resolved complex instance");
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rational_bspline_surface() {
        let parts = [
            "BOUNDED_SURFACE",
            "B_SPLINE_SURFACE",
            "B_SPLINE_SURFACE_WITH_KNOTS",
            "GEOMETRIC_REPRESENTATION_ITEM",
            "RATIONAL_B_SPLINE_SURFACE",
            "REPRESENTATION_ITEM",
            "SURFACE",
        ];
        assert_eq!(
            resolve(7, &parts).unwrap(),
            "RATIONAL_B_SPLINE_SURFACE_WITH_KNOTS"
        );
    }

    #[test]
    fn test_units() {
        assert_eq!(
            resolve(1, &["LENGTH_UNIT", "NAMED_UNIT", "SI_UNIT"]).unwrap(),
            "LENGTH_SI_UNIT"
        );
        assert_eq!(
            resolve(2, &["CONVERSION_BASED_UNIT", "NAMED_UNIT", "PLANE_ANGLE_UNIT"]).unwrap(),
            "PLANE_ANGLE_CONVERSION_BASED_UNIT"
        );
    }

    #[test]
    fn test_context() {
        let parts = [
            "GEOMETRIC_REPRESENTATION_CONTEXT",
            "GLOBAL_UNCERTAINTY_ASSIGNED_CONTEXT",
            "GLOBAL_UNIT_ASSIGNED_CONTEXT",
            "REPRESENTATION_CONTEXT",
        ];
        assert_eq!(
            resolve(3, &parts).unwrap(),
            "GEOMETRIC_UNIT_UNCERTAINTY_CONTEXT"
        );
    }

    #[test]
    fn test_curve_family_wins_over_later_families() {
        // A B-spline curve record decides the family even with other markers present
        let parts = [
            "B_SPLINE_CURVE",
            "BEZIER_CURVE",
            "MEASURE_WITH_UNIT",
        ];
        assert_eq!(resolve(4, &parts).unwrap(), "BEZIER_CURVE");
    }

    #[test]
    fn test_unmapped_combinations_are_rejected() {
        let err = resolve(5, &["B_SPLINE_CURVE", "BEZIER_CURVE", "UNIFORM_CURVE"]).unwrap_err();
        assert!(matches!(err, Error::UnsupportedComplex { id: 5, .. }));

        let err = resolve(6, &["REPRESENTATION_RELATIONSHIP", "SHAPE_REPRESENTATION_RELATIONSHIP"])
            .unwrap_err();
        assert!(err.to_string().contains("SHAPE_REPRESENTATION_RELATIONSHIP"));
    }

    #[test]
    fn test_every_resolved_name_is_registered() {
        let registry = crate::registry::Registry::standard();
        for name in resolved_names() {
            assert!(registry.contains(name), "{} is not registered", name);
        }
    }
}
