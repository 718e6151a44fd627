// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Curve wrappers
//!
//! Elementary and B-spline curves build unbounded [`CurveGeometry`]; a
//! trimmed curve or an edge then bounds it with [`CurveBounds`].

use super::trimming::TrimmingSelect;
use super::{Entity, Loader};
use crate::context::{ConversionContext, CurveBounds};
use crate::error::{Error, Result};
use crate::factory::EntityKey;
use crate::registry::Registry;
use nalgebra::Point3;
use step_brep_geometry::{
    bezier_knots, expand_knots, quasi_uniform_knots, uniform_knots, Curve3, CurveGeometry,
    NurbsCurve,
};

/// Rational B-spline curve, knots already expanded from multiplicities
#[derive(Debug, Clone, PartialEq)]
pub struct BSplineCurve {
    pub degree: usize,
    pub control_points: Vec<EntityKey>,
    pub weights: Option<Vec<f64>>,
    pub knots: Vec<f64>,
    pub closed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CurveEntity {
    Line {
        pnt: EntityKey,
        dir: EntityKey,
    },
    Circle {
        position: EntityKey,
        radius: f64,
    },
    Ellipse {
        position: EntityKey,
        semi_axis_1: f64,
        semi_axis_2: f64,
    },
    Parabola {
        position: EntityKey,
        focal_dist: f64,
    },
    Hyperbola {
        position: EntityKey,
        semi_axis: f64,
        semi_imag_axis: f64,
    },
    Polyline {
        points: Vec<EntityKey>,
    },
    BSpline(BSplineCurve),
}

impl CurveEntity {
    pub fn children(&self) -> Vec<EntityKey> {
        match self {
            CurveEntity::Line { pnt, dir } => vec![*pnt, *dir],
            CurveEntity::Circle { position, .. }
            | CurveEntity::Ellipse { position, .. }
            | CurveEntity::Parabola { position, .. }
            | CurveEntity::Hyperbola { position, .. } => vec![*position],
            CurveEntity::Polyline { points } => points.clone(),
            CurveEntity::BSpline(spline) => spline.control_points.clone(),
        }
    }

    /// Unbounded geometry in millimetres
    pub fn geometry(&self, ctx: &ConversionContext<'_>) -> Result<CurveGeometry> {
        let length = ctx.units().length;
        let geometry = match self {
            CurveEntity::Line { pnt, dir } => CurveGeometry::line(ctx.point(*pnt)?, ctx.vector(*dir)?)?,
            CurveEntity::Circle { position, radius } => CurveGeometry::Circle {
                frame: ctx.frame(*position)?,
                radius: radius * length,
            },
            CurveEntity::Ellipse {
                position,
                semi_axis_1,
                semi_axis_2,
            } => CurveGeometry::Ellipse {
                frame: ctx.frame(*position)?,
                semi_axis_1: semi_axis_1 * length,
                semi_axis_2: semi_axis_2 * length,
            },
            CurveEntity::Parabola {
                position,
                focal_dist,
            } => CurveGeometry::Parabola {
                frame: ctx.frame(*position)?,
                focal_dist: focal_dist * length,
            },
            CurveEntity::Hyperbola {
                position,
                semi_axis,
                semi_imag_axis,
            } => CurveGeometry::Hyperbola {
                frame: ctx.frame(*position)?,
                semi_axis: semi_axis * length,
                semi_imag_axis: semi_imag_axis * length,
            },
            CurveEntity::Polyline { points } => {
                let points = points
                    .iter()
                    .map(|&key| ctx.point(key))
                    .collect::<Result<Vec<_>>>()?;
                CurveGeometry::polyline(points)?
            }
            CurveEntity::BSpline(spline) => {
                let control_points = spline
                    .control_points
                    .iter()
                    .map(|&key| ctx.point(key))
                    .collect::<Result<Vec<_>>>()?;
                CurveGeometry::Nurbs(NurbsCurve::new(
                    spline.degree,
                    control_points,
                    spline.weights.clone(),
                    spline.knots.clone(),
                )?)
            }
        };
        Ok(geometry)
    }

    /// Whether basis parameters of this curve are angles
    fn is_angular(&self) -> bool {
        matches!(self, CurveEntity::Circle { .. } | CurveEntity::Ellipse { .. })
    }

    pub(crate) fn load_on_brep(&self, ctx: &mut ConversionContext<'_>) -> Result<usize> {
        let curve = Curve3::natural(self.geometry(ctx)?);
        Ok(ctx.brep_mut().add_curve3(curve))
    }
}

/// Which trim representation the writer considered authoritative
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimPreference {
    Cartesian,
    Parameter,
    Unspecified,
}

impl TrimPreference {
    fn from_step(value: Option<&str>) -> Self {
        match value {
            Some("CARTESIAN") => TrimPreference::Cartesian,
            Some("PARAMETER") => TrimPreference::Parameter,
            _ => TrimPreference::Unspecified,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrimmedCurve {
    pub basis: EntityKey,
    pub trim_1: Vec<TrimmingSelect>,
    pub trim_2: Vec<TrimmingSelect>,
    pub sense_agreement: bool,
    pub master_representation: TrimPreference,
}

#[derive(Debug, Clone, Copy)]
enum TrimEnd {
    Point(Point3<f64>),
    Parameter(f64),
}

impl TrimmedCurve {
    pub fn children(&self) -> Vec<EntityKey> {
        let mut children = vec![self.basis];
        children.extend(
            self.trim_1
                .iter()
                .chain(&self.trim_2)
                .filter(|select| !select.is_parameter_trim())
                .map(TrimmingSelect::point_trim),
        );
        children
    }

    /// Bounded curve. `Natural` means the curve's own trims; other bounds
    /// are applied to the basis in trimmed-curve direction.
    pub fn curve3(&self, ctx: &ConversionContext<'_>, bounds: CurveBounds) -> Result<Curve3> {
        let bounds = match bounds {
            CurveBounds::Natural => self.own_bounds(ctx)?,
            other => other,
        };
        if self.sense_agreement {
            ctx.curve3(self.basis, bounds)
        } else {
            Ok(ctx.curve3(self.basis, bounds.swapped())?.reversed())
        }
    }

    fn end(
        &self,
        ctx: &ConversionContext<'_>,
        select: &TrimmingSelect,
        angular: bool,
    ) -> Result<TrimEnd> {
        if select.is_parameter_trim() {
            let t = select.parameter_trim();
            Ok(TrimEnd::Parameter(if angular {
                t * ctx.units().plane_angle
            } else {
                t
            }))
        } else {
            Ok(TrimEnd::Point(ctx.point(select.point_trim())?))
        }
    }

    /// Bounds from the first select of each trim list
    fn own_bounds(&self, ctx: &ConversionContext<'_>) -> Result<CurveBounds> {
        let (Some(first_1), Some(first_2)) = (self.trim_1.first(), self.trim_2.first()) else {
            return Err(Error::Topology("trimmed curve without trims".into()));
        };
        let angular = matches!(ctx.entity(self.basis)?, Entity::Curve(curve) if curve.is_angular());
        let geometry = ctx.curve_geometry(self.basis)?;

        for (trims, first) in [(&self.trim_1, first_1), (&self.trim_2, first_2)] {
            self.check_redundant(ctx, &geometry, trims, angular)?;
            let prefers_other = match self.master_representation {
                TrimPreference::Cartesian => first.is_parameter_trim(),
                TrimPreference::Parameter => !first.is_parameter_trim(),
                TrimPreference::Unspecified => false,
            };
            if prefers_other && trims.len() > 1 {
                tracing::warn!(
                    preference = ?self.master_representation,
                    "Trimmed curve prefers its second trim representation, using the first"
                );
            }
        }

        let start = self.end(ctx, first_1, angular)?;
        let end = self.end(ctx, first_2, angular)?;
        Ok(match (start, end) {
            (TrimEnd::Point(p0), TrimEnd::Point(p1)) => CurveBounds::Points(p0, p1),
            (TrimEnd::Parameter(t0), TrimEnd::Parameter(t1)) => CurveBounds::Parameters(t0, t1),
            (TrimEnd::Parameter(t0), TrimEnd::Point(p1)) => {
                CurveBounds::Parameters(t0, geometry.closest_parameter(&p1))
            }
            (TrimEnd::Point(p0), TrimEnd::Parameter(t1)) => {
                CurveBounds::Parameters(geometry.closest_parameter(&p0), t1)
            }
        })
    }

    /// Warn when the two representations of one trim disagree
    fn check_redundant(
        &self,
        ctx: &ConversionContext<'_>,
        geometry: &CurveGeometry,
        trims: &[TrimmingSelect],
        angular: bool,
    ) -> Result<()> {
        let point = trims.iter().find(|s| !s.is_parameter_trim());
        let parameter = trims.iter().find(|s| s.is_parameter_trim());
        if let (Some(point), Some(parameter)) = (point, parameter) {
            let (TrimEnd::Point(p), TrimEnd::Parameter(t)) = (
                self.end(ctx, point, angular)?,
                self.end(ctx, parameter, angular)?,
            ) else {
                return Ok(());
            };
            let distance = (geometry.evaluate(t) - p).norm();
            if distance > ctx.tolerance() {
                tracing::warn!(distance, "Trim point and trim parameter disagree");
            }
        }
        Ok(())
    }

    pub(crate) fn load_on_brep(&self, ctx: &mut ConversionContext<'_>) -> Result<usize> {
        let curve = self.curve3(ctx, CurveBounds::Natural)?;
        Ok(ctx.brep_mut().add_curve3(curve))
    }
}

/// Curve lying on a surface; only its 3D curve is used
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceCurve {
    pub curve_3d: EntityKey,
}

impl SurfaceCurve {
    pub(crate) fn load_on_brep(&self, ctx: &mut ConversionContext<'_>) -> Result<usize> {
        let curve = ctx.curve3(self.curve_3d, CurveBounds::Natural)?;
        Ok(ctx.brep_mut().add_curve3(curve))
    }
}

fn load_line(loader: &mut Loader<'_>) -> Result<Entity> {
    Ok(Entity::Curve(CurveEntity::Line {
        pnt: loader.entity("pnt")?,
        dir: loader.entity("dir")?,
    }))
}

fn load_conic(loader: &mut Loader<'_>) -> Result<Entity> {
    let position = loader.entity("position")?;
    let curve = match loader.name() {
        "CIRCLE" => CurveEntity::Circle {
            position,
            radius: loader.real("radius")?,
        },
        "ELLIPSE" => CurveEntity::Ellipse {
            position,
            semi_axis_1: loader.real("semi_axis_1")?,
            semi_axis_2: loader.real("semi_axis_2")?,
        },
        "PARABOLA" => CurveEntity::Parabola {
            position,
            focal_dist: loader.real("focal_dist")?,
        },
        _ => CurveEntity::Hyperbola {
            position,
            semi_axis: loader.real("semi_axis")?,
            semi_imag_axis: loader.real("semi_imag_axis")?,
        },
    };
    Ok(Entity::Curve(curve))
}

fn load_polyline(loader: &mut Loader<'_>) -> Result<Entity> {
    Ok(Entity::Curve(CurveEntity::Polyline {
        points: loader.entities("points")?,
    }))
}

/// Degree attribute as a count
pub(crate) fn degree(loader: &Loader<'_>, attribute: &'static str) -> Result<usize> {
    usize::try_from(loader.integer(attribute)?)
        .map_err(|_| loader.invalid(attribute, "a non-negative integer"))
}

fn load_b_spline_curve(loader: &mut Loader<'_>) -> Result<Entity> {
    let degree = degree(loader, "degree")?;
    let control_points = loader.entities("control_points_list")?;
    let count = control_points.len();
    let name = loader.name();

    let knots = if name.ends_with("WITH_KNOTS") {
        let multiplicities = loader.integers("knot_multiplicities")?;
        let values = loader.reals("knots")?;
        if multiplicities.len() != values.len() {
            return Err(loader.invalid("knot_multiplicities", "one multiplicity per knot"));
        }
        expand_knots(&values, &multiplicities)
    } else if name.contains("QUASI_UNIFORM") {
        quasi_uniform_knots(count, degree)
    } else if name.contains("UNIFORM") {
        uniform_knots(count, degree)
    } else {
        bezier_knots(count, degree)
    };

    let weights = if name.starts_with("RATIONAL") {
        Some(loader.reals("weights_data")?)
    } else {
        None
    };

    Ok(Entity::Curve(CurveEntity::BSpline(BSplineCurve {
        degree,
        control_points,
        weights,
        knots,
        closed: matches!(loader.logical("closed_curve"), Ok(Some(true))),
    })))
}

fn load_trimmed_curve(loader: &mut Loader<'_>) -> Result<Entity> {
    let basis = loader.entity("basis_curve")?;
    let trim_1 = loader.trimming("trim_1")?;
    let trim_2 = loader.trimming("trim_2")?;
    if trim_1.is_empty() {
        return Err(loader.missing("trim_1"));
    }
    if trim_2.is_empty() {
        return Err(loader.missing("trim_2"));
    }
    Ok(Entity::TrimmedCurve(TrimmedCurve {
        basis,
        trim_1,
        trim_2,
        sense_agreement: loader.boolean("sense_agreement")?,
        master_representation: TrimPreference::from_step(
            loader.optional_enumeration("master_representation")?,
        ),
    }))
}

fn load_surface_curve(loader: &mut Loader<'_>) -> Result<Entity> {
    Ok(Entity::SurfaceCurve(SurfaceCurve {
        curve_3d: loader.entity("curve_3d")?,
    }))
}

pub(crate) fn register(registry: &mut Registry) {
    registry.register("LINE", load_line);
    for name in ["CIRCLE", "ELLIPSE", "PARABOLA", "HYPERBOLA"] {
        registry.register(name, load_conic);
    }
    registry.register("POLYLINE", load_polyline);
    for name in [
        "B_SPLINE_CURVE_WITH_KNOTS",
        "BEZIER_CURVE",
        "UNIFORM_CURVE",
        "QUASI_UNIFORM_CURVE",
        "RATIONAL_B_SPLINE_CURVE_WITH_KNOTS",
        "RATIONAL_BEZIER_CURVE",
        "RATIONAL_UNIFORM_CURVE",
        "RATIONAL_QUASI_UNIFORM_CURVE",
    ] {
        registry.register(name, load_b_spline_curve);
    }
    registry.register("TRIMMED_CURVE", load_trimmed_curve);
    for name in ["SURFACE_CURVE", "SEAM_CURVE", "INTERSECTION_CURVE"] {
        registry.register(name, load_surface_curve);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::Factory;
    use crate::units::LocalUnits;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};
    use step_brep_core::StepFile;
    use step_brep_geometry::Brep;

    fn file(data: &str) -> StepFile {
        let content = format!(
            "ISO-10303-21;\nHEADER;\nFILE_SCHEMA(('CONFIG_CONTROL_DESIGN'));\nENDSEC;\nDATA;\n{}\nENDSEC;\nEND-ISO-10303-21;\n",
            data
        );
        StepFile::parse(&content).unwrap()
    }

    const CIRCLE: &str = "#1=CARTESIAN_POINT('',(0.,0.,0.));
#2=DIRECTION('',(0.,0.,1.));
#3=DIRECTION('',(1.,0.,0.));
#4=AXIS2_PLACEMENT_3D('',#1,#2,#3);
#5=CIRCLE('',#4,2.);
#6=CARTESIAN_POINT('',(2.,0.,0.));
#7=CARTESIAN_POINT('',(0.,2.,0.));";

    fn curve3(data: &str, id: u32, units: LocalUnits) -> Curve3 {
        let file = file(data);
        let mut factory = Factory::new();
        let key = factory.create_object(&file, id).unwrap();
        let mut brep = Brep::new();
        let ctx = ConversionContext::new(&factory, &mut brep, units, 1e-3, 8);
        ctx.curve3(key, CurveBounds::Natural).unwrap()
    }

    #[test]
    fn test_trimmed_by_points() {
        let data = format!("{}\n#8=TRIMMED_CURVE('',#5,(#6),(#7),.T.,.CARTESIAN.);", CIRCLE);
        let curve = curve3(&data, 8, LocalUnits::default());
        assert_relative_eq!(curve.start(), Point3::new(2.0, 0.0, 0.0), epsilon = 1e-9);
        assert_relative_eq!(curve.end(), Point3::new(0.0, 2.0, 0.0), epsilon = 1e-9);
        assert_relative_eq!(curve.domain.length(), FRAC_PI_2, epsilon = 1e-9);
    }

    #[test]
    fn test_trimmed_against_sense() {
        let data = format!("{}\n#8=TRIMMED_CURVE('',#5,(#6),(#7),.F.,.CARTESIAN.);", CIRCLE);
        let curve = curve3(&data, 8, LocalUnits::default());
        assert_relative_eq!(curve.start(), Point3::new(2.0, 0.0, 0.0), epsilon = 1e-9);
        assert_relative_eq!(curve.end(), Point3::new(0.0, 2.0, 0.0), epsilon = 1e-9);
        // Runs the long way round, clockwise
        assert_relative_eq!(curve.domain.length(), 3.0 * FRAC_PI_2, epsilon = 1e-9);
        let mid = curve.point_at(curve.domain.lerp(0.5));
        assert!(mid.x < 0.0 && mid.y < 0.0);
    }

    #[test]
    fn test_parameter_trims_in_degrees() {
        let data = format!(
            "{}\n#8=TRIMMED_CURVE('',#5,(PARAMETER_VALUE(0.)),(PARAMETER_VALUE(180.)),.T.,.PARAMETER.);",
            CIRCLE
        );
        let units = LocalUnits {
            plane_angle: PI / 180.0,
            ..LocalUnits::default()
        };
        let curve = curve3(&data, 8, units);
        assert_relative_eq!(curve.end(), Point3::new(-2.0, 0.0, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn test_mixed_trims() {
        let data = format!(
            "{}\n#8=TRIMMED_CURVE('',#5,(PARAMETER_VALUE(0.)),(#7),.T.,.UNSPECIFIED.);",
            CIRCLE
        );
        let curve = curve3(&data, 8, LocalUnits::default());
        assert_relative_eq!(curve.end(), Point3::new(0.0, 2.0, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn test_redundant_trims_use_first() {
        let data = format!(
            "{}\n#8=TRIMMED_CURVE('',#5,(#6,PARAMETER_VALUE(1.)),(PARAMETER_VALUE(3.14159265358979),#7),.T.,.CARTESIAN.);",
            CIRCLE
        );
        let curve = curve3(&data, 8, LocalUnits::default());
        assert_relative_eq!(curve.start(), Point3::new(2.0, 0.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(curve.end(), Point3::new(-2.0, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_b_spline_knots_expanded() {
        let data = "#1=CARTESIAN_POINT('',(0.,0.,0.));
#2=CARTESIAN_POINT('',(1.,1.,0.));
#3=CARTESIAN_POINT('',(2.,0.,0.));
#4=B_SPLINE_CURVE_WITH_KNOTS('',2,(#1,#2,#3),.UNSPECIFIED.,.F.,.F.,(3,3),(0.,1.),.UNSPECIFIED.);";
        let file = file(data);
        let mut factory = Factory::new();
        let key = factory.create_object(&file, 4).unwrap();
        match factory.entity(key).unwrap() {
            Entity::Curve(CurveEntity::BSpline(spline)) => {
                assert_eq!(spline.degree, 2);
                assert_eq!(spline.knots, vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
                assert!(spline.weights.is_none());
                assert!(!spline.closed);
            }
            other => panic!("unexpected {:?}", other),
        }
        let curve = curve3(data, 4, LocalUnits::default());
        assert_relative_eq!(curve.end(), Point3::new(2.0, 0.0, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn test_rational_complex_curve() {
        let data = "#1=CARTESIAN_POINT('',(1.,0.,0.));
#2=CARTESIAN_POINT('',(1.,1.,0.));
#3=CARTESIAN_POINT('',(0.,1.,0.));
#4=(BOUNDED_CURVE() B_SPLINE_CURVE(2,(#1,#2,#3),.CIRCULAR_ARC.,.F.,.F.) B_SPLINE_CURVE_WITH_KNOTS((3,3),(0.,1.),.UNSPECIFIED.) CURVE() GEOMETRIC_REPRESENTATION_ITEM() RATIONAL_B_SPLINE_CURVE((1.,0.707106781186548,1.)) REPRESENTATION_ITEM(''));";
        let curve = curve3(data, 4, LocalUnits::default());
        let mid = curve.point_at(curve.domain.lerp(0.5));
        assert_relative_eq!(mid.coords.norm(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_polyline_in_inches() {
        let data = "#1=CARTESIAN_POINT('',(0.,0.,0.));
#2=CARTESIAN_POINT('',(1.,0.,0.));
#3=CARTESIAN_POINT('',(1.,1.,0.));
#4=POLYLINE('',(#1,#2,#3));";
        let units = LocalUnits {
            length: 25.4,
            ..LocalUnits::default()
        };
        let curve = curve3(data, 4, units);
        assert_relative_eq!(curve.end(), Point3::new(25.4, 25.4, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn test_empty_trim_list_rejected() {
        let data = format!("{}\n#8=TRIMMED_CURVE('',#5,(),(#7),.T.,.CARTESIAN.);", CIRCLE);
        let file = file(&data);
        let mut factory = Factory::new();
        let err = factory.create_object(&file, 8).unwrap_err();
        assert!(matches!(
            err.root_cause(),
            Error::MissingAttribute {
                attribute: "trim_1",
                ..
            }
        ));
    }
}
