// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parametric curves in model and parameter space

use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::interval::Interval;
use crate::nurbs::NurbsCurve;
use nalgebra::{Point2, Point3, Vector3};
use serde::Serialize;
use std::f64::consts::TAU;

const CLOSEST_SAMPLES: usize = 64;
const GOLDEN: f64 = 0.618_033_988_749_894_9;

/// Underlying curve geometry with its native parametrization
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum CurveGeometry {
    /// `origin + t * direction`; `direction` keeps its magnitude
    Line {
        origin: Point3<f64>,
        direction: Vector3<f64>,
    },
    /// Angle parametrization from the frame's x axis
    Circle { frame: Frame, radius: f64 },
    Ellipse {
        frame: Frame,
        semi_axis_1: f64,
        semi_axis_2: f64,
    },
    /// `c + f (t^2 x + 2 t y)`
    Parabola { frame: Frame, focal_dist: f64 },
    /// `c + a cosh(t) x + b sinh(t) y`
    Hyperbola {
        frame: Frame,
        semi_axis: f64,
        semi_imag_axis: f64,
    },
    /// Vertex `i` sits at parameter `i`
    Polyline { points: Vec<Point3<f64>> },
    Nurbs(NurbsCurve),
}

impl CurveGeometry {
    pub fn line(origin: Point3<f64>, direction: Vector3<f64>) -> Result<Self> {
        if direction.norm() < 1e-12 {
            return Err(Error::InvalidCurve("line with zero direction".into()));
        }
        Ok(CurveGeometry::Line { origin, direction })
    }

    pub fn polyline(points: Vec<Point3<f64>>) -> Result<Self> {
        if points.len() < 2 {
            return Err(Error::InvalidCurve(format!(
                "polyline needs 2 points, found {}",
                points.len()
            )));
        }
        Ok(CurveGeometry::Polyline { points })
    }

    pub fn evaluate(&self, t: f64) -> Point3<f64> {
        match self {
            CurveGeometry::Line { origin, direction } => origin + direction * t,
            CurveGeometry::Circle { frame, radius } => {
                frame.point(radius * t.cos(), radius * t.sin(), 0.0)
            }
            CurveGeometry::Ellipse {
                frame,
                semi_axis_1,
                semi_axis_2,
            } => frame.point(semi_axis_1 * t.cos(), semi_axis_2 * t.sin(), 0.0),
            CurveGeometry::Parabola { frame, focal_dist } => {
                frame.point(focal_dist * t * t, 2.0 * focal_dist * t, 0.0)
            }
            CurveGeometry::Hyperbola {
                frame,
                semi_axis,
                semi_imag_axis,
            } => frame.point(semi_axis * t.cosh(), semi_imag_axis * t.sinh(), 0.0),
            CurveGeometry::Polyline { points } => {
                let last = points.len() - 1;
                let t = t.clamp(0.0, last as f64);
                let i = (t.floor() as usize).min(last - 1);
                let s = t - i as f64;
                points[i] + (points[i + 1] - points[i]) * s
            }
            CurveGeometry::Nurbs(nurbs) => nurbs.point_at(t),
        }
    }

    /// Parameter period of closed conics
    pub fn period(&self) -> Option<f64> {
        match self {
            CurveGeometry::Circle { .. } | CurveGeometry::Ellipse { .. } => Some(TAU),
            _ => None,
        }
    }

    /// Default parameter range when nothing bounds the curve.
    /// Lines span one direction vector; open conics span `[-1, 1]`.
    pub fn natural_domain(&self) -> Interval {
        match self {
            CurveGeometry::Line { .. } => Interval::new(0.0, 1.0),
            CurveGeometry::Circle { .. } | CurveGeometry::Ellipse { .. } => {
                Interval::new(0.0, TAU)
            }
            CurveGeometry::Parabola { .. } | CurveGeometry::Hyperbola { .. } => {
                Interval::new(-1.0, 1.0)
            }
            CurveGeometry::Polyline { points } => Interval::new(0.0, (points.len() - 1) as f64),
            CurveGeometry::Nurbs(nurbs) => nurbs.domain(),
        }
    }

    /// Whether the parametrization has no natural end
    pub fn is_unbounded(&self) -> bool {
        matches!(
            self,
            CurveGeometry::Line { .. }
                | CurveGeometry::Parabola { .. }
                | CurveGeometry::Hyperbola { .. }
        )
    }

    /// Parameter of the curve point closest to `p`.
    ///
    /// Periodic results lie in `[0, period)`; bounded curves are searched
    /// within their natural domain.
    pub fn closest_parameter(&self, p: &Point3<f64>) -> f64 {
        match self {
            CurveGeometry::Line { origin, direction } => {
                (p - origin).dot(direction) / direction.norm_squared()
            }
            CurveGeometry::Circle { frame, .. } => {
                let local = frame.local(p);
                local.y.atan2(local.x).rem_euclid(TAU)
            }
            CurveGeometry::Ellipse {
                frame,
                semi_axis_1,
                semi_axis_2,
            } => {
                let local = frame.local(p);
                let guess = (local.y / semi_axis_2).atan2(local.x / semi_axis_1);
                refine(|t| (self.evaluate(t) - p).norm_squared(), guess - 0.5, guess + 0.5)
                    .rem_euclid(TAU)
            }
            CurveGeometry::Parabola { frame, focal_dist } => {
                let local = frame.local(p);
                let guess = local.y / (2.0 * focal_dist);
                let span = 0.5 * (1.0 + guess.abs());
                refine(|t| (self.evaluate(t) - p).norm_squared(), guess - span, guess + span)
            }
            CurveGeometry::Hyperbola {
                frame,
                semi_imag_axis,
                ..
            } => {
                let local = frame.local(p);
                let guess = (local.y / semi_imag_axis).asinh();
                refine(|t| (self.evaluate(t) - p).norm_squared(), guess - 0.5, guess + 0.5)
            }
            CurveGeometry::Polyline { points } => {
                let mut best = (f64::INFINITY, 0.0);
                for (i, pair) in points.windows(2).enumerate() {
                    let d = pair[1] - pair[0];
                    let len2 = d.norm_squared();
                    let s = if len2 < 1e-24 {
                        0.0
                    } else {
                        ((p - pair[0]).dot(&d) / len2).clamp(0.0, 1.0)
                    };
                    let dist = (pair[0] + d * s - p).norm_squared();
                    if dist < best.0 {
                        best = (dist, i as f64 + s);
                    }
                }
                best.1
            }
            CurveGeometry::Nurbs(nurbs) => {
                closest_sampled(|t| nurbs.point_at(t), nurbs.domain(), p)
            }
        }
    }
}

/// Golden-section minimization of `f` on `[a, b]`
fn refine(f: impl Fn(f64) -> f64, mut a: f64, mut b: f64) -> f64 {
    let mut c = b - GOLDEN * (b - a);
    let mut d = a + GOLDEN * (b - a);
    let (mut fc, mut fd) = (f(c), f(d));
    for _ in 0..80 {
        if (b - a).abs() < 1e-14 {
            break;
        }
        if fc < fd {
            b = d;
            d = c;
            fd = fc;
            c = b - GOLDEN * (b - a);
            fc = f(c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + GOLDEN * (b - a);
            fd = f(d);
        }
    }
    0.5 * (a + b)
}

/// Sample-then-refine closest point search over `domain`
pub(crate) fn closest_sampled(
    eval: impl Fn(f64) -> Point3<f64>,
    domain: Interval,
    p: &Point3<f64>,
) -> f64 {
    let step = domain.length() / CLOSEST_SAMPLES as f64;
    let (mut best_i, mut best_d) = (0, f64::INFINITY);
    for i in 0..=CLOSEST_SAMPLES {
        let d = (eval(domain.lerp(i as f64 / CLOSEST_SAMPLES as f64)) - p).norm_squared();
        if d < best_d {
            best_i = i;
            best_d = d;
        }
    }
    if step <= 0.0 {
        return domain.min;
    }
    let center = domain.lerp(best_i as f64 / CLOSEST_SAMPLES as f64);
    let a = (center - step).max(domain.min);
    let b = (center + step).min(domain.max);
    let t = refine(|t| (eval(t) - p).norm_squared(), a, b);
    // Keep exact domain ends when the refined point is no better
    if (eval(t) - p).norm_squared() <= best_d {
        t
    } else {
        center
    }
}

/// Bounded, possibly reversed use of a curve.
///
/// Parameter `s` runs over `domain`; a reversed curve evaluates its
/// geometry at `domain.min + domain.max - s`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Curve3 {
    pub geometry: CurveGeometry,
    pub domain: Interval,
    pub reversed: bool,
}

impl Curve3 {
    pub fn new(geometry: CurveGeometry, domain: Interval) -> Self {
        Self {
            geometry,
            domain,
            reversed: false,
        }
    }

    /// The curve over its natural domain
    pub fn natural(geometry: CurveGeometry) -> Self {
        let domain = geometry.natural_domain();
        Self::new(geometry, domain)
    }

    /// The curve from parameter `t0` to `t1`.
    ///
    /// A periodic curve always runs forward, so `t1` is shifted by whole
    /// periods past `t0`; an open curve with `t1 < t0` is traversed backwards.
    pub fn trimmed(geometry: CurveGeometry, t0: f64, t1: f64) -> Result<Self> {
        if !(t0.is_finite() && t1.is_finite()) {
            return Err(Error::InvalidCurve(format!(
                "non-finite trim [{}, {}]",
                t0, t1
            )));
        }
        if let Some(period) = geometry.period() {
            let mut span = (t1 - t0).rem_euclid(period);
            if span == 0.0 {
                span = period;
            }
            return Ok(Self::new(geometry, Interval::new(t0, t0 + span)));
        }
        if (t1 - t0).abs() < 1e-14 {
            return Err(Error::InvalidCurve(format!(
                "empty trim [{}, {}]",
                t0, t1
            )));
        }
        if t1 < t0 {
            Ok(Self::new(geometry, Interval::new(t1, t0)).reversed())
        } else {
            Ok(Self::new(geometry, Interval::new(t0, t1)))
        }
    }

    /// The curve from the point nearest `p0` to the point nearest `p1`.
    /// Coincident ends on a periodic curve give one full period, on a
    /// closed bounded curve its whole domain.
    pub fn between_points(
        geometry: CurveGeometry,
        p0: &Point3<f64>,
        p1: &Point3<f64>,
        tolerance: f64,
    ) -> Result<Self> {
        let coincident = (p1 - p0).norm() <= tolerance;
        if let Some(period) = geometry.period() {
            let t0 = geometry.closest_parameter(p0);
            if coincident {
                return Ok(Self::new(geometry, Interval::new(t0, t0 + period)));
            }
            let t1 = geometry.closest_parameter(p1);
            return Self::trimmed(geometry, t0, t1);
        }
        if coincident && !geometry.is_unbounded() {
            let natural = Self::natural(geometry);
            if (natural.end() - natural.start()).norm() <= tolerance {
                return Ok(natural);
            }
            return Err(Error::InvalidCurve(
                "coincident end points on an open curve".into(),
            ));
        }
        let t0 = geometry.closest_parameter(p0);
        let t1 = geometry.closest_parameter(p1);
        Self::trimmed(geometry, t0, t1)
    }

    #[inline]
    fn geometry_parameter(&self, s: f64) -> f64 {
        if self.reversed {
            self.domain.min + self.domain.max - s
        } else {
            s
        }
    }

    pub fn point_at(&self, s: f64) -> Point3<f64> {
        self.geometry.evaluate(self.geometry_parameter(s))
    }

    pub fn start(&self) -> Point3<f64> {
        self.point_at(self.domain.min)
    }

    pub fn end(&self) -> Point3<f64> {
        self.point_at(self.domain.max)
    }

    /// Same point set traversed the other way
    pub fn reversed(mut self) -> Self {
        self.reversed = !self.reversed;
        self
    }

    pub fn is_periodic(&self) -> bool {
        self.geometry.period().is_some()
    }

    /// Parameter within `domain` of the point closest to `p`
    pub fn closest_parameter(&self, p: &Point3<f64>) -> f64 {
        let mut t = match &self.geometry {
            CurveGeometry::Line { .. } | CurveGeometry::Polyline { .. } => {
                self.geometry.closest_parameter(p)
            }
            CurveGeometry::Circle { .. } | CurveGeometry::Ellipse { .. } => {
                let t = self.geometry.closest_parameter(p);
                let mut t = crate::interval::unwrap_periodic(t, self.domain.mid(), TAU);
                if !self.domain.contains(t, 1e-12) {
                    // Outside the arc: snap to the nearer end
                    let to_min = (self.geometry.evaluate(self.domain.min) - p).norm();
                    let to_max = (self.geometry.evaluate(self.domain.max) - p).norm();
                    t = if to_min <= to_max { self.domain.min } else { self.domain.max };
                }
                t
            }
            _ => closest_sampled(|t| self.geometry.evaluate(t), self.domain, p),
        };
        t = self.domain.clamp(t);
        self.geometry_parameter(t)
    }

    /// Parameters for sampling the curve with about `samples` segments.
    /// Straight pieces only yield their break points.
    pub fn sample_parameters(&self, samples: usize) -> Vec<f64> {
        let ts: Vec<f64> = match &self.geometry {
            CurveGeometry::Line { .. } => vec![self.domain.min, self.domain.max],
            CurveGeometry::Polyline { .. } => {
                let mut ts = vec![self.domain.min];
                let mut k = self.domain.min.floor() + 1.0;
                while k < self.domain.max - 1e-12 {
                    ts.push(k);
                    k += 1.0;
                }
                ts.push(self.domain.max);
                ts
            }
            _ => {
                let n = samples.max(2);
                (0..=n)
                    .map(|i| self.domain.lerp(i as f64 / n as f64))
                    .collect()
            }
        };
        if self.reversed {
            // Geometry parameters to curve parameters, ascending
            let mut ts: Vec<f64> = ts.into_iter().map(|t| self.geometry_parameter(t)).collect();
            ts.reverse();
            ts
        } else {
            ts
        }
    }

    pub fn is_straight(&self) -> bool {
        matches!(
            self.geometry,
            CurveGeometry::Line { .. } | CurveGeometry::Polyline { .. }
        )
    }
}

/// Parameter-space curve of a trim, stored as a polyline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Curve2 {
    pub points: Vec<Point2<f64>>,
}

impl Curve2 {
    pub fn new(points: Vec<Point2<f64>>) -> Self {
        Self { points }
    }

    pub fn start(&self) -> Option<Point2<f64>> {
        self.points.first().copied()
    }

    pub fn end(&self) -> Option<Point2<f64>> {
        self.points.last().copied()
    }

    /// Shoelace contribution of this piece; summed over a closed loop
    /// this is twice the enclosed signed area
    pub fn area_term(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| w[0].x * w[1].y - w[1].x * w[0].y)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn circle(radius: f64) -> CurveGeometry {
        CurveGeometry::Circle {
            frame: Frame::default(),
            radius,
        }
    }

    #[test]
    fn test_line_closest_parameter() {
        let line = CurveGeometry::line(Point3::origin(), Vector3::new(2.0, 0.0, 0.0)).unwrap();
        assert_relative_eq!(line.closest_parameter(&Point3::new(5.0, 3.0, 0.0)), 2.5);
    }

    #[test]
    fn test_circle_between_points() {
        let curve = Curve3::between_points(
            circle(2.0),
            &Point3::new(0.0, 2.0, 0.0),
            &Point3::new(-2.0, 0.0, 0.0),
            1e-6,
        )
        .unwrap();
        assert_relative_eq!(curve.domain.min, FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(curve.domain.max, PI, epsilon = 1e-12);
        assert_relative_eq!(curve.end(), Point3::new(-2.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_periodic_trim_wraps_in_one_step() {
        let curve = Curve3::trimmed(circle(1.0), 0.0, -1e17).unwrap();
        assert!(curve.domain.min == 0.0);
        assert!(curve.domain.max > 0.0 && curve.domain.max <= TAU);

        let backwards = Curve3::trimmed(circle(1.0), PI, FRAC_PI_2).unwrap();
        assert_relative_eq!(backwards.domain.max, PI + 3.0 * FRAC_PI_2, epsilon = 1e-12);

        let whole = Curve3::trimmed(circle(1.0), 1.0, 1.0).unwrap();
        assert_relative_eq!(whole.domain.length(), TAU, epsilon = 1e-12);
    }

    #[test]
    fn test_non_finite_trim_is_rejected() {
        assert!(matches!(
            Curve3::trimmed(circle(1.0), 0.0, f64::NEG_INFINITY),
            Err(Error::InvalidCurve(_))
        ));
        let line = CurveGeometry::line(Point3::origin(), Vector3::x()).unwrap();
        assert!(Curve3::trimmed(line, f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_closed_circle_spans_full_period() {
        let p = Point3::new(1.0, 0.0, 0.0);
        let curve = Curve3::between_points(circle(1.0), &p, &p, 1e-6).unwrap();
        assert_relative_eq!(curve.domain.length(), TAU, epsilon = 1e-12);
    }

    #[test]
    fn test_periodic_trim_wraps_forward() {
        let curve = Curve3::trimmed(circle(1.0), 3.0 * FRAC_PI_2, FRAC_PI_2).unwrap();
        assert_relative_eq!(curve.domain.max, 5.0 * FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(curve.point_at(2.0 * PI), Point3::new(1.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_reversed_curve_swaps_ends() {
        let line = CurveGeometry::line(Point3::origin(), Vector3::x()).unwrap();
        let curve = Curve3::trimmed(line, 4.0, 1.0).unwrap();
        assert!(curve.reversed);
        assert_relative_eq!(curve.start(), Point3::new(4.0, 0.0, 0.0));
        assert_relative_eq!(curve.end(), Point3::new(1.0, 0.0, 0.0));
        let s = curve.closest_parameter(&Point3::new(3.0, 1.0, 0.0));
        assert_relative_eq!(curve.point_at(s), Point3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn test_polyline_sampling_uses_vertices() {
        let poly = CurveGeometry::polyline(vec![
            Point3::origin(),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        ])
        .unwrap();
        let curve = Curve3::natural(poly);
        assert_eq!(curve.sample_parameters(24), vec![0.0, 1.0, 2.0]);
        assert_relative_eq!(curve.closest_parameter(&Point3::new(1.2, 0.5, 0.0)), 1.5);
    }

    #[test]
    fn test_ellipse_and_hyperbola_inversion() {
        let ellipse = CurveGeometry::Ellipse {
            frame: Frame::default(),
            semi_axis_1: 3.0,
            semi_axis_2: 1.0,
        };
        let t = ellipse.closest_parameter(&ellipse.evaluate(2.0));
        assert_relative_eq!(t, 2.0, epsilon = 1e-6);

        let hyperbola = CurveGeometry::Hyperbola {
            frame: Frame::default(),
            semi_axis: 2.0,
            semi_imag_axis: 1.0,
        };
        let t = hyperbola.closest_parameter(&hyperbola.evaluate(-0.7));
        assert_relative_eq!(t, -0.7, epsilon = 1e-6);
    }

    #[test]
    fn test_area_term_of_unit_square() {
        let square = Curve2::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
            Point2::new(0.0, 0.0),
        ]);
        assert_relative_eq!(square.area_term(), 2.0);
    }
}
