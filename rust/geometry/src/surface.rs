// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parametric surfaces
//!
//! Elementary surfaces use the angle-based parametrizations of their
//! placement frame; swept surfaces carry their profile curve.

use crate::curve::{closest_sampled, Curve3, CurveGeometry};
use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::interval::Interval;
use crate::nurbs::NurbsSurface;
use nalgebra::{Point2, Point3, Rotation3, Unit, Vector3};
use serde::Serialize;
use std::f64::consts::{FRAC_PI_2, TAU};

const GRID: usize = 16;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum SurfaceGeometry {
    /// `(u, v)` are local x and y
    Plane { frame: Frame },
    /// u angle, v height
    Cylinder { frame: Frame, radius: f64 },
    /// u angle, v height; radius `radius + v tan(semi_angle)`
    Cone {
        frame: Frame,
        radius: f64,
        semi_angle: f64,
    },
    /// u longitude, v latitude in `[-pi/2, pi/2]`
    Sphere { frame: Frame, radius: f64 },
    Torus {
        frame: Frame,
        major_radius: f64,
        minor_radius: f64,
    },
    Nurbs(NurbsSurface),
    /// u follows the curve, v runs along `direction`
    LinearExtrusion {
        curve: Curve3,
        direction: Vector3<f64>,
    },
    /// u is the rotation angle, v follows the profile curve
    Revolution {
        curve: Curve3,
        axis: Frame,
    },
}

impl SurfaceGeometry {
    pub fn cone(frame: Frame, radius: f64, semi_angle: f64) -> Result<Self> {
        if !(0.0..FRAC_PI_2).contains(&semi_angle.abs()) || radius < 0.0 {
            return Err(Error::InvalidSurface(format!(
                "cone with radius {} and semi-angle {}",
                radius, semi_angle
            )));
        }
        Ok(SurfaceGeometry::Cone {
            frame,
            radius,
            semi_angle,
        })
    }

    /// Revolve `curve` about the axis through `origin` along `direction`.
    /// The frame's x axis points from the axis towards the profile.
    pub fn revolution(curve: Curve3, origin: Point3<f64>, direction: Vector3<f64>) -> Result<Self> {
        let z = direction
            .try_normalize(1e-12)
            .ok_or_else(|| Error::InvalidSurface("zero length revolution axis".into()))?;
        let mid_point = curve.point_at(curve.domain.mid());
        let radial = (mid_point - origin) - z * (mid_point - origin).dot(&z);
        let reference = if radial.norm() > 1e-9 { Some(radial) } else { None };
        let axis = Frame::new(origin, Some(z), reference)?;
        Ok(SurfaceGeometry::Revolution { curve, axis })
    }

    pub fn evaluate(&self, u: f64, v: f64) -> Point3<f64> {
        match self {
            SurfaceGeometry::Plane { frame } => frame.point(u, v, 0.0),
            SurfaceGeometry::Cylinder { frame, radius } => {
                frame.point(radius * u.cos(), radius * u.sin(), v)
            }
            SurfaceGeometry::Cone {
                frame,
                radius,
                semi_angle,
            } => {
                let r = radius + v * semi_angle.tan();
                frame.point(r * u.cos(), r * u.sin(), v)
            }
            SurfaceGeometry::Sphere { frame, radius } => {
                let r = radius * v.cos();
                frame.point(r * u.cos(), r * u.sin(), radius * v.sin())
            }
            SurfaceGeometry::Torus {
                frame,
                major_radius,
                minor_radius,
            } => {
                let r = major_radius + minor_radius * v.cos();
                frame.point(r * u.cos(), r * u.sin(), minor_radius * v.sin())
            }
            SurfaceGeometry::Nurbs(nurbs) => nurbs.point_at(u, v),
            SurfaceGeometry::LinearExtrusion { curve, direction } => {
                curve.point_at(u) + direction * v
            }
            SurfaceGeometry::Revolution { curve, axis } => {
                let rotation = Rotation3::from_axis_angle(&Unit::new_unchecked(axis.z), u);
                axis.origin + rotation * (curve.point_at(v) - axis.origin)
            }
        }
    }

    /// Periods in u and v
    pub fn period(&self) -> (Option<f64>, Option<f64>) {
        match self {
            SurfaceGeometry::Cylinder { .. }
            | SurfaceGeometry::Cone { .. }
            | SurfaceGeometry::Sphere { .. } => (Some(TAU), None),
            SurfaceGeometry::Torus { .. } => (Some(TAU), Some(TAU)),
            SurfaceGeometry::LinearExtrusion { curve, .. } => (curve.geometry.period(), None),
            SurfaceGeometry::Revolution { curve, .. } => (Some(TAU), curve.geometry.period()),
            SurfaceGeometry::Plane { .. } | SurfaceGeometry::Nurbs(_) => (None, None),
        }
    }

    /// Native domain; `None` where the surface is unbounded or periodic and
    /// the domain has to come from the trims
    pub fn natural_domain(&self) -> (Option<Interval>, Option<Interval>) {
        match self {
            SurfaceGeometry::Plane { .. } => (None, None),
            SurfaceGeometry::Cylinder { .. } | SurfaceGeometry::Cone { .. } => (None, None),
            SurfaceGeometry::Sphere { .. } => (None, Some(Interval::new(-FRAC_PI_2, FRAC_PI_2))),
            SurfaceGeometry::Torus { .. } => (None, None),
            SurfaceGeometry::Nurbs(nurbs) => (Some(nurbs.domain_u()), Some(nurbs.domain_v())),
            SurfaceGeometry::LinearExtrusion { curve, .. } => {
                if curve.is_periodic() || curve.geometry.is_unbounded() {
                    (None, None)
                } else {
                    (Some(curve.domain), None)
                }
            }
            SurfaceGeometry::Revolution { curve, .. } => {
                if curve.is_periodic() {
                    (None, None)
                } else {
                    (None, Some(curve.domain))
                }
            }
        }
    }

    /// Parameters of the surface point closest to `p`
    pub fn closest_uv(&self, p: &Point3<f64>) -> Point2<f64> {
        match self {
            SurfaceGeometry::Plane { frame } => {
                let local = frame.local(p);
                Point2::new(local.x, local.y)
            }
            SurfaceGeometry::Cylinder { frame, .. } => {
                let local = frame.local(p);
                Point2::new(angle(local.y, local.x), local.z)
            }
            SurfaceGeometry::Cone {
                frame,
                radius,
                semi_angle,
            } => {
                let local = frame.local(p);
                let rho = local.x.hypot(local.y);
                let t = semi_angle.tan();
                let v = ((rho - radius) * t + local.z) / (t * t + 1.0);
                Point2::new(angle(local.y, local.x), v)
            }
            SurfaceGeometry::Sphere { frame, .. } => {
                let local = frame.local(p);
                let rho = local.x.hypot(local.y);
                Point2::new(angle(local.y, local.x), local.z.atan2(rho))
            }
            SurfaceGeometry::Torus {
                frame,
                major_radius,
                ..
            } => {
                let local = frame.local(p);
                let rho = local.x.hypot(local.y);
                Point2::new(
                    angle(local.y, local.x),
                    local.z.atan2(rho - major_radius).rem_euclid(TAU),
                )
            }
            SurfaceGeometry::Nurbs(nurbs) => closest_on_grid(
                |u, v| nurbs.point_at(u, v),
                nurbs.domain_u(),
                nurbs.domain_v(),
                p,
            ),
            SurfaceGeometry::LinearExtrusion { curve, direction } => {
                let axis = direction.normalize();
                let t = match &curve.geometry {
                    CurveGeometry::Line {
                        origin,
                        direction: line,
                    } => {
                        let across = line - axis * line.dot(&axis);
                        let w = p - origin;
                        let w = w - axis * w.dot(&axis);
                        if across.norm_squared() < 1e-24 {
                            0.0
                        } else {
                            w.dot(&across) / across.norm_squared()
                        }
                    }
                    geometry => {
                        let domain = match geometry.period() {
                            Some(period) => Interval::new(0.0, period),
                            None => curve.domain,
                        };
                        // Nearest point on the ruling through each curve point
                        let ruling = |t: f64| {
                            let q = geometry.evaluate(t);
                            q + axis * (p - q).dot(&axis)
                        };
                        closest_sampled(ruling, domain, p)
                    }
                };
                let u = if curve.reversed {
                    curve.domain.min + curve.domain.max - t
                } else {
                    t
                };
                let v = (p - curve.point_at(u)).dot(direction) / direction.norm_squared();
                Point2::new(u, v)
            }
            SurfaceGeometry::Revolution { curve, axis } => {
                let local = axis.local(p);
                let u = angle(local.y, local.x);
                let rotation = Rotation3::from_axis_angle(&Unit::new_unchecked(axis.z), -u);
                let in_profile = axis.origin + rotation * (p - axis.origin);
                Point2::new(u, curve.closest_parameter(&in_profile))
            }
        }
    }

    /// Whether `p` is a degenerate point of the parametrization, where u
    /// is undefined: sphere poles, the cone apex, profile points on the
    /// revolution axis
    pub fn is_singular_at(&self, p: &Point3<f64>, tolerance: f64) -> bool {
        match self {
            SurfaceGeometry::Sphere { frame, .. } => {
                let local = frame.local(p);
                local.x.hypot(local.y) <= tolerance
            }
            SurfaceGeometry::Cone {
                frame,
                radius,
                semi_angle,
            } => {
                let apex_v = -radius / semi_angle.tan();
                apex_v.is_finite() && (frame.point(0.0, 0.0, apex_v) - p).norm() <= tolerance
            }
            SurfaceGeometry::Revolution { axis, .. } => {
                let local = axis.local(p);
                local.x.hypot(local.y) <= tolerance
            }
            _ => false,
        }
    }
}

/// Angle in `[0, 2pi)`
#[inline]
fn angle(y: f64, x: f64) -> f64 {
    y.atan2(x).rem_euclid(TAU)
}

/// Grid sampling followed by a shrinking pattern search
fn closest_on_grid(
    eval: impl Fn(f64, f64) -> Point3<f64>,
    du: Interval,
    dv: Interval,
    p: &Point3<f64>,
) -> Point2<f64> {
    let dist = |u: f64, v: f64| (eval(u, v) - p).norm_squared();
    let mut best = (du.min, dv.min);
    let mut best_d = f64::INFINITY;
    for i in 0..=GRID {
        for j in 0..=GRID {
            let u = du.lerp(i as f64 / GRID as f64);
            let v = dv.lerp(j as f64 / GRID as f64);
            let d = dist(u, v);
            if d < best_d {
                best = (u, v);
                best_d = d;
            }
        }
    }

    let mut step = (du.length() / GRID as f64, dv.length() / GRID as f64);
    let floor = 1e-13 * (1.0 + du.length().max(dv.length()));
    while step.0.max(step.1) > floor {
        let mut improved = false;
        for (su, sv) in [(1.0, 0.0), (-1.0, 0.0), (0.0, 1.0), (0.0, -1.0)] {
            let u = du.clamp(best.0 + su * step.0);
            let v = dv.clamp(best.1 + sv * step.1);
            let d = dist(u, v);
            if d < best_d {
                best = (u, v);
                best_d = d;
                improved = true;
            }
        }
        if !improved {
            step = (step.0 * 0.5, step.1 * 0.5);
        }
    }
    Point2::new(best.0, best.1)
}

/// A surface with its parameter domain.
///
/// Unbounded and periodic directions start with an empty domain that grows
/// to cover the trims of the faces using the surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Surface {
    pub geometry: SurfaceGeometry,
    pub u: Interval,
    pub v: Interval,
    #[serde(skip)]
    fitted: (bool, bool),
}

impl Surface {
    pub fn new(geometry: SurfaceGeometry) -> Self {
        let (u, v) = geometry.natural_domain();
        Self {
            fitted: (u.is_none(), v.is_none()),
            u: u.unwrap_or_else(Interval::empty),
            v: v.unwrap_or_else(Interval::empty),
            geometry,
        }
    }

    /// Grow the fitted directions of the domain to contain `uv`
    pub fn include_uv(&mut self, uv: &Point2<f64>) {
        if self.fitted.0 {
            self.u.include(uv.x);
        }
        if self.fitted.1 {
            self.v.include(uv.y);
        }
    }

    pub fn point_at(&self, u: f64, v: f64) -> Point3<f64> {
        self.geometry.evaluate(u, v)
    }

    pub fn closest_uv(&self, p: &Point3<f64>) -> Point2<f64> {
        self.geometry.closest_uv(p)
    }

    pub fn period(&self) -> (Option<f64>, Option<f64>) {
        self.geometry.period()
    }

    pub fn is_singular_at(&self, p: &Point3<f64>, tolerance: f64) -> bool {
        self.geometry.is_singular_at(p, tolerance)
    }

    /// Largest domain extent, used to scale parameter-space tolerances
    pub fn extent(&self) -> f64 {
        self.u.length().max(self.v.length())
    }
}
