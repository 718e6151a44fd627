// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Parameter-space images of model-space edges
//!
//! Edges are sampled, each sample is inverted onto the surface, and
//! periodic parameters are unwrapped so that the image stays continuous
//! along the loop.

use crate::curve::{Curve2, Curve3};
use crate::interval::{periodic_difference, unwrap_periodic};
use crate::surface::{Surface, SurfaceGeometry};
use nalgebra::{Point2, Point3};

/// Parameter tolerance for a surface: absolute floor plus a share of the
/// domain extent
pub fn uv_tolerance(extent: f64) -> f64 {
    1e-6 + 1e-5 * extent
}

/// Pull `curve` (traversed backwards when `reversed`) back onto `surface`.
///
/// `previous` is the end of the preceding trim in the loop; periodic
/// parameters of the first sample are unwrapped next to it.
pub fn pullback_edge(
    surface: &Surface,
    curve: &Curve3,
    reversed: bool,
    samples: usize,
    previous: Option<Point2<f64>>,
    tolerance: f64,
) -> Curve2 {
    let use_breakpoints =
        curve.is_straight() && matches!(surface.geometry, SurfaceGeometry::Plane { .. });
    let mut parameters = if use_breakpoints {
        curve.sample_parameters(0)
    } else {
        let n = samples.max(2);
        (0..=n)
            .map(|i| curve.domain.lerp(i as f64 / n as f64))
            .collect()
    };
    if reversed {
        parameters.reverse();
    }

    let points: Vec<Point3<f64>> = parameters.iter().map(|&t| curve.point_at(t)).collect();
    let mut uvs: Vec<Point2<f64>> = points.iter().map(|p| surface.closest_uv(p)).collect();
    let singular: Vec<bool> = points
        .iter()
        .map(|p| surface.is_singular_at(p, tolerance))
        .collect();

    borrow_singular_u(&mut uvs, &singular);

    let (pu, pv) = surface.period();
    let mut reference = if singular.first().copied().unwrap_or(false) {
        None
    } else {
        previous
    };
    for uv in uvs.iter_mut() {
        if let Some(r) = reference {
            if let Some(period) = pu {
                uv.x = unwrap_periodic(uv.x, r.x, period);
            }
            if let Some(period) = pv {
                uv.y = unwrap_periodic(uv.y, r.y, period);
            }
        }
        reference = Some(*uv);
    }

    Curve2::new(uvs)
}

/// At a singular point u is arbitrary; take it from the nearest regular
/// sample so the image approaches the degenerate side straight on
fn borrow_singular_u(uvs: &mut [Point2<f64>], singular: &[bool]) {
    let regular: Vec<usize> = (0..uvs.len()).filter(|&i| !singular[i]).collect();
    if regular.is_empty() {
        return;
    }
    for i in 0..uvs.len() {
        if !singular[i] {
            continue;
        }
        let nearest = regular
            .iter()
            .copied()
            .min_by_key(|&j| j.abs_diff(i))
            .unwrap_or(i);
        uvs[i].x = uvs[nearest].x;
    }
}

/// Parameter-space segment bridging two consecutive trims that meet at a
/// singular point `p` of the surface, if their images do not already meet
pub fn singular_bridge(
    surface: &Surface,
    from: Point2<f64>,
    to: Point2<f64>,
    p: &Point3<f64>,
    tolerance: f64,
) -> Option<Curve2> {
    if !surface.is_singular_at(p, tolerance) {
        return None;
    }
    let (pu, pv) = surface.period();
    let du = periodic_difference(to.x, from.x, pu).abs();
    let dv = periodic_difference(to.y, from.y, pv).abs();
    let tol = uv_tolerance(surface.extent().max(1.0));
    if du <= tol && dv <= tol {
        return None;
    }
    Some(Curve2::new(vec![from, to]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::CurveGeometry;
    use crate::frame::Frame;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use std::f64::consts::{FRAC_PI_2, TAU};

    fn cylinder() -> Surface {
        Surface::new(SurfaceGeometry::Cylinder {
            frame: Frame::default(),
            radius: 1.0,
        })
    }

    #[test]
    fn test_line_on_plane_is_exact() {
        let plane = Surface::new(SurfaceGeometry::Plane {
            frame: Frame::default(),
        });
        let line = CurveGeometry::line(Point3::origin(), Vector3::new(2.0, 1.0, 0.0)).unwrap();
        let image = pullback_edge(&plane, &Curve3::natural(line), true, 24, None, 1e-6);
        assert_eq!(image.points.len(), 2);
        assert_relative_eq!(image.points[0], Point2::new(2.0, 1.0));
        assert_relative_eq!(image.points[1], Point2::new(0.0, 0.0));
    }

    #[test]
    fn test_full_circle_unwraps_across_seam() {
        let circle = Curve3::natural(CurveGeometry::Circle {
            frame: Frame::default(),
            radius: 1.0,
        });
        let image = pullback_edge(&cylinder(), &circle, false, 24, None, 1e-6);
        let start = image.start().unwrap();
        let end = image.end().unwrap();
        assert_relative_eq!(end.x - start.x, TAU, epsilon = 1e-9);
        assert!(image.points.windows(2).all(|w| w[1].x > w[0].x));
    }

    #[test]
    fn test_seam_follows_previous_trim() {
        let seam = Curve3::natural(
            CurveGeometry::line(Point3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 3.0)).unwrap(),
        );
        let image = pullback_edge(&cylinder(), &seam, false, 4, Some(Point2::new(TAU, 0.0)), 1e-6);
        for uv in &image.points {
            assert_relative_eq!(uv.x, TAU, epsilon = 1e-12);
        }
        assert_relative_eq!(image.end().unwrap().y, 3.0);
    }

    #[test]
    fn test_meridian_to_pole_borrows_u() {
        let sphere = Surface::new(SurfaceGeometry::Sphere {
            frame: Frame::default(),
            radius: 1.0,
        });
        let meridian = Curve3::new(
            CurveGeometry::Circle {
                frame: Frame::new(Point3::origin(), Some(-Vector3::y()), Some(Vector3::x()))
                    .unwrap(),
                radius: 1.0,
            },
            crate::interval::Interval::new(0.0, FRAC_PI_2),
        );
        let image = pullback_edge(&sphere, &meridian, false, 8, None, 1e-6);
        let pole = image.end().unwrap();
        assert_relative_eq!(pole.y, FRAC_PI_2, epsilon = 1e-9);
        assert_relative_eq!(pole.x, 0.0, epsilon = 1e-9);

        let bridge = singular_bridge(
            &sphere,
            pole,
            Point2::new(1.0, FRAC_PI_2),
            &Point3::new(0.0, 0.0, 1.0),
            1e-6,
        );
        assert!(bridge.is_some());
    }
}
