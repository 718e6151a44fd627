// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Rational B-spline curves and surfaces
//!
//! Evaluation uses the Cox-de Boor recursion restricted to the knot span
//! containing the parameter.

use crate::error::{Error, Result};
use crate::interval::Interval;
use nalgebra::{Point3, Vector3};
use serde::Serialize;

/// Expand STEP `(knots, multiplicities)` into a flat knot vector
pub fn expand_knots(knot_values: &[f64], multiplicities: &[i64]) -> Vec<f64> {
    let mut expanded = Vec::new();
    for (knot, &mult) in knot_values.iter().zip(multiplicities.iter()) {
        for _ in 0..mult.max(0) {
            expanded.push(*knot);
        }
    }
    expanded
}

/// Knots of a uniform B-spline: `-degree, .., count`, unit spacing
pub fn uniform_knots(count: usize, degree: usize) -> Vec<f64> {
    (0..count + degree + 1)
        .map(|i| i as f64 - degree as f64)
        .collect()
}

/// Knots of a quasi-uniform B-spline: clamped ends, unit interior spacing
pub fn quasi_uniform_knots(count: usize, degree: usize) -> Vec<f64> {
    let spans = count.saturating_sub(degree);
    let mut knots = vec![0.0; degree + 1];
    knots.extend((1..spans).map(|i| i as f64));
    knots.extend(std::iter::repeat(spans as f64).take(degree + 1));
    knots
}

/// Knots of a piecewise Bezier curve: interior knots of multiplicity `degree`
pub fn bezier_knots(count: usize, degree: usize) -> Vec<f64> {
    let segments = if degree == 0 {
        count
    } else {
        (count.saturating_sub(1) / degree).max(1)
    };
    let mut knots = vec![0.0; degree + 1];
    for k in 1..segments {
        knots.extend(std::iter::repeat(k as f64).take(degree));
    }
    knots.extend(std::iter::repeat(segments as f64).take(degree + 1));
    knots
}

/// Index `k` of the span `[knots[k], knots[k+1])` containing `u`.
/// The last non-empty span is closed on the right.
fn find_span(count: usize, degree: usize, u: f64, knots: &[f64]) -> usize {
    let last = count - 1;
    if u >= knots[last + 1] {
        let mut k = last;
        while k > degree && knots[k] >= knots[last + 1] {
            k -= 1;
        }
        return k;
    }
    let mut k = degree;
    while k < last && knots[k + 1] <= u {
        k += 1;
    }
    k
}

/// B-spline basis function N(i, p) at `u`, with `span` the knot span of `u`
fn bspline_basis(i: usize, p: usize, u: f64, knots: &[f64], span: usize) -> f64 {
    if p == 0 {
        return if i == span { 1.0 } else { 0.0 };
    }
    let left = {
        let denom = knots[i + p] - knots[i];
        if denom.abs() < 1e-10 {
            0.0
        } else {
            (u - knots[i]) / denom * bspline_basis(i, p - 1, u, knots, span)
        }
    };
    let right = {
        let denom = knots[i + p + 1] - knots[i + 1];
        if denom.abs() < 1e-10 {
            0.0
        } else {
            (knots[i + p + 1] - u) / denom * bspline_basis(i + 1, p - 1, u, knots, span)
        }
    };
    left + right
}

/// Non-zero basis values at `u`: (first index, values for first..=first+degree)
fn basis_functions(count: usize, degree: usize, u: f64, knots: &[f64]) -> (usize, Vec<f64>) {
    let span = find_span(count, degree, u, knots);
    let first = span - degree;
    let values = (first..=span)
        .map(|i| bspline_basis(i, degree, u, knots, span))
        .collect();
    (first, values)
}

fn check_knots(count: usize, degree: usize, knots: &[f64], what: &str) -> Result<()> {
    if count <= degree {
        return Err(Error::InvalidCurve(format!(
            "{}: {} control points cannot carry degree {}",
            what, count, degree
        )));
    }
    if knots.len() != count + degree + 1 {
        return Err(Error::InvalidCurve(format!(
            "{}: expected {} knots, found {}",
            what,
            count + degree + 1,
            knots.len()
        )));
    }
    if knots.windows(2).any(|w| w[1] < w[0]) {
        return Err(Error::InvalidCurve(format!("{}: knots decrease", what)));
    }
    Ok(())
}

/// Rational B-spline curve
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NurbsCurve {
    pub degree: usize,
    pub control_points: Vec<Point3<f64>>,
    pub weights: Vec<f64>,
    pub knots: Vec<f64>,
}

impl NurbsCurve {
    pub fn new(
        degree: usize,
        control_points: Vec<Point3<f64>>,
        weights: Option<Vec<f64>>,
        knots: Vec<f64>,
    ) -> Result<Self> {
        let count = control_points.len();
        check_knots(count, degree, &knots, "b-spline curve")?;
        let weights = weights.unwrap_or_else(|| vec![1.0; count]);
        if weights.len() != count {
            return Err(Error::InvalidCurve(format!(
                "b-spline curve: {} weights for {} control points",
                weights.len(),
                count
            )));
        }
        Ok(Self {
            degree,
            control_points,
            weights,
            knots,
        })
    }

    /// Parameter range `[knots[p], knots[n]]`
    pub fn domain(&self) -> Interval {
        Interval::new(
            self.knots[self.degree],
            self.knots[self.control_points.len()],
        )
    }

    pub fn point_at(&self, u: f64) -> Point3<f64> {
        let u = self.domain().clamp(u);
        let (first, basis) = basis_functions(self.control_points.len(), self.degree, u, &self.knots);

        let mut sum = Vector3::zeros();
        let mut weight = 0.0;
        for (k, n) in basis.iter().enumerate() {
            let w = self.weights[first + k] * n;
            sum += self.control_points[first + k].coords * w;
            weight += w;
        }
        if weight.abs() < 1e-300 {
            return self.control_points[first];
        }
        Point3::from(sum / weight)
    }
}

/// Rational B-spline surface; `control_points[i][j]` runs along u with `i`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NurbsSurface {
    pub u_degree: usize,
    pub v_degree: usize,
    pub control_points: Vec<Vec<Point3<f64>>>,
    pub weights: Vec<Vec<f64>>,
    pub u_knots: Vec<f64>,
    pub v_knots: Vec<f64>,
}

impl NurbsSurface {
    pub fn new(
        u_degree: usize,
        v_degree: usize,
        control_points: Vec<Vec<Point3<f64>>>,
        weights: Option<Vec<Vec<f64>>>,
        u_knots: Vec<f64>,
        v_knots: Vec<f64>,
    ) -> Result<Self> {
        let nu = control_points.len();
        let nv = control_points.first().map(Vec::len).unwrap_or(0);
        if control_points.iter().any(|row| row.len() != nv) {
            return Err(Error::InvalidSurface(
                "b-spline surface: ragged control net".into(),
            ));
        }
        check_knots(nu, u_degree, &u_knots, "b-spline surface (u)")
            .and_then(|_| check_knots(nv, v_degree, &v_knots, "b-spline surface (v)"))
            .map_err(|e| Error::InvalidSurface(e.to_string()))?;

        let weights = weights.unwrap_or_else(|| vec![vec![1.0; nv]; nu]);
        if weights.len() != nu || weights.iter().any(|row| row.len() != nv) {
            return Err(Error::InvalidSurface(
                "b-spline surface: weights do not match control net".into(),
            ));
        }

        Ok(Self {
            u_degree,
            v_degree,
            control_points,
            weights,
            u_knots,
            v_knots,
        })
    }

    pub fn domain_u(&self) -> Interval {
        Interval::new(
            self.u_knots[self.u_degree],
            self.u_knots[self.control_points.len()],
        )
    }

    pub fn domain_v(&self) -> Interval {
        Interval::new(
            self.v_knots[self.v_degree],
            self.v_knots[self.control_points[0].len()],
        )
    }

    pub fn point_at(&self, u: f64, v: f64) -> Point3<f64> {
        let u = self.domain_u().clamp(u);
        let v = self.domain_v().clamp(v);
        let nu = self.control_points.len();
        let nv = self.control_points[0].len();
        let (fu, bu) = basis_functions(nu, self.u_degree, u, &self.u_knots);
        let (fv, bv) = basis_functions(nv, self.v_degree, v, &self.v_knots);

        let mut sum = Vector3::zeros();
        let mut weight = 0.0;
        for (a, nu_val) in bu.iter().enumerate() {
            for (b, nv_val) in bv.iter().enumerate() {
                let w = self.weights[fu + a][fv + b] * nu_val * nv_val;
                sum += self.control_points[fu + a][fv + b].coords * w;
                weight += w;
            }
        }
        if weight.abs() < 1e-300 {
            return self.control_points[fu][fv];
        }
        Point3::from(sum / weight)
    }
}
