// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Structural and geometric self-consistency checks of a [`Brep`]

use crate::brep::{Brep, LoopKind, TrimKind};
use crate::interval::periodic_difference;
use crate::pullback::uv_tolerance;
use nalgebra::Point2;
use rustc_hash::FxHashMap;
use serde::Serialize;
use smallvec::SmallVec;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}", tag, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    fn error(&mut self, message: String) {
        self.issues.push(ValidationIssue {
            severity: Severity::Error,
            message,
        });
    }

    fn warning(&mut self, message: String) {
        self.issues.push(ValidationIssue {
            severity: Severity::Warning,
            message,
        });
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    /// No errors; warnings allowed
    pub fn is_valid(&self) -> bool {
        self.error_count() == 0
    }
}

impl Brep {
    /// Check the B-rep. `tolerance` is the model-space distance within
    /// which points are considered coincident.
    pub fn validate(&self, tolerance: f64) -> ValidationReport {
        let mut report = ValidationReport::default();
        self.check_indices(&mut report);
        // Remaining checks index freely
        if !report.is_valid() {
            return report;
        }
        self.check_edges(tolerance, &mut report);
        self.check_faces(&mut report);
        for l in 0..self.loops.len() {
            self.check_loop(l, tolerance, &mut report);
        }
        self.check_shells(&mut report);
        report
    }

    fn check_indices(&self, report: &mut ValidationReport) {
        let bad = |report: &mut ValidationReport, what: String, kind: &str, index: usize| {
            report.error(format!("{} refers to missing {} {}", what, kind, index));
        };

        for (i, edge) in self.edges.iter().enumerate() {
            if edge.curve >= self.curves3d.len() {
                bad(report, format!("edge {}", i), "curve", edge.curve);
            }
            for v in [edge.start, edge.end] {
                if v >= self.vertices.len() {
                    bad(report, format!("edge {}", i), "vertex", v);
                }
            }
            for &t in &edge.trims {
                if t >= self.trims.len() {
                    bad(report, format!("edge {}", i), "trim", t);
                }
            }
        }
        for (i, trim) in self.trims.iter().enumerate() {
            match self.curves2d.get(trim.curve2d) {
                None => bad(report, format!("trim {}", i), "2d curve", trim.curve2d),
                Some(c) if c.points.is_empty() => {
                    report.error(format!("trim {} has an empty 2d curve", i))
                }
                Some(_) => {}
            }
            if let Some(e) = trim.edge {
                if e >= self.edges.len() {
                    bad(report, format!("trim {}", i), "edge", e);
                }
            } else if trim.kind == TrimKind::Edge {
                report.error(format!("trim {} follows no edge", i));
            }
            for v in trim.vertices {
                if v >= self.vertices.len() {
                    bad(report, format!("trim {}", i), "vertex", v);
                }
            }
            if trim.loop_index >= self.loops.len() {
                bad(report, format!("trim {}", i), "loop", trim.loop_index);
            }
        }
        for (i, lp) in self.loops.iter().enumerate() {
            if lp.face >= self.faces.len() {
                bad(report, format!("loop {}", i), "face", lp.face);
            }
            if lp.trims.is_empty() {
                report.error(format!("loop {} has no trims", i));
            }
            for &t in &lp.trims {
                match self.trims.get(t) {
                    None => bad(report, format!("loop {}", i), "trim", t),
                    Some(trim) if trim.loop_index != i => report.error(format!(
                        "loop {} lists trim {} which belongs to loop {}",
                        i, t, trim.loop_index
                    )),
                    Some(_) => {}
                }
            }
        }
        for (i, face) in self.faces.iter().enumerate() {
            if face.surface >= self.surfaces.len() {
                bad(report, format!("face {}", i), "surface", face.surface);
            }
            for &l in &face.loops {
                match self.loops.get(l) {
                    None => bad(report, format!("face {}", i), "loop", l),
                    Some(lp) if lp.face != i => report.error(format!(
                        "face {} lists loop {} which belongs to face {}",
                        i, l, lp.face
                    )),
                    Some(_) => {}
                }
            }
        }
        for (i, shell) in self.shells.iter().enumerate() {
            for &f in &shell.faces {
                if f >= self.faces.len() {
                    bad(report, format!("shell {}", i), "face", f);
                }
            }
        }
    }

    fn check_edges(&self, tolerance: f64, report: &mut ValidationReport) {
        for (i, edge) in self.edges.iter().enumerate() {
            let curve = &self.curves3d[edge.curve];
            for (end, v, p) in [
                ("start", edge.start, curve.start()),
                ("end", edge.end, curve.end()),
            ] {
                let vertex = &self.vertices[v];
                let gap = (p - vertex.point).norm();
                if gap > tolerance.max(vertex.tolerance) {
                    report.error(format!(
                        "edge {} curve {} is {:.3e} from vertex {}",
                        i, end, gap, v
                    ));
                }
            }
        }
    }

    fn check_faces(&self, report: &mut ValidationReport) {
        for (i, face) in self.faces.iter().enumerate() {
            let outer = face
                .loops
                .iter()
                .filter(|&&l| self.loops[l].kind == LoopKind::Outer)
                .count();
            if outer != 1 {
                report.error(format!("face {} has {} outer loops", i, outer));
            }
        }
    }

    fn check_loop(&self, l: usize, tolerance: f64, report: &mut ValidationReport) {
        let lp = &self.loops[l];
        let face = &self.faces[lp.face];
        let surface = &self.surfaces[face.surface];
        let (pu, pv) = surface.period();

        let mut bounds_min = Point2::new(f64::INFINITY, f64::INFINITY);
        let mut bounds_max = Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for &t in &lp.trims {
            for uv in &self.curves2d[self.trims[t].curve2d].points {
                bounds_min = bounds_min.inf(uv);
                bounds_max = bounds_max.sup(uv);
            }
        }
        let loop_extent = (bounds_max - bounds_min).amax();
        let uv_tol = uv_tolerance(surface.extent().max(loop_extent));

        let ends = |t: usize| {
            let points = &self.curves2d[self.trims[t].curve2d].points;
            (points[0], points[points.len() - 1])
        };

        let n = lp.trims.len();
        for (k, &t) in lp.trims.iter().enumerate() {
            let trim = &self.trims[t];
            let next_index = lp.trims[(k + 1) % n];
            let next = &self.trims[next_index];

            if trim.vertices[1] != next.vertices[0] {
                report.error(format!(
                    "loop {}: trim {} ends at vertex {} but trim {} starts at vertex {}",
                    l, t, trim.vertices[1], next_index, next.vertices[0]
                ));
            }

            let (start_uv, end_uv) = ends(t);
            for (uv, v) in [(start_uv, trim.vertices[0]), (end_uv, trim.vertices[1])] {
                let vertex = &self.vertices[v];
                let gap = (surface.point_at(uv.x, uv.y) - vertex.point).norm();
                if gap > tolerance.max(vertex.tolerance) {
                    report.error(format!(
                        "loop {}: trim {} maps {:.3e} away from vertex {}",
                        l, t, gap, v
                    ));
                }
            }

            let (next_start, _) = ends(next_index);
            let du = periodic_difference(next_start.x, end_uv.x, pu).abs();
            let dv = periodic_difference(next_start.y, end_uv.y, pv).abs();
            if du > uv_tol || dv > uv_tol {
                report.error(format!(
                    "loop {}: gap of ({:.3e}, {:.3e}) in parameter space after trim {}",
                    l, du, dv, t
                ));
            }
        }

        self.check_orientation(l, uv_tol, report);
    }

    /// Outer loops run counter-clockwise in parameter space for a face
    /// along its surface normal; inner loops run the other way
    fn check_orientation(&self, l: usize, uv_tol: f64, report: &mut ValidationReport) {
        let lp = &self.loops[l];
        let first = self.curves2d[self.trims[lp.trims[0]].curve2d].points[0];
        let last_curve = &self.curves2d[self.trims[lp.trims[lp.trims.len() - 1]].curve2d];
        let last = last_curve.points[last_curve.points.len() - 1];
        // Loops closing only modulo a period wrap around the surface
        if (last - first).amax() > uv_tol {
            return;
        }

        let twice_area: f64 = lp
            .trims
            .iter()
            .map(|&t| self.curves2d[self.trims[t].curve2d].area_term())
            .sum();
        if twice_area.abs() <= uv_tol * uv_tol {
            return;
        }

        let reversed = self.faces[lp.face].reversed;
        let expected_positive = (lp.kind == LoopKind::Outer) != reversed;
        if (twice_area > 0.0) != expected_positive {
            report.warning(format!(
                "loop {} of face {} runs {} in parameter space",
                l,
                lp.face,
                if twice_area > 0.0 { "counter-clockwise" } else { "clockwise" }
            ));
        }
    }

    fn check_shells(&self, report: &mut ValidationReport) {
        for (i, shell) in self.shells.iter().enumerate() {
            if !shell.closed {
                continue;
            }
            let mut uses: FxHashMap<usize, SmallVec<[bool; 2]>> = FxHashMap::default();
            for &f in &shell.faces {
                for &l in &self.faces[f].loops {
                    for &t in &self.loops[l].trims {
                        let trim = &self.trims[t];
                        if let Some(e) = trim.edge {
                            uses.entry(e).or_default().push(trim.reversed);
                        }
                    }
                }
            }
            let mut edges: Vec<_> = uses.into_iter().collect();
            edges.sort_unstable_by_key(|(e, _)| *e);
            for (e, flags) in edges {
                match flags.as_slice() {
                    [a, b] if a != b => {}
                    [_, _] => report.error(format!(
                        "shell {}: edge {} is used twice in the same direction",
                        i, e
                    )),
                    _ => report.error(format!(
                        "shell {}: edge {} is used {} times",
                        i,
                        e,
                        flags.len()
                    )),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{Curve2, Curve3, CurveGeometry};
    use crate::frame::Frame;
    use crate::surface::{Surface, SurfaceGeometry};
    use nalgebra::Point3;

    /// Unit square face on the XY plane, counter-clockwise
    fn square() -> Brep {
        let mut brep = Brep::new();
        let corners = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let vertices: Vec<usize> = corners.iter().map(|p| brep.add_vertex(*p, 1e-6)).collect();
        let s = brep.add_surface(Surface::new(SurfaceGeometry::Plane {
            frame: Frame::default(),
        }));
        let f = brep.add_face(s, false).unwrap();
        let l = brep.add_loop(f, LoopKind::Outer).unwrap();
        for k in 0..4 {
            let (a, b) = (corners[k], corners[(k + 1) % 4]);
            let line = CurveGeometry::line(a, b - a).unwrap();
            let c = brep.add_curve3(Curve3::natural(line));
            let e = brep.add_edge(c, vertices[k], vertices[(k + 1) % 4]).unwrap();
            let c2 = brep.add_curve2(Curve2::new(vec![
                Point2::new(a.x, a.y),
                Point2::new(b.x, b.y),
            ]));
            brep.add_trim(l, e, false, c2).unwrap();
        }
        brep.fit_surface_domain(f).unwrap();
        brep
    }

    #[test]
    fn test_square_is_valid() {
        let brep = square();
        let report = brep.validate(1e-6);
        assert!(report.is_valid(), "{:?}", report.issues);
        assert_eq!(report.warning_count(), 0);
    }

    #[test]
    fn test_open_face_set_in_closed_shell() {
        let mut brep = square();
        brep.add_shell(vec![0], true, false).unwrap();
        let report = brep.validate(1e-6);
        assert_eq!(report.error_count(), 4);
        assert!(report.errors().all(|i| i.message.contains("used 1 times")));
    }

    #[test]
    fn test_reversed_face_orientation_warns() {
        let mut brep = square();
        brep.faces[0].reversed = true;
        let report = brep.validate(1e-6);
        assert!(report.is_valid());
        assert_eq!(report.warning_count(), 1);
    }

    #[test]
    fn test_broken_chain_is_an_error() {
        let mut brep = square();
        brep.trims[1].vertices = [3, 2];
        let report = brep.validate(1e-6);
        assert!(!report.is_valid());
        assert!(report
            .errors()
            .any(|i| i.message.contains("ends at vertex")));
    }

    #[test]
    fn test_dangling_index_stops_validation() {
        let mut brep = square();
        brep.edges[0].curve = 42;
        let report = brep.validate(1e-6);
        assert_eq!(report.error_count(), 1);
        assert!(report.issues[0].message.contains("missing curve 42"));
    }
}
