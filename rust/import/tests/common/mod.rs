// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STEP text builders shared by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;

/// Accumulates DATA section instances with increasing ids
pub struct StepText {
    lines: Vec<String>,
    next: u32,
}

impl Default for StepText {
    fn default() -> Self {
        Self::new()
    }
}

fn real(v: f64) -> String {
    format!("{:?}", v)
}

fn refs(ids: &[u32]) -> String {
    ids.iter()
        .map(|id| format!("#{}", id))
        .collect::<Vec<_>>()
        .join(",")
}

impl StepText {
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            next: 1,
        }
    }

    pub fn add(&mut self, body: impl AsRef<str>) -> u32 {
        let id = self.next;
        self.next += 1;
        self.lines.push(format!("#{}={};", id, body.as_ref()));
        id
    }

    pub fn point(&mut self, p: [f64; 3]) -> u32 {
        self.add(format!(
            "CARTESIAN_POINT('',({},{},{}))",
            real(p[0]),
            real(p[1]),
            real(p[2])
        ))
    }

    pub fn direction(&mut self, d: [f64; 3]) -> u32 {
        self.add(format!(
            "DIRECTION('',({},{},{}))",
            real(d[0]),
            real(d[1]),
            real(d[2])
        ))
    }

    pub fn placement(&mut self, origin: [f64; 3], axis: [f64; 3], reference: [f64; 3]) -> u32 {
        let location = self.point(origin);
        let axis = self.direction(axis);
        let reference = self.direction(reference);
        self.add(format!(
            "AXIS2_PLACEMENT_3D('',#{},#{},#{})",
            location, axis, reference
        ))
    }

    fn angle_units(&mut self) -> (u32, u32) {
        let angle = self.add("(NAMED_UNIT(*) PLANE_ANGLE_UNIT() SI_UNIT($,.RADIAN.))");
        let solid = self.add("(NAMED_UNIT(*) SI_UNIT($,.STERADIAN.) SOLID_ANGLE_UNIT())");
        (angle, solid)
    }

    fn unit_context(&mut self, length: u32) -> u32 {
        let (angle, solid) = self.angle_units();
        let uncertainty = self.add(format!(
            "UNCERTAINTY_MEASURE_WITH_UNIT(LENGTH_MEASURE(1.E-07),#{},'distance_accuracy_value','confusion accuracy')",
            length
        ));
        self.add(format!(
            "(GEOMETRIC_REPRESENTATION_CONTEXT(3) GLOBAL_UNCERTAINTY_ASSIGNED_CONTEXT((#{})) GLOBAL_UNIT_ASSIGNED_CONTEXT((#{},#{},#{})) REPRESENTATION_CONTEXT('Context #1','3D Context with UNIT and UNCERTAINTY'))",
            uncertainty, length, angle, solid
        ))
    }

    /// Context whose length unit is the metre with `prefix`, e.g. `MILLI`
    pub fn context(&mut self, prefix: Option<&str>) -> u32 {
        let prefix = prefix.map_or("$".to_string(), |p| format!(".{}.", p));
        let length = self.add(format!(
            "(LENGTH_UNIT() NAMED_UNIT(*) SI_UNIT({},.METRE.))",
            prefix
        ));
        self.unit_context(length)
    }

    /// Context measured in inches
    pub fn inch_context(&mut self) -> u32 {
        let millimetre = self.add("(LENGTH_UNIT() NAMED_UNIT(*) SI_UNIT(.MILLI.,.METRE.))");
        let factor = self.add(format!(
            "LENGTH_MEASURE_WITH_UNIT(LENGTH_MEASURE(25.4),#{})",
            millimetre
        ));
        let exponents = self.add("DIMENSIONAL_EXPONENTS(1.,0.,0.,0.,0.,0.,0.)");
        let inch = self.add(format!(
            "(CONVERSION_BASED_UNIT('INCH',#{}) LENGTH_UNIT() NAMED_UNIT(#{}))",
            factor, exponents
        ));
        self.unit_context(inch)
    }

    /// Axis-aligned cube as a MANIFOLD_SOLID_BREP; returns the solid id
    pub fn cube(&mut self, name: &str, origin: [f64; 3], size: f64) -> u32 {
        let corner = |i: usize| {
            [
                origin[0] + size * (i & 1) as f64,
                origin[1] + size * ((i >> 1) & 1) as f64,
                origin[2] + size * ((i >> 2) & 1) as f64,
            ]
        };
        let points: Vec<u32> = (0..8).map(|i| self.point(corner(i))).collect();
        let vertices: Vec<u32> = points
            .iter()
            .map(|&p| self.add(format!("VERTEX_POINT('',#{})", p)))
            .collect();

        let mut edges = HashMap::new();
        for a in 0..8usize {
            for bit in [1usize, 2, 4] {
                if a & bit != 0 {
                    continue;
                }
                let b = a | bit;
                let mut axis = [0.0; 3];
                axis[bit.trailing_zeros() as usize] = 1.0;
                let direction = self.direction(axis);
                let vector = self.add(format!("VECTOR('',#{},{})", direction, real(size)));
                let line = self.add(format!("LINE('',#{},#{})", points[a], vector));
                let edge = self.add(format!(
                    "EDGE_CURVE('',#{},#{},#{},.T.)",
                    vertices[a], vertices[b], line
                ));
                edges.insert((a, b), edge);
            }
        }

        // Corner cycles counter-clockwise about the outward normal
        let sides: [([usize; 4], [f64; 3], [f64; 3]); 6] = [
            ([0, 2, 3, 1], [0.0, 0.0, -1.0], [1.0, 0.0, 0.0]),
            ([4, 5, 7, 6], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]),
            ([0, 1, 5, 4], [0.0, -1.0, 0.0], [1.0, 0.0, 0.0]),
            ([2, 6, 7, 3], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]),
            ([0, 4, 6, 2], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([1, 3, 7, 5], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ];
        let mut faces = Vec::new();
        for (cycle, normal, reference) in sides {
            let mut oriented = Vec::new();
            for k in 0..4 {
                let (a, b) = (cycle[k], cycle[(k + 1) % 4]);
                let oriented_edge = match edges.get(&(a, b)) {
                    Some(edge) => format!("ORIENTED_EDGE('',*,*,#{},.T.)", edge),
                    None => format!("ORIENTED_EDGE('',*,*,#{},.F.)", edges[&(b, a)]),
                };
                oriented.push(self.add(oriented_edge));
            }
            let edge_loop = self.add(format!("EDGE_LOOP('',({}))", refs(&oriented)));
            let bound = self.add(format!("FACE_OUTER_BOUND('',#{},.T.)", edge_loop));
            let position = self.placement(corner(cycle[0]), normal, reference);
            let plane = self.add(format!("PLANE('',#{})", position));
            faces.push(self.add(format!("ADVANCED_FACE('',(#{}),#{},.T.)", bound, plane)));
        }
        let shell = self.add(format!("CLOSED_SHELL('',({}))", refs(&faces)));
        self.add(format!("MANIFOLD_SOLID_BREP('{}',#{})", name, shell))
    }

    /// Cylinder standing on the xy plane with a single seam at +x
    pub fn cylinder(&mut self, name: &str, radius: f64, height: f64) -> u32 {
        let p0 = self.point([radius, 0.0, 0.0]);
        let p1 = self.point([radius, 0.0, height]);
        let v0 = self.add(format!("VERTEX_POINT('',#{})", p0));
        let v1 = self.add(format!("VERTEX_POINT('',#{})", p1));

        let bottom_axis = self.placement([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]);
        let top_axis = self.placement([0.0, 0.0, height], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]);
        let bottom_circle = self.add(format!("CIRCLE('',#{},{})", bottom_axis, real(radius)));
        let top_circle = self.add(format!("CIRCLE('',#{},{})", top_axis, real(radius)));
        let bottom_edge = self.add(format!(
            "EDGE_CURVE('',#{},#{},#{},.T.)",
            v0, v0, bottom_circle
        ));
        let top_edge = self.add(format!("EDGE_CURVE('',#{},#{},#{},.T.)", v1, v1, top_circle));

        let up = self.direction([0.0, 0.0, 1.0]);
        let vector = self.add(format!("VECTOR('',#{},1.)", up));
        let line = self.add(format!("LINE('',#{},#{})", p0, vector));
        let seam_curve = self.add(format!("SEAM_CURVE('',#{},(),.PCURVE_S1.)", line));
        let seam = self.add(format!("EDGE_CURVE('',#{},#{},#{},.T.)", v0, v1, seam_curve));

        let mut face = |text: &mut StepText, edges: &[(u32, bool)], surface: u32| {
            let oriented: Vec<u32> = edges
                .iter()
                .map(|&(edge, forward)| {
                    text.add(format!(
                        "ORIENTED_EDGE('',*,*,#{},{})",
                        edge,
                        if forward { ".T." } else { ".F." }
                    ))
                })
                .collect();
            let edge_loop = text.add(format!("EDGE_LOOP('',({}))", refs(&oriented)));
            let bound = text.add(format!("FACE_OUTER_BOUND('',#{},.T.)", edge_loop));
            text.add(format!("ADVANCED_FACE('',(#{}),#{},.T.)", bound, surface))
        };

        let bottom_position = self.placement([0.0, 0.0, 0.0], [0.0, 0.0, -1.0], [1.0, 0.0, 0.0]);
        let bottom_plane = self.add(format!("PLANE('',#{})", bottom_position));
        let top_plane = self.add(format!("PLANE('',#{})", top_axis));
        let side = self.add(format!("CYLINDRICAL_SURFACE('',#{},{})", bottom_axis, real(radius)));

        let faces = [
            face(self, &[(bottom_edge, false)], bottom_plane),
            face(self, &[(top_edge, true)], top_plane),
            face(
                self,
                &[(bottom_edge, true), (seam, true), (top_edge, false), (seam, false)],
                side,
            ),
        ];
        let shell = self.add(format!("CLOSED_SHELL('',({}))", refs(&faces)));
        self.add(format!("MANIFOLD_SOLID_BREP('{}',#{})", name, shell))
    }

    /// ADVANCED_BREP_SHAPE_REPRESENTATION over `items`, plus a placement
    /// item as real files carry
    pub fn representation(&mut self, name: &str, items: &[u32], context: u32) -> u32 {
        let placement = self.placement([0.0, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]);
        let mut all = vec![placement];
        all.extend_from_slice(items);
        self.add(format!(
            "ADVANCED_BREP_SHAPE_REPRESENTATION('{}',({}),#{})",
            name,
            refs(&all),
            context
        ))
    }

    pub fn finish(&self) -> String {
        let mut out = String::from(
            "ISO-10303-21;\nHEADER;\nFILE_DESCRIPTION(('test model'),'2;1');\n\
             FILE_NAME('model.stp','2026-01-01T00:00:00',('tester'),(''),'','','');\n\
             FILE_SCHEMA(('CONFIG_CONTROL_DESIGN'));\nENDSEC;\nDATA;\n",
        );
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str("ENDSEC;\nEND-ISO-10303-21;\n");
        out
    }
}

/// One representation holding a cube of `size` at the origin
pub fn cube_file(prefix: Option<&str>, size: f64) -> String {
    let mut text = StepText::new();
    let context = text.context(prefix);
    let solid = text.cube("cube", [0.0, 0.0, 0.0], size);
    text.representation("cube", &[solid], context);
    text.finish()
}
