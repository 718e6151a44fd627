// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Boundary representation container
//!
//! Parallel arrays addressed by index. Topology refers to geometry and to
//! other topology only through indices into these arrays.

use crate::curve::{Curve2, Curve3};
use crate::error::{Error, Result};
use crate::surface::Surface;
use nalgebra::Point3;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vertex {
    pub point: Point3<f64>,
    pub tolerance: f64,
    /// Edges ending at this vertex
    pub edges: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    /// Index into `curves3d`; the curve runs from `start` to `end`
    pub curve: usize,
    pub start: usize,
    pub end: usize,
    /// Trims using this edge
    pub trims: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrimKind {
    /// Follows an edge
    Edge,
    /// Zero-length in model space: a pole or apex of the surface
    Singular,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trim {
    pub kind: TrimKind,
    pub edge: Option<usize>,
    /// Start and end vertex in loop direction
    pub vertices: [usize; 2],
    /// Whether the loop runs against the edge direction
    pub reversed: bool,
    /// Index into `curves2d`
    pub curve2d: usize,
    pub loop_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoopKind {
    Outer,
    Inner,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Loop {
    pub kind: LoopKind,
    pub face: usize,
    pub trims: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Face {
    pub surface: usize,
    pub loops: Vec<usize>,
    /// Face normal opposes the surface normal
    pub reversed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Shell {
    pub faces: Vec<usize>,
    pub closed: bool,
    /// Bounds a cavity of the solid
    pub void: bool,
}

/// Element counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BrepStats {
    pub vertices: usize,
    pub edges: usize,
    pub trims: usize,
    pub loops: usize,
    pub faces: usize,
    pub shells: usize,
    pub curves3d: usize,
    pub curves2d: usize,
    pub surfaces: usize,
}

/// Axis-aligned bounds of a B-rep
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl BoundingBox {
    fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    fn include(&mut self, p: &Point3<f64>) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Brep {
    pub vertices: Vec<Vertex>,
    pub curves3d: Vec<Curve3>,
    pub curves2d: Vec<Curve2>,
    pub surfaces: Vec<Surface>,
    pub edges: Vec<Edge>,
    pub trims: Vec<Trim>,
    pub loops: Vec<Loop>,
    pub faces: Vec<Face>,
    pub shells: Vec<Shell>,
}

fn check(kind: &'static str, index: usize, len: usize) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(Error::IndexOutOfRange { kind, index })
    }
}

impl Brep {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, point: Point3<f64>, tolerance: f64) -> usize {
        self.vertices.push(Vertex {
            point,
            tolerance,
            edges: Vec::new(),
        });
        self.vertices.len() - 1
    }

    pub fn add_curve3(&mut self, curve: Curve3) -> usize {
        self.curves3d.push(curve);
        self.curves3d.len() - 1
    }

    pub fn add_curve2(&mut self, curve: Curve2) -> usize {
        self.curves2d.push(curve);
        self.curves2d.len() - 1
    }

    pub fn add_surface(&mut self, surface: Surface) -> usize {
        self.surfaces.push(surface);
        self.surfaces.len() - 1
    }

    pub fn add_edge(&mut self, curve: usize, start: usize, end: usize) -> Result<usize> {
        check("curve", curve, self.curves3d.len())?;
        check("vertex", start, self.vertices.len())?;
        check("vertex", end, self.vertices.len())?;
        let index = self.edges.len();
        self.edges.push(Edge {
            curve,
            start,
            end,
            trims: Vec::new(),
        });
        self.vertices[start].edges.push(index);
        if end != start {
            self.vertices[end].edges.push(index);
        }
        Ok(index)
    }

    pub fn add_face(&mut self, surface: usize, reversed: bool) -> Result<usize> {
        check("surface", surface, self.surfaces.len())?;
        self.faces.push(Face {
            surface,
            loops: Vec::new(),
            reversed,
        });
        Ok(self.faces.len() - 1)
    }

    pub fn add_loop(&mut self, face: usize, kind: LoopKind) -> Result<usize> {
        check("face", face, self.faces.len())?;
        let index = self.loops.len();
        self.loops.push(Loop {
            kind,
            face,
            trims: Vec::new(),
        });
        self.faces[face].loops.push(index);
        Ok(index)
    }

    /// Append a trim following `edge` to `loop_index`
    pub fn add_trim(
        &mut self,
        loop_index: usize,
        edge: usize,
        reversed: bool,
        curve2d: usize,
    ) -> Result<usize> {
        check("loop", loop_index, self.loops.len())?;
        check("edge", edge, self.edges.len())?;
        check("2d curve", curve2d, self.curves2d.len())?;
        let e = &self.edges[edge];
        let vertices = if reversed {
            [e.end, e.start]
        } else {
            [e.start, e.end]
        };
        let index = self.push_trim(Trim {
            kind: TrimKind::Edge,
            edge: Some(edge),
            vertices,
            reversed,
            curve2d,
            loop_index,
        });
        self.edges[edge].trims.push(index);
        Ok(index)
    }

    /// Append a zero-length trim at `vertex` to `loop_index`
    pub fn add_singular_trim(
        &mut self,
        loop_index: usize,
        vertex: usize,
        curve2d: usize,
    ) -> Result<usize> {
        check("loop", loop_index, self.loops.len())?;
        check("vertex", vertex, self.vertices.len())?;
        check("2d curve", curve2d, self.curves2d.len())?;
        Ok(self.push_trim(Trim {
            kind: TrimKind::Singular,
            edge: None,
            vertices: [vertex, vertex],
            reversed: false,
            curve2d,
            loop_index,
        }))
    }

    fn push_trim(&mut self, trim: Trim) -> usize {
        let index = self.trims.len();
        self.loops[trim.loop_index].trims.push(index);
        self.trims.push(trim);
        index
    }

    pub fn add_shell(&mut self, faces: Vec<usize>, closed: bool, void: bool) -> Result<usize> {
        for &face in &faces {
            check("face", face, self.faces.len())?;
        }
        self.shells.push(Shell {
            faces,
            closed,
            void,
        });
        Ok(self.shells.len() - 1)
    }

    /// Grow the surface domain of `face` to cover its trims
    pub fn fit_surface_domain(&mut self, face: usize) -> Result<()> {
        check("face", face, self.faces.len())?;
        let surface = self.faces[face].surface;
        for &l in &self.faces[face].loops {
            for &t in &self.loops[l].trims {
                for uv in &self.curves2d[self.trims[t].curve2d].points {
                    self.surfaces[surface].include_uv(uv);
                }
            }
        }
        Ok(())
    }

    /// Turn `face` inside out: the normal flips and every loop runs the
    /// other way round
    pub fn flip_face(&mut self, face: usize) -> Result<()> {
        check("face", face, self.faces.len())?;
        self.faces[face].reversed = !self.faces[face].reversed;
        for &l in &self.faces[face].loops {
            self.loops[l].trims.reverse();
            for &t in &self.loops[l].trims {
                let trim = &mut self.trims[t];
                if trim.kind == TrimKind::Edge {
                    trim.reversed = !trim.reversed;
                }
                trim.vertices.swap(0, 1);
                self.curves2d[trim.curve2d].points.reverse();
            }
        }
        Ok(())
    }

    pub fn stats(&self) -> BrepStats {
        BrepStats {
            vertices: self.vertices.len(),
            edges: self.edges.len(),
            trims: self.trims.len(),
            loops: self.loops.len(),
            faces: self.faces.len(),
            shells: self.shells.len(),
            curves3d: self.curves3d.len(),
            curves2d: self.curves2d.len(),
            surfaces: self.surfaces.len(),
        }
    }

    /// Bounds of vertices and sampled edge curves
    pub fn bounding_box(&self) -> BoundingBox {
        let mut bounds = BoundingBox::empty();
        for vertex in &self.vertices {
            bounds.include(&vertex.point);
        }
        for edge in &self.edges {
            let curve = &self.curves3d[edge.curve];
            for t in curve.sample_parameters(16) {
                bounds.include(&curve.point_at(t));
            }
        }
        bounds
    }
}
