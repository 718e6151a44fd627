// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Topology wrappers
//!
//! Vertices, edges, loops, faces, shells and solids. Loops are built in
//! the scope of the face bound being materialized: the face and loop
//! kind come from [`ConversionContext::scope`].

use super::{Entity, Loader};
use crate::context::{BoundScope, ConversionContext, CurveBounds};
use crate::error::{Error, Result};
use crate::factory::EntityKey;
use crate::registry::Registry;
use step_brep_geometry::{pullback_edge, singular_bridge, Curve2, LoopKind};

#[derive(Debug, Clone, PartialEq)]
pub struct VertexPoint {
    pub geometry: EntityKey,
}

impl VertexPoint {
    pub(crate) fn load_on_brep(&self, ctx: &mut ConversionContext<'_>) -> Result<usize> {
        let point = ctx.point(self.geometry)?;
        let tolerance = ctx.tolerance();
        Ok(ctx.brep_mut().add_vertex(point, tolerance))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeCurve {
    pub start: EntityKey,
    pub end: EntityKey,
    pub geometry: EntityKey,
    /// Edge direction agrees with the curve direction
    pub same_sense: bool,
}

impl EdgeCurve {
    pub(crate) fn load_on_brep(&self, ctx: &mut ConversionContext<'_>) -> Result<usize> {
        let start = ctx.materialize(self.start)?;
        let end = ctx.materialize(self.end)?;
        let p0 = ctx.brep().vertices[start].point;
        let p1 = ctx.brep().vertices[end].point;
        let curve = if self.same_sense {
            ctx.curve3(self.geometry, CurveBounds::Points(p0, p1))?
        } else {
            ctx.curve3(self.geometry, CurveBounds::Points(p1, p0))?
                .reversed()
        };
        let brep = ctx.brep_mut();
        let curve = brep.add_curve3(curve);
        Ok(brep.add_edge(curve, start, end)?)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrientedEdge {
    pub edge_element: EntityKey,
    pub orientation: bool,
}

impl OrientedEdge {
    /// Index of the underlying edge; the orientation is applied by the
    /// loop using it
    pub(crate) fn load_on_brep(&self, ctx: &mut ConversionContext<'_>) -> Result<usize> {
        Ok(ctx.edge_use(self.edge_element)?.0)
    }
}

fn current_scope(ctx: &ConversionContext<'_>, what: &str) -> Result<BoundScope> {
    ctx.scope()
        .ok_or_else(|| Error::Topology(format!("{} outside of a face bound", what)))
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeLoop {
    pub edges: Vec<EntityKey>,
}

impl EdgeLoop {
    pub(crate) fn load_on_brep(&self, ctx: &mut ConversionContext<'_>) -> Result<usize> {
        let scope = current_scope(ctx, "edge loop")?;
        if self.edges.is_empty() {
            return Err(Error::Topology("empty edge loop".into()));
        }
        let mut uses = Vec::with_capacity(self.edges.len());
        for &key in &self.edges {
            uses.push(ctx.edge_use(key)?);
        }
        if !scope.orientation {
            uses.reverse();
            for (_, reversed) in &mut uses {
                *reversed = !*reversed;
            }
        }

        let samples = ctx.trim_samples();
        let tolerance = ctx.tolerance();
        let brep = ctx.brep_mut();
        let loop_index = brep.add_loop(scope.face, scope.kind)?;

        let (images, bridges) = {
            let surface = &brep.surfaces[brep.faces[scope.face].surface];
            let mut previous = None;
            let images: Vec<Curve2> = uses
                .iter()
                .map(|&(edge, reversed)| {
                    let curve = &brep.curves3d[brep.edges[edge].curve];
                    let image = pullback_edge(surface, curve, reversed, samples, previous, tolerance);
                    previous = image.end();
                    image
                })
                .collect();

            // Consecutive images meeting at a pole need a bridge along it
            let bridges: Vec<Option<(usize, Curve2)>> = (0..uses.len())
                .map(|i| {
                    let (edge, reversed) = uses[i];
                    let edge = &brep.edges[edge];
                    let vertex = if reversed { edge.start } else { edge.end };
                    let next = &images[(i + 1) % images.len()];
                    match (images[i].end(), next.start()) {
                        (Some(from), Some(to)) => singular_bridge(
                            surface,
                            from,
                            to,
                            &brep.vertices[vertex].point,
                            tolerance,
                        )
                        .map(|bridge| (vertex, bridge)),
                        _ => None,
                    }
                })
                .collect();
            (images, bridges)
        };

        for ((&(edge, reversed), image), bridge) in uses.iter().zip(images).zip(bridges) {
            let curve2d = brep.add_curve2(image);
            brep.add_trim(loop_index, edge, reversed, curve2d)?;
            if let Some((vertex, bridge)) = bridge {
                let curve2d = brep.add_curve2(bridge);
                brep.add_singular_trim(loop_index, vertex, curve2d)?;
            }
        }
        Ok(loop_index)
    }
}

/// Loop degenerated to a single vertex, e.g. the apex of a cone
#[derive(Debug, Clone, PartialEq)]
pub struct VertexLoop {
    pub vertex: EntityKey,
}

impl VertexLoop {
    pub(crate) fn load_on_brep(&self, ctx: &mut ConversionContext<'_>) -> Result<usize> {
        let scope = current_scope(ctx, "vertex loop")?;
        let vertex = ctx.materialize(self.vertex)?;
        let brep = ctx.brep_mut();
        let point = brep.vertices[vertex].point;
        let uv = brep.surfaces[brep.faces[scope.face].surface].closest_uv(&point);
        let loop_index = brep.add_loop(scope.face, scope.kind)?;
        let curve2d = brep.add_curve2(Curve2::new(vec![uv, uv]));
        brep.add_singular_trim(loop_index, vertex, curve2d)?;
        Ok(loop_index)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FaceBound {
    pub bound: EntityKey,
    pub orientation: bool,
    /// Declared as FACE_OUTER_BOUND
    pub outer: bool,
}

impl FaceBound {
    pub(crate) fn load_on_brep(&self, ctx: &mut ConversionContext<'_>) -> Result<usize> {
        let mut scope = current_scope(ctx, "face bound")?;
        scope.orientation = self.orientation;
        ctx.set_scope(Some(scope));
        ctx.build_scoped(self.bound)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    pub bounds: Vec<EntityKey>,
    pub surface: EntityKey,
    /// Face normal agrees with the surface normal
    pub same_sense: bool,
}

impl Face {
    pub(crate) fn load_on_brep(&self, ctx: &mut ConversionContext<'_>) -> Result<usize> {
        let surface = ctx.materialize(self.surface)?;
        let face = ctx.brep_mut().add_face(surface, !self.same_sense)?;

        let mut bounds = Vec::with_capacity(self.bounds.len());
        for &key in &self.bounds {
            match ctx.entity(key)? {
                Entity::FaceBound(bound) => bounds.push((key, bound.outer)),
                _ => return Err(ctx.unexpected(key, "FACE_BOUND")),
            }
        }
        // Without a declared outer bound the first one is taken as outer
        let declared_outer = bounds.iter().any(|&(_, outer)| outer);

        let saved = ctx.scope();
        for (i, &(key, outer)) in bounds.iter().enumerate() {
            let kind = if outer || (!declared_outer && i == 0) {
                LoopKind::Outer
            } else {
                LoopKind::Inner
            };
            ctx.set_scope(Some(BoundScope {
                face,
                kind,
                orientation: true,
            }));
            let result = ctx.build_scoped(key);
            ctx.set_scope(saved);
            result?;
        }

        ctx.brep_mut().fit_surface_domain(face)?;
        Ok(face)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Shell {
    pub faces: Vec<EntityKey>,
    pub closed: bool,
}

impl Shell {
    pub(crate) fn load_on_brep(&self, ctx: &mut ConversionContext<'_>) -> Result<usize> {
        let mut faces = Vec::with_capacity(self.faces.len());
        for &key in &self.faces {
            faces.push(ctx.materialize(key)?);
        }
        Ok(ctx.brep_mut().add_shell(faces, self.closed, false)?)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrientedShell {
    pub element: EntityKey,
    pub orientation: bool,
}

impl OrientedShell {
    pub(crate) fn load_on_brep(&self, ctx: &mut ConversionContext<'_>) -> Result<usize> {
        let shell = ctx.materialize(self.element)?;
        if !self.orientation {
            let brep = ctx.brep_mut();
            let faces = brep.shells[shell].faces.clone();
            for face in faces {
                brep.flip_face(face)?;
            }
        }
        Ok(shell)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Solid {
    pub outer: EntityKey,
    pub voids: Vec<EntityKey>,
}

impl Solid {
    pub(crate) fn load_on_brep(&self, ctx: &mut ConversionContext<'_>) -> Result<usize> {
        let outer = ctx.materialize(self.outer)?;
        for &key in &self.voids {
            let void = ctx.materialize(key)?;
            ctx.brep_mut().shells[void].void = true;
        }
        Ok(outer)
    }
}

fn load_vertex_point(loader: &mut Loader<'_>) -> Result<Entity> {
    Ok(Entity::VertexPoint(VertexPoint {
        geometry: loader.entity("vertex_geometry")?,
    }))
}

fn load_edge_curve(loader: &mut Loader<'_>) -> Result<Entity> {
    Ok(Entity::EdgeCurve(EdgeCurve {
        start: loader.entity("edge_start")?,
        end: loader.entity("edge_end")?,
        geometry: loader.entity("edge_geometry")?,
        same_sense: loader.boolean("same_sense")?,
    }))
}

fn load_oriented_edge(loader: &mut Loader<'_>) -> Result<Entity> {
    Ok(Entity::OrientedEdge(OrientedEdge {
        edge_element: loader.entity("edge_element")?,
        orientation: loader.boolean("orientation")?,
    }))
}

fn load_edge_loop(loader: &mut Loader<'_>) -> Result<Entity> {
    Ok(Entity::EdgeLoop(EdgeLoop {
        edges: loader.entities("edge_list")?,
    }))
}

fn load_vertex_loop(loader: &mut Loader<'_>) -> Result<Entity> {
    Ok(Entity::VertexLoop(VertexLoop {
        vertex: loader.entity("loop_vertex")?,
    }))
}

fn load_face_bound(loader: &mut Loader<'_>) -> Result<Entity> {
    Ok(Entity::FaceBound(FaceBound {
        bound: loader.entity("bound")?,
        orientation: loader.boolean("orientation")?,
        outer: loader.name() == "FACE_OUTER_BOUND",
    }))
}

fn load_face(loader: &mut Loader<'_>) -> Result<Entity> {
    Ok(Entity::Face(Face {
        bounds: loader.entities("bounds")?,
        surface: loader.entity("face_geometry")?,
        same_sense: loader.boolean("same_sense")?,
    }))
}

fn load_shell(loader: &mut Loader<'_>) -> Result<Entity> {
    if loader.name() == "ORIENTED_CLOSED_SHELL" {
        return Ok(Entity::OrientedShell(OrientedShell {
            element: loader.entity("closed_shell_element")?,
            orientation: loader.boolean("orientation")?,
        }));
    }
    Ok(Entity::Shell(Shell {
        faces: loader.entities("cfs_faces")?,
        closed: loader.name() == "CLOSED_SHELL",
    }))
}

fn load_solid(loader: &mut Loader<'_>) -> Result<Entity> {
    let voids = if loader.name() == "BREP_WITH_VOIDS" {
        loader.entities("voids")?
    } else {
        Vec::new()
    };
    Ok(Entity::Solid(Solid {
        outer: loader.entity("outer")?,
        voids,
    }))
}

pub(crate) fn register(registry: &mut Registry) {
    registry.register("VERTEX_POINT", load_vertex_point);
    registry.register("EDGE_CURVE", load_edge_curve);
    registry.register("ORIENTED_EDGE", load_oriented_edge);
    registry.register("EDGE_LOOP", load_edge_loop);
    registry.register("VERTEX_LOOP", load_vertex_loop);
    registry.register("FACE_BOUND", load_face_bound);
    registry.register("FACE_OUTER_BOUND", load_face_bound);
    registry.register("FACE_SURFACE", load_face);
    registry.register("ADVANCED_FACE", load_face);
    registry.register("CLOSED_SHELL", load_shell);
    registry.register("OPEN_SHELL", load_shell);
    registry.register("ORIENTED_CLOSED_SHELL", load_shell);
    registry.register("MANIFOLD_SOLID_BREP", load_solid);
    registry.register("BREP_WITH_VOIDS", load_solid);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::Factory;
    use crate::units::LocalUnits;
    use approx::assert_relative_eq;
    use nalgebra::Point3;
    use step_brep_core::StepFile;
    use step_brep_geometry::Brep;

    fn file(data: &str) -> StepFile {
        let content = format!(
            "ISO-10303-21;\nHEADER;\nFILE_SCHEMA(('CONFIG_CONTROL_DESIGN'));\nENDSEC;\nDATA;\n{}\nENDSEC;\nEND-ISO-10303-21;\n",
            data
        );
        StepFile::parse(&content).unwrap()
    }

    // Unit square in z = 0 on a plane with +z normal
    const SQUARE: &str = "#1=CARTESIAN_POINT('',(0.,0.,0.));
#2=CARTESIAN_POINT('',(1.,0.,0.));
#3=CARTESIAN_POINT('',(1.,1.,0.));
#4=CARTESIAN_POINT('',(0.,1.,0.));
#5=VERTEX_POINT('',#1);
#6=VERTEX_POINT('',#2);
#7=VERTEX_POINT('',#3);
#8=VERTEX_POINT('',#4);
#9=DIRECTION('',(1.,0.,0.));
#10=DIRECTION('',(0.,1.,0.));
#11=VECTOR('',#9,1.);
#12=VECTOR('',#10,1.);
#13=LINE('',#1,#11);
#14=LINE('',#2,#12);
#15=LINE('',#4,#11);
#16=LINE('',#1,#12);
#17=EDGE_CURVE('',#5,#6,#13,.T.);
#18=EDGE_CURVE('',#6,#7,#14,.T.);
#19=EDGE_CURVE('',#8,#7,#15,.T.);
#20=EDGE_CURVE('',#5,#8,#16,.T.);
#21=ORIENTED_EDGE('',*,*,#17,.T.);
#22=ORIENTED_EDGE('',*,*,#18,.T.);
#23=ORIENTED_EDGE('',*,*,#19,.F.);
#24=ORIENTED_EDGE('',*,*,#20,.F.);
#25=EDGE_LOOP('',(#21,#22,#23,#24));
#26=FACE_OUTER_BOUND('',#25,.T.);
#27=DIRECTION('',(0.,0.,1.));
#28=AXIS2_PLACEMENT_3D('',#1,#27,#9);
#29=PLANE('',#28);
#30=ADVANCED_FACE('',(#26),#29,.T.);
#31=FACE_BOUND('',#25,.F.);
#32=ADVANCED_FACE('',(#31),#29,.F.);";

    fn build(data: &str, id: u32) -> Brep {
        let file = file(data);
        let mut factory = Factory::new();
        let key = factory.create_object(&file, id).unwrap();
        let mut brep = Brep::new();
        {
            let mut ctx = ConversionContext::new(&factory, &mut brep, LocalUnits::default(), 1e-3, 8);
            ctx.materialize(key).unwrap();
        }
        brep
    }

    #[test]
    fn test_square_face() {
        let brep = build(SQUARE, 30);
        assert_eq!(brep.faces.len(), 1);
        assert_eq!(brep.vertices.len(), 4);
        assert_eq!(brep.edges.len(), 4);
        assert_eq!(brep.loops.len(), 1);
        assert_eq!(brep.loops[0].kind, LoopKind::Outer);
        assert_eq!(brep.loops[0].trims.len(), 4);
        let reversed: Vec<bool> = brep.trims.iter().map(|t| t.reversed).collect();
        assert_eq!(reversed, vec![false, false, true, true]);
        // Loop runs counter-clockwise in the plane's parameter space
        let area: f64 = brep.curves2d.iter().map(|c| c.area_term()).sum();
        assert!(area > 0.0);
        assert!(brep.validate(1e-3).is_valid());
    }

    #[test]
    fn test_reversed_bound_runs_backwards() {
        let brep = build(SQUARE, 32);
        assert!(brep.faces[0].reversed);
        // A lone FACE_BOUND is taken as the outer loop
        assert_eq!(brep.loops[0].kind, LoopKind::Outer);
        let edges: Vec<Option<usize>> = brep.trims.iter().map(|t| t.edge).collect();
        assert_eq!(edges, vec![Some(3), Some(2), Some(1), Some(0)]);
        let reversed: Vec<bool> = brep.trims.iter().map(|t| t.reversed).collect();
        assert_eq!(reversed, vec![false, false, true, true]);
        let area: f64 = brep.curves2d.iter().map(|c| c.area_term()).sum();
        assert!(area < 0.0);
    }

    fn assert_shared_loop(brep: &Brep) {
        assert_eq!(brep.faces.len(), 2);
        assert_eq!(brep.loops.len(), 2);
        assert_eq!(brep.faces[0].loops, vec![0]);
        assert_eq!(brep.faces[1].loops, vec![1]);
        assert_eq!(brep.edges.len(), 4);
        for edge in &brep.edges {
            assert_eq!(edge.trims.len(), 2);
            let [a, b] = [edge.trims[0], edge.trims[1]];
            assert_ne!(brep.trims[a].reversed, brep.trims[b].reversed);
        }
    }

    #[test]
    fn test_faces_sharing_an_edge_loop() {
        let data = format!("{}\n#33=OPEN_SHELL('',(#30,#32));", SQUARE);
        assert_shared_loop(&build(&data, 33));
    }

    #[test]
    fn test_faces_sharing_a_face_bound() {
        let data = format!(
            "{}\n#33=ADVANCED_FACE('',(#26),#29,.T.);\n#34=OPEN_SHELL('',(#30,#33));",
            SQUARE
        );
        let brep = build(&data, 34);
        assert_eq!(brep.faces.len(), 2);
        assert_eq!(brep.faces[0].loops.len(), 1);
        assert_eq!(brep.faces[1].loops.len(), 1);
        assert_eq!(brep.trims.len(), 8);
    }

    #[test]
    fn test_edge_against_curve_sense() {
        let data = "#1=CARTESIAN_POINT('',(0.,0.,0.));
#2=CARTESIAN_POINT('',(2.,0.,0.));
#3=VERTEX_POINT('',#1);
#4=VERTEX_POINT('',#2);
#5=DIRECTION('',(1.,0.,0.));
#6=VECTOR('',#5,1.);
#7=LINE('',#1,#6);
#8=EDGE_CURVE('',#4,#3,#7,.F.);";
        let brep = build(data, 8);
        let edge = &brep.edges[0];
        let curve = &brep.curves3d[edge.curve];
        assert_relative_eq!(curve.start(), brep.vertices[edge.start].point, epsilon = 1e-9);
        assert_relative_eq!(curve.end(), Point3::new(0.0, 0.0, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn test_loop_outside_face_rejected() {
        let file = file(SQUARE);
        let mut factory = Factory::new();
        let key = factory.create_object(&file, 25).unwrap();
        let mut brep = Brep::new();
        let mut ctx = ConversionContext::new(&factory, &mut brep, LocalUnits::default(), 1e-3, 8);
        let err = ctx.materialize(key).unwrap_err();
        assert!(matches!(err.root_cause(), Error::Topology(_)));
    }
}
