// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity wrappers
//!
//! One wrapper per supported EXPRESS type family. Constructors read the
//! decoded instance through a [`Loader`] and keep references as factory
//! keys; [`Entity::load_on_brep`] turns a wrapper into B-rep elements.

pub mod attributes;
pub mod curves;
pub mod geometry;
pub mod representation;
pub mod surfaces;
pub mod topology;
pub mod trimming;

pub use attributes::Loader;

use crate::context::ConversionContext;
use crate::error::Result;
use crate::factory::EntityKey;
use crate::registry::Registry;
use crate::units::{MeasureWithUnit, NamedUnit, UnitKind};
use curves::{CurveEntity, SurfaceCurve, TrimmedCurve};
use geometry::{CartesianPoint, Direction, Placement, Vector};
use representation::{RepresentationContext, ShapeRepresentation};
use surfaces::SurfaceEntity;
use topology::{
    EdgeCurve, EdgeLoop, Face, FaceBound, OrientedEdge, OrientedShell, Shell, Solid, VertexLoop,
    VertexPoint,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    CartesianPoint(CartesianPoint),
    Direction(Direction),
    Vector(Vector),
    Placement(Placement),
    Curve(CurveEntity),
    TrimmedCurve(TrimmedCurve),
    SurfaceCurve(SurfaceCurve),
    Surface(SurfaceEntity),
    VertexPoint(VertexPoint),
    EdgeCurve(EdgeCurve),
    OrientedEdge(OrientedEdge),
    EdgeLoop(EdgeLoop),
    VertexLoop(VertexLoop),
    FaceBound(FaceBound),
    Face(Face),
    Shell(Shell),
    OrientedShell(OrientedShell),
    Solid(Solid),
    NamedUnit(NamedUnit),
    MeasureWithUnit(MeasureWithUnit),
    Context(RepresentationContext),
    ShapeRepresentation(ShapeRepresentation),
}

impl Entity {
    /// Referenced wrappers, in attribute order
    pub fn children(&self) -> Vec<EntityKey> {
        match self {
            Entity::CartesianPoint(_) | Entity::Direction(_) => Vec::new(),
            Entity::Vector(vector) => vec![vector.orientation],
            Entity::Placement(placement) => placement.children(),
            Entity::Curve(curve) => curve.children(),
            Entity::TrimmedCurve(trimmed) => trimmed.children(),
            Entity::SurfaceCurve(surface_curve) => vec![surface_curve.curve_3d],
            Entity::Surface(surface) => surface.children(),
            Entity::VertexPoint(vertex) => vec![vertex.geometry],
            Entity::EdgeCurve(edge) => vec![edge.start, edge.end, edge.geometry],
            Entity::OrientedEdge(oriented) => vec![oriented.edge_element],
            Entity::EdgeLoop(edge_loop) => edge_loop.edges.clone(),
            Entity::VertexLoop(vertex_loop) => vec![vertex_loop.vertex],
            Entity::FaceBound(bound) => vec![bound.bound],
            Entity::Face(face) => {
                let mut children = face.bounds.clone();
                children.push(face.surface);
                children
            }
            Entity::Shell(shell) => shell.faces.clone(),
            Entity::OrientedShell(oriented) => vec![oriented.element],
            Entity::Solid(solid) => {
                let mut children = vec![solid.outer];
                children.extend_from_slice(&solid.voids);
                children
            }
            Entity::NamedUnit(unit) => match &unit.kind {
                UnitKind::ConversionBased { factor, .. } => vec![*factor],
                _ => Vec::new(),
            },
            Entity::MeasureWithUnit(measure) => vec![measure.unit],
            Entity::Context(context) => {
                let mut children = context.units.clone();
                children.extend_from_slice(&context.uncertainty);
                children
            }
            Entity::ShapeRepresentation(representation) => {
                let mut children = representation.items.clone();
                children.push(representation.context);
                children
            }
        }
    }

    /// Build the B-rep elements of this wrapper and return the index of
    /// the element it maps to; `None` for wrappers with no B-rep
    /// counterpart. Called once per wrapper through
    /// [`ConversionContext::materialize`].
    pub(crate) fn load_on_brep(&self, ctx: &mut ConversionContext<'_>) -> Result<Option<usize>> {
        match self {
            Entity::Curve(curve) => curve.load_on_brep(ctx).map(Some),
            Entity::TrimmedCurve(trimmed) => trimmed.load_on_brep(ctx).map(Some),
            Entity::SurfaceCurve(surface_curve) => surface_curve.load_on_brep(ctx).map(Some),
            Entity::Surface(surface) => surface.load_on_brep(ctx).map(Some),
            Entity::VertexPoint(vertex) => vertex.load_on_brep(ctx).map(Some),
            Entity::EdgeCurve(edge) => edge.load_on_brep(ctx).map(Some),
            Entity::OrientedEdge(oriented) => oriented.load_on_brep(ctx).map(Some),
            Entity::EdgeLoop(edge_loop) => edge_loop.load_on_brep(ctx).map(Some),
            Entity::VertexLoop(vertex_loop) => vertex_loop.load_on_brep(ctx).map(Some),
            Entity::FaceBound(bound) => bound.load_on_brep(ctx).map(Some),
            Entity::Face(face) => face.load_on_brep(ctx).map(Some),
            Entity::Shell(shell) => shell.load_on_brep(ctx).map(Some),
            Entity::OrientedShell(oriented) => oriented.load_on_brep(ctx).map(Some),
            Entity::Solid(solid) => solid.load_on_brep(ctx).map(Some),
            Entity::CartesianPoint(_)
            | Entity::Direction(_)
            | Entity::Vector(_)
            | Entity::Placement(_)
            | Entity::NamedUnit(_)
            | Entity::MeasureWithUnit(_)
            | Entity::Context(_)
            | Entity::ShapeRepresentation(_) => Ok(None),
        }
    }
}

pub(crate) fn register(registry: &mut Registry) {
    geometry::register(registry);
    curves::register(registry);
    surfaces::register(registry);
    topology::register(registry);
    representation::register(registry);
}
