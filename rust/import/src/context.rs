// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Conversion context
//!
//! Carries the B-rep under construction, the unit factors of the
//! representation being converted and the loop being assembled through
//! every `load_on_brep` call. Nothing here is global, so independent
//! representations can be converted on separate threads.

use crate::entities::geometry::Placement;
use crate::entities::Entity;
use crate::error::{Error, Result};
use crate::factory::{EntityKey, Factory, LoadState};
use crate::units::LocalUnits;
use nalgebra::{Point3, Vector3};
use step_brep_geometry::{Brep, Curve3, CurveGeometry, Frame, LoopKind, SurfaceGeometry};

/// How a curve use is bounded
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CurveBounds {
    /// The curve's own extent
    Natural,
    /// Basis parameters
    Parameters(f64, f64),
    /// Points on the curve, already in millimetres
    Points(Point3<f64>, Point3<f64>),
}

impl CurveBounds {
    pub fn swapped(self) -> Self {
        match self {
            CurveBounds::Natural => CurveBounds::Natural,
            CurveBounds::Parameters(a, b) => CurveBounds::Parameters(b, a),
            CurveBounds::Points(a, b) => CurveBounds::Points(b, a),
        }
    }
}

/// The face bound whose loop is being built
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundScope {
    pub face: usize,
    pub kind: LoopKind,
    /// False when the bound runs its loop backwards
    pub orientation: bool,
}

pub struct ConversionContext<'f> {
    factory: &'f Factory,
    brep: &'f mut Brep,
    units: LocalUnits,
    tolerance: f64,
    trim_samples: usize,
    scope: Option<BoundScope>,
}

impl<'f> ConversionContext<'f> {
    pub fn new(
        factory: &'f Factory,
        brep: &'f mut Brep,
        units: LocalUnits,
        tolerance: f64,
        trim_samples: usize,
    ) -> Self {
        Self {
            factory,
            brep,
            units,
            tolerance,
            trim_samples,
            scope: None,
        }
    }

    pub fn units(&self) -> LocalUnits {
        self.units
    }

    /// Model-space tolerance in millimetres
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn trim_samples(&self) -> usize {
        self.trim_samples
    }

    pub fn factory(&self) -> &'f Factory {
        self.factory
    }

    pub fn brep(&self) -> &Brep {
        self.brep
    }

    pub fn brep_mut(&mut self) -> &mut Brep {
        self.brep
    }

    pub fn scope(&self) -> Option<BoundScope> {
        self.scope
    }

    pub fn set_scope(&mut self, scope: Option<BoundScope>) {
        self.scope = scope;
    }

    pub fn entity(&self, key: EntityKey) -> Result<&'f Entity> {
        let factory: &'f Factory = self.factory;
        factory.entity(key)
    }

    /// Error for a reference that resolved to the wrong kind of entity
    pub fn unexpected(&self, key: EntityKey, expected: &'static str) -> Error {
        match self.factory.get(key) {
            Ok(wrapper) => Error::UnexpectedEntity {
                id: wrapper.id,
                expected,
                found: wrapper.entity_name,
            },
            Err(e) => e,
        }
    }

    /// B-rep index of the wrapper at `key`, building its B-rep elements
    /// on the first call
    pub fn materialize(&mut self, key: EntityKey) -> Result<usize> {
        let factory: &'f Factory = self.factory;
        let wrapper = factory.get(key)?;
        if let Some(index) = wrapper.on_id() {
            return Ok(index);
        }
        let index = wrapper
            .entity
            .load_on_brep(self)
            .map_err(|e| e.within(wrapper.entity_name, wrapper.id))?
            .ok_or(Error::NotMaterializable {
                id: wrapper.id,
                entity: wrapper.entity_name,
            })?;
        wrapper.state.set(LoadState::Materialized(index));
        tracing::trace!(id = wrapper.id, entity = wrapper.entity_name, index, "Materialized");
        Ok(index)
    }

    /// Build the B-rep elements of a face bound or loop for the face in
    /// the current scope. Unlike [`Self::materialize`] nothing is cached:
    /// the same bound may be used by several faces and each needs a loop
    /// of its own.
    pub fn build_scoped(&mut self, key: EntityKey) -> Result<usize> {
        let factory: &'f Factory = self.factory;
        let wrapper = factory.get(key)?;
        wrapper
            .entity
            .load_on_brep(self)
            .map_err(|e| e.within(wrapper.entity_name, wrapper.id))?
            .ok_or(Error::NotMaterializable {
                id: wrapper.id,
                entity: wrapper.entity_name,
            })
    }

    /// Cartesian point in millimetres
    pub fn point(&self, key: EntityKey) -> Result<Point3<f64>> {
        match self.entity(key)? {
            Entity::CartesianPoint(point) => Ok(point.raw() * self.units.length),
            _ => Err(self.unexpected(key, "CARTESIAN_POINT")),
        }
    }

    /// Unit direction
    pub fn direction(&self, key: EntityKey) -> Result<Vector3<f64>> {
        match self.entity(key)? {
            Entity::Direction(direction) => direction.raw().try_normalize(1e-12).ok_or_else(|| {
                step_brep_geometry::Error::DegenerateFrame("zero length direction".into()).into()
            }),
            _ => Err(self.unexpected(key, "DIRECTION")),
        }
    }

    /// Vector in millimetres
    pub fn vector(&self, key: EntityKey) -> Result<Vector3<f64>> {
        match self.entity(key)? {
            Entity::Vector(vector) => {
                Ok(self.direction(vector.orientation)? * vector.magnitude * self.units.length)
            }
            _ => Err(self.unexpected(key, "VECTOR")),
        }
    }

    fn optional_direction(&self, key: Option<EntityKey>) -> Result<Option<Vector3<f64>>> {
        key.map(|k| self.direction(k)).transpose()
    }

    /// Frame of an axis placement
    pub fn frame(&self, key: EntityKey) -> Result<Frame> {
        let frame = match self.entity(key)? {
            Entity::Placement(Placement::Axis2d {
                location,
                ref_direction,
            }) => Frame::new(
                self.point(*location)?,
                None,
                self.optional_direction(*ref_direction)?,
            )?,
            Entity::Placement(Placement::Axis3d {
                location,
                axis,
                ref_direction,
            }) => Frame::new(
                self.point(*location)?,
                self.optional_direction(*axis)?,
                self.optional_direction(*ref_direction)?,
            )?,
            Entity::Placement(Placement::Axis1 { location, axis }) => {
                Frame::new(self.point(*location)?, self.optional_direction(*axis)?, None)?
            }
            _ => return Err(self.unexpected(key, "AXIS2_PLACEMENT_3D")),
        };
        Ok(frame)
    }

    /// Origin and unit direction of an axis
    pub fn axis1(&self, key: EntityKey) -> Result<(Point3<f64>, Vector3<f64>)> {
        match self.entity(key)? {
            Entity::Placement(Placement::Axis1 { location, axis }) => Ok((
                self.point(*location)?,
                self.optional_direction(*axis)?.unwrap_or_else(Vector3::z),
            )),
            _ => Err(self.unexpected(key, "AXIS1_PLACEMENT")),
        }
    }

    /// Unbounded geometry of a curve entity
    pub fn curve_geometry(&self, key: EntityKey) -> Result<CurveGeometry> {
        match self.entity(key)? {
            Entity::Curve(curve) => curve.geometry(self),
            Entity::TrimmedCurve(trimmed) => self.curve_geometry(trimmed.basis),
            Entity::SurfaceCurve(surface_curve) => self.curve_geometry(surface_curve.curve_3d),
            _ => Err(self.unexpected(key, "CURVE")),
        }
    }

    /// Bounded use of a curve entity
    pub fn curve3(&self, key: EntityKey, bounds: CurveBounds) -> Result<Curve3> {
        match self.entity(key)? {
            Entity::Curve(curve) => bound_curve(curve.geometry(self)?, bounds, self.tolerance),
            Entity::TrimmedCurve(trimmed) => trimmed.curve3(self, bounds),
            Entity::SurfaceCurve(surface_curve) => self.curve3(surface_curve.curve_3d, bounds),
            _ => Err(self.unexpected(key, "CURVE")),
        }
    }

    pub fn surface_geometry(&self, key: EntityKey) -> Result<SurfaceGeometry> {
        match self.entity(key)? {
            Entity::Surface(surface) => surface.geometry(self),
            _ => Err(self.unexpected(key, "SURFACE")),
        }
    }

    /// B-rep edge used by an oriented edge or edge curve, and whether the
    /// use runs against the edge
    pub fn edge_use(&mut self, key: EntityKey) -> Result<(usize, bool)> {
        match self.entity(key)? {
            Entity::OrientedEdge(oriented) => {
                let (edge, reversed) = self.edge_use(oriented.edge_element)?;
                Ok((edge, reversed == oriented.orientation))
            }
            Entity::EdgeCurve(_) => Ok((self.materialize(key)?, false)),
            _ => Err(self.unexpected(key, "ORIENTED_EDGE")),
        }
    }
}

/// Apply `bounds` to unbounded geometry
pub fn bound_curve(geometry: CurveGeometry, bounds: CurveBounds, tolerance: f64) -> Result<Curve3> {
    let curve = match bounds {
        CurveBounds::Natural => Curve3::natural(geometry),
        CurveBounds::Parameters(t0, t1) => Curve3::trimmed(geometry, t0, t1)?,
        CurveBounds::Points(p0, p1) => Curve3::between_points(geometry, &p0, &p1, tolerance)?,
    };
    Ok(curve)
}
