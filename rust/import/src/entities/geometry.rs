// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Points, directions and placements
//!
//! Values are kept in file units; [`ConversionContext`] scales them when
//! geometry is built.
//!
//! [`ConversionContext`]: crate::context::ConversionContext

use super::{Entity, Loader};
use crate::error::Result;
use crate::factory::EntityKey;
use crate::registry::Registry;
use nalgebra::{Point3, Vector3};
use smallvec::SmallVec;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartesianPoint {
    pub coordinates: SmallVec<[f64; 3]>,
}

impl CartesianPoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            coordinates: SmallVec::from_buf([x, y, z]),
        }
    }

    /// Coordinates in file units; 2D points lie in z = 0
    pub fn raw(&self) -> Point3<f64> {
        let c = |i: usize| self.coordinates.get(i).copied().unwrap_or(0.0);
        Point3::new(c(0), c(1), c(2))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Direction {
    pub ratios: SmallVec<[f64; 3]>,
}

impl Direction {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            ratios: SmallVec::from_buf([x, y, z]),
        }
    }

    /// Direction ratios, not normalized
    pub fn raw(&self) -> Vector3<f64> {
        let c = |i: usize| self.ratios.get(i).copied().unwrap_or(0.0);
        Vector3::new(c(0), c(1), c(2))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Vector {
    pub orientation: EntityKey,
    /// Length in file units
    pub magnitude: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
    Axis1 {
        location: EntityKey,
        axis: Option<EntityKey>,
    },
    Axis2d {
        location: EntityKey,
        ref_direction: Option<EntityKey>,
    },
    Axis3d {
        location: EntityKey,
        axis: Option<EntityKey>,
        ref_direction: Option<EntityKey>,
    },
}

impl Placement {
    pub fn children(&self) -> Vec<EntityKey> {
        match self {
            Placement::Axis1 { location, axis } => {
                std::iter::once(*location).chain(*axis).collect()
            }
            Placement::Axis2d {
                location,
                ref_direction,
            } => std::iter::once(*location).chain(*ref_direction).collect(),
            Placement::Axis3d {
                location,
                axis,
                ref_direction,
            } => std::iter::once(*location)
                .chain(*axis)
                .chain(*ref_direction)
                .collect(),
        }
    }
}

fn coordinates(loader: &Loader<'_>, attribute: &'static str) -> Result<SmallVec<[f64; 3]>> {
    let values = loader.reals(attribute)?;
    if values.is_empty() || values.len() > 3 {
        return Err(loader.invalid(attribute, "one to three reals"));
    }
    Ok(values.into_iter().collect())
}

fn load_point(loader: &mut Loader<'_>) -> Result<Entity> {
    Ok(Entity::CartesianPoint(CartesianPoint {
        coordinates: coordinates(loader, "coordinates")?,
    }))
}

fn load_direction(loader: &mut Loader<'_>) -> Result<Entity> {
    Ok(Entity::Direction(Direction {
        ratios: coordinates(loader, "direction_ratios")?,
    }))
}

fn load_vector(loader: &mut Loader<'_>) -> Result<Entity> {
    Ok(Entity::Vector(Vector {
        orientation: loader.entity("orientation")?,
        magnitude: loader.real("magnitude")?,
    }))
}

fn load_placement(loader: &mut Loader<'_>) -> Result<Entity> {
    let location = loader.entity("location")?;
    let placement = match loader.name() {
        "AXIS1_PLACEMENT" => Placement::Axis1 {
            location,
            axis: loader.optional_entity("axis")?,
        },
        "AXIS2_PLACEMENT_2D" => Placement::Axis2d {
            location,
            ref_direction: loader.optional_entity("ref_direction")?,
        },
        _ => Placement::Axis3d {
            location,
            axis: loader.optional_entity("axis")?,
            ref_direction: loader.optional_entity("ref_direction")?,
        },
    };
    Ok(Entity::Placement(placement))
}

pub(crate) fn register(registry: &mut Registry) {
    registry.register("CARTESIAN_POINT", load_point);
    registry.register("DIRECTION", load_direction);
    registry.register("VECTOR", load_vector);
    registry.register("AXIS1_PLACEMENT", load_placement);
    registry.register("AXIS2_PLACEMENT_2D", load_placement);
    registry.register("AXIS2_PLACEMENT_3D", load_placement);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::Factory;
    use step_brep_core::StepFile;

    fn file(data: &str) -> StepFile {
        let content = format!(
            "ISO-10303-21;\nHEADER;\nFILE_SCHEMA(('CONFIG_CONTROL_DESIGN'));\nENDSEC;\nDATA;\n{}\nENDSEC;\nEND-ISO-10303-21;\n",
            data
        );
        StepFile::parse(&content).unwrap()
    }

    #[test]
    fn test_two_dimensional_point() {
        let file = file("#1=CARTESIAN_POINT('',(3.,4.));");
        let mut factory = Factory::new();
        let key = factory.create_object(&file, 1).unwrap();
        match factory.entity(key).unwrap() {
            Entity::CartesianPoint(point) => {
                assert_eq!(point.coordinates.len(), 2);
                assert_eq!(point.raw(), Point3::new(3.0, 4.0, 0.0));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_placement_children() {
        let file = file(
            "#1=CARTESIAN_POINT('',(0.,0.,0.));\n#2=DIRECTION('',(0.,0.,1.));\n#3=AXIS2_PLACEMENT_3D('',#1,#2,$);",
        );
        let mut factory = Factory::new();
        let key = factory.create_object(&file, 3).unwrap();
        let entity = factory.entity(key).unwrap();
        assert!(matches!(
            entity,
            Entity::Placement(Placement::Axis3d {
                ref_direction: None,
                ..
            })
        ));
        let ids: Vec<u32> = entity
            .children()
            .into_iter()
            .map(|k| factory.get(k).unwrap().id)
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_empty_coordinates_rejected() {
        let file = file("#1=CARTESIAN_POINT('',());");
        let mut factory = Factory::new();
        assert!(factory.create_object(&file, 1).is_err());
    }
}
