// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Representations and their contexts
//!
//! A shape representation groups solids with the context that gives
//! their units and uncertainty. [`ShapeRepresentation::get_on_brep`]
//! converts all solids of one representation into a single [`Brep`].

use super::{Entity, Loader};
use crate::config::ImportConfig;
use crate::context::ConversionContext;
use crate::error::{Error, Result};
use crate::factory::{EntityKey, Factory};
use crate::registry::Registry;
use crate::units::{LocalUnits, NamedUnit, UnitCategory};
use step_brep_geometry::Brep;

#[derive(Debug, Clone, PartialEq)]
pub struct RepresentationContext {
    pub identifier: String,
    pub dimension: Option<i64>,
    pub units: Vec<EntityKey>,
    pub uncertainty: Vec<EntityKey>,
}

impl RepresentationContext {
    /// Factors of the context's length, plane angle and solid angle units.
    /// Missing angle units default to radians and steradians.
    pub fn local_units(&self, factory: &Factory) -> LocalUnits {
        let mut units = LocalUnits::default();
        let (mut angle, mut solid_angle) = (false, false);
        for &key in &self.units {
            let Ok(Entity::NamedUnit(unit)) = factory.entity(key) else {
                continue;
            };
            match unit.category {
                UnitCategory::Length => units.length = unit.factor(UnitCategory::Length, factory),
                UnitCategory::PlaneAngle => {
                    units.plane_angle = unit.factor(UnitCategory::PlaneAngle, factory);
                    angle = true;
                }
                UnitCategory::SolidAngle => {
                    units.solid_angle = unit.factor(UnitCategory::SolidAngle, factory);
                    solid_angle = true;
                }
                _ => {}
            }
        }
        if !angle {
            tracing::debug!(context = %self.identifier, "No plane angle unit, assuming radians");
        }
        if !solid_angle {
            tracing::debug!(context = %self.identifier, "No solid angle unit, assuming steradians");
        }
        units
    }

    /// Smallest declared length uncertainty, in millimetres
    pub fn uncertainty(&self, factory: &Factory) -> Option<f64> {
        self.uncertainty
            .iter()
            .filter_map(|&key| match factory.entity(key) {
                Ok(Entity::MeasureWithUnit(measure)) => {
                    Some(measure.converted(UnitCategory::Length, factory))
                }
                _ => None,
            })
            .filter(|value| value.is_finite() && *value > 0.0)
            .reduce(f64::min)
    }
}

/// One converted representation
#[derive(Debug, Clone)]
pub struct Reconstruction {
    pub brep: Brep,
    /// Tolerance the B-rep was built with
    pub tolerance: f64,
    pub units: LocalUnits,
    pub solids: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeRepresentation {
    pub name: String,
    pub items: Vec<EntityKey>,
    pub context: EntityKey,
}

impl ShapeRepresentation {
    /// Build every solid item into one B-rep. Items that are not solids,
    /// such as placements, are skipped.
    pub fn get_on_brep(
        &self,
        id: u32,
        factory: &Factory,
        config: &ImportConfig,
    ) -> Result<Reconstruction> {
        let context = match factory.entity(self.context)? {
            Entity::Context(context) => context,
            _ => {
                let wrapper = factory.get(self.context)?;
                return Err(Error::UnexpectedEntity {
                    id: wrapper.id,
                    expected: "REPRESENTATION_CONTEXT",
                    found: wrapper.entity_name,
                });
            }
        };
        let units = context.local_units(factory);
        let tolerance = context
            .uncertainty(factory)
            .map_or(config.tolerance, |u| u.max(config.tolerance));
        tracing::debug!(
            id,
            length = units.length,
            plane_angle = units.plane_angle,
            tolerance,
            "Converting representation"
        );

        let mut brep = Brep::new();
        let mut solids = 0;
        {
            let mut ctx =
                ConversionContext::new(factory, &mut brep, units, tolerance, config.trim_samples);
            for &item in &self.items {
                let wrapper = factory.get(item)?;
                match wrapper.entity {
                    Entity::Solid(_) => {
                        ctx.materialize(item)?;
                        solids += 1;
                    }
                    _ => tracing::trace!(
                        id = wrapper.id,
                        entity = wrapper.entity_name,
                        "Skipping item"
                    ),
                }
            }
        }
        if solids == 0 {
            return Err(Error::NoSolids(id));
        }
        Ok(Reconstruction {
            brep,
            tolerance,
            units,
            solids,
        })
    }
}

fn load_context(loader: &mut Loader<'_>) -> Result<Entity> {
    let mut units = match loader.optional("units") {
        Some(_) => loader.entities("units")?,
        None => Vec::new(),
    };
    let uncertainty = match loader.optional("uncertainty") {
        Some(_) => loader.entities("uncertainty")?,
        None => Vec::new(),
    };
    let has_length = units.iter().any(|&key| {
        matches!(
            loader.factory().entity(key),
            Ok(Entity::NamedUnit(unit)) if unit.category == UnitCategory::Length
        )
    });
    if !has_length {
        tracing::warn!(id = loader.id(), "Context has no length unit, assuming millimetres");
        units.push(loader.synthesize("LENGTH_SI_UNIT", Entity::NamedUnit(NamedUnit::millimetre()))?);
    }
    Ok(Entity::Context(RepresentationContext {
        identifier: loader.label("context_identifier"),
        dimension: loader
            .optional("coordinate_space_dimension")
            .and_then(|value| value.as_int()),
        units,
        uncertainty,
    }))
}

fn load_shape_representation(loader: &mut Loader<'_>) -> Result<Entity> {
    Ok(Entity::ShapeRepresentation(ShapeRepresentation {
        name: loader.label("name"),
        items: loader.entities("items")?,
        context: loader.entity("context_of_items")?,
    }))
}

pub(crate) fn register(registry: &mut Registry) {
    for name in [
        "REPRESENTATION_CONTEXT",
        "GEOMETRIC_REPRESENTATION_CONTEXT",
        "GLOBAL_UNIT_ASSIGNED_CONTEXT",
        "GEOMETRIC_UNIT_UNCERTAINTY_CONTEXT",
        "GEOMETRIC_UNIT_CONTEXT",
        "GEOMETRIC_UNCERTAINTY_CONTEXT",
        "UNIT_UNCERTAINTY_CONTEXT",
    ] {
        registry.register(name, load_context);
    }
    registry.register("ADVANCED_BREP_SHAPE_REPRESENTATION", load_shape_representation);
    registry.register("SHAPE_REPRESENTATION", load_shape_representation);
}
