// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed attribute access for constructors
//!
//! A [`Loader`] reads the attributes of one instance by EXPRESS name and
//! builds referenced instances through the factory as it goes.

use super::trimming::TrimmingSelect;
use super::Entity;
use crate::error::{Error, Result};
use crate::factory::{EntityKey, Factory};
use step_brep_core::{AttributeValue, DecodedEntity, EntityAccessor};

pub struct Loader<'a> {
    factory: &'a mut Factory,
    accessor: &'a dyn EntityAccessor,
    instance: &'a DecodedEntity,
    name: &'static str,
}

impl<'a> Loader<'a> {
    pub(crate) fn new(
        factory: &'a mut Factory,
        accessor: &'a dyn EntityAccessor,
        instance: &'a DecodedEntity,
        name: &'static str,
    ) -> Self {
        Self {
            factory,
            accessor,
            instance,
            name,
        }
    }

    /// File id of the instance
    pub fn id(&self) -> u32 {
        self.instance.id
    }

    /// Registered name the instance resolved to
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn instance(&self) -> &'a DecodedEntity {
        self.instance
    }

    /// Wrappers built so far
    pub fn factory(&self) -> &Factory {
        self.factory
    }

    pub(crate) fn missing(&self, attribute: &'static str) -> Error {
        Error::MissingAttribute {
            id: self.id(),
            entity: self.name,
            attribute,
        }
    }

    pub(crate) fn invalid(&self, attribute: &'static str, expected: &'static str) -> Error {
        Error::InvalidAttribute {
            id: self.id(),
            entity: self.name,
            attribute,
            expected,
        }
    }

    /// Attribute value; `$` and `*` count as absent
    pub fn optional(&self, attribute: &'static str) -> Option<&'a AttributeValue> {
        self.accessor
            .attribute(self.instance, attribute)
            .filter(|value| !value.is_null())
    }

    pub fn value(&self, attribute: &'static str) -> Result<&'a AttributeValue> {
        self.optional(attribute)
            .ok_or_else(|| self.missing(attribute))
    }

    pub fn real(&self, attribute: &'static str) -> Result<f64> {
        self.value(attribute)?
            .as_float()
            .ok_or_else(|| self.invalid(attribute, "a real"))
    }

    pub fn optional_real(&self, attribute: &'static str) -> Result<Option<f64>> {
        match self.optional(attribute) {
            Some(value) => value
                .as_float()
                .map(Some)
                .ok_or_else(|| self.invalid(attribute, "a real")),
            None => Ok(None),
        }
    }

    pub fn integer(&self, attribute: &'static str) -> Result<i64> {
        self.value(attribute)?
            .as_int()
            .ok_or_else(|| self.invalid(attribute, "an integer"))
    }

    pub fn boolean(&self, attribute: &'static str) -> Result<bool> {
        self.value(attribute)?
            .as_bool()
            .ok_or_else(|| self.invalid(attribute, "a boolean"))
    }

    /// LOGICAL value; `.U.` is `None`
    pub fn logical(&self, attribute: &'static str) -> Result<Option<bool>> {
        let value = self.value(attribute)?;
        match value.as_enum() {
            Some("U" | "UNKNOWN") => Ok(None),
            Some(_) => value
                .as_bool()
                .map(Some)
                .ok_or_else(|| self.invalid(attribute, "a logical")),
            None => Err(self.invalid(attribute, "a logical")),
        }
    }

    pub fn enumeration(&self, attribute: &'static str) -> Result<&'a str> {
        self.value(attribute)?
            .as_enum()
            .ok_or_else(|| self.invalid(attribute, "an enumeration"))
    }

    pub fn optional_enumeration(&self, attribute: &'static str) -> Result<Option<&'a str>> {
        match self.optional(attribute) {
            Some(value) => value
                .as_enum()
                .map(Some)
                .ok_or_else(|| self.invalid(attribute, "an enumeration")),
            None => Ok(None),
        }
    }

    /// String attribute, empty when absent
    pub fn label(&self, attribute: &'static str) -> String {
        self.optional(attribute)
            .and_then(AttributeValue::as_string)
            .unwrap_or_default()
            .to_string()
    }

    pub fn reals(&self, attribute: &'static str) -> Result<Vec<f64>> {
        self.value(attribute)?
            .as_float_list()
            .ok_or_else(|| self.invalid(attribute, "a list of reals"))
    }

    pub fn integers(&self, attribute: &'static str) -> Result<Vec<i64>> {
        let list = self.list(attribute)?;
        list.iter()
            .map(|v| v.as_int().ok_or_else(|| self.invalid(attribute, "a list of integers")))
            .collect()
    }

    /// List of lists of reals, e.g. surface weights
    pub fn real_grid(&self, attribute: &'static str) -> Result<Vec<Vec<f64>>> {
        let rows = self.list(attribute)?;
        rows.iter()
            .map(|row| {
                row.as_float_list()
                    .ok_or_else(|| self.invalid(attribute, "a list of lists of reals"))
            })
            .collect()
    }

    fn list(&self, attribute: &'static str) -> Result<&'a [AttributeValue]> {
        self.value(attribute)?
            .as_list()
            .ok_or_else(|| self.invalid(attribute, "a list"))
    }

    /// Build the instance at `id`
    pub fn create(&mut self, id: u32) -> Result<EntityKey> {
        self.factory.create_object(self.accessor, id)
    }

    /// Hand a wrapper with no file id to the factory
    pub fn synthesize(&mut self, entity_name: &'static str, entity: Entity) -> Result<EntityKey> {
        self.factory.add_object(0, entity_name, entity)
    }

    fn reference(&mut self, attribute: &'static str, value: &AttributeValue) -> Result<EntityKey> {
        let id = value
            .as_entity_ref()
            .ok_or_else(|| self.invalid(attribute, "an entity reference"))?;
        self.create(id)
    }

    /// Referenced entity, built on demand
    pub fn entity(&mut self, attribute: &'static str) -> Result<EntityKey> {
        let value = self.value(attribute)?;
        self.reference(attribute, value)
    }

    pub fn optional_entity(&mut self, attribute: &'static str) -> Result<Option<EntityKey>> {
        match self.optional(attribute) {
            Some(value) => self.reference(attribute, value).map(Some),
            None => Ok(None),
        }
    }

    /// Aggregate of references, in file order
    pub fn entities(&mut self, attribute: &'static str) -> Result<Vec<EntityKey>> {
        let list = self.list(attribute)?;
        list.iter()
            .map(|value| self.reference(attribute, value))
            .collect()
    }

    /// List of lists of references, e.g. a control point net
    pub fn entity_grid(&mut self, attribute: &'static str) -> Result<Vec<Vec<EntityKey>>> {
        let rows = self.list(attribute)?;
        rows.iter()
            .map(|row| {
                let row = row
                    .as_list()
                    .ok_or_else(|| self.invalid(attribute, "a list of lists"))?;
                row.iter()
                    .map(|value| self.reference(attribute, value))
                    .collect()
            })
            .collect()
    }

    /// Set of trimming selects: points or `PARAMETER_VALUE(..)`
    pub fn trimming(&mut self, attribute: &'static str) -> Result<Vec<TrimmingSelect>> {
        let list = self.list(attribute)?;
        list.iter()
            .map(|value| match value {
                AttributeValue::EntityRef(id) => self.create(*id).map(TrimmingSelect::CartesianPoint),
                other => other
                    .as_float()
                    .map(TrimmingSelect::ParameterValue)
                    .ok_or_else(|| self.invalid(attribute, "a trimming select")),
            })
            .collect()
    }
}
