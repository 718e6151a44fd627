// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Schema-aware attribute access over a decoded instance pool

use crate::decoder::StepFile;
use crate::entity::{AttributeValue, DecodedEntity};
use crate::error::Result;
use crate::schema::Schema;
use smallvec::SmallVec;
use std::sync::Arc;

/// Read access to a parsed instance graph.
///
/// Implementations are shared between conversion threads, so the trait
/// requires `Sync` and all methods take `&self`.
pub trait EntityAccessor: Sync {
    /// Instance by its file id
    fn instance(&self, id: u32) -> Result<Arc<DecodedEntity>>;

    /// Every instance id, in file order
    fn instance_ids(&self) -> Vec<u32>;

    /// Schema used for attribute-by-name lookup
    fn schema(&self) -> &Schema;

    fn is_complex(&self, entity: &DecodedEntity) -> bool {
        entity.is_complex()
    }

    /// Record names of a complex instance, or the ancestors of a simple one
    fn supertype_names<'e>(&self, entity: &'e DecodedEntity) -> SmallVec<[&'e str; 8]> {
        supertype_names(self.schema(), entity)
    }

    /// Attribute value by EXPRESS name
    fn attribute<'e>(&self, entity: &'e DecodedEntity, name: &str) -> Option<&'e AttributeValue> {
        attribute(self.schema(), entity, name)
    }

    /// Ids of instances whose type is `type_name` (simple instances only)
    fn instances_of(&self, type_name: &str) -> Vec<u32> {
        self.instance_ids()
            .into_iter()
            .filter(|&id| {
                self.instance(id)
                    .map(|e| !e.is_complex() && e.type_name().eq_ignore_ascii_case(type_name))
                    .unwrap_or(false)
            })
            .collect()
    }
}

/// Record names of a complex instance, or the schema ancestors of a simple one
pub fn supertype_names<'e>(schema: &Schema, entity: &'e DecodedEntity) -> SmallVec<[&'e str; 8]> {
    if entity.is_complex() {
        entity.part_names().collect()
    } else {
        schema
            .supertypes_of(entity.type_name())
            .into_iter()
            .map(|name| -> &'e str { name })
            .collect()
    }
}

/// Attribute lookup by name.
///
/// A simple instance stores the flattened attribute list of its type; a
/// complex instance stores each record's own attributes, so the record that
/// declares `name` is searched.
pub fn attribute<'e>(
    schema: &Schema,
    entity: &'e DecodedEntity,
    name: &str,
) -> Option<&'e AttributeValue> {
    if entity.is_complex() {
        entity.parts.iter().find_map(|part| {
            let index = schema.own_attribute_index(&part.type_name, name)?;
            part.attributes.get(index)
        })
    } else {
        let index = schema.attribute_index(entity.type_name(), name)?;
        entity.get(index)
    }
}

impl EntityAccessor for StepFile {
    fn instance(&self, id: u32) -> Result<Arc<DecodedEntity>> {
        self.entity(id)
    }

    fn instance_ids(&self) -> Vec<u32> {
        self.ids().to_vec()
    }

    fn schema(&self) -> &Schema {
        Schema::ap203()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_entity;

    fn decode(line: &str) -> DecodedEntity {
        let (id, raw) = parse_entity(line).unwrap();
        DecodedEntity::from_raw(id, &raw)
    }

    #[test]
    fn test_simple_attribute_lookup() {
        let schema = Schema::ap203();
        let edge = decode("#5=EDGE_CURVE('',#1,#2,#3,.T.);");
        assert_eq!(
            attribute(schema, &edge, "edge_geometry").and_then(|v| v.as_entity_ref()),
            Some(3)
        );
        assert_eq!(
            attribute(schema, &edge, "same_sense").and_then(|v| v.as_bool()),
            Some(true)
        );
        assert!(attribute(schema, &edge, "radius").is_none());
    }

    #[test]
    fn test_complex_attribute_lookup() {
        let schema = Schema::ap203();
        let curve = decode(
            "#9=(BOUNDED_CURVE()B_SPLINE_CURVE(1,(#1,#2),.POLYLINE_FORM.,.F.,.F.)\
             B_SPLINE_CURVE_WITH_KNOTS((2,2),(0.,1.),.UNSPECIFIED.)CURVE()\
             GEOMETRIC_REPRESENTATION_ITEM()RATIONAL_B_SPLINE_CURVE((1.,2.))\
             REPRESENTATION_ITEM(''));",
        );
        assert_eq!(
            attribute(schema, &curve, "degree").and_then(|v| v.as_int()),
            Some(1)
        );
        assert_eq!(
            attribute(schema, &curve, "weights_data").and_then(|v| v.as_float_list()),
            Some(vec![1.0, 2.0])
        );
        assert_eq!(
            attribute(schema, &curve, "knots").and_then(|v| v.as_float_list()),
            Some(vec![0.0, 1.0])
        );
        let names = supertype_names(schema, &curve);
        assert!(names.contains(&"RATIONAL_B_SPLINE_CURVE"));
    }

    #[test]
    fn test_simple_supertypes_come_from_schema() {
        let schema = Schema::ap203();
        let circle = decode("#3=CIRCLE('',#2,5.);");
        let names = supertype_names(schema, &circle);
        assert!(names.contains(&"CONIC"));
        assert!(names.contains(&"CURVE"));
    }
}
