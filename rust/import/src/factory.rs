// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity factory
//!
//! Owns every wrapper built during one conversion in a slotmap arena.
//! Instances are memoized by file id, so every path to the same instance
//! resolves to the same [`EntityKey`].

use crate::complex;
use crate::entities::{Entity, Loader};
use crate::error::{Error, Result};
use crate::registry::{Constructor, Registry};
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::{new_key_type, SlotMap};
use std::cell::Cell;
use std::fmt::Write;
use std::sync::Arc;
use step_brep_core::{DecodedEntity, EntityAccessor};

new_key_type! {
    /// Handle to a wrapper owned by a [`Factory`]
    pub struct EntityKey;
}

/// Materialization state of a wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Attributes resolved, nothing in the B-rep yet
    Loaded,
    /// Index of the B-rep element built from this wrapper
    Materialized(usize),
}

/// An entity wrapper with its bookkeeping
#[derive(Debug)]
pub struct Wrapper {
    /// File id, 0 for synthesized entities
    pub id: u32,
    /// Registered name the wrapper was built under
    pub entity_name: &'static str,
    pub state: Cell<LoadState>,
    pub entity: Entity,
}

impl Wrapper {
    pub fn new(id: u32, entity_name: &'static str, entity: Entity) -> Self {
        Self {
            id,
            entity_name,
            state: Cell::new(LoadState::Loaded),
            entity,
        }
    }

    /// B-rep index, once materialized
    pub fn on_id(&self) -> Option<usize> {
        match self.state.get() {
            LoadState::Materialized(index) => Some(index),
            LoadState::Loaded => None,
        }
    }
}

/// Builds and owns wrappers for one conversion
pub struct Factory {
    registry: Arc<Registry>,
    arena: SlotMap<EntityKey, Wrapper>,
    objects: FxHashMap<u32, EntityKey>,
    /// Wrappers without a file id
    unmapped: Vec<EntityKey>,
    /// Ids whose constructor is running
    in_progress: FxHashSet<u32>,
}

impl Default for Factory {
    fn default() -> Self {
        Self::new()
    }
}

impl Factory {
    /// Factory using the standard registry
    pub fn new() -> Self {
        Self::with_registry(Registry::standard())
    }

    pub fn with_registry(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            arena: SlotMap::with_key(),
            objects: FxHashMap::default(),
            unmapped: Vec::new(),
            in_progress: FxHashSet::default(),
        }
    }

    /// Wrapper for instance `id`, building it and everything it references
    /// on first request
    pub fn create_object(&mut self, accessor: &dyn EntityAccessor, id: u32) -> Result<EntityKey> {
        if let Some(&key) = self.objects.get(&id) {
            return Ok(key);
        }
        if !self.in_progress.insert(id) {
            return Err(Error::Cycle(id));
        }
        let built = self.construct(accessor, id);
        self.in_progress.remove(&id);

        let (name, entity) = built?;
        self.add_object(id, name, entity)
    }

    fn construct(
        &mut self,
        accessor: &dyn EntityAccessor,
        id: u32,
    ) -> Result<(&'static str, Entity)> {
        let instance = accessor.instance(id)?;
        let (name, ctor) = self.resolve(accessor, &instance)?;
        tracing::trace!(id, entity = name, "Loading instance");

        let mut loader = Loader::new(self, accessor, &instance, name);
        let entity = ctor(&mut loader).map_err(|e| e.within(name, id))?;
        Ok((name, entity))
    }

    /// Registered name and constructor for an instance
    fn resolve(
        &self,
        accessor: &dyn EntityAccessor,
        instance: &DecodedEntity,
    ) -> Result<(&'static str, Constructor)> {
        let type_name = if accessor.is_complex(instance) {
            complex::resolve(instance.id, &accessor.supertype_names(instance))?
        } else {
            instance.type_name()
        };
        self.registry
            .get_key_value(type_name)
            .ok_or_else(|| Error::UnsupportedEntity {
                id: instance.id,
                type_name: type_name.to_string(),
            })
    }

    /// Take ownership of a wrapper. Id 0 marks a synthesized entity, which
    /// is kept but never found by id.
    pub fn add_object(&mut self, id: u32, entity_name: &'static str, entity: Entity) -> Result<EntityKey> {
        if id != 0 && self.objects.contains_key(&id) {
            return Err(Error::DuplicateObject(id));
        }
        let key = self.arena.insert(Wrapper::new(id, entity_name, entity));
        if id == 0 {
            self.unmapped.push(key);
        } else {
            self.objects.insert(id, key);
        }
        Ok(key)
    }

    pub fn find_object(&self, id: u32) -> Option<EntityKey> {
        self.objects.get(&id).copied()
    }

    pub fn get(&self, key: EntityKey) -> Result<&Wrapper> {
        self.arena.get(key).ok_or(Error::StaleKey)
    }

    pub fn entity(&self, key: EntityKey) -> Result<&Entity> {
        self.get(key).map(|w| &w.entity)
    }

    /// Drop every wrapper; outstanding keys become stale
    pub fn delete_objects(&mut self) {
        tracing::trace!(objects = self.arena.len(), "Releasing wrappers");
        self.arena.clear();
        self.objects.clear();
        self.unmapped.clear();
    }

    /// Number of wrappers, synthesized ones included
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Number of synthesized wrappers
    pub fn unmapped_len(&self) -> usize {
        self.unmapped.len()
    }

    /// Indented tree of the wrappers reachable from `key`. Shared
    /// children are expanded once.
    pub fn dump(&self, key: EntityKey) -> String {
        let mut out = String::new();
        let mut seen = FxHashSet::default();
        self.dump_into(key, 0, &mut seen, &mut out);
        out
    }

    fn dump_into(
        &self,
        key: EntityKey,
        depth: usize,
        seen: &mut FxHashSet<EntityKey>,
        out: &mut String,
    ) {
        let indent = "  ".repeat(depth);
        let Some(wrapper) = self.arena.get(key) else {
            let _ = writeln!(out, "{}<stale>", indent);
            return;
        };
        let state = match wrapper.on_id() {
            Some(index) => format!(" -> {}", index),
            None => String::new(),
        };
        if !seen.insert(key) {
            let _ = writeln!(out, "{}#{} {} (shared){}", indent, wrapper.id, wrapper.entity_name, state);
            return;
        }
        let _ = writeln!(out, "{}#{} {}{}", indent, wrapper.id, wrapper.entity_name, state);
        for child in wrapper.entity.children() {
            self.dump_into(child, depth + 1, seen, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::geometry::CartesianPoint;
    use step_brep_core::StepFile;

    fn file(data: &str) -> StepFile {
        let content = format!(
            "ISO-10303-21;\nHEADER;\nFILE_DESCRIPTION((''),'2;1');\n\
             FILE_NAME('','',(''),(''),'','','');\n\
             FILE_SCHEMA(('CONFIG_CONTROL_DESIGN'));\nENDSEC;\nDATA;\n{}ENDSEC;\nEND-ISO-10303-21;\n",
            data
        );
        StepFile::parse(&content).unwrap()
    }

    #[test]
    fn test_shared_references_resolve_to_one_wrapper() {
        let file = file(
            "#1=CARTESIAN_POINT('',(0.,0.,0.));\n\
             #2=VERTEX_POINT('',#1);\n\
             #3=VERTEX_POINT('',#1);\n",
        );
        let mut factory = Factory::new();
        let a = factory.create_object(&file, 2).unwrap();
        let b = factory.create_object(&file, 3).unwrap();
        let again = factory.create_object(&file, 2).unwrap();
        assert_eq!(a, again);
        assert_ne!(a, b);
        assert_eq!(factory.len(), 3);

        let point_a = factory.entity(a).unwrap().children();
        let point_b = factory.entity(b).unwrap().children();
        assert_eq!(point_a, point_b);
        assert_eq!(factory.find_object(1), Some(point_a[0]));
    }

    #[test]
    fn test_synthesized_objects_are_unmapped() {
        let mut factory = Factory::new();
        let a = factory
            .add_object(0, "CARTESIAN_POINT", Entity::CartesianPoint(CartesianPoint::default()))
            .unwrap();
        let b = factory
            .add_object(0, "CARTESIAN_POINT", Entity::CartesianPoint(CartesianPoint::default()))
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(factory.unmapped_len(), 2);
        assert_eq!(factory.find_object(0), None);
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let mut factory = Factory::new();
        let point = || Entity::CartesianPoint(CartesianPoint::default());
        factory.add_object(5, "CARTESIAN_POINT", point()).unwrap();
        assert!(matches!(
            factory.add_object(5, "CARTESIAN_POINT", point()),
            Err(Error::DuplicateObject(5))
        ));
        assert_eq!(factory.len(), 1);
    }

    #[test]
    fn test_unknown_type_fails_with_its_name() {
        let file = file("#1=PRODUCT('p','p','',(#2));\n#3=VERTEX_POINT('',#1);\n");
        let mut factory = Factory::new();
        let err = factory.create_object(&file, 3).unwrap_err();
        assert_eq!(err.deepest(), Some(("VERTEX_POINT", 3)));
        assert!(matches!(
            err.root_cause(),
            Error::UnsupportedEntity { id: 1, type_name } if type_name == "PRODUCT"
        ));
        assert!(factory.find_object(3).is_none());
    }

    #[test]
    fn test_reference_cycle_is_detected() {
        let file = file(
            "#1=TRIMMED_CURVE('',#2,(PARAMETER_VALUE(0.)),(PARAMETER_VALUE(1.)),.T.,.PARAMETER.);\n\
             #2=TRIMMED_CURVE('',#1,(PARAMETER_VALUE(0.)),(PARAMETER_VALUE(1.)),.T.,.PARAMETER.);\n",
        );
        let mut factory = Factory::new();
        let err = factory.create_object(&file, 1).unwrap_err();
        assert!(matches!(err.root_cause(), Error::Cycle(1)));
    }

    #[test]
    fn test_complex_instance_dispatch() {
        let file = file(
            "#1=(LENGTH_UNIT()NAMED_UNIT(*)SI_UNIT(.MILLI.,.METRE.));\n\
             #2=(GEOMETRIC_REPRESENTATION_ITEM()RATIONAL_B_SPLINE_CURVE((1.,2.))CURVE());\n",
        );
        let mut factory = Factory::new();
        let unit = factory.create_object(&file, 1).unwrap();
        assert_eq!(factory.get(unit).unwrap().entity_name, "LENGTH_SI_UNIT");

        let err = factory.create_object(&file, 2).unwrap_err();
        assert!(matches!(err, Error::UnsupportedComplex { id: 2, .. }));
    }

    #[test]
    fn test_delete_objects_invalidates_keys() {
        let file = file("#1=CARTESIAN_POINT('',(1.,2.,3.));\n");
        let mut factory = Factory::new();
        let key = factory.create_object(&file, 1).unwrap();
        factory.delete_objects();
        assert!(factory.is_empty());
        assert!(matches!(factory.get(key), Err(Error::StaleKey)));
        assert_eq!(factory.find_object(1), None);
    }

    #[test]
    fn test_dump_marks_shared_children() {
        let file = file(
            "#1=CARTESIAN_POINT('',(0.,0.,0.));\n\
             #2=CARTESIAN_POINT('',(1.,0.,0.));\n\
             #3=POLYLINE('',(#1,#2,#1));\n",
        );
        let mut factory = Factory::new();
        let key = factory.create_object(&file, 3).unwrap();
        let dump = factory.dump(key);
        assert!(dump.starts_with("#3 POLYLINE\n"));
        assert!(dump.contains("  #1 CARTESIAN_POINT\n"));
        assert!(dump.contains("  #1 CARTESIAN_POINT (shared)\n"));
    }
}
