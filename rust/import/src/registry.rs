// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity registry - maps EXPRESS type names to constructors
//!
//! Every wrapper module registers its constructors under the canonical
//! EXPRESS name (or, for complex instances, the name the complex
//! dispatch tables resolve to).

use crate::entities::{self, Entity, Loader};
use crate::error::Result;
use crate::units;
use rustc_hash::FxHashMap;
use std::sync::{Arc, OnceLock};

/// Builds a wrapper from one instance
pub type Constructor = fn(&mut Loader<'_>) -> Result<Entity>;

/// Type name to constructor table
#[derive(Default)]
pub struct Registry {
    constructors: FxHashMap<&'static str, Constructor>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `ctor` under `name`.
    ///
    /// Returns false, leaving the first registration in place, if the
    /// name is already taken.
    pub fn register(&mut self, name: &'static str, ctor: Constructor) -> bool {
        if self.constructors.contains_key(name) {
            tracing::error!(entity = name, "Entity type registered twice, ignoring");
            return false;
        }
        self.constructors.insert(name, ctor);
        true
    }

    pub fn lookup(&self, name: &str) -> Option<Constructor> {
        self.constructors.get(name).copied()
    }

    /// Registered name and constructor; the name is the registry's
    /// `'static` copy
    pub fn get_key_value(&self, name: &str) -> Option<(&'static str, Constructor)> {
        self.constructors
            .get_key_value(name)
            .map(|(name, ctor)| (*name, *ctor))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.constructors.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// The registry with every supported entity type, built once
    pub fn standard() -> Arc<Registry> {
        static STANDARD: OnceLock<Arc<Registry>> = OnceLock::new();
        Arc::clone(STANDARD.get_or_init(|| {
            let mut registry = Registry::new();
            units::register(&mut registry);
            entities::register(&mut registry);
            tracing::debug!(types = registry.len(), "Entity registry initialized");
            Arc::new(registry)
        }))
    }
}
