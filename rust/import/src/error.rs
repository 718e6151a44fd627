// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for import operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while resolving instances or building a solid
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] step_brep_core::Error),

    #[error(transparent)]
    Geometry(#[from] step_brep_geometry::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("#{id}: unsupported entity type {type_name}")]
    UnsupportedEntity { id: u32, type_name: String },

    #[error("#{id}: unsupported complex instance ({})", parts.join(" "))]
    UnsupportedComplex { id: u32, parts: Vec<String> },

    #[error("#{id} {entity}: missing attribute '{attribute}'")]
    MissingAttribute {
        id: u32,
        entity: &'static str,
        attribute: &'static str,
    },

    #[error("#{id} {entity}: attribute '{attribute}' is not {expected}")]
    InvalidAttribute {
        id: u32,
        entity: &'static str,
        attribute: &'static str,
        expected: &'static str,
    },

    #[error("#{id}: expected {expected}, found {found}")]
    UnexpectedEntity {
        id: u32,
        expected: &'static str,
        found: &'static str,
    },

    #[error("#{0} references itself")]
    Cycle(u32),

    #[error("#{0} is already registered with the factory")]
    DuplicateObject(u32),

    #[error("#{id} {entity} has no B-rep counterpart")]
    NotMaterializable { id: u32, entity: &'static str },

    #[error("Invalid topology: {0}")]
    Topology(String),

    #[error("Unsupported schema: {0}")]
    UnsupportedSchema(String),

    #[error("Representation #{0} contains no solids")]
    NoSolids(u32),

    #[error("Entity handle is no longer valid")]
    StaleKey,

    #[error("{entity} #{id}: {source}")]
    Entity {
        entity: &'static str,
        id: u32,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Attach the entity whose loading failed
    pub fn within(self, entity: &'static str, id: u32) -> Self {
        Error::Entity {
            entity,
            id,
            source: Box::new(self),
        }
    }

    /// Innermost entity in the failure chain
    pub fn deepest(&self) -> Option<(&'static str, u32)> {
        let mut current = self;
        let mut found = None;
        while let Error::Entity { entity, id, source } = current {
            found = Some((*entity, *id));
            current = source;
        }
        found
    }

    /// The error underneath every entity context
    pub fn root_cause(&self) -> &Error {
        let mut current = self;
        while let Error::Entity { source, .. } = current {
            current = source;
        }
        current
    }
}
