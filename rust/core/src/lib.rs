// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # step-brep core reader
//!
//! ISO-10303-21 (STEP Part 21) reader built with [nom](https://docs.rs/nom).
//!
//! - **Tokenization**: zero-copy parsing of simple and complex instances
//! - **Statement scanning**: [memchr](https://docs.rs/memchr) accelerated splitting of the DATA section
//! - **Schema**: AP203 entity table giving attribute-by-name lookup
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use step_brep_core::{EntityAccessor, StepFile};
//!
//! let file = StepFile::parse(&content)?;
//! for id in file.instances_of("ADVANCED_BREP_SHAPE_REPRESENTATION") {
//!     let rep = file.instance(id)?;
//!     let items = file.attribute(&rep, "items");
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization support for decoded instances

pub mod accessor;
pub mod decoder;
pub mod entity;
pub mod error;
pub mod header;
pub mod parser;
pub mod schema;

pub use accessor::EntityAccessor;
pub use decoder::{build_entity_index, EntityIndex, StatementScanner, StepFile};
pub use entity::{AttributeValue, DecodedEntity, PartialEntity};
pub use error::{Error, Result};
pub use header::FileHeader;
pub use parser::{parse_entity, RawInstance, Token};
pub use schema::{is_supported_schema, EntityDef, Schema};
