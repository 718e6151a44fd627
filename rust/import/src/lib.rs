// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # step-brep import
//!
//! Reconstructs boundary representation solids from STEP AP203 files.
//!
//! Each `ADVANCED_BREP_SHAPE_REPRESENTATION` is converted on its own:
//! a [`Factory`] builds typed wrappers for the instances it reaches,
//! the representation context fixes the length and angle units, and
//! [`ConversionContext::materialize`] turns solids, shells, faces and
//! edges into one [`step_brep_geometry::Brep`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use step_brep_import::{ImportConfig, MemoryWriter, StepWrapper};
//!
//! let wrapper = StepWrapper::load("part.stp", ImportConfig::default())?;
//! let mut sink = MemoryWriter::new();
//! let summary = wrapper.convert(&mut sink);
//! std::process::exit(summary.exit_code());
//! ```

pub mod complex;
pub mod config;
pub mod context;
pub mod driver;
pub mod entities;
pub mod error;
pub mod factory;
pub mod registry;
pub mod sink;
pub mod units;

pub use config::ImportConfig;
pub use context::{ConversionContext, CurveBounds};
pub use driver::{ConversionSummary, RootOutcome, RootStatus, StepWrapper};
pub use entities::representation::Reconstruction;
pub use entities::{Entity, Loader};
pub use error::{Error, Result};
pub use factory::{EntityKey, Factory, LoadState, Wrapper};
pub use registry::Registry;
pub use sink::{MemoryWriter, SolidWriter};
pub use units::{LocalUnits, NamedUnit, SiPrefix, SiUnitName, UnitCategory};
