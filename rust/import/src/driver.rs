// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! File-level conversion
//!
//! [`StepWrapper`] owns a parsed file and converts each
//! `ADVANCED_BREP_SHAPE_REPRESENTATION` in it with a fresh [`Factory`].
//! A failing root is reported and skipped; the others still convert.

use crate::config::ImportConfig;
use crate::entities::representation::Reconstruction;
use crate::entities::Entity;
use crate::error::{Error, Result};
use crate::factory::Factory;
use crate::sink::SolidWriter;
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use std::path::Path;
use step_brep_core::{is_supported_schema, EntityAccessor, StepFile};
use step_brep_geometry::BrepStats;

/// Type name of the representations converted to solids
pub const ROOT_TYPE: &str = "ADVANCED_BREP_SHAPE_REPRESENTATION";

/// What happened to one root
#[derive(Debug, Clone, PartialEq)]
pub enum RootStatus {
    Written {
        stats: BrepStats,
        /// Validator warnings
        warnings: usize,
    },
    /// Built, but the validator found errors; not written
    Invalid { errors: Vec<String> },
    /// Conversion failed; `entity` is the deepest failing instance
    Failed {
        entity: Option<(&'static str, u32)>,
        message: String,
    },
    /// The sink refused the solid
    SinkError { message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RootOutcome {
    pub id: u32,
    pub name: String,
    pub status: RootStatus,
}

impl RootOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self.status, RootStatus::Written { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionSummary {
    /// One entry per root, in file order
    pub roots: Vec<RootOutcome>,
}

impl ConversionSummary {
    pub fn written(&self) -> usize {
        self.roots.iter().filter(|r| r.is_written()).count()
    }

    pub fn failed(&self) -> usize {
        self.roots.len() - self.written()
    }

    /// 0 if any root was written, 1 if none of the roots were, 2 if the
    /// file has no roots
    pub fn exit_code(&self) -> i32 {
        if self.roots.is_empty() {
            2
        } else if self.written() > 0 {
            0
        } else {
            1
        }
    }
}

/// A parsed STEP file ready for conversion
pub struct StepWrapper {
    file: StepFile,
    config: ImportConfig,
}

impl StepWrapper {
    pub fn load(path: impl AsRef<Path>, config: ImportConfig) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        tracing::info!(path = %path.display(), bytes = content.len(), "Reading STEP file");
        Self::load_str(&content, config)
    }

    pub fn load_str(content: &str, config: ImportConfig) -> Result<Self> {
        let file = StepFile::parse(content)?;

        let schemas = &file.header().schemas;
        if !schemas.iter().any(|s| is_supported_schema(s)) {
            let listed = schemas.join(", ");
            if config.strict_schema {
                return Err(Error::UnsupportedSchema(listed));
            }
            tracing::warn!(schemas = %listed, "Unsupported schema, converting anyway");
        }

        let malformed = file.malformed_ids();
        if !malformed.is_empty() {
            tracing::warn!(count = malformed.len(), first = malformed[0], "Skipping malformed instances");
        }
        tracing::info!(instances = file.len(), "Parsed STEP file");
        Ok(Self { file, config })
    }

    pub fn file(&self) -> &StepFile {
        &self.file
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Ids of the representations to convert, in file order
    pub fn roots(&self) -> Vec<u32> {
        self.file.instances_of(ROOT_TYPE)
    }

    /// Name attribute of a root, read straight from the file so that a
    /// root which fails to build is still reported under its name
    fn root_name(&self, id: u32) -> String {
        self.file
            .instance(id)
            .ok()
            .and_then(|entity| {
                self.file
                    .attribute(&entity, "name")
                    .and_then(|value| value.as_string())
                    .map(str::to_string)
            })
            .unwrap_or_default()
    }

    /// Convert one representation with its own factory
    pub fn convert_root(&self, id: u32) -> Result<(String, Reconstruction)> {
        let mut factory = Factory::new();
        let result = self.build_root(&mut factory, id);
        tracing::debug!(id, wrappers = factory.len(), "Root converted");
        factory.delete_objects();
        result
    }

    fn build_root(&self, factory: &mut Factory, id: u32) -> Result<(String, Reconstruction)> {
        let key = factory.create_object(&self.file, id)?;
        let wrapper = factory.get(key)?;
        let Entity::ShapeRepresentation(representation) = &wrapper.entity else {
            return Err(Error::UnexpectedEntity {
                id,
                expected: ROOT_TYPE,
                found: wrapper.entity_name,
            });
        };
        let reconstruction = representation
            .get_on_brep(id, factory, &self.config)
            .map_err(|e| e.within(wrapper.entity_name, id))?;
        Ok((representation.name.clone(), reconstruction))
    }

    /// Convert every root and hand valid solids to `sink` in file order
    pub fn convert(&self, sink: &mut dyn SolidWriter) -> ConversionSummary {
        let roots = self.roots();
        tracing::info!(roots = roots.len(), parallel = self.config.parallel, "Converting representations");

        let results: Vec<(u32, Result<(String, Reconstruction)>)> = if self.config.parallel {
            roots
                .par_iter()
                .map(|&id| (id, self.convert_root(id)))
                .collect()
        } else {
            roots.iter().map(|&id| (id, self.convert_root(id))).collect()
        };

        let mut used = FxHashSet::default();
        let mut summary = ConversionSummary::default();
        for (id, result) in results {
            let outcome = match result {
                Ok((name, reconstruction)) => {
                    let name = unique_name(&mut used, &name, id);
                    self.deliver(sink, id, name, reconstruction)
                }
                Err(e) => {
                    let entity = e.deepest();
                    tracing::error!(id, error = %e, "Representation failed");
                    RootOutcome {
                        id,
                        name: unique_name(&mut used, &self.root_name(id), id),
                        status: RootStatus::Failed {
                            entity,
                            message: e.to_string(),
                        },
                    }
                }
            };
            summary.roots.push(outcome);
        }
        tracing::info!(
            written = summary.written(),
            failed = summary.failed(),
            "Conversion finished"
        );
        summary
    }

    fn deliver(
        &self,
        sink: &mut dyn SolidWriter,
        id: u32,
        name: String,
        reconstruction: Reconstruction,
    ) -> RootOutcome {
        let brep = reconstruction.brep;
        let stats = brep.stats();
        let mut warnings = 0;
        if self.config.validate {
            let report = brep.validate(reconstruction.tolerance);
            for issue in report.warnings() {
                tracing::warn!(id, %issue, "Validation");
            }
            warnings = report.warning_count();
            if !report.is_valid() {
                let errors: Vec<String> = report.errors().map(ToString::to_string).collect();
                for error in &errors {
                    tracing::error!(id, issue = %error, "Validation");
                }
                return RootOutcome {
                    id,
                    name,
                    status: RootStatus::Invalid { errors },
                };
            }
        }

        let status = match sink.write_solid(&name, brep) {
            Ok(()) => {
                tracing::info!(id, name = %name, faces = stats.faces, "Solid written");
                RootStatus::Written { stats, warnings }
            }
            Err(e) => {
                tracing::error!(id, error = %e, "Sink rejected solid");
                RootStatus::SinkError {
                    message: e.to_string(),
                }
            }
        };
        RootOutcome { id, name, status }
    }
}

/// Representation name, or `representation_<id>` when empty; a repeated
/// name gets `_<id>` appended
fn unique_name(used: &mut FxHashSet<String>, name: &str, id: u32) -> String {
    let base = if name.trim().is_empty() {
        format!("representation_{}", id)
    } else {
        name.to_string()
    };
    let name = if used.contains(&base) {
        format!("{}_{}", base, id)
    } else {
        base
    };
    used.insert(name.clone());
    name
}
