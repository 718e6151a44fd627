// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON output of converted solids

use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use step_brep_geometry::{BoundingBox, Brep, BrepStats};
use step_brep_import::{Result, SolidWriter};

/// Document written per solid
#[derive(Serialize)]
struct SolidDocument<'a> {
    name: &'a str,
    stats: BrepStats,
    bounds: BoundingBox,
    brep: &'a Brep,
}

/// Writes each solid to `<dir>/<name>.json`
pub struct JsonWriter {
    dir: PathBuf,
    pretty: bool,
    pub written: Vec<PathBuf>,
}

impl JsonWriter {
    pub fn new(dir: impl Into<PathBuf>, pretty: bool) -> Self {
        Self {
            dir: dir.into(),
            pretty,
            written: Vec::new(),
        }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(name)))
    }
}

/// Representation names may hold path separators and other characters
/// that do not belong in a file name
fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

impl SolidWriter for JsonWriter {
    fn write_solid(&mut self, name: &str, brep: Brep) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(name);
        let document = SolidDocument {
            name,
            stats: brep.stats(),
            bounds: brep.bounding_box(),
            brep: &brep,
        };
        let out = BufWriter::new(File::create(&path)?);
        if self.pretty {
            serde_json::to_writer_pretty(out, &document).map_err(std::io::Error::from)?;
        } else {
            serde_json::to_writer(out, &document).map_err(std::io::Error::from)?;
        }
        tracing::debug!(path = %path.display(), "Wrote solid");
        self.written.push(path);
        Ok(())
    }
}

/// Default output directory: next to the input, named after it
pub fn default_output_dir(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "step".into());
    input
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!("{}_breps", stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use step_brep_geometry::Point3;

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("bracket"), "bracket");
        assert_eq!(file_stem("a/b c"), "a_b_c");
        assert_eq!(file_stem("part_12"), "part_12");
    }

    #[test]
    fn test_default_output_dir() {
        let dir = default_output_dir(Path::new("/data/models/pump.stp"));
        assert_eq!(dir, PathBuf::from("/data/models/pump_breps"));
    }

    #[test]
    fn test_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = JsonWriter::new(dir.path().join("out"), false);

        let mut brep = Brep::new();
        brep.add_vertex(Point3::new(1.0, 2.0, 3.0), 1e-3);
        writer.write_solid("part/1", brep).unwrap();

        let path = dir.path().join("out").join("part_1.json");
        assert_eq!(writer.written, vec![path.clone()]);
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["name"], "part/1");
        assert_eq!(value["stats"]["vertices"], 1);
        assert_eq!(value["brep"]["vertices"].as_array().unwrap().len(), 1);
    }
}
