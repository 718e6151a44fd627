// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Output sinks for converted solids

use crate::error::Result;
use step_brep_geometry::Brep;

/// Receives each converted representation, in file order
pub trait SolidWriter {
    fn write_solid(&mut self, name: &str, brep: Brep) -> Result<()>;
}

/// Keeps solids in memory
#[derive(Debug, Default)]
pub struct MemoryWriter {
    pub solids: Vec<(String, Brep)>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Brep> {
        self.solids
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, brep)| brep)
    }
}

impl SolidWriter for MemoryWriter {
    fn write_solid(&mut self, name: &str, brep: Brep) -> Result<()> {
        self.solids.push((name.to_string(), brep));
        Ok(())
    }
}
