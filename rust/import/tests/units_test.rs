// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod common;

use approx::assert_relative_eq;
use common::{cube_file, StepText};
use step_brep_import::{ImportConfig, MemoryWriter, StepWrapper};

/// Largest x coordinate of the converted cube, in millimetres
fn converted_extent(content: &str) -> f64 {
    let wrapper = StepWrapper::load_str(content, ImportConfig::default()).unwrap();
    let mut sink = MemoryWriter::new();
    let summary = wrapper.convert(&mut sink);
    assert_eq!(summary.exit_code(), 0, "{:#?}", summary.roots);
    sink.get("cube").unwrap().bounding_box().max.x
}

#[test]
fn millimetres_are_kept() {
    assert_relative_eq!(converted_extent(&cube_file(Some("MILLI"), 2.0)), 2.0, epsilon = 1e-9);
}

#[test]
fn metres_are_scaled() {
    assert_relative_eq!(converted_extent(&cube_file(None, 2.0)), 2000.0, epsilon = 1e-6);
}

#[test]
fn kilometres_are_scaled() {
    assert_relative_eq!(
        converted_extent(&cube_file(Some("KILO"), 2.0)),
        2.0e6,
        max_relative = 1e-12
    );
}

#[test]
fn inches_are_scaled() {
    let mut text = StepText::new();
    let context = text.inch_context();
    let solid = text.cube("cube", [0.0, 0.0, 0.0], 2.0);
    text.representation("cube", &[solid], context);
    assert_relative_eq!(converted_extent(&text.finish()), 50.8, epsilon = 1e-9);
}

#[test]
fn context_uncertainty_widens_the_tolerance() {
    let wrapper =
        StepWrapper::load_str(&cube_file(Some("KILO"), 1.0), ImportConfig::default()).unwrap();
    let root = wrapper.roots()[0];
    let (name, reconstruction) = wrapper.convert_root(root).unwrap();
    assert_eq!(name, "cube");
    // 1e-7 km
    assert_relative_eq!(reconstruction.tolerance, 0.1, max_relative = 1e-9);
    assert_relative_eq!(reconstruction.units.length, 1.0e6);
    assert_eq!(reconstruction.solids, 1);
}

#[test]
fn configured_tolerance_is_a_floor() {
    let wrapper =
        StepWrapper::load_str(&cube_file(Some("MILLI"), 1.0), ImportConfig::default()).unwrap();
    let (_, reconstruction) = wrapper.convert_root(wrapper.roots()[0]).unwrap();
    assert_relative_eq!(reconstruction.tolerance, 1e-3);
}
