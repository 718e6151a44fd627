// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod common;

use common::StepText;
use std::collections::HashSet;
use step_brep_core::EntityAccessor;
use step_brep_geometry::Brep;
use step_brep_import::{
    ConversionContext, Factory, ImportConfig, LoadState, LocalUnits, StepWrapper,
};

fn cube_with_solid() -> (StepWrapper, u32) {
    let mut text = StepText::new();
    let context = text.context(Some("MILLI"));
    let solid = text.cube("cube", [0.0, 0.0, 0.0], 1.0);
    text.representation("cube", &[solid], context);
    let wrapper = StepWrapper::load_str(&text.finish(), ImportConfig::default()).unwrap();
    (wrapper, solid)
}

#[test]
fn solid_is_materialized_once() {
    let (wrapper, solid) = cube_with_solid();
    let mut factory = Factory::new();
    let key = factory.create_object(wrapper.file(), solid).unwrap();

    let mut brep = Brep::new();
    {
        let mut ctx = ConversionContext::new(&factory, &mut brep, LocalUnits::default(), 1e-3, 24);
        let first = ctx.materialize(key).unwrap();
        let second = ctx.materialize(key).unwrap();
        assert_eq!(first, second);
    }
    assert_eq!(brep.shells.len(), 1);
    assert_eq!(brep.faces.len(), 6);
    assert_eq!(
        factory.get(key).unwrap().state.get(),
        LoadState::Materialized(0)
    );
}

#[test]
fn each_edge_curve_maps_to_one_edge() {
    let (wrapper, solid) = cube_with_solid();
    let mut factory = Factory::new();
    let key = factory.create_object(wrapper.file(), solid).unwrap();

    let mut brep = Brep::new();
    {
        let mut ctx = ConversionContext::new(&factory, &mut brep, LocalUnits::default(), 1e-3, 24);
        ctx.materialize(key).unwrap();
    }

    let edge_curves = wrapper.file().instances_of("EDGE_CURVE");
    assert_eq!(edge_curves.len(), 12);
    let indices: HashSet<usize> = edge_curves
        .iter()
        .map(|&id| {
            let key = factory.find_object(id).unwrap();
            match factory.get(key).unwrap().state.get() {
                LoadState::Materialized(index) => index,
                LoadState::Loaded => panic!("#{} was not built", id),
            }
        })
        .collect();
    assert_eq!(indices.len(), 12);
    assert_eq!(brep.edges.len(), 12);
    assert_eq!(brep.curves3d.len(), 12);
}

#[test]
fn shared_instances_are_wrapped_once() {
    let (wrapper, solid) = cube_with_solid();
    let mut factory = Factory::new();
    factory.create_object(wrapper.file(), solid).unwrap();
    let wrapped = factory.len();
    // Building again is a lookup
    factory.create_object(wrapper.file(), solid).unwrap();
    assert_eq!(factory.len(), wrapped);

    factory.delete_objects();
    assert!(factory.is_empty());
    assert!(factory.find_object(solid).is_none());
}

#[test]
fn converting_twice_gives_the_same_brep() {
    let (wrapper, _) = cube_with_solid();
    let root = wrapper.roots()[0];
    let (_, first) = wrapper.convert_root(root).unwrap();
    let (_, second) = wrapper.convert_root(root).unwrap();
    assert_eq!(first.brep, second.brep);
}
