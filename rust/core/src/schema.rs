// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! AP203 schema table
//!
//! Attribute names of the geometry, topology, representation and unit
//! entities of the AIC 514 / AP203 long form. Positional attributes of a
//! simple instance follow the supertype graph depth first, in declaration
//! order, each supertype visited once; the entity's own attributes come last.

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::sync::OnceLock;

/// Entity definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityDef {
    pub name: &'static str,
    pub supertypes: &'static [&'static str],
    /// Explicit attributes declared by this entity only
    pub attributes: &'static [&'static str],
}

macro_rules! entities {
    ($($name:literal : [$($sup:literal),*] => [$($attr:literal),*];)*) => {
        &[$(EntityDef {
            name: $name,
            supertypes: &[$($sup),*],
            attributes: &[$($attr),*],
        }),*]
    };
}

static DEFINITIONS: &[EntityDef] = entities! {
    "REPRESENTATION_ITEM": [] => ["name"];
    "GEOMETRIC_REPRESENTATION_ITEM": ["REPRESENTATION_ITEM"] => [];
    "TOPOLOGICAL_REPRESENTATION_ITEM": ["REPRESENTATION_ITEM"] => [];

    "POINT": ["GEOMETRIC_REPRESENTATION_ITEM"] => [];
    "CARTESIAN_POINT": ["POINT"] => ["coordinates"];
    "DIRECTION": ["GEOMETRIC_REPRESENTATION_ITEM"] => ["direction_ratios"];
    "VECTOR": ["GEOMETRIC_REPRESENTATION_ITEM"] => ["orientation", "magnitude"];
    "PLACEMENT": ["GEOMETRIC_REPRESENTATION_ITEM"] => ["location"];
    "AXIS1_PLACEMENT": ["PLACEMENT"] => ["axis"];
    "AXIS2_PLACEMENT_2D": ["PLACEMENT"] => ["ref_direction"];
    "AXIS2_PLACEMENT_3D": ["PLACEMENT"] => ["axis", "ref_direction"];

    "CURVE": ["GEOMETRIC_REPRESENTATION_ITEM"] => [];
    "LINE": ["CURVE"] => ["pnt", "dir"];
    "CONIC": ["CURVE"] => ["position"];
    "CIRCLE": ["CONIC"] => ["radius"];
    "ELLIPSE": ["CONIC"] => ["semi_axis_1", "semi_axis_2"];
    "PARABOLA": ["CONIC"] => ["focal_dist"];
    "HYPERBOLA": ["CONIC"] => ["semi_axis", "semi_imag_axis"];
    "BOUNDED_CURVE": ["CURVE"] => [];
    "POLYLINE": ["BOUNDED_CURVE"] => ["points"];
    "B_SPLINE_CURVE": ["BOUNDED_CURVE"] =>
        ["degree", "control_points_list", "curve_form", "closed_curve", "self_intersect"];
    "B_SPLINE_CURVE_WITH_KNOTS": ["B_SPLINE_CURVE"] =>
        ["knot_multiplicities", "knots", "knot_spec"];
    "UNIFORM_CURVE": ["B_SPLINE_CURVE"] => [];
    "QUASI_UNIFORM_CURVE": ["B_SPLINE_CURVE"] => [];
    "BEZIER_CURVE": ["B_SPLINE_CURVE"] => [];
    "RATIONAL_B_SPLINE_CURVE": ["B_SPLINE_CURVE"] => ["weights_data"];
    "TRIMMED_CURVE": ["BOUNDED_CURVE"] =>
        ["basis_curve", "trim_1", "trim_2", "sense_agreement", "master_representation"];
    "SURFACE_CURVE": ["CURVE"] => ["curve_3d", "associated_geometry", "master_representation"];
    "SEAM_CURVE": ["SURFACE_CURVE"] => [];
    "INTERSECTION_CURVE": ["SURFACE_CURVE"] => [];

    "SURFACE": ["GEOMETRIC_REPRESENTATION_ITEM"] => [];
    "ELEMENTARY_SURFACE": ["SURFACE"] => ["position"];
    "PLANE": ["ELEMENTARY_SURFACE"] => [];
    "CYLINDRICAL_SURFACE": ["ELEMENTARY_SURFACE"] => ["radius"];
    "CONICAL_SURFACE": ["ELEMENTARY_SURFACE"] => ["radius", "semi_angle"];
    "SPHERICAL_SURFACE": ["ELEMENTARY_SURFACE"] => ["radius"];
    "TOROIDAL_SURFACE": ["ELEMENTARY_SURFACE"] => ["major_radius", "minor_radius"];
    "SWEPT_SURFACE": ["SURFACE"] => ["swept_curve"];
    "SURFACE_OF_LINEAR_EXTRUSION": ["SWEPT_SURFACE"] => ["extrusion_axis"];
    "SURFACE_OF_REVOLUTION": ["SWEPT_SURFACE"] => ["axis_position"];
    "BOUNDED_SURFACE": ["SURFACE"] => [];
    "B_SPLINE_SURFACE": ["BOUNDED_SURFACE"] =>
        ["u_degree", "v_degree", "control_points_list", "surface_form",
         "u_closed", "v_closed", "self_intersect"];
    "B_SPLINE_SURFACE_WITH_KNOTS": ["B_SPLINE_SURFACE"] =>
        ["u_multiplicities", "v_multiplicities", "u_knots", "v_knots", "knot_spec"];
    "UNIFORM_SURFACE": ["B_SPLINE_SURFACE"] => [];
    "QUASI_UNIFORM_SURFACE": ["B_SPLINE_SURFACE"] => [];
    "BEZIER_SURFACE": ["B_SPLINE_SURFACE"] => [];
    "RATIONAL_B_SPLINE_SURFACE": ["B_SPLINE_SURFACE"] => ["weights_data"];

    "VERTEX": ["TOPOLOGICAL_REPRESENTATION_ITEM"] => [];
    "VERTEX_POINT": ["VERTEX", "GEOMETRIC_REPRESENTATION_ITEM"] => ["vertex_geometry"];
    "EDGE": ["TOPOLOGICAL_REPRESENTATION_ITEM"] => ["edge_start", "edge_end"];
    "EDGE_CURVE": ["EDGE", "GEOMETRIC_REPRESENTATION_ITEM"] => ["edge_geometry", "same_sense"];
    "ORIENTED_EDGE": ["EDGE"] => ["edge_element", "orientation"];
    "LOOP": ["TOPOLOGICAL_REPRESENTATION_ITEM"] => [];
    "PATH": ["TOPOLOGICAL_REPRESENTATION_ITEM"] => ["edge_list"];
    "EDGE_LOOP": ["LOOP", "PATH"] => [];
    "VERTEX_LOOP": ["LOOP"] => ["loop_vertex"];
    "FACE_BOUND": ["TOPOLOGICAL_REPRESENTATION_ITEM"] => ["bound", "orientation"];
    "FACE_OUTER_BOUND": ["FACE_BOUND"] => [];
    "FACE": ["TOPOLOGICAL_REPRESENTATION_ITEM"] => ["bounds"];
    "FACE_SURFACE": ["FACE", "GEOMETRIC_REPRESENTATION_ITEM"] => ["face_geometry", "same_sense"];
    "ADVANCED_FACE": ["FACE_SURFACE"] => [];
    "CONNECTED_FACE_SET": ["TOPOLOGICAL_REPRESENTATION_ITEM"] => ["cfs_faces"];
    "CLOSED_SHELL": ["CONNECTED_FACE_SET"] => [];
    "OPEN_SHELL": ["CONNECTED_FACE_SET"] => [];
    "ORIENTED_CLOSED_SHELL": ["CLOSED_SHELL"] => ["closed_shell_element", "orientation"];

    "SOLID_MODEL": ["GEOMETRIC_REPRESENTATION_ITEM"] => [];
    "MANIFOLD_SOLID_BREP": ["SOLID_MODEL"] => ["outer"];
    "BREP_WITH_VOIDS": ["MANIFOLD_SOLID_BREP"] => ["voids"];

    "REPRESENTATION": [] => ["name", "items", "context_of_items"];
    "SHAPE_REPRESENTATION": ["REPRESENTATION"] => [];
    "ADVANCED_BREP_SHAPE_REPRESENTATION": ["SHAPE_REPRESENTATION"] => [];
    "MANIFOLD_SURFACE_SHAPE_REPRESENTATION": ["SHAPE_REPRESENTATION"] => [];
    "REPRESENTATION_CONTEXT": [] => ["context_identifier", "context_type"];
    "GEOMETRIC_REPRESENTATION_CONTEXT": ["REPRESENTATION_CONTEXT"] => ["coordinate_space_dimension"];
    "GLOBAL_UNIT_ASSIGNED_CONTEXT": ["REPRESENTATION_CONTEXT"] => ["units"];
    "GLOBAL_UNCERTAINTY_ASSIGNED_CONTEXT": ["REPRESENTATION_CONTEXT"] => ["uncertainty"];

    "NAMED_UNIT": [] => ["dimensions"];
    "SI_UNIT": ["NAMED_UNIT"] => ["prefix", "name"];
    "CONVERSION_BASED_UNIT": ["NAMED_UNIT"] => ["name", "conversion_factor"];
    "CONTEXT_DEPENDENT_UNIT": ["NAMED_UNIT"] => ["name"];
    "LENGTH_UNIT": ["NAMED_UNIT"] => [];
    "PLANE_ANGLE_UNIT": ["NAMED_UNIT"] => [];
    "SOLID_ANGLE_UNIT": ["NAMED_UNIT"] => [];
    "MASS_UNIT": ["NAMED_UNIT"] => [];
    "AREA_UNIT": ["NAMED_UNIT"] => [];
    "VOLUME_UNIT": ["NAMED_UNIT"] => [];
    "TIME_UNIT": ["NAMED_UNIT"] => [];
    "DIMENSIONAL_EXPONENTS": [] =>
        ["length_exponent", "mass_exponent", "time_exponent",
         "electric_current_exponent", "thermodynamic_temperature_exponent",
         "amount_of_substance_exponent", "luminous_intensity_exponent"];
    "MEASURE_WITH_UNIT": [] => ["value_component", "unit_component"];
    "LENGTH_MEASURE_WITH_UNIT": ["MEASURE_WITH_UNIT"] => [];
    "PLANE_ANGLE_MEASURE_WITH_UNIT": ["MEASURE_WITH_UNIT"] => [];
    "SOLID_ANGLE_MEASURE_WITH_UNIT": ["MEASURE_WITH_UNIT"] => [];
    "UNCERTAINTY_MEASURE_WITH_UNIT": ["MEASURE_WITH_UNIT"] => ["name", "description"];
};

/// Schema names accepted in FILE_SCHEMA
const SUPPORTED_SCHEMAS: &[&str] = &[
    "CONFIG_CONTROL_DESIGN",
    "AUTOMOTIVE_DESIGN",
    "AP203_CONFIGURATION_CONTROLLED_3D_DESIGN_OF_MECHANICAL_PARTS_AND_ASSEMBLIES_MIM_LF",
    "AP242_MANAGED_MODEL_BASED_3D_ENGINEERING_MIM_LF",
];

/// Whether a FILE_SCHEMA entry names a schema this reader understands.
/// Trailing object identifiers (`{ 1 0 10303 ... }`) are ignored.
pub fn is_supported_schema(name: &str) -> bool {
    let bare = name
        .split(|c: char| c.is_whitespace() || c == '{')
        .next()
        .unwrap_or("")
        .to_ascii_uppercase();
    SUPPORTED_SCHEMAS.contains(&bare.as_str())
}

/// Lookup table over the entity definitions
pub struct Schema {
    by_name: FxHashMap<&'static str, &'static EntityDef>,
    flattened: FxHashMap<&'static str, Vec<&'static str>>,
    ancestors: FxHashMap<&'static str, FxHashSet<&'static str>>,
}

impl Schema {
    /// The AP203 table, built once
    pub fn ap203() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| Schema::new(DEFINITIONS))
    }

    fn new(definitions: &'static [EntityDef]) -> Self {
        let by_name: FxHashMap<_, _> = definitions.iter().map(|d| (d.name, d)).collect();

        let mut flattened = FxHashMap::default();
        let mut ancestors = FxHashMap::default();
        for def in definitions {
            let mut visited = FxHashSet::default();
            let mut attributes = Vec::new();
            Self::flatten(&by_name, def.name, &mut visited, &mut attributes);
            visited.remove(def.name);
            flattened.insert(def.name, attributes);
            ancestors.insert(def.name, visited);
        }

        Self {
            by_name,
            flattened,
            ancestors,
        }
    }

    fn flatten(
        by_name: &FxHashMap<&'static str, &'static EntityDef>,
        name: &'static str,
        visited: &mut FxHashSet<&'static str>,
        out: &mut Vec<&'static str>,
    ) {
        if !visited.insert(name) {
            return;
        }
        let Some(def) = by_name.get(name) else {
            return;
        };
        for supertype in def.supertypes {
            Self::flatten(by_name, supertype, visited, out);
        }
        out.extend_from_slice(def.attributes);
    }

    pub fn definition(&self, name: &str) -> Option<&'static EntityDef> {
        self.by_name.get(name.to_ascii_uppercase().as_str()).copied()
    }

    /// Positional attribute names of a simple instance of `name`
    pub fn attribute_names(&self, name: &str) -> Option<&[&'static str]> {
        self.flattened
            .get(name.to_ascii_uppercase().as_str())
            .map(Vec::as_slice)
    }

    /// Position of `attribute` within a simple instance of `entity`
    pub fn attribute_index(&self, entity: &str, attribute: &str) -> Option<usize> {
        self.attribute_names(entity)?
            .iter()
            .position(|a| a.eq_ignore_ascii_case(attribute))
    }

    /// Position of `attribute` among the attributes `entity` itself declares
    pub fn own_attribute_index(&self, entity: &str, attribute: &str) -> Option<usize> {
        self.definition(entity)?
            .attributes
            .iter()
            .position(|a| a.eq_ignore_ascii_case(attribute))
    }

    /// All supertypes of `name`, transitively, excluding `name` itself
    pub fn supertypes_of(&self, name: &str) -> SmallVec<[&'static str; 8]> {
        let mut out: SmallVec<[&'static str; 8]> = self
            .ancestors
            .get(name.to_ascii_uppercase().as_str())
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        out.sort_unstable();
        out
    }

    /// Whether `name` is `ancestor` or one of its subtypes
    pub fn is_a(&self, name: &str, ancestor: &str) -> bool {
        let name = name.to_ascii_uppercase();
        let ancestor = ancestor.to_ascii_uppercase();
        name == ancestor
            || self
                .ancestors
                .get(name.as_str())
                .is_some_and(|set| set.contains(ancestor.as_str()))
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flattened_attributes_follow_supertypes() {
        let schema = Schema::ap203();
        assert_eq!(
            schema.attribute_names("EDGE_CURVE").unwrap(),
            &["name", "edge_start", "edge_end", "edge_geometry", "same_sense"]
        );
        assert_eq!(
            schema.attribute_names("ADVANCED_FACE").unwrap(),
            &["name", "bounds", "face_geometry", "same_sense"]
        );
        assert_eq!(
            schema.attribute_names("ORIENTED_CLOSED_SHELL").unwrap(),
            &["name", "cfs_faces", "closed_shell_element", "orientation"]
        );
        assert_eq!(
            schema.attribute_names("EDGE_LOOP").unwrap(),
            &["name", "edge_list"]
        );
    }

    #[test]
    fn test_attribute_index() {
        let schema = Schema::ap203();
        assert_eq!(schema.attribute_index("TRIMMED_CURVE", "trim_2"), Some(3));
        assert_eq!(schema.attribute_index("vertex_point", "VERTEX_GEOMETRY"), Some(1));
        assert_eq!(schema.attribute_index("SI_UNIT", "prefix"), Some(1));
        assert_eq!(schema.own_attribute_index("SI_UNIT", "name"), Some(1));
        assert_eq!(schema.attribute_index("LINE", "radius"), None);
    }

    #[test]
    fn test_is_a() {
        let schema = Schema::ap203();
        assert!(schema.is_a("CIRCLE", "CURVE"));
        assert!(schema.is_a("EDGE_CURVE", "GEOMETRIC_REPRESENTATION_ITEM"));
        assert!(schema.is_a("ADVANCED_BREP_SHAPE_REPRESENTATION", "REPRESENTATION"));
        assert!(!schema.is_a("PLANE", "CURVE"));
        assert!(schema.supertypes_of("PLANE").contains(&"SURFACE"));
    }

    #[test]
    fn test_supported_schema() {
        assert!(is_supported_schema("CONFIG_CONTROL_DESIGN"));
        assert!(is_supported_schema("automotive_design { 1 0 10303 214 1 1 1 1 }"));
        assert!(!is_supported_schema("IFC4"));
    }
}
