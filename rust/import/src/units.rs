// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Unit handling for STEP representations
//!
//! Resolves the named units of a representation context to factors
//! converting file values to millimetres, radians and steradians.

use crate::entities::{Entity, Loader};
use crate::error::Result;
use crate::factory::{EntityKey, Factory};
use crate::registry::Registry;

/// Conversion factors to the internal units of one representation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalUnits {
    /// File length unit to millimetres
    pub length: f64,
    /// File plane angle unit to radians
    pub plane_angle: f64,
    /// File solid angle unit to steradians
    pub solid_angle: f64,
}

impl Default for LocalUnits {
    fn default() -> Self {
        Self {
            length: 1.0,
            plane_angle: 1.0,
            solid_angle: 1.0,
        }
    }
}

/// SI prefixes, 10^18 down to 10^-18
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiPrefix {
    Exa,
    Peta,
    Tera,
    Giga,
    Mega,
    Kilo,
    Hecto,
    Deca,
    Deci,
    Centi,
    Milli,
    Micro,
    Nano,
    Pico,
    Femto,
    Atto,
}

impl SiPrefix {
    /// Parse a STEP enumeration value such as `MILLI`
    pub fn from_step(value: &str) -> Option<Self> {
        let prefix = match value.to_ascii_uppercase().as_str() {
            "EXA" => SiPrefix::Exa,
            "PETA" => SiPrefix::Peta,
            "TERA" => SiPrefix::Tera,
            "GIGA" => SiPrefix::Giga,
            "MEGA" => SiPrefix::Mega,
            "KILO" => SiPrefix::Kilo,
            "HECTO" => SiPrefix::Hecto,
            "DECA" => SiPrefix::Deca,
            "DECI" => SiPrefix::Deci,
            "CENTI" => SiPrefix::Centi,
            "MILLI" => SiPrefix::Milli,
            "MICRO" => SiPrefix::Micro,
            "NANO" => SiPrefix::Nano,
            "PICO" => SiPrefix::Pico,
            "FEMTO" => SiPrefix::Femto,
            "ATTO" => SiPrefix::Atto,
            _ => return None,
        };
        Some(prefix)
    }

    pub fn multiplier(self) -> f64 {
        match self {
            SiPrefix::Exa => 1e18,
            SiPrefix::Peta => 1e15,
            SiPrefix::Tera => 1e12,
            SiPrefix::Giga => 1e9,
            SiPrefix::Mega => 1e6,
            SiPrefix::Kilo => 1e3,
            SiPrefix::Hecto => 1e2,
            SiPrefix::Deca => 1e1,
            SiPrefix::Deci => 1e-1,
            SiPrefix::Centi => 1e-2,
            SiPrefix::Milli => 1e-3,
            SiPrefix::Micro => 1e-6,
            SiPrefix::Nano => 1e-9,
            SiPrefix::Pico => 1e-12,
            SiPrefix::Femto => 1e-15,
            SiPrefix::Atto => 1e-18,
        }
    }
}

/// SI base and derived unit names used by AP203
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiUnitName {
    Metre,
    SquareMetre,
    CubicMetre,
    Gram,
    Second,
    Radian,
    Steradian,
    Other(String),
}

impl SiUnitName {
    pub fn from_step(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "METRE" => SiUnitName::Metre,
            "SQUARE_METRE" => SiUnitName::SquareMetre,
            "CUBIC_METRE" => SiUnitName::CubicMetre,
            "GRAM" => SiUnitName::Gram,
            "SECOND" => SiUnitName::Second,
            "RADIAN" => SiUnitName::Radian,
            "STERADIAN" => SiUnitName::Steradian,
            other => SiUnitName::Other(other.to_string()),
        }
    }

    /// Quantity a plain `SI_UNIT` measures
    fn category(&self) -> UnitCategory {
        match self {
            SiUnitName::Metre => UnitCategory::Length,
            SiUnitName::SquareMetre => UnitCategory::Area,
            SiUnitName::CubicMetre => UnitCategory::Volume,
            SiUnitName::Gram => UnitCategory::Mass,
            SiUnitName::Second => UnitCategory::Time,
            SiUnitName::Radian => UnitCategory::PlaneAngle,
            SiUnitName::Steradian => UnitCategory::SolidAngle,
            SiUnitName::Other(_) => UnitCategory::Other,
        }
    }
}

/// Physical quantity of a named unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitCategory {
    Length,
    PlaneAngle,
    SolidAngle,
    Mass,
    Area,
    Volume,
    Time,
    Other,
}

impl UnitCategory {
    /// Factor returned when a unit cannot answer for this category
    pub fn fallback(self) -> f64 {
        match self {
            UnitCategory::Length => 1e3,
            _ => 1e0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitFlavor {
    Si,
    ConversionBased,
    ContextDependent,
}

/// Registered unit names with how to read them
const UNIT_TYPES: &[(&str, UnitFlavor, Option<UnitCategory>)] = &[
    ("SI_UNIT", UnitFlavor::Si, None),
    ("CONVERSION_BASED_UNIT", UnitFlavor::ConversionBased, None),
    ("CONTEXT_DEPENDENT_UNIT", UnitFlavor::ContextDependent, None),
    ("LENGTH_SI_UNIT", UnitFlavor::Si, Some(UnitCategory::Length)),
    ("PLANE_ANGLE_SI_UNIT", UnitFlavor::Si, Some(UnitCategory::PlaneAngle)),
    ("SOLID_ANGLE_SI_UNIT", UnitFlavor::Si, Some(UnitCategory::SolidAngle)),
    ("MASS_SI_UNIT", UnitFlavor::Si, Some(UnitCategory::Mass)),
    ("AREA_SI_UNIT", UnitFlavor::Si, Some(UnitCategory::Area)),
    ("VOLUME_SI_UNIT", UnitFlavor::Si, Some(UnitCategory::Volume)),
    ("TIME_SI_UNIT", UnitFlavor::Si, Some(UnitCategory::Time)),
    ("LENGTH_CONVERSION_BASED_UNIT", UnitFlavor::ConversionBased, Some(UnitCategory::Length)),
    ("PLANE_ANGLE_CONVERSION_BASED_UNIT", UnitFlavor::ConversionBased, Some(UnitCategory::PlaneAngle)),
    ("SOLID_ANGLE_CONVERSION_BASED_UNIT", UnitFlavor::ConversionBased, Some(UnitCategory::SolidAngle)),
    ("MASS_CONVERSION_BASED_UNIT", UnitFlavor::ConversionBased, Some(UnitCategory::Mass)),
    ("AREA_CONVERSION_BASED_UNIT", UnitFlavor::ConversionBased, Some(UnitCategory::Area)),
    ("VOLUME_CONVERSION_BASED_UNIT", UnitFlavor::ConversionBased, Some(UnitCategory::Volume)),
    ("TIME_CONVERSION_BASED_UNIT", UnitFlavor::ConversionBased, Some(UnitCategory::Time)),
    ("LENGTH_CONTEXT_DEPENDENT_UNIT", UnitFlavor::ContextDependent, Some(UnitCategory::Length)),
    ("PLANE_ANGLE_CONTEXT_DEPENDENT_UNIT", UnitFlavor::ContextDependent, Some(UnitCategory::PlaneAngle)),
    ("SOLID_ANGLE_CONTEXT_DEPENDENT_UNIT", UnitFlavor::ContextDependent, Some(UnitCategory::SolidAngle)),
];

const MEASURE_TYPES: &[&str] = &[
    "MEASURE_WITH_UNIT",
    "LENGTH_MEASURE_WITH_UNIT",
    "PLANE_ANGLE_MEASURE_WITH_UNIT",
    "SOLID_ANGLE_MEASURE_WITH_UNIT",
    "UNCERTAINTY_MEASURE_WITH_UNIT",
];

#[derive(Debug, Clone, PartialEq)]
pub enum UnitKind {
    Si {
        prefix: Option<SiPrefix>,
        name: SiUnitName,
    },
    /// Defined as a multiple of another unit
    ConversionBased { name: String, factor: EntityKey },
    /// No numeric definition
    ContextDependent { name: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedUnit {
    pub kind: UnitKind,
    pub category: UnitCategory,
}

impl NamedUnit {
    pub fn si(prefix: Option<SiPrefix>, name: SiUnitName, category: UnitCategory) -> Self {
        Self {
            kind: UnitKind::Si { prefix, name },
            category,
        }
    }

    /// Millimetres
    pub fn millimetre() -> Self {
        Self::si(Some(SiPrefix::Milli), SiUnitName::Metre, UnitCategory::Length)
    }

    /// Factor converting a value in this unit to the internal unit of
    /// `category`. Units that cannot answer for `category` return its
    /// fallback factor.
    pub fn factor(&self, category: UnitCategory, factory: &Factory) -> f64 {
        match &self.kind {
            UnitKind::Si { prefix, name } => {
                let scale = prefix.map_or(1.0, SiPrefix::multiplier);
                match (name, category) {
                    (SiUnitName::Metre, UnitCategory::Length) => scale * 1000.0,
                    (SiUnitName::Radian, UnitCategory::PlaneAngle)
                    | (SiUnitName::Steradian, UnitCategory::SolidAngle) => scale,
                    _ => {
                        tracing::warn!(
                            unit = ?name,
                            requested = ?category,
                            fallback = category.fallback(),
                            "SI unit does not measure the requested quantity, using fallback factor"
                        );
                        category.fallback()
                    }
                }
            }
            UnitKind::ConversionBased { name, factor } => {
                if self.category != category && self.category != UnitCategory::Other {
                    tracing::warn!(
                        unit = %name,
                        requested = ?category,
                        "Conversion based unit measures another quantity, using fallback factor"
                    );
                    return category.fallback();
                }
                match factory.entity(*factor) {
                    Ok(Entity::MeasureWithUnit(measure)) => {
                        measure.value * measure.unit_factor(category, factory)
                    }
                    _ => {
                        tracing::warn!(unit = %name, "Conversion factor is not a measure, using 1.0");
                        1.0
                    }
                }
            }
            UnitKind::ContextDependent { name } => {
                tracing::warn!(unit = %name, "Context dependent unit has no numeric definition, using 1.0");
                1.0
            }
        }
    }
}

/// A value with an explicit unit, e.g. a conversion factor or an
/// uncertainty bound
#[derive(Debug, Clone, PartialEq)]
pub struct MeasureWithUnit {
    pub value: f64,
    pub unit: EntityKey,
    /// Registered name, which tells the kind of measure
    pub measure: &'static str,
    pub name: String,
}

impl MeasureWithUnit {
    /// Factor of the measure's unit for `category`; 1.0 if the unit is not
    /// a named unit
    pub fn unit_factor(&self, category: UnitCategory, factory: &Factory) -> f64 {
        match factory.entity(self.unit) {
            Ok(Entity::NamedUnit(unit)) => unit.factor(category, factory),
            _ => {
                tracing::warn!(measure = self.measure, "Measure unit is not a named unit, using 1.0");
                1.0
            }
        }
    }

    /// The value in internal units of `category`
    pub fn converted(&self, category: UnitCategory, factory: &Factory) -> f64 {
        self.value * self.unit_factor(category, factory)
    }
}

fn load_named_unit(loader: &mut Loader<'_>) -> Result<Entity> {
    let (flavor, category) = UNIT_TYPES
        .iter()
        .find(|(name, _, _)| *name == loader.name())
        .map(|(_, flavor, category)| (*flavor, *category))
        .unwrap_or((UnitFlavor::Si, None));

    let unit = match flavor {
        UnitFlavor::Si => {
            let prefix = match loader.optional_enumeration("prefix")? {
                Some(value) => {
                    let prefix = SiPrefix::from_step(value);
                    if prefix.is_none() {
                        tracing::warn!(id = loader.id(), prefix = value, "Unknown SI prefix, ignoring");
                    }
                    prefix
                }
                None => None,
            };
            let name = SiUnitName::from_step(loader.enumeration("name")?);
            let category = category.unwrap_or_else(|| name.category());
            NamedUnit::si(prefix, name, category)
        }
        UnitFlavor::ConversionBased => NamedUnit {
            kind: UnitKind::ConversionBased {
                name: loader.label("name"),
                factor: loader.entity("conversion_factor")?,
            },
            category: category.unwrap_or(UnitCategory::Other),
        },
        UnitFlavor::ContextDependent => NamedUnit {
            kind: UnitKind::ContextDependent {
                name: loader.label("name"),
            },
            category: category.unwrap_or(UnitCategory::Other),
        },
    };
    Ok(Entity::NamedUnit(unit))
}

fn load_measure(loader: &mut Loader<'_>) -> Result<Entity> {
    Ok(Entity::MeasureWithUnit(MeasureWithUnit {
        value: loader.real("value_component")?,
        unit: loader.entity("unit_component")?,
        measure: loader.name(),
        name: loader.label("name"),
    }))
}

pub(crate) fn register(registry: &mut Registry) {
    for &(name, _, _) in UNIT_TYPES {
        registry.register(name, load_named_unit);
    }
    for &name in MEASURE_TYPES {
        registry.register(name, load_measure);
    }
}
