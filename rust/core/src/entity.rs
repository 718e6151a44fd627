// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Decoded instances and their attribute values

use crate::parser::{unescape_string, RawInstance, Token};

/// STEP attribute value
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttributeValue {
    /// Entity reference
    EntityRef(u32),
    /// String value (unescaped)
    String(String),
    /// Integer value
    Integer(i64),
    /// Float value
    Float(f64),
    /// Enumeration value, without the dots
    Enum(String),
    /// List of values
    List(Vec<AttributeValue>),
    /// Typed select member such as `PARAMETER_VALUE(0.)`
    Typed(String, Box<AttributeValue>),
    /// Null/undefined
    Null,
    /// Derived value (*)
    Derived,
}

impl AttributeValue {
    /// Convert from Token
    pub fn from_token(token: &Token) -> Self {
        match token {
            Token::EntityRef(id) => AttributeValue::EntityRef(*id),
            Token::String(s) => AttributeValue::String(unescape_string(s)),
            Token::Integer(i) => AttributeValue::Integer(*i),
            Token::Float(f) => AttributeValue::Float(*f),
            Token::Enum(e) => AttributeValue::Enum(e.to_string()),
            Token::List(items) => {
                AttributeValue::List(items.iter().map(Self::from_token).collect())
            }
            Token::TypedValue(type_name, args) => {
                // A typed value always wraps exactly one parameter
                let inner = match args.as_slice() {
                    [single] => Self::from_token(single),
                    _ => AttributeValue::List(args.iter().map(Self::from_token).collect()),
                };
                AttributeValue::Typed(type_name.to_string(), Box::new(inner))
            }
            Token::Null => AttributeValue::Null,
            Token::Derived => AttributeValue::Derived,
        }
    }

    /// Get as entity reference
    #[inline]
    pub fn as_entity_ref(&self) -> Option<u32> {
        match self {
            AttributeValue::EntityRef(id) => Some(*id),
            _ => None,
        }
    }

    /// Get as string
    #[inline]
    pub fn as_string(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as enum value (strips the dots from .ENUM.)
    #[inline]
    pub fn as_enum(&self) -> Option<&str> {
        match self {
            AttributeValue::Enum(s) => Some(s),
            _ => None,
        }
    }

    /// Get as a STEP BOOLEAN/LOGICAL; `.U.` has no boolean value
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self.as_enum()? {
            "T" | "TRUE" => Some(true),
            "F" | "FALSE" => Some(false),
            _ => None,
        }
    }

    /// Get as float, looking through typed measures
    #[inline]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttributeValue::Float(f) => Some(*f),
            AttributeValue::Integer(i) => Some(*i as f64),
            AttributeValue::Typed(_, inner) => inner.as_float(),
            _ => None,
        }
    }

    /// Get as integer
    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(i) => Some(*i),
            AttributeValue::Float(f) => Some(*f as i64),
            AttributeValue::Typed(_, inner) => inner.as_int(),
            _ => None,
        }
    }

    /// Get as list
    #[inline]
    pub fn as_list(&self) -> Option<&[AttributeValue]> {
        match self {
            AttributeValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Get as typed select member: (type name, wrapped value)
    #[inline]
    pub fn as_typed(&self) -> Option<(&str, &AttributeValue)> {
        match self {
            AttributeValue::Typed(name, inner) => Some((name, inner)),
            _ => None,
        }
    }

    /// Check if null/derived
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, AttributeValue::Null | AttributeValue::Derived)
    }

    /// Parse a list of reals, e.g. the coordinates of a point
    pub fn as_float_list(&self) -> Option<Vec<f64>> {
        self.as_list()?.iter().map(|v| v.as_float()).collect()
    }
}

/// One entity record of an instance; a simple instance has exactly one
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PartialEntity {
    pub type_name: String,
    pub attributes: Vec<AttributeValue>,
}

impl PartialEntity {
    fn from_tokens(type_name: &str, tokens: &[Token]) -> Self {
        Self {
            type_name: type_name.to_ascii_uppercase(),
            attributes: tokens.iter().map(AttributeValue::from_token).collect(),
        }
    }
}

/// Decoded STEP instance
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecodedEntity {
    pub id: u32,
    /// Partial entity records in file order
    pub parts: Vec<PartialEntity>,
    complex: bool,
}

impl DecodedEntity {
    /// Create a simple (single type) instance
    pub fn simple(id: u32, type_name: &str, attributes: Vec<AttributeValue>) -> Self {
        Self {
            id,
            parts: vec![PartialEntity {
                type_name: type_name.to_ascii_uppercase(),
                attributes,
            }],
            complex: false,
        }
    }

    /// Create a complex instance from its partial entity records
    pub fn complex(id: u32, parts: Vec<PartialEntity>) -> Self {
        Self {
            id,
            parts,
            complex: true,
        }
    }

    /// Convert a parsed statement
    pub fn from_raw(id: u32, raw: &RawInstance) -> Self {
        match raw {
            RawInstance::Simple(name, tokens) => Self {
                id,
                parts: vec![PartialEntity::from_tokens(name, tokens)],
                complex: false,
            },
            RawInstance::Complex(records) => Self {
                id,
                parts: records
                    .iter()
                    .map(|(name, tokens)| PartialEntity::from_tokens(name, tokens))
                    .collect(),
                complex: true,
            },
        }
    }

    /// Instance formed from several entity records
    pub fn is_complex(&self) -> bool {
        self.complex
    }

    /// Type name of a simple instance; the first record of a complex one
    pub fn type_name(&self) -> &str {
        self.parts
            .first()
            .map(|p| p.type_name.as_str())
            .unwrap_or("")
    }

    /// Names of every record of the instance
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|p| p.type_name.as_str())
    }

    /// Whether the instance carries a record with this name
    pub fn has_part(&self, type_name: &str) -> bool {
        self.parts
            .iter()
            .any(|p| p.type_name.eq_ignore_ascii_case(type_name))
    }

    /// Record with this name, if present
    pub fn part(&self, type_name: &str) -> Option<&PartialEntity> {
        self.parts
            .iter()
            .find(|p| p.type_name.eq_ignore_ascii_case(type_name))
    }

    /// Get positional attribute of a simple instance
    pub fn get(&self, index: usize) -> Option<&AttributeValue> {
        if self.complex {
            return None;
        }
        self.parts.first()?.attributes.get(index)
    }

    /// Get entity reference attribute
    pub fn get_ref(&self, index: usize) -> Option<u32> {
        self.get(index).and_then(|v| v.as_entity_ref())
    }

    /// Get float attribute
    pub fn get_float(&self, index: usize) -> Option<f64> {
        self.get(index).and_then(|v| v.as_float())
    }

    /// Every entity id referenced anywhere in the instance
    pub fn references(&self) -> Vec<u32> {
        fn collect(value: &AttributeValue, out: &mut Vec<u32>) {
            match value {
                AttributeValue::EntityRef(id) => out.push(*id),
                AttributeValue::List(items) => items.iter().for_each(|v| collect(v, out)),
                AttributeValue::Typed(_, inner) => collect(inner, out),
                _ => {}
            }
        }
        let mut out = Vec::new();
        for part in &self.parts {
            part.attributes.iter().for_each(|v| collect(v, &mut out));
        }
        out
    }
}
