// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Exchange structure framing and HEADER section

use crate::decoder::StatementScanner;
use crate::entity::AttributeValue;
use crate::error::{Error, Result};
use crate::parser::parse_header_entity;

const MAGIC: &str = "ISO-10303-21;";

/// Contents of the HEADER section
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileHeader {
    pub description: Vec<String>,
    pub implementation_level: String,
    pub name: String,
    pub time_stamp: String,
    pub author: Vec<String>,
    pub organization: Vec<String>,
    pub preprocessor_version: String,
    pub originating_system: String,
    pub authorization: String,
    pub schemas: Vec<String>,
}

/// Byte ranges of the sections of an exchange file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sections {
    pub header: (usize, usize),
    /// Start of the DATA section body; it ends at its ENDSEC statement
    pub data_start: usize,
}

fn strings(value: Option<&AttributeValue>) -> Vec<String> {
    match value {
        Some(AttributeValue::List(items)) => items
            .iter()
            .filter_map(|v| v.as_string().map(str::to_string))
            .collect(),
        Some(AttributeValue::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn string(value: Option<&AttributeValue>) -> String {
    value
        .and_then(AttributeValue::as_string)
        .unwrap_or_default()
        .to_string()
}

/// Locate HEADER and DATA sections
pub fn locate_sections(content: &str) -> Result<Sections> {
    let body = content.trim_start_matches('\u{feff}').trim_start();
    if !body.starts_with(MAGIC) {
        return Err(Error::Header(format!("missing {} signature", MAGIC)));
    }

    let header_start = content
        .find("HEADER;")
        .map(|p| p + "HEADER;".len())
        .ok_or_else(|| Error::Header("missing HEADER section".into()))?;
    let header_end = content[header_start..]
        .find("ENDSEC;")
        .map(|p| header_start + p)
        .ok_or_else(|| Error::Header("unterminated HEADER section".into()))?;
    let data_start = content[header_end..]
        .find("DATA;")
        .map(|p| header_end + p + "DATA;".len())
        .ok_or_else(|| Error::Header("missing DATA section".into()))?;

    Ok(Sections {
        header: (header_start, header_end),
        data_start,
    })
}

/// Parse the HEADER section entries
pub fn parse_header(content: &str, sections: &Sections) -> Result<FileHeader> {
    let (start, end) = sections.header;
    let mut header = FileHeader::default();

    for (s, e) in StatementScanner::new(content, start, end) {
        let (name, tokens) = parse_header_entity(&content[s..e])?;
        let values: Vec<AttributeValue> = tokens.iter().map(AttributeValue::from_token).collect();
        match name.to_ascii_uppercase().as_str() {
            "FILE_DESCRIPTION" => {
                header.description = strings(values.first());
                header.implementation_level = string(values.get(1));
            }
            "FILE_NAME" => {
                header.name = string(values.first());
                header.time_stamp = string(values.get(1));
                header.author = strings(values.get(2));
                header.organization = strings(values.get(3));
                header.preprocessor_version = string(values.get(4));
                header.originating_system = string(values.get(5));
                header.authorization = string(values.get(6));
            }
            "FILE_SCHEMA" => {
                header.schemas = strings(values.first());
            }
            // Optional user-defined header entries carry nothing we use
            _ => {}
        }
    }

    if header.schemas.is_empty() {
        return Err(Error::Header("FILE_SCHEMA is missing or empty".into()));
    }
    Ok(header)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "ISO-10303-21;
HEADER;
FILE_DESCRIPTION(('a cube'),'2;1');
FILE_NAME('cube.stp','2024-01-01T00:00:00',('someone'),('org'),'pre','sys','');
FILE_SCHEMA(('CONFIG_CONTROL_DESIGN'));
ENDSEC;
DATA;
#1=CARTESIAN_POINT('',(0.,0.,0.));
ENDSEC;
END-ISO-10303-21;
";

    #[test]
    fn test_parse_header() {
        let sections = locate_sections(HEADER).unwrap();
        let header = parse_header(HEADER, &sections).unwrap();
        assert_eq!(header.description, vec!["a cube".to_string()]);
        assert_eq!(header.implementation_level, "2;1");
        assert_eq!(header.name, "cube.stp");
        assert_eq!(header.author, vec!["someone".to_string()]);
        assert_eq!(header.schemas, vec!["CONFIG_CONTROL_DESIGN".to_string()]);
        assert!(HEADER[sections.data_start..].trim_start().starts_with("#1="));
    }

    #[test]
    fn test_missing_signature() {
        assert!(matches!(
            locate_sections("HEADER;ENDSEC;DATA;ENDSEC;"),
            Err(Error::Header(_))
        ));
    }

    #[test]
    fn test_missing_schema() {
        let content = HEADER.replace("FILE_SCHEMA(('CONFIG_CONTROL_DESIGN'));\n", "");
        let sections = locate_sections(&content).unwrap();
        assert!(matches!(
            parse_header(&content, &sections),
            Err(Error::Header(_))
        ));
    }
}
