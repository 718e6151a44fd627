// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entity index and decoded instance pool

use crate::entity::DecodedEntity;
use crate::error::{Error, Result};
use crate::header::{locate_sections, parse_header, FileHeader};
use crate::parser::parse_entity;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Pre-built entity index type
pub type EntityIndex = FxHashMap<u32, (usize, usize)>;

/// Splits a section into `;` terminated statements.
/// Semicolons inside string literals and comments do not end a statement.
pub struct StatementScanner<'a> {
    bytes: &'a [u8],
    position: usize,
    end: usize,
}

impl<'a> StatementScanner<'a> {
    pub fn new(content: &'a str, start: usize, end: usize) -> Self {
        Self {
            bytes: content.as_bytes(),
            position: start,
            end: end.min(content.len()),
        }
    }
}

impl Iterator for StatementScanner<'_> {
    /// (start, end) byte range, `end` just past the semicolon
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let bytes = self.bytes;
        while self.position < self.end && bytes[self.position].is_ascii_whitespace() {
            self.position += 1;
        }
        if self.position >= self.end {
            return None;
        }

        let start = self.position;
        let mut pos = start;
        while pos < self.end {
            let offset = memchr::memchr3(b';', b'\'', b'/', &bytes[pos..self.end])?;
            pos += offset;
            match bytes[pos] {
                b';' => {
                    self.position = pos + 1;
                    return Some((start, pos + 1));
                }
                b'\'' => {
                    // Skip to the closing quote; '' is an escaped quote
                    pos += 1;
                    loop {
                        let close = memchr::memchr(b'\'', &bytes[pos..self.end])?;
                        pos += close + 1;
                        if pos < self.end && bytes[pos] == b'\'' {
                            pos += 1;
                            continue;
                        }
                        break;
                    }
                }
                _ => {
                    if bytes.get(pos + 1) == Some(&b'*') {
                        let body = &bytes[pos + 2..self.end];
                        let close = memchr::memmem::find(body, b"*/")?;
                        pos += 2 + close + 2;
                    } else {
                        pos += 1;
                    }
                }
            }
        }
        None
    }
}

/// Build entity index over the DATA section - O(n) scan using SIMD-accelerated search
/// Returns index mapping entity IDs to byte offsets of their statements
pub fn build_entity_index(content: &str, data_start: usize) -> EntityIndex {
    let estimated_entities = content.len().saturating_sub(data_start) / 50;
    let mut index = FxHashMap::with_capacity_and_hasher(estimated_entities, Default::default());

    for (start, end) in StatementScanner::new(content, data_start, content.len()) {
        let statement = skip_comments(&content[start..end]);
        if statement.starts_with("ENDSEC") {
            break;
        }
        if let Some(id) = statement_id(statement.as_bytes()) {
            index.entry(id).or_insert((start, end));
        }
    }

    index
}

fn skip_comments(mut text: &str) -> &str {
    loop {
        text = text.trim_start();
        match text.strip_prefix("/*").and_then(|rest| rest.find("*/").map(|e| &rest[e + 2..])) {
            Some(rest) => text = rest,
            None => return text,
        }
    }
}

/// `#123 =` prefix of an instance statement
fn statement_id(bytes: &[u8]) -> Option<u32> {
    let rest = bytes.strip_prefix(b"#")?;
    let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let after = rest[digits..].iter().find(|b| !b.is_ascii_whitespace())?;
    if *after != b'=' {
        return None;
    }
    Some(parse_u32_inline(&rest[..digits]))
}

/// Fast u32 parsing without string allocation
#[inline]
fn parse_u32_inline(bytes: &[u8]) -> u32 {
    let mut result: u32 = 0;
    for &byte in bytes {
        let digit = byte.wrapping_sub(b'0');
        result = result.wrapping_mul(10).wrapping_add(digit as u32);
    }
    result
}

/// Fully decoded exchange file
///
/// Every indexed statement is decoded up front. Statements that fail to
/// tokenize are kept as malformed records, so only conversions that reach
/// them fail.
pub struct StepFile {
    header: FileHeader,
    entities: FxHashMap<u32, Arc<DecodedEntity>>,
    malformed: FxHashMap<u32, String>,
    order: Vec<u32>,
}

impl StepFile {
    /// Parse and decode a complete exchange file
    pub fn parse(content: &str) -> Result<Self> {
        let sections = locate_sections(content)?;
        let header = parse_header(content, &sections)?;
        let index = build_entity_index(content, sections.data_start);

        let mut spans: Vec<(u32, (usize, usize))> = index.into_iter().collect();
        spans.sort_unstable_by_key(|(_, (start, _))| *start);

        let mut entities = FxHashMap::with_capacity_and_hasher(spans.len(), Default::default());
        let mut malformed = FxHashMap::default();
        let mut order = Vec::with_capacity(spans.len());

        for (id, (start, end)) in spans {
            let line = &content[start..end];
            order.push(id);
            match parse_entity(line) {
                Ok((_, raw)) => {
                    entities.insert(id, Arc::new(DecodedEntity::from_raw(id, &raw)));
                }
                Err(e) => {
                    malformed.insert(
                        id,
                        format!("{} (input: {:?})", e, &line[..line.len().min(100)]),
                    );
                }
            }
        }

        if entities.is_empty() {
            return Err(Error::Empty);
        }

        Ok(Self {
            header,
            entities,
            malformed,
            order,
        })
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Decoded instance by id
    pub fn entity(&self, id: u32) -> Result<Arc<DecodedEntity>> {
        if let Some(entity) = self.entities.get(&id) {
            return Ok(Arc::clone(entity));
        }
        match self.malformed.get(&id) {
            Some(message) => Err(Error::Malformed {
                id,
                message: message.clone(),
            }),
            None => Err(Error::EntityNotFound(id)),
        }
    }

    /// Instance ids in file order, malformed ones included
    pub fn ids(&self) -> &[u32] {
        &self.order
    }

    /// Number of decoded instances
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Ids of statements that failed to tokenize
    pub fn malformed_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.malformed.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Count instances by type name, complex instances under each record name
    pub fn count_by_type(&self) -> FxHashMap<String, usize> {
        let mut counts = FxHashMap::default();
        for entity in self.entities.values() {
            for name in entity.part_names() {
                *counts.entry(name.to_string()).or_insert(0) += 1;
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(data: &str) -> String {
        format!(
            "ISO-10303-21;\nHEADER;\nFILE_DESCRIPTION((''),'2;1');\n\
             FILE_NAME('','',(''),(''),'','','');\n\
             FILE_SCHEMA(('CONFIG_CONTROL_DESIGN'));\nENDSEC;\nDATA;\n{}ENDSEC;\nEND-ISO-10303-21;\n",
            data
        )
    }

    #[test]
    fn test_statement_scanner_respects_strings_and_comments() {
        let text = "#1=A('x;y'); /* ; */ #2=B('it'';s');";
        let statements: Vec<&str> = StatementScanner::new(text, 0, text.len())
            .map(|(s, e)| &text[s..e])
            .collect();
        assert_eq!(statements, vec!["#1=A('x;y');", "/* ; */ #2=B('it'';s');"]);
    }

    #[test]
    fn test_build_entity_index() {
        let content = wrap("#10=CARTESIAN_POINT('a;b',(0.,0.,0.));\n#11 = DIRECTION('',(0.,0.,1.));\n");
        let sections = locate_sections(&content).unwrap();
        let index = build_entity_index(&content, sections.data_start);
        assert_eq!(index.len(), 2);
        let (start, end) = index[&10];
        assert_eq!(&content[start..end], "#10=CARTESIAN_POINT('a;b',(0.,0.,0.));");
        assert!(index.contains_key(&11));
    }

    #[test]
    fn test_index_skips_leading_comments() {
        let content = wrap("/* first */ #4=CARTESIAN_POINT('',(0.,0.,0.));\n");
        let file = StepFile::parse(&content).unwrap();
        assert_eq!(file.entity(4).unwrap().type_name(), "CARTESIAN_POINT");
    }

    #[test]
    fn test_step_file_keeps_malformed_records() {
        let content = wrap("#1=CARTESIAN_POINT('',(0.,0.,0.));\n#2=DIRECTION('',(0.,0.,1.)\n;\n#3=VERTEX_POINT('',#1);\n");
        let file = StepFile::parse(&content).unwrap();
        assert_eq!(file.len(), 2);
        assert_eq!(file.ids(), &[1, 2, 3]);
        assert_eq!(file.malformed_ids(), vec![2]);
        assert!(matches!(file.entity(2), Err(Error::Malformed { id: 2, .. })));
        assert!(matches!(file.entity(99), Err(Error::EntityNotFound(99))));
        assert_eq!(file.entity(3).unwrap().type_name(), "VERTEX_POINT");
    }

    #[test]
    fn test_empty_data_section_is_an_error() {
        let content = wrap("");
        assert!(matches!(StepFile::parse(&content), Err(Error::Empty)));
    }

    #[test]
    fn test_count_by_type() {
        let content = wrap(
            "#1=CARTESIAN_POINT('',(0.,0.,0.));\n#2=CARTESIAN_POINT('',(1.,0.,0.));\n\
             #3=(LENGTH_UNIT()NAMED_UNIT(*)SI_UNIT(.MILLI.,.METRE.));\n",
        );
        let file = StepFile::parse(&content).unwrap();
        let counts = file.count_by_type();
        assert_eq!(counts.get("CARTESIAN_POINT"), Some(&2));
        assert_eq!(counts.get("SI_UNIT"), Some(&1));
    }
}
