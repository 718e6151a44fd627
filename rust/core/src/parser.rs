// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STEP Part 21 parser using nom
//!
//! Zero-copy tokenization of instance statements, both simple
//! (`#1=LINE('',#2,#3);`) and complex (`#1=(CURVE()LINE(#2,#3));`).

use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{char, digit1, one_of},
    combinator::{map, map_res, opt, recognize},
    multi::{many1, separated_list0},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use crate::error::{Error, Result};

/// STEP token
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    /// Entity reference: #123
    EntityRef(u32),
    /// String literal: 'text' (still carrying its '' escapes)
    String(&'a str),
    /// Integer: 42
    Integer(i64),
    /// Real: 3.14, 0., 1.E-3
    Float(f64),
    /// Enumeration or logical: .T., .UNSPECIFIED.
    Enum(&'a str),
    /// List: (1, 2, 3)
    List(Vec<Token<'a>>),
    /// Typed value: PARAMETER_VALUE(0.), LENGTH_MEASURE(25.4)
    TypedValue(&'a str, Vec<Token<'a>>),
    /// Null value: $
    Null,
    /// Asterisk (derived value): *
    Derived,
}

/// Right hand side of an instance statement
#[derive(Debug, Clone, PartialEq)]
pub enum RawInstance<'a> {
    /// `TYPE(args)`
    Simple(&'a str, Vec<Token<'a>>),
    /// `(A(args) B(args) ...)`, one record per partial entity
    Complex(Vec<(&'a str, Vec<Token<'a>>)>),
}

/// Parse entity reference: #123
fn entity_ref(input: &str) -> IResult<&str, Token> {
    map(
        preceded(char('#'), map_res(digit1, |s: &str| s.parse::<u32>())),
        Token::EntityRef,
    )(input)
}

/// Parse string literal: 'text'
/// STEP uses '' to escape a single quote within a string
fn string_literal(input: &str) -> IResult<&str, Token> {
    fn parse_string_content(input: &str) -> IResult<&str, &str> {
        let bytes = input.as_bytes();
        let mut i = 0;

        while i < bytes.len() {
            if bytes[i] == b'\'' {
                if i + 1 < bytes.len() && bytes[i + 1] == b'\'' {
                    i += 2;
                    continue;
                }
                return Ok((&input[i..], &input[..i]));
            }
            i += 1;
        }

        Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Char,
        )))
    }

    map(
        delimited(char('\''), parse_string_content, char('\'')),
        Token::String,
    )(input)
}

/// Parse integer: 42, -42, +42
fn integer(input: &str) -> IResult<&str, Token> {
    map_res(recognize(pair(opt(one_of("+-")), digit1)), |s: &str| {
        s.parse::<i64>().map(Token::Integer)
    })(input)
}

/// lexical-core first, std as the fallback for anything it rejects
fn parse_real(text: &str) -> Option<f64> {
    lexical_core::parse::<f64>(text.as_bytes())
        .ok()
        .or_else(|| text.parse::<f64>().ok())
}

/// Parse real: 3.14, -3.14, 1.5E-10, 0., 1.E3
fn float(input: &str) -> IResult<&str, Token> {
    map_res(
        recognize(tuple((
            opt(one_of("+-")),
            digit1,
            char('.'),
            opt(digit1),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
        |s: &str| parse_real(s).map(Token::Float).ok_or(()),
    )(input)
}

/// Parse enumeration: .T., .F., .U., .MILLI.
fn enum_value(input: &str) -> IResult<&str, Token> {
    map(
        delimited(
            char('.'),
            take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
            char('.'),
        ),
        Token::Enum,
    )(input)
}

fn null(input: &str) -> IResult<&str, Token> {
    map(char('$'), |_| Token::Null)(input)
}

fn derived(input: &str) -> IResult<&str, Token> {
    map(char('*'), |_| Token::Derived)(input)
}

/// Entity or type keyword, including user-defined `!NAME` keywords
fn keyword(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        opt(char('!')),
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

/// Comma separated arguments between parentheses
fn arguments(input: &str) -> IResult<&str, Vec<Token>> {
    delimited(
        char('('),
        delimited(ws, separated_list0(char(','), token), ws),
        char(')'),
    )(input)
}

/// Parse typed value: PARAMETER_VALUE(0.), POSITIVE_LENGTH_MEASURE(2.5)
fn typed_value(input: &str) -> IResult<&str, Token> {
    map(
        pair(terminated(keyword, ws), arguments),
        |(type_name, args)| Token::TypedValue(type_name, args),
    )(input)
}

/// Skip whitespace and `/* ... */` comments
pub(crate) fn ws(input: &str) -> IResult<&str, ()> {
    let mut rest = input.trim_start();
    while let Some(after) = rest.strip_prefix("/*") {
        match after.find("*/") {
            Some(end) => rest = after[end + 2..].trim_start(),
            None => {
                return Err(nom::Err::Error(nom::error::Error::new(
                    rest,
                    nom::error::ErrorKind::Char,
                )))
            }
        }
    }
    Ok((rest, ()))
}

/// Parse a token with optional surrounding whitespace
fn token(input: &str) -> IResult<&str, Token> {
    delimited(
        ws,
        alt((
            float, // Try float before integer (float includes '.')
            integer,
            entity_ref,
            string_literal,
            enum_value,
            list,
            typed_value,
            null,
            derived,
        )),
        ws,
    )(input)
}

/// Parse list: (1, 2, 3) or nested lists
fn list(input: &str) -> IResult<&str, Token> {
    map(arguments, Token::List)(input)
}

fn partial_entity(input: &str) -> IResult<&str, (&str, Vec<Token>)> {
    delimited(ws, pair(terminated(keyword, ws), arguments), ws)(input)
}

fn instance_body(input: &str) -> IResult<&str, RawInstance> {
    alt((
        map(partial_entity, |(name, args)| RawInstance::Simple(name, args)),
        map(
            delimited(char('('), many1(partial_entity), char(')')),
            RawInstance::Complex,
        ),
    ))(input)
}

/// Parse a complete instance statement
/// Example: `#123=CARTESIAN_POINT('',(0.,0.,1.));`
pub fn parse_entity(input: &str) -> Result<(u32, RawInstance)> {
    let result: IResult<&str, (u32, RawInstance)> = tuple((
        delimited(
            ws,
            preceded(char('#'), map_res(digit1, |s: &str| s.parse::<u32>())),
            ws,
        ),
        preceded(
            char('='),
            terminated(delimited(ws, instance_body, ws), char(';')),
        ),
    ))(input);

    match result {
        Ok((_, (id, body))) => Ok((id, body)),
        Err(e) => Err(Error::parse(0, format!("Failed to parse entity: {}", e))),
    }
}

/// Parse a header statement: `FILE_SCHEMA(('CONFIG_CONTROL_DESIGN'));`
pub fn parse_header_entity(input: &str) -> Result<(&str, Vec<Token>)> {
    match terminated(partial_entity, char(';'))(input) {
        Ok((_, entity)) => Ok(entity),
        Err(e) => Err(Error::Header(format!("malformed header entry: {}", e))),
    }
}

/// Undo the `''` quote escaping of a string literal
pub fn unescape_string(raw: &str) -> String {
    raw.replace("''", "'")
}
