// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use std::borrow::Cow;
use std::fmt::Write;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use time::UtcOffset;

use crate::config::Config;
use crate::error::{DecodeError, EncodeError};
use crate::xmlrpc::dom::{self, escape, Element};
use crate::xmlrpc::registry::Registry;
use crate::xmlrpc::value::Value;
use crate::xmlrpc::{date, DATA, MEMBER, NAME, VALUE};

pub const TYPE_INT: &str = "int";
pub const TYPE_I4: &str = "i4";
pub const TYPE_I8: &str = "i8";
pub const TYPE_DOUBLE: &str = "double";
pub const TYPE_BOOLEAN: &str = "boolean";
pub const TYPE_STRING: &str = "string";
pub const TYPE_DATETIME: &str = "dateTime.iso8601";
pub const TYPE_BASE64: &str = "base64";
pub const TYPE_NIL: &str = "nil";
pub const TYPE_ARRAY: &str = "array";
pub const TYPE_STRUCT: &str = "struct";

/// What a codec read from its type element.
///
/// Containers do not decode their children themselves: they hand back the
/// child `value` elements and the registry decodes them with an explicit work
/// stack, so nesting depth is bounded by the heap rather than the call stack.
#[derive(Debug)]
pub enum Decoded<'e> {
    Value(Value),
    Array(Vec<&'e Element>),
    /// Member names paired with their `value` elements, in document order.
    Struct(Vec<(String, &'e Element)>),
}

/// Output still owed after a codec wrote the opening of a container.
#[derive(Debug)]
pub enum Piece<'v> {
    Text(Cow<'static, str>),
    /// Written as a complete `value` element.
    Value(&'v Value),
}

/// Encoder and decoder for one wire type.
///
/// `decode` receives the type element (`<int>12</int>`), or the bare `value`
/// element when the value carries no type tag. `encode` appends the type
/// element, without the surrounding `value`; a container writes its opening
/// markup and returns the remaining pieces in order.
pub trait Codec: Send + Sync {
    fn tag(&self) -> &'static str;

    fn decode<'e>(&self, content: &'e Element) -> Result<Decoded<'e>, DecodeError>;

    fn encode<'v>(&self, value: &'v Value, out: &mut String) -> Result<Vec<Piece<'v>>, EncodeError>;
}

/// Shortcut function to decode a `<value>` fragment.
pub fn decode(fragment: &str, config: &Config) -> Result<Value, DecodeError> {
    let element = dom::parse(fragment, config)?;
    if element.name != VALUE {
        return Err(DecodeError::UnexpectedElement {
            parent: String::new(),
            found: element.name.clone(),
        });
    }
    Registry::new(config).decode_value(&element)
}

/// Shortcut function to encode a value into a `<value>` fragment.
pub fn encode(value: &Value, config: &Config) -> Result<String, EncodeError> {
    let mut out = String::new();
    Registry::new(config).encode_value(value, &mut out)?;
    Ok(out)
}

fn scalar<T: std::str::FromStr>(tag: &'static str, content: &Element) -> Result<T, DecodeError> {
    let text = content.text()?;
    text.trim()
        .parse()
        .map_err(|_| DecodeError::InvalidScalar { tag, text })
}

fn tagged<'v>(out: &mut String, tag: &str, body: impl std::fmt::Display) -> Result<Vec<Piece<'v>>, EncodeError> {
    // writing into a String cannot fail
    let _ = write!(out, "<{}>{}</{}>", tag, body, tag);
    Ok(Vec::new())
}

fn mismatch(tag: &'static str) -> EncodeError {
    EncodeError::KindMismatch(tag)
}

pub struct IntCodec;

impl Codec for IntCodec {
    fn tag(&self) -> &'static str {
        TYPE_INT
    }

    fn decode<'e>(&self, content: &'e Element) -> Result<Decoded<'e>, DecodeError> {
        scalar(TYPE_INT, content).map(|n| Decoded::Value(Value::Int32(n)))
    }

    fn encode<'v>(&self, value: &'v Value, out: &mut String) -> Result<Vec<Piece<'v>>, EncodeError> {
        match *value {
            Value::Int32(n) => tagged(out, TYPE_INT, n),
            _ => Err(mismatch(TYPE_INT)),
        }
    }
}

pub struct LongCodec;

impl Codec for LongCodec {
    fn tag(&self) -> &'static str {
        TYPE_I8
    }

    fn decode<'e>(&self, content: &'e Element) -> Result<Decoded<'e>, DecodeError> {
        scalar(TYPE_I8, content).map(|n| Decoded::Value(Value::Int64(n)))
    }

    fn encode<'v>(&self, value: &'v Value, out: &mut String) -> Result<Vec<Piece<'v>>, EncodeError> {
        match *value {
            Value::Int64(n) => tagged(out, TYPE_I8, n),
            _ => Err(mismatch(TYPE_I8)),
        }
    }
}

pub struct DoubleCodec;

/// At least one integer digit, one or two fraction digits: `3.2`, `0.0`, `3.14`.
pub fn format_double(n: f64) -> String {
    let mut text = format!("{:.2}", n);
    if text.ends_with('0') {
        text.pop();
    }
    text
}

impl Codec for DoubleCodec {
    fn tag(&self) -> &'static str {
        TYPE_DOUBLE
    }

    fn decode<'e>(&self, content: &'e Element) -> Result<Decoded<'e>, DecodeError> {
        scalar(TYPE_DOUBLE, content).map(|n| Decoded::Value(Value::Double(n)))
    }

    fn encode<'v>(&self, value: &'v Value, out: &mut String) -> Result<Vec<Piece<'v>>, EncodeError> {
        match *value {
            Value::Double(n) if n.is_finite() => tagged(out, TYPE_DOUBLE, format_double(n)),
            Value::Double(n) => Err(EncodeError::NonFiniteDouble(n)),
            _ => Err(mismatch(TYPE_DOUBLE)),
        }
    }
}

pub struct BooleanCodec;

impl Codec for BooleanCodec {
    fn tag(&self) -> &'static str {
        TYPE_BOOLEAN
    }

    fn decode<'e>(&self, content: &'e Element) -> Result<Decoded<'e>, DecodeError> {
        let text = content.text()?;
        match text.trim() {
            "1" => Ok(Decoded::Value(Value::Bool(true))),
            "0" => Ok(Decoded::Value(Value::Bool(false))),
            _ => Err(DecodeError::InvalidScalar {
                tag: TYPE_BOOLEAN,
                text,
            }),
        }
    }

    fn encode<'v>(&self, value: &'v Value, out: &mut String) -> Result<Vec<Piece<'v>>, EncodeError> {
        match *value {
            Value::Bool(b) => tagged(out, TYPE_BOOLEAN, u8::from(b)),
            _ => Err(mismatch(TYPE_BOOLEAN)),
        }
    }
}

pub struct StringCodec {
    pub decode_entities: bool,
    pub encode_entities: bool,
}

impl Codec for StringCodec {
    fn tag(&self) -> &'static str {
        TYPE_STRING
    }

    fn decode<'e>(&self, content: &'e Element) -> Result<Decoded<'e>, DecodeError> {
        let text = if self.decode_entities {
            content.text()?
        } else {
            content.wire_text()?
        };
        Ok(Decoded::Value(Value::Str(text)))
    }

    fn encode<'v>(&self, value: &'v Value, out: &mut String) -> Result<Vec<Piece<'v>>, EncodeError> {
        match value {
            Value::Str(s) if self.encode_entities => tagged(out, TYPE_STRING, escape(s)),
            Value::Str(s) => tagged(out, TYPE_STRING, s),
            _ => Err(mismatch(TYPE_STRING)),
        }
    }
}

/// `dateTime.iso8601` codec.
///
/// With `accept_null` an empty element decodes to `Value::Nil`, whether or not
/// the `nil` extension is enabled. Such a value only re-encodes when `nil` is
/// on; otherwise encoding it fails with `EncodeError::NilDisabled`.
pub struct DateTimeCodec {
    pub accept_null: bool,
    pub default_offset: UtcOffset,
}

impl Codec for DateTimeCodec {
    fn tag(&self) -> &'static str {
        TYPE_DATETIME
    }

    fn decode<'e>(&self, content: &'e Element) -> Result<Decoded<'e>, DecodeError> {
        let text = content.text()?;
        if self.accept_null && text.trim().is_empty() {
            return Ok(Decoded::Value(Value::Nil));
        }
        date::parse(&text, self.default_offset).map(|dt| Decoded::Value(Value::DateTime(dt)))
    }

    fn encode<'v>(&self, value: &'v Value, out: &mut String) -> Result<Vec<Piece<'v>>, EncodeError> {
        match value {
            Value::DateTime(dt) => tagged(out, TYPE_DATETIME, date::format(dt)),
            _ => Err(mismatch(TYPE_DATETIME)),
        }
    }
}

pub struct Base64Codec;

impl Codec for Base64Codec {
    fn tag(&self) -> &'static str {
        TYPE_BASE64
    }

    fn decode<'e>(&self, content: &'e Element) -> Result<Decoded<'e>, DecodeError> {
        let text: String = content
            .text()?
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        STANDARD
            .decode(text)
            .map(|bytes| Decoded::Value(Value::Bytes(bytes)))
            .map_err(|_| DecodeError::InvalidBase64)
    }

    fn encode<'v>(&self, value: &'v Value, out: &mut String) -> Result<Vec<Piece<'v>>, EncodeError> {
        match value {
            Value::Bytes(bytes) => tagged(out, TYPE_BASE64, STANDARD.encode(bytes)),
            _ => Err(mismatch(TYPE_BASE64)),
        }
    }
}

pub struct NilCodec;

impl Codec for NilCodec {
    fn tag(&self) -> &'static str {
        TYPE_NIL
    }

    fn decode<'e>(&self, _: &'e Element) -> Result<Decoded<'e>, DecodeError> {
        Ok(Decoded::Value(Value::Nil))
    }

    fn encode<'v>(&self, value: &'v Value, out: &mut String) -> Result<Vec<Piece<'v>>, EncodeError> {
        match value {
            Value::Nil => {
                out.push_str("<nil/>");
                Ok(Vec::new())
            }
            _ => Err(mismatch(TYPE_NIL)),
        }
    }
}

pub struct ArrayCodec;

impl Codec for ArrayCodec {
    fn tag(&self) -> &'static str {
        TYPE_ARRAY
    }

    fn decode<'e>(&self, content: &'e Element) -> Result<Decoded<'e>, DecodeError> {
        let items = content.only(DATA)?.elements()?;
        if let Some(element) = items.iter().find(|element| element.name != VALUE) {
            return Err(DecodeError::UnexpectedElement {
                parent: DATA.to_string(),
                found: element.name.clone(),
            });
        }
        Ok(Decoded::Array(items))
    }

    fn encode<'v>(&self, value: &'v Value, out: &mut String) -> Result<Vec<Piece<'v>>, EncodeError> {
        let items = match value {
            Value::Array(items) => items,
            _ => return Err(mismatch(TYPE_ARRAY)),
        };
        out.push_str("<array><data>");
        let mut rest: Vec<Piece> = items.iter().map(Piece::Value).collect();
        rest.push(Piece::Text(Cow::Borrowed("</data></array>")));
        Ok(rest)
    }
}

pub struct StructCodec {
    pub encode_entities: bool,
}

impl StructCodec {
    fn member(member: &Element) -> Result<(String, &Element), DecodeError> {
        let mut name = None;
        let mut value = None;
        for element in member.elements()? {
            match element.name.as_str() {
                NAME if name.is_none() => name = Some(element.text()?),
                VALUE if value.is_none() => value = Some(element),
                _ => {
                    return Err(DecodeError::UnexpectedElement {
                        parent: MEMBER.to_string(),
                        found: element.name.clone(),
                    })
                }
            }
        }

        let missing = |expected| DecodeError::MissingElement {
            parent: MEMBER.to_string(),
            expected,
        };
        Ok((name.ok_or_else(|| missing(NAME))?, value.ok_or_else(|| missing(VALUE))?))
    }
}

impl Codec for StructCodec {
    fn tag(&self) -> &'static str {
        TYPE_STRUCT
    }

    fn decode<'e>(&self, content: &'e Element) -> Result<Decoded<'e>, DecodeError> {
        let mut members = Vec::new();
        for element in content.elements()? {
            if element.name != MEMBER {
                return Err(DecodeError::UnexpectedElement {
                    parent: TYPE_STRUCT.to_string(),
                    found: element.name.clone(),
                });
            }
            members.push(StructCodec::member(element)?);
        }
        Ok(Decoded::Struct(members))
    }

    fn encode<'v>(&self, value: &'v Value, out: &mut String) -> Result<Vec<Piece<'v>>, EncodeError> {
        let members = match value {
            Value::Struct(members) => members,
            _ => return Err(mismatch(TYPE_STRUCT)),
        };
        out.push_str("<struct>");
        let mut rest = Vec::with_capacity(members.len() * 3 + 1);
        for (name, value) in members {
            let name = if self.encode_entities {
                escape(name)
            } else {
                name.clone()
            };
            rest.push(Piece::Text(Cow::Owned(format!("<member><name>{}</name>", name))));
            rest.push(Piece::Value(value));
            rest.push(Piece::Text(Cow::Borrowed("</member>")));
        }
        rest.push(Piece::Text(Cow::Borrowed("</struct>")));
        Ok(rest)
    }
}
