// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{DecodeError, EncodeError};
use crate::xmlrpc::dom::Element;
use crate::xmlrpc::encoding::*;
use crate::xmlrpc::value::{Kind, Struct, Value};
use crate::xmlrpc::VALUE;

/// Maps wire type tags to codecs, and value kinds back to codecs.
///
/// Built once from a `Config` and then only read, so one registry can serve
/// any number of threads. Two clients with different configurations each own
/// their own registry.
pub struct Registry {
    by_tag: HashMap<&'static str, Arc<dyn Codec>>,
    by_kind: HashMap<Kind, Arc<dyn Codec>>,
    untagged: Option<Arc<dyn Codec>>,
    eight_byte_int: bool,
    nil: bool,
}

impl Registry {
    pub fn new(config: &Config) -> Registry {
        let string: Arc<dyn Codec> = Arc::new(StringCodec {
            decode_entities: !config.no_string_decode,
            encode_entities: !config.no_string_encode,
        });
        let int: Arc<dyn Codec> = Arc::new(IntCodec);

        let mut codecs: Vec<(Kind, Arc<dyn Codec>)> = vec![
            (Kind::Int32, int.clone()),
            (Kind::Double, Arc::new(DoubleCodec)),
            (Kind::Bool, Arc::new(BooleanCodec)),
            (Kind::Str, string.clone()),
            (
                Kind::DateTime,
                Arc::new(DateTimeCodec {
                    accept_null: config.accept_null_dates,
                    default_offset: config.default_offset,
                }),
            ),
            (Kind::Bytes, Arc::new(Base64Codec)),
            (Kind::Array, Arc::new(ArrayCodec)),
            (
                Kind::Struct,
                Arc::new(StructCodec {
                    encode_entities: !config.no_string_encode,
                }),
            ),
        ];
        if config.eight_byte_int {
            codecs.push((Kind::Int64, Arc::new(LongCodec)));
        }
        if config.nil {
            codecs.push((Kind::Nil, Arc::new(NilCodec)));
        }

        let mut by_tag = HashMap::new();
        let mut by_kind = HashMap::new();
        for (kind, codec) in codecs {
            by_tag.insert(codec.tag(), codec.clone());
            by_kind.insert(kind, codec);
        }
        by_tag.insert(TYPE_I4, int);

        Registry {
            by_tag,
            by_kind,
            untagged: if config.default_type_string { Some(string) } else { None },
            eight_byte_int: config.eight_byte_int,
            nil: config.nil,
        }
    }

    /// The codec registered for a wire type tag.
    pub fn resolve(&self, tag: &str) -> Result<&dyn Codec, DecodeError> {
        if let Some(codec) = self.by_tag.get(tag) {
            return Ok(codec.as_ref());
        }
        match tag {
            TYPE_I8 | TYPE_NIL => Err(DecodeError::DisabledType(tag.to_string())),
            _ => Err(DecodeError::UnknownType(tag.to_string())),
        }
    }

    /// The codec for a `value` holding bare text, if untyped values are accepted.
    pub fn default_codec_for_untagged_value(&self) -> Option<&dyn Codec> {
        self.untagged.as_deref()
    }

    /// The codec that writes `value`.
    pub fn encoder_for(&self, value: &Value) -> Result<&dyn Codec, EncodeError> {
        match *value {
            Value::Int64(n) if !self.eight_byte_int => Err(EncodeError::Int64Disabled(n)),
            Value::Nil if !self.nil => Err(EncodeError::NilDisabled),
            _ => self
                .by_kind
                .get(&value.kind())
                .map(|codec| codec.as_ref())
                .ok_or(EncodeError::KindMismatch(VALUE)),
        }
    }

    /// Decodes a `value` element.
    ///
    /// Arrays and structs are unwound on a heap-allocated stack of frames, so
    /// any depth the document reaches decodes without growing the call stack.
    pub fn decode_value(&self, value: &Element) -> Result<Value, DecodeError> {
        let mut frames: Vec<Frame> = Vec::new();
        let mut next = Some(value);
        let mut finished = None;

        while let Some(element) = next.take() {
            match self.decode_content(element)? {
                Decoded::Value(value) => finished = Some(value),
                Decoded::Array(items) => frames.push(Frame::array(items)),
                Decoded::Struct(members) => frames.push(Frame::structure(members)),
            }

            while let Some(frame) = frames.last_mut() {
                if let Some(value) = finished.take() {
                    frame.accept(value);
                }
                if let Some(child) = frame.next_child() {
                    next = Some(child);
                    break;
                }
                finished = frames.pop().map(Frame::finish);
            }
        }

        // the root always finishes once every frame is closed
        finished.ok_or(DecodeError::UntypedValue)
    }

    /// Runs the codec for one `value` element.
    fn decode_content<'e>(&self, value: &'e Element) -> Result<Decoded<'e>, DecodeError> {
        if !value.has_elements() {
            let codec = self
                .default_codec_for_untagged_value()
                .ok_or(DecodeError::UntypedValue)?;
            return codec.decode(value);
        }

        let content = match value.elements()?.as_slice() {
            [content] => *content,
            _ => {
                return Err(DecodeError::TooManyChildren {
                    parent: VALUE.to_string(),
                })
            }
        };
        self.resolve(&content.name)?.decode(content)
    }

    /// Appends `value` wrapped in a `value` element.
    pub fn encode_value(&self, value: &Value, out: &mut String) -> Result<(), EncodeError> {
        let mut pending = vec![Piece::Value(value)];
        while let Some(piece) = pending.pop() {
            match piece {
                Piece::Text(text) => out.push_str(&text),
                Piece::Value(value) => {
                    let codec = self.encoder_for(value)?;
                    out.push_str("<value>");
                    let rest = codec.encode(value, out)?;
                    pending.push(Piece::Text(Cow::Borrowed("</value>")));
                    pending.extend(rest.into_iter().rev());
                }
            }
        }
        Ok(())
    }

    pub fn tags(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.by_tag.keys().copied()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut tags: Vec<_> = self.tags().collect();
        tags.sort_unstable();
        f.debug_struct("Registry")
            .field("tags", &tags)
            .field("untagged", &self.untagged.is_some())
            .finish()
    }
}

/// An array or struct whose children are still being decoded.
struct Frame<'e> {
    pending: std::vec::IntoIter<(Option<String>, &'e Element)>,
    name: Option<String>,
    container: Value,
}

impl<'e> Frame<'e> {
    fn array(items: Vec<&'e Element>) -> Frame<'e> {
        Frame {
            container: Value::Array(Vec::with_capacity(items.len())),
            pending: items
                .into_iter()
                .map(|item| (None, item))
                .collect::<Vec<_>>()
                .into_iter(),
            name: None,
        }
    }

    fn structure(members: Vec<(String, &'e Element)>) -> Frame<'e> {
        Frame {
            container: Value::Struct(Struct::new()),
            pending: members
                .into_iter()
                .map(|(name, value)| (Some(name), value))
                .collect::<Vec<_>>()
                .into_iter(),
            name: None,
        }
    }

    fn next_child(&mut self) -> Option<&'e Element> {
        let (name, child) = self.pending.next()?;
        self.name = name;
        Some(child)
    }

    fn accept(&mut self, value: Value) {
        match self.container {
            Value::Array(ref mut items) => items.push(value),
            Value::Struct(ref mut members) => {
                // a repeated name replaces the earlier member
                members.insert(self.name.take().unwrap_or_default(), value);
            }
            _ => {}
        }
    }

    fn finish(self) -> Value {
        self.container
    }
}
