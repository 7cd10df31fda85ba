// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

//! Minimal element tree for response documents.
//!
//! The tree keeps element names, text and CDATA. Attributes and comments are
//! dropped. Documents carrying a `DOCTYPE` are refused before the XML reader
//! runs, so no entity declared in a DTD is ever expanded or fetched.

use std::fmt::{self, Write};

use xml::name::OwnedName;
use xml::reader::{ParserConfig, XmlEvent};

use crate::config::Config;
use crate::error::DecodeError;

#[derive(Clone, PartialEq, Debug)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
}

#[derive(Clone, PartialEq, Debug)]
pub struct Element {
    pub name: String,
    pub children: Vec<Node>,
}

/// Parses `input` into its root element.
pub fn parse(input: &str, config: &Config) -> Result<Element, DecodeError> {
    reject_doctype(input)?;

    let reader = ParserConfig::new()
        .trim_whitespace(false)
        .whitespace_to_characters(true)
        .cdata_to_characters(false)
        .ignore_comments(true)
        .coalesce_characters(true)
        .create_reader(input.as_bytes());

    let mut open: Vec<Element> = Vec::new();
    let mut root = None;

    for event in reader {
        match event? {
            XmlEvent::StartElement { name, .. } => {
                open.push(Element::new(element_name(&name, config)));
            }
            XmlEvent::EndElement { .. } => {
                // the reader guarantees balanced tags
                if let Some(element) = open.pop() {
                    match open.last_mut() {
                        Some(parent) => parent.children.push(Node::Element(element)),
                        None => root = Some(element),
                    }
                }
            }
            XmlEvent::Characters(text) | XmlEvent::Whitespace(text) => {
                if let Some(parent) = open.last_mut() {
                    parent.push_text(text);
                }
            }
            XmlEvent::CData(text) => {
                if let Some(parent) = open.last_mut() {
                    parent.children.push(Node::CData(text));
                }
            }
            _ => {}
        }
    }

    root.ok_or_else(|| DecodeError::MissingRoot { found: String::new() })
}

/// Scans the prolog (BOM, declaration, processing instructions, comments)
/// and fails on a `<!DOCTYPE`.
fn reject_doctype(input: &str) -> Result<(), DecodeError> {
    let mut rest = input.trim_start_matches('\u{feff}');
    loop {
        rest = rest.trim_start();
        if rest.starts_with("<?") {
            match rest.find("?>") {
                Some(end) => rest = &rest[end + 2..],
                None => return Ok(()),
            }
        } else if let Some(comment) = rest.strip_prefix("<!--") {
            match comment.find("-->") {
                Some(end) => rest = &comment[end + 3..],
                None => return Ok(()),
            }
        } else if rest
            .as_bytes()
            .get(..9)
            .map_or(false, |head| head.eq_ignore_ascii_case(b"<!DOCTYPE"))
        {
            return Err(DecodeError::DoctypeForbidden);
        } else {
            return Ok(());
        }
    }
}

fn element_name(name: &OwnedName, config: &Config) -> String {
    match name.prefix {
        Some(ref prefix) if !config.ignore_namespaces => format!("{}:{}", prefix, name.local_name),
        _ => name.local_name.clone(),
    }
}

impl Element {
    pub fn new(name: impl Into<String>) -> Element {
        Element {
            name: name.into(),
            children: Vec::new(),
        }
    }

    fn push_text(&mut self, text: String) {
        if let Some(Node::Text(last)) = self.children.last_mut() {
            last.push_str(&text);
        } else {
            self.children.push(Node::Text(text));
        }
    }

    /// Child elements, ignoring whitespace. Any other text is an error.
    pub fn elements(&self) -> Result<Vec<&Element>, DecodeError> {
        let mut elements = Vec::new();
        for child in &self.children {
            match child {
                Node::Element(element) => elements.push(element),
                Node::Text(text) if text.trim().is_empty() => {}
                Node::Text(_) | Node::CData(_) => {
                    return Err(DecodeError::UnexpectedText {
                        parent: self.name.clone(),
                    })
                }
            }
        }
        Ok(elements)
    }

    /// The single child element, which must be named `expected`.
    pub fn only(&self, expected: &'static str) -> Result<&Element, DecodeError> {
        match self.elements()?.as_slice() {
            [] => Err(DecodeError::MissingElement {
                parent: self.name.clone(),
                expected,
            }),
            [child] if child.name == expected => Ok(*child),
            [child] => Err(DecodeError::UnexpectedElement {
                parent: self.name.clone(),
                found: child.name.clone(),
            }),
            _ => Err(DecodeError::TooManyChildren {
                parent: self.name.clone(),
            }),
        }
    }

    pub fn has_elements(&self) -> bool {
        self.children
            .iter()
            .any(|child| matches!(child, Node::Element(_)))
    }

    /// Text and CDATA content, with entities resolved.
    pub fn text(&self) -> Result<String, DecodeError> {
        self.collect_text(|text, out| out.push_str(text))
    }

    /// Text content as it stood on the wire for `&` and `<`. CDATA stays verbatim.
    pub fn wire_text(&self) -> Result<String, DecodeError> {
        self.collect_text(|text, out| out.push_str(&escape(text)))
    }

    fn collect_text(&self, push_text: impl Fn(&str, &mut String)) -> Result<String, DecodeError> {
        let mut out = String::new();
        for child in &self.children {
            match child {
                Node::Text(text) => push_text(text.as_str(), &mut out),
                Node::CData(text) => out.push_str(text),
                Node::Element(element) => {
                    return Err(DecodeError::UnexpectedElement {
                        parent: self.name.clone(),
                        found: element.name.clone(),
                    })
                }
            }
        }
        Ok(out)
    }

    /// Indented rendering for diagnostics. Indentation stops growing after
    /// `MAX_INDENT` levels so a deep document stays linear in size.
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        // writing into a String cannot fail
        let _ = self.write_pretty(&mut out);
        out
    }

    fn write_pretty(&self, out: &mut String) -> fmt::Result {
        let indent = |depth: usize| "    ".repeat(depth.min(MAX_INDENT));
        let mut pending = vec![Pretty::Open(self, 0)];

        while let Some(step) = pending.pop() {
            match step {
                Pretty::Open(element, depth) if !element.has_elements() => {
                    let text = element.wire_text().unwrap_or_default();
                    if text.is_empty() {
                        writeln!(out, "{}<{}/>", indent(depth), element.name)?;
                    } else {
                        writeln!(out, "{}<{}>{}</{}>", indent(depth), element.name, text, element.name)?;
                    }
                }
                Pretty::Open(element, depth) => {
                    writeln!(out, "{}<{}>", indent(depth), element.name)?;
                    pending.push(Pretty::Close(element, depth));
                    pending.extend(element.children.iter().rev().map(|child| Pretty::Child(child, depth + 1)));
                }
                Pretty::Child(Node::Element(element), depth) => pending.push(Pretty::Open(element, depth)),
                Pretty::Child(Node::Text(text), _) if text.trim().is_empty() => {}
                Pretty::Child(Node::Text(text), depth) => writeln!(out, "{}{}", indent(depth), escape(text.trim()))?,
                Pretty::Child(Node::CData(text), depth) => writeln!(out, "{}<![CDATA[{}]]>", indent(depth), text)?,
                Pretty::Close(element, depth) => writeln!(out, "{}</{}>", indent(depth), element.name)?,
            }
        }
        Ok(())
    }
}

const MAX_INDENT: usize = 16;

enum Pretty<'a> {
    Open(&'a Element, usize),
    Child(&'a Node, usize),
    Close(&'a Element, usize),
}

// Children are moved onto one heap stack so a deep tree drops without
// recursing once per level.
impl Drop for Element {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(node) = pending.pop() {
            if let Node::Element(mut element) = node {
                pending.append(&mut element.children);
            }
        }
    }
}

/// Escapes the minimal entity set: `&` and `<`.
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;")
}
