// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

#![forbid(non_camel_case_types)]

//! XML-RPC library: value model, wire codec and the client-side call cycle
//!
//! # What is XML-RPC?
//!
//! A remote procedure call encoded as a small XML document and carried over
//! HTTP POST. The client sends a `methodCall` naming a method and listing its
//! parameters; the server answers with a `methodResponse` holding either one
//! value or a `fault`.
//!
//! Basic documentation found on Wikipedia
//! http://en.wikipedia.org/wiki/XML-RPC
//!
//! Full specification of the XML-RPC protocol is found here:
//! http://xmlrpc.scripting.com/spec.html
//!
//! Additional errata and hints can be found here:
//! http://effbot.org/zone/xmlrpc-errata.htm
//!
//! Extension types (`i8`, `nil`) are described at
//! http://ontosys.com/xml-rpc/extensions.php

pub mod client;
pub mod date;
pub mod dom;
pub mod encoding;
pub mod protocol;
pub mod registry;
pub mod value;

pub const METHOD_CALL: &str = "methodCall";
pub const METHOD_NAME: &str = "methodName";
pub const METHOD_RESPONSE: &str = "methodResponse";
pub const PARAMS: &str = "params";
pub const PARAM: &str = "param";
pub const VALUE: &str = "value";
pub const FAULT: &str = "fault";
pub const MEMBER: &str = "member";
pub const NAME: &str = "name";
pub const DATA: &str = "data";

pub use self::client::{Client, HttpResponse, Transport};
pub use self::encoding::{decode, encode, Codec};
pub use self::protocol::{build_request, parse_response, Fault, Request, Response};
pub use self::registry::Registry;
pub use self::value::{Array, Kind, Struct, Value};
