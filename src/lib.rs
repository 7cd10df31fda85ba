//! XML-RPC value model and wire codec.
//!
//! Builds `methodCall` documents from [`Value`]s and validates `methodResponse`
//! documents back into a value or a [`Fault`]. The HTTP exchange itself sits
//! behind the [`Transport`] trait.
//!
//! ```
//! use xmlrpc_codec::{Client, Config, HttpResponse, Value};
//! use xmlrpc_codec::error::TransportError;
//!
//! let server = |_: &str| -> Result<HttpResponse, TransportError> {
//!     Ok(HttpResponse::ok(
//!         "<methodResponse><params><param><value><int>42</int></value></param></params></methodResponse>",
//!     ))
//! };
//! let client = Client::new(server, Config::default());
//! let answer = client.call("answer.get", &[Value::from("life")]).unwrap();
//! assert_eq!(answer, Ok(Value::Int32(42)));
//! ```

#[macro_use]
extern crate log;

pub mod config;
pub mod error;
pub mod xmlrpc;

pub use crate::config::Config;
pub use crate::error::{CallError, DecodeError, EncodeError, TransportError};
pub use crate::xmlrpc::{Client, Fault, HttpResponse, Registry, Request, Response, Transport, Value};
