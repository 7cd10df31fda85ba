// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use crate::config::Config;
use crate::error::{CallError, DecodeError, TransportError};
use crate::xmlrpc::protocol::{build_request, parse_response, Request, Response};
use crate::xmlrpc::registry::Registry;
use crate::xmlrpc::value::Value;

/// Content-Type header a transport should send with every request.
pub const CONTENT_TYPE: &str = "text/xml; charset=utf-8";
/// User-Agent header a transport should send with every request.
pub const USER_AGENT: &str = concat!("xmlrpc-codec/", env!("CARGO_PKG_VERSION"));

const XML_MEDIA_TYPE: &str = "text/xml";

/// What a transport hands back for one POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// A 200 response carrying `text/xml`.
    pub fn ok(body: impl Into<Vec<u8>>) -> HttpResponse {
        HttpResponse {
            status: 200,
            content_type: Some(CONTENT_TYPE.to_string()),
            body: body.into(),
        }
    }
}

/// Delivers a serialized request to the server and returns its raw answer.
///
/// Implementations own the connection details: endpoint URL, TLS, proxies,
/// authentication, cookies and timeouts.
pub trait Transport {
    fn post(&self, body: &str) -> Result<HttpResponse, TransportError>;
}

impl<F> Transport for F
where
    F: Fn(&str) -> Result<HttpResponse, TransportError>,
{
    fn post(&self, body: &str) -> Result<HttpResponse, TransportError> {
        self(body)
    }
}

/// Runs calls through a transport. The codec registry is built once, so a
/// client can be shared across threads whenever its transport can.
#[derive(Debug)]
pub struct Client<T> {
    transport: T,
    config: Config,
    registry: Registry,
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T, config: Config) -> Client<T> {
        Client {
            transport,
            registry: Registry::new(&config),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn call(&self, method: &str, params: &[Value]) -> Result<Response, CallError> {
        let body = build_request(method, params, &self.config, &self.registry)?;

        debug!("Send XMLRPC request: {}", method);
        trace!("XMLRPC body: {}", body);

        let response = self.transport.post(&body)?;

        if !self.config.ignore_status_code && response.status != 200 {
            return Err(CallError::Status(response.status));
        }
        if self.config.strict {
            let content_type = response.content_type.as_deref().unwrap_or_default();
            if !content_type.starts_with(XML_MEDIA_TYPE) {
                return Err(CallError::ContentType(content_type.to_string()));
            }
        }

        let body = String::from_utf8(response.body).map_err(|_| DecodeError::InvalidUtf8)?;
        trace!("Response body: {}", body);

        Ok(parse_response(&body, &self.config, &self.registry)?)
    }

    pub fn remote_call(&self, request: &Request) -> Result<Response, CallError> {
        self.call(&request.method, &request.params)
    }
}
