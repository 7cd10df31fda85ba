// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::config::Config;
use crate::error::{DecodeError, EncodeError};
use crate::xmlrpc::dom::{self, escape};
use crate::xmlrpc::registry::Registry;
use crate::xmlrpc::value::Value;
use crate::xmlrpc::{FAULT, METHOD_RESPONSE, PARAM, PARAMS, VALUE};

const FAULT_CODE: &str = "faultCode";
const FAULT_STRING: &str = "faultString";

/// A server's answer: the returned value, or the fault it reported.
pub type Response = Result<Value, Fault>;

/// Protocol-level failure reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub code: i32,
    pub message: String,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} [{}]", self.message, self.code)
    }
}

impl std::error::Error for Fault {}

impl Fault {
    fn from_value(value: &Value) -> Result<Fault, DecodeError> {
        if value.as_struct().is_none() {
            return Err(DecodeError::MalformedFault("fault value must be a struct"));
        }
        let code = value
            .get(FAULT_CODE)
            .and_then(Value::as_i32)
            .ok_or(DecodeError::MalformedFault("faultCode must be an integer"))?;
        let message = value
            .get(FAULT_STRING)
            .and_then(Value::as_str)
            .ok_or(DecodeError::MalformedFault("faultString must be a string"))?;
        Ok(Fault {
            code,
            message: message.to_string(),
        })
    }
}

/// An outbound method call.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: String,
    pub params: Vec<Value>,
}

impl Request {
    pub fn new(method: &str) -> Request {
        Request {
            method: method.to_string(),
            params: Vec::new(),
        }
    }

    /// Appends a parameter.
    pub fn argument<T: Into<Value>>(mut self, value: T) -> Request {
        self.params.push(value.into());
        self
    }

    /// Serializes the call. Under `strict` the method name is checked first.
    pub fn to_xml(&self, config: &Config, registry: &Registry) -> Result<String, EncodeError> {
        build_request(&self.method, &self.params, config, registry)
    }
}

/// Serializes a call to `method` with `params`, without taking ownership of either.
pub fn build_request(
    method: &str,
    params: &[Value],
    config: &Config,
    registry: &Registry,
) -> Result<String, EncodeError> {
    if config.strict {
        validate_method_name(method)?;
    }

    let mut body = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <methodCall><methodName>{}</methodName><params>",
        escape(method)
    );
    for param in params {
        body.push_str("<param>");
        registry.encode_value(param, &mut body)?;
        body.push_str("</param>");
    }
    body.push_str("</params></methodCall>");

    if config.debug {
        debug!("XMLRPC request body: {}", body);
    }
    Ok(body)
}

/// Method names may only use `A-Z a-z 0-9 . _ : /`.
pub fn validate_method_name(method: &str) -> Result<(), EncodeError> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern =
        PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9._:/]*$").expect("method name pattern"));
    if pattern.is_match(method) {
        Ok(())
    } else {
        Err(EncodeError::InvalidMethodName(method.to_string()))
    }
}

/// Validates a `methodResponse` document and extracts its value or fault.
pub fn parse_response(body: &str, config: &Config, registry: &Registry) -> Result<Response, DecodeError> {
    let root = dom::parse(body, config)?;
    if config.debug {
        debug!("XMLRPC response document:\n{}", root.pretty());
    }

    if root.name != METHOD_RESPONSE {
        return Err(DecodeError::MissingRoot { found: root.name.clone() });
    }

    let outcome = match root.elements()?.as_slice() {
        [outcome] => *outcome,
        [] => {
            return Err(DecodeError::MissingElement {
                parent: METHOD_RESPONSE.to_string(),
                expected: PARAMS,
            })
        }
        _ => {
            return Err(DecodeError::TooManyChildren {
                parent: METHOD_RESPONSE.to_string(),
            })
        }
    };

    match outcome.name.as_str() {
        PARAMS => {
            let value = outcome.only(PARAM)?.only(VALUE)?;
            let value = registry.decode_value(value)?;
            trace!("XMLRPC response decoded to {:?}", value.kind());
            Ok(Ok(value))
        }
        FAULT => {
            let value = registry.decode_value(outcome.only(VALUE)?)?;
            let fault = Fault::from_value(&value)?;
            debug!("XMLRPC server fault: {}", fault);
            Ok(Err(fault))
        }
        _ => Err(DecodeError::UnexpectedElement {
            parent: METHOD_RESPONSE.to_string(),
            found: outcome.name.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xmlrpc::value::Struct;
    use time::macros::datetime;

    const XML_DECL: &str = "<?xml version=\"1.0\"?>";

    fn respond(body: &str) -> Result<Response, DecodeError> {
        respond_with(body, &Config::default())
    }

    fn respond_with(body: &str, config: &Config) -> Result<Response, DecodeError> {
        parse_response(body, config, &Registry::new(config))
    }

    fn wrap(value: &str) -> String {
        format!(
            "{}<methodResponse>  <params>    <param>      {}    </param>  </params></methodResponse>",
            XML_DECL, value
        )
    }

    #[test]
    fn test_encode() {
        let expected = "<?xml version=\"1.0\" encoding=\"UTF-8\"?><methodCall><methodName>method_name_value</methodName><params><param><value><string>string_value</string></value></param><param><value><double>4.2</double></value></param><param><value><boolean>1</boolean></value></param></params></methodCall>";

        let config = Config::default();
        let request = Request::new("method_name_value")
            .argument("string_value")
            .argument(4.2)
            .argument(true);

        assert_eq!(expected, request.to_xml(&config, &Registry::new(&config)).unwrap());
    }

    #[test]
    fn test_decode() {
        let response = respond(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>
             <methodResponse>
             <params>
              <param>
               <value>
                <struct>
                 <member>
                  <name>key1</name>
                  <value>
                   <string>string_value</string>
                  </value>
                 </member>
                 <member>
                  <name>key2</name>
                  <value>
                   <double>4.2</double>
                  </value>
                 </member>
                 <member>
                  <name>key3</name>
                  <value>
                   <boolean>1</boolean>
                  </value>
                 </member>
                </struct>
               </value>
              </param>
             </params>
             </methodResponse>",
        )
        .unwrap()
        .unwrap();

        assert_eq!(response.get("key1").and_then(Value::as_str), Some("string_value"));
        assert_eq!(response.get("key2").and_then(Value::as_f64), Some(4.2));
        assert_eq!(response.get("key3").and_then(Value::as_bool), Some(true));
    }

    #[test]
    fn simple_response_with_optional_header() {
        assert_eq!(respond(&wrap("<value><string>toto</string></value>")).unwrap(), Ok(Value::from("toto")));
        let headerless = "<methodResponse><params><param><value><string>toto</string></value></param></params></methodResponse>";
        assert_eq!(respond(headerless).unwrap(), Ok(Value::from("toto")));
    }

    #[test]
    fn complex_response() {
        let value = respond(&wrap(
            "<value><struct>\
               <member><name>intValue</name><value><i4>12</i4></value></member>\
               <member><name>otherIntValue</name><value><int>13</int></value></member>\
               <member><name>boolValue</name><value><boolean>1</boolean></value></member>\
               <member><name>strValue</name><value><string>toto</string></value></member>\
               <member><name>doubleValue</name><value><double>12.4</double></value></member>\
               <member><name>dateValue</name><value><dateTime.iso8601>20200908T0440Z</dateTime.iso8601></value></member>\
               <member><name>nestedValue</name><value><struct> \
                 <member><name>innerStrValue</name><value><string>inner</string></value></member>\
               </struct></value></member>\
             </struct></value>",
        ))
        .unwrap()
        .unwrap();

        let mut inner = Struct::new();
        inner.insert("innerStrValue".to_string(), Value::from("inner"));
        let mut expected = Struct::new();
        expected.insert("intValue".to_string(), Value::Int32(12));
        expected.insert("otherIntValue".to_string(), Value::Int32(13));
        expected.insert("boolValue".to_string(), Value::Bool(true));
        expected.insert("strValue".to_string(), Value::from("toto"));
        expected.insert("doubleValue".to_string(), Value::Double(12.4));
        expected.insert("dateValue".to_string(), Value::DateTime(datetime!(2020-09-08 04:40:00 UTC)));
        expected.insert("nestedValue".to_string(), Value::Struct(inner));
        assert_eq!(value, Value::Struct(expected));
    }

    #[test]
    fn base64_response() {
        let value = respond(&wrap("<value><base64>QWVyaXM=</base64></value>")).unwrap().unwrap();
        assert_eq!(value.as_bytes(), Some(&b"Aeris"[..]));
    }

    #[test]
    fn fault_is_a_distinct_outcome() {
        let fault = respond(
            "<methodResponse>\
               <fault>\
                 <value>\
                   <struct>\
                     <member><name>faultCode</name><value><int>4</int></value></member>\
                     <member><name>faultString</name><value><string>error X occurred</string></value></member>\
                   </struct>\
                 </value>\
               </fault>\
             </methodResponse>",
        )
        .unwrap()
        .unwrap_err();

        assert_eq!(
            fault,
            Fault {
                code: 4,
                message: "error X occurred".to_string()
            }
        );
        assert_eq!(fault.to_string(), "error X occurred [4]");
    }

    #[test]
    fn malformed_faults() {
        let not_struct = "<methodResponse><fault><value><int>4</int></value></fault></methodResponse>";
        assert!(matches!(respond(not_struct), Err(DecodeError::MalformedFault(_))));
        let no_code = "<methodResponse><fault><value><struct>\
             <member><name>faultString</name><value><string>x</string></value></member>\
             </struct></value></fault></methodResponse>";
        assert!(matches!(respond(no_code), Err(DecodeError::MalformedFault(_))));
    }

    #[test]
    fn comments_are_ignored() {
        let value = respond(&wrap(
            "<!--value><string>toto</string></value--><value><string>tata</string></value>",
        ))
        .unwrap();
        assert_eq!(value, Ok(Value::from("tata")));
        let value = respond(&wrap("<value><string>ti<!--blah-->ti</string></value>")).unwrap();
        assert_eq!(value, Ok(Value::from("titi")));
    }

    #[test]
    fn trailing_whitespace_in_tags() {
        for ws in [" ", "\n", "\t"] {
            let body = format!(
                "{decl}<methodResponse{ws}>  <params>    <param>      <value><string>toto</string></value>    </param{ws}>  </params></methodResponse>",
                decl = XML_DECL,
                ws = ws
            );
            assert_eq!(respond(&body).unwrap(), Ok(Value::from("toto")));
        }
    }

    #[test]
    fn special_characters() {
        assert_eq!(respond(&wrap("<value><string>to&lt;to</string></value>")).unwrap(), Ok(Value::from("to<to")));
    }

    #[test]
    fn wrong_root_is_never_a_value() {
        let result = respond("<params><param><value><string>toto</string></value></param></params>");
        assert!(matches!(result, Err(DecodeError::MissingRoot { ref found }) if found == "params"));
    }

    #[test]
    fn missing_params_or_param() {
        let no_params = "<methodResponse><param><value><string>toto</string></value></param></methodResponse>";
        assert!(matches!(respond(no_params), Err(DecodeError::UnexpectedElement { .. })));
        let no_param = "<methodResponse><params><value><string>toto</string></value></params></methodResponse>";
        assert!(matches!(respond(no_param), Err(DecodeError::UnexpectedElement { .. })));
        let empty = "<methodResponse></methodResponse>";
        assert!(matches!(respond(empty), Err(DecodeError::MissingElement { .. })));
        let two = "<methodResponse><params/><fault/></methodResponse>";
        assert!(matches!(respond(two), Err(DecodeError::TooManyChildren { .. })));
    }

    #[test]
    fn doctype_is_refused() {
        let body = "<?xml version=\"1.0\"?><!DOCTYPE methodResponse [<!ENTITY xxe SYSTEM \"file:///etc/passwd\">]>\
             <methodResponse><params><param><value><string>&xxe;</string></value></param></params></methodResponse>";
        assert!(matches!(respond(body), Err(DecodeError::DoctypeForbidden)));
    }

    #[test]
    fn namespaced_responses_need_the_option() {
        let body = "<ex:methodResponse xmlns:ex=\"http://ws.apache.org/xmlrpc/namespaces/extensions\">\
             <ex:params><ex:param><ex:value><ex:nil/></ex:value></ex:param></ex:params></ex:methodResponse>";
        assert!(matches!(respond(body), Err(DecodeError::MissingRoot { .. })));
        assert_eq!(respond_with(body, &Config::apache_ws()).unwrap(), Ok(Value::Nil));
    }

    #[test]
    fn untyped_response_value() {
        let body = wrap("<value>toto</value>");
        assert!(matches!(respond(&body), Err(DecodeError::UntypedValue)));
        let config = Config {
            default_type_string: true,
            ..Config::default()
        };
        assert_eq!(respond_with(&body, &config).unwrap(), Ok(Value::from("toto")));
    }

    #[test]
    fn strict_method_names() {
        let strict = Config {
            strict: true,
            ..Config::default()
        };
        let registry = Registry::new(&strict);
        assert!(Request::new("system.listMethods").to_xml(&strict, &registry).is_ok());
        assert!(Request::new("ns:a/b_c").to_xml(&strict, &registry).is_ok());
        assert_eq!(
            Request::new("bad name!").to_xml(&strict, &registry),
            Err(EncodeError::InvalidMethodName("bad name!".to_string()))
        );

        let lenient = Config::default();
        let body = Request::new("a<b").to_xml(&lenient, &Registry::new(&lenient)).unwrap();
        assert!(body.contains("<methodName>a&lt;b</methodName>"));
    }

    #[test]
    fn request_encoding_fails_on_disabled_types() {
        let config = Config::default();
        let request = Request::new("m").argument(1i64 << 40);
        assert_eq!(
            request.to_xml(&config, &Registry::new(&config)),
            Err(EncodeError::Int64Disabled(1 << 40))
        );
    }

    #[test]
    fn request_round_trips_through_a_response() {
        let config = Config {
            nil: true,
            eight_byte_int: true,
            ..Config::default()
        };
        let registry = Registry::new(&config);
        let params = vec![
            Value::Int32(-3),
            Value::Int64(1 << 40),
            Value::Double(0.5),
            Value::from("a & b < c"),
            Value::Bytes(vec![0, 255]),
            Value::Nil,
            Value::DateTime(datetime!(1999-12-31 23:59:59 UTC)),
        ];
        for param in params {
            let mut body = String::from("<methodResponse><params><param>");
            registry.encode_value(&param, &mut body).unwrap();
            body.push_str("</param></params></methodResponse>");
            assert_eq!(parse_response(&body, &config, &registry).unwrap(), Ok(param));
        }
    }

    #[test]
    fn deeply_nested_response() {
        const DEPTH: usize = 5_000;
        let value = format!(
            "{}<value><int>1</int></value>{}",
            "<value><array><data>".repeat(DEPTH),
            "</data></array></value>".repeat(DEPTH)
        );
        let config = Config {
            debug: true,
            ..Config::default()
        };
        let mut current = &respond_with(&wrap(&value), &config).unwrap().unwrap();
        let mut depth = 0;
        while let Some(items) = current.as_array() {
            current = &items[0];
            depth += 1;
        }
        assert_eq!(depth, DEPTH);
        assert_eq!(current.as_i32(), Some(1));
    }
}
