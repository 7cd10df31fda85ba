use std::io;

use thiserror::Error;

/// A response document could not be turned into a value.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed xml: {0}")]
    Xml(#[from] xml::reader::Error),
    #[error("DOCTYPE declarations are not accepted")]
    DoctypeForbidden,
    #[error("document is not valid utf-8")]
    InvalidUtf8,
    #[error("missing root tag: expected <methodResponse>, found {found:?}")]
    MissingRoot { found: String },
    #[error("unexpected <{found}> inside <{parent}>")]
    UnexpectedElement { parent: String, found: String },
    #[error("<{parent}> must contain a <{expected}> tag")]
    MissingElement { parent: String, expected: &'static str },
    #[error("<{parent}> must contain exactly one element")]
    TooManyChildren { parent: String },
    #[error("unexpected text inside <{parent}>")]
    UnexpectedText { parent: String },
    #[error("unknown type tag <{0}>")]
    UnknownType(String),
    #[error("type tag <{0}> is not enabled")]
    DisabledType(String),
    #[error("value has no type tag")]
    UntypedValue,
    #[error("invalid <{tag}> content {text:?}")]
    InvalidScalar { tag: &'static str, text: String },
    #[error("unable to parse date {text:?}: {reason}")]
    InvalidDate { text: String, reason: String },
    #[error("invalid base64 content")]
    InvalidBase64,
    #[error("malformed fault: {0}")]
    MalformedFault(&'static str),
}

/// A value or call could not be serialized under the active configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("8-byte integer {0} requires the i8 extension")]
    Int64Disabled(i64),
    #[error("nil values require the nil extension")]
    NilDisabled,
    #[error("{0} cannot be represented as an XML-RPC double")]
    NonFiniteDouble(f64),
    #[error("method name {0:?} must only contain A-Z a-z 0-9 . : _ /")]
    InvalidMethodName(String),
    #[error("<{0}> codec handed a value of another type")]
    KindMismatch(&'static str),
}

/// Failure raised by a transport before any response document exists.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Other(String),
}

/// Everything that can prevent a call from producing a `Response`.
#[derive(Debug, Error)]
pub enum CallError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("request failed with status code {0}")]
    Status(u16),
    #[error("the Content-Type of the response must be text/xml, got {0:?}")]
    ContentType(String),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
}
