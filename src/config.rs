//! Client configuration: the fixed option set a client instance runs with.

use time::UtcOffset;

/// Validate outbound method names and require an XML response content type.
pub const FLAGS_STRICT: u32 = 0x01;
/// Enable the `i8` extension type.
pub const FLAGS_8BYTE_INT: u32 = 0x02;
/// Enable the `nil` extension type.
pub const FLAGS_NIL: u32 = 0x08;
/// Attempt to decode a response whatever its HTTP status.
pub const FLAGS_IGNORE_STATUSCODE: u32 = 0x10;
/// Decode a `value` without a type element as a string.
pub const FLAGS_DEFAULT_TYPE_STRING: u32 = 0x100;
/// Match response tags by local name only.
pub const FLAGS_IGNORE_NAMESPACES: u32 = 0x200;
/// Keep `&amp;` and `&lt;` escaped in inbound strings.
pub const FLAGS_NO_STRING_DECODE: u32 = 0x800;
/// Emit outbound strings without escaping.
pub const FLAGS_NO_STRING_ENCODE: u32 = 0x1000;
/// Log raw and pretty-printed documents.
pub const FLAGS_DEBUG: u32 = 0x2000;
/// Decode an empty `dateTime.iso8601` as an absent value.
pub const FLAGS_ACCEPT_NULL_DATES: u32 = 0x4000;
/// Settings for Apache WS-XMLRPC servers.
pub const FLAGS_APACHE_WS: u32 = FLAGS_IGNORE_NAMESPACES | FLAGS_NIL | FLAGS_DEFAULT_TYPE_STRING;

/// Options selected for one client instance.
///
/// A `Config` is built once and handed by reference to the registry, the
/// request builder and the response extractor. Nothing reads it from global
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub strict: bool,
    pub eight_byte_int: bool,
    pub nil: bool,
    pub ignore_status_code: bool,
    pub default_type_string: bool,
    pub ignore_namespaces: bool,
    pub accept_null_dates: bool,
    pub no_string_decode: bool,
    pub no_string_encode: bool,
    pub debug: bool,
    /// Offset applied to `dateTime.iso8601` values that carry no timezone.
    pub default_offset: UtcOffset,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            strict: false,
            eight_byte_int: false,
            nil: false,
            ignore_status_code: false,
            default_type_string: false,
            ignore_namespaces: false,
            accept_null_dates: false,
            no_string_decode: false,
            no_string_encode: false,
            debug: false,
            default_offset: UtcOffset::UTC,
        }
    }
}

impl Config {
    /// Configuration for talking to Apache WS-XMLRPC servers.
    pub fn apache_ws() -> Config {
        Config::default().with_apache_ws()
    }

    /// Namespaces ignored, `nil` enabled, untyped values read as strings.
    pub fn with_apache_ws(mut self) -> Config {
        self.ignore_namespaces = true;
        self.nil = true;
        self.default_type_string = true;
        self
    }

    /// Builds a configuration from a word of `FLAGS_*` bits. Unknown bits are ignored.
    pub fn from_flags(flags: u32) -> Config {
        let set = |flag: u32| flags & flag != 0;
        Config {
            strict: set(FLAGS_STRICT),
            eight_byte_int: set(FLAGS_8BYTE_INT),
            nil: set(FLAGS_NIL),
            ignore_status_code: set(FLAGS_IGNORE_STATUSCODE),
            default_type_string: set(FLAGS_DEFAULT_TYPE_STRING),
            ignore_namespaces: set(FLAGS_IGNORE_NAMESPACES),
            accept_null_dates: set(FLAGS_ACCEPT_NULL_DATES),
            no_string_decode: set(FLAGS_NO_STRING_DECODE),
            no_string_encode: set(FLAGS_NO_STRING_ENCODE),
            debug: set(FLAGS_DEBUG),
            default_offset: UtcOffset::UTC,
        }
    }

    pub fn with_default_offset(mut self, offset: UtcOffset) -> Config {
        self.default_offset = offset;
        self
    }
}
