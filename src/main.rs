#[macro_use]
extern crate log;

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use base64::prelude::*;
use clap::{ArgAction, Args, Parser, Subcommand};
use env_logger::Env;
use thiserror::Error;
use time::UtcOffset;

use xmlrpc_codec::config::Config;
use xmlrpc_codec::error::{DecodeError, EncodeError};
use xmlrpc_codec::xmlrpc::{date, parse_response, Registry, Request, Value};

/// Build XML-RPC requests and inspect XML-RPC responses
#[derive(Debug, Parser)]
#[command(name = "xrpc", version, author)]
struct Cli {
    #[command(flatten)]
    options: Options,

    /// Verbose mode (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct Options {
    /// Validate method names and require a text/xml content type
    #[arg(long, global = true)]
    strict: bool,
    /// Enable the i8 extension type
    #[arg(long, global = true)]
    i8: bool,
    /// Enable the nil extension type
    #[arg(long, global = true)]
    nil: bool,
    /// Read a value without a type tag as a string
    #[arg(long, global = true)]
    default_type_string: bool,
    /// Match tags by local name only
    #[arg(long, global = true)]
    ignore_namespaces: bool,
    /// Read an empty dateTime.iso8601 as nil
    #[arg(long, global = true)]
    accept_null_dates: bool,
    /// Keep &amp; and &lt; escaped in decoded strings
    #[arg(long, global = true)]
    no_string_decode: bool,
    /// Write strings without escaping
    #[arg(long, global = true)]
    no_string_encode: bool,
    /// Apache WS-XMLRPC settings: --ignore-namespaces --nil --default-type-string
    #[arg(long, global = true)]
    apache_ws: bool,
    /// Log the documents being built and parsed
    #[arg(long, global = true)]
    debug: bool,
    /// Offset for dates without a timezone, e.g. +02:00
    #[arg(long, global = true, value_parser = parse_offset, default_value = "+00:00")]
    default_offset: UtcOffset,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the methodCall document for METHOD and its parameters
    Encode {
        method: String,
        /// Parameters as TYPE:VALUE, e.g. int:42 string:hello boolean:1 nil:
        params: Vec<String>,
    },
    /// Decode a methodResponse document from FILE, or stdin
    Decode { file: Option<PathBuf> },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("invalid parameter {param:?}: {reason}")]
    Param { param: String, reason: String },
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl Options {
    fn config(&self) -> Config {
        let config = Config {
            strict: self.strict,
            eight_byte_int: self.i8,
            nil: self.nil,
            default_type_string: self.default_type_string,
            ignore_namespaces: self.ignore_namespaces,
            accept_null_dates: self.accept_null_dates,
            no_string_decode: self.no_string_decode,
            no_string_encode: self.no_string_encode,
            debug: self.debug,
            ..Config::default()
        }
        .with_default_offset(self.default_offset);

        if self.apache_ws {
            config.with_apache_ws()
        } else {
            config
        }
    }
}

fn parse_offset(text: &str) -> Result<UtcOffset, String> {
    let (sign, rest) = match text.as_bytes().first() {
        Some(b'+') => (1, &text[1..]),
        Some(b'-') => (-1, &text[1..]),
        _ => return Err("offset must start with + or -".to_string()),
    };
    let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: i8 = hours.parse().map_err(|_| format!("invalid hours in {:?}", text))?;
    let minutes: i8 = minutes.parse().map_err(|_| format!("invalid minutes in {:?}", text))?;
    UtcOffset::from_hms(sign * hours, sign * minutes, 0).map_err(|e| e.to_string())
}

fn parse_param(param: &str, config: &Config) -> Result<Value, CliError> {
    let invalid = |reason: &str| CliError::Param {
        param: param.to_string(),
        reason: reason.to_string(),
    };
    let (kind, text) = param.split_once(':').unwrap_or(("string", param));

    let value = match kind {
        "int" | "i4" => Value::Int32(text.parse().map_err(|_| invalid("not a 32-bit integer"))?),
        "i8" => Value::Int64(text.parse().map_err(|_| invalid("not a 64-bit integer"))?),
        "double" => Value::Double(text.parse().map_err(|_| invalid("not a number"))?),
        "boolean" => match text {
            "1" | "true" => Value::Bool(true),
            "0" | "false" => Value::Bool(false),
            _ => return Err(invalid("boolean must be 0, 1, true or false")),
        },
        "string" => Value::from(text),
        "base64" => Value::Bytes(BASE64_STANDARD.decode(text).map_err(|_| invalid("not base64"))?),
        "datetime" | "dateTime.iso8601" => Value::DateTime(
            date::parse(text, config.default_offset).map_err(|e| invalid(&e.to_string()))?,
        ),
        "nil" => Value::Nil,
        _ => return Err(invalid("unknown type")),
    };
    Ok(value)
}

fn encode(method: &str, params: &[String], config: &Config) -> Result<ExitCode, CliError> {
    let mut request = Request::new(method);
    for param in params {
        let value = parse_param(param, config)?;
        debug!("param {:?}: {:?}", param, value);
        request = request.argument(value);
    }
    println!("{}", request.to_xml(config, &Registry::new(config))?);
    Ok(ExitCode::SUCCESS)
}

fn decode(file: Option<&PathBuf>, config: &Config) -> Result<ExitCode, CliError> {
    let body = match file {
        Some(path) => {
            debug!("Read response from {}", path.display());
            fs::read_to_string(path)?
        }
        None => {
            let mut input = String::new();
            io::stdin().read_to_string(&mut input)?;
            trace!("Read stdin: {}", input);
            input
        }
    };

    match parse_response(&body, config, &Registry::new(config))? {
        Ok(value) => {
            println!("{:#?}", value);
            Ok(ExitCode::SUCCESS)
        }
        Err(fault) => {
            eprintln!("fault: {}", fault);
            Ok(ExitCode::from(2))
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Init logging to DEBUG only if user required it
    let level = match (cli.verbose, cli.options.debug) {
        (0, false) => "warn",
        (0, true) | (1, _) => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    let config = cli.options.config();
    debug!("Using config: {:?}", config);

    let result = match cli.command {
        Command::Encode { ref method, ref params } => encode(method, params, &config),
        Command::Decode { ref file } => decode(file.as_ref(), &config),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use time::macros::{datetime, offset};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn options_map_to_config() {
        let cli = Cli::parse_from(["xrpc", "--apache-ws", "--strict", "--default-offset", "-03:30", "decode"]);
        let config = cli.options.config();
        assert!(config.strict);
        assert!(config.nil);
        assert!(config.ignore_namespaces);
        assert!(config.default_type_string);
        assert!(!config.eight_byte_int);
        assert_eq!(config.default_offset, offset!(-03:30));
    }

    #[test]
    fn offsets() {
        assert_eq!(parse_offset("+02:00"), Ok(offset!(+02:00)));
        assert_eq!(parse_offset("-05"), Ok(offset!(-05:00)));
        assert!(parse_offset("02:00").is_err());
        assert!(parse_offset("+ab").is_err());
    }

    #[test]
    fn params() {
        let config = Config::default();
        assert_eq!(parse_param("int:42", &config).unwrap(), Value::Int32(42));
        assert_eq!(parse_param("i8:-7", &config).unwrap(), Value::Int64(-7));
        assert_eq!(parse_param("boolean:true", &config).unwrap(), Value::Bool(true));
        assert_eq!(parse_param("hello", &config).unwrap(), Value::from("hello"));
        assert_eq!(parse_param("string:a:b", &config).unwrap(), Value::from("a:b"));
        assert_eq!(parse_param("base64:QWVyaXM=", &config).unwrap(), Value::Bytes(b"Aeris".to_vec()));
        assert_eq!(parse_param("nil:", &config).unwrap(), Value::Nil);
        assert_eq!(
            parse_param("datetime:20240102T03:04:05", &config).unwrap(),
            Value::DateTime(datetime!(2024-01-02 03:04:05 UTC))
        );
        assert!(matches!(parse_param("int:x", &config), Err(CliError::Param { .. })));
        assert!(matches!(parse_param("float:1", &config), Err(CliError::Param { .. })));
    }
}
