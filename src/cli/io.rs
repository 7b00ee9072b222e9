//! JSON I/O handling for CLI
//!
//! - Input: one JSON document on stdin
//! - Output: one JSON object on stdout, `{"status": "ok", "data": ...}` or
//!   `{"status": "error", "code": ..., "message": ...}`
//! - UTF-8 only

use std::io::{self, Read, Write};

use serde_json::{json, Value};

use super::errors::{CliError, CliResult};

/// Parse a request body
pub fn parse_request(input: &str) -> CliResult<Value> {
    if input.trim().is_empty() {
        return Err(CliError::input("empty input"));
    }
    Ok(serde_json::from_str(input)?)
}

/// Read a JSON request from stdin
pub fn read_request() -> CliResult<Value> {
    let mut input = String::new();
    io::stdin().lock().read_to_string(&mut input)?;
    parse_request(&input)
}

pub fn success(data: Value) -> Value {
    json!({
        "status": "ok",
        "data": data
    })
}

pub fn failure(error: &CliError) -> Value {
    json!({
        "status": "error",
        "code": error.code(),
        "message": error.to_string()
    })
}

fn write_value(value: &Value) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, value).map_err(io::Error::from)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    write_value(&success(data))
}

/// Write an error response to stdout
pub fn write_error(error: &CliError) -> CliResult<()> {
    write_value(&failure(error))
}
