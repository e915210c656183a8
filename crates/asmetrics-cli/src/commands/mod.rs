pub mod info;
pub mod memory;
pub mod read;
pub mod watch;

use serde::Serialize;

/// Prints `value` as one line of JSON.
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{line}"),
        Err(e) => eprintln!("failed to serialize output: {e}"),
    }
}

/// Formats an optional value, `?` when unknown.
pub fn or_unknown<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "?".to_string(), |v| v.to_string())
}
