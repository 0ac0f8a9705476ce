//! Subcommand implementations.

pub mod chat;
pub mod classify;
pub mod orchestrate;
pub mod tools;
pub mod validate;

use serde::Serialize;

/// Print a value as pretty JSON on stdout.
#[allow(clippy::print_stdout)]
fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
