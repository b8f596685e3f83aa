//! Output formats and shared printing helpers.

use anyhow::{Context, Result};
use serde::Serialize;

/// Output format for command results
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text (default)
    Text,
    /// A single pretty-printed JSON document
    Json,
}

impl OutputFormat {
    pub const fn is_machine(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{rendered}");
    Ok(())
}
