//! Command handler functions for the movecov CLI.
//!
//! Each `cmd_*` function returns its output as a `String`, making them easy
//! to test without capturing stdout.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::analyze::{FileFilter, LcovReport};
use crate::error::MovecovError;
use crate::parsers::bytecode::BytecodeParser;
use crate::parsers::lcov::LcovParser;
use crate::parsers::source::SourceParser;
use crate::parsers::{has_ansi_escapes, CoverageParser};
use crate::report::{JsonFormatter, ReportFormatter, TextFormatter};

/// Output style shared by every command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Style {
    Text,
    Json,
}

impl Style {
    #[must_use]
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            Style::Json
        } else {
            Style::Text
        }
    }
}

fn render<R: serde::Serialize>(report: &R, style: Style) -> Result<String>
where
    TextFormatter: ReportFormatter<R>,
{
    let out = match style {
        Style::Text => TextFormatter.format(report)?,
        Style::Json => JsonFormatter.format(report)?,
    };
    Ok(out)
}

/// Analyze an LCOV file. Fails only when the file is missing or unreadable.
pub fn cmd_lcov(
    lcov_file: &Path,
    source_dir: Option<&Path>,
    filter: &FileFilter,
    style: Style,
) -> Result<String> {
    if !lcov_file.exists() {
        return Err(MovecovError::FileNotFound(lcov_file.to_path_buf()).into());
    }

    let bytes = std::fs::read(lcov_file)
        .with_context(|| format!("Failed to read {}", lcov_file.display()))?;
    let text = String::from_utf8_lossy(&bytes);

    let files = LcovParser.parse(&text);
    debug!(files = files.len(), "parsed LCOV");

    let mut report = LcovReport::build(&files, source_dir);
    report.apply_filter(filter);

    render(&report, style)
}

/// Advise on how to keep colors when the input carries none. `command` is
/// both the toolchain coverage mode and our subcommand name.
fn warn_if_uncolored(input: &str, command: &str) {
    if !has_ansi_escapes(input) {
        warn!("No ANSI color codes detected. Colors may be lost during piping.");
        warn!(
            "Try: script -q /dev/null sui move coverage {command} --module <name> | movecov {command}"
        );
    }
}

/// Analyze colored `sui move coverage bytecode` output.
pub fn cmd_bytecode(input: &str, style: Style) -> Result<String> {
    warn_if_uncolored(input, "bytecode");
    let report = BytecodeParser.parse(input);
    debug!(functions = report.functions.len(), "parsed bytecode listing");
    render(&report, style)
}

/// Analyze colored `sui move coverage source` output.
pub fn cmd_source(input: &str, style: Style) -> Result<String> {
    warn_if_uncolored(input, "source");
    let report = SourceParser.parse(input);
    debug!(lines = report.stats.total_lines, "parsed source listing");
    render(&report, style)
}
