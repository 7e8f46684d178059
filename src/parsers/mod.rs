pub mod bytecode;
pub mod lcov;
pub mod source;

use std::sync::LazyLock;

use regex::Regex;

/// An SGR escape such as `ESC[32m`, capturing the numeric code.
pub(crate) static SGR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[(\d+)m").unwrap());

/// Every coverage-artifact parser implements this trait.
///
/// Parsing is infallible: malformed records are skipped rather than
/// reported, so a damaged artifact still yields a best-effort result.
pub trait CoverageParser {
    type Output;

    /// Parse the full text of one artifact.
    fn parse(&self, input: &str) -> Self::Output;
}

/// Whether `input` contains at least one ANSI escape introducer.
#[must_use]
pub fn has_ansi_escapes(input: &str) -> bool {
    input.contains("\x1b[")
}

/// Remove SGR escapes, plus any stray `ESC[` introducers left behind.
#[must_use]
pub fn strip_ansi(line: &str) -> String {
    SGR_RE.replace_all(line, "").replace("\x1b[", "")
}
