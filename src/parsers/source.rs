/// Parser for `sui move coverage source` output.
///
/// The toolchain echoes the module source with SGR colors applied to runs
/// of characters: green (`32`) for executed code, red (`31`) for code that
/// never ran, and `39`/`0` to return to the default color. Text between
/// escapes inherits whichever color was last set.
use serde::Serialize;

use super::{strip_ansi, CoverageParser, SGR_RE};

/// Source coverage parser.
pub struct SourceParser;

impl CoverageParser for SourceParser {
    type Output = SourceReport;

    fn parse(&self, input: &str) -> SourceReport {
        parse(input)
    }
}

/// Active color while scanning a line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColorState {
    #[default]
    Neutral,
    Covered,
    Uncovered,
}

impl ColorState {
    /// The state after SGR `code`. Codes other than 31/32/39/0 leave it as is.
    #[must_use]
    pub fn transition(self, code: &str) -> Self {
        match code {
            "32" => ColorState::Covered,
            "31" => ColorState::Uncovered,
            "39" | "0" => ColorState::Neutral,
            _ => self,
        }
    }

    #[must_use]
    pub fn covered(self) -> Option<bool> {
        match self {
            ColorState::Neutral => None,
            ColorState::Covered => Some(true),
            ColorState::Uncovered => Some(false),
        }
    }
}

/// A run of text sharing one color. `covered` is `None` for neutral text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub covered: Option<bool>,
}

/// Split a line on its escape sequences. Empty runs are dropped.
#[must_use]
pub fn segment_line(line: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut state = ColorState::Neutral;
    let mut last = 0;

    let mut flush = |text: &str, state: ColorState| {
        if !text.is_empty() {
            segments.push(Segment {
                text: text.to_string(),
                covered: state.covered(),
            });
        }
    };

    for caps in SGR_RE.captures_iter(line) {
        let (Some(escape), Some(code)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        flush(&line[last..escape.start()], state);
        state = state.transition(code.as_str());
        last = escape.end();
    }
    flush(&line[last..], state);

    segments
}

/// How a single line of output classifies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    /// No colored text at all: comments, blank lines, declarations.
    NonExecutable,
    FullyCovered,
    /// Holds the red fragments that contain more than whitespace.
    Uncovered(Vec<String>),
}

/// One physical line of the input with its segments.
#[derive(Debug, Clone)]
pub struct LineRecord<'a> {
    pub number: usize,
    pub raw: &'a str,
    pub segments: Vec<Segment>,
}

impl<'a> LineRecord<'a> {
    #[must_use]
    pub fn new(number: usize, raw: &'a str) -> Self {
        Self {
            number,
            raw,
            segments: segment_line(raw),
        }
    }

    /// Any colored segment makes the line executable. A line whose only
    /// colored text is red whitespace is therefore counted, and counted as
    /// fully covered.
    #[must_use]
    pub fn classify(&self) -> LineClass {
        if self.segments.iter().all(|s| s.covered.is_none()) {
            return LineClass::NonExecutable;
        }

        let uncovered: Vec<String> = self
            .segments
            .iter()
            .filter(|s| s.covered == Some(false) && !s.text.trim().is_empty())
            .map(|s| s.text.clone())
            .collect();

        if uncovered.is_empty() {
            LineClass::FullyCovered
        } else {
            LineClass::Uncovered(uncovered)
        }
    }

    /// The line with all color codes removed, trimmed.
    #[must_use]
    pub fn plain(&self) -> String {
        strip_ansi(self.raw).trim().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UncoveredLine {
    pub line: usize,
    pub code: String,
    pub uncovered_parts: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceStats {
    pub total_lines: usize,
    pub lines_with_uncovered: usize,
    pub fully_covered_lines: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub uncovered_summary: Vec<UncoveredLine>,
    pub stats: SourceStats,
}

/// Classify every line of colored source output.
pub fn parse(input: &str) -> SourceReport {
    let mut report = SourceReport::default();

    for (index, raw) in input.lines().enumerate() {
        if raw.trim().is_empty() {
            continue;
        }

        let record = LineRecord::new(index + 1, raw);
        match record.classify() {
            LineClass::NonExecutable => {}
            LineClass::FullyCovered => {
                report.stats.total_lines += 1;
                report.stats.fully_covered_lines += 1;
            }
            LineClass::Uncovered(uncovered_parts) => {
                report.stats.total_lines += 1;
                report.stats.lines_with_uncovered += 1;
                report.uncovered_summary.push(UncoveredLine {
                    line: record.number,
                    code: record.plain(),
                    uncovered_parts,
                });
            }
        }
    }

    report
}
