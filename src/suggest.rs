//! Turns the gaps in one file's coverage into actionable suggestions.
//!
//! Suggestions are emitted in a fixed order: uncalled functions, then
//! untaken branches grouped by line (first-appearance order), then uncovered
//! line ranges ascending.

use indexmap::IndexMap;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::model::FileCoverage;
use crate::sources::SourceLines;

/// How urgently a gap should be addressed. Fixed by suggestion kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    /// Short tag used by the text report.
    #[must_use]
    pub fn marker(self) -> &'static str {
        match self {
            Priority::High => "[HIGH]",
            Priority::Medium => "[MED]",
            Priority::Low => "[LOW]",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Suggestion {
    UncalledFunction {
        function: String,
        line: u32,
        source: Option<String>,
    },
    UntakenBranch {
        line: u32,
        /// Number of untaken branches recorded at this line.
        branches: usize,
        source: Option<String>,
    },
    UncoveredLines {
        start_line: u32,
        end_line: u32,
    },
}

impl Suggestion {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Suggestion::UncalledFunction { .. } => "uncalled_function",
            Suggestion::UntakenBranch { .. } => "untaken_branch",
            Suggestion::UncoveredLines { .. } => "uncovered_lines",
        }
    }

    #[must_use]
    pub fn priority(&self) -> Priority {
        match self {
            Suggestion::UncalledFunction { .. } => Priority::High,
            Suggestion::UntakenBranch { .. } => Priority::Medium,
            Suggestion::UncoveredLines { .. } => Priority::Low,
        }
    }

    #[must_use]
    pub fn action(&self) -> String {
        match self {
            Suggestion::UncalledFunction { function, .. } => {
                format!("Write a test that calls `{function}()`")
            }
            Suggestion::UntakenBranch { line, .. } => {
                format!("Add test to cover alternate branch at line {line}")
            }
            Suggestion::UncoveredLines {
                start_line,
                end_line,
            } => {
                if start_line == end_line {
                    format!("Write test to execute line {start_line}")
                } else {
                    format!("Write test to execute lines {start_line}-{end_line}")
                }
            }
        }
    }

    #[must_use]
    pub fn source(&self) -> Option<&str> {
        match self {
            Suggestion::UncalledFunction { source, .. }
            | Suggestion::UntakenBranch { source, .. } => source.as_deref(),
            Suggestion::UncoveredLines { .. } => None,
        }
    }
}

// Keys come out as `type, priority, <fields>, action[, source]`.
impl Serialize for Suggestion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", self.kind())?;
        map.serialize_entry("priority", &self.priority())?;
        match self {
            Suggestion::UncalledFunction { function, line, .. } => {
                map.serialize_entry("function", function)?;
                map.serialize_entry("line", line)?;
            }
            Suggestion::UntakenBranch { line, branches, .. } => {
                map.serialize_entry("line", line)?;
                map.serialize_entry("branches", branches)?;
            }
            Suggestion::UncoveredLines {
                start_line,
                end_line,
            } => {
                map.serialize_entry("start_line", start_line)?;
                map.serialize_entry("end_line", end_line)?;
            }
        }
        map.serialize_entry("action", &self.action())?;
        if let Some(source) = self.source() {
            map.serialize_entry("source", source)?;
        }
        map.end()
    }
}

/// Coalesce line numbers into maximal runs of strictly consecutive values.
///
/// The input must be sorted ascending and deduplicated.
#[must_use]
pub fn coalesce_ranges(lines: &[u32]) -> Vec<(u32, u32)> {
    let Some((&first, rest)) = lines.split_first() else {
        return Vec::new();
    };

    debug_assert!(
        lines.windows(2).all(|w| w[0] < w[1]),
        "coalesce_ranges requires sorted, deduplicated input"
    );

    let mut ranges = Vec::new();
    let mut start = first;
    let mut end = first;

    for &line in rest {
        if line == end + 1 {
            end = line;
        } else {
            ranges.push((start, end));
            start = line;
            end = line;
        }
    }

    ranges.push((start, end));
    ranges
}

fn lookup(source_lines: Option<&SourceLines>, line: u32) -> Option<String> {
    source_lines.and_then(|lines| lines.get(&line)).cloned()
}

/// Derive suggestions for one file. `source_lines`, when given, is used to
/// attach the text of the relevant line to function and branch suggestions.
#[must_use]
pub fn suggest(file: &FileCoverage, source_lines: Option<&SourceLines>) -> Vec<Suggestion> {
    let mut suggestions: Vec<Suggestion> = file
        .uncalled_functions()
        .map(|f| Suggestion::UncalledFunction {
            function: f.name.clone(),
            line: f.declaration_line,
            source: lookup(source_lines, f.declaration_line),
        })
        .collect();

    let mut untaken_by_line: IndexMap<u32, usize> = IndexMap::new();
    for branch in file.untaken_branches() {
        *untaken_by_line.entry(branch.line).or_default() += 1;
    }
    suggestions.extend(
        untaken_by_line
            .into_iter()
            .map(|(line, branches)| Suggestion::UntakenBranch {
                line,
                branches,
                source: lookup(source_lines, line),
            }),
    );

    suggestions.extend(
        coalesce_ranges(&file.uncovered_lines())
            .into_iter()
            .map(|(start_line, end_line)| Suggestion::UncoveredLines {
                start_line,
                end_line,
            }),
    );

    suggestions
}
