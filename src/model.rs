//! In-memory representation of an LCOV record stream. The parser produces a
//! `Vec<FileCoverage>`, which the suggestion engine and summarizer consume.

use std::collections::BTreeMap;

/// Percentage of `hit` over `found`, rounded to one decimal place.
///
/// Returns `None` when nothing was found, so callers can omit the value
/// rather than report a misleading 0%.
#[must_use]
pub fn percent(hit: u64, found: u64) -> Option<f64> {
    if found == 0 {
        return None;
    }
    Some(round1(100.0 * hit as f64 / found as f64))
}

/// Round to one decimal, ties to even on the exact binary value.
fn round1(value: f64) -> f64 {
    // Float formatting is exact and rounds ties to even.
    format!("{value:.1}").parse().unwrap_or(value)
}

/// Truncating integer percentage used by the ANSI reports.
#[must_use]
pub fn percent_floor(part: u64, total: u64) -> u64 {
    if total == 0 {
        0
    } else {
        100 * part / total
    }
}

/// A function declared with `FN:` and, optionally, counted with `FNDA:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionInfo {
    pub name: String,
    pub declaration_line: u32,
    pub call_count: u64,
}

/// A single `BRDA:` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchInfo {
    pub line: u32,
    pub block: u32,
    pub branch: u32,
    /// `count > 0`.
    pub taken: bool,
    /// Execution count; `-1` when the record said `-` (not instrumented).
    pub count: i64,
}

impl BranchInfo {
    pub fn new(line: u32, block: u32, branch: u32, count: i64) -> Self {
        Self {
            line,
            block,
            branch,
            taken: count > 0,
            count,
        }
    }
}

/// Coverage data for a single `SF:` section.
///
/// The `*_found`/`*_hit` counters are copied verbatim from the summary
/// records (`FNF`, `FNH`, `LF`, `LH`, `BRF`, `BRH`) and are never derived
/// from the detail records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileCoverage {
    pub path: String,
    pub functions: Vec<FunctionInfo>,
    pub line_hits: BTreeMap<u32, u64>,
    pub branches: Vec<BranchInfo>,
    pub functions_found: u64,
    pub functions_hit: u64,
    pub lines_found: u64,
    pub lines_hit: u64,
    pub branches_found: u64,
    pub branches_hit: u64,
}

impl FileCoverage {
    pub fn new(path: String) -> Self {
        Self {
            path,
            ..Default::default()
        }
    }

    /// Line numbers with a zero hit count, ascending.
    #[must_use]
    pub fn uncovered_lines(&self) -> Vec<u32> {
        self.line_hits
            .iter()
            .filter(|(_, &count)| count == 0)
            .map(|(&line, _)| line)
            .collect()
    }

    pub fn untaken_branches(&self) -> impl Iterator<Item = &BranchInfo> {
        self.branches.iter().filter(|b| !b.taken)
    }

    pub fn uncalled_functions(&self) -> impl Iterator<Item = &FunctionInfo> {
        self.functions.iter().filter(|f| f.call_count == 0)
    }
}
