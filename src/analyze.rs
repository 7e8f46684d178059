//! Rolls parsed LCOV sections up into a report: global totals, per-file
//! gap listings and suggestions.

use std::path::Path;

use serde::Serialize;

use crate::model::{percent, FileCoverage};
use crate::sources;
use crate::suggest::{suggest, Suggestion};

/// Totals across all files, taken from the per-file summary records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub total_files: usize,
    pub total_functions_found: u64,
    pub total_functions_hit: u64,
    pub total_lines_found: u64,
    pub total_lines_hit: u64,
    pub total_branches_found: u64,
    pub total_branches_hit: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_coverage_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_coverage_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_coverage_pct: Option<f64>,
}

/// Saturating sum of one counter across files.
fn total(files: &[FileCoverage], field: impl Fn(&FileCoverage) -> u64) -> u64 {
    files.iter().map(field).fold(0, u64::saturating_add)
}

impl Summary {
    #[must_use]
    pub fn from_files(files: &[FileCoverage]) -> Self {
        let total_functions_found = total(files, |f| f.functions_found);
        let total_functions_hit = total(files, |f| f.functions_hit);
        let total_lines_found = total(files, |f| f.lines_found);
        let total_lines_hit = total(files, |f| f.lines_hit);
        let total_branches_found = total(files, |f| f.branches_found);
        let total_branches_hit = total(files, |f| f.branches_hit);

        Self {
            total_files: files.len(),
            total_functions_found,
            total_functions_hit,
            total_lines_found,
            total_lines_hit,
            total_branches_found,
            total_branches_hit,
            line_coverage_pct: percent(total_lines_hit, total_lines_found),
            branch_coverage_pct: percent(total_branches_hit, total_branches_found),
            function_coverage_pct: percent(total_functions_hit, total_functions_found),
        }
    }
}

/// `hit/found` ratios for one file, as strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverageRatios {
    pub functions: String,
    pub lines: String,
    pub branches: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UntakenBranch {
    pub line: u32,
    pub block: u32,
    pub branch: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UncalledFunction {
    pub name: String,
    pub line: u32,
}

/// Per-file section of the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    pub path: String,
    pub coverage: CoverageRatios,
    pub uncovered_lines: Vec<u32>,
    pub untaken_branches: Vec<UntakenBranch>,
    pub uncalled_functions: Vec<UncalledFunction>,
    pub suggestions: Vec<Suggestion>,
}

impl FileReport {
    #[must_use]
    pub fn new(file: &FileCoverage, source_lines: Option<&sources::SourceLines>) -> Self {
        Self {
            path: file.path.clone(),
            coverage: CoverageRatios {
                functions: format!("{}/{}", file.functions_hit, file.functions_found),
                lines: format!("{}/{}", file.lines_hit, file.lines_found),
                branches: format!("{}/{}", file.branches_hit, file.branches_found),
            },
            uncovered_lines: file.uncovered_lines(),
            untaken_branches: file
                .untaken_branches()
                .map(|b| UntakenBranch {
                    line: b.line,
                    block: b.block,
                    branch: b.branch,
                })
                .collect(),
            uncalled_functions: file
                .uncalled_functions()
                .map(|f| UncalledFunction {
                    name: f.name.clone(),
                    line: f.declaration_line,
                })
                .collect(),
            suggestions: suggest(file, source_lines),
        }
    }

    /// Whether the file has any uncovered line, untaken branch or
    /// uncalled function.
    #[must_use]
    pub fn has_issues(&self) -> bool {
        !self.uncovered_lines.is_empty()
            || !self.untaken_branches.is_empty()
            || !self.uncalled_functions.is_empty()
    }
}

/// The complete LCOV analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LcovReport {
    pub summary: Summary,
    pub files: Vec<FileReport>,
}

/// Post-filters applied to the file list of an [`LcovReport`].
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    /// Keep only files whose path contains this substring.
    pub path_contains: Option<String>,
    /// Keep only files with at least one gap.
    pub issues_only: bool,
}

impl FileFilter {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.path_contains.is_some() || self.issues_only
    }

    #[must_use]
    pub fn matches(&self, file: &FileReport) -> bool {
        if let Some(pattern) = &self.path_contains {
            if !file.path.contains(pattern.as_str()) {
                return false;
            }
        }
        !self.issues_only || file.has_issues()
    }
}

impl LcovReport {
    /// Summarize `files`, attaching source snippets from `source_dir` when
    /// given.
    #[must_use]
    pub fn build(files: &[FileCoverage], source_dir: Option<&Path>) -> Self {
        let summary = Summary::from_files(files);
        let files = files
            .iter()
            .map(|file| {
                let source_lines = sources::load(source_dir, &file.path);
                FileReport::new(file, source_lines.as_ref())
            })
            .collect();

        Self { summary, files }
    }

    /// Drop files that don't match `filter`. Only `total_files` is
    /// recomputed; the found/hit totals still describe the whole input.
    pub fn apply_filter(&mut self, filter: &FileFilter) {
        if !filter.is_active() {
            return;
        }
        self.files.retain(|f| filter.matches(f));
        self.summary.total_files = self.files.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::lcov;

    const SAMPLE: &str = include_str!("../tests/fixtures/sample.lcov");

    #[test]
    fn test_summary_totals() {
        let report = LcovReport::build(&lcov::parse(SAMPLE), None);
        let s = &report.summary;
        assert_eq!(s.total_files, 2);
        assert_eq!(s.total_functions_found, 4);
        assert_eq!(s.total_functions_hit, 3);
        assert_eq!(s.total_lines_found, 8);
        assert_eq!(s.total_lines_hit, 5);
        assert_eq!(s.total_branches_found, 3);
        assert_eq!(s.total_branches_hit, 1);
        assert_eq!(s.line_coverage_pct, Some(62.5));
        assert_eq!(s.branch_coverage_pct, Some(33.3));
        assert_eq!(s.function_coverage_pct, Some(75.0));
    }

    #[test]
    fn test_line_percentage_from_summary_records() {
        let input = "SF:a\nDA:1,5\nDA:2,0\nDA:3,0\nDA:4,2\nLF:4\nLH:2\nend_of_record\n";
        let report = LcovReport::build(&lcov::parse(input), None);
        assert_eq!(report.summary.line_coverage_pct, Some(50.0));
        assert_eq!(report.summary.branch_coverage_pct, None);
        assert_eq!(report.summary.function_coverage_pct, None);
    }

    #[test]
    fn test_summary_totals_saturate() {
        let input = "SF:a\nLF:18446744073709551615\nLH:1\nend_of_record\nSF:b\nLF:1\nLH:1\nend_of_record\n";
        let report = LcovReport::build(&lcov::parse(input), None);
        assert_eq!(report.summary.total_files, 2);
        assert_eq!(report.summary.total_lines_found, u64::MAX);
        assert_eq!(report.summary.total_lines_hit, 2);
    }

    #[test]
    fn test_zero_found_percentages_are_omitted_from_json() {
        let report = LcovReport::build(&lcov::parse("SF:a\nend_of_record\n"), None);
        let json = serde_json::to_value(&report).unwrap();
        let summary = json["summary"].as_object().unwrap();
        assert!(!summary.contains_key("line_coverage_pct"));
        assert!(!summary.contains_key("branch_coverage_pct"));
        assert!(!summary.contains_key("function_coverage_pct"));
        assert_eq!(summary["total_files"], 1);
    }

    #[test]
    fn test_file_report_gaps() {
        let report = LcovReport::build(&lcov::parse(SAMPLE), None);
        let counter = &report.files[0];
        assert_eq!(counter.coverage.lines, "3/6");
        assert_eq!(counter.coverage.branches, "1/3");
        assert_eq!(counter.coverage.functions, "2/3");
        assert_eq!(counter.uncovered_lines, vec![13, 20, 21]);
        assert_eq!(
            counter.untaken_branches,
            vec![
                UntakenBranch {
                    line: 11,
                    block: 0,
                    branch: 1
                },
                UntakenBranch {
                    line: 15,
                    block: 1,
                    branch: 0
                },
            ]
        );
        assert_eq!(
            counter.uncalled_functions,
            vec![UncalledFunction {
                name: "reset".to_string(),
                line: 20
            }]
        );
        assert!(counter.has_issues());
        assert!(!report.files[1].has_issues());
    }

    #[test]
    fn test_filter_by_path() {
        let mut report = LcovReport::build(&lcov::parse(SAMPLE), None);
        report.apply_filter(&FileFilter {
            path_contains: Some("util".to_string()),
            issues_only: false,
        });
        assert_eq!(report.files.len(), 1);
        assert_eq!(report.summary.total_files, 1);
        assert_eq!(report.files[0].path, "sources/util.move");
        // Totals are not recomputed
        assert_eq!(report.summary.total_lines_found, 8);
    }

    #[test]
    fn test_filter_issues_only() {
        let unfiltered = LcovReport::build(&lcov::parse(SAMPLE), None);
        let with_issues = unfiltered.files.iter().filter(|f| f.has_issues()).count();

        let mut report = unfiltered.clone();
        report.apply_filter(&FileFilter {
            path_contains: None,
            issues_only: true,
        });
        assert_eq!(report.summary.total_files, with_issues);
        assert!(report.summary.total_files <= unfiltered.summary.total_files);
        assert_eq!(report.files[0].path, "/work/sources/counter.move");
    }

    #[test]
    fn test_inactive_filter_keeps_everything() {
        let mut report = LcovReport::build(&lcov::parse(SAMPLE), None);
        report.apply_filter(&FileFilter::default());
        assert_eq!(report.files.len(), 2);
    }

    #[test]
    fn test_build_attaches_source_snippets() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = String::new();
        for n in 1..=21 {
            source.push_str(&format!("// line {n}\n"));
        }
        std::fs::write(dir.path().join("counter.move"), source).unwrap();

        let report = LcovReport::build(&lcov::parse(SAMPLE), Some(dir.path()));
        let first = &report.files[0].suggestions[0];
        assert_eq!(first.kind(), "uncalled_function");
        assert_eq!(first.source(), Some("// line 20"));
        // util.move is not in the source dir and its recorded path is relative
        assert!(report.files[1].suggestions.is_empty());
    }
}
