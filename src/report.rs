//! Output formatting for the three analyses.

use std::collections::BTreeMap;
use std::fmt::Write;

use indexmap::IndexMap;
use serde::Serialize;

use crate::analyze::LcovReport;
use crate::error::Result;
use crate::model::percent_floor;
use crate::parsers::bytecode::{BytecodeReport, UncoveredInstruction};
use crate::parsers::source::SourceReport;
use crate::suggest::coalesce_ranges;

/// Trait for rendering a report to a string.
pub trait ReportFormatter<R> {
    fn format(&self, report: &R) -> Result<String>;
}

/// Pretty-printed JSON with 2-space indentation.
pub struct JsonFormatter;

impl<R: Serialize> ReportFormatter<R> for JsonFormatter {
    fn format(&self, report: &R) -> Result<String> {
        let mut out = serde_json::to_string_pretty(report)?;
        out.push('\n');
        Ok(out)
    }
}

/// Human-readable sectioned text.
pub struct TextFormatter;

const WIDE: usize = 70;
const NARROW: usize = 60;

fn rule(out: &mut String, ch: char, width: usize) {
    writeln!(out, "{}", ch.to_string().repeat(width)).unwrap();
}

fn banner(out: &mut String, title: &str, width: usize) {
    rule(out, '=', width);
    writeln!(out, "{title}").unwrap();
    rule(out, '=', width);
}

fn section(out: &mut String, title: &str, width: usize) {
    out.push('\n');
    rule(out, '-', width);
    writeln!(out, "{title}").unwrap();
    rule(out, '-', width);
}

fn closing(out: &mut String, width: usize) {
    out.push('\n');
    rule(out, '=', width);
}

/// Render a percentage, or `N/A` when there was nothing to measure.
fn pct_or_na(pct: Option<f64>) -> String {
    match pct {
        Some(p) => format!("{p:.1}"),
        None => "N/A".to_string(),
    }
}

/// Format line numbers into compact range notation, e.g. "1, 3-5, 8".
///
/// The input slice must be sorted in ascending order.
#[must_use]
pub fn format_line_ranges(lines: &[u32]) -> String {
    coalesce_ranges(lines)
        .iter()
        .map(|&(start, end)| {
            if start == end {
                start.to_string()
            } else {
                format!("{start}-{end}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

impl ReportFormatter<LcovReport> for TextFormatter {
    fn format(&self, report: &LcovReport) -> Result<String> {
        let mut out = String::new();
        let s = &report.summary;

        banner(&mut out, "MOVE COVERAGE ANALYSIS", NARROW);
        writeln!(out, "\nFiles analyzed: {}", s.total_files).unwrap();
        writeln!(
            out,
            "Function coverage: {}/{} ({}%)",
            s.total_functions_hit,
            s.total_functions_found,
            pct_or_na(s.function_coverage_pct)
        )
        .unwrap();
        writeln!(
            out,
            "Line coverage: {}/{} ({}%)",
            s.total_lines_hit,
            s.total_lines_found,
            pct_or_na(s.line_coverage_pct)
        )
        .unwrap();
        writeln!(
            out,
            "Branch coverage: {}/{} ({}%)",
            s.total_branches_hit,
            s.total_branches_found,
            pct_or_na(s.branch_coverage_pct)
        )
        .unwrap();

        for file in &report.files {
            out.push('\n');
            rule(&mut out, '─', NARROW);
            writeln!(out, "  {}", file.path).unwrap();
            writeln!(
                out,
                "   Lines: {}, Branches: {}, Functions: {}",
                file.coverage.lines, file.coverage.branches, file.coverage.functions
            )
            .unwrap();

            if !file.uncalled_functions.is_empty() {
                out.push_str("\n   Uncalled functions:\n");
                for f in &file.uncalled_functions {
                    writeln!(out, "      - {} (line {})", f.name, f.line).unwrap();
                }
            }

            if !file.untaken_branches.is_empty() {
                let mut per_line: BTreeMap<u32, usize> = BTreeMap::new();
                for b in &file.untaken_branches {
                    *per_line.entry(b.line).or_default() += 1;
                }
                out.push_str("\n   Untaken branches:\n");
                for (line, count) in per_line {
                    writeln!(out, "      - Line {line}: {count} branch(es) not taken").unwrap();
                }
            }

            if !file.uncovered_lines.is_empty() {
                writeln!(
                    out,
                    "\n   Uncovered lines: {}",
                    format_line_ranges(&file.uncovered_lines)
                )
                .unwrap();
            }

            if !file.suggestions.is_empty() {
                out.push_str("\n   Suggestions:\n");
                for (i, sug) in file.suggestions.iter().enumerate() {
                    writeln!(
                        out,
                        "      {}. {} {}",
                        i + 1,
                        sug.priority().marker(),
                        sug.action()
                    )
                    .unwrap();
                }
            }
        }

        closing(&mut out, NARROW);
        Ok(out)
    }
}

impl ReportFormatter<BytecodeReport> for TextFormatter {
    fn format(&self, report: &BytecodeReport) -> Result<String> {
        let mut out = String::new();
        let s = &report.summary;
        let total = s.total_instructions as u64;

        banner(&mut out, "BYTECODE COVERAGE ANALYSIS", NARROW);
        writeln!(out, "\nTotal instructions: {total}").unwrap();
        writeln!(
            out,
            "Covered:   {} ({}%)",
            s.covered_instructions,
            percent_floor(s.covered_instructions as u64, total)
        )
        .unwrap();
        writeln!(
            out,
            "Uncovered: {} ({}%)",
            s.uncovered_instructions,
            percent_floor(s.uncovered_instructions as u64, total)
        )
        .unwrap();

        section(&mut out, "FUNCTION BREAKDOWN", NARROW);
        for func in &report.functions {
            writeln!(
                out,
                "  [{}] {}: {}/{} ({}%)",
                func.status().as_str(),
                func.name,
                func.covered_count,
                func.total_count,
                func.percent()
            )
            .unwrap();
        }

        if !report.uncovered_details.is_empty() {
            section(&mut out, "UNCOVERED INSTRUCTIONS", NARROW);

            let mut by_function: IndexMap<&str, Vec<&UncoveredInstruction>> = IndexMap::new();
            for item in &report.uncovered_details {
                let name = item.function.as_deref().unwrap_or("unknown");
                by_function.entry(name).or_default().push(item);
            }

            for (name, items) in by_function {
                writeln!(out, "\n  {name}():").unwrap();

                // Numbered source lines ascending, then the ones without.
                let mut by_line: BTreeMap<(bool, u32), Vec<&UncoveredInstruction>> =
                    BTreeMap::new();
                for item in items {
                    let key = match item.instruction.source_line {
                        Some(line) => (false, line),
                        None => (true, 0),
                    };
                    by_line.entry(key).or_default().push(item);
                }

                for ((unnumbered, line), instrs) in by_line {
                    if unnumbered {
                        out.push_str("      No source line:\n");
                    } else {
                        writeln!(out, "      Line {line}:").unwrap();
                    }
                    for instr in instrs {
                        writeln!(
                            out,
                            "         [{}] {}",
                            instr.instruction.offset, instr.instruction.instruction
                        )
                        .unwrap();
                    }
                }
            }
        }

        closing(&mut out, NARROW);
        Ok(out)
    }
}

impl ReportFormatter<SourceReport> for TextFormatter {
    fn format(&self, report: &SourceReport) -> Result<String> {
        let mut out = String::new();
        let stats = &report.stats;
        let total = stats.total_lines as u64;

        banner(&mut out, "SOURCE COVERAGE ANALYSIS", WIDE);

        if total > 0 {
            writeln!(out, "\nLines with executable code: {total}").unwrap();
            writeln!(
                out,
                "Fully covered lines:        {} ({}%)",
                stats.fully_covered_lines,
                percent_floor(stats.fully_covered_lines as u64, total)
            )
            .unwrap();
            writeln!(
                out,
                "Lines with uncovered code:  {} ({}%)",
                stats.lines_with_uncovered,
                percent_floor(stats.lines_with_uncovered as u64, total)
            )
            .unwrap();
        }

        if !report.uncovered_summary.is_empty() {
            section(&mut out, "UNCOVERED CODE", WIDE);
            for item in &report.uncovered_summary {
                writeln!(out, "\n  Line {}:", item.line).unwrap();
                writeln!(out, "   {}", item.code).unwrap();
                let parts: Vec<String> = item
                    .uncovered_parts
                    .iter()
                    .map(|p| format!("{p:?}"))
                    .collect();
                writeln!(out, "   Uncovered: [{}]", parts.join(", ")).unwrap();
            }
        }

        closing(&mut out, WIDE);
        Ok(out)
    }
}
