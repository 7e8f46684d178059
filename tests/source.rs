mod common;

use movecov::cli::{cmd_source, Style};
use movecov::parsers::source::SourceParser;
use movecov::parsers::CoverageParser;

#[test]
fn parse_counter_source() {
    let report = SourceParser.parse(common::COUNTER_SOURCE);

    assert_eq!(report.stats.total_lines, 3);
    assert_eq!(report.stats.fully_covered_lines, 1);
    assert_eq!(report.stats.lines_with_uncovered, 2);

    let first = &report.uncovered_summary[0];
    assert_eq!(first.line, 13);
    assert_eq!(first.code, "if (c.value < 100) { abort 1 }");
    assert_eq!(first.uncovered_parts, vec!["{ abort 1 }"]);

    let second = &report.uncovered_summary[1];
    assert_eq!(second.line, 17);
    assert_eq!(second.uncovered_parts, vec!["c.value = 0;"]);
}

#[test]
fn neutral_only_lines_are_not_counted() {
    let report = SourceParser.parse("module a::b {\n    // comment\n}\n");
    assert_eq!(report.stats.total_lines, 0);
}

#[test]
fn whitespace_only_red_segment_is_not_uncovered() {
    let report = SourceParser.parse("    \x1b[31m    \x1b[0m\n");
    assert_eq!(report.stats.lines_with_uncovered, 0);
    assert!(report.uncovered_summary.is_empty());
}

#[test]
fn text_report() {
    let out = cmd_source(common::COUNTER_SOURCE, Style::Text).unwrap();

    assert!(out.contains("SOURCE COVERAGE ANALYSIS"));
    assert!(out.contains("Lines with executable code: 3"));
    assert!(out.contains("Fully covered lines:        1 (33%)"));
    assert!(out.contains("Lines with uncovered code:  2 (66%)"));
    assert!(out.contains("  Line 17:\n   c.value = 0;\n"));
}

#[test]
fn json_report_without_colors() {
    let out = cmd_source("fun f() {}\n", Style::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["stats"]["total_lines"], 0);
    assert!(value["uncovered_summary"].as_array().unwrap().is_empty());
}
