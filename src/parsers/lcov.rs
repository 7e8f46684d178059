/// Parser for the LCOV `.info` format emitted by `sui move coverage lcov`.
///
/// Reference: https://ltp.sourceforge.net/coverage/lcov/geninfo.1.php
///
/// Key records:
///   SF:<path to source file>
///   FN:<line>,<function name>
///   FNDA:<execution count>,<function name>
///   FNF:<number of functions found>
///   FNH:<number of functions hit>
///   DA:<line number>,<execution count>
///   BRDA:<line>,<block>,<branch>,<taken>   ("-" means not instrumented)
///   BRF:<branches found>
///   BRH:<branches hit>
///   LF:<lines found>
///   LH:<lines hit>
///   end_of_record
///
/// Records with the wrong number of fields or unparsable numbers are
/// skipped. A section left open at end of input is finalized as though
/// `end_of_record` had been seen.
use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::debug;

use super::CoverageParser;
use crate::model::{BranchInfo, FileCoverage, FunctionInfo};

/// LCOV format parser.
pub struct LcovParser;

impl CoverageParser for LcovParser {
    type Output = Vec<FileCoverage>;

    fn parse(&self, input: &str) -> Vec<FileCoverage> {
        parse(input)
    }
}

/// Which per-file summary counter a record sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Counter {
    FunctionsFound,
    FunctionsHit,
    LinesFound,
    LinesHit,
    BranchesFound,
    BranchesHit,
}

/// One recognised line of the record stream.
#[derive(Debug, PartialEq)]
enum Record<'a> {
    SourceFile(&'a str),
    FunctionDecl { line: u32, name: &'a str },
    FunctionHits { count: u64, name: &'a str },
    LineHits { line: u32, count: u64 },
    Branch(BranchInfo),
    Counter(Counter, u64),
    EndOfRecord,
    /// Unknown prefix, `TN:`, or a malformed record.
    Skip,
}

fn parse_record(line: &str) -> Record<'_> {
    if line == "end_of_record" {
        return Record::EndOfRecord;
    }

    let Some((tag, value)) = line.split_once(':') else {
        return Record::Skip;
    };

    let record = match tag {
        "SF" => Some(Record::SourceFile(value)),
        "FN" => value.split_once(',').and_then(|(line, name)| {
            Some(Record::FunctionDecl {
                line: line.parse().ok()?,
                name,
            })
        }),
        "FNDA" => value.split_once(',').and_then(|(count, name)| {
            Some(Record::FunctionHits {
                count: count.parse().ok()?,
                name,
            })
        }),
        "DA" => line_hits(value),
        "BRDA" => branch(value),
        "FNF" => counter(Counter::FunctionsFound, value),
        "FNH" => counter(Counter::FunctionsHit, value),
        "LF" => counter(Counter::LinesFound, value),
        "LH" => counter(Counter::LinesHit, value),
        "BRF" => counter(Counter::BranchesFound, value),
        "BRH" => counter(Counter::BranchesHit, value),
        _ => return Record::Skip,
    };

    record.unwrap_or_else(|| {
        debug!(record = line, "skipping malformed LCOV record");
        Record::Skip
    })
}

fn line_hits(value: &str) -> Option<Record<'_>> {
    match value.split(',').collect::<Vec<_>>()[..] {
        [line, count] => Some(Record::LineHits {
            line: line.parse().ok()?,
            count: count.parse().ok()?,
        }),
        _ => None,
    }
}

fn branch(value: &str) -> Option<Record<'_>> {
    match value.split(',').collect::<Vec<_>>()[..] {
        [line, block, branch, count] => {
            let count = if count == "-" { -1 } else { count.parse().ok()? };
            Some(Record::Branch(BranchInfo::new(
                line.parse().ok()?,
                block.parse().ok()?,
                branch.parse().ok()?,
                count,
            )))
        }
        _ => None,
    }
}

fn counter(counter: Counter, value: &str) -> Option<Record<'_>> {
    Some(Record::Counter(counter, value.parse().ok()?))
}

/// The section currently being read, together with the function maps that
/// only live for the span of one section.
struct FileBuilder {
    file: FileCoverage,
    /// Declared line per function name, in first-declaration order.
    declared: IndexMap<String, u32>,
    /// Call count per function name.
    calls: HashMap<String, u64>,
}

impl FileBuilder {
    fn new(path: &str) -> Self {
        Self {
            file: FileCoverage::new(path.to_string()),
            declared: IndexMap::new(),
            calls: HashMap::new(),
        }
    }

    fn apply(&mut self, record: Record<'_>) {
        let file = &mut self.file;
        match record {
            Record::FunctionDecl { line, name } => {
                self.declared.insert(name.to_string(), line);
            }
            Record::FunctionHits { count, name } => {
                self.calls.insert(name.to_string(), count);
            }
            Record::LineHits { line, count } => {
                file.line_hits.insert(line, count);
            }
            Record::Branch(branch) => file.branches.push(branch),
            Record::Counter(counter, value) => {
                let slot = match counter {
                    Counter::FunctionsFound => &mut file.functions_found,
                    Counter::FunctionsHit => &mut file.functions_hit,
                    Counter::LinesFound => &mut file.lines_found,
                    Counter::LinesHit => &mut file.lines_hit,
                    Counter::BranchesFound => &mut file.branches_found,
                    Counter::BranchesHit => &mut file.branches_hit,
                };
                *slot = value;
            }
            Record::SourceFile(_) | Record::EndOfRecord | Record::Skip => {}
        }
    }

    /// Merge the function maps by name and seal the section. Functions
    /// without an `FNDA` record get a call count of zero.
    fn finish(self) -> FileCoverage {
        let FileBuilder {
            mut file,
            declared,
            calls,
        } = self;
        file.functions = declared
            .into_iter()
            .map(|(name, declaration_line)| {
                let call_count = calls.get(&name).copied().unwrap_or(0);
                FunctionInfo {
                    name,
                    declaration_line,
                    call_count,
                }
            })
            .collect();
        file
    }
}

/// Parse LCOV text into one `FileCoverage` per `SF:` section, in input order.
pub fn parse(input: &str) -> Vec<FileCoverage> {
    let mut files = Vec::new();
    let mut current: Option<FileBuilder> = None;

    for raw_line in input.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_record(line) {
            Record::SourceFile(path) => {
                if let Some(open) = current.replace(FileBuilder::new(path)) {
                    // A new SF: without end_of_record; keep what we had.
                    debug!(path = %open.file.path, "LCOV section not terminated");
                    files.push(open.finish());
                }
            }
            Record::EndOfRecord => {
                if let Some(open) = current.take() {
                    files.push(open.finish());
                }
            }
            record => {
                if let Some(open) = current.as_mut() {
                    open.apply(record);
                }
            }
        }
    }

    // Handle input that ends without end_of_record
    if let Some(open) = current.take() {
        files.push(open.finish());
    }

    files
}
