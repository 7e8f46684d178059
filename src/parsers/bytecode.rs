/// Parser for `sui move coverage bytecode` output.
///
/// The toolchain prints a disassembly listing where each instruction line is
/// wrapped in an SGR color: green (`ESC[32m`) for executed instructions and
/// red (`ESC[31m`) for instructions never reached. Function signature lines
/// such as `public withdraw(Arg0: &mut Vault, Arg1: u64): Coin {` open a new
/// block; everything else without a color is ignored.
///
/// Instruction lines look like:
///   ESC[32m[42]\t3: LdU64(100)ESC[0m
/// where the bracketed source line is optional.
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::CoverageParser;
use crate::model::percent_floor;

static SIGNATURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:public\s+)?(\w+)\s*\([^)]*\)(?:\s*:\s*\w+)?\s*\{").unwrap()
});

static SOURCE_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\d+)\]\s*\t").unwrap());

static INSTRUCTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+):\s+(.+?)(?:\x1b\[|$)").unwrap());

/// Bytecode coverage parser.
pub struct BytecodeParser;

impl CoverageParser for BytecodeParser {
    type Output = BytecodeReport;

    fn parse(&self, input: &str) -> BytecodeReport {
        parse(input)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Instruction {
    pub source_line: Option<u32>,
    pub offset: u32,
    pub instruction: String,
    pub covered: bool,
}

/// Coverage classification of a function block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Every instruction executed.
    Ok,
    Partial,
    /// Nothing executed.
    None,
}

impl Status {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Partial => "PARTIAL",
            Status::None => "NONE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionBlock {
    pub name: String,
    pub instructions: Vec<Instruction>,
    #[serde(rename = "covered")]
    pub covered_count: usize,
    #[serde(rename = "total")]
    pub total_count: usize,
}

impl FunctionBlock {
    fn new(name: String) -> Self {
        Self {
            name,
            instructions: Vec::new(),
            covered_count: 0,
            total_count: 0,
        }
    }

    fn push(&mut self, instruction: Instruction) {
        self.total_count += 1;
        if instruction.covered {
            self.covered_count += 1;
        }
        self.instructions.push(instruction);
    }

    /// Truncating percentage of covered instructions; 0 for an empty block.
    #[must_use]
    pub fn percent(&self) -> u64 {
        percent_floor(self.covered_count as u64, self.total_count as u64)
    }

    #[must_use]
    pub fn status(&self) -> Status {
        match self.percent() {
            100 => Status::Ok,
            0 => Status::None,
            _ => Status::Partial,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BytecodeSummary {
    pub total_instructions: usize,
    pub covered_instructions: usize,
    pub uncovered_instructions: usize,
}

/// An uncovered instruction tagged with the function it was found in, or
/// `None` if it appeared before any signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UncoveredInstruction {
    pub function: Option<String>,
    #[serde(flatten)]
    pub instruction: Instruction,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BytecodeReport {
    pub functions: Vec<FunctionBlock>,
    pub summary: BytecodeSummary,
    pub uncovered_details: Vec<UncoveredInstruction>,
}

/// What a single line of the listing holds.
#[derive(Debug, PartialEq, Eq)]
enum Token {
    Signature(String),
    Instruction(Instruction),
    Other,
}

fn tokenize_line(line: &str) -> Token {
    if let Some(caps) = SIGNATURE_RE.captures(line.trim()) {
        return Token::Signature(caps[1].to_string());
    }

    // The ESC byte is sometimes lost when piping, so match the bare code.
    let covered = if line.contains("[32m") {
        true
    } else if line.contains("[31m") {
        false
    } else {
        return Token::Other;
    };

    let source_line = SOURCE_LINE_RE
        .captures(line)
        .and_then(|caps| caps[1].parse().ok());

    let Some(caps) = INSTRUCTION_RE.captures(line) else {
        return Token::Other;
    };
    let Ok(offset) = caps[1].parse() else {
        return Token::Other;
    };

    Token::Instruction(Instruction {
        source_line,
        offset,
        instruction: caps[2].trim().to_string(),
        covered,
    })
}

/// Folds tokens into function blocks and running totals.
#[derive(Default)]
struct Aggregator {
    report: BytecodeReport,
    current: Option<FunctionBlock>,
}

impl Aggregator {
    fn feed(&mut self, token: Token) {
        match token {
            Token::Signature(name) => {
                self.close_block();
                self.current = Some(FunctionBlock::new(name));
            }
            Token::Instruction(instruction) => self.record(instruction),
            Token::Other => {}
        }
    }

    fn record(&mut self, instruction: Instruction) {
        let summary = &mut self.report.summary;
        summary.total_instructions += 1;
        if instruction.covered {
            summary.covered_instructions += 1;
        } else {
            summary.uncovered_instructions += 1;
            self.report.uncovered_details.push(UncoveredInstruction {
                function: self.current.as_ref().map(|f| f.name.clone()),
                instruction: instruction.clone(),
            });
        }

        // Instructions before the first signature count toward the totals
        // but belong to no block.
        if let Some(block) = self.current.as_mut() {
            block.push(instruction);
        }
    }

    /// Emit the open block, unless it never collected an instruction.
    fn close_block(&mut self) {
        if let Some(block) = self.current.take() {
            if !block.instructions.is_empty() {
                self.report.functions.push(block);
            }
        }
    }

    fn finish(mut self) -> BytecodeReport {
        self.close_block();
        self.report
    }
}

/// Parse a colored bytecode listing.
pub fn parse(input: &str) -> BytecodeReport {
    let mut aggregator = Aggregator::default();
    for line in input.lines() {
        aggregator.feed(tokenize_line(line));
    }
    aggregator.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
public deposit(Arg0: &mut Vault, Arg1: u64) {
B0:
\x1b[32m[12]\t0: MoveLoc[0](Arg0: &mut Vault)\x1b[0m
\x1b[32m[12]\t1: MoveLoc[1](Arg1: u64)\x1b[0m
\x1b[32m[13]\t2: Ret\x1b[0m
}
withdraw(Arg0: &mut Vault): u64 {
\x1b[32m[20]\t0: CopyLoc[0](Arg0: &mut Vault)\x1b[0m
\x1b[31m[21]\t1: LdU64(0)\x1b[0m
\x1b[31m2: Abort\x1b[0m
}
empty() {
}
unused(): bool {
\x1b[31m[30]\t0: LdTrue\x1b[0m
}
";

    #[test]
    fn test_tokenize_signature() {
        assert_eq!(
            tokenize_line("public deposit(Arg0: &mut Vault, Arg1: u64) {"),
            Token::Signature("deposit".to_string())
        );
        assert_eq!(
            tokenize_line("  withdraw(Arg0: &mut Vault): u64 {"),
            Token::Signature("withdraw".to_string())
        );
        assert_eq!(tokenize_line("B0:"), Token::Other);
    }

    #[test]
    fn test_tokenize_instruction() {
        assert_eq!(
            tokenize_line("\x1b[31m[21]\t1: LdU64(0)\x1b[0m"),
            Token::Instruction(Instruction {
                source_line: Some(21),
                offset: 1,
                instruction: "LdU64(0)".to_string(),
                covered: false,
            })
        );
        assert_eq!(
            tokenize_line("\x1b[32m\t7: Ret   "),
            Token::Instruction(Instruction {
                source_line: None,
                offset: 7,
                instruction: "Ret".to_string(),
                covered: true,
            })
        );
    }

    #[test]
    fn test_tokenize_lost_escape_byte() {
        let Token::Instruction(instr) = tokenize_line("[31m4: Pop[0m") else {
            panic!("expected an instruction");
        };
        assert!(!instr.covered);
        assert_eq!(instr.offset, 4);
        assert_eq!(instr.instruction, "Pop[0m");
    }

    #[test]
    fn test_tokenize_colored_line_without_instruction() {
        assert_eq!(tokenize_line("\x1b[32mB0:\x1b[0m"), Token::Other);
    }

    #[test]
    fn test_parse_listing() {
        let report = parse(LISTING);

        let names: Vec<_> = report.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["deposit", "withdraw", "unused"]);

        assert_eq!(report.summary.total_instructions, 7);
        assert_eq!(report.summary.covered_instructions, 4);
        assert_eq!(report.summary.uncovered_instructions, 3);

        let withdraw = &report.functions[1];
        assert_eq!(withdraw.covered_count, 1);
        assert_eq!(withdraw.total_count, 3);
        assert_eq!(withdraw.percent(), 33);
        assert_eq!(withdraw.status(), Status::Partial);

        assert_eq!(report.functions[0].status(), Status::Ok);
        assert_eq!(report.functions[2].status(), Status::None);
    }

    #[test]
    fn test_empty_block_is_dropped() {
        let report = parse("empty() {\n}\nlast() {\n");
        assert!(report.functions.is_empty());
    }

    #[test]
    fn test_uncovered_details_in_discovery_order() {
        let report = parse(LISTING);
        let details: Vec<_> = report
            .uncovered_details
            .iter()
            .map(|d| (d.function.as_deref(), d.instruction.offset))
            .collect();
        assert_eq!(
            details,
            vec![(Some("withdraw"), 1), (Some("withdraw"), 2), (Some("unused"), 0)]
        );
    }

    #[test]
    fn test_instructions_before_any_function() {
        let report = parse("\x1b[31m0: Nop\x1b[0m\nf() {\n\x1b[32m0: Ret\x1b[0m\n");
        assert_eq!(report.summary.total_instructions, 2);
        assert_eq!(report.functions.len(), 1);
        assert_eq!(report.functions[0].total_count, 1);
        assert_eq!(report.uncovered_details[0].function, None);
    }

    #[test]
    fn test_zero_instruction_block_percent() {
        let block = FunctionBlock::new("f".to_string());
        assert_eq!(block.percent(), 0);
        assert_eq!(block.status(), Status::None);
    }

    #[test]
    fn test_serialized_detail_is_flat() {
        let report = parse(LISTING);
        let json = serde_json::to_value(&report.uncovered_details[1]).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "function": "withdraw",
                "source_line": null,
                "offset": 2,
                "instruction": "Abort",
                "covered": false,
            })
        );
    }
}
