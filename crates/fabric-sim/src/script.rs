//! Parsing for data-segment transaction scripts.
//!
//! ## Supported Syntax
//!
//! - `write <addr> <data> [select]`: write `data`, lanes default to `0b1111`
//! - `read <addr>`: read one word
//! - `idle <cycles>`: leave the data segment idle for `cycles` cycles
//! - Comments: `#` to end of line
//! - Literals: decimal, `0x` hex, `0b` binary, `_` separators

use std::fmt;

use fabric_core::ByteSelect;
use thiserror::Error;

/// One data-segment step of a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptOp {
    /// Masked write transaction.
    Write {
        /// Byte address.
        address: u32,
        /// Word to write.
        data: u32,
        /// Lanes to commit.
        select: ByteSelect,
    },
    /// Read transaction.
    Read {
        /// Byte address.
        address: u32,
    },
    /// Data segment left idle.
    Idle {
        /// Number of idle cycles, at least one.
        cycles: u64,
    },
}

impl fmt::Display for ScriptOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Write {
                address,
                data,
                select,
            } => write!(f, "write {address:#010x} {data:#010x} {:#06b}", select.bits()),
            Self::Read { address } => write!(f, "read {address:#010x}"),
            Self::Idle { cycles } => write!(f, "idle {cycles}"),
        }
    }
}

/// Script parse failure with its 1-indexed line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {kind}")]
pub struct ScriptError {
    /// 1-indexed line number.
    pub line: usize,
    /// What went wrong.
    pub kind: ScriptErrorKind,
}

/// Categories of script parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptErrorKind {
    /// First word is not a known command.
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    /// Command has the wrong number of operands.
    #[error("`{command}` expects {expected} operands, found {found}")]
    OperandCount {
        /// Command name.
        command: &'static str,
        /// Accepted operand counts.
        expected: &'static str,
        /// Operands present.
        found: usize,
    },
    /// Operand is not a valid number for its field.
    #[error("invalid number `{0}`")]
    InvalidNumber(String),
    /// Byte-select operand has bits above lane 3.
    #[error("byte select `{0}` has bits above the four lanes")]
    SelectOutOfRange(String),
    /// `idle 0` would not advance the script.
    #[error("idle needs at least one cycle")]
    ZeroIdle,
}

/// Parses a full script, skipping blank and comment-only lines.
///
/// # Errors
///
/// Returns the first [`ScriptError`] encountered.
pub fn parse_script(source: &str) -> Result<Vec<ScriptOp>, ScriptError> {
    let mut ops = Vec::new();
    for (index, raw) in source.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        let op = parse_line(line).map_err(|kind| ScriptError {
            line: index + 1,
            kind,
        })?;
        ops.push(op);
    }
    Ok(ops)
}

fn parse_line(line: &str) -> Result<ScriptOp, ScriptErrorKind> {
    let mut words = line.split_whitespace();
    let command = words.next().unwrap_or_default();
    let operands: Vec<&str> = words.collect();

    match command.to_ascii_lowercase().as_str() {
        "write" => {
            if !(2..=3).contains(&operands.len()) {
                return Err(ScriptErrorKind::OperandCount {
                    command: "write",
                    expected: "2 or 3",
                    found: operands.len(),
                });
            }
            let select = match operands.get(2) {
                Some(text) => parse_select(text)?,
                None => ByteSelect::ALL,
            };
            Ok(ScriptOp::Write {
                address: parse_u32(operands[0])?,
                data: parse_u32(operands[1])?,
                select,
            })
        }
        "read" => {
            if operands.len() != 1 {
                return Err(ScriptErrorKind::OperandCount {
                    command: "read",
                    expected: "1",
                    found: operands.len(),
                });
            }
            Ok(ScriptOp::Read {
                address: parse_u32(operands[0])?,
            })
        }
        "idle" => {
            if operands.len() != 1 {
                return Err(ScriptErrorKind::OperandCount {
                    command: "idle",
                    expected: "1",
                    found: operands.len(),
                });
            }
            let cycles = parse_u64(operands[0])?;
            if cycles == 0 {
                return Err(ScriptErrorKind::ZeroIdle);
            }
            Ok(ScriptOp::Idle { cycles })
        }
        other => Err(ScriptErrorKind::UnknownCommand(other.to_string())),
    }
}

fn parse_u64(text: &str) -> Result<u64, ScriptErrorKind> {
    let cleaned = text.replace('_', "");
    let parsed = if let Some(hex) = cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16)
    } else if let Some(bin) = cleaned
        .strip_prefix("0b")
        .or_else(|| cleaned.strip_prefix("0B"))
    {
        u64::from_str_radix(bin, 2)
    } else {
        cleaned.parse()
    };
    parsed.map_err(|_| ScriptErrorKind::InvalidNumber(text.to_string()))
}

fn parse_u32(text: &str) -> Result<u32, ScriptErrorKind> {
    u32::try_from(parse_u64(text)?).map_err(|_| ScriptErrorKind::InvalidNumber(text.to_string()))
}

fn parse_select(text: &str) -> Result<ByteSelect, ScriptErrorKind> {
    match u8::try_from(parse_u64(text)?) {
        Ok(bits) if bits <= 0b1111 => Ok(ByteSelect::new(bits)),
        _ => Err(ScriptErrorKind::SelectOutOfRange(text.to_string())),
    }
}
