//! Parsed opcode representation and script parser.

use super::error::{InterpreterError, InterpreterErrorCode};
use crate::chunk::push_data_prefix;
use crate::opcodes::*;
use crate::Script;

/// A parsed opcode with its data payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedOpcode {
    /// The opcode byte value.
    pub opcode: u8,
    /// The pushed bytes (empty for non-push opcodes).
    pub data: Vec<u8>,
}

impl ParsedOpcode {
    pub fn name(&self) -> &'static str {
        opcode_to_string(self.opcode)
    }

    /// Splice, bitwise and multiply/divide/shift opcodes.
    ///
    /// These fail execution even inside an unexecuted branch.
    pub fn is_disabled(&self) -> bool {
        matches!(
            self.opcode,
            OP_CAT
                | OP_SUBSTR
                | OP_LEFT
                | OP_RIGHT
                | OP_INVERT
                | OP_AND
                | OP_OR
                | OP_XOR
                | OP_2MUL
                | OP_2DIV
                | OP_MUL
                | OP_DIV
                | OP_MOD
                | OP_LSHIFT
                | OP_RSHIFT
        )
    }

    /// Flow-control opcodes, which run even in an unexecuted branch.
    ///
    /// OP_VERIF and OP_VERNOTIF are in this range and therefore always fail.
    pub fn is_conditional(&self) -> bool {
        (OP_IF..=OP_ENDIF).contains(&self.opcode)
    }

    pub fn is_push(&self) -> bool {
        self.opcode <= OP_PUSHDATA4
    }

    /// Whether a push uses the smallest possible encoding.
    pub fn is_minimal_push(&self) -> bool {
        let len = self.data.len();
        match self.opcode {
            OP_0 => true,
            OP_DATA_1 => !(1..=16).contains(&self.data[0]) && self.data[0] != 0x81,
            OP_DATA_1..=OP_DATA_75 => true,
            OP_PUSHDATA1 => len > OP_DATA_75 as usize,
            OP_PUSHDATA2 => len > 0xff,
            OP_PUSHDATA4 => len > 0xffff,
            _ => true,
        }
    }

    /// Serialize back to script bytes, preserving the original push form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(5 + self.data.len());
        out.push(self.opcode);
        match self.opcode {
            OP_PUSHDATA1 => out.push(self.data.len() as u8),
            OP_PUSHDATA2 => out.extend_from_slice(&(self.data.len() as u16).to_le_bytes()),
            OP_PUSHDATA4 => out.extend_from_slice(&(self.data.len() as u32).to_le_bytes()),
            _ => {}
        }
        out.extend_from_slice(&self.data);
        out
    }
}

/// A parsed script is a sequence of parsed opcodes.
pub type ParsedScript = Vec<ParsedOpcode>;

/// Whether a parsed script contains only opcodes up to OP_16.
///
/// OP_RESERVED falls in that range and counts as a push here.
pub fn is_push_only(script: &[ParsedOpcode]) -> bool {
    script.iter().all(|op| op.opcode <= OP_16)
}

/// Remove every push whose serialized form equals the minimal push of
/// `data` (FindAndDelete over the signature being checked).
pub fn remove_opcode_by_data(script: &[ParsedOpcode], data: &[u8]) -> ParsedScript {
    let target = match push_data_prefix(data.len()) {
        Ok(mut prefix) => {
            prefix.extend_from_slice(data);
            prefix
        }
        Err(_) => return script.to_vec(),
    };
    script
        .iter()
        .filter(|pop| !(pop.is_push() && pop.to_bytes() == target))
        .cloned()
        .collect()
}

/// Remove all occurrences of a specific opcode.
pub fn remove_opcode(script: &[ParsedOpcode], opcode: u8) -> ParsedScript {
    script
        .iter()
        .filter(|pop| pop.opcode != opcode)
        .cloned()
        .collect()
}

/// Unparse a parsed script back to a Script.
pub fn unparse(pscript: &[ParsedOpcode]) -> Script {
    Script::from(pscript.iter().flat_map(ParsedOpcode::to_bytes).collect::<Vec<u8>>())
}

fn malformed(what: &str, at: usize) -> InterpreterError {
    InterpreterError::new(
        InterpreterErrorCode::MalformedPush,
        format!("{} at offset {}", what, at),
    )
}

/// Parse a Script into opcodes.
///
/// # Returns
/// The opcodes, or `MalformedPush` if a push runs past the end of the script.
pub fn parse_script(script: &Script) -> Result<ParsedScript, InterpreterError> {
    let scr = script.to_bytes();
    let mut parsed_ops = Vec::new();
    let mut i = 0;

    while i < scr.len() {
        let opcode = scr[i];
        let (header, data_len) = match opcode {
            OP_DATA_1..=OP_DATA_75 => (1, opcode as usize),
            OP_PUSHDATA1 | OP_PUSHDATA2 | OP_PUSHDATA4 => {
                let width = match opcode {
                    OP_PUSHDATA1 => 1,
                    OP_PUSHDATA2 => 2,
                    _ => 4,
                };
                let field = scr
                    .get(i + 1..i + 1 + width)
                    .ok_or_else(|| malformed("truncated push length", i))?;
                let len = field.iter().rev().fold(0usize, |acc, &b| (acc << 8) | b as usize);
                (1 + width, len)
            }
            _ => (1, 0),
        };

        let start = i + header;
        if scr.len() - start.min(scr.len()) < data_len {
            return Err(malformed("push data exceeds script length", i));
        }
        parsed_ops.push(ParsedOpcode {
            opcode,
            data: scr[start..start + data_len].to_vec(),
        });
        i = start + data_len;
    }

    Ok(parsed_ops)
}
