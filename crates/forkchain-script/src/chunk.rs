//! Script chunk parsing and encoding.
//!
//! A chunk is either a bare opcode or a data push together with the bytes
//! it pushes. Chunks keep the opcode that introduced them, so re-encoding a
//! decoded script, including non-minimal pushes, reproduces it byte for byte.

use crate::opcodes::*;
use crate::ScriptError;

/// A single parsed element of a script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptChunk {
    /// The opcode byte. For direct pushes (1-75 bytes), this is the length.
    pub op: u8,
    /// The pushed bytes, if this chunk is a push operation.
    pub data: Option<Vec<u8>>,
}

impl ScriptChunk {
    /// Whether this chunk pushes data (including the empty push OP_0).
    pub fn is_push(&self) -> bool {
        self.op <= OP_PUSHDATA4
    }

    /// Convert this chunk to its ASM token.
    ///
    /// Data pushes render as hex; OP_0 and other opcodes use their name.
    pub fn to_asm_string(&self) -> String {
        if self.op > OP_0 && self.op <= OP_PUSHDATA4 {
            if let Some(ref data) = self.data {
                return hex::encode(data);
            }
        }
        opcode_to_string(self.op).to_string()
    }

    /// Encode the chunk exactly as it appeared in the script.
    pub fn to_bytes(&self) -> Vec<u8> {
        let data = self.data.as_deref().unwrap_or(&[]);
        let mut out = Vec::with_capacity(5 + data.len());
        out.push(self.op);
        match self.op {
            OP_PUSHDATA1 => out.push(data.len() as u8),
            OP_PUSHDATA2 => out.extend_from_slice(&(data.len() as u16).to_le_bytes()),
            OP_PUSHDATA4 => out.extend_from_slice(&(data.len() as u32).to_le_bytes()),
            _ => {}
        }
        out.extend_from_slice(data);
        out
    }
}

/// Decode raw script bytes into chunks.
///
/// # Arguments
/// * `bytes` - The raw script bytes to decode.
///
/// # Returns
/// The parsed chunks, or `ScriptError::DataTooSmall` if a push declares
/// more bytes than remain.
pub fn decode_script(bytes: &[u8]) -> Result<Vec<ScriptChunk>, ScriptError> {
    let mut chunks = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        chunks.push(read_chunk(bytes, &mut pos)?);
    }
    Ok(chunks)
}

/// Read one chunk at `*pos`, advancing past it.
pub(crate) fn read_chunk(bytes: &[u8], pos: &mut usize) -> Result<ScriptChunk, ScriptError> {
    let op = bytes[*pos];
    let (header, length) = match op {
        OP_DATA_1..=OP_DATA_75 => (1, op as usize),
        OP_PUSHDATA1 => (2, read_len(bytes, *pos + 1, 1)?),
        OP_PUSHDATA2 => (3, read_len(bytes, *pos + 1, 2)?),
        OP_PUSHDATA4 => (5, read_len(bytes, *pos + 1, 4)?),
        _ => {
            *pos += 1;
            return Ok(ScriptChunk { op, data: None });
        }
    };

    let start = *pos + header;
    if bytes.len() - start < length {
        return Err(ScriptError::DataTooSmall);
    }
    let data = bytes[start..start + length].to_vec();
    *pos = start + length;
    Ok(ScriptChunk { op, data: Some(data) })
}

/// Read a little-endian length field of `width` bytes at `at`.
fn read_len(bytes: &[u8], at: usize, width: usize) -> Result<usize, ScriptError> {
    let field = bytes.get(at..at + width).ok_or(ScriptError::DataTooSmall)?;
    Ok(field
        .iter()
        .rev()
        .fold(0usize, |acc, &b| (acc << 8) | b as usize))
}

/// Compute the minimal push prefix for a payload of `data_len` bytes.
///
/// # Returns
/// The prefix bytes, or `ScriptError::DataTooBig` past the u32 range.
pub fn push_data_prefix(data_len: usize) -> Result<Vec<u8>, ScriptError> {
    if data_len <= OP_DATA_75 as usize {
        Ok(vec![data_len as u8])
    } else if data_len <= 0xFF {
        Ok(vec![OP_PUSHDATA1, data_len as u8])
    } else if data_len <= 0xFFFF {
        let mut buf = vec![OP_PUSHDATA2];
        buf.extend_from_slice(&(data_len as u16).to_le_bytes());
        Ok(buf)
    } else if data_len <= 0xFFFF_FFFF {
        let mut buf = vec![OP_PUSHDATA4];
        buf.extend_from_slice(&(data_len as u32).to_le_bytes());
        Ok(buf)
    } else {
        Err(ScriptError::DataTooBig)
    }
}
