//! Script number arithmetic.
//!
//! Numbers on the stack are little-endian byte arrays with a sign bit in the
//! most significant bit of the last byte. Numeric opcodes only accept
//! operands of up to `max_script_number_length` bytes, but results may be
//! one byte longer (e.g. `0x7fffffff + 1`) and stay valid as long as they
//! are not fed back into a numeric opcode. With 4-byte operands every
//! intermediate value fits in an `i64`.

use super::error::{InterpreterError, InterpreterErrorCode};

/// A script number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct ScriptNumber(pub i64);

impl ScriptNumber {
    pub fn new(val: i64) -> Self {
        ScriptNumber(val)
    }

    /// Parse a stack element as a number.
    ///
    /// `max_len` bounds the encoded length; `require_minimal` rejects
    /// encodings with superfluous trailing zero bytes.
    pub fn from_bytes(
        bb: &[u8],
        max_len: usize,
        require_minimal: bool,
    ) -> Result<Self, InterpreterError> {
        if bb.len() > max_len {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NumberTooBig,
                format!(
                    "numeric value encoded as {:02x?} is {} bytes which exceeds the max allowed of {}",
                    bb,
                    bb.len(),
                    max_len
                ),
            ));
        }
        if require_minimal {
            check_minimal_data_encoding(bb)?;
        }
        let Some((&last, _)) = bb.split_last() else {
            return Ok(ScriptNumber(0));
        };

        let mut v: i64 = 0;
        for (i, &b) in bb.iter().enumerate() {
            v |= (b as i64) << (8 * i);
        }
        if last & 0x80 != 0 {
            v &= !(0x80i64 << (8 * (bb.len() - 1)));
            v = -v;
        }
        Ok(ScriptNumber(v))
    }

    /// Serialize to the minimal little-endian sign-magnitude encoding.
    pub fn to_bytes(&self) -> Vec<u8> {
        if self.0 == 0 {
            return Vec::new();
        }
        let negative = self.0 < 0;
        let mut abs = self.0.unsigned_abs();
        let mut out = Vec::with_capacity(9);
        while abs > 0 {
            out.push((abs & 0xff) as u8);
            abs >>= 8;
        }
        // A set high bit would read as the sign, so add a sign byte.
        if out[out.len() - 1] & 0x80 != 0 {
            out.push(if negative { 0x80 } else { 0x00 });
        } else if negative {
            let last = out.len() - 1;
            out[last] |= 0x80;
        }
        out
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// The value clamped to the `i32` range.
    pub fn to_i32(&self) -> i32 {
        self.0.clamp(i32::MIN as i64, i32::MAX as i64) as i32
    }

    pub fn to_i64(&self) -> i64 {
        self.0
    }
}

impl From<i64> for ScriptNumber {
    fn from(v: i64) -> Self {
        ScriptNumber(v)
    }
}

/// Check that a byte array uses minimal numeric encoding.
pub fn check_minimal_data_encoding(v: &[u8]) -> Result<(), InterpreterError> {
    let Some((&last, rest)) = v.split_last() else {
        return Ok(());
    };
    // The last byte may only be 0x00/0x80 when it carries a sign bit the
    // previous byte could not.
    if last & 0x7f == 0 && rest.last().map_or(true, |&b| b & 0x80 == 0) {
        return Err(InterpreterError::new(
            InterpreterErrorCode::MinimalData,
            format!("numeric value encoded as {:02x?} is not minimally encoded", v),
        ));
    }
    Ok(())
}
