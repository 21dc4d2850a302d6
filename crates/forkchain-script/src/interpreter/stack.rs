//! Script execution stack.

use super::error::{InterpreterError, InterpreterErrorCode};
use super::scriptnum::ScriptNumber;

/// Interpret a stack element as a boolean.
///
/// Any non-zero byte is true, except a lone sign bit in the last byte
/// (negative zero).
pub fn as_bool(t: &[u8]) -> bool {
    match t.split_last() {
        None => false,
        Some((&last, rest)) => rest.iter().any(|&b| b != 0) || (last & 0x7f) != 0,
    }
}

/// Convert boolean to its stack encoding.
pub fn from_bool(v: bool) -> Vec<u8> {
    if v {
        vec![1]
    } else {
        vec![]
    }
}

fn invalid_index(idx: usize, size: usize) -> InterpreterError {
    InterpreterError::new(
        InterpreterErrorCode::InvalidStackOperation,
        format!("index {} is invalid for stack size {}", idx, size),
    )
}

/// The data/alt stack used by the script interpreter.
///
/// Indices passed to the `*_n` helpers count from the top (0 = top).
#[derive(Debug, Clone, Default)]
pub struct Stack {
    stk: Vec<Vec<u8>>,
    max_num_length: usize,
    verify_minimal_data: bool,
}

impl Stack {
    pub fn new(max_num_length: usize, verify_minimal_data: bool) -> Self {
        Stack {
            stk: Vec::new(),
            max_num_length,
            verify_minimal_data,
        }
    }

    pub fn depth(&self) -> usize {
        self.stk.len()
    }

    pub fn push_byte_array(&mut self, data: Vec<u8>) {
        self.stk.push(data);
    }

    pub fn push_int(&mut self, n: ScriptNumber) {
        self.push_byte_array(n.to_bytes());
    }

    pub fn push_bool(&mut self, val: bool) {
        self.push_byte_array(from_bool(val));
    }

    pub fn pop_byte_array(&mut self) -> Result<Vec<u8>, InterpreterError> {
        self.stk.pop().ok_or_else(|| invalid_index(0, 0))
    }

    pub fn pop_int(&mut self) -> Result<ScriptNumber, InterpreterError> {
        let data = self.pop_byte_array()?;
        ScriptNumber::from_bytes(&data, self.max_num_length, self.verify_minimal_data)
    }

    pub fn pop_bool(&mut self) -> Result<bool, InterpreterError> {
        Ok(as_bool(&self.pop_byte_array()?))
    }

    pub fn peek_byte_array(&self, idx: usize) -> Result<&[u8], InterpreterError> {
        let sz = self.stk.len();
        if idx >= sz {
            return Err(invalid_index(idx, sz));
        }
        Ok(&self.stk[sz - idx - 1])
    }

    fn nip_n(&mut self, idx: usize) -> Result<Vec<u8>, InterpreterError> {
        let sz = self.stk.len();
        if idx >= sz {
            return Err(invalid_index(idx, sz));
        }
        Ok(self.stk.remove(sz - idx - 1))
    }

    /// Remove the item `idx` below the top.
    pub fn nip(&mut self, idx: usize) -> Result<(), InterpreterError> {
        self.nip_n(idx).map(|_| ())
    }

    /// Copy the top item below the second item.
    pub fn tuck(&mut self) -> Result<(), InterpreterError> {
        let so2 = self.pop_byte_array()?;
        let so1 = self.pop_byte_array()?;
        self.push_byte_array(so2.clone());
        self.push_byte_array(so1);
        self.push_byte_array(so2);
        Ok(())
    }

    pub fn drop_n(&mut self, n: usize) -> Result<(), InterpreterError> {
        if n > self.stk.len() {
            return Err(invalid_index(n - 1, self.stk.len()));
        }
        self.stk.truncate(self.stk.len() - n);
        Ok(())
    }

    /// Duplicate the top `n` items in order.
    pub fn dup_n(&mut self, n: usize) -> Result<(), InterpreterError> {
        for _ in 0..n {
            let so = self.peek_byte_array(n - 1)?.to_vec();
            self.push_byte_array(so);
        }
        Ok(())
    }

    /// Rotate the top `3n` items left by `n`.
    pub fn rot_n(&mut self, n: usize) -> Result<(), InterpreterError> {
        let entry = 3 * n - 1;
        for _ in 0..n {
            let so = self.nip_n(entry)?;
            self.push_byte_array(so);
        }
        Ok(())
    }

    /// Swap the top `n` items with the `n` below them.
    pub fn swap_n(&mut self, n: usize) -> Result<(), InterpreterError> {
        let entry = 2 * n - 1;
        for _ in 0..n {
            let so = self.nip_n(entry)?;
            self.push_byte_array(so);
        }
        Ok(())
    }

    /// Copy the `n` items below the top `n` to the top.
    pub fn over_n(&mut self, n: usize) -> Result<(), InterpreterError> {
        let entry = 2 * n - 1;
        for _ in 0..n {
            let so = self.peek_byte_array(entry)?.to_vec();
            self.push_byte_array(so);
        }
        Ok(())
    }

    pub fn pick_n(&mut self, n: usize) -> Result<(), InterpreterError> {
        let so = self.peek_byte_array(n)?.to_vec();
        self.push_byte_array(so);
        Ok(())
    }

    pub fn roll_n(&mut self, n: usize) -> Result<(), InterpreterError> {
        let so = self.nip_n(n)?;
        self.push_byte_array(so);
        Ok(())
    }

    /// Stack contents, bottom to top.
    pub fn items(&self) -> &[Vec<u8>] {
        &self.stk
    }

    /// Replace the stack contents (last = top).
    pub fn set_items(&mut self, data: Vec<Vec<u8>>) {
        self.stk = data;
    }

    pub fn clear(&mut self) {
        self.stk.clear();
    }
}
