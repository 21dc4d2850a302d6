//! Arithmetic operations for the script interpreter.
//!
//! Operands are limited to `max_script_number_length` bytes; results are
//! pushed unchecked and may be one byte longer.

use super::error::InterpreterError;
use super::scriptnum::ScriptNumber;
use super::thread::Thread;

impl<'a> Thread<'a> {
    pub(crate) fn op_unary_int(&mut self, f: impl FnOnce(i64) -> i64) -> Result<(), InterpreterError> {
        let m = self.dstack.pop_int()?;
        self.dstack.push_int(ScriptNumber(f(m.to_i64())));
        Ok(())
    }

    /// `f(a, b)` where `b` is the top item and `a` the one below it.
    pub(crate) fn op_binary_int(&mut self, f: impl FnOnce(i64, i64) -> i64) -> Result<(), InterpreterError> {
        let b = self.dstack.pop_int()?;
        let a = self.dstack.pop_int()?;
        self.dstack.push_int(ScriptNumber(f(a.to_i64(), b.to_i64())));
        Ok(())
    }

    /// `x min max WITHIN` is true when `min <= x < max`.
    pub(crate) fn op_within(&mut self) -> Result<(), InterpreterError> {
        let max_val = self.dstack.pop_int()?;
        let min_val = self.dstack.pop_int()?;
        let x = self.dstack.pop_int()?;
        self.dstack.push_bool(min_val <= x && x < max_val);
        Ok(())
    }
}
