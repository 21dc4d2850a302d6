//! Data operations for the script interpreter.

use super::error::InterpreterError;
use super::scriptnum::ScriptNumber;
use super::thread::Thread;

impl<'a> Thread<'a> {
    /// Push the byte length of the top item, leaving the item in place.
    pub(crate) fn op_size(&mut self) -> Result<(), InterpreterError> {
        let len = self.dstack.peek_byte_array(0)?.len();
        self.dstack.push_int(ScriptNumber(len as i64));
        Ok(())
    }

    pub(crate) fn op_equal(&mut self) -> Result<(), InterpreterError> {
        let a = self.dstack.pop_byte_array()?;
        let b = self.dstack.pop_byte_array()?;
        self.dstack.push_bool(a == b);
        Ok(())
    }
}
