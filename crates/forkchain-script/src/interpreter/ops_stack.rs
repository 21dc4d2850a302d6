//! Stack manipulation operations for the script interpreter.

use super::error::{InterpreterError, InterpreterErrorCode};
use super::stack::as_bool;
use super::thread::Thread;

impl<'a> Thread<'a> {
    pub(crate) fn op_to_alt_stack(&mut self) -> Result<(), InterpreterError> {
        let data = self.dstack.pop_byte_array()?;
        self.astack.push_byte_array(data);
        Ok(())
    }

    pub(crate) fn op_from_alt_stack(&mut self) -> Result<(), InterpreterError> {
        let data = self.astack.pop_byte_array()?;
        self.dstack.push_byte_array(data);
        Ok(())
    }

    pub(crate) fn op_ifdup(&mut self) -> Result<(), InterpreterError> {
        let so = self.dstack.peek_byte_array(0)?;
        if as_bool(so) {
            let so = so.to_vec();
            self.dstack.push_byte_array(so);
        }
        Ok(())
    }

    pub(crate) fn op_pick(&mut self) -> Result<(), InterpreterError> {
        let n = self.pop_stack_index()?;
        self.dstack.pick_n(n)
    }

    pub(crate) fn op_roll(&mut self) -> Result<(), InterpreterError> {
        let n = self.pop_stack_index()?;
        self.dstack.roll_n(n)
    }

    /// Pop a depth operand for PICK/ROLL; must address an existing item.
    fn pop_stack_index(&mut self) -> Result<usize, InterpreterError> {
        let val = self.dstack.pop_int()?.to_i64();
        if val < 0 || val as usize >= self.dstack.depth() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidStackOperation,
                format!("index {} is invalid for stack size {}", val, self.dstack.depth()),
            ));
        }
        Ok(val as usize)
    }
}
