use bytecode::{Code, Interruption, ObjectId};

use crate::error::RuntimeError;
use crate::heap::ContextId;

/// One activation record.
///
/// `resume` lists the interruption kinds this frame is waiting for. A frame
/// registers interest before pushing the child frame that may raise it.
#[derive(Debug, Clone)]
pub struct Frame {
    pub code: Code,
    pub pc: usize,
    pub context: ContextId,
    pub operands: Vec<ObjectId>,
    pub resume: Vec<Interruption>,
    /// What an unwinding handler frame was entered with.
    pub pending: Option<Interruption>,
}

impl Frame {
    pub fn new(code: Code, context: ContextId) -> Self {
        Self {
            code,
            pc: 0,
            context,
            operands: Vec::new(),
            resume: Vec::new(),
            pending: None,
        }
    }

    pub fn resuming(mut self, kinds: &[Interruption]) -> Self {
        self.resume.extend_from_slice(kinds);
        self
    }

    pub fn push(&mut self, value: ObjectId) {
        self.operands.push(value);
    }

    pub fn pop(&mut self) -> Result<ObjectId, RuntimeError> {
        self.operands.pop().ok_or(RuntimeError::StackUnderflow)
    }

    /// Pops `count` operands, returned first-pushed first.
    pub fn pop_n(&mut self, count: usize) -> Result<Vec<ObjectId>, RuntimeError> {
        if count > self.operands.len() {
            return Err(RuntimeError::StackUnderflow);
        }
        let at = self.operands.len() - count;
        Ok(self.operands.split_off(at))
    }

    pub fn peek(&self) -> Result<ObjectId, RuntimeError> {
        self.operands.last().copied().ok_or(RuntimeError::StackUnderflow)
    }

    /// Removes `kind` from the resume list. False if it was not there.
    pub fn take_resume(&mut self, kind: Interruption) -> bool {
        match self.resume.iter().position(|&k| k == kind) {
            Some(at) => {
                self.resume.remove(at);
                true
            }
            None => false,
        }
    }

    /// Accepts an unwinding interruption if this frame waits for it. A
    /// frame that has not started yet is a handler: it stops waiting for
    /// anything else and keeps `kind` for `ResumeInterruption`.
    pub fn receive(&mut self, kind: Interruption) -> bool {
        if !self.take_resume(kind) {
            return false;
        }
        if self.pc == 0 {
            self.resume.clear();
            self.pending = Some(kind);
        }
        true
    }

    /// The interruption an always block re-raises.
    pub fn pending_interruption(&self) -> Result<Interruption, RuntimeError> {
        self.pending.ok_or(RuntimeError::NoPendingInterruption)
    }
}
