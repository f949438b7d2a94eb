use ast::NodeId;

use crate::instruction::{Code, Instruction, Interruption, ObjectId, Primitive};

/// A forward conditional jump whose distance is not known yet.
///
/// Created by [`CodeBuilder::conditional_jump`]; resolve it with
/// [`CodeBuilder::bind`] once the skipped instructions are emitted.
#[derive(Debug)]
#[must_use]
pub struct Label {
    /// Index of the jump instruction.
    at: usize,
}

/// Accumulates an instruction list.
#[derive(Debug, Default)]
pub struct CodeBuilder {
    code: Vec<Instruction>,
}

impl CodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn finish(self) -> Code {
        self.code.into()
    }

    pub fn into_vec(self) -> Vec<Instruction> {
        self.code
    }

    pub fn emit(&mut self, instruction: Instruction) {
        self.code.push(instruction);
    }

    pub fn load(&mut self, name: &str) {
        self.emit(Instruction::Load(name.to_string()));
    }

    pub fn store(&mut self, name: &str, lookup: bool) {
        self.emit(Instruction::Store {
            name: name.to_string(),
            lookup,
        });
    }

    pub fn push(&mut self, id: ObjectId) {
        self.emit(Instruction::Push(id));
    }

    pub fn pop(&mut self) {
        self.emit(Instruction::Pop);
    }

    pub fn dup(&mut self) {
        self.emit(Instruction::Dup);
    }

    pub fn swap(&mut self) {
        self.emit(Instruction::Swap);
    }

    pub fn get(&mut self, field: &str) {
        self.emit(Instruction::Get(field.to_string()));
    }

    pub fn set(&mut self, field: &str) {
        self.emit(Instruction::Set(field.to_string()));
    }

    pub fn instantiate(&mut self, module: NodeId, value: Option<Primitive>) {
        self.emit(Instruction::Instantiate { module, value });
    }

    pub fn init(&mut self, arity: usize, lookup_start: NodeId, init_fields: bool) {
        self.emit(Instruction::Init {
            arity,
            lookup_start,
            init_fields,
        });
    }

    pub fn call(&mut self, message: &str, arity: usize, lookup_start: Option<NodeId>) {
        self.emit(Instruction::Call {
            message: message.to_string(),
            arity,
            lookup_start,
        });
    }

    pub fn inherits(&mut self, module: NodeId) {
        self.emit(Instruction::Inherits(module));
    }

    pub fn interrupt(&mut self, kind: Interruption) {
        self.emit(Instruction::Interrupt(kind));
    }

    pub fn resume_interruption(&mut self) {
        self.emit(Instruction::ResumeInterruption);
    }

    pub fn if_then_else(&mut self, then_branch: Code, else_branch: Code) {
        self.emit(Instruction::IfThenElse {
            then_branch,
            else_branch,
        });
    }

    pub fn try_catch_always(&mut self, body: Code, catch: Code, always: Code) {
        self.emit(Instruction::TryCatchAlways {
            body,
            catch,
            always,
        });
    }

    /// Emits a placeholder jump, to be bound after the skipped code.
    pub fn conditional_jump(&mut self) -> Label {
        let at = self.code.len();
        self.emit(Instruction::ConditionalJump(0));
        Label { at }
    }

    /// Makes `label` skip everything emitted since it was created.
    pub fn bind(&mut self, label: Label) {
        let count = self.code.len() - label.at - 1;
        self.code[label.at] = Instruction::ConditionalJump(count);
    }
}
