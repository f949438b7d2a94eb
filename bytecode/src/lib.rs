//! Instruction set of the Wollok stack machine.

mod builder;
mod instruction;

pub use builder::{CodeBuilder, Label};
pub use instruction::{Code, Instruction, Interruption, ObjectId, Primitive, listing};
