//! Compiler and stack machine for linked Wollok environments.
//!
//! [`compiler`] lowers method bodies, initializers and programs into
//! [`bytecode`] lists. An [`Evaluation`] owns the heap and the frame stack
//! and executes that code one instruction at a time, calling into
//! [`natives`] for methods implemented by the host. [`Interpreter`] wraps
//! both for running programs and tests.

pub mod compiler;
pub mod error;
pub mod evaluation;
pub mod frame;
pub mod heap;
pub mod interpreter;
pub mod lang;
pub mod natives;

use ast::{Forest, Tree};
use linker::{Environment, LinkError};

pub use compiler::{Compiler, compile};
pub use error::{CompileError, ExecutionError, RuntimeError};
pub use evaluation::{Evaluation, EvaluationSettings, MAX_FRAMES};
pub use interpreter::{Interpreter, TestFailure, TestReport};
pub use lang::prelude;
pub use natives::{NativeDesc, Natives};

/// Fills and links `packages`, after the prelude when `with_prelude` is
/// set.
pub fn link_packages(packages: Vec<Tree>, with_prelude: bool) -> Result<Environment, LinkError> {
    let forest = if with_prelude {
        Forest::new(prelude()).extend(packages)
    } else {
        Forest::new(packages)
    };
    linker::link(forest.fill(), None)
}
