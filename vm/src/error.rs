use ast::NodeId;
use bytecode::{Interruption, ObjectId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("{kind} node {node} is not an expression")]
    NotAnExpression { kind: &'static str, node: NodeId },
    #[error("`{0}` does not name a value")]
    NotAValue(String),
    #[error("reference `{0}` was never linked")]
    Unlinked(String),
    #[error("missing core module {0}")]
    MissingModule(String),
    #[error("`super` used outside of a method (node {0})")]
    SuperOutsideMethod(NodeId),
    #[error("{0} has no superclass to delegate to")]
    NoSuperclass(String),
    #[error("{0} has no body to compile")]
    NoBody(String),
}

/// Faults raised while executing a single instruction.
///
/// Inside a running program these never escape: the evaluation turns them
/// into an `EvaluationError` exception that user code can catch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("operand stack underflow")]
    StackUnderflow,
    #[error("no active frame")]
    NoActiveFrame,
    #[error("stack overflow: more than {0} frames")]
    StackOverflow(usize),
    #[error("unknown name `{0}`")]
    UnknownName(String),
    #[error("unknown object {0}")]
    UnknownObject(ObjectId),
    #[error("{module} has no field `{field}`")]
    MissingField { module: String, field: String },
    #[error("expected {expected} but got {got}")]
    TypeError { expected: &'static str, got: String },
    #[error("division by zero")]
    DivisionByZero,
    #[error("index {index} out of range for size {size}")]
    IndexOutOfRange { index: f64, size: usize },
    #[error("{module} does not understand {message}/{arity}")]
    MessageNotUnderstood {
        module: String,
        message: String,
        arity: usize,
    },
    #[error("no native implementation for {module}.{selector}")]
    MissingNative { module: String, selector: String },
    #[error("{module} has no constructor for {arity} arguments")]
    NoConstructor { module: String, arity: usize },
    #[error("no module `{0}`")]
    MissingModule(String),
    #[error("no pending interruption to resume")]
    NoPendingInterruption,
    #[error(transparent)]
    Compile(#[from] CompileError),
    /// A program exception raised by native code. Propagated as-is.
    #[error("exception {0} thrown")]
    Thrown(ObjectId),
}

/// Failures that end an evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutionError {
    #[error("unhandled {module}: {message}")]
    UnhandledException { module: String, message: String },
    #[error("unhandled {0} interruption")]
    UnhandledInterruption(Interruption),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error("no entity named `{0}`")]
    UnknownEntity(String),
}
