use core::fmt;
use std::sync::Arc;

use ast::NodeId;

/// Shared, immutable instruction list.
pub type Code = Arc<[Instruction]>;

/// Identity of a runtime object.
///
/// The first few identities are reserved for the well-known objects every
/// evaluation creates before anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

impl ObjectId {
    pub const NULL: ObjectId = ObjectId(0);
    pub const TRUE: ObjectId = ObjectId(1);
    pub const FALSE: ObjectId = ObjectId(2);
    pub const VOID: ObjectId = ObjectId(3);

    /// Number of reserved identities.
    pub const RESERVED: u32 = 4;

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn boolean(value: bool) -> ObjectId {
        if value { Self::TRUE } else { Self::FALSE }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::NULL => write!(f, "null"),
            Self::TRUE => write!(f, "true"),
            Self::FALSE => write!(f, "false"),
            Self::VOID => write!(f, "void"),
            Self(id) => write!(f, "@{id}"),
        }
    }
}

/// The three ways a frame can be unwound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interruption {
    /// A method returned.
    Return,
    /// An exception was thrown.
    Exception,
    /// A nested block (branch, try body, handler) finished normally.
    Result,
}

impl Interruption {
    pub const ALL: [Interruption; 3] = [Self::Result, Self::Return, Self::Exception];
}

impl fmt::Display for Interruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Return => write!(f, "return"),
            Self::Exception => write!(f, "exception"),
            Self::Result => write!(f, "result"),
        }
    }
}

/// Inner value of an instantiated primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Number(f64),
    String(String),
    /// Pops this many elements off the operand stack, first pushed first.
    Collection(usize),
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::String(value) => write!(f, "{value:?}"),
            Self::Collection(count) => write!(f, "[{count}]"),
        }
    }
}

/// One stack-machine instruction.
///
/// Every expression compiles to code that leaves exactly one object on the
/// operand stack. Branches and protected blocks are nested instruction lists
/// run in frames of their own.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// Push the value bound to a name in the current context chain.
    Load(String),
    /// Pop a value and bind it. With `lookup`, rebinds the nearest existing
    /// binding up the chain; without, declares it in the current context.
    Store { name: String, lookup: bool },
    Push(ObjectId),
    Pop,
    Dup,
    Swap,
    /// Pop a receiver, push its field.
    Get(String),
    /// Pop a value then a receiver, set the receiver's field.
    Set(String),
    /// Allocate an instance of `module`, interning primitives.
    Instantiate {
        module: NodeId,
        value: Option<Primitive>,
    },
    /// Pop the receiver then `arity` arguments and run the construction
    /// protocol of `lookup_start`.
    Init {
        arity: usize,
        lookup_start: NodeId,
        init_fields: bool,
    },
    /// Pop `arity` arguments then a receiver and dispatch `message`. With
    /// `lookup_start`, lookup begins after that module (`super`).
    Call {
        message: String,
        arity: usize,
        lookup_start: Option<NodeId>,
    },
    /// Pop an object, push whether it inherits `module`.
    Inherits(NodeId),
    /// Pop a boolean; when false, skip the next `count` instructions.
    ConditionalJump(usize),
    /// Pop a boolean and run one of the branches in a new frame.
    IfThenElse { then_branch: Code, else_branch: Code },
    TryCatchAlways {
        body: Code,
        catch: Code,
        always: Code,
    },
    /// Pop a value and unwind until a frame resumes `kind`.
    Interrupt(Interruption),
    /// Pop a value and re-raise the interruption pending in this frame.
    ResumeInterruption,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load(name) => write!(f, "Load {name}"),
            Self::Store { name, lookup } => {
                if *lookup {
                    write!(f, "Store {name} ^")
                } else {
                    write!(f, "Store {name}")
                }
            }
            Self::Push(id) => write!(f, "Push {id}"),
            Self::Pop => write!(f, "Pop"),
            Self::Dup => write!(f, "Dup"),
            Self::Swap => write!(f, "Swap"),
            Self::Get(name) => write!(f, "Get {name}"),
            Self::Set(name) => write!(f, "Set {name}"),
            Self::Instantiate { module, value } => match value {
                Some(value) => write!(f, "Instantiate #{module} {value}"),
                None => write!(f, "Instantiate #{module}"),
            },
            Self::Init {
                arity,
                lookup_start,
                init_fields,
            } => {
                let fields = if *init_fields { " fields" } else { "" };
                write!(f, "Init {arity} #{lookup_start}{fields}")
            }
            Self::Call {
                message,
                arity,
                lookup_start,
            } => match lookup_start {
                Some(start) => write!(f, "Call {message}/{arity} after #{start}"),
                None => write!(f, "Call {message}/{arity}"),
            },
            Self::Inherits(module) => write!(f, "Inherits #{module}"),
            Self::ConditionalJump(count) => write!(f, "ConditionalJump +{count}"),
            Self::IfThenElse {
                then_branch,
                else_branch,
            } => {
                write!(f, "IfThenElse [{}] [{}]", then_branch.len(), else_branch.len())
            }
            Self::TryCatchAlways {
                body,
                catch,
                always,
            } => {
                write!(
                    f,
                    "TryCatchAlways [{}] [{}] [{}]",
                    body.len(),
                    catch.len(),
                    always.len()
                )
            }
            Self::Interrupt(kind) => write!(f, "Interrupt {kind}"),
            Self::ResumeInterruption => write!(f, "ResumeInterruption"),
        }
    }
}

/// Renders `code` one instruction per line, nested lists indented below
/// the instruction that owns them.
pub fn listing(code: &[Instruction]) -> String {
    let mut out = String::new();
    write_listing(code, 0, &mut out);
    out
}

fn write_listing(code: &[Instruction], depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    for (pc, instruction) in code.iter().enumerate() {
        out.push_str(&format!("{indent}{pc:>4}  {instruction}\n"));
        match instruction {
            Instruction::IfThenElse {
                then_branch,
                else_branch,
            } => {
                out.push_str(&format!("{indent}      then:\n"));
                write_listing(then_branch, depth + 1, out);
                out.push_str(&format!("{indent}      else:\n"));
                write_listing(else_branch, depth + 1, out);
            }
            Instruction::TryCatchAlways {
                body,
                catch,
                always,
            } => {
                out.push_str(&format!("{indent}      try:\n"));
                write_listing(body, depth + 1, out);
                out.push_str(&format!("{indent}      catch:\n"));
                write_listing(catch, depth + 1, out);
                out.push_str(&format!("{indent}      always:\n"));
                write_listing(always, depth + 1, out);
            }
            _ => {}
        }
    }
}
