use bytecode::{CodeBuilder, Interruption, ObjectId, Primitive};

use crate::error::RuntimeError;
use crate::evaluation::Evaluation;
use crate::heap::ContextId;
use crate::natives::arg;

pub fn list_add(
    eval: &mut Evaluation,
    receiver: ObjectId,
    args: &[ObjectId],
) -> Result<(), RuntimeError> {
    let element = arg(args, 0)?;
    eval.list_mut(receiver)?.push(element);
    eval.push_operand(ObjectId::VOID)
}

pub fn list_get(
    eval: &mut Evaluation,
    receiver: ObjectId,
    args: &[ObjectId],
) -> Result<(), RuntimeError> {
    let index = eval.number(arg(args, 0)?)?;
    let elements = eval.list(receiver)?;
    let size = elements.len();
    let element = (index >= 0.0 && index.fract() == 0.0)
        .then(|| elements.get(index as usize).copied())
        .flatten()
        .ok_or(RuntimeError::IndexOutOfRange { index, size })?;
    eval.push_operand(element)
}

pub fn list_size(
    eval: &mut Evaluation,
    receiver: ObjectId,
    _args: &[ObjectId],
) -> Result<(), RuntimeError> {
    let size = eval.list(receiver)?.len();
    let id = eval.new_number(size as f64);
    eval.push_operand(id)
}

pub fn list_is_empty(
    eval: &mut Evaluation,
    receiver: ObjectId,
    _args: &[ObjectId],
) -> Result<(), RuntimeError> {
    let empty = eval.list(receiver)?.is_empty();
    eval.push_operand(ObjectId::boolean(empty))
}

/// Applies the closure to each element in a frame of its own, so the
/// closure body runs as ordinary program code.
pub fn list_for_each(
    eval: &mut Evaluation,
    receiver: ObjectId,
    args: &[ObjectId],
) -> Result<(), RuntimeError> {
    let closure = arg(args, 0)?;
    let elements = eval.list(receiver)?.to_vec();
    let mut b = CodeBuilder::new();
    for element in elements {
        b.push(closure);
        b.push(element);
        b.call("apply", 1, None);
        b.pop();
    }
    b.push(ObjectId::VOID);
    b.interrupt(Interruption::Return);
    eval.push_returning_frame(b.finish(), ContextId::ROOT)
}

pub fn list_map(
    eval: &mut Evaluation,
    receiver: ObjectId,
    args: &[ObjectId],
) -> Result<(), RuntimeError> {
    let closure = arg(args, 0)?;
    let elements = eval.list(receiver)?.to_vec();
    let count = elements.len();
    let mut b = CodeBuilder::new();
    for element in elements {
        b.push(closure);
        b.push(element);
        b.call("apply", 1, None);
    }
    b.instantiate(eval.core().list, Some(Primitive::Collection(count)));
    b.interrupt(Interruption::Return);
    eval.push_returning_frame(b.finish(), ContextId::ROOT)
}
