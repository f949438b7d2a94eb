use bytecode::ObjectId;

use crate::error::RuntimeError;
use crate::evaluation::Evaluation;
use crate::lang::MESSAGE_NOT_UNDERSTOOD;
use crate::natives::arg;

pub fn object_eq(
    eval: &mut Evaluation,
    receiver: ObjectId,
    args: &[ObjectId],
) -> Result<(), RuntimeError> {
    let other = arg(args, 0)?;
    eval.push_operand(ObjectId::boolean(receiver == other))
}

pub fn object_identity(
    eval: &mut Evaluation,
    receiver: ObjectId,
    _args: &[ObjectId],
) -> Result<(), RuntimeError> {
    let id = eval.new_number(f64::from(receiver.0));
    eval.push_operand(id)
}

/// Shared by every module whose `toString` is its display form.
pub fn object_to_string(
    eval: &mut Evaluation,
    receiver: ObjectId,
    _args: &[ObjectId],
) -> Result<(), RuntimeError> {
    let text = eval.display(receiver);
    let string = eval.new_string(&text);
    eval.push_operand(string)
}

pub fn object_class_name(
    eval: &mut Evaluation,
    receiver: ObjectId,
    _args: &[ObjectId],
) -> Result<(), RuntimeError> {
    let name = eval.class_name(receiver);
    let string = eval.new_string(&name);
    eval.push_operand(string)
}

/// Fallback of every failed lookup: receives the selector and the
/// arguments as a list, and throws.
pub fn object_message_not_understood(
    eval: &mut Evaluation,
    receiver: ObjectId,
    args: &[ObjectId],
) -> Result<(), RuntimeError> {
    let selector = eval.string(arg(args, 0)?)?.to_string();
    let arity = eval.list(arg(args, 1)?)?.len();
    let message = format!(
        "{} does not understand {selector}/{arity}",
        eval.display(receiver)
    );
    let exception = eval.new_exception(MESSAGE_NOT_UNDERSTOOD, &message)?;
    Err(RuntimeError::Thrown(exception))
}
