use bytecode::ObjectId;

use crate::error::RuntimeError;
use crate::evaluation::Evaluation;
use crate::natives::arg;

// Both operands are already evaluated: `&&` and `||` do not short-circuit.

pub fn boolean_and(
    eval: &mut Evaluation,
    receiver: ObjectId,
    args: &[ObjectId],
) -> Result<(), RuntimeError> {
    let a = eval.boolean(receiver)?;
    let b = eval.boolean(arg(args, 0)?)?;
    eval.push_operand(ObjectId::boolean(a && b))
}

pub fn boolean_or(
    eval: &mut Evaluation,
    receiver: ObjectId,
    args: &[ObjectId],
) -> Result<(), RuntimeError> {
    let a = eval.boolean(receiver)?;
    let b = eval.boolean(arg(args, 0)?)?;
    eval.push_operand(ObjectId::boolean(a || b))
}

pub fn boolean_negate(
    eval: &mut Evaluation,
    receiver: ObjectId,
    _args: &[ObjectId],
) -> Result<(), RuntimeError> {
    let value = eval.boolean(receiver)?;
    eval.push_operand(ObjectId::boolean(!value))
}
