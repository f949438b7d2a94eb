use bytecode::ObjectId;

use crate::error::RuntimeError;
use crate::evaluation::Evaluation;
use crate::natives::arg;

fn operands(
    eval: &Evaluation,
    receiver: ObjectId,
    args: &[ObjectId],
) -> Result<(f64, f64), RuntimeError> {
    Ok((eval.number(receiver)?, eval.number(arg(args, 0)?)?))
}

fn push_number(eval: &mut Evaluation, value: f64) -> Result<(), RuntimeError> {
    let id = eval.new_number(value);
    eval.push_operand(id)
}

pub fn number_add(
    eval: &mut Evaluation,
    receiver: ObjectId,
    args: &[ObjectId],
) -> Result<(), RuntimeError> {
    let (a, b) = operands(eval, receiver, args)?;
    push_number(eval, a + b)
}

pub fn number_sub(
    eval: &mut Evaluation,
    receiver: ObjectId,
    args: &[ObjectId],
) -> Result<(), RuntimeError> {
    let (a, b) = operands(eval, receiver, args)?;
    push_number(eval, a - b)
}

pub fn number_mul(
    eval: &mut Evaluation,
    receiver: ObjectId,
    args: &[ObjectId],
) -> Result<(), RuntimeError> {
    let (a, b) = operands(eval, receiver, args)?;
    push_number(eval, a * b)
}

pub fn number_div(
    eval: &mut Evaluation,
    receiver: ObjectId,
    args: &[ObjectId],
) -> Result<(), RuntimeError> {
    let (a, b) = operands(eval, receiver, args)?;
    if b == 0.0 {
        return Err(RuntimeError::DivisionByZero);
    }
    push_number(eval, a / b)
}

pub fn number_mod(
    eval: &mut Evaluation,
    receiver: ObjectId,
    args: &[ObjectId],
) -> Result<(), RuntimeError> {
    let (a, b) = operands(eval, receiver, args)?;
    if b == 0.0 {
        return Err(RuntimeError::DivisionByZero);
    }
    push_number(eval, a % b)
}

pub fn number_lt(
    eval: &mut Evaluation,
    receiver: ObjectId,
    args: &[ObjectId],
) -> Result<(), RuntimeError> {
    let (a, b) = operands(eval, receiver, args)?;
    eval.push_operand(ObjectId::boolean(a < b))
}

pub fn number_gt(
    eval: &mut Evaluation,
    receiver: ObjectId,
    args: &[ObjectId],
) -> Result<(), RuntimeError> {
    let (a, b) = operands(eval, receiver, args)?;
    eval.push_operand(ObjectId::boolean(a > b))
}

pub fn number_le(
    eval: &mut Evaluation,
    receiver: ObjectId,
    args: &[ObjectId],
) -> Result<(), RuntimeError> {
    let (a, b) = operands(eval, receiver, args)?;
    eval.push_operand(ObjectId::boolean(a <= b))
}

pub fn number_ge(
    eval: &mut Evaluation,
    receiver: ObjectId,
    args: &[ObjectId],
) -> Result<(), RuntimeError> {
    let (a, b) = operands(eval, receiver, args)?;
    eval.push_operand(ObjectId::boolean(a >= b))
}

pub fn number_abs(
    eval: &mut Evaluation,
    receiver: ObjectId,
    _args: &[ObjectId],
) -> Result<(), RuntimeError> {
    let value = eval.number(receiver)?;
    push_number(eval, value.abs())
}
