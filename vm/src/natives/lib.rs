use bytecode::ObjectId;

use crate::error::RuntimeError;
use crate::evaluation::Evaluation;
use crate::lang::ASSERTION_EXCEPTION;
use crate::natives::arg;

pub fn console_println(
    eval: &mut Evaluation,
    _receiver: ObjectId,
    args: &[ObjectId],
) -> Result<(), RuntimeError> {
    let line = eval.display(arg(args, 0)?);
    eval.println(line);
    eval.push_operand(ObjectId::VOID)
}

fn fail(eval: &mut Evaluation, message: &str) -> Result<(), RuntimeError> {
    let exception = eval.new_exception(ASSERTION_EXCEPTION, message)?;
    Err(RuntimeError::Thrown(exception))
}

pub fn assert_that(
    eval: &mut Evaluation,
    _receiver: ObjectId,
    args: &[ObjectId],
) -> Result<(), RuntimeError> {
    if !eval.boolean(arg(args, 0)?)? {
        return fail(eval, "Value was not true");
    }
    eval.push_operand(ObjectId::VOID)
}

pub fn assert_not_that(
    eval: &mut Evaluation,
    _receiver: ObjectId,
    args: &[ObjectId],
) -> Result<(), RuntimeError> {
    if eval.boolean(arg(args, 0)?)? {
        return fail(eval, "Value was not false");
    }
    eval.push_operand(ObjectId::VOID)
}

/// Identity comparison: numbers and strings are interned, so equal values
/// are the same object.
pub fn assert_equals(
    eval: &mut Evaluation,
    _receiver: ObjectId,
    args: &[ObjectId],
) -> Result<(), RuntimeError> {
    let expected = arg(args, 0)?;
    let actual = arg(args, 1)?;
    if expected != actual {
        let message = format!(
            "Expected <{}> but got <{}>",
            eval.display(expected),
            eval.display(actual)
        );
        return fail(eval, &message);
    }
    eval.push_operand(ObjectId::VOID)
}
