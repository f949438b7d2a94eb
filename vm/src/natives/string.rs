use bytecode::ObjectId;

use crate::error::RuntimeError;
use crate::evaluation::Evaluation;
use crate::natives::arg;

/// `"a" + x` concatenates the display form of any `x`.
pub fn string_concat(
    eval: &mut Evaluation,
    receiver: ObjectId,
    args: &[ObjectId],
) -> Result<(), RuntimeError> {
    let mut text = eval.string(receiver)?.to_string();
    text.push_str(&eval.display(arg(args, 0)?));
    let id = eval.new_string(&text);
    eval.push_operand(id)
}

pub fn string_size(
    eval: &mut Evaluation,
    receiver: ObjectId,
    _args: &[ObjectId],
) -> Result<(), RuntimeError> {
    let size = eval.string(receiver)?.chars().count();
    let id = eval.new_number(size as f64);
    eval.push_operand(id)
}

pub fn string_to_upper_case(
    eval: &mut Evaluation,
    receiver: ObjectId,
    _args: &[ObjectId],
) -> Result<(), RuntimeError> {
    let upper = eval.string(receiver)?.to_uppercase();
    let id = eval.new_string(&upper);
    eval.push_operand(id)
}
