#![allow(dead_code)]

use ast::Tree;
use ast::build::*;
use vm::{EvaluationSettings, ExecutionError, Interpreter, link_packages};

/// What a finished program leaves behind.
#[derive(Debug)]
pub struct Outcome {
    pub value: String,
    pub console: Vec<String>,
}

/// An interpreter over package `p` holding `members`.
pub fn interpreter(members: Vec<Tree>) -> Interpreter {
    match link_packages(vec![package("p", members)], true) {
        Ok(environment) => Interpreter::new(environment),
        Err(err) => panic!("link failed: {err}"),
    }
}

/// Runs `sentences` as the program `p.main`, declared next to `members`.
pub fn run(members: Vec<Tree>, sentences: Vec<Tree>) -> Result<Outcome, ExecutionError> {
    run_with(EvaluationSettings::default(), members, sentences)
}

pub fn run_with(
    settings: EvaluationSettings,
    mut members: Vec<Tree>,
    sentences: Vec<Tree>,
) -> Result<Outcome, ExecutionError> {
    members.push(program("main", sentences));
    let interpreter = interpreter(members).with_settings(settings);
    let mut evaluation = interpreter.evaluation()?;
    let value = interpreter.run_program_in("p.main", &mut evaluation)?;
    Ok(Outcome {
        value: evaluation.display(value),
        console: evaluation.console().to_vec(),
    })
}

/// Display form of the value `sentences` evaluate to.
pub fn value_of(members: Vec<Tree>, sentences: Vec<Tree>) -> String {
    match run(members, sentences) {
        Ok(outcome) => outcome.value,
        Err(err) => panic!("program failed: {err}"),
    }
}

pub fn println(value: Tree) -> Tree {
    send(reference("console"), "println", vec![value])
}
