use std::sync::Arc;

use ast::{Kind, NodeId};
use bytecode::{CodeBuilder, ObjectId};
use linker::Environment;
use log::{debug, info};

use crate::error::ExecutionError;
use crate::evaluation::{Evaluation, EvaluationSettings};
use crate::heap::{ContextId, Link};
use crate::natives::Natives;

/// Entry points over one linked environment.
///
/// The environment and the natives are shared by every evaluation the
/// interpreter creates; the evaluations themselves are independent.
#[derive(Debug, Clone)]
pub struct Interpreter {
    environment: Arc<Environment>,
    natives: Arc<Natives>,
    settings: EvaluationSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestFailure {
    /// Fully-qualified name of the test.
    pub name: String,
    pub error: ExecutionError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestReport {
    pub passed: usize,
    pub total: usize,
    pub failures: Vec<TestFailure>,
}

impl TestReport {
    pub fn is_success(&self) -> bool {
        self.passed == self.total
    }
}

impl Interpreter {
    pub fn new(environment: Environment) -> Self {
        Self {
            environment: Arc::new(environment),
            natives: Arc::new(Natives::lang()),
            settings: EvaluationSettings::default(),
        }
    }

    pub fn with_natives(mut self, natives: Natives) -> Self {
        self.natives = Arc::new(natives);
        self
    }

    pub fn with_settings(mut self, settings: EvaluationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn settings(&self) -> &EvaluationSettings {
        &self.settings
    }

    /// A fresh evaluation with every global initialized.
    pub fn evaluation(&self) -> Result<Evaluation, ExecutionError> {
        Evaluation::new(
            Arc::clone(&self.environment),
            Arc::clone(&self.natives),
            self.settings,
        )
    }

    fn entity(
        &self,
        fqn: &str,
        matches: impl Fn(&Kind<NodeId>) -> bool,
    ) -> Result<NodeId, ExecutionError> {
        self.environment
            .entity(fqn)
            .filter(|&id| matches(self.environment.kind(id)))
            .ok_or_else(|| ExecutionError::UnknownEntity(fqn.to_string()))
    }

    /// Runs a program in a fresh evaluation, which is returned for
    /// inspection.
    pub fn run_program(&self, fqn: &str) -> Result<Evaluation, ExecutionError> {
        let mut evaluation = self.evaluation()?;
        self.run_program_in(fqn, &mut evaluation)?;
        Ok(evaluation)
    }

    /// Runs a program's body in an existing evaluation and returns the
    /// value of its last sentence.
    pub fn run_program_in(
        &self,
        fqn: &str,
        evaluation: &mut Evaluation,
    ) -> Result<ObjectId, ExecutionError> {
        let program = self.entity(fqn, |kind| matches!(kind, Kind::Program { .. }))?;
        let Kind::Program { body, .. } = self.environment.kind(program) else {
            return Err(ExecutionError::UnknownEntity(fqn.to_string()));
        };
        info!("running program {fqn}");
        let code = evaluation.compiler().block(*body)?;
        let context = evaluation.new_context(Link::Context(ContextId::ROOT));
        evaluation.run_code(code, context)
    }

    /// Every test in declaration order: free tests and the tests of each
    /// describe.
    pub fn tests(&self) -> Vec<NodeId> {
        let env = &self.environment;
        env.descendants(env.root())
            .into_iter()
            .filter(|&id| matches!(env.kind(id), Kind::Test { .. }))
            .collect()
    }

    /// Runs one test against its own copy of `base`.
    pub fn run_test(&self, test: NodeId, base: &Evaluation) -> Result<ObjectId, ExecutionError> {
        let env = Arc::clone(&self.environment);
        let Kind::Test { body, .. } = env.kind(test) else {
            return Err(ExecutionError::UnknownEntity(env.fully_qualified_name(test)));
        };
        let mut evaluation = base.clone();
        let context = match env.parent_of(test) {
            Ok(describe) if matches!(env.kind(describe), Kind::Describe { .. }) => {
                let instance = self.describe_instance(describe, &mut evaluation)?;
                evaluation.new_context(Link::Object(instance))
            }
            _ => evaluation.new_context(Link::Context(ContextId::ROOT)),
        };
        let code = evaluation.compiler().block(*body)?;
        evaluation.run_code(code, context)
    }

    /// Instantiates a describe and runs its fixtures on the instance.
    fn describe_instance(
        &self,
        describe: NodeId,
        evaluation: &mut Evaluation,
    ) -> Result<ObjectId, ExecutionError> {
        let env = &self.environment;
        let mut b = CodeBuilder::new();
        b.instantiate(describe, None);
        b.init(0, describe, true);
        let instance = evaluation.run_code(b.finish(), ContextId::ROOT)?;
        for &member in env.kind(describe).members() {
            if let Kind::Fixture { body } = env.kind(member) {
                let code = evaluation.compiler().block(*body)?;
                let context = evaluation.new_context(Link::Object(instance));
                evaluation.run_code(code, context)?;
            }
        }
        Ok(instance)
    }

    /// Runs every test against an independent copy of one initialized
    /// evaluation, so no test observes another's effects.
    pub fn run_tests(&self) -> Result<TestReport, ExecutionError> {
        let base = self.evaluation()?;
        let mut report = TestReport::default();
        for test in self.tests() {
            let name = self.environment.fully_qualified_name(test);
            report.total += 1;
            match self.run_test(test, &base) {
                Ok(_) => {
                    debug!("test {name} passed");
                    report.passed += 1;
                }
                Err(error) => {
                    debug!("test {name} failed: {error}");
                    report.failures.push(TestFailure { name, error });
                }
            }
        }
        info!("{}/{} tests passed", report.passed, report.total);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use ast::build::*;

    use super::*;
    use crate::tests::environment;

    #[test]
    fn tests_are_found_in_declaration_order() {
        let env = environment(vec![package(
            "p",
            vec![
                test("free", vec![]),
                describe("group", vec![test("first", vec![]), test("second", vec![])]),
            ],
        )]);
        let interpreter = Interpreter::new(env);
        let names: Vec<String> = interpreter
            .tests()
            .into_iter()
            .map(|t| interpreter.environment().fully_qualified_name(t))
            .collect();
        assert_eq!(names, vec!["p.free", "p.group.first", "p.group.second"]);
    }

    #[test]
    fn unknown_program_is_reported() {
        let env = environment(vec![package("p", vec![class("main", vec![])])]);
        let interpreter = Interpreter::new(env);
        assert_eq!(
            interpreter.run_program("p.main").map(|_| ()),
            Err(ExecutionError::UnknownEntity("p.main".into()))
        );
    }
}
