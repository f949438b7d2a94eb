//! Translation of linked sentences into stack-machine code.
//!
//! Every expression leaves exactly one object on the operand stack, and so
//! does every other sentence (declarations and assignments push `void`).
//! Branches and protected blocks become nested instruction lists, each
//! ending in the interruption that hands its value back to the frame that
//! started it.
//!
//! Compilation is a pure function of the environment and the node, which is
//! what lets the evaluation cache method and constructor code.

use ast::{BaseCall, Kind, LiteralValue, NodeId};
use bytecode::{Code, CodeBuilder, Interruption, ObjectId, Primitive};
use linker::Environment;

use crate::error::CompileError;
use crate::lang::{NUMBER, STRING};

/// Local holding the exception inside a catch dispatcher.
pub const EXCEPTION_LOCAL: &str = "<exception>";
/// Local holding the pending value inside an always block.
pub const PREVIOUS_LOCAL: &str = "<previous_interruption>";

/// Compiles `sentences` as one block: the value of the last one is left on
/// the stack.
pub fn compile(environment: &Environment, sentences: &[NodeId]) -> Result<Code, CompileError> {
    let compiler = Compiler::new(environment);
    let mut b = CodeBuilder::new();
    compiler.sentences(&mut b, sentences)?;
    Ok(b.finish())
}

pub struct Compiler<'e> {
    environment: &'e Environment,
}

impl<'e> Compiler<'e> {
    pub fn new(environment: &'e Environment) -> Self {
        Self { environment }
    }

    fn module(&self, fqn: &str) -> Result<NodeId, CompileError> {
        self.environment
            .entity(fqn)
            .ok_or_else(|| CompileError::MissingModule(fqn.to_string()))
    }

    fn target(&self, reference: NodeId) -> Result<NodeId, CompileError> {
        self.environment.target(reference).ok_or_else(|| {
            let name = self.environment.name(reference).unwrap_or_default();
            CompileError::Unlinked(name.to_string())
        })
    }

    fn sentences_of(&self, body: NodeId) -> &'e [NodeId] {
        match self.environment.kind(body) {
            Kind::Body { sentences } => sentences,
            _ => &[],
        }
    }

    /// Code of a program, test or fixture body.
    pub fn block(&self, body: NodeId) -> Result<Code, CompileError> {
        let mut b = CodeBuilder::new();
        self.body(&mut b, body)?;
        Ok(b.finish())
    }

    /// Module initialization: every named singleton (already allocated and
    /// bound under its qualified name) is initialized, then package
    /// variables are evaluated in order.
    pub fn globals(&self, singletons: &[NodeId], variables: &[NodeId]) -> Result<Code, CompileError> {
        let env = self.environment;
        let mut b = CodeBuilder::new();
        for &singleton in singletons {
            let args: &[NodeId] = match env.kind(singleton) {
                Kind::Singleton { supercall_args, .. } => supercall_args,
                _ => &[],
            };
            for &arg in args {
                self.expression(&mut b, arg)?;
            }
            b.load(&env.fully_qualified_name(singleton));
            b.init(args.len(), singleton, true);
            b.pop();
        }
        for &variable in variables {
            if let Kind::Variable { value, .. } = env.kind(variable) {
                match value {
                    Some(value) => self.expression(&mut b, *value)?,
                    None => b.push(ObjectId::NULL),
                }
                b.store(&env.fully_qualified_name(variable), false);
            }
        }
        b.push(ObjectId::VOID);
        Ok(b.finish())
    }

    /// Body of a user method, falling through to a `void` return.
    pub fn method(&self, method: NodeId) -> Result<Code, CompileError> {
        let Kind::Method {
            body: Some(body), ..
        } = self.environment.kind(method)
        else {
            return Err(CompileError::NoBody(self.method_name(method)));
        };
        let mut b = CodeBuilder::new();
        self.body(&mut b, *body)?;
        b.push(ObjectId::VOID);
        b.interrupt(Interruption::Return);
        Ok(b.finish())
    }

    pub fn method_name(&self, method: NodeId) -> String {
        let env = self.environment;
        let own = env.name(method).unwrap_or_default();
        match env.parent_of(method) {
            Ok(owner) => format!("{}.{own}", env.fully_qualified_name(owner)),
            Err(_) => own.to_string(),
        }
    }

    /// Fields an `Init` with field initialization sets up. Describes also
    /// carry their variables as instance state.
    pub fn initialized_fields(&self, module: NodeId) -> Vec<NodeId> {
        let env = self.environment;
        let mut fields = env.fields_of(module);
        if let Kind::Describe { members, .. } = env.kind(module) {
            fields.extend(
                members
                    .iter()
                    .copied()
                    .filter(|&m| matches!(env.kind(m), Kind::Variable { .. })),
            );
        }
        fields
    }

    /// Construction protocol run by `Init`: field initializers, then the
    /// chained super constructor, then the constructor body. Ends returning
    /// the receiver.
    pub fn init(
        &self,
        lookup_start: NodeId,
        constructor: Option<NodeId>,
        init_fields: bool,
    ) -> Result<Code, CompileError> {
        let env = self.environment;
        let mut b = CodeBuilder::new();
        if init_fields {
            for field in self.initialized_fields(lookup_start) {
                let (Kind::Field { name, value, .. } | Kind::Variable { name, value, .. }) =
                    env.kind(field)
                else {
                    continue;
                };
                b.load("self");
                match value {
                    Some(value) => self.expression(&mut b, *value)?,
                    None => b.push(ObjectId::NULL),
                }
                b.set(name);
            }
        }
        if let Some(constructor) = constructor {
            let Kind::Constructor {
                base_call, body, ..
            } = env.kind(constructor)
            else {
                return Err(CompileError::NoBody(format!("constructor {constructor}")));
            };
            let owner = env
                .parent_of(constructor)
                .map_err(|_| CompileError::NoBody(format!("constructor {constructor}")))?;
            match base_call {
                Some(BaseCall { calls_super, args }) => {
                    let start = if *calls_super {
                        env.superclass(owner).ok_or_else(|| {
                            CompileError::NoSuperclass(env.fully_qualified_name(owner))
                        })?
                    } else {
                        owner
                    };
                    for &arg in args {
                        self.expression(&mut b, arg)?;
                    }
                    b.load("self");
                    b.init(args.len(), start, false);
                    b.pop();
                }
                None => {
                    if let Some(superclass) = env.superclass(owner) {
                        b.load("self");
                        b.init(0, superclass, false);
                        b.pop();
                    }
                }
            }
            self.body(&mut b, *body)?;
            b.pop();
        }
        b.load("self");
        b.interrupt(Interruption::Return);
        Ok(b.finish())
    }

    fn body(&self, b: &mut CodeBuilder, body: NodeId) -> Result<(), CompileError> {
        self.sentences(b, self.sentences_of(body))
    }

    fn sentences(&self, b: &mut CodeBuilder, sentences: &[NodeId]) -> Result<(), CompileError> {
        if sentences.is_empty() {
            b.push(ObjectId::VOID);
        }
        for (i, &sentence) in sentences.iter().enumerate() {
            if i > 0 {
                b.pop();
            }
            self.sentence(b, sentence)?;
        }
        Ok(())
    }

    /// Branch code: the body, handing its value back as a `result`.
    fn branch(&self, body: Option<NodeId>) -> Result<Code, CompileError> {
        let mut b = CodeBuilder::new();
        match body {
            Some(body) => self.body(&mut b, body)?,
            None => b.push(ObjectId::VOID),
        }
        b.interrupt(Interruption::Result);
        Ok(b.finish())
    }

    fn sentence(&self, b: &mut CodeBuilder, id: NodeId) -> Result<(), CompileError> {
        let env = self.environment;
        match env.kind(id) {
            Kind::Variable { name, value, .. } => {
                match value {
                    Some(value) => self.expression(b, *value)?,
                    None => b.push(ObjectId::NULL),
                }
                b.store(name, false);
                b.push(ObjectId::VOID);
            }
            Kind::Assignment { variable, value } => {
                self.expression(b, *value)?;
                let target = self.target(*variable)?;
                let name = match self.global_name(target) {
                    Some(fqn) => fqn,
                    None => env.name(*variable).unwrap_or_default().to_string(),
                };
                b.store(&name, true);
                b.push(ObjectId::VOID);
            }
            Kind::Return { value } => {
                match value {
                    Some(value) => self.expression(b, *value)?,
                    None => b.push(ObjectId::VOID),
                }
                b.interrupt(Interruption::Return);
            }
            Kind::Throw { exception } => {
                self.expression(b, *exception)?;
                b.interrupt(Interruption::Exception);
            }
            _ => self.expression(b, id)?,
        }
        Ok(())
    }

    /// Name under which a global lives in the root context.
    fn global_name(&self, target: NodeId) -> Option<String> {
        let env = self.environment;
        let global = match env.kind(target) {
            Kind::Singleton { name: Some(_), .. } => true,
            Kind::Variable { .. } => env
                .parent_of(target)
                .is_ok_and(|parent| matches!(env.kind(parent), Kind::Package { .. })),
            _ => false,
        };
        global.then(|| env.fully_qualified_name(target))
    }

    fn expression(&self, b: &mut CodeBuilder, id: NodeId) -> Result<(), CompileError> {
        let env = self.environment;
        match env.kind(id) {
            Kind::Reference { name, .. } => {
                let target = self.target(id)?;
                if let Some(fqn) = self.global_name(target) {
                    b.load(&fqn);
                    return Ok(());
                }
                match env.kind(target) {
                    Kind::Variable { name, .. }
                    | Kind::Field { name, .. }
                    | Kind::Parameter { name, .. } => b.load(name),
                    _ => return Err(CompileError::NotAValue(name.clone())),
                }
            }
            Kind::SelfRef => b.load("self"),
            Kind::Literal { value } => self.literal(b, value)?,
            Kind::Send {
                receiver,
                message,
                args,
            } => {
                self.expression(b, *receiver)?;
                for &arg in args {
                    self.expression(b, arg)?;
                }
                b.call(message, args.len(), None);
            }
            Kind::Super { args } => {
                let method = env
                    .enclosing_method(id)
                    .ok_or(CompileError::SuperOutsideMethod(id))?;
                let owner = env
                    .parent_of(method)
                    .map_err(|_| CompileError::SuperOutsideMethod(id))?;
                let message = env.name(method).unwrap_or_default();
                b.load("self");
                for &arg in args {
                    self.expression(b, arg)?;
                }
                b.call(message, args.len(), Some(owner));
            }
            Kind::New { instantiated, args } => {
                let module = self.target(*instantiated)?;
                let named: Vec<(&str, NodeId)> = args
                    .iter()
                    .filter_map(|&arg| match env.kind(arg) {
                        Kind::NamedArgument { name, value } => Some((name.as_str(), *value)),
                        _ => None,
                    })
                    .collect();
                if named.is_empty() {
                    for &arg in args {
                        self.expression(b, arg)?;
                    }
                    b.instantiate(module, None);
                    b.init(args.len(), module, true);
                } else {
                    b.instantiate(module, None);
                    b.init(0, module, true);
                    for (name, value) in named {
                        b.dup();
                        self.expression(b, value)?;
                        b.set(name);
                    }
                    b.dup();
                    b.call("initialize", 0, None);
                    b.pop();
                }
            }
            Kind::If {
                condition,
                then_body,
                else_body,
            } => {
                self.expression(b, *condition)?;
                let then_branch = self.branch(Some(*then_body))?;
                let else_branch = self.branch(*else_body)?;
                b.if_then_else(then_branch, else_branch);
            }
            Kind::Try {
                body,
                catches,
                always,
            } => {
                let body = self.branch(Some(*body))?;
                let catch = self.catches(catches)?;
                let always = self.always(*always)?;
                b.try_catch_always(body, catch, always);
            }
            kind => {
                return Err(CompileError::NotAnExpression {
                    kind: kind.kind_name(),
                    node: id,
                });
            }
        }
        Ok(())
    }

    fn literal(&self, b: &mut CodeBuilder, value: &LiteralValue<NodeId>) -> Result<(), CompileError> {
        match value {
            LiteralValue::Null => b.push(ObjectId::NULL),
            LiteralValue::Boolean(value) => b.push(ObjectId::boolean(*value)),
            LiteralValue::Number(value) => {
                b.instantiate(self.module(NUMBER)?, Some(Primitive::Number(*value)))
            }
            LiteralValue::String(value) => b.instantiate(
                self.module(STRING)?,
                Some(Primitive::String(value.clone())),
            ),
            LiteralValue::Collection { module, elements } => {
                let module = self.target(*module)?;
                for &element in elements {
                    self.expression(b, element)?;
                }
                b.instantiate(module, Some(Primitive::Collection(elements.len())));
            }
            LiteralValue::Singleton(singleton) => {
                let args: &[NodeId] = match self.environment.kind(*singleton) {
                    Kind::Singleton { supercall_args, .. } => supercall_args,
                    _ => &[],
                };
                for &arg in args {
                    self.expression(b, arg)?;
                }
                b.instantiate(*singleton, None);
                b.init(args.len(), *singleton, true);
            }
        }
        Ok(())
    }

    /// Catch dispatcher: the exception arrives on the stack. Each handler
    /// is guarded by a type test; an unmatched exception is thrown again.
    fn catches(&self, catches: &[NodeId]) -> Result<Code, CompileError> {
        let env = self.environment;
        let mut b = CodeBuilder::new();
        b.store(EXCEPTION_LOCAL, false);
        for &catch in catches {
            let Kind::Catch {
                parameter,
                parameter_type,
                body,
            } = env.kind(catch)
            else {
                continue;
            };
            let guard = match parameter_type {
                Some(reference) => {
                    b.load(EXCEPTION_LOCAL);
                    b.inherits(self.target(*reference)?);
                    Some(b.conditional_jump())
                }
                None => None,
            };
            b.load(EXCEPTION_LOCAL);
            b.store(env.name(*parameter).unwrap_or_default(), false);
            self.body(&mut b, *body)?;
            b.interrupt(Interruption::Result);
            if let Some(label) = guard {
                b.bind(label);
            }
        }
        b.load(EXCEPTION_LOCAL);
        b.interrupt(Interruption::Exception);
        Ok(b.finish())
    }

    /// Always block: runs with the pending value on the stack, then raises
    /// the same interruption again.
    fn always(&self, always: Option<NodeId>) -> Result<Code, CompileError> {
        let mut b = CodeBuilder::new();
        b.store(PREVIOUS_LOCAL, false);
        match always {
            Some(body) => self.body(&mut b, body)?,
            None => b.push(ObjectId::VOID),
        }
        b.pop();
        b.load(PREVIOUS_LOCAL);
        b.resume_interruption();
        Ok(b.finish())
    }
}

#[cfg(test)]
mod tests {
    use ast::build::*;
    use bytecode::Instruction;

    use super::*;
    use crate::tests::environment;

    fn program_body(env: &Environment, fqn: &str) -> NodeId {
        let Some(program) = env.entity(fqn) else {
            panic!("no program {fqn}");
        };
        match env.kind(program) {
            Kind::Program { body, .. } => *body,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn sentences_leave_one_value() {
        let env = environment(vec![package(
            "p",
            vec![program(
                "main",
                vec![var("x", number(1.0)), assign("x", number(2.0)), reference("x")],
            )],
        )]);
        let code = Compiler::new(&env)
            .block(program_body(&env, "p.main"))
            .unwrap();
        let number = env.entity(NUMBER).unwrap();
        assert_eq!(
            code.to_vec(),
            vec![
                Instruction::Instantiate {
                    module: number,
                    value: Some(Primitive::Number(1.0))
                },
                Instruction::Store {
                    name: "x".into(),
                    lookup: false
                },
                Instruction::Push(ObjectId::VOID),
                Instruction::Pop,
                Instruction::Instantiate {
                    module: number,
                    value: Some(Primitive::Number(2.0))
                },
                Instruction::Store {
                    name: "x".into(),
                    lookup: true
                },
                Instruction::Push(ObjectId::VOID),
                Instruction::Pop,
                Instruction::Load("x".into()),
            ]
        );
    }

    #[test]
    fn globals_load_by_qualified_name() {
        let env = environment(vec![package(
            "p",
            vec![
                singleton("pepita", vec![]),
                var("count", number(0.0)),
                program("main", vec![reference("pepita"), assign("count", null())]),
            ],
        )]);
        let code = Compiler::new(&env)
            .block(program_body(&env, "p.main"))
            .unwrap();
        assert_eq!(code[0], Instruction::Load("p.pepita".into()));
        assert_eq!(
            code[3],
            Instruction::Store {
                name: "p.count".into(),
                lookup: true
            }
        );
    }

    #[test]
    fn empty_body_is_void() {
        let env = environment(vec![package("p", vec![program("main", vec![])])]);
        let code = Compiler::new(&env)
            .block(program_body(&env, "p.main"))
            .unwrap();
        assert_eq!(code.to_vec(), vec![Instruction::Push(ObjectId::VOID)]);
    }

    #[test]
    fn methods_fall_through_to_void_return() {
        let env = environment(vec![package(
            "p",
            vec![class("A", vec![method("m", &[], vec![null()])])],
        )]);
        let class = env.entity("p.A").unwrap();
        let method = env.lookup_method(class, "m", 0).unwrap();
        let code = Compiler::new(&env).method(method).unwrap();
        assert_eq!(
            code.to_vec(),
            vec![
                Instruction::Push(ObjectId::NULL),
                Instruction::Push(ObjectId::VOID),
                Instruction::Interrupt(Interruption::Return),
            ]
        );
    }

    #[test]
    fn abstract_methods_have_no_code() {
        let env = environment(vec![package(
            "p",
            vec![class("A", vec![abstract_method("m", &[])])],
        )]);
        let class = env.entity("p.A").unwrap();
        let method = env.kind(class).members()[0];
        assert_eq!(
            Compiler::new(&env).method(method),
            Err(CompileError::NoBody("p.A.m".into()))
        );
    }

    #[test]
    fn super_starts_lookup_after_owner() {
        let env = environment(vec![package(
            "p",
            vec![
                class("A", vec![method("m", &[], vec![null()])]),
                class("B", vec![method("m", &[], vec![super_call(vec![])])]).inherits("A"),
            ],
        )]);
        let b_class = env.entity("p.B").unwrap();
        let method = env.lookup_method(b_class, "m", 0).unwrap();
        let code = Compiler::new(&env).method(method).unwrap();
        assert_eq!(code[0], Instruction::Load("self".into()));
        assert_eq!(
            code[1],
            Instruction::Call {
                message: "m".into(),
                arity: 0,
                lookup_start: Some(b_class)
            }
        );
    }

    #[test]
    fn named_new_patches_fields() {
        let env = environment(vec![package(
            "p",
            vec![
                class("A", vec![bare_field("x")]),
                program("main", vec![new_named("A", vec![("x", null())])]),
            ],
        )]);
        let class = env.entity("p.A").unwrap();
        let code = Compiler::new(&env)
            .block(program_body(&env, "p.main"))
            .unwrap();
        assert_eq!(
            code.to_vec(),
            vec![
                Instruction::Instantiate {
                    module: class,
                    value: None
                },
                Instruction::Init {
                    arity: 0,
                    lookup_start: class,
                    init_fields: true
                },
                Instruction::Dup,
                Instruction::Push(ObjectId::NULL),
                Instruction::Set("x".into()),
                Instruction::Dup,
                Instruction::Call {
                    message: "initialize".into(),
                    arity: 0,
                    lookup_start: None
                },
                Instruction::Pop,
            ]
        );
    }

    #[test]
    fn catch_chain_guards_each_handler() {
        let env = environment(vec![package(
            "p",
            vec![
                class("E", vec![]).inherits("wollok.lang.Exception"),
                program(
                    "main",
                    vec![try_catch(
                        vec![throw(new("E", vec![]))],
                        vec![catch("e", "E", vec![reference("e")])],
                    )],
                ),
            ],
        )]);
        let e_class = env.entity("p.E").unwrap();
        let code = Compiler::new(&env)
            .block(program_body(&env, "p.main"))
            .unwrap();
        let Instruction::TryCatchAlways { catch, always, .. } = &code[0] else {
            panic!("expected a try, got {:?}", code[0]);
        };
        assert_eq!(
            catch.to_vec(),
            vec![
                Instruction::Store {
                    name: EXCEPTION_LOCAL.into(),
                    lookup: false
                },
                Instruction::Load(EXCEPTION_LOCAL.into()),
                Instruction::Inherits(e_class),
                Instruction::ConditionalJump(4),
                Instruction::Load(EXCEPTION_LOCAL.into()),
                Instruction::Store {
                    name: "e".into(),
                    lookup: false
                },
                Instruction::Load("e".into()),
                Instruction::Interrupt(Interruption::Result),
                Instruction::Load(EXCEPTION_LOCAL.into()),
                Instruction::Interrupt(Interruption::Exception),
            ]
        );
        assert_eq!(always.last(), Some(&Instruction::ResumeInterruption));
    }

    #[test]
    fn compilation_is_deterministic() {
        let env = environment(vec![package(
            "p",
            vec![program(
                "main",
                vec![if_else(boolean(true), vec![number(1.0)], vec![string("no")])],
            )],
        )]);
        let body = program_body(&env, "p.main");
        let sentences = match env.kind(body) {
            Kind::Body { sentences } => sentences.clone(),
            _ => unreachable!(),
        };
        assert_eq!(compile(&env, &sentences), compile(&env, &sentences));
    }

    #[test]
    fn classes_are_not_values() {
        let env = environment(vec![package(
            "p",
            vec![class("A", vec![]), program("main", vec![reference("A")])],
        )]);
        let result = Compiler::new(&env).block(program_body(&env, "p.main"));
        assert_eq!(result, Err(CompileError::NotAValue("A".into())));
    }
}
