//! The evaluation engine: heap, frame stack and instruction dispatch.
//!
//! `return`, thrown exceptions and the completion of nested blocks are all
//! one mechanism. A frame lists the interruption kinds it resumes; raising
//! one pops the raising frame, then keeps popping until a frame that
//! resumes that kind is on top, and hands it the carried value.
//!
//! Host faults raised while executing an instruction never escape a running
//! program. They become `wollok.lang.EvaluationError` exceptions, subject to
//! ordinary `try`/`catch`.

use std::collections::HashMap;
use std::sync::Arc;

use ast::{Kind, NodeId};
use bytecode::{Code, Instruction, Interruption, ObjectId, Primitive};
use linker::Environment;
use log::{debug, trace, warn};
use parking_lot::RwLock;

use crate::compiler::Compiler;
use crate::error::{CompileError, ExecutionError, RuntimeError};
use crate::frame::Frame;
use crate::heap::{ContextId, Heap, Inner, Link, WellKnown};
use crate::lang;
use crate::natives::Natives;

pub const MAX_FRAMES: usize = 1024;

#[derive(Debug, Clone, Copy)]
pub struct EvaluationSettings {
    /// Frame-stack limit. Going past it raises an evaluation error inside
    /// the program.
    pub max_frames: usize,
    /// Also print `console.println` output to stdout.
    pub echo_console: bool,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            max_frames: MAX_FRAMES,
            echo_console: false,
        }
    }
}

/// Library modules the engine itself instantiates.
#[derive(Debug, Clone, Copy)]
pub struct CoreModules {
    pub object: NodeId,
    pub boolean: NodeId,
    pub number: NodeId,
    pub string: NodeId,
    pub list: NodeId,
    pub evaluation_error: NodeId,
}

impl CoreModules {
    pub fn resolve(environment: &Environment) -> Result<Self, ExecutionError> {
        let find = |fqn: &str| {
            environment
                .entity(fqn)
                .ok_or_else(|| ExecutionError::UnknownEntity(fqn.to_string()))
        };
        Ok(Self {
            object: find(lang::OBJECT)?,
            boolean: find(lang::BOOLEAN)?,
            number: find(lang::NUMBER)?,
            string: find(lang::STRING)?,
            list: find(lang::LIST)?,
            evaluation_error: find(lang::EVALUATION_ERROR)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum CodeKey {
    Method(NodeId),
    Init {
        lookup_start: NodeId,
        constructor: Option<NodeId>,
        init_fields: bool,
    },
}

enum Flow {
    Continue,
    Interrupt(Interruption, ObjectId),
}

/// One running program.
///
/// Cloning an evaluation deep-copies its heap and frame stack, so the copy
/// can run without observing or disturbing the original. The compiled-code
/// cache is shared: code depends only on the environment.
#[derive(Clone)]
pub struct Evaluation {
    environment: Arc<Environment>,
    natives: Arc<Natives>,
    settings: EvaluationSettings,
    core: CoreModules,
    heap: Heap,
    frames: Vec<Frame>,
    code_cache: Arc<RwLock<HashMap<CodeKey, Code>>>,
    console: Vec<String>,
}

impl std::fmt::Debug for Evaluation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluation")
            .field("objects", &self.heap.len())
            .field("frames", &self.frames.len())
            .field("settings", &self.settings)
            .finish()
    }
}

impl Evaluation {
    /// Creates an evaluation with every global initialized: named
    /// singletons are instantiated, then initialized, then package
    /// variables are evaluated in declaration order.
    pub fn new(
        environment: Arc<Environment>,
        natives: Arc<Natives>,
        settings: EvaluationSettings,
    ) -> Result<Self, ExecutionError> {
        let core = CoreModules::resolve(&environment)?;
        let heap = Heap::new(WellKnown {
            null: core.object,
            boolean: core.boolean,
            void: core.object,
        });
        let mut evaluation = Self {
            environment,
            natives,
            settings,
            core,
            heap,
            frames: Vec::new(),
            code_cache: Arc::new(RwLock::new(HashMap::new())),
            console: Vec::new(),
        };
        evaluation.initialize_globals()?;
        Ok(evaluation)
    }

    fn initialize_globals(&mut self) -> Result<(), ExecutionError> {
        let env = Arc::clone(&self.environment);
        let mut singletons = Vec::new();
        let mut variables = Vec::new();
        for id in env.descendants(env.root()) {
            let in_package = env
                .parent_of(id)
                .is_ok_and(|parent| matches!(env.kind(parent), Kind::Package { .. }));
            if !in_package {
                continue;
            }
            match env.kind(id) {
                Kind::Singleton { name: Some(_), .. } => singletons.push(id),
                Kind::Variable { .. } => variables.push(id),
                _ => {}
            }
        }
        debug!(
            "initializing {} singletons and {} variables",
            singletons.len(),
            variables.len()
        );
        for &singleton in &singletons {
            let id = self.heap.allocate(singleton, None, ContextId::ROOT, true);
            let fqn = env.fully_qualified_name(singleton);
            self.heap.declare(ContextId::ROOT, &fqn, id);
        }
        let code = Compiler::new(&env).globals(&singletons, &variables)?;
        self.run_code(code, ContextId::ROOT)?;
        Ok(())
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn natives(&self) -> &Natives {
        &self.natives
    }

    pub fn settings(&self) -> &EvaluationSettings {
        &self.settings
    }

    pub fn core(&self) -> &CoreModules {
        &self.core
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Lines printed through `console.println`.
    pub fn console(&self) -> &[String] {
        &self.console
    }

    pub fn println(&mut self, line: String) {
        if self.settings.echo_console {
            println!("{line}");
        }
        self.console.push(line);
    }

    /// Global bound to a fully-qualified name.
    pub fn global(&self, fqn: &str) -> Option<ObjectId> {
        self.heap.lookup(ContextId::ROOT, fqn)
    }

    pub fn new_context(&mut self, parent: Link) -> ContextId {
        self.heap.new_context(parent)
    }

    pub fn compiler(&self) -> Compiler<'_> {
        Compiler::new(&self.environment)
    }

    // Frames

    fn frame(&mut self) -> Result<&mut Frame, RuntimeError> {
        self.frames.last_mut().ok_or(RuntimeError::NoActiveFrame)
    }

    fn push_frame(&mut self, frame: Frame) -> Result<(), RuntimeError> {
        if self.frames.len() >= self.settings.max_frames {
            return Err(RuntimeError::StackOverflow(self.settings.max_frames));
        }
        trace!(
            "push frame {} ({} instructions)",
            self.frames.len(),
            frame.code.len()
        );
        self.frames.push(frame);
        Ok(())
    }

    pub fn push_operand(&mut self, value: ObjectId) -> Result<(), RuntimeError> {
        self.frame()?.push(value);
        Ok(())
    }

    /// Runs `code` in a new frame whose `return` lands in the current one.
    /// Natives use this to call back into the program.
    pub fn push_returning_frame(
        &mut self,
        code: Code,
        context: ContextId,
    ) -> Result<(), RuntimeError> {
        self.frame()?.resume.push(Interruption::Return);
        self.push_frame(Frame::new(code, context))
    }

    // Driver

    /// Executes exactly one instruction of the top frame. A frame whose
    /// instructions are exhausted is popped instead.
    pub fn step(&mut self) -> Result<(), ExecutionError> {
        let frame = self.frame()?;
        let code = Arc::clone(&frame.code);
        let Some(instruction) = code.get(frame.pc) else {
            self.frames.pop();
            return Ok(());
        };
        frame.pc += 1;
        trace!("{:>3} {instruction}", self.frames.len());
        match self.execute(instruction) {
            Ok(Flow::Continue) => Ok(()),
            Ok(Flow::Interrupt(kind, value)) => self.interrupt(kind, value),
            Err(error) => self.raise(error),
        }
    }

    /// Steps until the frame stack is empty.
    pub fn step_all(&mut self) -> Result<(), ExecutionError> {
        while !self.frames.is_empty() {
            self.step()?;
        }
        Ok(())
    }

    /// Runs `code` to completion in `context` and returns the value it
    /// leaves, or the value of a top-level `return`.
    pub fn run_code(
        &mut self,
        code: Code,
        context: ContextId,
    ) -> Result<ObjectId, ExecutionError> {
        let base = self.frames.len();
        let mut body = code.to_vec();
        body.push(Instruction::Interrupt(Interruption::Result));
        let holder = Frame::new(Vec::new().into(), context)
            .resuming(&[Interruption::Result, Interruption::Return]);
        self.push_frame(holder)?;
        self.push_frame(Frame::new(body.into(), context))?;
        while self.frames.len() > base + 1 {
            self.step()?;
        }
        let mut holder = self.frames.pop().ok_or(RuntimeError::NoActiveFrame)?;
        Ok(holder.pop()?)
    }

    fn interrupt(&mut self, kind: Interruption, value: ObjectId) -> Result<(), ExecutionError> {
        trace!("interrupt {kind} with {value}");
        self.frames.pop();
        while let Some(frame) = self.frames.last_mut() {
            if frame.receive(kind) {
                frame.push(value);
                return Ok(());
            }
            self.frames.pop();
        }
        match kind {
            Interruption::Exception => {
                let module = self.class_name(value);
                let message = self.exception_message(value);
                warn!("unhandled {module}: {message}");
                Err(ExecutionError::UnhandledException { module, message })
            }
            kind => Err(ExecutionError::UnhandledInterruption(kind)),
        }
    }

    fn raise(&mut self, error: RuntimeError) -> Result<(), ExecutionError> {
        let exception = match error {
            RuntimeError::Thrown(exception) => exception,
            error => {
                debug!("evaluation error: {error}");
                let message = error.to_string();
                self.new_instance_with_message(self.core.evaluation_error, &message)?
            }
        };
        self.interrupt(Interruption::Exception, exception)
    }

    // Instructions

    fn execute(&mut self, instruction: &Instruction) -> Result<Flow, RuntimeError> {
        match instruction {
            Instruction::Load(name) => {
                let context = self.frame()?.context;
                let value = self
                    .heap
                    .lookup(context, name)
                    .ok_or_else(|| RuntimeError::UnknownName(name.clone()))?;
                self.push_operand(value)?;
            }
            Instruction::Store { name, lookup } => {
                let frame = self.frame()?;
                let value = frame.pop()?;
                let context = frame.context;
                if *lookup {
                    if !self.heap.assign(context, name, value) {
                        return Err(RuntimeError::UnknownName(name.clone()));
                    }
                } else {
                    self.heap.declare(context, name, value);
                }
            }
            Instruction::Push(id) => self.push_operand(*id)?,
            Instruction::Pop => {
                self.frame()?.pop()?;
            }
            Instruction::Dup => {
                let frame = self.frame()?;
                let top = frame.peek()?;
                frame.push(top);
            }
            Instruction::Swap => {
                let frame = self.frame()?;
                let a = frame.pop()?;
                let b = frame.pop()?;
                frame.push(a);
                frame.push(b);
            }
            Instruction::Get(field) => {
                let receiver = self.frame()?.pop()?;
                let value = self.field(receiver, field)?;
                self.push_operand(value)?;
            }
            Instruction::Set(field) => {
                let frame = self.frame()?;
                let value = frame.pop()?;
                let receiver = frame.pop()?;
                self.set_field(receiver, field, value)?;
            }
            Instruction::Instantiate { module, value } => {
                let id = self.instantiate(*module, value.as_ref())?;
                self.push_operand(id)?;
            }
            Instruction::Init {
                arity,
                lookup_start,
                init_fields,
            } => {
                let frame = self.frame()?;
                let receiver = frame.pop()?;
                let args = frame.pop_n(*arity)?;
                self.init(receiver, *lookup_start, args, *init_fields)?;
            }
            Instruction::Call {
                message,
                arity,
                lookup_start,
            } => {
                let frame = self.frame()?;
                let args = frame.pop_n(*arity)?;
                let receiver = frame.pop()?;
                self.dispatch(receiver, message, args, *lookup_start)?;
            }
            Instruction::Inherits(module) => {
                let value = self.frame()?.pop()?;
                let own = self.heap.object(value)?.module;
                let inherits = self.environment.inherits(own, *module);
                self.push_operand(ObjectId::boolean(inherits))?;
            }
            Instruction::ConditionalJump(count) => {
                let frame = self.frame()?;
                let condition = frame.pop()?;
                if !self.truth(condition)? {
                    self.frame()?.pc += count;
                }
            }
            Instruction::IfThenElse {
                then_branch,
                else_branch,
            } => {
                let condition = self.frame()?.pop()?;
                let branch = if self.truth(condition)? {
                    then_branch
                } else {
                    else_branch
                };
                let frame = self.frame()?;
                frame.resume.push(Interruption::Result);
                let parent = frame.context;
                let context = self.heap.new_context(Link::Context(parent));
                self.push_frame(Frame::new(branch.clone(), context))?;
            }
            Instruction::TryCatchAlways {
                body,
                catch,
                always,
            } => {
                let frame = self.frame()?;
                frame.resume.push(Interruption::Result);
                let parent = frame.context;
                let all = Interruption::ALL;
                let exception = [Interruption::Exception];
                let blocks: [(&Code, &[Interruption]); 3] =
                    [(always, &all), (catch, &exception), (body, &[])];
                for (code, resume) in blocks {
                    let context = self.heap.new_context(Link::Context(parent));
                    self.push_frame(Frame::new(code.clone(), context).resuming(resume))?;
                }
            }
            Instruction::Interrupt(kind) => {
                let value = self.frame()?.pop()?;
                return Ok(Flow::Interrupt(*kind, value));
            }
            Instruction::ResumeInterruption => {
                let frame = self.frame()?;
                let kind = frame.pending_interruption()?;
                let value = frame.pop()?;
                return Ok(Flow::Interrupt(kind, value));
            }
        }
        Ok(Flow::Continue)
    }

    fn truth(&self, value: ObjectId) -> Result<bool, RuntimeError> {
        match value {
            ObjectId::TRUE => Ok(true),
            ObjectId::FALSE => Ok(false),
            other => Err(RuntimeError::TypeError {
                expected: "Boolean",
                got: self.display(other),
            }),
        }
    }

    fn instantiate(
        &mut self,
        module: NodeId,
        value: Option<&Primitive>,
    ) -> Result<ObjectId, RuntimeError> {
        let env = Arc::clone(&self.environment);
        Ok(match value {
            Some(Primitive::Number(n)) => self.heap.number(*n, module),
            Some(Primitive::String(s)) => self.heap.string(s, module),
            Some(Primitive::Collection(count)) => {
                let elements = self.frame()?.pop_n(*count)?;
                let inner = Some(Inner::Collection(elements));
                self.heap.allocate(module, inner, ContextId::ROOT, true)
            }
            None => match env.kind(module) {
                Kind::Singleton {
                    name: None,
                    closure,
                    ..
                } => {
                    let closure = *closure;
                    let context = self.frame()?.context;
                    self.heap.allocate(module, None, context, !closure)
                }
                _ => self.heap.allocate(module, None, ContextId::ROOT, true),
            },
        })
    }

    fn init(
        &mut self,
        receiver: ObjectId,
        lookup_start: NodeId,
        args: Vec<ObjectId>,
        init_fields: bool,
    ) -> Result<(), RuntimeError> {
        let env = Arc::clone(&self.environment);
        let constructor = env.lookup_constructor(lookup_start, args.len());
        if constructor.is_none() && !args.is_empty() {
            return Err(RuntimeError::NoConstructor {
                module: env.fully_qualified_name(lookup_start),
                arity: args.len(),
            });
        }
        if init_fields {
            let names: Vec<String> = self
                .compiler()
                .initialized_fields(lookup_start)
                .into_iter()
                .filter_map(|field| env.name(field).map(str::to_string))
                .collect();
            let object = self.heap.object_mut(receiver)?;
            for name in names {
                object.fields.insert(name, ObjectId::NULL);
            }
        }
        let code = self.init_code(lookup_start, constructor, init_fields)?;
        let context = self.heap.new_context(Link::Object(receiver));
        // Closures answer the enclosing self, but their initializer still
        // needs the closure itself.
        self.heap.declare(context, "self", receiver);
        if let Some(constructor) = constructor
            && let Kind::Constructor { parameters, .. } = env.kind(constructor)
        {
            self.bind_parameters(context, parameters, args);
        }
        self.frame()?.resume.push(Interruption::Return);
        self.push_frame(Frame::new(code, context))
    }

    fn dispatch(
        &mut self,
        receiver: ObjectId,
        message: &str,
        args: Vec<ObjectId>,
        lookup_start: Option<NodeId>,
    ) -> Result<(), RuntimeError> {
        let env = Arc::clone(&self.environment);
        let module = self.heap.object(receiver)?.module;
        let arity = args.len();
        let method = match lookup_start {
            Some(start) => env.lookup_method_after(module, message, arity, start),
            None => env.lookup_method(module, message, arity),
        };
        if let Some(method) = method {
            return self.invoke(method, receiver, args);
        }
        debug!(
            "{} does not understand {message}/{arity}",
            env.fully_qualified_name(module)
        );
        match env.lookup_method(module, "messageNotUnderstood", 2) {
            Some(fallback) => {
                let name = self.new_string(message);
                let args = self.new_list(args);
                self.invoke(fallback, receiver, vec![name, args])
            }
            None => Err(RuntimeError::MessageNotUnderstood {
                module: env.fully_qualified_name(module),
                message: message.to_string(),
                arity,
            }),
        }
    }

    fn invoke(
        &mut self,
        method: NodeId,
        receiver: ObjectId,
        args: Vec<ObjectId>,
    ) -> Result<(), RuntimeError> {
        let env = Arc::clone(&self.environment);
        let Kind::Method {
            name,
            parameters,
            native,
            ..
        } = env.kind(method)
        else {
            return Err(CompileError::NoBody(format!("node {method}")).into());
        };
        if *native {
            let owner = env
                .parent_of(method)
                .map(|owner| env.fully_qualified_name(owner))
                .unwrap_or_default();
            let natives = Arc::clone(&self.natives);
            let native = natives
                .get(&owner, name)
                .filter(|native| native.arity == args.len())
                .ok_or_else(|| RuntimeError::MissingNative {
                    module: owner.clone(),
                    selector: name.clone(),
                })?;
            trace!("native {owner}.{name}");
            return (native.func)(self, receiver, &args);
        }
        let code = self.method_code(method)?;
        let context = self.heap.new_context(Link::Object(receiver));
        self.bind_parameters(context, parameters, args);
        self.frame()?.resume.push(Interruption::Return);
        self.push_frame(Frame::new(code, context))
    }

    /// Binds arguments positionally. A trailing var-arg parameter collects
    /// the rest into a list.
    fn bind_parameters(
        &mut self,
        context: ContextId,
        parameters: &[NodeId],
        args: Vec<ObjectId>,
    ) {
        let env = Arc::clone(&self.environment);
        for (i, &parameter) in parameters.iter().enumerate() {
            let Kind::Parameter { name, var_arg } = env.kind(parameter) else {
                continue;
            };
            let value = if *var_arg {
                let rest = args.get(i..).unwrap_or_default().to_vec();
                self.new_list(rest)
            } else {
                args.get(i).copied().unwrap_or(ObjectId::NULL)
            };
            self.heap.declare(context, name, value);
        }
    }

    fn cached(
        &self,
        key: CodeKey,
        compile: impl FnOnce(&Compiler<'_>) -> Result<Code, CompileError>,
    ) -> Result<Code, CompileError> {
        let cached = self.code_cache.read().get(&key).cloned();
        if let Some(code) = cached {
            return Ok(code);
        }
        let code = compile(&self.compiler())?;
        self.code_cache.write().insert(key, code.clone());
        Ok(code)
    }

    fn method_code(&self, method: NodeId) -> Result<Code, CompileError> {
        self.cached(CodeKey::Method(method), |compiler| compiler.method(method))
    }

    fn init_code(
        &self,
        lookup_start: NodeId,
        constructor: Option<NodeId>,
        init_fields: bool,
    ) -> Result<Code, CompileError> {
        let key = CodeKey::Init {
            lookup_start,
            constructor,
            init_fields,
        };
        self.cached(key, |compiler| {
            compiler.init(lookup_start, constructor, init_fields)
        })
    }

    // Objects

    pub fn field(&self, receiver: ObjectId, field: &str) -> Result<ObjectId, RuntimeError> {
        let object = self.heap.object(receiver)?;
        object
            .fields
            .get(field)
            .copied()
            .ok_or_else(|| RuntimeError::MissingField {
                module: self.environment.fully_qualified_name(object.module),
                field: field.to_string(),
            })
    }

    pub fn set_field(
        &mut self,
        receiver: ObjectId,
        field: &str,
        value: ObjectId,
    ) -> Result<(), RuntimeError> {
        let object = self.heap.object_mut(receiver)?;
        match object.fields.get_mut(field) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => {
                let module = object.module;
                Err(RuntimeError::MissingField {
                    module: self.environment.fully_qualified_name(module),
                    field: field.to_string(),
                })
            }
        }
    }

    pub fn new_number(&mut self, value: f64) -> ObjectId {
        self.heap.number(value, self.core.number)
    }

    pub fn new_string(&mut self, value: &str) -> ObjectId {
        self.heap.string(value, self.core.string)
    }

    pub fn new_list(&mut self, elements: Vec<ObjectId>) -> ObjectId {
        self.heap.allocate(
            self.core.list,
            Some(Inner::Collection(elements)),
            ContextId::ROOT,
            true,
        )
    }

    /// A bare instance of `module` with every field null and `message` set.
    fn new_instance_with_message(
        &mut self,
        module: NodeId,
        message: &str,
    ) -> Result<ObjectId, RuntimeError> {
        let fields = self.environment.fields_of(module);
        let id = self.heap.allocate(module, None, ContextId::ROOT, true);
        let message = self.new_string(message);
        let env = Arc::clone(&self.environment);
        let object = self.heap.object_mut(id)?;
        for field in fields {
            if let Some(name) = env.name(field) {
                object.fields.insert(name.to_string(), ObjectId::NULL);
            }
        }
        object.fields.insert("message".to_string(), message);
        Ok(id)
    }

    /// An exception of the named class carrying `message`, ready to be
    /// thrown by a native with [`RuntimeError::Thrown`].
    pub fn new_exception(&mut self, fqn: &str, message: &str) -> Result<ObjectId, RuntimeError> {
        let module = self
            .environment
            .entity(fqn)
            .ok_or_else(|| RuntimeError::MissingModule(fqn.to_string()))?;
        self.new_instance_with_message(module, message)
    }

    fn inner(&self, id: ObjectId) -> Option<&Inner> {
        self.heap.object(id).ok().and_then(|o| o.inner.as_ref())
    }

    pub fn number(&self, id: ObjectId) -> Result<f64, RuntimeError> {
        match self.inner(id) {
            Some(Inner::Number(n)) => Ok(*n),
            _ => Err(self.type_error("Number", id)),
        }
    }

    pub fn string(&self, id: ObjectId) -> Result<&str, RuntimeError> {
        match self.inner(id) {
            Some(Inner::String(s)) => Ok(s),
            _ => Err(self.type_error("String", id)),
        }
    }

    pub fn list(&self, id: ObjectId) -> Result<&[ObjectId], RuntimeError> {
        match self.inner(id) {
            Some(Inner::Collection(elements)) => Ok(elements),
            _ => Err(self.type_error("List", id)),
        }
    }

    pub fn list_mut(&mut self, id: ObjectId) -> Result<&mut Vec<ObjectId>, RuntimeError> {
        if self.list(id).is_err() {
            return Err(self.type_error("List", id));
        }
        match self.heap.object_mut(id)?.inner.as_mut() {
            Some(Inner::Collection(elements)) => Ok(elements),
            _ => Err(RuntimeError::UnknownObject(id)),
        }
    }

    pub fn boolean(&self, id: ObjectId) -> Result<bool, RuntimeError> {
        match id {
            ObjectId::TRUE => Ok(true),
            ObjectId::FALSE => Ok(false),
            other => Err(self.type_error("Boolean", other)),
        }
    }

    fn type_error(&self, expected: &'static str, got: ObjectId) -> RuntimeError {
        RuntimeError::TypeError {
            expected,
            got: self.display(got),
        }
    }

    /// Fully-qualified name of the object's module.
    pub fn class_name(&self, id: ObjectId) -> String {
        match self.heap.object(id) {
            Ok(object) => self.environment.fully_qualified_name(object.module),
            Err(_) => id.to_string(),
        }
    }

    fn exception_message(&self, exception: ObjectId) -> String {
        match self.field(exception, "message") {
            Ok(ObjectId::NULL) | Err(_) => String::new(),
            Ok(message) => self.display(message),
        }
    }

    /// Human-readable form used by `toString` and error messages.
    pub fn display(&self, id: ObjectId) -> String {
        match id {
            ObjectId::NULL => return "null".to_string(),
            ObjectId::TRUE => return "true".to_string(),
            ObjectId::FALSE => return "false".to_string(),
            ObjectId::VOID => return "void".to_string(),
            _ => {}
        }
        let Ok(object) = self.heap.object(id) else {
            return id.to_string();
        };
        match &object.inner {
            Some(Inner::Number(n)) => format_number(*n),
            Some(Inner::String(s)) => s.clone(),
            Some(Inner::Collection(elements)) => {
                let items: Vec<String> = elements.iter().map(|&e| self.display(e)).collect();
                format!("[{}]", items.join(", "))
            }
            None => match self.environment.kind(object.module) {
                Kind::Singleton { name: Some(name), .. } => name.clone(),
                _ => {
                    let fqn = self.environment.fully_qualified_name(object.module);
                    let short = fqn.rsplit('.').next().unwrap_or(&fqn).to_string();
                    let article = match short.chars().next() {
                        Some('A' | 'E' | 'I' | 'O' | 'U') => "an",
                        _ => "a",
                    };
                    format!("{article} {short}")
                }
            },
        }
    }
}

/// Integral numbers print without decimals.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() {
        format!("{n:.0}")
    } else {
        format!("{n}")
    }
}

#[cfg(test)]
mod tests {
    use ast::build::*;
    use bytecode::CodeBuilder;

    use super::*;
    use crate::tests::environment;

    fn boxed() -> (Evaluation, NodeId) {
        let env = environment(vec![package(
            "p",
            vec![class("Box", vec![field("x", null())])],
        )]);
        let module = env.entity("p.Box").unwrap();
        let settings = EvaluationSettings::default();
        let evaluation = Evaluation::new(Arc::new(env), Arc::new(Natives::lang()), settings);
        (evaluation.unwrap(), module)
    }

    #[test]
    fn fields_are_read_and_written_off_the_stack() {
        let (mut evaluation, module) = boxed();
        let mut b = CodeBuilder::new();
        b.instantiate(module, None);
        b.init(0, module, true);
        b.dup();
        b.push(ObjectId::TRUE);
        b.set("x");
        b.push(ObjectId::FALSE);
        b.swap();
        b.get("x");
        b.swap();
        b.pop();
        let value = evaluation.run_code(b.finish(), ContextId::ROOT);
        assert_eq!(value, Ok(ObjectId::TRUE));
    }

    #[test]
    fn missing_fields_raise_evaluation_errors() {
        let (mut evaluation, module) = boxed();
        let mut b = CodeBuilder::new();
        b.instantiate(module, None);
        b.init(0, module, true);
        b.get("y");
        let result = evaluation.run_code(b.finish(), ContextId::ROOT);
        assert!(matches!(
            result,
            Err(ExecutionError::UnhandledException { module, .. })
                if module == "wollok.lang.EvaluationError"
        ));
    }

    #[test]
    fn numbers_print_like_source() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-2.0), "-2");
        assert_eq!(format_number(2.5), "2.5");
    }
}
