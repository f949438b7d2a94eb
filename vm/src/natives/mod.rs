//! Host implementations of `native` methods.
//!
//! Natives are looked up by the fully-qualified name of the module that
//! declares the method, then by selector. They act on the evaluation
//! directly: a native either pushes its result onto the caller's operand
//! stack or pushes a frame that returns into it.

use std::collections::HashMap;

use bytecode::ObjectId;

use crate::error::RuntimeError;
use crate::evaluation::Evaluation;
use crate::lang::{ASSERT, BOOLEAN, CONSOLE, LIST, NUMBER, OBJECT, STRING};

pub mod boolean;
pub mod lib;
pub mod list;
pub mod number;
pub mod object;
pub mod string;

pub type NativeFn = fn(&mut Evaluation, ObjectId, &[ObjectId]) -> Result<(), RuntimeError>;

#[derive(Clone, Copy)]
pub struct NativeDesc {
    pub module: &'static str,
    pub selector: &'static str,
    pub arity: usize,
    pub func: NativeFn,
}

impl NativeDesc {
    pub const fn new(
        module: &'static str,
        selector: &'static str,
        arity: usize,
        func: NativeFn,
    ) -> Self {
        Self {
            module,
            selector,
            arity,
            func,
        }
    }
}

impl std::fmt::Debug for NativeDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}/{}", self.module, self.selector, self.arity)
    }
}

/// Module name to selector to implementation.
#[derive(Debug, Clone, Default)]
pub struct Natives {
    modules: HashMap<String, HashMap<String, NativeDesc>>,
}

impl Natives {
    pub fn new() -> Self {
        Self::default()
    }

    /// The core library.
    pub fn lang() -> Self {
        let mut natives = Self::new();
        for desc in default_natives() {
            natives.register(desc);
        }
        natives
    }

    /// Adds or replaces an implementation.
    pub fn register(&mut self, desc: NativeDesc) {
        self.modules
            .entry(desc.module.to_string())
            .or_default()
            .insert(desc.selector.to_string(), desc);
    }

    pub fn get(&self, module: &str, selector: &str) -> Option<&NativeDesc> {
        self.modules.get(module)?.get(selector)
    }

    pub fn len(&self) -> usize {
        self.modules.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn default_natives() -> Vec<NativeDesc> {
    vec![
        NativeDesc::new(OBJECT, "==", 1, object::object_eq),
        NativeDesc::new(OBJECT, "identity", 0, object::object_identity),
        NativeDesc::new(OBJECT, "toString", 0, object::object_to_string),
        NativeDesc::new(OBJECT, "className", 0, object::object_class_name),
        NativeDesc::new(
            OBJECT,
            "messageNotUnderstood",
            2,
            object::object_message_not_understood,
        ),
        NativeDesc::new(BOOLEAN, "&&", 1, boolean::boolean_and),
        NativeDesc::new(BOOLEAN, "||", 1, boolean::boolean_or),
        NativeDesc::new(BOOLEAN, "negate", 0, boolean::boolean_negate),
        NativeDesc::new(BOOLEAN, "toString", 0, object::object_to_string),
        NativeDesc::new(NUMBER, "+", 1, number::number_add),
        NativeDesc::new(NUMBER, "-", 1, number::number_sub),
        NativeDesc::new(NUMBER, "*", 1, number::number_mul),
        NativeDesc::new(NUMBER, "/", 1, number::number_div),
        NativeDesc::new(NUMBER, "%", 1, number::number_mod),
        NativeDesc::new(NUMBER, "<", 1, number::number_lt),
        NativeDesc::new(NUMBER, ">", 1, number::number_gt),
        NativeDesc::new(NUMBER, "<=", 1, number::number_le),
        NativeDesc::new(NUMBER, ">=", 1, number::number_ge),
        NativeDesc::new(NUMBER, "abs", 0, number::number_abs),
        NativeDesc::new(NUMBER, "toString", 0, object::object_to_string),
        NativeDesc::new(STRING, "+", 1, string::string_concat),
        NativeDesc::new(STRING, "size", 0, string::string_size),
        NativeDesc::new(STRING, "toUpperCase", 0, string::string_to_upper_case),
        NativeDesc::new(STRING, "toString", 0, object::object_to_string),
        NativeDesc::new(LIST, "add", 1, list::list_add),
        NativeDesc::new(LIST, "get", 1, list::list_get),
        NativeDesc::new(LIST, "size", 0, list::list_size),
        NativeDesc::new(LIST, "isEmpty", 0, list::list_is_empty),
        NativeDesc::new(LIST, "forEach", 1, list::list_for_each),
        NativeDesc::new(LIST, "map", 1, list::list_map),
        NativeDesc::new(CONSOLE, "println", 1, lib::console_println),
        NativeDesc::new(ASSERT, "that", 1, lib::assert_that),
        NativeDesc::new(ASSERT, "notThat", 1, lib::assert_not_that),
        NativeDesc::new(ASSERT, "equals", 2, lib::assert_equals),
    ]
}

pub(crate) fn arg(args: &[ObjectId], index: usize) -> Result<ObjectId, RuntimeError> {
    args.get(index).copied().ok_or(RuntimeError::StackUnderflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lang_registers_every_default() {
        let natives = Natives::lang();
        assert_eq!(natives.len(), default_natives().len());
        assert_eq!(
            natives.get(NUMBER, "+").map(|d| d.arity),
            Some(1)
        );
        assert!(natives.get(NUMBER, "nope").is_none());
        assert!(natives.get("p.Missing", "+").is_none());
    }

    #[test]
    fn register_replaces_by_selector() {
        fn nothing(_: &mut Evaluation, _: ObjectId, _: &[ObjectId]) -> Result<(), RuntimeError> {
            Ok(())
        }
        let mut natives = Natives::lang();
        let before = natives.len();
        natives.register(NativeDesc::new(NUMBER, "+", 1, nothing));
        assert_eq!(natives.len(), before);
        natives.register(NativeDesc::new("p.Thing", "poke", 0, nothing));
        assert_eq!(natives.len(), before + 1);
    }
}
