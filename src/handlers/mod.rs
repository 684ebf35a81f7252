/// Call-handler registry.
///
/// Handlers give meaning to calls of well-known functions. Recognition is
/// by value identity, never by name: renaming or re-exporting a recognized
/// function keeps its handler attached.
pub mod amd;
pub mod compose;

use std::rc::Rc;

use crate::ast::Span;
use crate::diagnostics::ExtractError;
use crate::interpreter::{Interpreter, WellKnown};
use crate::module::ModuleGraph;
use crate::value::{Scalar, ValueRef};

/// The string payload of a string-literal value, if that is what this is.
pub(crate) fn scalar_string(value: &ValueRef) -> Option<String> {
    value
        .borrow()
        .scalar
        .as_ref()
        .and_then(Scalar::as_str)
        .map(str::to_string)
}

/// An evaluated call expression, handed to handlers.
pub struct CallSite {
    /// The evaluated callee.
    pub callee: ValueRef,
    /// The reference path the callee was reached through, if any.
    pub path: Option<Vec<String>>,
    /// Evaluated arguments, in order.
    pub args: Vec<ValueRef>,
    pub span: Span,
}

/// How a handler recognizes its calls.
pub enum Recognizer {
    /// The callee is this exact value.
    Identity(ValueRef),
    /// The callee is the exported value of this module. Never matches
    /// inside the named module itself, so a module can call its own export
    /// without recursing into its handler.
    ModuleValue(String),
}

impl Recognizer {
    pub fn matches(
        &self,
        site: &CallSite,
        graph: &ModuleGraph,
        current_module: Option<&str>,
    ) -> bool {
        match self {
            Recognizer::Identity(value) => Rc::ptr_eq(value, &site.callee),
            Recognizer::ModuleValue(id) => {
                if current_module == Some(id.as_str()) {
                    return false;
                }
                match graph.get(id) {
                    Some(module) => Rc::ptr_eq(&module.borrow().value, &site.callee),
                    None => false,
                }
            }
        }
    }
}

pub type Action = fn(&mut Interpreter, &CallSite) -> Result<Option<ValueRef>, ExtractError>;

pub struct Handler {
    pub name: &'static str,
    pub recognizer: Recognizer,
    pub action: Action,
}

/// Ordered handler registry; the first recognizer to match wins.
#[derive(Default)]
pub struct CallHandlers {
    handlers: Vec<Handler>,
}

impl CallHandlers {
    pub fn new() -> CallHandlers {
        CallHandlers::default()
    }

    pub fn register(&mut self, handler: Handler) {
        self.handlers.push(handler);
    }

    /// The standard set: module definition and requirement, composition,
    /// mixin and extension.
    pub fn standard(well_known: &WellKnown) -> CallHandlers {
        let mut registry = CallHandlers::new();
        registry.register(Handler {
            name: "define",
            recognizer: Recognizer::Identity(well_known.define.clone()),
            action: amd::register_module,
        });
        registry.register(Handler {
            name: "require",
            recognizer: Recognizer::Identity(well_known.require.clone()),
            action: amd::require_modules,
        });
        registry.register(Handler {
            name: "compose",
            recognizer: Recognizer::Identity(well_known.compose.clone()),
            action: compose::compose,
        });
        registry.register(Handler {
            name: "mixin",
            recognizer: Recognizer::Identity(well_known.mixin.clone()),
            action: compose::mixin,
        });
        registry.register(Handler {
            name: "extend",
            recognizer: Recognizer::Identity(well_known.extend.clone()),
            action: compose::extend,
        });
        registry
    }

    pub fn iter(&self) -> impl Iterator<Item = &Handler> {
        self.handlers.iter()
    }
}
