/// Environment management: the scope stack, cross-file state snapshots and
/// the seeded global scope.
use crate::diagnostics::ExtractError;
use crate::scope::{Scope, ScopeRef};
use crate::value::{Parameter, Value, ValueKind, ValueRef};

use super::{Interpreter, SavedState};

/// The built-in function values the standard call handlers recognize by
/// identity.
#[derive(Clone)]
pub struct WellKnown {
    pub define: ValueRef,
    pub require: ValueRef,
    pub compose: ValueRef,
    pub mixin: ValueRef,
    pub extend: ValueRef,
}

fn builtin_function(params: &[(&str, bool, bool)]) -> ValueRef {
    let function = Value::new_ref(ValueKind::Function);
    function.borrow_mut().parameters = params
        .iter()
        .map(|(name, is_optional, is_rest)| Parameter {
            name: name.to_string(),
            type_label: None,
            is_optional: *is_optional,
            is_rest: *is_rest,
        })
        .collect();
    function
}

/// Build the global scope every file starts from: the module-definition
/// and composition built-ins, `undefined`, and a host object bound as the
/// global `this`.
pub(super) fn seed_global() -> (ScopeRef, WellKnown) {
    let global = Scope::new_global();

    let well_known = WellKnown {
        define: builtin_function(&[
            ("id", true, false),
            ("dependencies", true, false),
            ("factory", false, false),
        ]),
        require: builtin_function(&[("dependencies", false, true)]),
        compose: builtin_function(&[
            ("name", true, false),
            ("bases", true, false),
            ("members", false, false),
        ]),
        mixin: builtin_function(&[("target", false, false), ("sources", false, true)]),
        extend: builtin_function(&[("target", false, false), ("sources", false, true)]),
    };

    // seeding a fresh scope never collides
    let mut notes = Vec::new();
    Scope::declare(&global, "define", Some(well_known.define.clone()), &mut notes);
    Scope::declare(&global, "require", Some(well_known.require.clone()), &mut notes);
    Scope::declare(&global, "compose", Some(well_known.compose.clone()), &mut notes);
    Scope::declare(&global, "mixin", Some(well_known.mixin.clone()), &mut notes);
    Scope::declare(&global, "extend", Some(well_known.extend.clone()), &mut notes);
    Scope::declare(&global, "undefined", Some(Value::undefined_ref()), &mut notes);

    let window = Value::object_ref();
    Scope::declare(&global, "window", Some(window.clone()), &mut notes);
    Scope::declare(&global, "this", Some(window), &mut notes);

    (global, well_known)
}

impl Interpreter {
    pub(super) fn push_scope(&mut self, related_function: Option<ValueRef>) -> ScopeRef {
        let scope = Scope::child(&self.scope, related_function.clone());
        self.scope = scope.clone();
        if related_function.is_some() {
            self.function_scope = scope.clone();
        }
        scope
    }

    pub(super) fn pop_scope(&mut self) -> Result<(), ExtractError> {
        let parent = self
            .scope
            .borrow()
            .parent
            .clone()
            .ok_or(ExtractError::ScopeUnderflow)?;
        self.scope = parent;
        // re-derive the nearest function scope
        let mut cursor = self.scope.clone();
        loop {
            if cursor.borrow().is_function_scope {
                self.function_scope = cursor;
                break;
            }
            let up = cursor.borrow().parent.clone();
            match up {
                Some(p) => cursor = p,
                None => {
                    self.function_scope = self.global.clone();
                    break;
                }
            }
        }
        Ok(())
    }

    /// Snapshot the environment before crossing into another file. The new
    /// file starts at the global scope.
    pub(super) fn push_state(&mut self) {
        self.states.push(SavedState {
            file: self.file.take(),
            scope: std::mem::replace(&mut self.scope, self.global.clone()),
            function_scope: std::mem::replace(&mut self.function_scope, self.global.clone()),
        });
    }

    pub(super) fn pop_state(&mut self) -> Result<(), ExtractError> {
        let state = self.states.pop().ok_or(ExtractError::StateUnderflow)?;
        self.file = state.file;
        self.scope = state.scope;
        self.function_scope = state.function_scope;
        Ok(())
    }

    pub(super) fn in_global_function_scope(&self) -> bool {
        std::rc::Rc::ptr_eq(&self.function_scope, &self.global)
    }

    /// The function value owning the current function scope, if any.
    pub(super) fn enclosing_function(&self) -> Option<ValueRef> {
        if self.in_global_function_scope() {
            return None;
        }
        self.function_scope.borrow().vars.get("this").cloned()
    }

    pub(crate) fn global_scope(&self) -> ScopeRef {
        self.global.clone()
    }

    pub(crate) fn current_scope(&self) -> ScopeRef {
        self.scope.clone()
    }
}
