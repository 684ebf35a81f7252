/// Lexical scope chain.
///
/// Scopes form a tree rooted at the global scope; a function value keeps a
/// reference to its own scope so later calls can be replayed against it.
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::diagnostics::Note;
use crate::value::{self, Value, ValueKind, ValueRef};

pub type ScopeRef = Rc<RefCell<Scope>>;

#[derive(Debug)]
pub struct Scope {
    pub parent: Option<ScopeRef>,
    pub vars: HashMap<String, ValueRef>,
    pub children: Vec<ScopeRef>,
    /// Function scopes receive `var` hoisting; block scopes only `let`.
    pub is_function_scope: bool,
}

/// Why a scope assignment could not be performed.
#[derive(Debug, PartialEq, Eq)]
pub enum AssignError {
    /// The target path is a bare `this`.
    This,
}

impl Scope {
    pub fn new_global() -> ScopeRef {
        Rc::new(RefCell::new(Scope {
            parent: None,
            vars: HashMap::new(),
            children: Vec::new(),
            is_function_scope: true,
        }))
    }

    /// Create a child scope. Passing the function being entered makes it a
    /// function scope with `this` bound to that function's value.
    pub fn child(parent: &ScopeRef, related_function: Option<ValueRef>) -> ScopeRef {
        let scope = Rc::new(RefCell::new(Scope {
            parent: Some(parent.clone()),
            vars: HashMap::new(),
            children: Vec::new(),
            is_function_scope: related_function.is_some(),
        }));
        if let Some(function) = related_function {
            scope
                .borrow_mut()
                .vars
                .insert("this".to_string(), function);
        }
        parent.borrow_mut().children.push(scope.clone());
        scope
    }

    /// Declare a name in this scope. A redeclaration keeps the first
    /// binding and is reported; the one exception is upgrading an
    /// undefined placeholder, which is how hoisting binds a name before
    /// its value exists.
    pub fn declare(
        scope: &ScopeRef,
        name: &str,
        value: Option<ValueRef>,
        notes: &mut Vec<Note>,
    ) -> ValueRef {
        let existing = scope.borrow().vars.get(name).cloned();
        match (existing, value) {
            (Some(old), None) => old,
            (Some(old), Some(new)) => {
                if Rc::ptr_eq(&old, &new) {
                    return old;
                }
                if old.borrow().kind == ValueKind::Undefined {
                    scope
                        .borrow_mut()
                        .vars
                        .insert(name.to_string(), new.clone());
                    new
                } else {
                    notes.push(Note::warning(format!(
                        "redeclaration of '{}' keeps the first binding",
                        name
                    )));
                    old
                }
            }
            (None, value) => {
                let bound = value.unwrap_or_else(Value::undefined_ref);
                scope
                    .borrow_mut()
                    .vars
                    .insert(name.to_string(), bound.clone());
                bound
            }
        }
    }

    pub fn lookup(start: &ScopeRef, name: &str) -> Option<ValueRef> {
        let mut current = start.clone();
        loop {
            if let Some(found) = current.borrow().vars.get(name) {
                return Some(found.clone());
            }
            let parent = current.borrow().parent.clone();
            match parent {
                Some(p) => current = p,
                None => return None,
            }
        }
    }

    /// Resolve a reference path against the scope chain. An unresolvable
    /// reference is reported and stands in as undefined so the walk can
    /// continue.
    pub fn resolve(start: &ScopeRef, path: &[String], notes: &mut Vec<Note>) -> ValueRef {
        debug_assert!(!path.is_empty());
        let head = match Scope::lookup(start, &path[0]) {
            Some(v) => v,
            None => {
                notes.push(Note::warning(format!(
                    "reference to undeclared variable '{}'",
                    path[0]
                )));
                return Value::undefined_ref();
            }
        };
        if path.len() == 1 {
            return head;
        }
        match value::get_property(&head, &path[1..]) {
            Some(v) => v,
            None => {
                notes.push(Note::warning(format!(
                    "could not resolve reference '{}'",
                    path.join(".")
                )));
                Value::undefined_ref()
            }
        }
    }

    /// Assign through a reference path. Undeclared bare names become
    /// implicit globals, with a warning. Rebinding a name that already holds
    /// a resolved value is noteworthy but allowed.
    pub fn assign(
        start: &ScopeRef,
        global: &ScopeRef,
        path: &[String],
        value: ValueRef,
        permitted: bool,
        notes: &mut Vec<Note>,
    ) -> Result<(), AssignError> {
        debug_assert!(!path.is_empty());
        if path[0] == "this" && path.len() == 1 {
            return Err(AssignError::This);
        }

        let head = Scope::lookup(start, &path[0]);

        if path.len() == 1 {
            match head {
                Some(old) => {
                    if old.borrow().kind != ValueKind::Undefined && !Rc::ptr_eq(&old, &value) {
                        notes.push(Note::info(format!(
                            "rebinding existing variable '{}'",
                            path[0]
                        )));
                    }
                    let scope = Scope::owning_scope(start, &path[0]).unwrap_or_else(|| start.clone());
                    scope.borrow_mut().vars.insert(path[0].clone(), value);
                }
                None => {
                    notes.push(Note::warning(format!(
                        "assignment to undeclared variable '{}'",
                        path[0]
                    )));
                    global.borrow_mut().vars.insert(path[0].clone(), value);
                }
            }
            return Ok(());
        }

        let target = match head {
            Some(v) => v,
            None => {
                // the intermediate object materializes on the global scope
                notes.push(Note::warning(format!(
                    "assignment to undeclared variable '{}'",
                    path[0]
                )));
                let created = Value::object_ref();
                global
                    .borrow_mut()
                    .vars
                    .insert(path[0].clone(), created.clone());
                created
            }
        };
        value::set_property(&target, &path[1..], value, permitted, notes);
        Ok(())
    }

    fn owning_scope(start: &ScopeRef, name: &str) -> Option<ScopeRef> {
        let mut current = start.clone();
        loop {
            if current.borrow().vars.contains_key(name) {
                return Some(current);
            }
            let parent = current.borrow().parent.clone();
            match parent {
                Some(p) => current = p,
                None => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Scalar;

    fn path(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn resolution_walks_the_chain() {
        let global = Scope::new_global();
        let inner = Scope::child(&global, None);
        let v = Value::scalar_ref(ValueKind::Number, Scalar::Number(1.0));
        Scope::declare(&global, "x", Some(v.clone()), &mut Vec::new());

        let mut notes = Vec::new();
        let found = Scope::resolve(&inner, &path(&["x"]), &mut notes);
        assert!(Rc::ptr_eq(&found, &v));
        assert!(notes.is_empty());
    }

    #[test]
    fn unresolved_reference_degrades_with_a_warning() {
        let global = Scope::new_global();
        let mut notes = Vec::new();
        let found = Scope::resolve(&global, &path(&["nope"]), &mut notes);
        assert_eq!(found.borrow().kind, ValueKind::Undefined);
        assert_eq!(notes.len(), 1);
    }

    #[test]
    fn redeclaration_keeps_the_first_binding() {
        let global = Scope::new_global();
        let first = Value::object_ref();
        let second = Value::object_ref();
        let mut notes = Vec::new();
        Scope::declare(&global, "x", Some(first.clone()), &mut notes);
        let bound = Scope::declare(&global, "x", Some(second), &mut notes);
        assert!(Rc::ptr_eq(&bound, &first));
        assert!(Rc::ptr_eq(&global.borrow().vars["x"], &first));
        assert!(notes.iter().any(|n| n.message.contains("redeclaration")));
    }

    #[test]
    fn a_placeholder_upgrades_without_a_report() {
        let global = Scope::new_global();
        Scope::declare(&global, "f", None, &mut Vec::new());
        let function = Value::new_ref(ValueKind::Function);
        let mut notes = Vec::new();
        let bound = Scope::declare(&global, "f", Some(function.clone()), &mut notes);
        assert!(Rc::ptr_eq(&bound, &function));
        assert!(notes.is_empty());
    }

    #[test]
    fn implicit_globals_land_on_the_global_scope() {
        let global = Scope::new_global();
        let fn_scope = Scope::child(&global, Some(Value::new_ref(ValueKind::Function)));
        let v = Value::object_ref();
        let mut notes = Vec::new();
        Scope::assign(&fn_scope, &global, &path(&["leaked"]), v.clone(), false, &mut notes)
            .unwrap();
        assert!(notes.iter().any(|n| n.message.contains("undeclared")));
        assert!(Rc::ptr_eq(&global.borrow().vars["leaked"], &v));
        assert!(!fn_scope.borrow().vars.contains_key("leaked"));
    }

    #[test]
    fn assignment_rebinds_in_the_owning_scope() {
        let global = Scope::new_global();
        let inner = Scope::child(&global, None);
        Scope::declare(&global, "x", Some(Value::undefined_ref()), &mut Vec::new());

        let v = Value::object_ref();
        let mut notes = Vec::new();
        Scope::assign(&inner, &global, &path(&["x"]), v.clone(), false, &mut notes).unwrap();
        assert!(Rc::ptr_eq(&global.borrow().vars["x"], &v));
        assert!(!inner.borrow().vars.contains_key("x"));
    }

    #[test]
    fn bare_this_is_refused() {
        let global = Scope::new_global();
        let mut notes = Vec::new();
        let err = Scope::assign(
            &global,
            &global,
            &path(&["this"]),
            Value::undefined_ref(),
            false,
            &mut notes,
        );
        assert_eq!(err, Err(AssignError::This));
    }
}
