/// The Value model: the interpreter's approximation of a runtime entity in
/// the analyzed program.
///
/// Values are shared, mutable and identity-bearing (handler recognition and
/// module export comparisons are pointer equality), so they live behind
/// `Rc<RefCell<_>>`.
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::Serialize;

use crate::ast::Node;
use crate::diagnostics::Note;
use crate::metadata::Metadata;
use crate::scope::ScopeRef;

pub type ValueRef = Rc<RefCell<Value>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// The default, unresolved state.
    Undefined,
    Null,
    Boolean,
    Number,
    String,
    RegExp,
    Array,
    Object,
    Function,
    Constructor,
    Instance,
    Parameter,
    Any,
}

impl ValueKind {
    pub fn label(&self) -> &'static str {
        match self {
            ValueKind::Undefined => "undefined",
            ValueKind::Null => "null",
            ValueKind::Boolean => "boolean",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::RegExp => "regexp",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
            ValueKind::Function => "function",
            ValueKind::Constructor => "constructor",
            ValueKind::Instance => "instance",
            ValueKind::Parameter => "parameter",
            ValueKind::Any => "any",
        }
    }

    /// Scalar kinds cannot carry properties; writes through them degrade to
    /// a placeholder.
    pub fn is_unassignable(&self) -> bool {
        matches!(
            self,
            ValueKind::Undefined
                | ValueKind::Null
                | ValueKind::Boolean
                | ValueKind::Number
                | ValueKind::String
                | ValueKind::RegExp
        )
    }

    /// Kinds whose value is still being built up when the source assigns
    /// into it, so intermediate objects may be created on demand.
    pub fn is_under_construction(&self) -> bool {
        matches!(
            self,
            ValueKind::Function | ValueKind::Constructor | ValueKind::Parameter
        )
    }
}

/// Literal payload for primitive kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Number(f64),
    Str(String),
    RegExp(String),
}

impl Scalar {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Statically-known truthiness, where decidable.
    pub fn is_truthy(&self) -> bool {
        match self {
            Scalar::Bool(b) => *b,
            Scalar::Number(n) => *n != 0.0 && !n.is_nan(),
            Scalar::Str(s) => !s.is_empty(),
            Scalar::RegExp(_) => true,
        }
    }
}

/// A declared function parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    pub type_label: Option<String>,
    pub is_optional: bool,
    pub is_rest: bool,
}

impl Parameter {
    pub fn named(name: impl Into<String>) -> Parameter {
        Parameter {
            name: name.into(),
            type_label: None,
            is_optional: false,
            is_rest: false,
        }
    }
}

#[derive(Debug)]
pub struct Value {
    pub kind: ValueKind,
    /// Literal payload for primitive kinds.
    pub scalar: Option<Scalar>,
    /// Ordered elements, for the array kind.
    pub elements: Vec<ValueRef>,
    /// Properties attached to this value.
    pub properties: BTreeMap<String, ValueRef>,
    /// Declared parameters, for function/constructor kinds.
    pub parameters: Vec<Parameter>,
    /// Every return value observed within the function, across all exits.
    pub returns: Vec<ValueRef>,
    /// Every thrown value observed within the function.
    pub throws: Vec<ValueRef>,
    /// The function's own scope, for function/constructor kinds.
    pub scope: Option<ScopeRef>,
    /// Ordered composition sources mixed into this value.
    pub mixins: Vec<ValueRef>,
    /// For the instance kind, the value being instantiated.
    pub instance_of: Option<ValueRef>,
    /// Documentation owned by the doc-comment collaborator.
    pub metadata: Metadata,
    /// Canonical id of the defining module; `None` for built-ins.
    pub origin: Option<String>,
    /// Retained body for function kinds, so call handlers can replay the
    /// body with real argument bindings.
    pub body: Option<Rc<Node>>,
}

impl Value {
    pub fn new(kind: ValueKind) -> Value {
        Value {
            kind,
            scalar: None,
            elements: Vec::new(),
            properties: BTreeMap::new(),
            parameters: Vec::new(),
            returns: Vec::new(),
            throws: Vec::new(),
            scope: None,
            mixins: Vec::new(),
            instance_of: None,
            metadata: Metadata::default(),
            origin: None,
            body: None,
        }
    }

    pub fn new_ref(kind: ValueKind) -> ValueRef {
        Rc::new(RefCell::new(Value::new(kind)))
    }

    pub fn undefined_ref() -> ValueRef {
        Value::new_ref(ValueKind::Undefined)
    }

    pub fn object_ref() -> ValueRef {
        Value::new_ref(ValueKind::Object)
    }

    pub fn scalar_ref(kind: ValueKind, scalar: Scalar) -> ValueRef {
        let mut value = Value::new(kind);
        value.scalar = Some(scalar);
        Rc::new(RefCell::new(value))
    }

    pub fn is_function_like(&self) -> bool {
        matches!(self.kind, ValueKind::Function | ValueKind::Constructor)
    }

    /// Upgrade the kind. The only permitted transitions are resolving an
    /// undefined placeholder and the one-shot function→constructor upgrade;
    /// anything else is refused and reported by the caller. Upgrading to
    /// constructor scaffolds the prototype object, which is why this is an
    /// explicit method rather than a field write.
    pub fn set_kind(&mut self, kind: ValueKind) -> bool {
        if self.kind == kind {
            return true;
        }
        match (self.kind, kind) {
            (ValueKind::Undefined, _) | (ValueKind::Function, ValueKind::Constructor) => {
                self.kind = kind;
                if kind == ValueKind::Constructor {
                    self.properties
                        .entry("prototype".to_string())
                        .or_insert_with(Value::object_ref);
                }
                true
            }
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Property access
// ---------------------------------------------------------------------------

/// Own-property lookup with a single, depth-bounded prototype fallback:
/// function/constructor kinds fall back to their own `prototype` property's
/// own properties; instance kinds fall back through the value they
/// instantiate. Never recurses further.
pub fn get_own_or_prototype_property(value: &ValueRef, name: &str) -> Option<ValueRef> {
    if let Some(own) = value.borrow().properties.get(name) {
        return Some(own.clone());
    }

    let proto = {
        let v = value.borrow();
        match v.kind {
            ValueKind::Function | ValueKind::Constructor => v.properties.get("prototype").cloned(),
            ValueKind::Instance => v.instance_of.as_ref().and_then(|ctor| {
                if Rc::ptr_eq(ctor, value) {
                    None
                } else {
                    ctor.borrow().properties.get("prototype").cloned()
                }
            }),
            _ => None,
        }
    };

    let proto = proto?;
    if Rc::ptr_eq(&proto, value) {
        return None;
    }
    let found = proto.borrow().properties.get(name).cloned();
    found
}

/// Walk a property path, returning `None` on any missing step.
pub fn get_property(value: &ValueRef, path: &[String]) -> Option<ValueRef> {
    let mut current = value.clone();
    for name in path {
        current = get_own_or_prototype_property(&current, name)?;
    }
    Some(current)
}

/// Write through a property path.
///
/// Intermediate objects are created on demand only while the target is
/// still under construction (or the caller explicitly permits it);
/// otherwise the write degrades to an undefined placeholder so processing
/// continues. Returns the observations made along the way.
pub fn set_property(
    target: &ValueRef,
    path: &[String],
    new_value: ValueRef,
    permitted: bool,
    notes: &mut Vec<Note>,
) {
    let (last, walk) = match path.split_last() {
        Some(split) => split,
        None => return,
    };

    let mut current = target.clone();
    for (i, name) in walk.iter().enumerate() {
        let next = match get_own_or_prototype_property(&current, name) {
            Some(next) => {
                let kind = next.borrow().kind;
                if kind.is_unassignable() {
                    notes.push(Note::warning(format!(
                        "attempt to set a property on '{}', which is a {}",
                        path[..=i].join("."),
                        kind.label()
                    )));
                    Value::undefined_ref()
                } else {
                    next
                }
            }
            None => {
                let under_construction = current.borrow().kind.is_under_construction();
                if under_construction || permitted {
                    // stepping through `prototype` on a function is the
                    // upgrade moment, same as writing it directly
                    if name == "prototype" && current.borrow().kind == ValueKind::Function {
                        current.borrow_mut().set_kind(ValueKind::Constructor);
                    }
                    let created = current
                        .borrow_mut()
                        .properties
                        .entry(name.clone())
                        .or_insert_with(Value::object_ref)
                        .clone();
                    created
                } else {
                    notes.push(Note::warning(format!(
                        "attempt to set a property on '{}', which does not exist",
                        path[..=i].join(".")
                    )));
                    Value::undefined_ref()
                }
            }
        };
        current = next;
    }

    write_own_property(&current, last, new_value, notes);
}

/// Write a single own property, applying the reserved-key and
/// metadata-merge rules.
fn write_own_property(target: &ValueRef, name: &str, new_value: ValueRef, notes: &mut Vec<Note>) {
    // `prototype` on a function upgrades it to a constructor.
    if name == "prototype" {
        {
            let mut t = target.borrow_mut();
            if t.kind == ValueKind::Function {
                t.set_kind(ValueKind::Constructor);
            }
        }
        let is_ctor = target.borrow().kind == ValueKind::Constructor;
        let usable = matches!(
            new_value.borrow().kind,
            ValueKind::Object | ValueKind::Instance
        );
        if is_ctor && !usable {
            // only an object can hold members; keep (or scaffold) the
            // prototype object instead of storing the write
            target
                .borrow_mut()
                .properties
                .entry("prototype".to_string())
                .or_insert_with(Value::object_ref);
            if new_value.borrow().kind != ValueKind::Undefined {
                notes.push(Note::warning(
                    "ignoring non-object prototype assignment".to_string(),
                ));
            }
            return;
        }
    }

    let existing = target.borrow().properties.get(name).cloned();
    if let Some(old) = existing {
        if !Rc::ptr_eq(&old, &new_value) && old.borrow().kind != ValueKind::Undefined {
            notes.push(Note::info(format!("redefining existing property '{}'", name)));
        }
        // Keep annotations that attached to the earlier definition.
        let old_meta = old.borrow().metadata.clone();
        if !old_meta.is_empty() && !Rc::ptr_eq(&old, &new_value) {
            let mut merged = old_meta;
            merged.merge_from(&new_value.borrow().metadata);
            new_value.borrow_mut().metadata = merged;
        }
    }

    target
        .borrow_mut()
        .properties
        .insert(name.to_string(), new_value);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn get_property_walks_a_path() {
        let root = Value::object_ref();
        let inner = Value::object_ref();
        let leaf = Value::scalar_ref(ValueKind::Number, Scalar::Number(3.0));
        inner
            .borrow_mut()
            .properties
            .insert("b".to_string(), leaf.clone());
        root.borrow_mut()
            .properties
            .insert("a".to_string(), inner);

        let found = get_property(&root, &path(&["a", "b"])).expect("missing");
        assert!(Rc::ptr_eq(&found, &leaf));
        assert!(get_property(&root, &path(&["a", "x"])).is_none());
    }

    #[test]
    fn prototype_fallback_is_one_level_only() {
        let ctor = Value::new_ref(ValueKind::Function);
        let mut notes = Vec::new();
        set_property(
            &ctor,
            &path(&["prototype", "render"]),
            Value::new_ref(ValueKind::Function),
            false,
            &mut notes,
        );
        assert_eq!(ctor.borrow().kind, ValueKind::Constructor);

        // one level down: found through the prototype object
        assert!(get_own_or_prototype_property(&ctor, "render").is_some());

        // two levels (prototype-of-prototype) must not resolve
        let grand = Value::object_ref();
        grand
            .borrow_mut()
            .properties
            .insert("deep".to_string(), Value::undefined_ref());
        let proto = ctor.borrow().properties.get("prototype").cloned().unwrap();
        proto
            .borrow_mut()
            .properties
            .insert("prototype".to_string(), grand);
        assert!(get_own_or_prototype_property(&ctor, "deep").is_none());
    }

    #[test]
    fn writing_prototype_upgrades_function_once() {
        let f = Value::new_ref(ValueKind::Function);
        let mut notes = Vec::new();
        set_property(&f, &path(&["prototype"]), Value::undefined_ref(), false, &mut notes);
        assert_eq!(f.borrow().kind, ValueKind::Constructor);
        // the unresolved write keeps the scaffolded object
        let proto = f.borrow().properties.get("prototype").cloned().unwrap();
        assert_eq!(proto.borrow().kind, ValueKind::Object);

        // a constructor never downgrades
        assert!(!f.borrow_mut().set_kind(ValueKind::Object));
    }

    #[test]
    fn a_scalar_prototype_write_keeps_the_object() {
        let f = Value::new_ref(ValueKind::Function);
        let mut notes = Vec::new();
        set_property(
            &f,
            &path(&["prototype"]),
            Value::scalar_ref(ValueKind::String, Scalar::Str("oops".into())),
            false,
            &mut notes,
        );
        assert_eq!(f.borrow().kind, ValueKind::Constructor);
        let proto = f.borrow().properties.get("prototype").cloned().unwrap();
        assert_eq!(proto.borrow().kind, ValueKind::Object);
        assert!(notes.iter().any(|n| n.message.contains("prototype")));
    }

    #[test]
    fn vivification_requires_construction_or_permission() {
        let plain = Value::object_ref();
        let mut notes = Vec::new();
        set_property(
            &plain,
            &path(&["a", "b"]),
            Value::undefined_ref(),
            false,
            &mut notes,
        );
        assert!(plain.borrow().properties.get("a").is_none());
        assert_eq!(notes.len(), 1);

        notes.clear();
        set_property(
            &plain,
            &path(&["a", "b"]),
            Value::undefined_ref(),
            true,
            &mut notes,
        );
        assert!(notes.is_empty());
        assert!(get_property(&plain, &path(&["a", "b"])).is_some());
    }

    #[test]
    fn rewriting_a_property_merges_metadata() {
        let target = Value::object_ref();
        let first = Value::undefined_ref();
        first.borrow_mut().metadata.summary = Some("documented early".to_string());
        first.borrow_mut().metadata.tags.push("beta".to_string());
        let mut notes = Vec::new();
        set_property(&target, &path(&["x"]), first, false, &mut notes);

        let second = Value::scalar_ref(ValueKind::Number, Scalar::Number(1.0));
        second.borrow_mut().metadata.summary = Some("late summary".to_string());
        second.borrow_mut().metadata.tags.push("stable".to_string());
        set_property(&target, &path(&["x"]), second.clone(), false, &mut notes);

        let meta = second.borrow().metadata.clone();
        assert_eq!(meta.summary.as_deref(), Some("documented early"));
        assert_eq!(meta.tags, vec!["beta", "stable"]);
    }

    #[test]
    fn scalar_targets_are_unassignable() {
        let target = Value::object_ref();
        let mut notes = Vec::new();
        set_property(
            &target,
            &path(&["s"]),
            Value::scalar_ref(ValueKind::String, Scalar::Str("hi".into())),
            false,
            &mut notes,
        );
        notes.clear();
        set_property(
            &target,
            &path(&["s", "length", "weird"]),
            Value::undefined_ref(),
            true,
            &mut notes,
        );
        assert!(notes.iter().any(|n| n.message.contains("which is a string")));
    }
}
