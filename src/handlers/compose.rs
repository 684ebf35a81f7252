/// Prototype composition: class-like declaration, mixin and extension.
use crate::diagnostics::{ExtractError, Severity};
use crate::interpreter::Interpreter;
use crate::scope::Scope;
use crate::value::{self, ValueKind, ValueRef};

use super::{scalar_string, CallSite};

/// `compose([name], bases..., members)`.
///
/// Builds a constructor whose prototype carries the declared members, is
/// chained to the first base for inherited lookups, and absorbs the own
/// prototype members of every further base. A string name binds the
/// constructor globally (dots create the intermediate namespaces).
pub fn compose(
    interp: &mut Interpreter,
    site: &CallSite,
) -> Result<Option<ValueRef>, ExtractError> {
    let mut args = site.args.as_slice();
    let mut name = None;
    if let Some(first) = args.first() {
        if let Some(s) = scalar_string(first) {
            name = Some(s);
            args = &args[1..];
        }
    }
    if args.is_empty() {
        interp.diag(
            Severity::Warning,
            "composition with no bases or members",
            Some(site.span),
        );
        return Ok(Some(interp.fresh(ValueKind::Undefined)));
    }

    let (base_args, members) = match args.last() {
        Some(last) if last.borrow().kind == ValueKind::Object => {
            (&args[..args.len() - 1], Some(last.clone()))
        }
        _ => (args, None),
    };

    let mut bases = Vec::new();
    for arg in base_args {
        let kind = arg.borrow().kind;
        match kind {
            ValueKind::Null | ValueKind::Undefined => {}
            ValueKind::Array => bases.extend(arg.borrow().elements.iter().cloned()),
            _ => bases.push(arg.clone()),
        }
    }

    let ctor = interp.fresh(ValueKind::Constructor);
    // the prototype of a derived constructor is an instance of the first
    // base, which is what makes inherited members resolvable
    let proto = match bases.first() {
        Some(base) => {
            let proto = interp.fresh(ValueKind::Instance);
            proto.borrow_mut().instance_of = Some(base.clone());
            proto
        }
        None => interp.fresh(ValueKind::Object),
    };
    ctor.borrow_mut()
        .properties
        .insert("prototype".to_string(), proto.clone());
    ctor.borrow_mut().mixins = bases.clone();

    let mut notes = Vec::new();

    // declared members win over anything inherited
    if let Some(members) = &members {
        let entries: Vec<(String, ValueRef)> = members
            .borrow()
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (key, member) in entries {
            if key == "constructor" && member.borrow().is_function_like() {
                let parameters = member.borrow().parameters.clone();
                ctor.borrow_mut().parameters = parameters;
            }
            value::set_property(&proto, std::slice::from_ref(&key), member, true, &mut notes);
        }
        let metadata = members.borrow().metadata.clone();
        ctor.borrow_mut().metadata.merge_from(&metadata);
    }

    // further bases flatten their own prototype members in, without
    // overriding
    for base in bases.iter().skip(1) {
        let base_proto = base.borrow().properties.get("prototype").cloned();
        let base_proto = match base_proto {
            Some(p) => p,
            None => continue,
        };
        let entries: Vec<(String, ValueRef)> = base_proto
            .borrow()
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (key, member) in entries {
            let already = proto.borrow().properties.contains_key(&key);
            if !already {
                proto.borrow_mut().properties.insert(key, member);
            }
        }
    }

    if let Some(name) = name {
        let path: Vec<String> = name.split('.').map(str::to_string).collect();
        let global = interp.global_scope();
        if path.len() == 1 {
            Scope::declare(&global, &path[0], Some(ctor.clone()), &mut notes);
        } else {
            // the namespace root is a declaration, not an implicit global
            if Scope::lookup(&global, &path[0]).is_none() {
                Scope::declare(&global, &path[0], Some(value::Value::object_ref()), &mut notes);
            }
            let _ = Scope::assign(&global, &global, &path, ctor.clone(), true, &mut notes);
        }
    }

    interp.stamp(notes, site.span);
    Ok(Some(ctor))
}

/// `mixin(target, sources...)`: copy each source's own properties onto
/// the target, later sources overriding earlier ones.
pub fn mixin(
    interp: &mut Interpreter,
    site: &CallSite,
) -> Result<Option<ValueRef>, ExtractError> {
    let target = match site.args.first() {
        Some(target) => target.clone(),
        None => {
            interp.diag(Severity::Warning, "mixin without a target", Some(site.span));
            return Ok(Some(interp.fresh(ValueKind::Undefined)));
        }
    };

    let mut notes = Vec::new();
    for source in &site.args[1..] {
        copy_own_properties(source, &target, &mut notes);
    }
    interp.stamp(notes, site.span);
    Ok(Some(target))
}

/// `extend(target, sources...)`: like mixin, but the properties land on
/// the target's prototype. Extending a function proves it is a
/// constructor; extending a plain object degrades to a mixin.
pub fn extend(
    interp: &mut Interpreter,
    site: &CallSite,
) -> Result<Option<ValueRef>, ExtractError> {
    let target = match site.args.first() {
        Some(target) => target.clone(),
        None => {
            interp.diag(Severity::Warning, "extend without a target", Some(site.span));
            return Ok(Some(interp.fresh(ValueKind::Undefined)));
        }
    };

    let mut notes = Vec::new();
    let destination = if target.borrow().is_function_like() {
        target.borrow_mut().set_kind(ValueKind::Constructor);
        target
            .borrow_mut()
            .properties
            .entry("prototype".to_string())
            .or_insert_with(crate::value::Value::object_ref)
            .clone()
    } else {
        interp.diag(
            Severity::Info,
            "extending a non-function target in place",
            Some(site.span),
        );
        target.clone()
    };

    for source in &site.args[1..] {
        copy_own_properties(source, &destination, &mut notes);
    }
    interp.stamp(notes, site.span);
    Ok(Some(target))
}

fn copy_own_properties(
    source: &ValueRef,
    target: &ValueRef,
    notes: &mut Vec<crate::diagnostics::Note>,
) {
    let entries: Vec<(String, ValueRef)> = source
        .borrow()
        .properties
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    for (key, member) in entries {
        value::set_property(target, std::slice::from_ref(&key), member, true, notes);
    }
}
