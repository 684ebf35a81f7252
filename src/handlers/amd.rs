/// Module definition and requirement.
use crate::diagnostics::{ExtractError, Severity};
use crate::interpreter::Interpreter;
use crate::value::{Value, ValueKind, ValueRef};

use super::{scalar_string, CallSite};

/// `define([id], [dependencies], factory)`.
///
/// Arguments are laid out from the end: the factory is always last, the
/// dependency list second-to-last, the explicit id third-to-last. A lone
/// string before the factory is an id, not a dependency list.
pub fn register_module(
    interp: &mut Interpreter,
    site: &CallSite,
) -> Result<Option<ValueRef>, ExtractError> {
    let args = &site.args;
    let (id_arg, deps_arg, factory) = match args.len() {
        0 => {
            interp.diag(
                Severity::Warning,
                "module defined without a factory",
                Some(site.span),
            );
            return Ok(None);
        }
        1 => (None, None, &args[0]),
        2 => {
            if scalar_string(&args[0]).is_some() {
                (Some(&args[0]), None, &args[1])
            } else {
                (None, Some(&args[0]), &args[1])
            }
        }
        n => (Some(&args[n - 3]), Some(&args[n - 2]), &args[n - 1]),
    };

    let id = match id_arg.and_then(scalar_string) {
        Some(explicit) => explicit,
        None => match interp.current_module_id() {
            Some(current) => current.to_string(),
            None => {
                interp.diag(
                    Severity::Warning,
                    "module defined outside a file has no id",
                    Some(site.span),
                );
                return Ok(None);
            }
        },
    };

    // register before touching dependencies so a cycle back here is
    // observable as in-flight
    let origin = interp.current_file();
    let module = interp
        .graph
        .create(&id, Some(origin), Value::undefined_ref())?;

    let dep_names: Vec<ValueRef> = match deps_arg {
        Some(deps) => deps.borrow().elements.clone(),
        None => Vec::new(),
    };

    let mut exports: Option<ValueRef> = None;
    let mut dep_values = Vec::with_capacity(dep_names.len());
    for dep in &dep_names {
        dep_values.push(resolve_dependency(interp, &id, dep, site, &mut exports)?);
    }

    let factory_kind = factory.borrow().kind;
    let value = match factory_kind {
        ValueKind::Function | ValueKind::Constructor => {
            let returns = interp.call_function(factory, &dep_values)?;
            exports
                .or_else(|| returns.first().cloned())
                .unwrap_or_else(|| interp.fresh(ValueKind::Undefined))
        }
        // define({...}) and other direct-value forms
        _ => factory.clone(),
    };

    module.borrow_mut().value = value;
    tracing::debug!(module = %id, "registered module");
    Ok(None)
}

fn resolve_dependency(
    interp: &mut Interpreter,
    module_id: &str,
    dep: &ValueRef,
    site: &CallSite,
    exports: &mut Option<ValueRef>,
) -> Result<ValueRef, ExtractError> {
    let name = match scalar_string(dep) {
        Some(name) => name,
        None => {
            interp.diag(
                Severity::Warning,
                "dependency id is not a string",
                Some(site.span),
            );
            return Ok(interp.fresh(ValueKind::Undefined));
        }
    };

    match name.as_str() {
        "require" => return Ok(interp.well_known().require.clone()),
        "module" => return Ok(interp.fresh(ValueKind::Object)),
        "exports" => {
            let object = interp.fresh(ValueKind::Object);
            *exports = Some(object.clone());
            return Ok(object);
        }
        _ => {}
    }

    if name.contains('!') {
        interp.diag(
            Severity::Warning,
            format!("plugin dependency '{}' is not analyzable", name),
            Some(site.span),
        );
        return Ok(interp.fresh(ValueKind::Undefined));
    }

    let canonical = interp.resolve_id(&name);
    match interp.ensure_module(&canonical)? {
        Some(dependency) => {
            interp.graph.link(module_id, &canonical);
            let value = dependency.borrow().value.clone();
            Ok(value)
        }
        None => Ok(interp.fresh(ValueKind::Undefined)),
    }
}

/// `require(dependencies...)`: load the named modules without binding
/// their values anywhere.
pub fn require_modules(
    interp: &mut Interpreter,
    site: &CallSite,
) -> Result<Option<ValueRef>, ExtractError> {
    let requester = interp.current_module_id().map(str::to_string);
    for arg in &site.args {
        // require(["a", "b"], callback) and require("a") both appear
        let names: Vec<ValueRef> = if arg.borrow().kind == ValueKind::Array {
            arg.borrow().elements.clone()
        } else {
            vec![arg.clone()]
        };
        for dep in names {
            let name = match scalar_string(&dep) {
                Some(name) if !name.contains('!') => name,
                _ => continue,
            };
            let canonical = interp.resolve_id(&name);
            if let Some(_module) = interp.ensure_module(&canonical)? {
                if let Some(requester) = &requester {
                    interp.graph.link(requester, &canonical);
                }
            }
        }
    }
    Ok(None)
}
