/// JSON rendering of the extracted graph.
///
/// Values form a general graph (composition and self-reference are
/// common), so rendering tracks the pointers on the current path and cuts
/// cycles with a marker instead of recursing.
use std::collections::HashSet;
use std::rc::Rc;

use serde_json::{json, Map, Value as Json};

use crate::diagnostics::Diagnostic;
use crate::module::ModuleGraph;
use crate::value::{Scalar, ValueRef};

const MAX_RENDER_DEPTH: usize = 64;

pub fn report_to_json(graph: &ModuleGraph, diagnostics: &[Diagnostic]) -> Json {
    let mut modules = Map::new();
    for (id, module) in graph.iter() {
        let module = module.borrow();
        let mut on_path = HashSet::new();
        modules.insert(
            id.to_string(),
            json!({
                "origin": module.origin,
                "dependencies": module.dependencies,
                "reverseDependencies": module.reverse_dependencies,
                "value": value_to_json(&module.value, &mut on_path, 0),
            }),
        );
    }
    json!({
        "modules": Json::Object(modules),
        "diagnostics": diagnostics,
    })
}

pub fn value_to_json(value: &ValueRef, on_path: &mut HashSet<usize>, depth: usize) -> Json {
    let ptr = Rc::as_ptr(value) as usize;
    let v = value.borrow();
    if depth > MAX_RENDER_DEPTH || !on_path.insert(ptr) {
        return json!({ "kind": v.kind.label(), "circular": true });
    }

    let mut out = Map::new();
    out.insert("kind".to_string(), json!(v.kind.label()));
    if let Some(scalar) = &v.scalar {
        let rendered = match scalar {
            Scalar::Bool(b) => json!(b),
            Scalar::Number(n) => json!(n),
            Scalar::Str(s) => json!(s),
            Scalar::RegExp(r) => json!({ "regexp": r }),
        };
        out.insert("value".to_string(), rendered);
    }
    if let Some(origin) = &v.origin {
        out.insert("origin".to_string(), json!(origin));
    }
    if !v.metadata.is_empty() {
        if let Ok(meta) = serde_json::to_value(&v.metadata) {
            out.insert("metadata".to_string(), meta);
        }
    }
    if !v.parameters.is_empty() {
        if let Ok(parameters) = serde_json::to_value(&v.parameters) {
            out.insert("parameters".to_string(), parameters);
        }
    }
    if !v.elements.is_empty() {
        let elements: Vec<Json> = v
            .elements
            .iter()
            .map(|e| value_to_json(e, on_path, depth + 1))
            .collect();
        out.insert("elements".to_string(), json!(elements));
    }
    if !v.properties.is_empty() {
        let mut properties = Map::new();
        for (key, property) in &v.properties {
            properties.insert(key.clone(), value_to_json(property, on_path, depth + 1));
        }
        out.insert("properties".to_string(), Json::Object(properties));
    }
    if !v.returns.is_empty() {
        let returns: Vec<Json> = v
            .returns
            .iter()
            .map(|r| value_to_json(r, on_path, depth + 1))
            .collect();
        out.insert("returns".to_string(), json!(returns));
    }
    if !v.throws.is_empty() {
        let throws: Vec<Json> = v
            .throws
            .iter()
            .map(|t| value_to_json(t, on_path, depth + 1))
            .collect();
        out.insert("throws".to_string(), json!(throws));
    }
    if !v.mixins.is_empty() {
        let mixins: Vec<Json> = v
            .mixins
            .iter()
            .map(|m| value_to_json(m, on_path, depth + 1))
            .collect();
        out.insert("mixins".to_string(), json!(mixins));
    }
    if let Some(instance_of) = &v.instance_of {
        out.insert(
            "instanceOf".to_string(),
            value_to_json(instance_of, on_path, depth + 1),
        );
    }

    on_path.remove(&ptr);
    Json::Object(out)
}
