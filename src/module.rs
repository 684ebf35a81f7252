/// Module registry and dependency graph.
use std::cell::RefCell;
use std::collections::{BTreeMap, HashSet};
use std::rc::Rc;

use crate::diagnostics::ExtractError;
use crate::value::ValueRef;

pub type ModuleRef = Rc<RefCell<Module>>;

#[derive(Debug)]
pub struct Module {
    /// Canonical id, unique across the run.
    pub id: String,
    /// Filename the module was read from, when it came from a file.
    pub origin: Option<String>,
    /// The exported value.
    pub value: ValueRef,
    /// Canonical ids this module requested.
    pub dependencies: Vec<String>,
    /// Canonical ids of modules that requested this one.
    pub reverse_dependencies: Vec<String>,
}

/// All modules discovered so far, plus the set currently mid-load. A module
/// whose id is in the loading set has been entered but not finished; a
/// request for it is a dependency cycle.
#[derive(Debug, Default)]
pub struct ModuleGraph {
    modules: BTreeMap<String, ModuleRef>,
    loading: HashSet<String>,
}

impl ModuleGraph {
    pub fn new() -> ModuleGraph {
        ModuleGraph::default()
    }

    /// Register a new module under its canonical id. Two definitions of the
    /// same id cannot be reconciled, so the second is fatal.
    pub fn create(
        &mut self,
        id: &str,
        origin: Option<String>,
        value: ValueRef,
    ) -> Result<ModuleRef, ExtractError> {
        if self.modules.contains_key(id) {
            return Err(ExtractError::DuplicateModule(id.to_string()));
        }
        let module = Rc::new(RefCell::new(Module {
            id: id.to_string(),
            origin,
            value,
            dependencies: Vec::new(),
            reverse_dependencies: Vec::new(),
        }));
        self.modules.insert(id.to_string(), module.clone());
        Ok(module)
    }

    pub fn get(&self, id: &str) -> Option<ModuleRef> {
        self.modules.get(id).cloned()
    }

    pub fn is_loading(&self, id: &str) -> bool {
        self.loading.contains(id)
    }

    pub fn begin_load(&mut self, id: &str) {
        self.loading.insert(id.to_string());
    }

    pub fn finish_load(&mut self, id: &str) {
        self.loading.remove(id);
    }

    /// Record a dependency edge in both directions. Edges are stored as ids
    /// rather than module references so the graph stays acyclic in memory.
    pub fn link(&mut self, module_id: &str, dep_id: &str) {
        if let Some(module) = self.modules.get(module_id) {
            let mut m = module.borrow_mut();
            if !m.dependencies.iter().any(|d| d == dep_id) {
                m.dependencies.push(dep_id.to_string());
            }
        }
        if let Some(dep) = self.modules.get(dep_id) {
            let mut d = dep.borrow_mut();
            if !d.reverse_dependencies.iter().any(|r| r == module_id) {
                d.reverse_dependencies.push(module_id.to_string());
            }
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModuleRef)> {
        self.modules.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn duplicate_ids_are_fatal() {
        let mut graph = ModuleGraph::new();
        graph.create("a/b", None, Value::object_ref()).unwrap();
        let err = graph.create("a/b", None, Value::object_ref());
        assert!(matches!(err, Err(ExtractError::DuplicateModule(id)) if id == "a/b"));
    }

    #[test]
    fn linking_records_both_directions_once() {
        let mut graph = ModuleGraph::new();
        graph.create("app", None, Value::object_ref()).unwrap();
        graph.create("dep", None, Value::object_ref()).unwrap();
        graph.link("app", "dep");
        graph.link("app", "dep");

        let app = graph.get("app").unwrap();
        let dep = graph.get("dep").unwrap();
        assert_eq!(app.borrow().dependencies, vec!["dep"]);
        assert_eq!(dep.borrow().reverse_dependencies, vec!["app"]);
    }

    #[test]
    fn loading_set_tracks_in_flight_modules() {
        let mut graph = ModuleGraph::new();
        graph.begin_load("x");
        assert!(graph.is_loading("x"));
        graph.finish_load("x");
        assert!(!graph.is_loading("x"));
    }
}
