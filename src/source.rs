/// Source tree providers and module id resolution.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::ast::Node;

/// Fold a possibly-relative module id against the id of the module that
/// requested it. Absolute ids pass through untouched.
pub fn resolve_relative_id(id: &str, requester: &str) -> String {
    if !id.starts_with("./") && !id.starts_with("../") {
        return id.to_string();
    }

    let mut segments: Vec<&str> = requester.split('/').collect();
    segments.pop(); // drop the requester's own name

    for part in id.split('/') {
        match part {
            "." | "" => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Derive a canonical module id from a file path beneath a source root.
pub fn module_id_from_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let without_ext = relative.with_extension("");
    let id = without_ext
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

/// Where module syntax trees come from.
pub trait SourceProvider {
    /// Canonicalize a requested id in the context of the requesting module.
    fn resolve_id(&self, id: &str, requester: &str) -> String {
        resolve_relative_id(id, requester)
    }

    /// Human-readable origin for diagnostics (a filename, usually).
    fn origin(&self, id: &str) -> Option<String>;

    /// The parsed tree for a canonical id, if this provider has it.
    fn tree_for(&self, id: &str) -> Option<Rc<Node>>;
}

/// In-memory provider, for embedding and tests.
#[derive(Default)]
pub struct MemorySource {
    trees: HashMap<String, Rc<Node>>,
}

impl MemorySource {
    pub fn new() -> MemorySource {
        MemorySource::default()
    }

    pub fn insert(&mut self, id: &str, tree: Node) {
        self.trees.insert(id.to_string(), Rc::new(tree));
    }
}

impl SourceProvider for MemorySource {
    fn origin(&self, id: &str) -> Option<String> {
        self.trees.get(id).map(|_| format!("{}.js", id))
    }

    fn tree_for(&self, id: &str) -> Option<Rc<Node>> {
        self.trees.get(id).cloned()
    }
}

/// Provider that maps module ids to pre-parsed trees stored as JSON files
/// under a root directory: module `a/b` lives at `<root>/a/b.json`.
pub struct JsonSource {
    root: PathBuf,
}

impl JsonSource {
    pub fn new(root: impl Into<PathBuf>) -> JsonSource {
        JsonSource { root: root.into() }
    }

    fn path_for(&self, id: &str) -> PathBuf {
        let mut path = self.root.clone();
        for segment in id.split('/') {
            path.push(segment);
        }
        path.set_extension("json");
        path
    }
}

impl SourceProvider for JsonSource {
    fn origin(&self, id: &str) -> Option<String> {
        let path = self.path_for(id);
        if path.exists() {
            Some(path.display().to_string())
        } else {
            None
        }
    }

    fn tree_for(&self, id: &str) -> Option<Rc<Node>> {
        let path = self.path_for(id);
        let text = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<Node>(&text) {
            Ok(tree) => Some(Rc::new(tree)),
            Err(err) => {
                tracing::warn!(file = %path.display(), %err, "unparseable source tree");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_ids_pass_through() {
        assert_eq!(resolve_relative_id("dojo/query", "app/main"), "dojo/query");
    }

    #[test]
    fn relative_ids_fold_against_the_requester() {
        assert_eq!(resolve_relative_id("./store", "app/main"), "app/store");
        assert_eq!(resolve_relative_id("../util/io", "app/sub/main"), "app/util/io");
        assert_eq!(resolve_relative_id("../../top", "a/b/c/d"), "a/top");
    }

    #[test]
    fn ids_derive_from_paths_under_the_root() {
        let root = Path::new("/src");
        assert_eq!(
            module_id_from_path(root, Path::new("/src/app/main.json")),
            Some("app/main".to_string())
        );
        assert_eq!(module_id_from_path(root, Path::new("/elsewhere/x.json")), None);
    }
}
