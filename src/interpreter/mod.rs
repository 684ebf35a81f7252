/// The symbolic interpreter.
///
/// Nothing is executed: the interpreter replays declarations, assignments
/// and calls over the syntax tree, visiting every branch, and records what
/// the program would have defined. Call handlers hook well-known functions
/// (module definition, composition) to give their calls meaning.
mod env;
mod eval;
mod exec;

pub use env::WellKnown;
pub use eval::Evaluated;

use std::collections::HashSet;
use std::rc::Rc;

use crate::ast::Span;
use crate::diagnostics::{Diagnostic, ExtractError, Note, Severity};
use crate::handlers::{CallHandlers, CallSite};
use crate::metadata::DocSource;
use crate::module::{ModuleGraph, ModuleRef};
use crate::scope::ScopeRef;
use crate::source::SourceProvider;
use crate::value::{Value, ValueKind, ValueRef};

const DEFAULT_MAX_DEPTH: usize = 200;

/// The file currently being read.
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub module_id: String,
    pub filename: String,
}

/// Environment snapshot taken when crossing into another file.
struct SavedState {
    file: Option<FileInfo>,
    scope: ScopeRef,
    function_scope: ScopeRef,
}

pub struct Interpreter {
    pub graph: ModuleGraph,
    pub diagnostics: Vec<Diagnostic>,
    global: ScopeRef,
    scope: ScopeRef,
    function_scope: ScopeRef,
    file: Option<FileInfo>,
    states: Vec<SavedState>,
    handlers: Rc<CallHandlers>,
    provider: Box<dyn SourceProvider>,
    docs: Option<Box<dyn DocSource>>,
    read_files: HashSet<String>,
    well_known: WellKnown,
    depth: usize,
    max_depth: usize,
}

impl Interpreter {
    pub fn new(provider: Box<dyn SourceProvider>) -> Interpreter {
        let (global, well_known) = env::seed_global();
        let handlers = Rc::new(CallHandlers::standard(&well_known));
        Interpreter {
            graph: ModuleGraph::new(),
            diagnostics: Vec::new(),
            scope: global.clone(),
            function_scope: global.clone(),
            global,
            file: None,
            states: Vec::new(),
            handlers,
            provider,
            docs: None,
            read_files: HashSet::new(),
            well_known,
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_docs(mut self, docs: Box<dyn DocSource>) -> Interpreter {
        self.docs = Some(docs);
        self
    }

    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth;
    }

    /// Replace the handler registry. Standard handlers are installed by
    /// default; embedders add their own on top of `CallHandlers::standard`.
    pub fn set_handlers(&mut self, handlers: CallHandlers) {
        self.handlers = Rc::new(handlers);
    }

    pub fn well_known(&self) -> &WellKnown {
        &self.well_known
    }

    pub fn current_module_id(&self) -> Option<&str> {
        self.file.as_ref().map(|f| f.module_id.as_str())
    }

    /// Read one entry-point module (and, transitively, everything it
    /// requests). Re-running an already-read id is a no-op.
    pub fn run(&mut self, id: &str) -> Result<(), ExtractError> {
        if self.read_files.contains(id) {
            return Ok(());
        }
        let tree = self
            .provider
            .tree_for(id)
            .ok_or_else(|| ExtractError::MissingSource(id.to_string()))?;
        self.load_file(id, &tree)
    }

    /// Read a file in a fresh environment, tracking it as in-flight for
    /// cycle detection.
    fn load_file(&mut self, id: &str, tree: &crate::ast::Node) -> Result<(), ExtractError> {
        tracing::debug!(module = id, "reading module source");
        self.read_files.insert(id.to_string());
        self.graph.begin_load(id);
        self.push_state();
        self.file = Some(FileInfo {
            module_id: id.to_string(),
            filename: self
                .provider
                .origin(id)
                .unwrap_or_else(|| format!("{}.js", id)),
        });
        let result = self.read_statement(tree);
        self.pop_state()?;
        self.graph.finish_load(id);
        result
    }

    /// Make a dependency's module available, loading it on demand.
    ///
    /// Returns `None` (with a diagnostic) when the dependency cannot be
    /// satisfied: a cycle back into an in-flight module, a missing source,
    /// or a source that never registered a definition. The in-flight check
    /// runs first so a cycle is reported even when the module has already
    /// been entered into the graph.
    pub fn ensure_module(&mut self, canonical: &str) -> Result<Option<ModuleRef>, ExtractError> {
        if self.graph.is_loading(canonical) {
            self.diag(
                Severity::Warning,
                format!("circular dependency on module '{}'", canonical),
                None,
            );
            return Ok(None);
        }
        if let Some(module) = self.graph.get(canonical) {
            return Ok(Some(module));
        }
        if self.read_files.contains(canonical) {
            self.diag(
                Severity::Warning,
                format!("module '{}' did not register a definition", canonical),
                None,
            );
            return Ok(None);
        }
        let tree = match self.provider.tree_for(canonical) {
            Some(tree) => tree,
            None => {
                self.diag(
                    Severity::Warning,
                    format!("missing dependency '{}'", canonical),
                    None,
                );
                return Ok(None);
            }
        };
        self.load_file(canonical, &tree)?;
        match self.graph.get(canonical) {
            Some(module) => Ok(Some(module)),
            None => {
                self.diag(
                    Severity::Warning,
                    format!("module '{}' did not register a definition", canonical),
                    None,
                );
                Ok(None)
            }
        }
    }

    /// Canonicalize a dependency id relative to the current module.
    pub fn resolve_id(&self, id: &str) -> String {
        let requester = self.current_module_id().unwrap_or("");
        self.provider.resolve_id(id, requester)
    }

    /// Run the first handler that recognizes this call site. `None` means
    /// no handler claimed the call.
    fn dispatch_call(&mut self, site: &CallSite) -> Result<Option<ValueRef>, ExtractError> {
        let handlers = Rc::clone(&self.handlers);
        for handler in handlers.iter() {
            if handler
                .recognizer
                .matches(site, &self.graph, self.current_module_id())
            {
                tracing::debug!(handler = handler.name, "dispatching call");
                return (handler.action)(self, site);
            }
        }
        Ok(None)
    }

    /// A fresh value stamped with the current module as its origin.
    pub fn fresh(&self, kind: ValueKind) -> ValueRef {
        let value = Value::new_ref(kind);
        value.borrow_mut().origin = self.current_module_id().map(str::to_string);
        value
    }

    pub fn diag(&mut self, severity: Severity, message: impl Into<String>, span: Option<Span>) {
        self.diagnostics.push(Diagnostic {
            severity,
            message: message.into(),
            file: self.file.as_ref().map(|f| f.filename.clone()),
            span,
        });
    }

    /// Stamp file-agnostic notes with the current file and position.
    pub(crate) fn stamp(&mut self, notes: Vec<Note>, span: Span) {
        for note in notes {
            self.diag(note.severity, note.message, Some(span));
        }
    }

    pub(crate) fn current_file(&self) -> String {
        self.file
            .as_ref()
            .map(|f| f.filename.clone())
            .unwrap_or_else(|| "<input>".to_string())
    }
}
