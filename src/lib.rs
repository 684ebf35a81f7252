//! Static API documentation extractor for AMD-style JavaScript modules.
//!
//! The extractor walks pre-parsed syntax trees without executing them: it
//! replays declarations, assignments and module definitions symbolically,
//! visiting every branch, and produces a graph of modules, their exported
//! values and the diagnostics gathered along the way.

pub mod ast;
pub mod diagnostics;
pub mod handlers;
pub mod interpreter;
pub mod metadata;
pub mod module;
pub mod report;
pub mod scope;
pub mod source;
pub mod value;

pub use diagnostics::{Diagnostic, ExtractError, Severity};
pub use interpreter::Interpreter;
pub use source::{JsonSource, MemorySource, SourceProvider};
