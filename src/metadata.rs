/// Human-authored documentation attached to values.
///
/// The extractor never invents metadata; it only stores what the
/// doc-comment collaborator hands over and merges competing writes.
use serde::Serialize;

use crate::ast::Node;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metadata {
    /// A brief summary of the associated value.
    pub summary: Option<String>,
    /// A detailed description of the associated value.
    pub description: Option<String>,
    /// A more detailed value type description.
    pub type_label: Option<String>,
    /// Code examples.
    pub examples: Vec<String>,
    /// Tags.
    pub tags: Vec<String>,
}

impl Metadata {
    pub fn is_empty(&self) -> bool {
        self.summary.is_none()
            && self.description.is_none()
            && self.type_label.is_none()
            && self.examples.is_empty()
            && self.tags.is_empty()
    }

    /// Merge another metadata record into this one: the first writer wins
    /// per scalar field, array fields concatenate. Documentation often
    /// attaches before the "real" definition is seen, so later writes must
    /// not discard earlier annotations.
    pub fn merge_from(&mut self, other: &Metadata) {
        if self.summary.is_none() {
            self.summary = other.summary.clone();
        }
        if self.description.is_none() {
            self.description = other.description.clone();
        }
        if self.type_label.is_none() {
            self.type_label = other.type_label.clone();
        }
        self.examples.extend(other.examples.iter().cloned());
        self.tags.extend(other.tags.iter().cloned());
    }
}

/// The doc-comment collaborator. Given a value's originating node and its
/// nearest enclosing structural node, produce the metadata to merge in.
pub trait DocSource {
    fn metadata_for(&self, node: &Node, enclosing: Option<&Node>) -> Option<Metadata>;
}
