use std::collections::{BTreeMap, BTreeSet};

use spliceasm_nodes::{Export, Import, Module, NodePath, Span};

use crate::rules::NewEntry;

/// A pending replacement for a name field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FieldEdit {
    pub(crate) section: usize,
    pub(crate) value: String,
}

/// Everything the visitors asked for during one traversal.
#[derive(Debug, Default)]
pub(crate) struct Staged {
    pub(crate) removed: BTreeSet<NodePath>,
    /// Keyed by the span of the field being replaced.
    pub(crate) fields: BTreeMap<Span, FieldEdit>,
    pub(crate) inserts: Vec<NewEntry>,
}

/// The handle a visitor receives for each node it was registered for.
///
/// Nothing a visitor does touches the module; every call stages an edit that becomes part of the
/// resulting plan.
pub struct Visit<'v, T> {
    node: &'v T,
    path: NodePath,
    index: Option<u32>,
    module: &'v Module,
    staged: &'v mut Staged,
}

impl<'v, T> Visit<'v, T> {
    pub(crate) fn new(
        node: &'v T,
        path: NodePath,
        index: Option<u32>,
        module: &'v Module,
        staged: &'v mut Staged,
    ) -> Self {
        Self {
            node,
            path,
            index,
            module,
            staged,
        }
    }

    pub fn node(&self) -> &T {
        self.node
    }

    pub fn path(&self) -> NodePath {
        self.path
    }

    /// Position of the node in its index space, for types, imports and functions.
    pub fn index(&self) -> Option<u32> {
        self.index
    }

    pub fn module(&self) -> &Module {
        self.module
    }

    /// Removes the node. Field edits made on it are discarded.
    pub fn remove(&mut self) {
        self.staged.removed.insert(self.path);
    }

    pub fn is_removed(&self) -> bool {
        self.staged.removed.contains(&self.path)
    }

    /// Queues a new entry, appended to the end of its section.
    pub fn insert(&mut self, entry: NewEntry) {
        self.staged.inserts.push(entry);
    }

    fn staged_field<'s>(&'s self, span: &Span, original: &'s str) -> &'s str {
        self.staged
            .fields
            .get(span)
            .map(|xs| xs.value.as_str())
            .unwrap_or(original)
    }

    fn stage_field(&mut self, span: Span, value: String) {
        let section = self.path.section;
        self.staged.fields.insert(span, FieldEdit { section, value });
    }
}

impl Visit<'_, Export> {
    /// The export name, including any rename staged earlier in this traversal.
    pub fn name(&self) -> &str {
        self.staged_field(&self.node.name.span, self.node.name.as_str())
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.stage_field(self.node.name.span, name.into());
    }
}

impl Visit<'_, Import> {
    pub fn module_name(&self) -> &str {
        self.staged_field(&self.node.module.span, self.node.module.as_str())
    }

    pub fn field(&self) -> &str {
        self.staged_field(&self.node.field.span, self.node.field.as_str())
    }

    pub fn set_module(&mut self, module: impl Into<String>) {
        self.stage_field(self.node.module.span, module.into());
    }

    pub fn set_field(&mut self, field: impl Into<String>) {
        self.stage_field(self.node.field.span, field.into());
    }
}
