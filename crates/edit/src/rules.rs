use spliceasm_nodes::{
    EditPlan, Export, ExportDesc, FuncEntry, FuncType, Import, IndexSpace, Local, Module,
    NodeKind, NodePath, SectionContent, StartDirective, TypeEntry, TypeIdx,
};

use crate::{
    planner,
    visit::{Staged, Visit},
    EditError,
};

/// An entry to append to the end of its section. Indices are given in the module's numbering
/// *before* the edit and are renumbered along with everything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewEntry {
    Type(FuncType),
    /// Adds a function section entry and a matching code entry. `body` is the raw instruction
    /// sequence including its final `end`; it is copied as-is.
    Func {
        type_idx: TypeIdx,
        locals: Vec<Local>,
        body: Vec<u8>,
    },
    Export {
        name: String,
        desc: ExportDesc,
    },
}

impl NewEntry {
    pub fn kind(&self) -> NodeKind {
        match self {
            NewEntry::Type(_) => NodeKind::Type,
            NewEntry::Func { .. } => NodeKind::Func,
            NewEntry::Export { .. } => NodeKind::Export,
        }
    }
}

type Visitor<'r, T> = Box<dyn FnMut(&mut Visit<'_, T>) + 'r>;

/// A set of edit rules: at most one visitor per node kind plus entries to insert.
///
/// ```ignore
/// let mut rules = Rules::new().on_export(|export| {
///     let name = format!("{}!!", export.name());
///     export.set_name(name);
/// });
/// let plan = rules.apply(&module)?;
/// ```
#[derive(Default)]
pub struct Rules<'r> {
    on_type: Option<Visitor<'r, TypeEntry>>,
    on_import: Option<Visitor<'r, Import>>,
    on_func: Option<Visitor<'r, FuncEntry>>,
    on_export: Option<Visitor<'r, Export>>,
    on_start: Option<Visitor<'r, StartDirective>>,
    inserts: Vec<NewEntry>,
}

impl<'r> Rules<'r> {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn on_type(mut self, visitor: impl FnMut(&mut Visit<'_, TypeEntry>) + 'r) -> Self {
        self.on_type = Some(Box::new(visitor));
        self
    }

    pub fn on_import(mut self, visitor: impl FnMut(&mut Visit<'_, Import>) + 'r) -> Self {
        self.on_import = Some(Box::new(visitor));
        self
    }

    pub fn on_func(mut self, visitor: impl FnMut(&mut Visit<'_, FuncEntry>) + 'r) -> Self {
        self.on_func = Some(Box::new(visitor));
        self
    }

    pub fn on_export(mut self, visitor: impl FnMut(&mut Visit<'_, Export>) + 'r) -> Self {
        self.on_export = Some(Box::new(visitor));
        self
    }

    pub fn on_start(mut self, visitor: impl FnMut(&mut Visit<'_, StartDirective>) + 'r) -> Self {
        self.on_start = Some(Box::new(visitor));
        self
    }

    /// Queues an insertion that does not depend on any visited node.
    pub fn insert(mut self, entry: NewEntry) -> Self {
        self.inserts.push(entry);
        self
    }

    /// Node kinds with a registered visitor.
    pub fn kinds(&self) -> Vec<NodeKind> {
        [
            (NodeKind::Type, self.on_type.is_some()),
            (NodeKind::Import, self.on_import.is_some()),
            (NodeKind::Func, self.on_func.is_some()),
            (NodeKind::Export, self.on_export.is_some()),
            (NodeKind::Start, self.on_start.is_some()),
        ]
        .into_iter()
        .filter_map(|(kind, registered)| registered.then_some(kind))
        .collect()
    }

    /// Runs every visitor once per matching node, in section order and then entry order, and
    /// turns what they staged into an [`EditPlan`].
    pub fn apply(&mut self, module: &Module) -> Result<EditPlan, EditError> {
        let mut staged = Staged {
            inserts: self.inserts.clone(),
            ..Default::default()
        };

        let imported_funcs = module.imported_count(IndexSpace::Func);
        for (section, contents) in module.sections().iter().enumerate() {
            match &contents.content {
                SectionContent::Type(xs) => visit_all(
                    &mut self.on_type,
                    xs,
                    section,
                    |entry| Some(entry as u32),
                    module,
                    &mut staged,
                ),
                SectionContent::Import(xs) => visit_all(
                    &mut self.on_import,
                    xs,
                    section,
                    |entry| module.import_index(entry),
                    module,
                    &mut staged,
                ),
                SectionContent::Function(xs) => visit_all(
                    &mut self.on_func,
                    xs,
                    section,
                    |entry| Some(imported_funcs + entry as u32),
                    module,
                    &mut staged,
                ),
                SectionContent::Export(xs) => visit_all(
                    &mut self.on_export,
                    xs,
                    section,
                    |_| None,
                    module,
                    &mut staged,
                ),
                SectionContent::Start(start) => visit_all(
                    &mut self.on_start,
                    std::slice::from_ref(start),
                    section,
                    |_| None,
                    module,
                    &mut staged,
                ),
                _ => {}
            }
        }

        planner::plan(module, staged)
    }
}

fn visit_all<T>(
    visitor: &mut Option<Visitor<'_, T>>,
    nodes: &[T],
    section: usize,
    index: impl Fn(usize) -> Option<u32>,
    module: &Module,
    staged: &mut Staged,
) {
    let Some(visitor) = visitor else {
        return;
    };
    for (entry, node) in nodes.iter().enumerate() {
        let mut visit = Visit::new(
            node,
            NodePath::new(section, entry),
            index(entry),
            module,
            staged,
        );
        visitor(&mut visit);
    }
}
