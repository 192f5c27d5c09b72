use std::fmt::{Display, Formatter};

use thiserror::Error;

use crate::{
    CodeEntry, CustomSection, DataSegment, ElementSegment, Export, FuncEntry, GlobalEntry,
    Import, ImportDesc, IndexRef, IndexSpace, MemoryEntry, NameMap, NodePath, Span,
    StartDirective, TableEntry, TypeEntry,
};

pub const MAGIC: &[u8; 4] = b"\0asm";
pub const VERSION: u32 = 1;
/// Magic number plus version.
pub const PREAMBLE_LEN: usize = 8;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub enum SectionKind {
    Custom,
    Type,
    Import,
    Function,
    Table,
    Memory,
    Global,
    Export,
    Start,
    Element,
    Code,
    Data,
    DataCount,
}

impl SectionKind {
    pub fn from_id(id: u8) -> Option<Self> {
        Some(match id {
            0x0 => SectionKind::Custom,
            0x1 => SectionKind::Type,
            0x2 => SectionKind::Import,
            0x3 => SectionKind::Function,
            0x4 => SectionKind::Table,
            0x5 => SectionKind::Memory,
            0x6 => SectionKind::Global,
            0x7 => SectionKind::Export,
            0x8 => SectionKind::Start,
            0x9 => SectionKind::Element,
            0xa => SectionKind::Code,
            0xb => SectionKind::Data,
            0xc => SectionKind::DataCount,
            _ => return None,
        })
    }

    pub fn id(&self) -> u8 {
        match self {
            SectionKind::Custom => 0x0,
            SectionKind::Type => 0x1,
            SectionKind::Import => 0x2,
            SectionKind::Function => 0x3,
            SectionKind::Table => 0x4,
            SectionKind::Memory => 0x5,
            SectionKind::Global => 0x6,
            SectionKind::Export => 0x7,
            SectionKind::Start => 0x8,
            SectionKind::Element => 0x9,
            SectionKind::Code => 0xa,
            SectionKind::Data => 0xb,
            SectionKind::DataCount => 0xc,
        }
    }

    /// Position of the section in a well-formed module. Data count sits between element and
    /// code even though its id is the largest. Custom sections may appear anywhere.
    pub fn order(&self) -> u8 {
        match self {
            SectionKind::Custom => 0,
            SectionKind::Type => 1,
            SectionKind::Import => 2,
            SectionKind::Function => 3,
            SectionKind::Table => 4,
            SectionKind::Memory => 5,
            SectionKind::Global => 6,
            SectionKind::Export => 7,
            SectionKind::Start => 8,
            SectionKind::Element => 9,
            SectionKind::DataCount => 10,
            SectionKind::Code => 11,
            SectionKind::Data => 12,
        }
    }

    /// Whether the body starts with a varint item count.
    pub fn is_vector(&self) -> bool {
        !matches!(
            self,
            SectionKind::Custom | SectionKind::Start | SectionKind::DataCount
        )
    }
}

impl Display for SectionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SectionKind::Custom => "custom",
            SectionKind::Type => "type",
            SectionKind::Import => "import",
            SectionKind::Function => "function",
            SectionKind::Table => "table",
            SectionKind::Memory => "memory",
            SectionKind::Global => "global",
            SectionKind::Export => "export",
            SectionKind::Start => "start",
            SectionKind::Element => "element",
            SectionKind::Code => "code",
            SectionKind::Data => "data",
            SectionKind::DataCount => "datacount",
        })
    }
}

/// The declared item count at the head of a vector section body.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct VecCount {
    pub value: u32,
    pub span: Span,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct SectionMeta {
    pub kind: SectionKind,
    /// From the id byte through the end of the body.
    pub span: Span,
    pub body: Span,
    pub count: Option<VecCount>,
}

impl SectionMeta {
    /// The part of the body that follows the item count.
    pub fn entries(&self) -> Span {
        match self.count {
            Some(count) => Span::from_range(count.span.end(), self.body.end()),
            None => self.body,
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum SectionContent {
    Custom(CustomSection),
    Type(Box<[TypeEntry]>),
    Import(Box<[Import]>),
    Function(Box<[FuncEntry]>),
    Table(Box<[TableEntry]>),
    Memory(Box<[MemoryEntry]>),
    Global(Box<[GlobalEntry]>),
    Export(Box<[Export]>),
    Start(StartDirective),
    Element(Box<[ElementSegment]>),
    Code(Box<[CodeEntry]>),
    Data(Box<[DataSegment]>),
    DataCount(u32),
    /// A section whose body was not decoded.
    Skipped,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Section {
    pub meta: SectionMeta,
    pub content: SectionContent,
}

impl Section {
    pub fn kind(&self) -> SectionKind {
        self.meta.kind
    }

    /// Calls `f` with every index operand held by an entry of this section.
    fn for_each_ref(&self, section: usize, f: &mut impl FnMut(NodePath, &IndexRef)) {
        let path = |entry| NodePath::new(section, entry);
        match &self.content {
            SectionContent::Import(xs) => {
                for (idx, import) in xs.iter().enumerate() {
                    if let Some(type_ref) = &import.type_ref {
                        f(path(idx), type_ref);
                    }
                }
            }
            SectionContent::Function(xs) => {
                for (idx, func) in xs.iter().enumerate() {
                    f(path(idx), &func.type_idx);
                }
            }
            SectionContent::Global(xs) => {
                for (idx, global) in xs.iter().enumerate() {
                    global.init.refs.iter().for_each(|r| f(path(idx), r));
                }
            }
            SectionContent::Export(xs) => {
                for (idx, export) in xs.iter().enumerate() {
                    f(path(idx), &export.index);
                }
            }
            SectionContent::Start(start) => f(path(0), &start.func),
            SectionContent::Element(xs) => {
                for (idx, elem) in xs.iter().enumerate() {
                    elem.refs.iter().for_each(|r| f(path(idx), r));
                }
            }
            SectionContent::Code(xs) => {
                for (idx, code) in xs.iter().enumerate() {
                    if let Some(refs) = &code.refs {
                        refs.iter().for_each(|r| f(path(idx), r));
                    }
                }
            }
            SectionContent::Data(xs) => {
                for (idx, data) in xs.iter().enumerate() {
                    data.refs.iter().for_each(|r| f(path(idx), r));
                }
            }
            SectionContent::Custom(_)
            | SectionContent::Type(_)
            | SectionContent::Table(_)
            | SectionContent::Memory(_)
            | SectionContent::DataCount(_)
            | SectionContent::Skipped => {}
        }
    }

    /// Byte span of the entry at `entry`. A start directive is the only entry of its section.
    pub fn entry_span(&self, entry: usize) -> Option<Span> {
        match &self.content {
            SectionContent::Type(xs) => xs.get(entry).map(|xs| xs.span),
            SectionContent::Import(xs) => xs.get(entry).map(|xs| xs.span),
            SectionContent::Function(xs) => xs.get(entry).map(|xs| xs.span),
            SectionContent::Table(xs) => xs.get(entry).map(|xs| xs.span),
            SectionContent::Memory(xs) => xs.get(entry).map(|xs| xs.span),
            SectionContent::Global(xs) => xs.get(entry).map(|xs| xs.span),
            SectionContent::Export(xs) => xs.get(entry).map(|xs| xs.span),
            SectionContent::Element(xs) => xs.get(entry).map(|xs| xs.span),
            SectionContent::Code(xs) => xs.get(entry).map(|xs| xs.span),
            SectionContent::Data(xs) => xs.get(entry).map(|xs| xs.span),
            SectionContent::Start(start) if entry == 0 => Some(start.span),
            _ => None,
        }
    }

    /// Whether this section may hold index operands that were not decoded.
    pub fn has_opaque_refs(&self) -> bool {
        match &self.content {
            SectionContent::Code(xs) => xs.iter().any(|code| !code.is_decoded()),
            SectionContent::Skipped => matches!(self.kind(), SectionKind::Data | SectionKind::Code),
            _ => false,
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
#[error("duplicate {kind} section at position {position}")]
pub struct DuplicateSection {
    pub kind: SectionKind,
    pub position: usize,
}

/// A decoded module: its sections in file order, each with the metadata needed to splice it.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct Module {
    pub(crate) sections: Vec<Section>,
    pub(crate) len: usize,
}

#[derive(Default, Debug)]
pub struct ModuleBuilder {
    inner: Module,
}

impl ModuleBuilder {
    #[inline]
    pub fn new(len: usize) -> Self {
        Self {
            inner: Module {
                sections: Vec::with_capacity(16),
                len,
            },
        }
    }

    pub fn section(mut self, section: Section) -> Result<Self, DuplicateSection> {
        let kind = section.kind();
        if kind != SectionKind::Custom && self.inner.section(kind).is_some() {
            return Err(DuplicateSection {
                kind,
                position: section.meta.span.start,
            });
        }
        self.inner.sections.push(section);
        Ok(self)
    }

    pub fn build(self) -> Module {
        self.inner
    }
}

impl Module {
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Length of the buffer this module was decoded from.
    pub fn byte_len(&self) -> usize {
        self.len
    }

    pub fn metadata(&self) -> Vec<SectionMeta> {
        self.sections.iter().map(|xs| xs.meta).collect()
    }

    /// The first section of `kind` and its position.
    pub fn section(&self, kind: SectionKind) -> Option<(usize, &Section)> {
        self.sections
            .iter()
            .enumerate()
            .find(|(_, xs)| xs.kind() == kind)
    }

    pub fn section_metadata(&self, kind: SectionKind) -> Option<&SectionMeta> {
        self.section(kind).map(|(_, xs)| &xs.meta)
    }

    pub fn custom_sections(&self) -> impl Iterator<Item = &CustomSection> {
        self.sections.iter().filter_map(|xs| match &xs.content {
            SectionContent::Custom(custom) => Some(custom),
            _ => None,
        })
    }

    pub fn names(&self) -> Option<&NameMap> {
        self.custom_sections().find_map(|xs| xs.names.as_ref())
    }

    pub fn type_section(&self) -> &[TypeEntry] {
        match self.section(SectionKind::Type).map(|(_, xs)| &xs.content) {
            Some(SectionContent::Type(xs)) => xs,
            _ => &[],
        }
    }

    pub fn import_section(&self) -> &[Import] {
        match self.section(SectionKind::Import).map(|(_, xs)| &xs.content) {
            Some(SectionContent::Import(xs)) => xs,
            _ => &[],
        }
    }

    pub fn function_section(&self) -> &[FuncEntry] {
        match self.section(SectionKind::Function).map(|(_, xs)| &xs.content) {
            Some(SectionContent::Function(xs)) => xs,
            _ => &[],
        }
    }

    pub fn table_section(&self) -> &[TableEntry] {
        match self.section(SectionKind::Table).map(|(_, xs)| &xs.content) {
            Some(SectionContent::Table(xs)) => xs,
            _ => &[],
        }
    }

    pub fn memory_section(&self) -> &[MemoryEntry] {
        match self.section(SectionKind::Memory).map(|(_, xs)| &xs.content) {
            Some(SectionContent::Memory(xs)) => xs,
            _ => &[],
        }
    }

    pub fn global_section(&self) -> &[GlobalEntry] {
        match self.section(SectionKind::Global).map(|(_, xs)| &xs.content) {
            Some(SectionContent::Global(xs)) => xs,
            _ => &[],
        }
    }

    pub fn export_section(&self) -> &[Export] {
        match self.section(SectionKind::Export).map(|(_, xs)| &xs.content) {
            Some(SectionContent::Export(xs)) => xs,
            _ => &[],
        }
    }

    pub fn start_section(&self) -> Option<&StartDirective> {
        match self.section(SectionKind::Start).map(|(_, xs)| &xs.content) {
            Some(SectionContent::Start(start)) => Some(start),
            _ => None,
        }
    }

    pub fn element_section(&self) -> &[ElementSegment] {
        match self.section(SectionKind::Element).map(|(_, xs)| &xs.content) {
            Some(SectionContent::Element(xs)) => xs,
            _ => &[],
        }
    }

    pub fn code_section(&self) -> &[CodeEntry] {
        match self.section(SectionKind::Code).map(|(_, xs)| &xs.content) {
            Some(SectionContent::Code(xs)) => xs,
            _ => &[],
        }
    }

    pub fn data_section(&self) -> &[DataSegment] {
        match self.section(SectionKind::Data).map(|(_, xs)| &xs.content) {
            Some(SectionContent::Data(xs)) => xs,
            _ => &[],
        }
    }

    pub fn imported_count(&self, space: IndexSpace) -> u32 {
        self.import_section()
            .iter()
            .filter(|xs| xs.desc.space() == space)
            .count() as u32
    }

    /// Number of entities in `space` defined by this module, imports excluded.
    pub fn defined_count(&self, space: IndexSpace) -> u32 {
        let len = match space {
            IndexSpace::Type => self.type_section().len(),
            IndexSpace::Func => self.function_section().len(),
            IndexSpace::Table => self.table_section().len(),
            IndexSpace::Memory => self.memory_section().len(),
            IndexSpace::Global => self.global_section().len(),
        };
        len as u32
    }

    /// Size of `space`, imports first.
    pub fn space_len(&self, space: IndexSpace) -> u32 {
        match space {
            IndexSpace::Type => self.defined_count(space),
            _ => self.imported_count(space) + self.defined_count(space),
        }
    }

    /// The index a type appended to the type section will receive.
    pub fn next_type_index(&self) -> u32 {
        self.space_len(IndexSpace::Type)
    }

    /// The index a function appended to the function section will receive. Imported functions
    /// occupy the low indices, so they are counted first.
    pub fn next_func_index(&self) -> u32 {
        self.space_len(IndexSpace::Func)
    }

    /// Index-space position of the import at `entry`, counting only imports of the same kind.
    pub fn import_index(&self, entry: usize) -> Option<u32> {
        let imports = self.import_section();
        let space = imports.get(entry)?.desc.space();
        Some(
            imports[..entry]
                .iter()
                .filter(|xs| xs.desc.space() == space)
                .count() as u32,
        )
    }

    /// Calls `f` with every decoded index operand in the module along with its owning node.
    pub fn for_each_ref(&self, mut f: impl FnMut(NodePath, &IndexRef)) {
        for (idx, section) in self.sections.iter().enumerate() {
            section.for_each_ref(idx, &mut f);
        }
    }

    /// Kinds of sections holding operands the decoder skipped.
    pub fn opaque_sections(&self) -> Vec<SectionKind> {
        self.sections
            .iter()
            .filter(|xs| xs.has_opaque_refs())
            .map(|xs| xs.kind())
            .collect()
    }

    pub fn func_type(&self, func: u32) -> Option<u32> {
        let imported = self.imported_count(IndexSpace::Func);
        if func < imported {
            let import = self
                .import_section()
                .iter()
                .filter_map(|xs| match xs.desc {
                    ImportDesc::Func(ty) => Some(ty.0),
                    _ => None,
                })
                .nth(func as usize)?;
            return Some(import);
        }
        self.function_section()
            .get((func - imported) as usize)
            .map(|xs| xs.type_idx.value)
    }
}
