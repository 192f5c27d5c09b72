#![allow(dead_code)]
use std::fmt::{Display, Formatter};
use std::ops::Range;

mod module;
mod plan;

pub use module::*;
pub use plan::*;

/// A half-open byte range inside the buffer a [`Module`] was decoded from.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Default)]
pub struct Span {
    pub start: usize,
    pub len: usize,
}

impl Span {
    pub fn new(start: usize, len: usize) -> Self {
        Self { start, len }
    }

    pub fn from_range(start: usize, end: usize) -> Self {
        Self {
            start,
            len: end - start,
        }
    }

    /// An empty span positioned at `at`; used for appends.
    pub fn empty(at: usize) -> Self {
        Self { start: at, len: 0 }
    }

    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }

    pub fn contains(&self, other: &Span) -> bool {
        other.start >= self.start && other.end() <= self.end()
    }
}

/// A length-prefixed UTF-8 name together with the bytes it occupies (prefix included).
#[derive(Debug, PartialEq, Clone)]
pub struct Name {
    pub value: String,
    pub span: Span,
}

impl Name {
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum NumType {
    I32,
    I64,
    F32,
    F64,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum VecType {
    V128,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RefType {
    FuncRef,
    ExternRef,
}

#[allow(clippy::enum_variant_names)]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ValType {
    NumType(NumType),
    VecType(VecType),
    RefType(RefType),
}

#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct ResultType(pub Box<[ValType]>);

#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct FuncType(pub ResultType, pub ResultType);

impl FuncType {
    pub fn new(params: Vec<ValType>, results: Vec<ValType>) -> Self {
        Self(
            ResultType(params.into_boxed_slice()),
            ResultType(results.into_boxed_slice()),
        )
    }

    pub fn params(&self) -> &[ValType] {
        &self.0 .0
    }

    pub fn results(&self) -> &[ValType] {
        &self.1 .0
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Limits {
    Min(u32),
    Range(u32, u32),
}

impl Limits {
    pub fn min(&self) -> u32 {
        *match self {
            Limits::Min(min) => min,
            Limits::Range(min, _) => min,
        }
    }

    pub fn max(&self) -> Option<u32> {
        match self {
            Limits::Min(_) => None,
            Limits::Range(_, max) => Some(*max),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct MemType(pub Limits);

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct TableType(pub RefType, pub Limits);

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Mutability {
    Const,
    Variable,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct GlobalType(pub ValType, pub Mutability);

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Local(pub u32, pub ValType);

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct TypeIdx(pub u32);

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct FuncIdx(pub u32);

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct TableIdx(pub u32);

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct MemIdx(pub u32);

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct GlobalIdx(pub u32);

/// The numbering schemes an index operand can refer into.
///
/// Imported functions, tables, memories and globals occupy the low indices of their space;
/// locally defined entities follow in section order.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub enum IndexSpace {
    Type,
    Func,
    Table,
    Memory,
    Global,
}

impl IndexSpace {
    pub const ALL: [IndexSpace; 5] = [
        IndexSpace::Type,
        IndexSpace::Func,
        IndexSpace::Table,
        IndexSpace::Memory,
        IndexSpace::Global,
    ];
}

impl Display for IndexSpace {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            IndexSpace::Type => "type",
            IndexSpace::Func => "func",
            IndexSpace::Table => "table",
            IndexSpace::Memory => "memory",
            IndexSpace::Global => "global",
        })
    }
}

/// One encoded index operand: which space it points into, the value it held at decode time,
/// and the varint bytes that encode it.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct IndexRef {
    pub space: IndexSpace,
    pub value: u32,
    pub span: Span,
}

impl IndexRef {
    /// An operand that means index 0 without encoding it, like a load without the multi-memory
    /// bit or an element segment with flags 0. Its span is empty and sits at `at`.
    pub fn implicit(space: IndexSpace, at: usize) -> Self {
        Self {
            space,
            value: 0,
            span: Span::empty(at),
        }
    }

    /// Implicit operands have no bytes, so they can never be rewritten.
    pub fn is_implicit(&self) -> bool {
        self.span.is_empty()
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ImportDesc {
    Func(TypeIdx),
    Table(TableType),
    Mem(MemType),
    Global(GlobalType),
}

impl ImportDesc {
    pub fn space(&self) -> IndexSpace {
        match self {
            ImportDesc::Func(_) => IndexSpace::Func,
            ImportDesc::Table(_) => IndexSpace::Table,
            ImportDesc::Mem(_) => IndexSpace::Memory,
            ImportDesc::Global(_) => IndexSpace::Global,
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ExportDesc {
    Func(FuncIdx),
    Table(TableIdx),
    Mem(MemIdx),
    Global(GlobalIdx),
}

impl ExportDesc {
    pub fn from_ref(index: &IndexRef) -> Option<Self> {
        Some(match index.space {
            IndexSpace::Func => ExportDesc::Func(FuncIdx(index.value)),
            IndexSpace::Table => ExportDesc::Table(TableIdx(index.value)),
            IndexSpace::Memory => ExportDesc::Mem(MemIdx(index.value)),
            IndexSpace::Global => ExportDesc::Global(GlobalIdx(index.value)),
            IndexSpace::Type => return None,
        })
    }

    pub fn space(&self) -> IndexSpace {
        match self {
            ExportDesc::Func(_) => IndexSpace::Func,
            ExportDesc::Table(_) => IndexSpace::Table,
            ExportDesc::Mem(_) => IndexSpace::Memory,
            ExportDesc::Global(_) => IndexSpace::Global,
        }
    }

    pub fn index(&self) -> u32 {
        match self {
            ExportDesc::Func(FuncIdx(idx))
            | ExportDesc::Table(TableIdx(idx))
            | ExportDesc::Mem(MemIdx(idx))
            | ExportDesc::Global(GlobalIdx(idx)) => *idx,
        }
    }

    pub fn with_index(&self, idx: u32) -> Self {
        match self {
            ExportDesc::Func(_) => ExportDesc::Func(FuncIdx(idx)),
            ExportDesc::Table(_) => ExportDesc::Table(TableIdx(idx)),
            ExportDesc::Mem(_) => ExportDesc::Mem(MemIdx(idx)),
            ExportDesc::Global(_) => ExportDesc::Global(GlobalIdx(idx)),
        }
    }
}

// Nodes. Each one keeps the span of the whole entry plus the spans of the pieces an edit can
// touch, so planning never has to re-derive offsets.

#[derive(Debug, PartialEq, Clone)]
pub struct TypeEntry {
    pub ty: FuncType,
    pub span: Span,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Import {
    pub module: Name,
    pub field: Name,
    pub desc: ImportDesc,
    /// The type index operand of a function import.
    pub type_ref: Option<IndexRef>,
    pub span: Span,
}

#[derive(Debug, PartialEq, Clone)]
pub struct FuncEntry {
    pub type_idx: IndexRef,
    pub span: Span,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Export {
    pub name: Name,
    pub desc: ExportDesc,
    pub index: IndexRef,
    pub span: Span,
}

#[derive(Debug, PartialEq, Clone)]
pub struct StartDirective {
    pub func: IndexRef,
    pub span: Span,
}

#[derive(Debug, PartialEq, Clone)]
pub struct TableEntry {
    pub ty: TableType,
    pub span: Span,
}

#[derive(Debug, PartialEq, Clone)]
pub struct MemoryEntry {
    pub ty: MemType,
    pub span: Span,
}

/// A constant expression, kept as bytes plus the index operands found inside it.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct ConstExpr {
    pub span: Span,
    pub refs: Vec<IndexRef>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct GlobalEntry {
    pub ty: GlobalType,
    pub init: ConstExpr,
    pub span: Span,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum SegmentMode {
    Active,
    Passive,
    Declarative,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ElementSegment {
    pub mode: SegmentMode,
    pub flags: u32,
    pub len: u32,
    pub refs: Vec<IndexRef>,
    pub span: Span,
}

#[derive(Debug, PartialEq, Clone)]
pub struct CodeEntry {
    /// The varint holding the body size.
    pub size: Span,
    pub body: Span,
    /// `None` when the body was not decoded.
    pub locals: Option<Box<[Local]>>,
    /// `None` when the body was not decoded.
    pub refs: Option<Vec<IndexRef>>,
    pub span: Span,
}

impl CodeEntry {
    pub fn is_decoded(&self) -> bool {
        self.refs.is_some()
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct DataSegment {
    pub mode: SegmentMode,
    pub bytes: Span,
    pub refs: Vec<IndexRef>,
    pub span: Span,
}

/// Contents of the `name` custom section, decoded for inspection only.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct NameMap {
    pub module: Option<String>,
    pub functions: Vec<(FuncIdx, String)>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct CustomSection {
    pub name: Name,
    pub payload: Span,
    pub names: Option<NameMap>,
}

/// The node kinds an edit rule can be registered for.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub enum NodeKind {
    Type,
    Import,
    Func,
    Export,
    Start,
}

/// Addresses a node: the section's position in [`Module::sections`] and the entry within it.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
pub struct NodePath {
    pub section: usize,
    pub entry: usize,
}

impl NodePath {
    pub fn new(section: usize, entry: usize) -> Self {
        Self { section, entry }
    }
}
