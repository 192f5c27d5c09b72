pub(crate) mod decoder;
pub mod encoder;
pub(crate) mod parser;
pub mod reencode;
pub(crate) mod shrink;
pub mod window;

use thiserror::Error;

use spliceasm_nodes::{DuplicateSection, SectionKind};

pub use decoder::{decode, DecodeOptions};
pub use reencode::{reencode, validate_plan};
pub use shrink::shrink_padded_leb128;
pub use window::DecodeWindow;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("truncated input at position {position} (wanted {wanted} bytes, {available} available)")]
    TruncatedInput {
        position: usize,
        wanted: usize,
        available: usize,
    },

    #[error("malformed varint at position {position}")]
    MalformedVarint { position: usize },

    #[error("Bad magic number (expected 0061736DH ('\\0asm'), got {0:08X}H)")]
    InvalidMagic(u32),

    #[error("Unexpected version {0}")]
    UnsupportedVersion(u32),

    #[error("invalid section type {kind} at position {position}")]
    InvalidSection { kind: u8, position: usize },

    #[error(transparent)]
    DuplicateSection(#[from] DuplicateSection),

    #[error("{kind} section declared {declared} bytes but {consumed} were decoded (section at position {position})")]
    SectionSizeMismatch {
        kind: SectionKind,
        declared: usize,
        consumed: usize,
        position: usize,
    },

    #[error("code entry declared {declared} bytes but {consumed} were decoded (entry at position {position})")]
    BodySizeMismatch {
        declared: usize,
        consumed: usize,
        position: usize,
    },

    #[error("Bad type prefix (expected 60H, got {byte:X}H) at position {position}")]
    BadTypePrefix { byte: u8, position: usize },

    #[error("Bad type (got {byte:X}H) at position {position}")]
    BadType { byte: u8, position: usize },

    #[error("Bad limits flag (got {byte:X}H) at position {position}")]
    BadLimits { byte: u8, position: usize },

    #[error("Bad mutability (got {byte:X}H) at position {position}")]
    BadMutability { byte: u8, position: usize },

    #[error("Bad import descriptor type (got {byte:X}H) at position {position}")]
    BadImportDesc { byte: u8, position: usize },

    #[error("Bad export descriptor type (got {byte:X}H) at position {position}")]
    BadExportDesc { byte: u8, position: usize },

    #[error("Bad element segment flags ({flags}) at position {position}")]
    BadElementFlags { flags: u32, position: usize },

    #[error("Bad data segment flags ({flags}) at position {position}")]
    BadDataFlags { flags: u32, position: usize },

    #[error("unknown opcode {opcode:X}H{} at position {position}", .subcode.map(|xs| format!(" {xs}")).unwrap_or_default())]
    UnknownOpcode {
        opcode: u8,
        subcode: Option<u32>,
        position: usize,
    },

    #[error("invalid UTF-8 in name at position {position}")]
    InvalidUtf8 { position: usize },
}

impl DecodeError {
    /// Byte offset at which decoding failed.
    pub fn position(&self) -> usize {
        match self {
            DecodeError::TruncatedInput { position, .. }
            | DecodeError::MalformedVarint { position }
            | DecodeError::InvalidSection { position, .. }
            | DecodeError::SectionSizeMismatch { position, .. }
            | DecodeError::BodySizeMismatch { position, .. }
            | DecodeError::BadTypePrefix { position, .. }
            | DecodeError::BadType { position, .. }
            | DecodeError::BadLimits { position, .. }
            | DecodeError::BadMutability { position, .. }
            | DecodeError::BadImportDesc { position, .. }
            | DecodeError::BadExportDesc { position, .. }
            | DecodeError::BadElementFlags { position, .. }
            | DecodeError::BadDataFlags { position, .. }
            | DecodeError::UnknownOpcode { position, .. }
            | DecodeError::InvalidUtf8 { position } => *position,
            DecodeError::DuplicateSection(dup) => dup.position,
            DecodeError::InvalidMagic(_) => 0,
            DecodeError::UnsupportedVersion(_) => 4,
        }
    }
}

/// Ways an [`EditPlan`](spliceasm_nodes::EditPlan) can be internally inconsistent. These are
/// bugs in whatever produced the plan, never properties of the input bytes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanViolation {
    #[error("plan refers to section {0}, which does not exist")]
    UnknownSection(usize),

    #[error("operations in section {section} are not sorted (at byte {at})")]
    Unsorted { section: usize, at: usize },

    #[error("operations in section {section} overlap at byte {at}")]
    Overlap { section: usize, at: usize },

    #[error("operation {start}..{end} falls outside the entries of section {section}")]
    OutOfBounds {
        section: usize,
        start: usize,
        end: usize,
    },

    #[error("section {section} count would become {count}")]
    BadCount { section: usize, count: i64 },

    #[error("section {0} is dropped but still has operations")]
    DroppedSectionEdited(usize),

    #[error("index {value} does not fit the {width}-byte operand at byte {at}")]
    IndexWidth { value: u32, width: usize, at: usize },

    #[error("section metadata does not describe the original buffer")]
    MetadataMismatch,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("invalid edit plan: {0}")]
    InvalidEditPlan(#[from] PlanViolation),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}
