//! Byte-level encoding of the pieces an edit can add: varints, names, entries and section headers.

use spliceasm_nodes::{
    ExportDesc, FuncType, Local, NumType, RefType, ResultType, SectionKind, ValType, VecType,
};

/// Largest encoding of a u32.
pub const MAX_U32_WIDTH: usize = 5;

pub trait Encode {
    fn encode(&self, out: &mut Vec<u8>);

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode(&mut out);
        out
    }
}

/// Writes `value` in its minimal unsigned LEB128 form.
pub fn write_u32(out: &mut Vec<u8>, value: u32) {
    // Writes into a Vec cannot fail.
    leb128::write::unsigned(out, u64::from(value)).unwrap_or_default();
}

/// Writes `value` using exactly `width` bytes, padding with continuation bits. Returns false
/// (writing nothing) when `value` needs more than `width` bytes or `width` exceeds the u32 limit.
pub fn write_u32_padded(out: &mut Vec<u8>, value: u32, width: usize) -> bool {
    if width == 0 || width > MAX_U32_WIDTH || leb_len_u32(value) > width {
        return false;
    }
    let mut rest = value;
    for idx in 0..width {
        let mut byte = (rest & 0x7f) as u8;
        rest >>= 7;
        if idx + 1 < width {
            byte |= 0x80;
        }
        out.push(byte);
    }
    true
}

pub fn leb_len_u32(value: u32) -> usize {
    match value {
        0..=0x7f => 1,
        0x80..=0x3fff => 2,
        0x4000..=0x1f_ffff => 3,
        0x20_0000..=0x0fff_ffff => 4,
        _ => 5,
    }
}

pub fn encode_name(out: &mut Vec<u8>, name: &str) {
    write_u32(out, name.len() as u32);
    out.extend_from_slice(name.as_bytes());
}

impl Encode for ValType {
    fn encode(&self, out: &mut Vec<u8>) {
        out.push(match self {
            ValType::NumType(NumType::I32) => 0x7f,
            ValType::NumType(NumType::I64) => 0x7e,
            ValType::NumType(NumType::F32) => 0x7d,
            ValType::NumType(NumType::F64) => 0x7c,
            ValType::VecType(VecType::V128) => 0x7b,
            ValType::RefType(RefType::FuncRef) => 0x70,
            ValType::RefType(RefType::ExternRef) => 0x6f,
        });
    }
}

impl Encode for ResultType {
    fn encode(&self, out: &mut Vec<u8>) {
        write_u32(out, self.0.len() as u32);
        for ty in self.0.iter() {
            ty.encode(out);
        }
    }
}

impl Encode for FuncType {
    fn encode(&self, out: &mut Vec<u8>) {
        out.push(0x60);
        self.0.encode(out);
        self.1.encode(out);
    }
}

impl Encode for ExportDesc {
    fn encode(&self, out: &mut Vec<u8>) {
        out.push(match self {
            ExportDesc::Func(_) => 0x00,
            ExportDesc::Table(_) => 0x01,
            ExportDesc::Mem(_) => 0x02,
            ExportDesc::Global(_) => 0x03,
        });
        write_u32(out, self.index());
    }
}

impl Encode for Local {
    fn encode(&self, out: &mut Vec<u8>) {
        write_u32(out, self.0);
        self.1.encode(out);
    }
}

pub fn encode_export(out: &mut Vec<u8>, name: &str, desc: &ExportDesc) {
    encode_name(out, name);
    desc.encode(out);
}

/// A function section entry: just the type index.
pub fn encode_func_entry(out: &mut Vec<u8>, type_idx: u32) {
    write_u32(out, type_idx);
}

/// A code section entry: size prefix, local declarations, then `body` verbatim. `body` must
/// already end with the closing `end` opcode.
pub fn encode_code_entry(out: &mut Vec<u8>, locals: &[Local], body: &[u8]) {
    let mut inner = Vec::with_capacity(body.len() + 1 + locals.len() * 2);
    write_u32(&mut inner, locals.len() as u32);
    for local in locals {
        local.encode(&mut inner);
    }
    inner.extend_from_slice(body);

    write_u32(out, inner.len() as u32);
    out.extend_from_slice(&inner);
}

/// Writes a complete section: id, minimal length, the optional item count, then `body`.
pub fn write_section(out: &mut Vec<u8>, kind: SectionKind, count: Option<u32>, body: &[u8]) {
    let mut head = Vec::with_capacity(MAX_U32_WIDTH);
    if let Some(count) = count {
        write_u32(&mut head, count);
    }
    out.push(kind.id());
    write_u32(out, (head.len() + body.len()) as u32);
    out.extend_from_slice(&head);
    out.extend_from_slice(body);
}
