use spliceasm_nodes::Module;

use crate::{parser::module::decode_module, DecodeError};

/// Which parts of a module to leave undecoded.
///
/// Skipped code bodies still record their spans, so entries can be removed wholesale, but their
/// index operands are unknown and any edit that renumbers indices will refuse to proceed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    pub skip_code: bool,
    pub skip_data: bool,
    pub skip_name_section: bool,
}

impl DecodeOptions {
    /// Decode only what is needed to edit the declaration sections.
    pub fn declarations_only() -> Self {
        Self {
            skip_code: true,
            skip_data: true,
            skip_name_section: true,
        }
    }
}

/// Decodes `bytes` into a [`Module`] that records, for every section and entry, the byte spans
/// it was read from.
pub fn decode(bytes: &[u8], opts: &DecodeOptions) -> Result<Module, DecodeError> {
    let module = decode_module(bytes, opts)?;
    log::debug!(
        "decoded {} bytes into {} sections",
        bytes.len(),
        module.sections().len()
    );
    Ok(module)
}
