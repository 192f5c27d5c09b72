use spliceasm_nodes::EditPlan;

use crate::{decode, reencode, DecodeOptions, EncodeError};

/// Re-emits every section header and item count of `bytes` in minimal LEB128 form.
///
/// Bodies are carried over untouched, so padded operands inside entries (including code entry
/// sizes) keep their width.
pub fn shrink_padded_leb128(bytes: &[u8]) -> Result<Vec<u8>, EncodeError> {
    let module = decode(bytes, &DecodeOptions::declarations_only())?;
    let plan = EditPlan::rewrite_all(module.sections().len());
    let out = reencode(bytes, &module.metadata(), &plan)?;
    log::debug!("shrunk {} bytes to {}", bytes.len(), out.len());
    Ok(out)
}
