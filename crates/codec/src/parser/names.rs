use spliceasm_nodes::{FuncIdx, NameMap};

use crate::{window::DecodeWindow, DecodeError};

const MODULE_NAME: u8 = 0;
const FUNCTION_NAMES: u8 = 1;

/// Reads the payload of a `name` custom section. Only the module name and function name
/// subsections are kept; the rest are stepped over.
pub(crate) fn decode_name_map(window: &mut DecodeWindow) -> Result<NameMap, DecodeError> {
    let mut names = NameMap::default();
    while !window.is_empty() {
        let id = window.take()?;
        let len = window.take_var_u32()? as usize;
        let mut subsection = window.slice(len)?;
        match id {
            MODULE_NAME => names.module = Some(subsection.take_name()?.value),
            FUNCTION_NAMES => {
                let count = subsection.take_var_u32()?;
                for _ in 0..count {
                    let idx = subsection.take_var_u32()?;
                    let name = subsection.take_name()?;
                    names.functions.push((FuncIdx(idx), name.value));
                }
            }
            _ => {}
        }
    }
    Ok(names)
}
