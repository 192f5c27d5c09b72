use spliceasm_nodes::{FuncEntry, IndexRef, IndexSpace, StartDirective};

use crate::{window::DecodeWindow, DecodeError};

use super::Decode;

impl Decode for FuncEntry {
    fn decode(window: &mut DecodeWindow) -> Result<Self, DecodeError> {
        let (value, span) = window.take_spanned_u32()?;
        Ok(FuncEntry {
            type_idx: IndexRef {
                space: IndexSpace::Type,
                value,
                span,
            },
            span,
        })
    }
}

impl Decode for StartDirective {
    fn decode(window: &mut DecodeWindow) -> Result<Self, DecodeError> {
        let (value, span) = window.take_spanned_u32()?;
        Ok(StartDirective {
            func: IndexRef {
                space: IndexSpace::Func,
                value,
                span,
            },
            span,
        })
    }
}
