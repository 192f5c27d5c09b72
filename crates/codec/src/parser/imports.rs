use spliceasm_nodes::{
    GlobalType, Import, ImportDesc, IndexRef, IndexSpace, MemType, TableType, TypeIdx,
};

use crate::{window::DecodeWindow, DecodeError};

use super::Decode;

impl Decode for Import {
    fn decode(window: &mut DecodeWindow) -> Result<Self, DecodeError> {
        let start = window.position();
        let module = window.take_name()?;
        let field = window.take_name()?;

        let position = window.position();
        let (desc, type_ref) = match window.take()? {
            0x00 => {
                let (value, span) = window.take_spanned_u32()?;
                let type_ref = IndexRef {
                    space: IndexSpace::Type,
                    value,
                    span,
                };
                (ImportDesc::Func(TypeIdx(value)), Some(type_ref))
            }
            0x01 => (ImportDesc::Table(TableType::decode(window)?), None),
            0x02 => (ImportDesc::Mem(MemType::decode(window)?), None),
            0x03 => (ImportDesc::Global(GlobalType::decode(window)?), None),
            byte => return Err(DecodeError::BadImportDesc { byte, position }),
        };

        Ok(Import {
            module,
            field,
            desc,
            type_ref,
            span: window.span_from(start),
        })
    }
}
