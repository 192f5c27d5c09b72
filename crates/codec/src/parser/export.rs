use spliceasm_nodes::{Export, ExportDesc, FuncIdx, GlobalIdx, IndexRef, MemIdx, TableIdx};

use crate::{window::DecodeWindow, DecodeError};

use super::Decode;

impl Decode for Export {
    fn decode(window: &mut DecodeWindow) -> Result<Self, DecodeError> {
        let start = window.position();
        let name = window.take_name()?;

        let position = window.position();
        let desc: fn(u32) -> ExportDesc = match window.take()? {
            0x00 => |idx| ExportDesc::Func(FuncIdx(idx)),
            0x01 => |idx| ExportDesc::Table(TableIdx(idx)),
            0x02 => |idx| ExportDesc::Mem(MemIdx(idx)),
            0x03 => |idx| ExportDesc::Global(GlobalIdx(idx)),
            byte => return Err(DecodeError::BadExportDesc { byte, position }),
        };
        let (value, span) = window.take_spanned_u32()?;
        let desc = desc(value);
        let index = IndexRef {
            space: desc.space(),
            value,
            span,
        };

        Ok(Export {
            name,
            desc,
            index,
            span: window.span_from(start),
        })
    }
}
