use spliceasm_nodes::{Limits, MemType, MemoryEntry, RefType, TableEntry, TableType};

use crate::{window::DecodeWindow, DecodeError};

use super::Decode;

impl Decode for Limits {
    fn decode(window: &mut DecodeWindow) -> Result<Self, DecodeError> {
        let position = window.position();
        // Bit 0 marks a maximum, bit 1 marks shared memory; both shapes decode the same way here.
        match window.take()? {
            0x00 | 0x02 => Ok(Limits::Min(window.take_var_u32()?)),
            0x01 | 0x03 => {
                let min = window.take_var_u32()?;
                let max = window.take_var_u32()?;
                Ok(Limits::Range(min, max))
            }
            byte => Err(DecodeError::BadLimits { byte, position }),
        }
    }
}

impl Decode for MemType {
    fn decode(window: &mut DecodeWindow) -> Result<Self, DecodeError> {
        Ok(MemType(Limits::decode(window)?))
    }
}

impl Decode for TableType {
    fn decode(window: &mut DecodeWindow) -> Result<Self, DecodeError> {
        let ref_type = RefType::decode(window)?;
        let limits = Limits::decode(window)?;
        Ok(TableType(ref_type, limits))
    }
}

impl Decode for TableEntry {
    fn decode(window: &mut DecodeWindow) -> Result<Self, DecodeError> {
        let start = window.position();
        let ty = TableType::decode(window)?;
        Ok(TableEntry {
            ty,
            span: window.span_from(start),
        })
    }
}

impl Decode for MemoryEntry {
    fn decode(window: &mut DecodeWindow) -> Result<Self, DecodeError> {
        let start = window.position();
        let ty = MemType::decode(window)?;
        Ok(MemoryEntry {
            ty,
            span: window.span_from(start),
        })
    }
}
