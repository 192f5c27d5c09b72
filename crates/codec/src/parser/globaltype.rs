use spliceasm_nodes::{GlobalType, Mutability, ValType};

use crate::{window::DecodeWindow, DecodeError};

use super::Decode;

impl Decode for Mutability {
    fn decode(window: &mut DecodeWindow) -> Result<Self, DecodeError> {
        let position = window.position();
        match window.take()? {
            0x00 => Ok(Mutability::Const),
            0x01 => Ok(Mutability::Variable),
            byte => Err(DecodeError::BadMutability { byte, position }),
        }
    }
}

impl Decode for GlobalType {
    fn decode(window: &mut DecodeWindow) -> Result<Self, DecodeError> {
        let val_type = ValType::decode(window)?;
        let mutability = Mutability::decode(window)?;
        Ok(GlobalType(val_type, mutability))
    }
}
