use spliceasm_nodes::{FuncType, NumType, RefType, ResultType, TypeEntry, ValType, VecType};

use crate::{window::DecodeWindow, DecodeError};

use super::Decode;

impl Decode for RefType {
    fn decode(window: &mut DecodeWindow) -> Result<Self, DecodeError> {
        let position = window.position();
        match window.take()? {
            0x70 => Ok(RefType::FuncRef),
            0x6f => Ok(RefType::ExternRef),
            byte => Err(DecodeError::BadType { byte, position }),
        }
    }
}

impl Decode for ValType {
    fn decode(window: &mut DecodeWindow) -> Result<Self, DecodeError> {
        let position = window.position();
        Ok(match window.take()? {
            0x7f => ValType::NumType(NumType::I32),
            0x7e => ValType::NumType(NumType::I64),
            0x7d => ValType::NumType(NumType::F32),
            0x7c => ValType::NumType(NumType::F64),
            0x7b => ValType::VecType(VecType::V128),
            0x70 => ValType::RefType(RefType::FuncRef),
            0x6f => ValType::RefType(RefType::ExternRef),
            byte => return Err(DecodeError::BadType { byte, position }),
        })
    }
}

impl Decode for ResultType {
    fn decode(window: &mut DecodeWindow) -> Result<Self, DecodeError> {
        Ok(ResultType(Vec::<ValType>::decode(window)?.into_boxed_slice()))
    }
}

impl Decode for FuncType {
    fn decode(window: &mut DecodeWindow) -> Result<Self, DecodeError> {
        let position = window.position();
        let tag = window.take()?;
        if tag != 0x60 {
            return Err(DecodeError::BadTypePrefix {
                byte: tag,
                position,
            });
        }

        let params = ResultType::decode(window)?;
        let results = ResultType::decode(window)?;
        Ok(FuncType(params, results))
    }
}

impl Decode for TypeEntry {
    fn decode(window: &mut DecodeWindow) -> Result<Self, DecodeError> {
        let start = window.position();
        let ty = FuncType::decode(window)?;
        Ok(TypeEntry {
            ty,
            span: window.span_from(start),
        })
    }
}

#[cfg(test)]
mod test {
    use spliceasm_nodes::Span;

    use super::*;

    #[test]
    fn decodes_func_types() -> anyhow::Result<()> {
        let mut window = DecodeWindow::new(b"\x60\x02\x7f\x7e\x01\x7d");
        let entry = TypeEntry::decode(&mut window)?;
        assert_eq!(
            entry.ty,
            FuncType::new(
                vec![
                    ValType::NumType(NumType::I32),
                    ValType::NumType(NumType::I64)
                ],
                vec![ValType::NumType(NumType::F32)]
            )
        );
        assert_eq!(entry.span, Span::new(0, 6));
        Ok(())
    }

    #[test]
    fn rejects_bad_prefix() {
        let mut window = DecodeWindow::new(b"\x5f\x00\x00");
        assert_eq!(
            FuncType::decode(&mut window),
            Err(DecodeError::BadTypePrefix {
                byte: 0x5f,
                position: 0
            })
        );
    }

    #[test]
    fn rejects_unknown_value_types() {
        let mut window = DecodeWindow::new(b"\x60\x01\x01\x00");
        assert_eq!(
            FuncType::decode(&mut window),
            Err(DecodeError::BadType {
                byte: 0x01,
                position: 2
            })
        );
    }
}
