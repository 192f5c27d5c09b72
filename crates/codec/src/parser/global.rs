use spliceasm_nodes::{ConstExpr, GlobalEntry, GlobalType};

use crate::{window::DecodeWindow, DecodeError};

use super::Decode;

impl Decode for GlobalEntry {
    fn decode(window: &mut DecodeWindow) -> Result<Self, DecodeError> {
        let start = window.position();
        let ty = GlobalType::decode(window)?;
        let init = ConstExpr::decode(window)?;
        Ok(GlobalEntry {
            ty,
            init,
            span: window.span_from(start),
        })
    }
}

#[cfg(test)]
mod test {
    use spliceasm_nodes::{IndexSpace, Mutability, NumType, Span, ValType};

    use super::*;

    #[test]
    fn decodes_globals() -> anyhow::Result<()> {
        let mut window = DecodeWindow::new(b"\x7f\x01\x23\x00\x0b");
        let global = GlobalEntry::decode(&mut window)?;
        assert_eq!(
            global.ty,
            GlobalType(ValType::NumType(NumType::I32), Mutability::Variable)
        );
        assert_eq!(global.init.span, Span::new(2, 3));
        assert_eq!(global.init.refs[0].space, IndexSpace::Global);
        assert_eq!(global.span, Span::new(0, 5));
        Ok(())
    }
}
