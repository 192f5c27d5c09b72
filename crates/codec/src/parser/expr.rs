use spliceasm_nodes::ConstExpr;

use crate::{window::DecodeWindow, DecodeError};

use super::{instr::scan_expr, Decode};

impl Decode for ConstExpr {
    fn decode(window: &mut DecodeWindow) -> Result<Self, DecodeError> {
        let start = window.position();
        let mut refs = Vec::new();
        scan_expr(window, &mut refs)?;
        Ok(ConstExpr {
            span: window.span_from(start),
            refs,
        })
    }
}
