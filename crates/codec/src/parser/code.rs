use spliceasm_nodes::{CodeEntry, Local, Span, ValType};

use crate::{window::DecodeWindow, DecodeError};

use super::{instr::scan_expr, Decode};

impl Decode for Local {
    fn decode(window: &mut DecodeWindow) -> Result<Self, DecodeError> {
        let count = window.take_var_u32()?;
        let val_type = ValType::decode(window)?;
        Ok(Local(count, val_type))
    }
}

/// Reads one code entry. With `decode_body` unset only the size prefix and body spans are
/// recorded; the body bytes are stepped over unread.
pub(crate) fn decode_code_entry(
    window: &mut DecodeWindow,
    decode_body: bool,
) -> Result<CodeEntry, DecodeError> {
    let start = window.position();
    let (declared, size) = window.take_spanned_u32()?;
    let mut body = window.slice(declared as usize)?;
    let body_span = Span::new(body.position(), declared as usize);

    let (locals, refs) = if decode_body {
        let locals = Vec::<Local>::decode(&mut body)?;
        let mut refs = Vec::new();
        scan_expr(&mut body, &mut refs)?;
        if !body.is_empty() {
            return Err(DecodeError::BodySizeMismatch {
                declared: declared as usize,
                consumed: body.offset(),
                position: start,
            });
        }
        (Some(locals.into_boxed_slice()), Some(refs))
    } else {
        (None, None)
    };

    Ok(CodeEntry {
        size,
        body: body_span,
        locals,
        refs,
        span: window.span_from(start),
    })
}
