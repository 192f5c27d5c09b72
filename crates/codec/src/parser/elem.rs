use spliceasm_nodes::{ConstExpr, ElementSegment, IndexRef, IndexSpace, SegmentMode};

use crate::{window::DecodeWindow, DecodeError};

use super::Decode;

// ┌─── element type+exprs vs element kind + element idx; vec of func idx or vec of expr
// │┌── if low bit is 1: passive or declarative; if low bit is 0: whether or not we have a tableidx
// ││┌─ Passive or Declarative
// ↓↓↓
// 000: expr vec<funcidx>                      -> active
// 001: elemkind vec<funcidx>                  -> passive
// 010: tableidx expr elemkind vec<funcidx>    -> active
// 011: elemkind vec<funcidx>                  -> declarative
// 100: expr vec<expr>                         -> active
// 101: reftype vec<expr>                      -> passive
// 110: tableidx expr reftype vec<expr>        -> active
// 111: reftype vec<expr>                      -> declarative
impl Decode for ElementSegment {
    fn decode(window: &mut DecodeWindow) -> Result<Self, DecodeError> {
        let start = window.position();
        let flags = window.take_var_u32()?;
        if flags > 7 {
            return Err(DecodeError::BadElementFlags {
                flags,
                position: start,
            });
        }

        let mut refs = Vec::new();
        let mode = match flags & 0b011 {
            0b000 => {
                refs.push(IndexRef::implicit(IndexSpace::Table, window.position()));
                SegmentMode::Active
            }
            0b010 => {
                let (value, span) = window.take_spanned_u32()?;
                refs.push(IndexRef {
                    space: IndexSpace::Table,
                    value,
                    span,
                });
                SegmentMode::Active
            }
            0b001 => SegmentMode::Passive,
            _ => SegmentMode::Declarative,
        };

        if mode == SegmentMode::Active {
            refs.extend(ConstExpr::decode(window)?.refs);
        }

        // Flags 0 and 4 imply funcref and carry no elemkind/reftype byte.
        if flags & 0b011 != 0 {
            window.take()?;
        }

        let len = window.take_var_u32()?;
        if flags & 0b100 == 0 {
            for _ in 0..len {
                let (value, span) = window.take_spanned_u32()?;
                refs.push(IndexRef {
                    space: IndexSpace::Func,
                    value,
                    span,
                });
            }
        } else {
            for _ in 0..len {
                refs.extend(ConstExpr::decode(window)?.refs);
            }
        }

        Ok(ElementSegment {
            mode,
            flags,
            len,
            refs,
            span: window.span_from(start),
        })
    }
}
