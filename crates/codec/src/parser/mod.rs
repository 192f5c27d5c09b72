use spliceasm_nodes::VecCount;

use crate::{window::DecodeWindow, DecodeError};

pub(crate) mod code;
pub(crate) mod custom_section;
pub(crate) mod data;
pub(crate) mod elem;
pub(crate) mod export;
pub(crate) mod expr;
pub(crate) mod func;
pub(crate) mod global;
pub(crate) mod globaltype;
pub(crate) mod imports;
pub(crate) mod instr;
pub(crate) mod leb;
pub(crate) mod limits;
pub(crate) mod module;
pub(crate) mod names;
pub(crate) mod section;
pub(crate) mod types;

/// A production that can be read straight off a window.
pub(crate) trait Decode: Sized {
    fn decode(window: &mut DecodeWindow) -> Result<Self, DecodeError>;
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(window: &mut DecodeWindow) -> Result<Self, DecodeError> {
        let sz = window.take_var_u32()? as usize;
        // Never trust the declared size for the allocation; every item takes at least a byte.
        let mut v = Vec::with_capacity(sz.min(window.available()));
        for _ in 0..sz {
            v.push(T::decode(window)?);
        }
        Ok(v)
    }
}

/// Reads a section's leading item count followed by that many items.
pub(crate) fn repeated<T>(
    window: &mut DecodeWindow,
    mut item: impl FnMut(&mut DecodeWindow) -> Result<T, DecodeError>,
) -> Result<(VecCount, Box<[T]>), DecodeError> {
    let (value, span) = window.take_spanned_u32()?;
    let mut items = Vec::with_capacity((value as usize).min(window.available()));
    for _ in 0..value {
        items.push(item(window)?);
    }
    Ok((VecCount { value, span }, items.into_boxed_slice()))
}
