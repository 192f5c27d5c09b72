use spliceasm_nodes::{IndexRef, IndexSpace};

use crate::{window::DecodeWindow, DecodeError};

/// Walks an instruction sequence up to and including the `end` that closes it, collecting every
/// type, function, table, memory and global index operand it encounters.
///
/// Only operand *shapes* are checked; nothing is type-checked.
pub(crate) fn scan_expr(
    window: &mut DecodeWindow,
    refs: &mut Vec<IndexRef>,
) -> Result<(), DecodeError> {
    let mut depth = 0usize;
    loop {
        let position = window.position();
        let opcode = window.take()?;
        match opcode {
            // unreachable, nop
            0x00 | 0x01 => {}

            // block, loop, if
            0x02..=0x04 => {
                block_type(window, refs)?;
                depth += 1;
            }

            // else
            0x05 => {}

            // end
            0x0b => {
                if depth == 0 {
                    return Ok(());
                }
                depth -= 1;
            }

            // br, br_if
            0x0c | 0x0d => {
                window.take_var_u32()?;
            }

            // br_table
            0x0e => {
                let len = window.take_var_u32()?;
                for _ in 0..=len {
                    window.take_var_u32()?;
                }
            }

            // return
            0x0f => {}

            // call, return_call
            0x10 | 0x12 => index(window, IndexSpace::Func, refs)?,

            // call_indirect, return_call_indirect
            0x11 | 0x13 => {
                index(window, IndexSpace::Type, refs)?;
                index(window, IndexSpace::Table, refs)?;
            }

            // drop, select
            0x1a | 0x1b => {}

            // select t*
            0x1c => {
                let len = window.take_var_u32()?;
                window.take_n(len as usize)?;
            }

            // local.get, local.set, local.tee
            0x20..=0x22 => {
                window.take_var_u32()?;
            }

            // global.get, global.set
            0x23 | 0x24 => index(window, IndexSpace::Global, refs)?,

            // table.get, table.set
            0x25 | 0x26 => index(window, IndexSpace::Table, refs)?,

            // loads and stores
            0x28..=0x3e => memarg(window, refs)?,

            // memory.size, memory.grow
            0x3f | 0x40 => index(window, IndexSpace::Memory, refs)?,

            0x41 => {
                window.take_var_i32()?;
            }
            0x42 => {
                window.take_var_i64()?;
            }
            0x43 => {
                window.take_n(4)?;
            }
            0x44 => {
                window.take_n(8)?;
            }

            // numeric instructions without immediates
            0x45..=0xc4 => {}

            // ref.null
            0xd0 => heap_type(window, refs)?,

            // ref.is_null
            0xd1 => {}

            // ref.func
            0xd2 => index(window, IndexSpace::Func, refs)?,

            0xfc => misc(window, refs, position)?,
            0xfd => simd(window, refs, position)?,
            0xfe => atomic(window, refs, position)?,

            opcode => {
                return Err(DecodeError::UnknownOpcode {
                    opcode,
                    subcode: None,
                    position,
                })
            }
        }
    }
}

fn index(
    window: &mut DecodeWindow,
    space: IndexSpace,
    refs: &mut Vec<IndexRef>,
) -> Result<(), DecodeError> {
    let (value, span) = window.take_spanned_u32()?;
    refs.push(IndexRef { space, value, span });
    Ok(())
}

fn memarg(window: &mut DecodeWindow, refs: &mut Vec<IndexRef>) -> Result<(), DecodeError> {
    let at = window.position();
    let align = window.take_var_u32()?;
    // Multi-memory: bit 6 of the alignment announces an explicit memory index.
    if align & 0x40 != 0 {
        index(window, IndexSpace::Memory, refs)?;
    } else {
        refs.push(IndexRef::implicit(IndexSpace::Memory, at));
    }
    window.take_var_u64()?;
    Ok(())
}

fn block_type(window: &mut DecodeWindow, refs: &mut Vec<IndexRef>) -> Result<(), DecodeError> {
    match window.peek()? {
        0x40 | 0x7f | 0x7e | 0x7d | 0x7c | 0x7b | 0x70 | 0x6f => {
            window.take()?;
        }
        byte => {
            let start = window.position();
            let idx = window.take_var_s33()?;
            if !(0..=u32::MAX as i64).contains(&idx) {
                return Err(DecodeError::BadType {
                    byte,
                    position: start,
                });
            }
            refs.push(IndexRef {
                space: IndexSpace::Type,
                value: idx as u32,
                span: window.span_from(start),
            });
        }
    }
    Ok(())
}

fn heap_type(window: &mut DecodeWindow, refs: &mut Vec<IndexRef>) -> Result<(), DecodeError> {
    match window.peek()? {
        0x70 | 0x6f => {
            window.take()?;
            Ok(())
        }
        _ => block_type(window, refs),
    }
}

fn misc(
    window: &mut DecodeWindow,
    refs: &mut Vec<IndexRef>,
    position: usize,
) -> Result<(), DecodeError> {
    match window.take_var_u32()? {
        // saturating truncations
        0..=7 => {}
        // memory.init
        8 => {
            window.take_var_u32()?;
            index(window, IndexSpace::Memory, refs)?;
        }
        // data.drop
        9 => {
            window.take_var_u32()?;
        }
        // memory.copy
        10 => {
            index(window, IndexSpace::Memory, refs)?;
            index(window, IndexSpace::Memory, refs)?;
        }
        // memory.fill
        11 => index(window, IndexSpace::Memory, refs)?,
        // table.init
        12 => {
            window.take_var_u32()?;
            index(window, IndexSpace::Table, refs)?;
        }
        // elem.drop
        13 => {
            window.take_var_u32()?;
        }
        // table.copy
        14 => {
            index(window, IndexSpace::Table, refs)?;
            index(window, IndexSpace::Table, refs)?;
        }
        // table.grow, table.size, table.fill
        15..=17 => index(window, IndexSpace::Table, refs)?,
        subcode => {
            return Err(DecodeError::UnknownOpcode {
                opcode: 0xfc,
                subcode: Some(subcode),
                position,
            })
        }
    }
    Ok(())
}

fn simd(
    window: &mut DecodeWindow,
    refs: &mut Vec<IndexRef>,
    position: usize,
) -> Result<(), DecodeError> {
    match window.take_var_u32()? {
        // v128 loads and stores
        0..=11 => memarg(window, refs)?,
        // v128.const, i8x16.shuffle
        12 | 13 => {
            window.take_n(16)?;
        }
        // lane extracts and replaces
        21..=34 => {
            window.take()?;
        }
        // load/store lane
        84..=91 => {
            memarg(window, refs)?;
            window.take()?;
        }
        // load zero
        92 | 93 => memarg(window, refs)?,
        // everything else in the simd and relaxed-simd spaces has no immediates
        14..=20 | 35..=83 | 94..=0x113 => {}
        subcode => {
            return Err(DecodeError::UnknownOpcode {
                opcode: 0xfd,
                subcode: Some(subcode),
                position,
            })
        }
    }
    Ok(())
}

fn atomic(
    window: &mut DecodeWindow,
    refs: &mut Vec<IndexRef>,
    position: usize,
) -> Result<(), DecodeError> {
    match window.take_var_u32()? {
        // atomic.fence
        0x03 => {
            window.take()?;
        }
        0x00..=0x02 | 0x10..=0x4e => memarg(window, refs)?,
        subcode => {
            return Err(DecodeError::UnknownOpcode {
                opcode: 0xfe,
                subcode: Some(subcode),
                position,
            })
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use spliceasm_nodes::Span;

    use super::*;

    fn scan(bytes: &[u8]) -> Result<(Vec<IndexRef>, usize), DecodeError> {
        let mut window = DecodeWindow::new(bytes);
        let mut refs = Vec::new();
        scan_expr(&mut window, &mut refs)?;
        Ok((refs, window.position()))
    }

    #[test]
    fn stops_at_the_outermost_end() -> anyhow::Result<()> {
        // block (result i32) i32.const 1 end end <trailing>
        let (refs, consumed) = scan(b"\x02\x7f\x41\x01\x0b\x0b\xff")?;
        assert!(refs.is_empty());
        assert_eq!(consumed, 6);
        Ok(())
    }

    #[test]
    fn records_call_operands() -> anyhow::Result<()> {
        // call 3; call_indirect (type 2) (table 0); end
        let (refs, _) = scan(b"\x10\x03\x11\x02\x00\x0b")?;
        assert_eq!(
            refs,
            vec![
                IndexRef {
                    space: IndexSpace::Func,
                    value: 3,
                    span: Span::new(1, 1)
                },
                IndexRef {
                    space: IndexSpace::Type,
                    value: 2,
                    span: Span::new(3, 1)
                },
                IndexRef {
                    space: IndexSpace::Table,
                    value: 0,
                    span: Span::new(4, 1)
                },
            ]
        );
        Ok(())
    }

    #[test]
    fn records_block_type_indices() -> anyhow::Result<()> {
        // block (type 1) end end
        let (refs, _) = scan(b"\x02\x01\x0b\x0b")?;
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].space, IndexSpace::Type);
        assert_eq!(refs[0].value, 1);
        Ok(())
    }

    #[test]
    fn records_globals_and_memories() -> anyhow::Result<()> {
        // global.get 1; i32.load align=2 offset=4; memory.size 0; ref.func 7; drop...; end
        let (refs, _) = scan(b"\x23\x01\x28\x02\x04\x3f\x00\xd2\x07\x0b")?;
        let spaces: Vec<_> = refs.iter().map(|xs| (xs.space, xs.value)).collect();
        assert_eq!(
            spaces,
            vec![
                (IndexSpace::Global, 1),
                (IndexSpace::Memory, 0),
                (IndexSpace::Memory, 0),
                (IndexSpace::Func, 7)
            ]
        );
        // The load names memory 0 without encoding it.
        assert_eq!(refs[1], IndexRef::implicit(IndexSpace::Memory, 3));
        assert!(!refs[2].is_implicit());
        Ok(())
    }

    #[test]
    fn explicit_memory_operands() -> anyhow::Result<()> {
        // i32.load align=2|0x40 memory 1 offset=0; end
        let (refs, _) = scan(b"\x28\x42\x01\x00\x0b")?;
        assert_eq!(
            refs,
            vec![IndexRef {
                space: IndexSpace::Memory,
                value: 1,
                span: Span::new(2, 1)
            }]
        );
        Ok(())
    }

    #[test]
    fn skips_wide_immediates() -> anyhow::Result<()> {
        // f64.const; v128.const; br_table [0 1] 2; end
        let mut bytes = vec![0x44];
        bytes.extend([0u8; 8]);
        bytes.extend([0xfd, 0x0c]);
        bytes.extend([0u8; 16]);
        bytes.extend([0x0e, 0x02, 0x00, 0x01, 0x02, 0x0b]);
        let (refs, consumed) = scan(&bytes)?;
        assert!(refs.is_empty());
        assert_eq!(consumed, bytes.len());
        Ok(())
    }

    #[test]
    fn unknown_opcodes_fail() {
        assert_eq!(
            scan(b"\x41\x00\x06\x0b").map(|_| ()),
            Err(DecodeError::UnknownOpcode {
                opcode: 0x06,
                subcode: None,
                position: 2
            })
        );
    }

    #[test]
    fn missing_end_is_truncated() {
        assert!(matches!(
            scan(b"\x41\x00"),
            Err(DecodeError::TruncatedInput { .. })
        ));
    }
}
