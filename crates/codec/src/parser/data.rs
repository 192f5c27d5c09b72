use spliceasm_nodes::{ConstExpr, DataSegment, IndexRef, IndexSpace, SegmentMode, Span};

use crate::{window::DecodeWindow, DecodeError};

use super::Decode;

impl Decode for DataSegment {
    fn decode(window: &mut DecodeWindow) -> Result<Self, DecodeError> {
        let start = window.position();
        let flags = window.take_var_u32()?;

        let mut refs = Vec::new();
        let mode = match flags {
            0 => {
                refs.push(IndexRef::implicit(IndexSpace::Memory, window.position()));
                SegmentMode::Active
            }
            1 => SegmentMode::Passive,
            2 => {
                let (value, span) = window.take_spanned_u32()?;
                refs.push(IndexRef {
                    space: IndexSpace::Memory,
                    value,
                    span,
                });
                SegmentMode::Active
            }
            flags => {
                return Err(DecodeError::BadDataFlags {
                    flags,
                    position: start,
                })
            }
        };

        if mode == SegmentMode::Active {
            refs.extend(ConstExpr::decode(window)?.refs);
        }

        let len = window.take_var_u32()? as usize;
        let bytes_at = window.position();
        window.take_n(len)?;

        Ok(DataSegment {
            mode,
            bytes: Span::new(bytes_at, len),
            refs,
            span: window.span_from(start),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn active_segments() -> anyhow::Result<()> {
        let mut window = DecodeWindow::new(b"\x00\x41\x10\x0b\x03abc");
        let data = DataSegment::decode(&mut window)?;
        assert_eq!(data.mode, SegmentMode::Active);
        assert_eq!(data.bytes, Span::new(5, 3));
        assert_eq!(data.refs, vec![IndexRef::implicit(IndexSpace::Memory, 1)]);
        assert_eq!(data.span, Span::new(0, 8));
        Ok(())
    }

    #[test]
    fn explicit_memory_index() -> anyhow::Result<()> {
        let mut window = DecodeWindow::new(b"\x02\x01\x41\x00\x0b\x00");
        let data = DataSegment::decode(&mut window)?;
        assert_eq!(data.refs[0].space, IndexSpace::Memory);
        assert_eq!(data.refs[0].value, 1);
        Ok(())
    }

    #[test]
    fn passive_segments() -> anyhow::Result<()> {
        let mut window = DecodeWindow::new(b"\x01\x02hi");
        let data = DataSegment::decode(&mut window)?;
        assert_eq!(data.mode, SegmentMode::Passive);
        assert_eq!(data.bytes, Span::new(2, 2));
        Ok(())
    }

    #[test]
    fn rejects_unknown_flags() {
        let mut window = DecodeWindow::new(b"\x03");
        assert_eq!(
            DataSegment::decode(&mut window),
            Err(DecodeError::BadDataFlags {
                flags: 3,
                position: 0
            })
        );
    }

    #[test]
    fn short_payloads_are_truncated() {
        let mut window = DecodeWindow::new(b"\x01\x05ab");
        assert!(matches!(
            DataSegment::decode(&mut window),
            Err(DecodeError::TruncatedInput { wanted: 5, .. })
        ));
    }
}
