use divrem::DivCeil;

use crate::{window::DecodeWindow, DecodeError};

/// Largest number of bytes a LEB128 encoding of a `bits`-wide integer may use.
#[inline]
pub(crate) fn max_bytes(bits: u32) -> usize {
    DivCeil::div_ceil(bits, 7) as usize
}

/// Reads an unsigned LEB128 integer of at most `bits` bits.
///
/// Fails with `TruncatedInput` when no bytes remain at all and with `MalformedVarint` when the
/// encoding runs past `max_bytes(bits)`, sets bits beyond `bits` in its final byte, or is cut
/// off by the end of the window.
pub(crate) fn read_unsigned(window: &mut DecodeWindow, bits: u32) -> Result<u64, DecodeError> {
    let position = window.position();
    window.peek()?;

    let max = max_bytes(bits);
    let mut result = 0u64;
    let mut shift = 0u32;
    for idx in 0..max {
        let next = window
            .take()
            .map_err(|_| DecodeError::MalformedVarint { position })?;
        result |= u64::from(next & 0x7f) << shift;

        if next & 0x80 == 0 {
            if idx == max - 1 {
                let used = bits - shift;
                if used < 7 && (next & 0x7f) >> used != 0 {
                    return Err(DecodeError::MalformedVarint { position });
                }
            }
            return Ok(result);
        }
        shift += 7;
    }

    Err(DecodeError::MalformedVarint { position })
}

/// Reads a signed LEB128 integer of at most `bits` bits, sign-extended to 64 bits.
pub(crate) fn read_signed(window: &mut DecodeWindow, bits: u32) -> Result<i64, DecodeError> {
    let position = window.position();
    window.peek()?;

    let max = max_bytes(bits);
    let mut result = 0i64;
    let mut shift = 0u32;
    for idx in 0..max {
        let next = window
            .take()
            .map_err(|_| DecodeError::MalformedVarint { position })?;
        result |= i64::from(next & 0x7f) << shift;

        if next & 0x80 == 0 {
            if idx == max - 1 {
                // The bits past the target width must all repeat the sign bit.
                let used = bits - shift;
                if used < 7 {
                    let rest = (next & 0x7f) >> (used - 1);
                    if rest != 0 && rest != (0x7f >> (used - 1)) {
                        return Err(DecodeError::MalformedVarint { position });
                    }
                }
            }
            shift += 7;
            if shift < 64 && (next & 0x40) == 0x40 {
                result |= !0 << shift;
            }
            return Ok(result);
        }
        shift += 7;
    }

    Err(DecodeError::MalformedVarint { position })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_read_u32() {
        for value in [8082008u32, u32::MAX, u32::MIN, 0, 127, 128] {
            let mut v = Vec::new();
            leb128::write::unsigned(&mut v, value as u64).unwrap();
            let mut window = DecodeWindow::new(&v);
            assert_eq!(window.take_var_u32().unwrap(), value);
            assert!(window.is_empty());
        }
    }

    #[test]
    fn test_read_i32() {
        for value in [8082008i32, -45, i32::MAX, i32::MIN, 0, -1, 63, -64, 64] {
            let mut v = Vec::new();
            leb128::write::signed(&mut v, value as i64).unwrap();
            let mut window = DecodeWindow::new(&v);
            assert_eq!(window.take_var_i32().unwrap(), value);
            assert!(window.is_empty());
        }
    }

    #[test]
    fn test_read_i64() {
        for value in [i64::MAX, i64::MIN, -1, 1 << 40] {
            let mut v = Vec::new();
            leb128::write::signed(&mut v, value).unwrap();
            let mut window = DecodeWindow::new(&v);
            assert_eq!(window.take_var_i64().unwrap(), value);
        }
    }

    #[test]
    fn test_read_u64() {
        let mut v = Vec::new();
        leb128::write::unsigned(&mut v, u64::MAX).unwrap();
        assert_eq!(v.len(), 10);
        let mut window = DecodeWindow::new(&v);
        assert_eq!(window.take_var_u64().unwrap(), u64::MAX);
    }

    #[test]
    fn padded_encodings_are_accepted() {
        let mut window = DecodeWindow::new(b"\x85\x80\x80\x80\x00");
        assert_eq!(window.take_var_u32().unwrap(), 5);
        assert_eq!(window.position(), 5);
    }

    #[test]
    fn s33_block_type_indices() {
        let mut window = DecodeWindow::new(b"\x40");
        assert_eq!(window.take_var_s33().unwrap(), -64);

        let mut window = DecodeWindow::new(b"\x05");
        assert_eq!(window.take_var_s33().unwrap(), 5);
    }

    #[test]
    fn overlong_u32_is_malformed() {
        let mut window = DecodeWindow::new(b"\x80\x80\x80\x80\x80\x00");
        assert_eq!(
            window.take_var_u32(),
            Err(DecodeError::MalformedVarint { position: 0 })
        );
    }

    #[test]
    fn unused_high_bits_are_malformed() {
        // 0x1f sets bits 32..=35 of a u32.
        let mut window = DecodeWindow::new(b"\xff\xff\xff\xff\x1f");
        assert!(matches!(
            window.take_var_u32(),
            Err(DecodeError::MalformedVarint { .. })
        ));

        let mut window = DecodeWindow::new(b"\xff\xff\xff\xff\x0f");
        assert_eq!(window.take_var_u32().unwrap(), u32::MAX);
    }

    #[test]
    fn signed_overflow_is_malformed() {
        let mut window = DecodeWindow::new(b"\x80\x80\x80\x80\x78");
        assert_eq!(window.take_var_i32().unwrap(), i32::MIN);

        let mut window = DecodeWindow::new(b"\x80\x80\x80\x80\x30");
        assert!(matches!(
            window.take_var_i32(),
            Err(DecodeError::MalformedVarint { .. })
        ));
    }

    #[test]
    fn unterminated_varint_is_malformed() {
        let mut window = DecodeWindow::new(b"\x00\x80\x80");
        window.take().unwrap();
        assert_eq!(
            window.take_var_u32(),
            Err(DecodeError::MalformedVarint { position: 1 })
        );
    }

    #[test]
    fn empty_input_is_truncated() {
        let mut window = DecodeWindow::new(b"");
        assert!(matches!(
            window.take_var_u32(),
            Err(DecodeError::TruncatedInput { wanted: 1, .. })
        ));
    }
}
