use spliceasm_nodes::{Name, Span};

use crate::{parser::leb, DecodeError};

/// A bounds-checked cursor over (a slice of) the module bytes.
///
/// Every read advances the cursor. Positions reported by the window are absolute, i.e. relative
/// to the start of the whole module rather than to the current slice.
#[derive(Debug, Clone)]
pub struct DecodeWindow<'a> {
    chunk: &'a [u8],
    offset: usize,
    start_pos: usize,
}

impl<'a> DecodeWindow<'a> {
    pub fn new(chunk: &'a [u8]) -> Self {
        Self {
            chunk,
            offset: 0,
            start_pos: 0,
        }
    }

    pub fn available(&self) -> usize {
        self.chunk.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.available() == 0
    }

    /// Offset represents the number of bytes consumed from the current chunk.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Position represents the number of bytes consumed from the entire stream.
    pub fn position(&self) -> usize {
        self.offset + self.start_pos
    }

    /// The span between `start` (an earlier [`position`](Self::position)) and the cursor.
    pub fn span_from(&self, start: usize) -> Span {
        Span::from_range(start, self.position())
    }

    fn truncated(&self, wanted: usize) -> DecodeError {
        DecodeError::TruncatedInput {
            position: self.position(),
            wanted,
            available: self.available(),
        }
    }

    /// Splits the next `take` bytes off into their own window and advances past them.
    pub fn slice(&mut self, take: usize) -> Result<Self, DecodeError> {
        if take > self.available() {
            return Err(self.truncated(take));
        }
        let window = Self {
            chunk: &self.chunk[self.offset..self.offset + take],
            offset: 0,
            start_pos: self.position(),
        };
        self.offset += take;
        Ok(window)
    }

    pub fn peek(&self) -> Result<u8, DecodeError> {
        self.chunk
            .get(self.offset)
            .copied()
            .ok_or_else(|| self.truncated(1))
    }

    pub fn take(&mut self) -> Result<u8, DecodeError> {
        let next = self.peek()?;
        self.offset += 1;
        Ok(next)
    }

    pub fn take_n(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if len > self.available() {
            return Err(self.truncated(len));
        }
        let chunk = self.chunk;
        let xs = &chunk[self.offset..self.offset + len];
        self.offset += len;
        Ok(xs)
    }

    pub fn take_u32_le(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.take_n(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Consumes whatever is left.
    pub fn take_rest(&mut self) -> &'a [u8] {
        let chunk = self.chunk;
        let xs = &chunk[self.offset..];
        self.offset = chunk.len();
        xs
    }

    pub fn take_var_u32(&mut self) -> Result<u32, DecodeError> {
        leb::read_unsigned(self, u32::BITS).map(|xs| xs as u32)
    }

    pub fn take_var_u64(&mut self) -> Result<u64, DecodeError> {
        leb::read_unsigned(self, u64::BITS)
    }

    pub fn take_var_i32(&mut self) -> Result<i32, DecodeError> {
        leb::read_signed(self, i32::BITS).map(|xs| xs as i32)
    }

    pub fn take_var_i64(&mut self) -> Result<i64, DecodeError> {
        leb::read_signed(self, i64::BITS)
    }

    /// The 33-bit signed integer used by block types.
    pub fn take_var_s33(&mut self) -> Result<i64, DecodeError> {
        leb::read_signed(self, 33)
    }

    /// A varU32 together with the bytes that encode it.
    pub fn take_spanned_u32(&mut self) -> Result<(u32, Span), DecodeError> {
        let start = self.position();
        let value = self.take_var_u32()?;
        Ok((value, self.span_from(start)))
    }

    pub fn take_name(&mut self) -> Result<Name, DecodeError> {
        let start = self.position();
        let len = self.take_var_u32()? as usize;
        let bytes_at = self.position();
        let bytes = self.take_n(len)?;
        let value = std::str::from_utf8(bytes)
            .map_err(|_| DecodeError::InvalidUtf8 { position: bytes_at })?
            .to_string();
        Ok(Name {
            value,
            span: self.span_from(start),
        })
    }
}
