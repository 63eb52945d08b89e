//! Bounded cursors over protocol message buffers.
//!
//! All multi-byte integers on the wire are little-endian. Both cursors check
//! bounds before touching the buffer and leave their position untouched when a
//! check fails, so a caller that sees an error can still report how far it got.

use crate::ProtocolError;

/// Bounded read cursor over a received message.
#[derive(Debug)]
pub struct MsgReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> MsgReader<'a> {
    /// Creates a reader over `buf`, positioned at its first byte.
    #[must_use]
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes left between the cursor and the end of the buffer.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Whether the cursor has consumed the whole buffer.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.pos == self.buf.len()
    }

    /// Borrows the next `len` bytes and advances past them.
    fn take(&mut self, len: usize) -> Result<&'a [u8], ProtocolError> {
        if len > self.remaining() {
            return Err(ProtocolError::BufferUnderflow {
                needed: len,
                available: self.remaining(),
            });
        }
        let span = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(span)
    }

    /// Reads one byte.
    pub fn read_byte(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.take(1)?[0])
    }

    /// Reads a little-endian 16-bit integer.
    ///
    /// Carried unsigned: the field's only use is the entry flag word, which
    /// is a bit field, not a quantity.
    pub fn read_short(&mut self) -> Result<u16, ProtocolError> {
        let span = self.take(2)?;
        Ok(u16::from_le_bytes([span[0], span[1]]))
    }

    /// Reads a little-endian signed 32-bit integer.
    pub fn read_int(&mut self) -> Result<i32, ProtocolError> {
        let span = self.take(4)?;
        Ok(i32::from_le_bytes([span[0], span[1], span[2], span[3]]))
    }

    /// Reads a little-endian signed 64-bit integer.
    pub fn read_long(&mut self) -> Result<i64, ProtocolError> {
        let span = self.take(8)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(span);
        Ok(i64::from_le_bytes(bytes))
    }

    /// Borrows the next `len` bytes as an opaque span.
    pub fn read_data(&mut self, len: usize) -> Result<&'a [u8], ProtocolError> {
        self.take(len)
    }
}

/// Bounded write cursor over an outgoing message buffer.
#[derive(Debug)]
pub struct MsgWriter<'a> {
    buf: &'a mut [u8],
    written: usize,
}

impl<'a> MsgWriter<'a> {
    /// Creates a writer over `buf`, positioned at its first byte.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, written: 0 }
    }

    /// Bytes appended so far.
    #[must_use]
    pub const fn written(&self) -> usize {
        self.written
    }

    /// Capacity left between the cursor and the end of the buffer.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buf.len() - self.written
    }

    /// Borrows the assembled prefix of the buffer.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.written]
    }

    /// Appends `data`, failing without a partial write if it does not fit.
    pub fn write_data(&mut self, data: &[u8]) -> Result<(), ProtocolError> {
        if data.len() > self.remaining() {
            return Err(ProtocolError::BufferOverflow {
                needed: data.len(),
                available: self.remaining(),
            });
        }
        self.buf[self.written..self.written + data.len()].copy_from_slice(data);
        self.written += data.len();
        Ok(())
    }

    /// Appends one byte.
    pub fn write_byte(&mut self, value: u8) -> Result<(), ProtocolError> {
        self.write_data(&[value])
    }

    /// Appends a little-endian 16-bit integer, unsigned for the same reason
    /// [`MsgReader::read_short`] reads one.
    pub fn write_short(&mut self, value: u16) -> Result<(), ProtocolError> {
        self.write_data(&value.to_le_bytes())
    }

    /// Appends a little-endian signed 32-bit integer.
    pub fn write_int(&mut self, value: i32) -> Result<(), ProtocolError> {
        self.write_data(&value.to_le_bytes())
    }

    /// Appends a little-endian signed 64-bit integer.
    pub fn write_long(&mut self, value: i64) -> Result<(), ProtocolError> {
        self.write_data(&value.to_le_bytes())
    }
}
