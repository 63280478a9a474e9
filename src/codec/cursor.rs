//! Bounds-checked sequential reader and writer shared by every codec.
//!
//! All fixed-width integers are big-endian on the wire so that unsigned
//! byte comparison in the ordered engine matches numeric comparison.
//! The reader hands back host-order integers; no caller swaps bytes.

use bytes::{Buf, BufMut};

use crate::error::CodecError;

/// Sequential reader over a borrowed byte buffer.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    buf: &'a [u8],
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn ensure(&self, n: usize, field: &'static str) -> Result<(), CodecError> {
        if self.buf.remaining() < n {
            return Err(CodecError::Truncated { field });
        }
        Ok(())
    }

    /// Advance past `n` bytes.
    pub fn skip(&mut self, n: usize, field: &'static str) -> Result<(), CodecError> {
        self.ensure(n, field)?;
        self.buf.advance(n);
        Ok(())
    }

    pub fn read_u8(&mut self, field: &'static str) -> Result<u8, CodecError> {
        self.ensure(1, field)?;
        Ok(self.buf.get_u8())
    }

    pub fn read_u16(&mut self, field: &'static str) -> Result<u16, CodecError> {
        self.ensure(2, field)?;
        Ok(self.buf.get_u16())
    }

    pub fn read_u64(&mut self, field: &'static str) -> Result<u64, CodecError> {
        self.ensure(8, field)?;
        Ok(self.buf.get_u64())
    }

    /// Read a 2-byte length followed by that many bytes.
    pub fn read_len16_bytes(&mut self, field: &'static str) -> Result<&'a [u8], CodecError> {
        let len = self.read_u16(field)? as usize;
        self.ensure(len, field)?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    /// Everything after the cursor. Never fails.
    pub fn read_remaining(&mut self) -> &'a [u8] {
        std::mem::take(&mut self.buf)
    }
}

/// Append-only writer producing an encoded record.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn put_u8(&mut self, v: u8) -> &mut Self {
        self.buf.put_u8(v);
        self
    }

    pub fn put_u16(&mut self, v: u16) -> &mut Self {
        self.buf.put_u16(v);
        self
    }

    pub fn put_u64(&mut self, v: u64) -> &mut Self {
        self.buf.put_u64(v);
        self
    }

    /// Write a 2-byte length prefix and the bytes.
    ///
    /// # Panics
    /// If `bytes` is longer than `u16::MAX`; the prefix could not describe it.
    pub fn put_len16_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        assert!(
            bytes.len() <= u16::MAX as usize,
            "length-prefixed field of {} bytes exceeds {}",
            bytes.len(),
            u16::MAX
        );
        self.buf.put_u16(bytes.len() as u16);
        self.buf.put_slice(bytes);
        self
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.put_slice(bytes);
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_big_endian() {
        let mut dec = Decoder::new(&[0x00, 0x07, 0, 0, 0, 0, 0, 0, 0x01, 0x02]);
        assert_eq!(dec.read_u16("a").unwrap(), 7);
        assert_eq!(dec.read_u64("b").unwrap(), 0x0102);
        assert_eq!(dec.remaining(), 0);
    }

    #[test]
    fn test_skip_past_end() {
        let mut dec = Decoder::new(&[1, 2]);
        assert_eq!(
            dec.skip(3, "reserved"),
            Err(CodecError::Truncated { field: "reserved" })
        );
        // nothing consumed on failure
        assert_eq!(dec.remaining(), 2);
    }

    #[test]
    fn test_len16_bytes() {
        let mut dec = Decoder::new(&[0x00, 0x03, b'a', b'b', b'c', b'!']);
        assert_eq!(dec.read_len16_bytes("key").unwrap(), b"abc");
        assert_eq!(dec.read_remaining(), b"!");
        assert!(dec.read_remaining().is_empty());
    }

    #[test]
    fn test_len16_bytes_short_payload() {
        let mut dec = Decoder::new(&[0x00, 0x05, b'a']);
        assert_eq!(
            dec.read_len16_bytes("key"),
            Err(CodecError::Truncated { field: "key" })
        );
    }

    #[test]
    fn test_encoder_layout() {
        let mut enc = Encoder::with_capacity(16);
        enc.put_u8(b'M').put_u16(0x0102).put_len16_bytes(b"xy");
        assert_eq!(enc.finish(), vec![b'M', 0x01, 0x02, 0x00, 0x02, b'x', b'y']);
    }
}
