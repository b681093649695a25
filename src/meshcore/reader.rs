//! Bounds-checked cursor over a packet buffer.
//!
//! Every read names the field it is reading so a short buffer surfaces as a
//! [`DecodeError::Truncated`] that says exactly where the packet ran out.
use bytes::Buf;

use crate::error::DecodeError;

#[derive(Debug, Clone)]
pub struct PacketReader<'a> {
    buf: &'a [u8],
}

impl<'a> PacketReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn ensure(&self, field: &'static str, needed: usize) -> Result<(), DecodeError> {
        if self.buf.remaining() < needed {
            return Err(DecodeError::Truncated {
                field,
                needed,
                remaining: self.buf.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self, field: &'static str) -> Result<u8, DecodeError> {
        self.ensure(field, 1)?;
        Ok(self.buf.get_u8())
    }

    pub fn read_u16_le(&mut self, field: &'static str) -> Result<u16, DecodeError> {
        self.ensure(field, 2)?;
        Ok(self.buf.get_u16_le())
    }

    pub fn read_u32_le(&mut self, field: &'static str) -> Result<u32, DecodeError> {
        self.ensure(field, 4)?;
        Ok(self.buf.get_u32_le())
    }

    pub fn read_i32_le(&mut self, field: &'static str) -> Result<i32, DecodeError> {
        self.ensure(field, 4)?;
        Ok(self.buf.get_i32_le())
    }

    /// Borrow the next `len` bytes.
    pub fn read_bytes(&mut self, field: &'static str, len: usize) -> Result<&'a [u8], DecodeError> {
        self.ensure(field, len)?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    /// Read a fixed-size array (keys, signatures).
    pub fn read_array<const N: usize>(&mut self, field: &'static str) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(field, N)?);
        Ok(out)
    }

    pub fn skip(&mut self, field: &'static str, len: usize) -> Result<(), DecodeError> {
        self.ensure(field, len)?;
        self.buf.advance(len);
        Ok(())
    }

    /// Consume everything that is left. Never fails; may be empty.
    pub fn rest(&mut self) -> &'a [u8] {
        std::mem::take(&mut self.buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_fields_in_order() {
        let data = [0x01, 0x34, 0x12, 0xff, 0xff, 0xff, 0xff, 0xaa, 0xbb];
        let mut r = PacketReader::new(&data);
        assert_eq!(r.read_u8("a").unwrap(), 1);
        assert_eq!(r.read_u16_le("b").unwrap(), 0x1234);
        assert_eq!(r.read_i32_le("c").unwrap(), -1);
        assert_eq!(r.rest(), &[0xaa, 0xbb]);
        assert_eq!(r.remaining(), 0);
        assert!(r.rest().is_empty());
    }

    #[test]
    fn underflow_names_the_field() {
        let data = [0x01, 0x02];
        let mut r = PacketReader::new(&data);
        let err = r.read_u32_le("timestamp").unwrap_err();
        assert_eq!(
            err,
            DecodeError::Truncated {
                field: "timestamp",
                needed: 4,
                remaining: 2
            }
        );
        // A failed read consumes nothing.
        assert_eq!(r.remaining(), 2);
        assert!(r.skip("feat1", 3).is_err());
        assert!(r.skip("feat1", 2).is_ok());
    }

    #[test]
    fn read_array_copies_exact_length() {
        let data: Vec<u8> = (0u8..40).collect();
        let mut r = PacketReader::new(&data);
        let key: [u8; 32] = r.read_array("public key").unwrap();
        assert_eq!(key[0], 0);
        assert_eq!(key[31], 31);
        assert_eq!(r.remaining(), 8);
    }
}
