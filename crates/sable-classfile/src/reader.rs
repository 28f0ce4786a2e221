use crate::error::{Error, Result};

/// Bounds-checked big-endian cursor over a byte slice.
pub(crate) struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub(crate) fn read_u1(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn read_u2(&mut self) -> Result<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub(crate) fn read_u4(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub(crate) fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.take(len)
    }

    /// Fails unless every byte has been consumed. Attribute payloads use this
    /// to reject truncated or oversized encodings.
    pub(crate) fn ensure_empty(&self) -> Result<()> {
        if self.pos == self.bytes.len() {
            Ok(())
        } else {
            Err(Error::TrailingBytes)
        }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or(Error::UnexpectedEof)?;
        let slice = self.bytes.get(self.pos..end).ok_or(Error::UnexpectedEof)?;
        self.pos = end;
        Ok(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian_integers() {
        let mut r = Reader::new(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07]);
        assert_eq!(r.read_u1().unwrap(), 0x01);
        assert_eq!(r.read_u2().unwrap(), 0x0203);
        assert_eq!(r.read_u4().unwrap(), 0x0405_0607);
        assert!(r.ensure_empty().is_ok());
    }

    #[test]
    fn rejects_reads_past_the_end() {
        let mut r = Reader::new(&[0x01]);
        assert_eq!(r.read_u2(), Err(Error::UnexpectedEof));
    }

    #[test]
    fn ensure_empty_rejects_leftovers() {
        let mut r = Reader::new(&[0x01, 0x02]);
        r.read_u1().unwrap();
        assert_eq!(r.ensure_empty(), Err(Error::TrailingBytes));
    }
}
