use ciborium::value::Value as CborValue;

use crate::passkey::errors::PasskeyError;

/// Forward-only cursor over an untrusted byte buffer.
///
/// Every read checks the remaining length first, so a lying length prefix
/// surfaces as `MalformedInput` instead of an out-of-bounds access.
pub(super) struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(super) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(super) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub(super) fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub(super) fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8], PasskeyError> {
        if len > self.remaining() {
            return Err(PasskeyError::MalformedInput(format!(
                "{what}: needs {len} bytes, {} remaining",
                self.remaining()
            )));
        }
        let buf = self.buf;
        let bytes = &buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub(super) fn array<const N: usize>(&mut self, what: &str) -> Result<[u8; N], PasskeyError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, what)?);
        Ok(out)
    }

    pub(super) fn u8(&mut self, what: &str) -> Result<u8, PasskeyError> {
        Ok(self.array::<1>(what)?[0])
    }

    pub(super) fn u16_be(&mut self, what: &str) -> Result<u16, PasskeyError> {
        Ok(u16::from_be_bytes(self.array(what)?))
    }

    pub(super) fn u32_be(&mut self, what: &str) -> Result<u32, PasskeyError> {
        Ok(u32::from_be_bytes(self.array(what)?))
    }

    /// Decodes exactly one CBOR data item and advances past it.
    pub(super) fn cbor(&mut self, what: &str) -> Result<CborValue, PasskeyError> {
        let mut rest = &self.buf[self.pos..];
        let before = rest.len();
        let value: CborValue = ciborium::de::from_reader(&mut rest)
            .map_err(|e| PasskeyError::MalformedInput(format!("{what}: invalid CBOR: {e}")))?;
        self.pos += before - rest.len();
        Ok(value)
    }

    pub(super) fn finish(&self, what: &str) -> Result<(), PasskeyError> {
        if !self.is_empty() {
            return Err(PasskeyError::MalformedInput(format!(
                "{what}: {} trailing bytes",
                self.remaining()
            )));
        }
        Ok(())
    }
}
