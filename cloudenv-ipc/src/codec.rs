//! Element framing
//!
//! An element is a big-endian `u32` byte length followed by that many bytes
//! of UTF-8.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::IpcError;

const LENGTH_PREFIX: usize = 4;

/// Write side of the element framing
#[derive(Debug, Default)]
pub struct ElementSink {
    buf: BytesMut,
}

impl ElementSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_element(&mut self, element: &str) -> Result<(), IpcError> {
        let len = u32::try_from(element.len())
            .map_err(|_| IpcError::ElementTooLarge(element.len()))?;
        self.buf.reserve(LENGTH_PREFIX + element.len());
        self.buf.put_u32(len);
        self.buf.put_slice(element.as_bytes());
        Ok(())
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    /// Append already framed bytes verbatim
    pub fn put_raw(&mut self, raw: &[u8]) {
        self.buf.put_slice(raw);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Read side of the element framing
#[derive(Debug, Clone)]
pub struct ElementSource {
    buf: Bytes,
}

impl ElementSource {
    pub fn new(buf: impl Into<Bytes>) -> Self {
        Self { buf: buf.into() }
    }

    fn ensure(&self, needed: usize) -> Result<(), IpcError> {
        if self.buf.remaining() < needed {
            return Err(IpcError::Truncated {
                needed,
                available: self.buf.remaining(),
            });
        }
        Ok(())
    }

    pub fn get_u8(&mut self) -> Result<u8, IpcError> {
        self.ensure(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn get_element(&mut self) -> Result<String, IpcError> {
        self.ensure(LENGTH_PREFIX)?;
        let mut prefix = [0u8; LENGTH_PREFIX];
        prefix.copy_from_slice(&self.buf[..LENGTH_PREFIX]);
        let len = u32::from_be_bytes(prefix) as usize;
        self.ensure(LENGTH_PREFIX + len)?;

        self.buf.advance(LENGTH_PREFIX);
        let element = self.buf.split_to(len);
        Ok(String::from_utf8(element.to_vec())?)
    }

    /// Take every unread byte, leaving the source empty
    pub fn take_remaining(&mut self) -> Bytes {
        self.buf.split_to(self.buf.len())
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
