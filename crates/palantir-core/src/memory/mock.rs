//! In-memory fake of a foreign address space for tests.
//!
//! Fixtures are assembled byte-by-byte at arbitrary addresses; reads succeed
//! only when every byte of the requested range was written, which mirrors
//! the all-or-nothing contract of the live reader.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::memory::reader::{ByteBuffer, ReadMemory};

#[derive(Debug, Default)]
pub struct MockMemoryBuilder {
    pointer_size: Option<usize>,
    bytes: BTreeMap<u64, u8>,
}

impl MockMemoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the simulated pointer width (defaults to 8).
    pub fn pointer_size(mut self, size: usize) -> Self {
        self.pointer_size = Some(size);
        self
    }

    pub fn bytes(mut self, address: u64, data: &[u8]) -> Self {
        for (i, &b) in data.iter().enumerate() {
            self.bytes.insert(address + i as u64, b);
        }
        self
    }

    pub fn u32(self, address: u64, value: u32) -> Self {
        self.bytes(address, &value.to_le_bytes())
    }

    pub fn u64(self, address: u64, value: u64) -> Self {
        self.bytes(address, &value.to_le_bytes())
    }

    pub fn f32(self, address: u64, value: f32) -> Self {
        self.bytes(address, &value.to_le_bytes())
    }

    /// Write a pointer at the simulated width.
    pub fn pointer(self, address: u64, value: u64) -> Self {
        if self.pointer_size.unwrap_or(8) == 8 {
            self.u64(address, value)
        } else {
            self.u32(address, value as u32)
        }
    }

    /// Write a NUL-terminated Latin-1 string.
    pub fn latin1(self, address: u64, text: &str) -> Self {
        let mut data: Vec<u8> = text.chars().map(|c| c as u8).collect();
        data.push(0);
        self.bytes(address, &data)
    }

    /// Write a NUL-terminated UTF-16LE string.
    pub fn utf16(self, address: u64, text: &str) -> Self {
        let mut data = Vec::new();
        for unit in text.encode_utf16() {
            data.extend_from_slice(&unit.to_le_bytes());
        }
        data.extend_from_slice(&[0, 0]);
        self.bytes(address, &data)
    }

    pub fn build(self) -> MockMemoryReader {
        MockMemoryReader {
            pointer_size: self.pointer_size.unwrap_or(8),
            bytes: self.bytes,
        }
    }
}

#[derive(Debug)]
pub struct MockMemoryReader {
    pointer_size: usize,
    bytes: BTreeMap<u64, u8>,
}

impl ReadMemory for MockMemoryReader {
    fn read_bytes(&self, address: u64, len: usize) -> Result<ByteBuffer> {
        let mut data = Vec::with_capacity(len);
        for i in 0..len as u64 {
            match self.bytes.get(&(address + i)) {
                Some(&b) => data.push(b),
                None => {
                    return Err(Error::MemoryReadFailed {
                        address,
                        message: format!("unmapped byte at {:#x}", address + i),
                    });
                }
            }
        }
        Ok(ByteBuffer::new(address, data))
    }

    fn pointer_size(&self) -> usize {
        self.pointer_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_full_reads_only() {
        let mock = MockMemoryBuilder::new().u32(0x1000, 0xDEADBEEF).build();
        assert_eq!(mock.read_u32(0x1000).unwrap(), 0xDEADBEEF);
        assert!(mock.read_bytes(0x1000, 8).is_err());
        assert!(mock.read_bytes(0x0FFF, 4).is_err());
    }

    #[test]
    fn test_mock_adjacent_writes_compose() {
        let mock = MockMemoryBuilder::new()
            .u32(0x2000, 1)
            .u32(0x2004, 2)
            .build();
        let buf = mock.read_bytes(0x2000, 8).unwrap();
        assert_eq!(buf.read_u32(0), 1);
        assert_eq!(buf.read_u32(4), 2);
    }

    #[test]
    fn test_mock_pointer_width() {
        let mock = MockMemoryBuilder::new()
            .pointer_size(4)
            .pointer(0x100, 0x55667788)
            .build();
        assert_eq!(mock.read_pointer(0x100).unwrap(), 0x55667788);
        assert!(mock.read_bytes(0x100, 8).is_err());
    }
}
