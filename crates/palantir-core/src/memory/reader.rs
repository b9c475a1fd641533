//! Typed access to foreign process memory.
//!
//! Reads come back as [`ByteBuffer`] values: a plain byte vector tagged with
//! the address it was read from. The buffer-level accessors are total;
//! out-of-bounds offsets return the zero value of the requested type, and
//! "did the read succeed at all" is answered by [`ReadMemory::read_bytes`].

use encoding_rs::UTF_16LE;

use crate::error::Result;
use crate::memory::ProcessHandle;

/// Lowest address considered a valid user-space pointer.
const POINTER_FLOOR: u64 = 0x10000;
/// Highest address considered a valid user-space pointer (x64 canonical).
const POINTER_CEILING: u64 = 0x7FFF_FFFF_FFFF;

/// Check whether a value read from the target looks like a dereferenceable
/// user-space address. Remote pointers are never trusted blindly; every
/// dereference goes through this filter first.
pub fn is_plausible_pointer(address: u64) -> bool {
    (POINTER_FLOOR..POINTER_CEILING).contains(&address)
}

/// Decode a Latin-1 (ISO-8859-1) byte slice.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Decode a little-endian UTF-16 byte slice (length in bytes, not units).
pub fn decode_utf16le(bytes: &[u8]) -> String {
    let (decoded, _, _) = UTF_16LE.decode(bytes);
    decoded.into_owned()
}

/// A chunk of memory read from the target process.
///
/// The base address is informational only; offsets passed to the accessors
/// are relative to the start of the buffer.
#[derive(Debug, Clone)]
pub struct ByteBuffer {
    base: u64,
    data: Vec<u8>,
}

impl ByteBuffer {
    pub fn new(base: u64, data: Vec<u8>) -> Self {
        Self { base, data }
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn slice(&self, offset: usize, len: usize) -> Option<&[u8]> {
        let end = offset.checked_add(len)?;
        self.data.get(offset..end)
    }

    pub fn read_u8(&self, offset: usize) -> u8 {
        self.slice(offset, 1).map_or(0, |b| b[0])
    }

    pub fn read_u16(&self, offset: usize) -> u16 {
        self.slice(offset, 2)
            .map_or(0, |b| u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&self, offset: usize) -> u32 {
        self.slice(offset, 4)
            .map_or(0, |b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u64(&self, offset: usize) -> u64 {
        self.slice(offset, 8).map_or(0, |b| {
            u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
        })
    }

    pub fn read_i32(&self, offset: usize) -> i32 {
        self.read_u32(offset) as i32
    }

    pub fn read_i64(&self, offset: usize) -> i64 {
        self.read_u64(offset) as i64
    }

    pub fn read_f32(&self, offset: usize) -> f32 {
        f32::from_bits(self.read_u32(offset))
    }

    pub fn read_f64(&self, offset: usize) -> f64 {
        f64::from_bits(self.read_u64(offset))
    }

    /// Read a pointer-sized integer; 32-bit pointers are zero-extended.
    pub fn read_pointer(&self, offset: usize, pointer_size: usize) -> u64 {
        if pointer_size == 8 {
            self.read_u64(offset)
        } else {
            u64::from(self.read_u32(offset))
        }
    }

    /// Read a NUL-terminated byte string, capped at `max_len` bytes.
    pub fn read_cstring(&self, offset: usize, max_len: usize) -> String {
        let Some(tail) = self.data.get(offset..) else {
            return String::new();
        };
        let window = &tail[..tail.len().min(max_len)];
        let len = memchr::memchr(0, window).unwrap_or(window.len());
        decode_latin1(&window[..len])
    }

    /// Read a NUL-terminated UTF-16LE string, capped at `max_units` code
    /// units.
    pub fn read_utf16(&self, offset: usize, max_units: usize) -> String {
        let Some(tail) = self.data.get(offset..) else {
            return String::new();
        };
        let mut end = 0;
        while end + 1 < tail.len() && end / 2 < max_units {
            if tail[end] == 0 && tail[end + 1] == 0 {
                break;
            }
            end += 2;
        }
        decode_utf16le(&tail[..end])
    }
}

/// Read access to a foreign address space.
///
/// Implemented by the live process reader and by the in-memory mock used in
/// tests. `read_bytes` either returns the full requested range or fails;
/// short reads are treated as failures so callers never see torn buffers.
pub trait ReadMemory {
    fn read_bytes(&self, address: u64, len: usize) -> Result<ByteBuffer>;

    /// Pointer width of the target process in bytes (4 or 8).
    fn pointer_size(&self) -> usize;

    fn read_u32(&self, address: u64) -> Result<u32> {
        Ok(self.read_bytes(address, 4)?.read_u32(0))
    }

    fn read_i32(&self, address: u64) -> Result<i32> {
        Ok(self.read_bytes(address, 4)?.read_i32(0))
    }

    fn read_u64(&self, address: u64) -> Result<u64> {
        Ok(self.read_bytes(address, 8)?.read_u64(0))
    }

    fn read_f32(&self, address: u64) -> Result<f32> {
        Ok(self.read_bytes(address, 4)?.read_f32(0))
    }

    fn read_pointer(&self, address: u64) -> Result<u64> {
        let size = self.pointer_size();
        Ok(self.read_bytes(address, size)?.read_pointer(0, size))
    }

    fn read_cstring(&self, address: u64, max_len: usize) -> Result<String> {
        Ok(self.read_bytes(address, max_len)?.read_cstring(0, max_len))
    }

    fn read_utf16(&self, address: u64, max_units: usize) -> Result<String> {
        Ok(self
            .read_bytes(address, max_units * 2)?
            .read_utf16(0, max_units))
    }
}

/// Memory reader bound to an open process handle.
pub struct MemoryReader<'a> {
    process: &'a ProcessHandle,
}

impl<'a> MemoryReader<'a> {
    pub fn new(process: &'a ProcessHandle) -> Self {
        Self { process }
    }

    pub fn process(&self) -> &ProcessHandle {
        self.process
    }
}

impl ReadMemory for MemoryReader<'_> {
    fn read_bytes(&self, address: u64, len: usize) -> Result<ByteBuffer> {
        self.process.read_memory(address, len)
    }

    fn pointer_size(&self) -> usize {
        if self.process.is_64bit() { 8 } else { 4 }
    }
}
