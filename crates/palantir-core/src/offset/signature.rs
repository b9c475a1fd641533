//! Code signatures locating the client's global data pointers.
//!
//! The baked layout offsets go stale when the client updates; the globals
//! can instead be recovered from the code that references them. Each
//! signature matches an instruction sequence containing an x64 RIP-relative
//! displacement, which resolves to the absolute address of the global.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeSignature {
    /// Byte pattern, space-separated hex with `??` wildcards.
    pub pattern: String,
    /// Offset of the 32-bit displacement inside a match.
    pub disp_offset: usize,
}

impl CodeSignature {
    pub fn new(pattern: &str, disp_offset: usize) -> Self {
        Self {
            pattern: pattern.to_string(),
            disp_offset,
        }
    }

    pub fn pattern_bytes(&self) -> Result<Vec<Option<u8>>> {
        parse_pattern(&self.pattern)
    }

    /// Find the first match in a module image and resolve the RIP-relative
    /// displacement to an absolute address. `base` is the image load
    /// address the bytes were read from.
    pub fn resolve(&self, image: &[u8], base: u64) -> Option<u64> {
        let pattern = self.pattern_bytes().ok()?;
        let index = find_pattern(image, &pattern)?;

        let disp_pos = index + self.disp_offset;
        let bytes = image.get(disp_pos..disp_pos + 4)?;
        let disp = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);

        // RIP points at the byte after the displacement.
        let next_ip = base + disp_pos as u64 + 4;
        Some(next_ip.wrapping_add_signed(i64::from(disp)))
    }
}

/// The signatures known for one client bitness.
#[derive(Debug, Clone)]
pub struct SignatureSet {
    pub entity_table: CodeSignature,
    pub client_data: CodeSignature,
}

/// Built-in signatures. Only the 64-bit client is covered; the 32-bit
/// client falls back to the baked layout offsets.
pub fn builtin_signatures(is_64bit: bool) -> Option<SignatureSet> {
    if !is_64bit {
        return None;
    }
    Some(SignatureSet {
        entity_table: CodeSignature::new(
            "48 89 5C 24 08 57 48 83 EC 40 48 8B D9 48 8B 0D ?? ?? ?? ??",
            16,
        ),
        client_data: CodeSignature::new("48 89 3D ?? ?? ?? ?? B2 01 B9 00 01 00 00", 3),
    })
}

pub fn parse_pattern(pattern: &str) -> Result<Vec<Option<u8>>> {
    let mut bytes = Vec::new();
    for token in pattern.split_whitespace() {
        if token == "??" || token == "?" {
            bytes.push(None);
            continue;
        }

        let value = u8::from_str_radix(token, 16).map_err(|e| {
            Error::InvalidSignature(format!("invalid token '{}': {}", token, e))
        })?;
        bytes.push(Some(value));
    }

    if bytes.is_empty() {
        return Err(Error::InvalidSignature("pattern is empty".to_string()));
    }

    Ok(bytes)
}

pub fn format_pattern(bytes: &[Option<u8>]) -> String {
    bytes
        .iter()
        .map(|b| match b {
            Some(value) => format!("{:02X}", value),
            None => "??".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// First match of a wildcard pattern in `data`.
pub fn find_pattern(data: &[u8], pattern: &[Option<u8>]) -> Option<usize> {
    if pattern.is_empty() || data.len() < pattern.len() {
        return None;
    }

    (0..=data.len() - pattern.len()).find(|&index| {
        pattern
            .iter()
            .enumerate()
            .all(|(offset, byte)| byte.is_none_or(|b| data[index + offset] == b))
    })
}
