//! Typed decoding of property values read from entity hashtables.
//!
//! The 64-bit slot a hashtable lookup returns is interpreted according to
//! the property's declared type: plain integers and floats live in the slot
//! itself, everything else is a pointer to a ref-counted heap object whose
//! layout differs per type. Every pointer is plausibility-checked before a
//! dereference and every decode path degrades to `None` on failure.

use tracing::debug;

use crate::dat::{DataFacade, PropertyType};
use crate::memory::layout::{ClientLayout, caps};
use crate::memory::{ByteBuffer, ReadMemory, decode_latin1, is_plausible_pointer};

use super::hashtable;

/// Accepted length range for pascal-style literal strings.
const PASCAL_LEN_RANGE: std::ops::Range<u32> = 1..1000;
/// Offsets probed as a last resort when no string path resolves.
const PROBE_OFFSETS: [usize; 4] = [0, 16, 32, 40];

/// Typed property reads against one attached client.
pub struct PropertyReader<'a, R: ReadMemory> {
    memory: &'a R,
    layout: &'a ClientLayout,
    facade: Option<&'a DataFacade>,
}

impl<'a, R: ReadMemory> PropertyReader<'a, R> {
    pub fn new(memory: &'a R, layout: &'a ClientLayout, facade: Option<&'a DataFacade>) -> Self {
        Self {
            memory,
            layout,
            facade,
        }
    }

    /// Hashtable base of an entity's property provider.
    pub fn provider_table(&self, entity: u64) -> Option<u64> {
        let pointer_size = self.layout.pointer_size as usize;
        let len = self.layout.entity_provider_offset as usize + pointer_size;
        let buf = self.memory.read_bytes(entity, len).ok()?;
        let provider = buf.read_pointer(self.layout.entity_provider_offset as usize, pointer_size);
        is_plausible_pointer(provider)
            .then(|| provider + self.layout.provider_hashtable_offset)
    }

    /// Raw 64-bit value slot of a property on an entity.
    pub fn property_value(&self, entity: u64, property_id: u32) -> Option<u64> {
        let table = self.provider_table(entity)?;
        self.table_value(table, property_id)
    }

    /// Raw value slot in an explicit hashtable (entity or account scope).
    pub fn table_value(&self, table_base: u64, property_id: u32) -> Option<u64> {
        hashtable::lookup(self.memory, self.layout, table_base, property_id)
    }

    pub fn int_property(&self, entity: u64, property_id: u32) -> Option<i32> {
        self.property_value(entity, property_id)
            .map(|value| value as u32 as i32)
    }

    pub fn long_property(&self, entity: u64, property_id: u32) -> Option<i64> {
        self.property_value(entity, property_id)
            .map(|value| value as i64)
    }

    pub fn float_property(&self, entity: u64, property_id: u32) -> Option<f32> {
        self.property_value(entity, property_id)
            .map(|value| f32::from_bits(value as u32))
    }

    pub fn table_int(&self, table_base: u64, property_id: u32) -> Option<i32> {
        self.table_value(table_base, property_id)
            .map(|value| value as u32 as i32)
    }

    /// Decode a string-valued property on an entity.
    pub fn string_property(
        &self,
        entity: u64,
        property_id: u32,
        property_type: PropertyType,
    ) -> Option<String> {
        let value = self.property_value(entity, property_id)?;
        self.decode_string_value(value, property_type)
    }

    /// Decode a string value found in an explicit hashtable.
    pub fn table_string(
        &self,
        table_base: u64,
        property_id: u32,
        property_type: PropertyType,
    ) -> Option<String> {
        let value = self.table_value(table_base, property_id)?;
        self.decode_string_value(value, property_type)
    }

    /// Resolve an `InstanceId` property: the slot points at a ref-counted
    /// wrapper whose payload is the 64-bit instance id.
    pub fn instance_id_property(&self, entity: u64, property_id: u32) -> Option<u64> {
        let value = self.property_value(entity, property_id)?;
        if !is_plausible_pointer(value) {
            return None;
        }
        let payload_offset = self.layout.refcount_header_size() as usize;
        let buf = self.memory.read_bytes(value, payload_offset + 8).ok()?;
        let instance_id = buf.read_u64(payload_offset);
        (instance_id != 0).then_some(instance_id)
    }

    /// Decode an `Array` property into its 32-bit element values.
    pub fn array_property(&self, entity: u64, property_id: u32) -> Option<Vec<u32>> {
        let value = self.property_value(entity, property_id)?;
        if !is_plausible_pointer(value) {
            return None;
        }

        let header_len = self.layout.array_count_offset() as usize + 4;
        let header = self.memory.read_bytes(value, header_len).ok()?;
        let pointer_size = self.layout.pointer_size as usize;
        let data_ptr = header.read_pointer(self.layout.array_data_offset() as usize, pointer_size);
        let capacity = header.read_u32(self.layout.array_capacity_offset() as usize);
        let count = header.read_u32(self.layout.array_count_offset() as usize);

        if !is_plausible_pointer(data_ptr) {
            return None;
        }
        if count == 0 {
            return Some(Vec::new());
        }
        if count as usize > caps::ARRAY_ELEMENTS || count > capacity {
            debug!(
                "Rejecting array property {}: count {} capacity {}",
                property_id, count, capacity
            );
            return None;
        }

        let stride = self.layout.array_element_stride() as usize;
        let elements = self
            .memory
            .read_bytes(data_ptr, stride * count as usize)
            .ok()?;
        Some(
            (0..count as usize)
                .map(|index| elements.read_u32(index * stride + pointer_size))
                .collect(),
        )
    }

    fn decode_string_value(&self, value: u64, property_type: PropertyType) -> Option<String> {
        if !is_plausible_pointer(value) {
            return None;
        }
        let obj_len = self.layout.string_info_flag_offset() as usize + 16;
        let obj = self.memory.read_bytes(value, obj_len).ok()?;

        if property_type == PropertyType::StringInfo {
            self.decode_string_info(&obj)
        } else {
            self.decode_plain_string(&obj)
        }
    }

    /// Localized-string decode. Paths in priority order: the literal UTF-16
    /// pointer, the flag-directed pascal literal, the token/table lookup
    /// through the archives, then a printable-ASCII probe of a few known
    /// pointer slots.
    fn decode_string_info(&self, obj: &ByteBuffer) -> Option<String> {
        let pointer_size = self.layout.pointer_size as usize;
        let literal = obj.read_pointer(self.layout.string_info_literal_offset() as usize, pointer_size);

        if is_plausible_pointer(literal) {
            if let Ok(text) = self.memory.read_utf16(literal, caps::STRING_UNITS) {
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }

        let flag = obj.read_u32(self.layout.string_info_flag_offset() as usize);
        if flag & 1 != 0 {
            if let Some(text) = self.read_pascal_literal(literal) {
                return Some(text);
            }
        } else {
            let token = obj.read_u32(self.layout.string_info_token_offset() as usize);
            let table = obj.read_u32(self.layout.string_info_table_offset() as usize);
            if table != 0 {
                if let Some(facade) = self.facade {
                    if let Some(text) = facade.resolve_string(table, token) {
                        if !text.is_empty() {
                            return Some(text);
                        }
                    }
                }
            }
        }

        self.probe_for_ascii(obj)
    }

    /// Latin-1 literal with its length stored just before the characters.
    fn read_pascal_literal(&self, pointer: u64) -> Option<String> {
        if !is_plausible_pointer(pointer) {
            return None;
        }
        let len = self
            .memory
            .read_bytes(pointer.checked_sub(4)?, 4)
            .ok()?
            .read_u32(0);
        if !PASCAL_LEN_RANGE.contains(&len) {
            return None;
        }
        let bytes = self.memory.read_bytes(pointer, len as usize).ok()?;
        let text = decode_latin1(bytes.data());
        (!text.is_empty()).then_some(text)
    }

    /// Plain string value: character pointer right after the wrapper
    /// header, Latin-1 first, UTF-16 second.
    fn decode_plain_string(&self, obj: &ByteBuffer) -> Option<String> {
        let pointer_size = self.layout.pointer_size as usize;
        let pointer = obj.read_pointer(self.layout.string_value_offset() as usize, pointer_size);
        if !is_plausible_pointer(pointer) {
            return None;
        }

        if let Ok(text) = self.memory.read_cstring(pointer, caps::STRING_UNITS) {
            if !text.is_empty() {
                return Some(text);
            }
        }
        if let Ok(text) = self.memory.read_utf16(pointer, caps::STRING_UNITS) {
            if !text.is_empty() {
                return Some(text);
            }
        }
        None
    }

    fn probe_for_ascii(&self, obj: &ByteBuffer) -> Option<String> {
        let pointer_size = self.layout.pointer_size as usize;
        for offset in PROBE_OFFSETS {
            let pointer = obj.read_pointer(offset, pointer_size);
            if !is_plausible_pointer(pointer) {
                continue;
            }
            let Ok(text) = self.memory.read_cstring(pointer, 64) else {
                continue;
            };
            if text.len() > 1 && text.len() < 50 && text.bytes().all(|b| (32..=126).contains(&b)) {
                return Some(text);
            }
        }
        None
    }
}
