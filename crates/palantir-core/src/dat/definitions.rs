//! Decoder for the master property-definition record.
//!
//! The record is read in two passes: the first registers every property
//! name, the second fills in types and metadata. A failure in the second
//! pass keeps the names that were already registered — lookups must not
//! disappear just because one definition is malformed.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};

use super::cursor::Cursor;
use super::facade::PROPERTY_DEFINITIONS_RECORD_ID;
use super::registry::{PropertyDef, PropertyRegistry, PropertyType};

/// Upper bound on any count field read from the record.
const MAX_COUNT: u32 = 100_000;
/// Upper bound on children per definition.
const MAX_CHILDREN: u32 = 4096;
/// Recursion guard for nested StringInfo default values.
const MAX_STRING_INFO_DEPTH: usize = 16;

/// Decode the master property record into a registry.
pub fn decode_master_record(data: &[u8]) -> Result<PropertyRegistry> {
    if data.is_empty() {
        return Err(Error::RegistryParseFailed);
    }

    let mut cursor = Cursor::new(data);

    let record_id = cursor.read_u32().map_err(|_| Error::RegistryParseFailed)?;
    if u64::from(record_id) != PROPERTY_DEFINITIONS_RECORD_ID {
        warn!(
            "Property record id mismatch: got {:#x}, expected {:#x}",
            record_id, PROPERTY_DEFINITIONS_RECORD_ID
        );
    }
    cursor.skip(8).map_err(|_| Error::RegistryParseFailed)?;

    let name_count = cursor.read_tsize().map_err(|_| Error::RegistryParseFailed)?;
    if name_count > MAX_COUNT {
        return Err(Error::RegistryParseFailed);
    }
    debug!("Loading {} property names", name_count);

    let mut defs: HashMap<u32, PropertyDef> = HashMap::with_capacity(name_count as usize);
    for _ in 0..name_count {
        let id = cursor.read_u32().map_err(|_| Error::RegistryParseFailed)?;
        let name = cursor
            .read_pascal_string()
            .map_err(|_| Error::RegistryParseFailed)?;
        if name.is_empty() {
            continue;
        }
        defs.insert(id, PropertyDef::named(id, name));
    }

    cursor.skip(2).map_err(|_| Error::RegistryParseFailed)?;

    let def_count = cursor.read_tsize().map_err(|_| Error::RegistryParseFailed)?;
    if def_count > MAX_COUNT {
        return Err(Error::RegistryParseFailed);
    }
    debug!("Loading {} property definitions", def_count);

    for index in 0..def_count {
        let expected = match cursor.read_u32() {
            Ok(id) => id,
            Err(_) => {
                warn!("Definition list truncated at entry {}", index);
                break;
            }
        };
        match read_definition(&mut cursor, expected) {
            Ok(parsed) => {
                let children: Vec<u32> = parsed
                    .children
                    .iter()
                    .copied()
                    .filter(|child| defs.contains_key(child))
                    .collect();
                if let Some(def) = defs.get_mut(&parsed.id) {
                    def.property_type = parsed.property_type;
                    def.data_id = parsed.data_id;
                    def.children = children;
                } else {
                    warn!("Definition {} has no registered name", parsed.id);
                }
            }
            Err(_) => {
                // The stream is misaligned from here on; keep what we have.
                warn!(
                    "Malformed definition for property {} (entry {}), keeping names only",
                    expected, index
                );
                break;
            }
        }
    }

    info!("Loaded {} properties from game data", defs.len());
    Ok(PropertyRegistry::from_defs(defs.into_values()))
}

struct ParsedDefinition {
    id: u32,
    property_type: PropertyType,
    data_id: u32,
    children: Vec<u32>,
}

fn read_definition(cursor: &mut Cursor<'_>, expected: u32) -> Result<ParsedDefinition> {
    let id = cursor.read_u32()?;
    if id != expected {
        warn!("Definition id mismatch: expected {}, got {}", expected, id);
        return Err(Error::RegistryParseFailed);
    }

    let type_code = cursor.read_u32()?;
    if !(1..=22).contains(&type_code) {
        warn!("Invalid property type code {} for {}", type_code, id);
        return Err(Error::RegistryParseFailed);
    }
    let property_type = PropertyType::from_code(type_code);

    let _group = cursor.read_u32()?;
    let _provider = cursor.read_u32()?;
    let data_id = cursor.read_u32()?;
    let _patch_flags = cursor.read_u32()?;
    let flags = (cursor.read_u32()? >> 8) & 0xFF;

    if flags & 0x08 != 0 {
        skip_property_value(cursor, type_code)?;
    }
    if flags & 0x10 != 0 {
        skip_property_value(cursor, type_code)?;
    }
    if flags & 0x20 != 0 {
        skip_property_value(cursor, type_code)?;
    }

    cursor.skip(4)?; // prediction timeout
    cursor.skip(4)?; // inheritance / dat file / propagation / caching
    cursor.skip(1)?; // padding

    let child_count = cursor.read_vle()?;
    if child_count > MAX_CHILDREN {
        return Err(Error::RegistryParseFailed);
    }
    let mut children = Vec::with_capacity(child_count as usize);
    for _ in 0..child_count {
        let first = cursor.read_u32()?;
        let second = cursor.read_u32()?;
        if first != second {
            warn!("Child id mismatch on {}: {} != {}", id, first, second);
        }
        children.push(first);
    }

    let required_count = cursor.read_u32()?;
    if required_count > MAX_COUNT {
        return Err(Error::RegistryParseFailed);
    }
    for _ in 0..required_count {
        cursor.read_u32()?;
    }

    let trailer = cursor.read_u32()?;
    if trailer != 0 {
        warn!("Expected zero trailer after definition {}, got {}", id, trailer);
    }

    Ok(ParsedDefinition {
        id,
        property_type,
        data_id,
        children,
    })
}

/// Skip an inline value of the given declared type. Widths follow the
/// per-type table of the definition format.
fn skip_property_value(cursor: &mut Cursor<'_>, type_code: u32) -> Result<()> {
    match type_code {
        // TriState, Boolean
        5 | 21 => cursor.skip(1),
        // StringToken, EnumMapper, Float, PropertyId, Array, Int, Color,
        // Bitfield32, DataFile
        2 | 8 | 9 | 10 | 12 | 15 | 16 | 18 | 20 => cursor.skip(4),
        // Timestamp, InstanceId, Bitfield64, Long64
        4 | 7 | 14 | 19 => cursor.skip(8),
        // String
        1 => cursor.read_pascal_string().map(|_| ()),
        // WaveForm
        3 => skip_waveform(cursor),
        // Vector
        6 => cursor.skip(12),
        // Struct
        11 => cursor.skip(2),
        // StringInfo
        13 => skip_string_info(cursor, 0),
        // Position
        17 => skip_position(cursor),
        // Bitfield
        22 => {
            let bits = cursor.read_vle()?;
            if bits > MAX_COUNT {
                return Err(Error::RegistryParseFailed);
            }
            cursor.skip(bits.div_ceil(8) as usize)
        }
        _ => {
            warn!("Skipping value of unknown type code {}", type_code);
            cursor.skip(4)
        }
    }
}

fn skip_waveform(cursor: &mut Cursor<'_>) -> Result<()> {
    let kind = cursor.read_u32()?;
    if kind == 10 {
        cursor.skip(10 * 4)?; // control points
        cursor.skip(4)?;
        cursor.skip(1)?;
        let pair_count = cursor.read_u32()?;
        if pair_count > MAX_COUNT {
            return Err(Error::RegistryParseFailed);
        }
        cursor.skip(pair_count as usize * 2 * 4)
    } else if kind == 1 {
        cursor.skip(4)
    } else if kind > 1 {
        cursor.skip(10 * 4)
    } else {
        Ok(())
    }
}

fn skip_string_info(cursor: &mut Cursor<'_>, depth: usize) -> Result<()> {
    if depth > MAX_STRING_INFO_DEPTH {
        return Err(Error::RegistryParseFailed);
    }

    let is_literal = cursor.read_bool()?;
    if is_literal {
        let len = cursor.read_u32()?;
        if len > MAX_COUNT {
            return Err(Error::RegistryParseFailed);
        }
        cursor.skip(len as usize * 2)?;
    } else {
        cursor.skip(8)?; // token + table id
    }

    let has_strings = cursor.read_bool()?;
    if has_strings {
        cursor.read_pascal_string()?;
        cursor.read_pascal_string()?;
        cursor.read_pascal_string()?;

        let replacements = cursor.read_vle()?;
        if replacements > MAX_COUNT {
            return Err(Error::RegistryParseFailed);
        }
        for _ in 0..replacements {
            let data_type = cursor.read_u8()?;
            cursor.skip(4)?; // replacement token
            if data_type != 1 {
                cursor.skip(1)?;
            }
            match data_type {
                4 => {
                    cursor.read_vle()?;
                }
                1 => skip_string_info(cursor, depth + 1)?,
                2 => cursor.skip(4)?,
                _ => {}
            }
        }
    } else {
        cursor.skip(2)?;
    }

    Ok(())
}

fn skip_position(cursor: &mut Cursor<'_>) -> Result<()> {
    let flags = cursor.read_u8()?;
    if flags == 0 {
        return Ok(());
    }
    if flags & 0x01 != 0 {
        cursor.skip(1)?; // region
    }
    if flags & 0x02 != 0 {
        cursor.skip(2)?; // block coordinates
    }
    if flags & 0x04 != 0 {
        cursor.skip(2)?; // instance
    }
    if flags & 0x08 != 0 {
        cursor.skip(2)?; // cell
    }
    if flags & 0x10 != 0 {
        cursor.skip(12)?; // position vector
    }
    if flags & 0x20 != 0 {
        cursor.skip(16)?; // rotation quaternion
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dat::fixture::{DefSpec, encode_master_record};

    const RECORD_ID: u32 = PROPERTY_DEFINITIONS_RECORD_ID as u32;

    #[test]
    fn test_decode_names_and_types() {
        let data = encode_master_record(
            RECORD_ID,
            &[
                DefSpec::new(0x1000_0101, "Name", 13),
                DefSpec::new(0x1000_0102, "Advancement_Level", 15),
                DefSpec::new(0x1000_0103, "Currency_Amount", 19),
            ],
        );
        let registry = decode_master_record(&data).unwrap();

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.id_of("Name"), 0x1000_0101);
        assert_eq!(registry.type_of(0x1000_0101), PropertyType::StringInfo);
        assert_eq!(registry.type_of(0x1000_0102), PropertyType::Int);
        assert_eq!(registry.type_of(0x1000_0103), PropertyType::Long64);
    }

    #[test]
    fn test_default_value_skips_keep_stream_aligned() {
        // Every variable-width default must be skipped exactly or the
        // definitions that follow it would decode garbage.
        let mut waveform = 10u32.to_le_bytes().to_vec();
        waveform.extend_from_slice(&[0u8; 10 * 4 + 4 + 1]);
        waveform.extend_from_slice(&2u32.to_le_bytes());
        waveform.extend_from_slice(&[0u8; 2 * 2 * 4]);

        let mut pascal = Vec::new();
        crate::dat::cursor::write_pascal_string(&mut pascal, "default");

        // StringInfo default: token form with no inline strings
        let mut string_info = vec![0u8]; // not literal
        string_info.extend_from_slice(&[0u8; 8]);
        string_info.push(0); // no strings
        string_info.extend_from_slice(&[0u8; 2]);

        let mut position = vec![0x13u8]; // region + block + position vector
        position.extend_from_slice(&[0u8; 1 + 2 + 12]);

        let mut bitfield = Vec::new();
        crate::dat::cursor::write_vle(&mut bitfield, 12);
        bitfield.extend_from_slice(&[0u8; 2]);

        let data = encode_master_record(
            RECORD_ID,
            &[
                DefSpec::new(1, "WaveProp", 3).with_default(waveform),
                DefSpec::new(2, "StringProp", 1).with_default(pascal),
                DefSpec::new(3, "InfoProp", 13).with_default(string_info),
                DefSpec::new(4, "PositionProp", 17).with_default(position),
                DefSpec::new(5, "BitsProp", 22).with_default(bitfield),
                DefSpec::new(6, "IntProp", 15).with_default(7u32.to_le_bytes().to_vec()),
                DefSpec::new(7, "FinalProp", 21),
            ],
        );
        let registry = decode_master_record(&data).unwrap();

        assert_eq!(registry.type_of(1), PropertyType::WaveForm);
        assert_eq!(registry.type_of(3), PropertyType::StringInfo);
        assert_eq!(registry.type_of(5), PropertyType::Bitfield);
        assert_eq!(registry.type_of(6), PropertyType::Int);
        assert_eq!(registry.type_of(7), PropertyType::Boolean);
    }

    #[test]
    fn test_children_are_cross_linked() {
        let data = encode_master_record(
            RECORD_ID,
            &[
                DefSpec::new(10, "Parent", 11).with_children(vec![11, 12, 999]),
                DefSpec::new(11, "ChildA", 15),
                DefSpec::new(12, "ChildB", 15),
            ],
        );
        let registry = decode_master_record(&data).unwrap();
        let parent = registry.def_of(10).unwrap();
        // id 999 was never registered and must not be linked
        assert_eq!(parent.children, vec![11, 12]);
    }

    #[test]
    fn test_record_id_mismatch_is_tolerated() {
        let data = encode_master_record(0x1234_5678, &[DefSpec::new(1, "Name", 13)]);
        let registry = decode_master_record(&data).unwrap();
        assert_eq!(registry.id_of("Name"), 1);
    }

    #[test]
    fn test_malformed_definition_keeps_names() {
        let mut data = encode_master_record(
            RECORD_ID,
            &[
                DefSpec::new(1, "Good", 15),
                DefSpec::new(2, "Broken", 15),
            ],
        );
        // Corrupt the second definition's type code (offset search: flip the
        // tail of the buffer where its type code lives).
        let len = data.len();
        data.truncate(len - 20);
        let registry = decode_master_record(&data).unwrap();

        assert_eq!(registry.id_of("Good"), 1);
        assert_eq!(registry.id_of("Broken"), 2);
        assert_eq!(registry.type_of(2), PropertyType::Unknown);
    }

    #[test]
    fn test_empty_record_fails() {
        assert!(matches!(
            decode_master_record(&[]),
            Err(Error::RegistryParseFailed)
        ));
    }

    #[test]
    fn test_oversized_count_fails() {
        let mut data = Vec::new();
        data.extend_from_slice(&RECORD_ID.to_le_bytes());
        data.extend_from_slice(&[0u8; 8]);
        data.push(0);
        crate::dat::cursor::write_vle(&mut data, 200_000);
        assert!(matches!(
            decode_master_record(&data),
            Err(Error::RegistryParseFailed)
        ));
    }
}
