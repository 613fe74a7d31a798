use iso7816_tlv::ber;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::DecodeError;

/// Parses a BER length field.
///
/// Returns (length of the length field, value length), or None if it is truncated,
/// indefinite or longer than 4 bytes.
pub fn asn1_parse_len(data: &[u8]) -> Option<(u8, u32)> {
    let first = *data.first()?;
    let result: (u8, u32) = match first {
        0..=0x7f => (1, first.into()),
        0x81 => (2, (*data.get(1)?).into()),
        0x82 => (3, u32::from_be_bytes([0, 0, *data.get(1)?, *data.get(2)?])),
        0x83 => (
            4,
            u32::from_be_bytes([0, *data.get(1)?, *data.get(2)?, *data.get(3)?]),
        ),
        0x84 => (
            5,
            u32::from_be_bytes([*data.get(1)?, *data.get(2)?, *data.get(3)?, *data.get(4)?]),
        ),
        // 0x80 is indefinite length, which DER (and therefore the LDS) does not allow
        _ => return None,
    };
    return Some(result);
}

/// Encodes a BER length field in its shortest form.
pub fn asn1_encode_len(len: usize) -> Vec<u8> {
    return match len {
        0..=0x7F => vec![len as u8],
        0x80..=0xFF => vec![0x81, len as u8],
        0x100..=0xFFFF => vec![0x82, (len >> 8) as u8, len as u8],
        _ => vec![0x83, (len >> 16) as u8, (len >> 8) as u8, len as u8],
    };
}

/// Builds a TLV from a one or two byte tag and a value.
pub fn build_tlv(tag: u16, value: Vec<u8>) -> Vec<u8> {
    let mut tlv = if tag > 0xFF {
        tag.to_be_bytes().to_vec()
    } else {
        vec![tag as u8]
    };
    tlv.extend(asn1_encode_len(value.len()));
    tlv.extend(value);
    return tlv;
}

/// Parses exactly one TLV and checks its tag.
pub fn parse_tlv_with_tag(data: &[u8], expected_tag: u16) -> Result<ber::Tlv, DecodeError> {
    let base_tlv = ber::Tlv::parse(data).0.map_err(|_| DecodeError::Tlv)?;
    let found_tag = get_tlv_tag(&base_tlv);
    if found_tag != expected_tag {
        return Err(DecodeError::UnexpectedTag {
            expected: expected_tag,
            found: found_tag,
        });
    }
    return Ok(base_tlv);
}

pub fn get_tlv_value_bytes(input_tlv: &ber::Tlv) -> Vec<u8> {
    match input_tlv.value() {
        ber::Value::Primitive(data) => {
            return data.clone();
        }
        ber::Value::Constructed(tlvs) => {
            // Re-encode the children, which is what the raw value was.
            return tlvs.iter().flat_map(|tlv| tlv.to_vec()).collect();
        }
    }
}

pub fn get_tlv_constructed_value(input_tlv: &ber::Tlv) -> Result<&[ber::Tlv], DecodeError> {
    match input_tlv.value() {
        ber::Value::Constructed(tlvs) => {
            return Ok(tlvs);
        }
        ber::Value::Primitive(_) => {
            return Err(DecodeError::Tlv);
        }
    }
}

pub fn get_tlv_tag(input_tlv: &ber::Tlv) -> u16 {
    // I'm choosing to keep this to 2 bytes for now. It can be up to 3 by the standard.
    let tag_number = input_tlv
        .tag()
        .to_bytes()
        .iter()
        .fold(0u32, |acc, byte| (acc << 8) | u32::from(*byte));
    return u16::try_from(tag_number).unwrap_or(u16::MAX);
}

pub fn sort_tlvs_by_tag(tlvs: &[ber::Tlv]) -> HashMap<u16, &ber::Tlv> {
    let mut rapdu_tlvs: HashMap<u16, &ber::Tlv> = HashMap::new();
    for tlv in tlvs.iter() {
        let tag_number = get_tlv_tag(tlv);
        rapdu_tlvs.insert(tag_number, tlv);
    }
    return rapdu_tlvs;
}

pub fn get_tlvs_by_tag(tlvs: &[ber::Tlv], desired_tag_number: u16) -> Vec<&ber::Tlv> {
    return tlvs
        .iter()
        .filter(|tlv| get_tlv_tag(tlv) == desired_tag_number)
        .collect();
}

pub fn get_tlv_by_tag(tlvs: &[ber::Tlv], desired_tag_number: u16) -> Option<&ber::Tlv> {
    return tlvs
        .iter()
        .find(|tlv| get_tlv_tag(tlv) == desired_tag_number);
}

/// Writes raw bytes under the dump directory, creating it if needed.
pub fn dump_bytes(base_dump_path: &Path, filename: &str, data: &[u8]) -> io::Result<()> {
    fs::create_dir_all(base_dump_path)?;
    return fs::write(base_dump_path.join(filename), data);
}

/// Get the current unix time.
///
/// A clock before 1970 reads as 0.
pub fn unix_time() -> u64 {
    return SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0);
}
