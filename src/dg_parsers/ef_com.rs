use crate::dg_parsers::helpers as dg_helpers;
use crate::helpers;
use crate::icao9303::{self, DataGroupId};
use crate::types::{self, DecodeError};
#[cfg(feature = "cli")]
use simplelog::info;
use simplelog::debug;

impl types::EFCom {
    #[cfg(feature = "cli")]
    pub fn fancy_print(&self, data_group: &icao9303::DataGroup) {
        dg_helpers::print_section_intro(data_group);
        dg_helpers::print_option_string_element("LDS Version", &self.lds_version);
        dg_helpers::print_option_string_element("Unicode Version", &self.unicode_version);
        info!("<b><u>Files on this document</b>:</u>");
        for dg_id in self.data_groups() {
            let dg_info = dg_id.info();
            info!("<b>{}</b>: <yellow>{}</>", dg_info.name, dg_info.description);
        }
        info!("");
    }
}

/// Adds dots to a version made of two-digit groups ("040000" -> "04.00.00").
fn dotted_version(value_bytes: &[u8]) -> Result<String, DecodeError> {
    let text = std::str::from_utf8(value_bytes).map_err(|_| DecodeError::Utf8)?;
    if text.len() % 2 != 0 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DecodeError::Tlv);
    }
    let groups: Vec<&str> = (0..text.len()).step_by(2).map(|i| &text[i..i + 2]).collect();
    return Ok(groups.join("."));
}

pub fn parser(data: &[u8]) -> Result<types::ParsedDataGroup, DecodeError> {
    let data_group = DataGroupId::EFCom.info();
    let base_tlv = dg_helpers::parse_base_tlv(data, data_group)?;

    // Get the TLVs stored inside the base tag and sort them by tag number
    let base_tlv_value = helpers::get_tlv_constructed_value(&base_tlv)?;
    let tlvs = helpers::sort_tlvs_by_tag(base_tlv_value);
    debug!("tlvs: {:02x?}", tlvs);

    let lds_version = match dg_helpers::tlv_get_bytes(&tlvs, 0x5F01) {
        Some(value_bytes) if value_bytes.len() == 4 => Some(dotted_version(&value_bytes)?),
        Some(_) => return Err(DecodeError::Tlv),
        None => None,
    };
    let unicode_version = match dg_helpers::tlv_get_bytes(&tlvs, 0x5F36) {
        Some(value_bytes) if value_bytes.len() == 6 => Some(dotted_version(&value_bytes)?),
        Some(_) => return Err(DecodeError::Tlv),
        None => None,
    };
    let result = types::EFCom {
        lds_version,
        unicode_version,
        data_group_tag_list: dg_helpers::tlv_get_bytes(&tlvs, 0x5C)
            .ok_or(DecodeError::MissingField(0x5C))?,
    };
    return Ok(types::ParsedDataGroup::EFCom(result));
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn appendix_d_ef_com() {
        let parsed = parser(&hex!("60145F0104303130365F36063034303030305C026175")).unwrap();
        let types::ParsedDataGroup::EFCom(ef_com) = parsed else {
            panic!("not EF.COM: {:?}", parsed);
        };
        assert_eq!(ef_com.lds_version.as_deref(), Some("01.06"));
        assert_eq!(ef_com.unicode_version.as_deref(), Some("04.00.00"));
        assert_eq!(ef_com.data_groups(), vec![DataGroupId::DG1, DataGroupId::DG2]);
    }

    #[test]
    fn tag_list_is_mandatory() {
        assert_eq!(
            parser(&hex!("60075F010430313037")).unwrap_err(),
            DecodeError::MissingField(0x5C)
        );
        assert_eq!(
            parser(&hex!("61035C0161")).unwrap_err(),
            DecodeError::UnexpectedTag {
                expected: 0x60,
                found: 0x61
            }
        );
    }
}
