use iso7816_tlv::ber;
use simplelog::debug;
#[cfg(feature = "cli")]
use simplelog::info;
use std::collections::HashMap;

use crate::dg_parsers::helpers as dg_helpers;
use crate::helpers;
#[cfg(feature = "cli")]
use crate::icao9303;
use crate::icao9303::DataGroupId;
use crate::types::{self, DecodeError};

impl types::EFDG11 {
    #[cfg(feature = "cli")]
    pub fn fancy_print(&self, data_group: &icao9303::DataGroup) {
        dg_helpers::print_section_intro(data_group);
        dg_helpers::print_option_string_element_as_name("Full name of holder", &self.full_name);
        for other_name in self.other_names.iter() {
            dg_helpers::print_string_element_as_name("Other name", other_name);
        }
        dg_helpers::print_option_string_element("Personal number", &self.personal_number);
        dg_helpers::print_option_string_element_as_dg_date(
            "Full date of birth",
            &self.full_date_of_birth,
        );
        dg_helpers::print_list_element("Place of birth", &self.place_of_birth);
        dg_helpers::print_list_element("Permanent address", &self.permanent_address);
        dg_helpers::print_option_string_element("Telephone", &self.telephone);
        dg_helpers::print_option_string_element("Profession", &self.profession);
        dg_helpers::print_option_string_element("Title", &self.title);
        dg_helpers::print_option_string_element("Personal summary", &self.personal_summary);
        dg_helpers::print_option_binary_element("Proof of citizenship", &self.proof_of_citizenship);
        dg_helpers::print_list_element(
            "Other valid TD numbers",
            &self.other_valid_td_numbers,
        );
        dg_helpers::print_option_string_element("Custody information", &self.custody_information);
        info!("");
    }
}

/// Collects every `tag` string, from the A0 template and from the top level.
pub(crate) fn collect_repeated_strings(
    tlvs: &[ber::Tlv],
    tag: u16,
) -> Result<Vec<String>, DecodeError> {
    let mut elements = helpers::get_tlvs_by_tag(tlvs, tag);
    for template in helpers::get_tlvs_by_tag(tlvs, 0xA0) {
        elements.extend(helpers::get_tlvs_by_tag(
            helpers::get_tlv_constructed_value(template)?,
            tag,
        ));
    }
    return elements
        .into_iter()
        .map(|element| {
            String::from_utf8(helpers::get_tlv_value_bytes(element)).map_err(|_| DecodeError::Utf8)
        })
        .collect();
}

fn tlv_get_list(tlvs: &HashMap<u16, &ber::Tlv>, tag: u16) -> Result<Vec<String>, DecodeError> {
    return Ok(dg_helpers::tlv_get_string_value(tlvs, tag)?
        .map(|text| dg_helpers::split_mrz_list(&text))
        .unwrap_or_default());
}

pub fn parser(data: &[u8]) -> Result<types::ParsedDataGroup, DecodeError> {
    let base_tlv = dg_helpers::parse_base_tlv(data, DataGroupId::DG11.info())?;
    let base_tlv_value = helpers::get_tlv_constructed_value(&base_tlv)?;
    let tlvs = helpers::sort_tlvs_by_tag(base_tlv_value);
    debug!("tlvs: {:02x?}", tlvs);

    let result = types::EFDG11 {
        full_name: dg_helpers::tlv_get_string_value(&tlvs, 0x5F0E)?,
        other_names: collect_repeated_strings(base_tlv_value, 0x5F0F)?,
        personal_number: dg_helpers::tlv_get_string_value(&tlvs, 0x5F10)?,
        full_date_of_birth: dg_helpers::tlv_get_string_value(&tlvs, 0x5F2B)?,
        place_of_birth: tlv_get_list(&tlvs, 0x5F11)?,
        permanent_address: tlv_get_list(&tlvs, 0x5F42)?,
        telephone: dg_helpers::tlv_get_string_value(&tlvs, 0x5F12)?,
        profession: dg_helpers::tlv_get_string_value(&tlvs, 0x5F13)?,
        title: dg_helpers::tlv_get_string_value(&tlvs, 0x5F14)?,
        personal_summary: dg_helpers::tlv_get_string_value(&tlvs, 0x5F15)?,
        proof_of_citizenship: dg_helpers::tlv_get_bytes(&tlvs, 0x5F16),
        other_valid_td_numbers: tlv_get_list(&tlvs, 0x5F17)?,
        custody_information: dg_helpers::tlv_get_string_value(&tlvs, 0x5F18)?,
    };
    return Ok(types::ParsedDataGroup::EFDG11(result));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::build_tlv;

    fn dg11(elements: &[(u16, &str)]) -> Vec<u8> {
        let value = elements
            .iter()
            .flat_map(|(tag, text)| build_tlv(*tag, text.as_bytes().to_vec()))
            .collect();
        return build_tlv(0x6B, value);
    }

    #[test]
    fn personal_details() {
        let data = dg11(&[
            (0x5C, ""),
            (0x5F0E, "ROSSI<<MARIO"),
            (0x5F10, "RSSMRA80A01F205X"),
            (0x5F2B, "19800101"),
            (0x5F11, "MILANO<MI"),
            (0x5F42, "VIA ROMA,12<MILANO<MI"),
            (0x5F12, "+390200000000"),
        ]);
        let types::ParsedDataGroup::EFDG11(parsed) = parser(&data).unwrap() else {
            panic!("not DG11");
        };
        assert_eq!(parsed.full_name.as_deref(), Some("ROSSI<<MARIO"));
        assert_eq!(parsed.personal_number.as_deref(), Some("RSSMRA80A01F205X"));
        assert_eq!(parsed.full_date_of_birth.as_deref(), Some("19800101"));
        assert_eq!(parsed.place_of_birth, vec!["MILANO", "MI"]);
        assert_eq!(
            parsed.permanent_address,
            vec!["VIA ROMA,12", "MILANO", "MI"]
        );
        assert_eq!(parsed.telephone.as_deref(), Some("+390200000000"));
        assert!(parsed.other_names.is_empty());
        assert_eq!(parsed.profession, None);
    }

    #[test]
    fn other_names_template() {
        let mut template = build_tlv(0x02, vec![0x02]);
        template.extend(build_tlv(0x5F0F, b"ROSSI<<MARIO<LUIGI".to_vec()));
        template.extend(build_tlv(0x5F0F, b"BIANCHI<<MARIO".to_vec()));
        let data = build_tlv(0x6B, build_tlv(0xA0, template));
        let types::ParsedDataGroup::EFDG11(parsed) = parser(&data).unwrap() else {
            panic!("not DG11");
        };
        assert_eq!(
            parsed.other_names,
            vec!["ROSSI<<MARIO<LUIGI", "BIANCHI<<MARIO"]
        );
    }

    #[test]
    fn invalid_text() {
        let data = build_tlv(0x6B, build_tlv(0x5F0E, vec![0xC3, 0x28]));
        assert_eq!(parser(&data).unwrap_err(), DecodeError::Utf8);
    }
}
