use simplelog::debug;
#[cfg(feature = "cli")]
use simplelog::info;

use crate::dg_parsers::ef_dg11::collect_repeated_strings;
use crate::dg_parsers::helpers as dg_helpers;
use crate::helpers;
#[cfg(feature = "cli")]
use crate::icao9303;
use crate::icao9303::DataGroupId;
use crate::types::{self, DecodeError};

impl types::EFDG12 {
    #[cfg(feature = "cli")]
    pub fn fancy_print(&self, data_group: &icao9303::DataGroup) {
        dg_helpers::print_section_intro(data_group);
        dg_helpers::print_option_string_element("Issuing Authority", &self.issuing_authority);
        dg_helpers::print_option_string_element_as_dg_date("Date of issue", &self.date_of_issue);
        for other_person in self.other_persons.iter() {
            dg_helpers::print_string_element_as_name("Other person", other_person);
        }
        dg_helpers::print_option_string_element(
            "Endorsements/Observations",
            &self.endorsements_observations,
        );
        dg_helpers::print_option_string_element(
            "Tax/Exit Requirements",
            &self.tax_exit_requirements,
        );
        dg_helpers::print_option_binary_element(
            "Image of front of eMRTD",
            &self.image_of_front_of_emrtd,
        );
        dg_helpers::print_option_binary_element(
            "Image of rear of eMRTD",
            &self.image_of_rear_of_emrtd,
        );
        dg_helpers::print_option_string_element(
            "Personalization Timestamp",
            &self.personalization_timestamp,
        );
        dg_helpers::print_option_string_element(
            "Personalization Device",
            &self.personalization_device_serial_number,
        );
        info!("");
    }
}

pub fn parser(data: &[u8]) -> Result<types::ParsedDataGroup, DecodeError> {
    let base_tlv = dg_helpers::parse_base_tlv(data, DataGroupId::DG12.info())?;
    let base_tlv_value = helpers::get_tlv_constructed_value(&base_tlv)?;
    let tlvs = helpers::sort_tlvs_by_tag(base_tlv_value);
    debug!("tlvs: {:02x?}", tlvs);

    let result = types::EFDG12 {
        issuing_authority: dg_helpers::tlv_get_string_value(&tlvs, 0x5F19)?,
        date_of_issue: dg_helpers::tlv_get_string_value(&tlvs, 0x5F26)?,
        other_persons: collect_repeated_strings(base_tlv_value, 0x5F1A)?,
        endorsements_observations: dg_helpers::tlv_get_string_value(&tlvs, 0x5F1B)?,
        tax_exit_requirements: dg_helpers::tlv_get_string_value(&tlvs, 0x5F1C)?,
        image_of_front_of_emrtd: dg_helpers::tlv_get_bytes(&tlvs, 0x5F1D),
        image_of_rear_of_emrtd: dg_helpers::tlv_get_bytes(&tlvs, 0x5F1E),
        personalization_timestamp: dg_helpers::tlv_get_string_value(&tlvs, 0x5F55)?,
        personalization_device_serial_number: dg_helpers::tlv_get_string_value(&tlvs, 0x5F56)?,
    };
    return Ok(types::ParsedDataGroup::EFDG12(result));
}
