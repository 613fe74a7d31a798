use simplelog::debug;
#[cfg(feature = "cli")]
use simplelog::info;

use crate::dg_parsers::helpers as dg_helpers;
use crate::helpers;
#[cfg(feature = "cli")]
use crate::icao9303;
use crate::icao9303::DataGroupId;
use crate::types::{self, DecodeError, Mrz};

impl types::EFDG1 {
    #[cfg(feature = "cli")]
    pub fn fancy_print(&self, data_group: &icao9303::DataGroup) {
        dg_helpers::print_section_intro(data_group);
        let mrz = self.mrz.layout();
        dg_helpers::print_string_element(
            "Document Type",
            &dg_helpers::parse_mrz_document_code(mrz.document_code(), mrz.issuing_state()),
        );
        dg_helpers::print_string_element("Issuing State", mrz.issuing_state());
        dg_helpers::print_string_element_as_name("Name", mrz.name_of_holder());
        dg_helpers::print_string_element("Document Number", mrz.document_number().0);
        dg_helpers::print_string_element("Nationality", mrz.nationality());
        dg_helpers::print_string_element_as_mrz_date("Date of Birth", mrz.date_of_birth().0);
        dg_helpers::print_string_element("Sex", &dg_helpers::parse_mrz_sex(mrz.sex()));
        dg_helpers::print_string_element_as_mrz_date("Date of Expiry", mrz.date_of_expiry().0);
        dg_helpers::print_string_element("MRZ", mrz.raw());
        info!("");
    }
}

pub fn parser(data: &[u8]) -> Result<types::ParsedDataGroup, DecodeError> {
    let base_tlv = dg_helpers::parse_base_tlv(data, DataGroupId::DG1.info())?;
    let tlvs = helpers::sort_tlvs_by_tag(helpers::get_tlv_constructed_value(&base_tlv)?);
    debug!("tlvs: {:02x?}", tlvs);

    let raw_mrz =
        dg_helpers::tlv_get_string_value(&tlvs, 0x5F1F)?.ok_or(DecodeError::MissingField(0x5F1F))?;
    let mrz = Mrz::deserialize(&raw_mrz)?;
    mrz.layout().validate_check_digits()?;

    return Ok(types::ParsedDataGroup::EFDG1(types::EFDG1 { mrz }));
}
