use simplelog::debug;
#[cfg(feature = "cli")]
use simplelog::info;

#[cfg(feature = "cli")]
use crate::dg_parsers::helpers as dg_helpers;
use crate::helpers;
#[cfg(feature = "cli")]
use crate::icao9303;
use crate::types::{self, DecodeError};

impl types::RawDataGroup {
    #[cfg(feature = "cli")]
    pub fn fancy_print(&self, data_group: &icao9303::DataGroup) {
        dg_helpers::print_section_intro(data_group);
        dg_helpers::print_string_element(
            "Contents",
            &format!("tag 0x{:02X}, {} bytes (not decoded)", self.tag, self.len),
        );
        info!("");
    }
}

/// Accepts any single BER TLV, for files we carry but do not decode.
pub fn parser(data: &[u8]) -> Result<types::ParsedDataGroup, DecodeError> {
    let (base_tlv, _) = iso7816_tlv::ber::Tlv::parse(data);
    let base_tlv = base_tlv.map_err(|_| DecodeError::Tlv)?;
    let result = types::RawDataGroup {
        tag: helpers::get_tlv_tag(&base_tlv),
        len: base_tlv.to_vec().len(),
    };
    debug!("Raw data group: {:?}", result);
    return Ok(types::ParsedDataGroup::Raw(result));
}
