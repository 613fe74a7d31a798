//! DG5 (displayed portrait) and DG7 (displayed signature or usual mark).
use simplelog::{debug, warn};
#[cfg(feature = "cli")]
use simplelog::info;

use crate::dg_parsers::helpers as dg_helpers;
use crate::helpers;
#[cfg(feature = "cli")]
use crate::icao9303;
use crate::icao9303::DataGroupId;
use crate::types::{self, DecodeError};

impl types::EFDG5 {
    #[cfg(feature = "cli")]
    pub fn fancy_print(&self, data_group: &icao9303::DataGroup) {
        dg_helpers::print_section_intro(data_group);
        for (i, displayed_portrait) in self.displayed_portraits.iter().enumerate() {
            dg_helpers::print_binary_element(
                &format!("Displayed portrait (#{})", i + 1),
                displayed_portrait,
            );
        }
        info!("");
    }
}

impl types::EFDG7 {
    #[cfg(feature = "cli")]
    pub fn fancy_print(&self, data_group: &icao9303::DataGroup) {
        dg_helpers::print_section_intro(data_group);
        for (i, displayed_signature) in self.displayed_signatures.iter().enumerate() {
            dg_helpers::print_binary_element(
                &format!("Displayed signature (#{})", i + 1),
                displayed_signature,
            );
        }
        info!("");
    }
}

/// Returns the values of every `image_tag` element, checking the 02 count if present.
fn parse_displayed_images(
    data: &[u8],
    data_group_id: DataGroupId,
    image_tag: u16,
) -> Result<Vec<Vec<u8>>, DecodeError> {
    let base_tlv = dg_helpers::parse_base_tlv(data, data_group_id.info())?;
    let tlvs = helpers::get_tlv_constructed_value(&base_tlv)?;

    let images: Vec<Vec<u8>> = helpers::get_tlvs_by_tag(tlvs, image_tag)
        .into_iter()
        .map(helpers::get_tlv_value_bytes)
        .collect();
    if let Some(count_tlv) = helpers::get_tlv_by_tag(tlvs, 0x02) {
        let count = helpers::get_tlv_value_bytes(count_tlv);
        if count.as_slice() != [images.len() as u8] {
            warn!(
                "{} announces {:02x?} images, found {}",
                data_group_id.info().name,
                count,
                images.len()
            );
        }
    }
    debug!("{} image(s) in {}", images.len(), data_group_id.info().name);
    return Ok(images);
}

pub fn parser(data: &[u8]) -> Result<types::ParsedDataGroup, DecodeError> {
    let displayed_portraits = parse_displayed_images(data, DataGroupId::DG5, 0x5F40)?;
    return Ok(types::ParsedDataGroup::EFDG5(types::EFDG5 {
        displayed_portraits,
    }));
}

pub fn parser_dg7(data: &[u8]) -> Result<types::ParsedDataGroup, DecodeError> {
    let displayed_signatures = parse_displayed_images(data, DataGroupId::DG7, 0x5F43)?;
    return Ok(types::ParsedDataGroup::EFDG7(types::EFDG7 {
        displayed_signatures,
    }));
}
