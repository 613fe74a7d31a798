use iso7816_tlv::ber;
use simplelog::debug;
#[cfg(feature = "cli")]
use simplelog::info;
use std::collections::HashMap;

use crate::helpers;
use crate::icao9303;
use crate::types::DecodeError;

#[cfg(feature = "cli")]
const SECTION_TITLE_PAD_TO_LEN: usize = 56;
#[cfg(feature = "cli")]
const PRINT_TITLE_PAD_TO_LEN: usize = 25;

/// Parses a file's outer TLV, checks it against the catalogue and returns it.
pub(crate) fn parse_base_tlv(
    data: &[u8],
    data_group: &icao9303::DataGroup,
) -> Result<ber::Tlv, DecodeError> {
    debug!("Parsing {} ({}b)", data_group.name, data.len());
    let base_tlv = helpers::parse_tlv_with_tag(data, data_group.tag.into())?;
    debug!("base_tlv: {:02x?}", &base_tlv);
    return Ok(base_tlv);
}

pub(crate) fn tlv_get_string_value(
    tlvs: &HashMap<u16, &ber::Tlv>,
    tag: u16,
) -> Result<Option<String>, DecodeError> {
    return match tlvs.get(&tag) {
        Some(data) => {
            let value_bytes = helpers::get_tlv_value_bytes(data);
            Ok(Some(
                String::from_utf8(value_bytes).map_err(|_| DecodeError::Utf8)?,
            ))
        }
        None => Ok(None),
    };
}

pub(crate) fn tlv_get_bytes(tlvs: &HashMap<u16, &ber::Tlv>, tag: u16) -> Option<Vec<u8>> {
    return tlvs.get(&tag).map(|data| helpers::get_tlv_value_bytes(data));
}

/// Splits a multi-line DG field. Lines are separated by <.
pub(crate) fn split_mrz_list(text: &str) -> Vec<String> {
    return text
        .split('<')
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();
}

/// Remove the < characters at the end of the given string.
pub fn remove_mrz_padding(text: &str) -> String {
    return text.trim_end_matches('<').to_string();
}

/// Formats a name from an MRZ.
///
/// Returns (first_name, last_name).
/// If no last name is present, returns (full_name, empty).
pub fn format_mrz_name(text: &str) -> (String, String) {
    let name_with_spaces = text.replace('<', " ");
    // Last name is separated by <<.
    return match text.find("<<") {
        // + 2 here for the length of <<
        Some(index) => (
            name_with_spaces[index + 2..].to_string(),
            name_with_spaces[0..index].to_string(),
        ),
        None => (name_with_spaces, "".to_string()),
    };
}

/// Converts an UTF-8/ASCII text to its number representations.
///
/// All values in text must be in ASCII 0-9 range (48-57), else it returns None.
pub fn text_to_numeric(text: &str) -> Option<Vec<u8>> {
    return text
        .bytes()
        .map(|character| match character {
            b'0'..=b'9' => Some(character - b'0'),
            _ => None,
        })
        .collect();
}

/// Parses a date from a DG. Must be in YYYYMMDD format.
///
/// Returns (DD, MM, YYYY) if it is in correct format, else None.
pub fn parse_dg_date(text: &str) -> Option<(u8, u8, u16)> {
    if text.len() != 8 {
        return None;
    }
    let date_numbers = text_to_numeric(text)?;
    return Some((
        date_numbers[6] * 10 + date_numbers[7],
        date_numbers[4] * 10 + date_numbers[5],
        (date_numbers[0] as u16 * 1000)
            + (date_numbers[1] as u16 * 100)
            + (date_numbers[2] as u16 * 10)
            + (date_numbers[3] as u16),
    ));
}

/// Parses a date from MRZ. Must be in YYMMDD format.
///
/// Returns (DD, MM, YYYY) if it is in correct format, else None.
pub fn parse_mrz_date(text: &str) -> Option<(u8, u8, u16)> {
    // If this is 40, then < 40 is assumed to be 2000s, and > 40 is assumed to be 1900s
    // This should account for expiry date, so current year + 10 is lowest safeish amount.
    const CENTURY_CUTOFF: u8 = 40;
    if text.len() != 6 {
        return None;
    }
    let date_numbers = text_to_numeric(text)?;
    let year_last_two_digits = (date_numbers[0] * 10) + date_numbers[1];
    let year: u16 = if year_last_two_digits < CENTURY_CUTOFF {
        2000 + year_last_two_digits as u16
    } else {
        1900 + year_last_two_digits as u16
    };
    return Some((
        date_numbers[4] * 10 + date_numbers[5],
        date_numbers[2] * 10 + date_numbers[3],
        year,
    ));
}

/// Formats a date. Must be in (DD, MM, YYYY) format.
///
/// Returns "DD.MM.YYYY (YYYY-MM-DD)".
pub fn format_date(dd: u8, mm: u8, yyyy: u16) -> String {
    return format!(
        "{dd:02}.{mm:02}.{yyyy:04} ({yyyy:04}-{mm:02}-{dd:02})",
        dd = dd,
        mm = mm,
        yyyy = yyyy
    );
}

#[cfg(feature = "cli")]
pub(crate) fn print_section_intro(data_group: &icao9303::DataGroup) {
    info!("");
    info!("{}", pad_section_title(data_group.name));
    info!("{}", pad_section_subtitle(data_group.description));
    info!("");
}

/// Pads a section title with =s up to 56 characters.
#[cfg(feature = "cli")]
pub(crate) fn pad_section_title(text: &str) -> String {
    let text_to_pad = format!(" <blue>{}</> ", text);
    // + 9 here to account for the color tags
    return format!(
        "<b>{:=^pad_len$}</>",
        text_to_pad,
        pad_len = SECTION_TITLE_PAD_TO_LEN + 9
    );
}

/// Pads a section subtitle with spaces up to 56 characters.
#[cfg(feature = "cli")]
pub(crate) fn pad_section_subtitle(text: &str) -> String {
    let text_to_pad = format!("({})", text);
    return format!(
        "{:^pad_len$}",
        text_to_pad,
        pad_len = SECTION_TITLE_PAD_TO_LEN
    );
}

#[cfg(feature = "cli")]
fn pad_with_ellipses(text: &str) -> String {
    let pad_len = PRINT_TITLE_PAD_TO_LEN.saturating_sub(text.len());
    return format!("<b>{}</>{:.<pad_len$}", text, "");
}

pub(crate) fn parse_mrz_sex(sex: char) -> String {
    // https://www.youtube.com/watch?v=HNy_retSME0
    return match sex {
        'M' => "Male".to_string(),
        'F' => "Female".to_string(),
        '<' => "X".to_string(),
        _ => sex.to_string(),
    };
}

#[cfg(feature = "cli")]
pub(crate) fn parse_mrz_document_code(document_code: &str, country_code: &str) -> String {
    // https://wf.lavatech.top/aves-tech-notes/emrtd-data-quirks see document type codes
    if document_code.len() != 2 {
        return document_code.to_string();
    }
    match document_code {
        "C<" if country_code == "ITA" => return "ID Card".to_string(),
        "I<" => return "ID Card".to_string(),
        "ID" if ["DNK", "BEL", "PLN"].contains(&country_code) => {
            return "ID or Residence Permit Card".to_string();
        }
        "ID" => return "ID Card".to_string(),
        "IP" => return "Passport Card".to_string(),
        "AD" | "AR" | "CR" | "IR" | "IT" | "RP" | "RT" => {
            return "Residence Permit Card".to_string();
        }
        "IB" | "IW" | "IK" | "IE" | "IO" | "IF" | "IZ" if country_code == "PLN" => {
            return "Residence Permit Card".to_string();
        }
        _ => {}
    }

    return match document_code.chars().next() {
        Some('P') => "Passport".to_string(),
        Some('I') => "ID Card (probably)".to_string(),
        _ => format!("Unknown document {}", document_code),
    };
}

#[cfg(feature = "cli")]
pub(crate) fn print_string_element(title: &str, value: &str) {
    info!("{} <yellow>{}</>", pad_with_ellipses(title), value);
}

#[cfg(feature = "cli")]
pub(crate) fn print_option_string_element(title: &str, value: &Option<String>) {
    if let Some(text) = value {
        print_string_element(title, text);
    }
}

#[cfg(feature = "cli")]
pub(crate) fn print_option_string_element_as_name(title: &str, value: &Option<String>) {
    if let Some(text) = value {
        print_string_element_as_name(title, text);
    }
}

#[cfg(feature = "cli")]
pub(crate) fn print_string_element_as_name(title: &str, value: &str) {
    let (first_name, last_name) = format_mrz_name(value);
    info!(
        "{} <yellow>{} {}</>",
        pad_with_ellipses(title),
        first_name.trim(),
        last_name.trim()
    );
}

#[cfg(feature = "cli")]
pub(crate) fn print_string_element_as_mrz_date(title: &str, value: &str) {
    match parse_mrz_date(value) {
        Some((dd, mm, yyyy)) => print_string_element(title, &format_date(dd, mm, yyyy)),
        None => print_string_element(title, value),
    }
}

#[cfg(feature = "cli")]
pub(crate) fn print_option_string_element_as_dg_date(title: &str, value: &Option<String>) {
    let Some(text) = value else {
        return;
    };
    match parse_dg_date(text) {
        Some((dd, mm, yyyy)) => print_string_element(title, &format_date(dd, mm, yyyy)),
        None => print_string_element(title, text),
    }
}

#[cfg(feature = "cli")]
pub(crate) fn print_binary_element(title: &str, data: &[u8]) {
    // magic number
    if data.len() > 128 {
        info!(
            "{} <yellow>[Binary File of {} bytes]</>",
            pad_with_ellipses(title),
            data.len()
        );
    } else {
        info!("{} <yellow>{:02x?}</>", pad_with_ellipses(title), data);
    }
}

#[cfg(feature = "cli")]
pub(crate) fn print_option_binary_element(title: &str, value: &Option<Vec<u8>>) {
    if let Some(data) = value {
        print_binary_element(title, data);
    }
}

#[cfg(feature = "cli")]
pub(crate) fn print_list_element(title: &str, values: &[String]) {
    if values.is_empty() {
        return;
    }
    print_string_element(title, &values.join(", "));
}
