//! Merges the decoded groups into one record.
use image::DynamicImage;
use simplelog::debug;
#[cfg(feature = "cli")]
use simplelog::info;

use crate::dg_parsers::helpers as dg_helpers;
use crate::icao9303::DataGroupId;
use crate::portrait;
use crate::reader::ReadResults;
use crate::types::{Failure, ParsedDataGroup, EFDG1, EFDG11};

/// Everything a read produced, normalised for display.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScannedRecord {
    /// Given names
    pub name: String,
    pub surname: String,
    /// YYMMDD from the MRZ, or YYYYMMDD when DG11 has the full date
    pub birth_date: String,
    pub gender: String,
    pub nationality: String,
    pub document_number: String,
    /// Document code without fillers, "P", "ID", "C"...
    pub document_type: String,
    /// YYMMDD
    pub expiry_date: String,
    pub street: Option<String>,
    pub house_number: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub fiscal_code: Option<String>,
    pub birth_place: Option<String>,
    pub birth_province: Option<String>,
    pub phone_number: Option<String>,
    pub portrait: Option<DynamicImage>,
}

impl ScannedRecord {
    /// Birth date as (DD, MM, YYYY), whichever form it is stored in.
    pub fn birth_date_parts(&self) -> Option<(u8, u8, u16)> {
        return match self.birth_date.len() {
            8 => dg_helpers::parse_dg_date(&self.birth_date),
            _ => dg_helpers::parse_mrz_date(&self.birth_date),
        };
    }

    #[cfg(feature = "cli")]
    pub fn fancy_print(&self) {
        info!("");
        info!("{}", dg_helpers::pad_section_title("Scanned Record"));
        info!("");
        dg_helpers::print_string_element("Name", &self.name);
        dg_helpers::print_string_element("Surname", &self.surname);
        match self.birth_date_parts() {
            Some((dd, mm, yyyy)) => dg_helpers::print_string_element(
                "Date of Birth",
                &dg_helpers::format_date(dd, mm, yyyy),
            ),
            None => dg_helpers::print_string_element("Date of Birth", &self.birth_date),
        }
        dg_helpers::print_string_element("Sex", &self.gender);
        dg_helpers::print_string_element("Nationality", &self.nationality);
        dg_helpers::print_string_element("Document Type", &self.document_type);
        dg_helpers::print_string_element("Document Number", &self.document_number);
        dg_helpers::print_string_element_as_mrz_date("Date of Expiry", &self.expiry_date);
        dg_helpers::print_option_string_element("Street", &self.street);
        dg_helpers::print_option_string_element("House Number", &self.house_number);
        dg_helpers::print_option_string_element("City", &self.city);
        dg_helpers::print_option_string_element("Province", &self.province);
        dg_helpers::print_option_string_element("Fiscal Code", &self.fiscal_code);
        dg_helpers::print_option_string_element("Place of Birth", &self.birth_place);
        dg_helpers::print_option_string_element("Province of Birth", &self.birth_province);
        dg_helpers::print_option_string_element("Telephone", &self.phone_number);
        if let Some(portrait) = &self.portrait {
            dg_helpers::print_string_element(
                "Portrait",
                &format!("{}x{}", portrait.width(), portrait.height()),
            );
        }
        info!("");
    }
}

/// Street, house number, city, province.
type Address = (
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

/// Splits DG11's address list.
///
/// The first line is split on commas: "street,number" takes city and province from the
/// following lines, "street,city,province" carries all three. Any other first line is
/// the street as a whole.
pub fn split_address(permanent_address: &[String]) -> Address {
    let Some(first_line) = permanent_address.first() else {
        return (None, None, None, None);
    };
    let line = |index: usize| permanent_address.get(index).cloned();
    let tokens: Vec<String> = first_line
        .split(',')
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .collect();
    return match tokens.as_slice() {
        [street, house_number] => (
            Some(street.clone()),
            Some(house_number.clone()),
            line(1),
            line(2),
        ),
        [street, city, province] => (
            Some(street.clone()),
            None,
            Some(city.clone()),
            Some(province.clone()),
        ),
        _ => (Some(first_line.trim().to_string()), None, line(1), line(2)),
    };
}

/// Builds the record from DG1 and whatever else made it.
pub fn assemble_record(
    dg1: &EFDG1,
    dg11: Option<&EFDG11>,
    portrait: Option<DynamicImage>,
) -> ScannedRecord {
    let mrz = dg1.mrz.layout();
    let mut record = ScannedRecord {
        name: mrz.secondary_identifier(),
        surname: mrz.primary_identifier(),
        birth_date: mrz.date_of_birth().0.to_string(),
        gender: dg_helpers::parse_mrz_sex(mrz.sex()),
        nationality: dg_helpers::remove_mrz_padding(mrz.nationality()),
        document_number: dg_helpers::remove_mrz_padding(mrz.document_number().0),
        document_type: dg_helpers::remove_mrz_padding(mrz.document_code()),
        expiry_date: mrz.date_of_expiry().0.to_string(),
        portrait,
        ..ScannedRecord::default()
    };

    if let Some(dg11) = dg11 {
        let (street, house_number, city, province) = split_address(&dg11.permanent_address);
        record.street = street;
        record.house_number = house_number;
        record.city = city;
        record.province = province;
        record.fiscal_code = dg11.personal_number.clone();
        record.birth_place = dg11.place_of_birth.first().cloned();
        record.birth_province = dg11.place_of_birth.get(1).cloned();
        record.phone_number = dg11.telephone.clone();
        if let Some(full_date_of_birth) = &dg11.full_date_of_birth {
            debug!("Using DG11 date of birth {}", full_date_of_birth);
            record.birth_date = full_date_of_birth.clone();
        }
    }
    return record;
}

/// Assembles the record from a finished read. Fails only without DG1.
pub fn assemble(results: &ReadResults) -> Result<ScannedRecord, Failure> {
    let dg1 = match results.parsed(DataGroupId::DG1) {
        Some(ParsedDataGroup::EFDG1(dg1)) => dg1,
        _ => return Err(Failure::MandatoryGroupMissing),
    };
    let dg11 = match results.parsed(DataGroupId::DG11) {
        Some(ParsedDataGroup::EFDG11(dg11)) => Some(dg11),
        _ => None,
    };
    let portrait = match results.parsed(DataGroupId::DG2) {
        Some(ParsedDataGroup::EFDG2_3_4(dg2)) => portrait::extract_portrait(dg2),
        _ => None,
    };
    return Ok(assemble_record(dg1, dg11, portrait));
}
