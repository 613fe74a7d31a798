//! Access keys from printed MRZ text, as typed in or read by OCR.
use simplelog::debug;

use crate::dg_parsers::helpers as dg_helpers;
use crate::icao9303::AccessKey;
use crate::types::{DecodeError, Mrz};

/// A parsed printed MRZ and the key it unlocks the chip with.
#[derive(Debug, Clone)]
pub struct MrzAccess {
    pub mrz: Mrz,
    pub access_key: AccessKey,
}

/// Parses a TD1 (3 lines of 30), TD2 (2 of 36) or TD3 (2 of 44) MRZ.
///
/// Lines may be separated by newlines or run together. Whitespace is dropped and letters
/// are uppercased. The document number, birth date and expiry check digits must match.
pub fn parse_mrz_text(text: &str) -> Result<MrzAccess, DecodeError> {
    let normalized: String = text
        .chars()
        .filter(|character| !character.is_whitespace())
        .map(|character| character.to_ascii_uppercase())
        .collect();
    debug!("Normalized MRZ text: {}", normalized);

    let mrz = Mrz::deserialize(&normalized)?;
    let layout = mrz.layout();
    layout.validate_check_digits()?;

    let access_key = AccessKey::from_mrz(
        &dg_helpers::remove_mrz_padding(layout.document_number().0),
        layout.date_of_birth().0,
        layout.date_of_expiry().0,
    )?;
    return Ok(MrzAccess { mrz, access_key });
}
