//! ICAO 9303 constants, the LDS1 file catalogue and the MRZ-side key material.
use sha1::{Digest, Sha1};
use sha2::Sha256;
use std::fmt;
use strum::{EnumIter, IntoStaticStr};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::dg_parsers;
use crate::types::{DecodeError, ParsedDataGroup};

/// Decoder for the raw contents of one file.
pub type Parser = fn(&[u8]) -> Result<ParsedDataGroup, DecodeError>;

#[derive(Debug)]
pub struct DataGroup {
    pub name: &'static str,
    pub tag: u8,
    pub dg_num: u8,
    pub file_id: u16,
    pub description: &'static str,
    // Whether the file lives under the eMRTD LDS1 applet or the master file.
    // For more info, see ICAO 9303 p10, page 39, figure 3
    pub in_lds1: bool,
    pub parser: Parser,
}

/// Files we know how to address, in catalogue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
pub enum DataGroupId {
    EFCom,
    EFCardAccess,
    DG1,
    DG2,
    DG3,
    DG4,
    DG5,
    DG6,
    DG7,
    DG8,
    DG9,
    DG10,
    DG11,
    DG12,
    DG13,
    DG14,
    DG15,
    DG16,
    EFSod,
}

impl DataGroupId {
    pub fn info(&self) -> &'static DataGroup {
        return &DATA_GROUPS[*self as usize];
    }
}

impl fmt::Display for DataGroupId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.info().name)
    }
}

/// Calculates MRZ check digits according to ICAO 9303 p3
///
/// Can be used for document number, DOB, Expiry and MRZ text
/// Accepts a str of A-Z 0-9 and <
pub fn calculate_check_digit(text: &str) -> u8 {
    let mrz_weights = [7, 3, 1];
    // MRZ isn't supposed to have lowercase characters, but user input is user input.
    let uppercase_text = text.to_uppercase();
    let mut check_digit: u8 = 0;

    for (i, character) in uppercase_text.as_bytes().iter().enumerate() {
        let char_value = match character {
            b'A'..=b'Z' => character - 55, // A = 10, Z = 35
            b'0'..=b'9' => character - 48,
            _ => 0, // < and anything unexpected
        };
        // mod10 on each iteration keeps us in u8 for arbitrary lengths
        check_digit = (check_digit + char_value * mrz_weights[i % 3]) % 10;
    }
    return check_digit;
}

/// Whether `check_digit` is the check digit of `field`. A filler counts as zero.
pub fn check_digit_matches(field: &str, check_digit: char) -> bool {
    let expected = calculate_check_digit(field);
    return match check_digit {
        '<' => expected == 0,
        _ => check_digit.to_digit(10) == Some(u32::from(expected)),
    };
}

/// Appends MRZ check digits to a given str
pub fn append_check_digit(text: &str) -> String {
    let check_digit = calculate_check_digit(text);
    return format!("{}{}", text, check_digit);
}

/// Does key derivation based on ICAO 9303 p11 for SHA1
///
/// For BAC, this is always used.
/// For PACE, this is used for 3DES and 128-bit AES keys.
pub fn kdf_sha1(shared_secret: &[u8], counter: u32) -> Zeroizing<Vec<u8>> {
    let mut sha1_hasher = Sha1::new();
    sha1_hasher.update(shared_secret);
    sha1_hasher.update(counter.to_be_bytes());
    // Trim to first 16 bytes.
    let keydata = Zeroizing::new(sha1_hasher.finalize()[0..16].to_vec());
    return keydata;
}

/// Same as [`kdf_sha1`] but with SHA256, for 192 and 256-bit AES keys.
pub fn kdf_sha256(shared_secret: &[u8], counter: u32, key_len: usize) -> Zeroizing<Vec<u8>> {
    let mut sha256_hasher = Sha256::new();
    sha256_hasher.update(shared_secret);
    sha256_hasher.update(counter.to_be_bytes());
    let keydata = Zeroizing::new(sha256_hasher.finalize()[0..key_len].to_vec());
    return keydata;
}

/// ISO 9797-1 padding method 2: 0x80 then zeroes up to the block size.
pub fn padding_method_2_pad(data: &[u8], block_size: usize) -> Vec<u8> {
    let mut padded = Vec::with_capacity(data.len() + block_size);
    padded.extend_from_slice(data);
    padded.push(0x80);
    while padded.len() % block_size != 0 {
        padded.push(0x00);
    }
    return padded;
}

/// Strips ISO 9797-1 padding method 2. None if the padding is malformed.
pub fn padding_method_2_unpad(data: &[u8]) -> Option<Vec<u8>> {
    let marker_index = data.iter().rposition(|byte| *byte != 0x00)?;
    if data[marker_index] != 0x80 {
        return None;
    }
    return Some(data[..marker_index].to_vec());
}

/// Key material printed on the document (or the CAN) that unlocks the chip.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub enum AccessKey {
    Mrz {
        document_number: String,
        date_of_birth: String,
        date_of_expiry: String,
    },
    Can(String),
}

impl fmt::Debug for AccessKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Mrz { .. } => write!(f, "AccessKey::Mrz(..)"),
            Self::Can(_) => write!(f, "AccessKey::Can(..)"),
        }
    }
}

impl AccessKey {
    /// Builds an MRZ access key. Dates are YYMMDD. Check digits are computed here.
    pub fn from_mrz(
        document_number: &str,
        date_of_birth: &str,
        date_of_expiry: &str,
    ) -> Result<AccessKey, DecodeError> {
        let is_date = |text: &str| text.len() == 6 && text.bytes().all(|b| b.is_ascii_digit());
        if !is_date(date_of_birth) || !is_date(date_of_expiry) {
            return Err(DecodeError::MrzFormat);
        }
        let document_number = document_number.trim().to_uppercase();
        if document_number.is_empty()
            || !document_number
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'<')
        {
            return Err(DecodeError::MrzFormat);
        }
        return Ok(AccessKey::Mrz {
            document_number,
            date_of_birth: date_of_birth.to_string(),
            date_of_expiry: date_of_expiry.to_string(),
        });
    }

    pub fn from_can(can: &str) -> Result<AccessKey, DecodeError> {
        if can.is_empty() || !can.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DecodeError::MrzFormat);
        }
        return Ok(AccessKey::Can(can.to_string()));
    }

    /// "MRZ information": document number, birth date and expiry, each with check digit.
    ///
    /// Short document numbers are padded with < to 9 characters, as printed.
    pub fn mrz_information(&self) -> Option<Zeroizing<String>> {
        match self {
            Self::Mrz {
                document_number,
                date_of_birth,
                date_of_expiry,
            } => {
                let padded_document_number = format!("{:<<9}", document_number);
                return Some(Zeroizing::new(format!(
                    "{}{}{}",
                    append_check_digit(&padded_document_number),
                    append_check_digit(date_of_birth),
                    append_check_digit(date_of_expiry)
                )));
            }
            Self::Can(_) => return None,
        }
    }

    /// Kseed for BAC. Only MRZ keys can do BAC.
    pub fn bac_key_seed(&self) -> Option<Zeroizing<Vec<u8>>> {
        let mrz_information = self.mrz_information()?;
        let mut sha1_hasher = Sha1::new();
        sha1_hasher.update(mrz_information.as_bytes());
        return Some(Zeroizing::new(sha1_hasher.finalize()[0..16].to_vec()));
    }

    /// The PACE password: SHA1 of the MRZ information, or the CAN itself.
    pub fn pace_password(&self) -> Zeroizing<Vec<u8>> {
        match self {
            Self::Mrz { .. } => {
                let mrz_information = self.mrz_information().unwrap_or_default();
                let mut sha1_hasher = Sha1::new();
                sha1_hasher.update(mrz_information.as_bytes());
                return Zeroizing::new(sha1_hasher.finalize().to_vec());
            }
            Self::Can(can) => return Zeroizing::new(can.as_bytes().to_vec()),
        }
    }

    /// Password reference for MSE:Set AT (ICAO 9303 p11, 4.4.4.1).
    pub fn password_reference(&self) -> u8 {
        return match self {
            Self::Mrz { .. } => 0x01,
            Self::Can(_) => 0x02,
        };
    }
}

pub static AID_MRTD_LDS1: [u8; 7] = [0xA0, 0x00, 0x00, 0x02, 0x47, 0x10, 0x01];

// Indexed by DataGroupId, keep the order in sync.
pub static DATA_GROUPS: [DataGroup; 19] = [
    DataGroup{name: "EF.COM", tag: 0x60, dg_num: 0, file_id: 0x011E, description: "Header and Data Group Presence Information", in_lds1: true, parser: dg_parsers::ef_com::parser},
    DataGroup{name: "EF.CardAccess", tag: 0x31, dg_num: 0, file_id: 0x011C, description: "SecurityInfos (PACE)", in_lds1: false, parser: dg_parsers::ef_cardaccess::parser},
    DataGroup{name: "EF.DG1", tag: 0x61, dg_num: 1, file_id: 0x0101, description: "Details recorded in MRZ", in_lds1: true, parser: dg_parsers::ef_dg1::parser},
    DataGroup{name: "EF.DG2", tag: 0x75, dg_num: 2, file_id: 0x0102, description: "Encoded Face", in_lds1: true, parser: dg_parsers::ef_dg2::parser},
    DataGroup{name: "EF.DG3", tag: 0x63, dg_num: 3, file_id: 0x0103, description: "Encoded Finger(s)", in_lds1: true, parser: dg_parsers::ef_dg2::parser_dg3},
    DataGroup{name: "EF.DG4", tag: 0x76, dg_num: 4, file_id: 0x0104, description: "Encoded Eye(s)", in_lds1: true, parser: dg_parsers::ef_dg2::parser_dg4},
    DataGroup{name: "EF.DG5", tag: 0x65, dg_num: 5, file_id: 0x0105, description: "Displayed Portrait", in_lds1: true, parser: dg_parsers::ef_dg5::parser},
    DataGroup{name: "EF.DG6", tag: 0x66, dg_num: 6, file_id: 0x0106, description: "Reserved for Future Use", in_lds1: true, parser: dg_parsers::generic::parser},
    DataGroup{name: "EF.DG7", tag: 0x67, dg_num: 7, file_id: 0x0107, description: "Displayed Signature or Usual Mark", in_lds1: true, parser: dg_parsers::ef_dg5::parser_dg7},
    DataGroup{name: "EF.DG8", tag: 0x68, dg_num: 8, file_id: 0x0108, description: "Data Feature(s)", in_lds1: true, parser: dg_parsers::generic::parser},
    DataGroup{name: "EF.DG9", tag: 0x69, dg_num: 9, file_id: 0x0109, description: "Structure Feature(s)", in_lds1: true, parser: dg_parsers::generic::parser},
    DataGroup{name: "EF.DG10", tag: 0x6A, dg_num: 10, file_id: 0x010A, description: "Substance Feature(s)", in_lds1: true, parser: dg_parsers::generic::parser},
    DataGroup{name: "EF.DG11", tag: 0x6B, dg_num: 11, file_id: 0x010B, description: "Additional Personal Detail(s)", in_lds1: true, parser: dg_parsers::ef_dg11::parser},
    DataGroup{name: "EF.DG12", tag: 0x6C, dg_num: 12, file_id: 0x010C, description: "Additional Document Detail(s)", in_lds1: true, parser: dg_parsers::ef_dg12::parser},
    DataGroup{name: "EF.DG13", tag: 0x6D, dg_num: 13, file_id: 0x010D, description: "Optional Detail(s)", in_lds1: true, parser: dg_parsers::generic::parser},
    DataGroup{name: "EF.DG14", tag: 0x6E, dg_num: 14, file_id: 0x010E, description: "Security Options", in_lds1: true, parser: dg_parsers::ef_sod::parser_dg14},
    DataGroup{name: "EF.DG15", tag: 0x6F, dg_num: 15, file_id: 0x010F, description: "Active Authentication Public Key Info", in_lds1: true, parser: dg_parsers::ef_sod::parser_dg15},
    DataGroup{name: "EF.DG16", tag: 0x70, dg_num: 16, file_id: 0x0110, description: "Person(s) to Notify", in_lds1: true, parser: dg_parsers::generic::parser},
    DataGroup{name: "EF.SOD", tag: 0x77, dg_num: 0, file_id: 0x011D, description: "Document Security Object", in_lds1: true, parser: dg_parsers::ef_sod::parser},
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_digits_match_doc9303_examples() {
        assert_eq!(calculate_check_digit("L898902C<"), 3);
        assert_eq!(calculate_check_digit("690806"), 1);
        assert_eq!(calculate_check_digit("940623"), 6);
        assert!(check_digit_matches("L898902C<", '3'));
        assert!(!check_digit_matches("L898902C<", '4'));
        assert!(check_digit_matches("<<<<<<<<<<<<<<", '<'));
    }

    #[test]
    fn mrz_information_pads_short_document_numbers() {
        let key = AccessKey::from_mrz("L898902C", "690806", "940623").unwrap();
        assert_eq!(
            key.mrz_information().unwrap().as_str(),
            "L898902C<369080619406236"
        );
    }

    #[test]
    fn bac_key_seed_matches_appendix_d() {
        let key = AccessKey::from_mrz("L898902C<", "690806", "940623").unwrap();
        let seed = key.bac_key_seed().unwrap();
        assert_eq!(
            seed.as_slice(),
            &[
                0x23, 0x9A, 0xB9, 0xCB, 0x28, 0x2D, 0xAF, 0x66, 0x23, 0x1D, 0xC5, 0xA4, 0xDF,
                0x6B, 0xFB, 0xAE
            ]
        );
        let k_enc = kdf_sha1(&seed, 1);
        assert_eq!(
            k_enc.as_slice(),
            &[
                0xAB, 0x94, 0xFC, 0xED, 0xF2, 0x66, 0x4E, 0xDF, 0xB9, 0xB2, 0x91, 0xF8, 0x5D,
                0x7F, 0x77, 0xF2
            ]
        );
    }

    #[test]
    fn padding_round_trip_and_rejection() {
        assert_eq!(
            padding_method_2_pad(&[0x01, 0x02], 8),
            vec![0x01, 0x02, 0x80, 0, 0, 0, 0, 0]
        );
        assert_eq!(padding_method_2_pad(&[0u8; 8], 8).len(), 16);
        assert_eq!(
            padding_method_2_unpad(&[0x01, 0x80, 0x00, 0x00]),
            Some(vec![0x01])
        );
        assert_eq!(padding_method_2_unpad(&[0x01, 0x00, 0x00]), None);
        assert_eq!(padding_method_2_unpad(&[0x00, 0x00]), None);
    }

    #[test]
    fn catalogue_matches_ids() {
        use strum::IntoEnumIterator;
        for id in DataGroupId::iter() {
            let name: &'static str = id.into();
            let info = id.info();
            // "EF.DG11" for DG11, "EF.COM" for EFCom
            assert_eq!(
                info.name.replace('.', "").to_ascii_lowercase(),
                format!("ef{}", name.trim_start_matches("EF")).to_ascii_lowercase(),
            );
        }
        assert_eq!(DataGroupId::EFCom.info().file_id, 0x011E);
        assert_eq!(DataGroupId::EFCardAccess.info().file_id, 0x011C);
        assert_eq!(DataGroupId::DG1.info().tag, 0x61);
        assert_eq!(DataGroupId::DG11.info().file_id, 0x010B);
        assert_eq!(DataGroupId::DG16.info().file_id, 0x0110);
        assert_eq!(DataGroupId::EFSod.info().tag, 0x77);
    }
}
