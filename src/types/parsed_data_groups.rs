use strum::FromRepr;

use crate::icao9303::DataGroupId;
use crate::types::{EFCardAccess, Mrz};

#[derive(Debug, Clone, PartialEq)]
pub struct EFCom {
    // ICAO 9303 part 10, edition 8, 4.6.1
    /// "0107" for LDS 1.7
    pub lds_version: Option<String>,
    /// "040000" for Unicode 4.0.0
    pub unicode_version: Option<String>,
    pub data_group_tag_list: Vec<u8>,
}

impl EFCom {
    /// Data groups the chip claims to carry, in catalogue order.
    pub fn data_groups(&self) -> Vec<DataGroupId> {
        use strum::IntoEnumIterator;
        return DataGroupId::iter()
            .filter(|id| {
                let info = id.info();
                info.dg_num != 0 && self.data_group_tag_list.contains(&info.tag)
            })
            .collect();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EFDG1 {
    // ICAO 9303 part 10, edition 8, 4.7.1
    pub mrz: Mrz,
}

#[derive(Debug, FromRepr, PartialEq, Eq, Clone, Copy)]
pub enum BiometricImageFormat {
    // ISO/IEC 19794:5-2005, 5.7.2
    Jpeg = 0x00,
    Jpeg2000 = 0x01,
    Reserved = 0x02,
}

impl BiometricImageFormat {
    pub fn get_extension(&self) -> &'static str {
        return match &self {
            BiometricImageFormat::Jpeg => "jpeg",
            BiometricImageFormat::Jpeg2000 => "jp2",
            BiometricImageFormat::Reserved => "image_bin",
        };
    }
}

/// One image out of an ISO/IEC 19794-5 facial record.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceImage {
    // ISO/IEC 19794-5:2005, 5.5 to 5.7
    pub gender: u8,
    pub eye_colour: u8,
    pub feature_points: Vec<[u8; 8]>,
    /// 0 basic, 1 full frontal, 2 token frontal
    pub face_image_type: u8,
    pub image_format: BiometricImageFormat,
    pub width: u16,
    pub height: u16,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Biometric {
    // ICAO 9303 part 10, edition 8, 4.7.2.1
    // Biometric Header Template (BHT) + Biometric data (encoded according to Format Owner)
    pub header_version: Option<Vec<u8>>,
    pub biometric_type: Option<Vec<u8>>,
    pub biometric_sub_type: Option<u8>,
    pub creation_timestamp: Option<Vec<u8>>,
    pub validity_period_from_through: Option<Vec<u8>>,
    pub creator_of_biometric_data: Option<Vec<u8>>,
    pub format_owner: Vec<u8>,
    pub format_type: Vec<u8>,
    /// The block as stored, 5F2E or the plaintext of an enciphered 7F2E
    pub data: Vec<u8>,
    /// Facial records out of `data`, DG2 only
    pub face_images: Vec<FaceImage>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EFDG2_3_4 {
    // ICAO 9303 part 10, edition 8, 4.7.2/3/4
    pub biometrics: Vec<Biometric>,
}

impl EFDG2_3_4 {
    /// The first face image of the first template that has one.
    pub fn first_face_image(&self) -> Option<&FaceImage> {
        return self
            .biometrics
            .iter()
            .flat_map(|biometric| biometric.face_images.iter())
            .next();
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EFDG5 {
    // ICAO 9303 part 10, edition 8, 4.7.5
    /// Vector of JPEG files (as Vec<u8>)
    pub displayed_portraits: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EFDG7 {
    // ICAO 9303 part 10, edition 8, 4.7.7
    /// Displayed Signatures or Usual Mark
    /// Vector of JPEG files (as Vec<u8>)
    pub displayed_signatures: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EFDG11 {
    // ICAO 9303 part 10, edition 8, 4.7.11
    pub full_name: Option<String>,
    pub other_names: Vec<String>,
    pub personal_number: Option<String>,
    /// YYYYMMDD
    pub full_date_of_birth: Option<String>,
    /// City first, then whatever the issuer adds (province, country)
    pub place_of_birth: Vec<String>,
    /// Address lines, street first
    pub permanent_address: Vec<String>,
    pub telephone: Option<String>,
    pub profession: Option<String>,
    pub title: Option<String>,
    pub personal_summary: Option<String>,
    /// JPEG
    pub proof_of_citizenship: Option<Vec<u8>>,
    pub other_valid_td_numbers: Vec<String>,
    pub custody_information: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EFDG12 {
    // ICAO 9303 part 10, edition 8, 4.7.12
    pub issuing_authority: Option<String>,
    /// YYYYMMDD
    pub date_of_issue: Option<String>,
    pub other_persons: Vec<String>,
    pub endorsements_observations: Option<String>,
    pub tax_exit_requirements: Option<String>,
    /// JPEG
    pub image_of_front_of_emrtd: Option<Vec<u8>>,
    /// JPEG
    pub image_of_rear_of_emrtd: Option<Vec<u8>>,
    /// yyyymmddhhmmss
    pub personalization_timestamp: Option<String>,
    pub personalization_device_serial_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EFDG14 {
    // ICAO 9303 part 10, edition 8, 4.7.14
    /// Protocol of every SecurityInfo (chip authentication, PACE, ...)
    pub protocols: Vec<asn1::ObjectIdentifier>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EFDG15 {
    // ICAO 9303 part 10, edition 8, 4.7.15
    /// SubjectPublicKeyInfo algorithm (RSA or EC public key)
    pub algorithm: asn1::ObjectIdentifier,
    pub public_key: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EFSod {
    // ICAO 9303 part 10, edition 8, 4.6.2
    /// ContentInfo type, signed data for a well-formed SOD
    pub content_type: asn1::ObjectIdentifier,
    /// Length of the signed data structure
    pub content_len: usize,
}

/// Files that have no decoder beyond a structural check.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDataGroup {
    pub tag: u16,
    pub len: usize,
}

#[derive(Debug)]
pub enum ParsedDataGroup {
    EFCom(EFCom),
    EFCardAccess(EFCardAccess),
    EFDG1(EFDG1),
    EFDG2_3_4(EFDG2_3_4),
    EFDG5(EFDG5),
    EFDG7(EFDG7),
    EFDG11(EFDG11),
    EFDG12(EFDG12),
    EFDG14(EFDG14),
    EFDG15(EFDG15),
    EFSod(EFSod),
    Raw(RawDataGroup),
}

impl ParsedDataGroup {
    /// Human readable overview of the file, for the cli.
    #[cfg(feature = "cli")]
    pub fn fancy_print(&self, data_group: &crate::icao9303::DataGroup) {
        match self {
            Self::EFCom(file) => file.fancy_print(data_group),
            Self::EFCardAccess(file) => file.fancy_print(data_group),
            Self::EFDG1(file) => file.fancy_print(data_group),
            Self::EFDG2_3_4(file) => file.fancy_print(data_group),
            Self::EFDG5(file) => file.fancy_print(data_group),
            Self::EFDG7(file) => file.fancy_print(data_group),
            Self::EFDG11(file) => file.fancy_print(data_group),
            Self::EFDG12(file) => file.fancy_print(data_group),
            Self::EFDG14(file) => file.fancy_print(data_group),
            Self::EFDG15(file) => file.fancy_print(data_group),
            Self::EFSod(file) => file.fancy_print(data_group),
            Self::Raw(file) => file.fancy_print(data_group),
        }
    }
}
