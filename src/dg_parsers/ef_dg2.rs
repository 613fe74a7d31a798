//! DG2 (face), DG3 (finger) and DG4 (iris) share the biometric template layout.
//!
//! Only the face records inside DG2 are decoded further, following ISO/IEC 19794-5.
use iso7816_tlv::ber;
use simplelog::{debug, warn};
#[cfg(feature = "cli")]
use simplelog::info;

use crate::dg_parsers::helpers as dg_helpers;
use crate::helpers;
#[cfg(feature = "cli")]
use crate::icao9303;
use crate::icao9303::DataGroupId;
use crate::types::{self, BiometricImageFormat, DecodeError, FaceImage};

const FACIAL_RECORD_MAGIC: &[u8; 4] = b"FAC\0";
// General header: magic, version, record length, number of images
const FACIAL_RECORD_HEADER_LEN: usize = 14;
const FACIAL_INFORMATION_LEN: usize = 20;
const FEATURE_POINT_LEN: usize = 8;
const IMAGE_INFORMATION_LEN: usize = 12;

impl types::EFDG2_3_4 {
    #[cfg(feature = "cli")]
    pub fn fancy_print(&self, data_group: &icao9303::DataGroup) {
        dg_helpers::print_section_intro(data_group);
        for (index, biometric) in self.biometrics.iter().enumerate() {
            dg_helpers::print_string_element(
                "Biometric",
                &format!(
                    "#{} owner {:02x?} type {:02x?}",
                    index + 1,
                    biometric.format_owner,
                    biometric.format_type
                ),
            );
            dg_helpers::print_option_binary_element("Created", &biometric.creation_timestamp);
            dg_helpers::print_binary_element("Data", &biometric.data);
            for face_image in biometric.face_images.iter() {
                dg_helpers::print_string_element(
                    "Face Image",
                    &format!(
                        "{}x{} {}",
                        face_image.width,
                        face_image.height,
                        face_image.image_format.get_extension()
                    ),
                );
            }
        }
        info!("");
    }
}

/// Splits `len` bytes off the front of `data`.
fn take<'a>(data: &mut &'a [u8], len: usize) -> Result<&'a [u8], DecodeError> {
    if data.len() < len {
        return Err(DecodeError::Biometric("record is truncated"));
    }
    let (head, tail) = data.split_at(len);
    *data = tail;
    return Ok(head);
}

fn take_u16(data: &mut &[u8]) -> Result<u16, DecodeError> {
    let bytes = take(data, 2)?;
    return Ok(u16::from_be_bytes([bytes[0], bytes[1]]));
}

fn take_u32(data: &mut &[u8]) -> Result<u32, DecodeError> {
    let bytes = take(data, 4)?;
    return Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]));
}

/// Parses an ISO/IEC 19794-5 facial record into its images.
pub fn parse_facial_record(record: &[u8]) -> Result<Vec<FaceImage>, DecodeError> {
    let mut data = record;
    if take(&mut data, 4)? != FACIAL_RECORD_MAGIC {
        return Err(DecodeError::Biometric("facial record header missing"));
    }
    let version = take(&mut data, 4)?;
    let record_len = take_u32(&mut data)? as usize;
    let image_count = take_u16(&mut data)?;
    debug!(
        "Facial record version {:02x?}, {}b, {} image(s)",
        version, record_len, image_count
    );
    if record_len > record.len() {
        return Err(DecodeError::Biometric("record length exceeds the data"));
    }
    // Anything after the announced length is not ours
    let mut data = &record[FACIAL_RECORD_HEADER_LEN.min(record_len)..record_len];

    let mut face_images = Vec::with_capacity(image_count.into());
    for _ in 0..image_count {
        let block_len = take_u32(&mut data)? as usize;
        let feature_point_count = take_u16(&mut data)? as usize;
        let gender = take(&mut data, 1)?[0];
        let eye_colour = take(&mut data, 1)?[0];
        // hair colour, property mask, expression, pose angle, pose angle uncertainty
        take(&mut data, 1 + 3 + 2 + 3 + 3)?;

        let feature_points = take(&mut data, feature_point_count * FEATURE_POINT_LEN)?
            .chunks_exact(FEATURE_POINT_LEN)
            .map(|point| {
                let mut feature_point = [0u8; FEATURE_POINT_LEN];
                feature_point.copy_from_slice(point);
                feature_point
            })
            .collect();

        let face_image_type = take(&mut data, 1)?[0];
        let image_data_type = take(&mut data, 1)?[0];
        let width = take_u16(&mut data)?;
        let height = take_u16(&mut data)?;
        // colour space, source type, device type, quality
        take(&mut data, 1 + 1 + 2 + 2)?;

        let image_len = block_len
            .checked_sub(
                FACIAL_INFORMATION_LEN
                    + feature_point_count * FEATURE_POINT_LEN
                    + IMAGE_INFORMATION_LEN,
            )
            .ok_or(DecodeError::Biometric("facial block is shorter than its header"))?;
        let image_data = take(&mut data, image_len)?.to_vec();

        let image_format = BiometricImageFormat::from_repr(image_data_type.into())
            .unwrap_or(BiometricImageFormat::Reserved);
        face_images.push(FaceImage {
            gender,
            eye_colour,
            feature_points,
            face_image_type,
            image_format,
            width,
            height,
            data: image_data,
        });
    }
    return Ok(face_images);
}

fn parse_biometric_template(
    template: &ber::Tlv,
    decode_faces: bool,
) -> Result<types::Biometric, DecodeError> {
    let children = helpers::get_tlv_constructed_value(template)?;
    let header_tlv =
        helpers::get_tlv_by_tag(children, 0xA1).ok_or(DecodeError::MissingField(0xA1))?;
    let header = helpers::sort_tlvs_by_tag(helpers::get_tlv_constructed_value(header_tlv)?);
    debug!("BHT: {:02x?}", header);

    // 5F2E plain, 7F2E enciphered
    let data = helpers::get_tlv_by_tag(children, 0x5F2E)
        .or_else(|| helpers::get_tlv_by_tag(children, 0x7F2E))
        .map(helpers::get_tlv_value_bytes)
        .ok_or(DecodeError::MissingField(0x5F2E))?;

    let face_images = if decode_faces && data.starts_with(FACIAL_RECORD_MAGIC) {
        parse_facial_record(&data)?
    } else {
        vec![]
    };

    return Ok(types::Biometric {
        header_version: dg_helpers::tlv_get_bytes(&header, 0x80),
        biometric_type: dg_helpers::tlv_get_bytes(&header, 0x81),
        biometric_sub_type: dg_helpers::tlv_get_bytes(&header, 0x82)
            .and_then(|sub_type| sub_type.first().copied()),
        creation_timestamp: dg_helpers::tlv_get_bytes(&header, 0x83),
        validity_period_from_through: dg_helpers::tlv_get_bytes(&header, 0x85),
        creator_of_biometric_data: dg_helpers::tlv_get_bytes(&header, 0x86),
        format_owner: dg_helpers::tlv_get_bytes(&header, 0x87)
            .ok_or(DecodeError::MissingField(0x87))?,
        format_type: dg_helpers::tlv_get_bytes(&header, 0x88)
            .ok_or(DecodeError::MissingField(0x88))?,
        data,
        face_images,
    });
}

fn parse_biometric_group(
    data: &[u8],
    data_group_id: DataGroupId,
) -> Result<types::ParsedDataGroup, DecodeError> {
    let base_tlv = dg_helpers::parse_base_tlv(data, data_group_id.info())?;
    let base_children = helpers::get_tlv_constructed_value(&base_tlv)?;
    let group_template = helpers::get_tlv_by_tag(base_children, 0x7F61)
        .ok_or(DecodeError::MissingField(0x7F61))?;
    let group_children = helpers::get_tlv_constructed_value(group_template)?;

    let templates = helpers::get_tlvs_by_tag(group_children, 0x7F60);
    if let Some(count_tlv) = helpers::get_tlv_by_tag(group_children, 0x02) {
        let count = helpers::get_tlv_value_bytes(count_tlv);
        if count.as_slice() != [templates.len() as u8] {
            warn!(
                "{} announces {:02x?} templates, found {}",
                data_group_id.info().name,
                count,
                templates.len()
            );
        }
    }

    let decode_faces = data_group_id == DataGroupId::DG2;
    let biometrics = templates
        .into_iter()
        .map(|template| parse_biometric_template(template, decode_faces))
        .collect::<Result<Vec<_>, _>>()?;

    return Ok(types::ParsedDataGroup::EFDG2_3_4(types::EFDG2_3_4 {
        biometrics,
    }));
}

pub fn parser(data: &[u8]) -> Result<types::ParsedDataGroup, DecodeError> {
    return parse_biometric_group(data, DataGroupId::DG2);
}

pub fn parser_dg3(data: &[u8]) -> Result<types::ParsedDataGroup, DecodeError> {
    return parse_biometric_group(data, DataGroupId::DG3);
}

pub fn parser_dg4(data: &[u8]) -> Result<types::ParsedDataGroup, DecodeError> {
    return parse_biometric_group(data, DataGroupId::DG4);
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::helpers::build_tlv;

    const JPEG_STUB: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xD9];

    /// A facial record with one image and `feature_points` zeroed feature points.
    pub(crate) fn facial_record(feature_points: usize, image: &[u8]) -> Vec<u8> {
        let block_len = FACIAL_INFORMATION_LEN
            + feature_points * FEATURE_POINT_LEN
            + IMAGE_INFORMATION_LEN
            + image.len();
        let mut record = FACIAL_RECORD_MAGIC.to_vec();
        record.extend_from_slice(b"010\0");
        record.extend_from_slice(&((FACIAL_RECORD_HEADER_LEN + block_len) as u32).to_be_bytes());
        record.extend_from_slice(&1u16.to_be_bytes());

        record.extend_from_slice(&(block_len as u32).to_be_bytes());
        record.extend_from_slice(&(feature_points as u16).to_be_bytes());
        // female, blue eyes, then hair..pose uncertainty
        record.extend_from_slice(&[0x02, 0x03]);
        record.extend_from_slice(&[0u8; 12]);
        record.extend(vec![0u8; feature_points * FEATURE_POINT_LEN]);
        // full frontal JPEG, 240x320
        record.extend_from_slice(&[0x01, 0x00, 0x00, 0xF0, 0x01, 0x40]);
        record.extend_from_slice(&[0u8; 6]);
        record.extend_from_slice(image);
        return record;
    }

    /// Wraps biometric data blocks in a DG2 file.
    pub(crate) fn dg2_file(records: &[Vec<u8>]) -> Vec<u8> {
        let mut group = build_tlv(0x02, vec![records.len() as u8]);
        for record in records {
            let mut header = build_tlv(0x81, vec![0x02]);
            header.extend(build_tlv(0x87, vec![0x01, 0x01]));
            header.extend(build_tlv(0x88, vec![0x00, 0x08]));
            let mut template = build_tlv(0xA1, header);
            template.extend(build_tlv(0x5F2E, record.clone()));
            group.extend(build_tlv(0x7F60, template));
        }
        return build_tlv(0x75, build_tlv(0x7F61, group));
    }

    #[test]
    fn facial_record_with_feature_points() {
        let face_images = parse_facial_record(&facial_record(2, &JPEG_STUB)).unwrap();
        assert_eq!(face_images.len(), 1);
        let face_image = &face_images[0];
        assert_eq!(face_image.feature_points.len(), 2);
        assert_eq!(face_image.gender, 0x02);
        assert_eq!(face_image.image_format, BiometricImageFormat::Jpeg);
        assert_eq!((face_image.width, face_image.height), (240, 320));
        assert_eq!(face_image.data, JPEG_STUB.to_vec());
    }

    #[test]
    fn truncated_facial_record() {
        let mut record = facial_record(0, &JPEG_STUB);
        record.truncate(record.len() - 2);
        assert!(matches!(
            parse_facial_record(&record),
            Err(DecodeError::Biometric(_))
        ));
        assert!(matches!(
            parse_facial_record(b"FIR\0010\0"),
            Err(DecodeError::Biometric(_))
        ));
    }

    #[test]
    fn dg2_templates() {
        let dg2 = dg2_file(&[facial_record(0, &JPEG_STUB)]);
        let types::ParsedDataGroup::EFDG2_3_4(parsed) = parser(&dg2).unwrap() else {
            panic!("not DG2");
        };
        assert_eq!(parsed.biometrics.len(), 1);
        assert_eq!(parsed.biometrics[0].format_owner, vec![0x01, 0x01]);
        assert_eq!(parsed.biometrics[0].biometric_type, Some(vec![0x02]));
        assert_eq!(parsed.first_face_image().unwrap().data, JPEG_STUB.to_vec());
    }

    #[test]
    fn dg3_keeps_records_opaque() {
        let mut dg3 = dg2_file(&[facial_record(0, &JPEG_STUB)]);
        dg3[0] = 0x63;
        let types::ParsedDataGroup::EFDG2_3_4(parsed) = parser_dg3(&dg3).unwrap() else {
            panic!("not DG3");
        };
        assert!(parsed.first_face_image().is_none());
        assert!(parser(&dg3).is_err());
    }
}
