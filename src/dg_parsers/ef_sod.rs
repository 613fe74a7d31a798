//! Security objects: DG14 (SecurityInfos), DG15 (Active Authentication key) and EF.SOD.
//!
//! These are only checked for structure. Nothing here verifies a signature.
use simplelog::debug;
#[cfg(feature = "cli")]
use simplelog::info;

use crate::dg_parsers::ef_cardaccess::parse_security_infos;
use crate::dg_parsers::helpers as dg_helpers;
use crate::helpers;
#[cfg(feature = "cli")]
use crate::icao9303;
use crate::icao9303::DataGroupId;
use crate::types::{self, DecodeError};

/// id-signedData (RFC 5652, 5.1)
pub static SIGNED_DATA_OID: asn1::ObjectIdentifier = asn1::oid!(1, 2, 840, 113549, 1, 7, 2);

#[derive(asn1::Asn1Read)]
struct AlgorithmIdentifier<'a> {
    algorithm: asn1::ObjectIdentifier,
    _parameters: Option<asn1::Tlv<'a>>,
}

#[derive(asn1::Asn1Read)]
struct SubjectPublicKeyInfo<'a> {
    algorithm: AlgorithmIdentifier<'a>,
    subject_public_key: asn1::BitString<'a>,
}

// content is [0] EXPLICIT, we only need its size
#[derive(asn1::Asn1Read)]
struct ContentInfo<'a> {
    content_type: asn1::ObjectIdentifier,
    content: asn1::Tlv<'a>,
}

impl types::EFDG14 {
    #[cfg(feature = "cli")]
    pub fn fancy_print(&self, data_group: &icao9303::DataGroup) {
        dg_helpers::print_section_intro(data_group);
        for protocol in self.protocols.iter() {
            dg_helpers::print_string_element("Protocol", &protocol.to_string());
        }
        info!("");
    }
}

impl types::EFDG15 {
    #[cfg(feature = "cli")]
    pub fn fancy_print(&self, data_group: &icao9303::DataGroup) {
        dg_helpers::print_section_intro(data_group);
        dg_helpers::print_string_element("Algorithm", &self.algorithm.to_string());
        dg_helpers::print_binary_element("Public key", &self.public_key);
        info!("");
    }
}

impl types::EFSod {
    #[cfg(feature = "cli")]
    pub fn fancy_print(&self, data_group: &icao9303::DataGroup) {
        dg_helpers::print_section_intro(data_group);
        dg_helpers::print_string_element("Content type", &self.content_type.to_string());
        dg_helpers::print_string_element("Signed data", &format!("{} bytes", self.content_len));
        info!("");
    }
}

/// The single DER value inside a data group's outer tag.
fn inner_der(data: &[u8], data_group_id: DataGroupId) -> Result<Vec<u8>, DecodeError> {
    let base_tlv = dg_helpers::parse_base_tlv(data, data_group_id.info())?;
    let children = helpers::get_tlv_constructed_value(&base_tlv)?;
    return match children {
        [inner] => Ok(inner.to_vec()),
        _ => Err(DecodeError::Asn1),
    };
}

pub fn parser_dg14(data: &[u8]) -> Result<types::ParsedDataGroup, DecodeError> {
    let base_tlv = dg_helpers::parse_base_tlv(data, DataGroupId::DG14.info())?;
    let children = helpers::get_tlv_constructed_value(&base_tlv)?;
    let security_infos_tlv = helpers::get_tlv_by_tag(children, 0x31)
        .ok_or(DecodeError::MissingField(0x31))?;
    let protocols: Vec<asn1::ObjectIdentifier> = parse_security_infos(security_infos_tlv)?
        .into_iter()
        .map(|(protocol, _, _)| protocol)
        .collect();
    debug!("DG14 protocols: {:?}", protocols);
    return Ok(types::ParsedDataGroup::EFDG14(types::EFDG14 { protocols }));
}

pub fn parser_dg15(data: &[u8]) -> Result<types::ParsedDataGroup, DecodeError> {
    let der = inner_der(data, DataGroupId::DG15)?;
    let public_key_info =
        asn1::parse_single::<SubjectPublicKeyInfo>(&der).map_err(|_| DecodeError::Asn1)?;
    let result = types::EFDG15 {
        algorithm: public_key_info.algorithm.algorithm,
        public_key: public_key_info.subject_public_key.as_bytes().to_vec(),
    };
    debug!("DG15 algorithm: {}", result.algorithm);
    return Ok(types::ParsedDataGroup::EFDG15(result));
}

pub fn parser(data: &[u8]) -> Result<types::ParsedDataGroup, DecodeError> {
    let der = inner_der(data, DataGroupId::EFSod)?;
    let content_info = asn1::parse_single::<ContentInfo>(&der).map_err(|_| DecodeError::Asn1)?;
    if content_info.content_type != SIGNED_DATA_OID {
        debug!("EF.SOD content type is {}", content_info.content_type);
        return Err(DecodeError::Asn1);
    }
    return Ok(types::ParsedDataGroup::EFSod(types::EFSod {
        content_type: content_info.content_type,
        content_len: content_info.content.data().len(),
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn sod_must_be_signed_data() {
        // ContentInfo { signedData, [0] { NULL } }
        let sod = hex!("7711300F06092A864886F70D010702A0020500");
        let types::ParsedDataGroup::EFSod(parsed) = parser(&sod).unwrap() else {
            panic!("not EF.SOD");
        };
        assert_eq!(parsed.content_type, SIGNED_DATA_OID);
        assert_eq!(parsed.content_len, 2);

        // id-data instead
        let data = hex!("7711300F06092A864886F70D010701A0020500");
        assert_eq!(parser(&data).unwrap_err(), DecodeError::Asn1);
    }

    #[test]
    fn dg14_lists_protocols() {
        // ChipAuthenticationInfo (id-CA-ECDH-AES-CBC-CMAC-128, version 1)
        let dg14 = hex!("6E13" "3111" "300F060A04007F00070202030202020101");
        let types::ParsedDataGroup::EFDG14(parsed) = parser_dg14(&dg14).unwrap() else {
            panic!("not DG14");
        };
        assert_eq!(
            parsed.protocols,
            vec![asn1::oid!(0, 4, 0, 127, 0, 7, 2, 2, 3, 2, 2)]
        );
    }

    #[test]
    fn dg15_reads_the_public_key() {
        // SubjectPublicKeyInfo { id-ecPublicKey, prime256v1 }, 04 || 2 bytes as a stand-in
        let dg15 = hex!(
            "6F20"
            "301E"
            "301306072A8648CE3D020106082A8648CE3D030107"
            "030700040A0B0C0D0E"
        );
        let types::ParsedDataGroup::EFDG15(parsed) = parser_dg15(&dg15).unwrap() else {
            panic!("not DG15");
        };
        assert_eq!(parsed.algorithm, asn1::oid!(1, 2, 840, 10045, 2, 1));
        assert_eq!(parsed.public_key, hex!("040A0B0C0D0E").to_vec());
    }
}
