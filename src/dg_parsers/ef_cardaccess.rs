use iso7816_tlv::ber;
use simplelog::{debug, warn};
#[cfg(feature = "cli")]
use simplelog::info;

use crate::dg_parsers::helpers as dg_helpers;
use crate::helpers;
#[cfg(feature = "cli")]
use crate::icao9303;
use crate::icao9303::DataGroupId;
use crate::types::{self, DecodeError, EFCardAccess, PaceInfo};

// ICAO 9303 part 11, edition 8, 9.2
#[derive(asn1::Asn1Read)]
struct SecurityInfo<'a> {
    protocol: asn1::ObjectIdentifier,
    required_data: asn1::Tlv<'a>,
    optional_data: Option<asn1::Tlv<'a>>,
}

impl EFCardAccess {
    #[cfg(feature = "cli")]
    pub fn fancy_print(&self, data_group: &icao9303::DataGroup) {
        dg_helpers::print_section_intro(data_group);
        for pace_info in self.pace_infos.iter() {
            let parameters = match pace_info.parameter_id {
                Some(parameter_id) => parameter_id.to_string(),
                None => "proprietary".to_string(),
            };
            match pace_info.algorithm() {
                Some((mapping, suite)) => dg_helpers::print_string_element(
                    "PACE",
                    &format!("{:?} {:?}, parameters {}", mapping, suite, parameters),
                ),
                None => dg_helpers::print_string_element(
                    "PACE",
                    &format!("{}, parameters {}", pace_info.protocol, parameters),
                ),
            }
        }
        for protocol in self.other_protocols.iter() {
            dg_helpers::print_string_element("Other protocol", &protocol.to_string());
        }
        info!("");
    }
}

/// Parses the children of a SecurityInfos SET.
///
/// Returns (protocol, required data, optional data) for each, the data as DER.
pub(crate) fn parse_security_infos(
    set_tlv: &ber::Tlv,
) -> Result<Vec<(asn1::ObjectIdentifier, Vec<u8>, Option<Vec<u8>>)>, DecodeError> {
    let mut security_infos = vec![];
    for child in helpers::get_tlv_constructed_value(set_tlv)?.iter() {
        let child_der = child.to_vec();
        let security_info = asn1::parse_single::<SecurityInfo>(&child_der).map_err(|e| {
            warn!("Could not parse SecurityInfo {:02x?}: {:?}", child_der, e);
            DecodeError::Asn1
        })?;
        security_infos.push((
            security_info.protocol,
            security_info.required_data.full_data().to_vec(),
            security_info
                .optional_data
                .map(|optional_data| optional_data.full_data().to_vec()),
        ));
    }
    return Ok(security_infos);
}

pub fn parser(data: &[u8]) -> Result<types::ParsedDataGroup, DecodeError> {
    let data_group = DataGroupId::EFCardAccess.info();
    let base_tlv = dg_helpers::parse_base_tlv(data, data_group)?;

    let mut pace_infos = vec![];
    let mut other_protocols = vec![];
    for (protocol, required_data, optional_data) in parse_security_infos(&base_tlv)? {
        if types::pace_algorithm(&protocol).is_none() {
            debug!("Skipping SecurityInfo {}", protocol);
            other_protocols.push(protocol);
            continue;
        }
        let version =
            asn1::parse_single::<u64>(&required_data).map_err(|_| DecodeError::Asn1)?;
        // parameterId is an INTEGER, anything else here is not one we know
        let parameter_id = match optional_data {
            Some(optional_data) => asn1::parse_single::<u64>(&optional_data).ok(),
            None => None,
        };
        pace_infos.push(PaceInfo {
            protocol,
            version,
            parameter_id,
        });
    }
    debug!("PACEInfos: {:?}", pace_infos);

    return Ok(types::ParsedDataGroup::EFCardAccess(EFCardAccess {
        pace_infos,
        other_protocols,
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secure_messaging::CipherSuite;
    use crate::types::PaceMapping;
    use hex_literal::hex;

    fn parse(data: &[u8]) -> EFCardAccess {
        return match parser(data).unwrap() {
            types::ParsedDataGroup::EFCardAccess(card_access) => card_access,
            other => panic!("not EF.CardAccess: {:?}", other),
        };
    }

    #[test]
    fn appendix_g1_card_access() {
        let card_access = parse(&hex!("31143012060A04007F0007020204020202010202010D"));
        assert_eq!(card_access.pace_infos.len(), 1);
        let pace_info = &card_access.pace_infos[0];
        assert_eq!(pace_info.version, 2);
        assert_eq!(pace_info.parameter_id, Some(13));
        assert_eq!(
            pace_info.algorithm(),
            Some((PaceMapping::EcdhGm, CipherSuite::Aes128))
        );
        assert!(card_access.other_protocols.is_empty());
    }

    #[test]
    fn keeps_unknown_protocols_apart() {
        // PACEInfo without parameterId, then a PACEDomainParameterInfo
        let card_access = parse(&hex!(
            "3123"
            "300F060A04007F00070202040102020102"
            "3010060904007F000702020302300302010D"
        ));
        assert_eq!(card_access.pace_infos.len(), 1);
        assert_eq!(card_access.pace_infos[0].parameter_id, None);
        assert_eq!(
            card_access.other_protocols,
            vec![asn1::oid!(0, 4, 0, 127, 0, 7, 2, 2, 3, 2)]
        );
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(
            parser(&hex!("31053003020102")).unwrap_err(),
            DecodeError::Asn1
        );
        assert!(matches!(
            parser(&hex!("3003020102")).unwrap_err(),
            DecodeError::UnexpectedTag { .. }
        ));
    }
}
