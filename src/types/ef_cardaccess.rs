use crate::secure_messaging::CipherSuite;

/// How the nonce is mapped onto the domain parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaceMapping {
    DhGm,
    EcdhGm,
    DhIm,
    EcdhIm,
    EcdhCam,
}

impl PaceMapping {
    pub fn is_generic(&self) -> bool {
        return matches!(self, Self::DhGm | Self::EcdhGm);
    }
}

// handy: https://oid-rep.orange-labs.fr/get/0.4.0.127.0.7.2.2.4
pub static PACE_PROTOCOL_OIDS: [(asn1::ObjectIdentifier, PaceMapping, CipherSuite); 19] = [
    (asn1::oid!(0, 4, 0, 127, 0, 7, 2, 2, 4, 1, 1), PaceMapping::DhGm, CipherSuite::Tdes),
    (asn1::oid!(0, 4, 0, 127, 0, 7, 2, 2, 4, 1, 2), PaceMapping::DhGm, CipherSuite::Aes128),
    (asn1::oid!(0, 4, 0, 127, 0, 7, 2, 2, 4, 1, 3), PaceMapping::DhGm, CipherSuite::Aes192),
    (asn1::oid!(0, 4, 0, 127, 0, 7, 2, 2, 4, 1, 4), PaceMapping::DhGm, CipherSuite::Aes256),
    (asn1::oid!(0, 4, 0, 127, 0, 7, 2, 2, 4, 2, 1), PaceMapping::EcdhGm, CipherSuite::Tdes),
    (asn1::oid!(0, 4, 0, 127, 0, 7, 2, 2, 4, 2, 2), PaceMapping::EcdhGm, CipherSuite::Aes128),
    (asn1::oid!(0, 4, 0, 127, 0, 7, 2, 2, 4, 2, 3), PaceMapping::EcdhGm, CipherSuite::Aes192),
    (asn1::oid!(0, 4, 0, 127, 0, 7, 2, 2, 4, 2, 4), PaceMapping::EcdhGm, CipherSuite::Aes256),
    (asn1::oid!(0, 4, 0, 127, 0, 7, 2, 2, 4, 3, 1), PaceMapping::DhIm, CipherSuite::Tdes),
    (asn1::oid!(0, 4, 0, 127, 0, 7, 2, 2, 4, 3, 2), PaceMapping::DhIm, CipherSuite::Aes128),
    (asn1::oid!(0, 4, 0, 127, 0, 7, 2, 2, 4, 3, 3), PaceMapping::DhIm, CipherSuite::Aes192),
    (asn1::oid!(0, 4, 0, 127, 0, 7, 2, 2, 4, 3, 4), PaceMapping::DhIm, CipherSuite::Aes256),
    (asn1::oid!(0, 4, 0, 127, 0, 7, 2, 2, 4, 4, 1), PaceMapping::EcdhIm, CipherSuite::Tdes),
    (asn1::oid!(0, 4, 0, 127, 0, 7, 2, 2, 4, 4, 2), PaceMapping::EcdhIm, CipherSuite::Aes128),
    (asn1::oid!(0, 4, 0, 127, 0, 7, 2, 2, 4, 4, 3), PaceMapping::EcdhIm, CipherSuite::Aes192),
    (asn1::oid!(0, 4, 0, 127, 0, 7, 2, 2, 4, 4, 4), PaceMapping::EcdhIm, CipherSuite::Aes256),
    // CAM has no 3DES variant
    (asn1::oid!(0, 4, 0, 127, 0, 7, 2, 2, 4, 6, 2), PaceMapping::EcdhCam, CipherSuite::Aes128),
    (asn1::oid!(0, 4, 0, 127, 0, 7, 2, 2, 4, 6, 3), PaceMapping::EcdhCam, CipherSuite::Aes192),
    (asn1::oid!(0, 4, 0, 127, 0, 7, 2, 2, 4, 6, 4), PaceMapping::EcdhCam, CipherSuite::Aes256),
];

/// Looks up the mapping and cipher suite a PACE protocol OID stands for.
pub fn pace_algorithm(protocol: &asn1::ObjectIdentifier) -> Option<(PaceMapping, CipherSuite)> {
    return PACE_PROTOCOL_OIDS
        .iter()
        .find(|(oid, _, _)| oid == protocol)
        .map(|(_, mapping, suite)| (*mapping, *suite));
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaceInfo {
    // ICAO 9303 part 11, edition 8, 9.2.1
    pub protocol: asn1::ObjectIdentifier,
    /// Should be 2
    pub version: u64,
    /// Standardized domain parameters (ICAO 9303 p11, 9.5.1). Absent means proprietary.
    pub parameter_id: Option<u64>,
}

impl PaceInfo {
    pub fn algorithm(&self) -> Option<(PaceMapping, CipherSuite)> {
        return pace_algorithm(&self.protocol);
    }

    /// The protocol OID with its DER tag and length, as used in authentication tokens.
    pub fn protocol_der(&self) -> Vec<u8> {
        // an OID always fits, writing to a Vec cannot fail otherwise
        return asn1::write_single(&self.protocol).unwrap_or_default();
    }
}

#[derive(Debug)]
pub struct EFCardAccess {
    // ICAO 9303 part 11, edition 8, 9.2.11
    pub pace_infos: Vec<PaceInfo>,
    /// SecurityInfos we do not act on (domain parameter infos, CA, TA, ...)
    pub other_protocols: Vec<asn1::ObjectIdentifier>,
}
