//! Password Authenticated Connection Establishment (ICAO 9303 p11, section 4.4)
//!
//! Only Generic Mapping is carried. Integrated and Chip Authentication Mapping chips also
//! offer Generic Mapping or accept BAC, which the negotiator falls back to.
use std::{error, fmt};

use simplelog::{debug, info, trace};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::crypt::KeyAgreement;
use crate::helpers;
use crate::icao9303::{self, AccessKey};
use crate::iso7816::{self, StatusCode};
use crate::secure_messaging::{CipherSuite, SecureSession};
use crate::smartcard_abstractions::Smartcard;
use crate::types::{EFCardAccess, Operation, PaceInfo, PaceMapping, SecureChannelError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// EF.CardAccess lists no PACEInfo we can run.
    NoPaceInfo,
    UnsupportedProtocol,
    UnsupportedMapping(PaceMapping),
    UnsupportedParameters(u64),
    ProprietaryParameters,
    InvalidDomainParameters,
    InvalidPublicKey,
    IdenticalPublicKeys,
    ResponseFormat(&'static str),
    TokenMismatch,
}

impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NoPaceInfo => write!(f, "no usable PACEInfo on the chip"),
            Self::UnsupportedProtocol => write!(f, "unknown PACE protocol"),
            Self::UnsupportedMapping(mapping) => {
                write!(f, "mapping {:?} is not supported", mapping)
            }
            Self::UnsupportedParameters(id) => write!(f, "parameter id {} is not supported", id),
            Self::ProprietaryParameters => write!(f, "proprietary domain parameters"),
            Self::InvalidDomainParameters => write!(f, "domain parameters are malformed"),
            Self::InvalidPublicKey => write!(f, "chip public key is invalid"),
            Self::IdenticalPublicKeys => write!(f, "chip echoed our public key"),
            Self::ResponseFormat(step) => write!(f, "malformed {} response", step),
            Self::TokenMismatch => write!(f, "chip authentication token is incorrect"),
        }
    }
}

/// Picks the first PACEInfo we can run, in the order the chip lists them.
pub fn select_pace_info(card_access: &EFCardAccess) -> Result<&PaceInfo, Error> {
    return card_access
        .pace_infos
        .iter()
        .find(|pace_info| check_pace_info(pace_info).is_ok())
        .ok_or(Error::NoPaceInfo);
}

fn check_pace_info(pace_info: &PaceInfo) -> Result<(CipherSuite, KeyAgreement), Error> {
    let (mapping, suite) = pace_info.algorithm().ok_or(Error::UnsupportedProtocol)?;
    if !mapping.is_generic() {
        return Err(Error::UnsupportedMapping(mapping));
    }
    let parameter_id = pace_info.parameter_id.ok_or(Error::ProprietaryParameters)?;
    let agreement = KeyAgreement::from_parameter_id(parameter_id)?;
    // the OID names the family, the parameter id must agree with it
    if agreement.is_elliptic() != (mapping == PaceMapping::EcdhGm) {
        return Err(Error::UnsupportedParameters(parameter_id));
    }
    return Ok((suite, agreement));
}

/// Authentication token: MAC over the other side's public key data object.
fn authentication_token(
    suite: CipherSuite,
    k_mac: &[u8],
    protocol_der: &[u8],
    public_key_tag: u16,
    public_key: &[u8],
) -> Result<Vec<u8>, SecureChannelError> {
    let public_key_do = helpers::build_tlv(
        0x7F49,
        [protocol_der, &helpers::build_tlv(public_key_tag, public_key.to_vec())].concat(),
    );
    trace!("Token input: {:02x?}", public_key_do);
    return match suite {
        CipherSuite::Tdes => suite.mac(k_mac, &icao9303::padding_method_2_pad(&public_key_do, 8)),
        _ => suite.mac(k_mac, &public_key_do),
    };
}

/// One GENERAL AUTHENTICATE step: sends `7C { request_tag data }` and returns the value
/// of `response_tag` inside the chip's `7C` template.
fn general_authenticate(
    smartcard: &mut (impl Smartcard + ?Sized),
    step: &'static str,
    request_tag: u16,
    data: Vec<u8>,
    response_tag: u16,
    last: bool,
) -> Result<Vec<u8>, SecureChannelError> {
    let dynamic_data = if data.is_empty() {
        helpers::build_tlv(0x7C, vec![])
    } else {
        helpers::build_tlv(0x7C, helpers::build_tlv(request_tag, data))
    };
    let (response, status_code) = iso7816::apdu_general_authenticate(dynamic_data, last)
        .exchange(smartcard, &mut None)?;
    if status_code != StatusCode::Ok as u16 {
        return Err(SecureChannelError::Status {
            operation: Operation::GeneralAuthenticate,
            status: status_code,
        });
    }
    let template = helpers::parse_tlv_with_tag(&response, 0x7C)
        .map_err(|_| Error::ResponseFormat(step))?;
    let children =
        helpers::get_tlv_constructed_value(&template).map_err(|_| Error::ResponseFormat(step))?;
    let value = helpers::get_tlv_by_tag(children, response_tag)
        .ok_or(Error::ResponseFormat(step))?;
    return Ok(helpers::get_tlv_value_bytes(value));
}

/// Runs PACE with freshly generated ephemeral keys.
pub fn establish(
    smartcard: &mut (impl Smartcard + ?Sized),
    access_key: &AccessKey,
    pace_info: &PaceInfo,
) -> Result<SecureSession, SecureChannelError> {
    let (_, agreement) = check_pace_info(pace_info)?;
    let mapping_private_key = agreement.generate_private_key();
    let agreement_private_key = agreement.generate_private_key();
    return establish_with_values(
        smartcard,
        access_key,
        pace_info,
        &mapping_private_key,
        &agreement_private_key,
    );
}

/// Runs PACE with caller-provided private keys for the mapping and the key agreement.
pub fn establish_with_values(
    smartcard: &mut (impl Smartcard + ?Sized),
    access_key: &AccessKey,
    pace_info: &PaceInfo,
    mapping_private_key: &[u8],
    agreement_private_key: &[u8],
) -> Result<SecureSession, SecureChannelError> {
    let (suite, agreement) = check_pace_info(pace_info)?;
    info!(
        "<d>Authenticating with PACE ({}, parameter id {:?})</>",
        pace_info.protocol, pace_info.parameter_id
    );
    let protocol_der = pace_info.protocol_der();

    // MSE:Set AT with the protocol OID and the password we hold
    let mse_data = [
        helpers::build_tlv(0x80, protocol_der[2..].to_vec()),
        helpers::build_tlv(0x83, vec![access_key.password_reference()]),
    ]
    .concat();
    let (_, status_code) = iso7816::apdu_mse_set_at(mse_data).exchange(smartcard, &mut None)?;
    if status_code != StatusCode::Ok as u16 {
        return Err(SecureChannelError::Status {
            operation: Operation::SetAuthenticationTemplate,
            status: status_code,
        });
    }

    // Step 1: encrypted nonce, decrypted with K.pi
    let mut nonce = Zeroizing::new(general_authenticate(
        smartcard, "nonce", 0x80, vec![], 0x80, false,
    )?);
    if nonce.is_empty() || nonce.len() % suite.block_size() != 0 {
        return Err(Error::ResponseFormat("nonce").into());
    }
    let k_pi = suite.derive_key(&access_key.pace_password(), 3);
    suite.decrypt(&k_pi, &vec![0u8; suite.block_size()], &mut nonce)?;
    trace!("PACE nonce: {:02x?}", nonce);

    // Step 2: map the nonce onto the domain parameters
    let mapping_public_key = agreement.public_key(mapping_private_key)?;
    let chip_mapping_public_key = general_authenticate(
        smartcard,
        "mapping",
        0x81,
        mapping_public_key,
        0x82,
        false,
    )?;
    let mapped = agreement.map_generic(&nonce, mapping_private_key, &chip_mapping_public_key)?;
    debug!("PACE mapping done");

    // Step 3: ephemeral key agreement over the mapped parameters
    let our_public_key = mapped.public_key(agreement_private_key)?;
    let chip_public_key = general_authenticate(
        smartcard,
        "key agreement",
        0x83,
        our_public_key.clone(),
        0x84,
        false,
    )?;
    if bool::from(chip_public_key.ct_eq(&our_public_key)) {
        return Err(Error::IdenticalPublicKeys.into());
    }
    let shared_secret = mapped.shared_secret(agreement_private_key, &chip_public_key)?;
    let k_enc = suite.derive_key(&shared_secret, 1);
    let k_mac = suite.derive_key(&shared_secret, 2);
    trace!("PACE KS.enc: {:02x?} KS.mac: {:02x?}", k_enc, k_mac);

    // Step 4: mutual authentication
    let public_key_tag = mapped.public_key_tag();
    let our_token =
        authentication_token(suite, &k_mac, &protocol_der, public_key_tag, &chip_public_key)?;
    let chip_token = general_authenticate(
        smartcard,
        "mutual authentication",
        0x85,
        our_token,
        0x86,
        true,
    )?;
    let expected_chip_token =
        authentication_token(suite, &k_mac, &protocol_der, public_key_tag, &our_public_key)?;
    if !bool::from(expected_chip_token.ct_eq(&chip_token)) {
        return Err(Error::TokenMismatch.into());
    }

    debug!("PACE established");
    return SecureSession::new(suite, &k_enc, &k_mac, &vec![0u8; suite.block_size()]);
}
