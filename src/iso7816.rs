//! ISO 7816 APDU handlers (for ICAO 9303 only)
use simplelog::{debug, info, trace, warn};
use std::cmp::min;
use strum::{FromRepr, IntoStaticStr};

use crate::helpers;
use crate::icao9303;
use crate::secure_messaging::SecureSession;
use crate::smartcard_abstractions::Smartcard;
use crate::types::{ReadError, SecureChannelError, TransportError};

#[repr(u8)]
pub enum Command {
    ReadBinary = 0xB0,
    ReadBinaryOdd = 0xB1,
    SelectFile = 0xA4,
    GetChallenge = 0x84,
    ExternalAuthentication = 0x82,
    ManageSecurityEnvironment = 0x22,
    GeneralAuthenticate = 0x86,
}

// ISO/IEC 7816-4 status words, list seeded from proxmark3 include/protocols.h
#[repr(u16)]
#[derive(Debug, FromRepr, IntoStaticStr, PartialEq, Clone, Copy)]
pub enum StatusCode {
    Ok = 0x9000,
    BytesRemaining00 = 0x6100,
    WarningStateUnchanged = 0x6200,
    DataCorrupt = 0x6281,
    FileEof = 0x6282,
    InvalidDf = 0x6283,
    InvalidFile = 0x6284,
    FileTerminated = 0x6285,
    AuthFailed = 0x6300,
    FileFilled = 0x6381,
    MemoryFull = 0x6501,
    WriteMemoryErr = 0x6581,
    WrongLength = 0x6700,
    LogicalChannelNotSupported = 0x6881,
    SecureMessagingNotSupported = 0x6882,
    LastCommandExpected = 0x6883,
    CommandChainingNotSupported = 0x6884,
    TransactionFail = 0x6900,
    SelectFileErr = 0x6981,
    SecurityStatusNotSatisfied = 0x6982,
    FileInvalid = 0x6983,
    DataInvalid = 0x6984,
    ConditionsNotSatisfied = 0x6985,
    CommandNotAllowed = 0x6986,
    SmDataMissing = 0x6987,
    SmDataIncorrect = 0x6988,
    AppletSelectFailed = 0x6999,
    InvalidP1P2 = 0x6A00,
    WrongData = 0x6A80,
    FuncNotSupported = 0x6A81,
    FileNotFound = 0x6A82,
    RecordNotFound = 0x6A83,
    FileFull = 0x6A84,
    LcTlvConflict = 0x6A85,
    IncorrectP1P2 = 0x6A86,
    NcInconsistentWithP1P2 = 0x6A87,
    ReferencedDataNotFound = 0x6A88,
    FileExists = 0x6A89,
    NotImplemented = 0x6AFF,
    WrongP1P2 = 0x6B00,
    CorrectLength00 = 0x6C00,
    InsNotSupported = 0x6D00,
    ClaNotSupported = 0x6E00,
    Unknown = 0x6F00,
}

/// Readable name for a status word. xx-parametrised words (61xx, 6Cxx) resolve to their family.
pub fn status_code_name(status_code: u16) -> &'static str {
    let status_code_repr = StatusCode::from_repr(status_code)
        .or_else(|| StatusCode::from_repr(status_code & 0xFF00));
    return match status_code_repr {
        Some(repr) => repr.into(),
        None => "Unrecognized",
    };
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApduCommand {
    pub cla: u8,                   // class
    pub ins: u8,                   // instruction
    pub p1: u8,                    // parameter 1
    pub p2: u8,                    // parameter 2
    pub data: Vec<u8>,             // data
    pub max_resp_len: Option<u16>, // aka le, 256 is sent as 00
}

impl ApduCommand {
    fn is_extended(&self) -> bool {
        return self.data.len() > 0xFF || self.max_resp_len.is_some_and(|le| le > 0x100);
    }

    /// Encodes an Le value (short or extended), or an empty vec when no response is expected.
    pub(crate) fn le_field(max_resp_len: Option<u16>, extended: bool) -> Vec<u8> {
        let le = match max_resp_len {
            Some(le) => le,
            None => return vec![],
        };
        if extended {
            // 65536 does not fit, 0000 is its encoding and u16 tops out at 65535 anyway
            return le.to_be_bytes().to_vec();
        }
        // 256 is encoded as 00
        return vec![le as u8];
    }

    /// Serialize the APDU to a byte stream
    pub fn serialize(&self) -> Vec<u8> {
        // https://en.wikipedia.org/wiki/Smart_card_application_protocol_data_unit#APDU_message_command-response_pair
        let extended = self.is_extended();
        let mut apdu = vec![self.cla, self.ins, self.p1, self.p2];

        if !self.data.is_empty() {
            // Lc: length of data
            if extended {
                apdu.push(0x00);
                apdu.extend_from_slice(&(self.data.len() as u16).to_be_bytes());
            } else {
                apdu.push(self.data.len() as u8);
            }
            apdu.extend_from_slice(&self.data);
        }

        if self.max_resp_len.is_some() {
            // Extended Le without Lc carries its own leading zero
            if extended && self.data.is_empty() {
                apdu.push(0x00);
            }
            apdu.extend(Self::le_field(self.max_resp_len, extended));
        }
        return apdu;
    }

    /// Send APDU to the given smartcard, wrapping it in secure messaging if a session is given.
    ///
    /// Returns (RAPDU data, status code)
    pub fn exchange(
        &mut self,
        smartcard: &mut (impl Smartcard + ?Sized),
        session: &mut Option<SecureSession>,
    ) -> Result<(Vec<u8>, u16), SecureChannelError> {
        // one retry is what 6Cxx asks for, the second is for chips that misreport
        let mut retries_left = 2;
        loop {
            debug!("> APDU (secure: {:?}): {:02x?}", session.is_some(), self);
            let apdu_bytes = match session.as_mut() {
                Some(secure_session) => secure_session.protect(self)?,
                None => self.serialize(),
            };
            trace!("> raw: {:02x?}", apdu_bytes);

            let rapdu = smartcard.exchange_apdu(&apdu_bytes)?;
            trace!("< raw: {:02x?}", rapdu);
            if rapdu.len() < 2 {
                return Err(TransportError::ShortResponse.into());
            }
            let body = &rapdu[..rapdu.len() - 2];
            let outer_status = get_status_code(&rapdu);

            let (rapdu_data, status_code) = match session.as_mut() {
                Some(secure_session) => secure_session.unprotect(body, outer_status)?,
                None => (body.to_vec(), outer_status),
            };
            debug!(
                "< RAPDU {:04X} ({}): {:02x?}",
                status_code,
                status_code_name(status_code),
                rapdu_data
            );

            // ISO/IEC 7816-4 says:
            // If SW1 is set to '6C', then the process is aborted and before issuing
            // any other command, the same command may be re-issued using SW2
            // (exact number of available data bytes) as short Le field.
            let [sw1, sw2] = status_code.to_be_bytes();
            if sw1 == 0x6C && retries_left > 0 {
                retries_left -= 1;
                let exact_len = if sw2 == 0 { 0x100 } else { u16::from(sw2) };
                debug!("Got a SW1=6C, re-requesting with Le={:?}", exact_len);
                self.max_resp_len = Some(exact_len);
                continue;
            }
            return Ok((rapdu_data, status_code));
        }
    }
}

/// Reads the length of a file from its first bytes (BER tag and length).
///
/// Returns None if the bytes are not a BER header.
pub fn get_file_len_from_header(header: &[u8]) -> Option<usize> {
    let first_tag_byte = *header.first()?;
    // high tag number form has more tag bytes, each with b8 set except the last
    let mut tag_len = 1;
    if first_tag_byte & 0x1F == 0x1F {
        while *header.get(tag_len)? & 0x80 == 0x80 {
            tag_len += 1;
        }
        tag_len += 1;
    }
    let (length_field_len, value_len) = helpers::asn1_parse_len(header.get(tag_len..)?)?;
    return Some(tag_len + length_field_len as usize + value_len as usize);
}

/// The largest offset a plain READ BINARY can address (P1 b8 must stay clear).
const MAX_READ_BINARY_OFFSET: usize = 0x7FFF;
/// DO'54' offsets of the odd READ BINARY are at most three bytes here.
const MAX_FILE_LEN: usize = 0xFF_FFFF;
/// How much we ask for per READ BINARY.
const READ_CHUNK_SIZE: usize = 0x80;

/// Selects an elementary file and reads it whole.
pub fn select_and_read_file(
    smartcard: &mut (impl Smartcard + ?Sized),
    dg_info: &icao9303::DataGroup,
    session: &mut Option<SecureSession>,
) -> Result<Vec<u8>, ReadError> {
    info!("<d>Selecting {} ({})</>", dg_info.name, dg_info.description);
    let (_, status_code) = apdu_select_file_by_ef(dg_info.file_id).exchange(smartcard, session)?;
    if status_code != StatusCode::Ok as u16 {
        warn!(
            "{} could not be selected: {:04X} ({}).",
            dg_info.name,
            status_code,
            status_code_name(status_code)
        );
        return Err(ReadError::Status(status_code));
    }

    info!("<d>Reading {} ({})</>", dg_info.name, dg_info.description);
    // Unfortunately, ICAO 9303 does not allow us to read file sizes.
    // We must, therefore, read the ASN.1 header to get the size.
    let mut total_data = read_binary_chunk(smartcard, session, 0, 4)?;
    if total_data.len() < 4 {
        // a whole file in under four bytes cannot be one of ours
        return Err(ReadError::FileHeader);
    }
    let file_len = get_file_len_from_header(&total_data).ok_or(ReadError::FileHeader)?;
    if file_len > MAX_FILE_LEN {
        return Err(ReadError::FileTooLarge(file_len));
    }
    if file_len > 5_000 {
        info!(
            "<d>{} seems quite large ({}b), this may take a bit.</>",
            dg_info.name, file_len
        );
    }

    let mut bytes_to_read = READ_CHUNK_SIZE;
    while total_data.len() < file_len {
        let offset = total_data.len();
        let chunk_len = min(bytes_to_read, file_len - offset);
        debug!(
            "Reading file, file_len: {:?} offset: {:?} chunk_len: {:?}",
            file_len, offset, chunk_len
        );

        let (apdu_data, status_code) = if offset > MAX_READ_BINARY_OFFSET {
            let (wrapped, status_code) = apdu_read_binary_odd(offset as u32, chunk_len as u16)
                .exchange(smartcard, session)?;
            (unwrap_odd_read_data(&wrapped)?, status_code)
        } else {
            apdu_read_binary(offset as u16, chunk_len as u16).exchange(smartcard, session)?
        };
        let [sw1, sw2] = status_code.to_be_bytes();
        let received_len = apdu_data.len();
        total_data.extend(apdu_data);

        // ISO/IEC 7816-4 says:
        // If SW1 is set to '61', then the process is completed and before issuing
        // any other command, a get response command may be issued with the same CLA
        // and using SW2 (number of data bytes still available) as short Le field.
        if sw1 == 0x61 {
            bytes_to_read = if sw2 == 0 { READ_CHUNK_SIZE } else { usize::from(sw2) };
        } else if status_code == StatusCode::FileEof as u16 || received_len == 0 {
            warn!(
                "{} ended at {}b, header says {}b.",
                dg_info.name,
                total_data.len(),
                file_len
            );
            break;
        } else if status_code != StatusCode::Ok as u16 {
            return Err(ReadError::Status(status_code));
        } else {
            bytes_to_read = READ_CHUNK_SIZE;
        }
    }
    total_data.truncate(file_len);
    debug!("Read file ({:?}b): {:02x?}", total_data.len(), total_data);
    return Ok(total_data);
}

fn read_binary_chunk(
    smartcard: &mut (impl Smartcard + ?Sized),
    session: &mut Option<SecureSession>,
    offset: u16,
    len: u16,
) -> Result<Vec<u8>, ReadError> {
    let (data, status_code) = apdu_read_binary(offset, len).exchange(smartcard, session)?;
    if status_code != StatusCode::Ok as u16 && status_code != StatusCode::FileEof as u16 {
        return Err(ReadError::Status(status_code));
    }
    return Ok(data);
}

pub const P1_SELECT_BY_EF: u8 = 0x02;
pub const P1_SELECT_BY_NAME: u8 = 0x04;
pub const P2_PROPRIETARY: u8 = 0x0C;

/// Set AT for mutual authentication (ICAO 9303 p11, 4.4.4.1)
pub const P1_SET_AT_MUTUAL_AUTH: u8 = 0xC1;
pub const P2_SET_AT_AUTHENTICATION: u8 = 0xA4;

/// Command chaining bit in CLA
pub const CLA_CHAINING: u8 = 0x10;

/// Last two bytes of a response as a u16. Callers guarantee at least two bytes.
pub fn get_status_code(data: &[u8]) -> u16 {
    let status_code_start = data.len() - 2;
    return u16::from_be_bytes([data[status_code_start], data[status_code_start + 1]]);
}

pub fn apdu_select_file_by_name(name: Vec<u8>) -> ApduCommand {
    return ApduCommand {
        cla: 0,
        ins: Command::SelectFile as u8,
        p1: P1_SELECT_BY_NAME,
        p2: P2_PROPRIETARY,
        data: name,
        max_resp_len: None,
    };
}

pub fn apdu_select_file_by_ef(file_id: u16) -> ApduCommand {
    return ApduCommand {
        cla: 0,
        ins: Command::SelectFile as u8,
        p1: P1_SELECT_BY_EF,
        p2: P2_PROPRIETARY,
        data: file_id.to_be_bytes().to_vec(),
        max_resp_len: None,
    };
}

pub fn apdu_read_binary(offset: u16, bytes_to_read: u16) -> ApduCommand {
    let offset_bytes = offset.to_be_bytes();
    return ApduCommand {
        cla: 0,
        ins: Command::ReadBinary as u8,
        p1: offset_bytes[0],
        p2: offset_bytes[1],
        data: vec![],
        max_resp_len: Some(bytes_to_read),
    };
}

/// READ BINARY with the offset in DO'54', for offsets past 0x7FFF.
///
/// The answer is wrapped in DO'53', so Le leaves room for its header.
pub fn apdu_read_binary_odd(offset: u32, bytes_to_read: u16) -> ApduCommand {
    let offset_bytes = offset.to_be_bytes();
    let first_used = offset_bytes.iter().position(|byte| *byte != 0).unwrap_or(3);
    return ApduCommand {
        cla: 0,
        ins: Command::ReadBinaryOdd as u8,
        p1: 0,
        p2: 0,
        data: helpers::build_tlv(0x54, offset_bytes[first_used..].to_vec()),
        max_resp_len: Some((bytes_to_read + 4).min(0x100)),
    };
}

/// The file bytes inside an odd READ BINARY answer. An empty answer stays empty.
fn unwrap_odd_read_data(data: &[u8]) -> Result<Vec<u8>, ReadError> {
    if data.is_empty() {
        return Ok(vec![]);
    }
    let tlv = helpers::parse_tlv_with_tag(data, 0x53)?;
    return Ok(helpers::get_tlv_value_bytes(&tlv));
}

pub fn apdu_get_challenge() -> ApduCommand {
    return ApduCommand {
        cla: 0,
        ins: Command::GetChallenge as u8,
        p1: 0,
        p2: 0,
        data: vec![],
        max_resp_len: Some(8), // rnd.ic is 8 bytes
    };
}

pub fn apdu_external_authentication(data: Vec<u8>) -> ApduCommand {
    return ApduCommand {
        cla: 0,
        ins: Command::ExternalAuthentication as u8,
        p1: 0,
        p2: 0,
        data,
        // magic length from ICAO 9303 p11 (0x28)
        max_resp_len: Some(40),
    };
}

pub fn apdu_mse_set_at(data: Vec<u8>) -> ApduCommand {
    return ApduCommand {
        cla: 0,
        ins: Command::ManageSecurityEnvironment as u8,
        p1: P1_SET_AT_MUTUAL_AUTH,
        p2: P2_SET_AT_AUTHENTICATION,
        data,
        max_resp_len: None,
    };
}

/// GENERAL AUTHENTICATE. Every step but the last is chained.
pub fn apdu_general_authenticate(data: Vec<u8>, last: bool) -> ApduCommand {
    return ApduCommand {
        cla: if last { 0 } else { CLA_CHAINING },
        ins: Command::GeneralAuthenticate as u8,
        p1: 0,
        p2: 0,
        data,
        max_resp_len: Some(0x100),
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct ScriptedCard {
        expected: VecDeque<(Vec<u8>, Vec<u8>)>,
    }

    impl Smartcard for ScriptedCard {
        fn exchange_apdu(&mut self, data: &[u8]) -> Result<Vec<u8>, TransportError> {
            let (command, response) = self.expected.pop_front().expect("unexpected APDU");
            assert_eq!(data, command.as_slice());
            return Ok(response);
        }

        fn is_connected(&mut self) -> bool {
            return true;
        }
    }

    #[test]
    fn serializes_short_and_extended_forms() {
        assert_eq!(
            apdu_select_file_by_ef(0x011E).serialize(),
            vec![0x00, 0xA4, 0x02, 0x0C, 0x02, 0x01, 0x1E]
        );
        assert_eq!(
            apdu_read_binary(0x0104, 0x80).serialize(),
            vec![0x00, 0xB0, 0x01, 0x04, 0x80]
        );
        assert_eq!(
            apdu_general_authenticate(vec![0x7C, 0x00], false).serialize(),
            vec![0x10, 0x86, 0x00, 0x00, 0x02, 0x7C, 0x00, 0x00]
        );
        assert_eq!(
            apdu_read_binary_odd(0x8000, 0x80).serialize(),
            vec![0x00, 0xB1, 0x00, 0x00, 0x04, 0x54, 0x02, 0x80, 0x00, 0x84]
        );
        let long_read = apdu_read_binary(0, 0x200);
        assert_eq!(
            long_read.serialize(),
            vec![0x00, 0xB0, 0x00, 0x00, 0x00, 0x02, 0x00]
        );
    }

    #[test]
    fn file_length_from_header() {
        assert_eq!(get_file_len_from_header(&[0x60, 0x14, 0x5F, 0x01]), Some(22));
        assert_eq!(get_file_len_from_header(&[0x75, 0x82, 0x12, 0x34]), Some(0x1234 + 4));
        assert_eq!(get_file_len_from_header(&[0x6B, 0x81, 0x90, 0x5C]), Some(0x90 + 3));
        assert_eq!(get_file_len_from_header(&[0x5F, 0x1F, 0x05, 0x00]), Some(8));
        assert_eq!(get_file_len_from_header(&[0x60]), None);
    }

    #[test]
    fn retries_with_exact_length_on_6c() {
        let mut card = ScriptedCard {
            expected: VecDeque::from(vec![
                (vec![0x00, 0x84, 0x00, 0x00, 0x08], vec![0x6C, 0x04]),
                (
                    vec![0x00, 0x84, 0x00, 0x00, 0x04],
                    vec![0x01, 0x02, 0x03, 0x04, 0x90, 0x00],
                ),
            ]),
        };
        let (data, status) = apdu_get_challenge()
            .exchange(&mut card, &mut None)
            .unwrap();
        assert_eq!(data, vec![0x01, 0x02, 0x03, 0x04]);
        assert_eq!(status, 0x9000);
    }

    #[test]
    fn reads_file_in_chunks_following_61xx() {
        let mut file = vec![0x6B, 0x81, 0x90];
        file.extend((0..0x90u8).map(|i| i.wrapping_mul(7)));
        let total = file.len(); // 0x93

        let mut response = |range: std::ops::Range<usize>, sw: [u8; 2]| {
            let mut r = file[range].to_vec();
            r.extend_from_slice(&sw);
            r
        };
        let mut card = ScriptedCard {
            expected: VecDeque::from(vec![
                (vec![0x00, 0xA4, 0x02, 0x0C, 0x02, 0x01, 0x0B], vec![0x90, 0x00]),
                (vec![0x00, 0xB0, 0x00, 0x00, 0x04], response(0..4, [0x90, 0x00])),
                // chip only hands out 0x20 bytes and says 0x10 more are ready
                (vec![0x00, 0xB0, 0x00, 0x04, 0x80], response(4..0x24, [0x61, 0x10])),
                (vec![0x00, 0xB0, 0x00, 0x24, 0x10], response(0x24..0x34, [0x90, 0x00])),
                (vec![0x00, 0xB0, 0x00, 0x34, 0x5F], response(0x34..total, [0x90, 0x00])),
            ]),
        };
        let read = select_and_read_file(
            &mut card,
            icao9303::DataGroupId::DG11.info(),
            &mut None,
        )
        .unwrap();
        assert_eq!(read, file);
        assert!(card.expected.is_empty());
    }

    #[test]
    fn missing_file_is_a_status_error() {
        let mut card = ScriptedCard {
            expected: VecDeque::from(vec![(
                vec![0x00, 0xA4, 0x02, 0x0C, 0x02, 0x01, 0x0F],
                vec![0x6A, 0x82],
            )]),
        };
        let result = select_and_read_file(
            &mut card,
            icao9303::DataGroupId::DG15.info(),
            &mut None,
        );
        assert!(matches!(result, Err(ReadError::Status(0x6A82))));
    }
}
