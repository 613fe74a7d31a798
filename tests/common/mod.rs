//! A simulated eMRTD chip with a small file system, chip-side BAC and secure messaging.
#![allow(dead_code)]

use hex_literal::hex;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use iso7816_tlv::ber;
use std::collections::HashMap;
use std::io::Cursor;

use mrtdscan::helpers;
use mrtdscan::icao9303::{self, AccessKey};
use mrtdscan::secure_messaging::CipherSuite;
use mrtdscan::smartcard_abstractions::Smartcard;
use mrtdscan::types::TransportError;

pub const EF_CARD_ACCESS: u16 = 0x011C;
pub const EF_COM: u16 = 0x011E;
pub const EF_DG1: u16 = 0x0101;
pub const EF_DG2: u16 = 0x0102;
pub const EF_DG11: u16 = 0x010B;

pub const TD3_SPECIMEN: &str =
    "P<UTOERIKSSON<<ANNA<MARIA<<<<<<<<<<<<<<<<<<<L898902C36UTO7408122F1204159ZE184226B<<<<<10";

pub fn specimen_key() -> AccessKey {
    return AccessKey::from_mrz("L898902C3", "740812", "120415").unwrap();
}

struct ChipSession {
    suite: CipherSuite,
    k_enc: Vec<u8>,
    k_mac: Vec<u8>,
    ssc: Vec<u8>,
}

impl ChipSession {
    fn increment_ssc(&mut self) {
        for byte in self.ssc.iter_mut().rev() {
            let (incremented, overflow) = byte.overflowing_add(1);
            *byte = incremented;
            if !overflow {
                break;
            }
        }
    }

    fn iv(&self) -> Vec<u8> {
        let block_size = self.suite.block_size();
        if self.suite == CipherSuite::Tdes {
            return vec![0u8; block_size];
        }
        let mut iv = self.ssc.clone();
        self.suite
            .encrypt(&self.k_enc, &vec![0u8; block_size], &mut iv)
            .unwrap();
        return iv;
    }

    fn mac(&self, data: &[u8]) -> Vec<u8> {
        let padded = icao9303::padding_method_2_pad(data, self.suite.block_size());
        return self.suite.mac(&self.k_mac, &padded).unwrap();
    }
}

/// Splits a short APDU body into data and Le (0 read as 256).
fn parse_body(body: &[u8]) -> (Vec<u8>, Option<usize>) {
    let le = |byte: u8| if byte == 0 { 256 } else { usize::from(byte) };
    return match body.len() {
        0 => (vec![], None),
        1 => (vec![], Some(le(body[0]))),
        _ => {
            let lc = usize::from(body[0]);
            let data = body[1..1 + lc].to_vec();
            (data, body.get(1 + lc).map(|byte| le(*byte)))
        }
    };
}

pub struct SimulatedChip {
    files: HashMap<u16, Vec<u8>>,
    bac_key: Option<AccessKey>,
    rnd_ic: [u8; 8],
    k_ic: [u8; 16],
    session: Option<ChipSession>,
    selected: Option<u16>,
    removed: bool,
    /// Files other than EF.CardAccess need secure messaging.
    pub requires_authentication: bool,
    /// Selecting this file takes the chip out of the field.
    pub remove_on_select: Option<u16>,
    /// MSE:Set AT is accepted, but GENERAL AUTHENTICATE is still unknown.
    pub accepts_set_at: bool,
    pub external_authentications: usize,
    pub rejected_macs: usize,
}

impl SimulatedChip {
    /// A chip that only opens up to BAC with `bac_key`.
    pub fn with_bac(bac_key: AccessKey) -> Self {
        return SimulatedChip {
            files: HashMap::new(),
            bac_key: Some(bac_key),
            rnd_ic: hex!("4608F91988702212"),
            k_ic: hex!("0B4F80323EB3191CB04970CB4052790B"),
            session: None,
            selected: None,
            removed: false,
            requires_authentication: true,
            remove_on_select: None,
            accepts_set_at: false,
            external_authentications: 0,
            rejected_macs: 0,
        };
    }

    /// A chip without access control.
    pub fn open() -> Self {
        let mut chip = Self::with_bac(specimen_key());
        chip.bac_key = None;
        chip.requires_authentication = false;
        return chip;
    }

    pub fn with_file(mut self, file_id: u16, data: Vec<u8>) -> Self {
        self.files.insert(file_id, data);
        return self;
    }

    /// Enters secure messaging with keys agreed elsewhere.
    pub fn start_session(&mut self, suite: CipherSuite, k_enc: &[u8], k_mac: &[u8], ssc: &[u8]) {
        self.session = Some(ChipSession {
            suite,
            k_enc: k_enc.to_vec(),
            k_mac: k_mac.to_vec(),
            ssc: ssc.to_vec(),
        });
    }

    fn process(
        &mut self,
        header: &[u8],
        data: &[u8],
        le: Option<usize>,
        secure: bool,
    ) -> Result<(Vec<u8>, u16), TransportError> {
        let locked = self.requires_authentication && !secure;
        match (header[1], header[2]) {
            (0xA4, 0x04) => return Ok((vec![], 0x9000)),
            (0xA4, 0x02) => {
                let file_id = u16::from_be_bytes([data[0], data[1]]);
                if self.remove_on_select == Some(file_id) {
                    self.removed = true;
                    return Err(TransportError::ChipRemoved);
                }
                if !self.files.contains_key(&file_id) {
                    return Ok((vec![], 0x6A82));
                }
                if locked && file_id != EF_CARD_ACCESS {
                    return Ok((vec![], 0x6982));
                }
                self.selected = Some(file_id);
                return Ok((vec![], 0x9000));
            }
            (0xB0, _) => {
                let Some(file) = self.selected.and_then(|file_id| self.files.get(&file_id)) else {
                    return Ok((vec![], 0x6986));
                };
                let offset = usize::from(u16::from_be_bytes([header[2], header[3]]));
                if offset >= file.len() {
                    return Ok((vec![], 0x6B00));
                }
                let end = file.len().min(offset + le.unwrap_or(256));
                return Ok((file[offset..end].to_vec(), 0x9000));
            }
            (0xB1, _) => {
                let Some(file) = self.selected.and_then(|file_id| self.files.get(&file_id)) else {
                    return Ok((vec![], 0x6986));
                };
                let do_54 = ber::Tlv::from_bytes(data).unwrap();
                let offset = helpers::get_tlv_value_bytes(&do_54)
                    .iter()
                    .fold(0usize, |offset, byte| offset << 8 | usize::from(*byte));
                if offset >= file.len() {
                    return Ok((vec![], 0x6B00));
                }
                // DO'53' with a two byte length takes four of the Le bytes
                let end = file.len().min(offset + le.unwrap_or(256) - 4);
                let wrapped = helpers::build_tlv(0x53, file[offset..end].to_vec());
                return Ok((wrapped, 0x9000));
            }
            (0x84, _) => return Ok((self.rnd_ic.to_vec(), 0x9000)),
            (0x82, _) => return Ok(self.external_authenticate(data)),
            (0x22, _) if self.accepts_set_at => return Ok((vec![], 0x9000)),
            _ => return Ok((vec![], 0x6D00)),
        }
    }

    fn external_authenticate(&mut self, data: &[u8]) -> (Vec<u8>, u16) {
        self.external_authentications += 1;
        let Some(bac_key) = &self.bac_key else {
            return (vec![], 0x6D00);
        };
        if data.len() != 40 {
            return (vec![], 0x6700);
        }
        let suite = CipherSuite::Tdes;
        let seed = bac_key.bac_key_seed().unwrap();
        let k_enc = suite.derive_key(&seed, 1);
        let k_mac = suite.derive_key(&seed, 2);

        let (e_ifd, m_ifd) = data.split_at(32);
        let expected_m_ifd = suite
            .mac(&k_mac, &icao9303::padding_method_2_pad(e_ifd, 8))
            .unwrap();
        if expected_m_ifd != m_ifd {
            return (vec![], 0x6300);
        }
        let mut s = e_ifd.to_vec();
        suite.decrypt(&k_enc, &[0u8; 8], &mut s).unwrap();
        if s[8..16] != self.rnd_ic {
            return (vec![], 0x6300);
        }
        let rnd_ifd = s[0..8].to_vec();
        let k_ifd = &s[16..32];

        let mut r = [self.rnd_ic.as_slice(), &rnd_ifd, &self.k_ic].concat();
        suite.encrypt(&k_enc, &[0u8; 8], &mut r).unwrap();
        let m_ic = suite
            .mac(&k_mac, &icao9303::padding_method_2_pad(&r, 8))
            .unwrap();

        let session_seed: Vec<u8> = k_ifd
            .iter()
            .zip(self.k_ic.iter())
            .map(|(a, b)| a ^ b)
            .collect();
        let ssc = [&self.rnd_ic[4..8], &rnd_ifd[4..8]].concat();
        self.start_session(
            suite,
            &suite.derive_key(&session_seed, 1),
            &suite.derive_key(&session_seed, 2),
            &ssc,
        );
        return ([r, m_ic].concat(), 0x9000);
    }

    fn secure_exchange(
        &mut self,
        apdu: &[u8],
        mut session: ChipSession,
    ) -> Result<Vec<u8>, TransportError> {
        let block_size = session.suite.block_size();
        let (body, _) = parse_body(&apdu[4..]);
        let parsed = ber::Tlv::parse_all(&body);
        let tlvs = helpers::sort_tlvs_by_tag(&parsed);

        session.increment_ssc();
        let mut mac_input = session.ssc.clone();
        mac_input.extend(icao9303::padding_method_2_pad(&apdu[..4], block_size));
        for tag in [0x85, 0x87, 0x97] {
            if let Some(tlv) = tlvs.get(&tag) {
                mac_input.extend(tlv.to_vec());
            }
        }
        let cc = tlvs.get(&0x8E).map(|tlv| helpers::get_tlv_value_bytes(tlv));
        if cc != Some(session.mac(&mac_input)) {
            // the chip leaves secure messaging
            self.rejected_macs += 1;
            return Ok(vec![0x69, 0x88]);
        }

        let cryptogram = match (tlvs.get(&0x85), tlvs.get(&0x87)) {
            (Some(do_85), _) => Some(helpers::get_tlv_value_bytes(do_85)),
            (None, Some(do_87)) => Some(helpers::get_tlv_value_bytes(do_87)[1..].to_vec()),
            (None, None) => None,
        };
        let data = match cryptogram {
            Some(mut encrypted) => {
                session
                    .suite
                    .decrypt(&session.k_enc, &session.iv(), &mut encrypted)
                    .unwrap();
                icao9303::padding_method_2_unpad(&encrypted).unwrap()
            }
            None => vec![],
        };
        let le = tlvs.get(&0x97).map(|do_97| {
            match helpers::get_tlv_value_bytes(do_97).as_slice() {
                [0] => 256,
                [le] => usize::from(*le),
                _ => 256,
            }
        });

        let header = [apdu[0] & !0x0C, apdu[1], apdu[2], apdu[3]];
        let (response_data, status_code) = self.process(&header, &data, le, true)?;

        session.increment_ssc();
        let mut response = vec![];
        if !response_data.is_empty() {
            let mut padded = icao9303::padding_method_2_pad(&response_data, block_size);
            session
                .suite
                .encrypt(&session.k_enc, &session.iv(), &mut padded)
                .unwrap();
            if header[1] & 1 == 1 {
                response.extend(helpers::build_tlv(0x85, padded));
            } else {
                response.extend(helpers::build_tlv(0x87, [vec![0x01], padded].concat()));
            }
        }
        response.extend(helpers::build_tlv(0x99, status_code.to_be_bytes().to_vec()));
        let mac = session.mac(&response);
        response.extend(helpers::build_tlv(0x8E, mac));
        response.extend([0x90, 0x00]);
        self.session = Some(session);
        return Ok(response);
    }
}

impl Smartcard for SimulatedChip {
    fn exchange_apdu(&mut self, apdu: &[u8]) -> Result<Vec<u8>, TransportError> {
        if self.removed {
            return Err(TransportError::ChipRemoved);
        }
        if apdu[0] & 0x0C == 0x0C {
            return match self.session.take() {
                Some(session) => self.secure_exchange(apdu, session),
                None => Ok(vec![0x69, 0x88]),
            };
        }

        // a plain command ends any secure messaging session
        self.session = None;
        let (data, le) = parse_body(&apdu[4..]);
        let (mut response, status_code) = self.process(&apdu[..4], &data, le, false)?;
        response.extend(status_code.to_be_bytes());
        return Ok(response);
    }

    fn is_connected(&mut self) -> bool {
        return !self.removed;
    }
}

pub fn ef_com() -> Vec<u8> {
    return hex!("60145F0104303130365F36063034303030305C026175").to_vec();
}

pub fn dg1(mrz: &str) -> Vec<u8> {
    return helpers::build_tlv(0x61, helpers::build_tlv(0x5F1F, mrz.as_bytes().to_vec()));
}

pub fn dg11(elements: &[(u16, &str)]) -> Vec<u8> {
    let value = elements
        .iter()
        .flat_map(|(tag, text)| helpers::build_tlv(*tag, text.as_bytes().to_vec()))
        .collect();
    return helpers::build_tlv(0x6B, value);
}

pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    let portrait = RgbImage::from_pixel(width, height, Rgb([0x20, 0x40, 0x80]));
    let mut encoded = Cursor::new(vec![]);
    DynamicImage::ImageRgb8(portrait)
        .write_to(&mut encoded, ImageFormat::Jpeg)
        .unwrap();
    return encoded.into_inner();
}

/// DG2 holding one ISO/IEC 19794-5 facial record around `image`.
pub fn dg2(image: &[u8]) -> Vec<u8> {
    // facial information (20) + image information (12)
    let block_len = 32 + image.len();
    let mut record = b"FAC\0010\0".to_vec();
    record.extend_from_slice(&((14 + block_len) as u32).to_be_bytes());
    record.extend_from_slice(&1u16.to_be_bytes());
    record.extend_from_slice(&(block_len as u32).to_be_bytes());
    record.extend_from_slice(&0u16.to_be_bytes());
    record.extend_from_slice(&[0u8; 14]);
    record.extend_from_slice(&[0x01, 0x00]);
    record.extend_from_slice(&(0u16).to_be_bytes());
    record.extend_from_slice(&(0u16).to_be_bytes());
    record.extend_from_slice(&[0u8; 6]);
    record.extend_from_slice(image);

    let mut header = helpers::build_tlv(0x81, vec![0x02]);
    header.extend(helpers::build_tlv(0x87, vec![0x01, 0x01]));
    header.extend(helpers::build_tlv(0x88, vec![0x00, 0x08]));
    let mut template = helpers::build_tlv(0xA1, header);
    template.extend(helpers::build_tlv(0x5F2E, record));
    let mut group = helpers::build_tlv(0x02, vec![0x01]);
    group.extend(helpers::build_tlv(0x7F60, template));
    return helpers::build_tlv(0x75, helpers::build_tlv(0x7F61, group));
}
