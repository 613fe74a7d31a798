//! PACE against the worked examples of ICAO Doc 9303 Part 11, Appendix G.
#![cfg(feature = "pace")]

mod common;

use common::*;
use hex_literal::hex;
use std::collections::VecDeque;

use mrtdscan::dg_parsers::ef_cardaccess;
use mrtdscan::iso7816;
use mrtdscan::pace;
use mrtdscan::secure_messaging::{CipherSuite, SecureSession};
use mrtdscan::smartcard_abstractions::Smartcard;
use mrtdscan::types::{ParsedDataGroup, TransportError};
use mrtdscan::{AccessKey, DataGroupId};

/// Answers each expected command with its canned response, anything else with 6988.
struct ScriptedCard {
    script: VecDeque<(Vec<u8>, Vec<u8>)>,
}

impl ScriptedCard {
    fn new(steps: Vec<(Vec<u8>, Vec<u8>)>) -> Self {
        return ScriptedCard {
            script: steps.into(),
        };
    }
}

impl Smartcard for ScriptedCard {
    fn exchange_apdu(&mut self, data: &[u8]) -> Result<Vec<u8>, TransportError> {
        match self.script.pop_front() {
            Some((command, response)) if command == data => return Ok(response),
            _ => return Ok(vec![0x69, 0x88]),
        }
    }

    fn is_connected(&mut self) -> bool {
        return true;
    }
}

/// A command and the response data the chip answers it with, under 9000.
fn step(command: &[u8], response: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let mut response = response.to_vec();
    response.extend_from_slice(&[0x90, 0x00]);
    return (command.to_vec(), response);
}

/// Serializes a chained (or final) GENERAL AUTHENTICATE with Le 256.
fn general_authenticate(last: bool, data: &[u8]) -> Vec<u8> {
    let mut command = vec![if last { 0x00 } else { 0x10 }, 0x86, 0x00, 0x00, data.len() as u8];
    command.extend_from_slice(data);
    command.push(0x00);
    return command;
}

fn appendix_g_key() -> AccessKey {
    return AccessKey::from_mrz("T22000129", "640812", "101031").unwrap();
}

/// Reads EF.COM over the session PACE produced, from a chip holding the expected keys.
fn read_with_session(session: SecureSession, k_enc: &[u8], k_mac: &[u8]) {
    let mut chip = SimulatedChip::with_bac(appendix_g_key()).with_file(EF_COM, ef_com());
    chip.start_session(CipherSuite::Aes128, k_enc, k_mac, &[0u8; 16]);
    let data = iso7816::select_and_read_file(
        &mut chip,
        DataGroupId::EFCom.info(),
        &mut Some(session),
    )
    .unwrap();
    assert_eq!(data, ef_com());
    assert_eq!(chip.rejected_macs, 0);
}

#[test]
fn appendix_g1_ecdh_generic_mapping() {
    let ParsedDataGroup::EFCardAccess(card_access) =
        ef_cardaccess::parser(&hex!("31143012060A04007F0007020204020202010202010D")).unwrap()
    else {
        panic!("not EF.CardAccess");
    };
    let pace_info = pace::select_pace_info(&card_access).unwrap();

    let mapping = hex!(
        "7C 43 81 41 04 7A CF 3E FC 98 2E C4 55 65 A4 B1 55
         12 9E FB C7 46 50 DC BF A6 36 2D 89 6F C7 02 62 E0 C2 CC 5E 54 45
         52 DC B6 72 52 18 79 91 15 B5 5C 9B AA 6D 9F 6B C3 A9 61 8E 70 C2
         5A F7 17 77 A9 C4 92 2D"
    );
    let agreement = hex!(
        "7C 43 83 41 04 2D B7 A6 4C 03 55 04 4E C9 DF 19
         05 14 C6 25 CB A2 CE A4 87 54 88 71 22 F3 A5 EF 0D 5E DD 30 1C
         35 56 F3 B3 B1 86 DF 10 B8 57 B5 8F 6A 7E B8 0F 20 BA 5D C7 BE
         1D 43 D9 BF 85 01 49 FB B3 64 62"
    );
    let mut card = ScriptedCard::new(vec![
        step(
            &hex!("00 22 C1 A4 0F 80 0A 04 00 7F 00 07 02 02 04 02 02 83 01 01"),
            &[],
        ),
        step(
            &general_authenticate(false, &hex!("7C 00")),
            &hex!("7C 12 80 10 95 A3 A0 16 52 2E E9 8D 01 E7 6C B6 B9 8B 42 C3"),
        ),
        step(
            &general_authenticate(false, &mapping),
            &hex!(
                "7C 43 82 41 04 82 4F BA 91 C9 CB E2 6B EF 53 A0 EB E7 34 2A 3B F1
                 78 CE A9 F4 5D E0 B7 0A A6 01 65 1F BA 3F 57 30 D8 C8 79 AA A9 C9
                 F7 39 91 E6 1B 58 F4 D5 2E B8 7A 0A 0C 70 9A 49 DC 63 71 93 63 CC
                 D1 3C 54"
            ),
        ),
        step(
            &general_authenticate(false, &agreement),
            &hex!(
                "7C 43 84 41 04 9E 88 0F 84 29 05 B8 B3 18 1F 7A F7 CA A9 F0 EF
                 B7 43 84 7F 44 A3 06 D2 D2 8C 1D 9E C6 5D F6 DB 77 64 B2 22 77
                 A2 ED DC 3C 26 5A 9F 01 8F 9C B8 52 E1 11 B7 68 B3 26 90 4B 59
                 A0 19 37 76 F0 94"
            ),
        ),
        step(
            &general_authenticate(true, &hex!("7C 0A 85 08 C2 B0 BD 78 D9 4B A8 66")),
            &hex!("7C 0A 86 08 3A BB 96 74 BC E9 3C 08"),
        ),
    ]);

    let session = pace::establish_with_values(
        &mut card,
        &appendix_g_key(),
        pace_info,
        &hex!("7F4EF07B9EA82FD78AD689B38D0BC78CF21F249D953BC46F4C6E19259C010F99"),
        &hex!("A73FB703AC1436A18E0CFA5ABB3F7BEC7A070E7A6788486BEE230C4A22762595"),
    )
    .unwrap();
    assert!(card.script.is_empty());
    assert_eq!(session.suite(), CipherSuite::Aes128);
    assert_eq!(session.ssc(), &[0u8; 16]);

    read_with_session(
        session,
        &hex!("F5F0E35C0D7161EE6724EE513A0D9A7F"),
        &hex!("FE251C7858B356B24514B3BD5F4297D1"),
    );
}

#[test]
fn appendix_g2_dh_generic_mapping() {
    let ParsedDataGroup::EFCardAccess(card_access) =
        ef_cardaccess::parser(&hex!("31143012060A04007F00070202040102020102020100")).unwrap()
    else {
        panic!("not EF.CardAccess");
    };
    let pace_info = pace::select_pace_info(&card_access).unwrap();

    let mapping = hex!(
        "7C 81 83 81 81 80 23 FB 37 49 EA 03 0D 2A 25 B2 78 D2 A5
         62 04 7A DE 3F 01 B7 4F 17 A1 54 02 CB 73 52 CA 7D 2B 3E B7 1C 34 3D B1
         3D 1D EB CE 9A 36 66 DB CF C9 20 B4 91 74 A6 02 CB 47 96 5C AA 73 DC 70
         24 89 A4 4D 41 DB 91 4D E9 61 3D C5 E9 8C 94 16 05 51 C0 DF 86 27 4B 93
         59 BC 04 90 D0 1B 03 AD 54 02 2D CB 4F 57 FA D6 32 24 97 D7 A1 E2 8D 46
         71 0F 46 1A FE 71 0F BB BC 5F 8B A1 66 F4 31 19 75 EC 6C"
    );
    let agreement = hex!(
        "7C 81 83 83 81 80 90 7D 89 E2 D4 25 A1 78 AA 81 AF 4A 77
         74 EC 8E 38 8C 11 5C AE 67 03 1E 85 EE CE 52 0B D9 11 55 1B 9A E4 D0 43
         69 F2 9A 02 62 6C 86 FB C6 74 7C C7 BC 35 26 45 B6 16 1A 2A 42 D4 4E DA
         80 A0 8F A8 D6 1B 76 D3 A1 54 AD 8A 5A 51 78 6B 0B C0 71 47 05 78 71 A9
         22 21 2C 5F 67 F4 31 73 17 22 36 B7 74 7D 16 71 E6 D6 92 A3 C7 D4 0A 0C
         3C 5C E3 97 54 5D 01 5C 17 5E B5 13 05 51 ED BC 2E E5 D4"
    );
    let mut card = ScriptedCard::new(vec![
        step(
            &hex!("00 22 C1 A4 0F 80 0A 04 00 7F 00 07 02 02 04 01 02 83 01 01"),
            &[],
        ),
        step(
            &general_authenticate(false, &hex!("7C 00")),
            &hex!("7C 12 80 10 85 4D 8D F5 82 7F A6 85 2D 1A 4F A7 01 CD DD CA"),
        ),
        step(
            &general_authenticate(false, &mapping),
            &hex!(
                "7C 81 83 82 81 80 78 87 9F 57 22 5A A8 08 0D 52 ED 0F C8 90 A4 B2 53 36
                 F6 99 AA 89 A2 D3 A1 89 65 4A F7 07 29 E6 23 EA 57 38 B2 63 81 E4 DA 19
                 E0 04 70 6F AC E7 B2 35 C2 DB F2 F3 87 48 31 2F 3C 98 C2 DD 48 82 A4 19
                 47 B3 24 AA 12 59 AC 22 57 9D B9 3F 70 85 65 5A F3 08 89 DB B8 45 D9 E6
                 78 3F E4 2C 9F 24 49 40 03 06 25 4C 8A E8 EE 9D D8 12 A8 04 C0 B6 6E 8C
                 AF C1 4F 84 D8 25 89 50 A9 1B 44 12 6E E6"
            ),
        ),
        step(
            &general_authenticate(false, &agreement),
            &hex!(
                "7C 81 83 84 81 80 07 56 93 D9 AE 94 18 77 57 3E 63 4B 6E 64 4F 8E 60 AF
                 17 A0 07 6B 8B 12 3D 92 01 07 4D 36 15 2B D8 B3 A2 13 F5 38 20 C4 2A DC
                 79 AB 5D 0A EE C3 AE FB 91 39 4D A4 76 BD 97 B9 B1 4D 0A 65 C1 FC 71 A0
                 E0 19 CB 08 AF 55 E1 F7 29 00 5F BA 7E 3F A5 DC 41 89 92 38 A2 50 76 7A
                 6D 46 DB 97 40 64 38 6C D4 56 74 35 85 F8 E5 D9 0C C8 B4 00 4B 1F 6D 86
                 6C 79 CE 05 84 E4 96 87 FF 61 BC 29 AE A1"
            ),
        ),
        step(
            &general_authenticate(true, &hex!("7C 0A 85 08 B4 6D D9 BD 4D 98 38 1F")),
            &hex!("7C 0A 86 08 91 7F 37 B5 C0 E6 D8 D1"),
        ),
    ]);

    let session = pace::establish_with_values(
        &mut card,
        &appendix_g_key(),
        pace_info,
        &hex!("5265030F751F4AD18B08AC565FC7AC952E41618D"),
        &hex!("89CCD99B0E8D3B1F11E1296DCA68EC53411CF2CA"),
    )
    .unwrap();
    assert!(card.script.is_empty());

    read_with_session(
        session,
        &hex!("2F7F46ADCC9E7E521B45D192FAFA9126"),
        &hex!("805A1D27D45A5116F73C54469462B7D8"),
    );
}

#[test]
fn refused_set_at_is_an_error() {
    let ParsedDataGroup::EFCardAccess(card_access) =
        ef_cardaccess::parser(&hex!("31143012060A04007F0007020204020202010202010D")).unwrap()
    else {
        panic!("not EF.CardAccess");
    };
    let pace_info = pace::select_pace_info(&card_access).unwrap();
    // the chip refuses the very first step
    let mut card = ScriptedCard::new(vec![]);
    assert!(pace::establish(&mut card, &appendix_g_key(), pace_info).is_err());
}
