//! Chooses and runs the access control protocol for a freshly selected chip.
use simplelog::{info, warn};

use crate::bac;
use crate::icao9303::{self, AccessKey, DataGroupId};
use crate::iso7816::{self, StatusCode};
use crate::secure_messaging::SecureSession;
use crate::smartcard_abstractions::Smartcard;
use crate::types::{Failure, ReadError};
#[cfg(feature = "pace")]
use crate::{pace, types};

/// How the chip was unlocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessControl {
    Pace,
    Bac,
    /// The chip served EF.COM without authentication.
    None,
}

/// The outcome of negotiation: the session to wrap commands in, if any.
#[derive(Debug)]
pub struct Channel {
    pub session: Option<SecureSession>,
    pub access_control: AccessControl,
}

#[cfg(feature = "pace")]
fn try_pace(
    smartcard: &mut (impl Smartcard + ?Sized),
    access_key: &AccessKey,
) -> Result<SecureSession, ReadError> {
    let data_group = DataGroupId::EFCardAccess.info();
    let card_access_data = iso7816::select_and_read_file(smartcard, data_group, &mut None)?;
    let card_access = match (data_group.parser)(&card_access_data)? {
        types::ParsedDataGroup::EFCardAccess(card_access) => card_access,
        _ => return Err(ReadError::FileHeader),
    };
    let pace_info =
        pace::select_pace_info(&card_access).map_err(types::SecureChannelError::from)?;
    return Ok(pace::establish(smartcard, access_key, pace_info)?);
}

fn select_application(
    smartcard: &mut (impl Smartcard + ?Sized),
    session: &mut Option<SecureSession>,
) -> Result<(), Failure> {
    info!("<d>Selecting eMRTD LDS1 applet</>");
    match iso7816::apdu_select_file_by_name(icao9303::AID_MRTD_LDS1.to_vec())
        .exchange(smartcard, session)
    {
        Ok((_, status_code)) if status_code == StatusCode::Ok as u16 => return Ok(()),
        Ok((_, status_code)) => {
            // Some chips refuse the AID but still serve the files
            warn!(
                "LDS1 applet selection answered {:04X} ({}).",
                status_code,
                iso7816::status_code_name(status_code)
            );
            return Ok(());
        }
        Err(e) if e.is_chip_removed() => return Err(Failure::ChipRemoved),
        Err(e) => {
            warn!("LDS1 applet selection failed: {}", e);
            return Err(Failure::NoSecureChannel);
        }
    }
}

/// Runs PACE if the chip offers it, otherwise probes for an open chip, then BAC.
///
/// Losing the chip at any point is `Failure::ChipRemoved`. Anything else that keeps
/// both protocols from completing is `Failure::NoSecureChannel`.
pub fn negotiate(
    smartcard: &mut (impl Smartcard + ?Sized),
    access_key: &AccessKey,
) -> Result<Channel, Failure> {
    #[cfg(feature = "pace")]
    {
        match try_pace(smartcard, access_key) {
            Ok(session) => {
                let mut session = Some(session);
                select_application(smartcard, &mut session)?;
                return Ok(Channel {
                    session,
                    access_control: AccessControl::Pace,
                });
            }
            Err(e) if e.is_chip_removed() => return Err(Failure::ChipRemoved),
            Err(e) => warn!("PACE unavailable ({}), trying BAC.", e),
        }
    }

    let mut session = None;
    select_application(smartcard, &mut session)?;

    // Chips without access control answer this in the clear
    match iso7816::select_and_read_file(smartcard, DataGroupId::EFCom.info(), &mut session) {
        Ok(_) => {
            info!("<d>Chip does not require authentication.</>");
            return Ok(Channel {
                session: None,
                access_control: AccessControl::None,
            });
        }
        Err(e) if e.is_chip_removed() => return Err(Failure::ChipRemoved),
        Err(_) => {}
    }

    match bac::establish(smartcard, access_key) {
        Ok(session) => {
            return Ok(Channel {
                session: Some(session),
                access_control: AccessControl::Bac,
            })
        }
        Err(e) if e.is_chip_removed() => return Err(Failure::ChipRemoved),
        Err(e) => {
            warn!("BAC failed: {}", e);
            return Err(Failure::NoSecureChannel);
        }
    }
}
