//! Reads the planned data groups one after the other over an established channel.
use simplelog::{info, warn};

use crate::icao9303::DataGroupId;
use crate::iso7816;
use crate::secure_messaging::SecureSession;
use crate::smartcard_abstractions::Smartcard;
use crate::types::{Failure, ParsedDataGroup, ReadError};

/// Where a read reports progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    /// PACE, BAC or the open-chip probe went through.
    ChannelEstablished,
    /// The group was attempted, whether or not it could be read.
    GroupDone(DataGroupId),
}

/// Which groups to read, in which order, and what the caller needs to hear about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadPlan {
    pub groups: Vec<DataGroupId>,
    /// Groups without which the read fails.
    pub mandatory: Vec<DataGroupId>,
    pub checkpoints: Vec<DataGroupId>,
}

impl Default for ReadPlan {
    fn default() -> Self {
        return ReadPlan {
            groups: vec![
                DataGroupId::DG1,
                DataGroupId::DG2,
                DataGroupId::DG3,
                DataGroupId::DG4,
                DataGroupId::DG5,
                DataGroupId::DG6,
                DataGroupId::DG7,
                DataGroupId::DG11,
                DataGroupId::DG12,
                DataGroupId::DG14,
                DataGroupId::DG15,
                DataGroupId::EFSod,
                DataGroupId::EFCom,
            ],
            mandatory: vec![DataGroupId::DG1],
            checkpoints: vec![DataGroupId::DG1, DataGroupId::DG2, DataGroupId::DG11],
        };
    }
}

/// What became of one group.
#[derive(Debug)]
pub enum GroupOutcome {
    Read {
        raw: Vec<u8>,
        parsed: ParsedDataGroup,
    },
    Absent(ReadError),
}

/// Outcomes in plan order.
#[derive(Debug, Default)]
pub struct ReadResults {
    pub outcomes: Vec<(DataGroupId, GroupOutcome)>,
}

impl ReadResults {
    pub fn outcome(&self, data_group_id: DataGroupId) -> Option<&GroupOutcome> {
        return self
            .outcomes
            .iter()
            .find(|(id, _)| *id == data_group_id)
            .map(|(_, outcome)| outcome);
    }

    /// The decoded group, if it was read.
    pub fn parsed(&self, data_group_id: DataGroupId) -> Option<&ParsedDataGroup> {
        return match self.outcome(data_group_id)? {
            GroupOutcome::Read { parsed, .. } => Some(parsed),
            GroupOutcome::Absent(_) => None,
        };
    }
}

/// Selects, reads and decodes one file.
pub fn read_group(
    smartcard: &mut (impl Smartcard + ?Sized),
    data_group_id: DataGroupId,
    session: &mut Option<SecureSession>,
) -> Result<(Vec<u8>, ParsedDataGroup), ReadError> {
    let data_group = data_group_id.info();
    let raw = iso7816::select_and_read_file(smartcard, data_group, session)?;
    let parsed = (data_group.parser)(&raw)?;
    return Ok((raw, parsed));
}

/// Reads every group in the plan. A group that fails is logged and recorded as absent.
///
/// Stops early only when the chip leaves the field or `is_cancelled` says so. Fails with
/// `MandatoryGroupMissing` when any mandatory group ends up absent.
pub fn read_groups(
    smartcard: &mut (impl Smartcard + ?Sized),
    session: &mut Option<SecureSession>,
    plan: &ReadPlan,
    progress: &mut dyn FnMut(Checkpoint),
    is_cancelled: &dyn Fn() -> bool,
) -> Result<ReadResults, Failure> {
    let mut results = ReadResults::default();
    for data_group_id in plan.groups.iter().copied() {
        if is_cancelled() {
            info!("Read cancelled before {}.", data_group_id);
            return Err(Failure::Cancelled);
        }

        let outcome = match read_group(smartcard, data_group_id, session) {
            Ok((raw, parsed)) => GroupOutcome::Read { raw, parsed },
            Err(e) if e.is_chip_removed() => {
                warn!("Chip removed while reading {}.", data_group_id);
                return Err(Failure::ChipRemoved);
            }
            Err(e) => {
                warn!("{} is absent: {}", data_group_id, e);
                GroupOutcome::Absent(e)
            }
        };
        results.outcomes.push((data_group_id, outcome));

        if plan.checkpoints.contains(&data_group_id) {
            progress(Checkpoint::GroupDone(data_group_id));
        }
    }

    for data_group_id in plan.mandatory.iter() {
        if results.parsed(*data_group_id).is_none() {
            warn!("Mandatory {} could not be read.", data_group_id);
            return Err(Failure::MandatoryGroupMissing);
        }
    }
    return Ok(results);
}
