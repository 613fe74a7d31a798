//! Entry points: one synchronous read, or reads triggered onto a worker thread.
use simplelog::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

use crate::assembler::{self, ScannedRecord};
use crate::icao9303::AccessKey;
use crate::negotiator;
use crate::reader::{self, Checkpoint, ReadPlan, ReadResults};
use crate::smartcard_abstractions::Smartcard;
use crate::types::Failure;

/// Shared flag a caller sets to stop a read between two groups.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        return Self::default();
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        return self.0.load(Ordering::Acquire);
    }
}

/// Negotiates, reads `plan` and assembles the record.
///
/// Also returns every group outcome, for callers that want more than the record.
/// The secure session lives and dies inside this call.
pub fn read_document(
    smartcard: &mut (impl Smartcard + ?Sized),
    access_key: &AccessKey,
    plan: &ReadPlan,
    progress: &mut dyn FnMut(Checkpoint),
    cancel: &CancelToken,
) -> Result<(ScannedRecord, ReadResults), Failure> {
    if !smartcard.is_connected() {
        return Err(Failure::ChipRemoved);
    }
    if cancel.is_cancelled() {
        return Err(Failure::Cancelled);
    }

    let mut channel = negotiator::negotiate(smartcard, access_key)?;
    info!("<d>Secure channel: {:?}</>", channel.access_control);
    progress(Checkpoint::ChannelEstablished);

    let results = reader::read_groups(
        smartcard,
        &mut channel.session,
        plan,
        progress,
        &|| cancel.is_cancelled(),
    )?;
    let record = assembler::assemble(&results)?;
    return Ok((record, results));
}

/// Reads the default plan from a chip, reporting checkpoints to `progress`.
pub fn start_read(
    smartcard: &mut (impl Smartcard + ?Sized),
    access_key: &AccessKey,
    progress: &mut dyn FnMut(Checkpoint),
) -> Result<ScannedRecord, Failure> {
    let (record, _) = read_document(
        smartcard,
        access_key,
        &ReadPlan::default(),
        progress,
        &CancelToken::new(),
    )?;
    return Ok(record);
}

/// What a triggered read reports back.
#[derive(Debug)]
pub enum ScanEvent {
    Progress(Checkpoint),
    Finished(Result<ScannedRecord, Failure>),
}

/// Clears the in-flight flag when dropped, panics included.
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs at most one read at a time, off the caller's thread.
#[derive(Debug, Default)]
pub struct Scanner {
    in_flight: Arc<AtomicBool>,
    plan: ReadPlan,
}

impl Scanner {
    pub fn new() -> Self {
        return Self::default();
    }

    pub fn with_plan(plan: ReadPlan) -> Self {
        return Scanner {
            in_flight: Arc::default(),
            plan,
        };
    }

    pub fn is_busy(&self) -> bool {
        return self.in_flight.load(Ordering::Acquire);
    }

    /// Starts a read of the chip on a worker thread.
    ///
    /// Returns None, and does nothing, while another read is still running.
    pub fn trigger<S>(
        &self,
        smartcard: S,
        access_key: AccessKey,
        cancel: CancelToken,
    ) -> Option<mpsc::Receiver<ScanEvent>>
    where
        S: Smartcard + Send + 'static,
    {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Read already in flight, ignoring trigger.");
            return None;
        }
        let guard = InFlightGuard(self.in_flight.clone());

        let (sender, receiver) = mpsc::channel();
        let plan = self.plan.clone();
        let spawned = thread::Builder::new()
            .name("mrtd-read".to_string())
            .spawn(move || {
                let mut smartcard = smartcard;
                let progress_sender = sender.clone();
                let result = read_document(
                    &mut smartcard,
                    &access_key,
                    &plan,
                    &mut |checkpoint| {
                        // a caller that hung up is not our problem
                        let _ = progress_sender.send(ScanEvent::Progress(checkpoint));
                    },
                    &cancel,
                )
                .map(|(record, _)| record);
                // free the slot before the caller can observe the end
                drop(guard);
                let _ = sender.send(ScanEvent::Finished(result));
            });
        if let Err(e) = spawned {
            warn!("Could not start the read thread: {}", e);
            return None;
        }
        return Some(receiver);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransportError;

    /// Holds every APDU until the test lets it through, then drops off the field.
    struct GatedCard {
        gate: mpsc::Receiver<()>,
    }

    impl Smartcard for GatedCard {
        fn exchange_apdu(&mut self, _data: &[u8]) -> Result<Vec<u8>, TransportError> {
            let _ = self.gate.recv();
            return Err(TransportError::ChipRemoved);
        }

        fn is_connected(&mut self) -> bool {
            return true;
        }
    }

    fn key() -> AccessKey {
        return AccessKey::from_mrz("L898902C3", "740812", "120415").unwrap();
    }

    fn finished(receiver: &mpsc::Receiver<ScanEvent>) -> Result<ScannedRecord, Failure> {
        for event in receiver.iter() {
            if let ScanEvent::Finished(result) = event {
                return result;
            }
        }
        panic!("worker hung up without finishing");
    }

    #[test]
    fn second_trigger_is_dropped() {
        let scanner = Scanner::new();
        let (open_gate, gate) = mpsc::channel();
        let receiver = scanner
            .trigger(GatedCard { gate }, key(), CancelToken::new())
            .unwrap();
        assert!(scanner.is_busy());

        let (_unused, other_gate) = mpsc::channel();
        assert!(scanner
            .trigger(GatedCard { gate: other_gate }, key(), CancelToken::new())
            .is_none());

        open_gate.send(()).unwrap();
        assert_eq!(finished(&receiver), Err(Failure::ChipRemoved));
        assert!(!scanner.is_busy());

        // the slot is free again
        let (open_gate, gate) = mpsc::channel();
        let receiver = scanner
            .trigger(GatedCard { gate }, key(), CancelToken::new())
            .unwrap();
        drop(open_gate);
        assert_eq!(finished(&receiver), Err(Failure::ChipRemoved));
    }

    #[test]
    fn cancelled_before_start() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let (_open_gate, gate) = mpsc::channel();
        let result = read_document(
            &mut GatedCard { gate },
            &key(),
            &ReadPlan::default(),
            &mut |_| {},
            &cancel,
        );
        assert_eq!(result.unwrap_err(), Failure::Cancelled);
    }
}
