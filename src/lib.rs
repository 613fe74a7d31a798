//! Reads ICAO 9303 eMRTD chips: negotiates PACE or BAC, reads the LDS1 data groups over
//! secure messaging and assembles the holder's record.
pub mod assembler;
pub mod bac;
#[cfg(feature = "pace")]
pub mod crypt;
pub mod dg_parsers;
pub mod helpers;
pub mod icao9303;
pub mod iso7816;
pub mod mrz_text;
pub mod negotiator;
#[cfg(feature = "pace")]
pub mod pace;
#[cfg(feature = "pcsc")]
pub mod pcsc_reader;
pub mod portrait;
pub mod reader;
pub mod scanner;
pub mod secure_messaging;
pub mod smartcard_abstractions;
pub mod types;

pub use assembler::ScannedRecord;
pub use icao9303::{AccessKey, DataGroupId};
pub use reader::{Checkpoint, ReadPlan};
pub use scanner::{start_read, CancelToken, ScanEvent, Scanner};
pub use types::Failure;
