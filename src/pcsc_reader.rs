//! PC/SC reader backend.
use pcsc::{Card, Context, Protocols, Scope, ShareMode, MAX_BUFFER_SIZE_EXTENDED};
use simplelog::{info, trace};
use std::ffi::CString;

use crate::smartcard_abstractions::{InterfaceDevice, Smartcard};
use crate::types::TransportError;

impl From<pcsc::Error> for TransportError {
    fn from(e: pcsc::Error) -> Self {
        return match e {
            pcsc::Error::RemovedCard | pcsc::Error::ResetCard | pcsc::Error::NoSmartcard => {
                TransportError::ChipRemoved
            }
            pcsc::Error::NoReadersAvailable | pcsc::Error::UnknownReader => {
                TransportError::NoReader
            }
            other => TransportError::Io(other.to_string()),
        };
    }
}

pub struct PcscReader {
    context: Context,
    reader_name: CString,
}

pub struct PcscSmartcard {
    card: Card,
}

impl PcscReader {
    pub fn reader_name(&self) -> String {
        return self.reader_name.to_string_lossy().into_owned();
    }
}

impl InterfaceDevice for PcscReader {
    /// Picks the first reader whose name contains `name`, or the first reader at all.
    fn open(name: Option<&str>) -> Result<Self, TransportError> {
        let context = Context::establish(Scope::User)?;
        let mut readers_buf = [0; 2048];
        let reader_name = context
            .list_readers(&mut readers_buf)?
            .find(|reader| match name {
                Some(name) => reader.to_string_lossy().contains(name),
                None => true,
            })
            .map(|reader| reader.to_owned())
            .ok_or(TransportError::NoReader)?;
        info!("<d>Using reader {}</>", reader_name.to_string_lossy());
        return Ok(PcscReader {
            context,
            reader_name,
        });
    }

    fn select(&mut self) -> Result<Box<dyn Smartcard + Send>, TransportError> {
        let card = self
            .context
            .connect(&self.reader_name, ShareMode::Shared, Protocols::ANY)?;
        return Ok(Box::new(PcscSmartcard { card }));
    }
}

impl Smartcard for PcscSmartcard {
    fn exchange_apdu(&mut self, data: &[u8]) -> Result<Vec<u8>, TransportError> {
        trace!("PC/SC > {:02x?}", data);
        let mut response_buf = vec![0; MAX_BUFFER_SIZE_EXTENDED];
        let response = self.card.transmit(data, &mut response_buf)?;
        trace!("PC/SC < {:02x?}", response);
        if response.len() < 2 {
            return Err(TransportError::ShortResponse);
        }
        return Ok(response.to_vec());
    }

    fn is_connected(&mut self) -> bool {
        return match self.card.status2_owned() {
            Ok(status) => status.status().contains(pcsc::Status::PRESENT),
            Err(_) => false,
        };
    }
}
