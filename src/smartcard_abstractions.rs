use crate::types::TransportError;

/// A half-duplex APDU link to a contactless chip.
pub trait Smartcard {
    /// Sends a serialized command APDU and returns the full response, status word included.
    fn exchange_apdu(&mut self, data: &[u8]) -> Result<Vec<u8>, TransportError>;

    /// Whether the chip is still in the field.
    fn is_connected(&mut self) -> bool;
}

impl<S: Smartcard + ?Sized> Smartcard for Box<S> {
    fn exchange_apdu(&mut self, data: &[u8]) -> Result<Vec<u8>, TransportError> {
        return (**self).exchange_apdu(data);
    }

    fn is_connected(&mut self) -> bool {
        return (**self).is_connected();
    }
}

/// A reader that can find a chip in its field.
pub trait InterfaceDevice: Sized {
    /// Opens the named reader, or the first one available.
    fn open(name: Option<&str>) -> Result<Self, TransportError>;

    /// Connects to the chip currently in the field.
    fn select(&mut self) -> Result<Box<dyn Smartcard + Send>, TransportError>;
}
