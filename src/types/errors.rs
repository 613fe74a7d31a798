use std::{error::Error, fmt};

/// Chip commands whose failure we report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    SelectFile,
    ReadBinary,
    GetChallenge,
    ExternalAuthenticate,
    SetAuthenticationTemplate,
    GeneralAuthenticate,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::SelectFile => "SELECT FILE",
            Self::ReadBinary => "READ BINARY",
            Self::GetChallenge => "GET CHALLENGE",
            Self::ExternalAuthenticate => "EXTERNAL AUTHENTICATE",
            Self::SetAuthenticationTemplate => "MSE:SET AT",
            Self::GeneralAuthenticate => "GENERAL AUTHENTICATE",
        };
        write!(f, "{}", name)
    }
}

/// Errors raised by the byte-level link to the chip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The chip left the field (or the reader reports it as gone).
    ChipRemoved,
    /// Any other reader or link failure.
    Io(String),
    /// The chip answered with less than a status word.
    ShortResponse,
    /// No reader could be found or opened.
    NoReader,
}

impl Error for TransportError {}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::ChipRemoved => write!(f, "chip was removed from the field"),
            Self::Io(reason) => write!(f, "transport failure: {}", reason),
            Self::ShortResponse => write!(f, "response is shorter than a status word"),
            Self::NoReader => write!(f, "no usable reader found"),
        }
    }
}

/// Errors while establishing or using secure messaging.
#[derive(Debug)]
pub enum SecureChannelError {
    Transport(TransportError),
    Status { operation: Operation, status: u16 },
    LengthMismatch { operation: Operation, obtained: usize, expected: usize },
    ResponseMac,
    MissingResponseMac,
    ResponseTlv,
    InvalidPadding,
    UnknownPadding(u8),
    ChallengeMismatch,
    KeyLength,
    /// BAC only works with MRZ key material, not a CAN.
    MrzKeyRequired,
    #[cfg(feature = "pace")]
    Pace(crate::pace::Error),
}

impl SecureChannelError {
    pub fn is_chip_removed(&self) -> bool {
        return matches!(self, Self::Transport(TransportError::ChipRemoved));
    }
}

impl Error for SecureChannelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            #[cfg(feature = "pace")]
            Self::Pace(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for SecureChannelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "{}", e),
            Self::Status { operation, status } => {
                write!(f, "{} failed with status 0x{:04X}", operation, status)
            }
            Self::LengthMismatch {
                operation,
                obtained,
                expected,
            } => write!(
                f,
                "{} response has length {}, expected {}",
                operation, obtained, expected
            ),
            Self::ResponseMac => write!(f, "response MAC incorrect"),
            Self::MissingResponseMac => write!(f, "response does not contain a MAC"),
            Self::ResponseTlv => write!(f, "response has an invalid TLV format"),
            Self::InvalidPadding => write!(f, "response payload has invalid padding"),
            Self::UnknownPadding(mode) => {
                write!(f, "response payload has unknown padding mode {}", mode)
            }
            Self::ChallengeMismatch => write!(f, "chip did not echo our challenge"),
            Self::KeyLength => write!(f, "session key has an invalid length"),
            Self::MrzKeyRequired => write!(f, "BAC requires MRZ key material"),
            #[cfg(feature = "pace")]
            Self::Pace(e) => write!(f, "PACE: {}", e),
        }
    }
}

impl From<TransportError> for SecureChannelError {
    fn from(value: TransportError) -> Self {
        return Self::Transport(value);
    }
}

#[cfg(feature = "pace")]
impl From<crate::pace::Error> for SecureChannelError {
    fn from(value: crate::pace::Error) -> Self {
        return Self::Pace(value);
    }
}

/// Errors while decoding the contents of a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    Tlv,
    UnexpectedTag { expected: u16, found: u16 },
    MissingField(u16),
    Utf8,
    CheckDigit { field: &'static str },
    MrzLength(usize),
    MrzFormat,
    Biometric(&'static str),
    Asn1,
}

impl Error for DecodeError {}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Tlv => write!(f, "malformed TLV"),
            Self::UnexpectedTag { expected, found } => write!(
                f,
                "unexpected tag 0x{:02X} (expected 0x{:02X})",
                found, expected
            ),
            Self::MissingField(tag) => write!(f, "mandatory field 0x{:02X} is missing", tag),
            Self::Utf8 => write!(f, "text field is not valid UTF-8"),
            Self::CheckDigit { field } => write!(f, "{} check digit mismatch", field),
            Self::MrzLength(len) => write!(f, "MRZ has unsupported length {}", len),
            Self::MrzFormat => write!(f, "MRZ does not follow a known layout"),
            Self::Biometric(reason) => write!(f, "biometric record: {}", reason),
            Self::Asn1 => write!(f, "malformed DER structure"),
        }
    }
}

/// Errors while reading one file from the chip.
#[derive(Debug)]
pub enum ReadError {
    Transport(TransportError),
    SecureChannel(SecureChannelError),
    /// The chip refused the SELECT or READ BINARY.
    Status(u16),
    /// The first bytes of the file are not a BER tag and length.
    FileHeader,
    /// The file runs past what READ BINARY can address.
    FileTooLarge(usize),
    Decode(DecodeError),
}

impl ReadError {
    pub fn is_chip_removed(&self) -> bool {
        return match self {
            Self::Transport(e) => *e == TransportError::ChipRemoved,
            Self::SecureChannel(e) => e.is_chip_removed(),
            _ => false,
        };
    }
}

impl Error for ReadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::SecureChannel(e) => Some(e),
            Self::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "{}", e),
            Self::SecureChannel(e) => write!(f, "{}", e),
            Self::Status(status) => write!(f, "chip answered 0x{:04X}", status),
            Self::FileHeader => write!(f, "file does not start with a BER header"),
            Self::FileTooLarge(len) => write!(f, "file of {}b is too large to read", len),
            Self::Decode(e) => write!(f, "{}", e),
        }
    }
}

impl From<TransportError> for ReadError {
    fn from(value: TransportError) -> Self {
        return Self::Transport(value);
    }
}

impl From<SecureChannelError> for ReadError {
    fn from(value: SecureChannelError) -> Self {
        // keep tag loss recognisable regardless of the layer it surfaced in
        return match value {
            SecureChannelError::Transport(e) => Self::Transport(e),
            other => Self::SecureChannel(other),
        };
    }
}

impl From<DecodeError> for ReadError {
    fn from(value: DecodeError) -> Self {
        return Self::Decode(value);
    }
}

/// Why a read operation produced no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Neither PACE nor BAC could be established.
    NoSecureChannel,
    /// DG1 could not be read or decoded.
    MandatoryGroupMissing,
    /// The chip left the field mid-read.
    ChipRemoved,
    /// The caller cancelled the read.
    Cancelled,
}

impl Error for Failure {}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NoSecureChannel => write!(f, "could not establish a secure channel"),
            Self::MandatoryGroupMissing => write!(f, "DG1 (MRZ) could not be read"),
            Self::ChipRemoved => write!(f, "chip was removed during the read"),
            Self::Cancelled => write!(f, "read was cancelled"),
        }
    }
}
