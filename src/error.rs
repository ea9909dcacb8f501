//! Error related data structures.

use std::fmt::{self, Display, Formatter};

/// Top level enum for error handling within the core.
///
/// Most of the time, `CustomError` is the variant in use, carrying a
/// human-readable message to be surfaced by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The ROM image is too small or not a multiple of the 16 KiB bank
    /// size to be a valid Game Boy cartridge.
    RomSize,
    /// The cartridge header failed validation (checksum mismatch,
    /// unsupported MBC type, or a header field out of range).
    InvalidCartridge,
    CustomError(String),
}

impl Error {
    pub fn description(&self) -> String {
        match self {
            Error::RomSize => String::from("Invalid ROM size"),
            Error::InvalidCartridge => String::from("Invalid cartridge header"),
            Error::CustomError(message) => message.clone(),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}
