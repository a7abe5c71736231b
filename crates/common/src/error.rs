#![allow(clippy::uninlined_format_args)]

//! Error related data structures to be shared and used.
//!
//! This module contains the [`Error`] enum, which is used to represent
//! errors that can occur within the dotmatrix domain.

use std::fmt::{self, Display, Formatter};

/// Top level enum for error handling within dotmatrix.
///
/// Most of the time, you will want to use the `CustomError` variant
/// to provide a more detailed error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    InvalidData,
    RomSize,
    IncompatibleBootRom,
    InvalidOpcode(u8, u16),
    UnsupportedRomType(u8),
    InvalidParameter(String),
    CustomError(String),
}

impl Error {
    pub fn description(&self) -> String {
        match self {
            Error::InvalidData => String::from("Invalid data format"),
            Error::RomSize => String::from("Invalid ROM size"),
            Error::IncompatibleBootRom => String::from("Incompatible Boot ROM"),
            Error::InvalidOpcode(opcode, pc) => {
                format!("Invalid opcode 0x{:02x} at 0x{:04x}", opcode, pc)
            }
            Error::UnsupportedRomType(rom_type) => {
                format!("Unsupported cartridge type 0x{:02x}", rom_type)
            }
            Error::InvalidParameter(message) => format!("Invalid parameter: {}", message),
            Error::CustomError(message) => String::from(message),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn test_description() {
        let error = Error::InvalidOpcode(0xdd, 0x0150);
        assert_eq!(error.description(), "Invalid opcode 0xdd at 0x0150");

        let error = Error::UnsupportedRomType(0x1b);
        assert_eq!(error.description(), "Unsupported cartridge type 0x1b");

        let error = Error::CustomError(String::from("Failed to open file"));
        assert_eq!(error.description(), "Failed to open file");
    }
}
