// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE for details)

//! Error type for the interpreter core

use thiserror::Error;

/// Result type, equivalent to [std::result::Result]<T, [enum@Error]>
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the interpreter core.
///
/// Every variant is a plain value: none of them is fatal to the process, and
/// the host loop decides whether to log and continue or to bail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum Error {
    /// The fetched word does not map to any Chip-8 instruction
    #[error("opcode {word:04x} not recognized")]
    InvalidOpcode {
        /// The offending word
        word: u16,
    },
    /// The program does not fit between `0x200` and the end of memory
    #[error("program of {len} bytes does not fit in {max} bytes of program memory")]
    ProgramTooLarge {
        /// Length of the rejected program
        len: usize,
        /// Space available for programs
        max: usize,
    },
    /// Tried to touch memory past the end of the address space
    #[error("address {addr:04x} is out of bounds")]
    OutOfBounds {
        /// The first offending address
        addr: usize,
    },
    /// Tried to call a subroutine with a full stack (strict mode only)
    #[error("stack overflow calling {addr:03x}")]
    StackOverflow {
        /// The call target
        addr: u16,
    },
    /// Tried to press a key that doesn't exist
    #[error("tried to press key {key:X} which does not exist")]
    InvalidKey {
        /// The offending key
        key: usize,
    },
    /// Tried to get/set an out-of-bounds register
    #[error("tried to access register v{reg:X} which does not exist")]
    InvalidRegister {
        /// The offending register
        reg: usize,
    },
}
