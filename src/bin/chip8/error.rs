// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE for details)

//! Error type for the chip8 frontend

use thiserror::Error;

/// Result type, equivalent to [std::result::Result]<T, [enum@Error]>
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the chip8 frontend.
#[derive(Debug, Error)]
pub enum Error {
    /// Error originated in the interpreter core
    #[error(transparent)]
    Chip8(#[from] chip8vm::Error),
    /// Error originated in [std::io]
    #[error("{}: {source}", path.display())]
    Io {
        /// The file being read
        path: std::path::PathBuf,
        /// The underlying error
        source: std::io::Error,
    },
    /// Error originated in [minifb]
    #[error(transparent)]
    Minifb(#[from] minifb::Error),
}
