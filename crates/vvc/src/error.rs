use std::io;

use thiserror::Error;

/// Errors produced while parsing VVC parameter sets or building a
/// decoder configuration record.
#[derive(Error, Debug)]
pub enum VvcError {
    /// The bitstream ended before a syntax element could be read.
    #[error("Bitstream exhausted before the end of a syntax structure")]
    OutOfData,
    /// A buffer for a NAL unit copy could not be allocated.
    #[error("Failed to allocate a NAL unit buffer")]
    AllocationFailure,
    /// The input violates the bitstream or record structure.
    #[error("Invalid data: {0}")]
    InvalidData(String),
    /// `hrd_cpb_cnt_minus1` exceeds the maximum of 31.
    #[error("Unsupported CPB count: hrd_cpb_cnt_minus1 = {0} (max 31)")]
    UnsupportedCpbCount(u64),
    /// Any other I/O failure, usually from the output writer.
    #[error("I/O error: {0}")]
    Io(io::Error),
}

impl VvcError {
    /// Returns `true` for errors caused by malformed input.
    ///
    /// An unsupported CPB count is reported as its own variant but counts as
    /// invalid data.
    pub fn is_invalid_data(&self) -> bool {
        matches!(self, Self::InvalidData(_) | Self::UnsupportedCpbCount(_))
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }
}

impl From<io::Error> for VvcError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => Self::OutOfData,
            io::ErrorKind::InvalidData => Self::InvalidData(err.to_string()),
            _ => Self::Io(err),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = VvcError> = std::result::Result<T, E>;
