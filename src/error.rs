use crate::esp::Tag;
use bstr::BString;
use core::num::TryFromIntError;
use std::io;

/// Broad classification of an [`Error`], for callers that only care about how to react.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// The input is not the format it claims to be (bad magic, unsupported version, ...).
    Format,
    /// The input is the right format, but its contents are damaged or truncated.
    CorruptData,
    /// A lookup missed. Usually not fatal.
    NotFound,
    /// The storage layer failed.
    Io,
}

#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("buffer failed to decompress, the stream is damaged or incomplete")]
    DecompressionFailed,

    #[error("buffer failed to decompress to the expected size... expected {expected} bytes, but got {actual} bytes")]
    DecompressionSizeMismatch { expected: usize, actual: usize },

    #[error("file has a stored size of zero: {0}")]
    EmptyFile(BString),

    #[error("file was not found in the archive: {0}")]
    FileNotFound(BString),

    #[error("group declares a size of {declared} bytes, but its contents span {actual} bytes")]
    GroupOverrun { declared: u32, actual: u64 },

    #[error("groups are nested more than {0} levels deep")]
    GroupTooDeep(usize),

    #[error("an operation on an integer would have truncated and corrupted data")]
    IntegralTruncation,

    #[error("invalid group size, smaller than the group header: {0}")]
    InvalidGroupSize(u32),

    #[error("invalid size read from archive header: {0}")]
    InvalidHeaderSize(u32),

    #[error("invalid magic read from archive header: {0:#010X}")]
    InvalidMagic(u32),

    #[error("invalid version read from archive header: {0}")]
    InvalidVersion(u32),

    #[error("record does not contain a sub-record of type {0}")]
    MissingField(Tag),

    #[error("sub-record {tag} runs {overrun} bytes past the end of its record")]
    SubRecordOverrun { tag: Tag, overrun: usize },

    #[error("stream ended in the middle of a block")]
    Truncated,

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidHeaderSize(_) | Self::InvalidMagic(_) | Self::InvalidVersion(_) => {
                ErrorKind::Format
            }
            Self::DecompressionFailed
            | Self::DecompressionSizeMismatch { .. }
            | Self::EmptyFile(_)
            | Self::GroupOverrun { .. }
            | Self::GroupTooDeep(_)
            | Self::IntegralTruncation
            | Self::InvalidGroupSize(_)
            | Self::SubRecordOverrun { .. }
            | Self::Truncated => ErrorKind::CorruptData,
            Self::FileNotFound(_) | Self::MissingField(_) => ErrorKind::NotFound,
            Self::Io(err) if err.kind() == io::ErrorKind::UnexpectedEof => ErrorKind::CorruptData,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

impl From<TryFromIntError> for Error {
    fn from(_: TryFromIntError) -> Self {
        Self::IntegralTruncation
    }
}

pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use crate::{Error, ErrorKind};
    use std::io;

    #[test]
    fn eof_counts_as_corruption() {
        let eof = Error::from(io::Error::from(io::ErrorKind::UnexpectedEof));
        assert_eq!(eof.kind(), ErrorKind::CorruptData);

        let denied = Error::from(io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(denied.kind(), ErrorKind::Io);
    }

    #[test]
    fn lookups_are_not_found() {
        assert_eq!(Error::FileNotFound("a\\b".into()).kind(), ErrorKind::NotFound);
        assert_eq!(Error::MissingField(b"EDID".into()).kind(), ErrorKind::NotFound);
        assert_eq!(Error::InvalidMagic(0).kind(), ErrorKind::Format);
    }
}
