//! Error kinds shared by every layer of the image.

use std::io;

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// A failure raised by the block device, allocator, inode store, handle
/// engine, or walker.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No free bit was found in the bitmap.
    #[error("filesystem is full")]
    FSFull,
    /// Appending would make a file exceed `MAX_FILE_LENGTH`.
    #[error("file is full")]
    FileFull,
    /// A seek target fell outside `[0, length]`.
    #[error("seek to {target} out of bounds (length {length})")]
    SeekOutOfBounds {
        /// The requested cursor position.
        target: i64,
        /// The handle's length at the time of the seek.
        length: i32,
    },
    /// A read reached EOF before the requested amount was consumed.
    #[error("read past end of file")]
    ReadOutOfBounds,
    /// `shrink` was asked to remove more bytes than the handle's length.
    #[error("shrink of {amt} exceeds length {length}")]
    ShrinkOutOfBounds {
        /// The handle's length at the time of the shrink.
        length: i32,
        /// The requested amount to shrink by.
        amt: i32,
    },
    /// An entry expected to be a directory was a file.
    #[error("`{0}` is not a directory")]
    NotADir(String),
    /// An entry expected to be a file was a directory.
    #[error("`{0}` is not a file")]
    NotAFile(String),
    /// A directory removal was attempted on a non-empty directory.
    #[error("directory `{0}` is not empty")]
    DirNotEmpty(String),
    /// A create or rename collided with an existing name.
    #[error("`{0}` already exists")]
    AlreadyExists(String),
    /// A lookup, remove, or rename target does not exist.
    #[error("`{0}` does not exist")]
    DoesNotExist(String),
    /// A name failed the validation rule.
    #[error("`{0}` is not a valid name")]
    InvalidName(String),
    /// The host stream returned an I/O error.
    #[error("host I/O error: {0}")]
    HostIO(#[from] io::Error),
}
