//! The storage contract every reader and writer in this crate goes through.
//!
//! A handle is any `Read + Seek` (or `Write + Seek`) object, so "tell" is
//! [`Seek::stream_position`], "close" is dropping the handle, and line reading comes from
//! wrapping a handle in a [`std::io::BufReader`]. Swap [`StdStorage`] for another
//! [`Storage`] to read from a sandbox, an in-memory image, or anything else.

use std::{
    fs,
    io::{self, BufReader, BufWriter, Read, Seek, Write},
    path::Path,
    time::SystemTime,
};

pub trait ReadHandle: Read + Seek {}

impl<T> ReadHandle for T where T: ?Sized + Read + Seek {}

pub trait WriteHandle: Write + Seek {}

impl<T> WriteHandle for T where T: ?Sized + Write + Seek {}

pub trait Storage {
    /// Opens an existing file for reading.
    fn open(&self, path: &Path) -> io::Result<Box<dyn ReadHandle>>;

    /// Creates (or truncates) a file for writing.
    fn create(&self, path: &Path) -> io::Result<Box<dyn WriteHandle>>;

    /// The last modification time of a file.
    ///
    /// `Ok(None)` means the file exists but the backend does not track timestamps.
    fn modified(&self, path: &Path) -> io::Result<Option<SystemTime>>;
}

/// [`Storage`] backed by [`std::fs`].
#[derive(Clone, Copy, Debug, Default)]
pub struct StdStorage;

impl Storage for StdStorage {
    fn open(&self, path: &Path) -> io::Result<Box<dyn ReadHandle>> {
        let file = fs::File::open(path)?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn create(&self, path: &Path) -> io::Result<Box<dyn WriteHandle>> {
        let file = fs::File::create(path)?;
        Ok(Box::new(BufWriter::new(file)))
    }

    fn modified(&self, path: &Path) -> io::Result<Option<SystemTime>> {
        let metadata = fs::metadata(path)?;
        Ok(metadata.modified().ok())
    }
}
