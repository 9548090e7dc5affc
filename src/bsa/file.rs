use crate::{
    bsa::Hash,
    compression,
    io::{Endian, Source},
    strings,
    vfs::Storage,
    Error, Result,
};
use bstr::{BStr, BString, ByteSlice as _};
use core::mem;
use std::{path::Path, sync::Arc};

/// One file entry of an archive.
///
/// Entries only describe where the data lives. The bytes are fetched from the owning archive
/// on disk every time [`File::read`] is called.
#[derive(Clone, Debug)]
pub struct File {
    pub(crate) hash: Hash,
    pub(crate) size: u32,
    pub(crate) offset: u32,
    pub(crate) compressed: bool,
    pub(crate) embedded_name: bool,
    pub(crate) source: Arc<Path>,
    pub(crate) name: Option<BString>,
}

impl File {
    #[must_use]
    pub fn hash(&self) -> Hash {
        self.hash
    }

    /// The stored size, with the compression and checked bits already masked out.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.size
    }

    #[must_use]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Whether the stored bytes are compressed, after applying the per-file override.
    #[must_use]
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// The archive this entry was read from.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    #[must_use]
    pub fn name(&self) -> Option<&BStr> {
        self.name.as_ref().map(|x| x.as_bstr())
    }

    /// Reads the file's bytes out of its source archive, decompressing them if needed.
    pub fn read(&self, storage: &dyn Storage) -> Result<Vec<u8>> {
        if self.size == 0 {
            return Err(Error::EmptyFile(self.name.clone().unwrap_or_default()));
        }

        let mut handle = storage.open(&self.source)?;
        let mut source = Source::new(&mut handle);
        source.seek_absolute(self.offset.into())?;

        let mut data_size = self.size as usize;
        if self.embedded_name {
            let name = source.read_protocol::<strings::BString>(Endian::Little)?;
            data_size = data_size
                .checked_sub(name.len() + 1) // include prefix byte
                .ok_or(Error::Truncated)?;
        }

        if self.compressed {
            let decompressed_len: u32 = source.read(Endian::Little)?;
            data_size = data_size
                .checked_sub(mem::size_of::<u32>())
                .ok_or(Error::Truncated)?;
            let bytes = source.read_bytes(data_size)?;
            compression::inflate(&bytes, decompressed_len as usize)
        } else {
            Ok(source.read_bytes(data_size)?)
        }
    }
}

/// A folder of an archive, and the files it holds in on-disk order.
#[derive(Clone, Debug)]
pub struct Folder {
    pub(crate) hash: Hash,
    pub(crate) offset: u32,
    pub(crate) name: Option<BString>,
    pub(crate) files: Vec<File>,
}

impl Folder {
    #[must_use]
    pub fn hash(&self) -> Hash {
        self.hash
    }

    #[must_use]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    #[must_use]
    pub fn name(&self) -> Option<&BStr> {
        self.name.as_ref().map(|x| x.as_bstr())
    }

    #[must_use]
    pub fn files(&self) -> &[File] {
        &self.files
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        bsa::{File, Hash},
        vfs::StdStorage,
        Error, ErrorKind,
    };
    use std::{path::Path, sync::Arc};

    #[test]
    fn zero_sized_files_are_rejected_before_io() {
        let file = File {
            hash: Hash::default(),
            size: 0,
            offset: 0,
            compressed: false,
            embedded_name: false,
            source: Arc::from(Path::new("this/archive/does/not/exist.bsa")),
            name: Some("empty.txt".into()),
        };
        let err = file.read(&StdStorage).unwrap_err();
        assert!(matches!(err, Error::EmptyFile(_)));
        assert_eq!(err.kind(), ErrorKind::CorruptData);
    }
}
