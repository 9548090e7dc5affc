//! Synthesized fixtures for the unit tests.

use crate::{
    bsa::{hash_file, hash_folder, ArchiveFlags},
    compression,
    vfs::{ReadHandle, Storage, WriteHandle},
};
use std::{
    collections::HashMap,
    io::{self, Cursor},
    path::{Path, PathBuf},
    time::SystemTime,
};

fn u32_of(len: usize) -> u32 {
    u32::try_from(len).expect("fixture sizes fit in 32 bits")
}

pub(crate) struct FileFixture {
    pub(crate) name: String,
    pub(crate) data: Vec<u8>,
    /// Sets the size bit that inverts the archive's compression default.
    pub(crate) flip: bool,
    /// Drops this many bytes off the end of the stored payload.
    pub(crate) truncate: usize,
}

impl FileFixture {
    pub(crate) fn new(name: &str, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
            flip: false,
            truncate: 0,
        }
    }

    pub(crate) fn flipped(mut self) -> Self {
        self.flip = true;
        self
    }

    /// The payload as stored, before any embedded name.
    pub(crate) fn encode(&self, compressed: bool) -> Vec<u8> {
        let mut bytes = if compressed {
            let mut bytes = u32_of(self.data.len()).to_le_bytes().to_vec();
            let packed = compression::deflate(&self.data, compression::DEFAULT_LEVEL)
                .expect("in-memory deflate");
            bytes.extend(packed);
            bytes
        } else {
            self.data.clone()
        };
        bytes.truncate(bytes.len() - self.truncate);
        bytes
    }
}

pub(crate) struct FolderFixture {
    pub(crate) name: String,
    pub(crate) files: Vec<FileFixture>,
}

impl FolderFixture {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            files: Vec::new(),
        }
    }

    pub(crate) fn file(mut self, file: FileFixture) -> Self {
        self.files.push(file);
        self
    }
}

/// Lays out an archive the way the game's own tools do: header, folder records, folder
/// names with their file records, file names, then the payloads.
pub(crate) struct BsaFixture {
    pub(crate) version: u32,
    pub(crate) flags: ArchiveFlags,
    pub(crate) folders: Vec<FolderFixture>,
}

impl BsaFixture {
    pub(crate) fn new(flags: ArchiveFlags) -> Self {
        Self {
            version: 103,
            flags,
            folders: Vec::new(),
        }
    }

    pub(crate) fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub(crate) fn folder(mut self, folder: FolderFixture) -> Self {
        self.folders.push(folder);
        self
    }

    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let folder_names = self.flags.directory_strings();
        let file_names = self.flags.file_strings();
        let embedded = self.version == 104 && self.flags.embedded_file_names();

        let file_count: usize = self.folders.iter().map(|x| x.files.len()).sum();
        let folder_names_len: usize = self.folders.iter().map(|x| x.name.len() + 1).sum();
        let file_names_len: usize = self
            .folders
            .iter()
            .flat_map(|x| &x.files)
            .map(|x| x.name.len() + 1)
            .sum();

        let mut payloads = Vec::new();
        for folder in &self.folders {
            for file in &folder.files {
                let mut payload = Vec::new();
                if embedded {
                    let path = format!("{}\\{}", folder.name, file.name);
                    payload.push(u8::try_from(path.len()).expect("short fixture path"));
                    payload.extend_from_slice(path.as_bytes());
                }
                payload.extend(file.encode(self.flags.compressed() != file.flip));
                payloads.push(payload);
            }
        }

        let mut records_len = 16 * (self.folders.len() + file_count);
        if folder_names {
            records_len += self
                .folders
                .iter()
                .map(|x| x.name.len() + 2)
                .sum::<usize>();
        }
        let names_start = 36 + records_len;
        let data_start = names_start + if file_names { file_names_len } else { 0 };

        let mut out = Vec::new();
        out.extend_from_slice(b"BSA\0");
        for field in [
            self.version,
            0x24,
            self.flags.bits(),
            u32_of(self.folders.len()),
            u32_of(file_count),
            u32_of(folder_names_len),
            u32_of(file_names_len),
            0,
        ] {
            out.extend_from_slice(&field.to_le_bytes());
        }

        let mut block = 36 + 16 * self.folders.len();
        for folder in &self.folders {
            out.extend_from_slice(&hash_folder(folder.name.as_bytes()).numeric().to_le_bytes());
            out.extend_from_slice(&u32_of(folder.files.len()).to_le_bytes());
            out.extend_from_slice(&u32_of(block + file_names_len).to_le_bytes());
            if folder_names {
                block += folder.name.len() + 2;
            }
            block += 16 * folder.files.len();
        }

        let mut payload_offset = data_start;
        let mut payload_iter = payloads.iter();
        for folder in &self.folders {
            if folder_names {
                out.push(u8::try_from(folder.name.len() + 1).expect("short fixture name"));
                out.extend_from_slice(folder.name.as_bytes());
                out.push(0);
            }
            for file in &folder.files {
                let payload = payload_iter.next().expect("one payload per file");
                let mut size = u32_of(payload.len());
                if file.flip {
                    size |= 1 << 30;
                }
                out.extend_from_slice(&hash_file(file.name.as_bytes()).numeric().to_le_bytes());
                out.extend_from_slice(&size.to_le_bytes());
                out.extend_from_slice(&u32_of(payload_offset).to_le_bytes());
                payload_offset += payload.len();
            }
        }
        assert_eq!(out.len(), names_start);

        if file_names {
            for file in self.folders.iter().flat_map(|x| &x.files) {
                out.extend_from_slice(file.name.as_bytes());
                out.push(0);
            }
        }
        assert_eq!(out.len(), data_start);

        for payload in payloads {
            out.extend(payload);
        }
        out
    }
}

/// Raw plugin blocks, built by hand.
pub(crate) mod esp {
    use crate::compression;

    pub(crate) fn sub(tag: &[u8; 4], data: &[u8]) -> Vec<u8> {
        let mut out = tag.to_vec();
        out.extend_from_slice(&u16::try_from(data.len()).expect("small field").to_le_bytes());
        out.extend_from_slice(data);
        out
    }

    pub(crate) fn record(tag: &[u8; 4], form_id: u32, flags: u32, body: &[u8]) -> Vec<u8> {
        let mut out = tag.to_vec();
        for field in [super::u32_of(body.len()), flags, form_id, 0] {
            out.extend_from_slice(&field.to_le_bytes());
        }
        out.extend_from_slice(body);
        out
    }

    pub(crate) fn compressed_record(tag: &[u8; 4], form_id: u32, fields: &[u8]) -> Vec<u8> {
        let mut body = super::u32_of(fields.len()).to_le_bytes().to_vec();
        body.extend(
            compression::deflate(fields, compression::DEFAULT_LEVEL).expect("in-memory deflate"),
        );
        record(tag, form_id, 0x0004_0000, &body)
    }

    pub(crate) fn group(label: &[u8; 4], group_type: i32, children: &[u8]) -> Vec<u8> {
        let mut out = b"GRUP".to_vec();
        out.extend_from_slice(&super::u32_of(children.len() + 20).to_le_bytes());
        out.extend_from_slice(label);
        out.extend_from_slice(&group_type.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(children);
        out
    }
}

/// A read-only [`Storage`] over in-memory files.
#[derive(Default)]
pub(crate) struct MemoryStorage {
    files: HashMap<PathBuf, (Vec<u8>, Option<SystemTime>)>,
}

impl MemoryStorage {
    pub(crate) fn insert<P>(&mut self, path: P, bytes: &[u8], modified: Option<SystemTime>)
    where
        P: AsRef<Path>,
    {
        self.files
            .insert(path.as_ref().to_path_buf(), (bytes.to_vec(), modified));
    }

    fn get(&self, path: &Path) -> io::Result<&(Vec<u8>, Option<SystemTime>)> {
        self.files
            .get(path)
            .ok_or_else(|| io::ErrorKind::NotFound.into())
    }
}

impl Storage for MemoryStorage {
    fn open(&self, path: &Path) -> io::Result<Box<dyn ReadHandle>> {
        let (bytes, _) = self.get(path)?;
        Ok(Box::new(Cursor::new(bytes.clone())))
    }

    fn create(&self, _: &Path) -> io::Result<Box<dyn WriteHandle>> {
        Err(io::ErrorKind::PermissionDenied.into())
    }

    fn modified(&self, path: &Path) -> io::Result<Option<SystemTime>> {
        self.get(path).map(|(_, modified)| *modified)
    }
}
