use crate::{
    bsa::{hash_file, hash_folder, File, Folder, Hash},
    hashing,
    io::{Endian, Source},
    observer::{Event, LogObserver, Observer},
    strings::{BZString, ZString},
    vfs::{ReadHandle, Storage},
    Error, Result,
};
use bstr::{BString, ByteSlice as _};
use core::fmt::{self, Debug, Formatter};
use std::{collections::HashMap, path::Path, sync::Arc};

bitflags::bitflags! {
    #[repr(transparent)]
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub struct Flags: u32 {
        const DIRECTORY_STRINGS = 1 << 0;
        const FILE_STRINGS = 1 << 1;
        const COMPRESSED = 1 << 2;
        const RETAIN_DIRECTORY_NAMES = 1 << 3;
        const RETAIN_FILE_NAMES = 1 << 4;
        const RETAIN_FILE_NAME_OFFSETS = 1 << 5;
        const XBOX_ARCHIVE = 1 << 6;
        const RETAIN_STRINGS_DURING_STARTUP = 1 << 7;
        const EMBEDDED_FILE_NAMES = 1 << 8;
        const XBOX_COMPRESSED = 1 << 9;
    }
}

impl Default for Flags {
    fn default() -> Self {
        Self::DIRECTORY_STRINGS | Self::FILE_STRINGS
    }
}

impl Flags {
    #[must_use]
    pub fn directory_strings(&self) -> bool {
        self.contains(Self::DIRECTORY_STRINGS)
    }

    #[must_use]
    pub fn file_strings(&self) -> bool {
        self.contains(Self::FILE_STRINGS)
    }

    #[must_use]
    pub fn compressed(&self) -> bool {
        self.contains(Self::COMPRESSED)
    }

    #[must_use]
    pub fn xbox_archive(&self) -> bool {
        self.contains(Self::XBOX_ARCHIVE)
    }

    #[must_use]
    pub fn embedded_file_names(&self) -> bool {
        self.contains(Self::EMBEDDED_FILE_NAMES)
    }
}

bitflags::bitflags! {
    #[repr(transparent)]
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct Types: u32 {
        const MESHES = 1 << 0;
        const TEXTURES = 1 << 1;
        const MENUS = 1 << 2;
        const SOUNDS = 1 << 3;
        const VOICES = 1 << 4;
        const SHADERS = 1 << 5;
        const TREES = 1 << 6;
        const FONTS = 1 << 7;
        const MISC = 1 << 8;
    }
}

/// The archive version.
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, Default, Eq, Ord, PartialEq, PartialOrd)]
pub enum Version {
    #[default]
    v103 = 103,
    v104 = 104,
}

impl Version {
    /// The Elder Scrolls IV: Oblivion.
    pub const TES4: Self = Self::v103;
    /// Fallout 3.
    pub const FO3: Self = Self::v104;
    /// Fallout: New Vegas.
    pub const FNV: Self = Self::v104;
    /// The Elder Scrolls V: Skyrim.
    pub const TES5: Self = Self::v104;
}

mod constants {
    pub const BSA: u32 = u32::from_le_bytes(*b"BSA\0");
    pub const MAGIC_MASK: u32 = 0x00FF_FFFF;

    pub const HEADER_SIZE: u32 = 0x24;

    pub const FILE_FLAG_COMPRESSION: u32 = 1 << 30;
    pub const FILE_FLAG_CHECKED: u32 = 1 << 31;
}

struct Header {
    version: Version,
    archive_flags: Flags,
    directory_count: u32,
    file_count: u32,
    archive_types: Types,
}

impl Header {
    #[must_use]
    fn hash_endian(&self) -> Endian {
        if self.archive_flags.xbox_archive() {
            Endian::Big
        } else {
            Endian::Little
        }
    }
}

#[derive(Debug, Default)]
#[repr(transparent)]
pub struct OptionsBuilder(Options);

impl OptionsBuilder {
    #[must_use]
    pub fn build(self) -> Options {
        self.0
    }

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.0.observer = observer;
        self
    }
}

/// Parameters used when opening archives.
///
/// ```rust
/// use std::sync::Arc;
/// use tes4data::{bsa::ArchiveOptions, observer::NullObserver};
///
/// let _ = ArchiveOptions::builder()
///     .observer(Arc::new(NullObserver))
///     .build();
/// ```
#[derive(Clone)]
pub struct Options {
    observer: Arc<dyn Observer>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            observer: Arc::new(LogObserver),
        }
    }
}

impl Debug for Options {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options").finish_non_exhaustive()
    }
}

impl Options {
    #[must_use]
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::new()
    }
}

/// An index over one or more archives merged into a single namespace.
pub struct Archive {
    version: Version,
    flags: Flags,
    types: Types,
    folders: Vec<Folder>,
    names: HashMap<BString, (usize, usize)>,
    hashes: HashMap<(u64, u64), (usize, usize)>,
    sources: String,
    observer: Arc<dyn Observer>,
}

impl Debug for Archive {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Archive")
            .field("version", &self.version)
            .field("flags", &self.flags)
            .field("types", &self.types)
            .field("sources", &self.sources)
            .field("folders", &self.folders.len())
            .field("files", &self.len())
            .finish_non_exhaustive()
    }
}

impl Archive {
    /// Opens an archive and indexes its contents.
    pub fn open(storage: &dyn Storage, path: &Path) -> Result<Self> {
        Self::open_with_options(storage, path, &Options::default())
    }

    pub fn open_with_options(storage: &dyn Storage, path: &Path, options: &Options) -> Result<Self> {
        let mut handle = storage.open(path)?;
        Self::do_read(&mut handle, path, options)
    }

    /// Opens another archive and overlays its files onto this one. Files sharing a path
    /// with an existing entry win over it.
    ///
    /// If the other archive can not be read, `self` is left exactly as it was.
    pub fn merge(&mut self, storage: &dyn Storage, path: &Path) -> Result<()> {
        let options = Options {
            observer: self.observer.clone(),
        };
        let other = Self::open_with_options(storage, path, &options)?;
        self.absorb(other);
        Ok(())
    }

    /// Moves every entry of `other` into `self`, with the same overlay rules as
    /// [`Archive::merge`].
    pub fn absorb(&mut self, other: Self) {
        self.folders.extend(other.folders);
        self.sources.push(';');
        self.sources.push_str(&other.sources);
        self.remap();
        self.observer.notify(&Event::ArchiveMerged {
            sources: &self.sources,
            files: self.len(),
        });
    }

    /// Reads a file's bytes, decompressing them if needed.
    ///
    /// The lookup is case-insensitive and accepts either slash as separator. Archives
    /// without name tables are searched by hash instead.
    pub fn extract<P>(&self, storage: &dyn Storage, path: &P) -> Result<Vec<u8>>
    where
        P: ?Sized + AsRef<[u8]>,
    {
        let key = hashing::lookup_key(path.as_ref());
        match self.get(&key) {
            Some(file) => file.read(storage),
            None => {
                self.observer.notify(&Event::FileMissing {
                    path: key.as_bstr(),
                    sources: &self.sources,
                });
                Err(Error::FileNotFound(key))
            }
        }
    }

    /// Finds a file by its path, falling back to the name hashes.
    #[must_use]
    pub fn get<P>(&self, path: &P) -> Option<&File>
    where
        P: ?Sized + AsRef<[u8]>,
    {
        let key = hashing::lookup_key(path.as_ref());
        if let Some(&(folder, file)) = self.names.get(&key) {
            return Some(&self.folders[folder].files[file]);
        }

        let (folder, file) = match key.rfind_byte(b'\\') {
            Some(pos) => (&key[..pos], &key[pos + 1..]),
            None => (&b""[..], &key[..]),
        };
        self.get_by_hash(hash_folder(folder), hash_file(file))
    }

    #[must_use]
    pub fn get_by_hash(&self, folder: Hash, file: Hash) -> Option<&File> {
        self.hashes
            .get(&(folder.numeric(), file.numeric()))
            .map(|&(folder, file)| &self.folders[folder].files[file])
    }

    /// Iterates over every entry, folder by folder in load order. Overridden entries are
    /// included.
    pub fn iter(&self) -> impl Iterator<Item = (&Folder, &File)> {
        self.folders
            .iter()
            .flat_map(|folder| folder.files.iter().map(move |file| (folder, file)))
    }

    #[must_use]
    pub fn folders(&self) -> &[Folder] {
        &self.folders
    }

    #[must_use]
    pub fn flags(&self) -> Flags {
        self.flags
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The number of file entries, counting overridden ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.folders.iter().map(Folder::len).sum()
    }

    /// Every archive this index was built from, joined by `;`.
    #[must_use]
    pub fn source_name(&self) -> &str {
        &self.sources
    }

    #[must_use]
    pub fn types(&self) -> Types {
        self.types
    }

    #[must_use]
    pub fn version(&self) -> Version {
        self.version
    }

    fn remap(&mut self) {
        self.names.clear();
        self.hashes.clear();
        for (i, folder) in self.folders.iter().enumerate() {
            for (j, file) in folder.files.iter().enumerate() {
                if let (Some(folder_name), Some(file_name)) = (&folder.name, &file.name) {
                    let mut path = folder_name.clone();
                    path.push(b'\\');
                    path.extend_from_slice(file_name);
                    self.names.insert(hashing::lookup_key(&path), (i, j));
                }
                self.hashes
                    .insert((folder.hash.numeric(), file.hash.numeric()), (i, j));
            }
        }
    }

    fn do_read(handle: &mut Box<dyn ReadHandle>, path: &Path, options: &Options) -> Result<Self> {
        let mut source = Source::new(handle);
        let header = Self::read_header(&mut source)?;
        options.observer.notify(&Event::ArchiveOpened {
            path,
            version: header.version as u32,
            flags: header.archive_flags.bits(),
            folders: header.directory_count,
            files: header.file_count,
        });

        let path: Arc<Path> = Arc::from(path);
        let mut folders = Vec::new();
        for _ in 0..header.directory_count {
            folders.push(Self::read_directory(&mut source, &header)?);
        }

        for (folder, count) in &mut folders {
            if header.archive_flags.directory_strings() {
                folder.name = Some(source.read_protocol::<BZString>(Endian::Little)?);
            }
            for _ in 0..*count {
                let file = Self::read_file_entry(&mut source, &header, &path, options)?;
                folder.files.push(file);
            }
        }

        if header.archive_flags.file_strings() {
            for (folder, _) in &mut folders {
                for file in &mut folder.files {
                    file.name = Some(source.read_protocol::<ZString>(Endian::Little)?);
                }
            }
        }

        let mut archive = Self {
            version: header.version,
            flags: header.archive_flags,
            types: header.archive_types,
            folders: folders.into_iter().map(|(folder, _)| folder).collect(),
            names: HashMap::new(),
            hashes: HashMap::new(),
            sources: path.display().to_string(),
            observer: options.observer.clone(),
        };
        archive.remap();
        Ok(archive)
    }

    fn read_directory<R>(source: &mut Source<R>, header: &Header) -> Result<(Folder, u32)>
    where
        R: ?Sized + std::io::Read + std::io::Seek,
    {
        let hash = Self::read_hash(source, header.hash_endian())?;
        let (file_count, offset): (u32, u32) = source.read(Endian::Little)?;
        let folder = Folder {
            hash,
            offset,
            name: None,
            files: Vec::new(),
        };
        Ok((folder, file_count))
    }

    fn read_file_entry<R>(
        source: &mut Source<R>,
        header: &Header,
        path: &Arc<Path>,
        options: &Options,
    ) -> Result<File>
    where
        R: ?Sized + std::io::Read + std::io::Seek,
    {
        let hash = Self::read_hash(source, header.hash_endian())?;
        let (size, offset): (u32, u32) = source.read(Endian::Little)?;

        let compression_flipped = (size & constants::FILE_FLAG_COMPRESSION) != 0;
        if compression_flipped {
            options.observer.notify(&Event::SizeKludge {
                path,
                hash: hash.numeric(),
            });
        }

        Ok(File {
            hash,
            size: size & !(constants::FILE_FLAG_COMPRESSION | constants::FILE_FLAG_CHECKED),
            offset,
            compressed: header.archive_flags.compressed() != compression_flipped,
            embedded_name: header.version == Version::v104
                && header.archive_flags.embedded_file_names(),
            source: path.clone(),
            name: None,
        })
    }

    fn read_hash<R>(source: &mut Source<R>, endian: Endian) -> Result<Hash>
    where
        R: ?Sized + std::io::Read + std::io::Seek,
    {
        let (last, last2, length, first, crc): (u8, u8, u8, u8, u32) = source.read(endian)?;
        Ok(Hash {
            last,
            last2,
            length,
            first,
            crc,
        })
    }

    fn read_header<R>(source: &mut Source<R>) -> Result<Header>
    where
        R: ?Sized + std::io::Read + std::io::Seek,
    {
        let (
            magic,
            version,
            header_size,
            archive_flags,
            directory_count,
            file_count,
            _directory_names_len,
            _file_names_len,
            archive_types,
        ): (u32, u32, u32, u32, u32, u32, u32, u32, u32) = source.read(Endian::Little)?;

        if magic & constants::MAGIC_MASK != constants::BSA {
            return Err(Error::InvalidMagic(magic));
        }

        let version = match version {
            103 => Version::v103,
            104 => Version::v104,
            _ => return Err(Error::InvalidVersion(version)),
        };

        if header_size != constants::HEADER_SIZE {
            return Err(Error::InvalidHeaderSize(header_size));
        }

        // there probably exist "valid" archives which set extra bits, so it's not worth validating...
        let archive_flags = Flags::from_bits_truncate(archive_flags);
        let archive_types = Types::from_bits_truncate(archive_types);

        Ok(Header {
            version,
            archive_flags,
            directory_count,
            file_count,
            archive_types,
        })
    }
}
