//! Oblivion-era `.bsa` archives.
//!
//! Opening an archive only reads its header, folder records, and name tables. File contents
//! stay on disk until [`File::read`] (or [`Archive::extract`]) asks for them, so an index over
//! every archive of an installation stays small.
//!
//! Several archives can be layered into one namespace with [`Archive::merge`]. A path present
//! in more than one of them resolves to the archive merged last.

#![doc(alias = "oblivion")]
#![doc(alias = "fallout 3")]
#![doc(alias = "fo3")]

mod archive;
mod file;
mod hashing;

pub use self::{
    archive::{
        Archive, Flags as ArchiveFlags, Options as ArchiveOptions,
        OptionsBuilder as ArchiveOptionsBuilder, Types as ArchiveTypes, Version,
    },
    file::{File, Folder},
    hashing::{hash_file, hash_folder, Hash},
};
