//! Diagnostics emitted while reading archives and plugins.
//!
//! Nothing in this crate prints. Interesting moments are reported as [`Event`]s to an
//! [`Observer`], and the default [`LogObserver`] forwards them to the [`log`] facade.

use crate::esp::Tag;
use bstr::BStr;
use std::path::Path;

#[non_exhaustive]
#[derive(Clone, Copy, Debug)]
pub enum Event<'event> {
    /// An archive header was read and accepted.
    ArchiveOpened {
        path: &'event Path,
        version: u32,
        flags: u32,
        folders: u32,
        files: u32,
    },

    /// A file entry flips the archive's default compression through its size field.
    SizeKludge { path: &'event Path, hash: u64 },

    /// Another archive was merged into an existing one.
    ArchiveMerged { sources: &'event str, files: usize },

    /// A lookup into an archive missed.
    FileMissing { path: &'event BStr, sources: &'event str },

    /// A group and all of its children were decoded.
    GroupDecoded {
        label: Tag,
        group_type: i32,
        size: u32,
    },

    /// A record was decoded.
    RecordDecoded {
        tag: Tag,
        form_id: u32,
        size: u32,
        compressed: bool,
    },

    /// A plugin named in a load order does not exist.
    PluginMissing { path: &'event Path },

    /// A plugin was decoded and given its load order slot.
    PluginLoaded { path: &'event Path, slot: u8 },
}

/// Receives [`Event`]s. Implementations must be shareable across threads since archives and
/// options carry them around.
pub trait Observer: Send + Sync {
    fn notify(&self, event: &Event<'_>);
}

/// Forwards every event to the [`log`] crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogObserver;

impl Observer for LogObserver {
    fn notify(&self, event: &Event<'_>) {
        match *event {
            Event::ArchiveOpened {
                path,
                version,
                flags,
                folders,
                files,
            } => log::debug!(
                "opened {}: version {version}, flags {flags:#010X}, {folders} folders, {files} files",
                path.display()
            ),
            Event::SizeKludge { path, hash } => log::trace!(
                "{}: file {hash:#018X} overrides the archive compression flag",
                path.display()
            ),
            Event::ArchiveMerged { sources, files } => {
                log::debug!("archive ({sources}) now contains {files} files");
            }
            Event::FileMissing { path, sources } => {
                log::warn!("file '{path}' not found in '{sources}'");
            }
            Event::GroupDecoded {
                label,
                group_type,
                size,
            } => log::trace!("group {label} (type {group_type}), {size} bytes"),
            Event::RecordDecoded {
                tag,
                form_id,
                size,
                compressed,
            } => log::trace!(
                "record {tag} {form_id:08X}, {size} bytes{}",
                if compressed { ", compressed" } else { "" }
            ),
            Event::PluginMissing { path } => log::warn!("plugin not found: {}", path.display()),
            Event::PluginLoaded { path, slot } => {
                log::debug!("loaded {} into slot {slot:02X}", path.display());
            }
        }
    }
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullObserver;

impl Observer for NullObserver {
    fn notify(&self, _: &Event<'_>) {}
}
