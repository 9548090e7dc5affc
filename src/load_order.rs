//! Assembling a load order from a plugin list.
//!
//! The primary master always loads first. The remaining masters follow, then the plain
//! plugins, each of those two classes sorted by file modification time, oldest first.

use crate::{
    esp::{Plugin, ReadOptions},
    formid::PluginEntry,
    observer::Event,
    vfs::Storage,
    Result,
};
use bstr::ByteSlice as _;
use std::{
    io::{self, BufRead as _, BufReader},
    path::{Path, PathBuf},
    time::SystemTime,
};

/// The master every other plugin ultimately depends on.
pub const PRIMARY_MASTER: &str = "Oblivion.esm";

/// Reads a `plugins.txt` style list: one file name per line, `#` starting a comment line.
pub fn read_list(storage: &dyn Storage, path: &Path) -> Result<Vec<String>> {
    let handle = storage.open(path)?;
    let mut names = Vec::new();
    for line in BufReader::new(handle).split(b'\n') {
        let line = line?;
        let line = line.trim_end_with(|c| c == '\r' || c == '\n');
        if line.len() < 2 || line.starts_with(b"#") {
            continue;
        }
        names.push(String::from_utf8_lossy(line).into_owned());
    }
    Ok(names)
}

#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
enum Class {
    PrimaryMaster,
    Master,
    Plugin,
}

fn classify(name: &str) -> Class {
    let file_name = Path::new(name)
        .file_name()
        .map(|x| x.to_string_lossy())
        .unwrap_or_default();
    let is_master = Path::new(name)
        .extension()
        .is_some_and(|x| x.eq_ignore_ascii_case("esm"));

    if file_name.eq_ignore_ascii_case(PRIMARY_MASTER) {
        Class::PrimaryMaster
    } else if is_master {
        Class::Master
    } else {
        Class::Plugin
    }
}

struct Candidate<'list> {
    name: &'list str,
    path: PathBuf,
    class: Class,
    modified: Option<SystemTime>,
}

/// Loads every listed plugin that exists under `base_dir`, in load order, and assigns each
/// its slot. Slots start at 0 when the primary master is present, and at 1 otherwise.
///
/// Missing plugins are reported to the observer and skipped. `progress` is called with
/// `(loaded, total)` after each plugin.
pub fn load<S, F>(
    storage: &dyn Storage,
    names: &[S],
    base_dir: &Path,
    options: &ReadOptions,
    mut progress: F,
) -> Result<Vec<PluginEntry>>
where
    S: AsRef<str>,
    F: FnMut(usize, usize),
{
    let mut candidates = Vec::with_capacity(names.len());
    for name in names {
        let name = name.as_ref();
        let path = base_dir.join(name);
        match storage.modified(&path) {
            Ok(modified) => candidates.push(Candidate {
                name,
                class: classify(name),
                path,
                modified,
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                options.observer().notify(&Event::PluginMissing { path: &path });
            }
            Err(err) => return Err(err.into()),
        }
    }

    // stable, so equal keys keep list order
    candidates.sort_by(|lhs, rhs| match lhs.class.cmp(&rhs.class) {
        core::cmp::Ordering::Equal if lhs.class != Class::PrimaryMaster => {
            lhs.modified.cmp(&rhs.modified)
        }
        ordering => ordering,
    });

    let first_slot = usize::from(
        !candidates
            .first()
            .is_some_and(|x| x.class == Class::PrimaryMaster),
    );

    let total = candidates.len();
    let mut entries = Vec::with_capacity(total);
    for (i, candidate) in candidates.into_iter().enumerate() {
        let slot: u8 = (first_slot + i).try_into()?;
        let plugin = Plugin::open(storage, &candidate.path, options)?;
        options.observer().notify(&Event::PluginLoaded {
            path: &candidate.path,
            slot,
        });
        entries.push(PluginEntry::new(candidate.name, plugin, slot));
        progress(entries.len(), total);
    }

    Ok(entries)
}
