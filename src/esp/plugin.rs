use crate::{
    esp::{fields, read, Group, Node, ReadOptions, Record, Tag},
    io::Source,
    vfs::Storage,
    Result,
};
use bstr::BString;
use std::{
    io::{Cursor, Read, Seek},
    path::Path,
};

/// A decoded `.esp` or `.esm` file.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Plugin {
    /// Records outside of any group, normally just the `TES4` header.
    pub records: Vec<Record>,
    pub groups: Vec<Group>,
}

impl Plugin {
    /// Decodes blocks until the stream runs out.
    pub fn read<R>(reader: &mut R, options: &ReadOptions) -> Result<Self>
    where
        R: ?Sized + Read + Seek,
    {
        let mut source = Source::new(reader);
        let mut result = Self::default();
        while let Some((node, _)) = read::read_node(&mut source, options, 0)? {
            match node {
                Node::Group(x) => result.groups.push(*x),
                Node::Record(x) => result.records.push(*x),
            }
        }
        Ok(result)
    }

    pub fn from_bytes(bytes: &[u8], options: &ReadOptions) -> Result<Self> {
        Self::read(&mut Cursor::new(bytes), options)
    }

    pub fn open(storage: &dyn Storage, path: &Path, options: &ReadOptions) -> Result<Self> {
        let mut handle = storage.open(path)?;
        Self::read(&mut handle, options)
    }

    /// The `TES4` header record.
    #[must_use]
    pub fn header(&self) -> Option<&Record> {
        self.records.iter().find(|x| x.tag() == Tag::HEADER)
    }

    /// The master files this plugin depends on, in the order the header lists them.
    #[must_use]
    pub fn masters(&self) -> Vec<BString> {
        self.header()
            .map(|header| {
                header
                    .fields()
                    .iter()
                    .filter(|x| x.tag == Tag::MASTER)
                    .map(|x| fields::trim_terminator(&x.data).into())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether the header carries the master flag.
    #[must_use]
    pub fn is_master(&self) -> bool {
        self.header().is_some_and(|x| x.flags.esm())
    }

    /// Counts every record in the plugin, nested ones included.
    #[must_use]
    pub fn record_count(&self) -> usize {
        fn count(group: &Group) -> usize {
            group
                .children
                .iter()
                .map(|child| match child {
                    Node::Group(x) => count(x),
                    Node::Record(_) => 1,
                })
                .sum()
        }
        self.records.len() + self.groups.iter().map(count).sum::<usize>()
    }

    /// The top-level group holding records of the given type.
    #[must_use]
    pub fn group(&self, label: impl Into<Tag>) -> Option<&Group> {
        let label = label.into();
        self.groups.iter().find(|x| x.label == label && x.group_type == 0)
    }
}
