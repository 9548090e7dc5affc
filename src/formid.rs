//! Resolving records across a load order.
//!
//! The top byte of a stored form id names the master that defines the record, relative to
//! the plugin that stores it. Ids are made comparable across plugins by replacing that byte
//! with the plugin's own load order slot. Ids below `0x0100_0000` belong to the base game and
//! are left alone.

use crate::esp::{Group, Node, Plugin, Record};
use core::{ptr, slice};
use std::collections::BTreeMap;

/// Maps a stored form id into the global namespace of a load order.
///
/// ```rust
/// use tes4data::formid::effective_form_id;
///
/// assert_eq!(effective_form_id(0x0012_3456, 2), 0x0012_3456);
/// assert_eq!(effective_form_id(0x0112_3456, 2), 0x0212_3456);
/// ```
#[must_use]
pub fn effective_form_id(stored: u32, slot: u8) -> u32 {
    if stored < 0x0100_0000 {
        stored
    } else {
        (stored & 0x00FF_FFFF) | (u32::from(slot) << 24)
    }
}

/// A plugin together with its place in a load order.
#[derive(Clone, Debug)]
pub struct PluginEntry {
    pub name: String,
    pub plugin: Plugin,
    pub slot: u8,
}

impl PluginEntry {
    #[must_use]
    pub fn new(name: impl Into<String>, plugin: Plugin, slot: u8) -> Self {
        Self {
            name: name.into(),
            plugin,
            slot,
        }
    }

    #[must_use]
    pub fn effective_id(&self, record: &Record) -> u32 {
        effective_form_id(record.form_id, self.slot)
    }

    /// Walks the records of every top-level group depth first, each paired with the group
    /// directly holding it.
    #[must_use]
    pub fn records(&self) -> Records<'_> {
        Records {
            groups: self.plugin.groups.iter(),
            stack: Vec::new(),
        }
    }

    /// The first record, in traversal order, with the given effective id.
    #[must_use]
    pub fn find(&self, effective_id: u32) -> Option<&Record> {
        self.records()
            .map(|(record, _)| record)
            .find(|x| self.effective_id(x) == effective_id)
    }

    pub fn find_mut(&mut self, effective_id: u32) -> Option<&mut Record> {
        fn visit(children: &mut [Node], effective_id: u32, slot: u8) -> Option<&mut Record> {
            for child in children {
                match child {
                    Node::Record(x) => {
                        if effective_form_id(x.form_id, slot) == effective_id {
                            return Some(&mut **x);
                        }
                    }
                    Node::Group(x) => {
                        if let Some(found) = visit(&mut x.children, effective_id, slot) {
                            return Some(found);
                        }
                    }
                }
            }
            None
        }

        let slot = self.slot;
        self.plugin
            .groups
            .iter_mut()
            .find_map(|group| visit(&mut group.children, effective_id, slot))
    }

    /// The group that directly holds `record`, which must be borrowed from this plugin.
    #[must_use]
    pub fn parent_of(&self, record: &Record) -> Option<&Group> {
        self.records()
            .find(|(x, _)| ptr::eq(*x, record))
            .map(|(_, group)| group)
    }
}

/// See [`PluginEntry::records`].
pub struct Records<'tree> {
    groups: slice::Iter<'tree, Group>,
    stack: Vec<(&'tree Group, slice::Iter<'tree, Node>)>,
}

impl<'tree> Iterator for Records<'tree> {
    type Item = (&'tree Record, &'tree Group);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((parent, children)) = self.stack.last_mut() {
                let parent = *parent;
                match children.next() {
                    Some(Node::Record(x)) => return Some((&**x, parent)),
                    Some(Node::Group(x)) => self.stack.push((&**x, x.children.iter())),
                    None => {
                        self.stack.pop();
                    }
                }
            } else {
                let group = self.groups.next()?;
                self.stack.push((group, group.children.iter()));
            }
        }
    }
}

/// Every record of a load order, keyed by effective form id.
///
/// An id defined by one plugin and overridden by later ones maps to all of them, in the
/// order they were harvested.
#[derive(Debug, Default)]
pub struct FormIdIndex<'tree> {
    map: BTreeMap<u32, Vec<(&'tree str, &'tree Record)>>,
    len: usize,
}

impl<'tree> FormIdIndex<'tree> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds every grouped record of `entry`. Returns how many were added.
    pub fn harvest(&mut self, entry: &'tree PluginEntry) -> usize {
        let mut count = 0;
        for (record, _) in entry.records() {
            self.map
                .entry(entry.effective_id(record))
                .or_default()
                .push((entry.name.as_str(), record));
            count += 1;
        }
        self.len += count;
        count
    }

    /// Every plugin's version of a record, in load order.
    #[must_use]
    pub fn get(&self, effective_id: u32) -> &[(&'tree str, &'tree Record)] {
        self.map.get(&effective_id).map_or(&[], Vec::as_slice)
    }

    /// The version of a record that wins, i.e. the one harvested last.
    #[must_use]
    pub fn latest(&self, effective_id: u32) -> Option<(&'tree str, &'tree Record)> {
        self.get(effective_id).last().copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The number of harvested records, overrides included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Iterates over all entries by ascending effective id.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &'tree str, &'tree Record)> + '_ {
        self.map
            .iter()
            .flat_map(|(&id, entries)| entries.iter().map(move |&(name, record)| (id, name, record)))
    }
}

impl<'tree> FromIterator<&'tree PluginEntry> for FormIdIndex<'tree> {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = &'tree PluginEntry>,
    {
        let mut index = Self::new();
        for entry in iter {
            index.harvest(entry);
        }
        index
    }
}
