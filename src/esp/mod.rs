//! Oblivion-era `.esp` and `.esm` plugins.
//!
//! A plugin is a flat list of top-level records followed by a tree of groups. Groups nest
//! arbitrarily deep, and every record carries an ordered list of tagged fields.
//!
//! Reading is strict: a size that disagrees with the bytes it describes is an error, never
//! silently repaired. Writing recomputes every size from the contents first, so a tree can be
//! edited freely in between.

#![doc(alias = "oblivion")]
#![doc(alias = "esm")]

mod fields;
mod group;
mod options;
mod plugin;
mod read;
mod record;
mod tag;
mod write;

pub use self::{
    fields::NO_REFERENCE,
    group::{Group, GroupKind, Node},
    options::{
        CompressedPolicy, ReadOptions, ReadOptionsBuilder, WriteOptions, WriteOptionsBuilder,
    },
    plugin::Plugin,
    record::{Packed, Record, RecordFlags, SubRecord},
    tag::Tag,
};
