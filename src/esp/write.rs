use crate::{
    compression,
    esp::{record::constants, Group, Node, Packed, Plugin, Record, SubRecord, Tag, WriteOptions},
    io::{Endian, Sink},
    vfs::Storage,
    Error, Result,
};
use std::{
    io::{self, Write},
    path::Path,
};

fn checked_sum(lhs: u32, rhs: u32) -> Result<u32> {
    lhs.checked_add(rhs).ok_or(Error::IntegralTruncation)
}

impl SubRecord {
    fn write<W>(&self, sink: &mut Sink<W>) -> Result<()>
    where
        W: ?Sized + Write,
    {
        if let Ok(size) = u16::try_from(self.data.len()) {
            sink.write(&(self.tag.0, size), Endian::Little)?;
        } else {
            let len: u32 = self.data.len().try_into()?;
            sink.write(&(Tag::XXXX.0, 4u16, len), Endian::Little)?;
            sink.write(&(self.tag.0, 0u16), Endian::Little)?;
        }
        sink.write_bytes(&self.data)?;
        Ok(())
    }
}

fn serialize_fields(fields: &[SubRecord]) -> Result<Vec<u8>> {
    let mut bytes = Vec::with_capacity(fields.iter().map(SubRecord::encoded_len).sum());
    let mut sink = Sink::new(&mut bytes);
    for field in fields {
        field.write(&mut sink)?;
    }
    Ok(bytes)
}

impl Record {
    /// Recomputes the stored body size, compressing the fields of records flagged as
    /// compressed. Returns the number of bytes the record occupies, header included.
    pub fn update(&mut self, options: &WriteOptions) -> Result<u32> {
        if self.is_compressed() {
            if self.packed.is_none() {
                let raw = serialize_fields(&self.fields)?;
                let bytes = compression::deflate(&raw, options.compression_level())?;
                self.packed = Some(Packed {
                    decompressed_len: raw.len().try_into()?,
                    bytes,
                });
                self.fields.clear();
            }
            let packed_len: u32 = self.packed.as_ref().map_or(0, |x| x.bytes.len()).try_into()?;
            self.data_size = checked_sum(packed_len, 4)?;
        } else {
            self.unpack()?;
            let size: usize = self.fields.iter().map(SubRecord::encoded_len).sum();
            self.data_size = size.try_into()?;
        }

        checked_sum(constants::RECORD_HEADER_SIZE, self.data_size)
    }

    fn write<W>(&self, sink: &mut Sink<W>) -> Result<()>
    where
        W: ?Sized + Write,
    {
        sink.write(
            &(
                self.tag.0,
                self.data_size,
                self.flags.bits(),
                self.form_id,
                self.version,
            ),
            Endian::Little,
        )?;

        if let Some(packed) = &self.packed {
            sink.write(&packed.decompressed_len, Endian::Little)?;
            sink.write_bytes(&packed.bytes)?;
        } else {
            for field in &self.fields {
                field.write(sink)?;
            }
        }

        Ok(())
    }
}

impl Node {
    fn update(&mut self, options: &WriteOptions) -> Result<u32> {
        match self {
            Self::Group(x) => x.update(options),
            Self::Record(x) => x.update(options),
        }
    }

    fn write<W>(&self, sink: &mut Sink<W>) -> Result<()>
    where
        W: ?Sized + Write,
    {
        match self {
            Self::Group(x) => x.write(sink),
            Self::Record(x) => x.write(sink),
        }
    }
}

impl Group {
    /// Recomputes the sizes of this group and everything below it. Returns the group's size,
    /// header included.
    pub fn update(&mut self, options: &WriteOptions) -> Result<u32> {
        let mut size = constants::GROUP_HEADER_SIZE;
        for child in &mut self.children {
            size = checked_sum(size, child.update(options)?)?;
        }
        self.size = size;
        Ok(size)
    }

    fn write<W>(&self, sink: &mut Sink<W>) -> Result<()>
    where
        W: ?Sized + Write,
    {
        sink.write(
            &(
                Tag::GROUP.0,
                self.size,
                self.label.0,
                self.group_type,
                self.stamp,
            ),
            Endian::Little,
        )?;
        for child in &self.children {
            child.write(sink)?;
        }
        Ok(())
    }
}

impl Plugin {
    /// Recomputes every stored size in the tree, bottom up.
    pub fn update_sizes(&mut self, options: &WriteOptions) -> Result<()> {
        for record in &mut self.records {
            record.update(options)?;
        }
        for group in &mut self.groups {
            group.update(options)?;
        }
        Ok(())
    }

    /// Updates all sizes, then writes the plugin: top-level records first, then top-level
    /// groups.
    pub fn write<W>(&mut self, out: &mut W, options: &WriteOptions) -> Result<()>
    where
        W: ?Sized + Write,
    {
        self.update_sizes(options)?;
        let mut sink = Sink::new(out);
        for record in &self.records {
            record.write(&mut sink)?;
        }
        for group in &self.groups {
            group.write(&mut sink)?;
        }
        Ok(())
    }

    pub fn to_bytes(&mut self, options: &WriteOptions) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.write(&mut bytes, options)?;
        Ok(bytes)
    }

    pub fn save(&mut self, storage: &dyn Storage, path: &Path, options: &WriteOptions) -> Result<()> {
        let mut handle = storage.create(path)?;
        self.write(&mut handle, options)?;
        io::Write::flush(&mut handle)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        esp::{
            CompressedPolicy, Group, Plugin, ReadOptions, Record, RecordFlags, WriteOptions,
        },
        testing::esp::{compressed_record, group, record, sub},
        vfs::StdStorage,
    };
    use anyhow::Context as _;

    fn sample_plugin() -> Vec<u8> {
        let header = record(
            b"TES4",
            0,
            1,
            &[sub(b"HEDR", &[0; 12]), sub(b"MAST", b"Oblivion.esm\0")].concat(),
        );
        let globals = group(
            b"GLOB",
            0,
            &[
                record(b"GLOB", 0x0100_0ABC, 0, &sub(b"EDID", b"GameHour\0")),
                record(b"GLOB", 0x0100_0ABD, 0, &sub(b"EDID", b"GameDay\0")),
            ]
            .concat(),
        );
        let cells = group(
            b"CELL",
            0,
            &group(
                &0u32.to_le_bytes(),
                2,
                &[
                    record(b"CELL", 0x0000_1234, 0x400, &sub(b"EDID", b"Vault\0")),
                    group(
                        &0x1234u32.to_le_bytes(),
                        6,
                        &compressed_record(b"REFR", 0x0000_5678, &sub(b"NAME", &[1, 2, 3, 4])),
                    ),
                ]
                .concat(),
            ),
        );
        [header, globals, cells].concat()
    }

    #[test]
    fn unmodified_trees_round_trip() -> anyhow::Result<()> {
        let bytes = sample_plugin();
        let options = ReadOptions::builder()
            .compressed_policy(CompressedPolicy::KeepRaw)
            .build();
        let mut plugin = Plugin::from_bytes(&bytes, &options)?;
        assert_eq!(plugin.records.len(), 1);
        assert_eq!(plugin.groups.len(), 2);

        let written = plugin.to_bytes(&WriteOptions::default())?;
        assert_eq!(written, bytes);
        Ok(())
    }

    #[test]
    fn decoded_trees_survive_a_rewrite() -> anyhow::Result<()> {
        let bytes = sample_plugin();
        let mut plugin = Plugin::from_bytes(&bytes, &ReadOptions::default())?;
        let written = plugin.to_bytes(&WriteOptions::default())?;

        let mut reread = Plugin::from_bytes(&written, &ReadOptions::default())?;
        reread.update_sizes(&WriteOptions::default())?;
        assert_eq!(reread, plugin);
        Ok(())
    }

    #[test]
    fn sizes_are_derived_from_contents() -> anyhow::Result<()> {
        let mut plugin = Plugin::from_bytes(&sample_plugin(), &ReadOptions::default())?;
        let before = plugin.groups[0].size();

        let globals = &mut plugin.groups[0];
        let mut fresh = Record::new(b"GLOB", 0x0100_0ABE);
        fresh.push_field(b"EDID", b"TimeScale\0".to_vec())?;
        fresh.push_field(b"FNAM", b"f".to_vec())?;
        globals.children.push(fresh.into());

        plugin.update_sizes(&WriteOptions::default())?;
        let globals = &plugin.groups[0];
        let added = globals.children[2].as_record().context("missing record")?;
        assert_eq!(added.data_size(), (6 + 10) + (6 + 1));
        assert_eq!(globals.size(), before + 20 + 23);

        fn check(group: &Group) -> u32 {
            let children: u32 = group
                .children
                .iter()
                .map(|child| match child.as_group() {
                    Some(x) => {
                        assert_eq!(x.size(), check(x));
                        x.size()
                    }
                    None => child.as_record().map_or(0, |x| 20 + x.data_size()),
                })
                .sum();
            20 + children
        }
        for group in &plugin.groups {
            assert_eq!(group.size(), check(group));
        }
        Ok(())
    }

    #[test]
    fn oversized_fields_use_a_carrier() -> anyhow::Result<()> {
        let payload = vec![0x5A; 0x1_2345];
        let mut world = Record::new(b"WRLD", 0x3C);
        world.push_field(b"OFST", payload.clone())?;
        let mut plugin = Plugin {
            records: Vec::new(),
            groups: vec![Group::new(b"WRLD", 0)],
        };
        plugin.groups[0].children.push(world.into());

        let bytes = plugin.to_bytes(&WriteOptions::default())?;
        let body = &bytes[40..];
        assert_eq!(&body[..6], b"XXXX\x04\x00");
        assert_eq!(&body[6..10], &0x1_2345u32.to_le_bytes());
        assert_eq!(&body[10..16], b"OFST\x00\x00");

        let reread = Plugin::from_bytes(&bytes, &ReadOptions::default())?;
        let world = reread.groups[0].records().next().context("missing record")?;
        assert_eq!(world.fields().len(), 1);
        assert_eq!(world.get_bytes(b"OFST"), payload);
        Ok(())
    }

    #[test]
    fn compressed_records_carry_oversized_fields() -> anyhow::Result<()> {
        let payload = vec![0x33; 0x1_0010];
        let mut world = Record::new(b"WRLD", 0x3C);
        world.flags |= RecordFlags::COMPRESSED;
        world.push_field(b"EDID", b"Tamriel\0".to_vec())?;
        world.push_field(b"OFST", payload.clone())?;
        let mut plugin = Plugin {
            records: Vec::new(),
            groups: vec![Group::new(b"WRLD", 0)],
        };
        plugin.groups[0].children.push(world.into());

        let bytes = plugin.to_bytes(&WriteOptions::default())?;
        let reread = Plugin::from_bytes(&bytes, &ReadOptions::default())?;
        let world = reread.groups[0].records().next().context("missing record")?;
        assert!(world.flags.contains(RecordFlags::COMPRESSED));
        assert_eq!(world.fields().len(), 2);
        assert_eq!(world.get_string(b"EDID"), "Tamriel");
        assert_eq!(world.get_bytes(b"OFST"), payload);
        Ok(())
    }

    #[test]
    fn compressed_records_are_recompressed() -> anyhow::Result<()> {
        let mut rec = Record::new(b"NPC_", 7);
        rec.flags |= RecordFlags::COMPRESSED;
        rec.push_field(b"EDID", b"Jauffre\0".to_vec())?;
        rec.push_field(b"FULL", b"Jauffre\0".to_vec())?;

        let size = rec.update(&WriteOptions::default())?;
        assert!(rec.is_packed());
        let packed = rec.packed().context("missing packed body")?;
        assert_eq!(packed.decompressed_len, 28);
        assert_eq!(rec.data_size() as usize, packed.bytes.len() + 4);
        assert_eq!(size, 20 + rec.data_size());

        rec.unpack()?;
        assert_eq!(rec.get_string(b"FULL"), "Jauffre");

        // clearing the flag stores the fields plainly
        rec.flags.remove(RecordFlags::COMPRESSED);
        rec.update(&WriteOptions::default())?;
        assert!(!rec.is_packed());
        assert_eq!(rec.data_size(), 28);
        Ok(())
    }

    #[test]
    fn save_and_open() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("Test.esp");

        let mut plugin = Plugin::from_bytes(&sample_plugin(), &ReadOptions::default())?;
        plugin.save(&StdStorage, &path, &WriteOptions::default())?;

        // saving packed the compressed record, so compare without decoding it again
        let options = ReadOptions::builder()
            .compressed_policy(CompressedPolicy::KeepRaw)
            .build();
        let reopened = Plugin::open(&StdStorage, &path, &options)?;
        assert_eq!(reopened, plugin);
        assert!(reopened.is_master());
        Ok(())
    }
}
