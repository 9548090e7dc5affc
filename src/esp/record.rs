use crate::{compression, esp::Tag, Result};

bitflags::bitflags! {
    #[repr(transparent)]
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct RecordFlags: u32 {
        const ESM = 1 << 0;
        const DELETED = 1 << 5;
        const CASTS_SHADOWS = 1 << 9;
        const PERSISTENT = 1 << 10;
        const INITIALLY_DISABLED = 1 << 11;
        const IGNORED = 1 << 12;
        const VISIBLE_WHEN_DISTANT = 1 << 15;
        const OFF_LIMITS = 1 << 17;
        const COMPRESSED = 1 << 18;
        const CANT_WAIT = 1 << 19;
    }
}

impl RecordFlags {
    #[must_use]
    pub fn esm(&self) -> bool {
        self.contains(Self::ESM)
    }

    #[must_use]
    pub fn deleted(&self) -> bool {
        self.contains(Self::DELETED)
    }

    #[must_use]
    pub fn persistent(&self) -> bool {
        self.contains(Self::PERSISTENT)
    }

    #[must_use]
    pub fn compressed(&self) -> bool {
        self.contains(Self::COMPRESSED)
    }
}

pub(crate) mod constants {
    pub const RECORD_HEADER_SIZE: u32 = 20;
    pub const GROUP_HEADER_SIZE: u32 = 20;
    pub const FIELD_HEADER_SIZE: usize = 6;

    // worldspaces, the deepest part of a plugin, nest six levels
    pub const MAX_GROUP_DEPTH: usize = 64;
}

/// A typed field of a record.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SubRecord {
    pub tag: Tag,
    pub data: Vec<u8>,
}

impl SubRecord {
    #[must_use]
    pub fn new(tag: impl Into<Tag>, data: Vec<u8>) -> Self {
        Self {
            tag: tag.into(),
            data,
        }
    }

    /// The number of bytes this field occupies once written, including an `XXXX` carrier if
    /// the payload does not fit a 16-bit size.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        let carrier = if self.data.len() > usize::from(u16::MAX) {
            constants::FIELD_HEADER_SIZE + 4
        } else {
            0
        };
        carrier + constants::FIELD_HEADER_SIZE + self.data.len()
    }
}

/// The body of a compressed record, exactly as it was stored.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Packed {
    pub decompressed_len: u32,
    pub bytes: Vec<u8>,
}

/// A single record: a header and its fields.
///
/// Compressed records read with [`CompressedPolicy::KeepRaw`](crate::esp::CompressedPolicy)
/// hold their stored bytes instead of fields until something asks for the fields. A record
/// never holds both.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Record {
    pub(crate) tag: Tag,
    pub(crate) data_size: u32,
    pub flags: RecordFlags,
    pub form_id: u32,
    pub version: u32,
    pub(crate) fields: Vec<SubRecord>,
    pub(crate) packed: Option<Packed>,
}

impl Record {
    #[must_use]
    pub fn new(tag: impl Into<Tag>, form_id: u32) -> Self {
        Self {
            tag: tag.into(),
            form_id,
            ..Default::default()
        }
    }

    /// The record type, e.g. `NPC_`.
    #[must_use]
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// The body size as last read or as computed by the last size update.
    #[must_use]
    pub fn data_size(&self) -> u32 {
        self.data_size
    }

    #[must_use]
    pub fn is_compressed(&self) -> bool {
        self.flags.compressed()
    }

    /// Whether the body is still in its stored, compressed form.
    #[must_use]
    pub fn is_packed(&self) -> bool {
        self.packed.is_some()
    }

    #[must_use]
    pub fn packed(&self) -> Option<&Packed> {
        self.packed.as_ref()
    }

    /// The decoded fields. A packed record has none until it is [unpacked](Record::unpack).
    #[must_use]
    pub fn fields(&self) -> &[SubRecord] {
        &self.fields
    }

    /// The decoded fields, unpacking the body first if needed.
    pub fn fields_mut(&mut self) -> Result<&mut Vec<SubRecord>> {
        self.unpack()?;
        Ok(&mut self.fields)
    }

    /// Inflates and parses a packed body in place. Does nothing for an unpacked record.
    ///
    /// On failure the record keeps its packed body.
    pub fn unpack(&mut self) -> Result<()> {
        if let Some(packed) = &self.packed {
            let bytes = compression::inflate(&packed.bytes, packed.decompressed_len as usize)?;
            self.fields = super::read::parse_fields(&bytes)?;
            self.packed = None;
        }
        Ok(())
    }

    /// Appends a field, unpacking the body first if needed.
    pub fn push_field(&mut self, tag: impl Into<Tag>, data: Vec<u8>) -> Result<()> {
        self.fields_mut()?.push(SubRecord::new(tag, data));
        Ok(())
    }
}
