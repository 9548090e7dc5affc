//! Typed access to the fields of a [`Record`].
//!
//! Every lookup matches the four character tag exactly and stops at the first hit, unless
//! it takes an occurrence index.

use crate::{
    esp::{Record, SubRecord, Tag},
    Error, Result,
};
use bstr::BString;

/// Returned by [`Record::get_reference`] when there is nothing to return.
pub const NO_REFERENCE: u32 = 0xFFFF_FFFF;

/// Drops the terminator of a stored string.
pub(crate) fn trim_terminator(data: &[u8]) -> &[u8] {
    match data.split_last() {
        Some((_, text)) => text,
        None => data,
    }
}

/// Decodes hex digits right to left, two at a time, the right digit of each pair being the
/// low nibble. Parsing stops at the first non-hex character and an unpaired digit is lost.
pub(crate) fn parse_reversed_hex(hex: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(hex.len() / 2);
    let mut low = None;
    for &c in hex.iter().rev() {
        let Some(n) = char::from(c).to_digit(16) else {
            break;
        };
        // a hex digit is always < 16
        #[allow(clippy::cast_possible_truncation)]
        let n = n as u8;
        match low.take() {
            None => low = Some(n),
            Some(low) => bytes.push(low | (n << 4)),
        }
    }
    bytes
}

impl Record {
    fn field(&self, tag: Tag) -> Option<&SubRecord> {
        self.fields.iter().find(|x| x.tag == tag)
    }

    fn field_mut(&mut self, tag: Tag) -> Result<&mut SubRecord> {
        self.fields_mut()?
            .iter_mut()
            .find(|x| x.tag == tag)
            .ok_or(Error::MissingField(tag))
    }

    #[must_use]
    pub fn has(&self, tag: impl Into<Tag>) -> bool {
        self.field(tag.into()).is_some()
    }

    /// The field's payload without its trailing terminator. Empty if the field is missing.
    #[must_use]
    pub fn get_string(&self, tag: impl Into<Tag>) -> BString {
        self.field(tag.into())
            .map(|x| trim_terminator(&x.data).into())
            .unwrap_or_default()
    }

    /// The field's payload. Empty if the field is missing.
    #[must_use]
    pub fn get_bytes(&self, tag: impl Into<Tag>) -> Vec<u8> {
        self.field(tag.into())
            .map(|x| x.data.clone())
            .unwrap_or_default()
    }

    /// The form id stored at the start of the `occurrence`-th (from 0) field with the given
    /// tag.
    #[must_use]
    pub fn reference(&self, tag: impl Into<Tag>, occurrence: usize) -> Option<u32> {
        let tag = tag.into();
        let field = self.fields.iter().filter(|x| x.tag == tag).nth(occurrence)?;
        let bytes = field.data.get(..4)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Like [`Record::reference`], but falls back to [`NO_REFERENCE`].
    #[must_use]
    pub fn get_reference(&self, tag: impl Into<Tag>, occurrence: usize) -> u32 {
        self.reference(tag, occurrence).unwrap_or(NO_REFERENCE)
    }

    /// Replaces the field's payload with `text` and a terminator.
    pub fn set_string(&mut self, tag: impl Into<Tag>, text: &[u8]) -> Result<()> {
        let field = self.field_mut(tag.into())?;
        field.data.clear();
        field.data.extend_from_slice(text);
        field.data.push(b'\0');
        Ok(())
    }

    pub fn set_bytes(&mut self, tag: impl Into<Tag>, bytes: &[u8]) -> Result<()> {
        let field = self.field_mut(tag.into())?;
        field.data.clear();
        field.data.extend_from_slice(bytes);
        Ok(())
    }

    /// Replaces the field's payload with the bytes parsed from `hex`, read right to left.
    ///
    /// ```rust
    /// use tes4data::esp::Record;
    ///
    /// let mut record = Record::new(b"LIGH", 0x14);
    /// record.push_field(b"DATA", vec![0; 2])?;
    /// record.set_hex_string(b"DATA", "1A2B")?;
    /// assert_eq!(record.get_bytes(b"DATA"), [0x2B, 0x1A]);
    /// # Ok::<(), tes4data::Error>(())
    /// ```
    pub fn set_hex_string<S>(&mut self, tag: impl Into<Tag>, hex: &S) -> Result<()>
    where
        S: ?Sized + AsRef<[u8]>,
    {
        let bytes = parse_reversed_hex(hex.as_ref());
        self.set_bytes(tag, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        esp::{fields::parse_reversed_hex, Record, NO_REFERENCE},
        Error, ErrorKind,
    };

    fn npc() -> anyhow::Result<Record> {
        let mut record = Record::new(b"NPC_", 0x0001_4A2B);
        record.push_field(b"EDID", b"Baurus\0".to_vec())?;
        record.push_field(b"SNAM", vec![0x3A, 0x00, 0x0B, 0x00, 0xFF])?;
        record.push_field(b"SNAM", vec![0xCD, 0xAB, 0x00, 0x00])?;
        record.push_field(b"FULL", Vec::new())?;
        record.push_field(b"SCRI", vec![1, 2])?;
        Ok(record)
    }

    #[test]
    fn getters() -> anyhow::Result<()> {
        let record = npc()?;
        assert_eq!(record.tag(), b"NPC_");
        assert!(record.has(b"EDID"));
        assert!(!record.has(b"edid"));
        assert_eq!(record.get_string(b"EDID"), "Baurus");
        assert_eq!(record.get_string(b"FULL"), "");
        assert_eq!(record.get_string(b"MODL"), "");
        assert_eq!(record.get_bytes(b"SCRI"), [1, 2]);
        assert!(record.get_bytes(b"MODL").is_empty());
        Ok(())
    }

    #[test]
    fn references() -> anyhow::Result<()> {
        let record = npc()?;
        assert_eq!(record.get_reference(b"SNAM", 0), 0x000B_003A);
        assert_eq!(record.get_reference(b"SNAM", 1), 0x0000_ABCD);
        assert_eq!(record.get_reference(b"SNAM", 2), NO_REFERENCE);
        assert_eq!(record.get_reference(b"XOWN", 0), NO_REFERENCE);
        assert_eq!(record.reference(b"SCRI", 0), None);
        Ok(())
    }

    #[test]
    fn setters() -> anyhow::Result<()> {
        let mut record = npc()?;
        record.set_string(b"EDID", b"Glenroy")?;
        assert_eq!(record.get_bytes(b"EDID"), b"Glenroy\0");
        assert_eq!(record.get_string(b"EDID"), "Glenroy");

        record.set_bytes(b"SNAM", &[9, 9, 9, 9])?;
        assert_eq!(record.get_reference(b"SNAM", 0), 0x0909_0909);
        assert_eq!(record.get_reference(b"SNAM", 1), 0x0000_ABCD);

        let err = record.set_string(b"MODL", b"x.nif").unwrap_err();
        assert!(matches!(&err, Error::MissingField(tag) if *tag == b"MODL"));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!record.has(b"MODL"));
        Ok(())
    }

    #[test]
    fn reversed_hex() {
        assert_eq!(parse_reversed_hex(b"1A2B"), [0x2B, 0x1A]);
        assert_eq!(parse_reversed_hex(b"ff00aB"), [0xAB, 0x00, 0xFF]);
        assert_eq!(parse_reversed_hex(b"ABC"), [0xBC]);
        assert_eq!(parse_reversed_hex(b"12G34"), [0x34]);
        assert!(parse_reversed_hex(b"").is_empty());
        assert!(parse_reversed_hex(b"0x").is_empty());
    }

    #[test]
    fn hex_setter() -> anyhow::Result<()> {
        let mut record = npc()?;
        record.set_hex_string(b"SCRI", "0001E1C5")?;
        assert_eq!(record.get_bytes(b"SCRI"), [0xC5, 0xE1, 0x01, 0x00]);
        assert_eq!(record.get_reference(b"SCRI", 0), 0x0001_E1C5);
        Ok(())
    }
}
