use bstr::BStr;
use core::fmt::{self, Debug, Display, Formatter};

/// A four character code naming a record, group, or sub-record type, e.g. `EDID`.
#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(transparent)]
pub struct Tag(pub [u8; 4]);

impl Tag {
    /// The tag every group header starts with.
    pub const GROUP: Self = Self(*b"GRUP");

    /// Carries the true length of the oversized sub-record that follows it.
    pub const XXXX: Self = Self(*b"XXXX");

    /// The plugin header record.
    pub const HEADER: Self = Self(*b"TES4");

    /// A master file sub-record of the plugin header.
    pub const MASTER: Self = Self(*b"MAST");

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl From<[u8; 4]> for Tag {
    fn from(value: [u8; 4]) -> Self {
        Self(value)
    }
}

impl From<&[u8; 4]> for Tag {
    fn from(value: &[u8; 4]) -> Self {
        Self(*value)
    }
}

impl From<Tag> for [u8; 4] {
    fn from(value: Tag) -> Self {
        value.0
    }
}

impl PartialEq<[u8; 4]> for Tag {
    fn eq(&self, other: &[u8; 4]) -> bool {
        self.0 == *other
    }
}

impl PartialEq<&[u8; 4]> for Tag {
    fn eq(&self, other: &&[u8; 4]) -> bool {
        self.0 == **other
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(BStr::new(&self.0), f)
    }
}

impl Debug for Tag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(BStr::new(&self.0), f)
    }
}

#[cfg(test)]
mod tests {
    use crate::esp::Tag;

    #[test]
    fn formatting() {
        let tag = Tag::from(b"EDID");
        assert_eq!(tag.to_string(), "EDID");
        assert_eq!(format!("{tag:?}"), "\"EDID\"");
        assert_eq!(Tag::from([b'X', 0, b'Y', 0xFF]).to_string(), "X\0Y\u{FFFD}");
    }

    #[test]
    fn compares_against_raw_codes() {
        assert_eq!(Tag::GROUP, *b"GRUP");
        assert_eq!(Tag::XXXX, b"XXXX");
        assert_ne!(Tag::HEADER, b"TES3");
    }
}
