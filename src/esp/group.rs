use crate::esp::{Record, Tag};

/// What a group's label means, decoded from its signed type field.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GroupKind {
    /// A top-level group. The label is the record type it holds.
    Top,
    /// The label is a parent worldspace form id.
    WorldChildren,
    /// The label is a block number.
    InteriorCellBlock,
    /// The label is a sub-block number.
    InteriorCellSubBlock,
    /// The label packs the block's grid `y` and `x`.
    ExteriorCellBlock,
    /// The label packs the sub-block's grid `y` and `x`.
    ExteriorCellSubBlock,
    /// The label is a parent cell form id.
    CellChildren,
    /// The label is a parent dialog topic form id.
    TopicChildren,
    CellPersistentChildren,
    CellTemporaryChildren,
    CellVisibleDistantChildren,
    /// A type no known game writes.
    Unknown(i32),
}

impl From<i32> for GroupKind {
    fn from(value: i32) -> Self {
        match value {
            0 => Self::Top,
            1 => Self::WorldChildren,
            2 => Self::InteriorCellBlock,
            3 => Self::InteriorCellSubBlock,
            4 => Self::ExteriorCellBlock,
            5 => Self::ExteriorCellSubBlock,
            6 => Self::CellChildren,
            7 => Self::TopicChildren,
            8 => Self::CellPersistentChildren,
            9 => Self::CellTemporaryChildren,
            10 => Self::CellVisibleDistantChildren,
            x => Self::Unknown(x),
        }
    }
}

/// A child of a group.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Node {
    Group(Box<Group>),
    Record(Box<Record>),
}

impl Node {
    #[must_use]
    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Self::Group(x) => Some(&**x),
            Self::Record(_) => None,
        }
    }

    #[must_use]
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Group(_) => None,
            Self::Record(x) => Some(&**x),
        }
    }
}

impl From<Group> for Node {
    fn from(value: Group) -> Self {
        Self::Group(Box::new(value))
    }
}

impl From<Record> for Node {
    fn from(value: Record) -> Self {
        Self::Record(Box::new(value))
    }
}

/// A group of records and nested groups.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Group {
    pub label: Tag,
    pub group_type: i32,
    pub stamp: u32,
    pub(crate) size: u32,
    pub children: Vec<Node>,
}

impl Group {
    #[must_use]
    pub fn new(label: impl Into<Tag>, group_type: i32) -> Self {
        Self {
            label: label.into(),
            group_type,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn kind(&self) -> GroupKind {
        self.group_type.into()
    }

    /// The size in bytes, header included, as last read or computed by the last size update.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// The records directly inside this group.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.children.iter().filter_map(Node::as_record)
    }

    /// The groups directly inside this group.
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.children.iter().filter_map(Node::as_group)
    }
}
