//! Oblivion's data files come in two flavors: [`bsa`] archives, which bundle loose assets,
//! and [`esp`] plugins, which hold the game's records. On top of those, [`load_order`] and
//! [`formid`] resolve records across every plugin an installation loads.
//!
//! All file access goes through the [`vfs::Storage`] contract, and nothing prints: readers
//! report what they see to an [`observer::Observer`], which forwards to [`log`] by default.

#![warn(
    clippy::pedantic,
    clippy::single_char_lifetime_names,
    clippy::std_instead_of_core
)]
#![allow(
    unknown_lints,
    clippy::enum_glob_use,
    clippy::missing_errors_doc,
    clippy::struct_field_names
)]

pub mod bsa;
mod compression;
mod error;
pub mod esp;
pub mod formid;
mod hashing;
mod io;
pub mod load_order;
pub mod observer;
mod strings;
#[cfg(test)]
mod testing;
pub mod vfs;

pub use bstr::{BStr, BString, ByteSlice, ByteVec};
pub use error::{Error, ErrorKind, Result};

pub mod prelude {
    pub use crate::vfs::Storage as _;
}
