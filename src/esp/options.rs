use crate::{
    compression,
    observer::{LogObserver, Observer},
};
use core::fmt::{self, Debug, Formatter};
use std::sync::Arc;

/// What to do with records whose body is stored compressed.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CompressedPolicy {
    /// Keep the stored bytes untouched. They are written back as-is unless the record is
    /// unpacked in between.
    KeepRaw,
    /// Inflate the body and parse its fields like any other record.
    #[default]
    FullyDecode,
}

#[derive(Debug, Default)]
#[repr(transparent)]
pub struct ReadOptionsBuilder(ReadOptions);

impl ReadOptionsBuilder {
    #[must_use]
    pub fn build(self) -> ReadOptions {
        self.0
    }

    #[must_use]
    pub fn compressed_policy(mut self, compressed_policy: CompressedPolicy) -> Self {
        self.0.compressed_policy = compressed_policy;
        self
    }

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.0.observer = observer;
        self
    }
}

/// Parameters to configure how plugins are read.
///
/// ```rust
/// use tes4data::esp::{CompressedPolicy, ReadOptions};
///
/// // Leave compressed records alone, e.g. to patch a few uncompressed ones
/// let _ = ReadOptions::builder()
///     .compressed_policy(CompressedPolicy::KeepRaw)
///     .build();
/// ```
#[derive(Clone)]
pub struct ReadOptions {
    compressed_policy: CompressedPolicy,
    observer: Arc<dyn Observer>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            compressed_policy: CompressedPolicy::default(),
            observer: Arc::new(LogObserver),
        }
    }
}

impl Debug for ReadOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadOptions")
            .field("compressed_policy", &self.compressed_policy)
            .finish_non_exhaustive()
    }
}

impl ReadOptions {
    #[must_use]
    pub fn builder() -> ReadOptionsBuilder {
        ReadOptionsBuilder::new()
    }

    #[must_use]
    pub fn compressed_policy(&self) -> CompressedPolicy {
        self.compressed_policy
    }

    #[must_use]
    pub fn observer(&self) -> &dyn Observer {
        &*self.observer
    }
}

#[derive(Clone, Copy, Debug, Default)]
#[repr(transparent)]
pub struct WriteOptionsBuilder(WriteOptions);

impl WriteOptionsBuilder {
    #[must_use]
    pub fn build(self) -> WriteOptions {
        self.0
    }

    /// The zlib level, from 0 to 9, used for records flagged as compressed.
    #[must_use]
    pub fn compression_level(mut self, compression_level: u32) -> Self {
        self.0.compression_level = compression_level.min(9);
        self
    }

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Parameters to configure how plugins are written.
///
/// ```rust
/// use tes4data::esp::WriteOptions;
///
/// assert_eq!(WriteOptions::default().compression_level(), 6);
/// let _ = WriteOptions::builder().compression_level(9).build();
/// ```
#[derive(Clone, Copy, Debug)]
pub struct WriteOptions {
    compression_level: u32,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            compression_level: compression::DEFAULT_LEVEL,
        }
    }
}

impl WriteOptions {
    #[must_use]
    pub fn builder() -> WriteOptionsBuilder {
        WriteOptionsBuilder::new()
    }

    #[must_use]
    pub fn compression_level(&self) -> u32 {
        self.compression_level
    }
}
