use crate::{
    compression,
    esp::{
        record::constants, CompressedPolicy, Group, Node, Packed, ReadOptions, Record,
        RecordFlags, SubRecord, Tag,
    },
    io::{Endian, Source},
    observer::Event,
    Error, Result,
};
use std::io::{self, Read, Seek};

/// Decodes whatever block comes next, and how many bytes it spanned.
///
/// `depth` is the number of groups enclosing the block. Returns `None` at a clean end of
/// stream.
pub(crate) fn read_node<R>(
    source: &mut Source<R>,
    options: &ReadOptions,
    depth: usize,
) -> Result<Option<(Node, u64)>>
where
    R: ?Sized + Read + Seek,
{
    let tag = match source.peek_tag() {
        Ok(Some(tag)) => tag,
        Ok(None) => return Ok(None),
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Err(Error::Truncated),
        Err(err) => return Err(err.into()),
    };

    if Tag::GROUP == tag {
        let group = Group::read(source, options, depth + 1)?;
        let consumed = group.size.into();
        Ok(Some((group.into(), consumed)))
    } else {
        let record = Record::read(source, options)?;
        let consumed = u64::from(constants::RECORD_HEADER_SIZE) + u64::from(record.data_size);
        Ok(Some((record.into(), consumed)))
    }
}

impl Group {
    /// Reads a group nested `depth` levels deep, counting itself.
    pub(crate) fn read<R>(
        source: &mut Source<R>,
        options: &ReadOptions,
        depth: usize,
    ) -> Result<Self>
    where
        R: ?Sized + Read + Seek,
    {
        if depth > constants::MAX_GROUP_DEPTH {
            return Err(Error::GroupTooDeep(constants::MAX_GROUP_DEPTH));
        }

        let (_, size, label, group_type, stamp): ([u8; 4], u32, [u8; 4], i32, u32) =
            source.read(Endian::Little)?;
        if size < constants::GROUP_HEADER_SIZE {
            return Err(Error::InvalidGroupSize(size));
        }

        let body = u64::from(size - constants::GROUP_HEADER_SIZE);
        let mut children = Vec::new();
        let mut consumed = 0u64;
        while consumed < body {
            let (node, len) = read_node(source, options, depth)?.ok_or(Error::Truncated)?;
            consumed += len;
            children.push(node);
        }

        if consumed != body {
            return Err(Error::GroupOverrun {
                declared: size,
                actual: consumed + u64::from(constants::GROUP_HEADER_SIZE),
            });
        }

        let label = Tag(label);
        options.observer().notify(&Event::GroupDecoded {
            label,
            group_type,
            size,
        });

        Ok(Self {
            label,
            group_type,
            stamp,
            size,
            children,
        })
    }
}

impl Record {
    pub(crate) fn read<R>(source: &mut Source<R>, options: &ReadOptions) -> Result<Self>
    where
        R: ?Sized + Read + Seek,
    {
        let (tag, data_size, flags, form_id, version): ([u8; 4], u32, u32, u32, u32) =
            source.read(Endian::Little)?;
        let tag = Tag(tag);
        let flags = RecordFlags::from_bits_retain(flags);
        let mut bytes = source.read_bytes(data_size.try_into()?)?;

        let mut result = Self {
            tag,
            data_size,
            flags,
            form_id,
            version,
            fields: Vec::new(),
            packed: None,
        };

        if flags.compressed() {
            let Some(prefix) = bytes.get(..4) else {
                return Err(Error::Truncated);
            };
            let mut decompressed_len = [0u8; 4];
            decompressed_len.copy_from_slice(prefix);
            let decompressed_len = u32::from_le_bytes(decompressed_len);
            bytes.drain(..4);

            match options.compressed_policy() {
                CompressedPolicy::KeepRaw => {
                    result.packed = Some(Packed {
                        decompressed_len,
                        bytes,
                    });
                }
                CompressedPolicy::FullyDecode => {
                    let bytes = compression::inflate(&bytes, decompressed_len.try_into()?)?;
                    result.fields = parse_fields(&bytes)?;
                }
            }
        } else {
            result.fields = parse_fields(&bytes)?;
        }

        options.observer().notify(&Event::RecordDecoded {
            tag,
            form_id,
            size: data_size,
            compressed: flags.compressed(),
        });

        Ok(result)
    }
}

fn field_header(bytes: &[u8], pos: usize) -> Result<(Tag, usize)> {
    let header = bytes
        .get(pos..pos + constants::FIELD_HEADER_SIZE)
        .ok_or(Error::Truncated)?;
    let tag = Tag([header[0], header[1], header[2], header[3]]);
    let size = u16::from_le_bytes([header[4], header[5]]);
    Ok((tag, size.into()))
}

fn take_field(bytes: &[u8], tag: Tag, start: usize, len: usize) -> Result<(SubRecord, usize)> {
    let end = start.checked_add(len).ok_or(Error::IntegralTruncation)?;
    match bytes.get(start..end) {
        Some(data) => Ok((
            SubRecord {
                tag,
                data: data.to_vec(),
            },
            end,
        )),
        None => Err(Error::SubRecordOverrun {
            tag,
            overrun: end - bytes.len(),
        }),
    }
}

/// Splits a record body into its fields.
///
/// An `XXXX` field followed by a zero sized field supplies that field's real length, and is
/// dropped from the result.
pub(crate) fn parse_fields(bytes: &[u8]) -> Result<Vec<SubRecord>> {
    let mut fields = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        let (tag, size) = field_header(bytes, pos)?;
        let start = pos + constants::FIELD_HEADER_SIZE;

        if tag == Tag::XXXX && size == 4 {
            let next = start + 4;
            if let (Some(carried), Ok((next_tag, 0))) =
                (bytes.get(start..next), field_header(bytes, next))
            {
                let carried = u32::from_le_bytes([carried[0], carried[1], carried[2], carried[3]]);
                let (field, end) = take_field(
                    bytes,
                    next_tag,
                    next + constants::FIELD_HEADER_SIZE,
                    carried.try_into()?,
                )?;
                fields.push(field);
                pos = end;
                continue;
            }
        }

        let (field, end) = take_field(bytes, tag, start, size)?;
        fields.push(field);
        pos = end;
    }

    Ok(fields)
}
