use crate::io::{BinaryReadable, Endian};
use bstr::BString as ByteString;
use std::io::{self, Read};

/// A string prefixed by a one byte length, with no terminator.
pub(crate) struct BString;

impl BinaryReadable for BString {
    type Item = ByteString;

    fn from_stream<In>(stream: &mut In, endian: Endian) -> io::Result<Self::Item>
    where
        In: ?Sized + Read,
    {
        let len = u8::from_stream(stream, endian)?;
        let mut bytes = vec![0u8; len.into()];
        stream.read_exact(&mut bytes)?;
        Ok(bytes.into())
    }
}

/// A string prefixed by a one byte length, where the length counts a trailing null terminator.
pub(crate) struct BZString;

impl BinaryReadable for BZString {
    type Item = ByteString;

    fn from_stream<In>(stream: &mut In, endian: Endian) -> io::Result<Self::Item>
    where
        In: ?Sized + Read,
    {
        let mut bytes = BString::from_stream(stream, endian)?;
        if bytes.last() == Some(&b'\0') {
            bytes.pop();
        }
        Ok(bytes)
    }
}

/// A null terminated string.
pub(crate) struct ZString;

impl BinaryReadable for ZString {
    type Item = ByteString;

    fn from_stream<In>(stream: &mut In, endian: Endian) -> io::Result<Self::Item>
    where
        In: ?Sized + Read,
    {
        let mut result = Vec::new();
        loop {
            match u8::from_stream(stream, endian)? {
                0 => break,
                byte => result.push(byte),
            }
        }
        Ok(result.into())
    }
}
