use core::mem;
use std::io::{self, Read, Seek, SeekFrom, Write};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Endian {
    Little,
    Big,
}

pub(crate) trait BinaryReadable {
    type Item;

    fn from_stream<In>(stream: &mut In, endian: Endian) -> io::Result<Self::Item>
    where
        In: ?Sized + Read;
}

pub(crate) trait BinaryWriteable {
    type Item: ?Sized;

    fn to_stream<Out>(stream: &mut Out, item: &Self::Item, endian: Endian) -> io::Result<()>
    where
        Out: ?Sized + Write;
}

macro_rules! make_binary_streamable {
    ($t:ty) => {
        impl BinaryReadable for $t {
            type Item = $t;

            fn from_stream<In>(stream: &mut In, endian: Endian) -> io::Result<Self::Item>
            where
                In: ?Sized + Read,
            {
                let mut bytes = [0u8; mem::size_of::<Self::Item>()];
                stream.read_exact(&mut bytes)?;
                Ok(match endian {
                    Endian::Little => Self::from_le_bytes(bytes),
                    Endian::Big => Self::from_be_bytes(bytes),
                })
            }
        }

        impl BinaryWriteable for $t {
            type Item = $t;

            fn to_stream<Out>(stream: &mut Out, item: &Self::Item, endian: Endian) -> io::Result<()>
            where
                Out: ?Sized + Write,
            {
                let bytes = match endian {
                    Endian::Little => item.to_le_bytes(),
                    Endian::Big => item.to_be_bytes(),
                };
                stream.write_all(&bytes)
            }
        }
    };
}

make_binary_streamable!(u8);
make_binary_streamable!(u16);
make_binary_streamable!(u32);
make_binary_streamable!(u64);
make_binary_streamable!(i32);

// tags and labels are raw byte runs, endianness does not apply
impl<const N: usize> BinaryReadable for [u8; N] {
    type Item = [u8; N];

    fn from_stream<In>(stream: &mut In, _: Endian) -> io::Result<Self::Item>
    where
        In: ?Sized + Read,
    {
        let mut bytes = [0u8; N];
        stream.read_exact(&mut bytes)?;
        Ok(bytes)
    }
}

impl<const N: usize> BinaryWriteable for [u8; N] {
    type Item = [u8; N];

    fn to_stream<Out>(stream: &mut Out, item: &Self::Item, _: Endian) -> io::Result<()>
    where
        Out: ?Sized + Write,
    {
        stream.write_all(item)
    }
}

macro_rules! make_binary_streamable_tuple {
    ($($idx:tt $t:ident),+) => {
        impl<$($t,)+> BinaryReadable for ($($t,)+)
        where
            $($t: BinaryReadable,)+
        {
            type Item = ($($t::Item,)+);

            fn from_stream<In>(stream: &mut In, endian: Endian) -> io::Result<Self::Item>
            where
                In: ?Sized + Read,
            {
                Ok(($(
                    $t::from_stream(stream, endian)?,
                )+))
            }
        }

        impl<$($t,)+> BinaryWriteable for ($($t,)+)
        where
            $($t: BinaryWriteable, $t::Item: Sized,)+
        {
            type Item = ($($t::Item,)+);

            fn to_stream<Out>(stream: &mut Out, item: &Self::Item, endian: Endian) -> io::Result<()>
            where
                Out: ?Sized + Write,
            {
                $(
                    $t::to_stream(stream, &item.$idx, endian)?;
                )+
                Ok(())
            }
        }
    };
}

make_binary_streamable_tuple!(0 T0, 1 T1);
make_binary_streamable_tuple!(0 T0, 1 T1, 2 T2);
make_binary_streamable_tuple!(0 T0, 1 T1, 2 T2, 3 T3);
make_binary_streamable_tuple!(0 T0, 1 T1, 2 T2, 3 T3, 4 T4);
make_binary_streamable_tuple!(0 T0, 1 T1, 2 T2, 3 T3, 4 T4, 5 T5);
make_binary_streamable_tuple!(0 T0, 1 T1, 2 T2, 3 T3, 4 T4, 5 T5, 6 T6);
make_binary_streamable_tuple!(0 T0, 1 T1, 2 T2, 3 T3, 4 T4, 5 T5, 6 T6, 7 T7);
make_binary_streamable_tuple!(0 T0, 1 T1, 2 T2, 3 T3, 4 T4, 5 T5, 6 T6, 7 T7, 8 T8);

pub(crate) struct Source<'stream, R>
where
    R: ?Sized,
{
    stream: &'stream mut R,
}

impl<'stream, R> Source<'stream, R>
where
    R: ?Sized + Read + Seek,
{
    pub(crate) fn new(stream: &'stream mut R) -> Self {
        Self { stream }
    }

    pub(crate) fn read<T>(&mut self, endian: Endian) -> io::Result<T>
    where
        T: BinaryReadable<Item = T>,
    {
        T::from_stream(&mut *self.stream, endian)
    }

    pub(crate) fn read_protocol<T>(&mut self, endian: Endian) -> io::Result<T::Item>
    where
        T: BinaryReadable,
    {
        T::from_stream(&mut *self.stream, endian)
    }

    /// Reads exactly `len` bytes, growing the buffer as data arrives so a corrupt length can
    /// not force a huge allocation up front.
    pub(crate) fn read_bytes(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut bytes = Vec::new();
        Read::take(&mut *self.stream, len as u64).read_to_end(&mut bytes)?;
        if bytes.len() == len {
            Ok(bytes)
        } else {
            Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("expected {len} bytes, but only {} remained", bytes.len()),
            ))
        }
    }

    /// Looks at the next four bytes without consuming them.
    ///
    /// Returns `None` on a clean end of stream, and an `UnexpectedEof` error when the stream
    /// ends partway through the tag.
    pub(crate) fn peek_tag(&mut self) -> io::Result<Option<[u8; 4]>> {
        let mut tag = [0u8; 4];
        let mut filled = 0;
        while filled < tag.len() {
            match self.stream.read(&mut tag[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => (),
                Err(err) => return Err(err),
            }
        }

        match filled {
            0 => Ok(None),
            4 => {
                self.stream.seek(SeekFrom::Current(-4))?;
                Ok(Some(tag))
            }
            _ => Err(io::ErrorKind::UnexpectedEof.into()),
        }
    }

    pub(crate) fn seek_absolute(&mut self, pos: u64) -> io::Result<()> {
        self.stream.seek(SeekFrom::Start(pos)).map(|_| ())
    }

    pub(crate) fn stream_position(&mut self) -> io::Result<u64> {
        self.stream.stream_position()
    }
}

pub(crate) struct Sink<'stream, W>
where
    W: ?Sized,
{
    stream: &'stream mut W,
}

impl<'stream, W> Sink<'stream, W>
where
    W: ?Sized + Write,
{
    pub(crate) fn new(stream: &'stream mut W) -> Self {
        Self { stream }
    }

    pub(crate) fn write<T>(&mut self, item: &T, endian: Endian) -> io::Result<()>
    where
        T: BinaryWriteable<Item = T>,
    {
        T::to_stream(&mut *self.stream, item, endian)
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes)
    }
}
