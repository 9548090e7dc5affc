use crate::{Error, Result};
use flate2::{write::ZlibEncoder, Compression, Decompress, FlushDecompress, Status};
use std::io::Write;

/// The zlib level Oblivion's own tools compress records with.
pub(crate) const DEFAULT_LEVEL: u32 = 6;

const MIN_CAPACITY: usize = 0x1000;

/// Inflates a zlib stream that must decode to exactly `decompressed_len` bytes.
///
/// Anything short of a complete stream is an error, there is no partial output. The output
/// buffer starts out sized from the input and grows as the stream produces data, so an
/// untrusted length can not force a huge allocation up front.
pub(crate) fn inflate(input: &[u8], decompressed_len: usize) -> Result<Vec<u8>> {
    // one spare byte so an oversized stream shows up as a size mismatch
    let limit = decompressed_len.saturating_add(1);
    let initial = input.len().saturating_mul(4).max(MIN_CAPACITY);
    let mut out = Vec::with_capacity(initial.min(limit));
    let mut d = Decompress::new(true);

    loop {
        let consumed = usize::try_from(d.total_in())?;
        let status = d
            .decompress_vec(&input[consumed..], &mut out, FlushDecompress::Finish)
            .map_err(|_| Error::DecompressionFailed)?;

        match status {
            Status::StreamEnd if out.len() == decompressed_len => return Ok(out),
            Status::StreamEnd => break,
            Status::Ok | Status::BufError if out.len() >= limit => break,
            Status::Ok | Status::BufError if out.len() == out.capacity() => {
                let grow = out.capacity().min(limit - out.len());
                out.reserve_exact(grow);
            }
            Status::Ok | Status::BufError => return Err(Error::DecompressionFailed),
        }
    }

    Err(Error::DecompressionSizeMismatch {
        expected: decompressed_len,
        actual: out.len(),
    })
}

pub(crate) fn deflate(input: &[u8], level: u32) -> Result<Vec<u8>> {
    let mut e = ZlibEncoder::new(Vec::new(), Compression::new(level));
    e.write_all(input)?;
    Ok(e.finish()?)
}
