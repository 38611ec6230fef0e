//! Plain (uncompressed) codec: reads/seeks pass straight through to the
//! underlying [`ByteSource`]. No cache is used since there is nothing to
//! decode.

use crate::io::ByteSource;

pub fn file_size(source: &dyn ByteSource) -> u64 {
    source.len()
}

pub fn read(source: &dyn ByteSource, location: u64, buf: &mut [u8]) -> std::io::Result<usize> {
    let file_size = source.len();
    if location >= file_size {
        return Ok(0);
    }
    let n = ((file_size - location) as usize).min(buf.len());
    let data = source.read_at(location, n)?;
    buf[..n].copy_from_slice(&data);
    Ok(n)
}
