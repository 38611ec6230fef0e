//! EBZIP1 codec: deflate-compressed slices preceded by a small header and an
//! index table of blob offsets.

use std::io::Read;

use crate::error::{Error, Result};
use crate::io::ByteSource;

pub const HEADER_SIZE: u64 = 22;
pub const MAX_ZIP_LEVEL: u8 = 3;
const MAGIC: &[u8; 5] = b"EBZip";

#[derive(Debug, Clone)]
pub struct EbzipParams {
    pub zip_level: u8,
    pub slice_size: u64,
    pub file_size: u64,
    pub crc: u32,
    pub mtime: u32,
    pub index_width: u8,
}

impl EbzipParams {
    /// Parse the 22-byte EBZIP1 header. Does not touch the index table.
    pub fn parse(header: &[u8]) -> Result<Self> {
        if header.len() < HEADER_SIZE as usize || &header[0..5] != MAGIC {
            return Err(Error::UnexpectedFormat("bad EBZIP magic".into()));
        }
        let code = header[5] >> 4;
        if code != 1 {
            return Err(Error::UnexpectedFormat(format!(
                "unsupported EBZIP codec id {code}"
            )));
        }
        let zip_level = header[5] & 0x0f;
        if zip_level > MAX_ZIP_LEVEL {
            return Err(Error::UnexpectedFormat(format!(
                "EBZIP zip level {zip_level} exceeds maximum {MAX_ZIP_LEVEL}"
            )));
        }
        let slice_size = 2048u64 << zip_level;

        let file_size = u32::from_be_bytes(header[10..14].try_into().unwrap()) as u64;
        let crc = u32::from_be_bytes(header[14..18].try_into().unwrap());
        let mtime = u32::from_be_bytes(header[18..22].try_into().unwrap());

        let index_width = if file_size < 1 << 16 {
            2
        } else if file_size < 1 << 24 {
            3
        } else {
            4
        };

        Ok(Self {
            zip_level,
            slice_size,
            file_size,
            crc,
            mtime,
            index_width,
        })
    }

    fn read_index_entry(&self, source: &dyn ByteSource, slice: u64) -> Result<u64> {
        let w = self.index_width as usize;
        let pos = HEADER_SIZE + slice * w as u64;
        let raw = source.read_at(pos, w)?;
        Ok(match w {
            2 => u16::from_be_bytes([raw[0], raw[1]]) as u64,
            3 => ((raw[0] as u64) << 16) | ((raw[1] as u64) << 8) | raw[2] as u64,
            4 => u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]) as u64,
            _ => unreachable!("index width is always 2, 3, or 4"),
        })
    }

    /// Decode the slice covering `location` and return its full
    /// `slice_size` bytes (zero-padded if the stored blob decompressed
    /// short, as happens for the final, partial slice of the file).
    pub fn decode_slice(&self, source: &dyn ByteSource, location: u64) -> Result<Vec<u8>> {
        let slice_index = location / self.slice_size;
        let start = self.read_index_entry(source, slice_index)?;
        let end = self.read_index_entry(source, slice_index + 1)?;
        if end <= start || end - start > self.slice_size {
            return Err(Error::UnexpectedFormat(
                "EBZIP index entries out of order or too large".into(),
            ));
        }
        let compressed_len = (end - start) as usize;
        let compressed = source.read_at(start, compressed_len)?;

        let mut out = if compressed_len as u64 == self.slice_size {
            compressed
        } else {
            let mut decoder = flate2::read::ZlibDecoder::new(&compressed[..]);
            let mut out = Vec::with_capacity(self.slice_size as usize);
            decoder
                .read_to_end(&mut out)
                .map_err(|e| Error::UnexpectedFormat(format!("EBZIP inflate failed: {e}")))?;
            out
        };

        if (out.len() as u64) < self.slice_size {
            out.resize(self.slice_size as usize, 0);
        } else if (out.len() as u64) > self.slice_size {
            out.truncate(self.slice_size as usize);
        }
        Ok(out)
    }
}
