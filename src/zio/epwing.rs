//! EPWING / EPWING6 codec: static-Huffman compressed pages addressed by a
//! 36-byte-per-16-pages index table.

use crate::error::{Error, Result};
use crate::io::ByteSource;
use crate::position::PAGE_SIZE;
use crate::zio::huffman::{self, HuffmanTree, Leaf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpwingVariant {
    V5,
    V6,
}

pub struct EpwingParams {
    pub variant: EpwingVariant,
    pub index_location: u64,
    pub index_length: u64,
    pub file_size: u64,
    pub tree: HuffmanTree,
}

impl EpwingParams {
    pub fn parse(source: &dyn ByteSource, variant: EpwingVariant) -> Result<Self> {
        let header_len = match variant {
            EpwingVariant::V5 => 32,
            EpwingVariant::V6 => 48,
        };
        let header = source.read_at(0, header_len)?;

        let index_location = be32(&header, 0);
        let index_length = be32(&header, 4);
        let freq_location = be32(&header, 8);
        let freq_length = be32(&header, 12);

        if index_length < 36 || freq_length < 512 {
            return Err(Error::UnexpectedFormat(
                "EPWING index/frequency table too short".into(),
            ));
        }

        let leaves = read_leaves(source, variant, freq_location, freq_length)?;
        let tree = huffman::build(leaves)?;

        let file_size = derive_file_size(source, index_location, index_length)?;

        Ok(Self {
            variant,
            index_location,
            index_length,
            file_size,
            tree,
        })
    }

    /// Decode the page containing `location`, returning exactly
    /// [`PAGE_SIZE`] bytes.
    pub fn decode_page(&self, source: &dyn ByteSource, location: u64) -> Result<Vec<u8>> {
        let page = location / PAGE_SIZE;
        let group = page / 16;
        let slot = (page % 16) as usize;

        let row = source.read_at(self.index_location + group * 36, 36)?;
        let base = be32(&row, 0);
        let offset = u16::from_be_bytes([row[4 + slot * 2], row[4 + slot * 2 + 1]]) as u64;
        let page_location = base + offset;

        match self.variant {
            EpwingVariant::V5 => self.decode_huffman_page(source, page_location),
            EpwingVariant::V6 => {
                let tag = source.read_at(page_location, 1)?[0];
                if tag != 0 {
                    // Raw page: stored verbatim after the 1-byte tag.
                    let mut raw = source.read_at(page_location + 1, PAGE_SIZE as usize)?;
                    raw.resize(PAGE_SIZE as usize, 0);
                    Ok(raw)
                } else {
                    self.decode_huffman_page(source, page_location + 1)
                }
            }
        }
    }

    fn decode_huffman_page(&self, source: &dyn ByteSource, start: u64) -> Result<Vec<u8>> {
        // Feed the Huffman decoder page-sized chunks read sequentially from
        // `start`, matching the reference decoder's page-at-a-time refill.
        let mut cursor = start;
        let read_chunk = |cursor: &mut u64| -> Result<Vec<u8>> {
            let remaining = source.len().saturating_sub(*cursor);
            let n = remaining.min(PAGE_SIZE) as usize;
            let chunk = source.read_at(*cursor, n)?;
            *cursor += chunk.len() as u64;
            Ok(chunk)
        };
        let first = read_chunk(&mut cursor)?;
        huffman::decode_page(&self.tree, first, || read_chunk(&mut cursor))
    }
}

fn be32(buf: &[u8], offset: usize) -> u64 {
    u32::from_be_bytes(buf[offset..offset + 4].try_into().unwrap()) as u64
}

/// Walk the last 36-byte index row to find how many of its 16 pages
/// actually exist, per the "first zero offset in a trailing slot" rule.
fn derive_file_size(source: &dyn ByteSource, index_location: u64, index_length: u64) -> Result<u64> {
    let rows = index_length / 36;
    let last_row_offset = index_location + (rows - 1) * 36;
    let row = source.read_at(last_row_offset, 36)?;

    let mut present = 16u64;
    for slot in 1..16usize {
        let off = u16::from_be_bytes([row[4 + slot * 2], row[4 + slot * 2 + 1]]);
        if off == 0 {
            present = slot as u64;
            break;
        }
    }
    Ok(rows * (PAGE_SIZE * 16) - PAGE_SIZE * (16 - present))
}

fn read_leaves(
    source: &dyn ByteSource,
    variant: EpwingVariant,
    freq_location: u64,
    freq_length: u64,
) -> Result<Vec<(Leaf, u32)>> {
    let mut leaves = Vec::new();
    let mut cursor = freq_location;

    if variant == EpwingVariant::V6 {
        let leaf32_count = (freq_length - 1024 * 4 - 256 * 2) / 6;
        let buf = source.read_at(cursor, (leaf32_count * 6) as usize)?;
        for i in 0..leaf32_count as usize {
            let rec = &buf[i * 6..i * 6 + 6];
            let value = u32::from_be_bytes(rec[0..4].try_into().unwrap());
            let freq = u16::from_be_bytes(rec[4..6].try_into().unwrap()) as u32;
            leaves.push((Leaf::DWord(value), freq));
        }
        cursor += leaf32_count * 6;

        let buf16 = source.read_at(cursor, 1024 * 4)?;
        for i in 0..1024usize {
            let rec = &buf16[i * 4..i * 4 + 4];
            let value = u16::from_be_bytes(rec[0..2].try_into().unwrap());
            let freq = u16::from_be_bytes(rec[2..4].try_into().unwrap()) as u32;
            leaves.push((Leaf::Word(value), freq));
        }
        cursor += 1024 * 4;
    } else {
        let leaf16_count = (freq_length - 256 * 2) / 4;
        let buf16 = source.read_at(cursor, (leaf16_count * 4) as usize)?;
        for i in 0..leaf16_count as usize {
            let rec = &buf16[i * 4..i * 4 + 4];
            let value = u16::from_be_bytes(rec[0..2].try_into().unwrap());
            let freq = u16::from_be_bytes(rec[2..4].try_into().unwrap()) as u32;
            leaves.push((Leaf::Word(value), freq));
        }
        cursor += leaf16_count * 4;
    }

    let buf8 = source.read_at(cursor, 512)?;
    for i in 0..256usize {
        let freq = u16::from_be_bytes([buf8[i * 2], buf8[i * 2 + 1]]) as u32;
        leaves.push((Leaf::Byte(i as u8), freq));
    }

    leaves.push((Leaf::Eof, 1));
    Ok(leaves)
}
