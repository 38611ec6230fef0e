//! Current-binary session (§3.1, §4.6): monochrome bitmap, color BMP/JPEG
//! graphic, and WAVE sound extraction from a subbook's graphic/sound
//! streams. Grounded on `original_source/eb/binary.c`'s
//! `eb_set_binary_{bitmap,color_graphic,wave}`/`eb_read_binary`.

use crate::error::{Error, Result};
use crate::position::{Page, Position, PAGE_SIZE};
use crate::zio::{Whence, ZioStream};

/// Which of a subbook's streams a [`BinaryContext`] reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinarySource {
    Graphic,
    Sound,
}

/// A sequential read cursor over one binary blob: a byte range inside a
/// graphic or sound zio stream, with an optional synthesised header served
/// ahead of the stream's own bytes (the WAVE RIFF header built when the
/// underlying sound data carries none of its own).
pub struct BinaryContext {
    location: u64,
    /// Remaining stream bytes after the header, or `None` when unknown (a
    /// raw JPEG payload with no embedded size runs to end of stream).
    size: Option<u64>,
    offset: u64,
    header: Vec<u8>,
    header_offset: usize,
}

impl BinaryContext {
    fn new(location: u64, size: Option<u64>) -> Self {
        Self { location, size, offset: 0, header: Vec::new(), header_offset: 0 }
    }

    /// Copy out up to `buf.len()` bytes, header bytes first, then live
    /// stream bytes from `location + offset` onward. Returns 0 at the end
    /// of the blob (the caller's EOF signal, same as `ZioStream::read`).
    pub fn read(&mut self, stream: &mut ZioStream, buf: &mut [u8]) -> Result<usize> {
        let mut written = 0usize;
        if self.header_offset < self.header.len() {
            let n = (self.header.len() - self.header_offset).min(buf.len());
            buf[..n].copy_from_slice(&self.header[self.header_offset..self.header_offset + n]);
            self.header_offset += n;
            written += n;
            if written == buf.len() {
                return Ok(written);
            }
        }
        if let Some(size) = self.size {
            if self.offset >= size {
                return Ok(written);
            }
        }
        let remaining_in_buf = buf.len() - written;
        let want = match self.size {
            Some(size) => ((size - self.offset) as usize).min(remaining_in_buf),
            None => remaining_in_buf,
        };
        if want == 0 {
            return Ok(written);
        }
        stream.lseek((self.location + self.offset) as i64, Whence::Start)?;
        let n = stream.read(&mut buf[written..written + want])?;
        self.offset += n as u64;
        Ok(written + n)
    }
}

/// A monochrome bitmap of `width`x`height`, 1 bit per pixel, row-major,
/// starting at `position`. Size: `ceil(width/8) * height` bytes.
pub fn bitmap(position: Position, width: u32, height: u32) -> Result<BinaryContext> {
    if width == 0 || height == 0 {
        return Err(Error::NoCurrentBinary);
    }
    let size = (width as u64 + 7) / 8 * height as u64;
    Ok(BinaryContext::new(position.to_offset(), Some(size)))
}

/// A color BMP or JPEG graphic at `position`. The 8-byte header is read
/// eagerly: a `"data"` tag plus a little-endian u32 length means BMP-style
/// framing with a known size; anything else (most EB* JPEGs) has no header
/// at all, and the whole blob — starting back at `position`, not past the
/// 8 probed bytes — runs to the end of the stream.
pub fn color_graphic(stream: &mut ZioStream, position: Position) -> Result<BinaryContext> {
    let location = position.to_offset();
    stream.lseek(location as i64, Whence::Start)?;
    let mut header = [0u8; 8];
    let n = stream.read(&mut header)?;
    if n == 8 && &header[0..4] == b"data" {
        let size = u32::from_le_bytes(header[4..8].try_into().unwrap()) as u64;
        Ok(BinaryContext::new(location + 8, Some(size)))
    } else {
        Ok(BinaryContext::new(location, None))
    }
}

/// A WAVE sound spanning `[start, end)`. If the data already starts with a
/// `"RIFF"` tag it is a self-contained WAVE file and is served verbatim;
/// otherwise a 44-byte RIFF/WAVE header is synthesised — its 28-byte
/// `fmt `-ish fragment copied from offset 32 of `sound_index_page` — and
/// prepended ahead of the raw PCM data.
pub fn wave(
    stream: &mut ZioStream,
    start: Position,
    end: Position,
    sound_index_page: Option<Page>,
) -> Result<BinaryContext> {
    let start_loc = start.to_offset();
    let end_loc = end.to_offset();
    if end_loc <= start_loc {
        return Err(Error::UnexpectedFormat("wave end position before start".into()));
    }
    let size = end_loc - start_loc;

    stream.lseek(start_loc as i64, Whence::Start)?;
    let mut probe = [0u8; 4];
    let n = stream.read(&mut probe)?;
    if n < 4 {
        return Err(Error::ReadFailed("short wave probe read".into()));
    }
    if &probe == b"RIFF" {
        return Ok(BinaryContext::new(start_loc, Some(size)));
    }

    let index_page = sound_index_page
        .ok_or_else(|| Error::UnexpectedFormat("no sound index page for wave header".into()))?;
    let frag_loc = (index_page as u64 - 1) * PAGE_SIZE + 32;
    stream.lseek(frag_loc as i64, Whence::Start)?;
    let mut fragment = [0u8; 28];
    let n = stream.read(&mut fragment)?;
    if n < 28 {
        return Err(Error::ReadFailed("short wave header fragment read".into()));
    }

    let mut header = Vec::with_capacity(44);
    header.extend_from_slice(b"RIFF");
    header.extend_from_slice(&((size + 36) as u32).to_le_bytes());
    header.extend_from_slice(b"WAVE");
    header.extend_from_slice(&fragment);
    header.extend_from_slice(&(size as u32).to_le_bytes());

    let mut ctx = BinaryContext::new(start_loc, Some(size));
    ctx.header = header;
    Ok(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zio::OpenMode;

    #[test]
    fn bitmap_size_is_ceil_width_over_8_times_height() {
        let ctx = bitmap(Position::new(1, 0), 16, 16).unwrap();
        assert_eq!(ctx.size, Some(32));
        let ctx = bitmap(Position::new(1, 0), 9, 2).unwrap();
        assert_eq!(ctx.size, Some(4));
    }

    #[test]
    fn bitmap_rejects_zero_dimensions() {
        assert!(matches!(bitmap(Position::new(1, 0), 0, 16), Err(Error::NoCurrentBinary)));
    }

    #[test]
    fn color_graphic_with_data_tag_uses_declared_little_endian_size() {
        let mut data = vec![0u8; 64];
        data[..4].copy_from_slice(b"data");
        data[4..8].copy_from_slice(&10u32.to_le_bytes());
        for (i, b) in data[8..18].iter_mut().enumerate() {
            *b = i as u8;
        }
        let mut stream = ZioStream::open_memory(data, OpenMode::Plain).unwrap();
        let mut ctx = color_graphic(&mut stream, Position::new(1, 0)).unwrap();
        let mut buf = [0u8; 10];
        let n = ctx.read(&mut stream, &mut buf).unwrap();
        assert_eq!(n, 10);
        assert_eq!(buf, [0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn color_graphic_without_data_tag_reads_from_position_with_unknown_size() {
        let data = b"JFIF-ish-bytes-not-a-data-tag-at-all".to_vec();
        let mut stream = ZioStream::open_memory(data.clone(), OpenMode::Plain).unwrap();
        let mut ctx = color_graphic(&mut stream, Position::new(1, 0)).unwrap();
        let mut buf = vec![0u8; data.len()];
        let n = ctx.read(&mut stream, &mut buf).unwrap();
        assert_eq!(&buf[..n], &data[..n]);
    }

    #[test]
    fn wave_passes_through_existing_riff_container_unmodified() {
        let mut data = vec![0u8; 64];
        data[..4].copy_from_slice(b"RIFF");
        for (i, b) in data[4..20].iter_mut().enumerate() {
            *b = i as u8;
        }
        let mut stream = ZioStream::open_memory(data.clone(), OpenMode::Plain).unwrap();
        let mut ctx = wave(&mut stream, Position::new(1, 0), Position::new(1, 20), None).unwrap();
        let mut buf = [0u8; 20];
        let n = ctx.read(&mut stream, &mut buf).unwrap();
        assert_eq!(n, 20);
        assert_eq!(&buf, &data[..20]);
    }

    #[test]
    fn wave_without_riff_tag_synthesises_header_then_data() {
        let mut data = vec![0u8; PAGE_SIZE as usize + 64];
        let fragment_start = (2 - 1) * PAGE_SIZE as usize + 32;
        let fragment: Vec<u8> = (0u8..28).collect();
        data[fragment_start..fragment_start + 28].copy_from_slice(&fragment);
        let pcm_start = PAGE_SIZE as usize;
        data[pcm_start..pcm_start + 10].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);

        let mut stream = ZioStream::open_memory(data, OpenMode::Plain).unwrap();
        let mut ctx = wave(&mut stream, Position::new(2, 0), Position::new(2, 10), Some(2)).unwrap();
        let mut buf = vec![0u8; 64];
        let n = ctx.read(&mut stream, &mut buf).unwrap();
        assert_eq!(&buf[0..4], b"RIFF");
        assert_eq!(u32::from_le_bytes(buf[4..8].try_into().unwrap()), 10 + 36);
        assert_eq!(&buf[8..12], b"WAVE");
        assert_eq!(&buf[12..40], &fragment[..]);
        assert_eq!(u32::from_le_bytes(buf[40..44].try_into().unwrap()), 10);
        assert_eq!(&buf[44..n], &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
    }
}
