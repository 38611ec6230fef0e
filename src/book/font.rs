//! Bitmap font sessions (§3.1, §4.6, §6).

use crate::error::{Error, Result};
use crate::position::{Page, PAGE_SIZE};
use crate::zio::{Whence, ZioStream};

/// Height code a font is indexed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontCode {
    Size16,
    Size24,
    Size30,
    Size48,
}

impl FontCode {
    pub fn height(self) -> u16 {
        match self {
            FontCode::Size16 => 16,
            FontCode::Size24 => 24,
            FontCode::Size30 => 30,
            FontCode::Size48 => 48,
        }
    }
}

/// One bitmap font in one subbook, narrow or wide.
pub struct Font {
    pub code: FontCode,
    pub file_name: String,
    pub start_char: u16,
    pub end_char: u16,
    pub start_page: Page,
    pub available: bool,
    stream: Option<ZioStream>,
}

impl Font {
    pub fn new(code: FontCode, file_name: String) -> Self {
        Self {
            code,
            file_name,
            start_char: 0,
            end_char: 0,
            start_page: 0,
            available: false,
            stream: None,
        }
    }

    /// Parse the 16-byte font header and derive `end_char` per §6: the
    /// narrow/wide end-character formula walks `character_count` positions
    /// forward across the row-padding of the JIS or ISO-8859-1 character
    /// range.
    pub fn parse_header(&mut self, header: &[u8], iso: bool) -> Result<()> {
        if header.len() < 16 {
            return Err(Error::UnexpectedFormat("short font header".into()));
        }
        let char_count = u16::from_be_bytes([header[0], header[1]]);
        let start_char = u16::from_be_bytes([header[2], header[3]]);
        let start_page = u32::from_be_bytes([header[12], header[13], header[14], header[15]]);

        self.start_char = start_char;
        self.start_page = start_page;
        self.end_char = end_char_from_count(start_char, char_count, iso);
        self.available = true;
        Ok(())
    }

    pub fn bind_stream(&mut self, stream: ZioStream) {
        self.stream = Some(stream);
    }

    pub fn stream_mut(&mut self) -> Result<&mut ZioStream> {
        self.stream.as_mut().ok_or(Error::NoCurrentFont)
    }

    /// Glyph size in bytes, 1 bit per pixel row-major: `(width/8) * height`,
    /// where narrow glyphs are narrower than their nominal height (e.g. a
    /// 16-high narrow glyph is 8 wide, not 16).
    pub fn glyph_size(&self, narrow: bool) -> usize {
        let height = self.code.height() as usize;
        (narrow_or_wide_width(self.code, narrow) as usize / 8) * height
    }

    /// Read one character's bitmap, per the narrow/wide font bitmap layout:
    /// `chindex` walks the character range 0x5e codes per row (skipping the
    /// 0x20/0x7f gaps JIS leaves at each row boundary), and every 1024-byte
    /// page page holds `1024/size` glyphs back to back.
    pub fn read_glyph(&mut self, ch: u16, narrow: bool) -> Result<Vec<u8>> {
        if !self.available
            || ch < self.start_char
            || self.end_char < ch
            || (ch & 0xff) < 0x21
            || 0x7e < (ch & 0xff)
        {
            return Err(Error::NoSuchFont(ch));
        }
        let size = self.glyph_size(narrow);
        let chindex = ((ch >> 8) as i64 - (self.start_char >> 8) as i64) * 0x5e
            + ((ch & 0xff) as i64 - (self.start_char & 0xff) as i64);
        let per_chunk = (1024 / size) as i64;
        let location = (self.start_page as u64 - 1) * PAGE_SIZE
            + (chindex / per_chunk) as u64 * 1024
            + (chindex % per_chunk) as u64 * size as u64;

        let stream = self.stream_mut()?;
        stream.lseek(location as i64, Whence::Start)?;
        let mut buf = vec![0u8; size];
        let n = stream.read(&mut buf)?;
        if n < size {
            return Err(Error::UnexpectedFormat("short font glyph".into()));
        }
        Ok(buf)
    }
}

/// Bitmap cell width for `code` in the narrow or wide font, per the
/// `EB_WIDTH_{NARROW,WIDE}_FONT_*` table: narrow cells are half-width
/// except at height 30, whose narrow cell (16) is exactly half the wide
/// cell's 32 rather than of 30 itself.
fn narrow_or_wide_width(code: FontCode, narrow: bool) -> u16 {
    match (code, narrow) {
        (FontCode::Size16, true) => 8,
        (FontCode::Size16, false) => 16,
        (FontCode::Size24, true) => 16,
        (FontCode::Size24, false) => 24,
        (FontCode::Size30, true) => 16,
        (FontCode::Size30, false) => 32,
        (FontCode::Size48, true) => 24,
        (FontCode::Size48, false) => 48,
    }
}

/// `narrow_end = start + floor(C/0x5E)*0x100 + (C mod 0x5E) - 1`, plus a
/// `+0xA3` correction when the low byte would overflow past the row (`0x7E`
/// for JIS rows, `0xFE`/`+3` for the ISO-8859-1 analogue).
fn end_char_from_count(start: u16, count: u16, iso: bool) -> u16 {
    if count == 0 {
        return start;
    }
    let row_size: u32 = 0x5E;
    let c = count as u32;
    let start = start as u32;
    let mut end = start + (c / row_size) * 0x100 + (c % row_size) - 1;
    let low = end & 0xFF;
    if !iso && low > 0x7E {
        end += 0xA3;
    } else if iso && low > 0xFE {
        end += 3;
    }
    end as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn font_code_heights() {
        assert_eq!(FontCode::Size16.height(), 16);
        assert_eq!(FontCode::Size48.height(), 48);
    }

    #[test]
    fn parses_header_fields() {
        let mut header = [0u8; 16];
        header[0..2].copy_from_slice(&10u16.to_be_bytes());
        header[2..4].copy_from_slice(&0xA121u16.to_be_bytes());
        header[12..16].copy_from_slice(&1u32.to_be_bytes());
        let mut font = Font::new(FontCode::Size16, "narrow".into());
        font.parse_header(&header, false).unwrap();
        assert!(font.available);
        assert_eq!(font.start_char, 0xA121);
        assert_eq!(font.start_page, 1);
    }

    #[test]
    fn glyph_size_matches_wide_and_narrow_16_bitmap() {
        let font = Font::new(FontCode::Size16, "wide".into());
        assert_eq!(font.glyph_size(false), 32);
        assert_eq!(font.glyph_size(true), 16);
    }

    #[test]
    fn glyph_size_matches_wide_30_special_case() {
        // Wide height-30 cells are 32 px wide, not 30; narrow stays 16.
        let font = Font::new(FontCode::Size30, "wide".into());
        assert_eq!(font.glyph_size(false), 120);
        assert_eq!(font.glyph_size(true), 60);
    }

    #[test]
    fn read_glyph_rejects_out_of_range_character() {
        let mut font = Font::new(FontCode::Size16, "wide".into());
        font.available = true;
        font.start_char = 0xA121;
        font.end_char = 0xA17E;
        font.start_page = 1;
        assert!(matches!(
            font.read_glyph(0x1000, false),
            Err(Error::NoSuchFont(_))
        ));
    }
}
