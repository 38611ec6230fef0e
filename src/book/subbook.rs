//! Subbook session: opening a volume's text/graphic/sound streams and
//! populating its Search descriptors, MultiSearches, and Fonts from the
//! index directory page (§4.6).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::position::Position;
use crate::search::canon::{Fold, Style};
use crate::search::SearchDescriptor;
use crate::text::TextContext;
use crate::zio::{EpwingVariant, OpenMode, SebxaParams, ZioStream};

use super::binary::{self, BinaryContext, BinarySource};
use super::catalog::{jis_title_to_euc, CatalogEntry, CharCode, DiscKind};
use super::filename::candidates;
use super::font::{Font, FontCode};

/// Maps an EB-style font index-kind byte to its (narrow?, height-code) pair,
/// per `eb_initialize_indexes`'s `0xf1..0xf8` cases: wide16, narrow16,
/// wide24, narrow24, wide30, narrow30, wide48, narrow48 in that order.
/// EB-disc-only; EPWING fonts are registered from the catalog's font
/// filenames instead (see `Subbook::initialise`).
fn font_kind_info(kind: u8) -> Option<(bool, FontCode)> {
    match kind {
        0xf1 => Some((false, FontCode::Size16)),
        0xf2 => Some((true, FontCode::Size16)),
        0xf3 => Some((false, FontCode::Size24)),
        0xf4 => Some((true, FontCode::Size24)),
        0xf5 => Some((false, FontCode::Size30)),
        0xf6 => Some((true, FontCode::Size30)),
        0xf7 => Some((false, FontCode::Size48)),
        0xf8 => Some((true, FontCode::Size48)),
        _ => None,
    }
}

/// Font-code order matching the EPWING catalog's 4-slot `k∈{0..3}` font
/// filename fields (§6): narrow/wide filenames are stored in this same
/// height order as the EB index-kind bytes above.
const EPWING_FONT_SLOTS: [FontCode; 4] =
    [FontCode::Size16, FontCode::Size24, FontCode::Size30, FontCode::Size48];

/// Search method keys, matching the descriptor set in §3.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchMethod {
    WordAsis,
    WordKana,
    WordAlphabet,
    EndwordAsis,
    EndwordKana,
    EndwordAlphabet,
    Keyword,
    Menu,
    Copyright,
    Sound,
}

/// Index-directory record kinds, the `index_id` byte of the 16-byte subbook
/// index records. Font kinds occupy `0xF1..=0xF8`; `0xFF` is a MultiSearch
/// entry, handled separately by `register_multi`; `0x00`/`0x21`/`0x22`
/// configure S-EBXA parameters on EB discs and carry no search method.
fn method_for_kind(kind: u8) -> Option<SearchMethod> {
    use SearchMethod::*;
    match kind {
        0x01 => Some(Menu),
        0x02 => Some(Copyright),
        0x70 => Some(EndwordKana),
        0x71 => Some(EndwordAsis),
        0x72 => Some(EndwordAlphabet),
        0x80 => Some(Keyword),
        0x90 => Some(WordKana),
        0x91 => Some(WordAsis),
        0x92 => Some(WordAlphabet),
        0xd8 => Some(Sound),
        _ => None,
    }
}

/// One sub-index of a MultiSearch, with its human-readable label. The index
/// record format carries no flags byte of its own (§3.1): the style is the
/// owning MultiSearch's group-level style, copied onto every entry so
/// `search_multi` can canonicalize each sub-keyword without reaching back
/// into the parent group.
#[derive(Debug, Clone)]
pub struct MultiEntry {
    pub label: Vec<u8>,
    pub index_kind: u8,
    pub start_page: crate::position::Page,
    pub candidates_page: crate::position::Page,
    pub style: Style,
}

/// A group of up to 5 labeled sub-indices searched together (§3.1: up to 8
/// MultiSearches per subbook, each bundling ≤5 sub-indices).
#[derive(Debug, Clone)]
pub struct MultiSearch {
    /// Page of this MultiSearch's own entry-table, read during `initialise`.
    start_page: crate::position::Page,
    /// Style parsed from this MultiSearch's own `0xff` index record, same
    /// bit layout as any plain Search descriptor's; applies to every entry.
    pub style: Style,
    pub entries: Vec<MultiEntry>,
}

/// Accumulates the three S-EBXA configuration records (`0x00`/`0x21`/`0x22`)
/// seen while walking one subbook's index directory.
#[derive(Default)]
struct SebxaBuilder {
    zio_start: Option<u64>,
    zio_end: Option<u64>,
    index_base: Option<u64>,
    index_location: Option<u64>,
}

impl SebxaBuilder {
    fn build(&self) -> Option<SebxaParams> {
        Some(SebxaParams {
            zio_start: self.zio_start?,
            zio_end: self.zio_end?,
            index_base: self.index_base?,
            index_location: self.index_location?,
        })
    }
}

pub struct Subbook {
    pub directory: String,
    pub title: Vec<u8>,
    pub index_page: u32,
    pub text: Option<ZioStream>,
    pub graphic: Option<ZioStream>,
    pub sound: Option<ZioStream>,
    pub movie: Option<ZioStream>,
    pub narrow_fonts: HashMap<FontCode, Font>,
    pub wide_fonts: HashMap<FontCode, Font>,
    /// EPWING-only font filenames from the catalog record, in
    /// `EPWING_FONT_SLOTS` order; empty slots are the empty string.
    narrow_font_files: Vec<String>,
    wide_font_files: Vec<String>,
    pub current_narrow_font: Option<FontCode>,
    pub current_wide_font: Option<FontCode>,
    pub searches: HashMap<SearchMethod, SearchDescriptor>,
    pub multi_searches: Vec<MultiSearch>,
    pub initialised: bool,
    text_context: TextContext,
    current_binary: Option<(BinarySource, BinaryContext)>,
}

impl Subbook {
    pub fn from_catalog_entry(entry: &CatalogEntry) -> Self {
        Self {
            directory: entry.directory.clone(),
            title: entry.title.clone(),
            index_page: entry.index_page,
            text: None,
            graphic: None,
            sound: None,
            movie: None,
            narrow_fonts: HashMap::new(),
            wide_fonts: HashMap::new(),
            narrow_font_files: entry.narrow_font_files.clone(),
            wide_font_files: entry.wide_font_files.clone(),
            current_narrow_font: None,
            current_wide_font: None,
            searches: HashMap::new(),
            multi_searches: Vec::new(),
            initialised: false,
            text_context: TextContext::new(),
            current_binary: None,
        }
    }

    pub fn text_context(&self) -> &TextContext {
        &self.text_context
    }

    pub fn text_context_mut(&mut self) -> &mut TextContext {
        &mut self.text_context
    }

    /// Open the text/graphic/sound streams and parse the index directory,
    /// per §4.6. `book_dir` is the bound book's root; `disc`/`char_code`
    /// choose the EB vs EPWING filename hints and the space-folding default.
    /// `epwing_version` (catalog byte 3, EPWING only) picks the Huffman
    /// codec variant when the text file turns out to be a bare `honmon2`.
    pub fn initialise(
        &mut self,
        book_dir: &Path,
        disc: DiscKind,
        char_code: CharCode,
        epwing_version: Option<u8>,
    ) -> Result<()> {
        if self.initialised {
            return Ok(());
        }
        let sub_dir = book_dir.join(&self.directory);
        let (text_name, text_mode) = resolve_text_file(&sub_dir, disc, epwing_version)?;
        let is_plain = matches!(text_mode, OpenMode::Plain);
        let mut text = ZioStream::open_file(&text_name, text_mode)?;

        let index_data = read_index_page(&mut text)?;
        let sebxa = self.parse_index_directory(&index_data, disc, char_code)?;

        if let (DiscKind::Eb, true, Some(params)) = (disc, is_plain, sebxa) {
            text = ZioStream::open_file(&text_name, OpenMode::SEbxa(params))?;
        }

        for multi in &mut self.multi_searches {
            load_multi_entries(multi, &mut text)?;
        }

        let iso = matches!(char_code, CharCode::Iso8859_1);
        match disc {
            DiscKind::Eb => {
                for font in self.narrow_fonts.values_mut().chain(self.wide_fonts.values_mut()) {
                    let header = read_eb_font_header(&mut text, font.start_page)?;
                    font.parse_header(&header, iso)?;
                    font.bind_stream(text.reopen());
                }
            }
            DiscKind::Epwing => {
                for (slot, name) in EPWING_FONT_SLOTS.iter().zip(self.narrow_font_files.iter()) {
                    if let Some((stream, header)) = open_epwing_font_file(&sub_dir, name)? {
                        let font = self
                            .narrow_fonts
                            .entry(*slot)
                            .or_insert_with(|| Font::new(*slot, name.clone()));
                        font.parse_header(&header, iso)?;
                        font.bind_stream(stream);
                    }
                }
                for (slot, name) in EPWING_FONT_SLOTS.iter().zip(self.wide_font_files.iter()) {
                    if let Some((stream, header)) = open_epwing_font_file(&sub_dir, name)? {
                        let font = self
                            .wide_fonts
                            .entry(*slot)
                            .or_insert_with(|| Font::new(*slot, name.clone()));
                        font.parse_header(&header, iso)?;
                        font.bind_stream(stream);
                    }
                }
            }
        }

        let text_is_multi_file = text_name
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.eq_ignore_ascii_case("honmon2") || n.eq_ignore_ascii_case("honmon2.ebz"))
            .unwrap_or(false);
        let (graphic, sound) = if text_is_multi_file {
            (
                resolve_media_file(&sub_dir, HONMONG_HINTS)?,
                resolve_media_file(&sub_dir, HONMONS_HINTS)?,
            )
        } else {
            (None, None)
        };
        self.graphic = Some(match graphic {
            Some((path, mode)) => ZioStream::open_file(&path, mode)?,
            None => text.reopen(),
        });
        self.sound = Some(match sound {
            Some((path, mode)) => ZioStream::open_file(&path, mode)?,
            None => text.reopen(),
        });
        self.text = Some(text);
        self.initialised = true;
        log::debug!("subbook: initialised directory={}", self.directory);
        Ok(())
    }

    /// Parse the 16-byte index records (§4.6), returning assembled S-EBXA
    /// parameters when the `0x00`/`0x21`/`0x22` records are all present.
    fn parse_index_directory(
        &mut self,
        page: &[u8],
        disc: DiscKind,
        char_code: CharCode,
    ) -> Result<Option<SebxaParams>> {
        if page.len() < 5 {
            return Err(Error::UnexpectedFormat("short index directory".into()));
        }
        let count = page[1] as usize;
        let global_availability = if page[4] <= 0x02 { page[4] } else { 0 };
        let mut sebxa = SebxaBuilder::default();

        for i in 0..count {
            let start = 16 + i * 16;
            let end = start + 16;
            if end > page.len() {
                return Err(Error::UnexpectedFormat("truncated index record".into()));
            }
            let rec = &page[start..end];
            let kind = rec[0];
            let start_page = be32(&rec[2..6]);
            let page_count = be32(&rec[6..10]);
            let availability = rec[10];
            let flags = be24(&rec[11..14]);

            match kind {
                0x00 => {
                    // EB-only S-EBXA compressed range; absent on EPWING.
                    if disc == DiscKind::Eb {
                        sebxa.zio_start = Some((start_page as u64 - 1) * crate::position::PAGE_SIZE);
                        sebxa.zio_end = Some(
                            sebxa.zio_start.unwrap() + page_count as u64 * crate::position::PAGE_SIZE,
                        );
                    }
                    continue;
                }
                0x21 => {
                    if disc == DiscKind::Eb {
                        sebxa.index_base = Some((start_page as u64 - 1) * crate::position::PAGE_SIZE);
                    }
                    continue;
                }
                0x22 => {
                    if disc == DiscKind::Eb {
                        sebxa.index_location =
                            Some((start_page as u64 - 1) * crate::position::PAGE_SIZE);
                    }
                    continue;
                }
                0xff => {
                    let style = style_from_flags(flags, global_availability, availability, char_code);
                    self.multi_searches.push(MultiSearch { start_page, style, entries: Vec::new() });
                    continue;
                }
                _ if (0xf1..=0xf8).contains(&kind) => {
                    // EB-style font registration: start page only, no
                    // comparator style. The header itself (character range,
                    // first-glyph page) is read later, once the text stream
                    // is open, by `initialise`.
                    if disc == DiscKind::Eb {
                        if let Some((narrow, code)) = font_kind_info(kind) {
                            // EB fonts have no file of their own; they are a
                            // page range within the text stream.
                            let mut font = Font::new(code, "start".into());
                            font.start_page = start_page;
                            if narrow {
                                self.narrow_fonts.insert(code, font);
                            } else {
                                self.wide_fonts.insert(code, font);
                            }
                        }
                    }
                    continue;
                }
                _ => {}
            }

            let Some(method) = method_for_kind(kind) else {
                continue;
            };
            let style = style_from_flags(flags, global_availability, availability, char_code);
            let descriptor = SearchDescriptor {
                start_page,
                end_page: start_page + page_count,
                candidates_page: 0,
                index_kind: kind,
                style,
            };
            self.searches.insert(method, descriptor);
        }
        Ok(sebxa.build())
    }

    pub fn set_font(&mut self, code: FontCode, narrow: bool) -> Result<()> {
        let map = if narrow { &mut self.narrow_fonts } else { &mut self.wide_fonts };
        if !map.contains_key(&code) {
            return Err(Error::NoSuchFont(code.height()));
        }
        if narrow {
            self.current_narrow_font = Some(code);
        } else {
            self.current_wide_font = Some(code);
        }
        Ok(())
    }

    pub fn current_font(&self, narrow: bool) -> Result<&Font> {
        let code = if narrow { self.current_narrow_font } else { self.current_wide_font };
        let code = code.ok_or(Error::NoCurrentFont)?;
        let map = if narrow { &self.narrow_fonts } else { &self.wide_fonts };
        map.get(&code).ok_or(Error::NoCurrentFont)
    }

    pub fn current_font_mut(&mut self, narrow: bool) -> Result<&mut Font> {
        let code = if narrow { self.current_narrow_font } else { self.current_wide_font };
        let code = code.ok_or(Error::NoCurrentFont)?;
        let map = if narrow { &mut self.narrow_fonts } else { &mut self.wide_fonts };
        map.get_mut(&code).ok_or(Error::NoCurrentFont)
    }

    /// Make a monochrome bitmap at `position` the current binary (§4.6,
    /// `eb_set_binary_bitmap`). Requires a graphic stream.
    pub fn set_binary_bitmap(&mut self, position: Position, width: u32, height: u32) -> Result<()> {
        if self.graphic.is_none() {
            return Err(Error::NoCurrentBinary);
        }
        let ctx = binary::bitmap(position, width, height)?;
        self.current_binary = Some((BinarySource::Graphic, ctx));
        Ok(())
    }

    /// Make the color BMP/JPEG graphic at `position` the current binary
    /// (§4.6, `eb_set_binary_color_graphic`). Requires a graphic stream.
    pub fn set_binary_color_graphic(&mut self, position: Position) -> Result<()> {
        let stream = self.graphic.as_mut().ok_or(Error::NoCurrentBinary)?;
        let ctx = binary::color_graphic(stream, position)?;
        self.current_binary = Some((BinarySource::Graphic, ctx));
        Ok(())
    }

    /// Make the WAVE sound spanning `[start, end)` the current binary
    /// (§4.6, `eb_set_binary_wave`). Requires a sound stream; the header
    /// fragment (when synthesised) is read from the Sound search method's
    /// index page, mirroring `subbook->sound.index_page`.
    pub fn set_binary_wave(&mut self, start: Position, end: Position) -> Result<()> {
        let sound_index_page = self.searches.get(&SearchMethod::Sound).map(|d| d.start_page);
        let stream = self.sound.as_mut().ok_or(Error::NoCurrentBinary)?;
        let ctx = binary::wave(stream, start, end, sound_index_page)?;
        self.current_binary = Some((BinarySource::Sound, ctx));
        Ok(())
    }

    /// Read up to `buf.len()` bytes of the current binary. Requires a
    /// `set_binary_*` call first (§4.6, `eb_read_binary`).
    pub fn read_binary(&mut self, buf: &mut [u8]) -> Result<usize> {
        let (source, ctx) = self.current_binary.as_mut().ok_or(Error::NoCurrentBinary)?;
        let stream = match source {
            BinarySource::Graphic => self.graphic.as_mut(),
            BinarySource::Sound => self.sound.as_mut(),
        }
        .ok_or(Error::NoCurrentBinary)?;
        ctx.read(stream, buf)
    }

    pub fn unset_binary(&mut self) {
        self.current_binary = None;
    }
}

/// Decode one 2-bit style field. Numeric ordering (0 = as-is, 1 = convert,
/// 2 = delete) follows declaration order in the retrieved header enum names
/// and is not independently confirmed against a constants table (see
/// DESIGN.md).
fn fold_from_bits(v: u32) -> Fold {
    match v {
        1 => Fold::Convert,
        2 => Fold::Delete,
        _ => Fold::AsIs,
    }
}

/// Decode the 24-bit per-index style flags into a [`Style`], per the bit
/// layout read directly off the index record: katakana bits 22-23, case
/// bits 20-21, marks bits 18-19 (binary: 0 -> delete, else as-is, unlike
/// every other axis), long vowels 16-17, double consonants 14-15,
/// contracted sounds 12-13, voiced consonants 10-11, small vowels 8-9,
/// p-sounds 6-7. Space-folding is not part of the flags at all: it is
/// as-is for an ISO-8859-1 document, delete otherwise. When neither the
/// per-record nor the global availability byte requests custom styling,
/// every axis but marks/space defaults to convert (marks still deletes).
fn style_from_flags(flags: u32, global_availability: u8, availability: u8, char_code: CharCode) -> Style {
    let custom = (global_availability == 0x00 && availability == 0x02) || global_availability == 0x02;
    let spaces = match char_code {
        CharCode::Iso8859_1 => Fold::AsIs,
        CharCode::JisX0208 | CharCode::JisX0208Gb2312 => Fold::Delete,
    };
    if !custom {
        return Style {
            katakana: Fold::Convert,
            case: Fold::Convert,
            marks: Fold::Delete,
            long_vowels: Fold::Convert,
            double_consonants: Fold::Convert,
            contracted_sounds: Fold::Convert,
            voiced_consonants: Fold::Convert,
            small_vowels: Fold::Convert,
            p_sounds: Fold::Convert,
            spaces,
        };
    }
    Style {
        katakana: fold_from_bits((flags & 0xc00000) >> 22),
        case: fold_from_bits((flags & 0x300000) >> 20),
        marks: if (flags & 0x0c0000) >> 18 == 0 { Fold::Delete } else { Fold::AsIs },
        long_vowels: fold_from_bits((flags & 0x030000) >> 16),
        double_consonants: fold_from_bits((flags & 0x00c000) >> 14),
        contracted_sounds: fold_from_bits((flags & 0x003000) >> 12),
        voiced_consonants: fold_from_bits((flags & 0x000c00) >> 10),
        small_vowels: fold_from_bits((flags & 0x000300) >> 8),
        p_sounds: fold_from_bits((flags & 0x0000c0) >> 6),
        spaces,
    }
}

/// Read a MultiSearch's own entry-table page and populate its labeled
/// sub-indices, mirroring `eb_load_multi_searches`: entry count as a u16 at
/// offset 0 (not the u8 at offset 1 the outer index directory uses), each
/// entry a 30-byte JIS label followed by up to 5 16-byte sub-index records.
fn load_multi_entries(multi: &mut MultiSearch, text: &mut ZioStream) -> Result<()> {
    const LABEL_LEN: usize = 30;

    text.lseek(
        ((multi.start_page as u64 - 1) * crate::position::PAGE_SIZE) as i64,
        crate::zio::Whence::Start,
    )?;
    let mut page = vec![0u8; crate::position::PAGE_SIZE as usize];
    let n = text.read(&mut page)?;
    if n < 2 {
        return Err(Error::UnexpectedFormat("short multi-search page".into()));
    }

    let entry_count = be16(&page[0..2]) as usize;
    let mut offset = 16usize;
    for _ in 0..entry_count {
        if offset + 2 + LABEL_LEN > page.len() {
            return Err(Error::UnexpectedFormat("truncated multi-search entry".into()));
        }
        let index_count = page[offset] as usize;
        let label = jis_title_to_euc(&page[offset + 2..offset + 2 + LABEL_LEN]);
        offset += 2 + LABEL_LEN;

        let mut entry =
            MultiEntry { label, index_kind: 0, start_page: 0, candidates_page: 0, style: multi.style };
        for _ in 0..index_count {
            if offset + 16 > page.len() {
                return Err(Error::UnexpectedFormat("truncated multi-search sub-index".into()));
            }
            let rec = &page[offset..offset + 16];
            let index_id = rec[0];
            let page_no = be32(&rec[2..6]);
            match index_id {
                0x71 => {
                    if entry.start_page == 0 {
                        entry.start_page = page_no;
                    }
                    entry.index_kind = index_id;
                }
                0x91 | 0xa1 => {
                    entry.start_page = page_no;
                    entry.index_kind = index_id;
                }
                0x01 => {
                    entry.candidates_page = page_no;
                    entry.index_kind = index_id;
                }
                _ => {}
            }
            offset += 16;
        }
        multi.entries.push(entry);
    }
    Ok(())
}

fn read_index_page(text: &mut ZioStream) -> Result<Vec<u8>> {
    text.lseek(0, crate::zio::Whence::Start)?;
    let mut buf = vec![0u8; crate::position::PAGE_SIZE as usize];
    let n = text.read(&mut buf)?;
    if n < 2 {
        return Err(Error::UnexpectedFormat("short index page".into()));
    }
    Ok(buf)
}

/// Read an EB font's 16-byte header out of its registered page within the
/// (borrowed) text stream.
fn read_eb_font_header(text: &mut ZioStream, start_page: crate::position::Page) -> Result<[u8; 16]> {
    text.lseek(
        ((start_page as u64 - 1) * crate::position::PAGE_SIZE) as i64,
        crate::zio::Whence::Start,
    )?;
    let mut header = [0u8; 16];
    let n = text.read(&mut header)?;
    if n < 16 {
        return Err(Error::UnexpectedFormat("short font header".into()));
    }
    Ok(header)
}

/// Open an EPWING font's own file (its name resolved ISO-9660-style under
/// `sub_dir`) and read its 16-byte header from page 1. Returns `None` when
/// `name` is an empty catalog slot or the file does not exist.
fn open_epwing_font_file(sub_dir: &Path, name: &str) -> Result<Option<(ZioStream, [u8; 16])>> {
    if name.is_empty() {
        return Ok(None);
    }
    let Some(path) = candidates(name)
        .into_iter()
        .map(|c| sub_dir.join(c))
        .find(|p| p.is_file())
    else {
        return Ok(None);
    };
    let mut stream = ZioStream::open_file(&path, OpenMode::Plain)?;
    let mut header = [0u8; 16];
    let n = stream.read(&mut header)?;
    if n < 16 {
        return Err(Error::UnexpectedFormat("short font header".into()));
    }
    Ok(Some((stream, header)))
}

/// Resolve which text-file name/mode combination exists, per §4.6's hint
/// list: EB tries `start`/`start.ebz`; EPWING tries `honmon`/`honmon2`
/// variants. A bare `honmon2` (no `.ebz`/`.org` suffix) is EPWING-Huffman
/// compressed, not plain — `epwing_version` (catalog byte 3) picks between
/// the EPWING and EPWING6 variants, mirroring `book->version < 6`.
const HONMONG_HINTS: &[(&str, OpenMode)] =
    &[("honmong", OpenMode::Plain), ("honmong.ebz", OpenMode::Ebzip)];

const HONMONS_HINTS: &[(&str, OpenMode)] = &[
    ("honmons", OpenMode::Plain),
    ("honmons.ebz", OpenMode::Ebzip),
    ("honmons.org", OpenMode::Plain),
];

/// Resolve a dedicated graphic/sound file (`honmong`/`honmons` hint lists)
/// for a multi-file EPWING subbook. Returns `None` when no such file is
/// present, in which case the caller aliases the text stream instead.
fn resolve_media_file(
    sub_dir: &Path,
    hints: &[(&str, OpenMode)],
) -> Result<Option<(PathBuf, OpenMode)>> {
    for (hint, mode) in hints {
        for candidate in candidates(hint) {
            let path = sub_dir.join(&candidate);
            if path.is_file() {
                return Ok(Some((path, mode.clone())));
            }
        }
    }
    Ok(None)
}

fn resolve_text_file(
    sub_dir: &Path,
    disc: DiscKind,
    epwing_version: Option<u8>,
) -> Result<(PathBuf, OpenMode)> {
    let epwing_variant = if epwing_version.unwrap_or(0) < 6 {
        EpwingVariant::V5
    } else {
        EpwingVariant::V6
    };
    let hints: &[(&str, OpenMode)] = match disc {
        DiscKind::Eb => &[("start", OpenMode::Plain), ("start.ebz", OpenMode::Ebzip)],
        DiscKind::Epwing => &[
            ("honmon", OpenMode::Plain),
            ("honmon.ebz", OpenMode::Ebzip),
            ("honmon2", OpenMode::Epwing(epwing_variant)),
            ("honmon2.ebz", OpenMode::Ebzip),
            ("honmon2.org", OpenMode::Plain),
        ],
    };
    for (hint, mode) in hints {
        for candidate in candidates(hint) {
            let path = sub_dir.join(&candidate);
            if path.is_file() {
                return Ok((path, mode.clone()));
            }
        }
    }
    Err(Error::OpenFailed {
        what: sub_dir.display().to_string(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "no text file hint matched"),
    })
}

fn be16(bytes: &[u8]) -> u16 {
    u16::from_be_bytes([bytes[0], bytes[1]])
}

fn be24(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]])
}

fn be32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
