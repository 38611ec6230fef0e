//! L4 subbook session: binds a book directory into a catalog, its
//! subbooks, and the "current subbook / current font" state (§3.1, §4.6).

pub mod binary;
pub mod catalog;
pub mod filename;
pub mod font;
pub mod subbook;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::cache;
use crate::error::{Error, Result};
use crate::position::Position;
use crate::search::canon::Code;
use crate::search::{Hit, SearchContext, SearchDescriptor};
use crate::text::{hooks::Hookset, Disc};

use catalog::{character_code_override, CharCode, DiscKind};
use font::FontCode;
use subbook::{SearchMethod, Subbook};

/// Options controlling how `bind` behaves (§2.1 ambient configuration).
#[derive(Debug, Clone)]
pub struct BindOptions {
    /// Eagerly run every subbook's character-code heuristic at bind time
    /// rather than lazily on first `set_subbook`.
    pub eager_character_code_probe: bool,
}

impl Default for BindOptions {
    fn default() -> Self {
        Self {
            eager_character_code_probe: false,
        }
    }
}

/// The root of one binding: absolute path, disc kind, document character
/// code, and the ordered sequence of subbooks (§3.1).
pub struct Book {
    id: u64,
    pub path: PathBuf,
    pub disc: DiscKind,
    pub char_code: CharCode,
    /// EPWING format version (catalog byte 3), selecting the Huffman codec
    /// variant for a bare `honmon2` text file. `None` on EB discs.
    epwing_version: Option<u8>,
    pub subbooks: Vec<Subbook>,
    current_subbook: Option<usize>,
}

impl Book {
    /// Canonicalise `path`, locate the catalog, and parse it into Subbook
    /// records (§4.6).
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        Self::bind_with_options(path, &BindOptions::default())
    }

    pub fn bind_with_options(path: impl AsRef<Path>, options: &BindOptions) -> Result<Self> {
        let path = canonicalize_path(path.as_ref())?;

        let (disc, catalog_path) = locate_catalog(&path)?;
        let data = std::fs::read(&catalog_path).map_err(|e| Error::OpenFailed {
            what: catalog_path.display().to_string(),
            source: e,
        })?;
        let entries = catalog::parse(&data, disc)?;
        let epwing_version = matches!(disc, DiscKind::Epwing)
            .then(|| data.get(3).copied())
            .flatten();
        log::debug!(
            "book: bind path={} disc={:?} subbooks={} epwing_version={:?}",
            path.display(),
            disc,
            entries.len(),
            epwing_version
        );

        let mut char_code = CharCode::JisX0208;
        let mut subbooks = Vec::with_capacity(entries.len());
        for entry in &entries {
            if let Some(over) = character_code_override(&entry.directory) {
                log::warn!(
                    "book: character-code heuristic override for directory={} -> {:?}",
                    entry.directory,
                    over
                );
                char_code = over;
            }
            subbooks.push(Subbook::from_catalog_entry(entry));
        }
        if options.eager_character_code_probe {
            for sub in &mut subbooks {
                let _ = sub.initialise(&path, disc, char_code, epwing_version);
            }
        }

        Ok(Self {
            id: cache::next_id(),
            path,
            disc,
            char_code,
            epwing_version,
            subbooks,
            current_subbook: None,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn subbook_count(&self) -> usize {
        self.subbooks.len()
    }

    /// Make subbook `index` current, lazily opening its streams.
    pub fn set_subbook(&mut self, index: usize) -> Result<()> {
        if index >= self.subbooks.len() {
            // Leaves current subbook unchanged, per §8 scenario f.
            return Err(Error::NoSuchSubbook(index));
        }
        self.subbooks[index].initialise(&self.path, self.disc, self.char_code, self.epwing_version)?;
        self.current_subbook = Some(index);
        Ok(())
    }

    pub fn current_subbook(&self) -> Result<&Subbook> {
        let idx = self.current_subbook.ok_or(Error::NoCurrentSubbook)?;
        Ok(&self.subbooks[idx])
    }

    pub fn current_subbook_mut(&mut self) -> Result<&mut Subbook> {
        let idx = self.current_subbook.ok_or(Error::NoCurrentSubbook)?;
        Ok(&mut self.subbooks[idx])
    }

    pub fn set_font(&mut self, code: FontCode, narrow: bool) -> Result<()> {
        self.current_subbook_mut()?.set_font(code, narrow)
    }

    /// Every font height registered in the current subbook, narrow or wide,
    /// sorted ascending (§8 scenario b: `eb_font_list` returns a sorted list).
    pub fn font_list(&self, narrow: bool) -> Result<Vec<FontCode>> {
        let sub = self.current_subbook()?;
        let map = if narrow { &sub.narrow_fonts } else { &sub.wide_fonts };
        let mut codes: Vec<FontCode> = map.keys().copied().collect();
        codes.sort_by_key(|c| c.height());
        Ok(codes)
    }

    /// Read one character's bitmap from the current narrow/wide font (§6,
    /// §8 scenario b).
    pub fn read_glyph(&mut self, ch: u16, narrow: bool) -> Result<Vec<u8>> {
        self.current_subbook_mut()?
            .current_font_mut(narrow)?
            .read_glyph(ch, narrow)
    }

    /// Make the monochrome bitmap at `position` the current binary (§4.6).
    pub fn set_binary_bitmap(&mut self, position: Position, width: u32, height: u32) -> Result<()> {
        self.current_subbook_mut()?.set_binary_bitmap(position, width, height)
    }

    /// Make the color BMP/JPEG graphic at `position` the current binary
    /// (§4.6).
    pub fn set_binary_color_graphic(&mut self, position: Position) -> Result<()> {
        self.current_subbook_mut()?.set_binary_color_graphic(position)
    }

    /// Make the WAVE sound spanning `[start, end)` the current binary
    /// (§4.6).
    pub fn set_binary_wave(&mut self, start: Position, end: Position) -> Result<()> {
        self.current_subbook_mut()?.set_binary_wave(start, end)
    }

    /// Read up to `buf.len()` bytes of the current binary (§4.6).
    pub fn read_binary(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.current_subbook_mut()?.read_binary(buf)
    }

    /// Clear the current binary (§4.6).
    pub fn unset_binary(&mut self) -> Result<()> {
        self.current_subbook_mut()?.unset_binary();
        Ok(())
    }

    fn code(&self) -> Code {
        match self.char_code {
            CharCode::Iso8859_1 => Code::Iso8859_1,
            CharCode::JisX0208 | CharCode::JisX0208Gb2312 => Code::Jis,
        }
    }

    /// Run `method` against the current subbook's index for `word`,
    /// returning every hit. (`search_word`/`search_exactword`/etc. all
    /// funnel through here; the comparator flavor is selected by the
    /// descriptor the method maps to.)
    pub fn search(&mut self, method: SearchMethod, word: &str) -> Result<Vec<Hit>> {
        let code = self.code();
        let sub = self.current_subbook_mut()?;
        let descriptor = *sub
            .searches
            .get(&method)
            .ok_or(Error::NoSuchSearchMethod)?;
        let text = sub.text.as_mut().ok_or(Error::NoCurrentSubbook)?;

        let mut ctx = SearchContext::new(word.as_bytes(), code, descriptor)?;
        let mut hits = Vec::new();
        while let Some(hit) = ctx.next_hit(text)? {
            hits.push(hit);
        }
        Ok(hits)
    }

    /// Run a MultiSearch (§3.1, §4.6): each of `words` is matched against its
    /// corresponding labeled sub-index, and only hits whose text position
    /// agrees across every supplied word survive, mirroring `eb_search_multi`
    /// running one `SearchContext` per keyword and intersecting their results.
    pub fn search_multi(&mut self, multi_index: usize, words: &[&str]) -> Result<Vec<Hit>> {
        if words.is_empty() {
            return Err(Error::EmptyWord);
        }
        if words.len() > 5 {
            return Err(Error::TooManyWords(words.len(), 5));
        }
        let code = self.code();
        let sub = self.current_subbook_mut()?;
        let multi = sub
            .multi_searches
            .get(multi_index)
            .ok_or(Error::NoSuchSearchMethod)?;
        if words.len() > multi.entries.len() {
            return Err(Error::TooManyWords(words.len(), multi.entries.len()));
        }
        let entries = multi.entries.clone();
        let text = sub.text.as_mut().ok_or(Error::NoCurrentSubbook)?;

        let mut combined: Option<Vec<Hit>> = None;
        for (entry, word) in entries.iter().zip(words.iter()) {
            if entry.start_page == 0 {
                continue;
            }
            let descriptor = SearchDescriptor {
                start_page: entry.start_page,
                end_page: entry.start_page,
                candidates_page: entry.candidates_page,
                index_kind: entry.index_kind,
                style: entry.style,
            };
            let mut ctx = SearchContext::new(word.as_bytes(), code, descriptor)?;
            let mut hits = Vec::new();
            while let Some(hit) = ctx.next_hit(text)? {
                hits.push(hit);
            }
            combined = Some(match combined {
                None => hits,
                Some(prev) => {
                    let positions: HashSet<Position> = hits.iter().map(|h| h.text).collect();
                    prev.into_iter().filter(|h| positions.contains(&h.text)).collect()
                }
            });
        }
        Ok(combined.unwrap_or_default())
    }

    /// Reposition the current subbook's text cursor to `pos` (§4.3).
    pub fn seek_text(&mut self, pos: Position) -> Result<()> {
        let offset = pos.to_offset();
        self.current_subbook_mut()?.text_context_mut().seek_text(offset);
        Ok(())
    }

    pub fn tell_text(&self) -> Result<u64> {
        Ok(self.current_subbook()?.text_context().tell_text())
    }

    fn disc_kind_for_text(&self) -> Disc {
        match self.disc {
            DiscKind::Eb => Disc::Eb,
            DiscKind::Epwing => Disc::Epwing,
        }
    }

    /// Stream decoded article text through `hookset`, writing up to
    /// `out.len()` bytes; resumable (§4.3, §8 property 4).
    pub fn read_text(&mut self, hookset: &mut Hookset, out: &mut [u8]) -> Result<usize> {
        let code = self.code();
        let disc = self.disc_kind_for_text();
        let sub = self.current_subbook_mut()?;
        let text = sub.text.as_mut().ok_or(Error::NoCurrentSubbook)?;
        let text_code = match code {
            Code::Iso8859_1 => crate::text::CharCode::Iso8859_1,
            Code::Jis => crate::text::CharCode::Jis,
        };
        sub.text_context_mut().read_text(text, text_code, disc, hookset, None, None, out)
    }

    /// Stream an article's heading (§4.3): ends at the first `0x1f 0x0a`.
    pub fn read_heading(&mut self, hookset: &mut Hookset, out: &mut [u8]) -> Result<usize> {
        let code = self.code();
        let disc = self.disc_kind_for_text();
        let sub = self.current_subbook_mut()?;
        let text = sub.text.as_mut().ok_or(Error::NoCurrentSubbook)?;
        let text_code = match code {
            Code::Iso8859_1 => crate::text::CharCode::Iso8859_1,
            Code::Jis => crate::text::CharCode::Jis,
        };
        sub.text_context_mut().read_heading(text, text_code, disc, hookset, out)
    }
}

/// Prepend the current working directory to a relative path (§6); `/` is
/// the separator on every platform this core targets.
fn canonicalize_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(Error::Io)?;
    Ok(cwd.join(path))
}

/// Locate `CATALOG`/`CATALOGS` by case-insensitive, ISO-9660-suffix-
/// tolerant lookup against the book's root directory (§4.6).
fn locate_catalog(root: &Path) -> Result<(DiscKind, PathBuf)> {
    let entries: Vec<String> = std::fs::read_dir(root)
        .map_err(|e| Error::OpenFailed {
            what: root.display().to_string(),
            source: e,
        })?
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().into_string().ok())
        .collect();
    let entry_refs: Vec<&str> = entries.iter().map(String::as_str).collect();

    if let Some(found) = filename::resolve("CATALOGS", entry_refs.iter().copied()) {
        return Ok((DiscKind::Epwing, root.join(found)));
    }
    if let Some(found) = filename::resolve("CATALOG", entry_refs.iter().copied()) {
        return Ok((DiscKind::Eb, root.join(found)));
    }
    Err(Error::BadPath(format!(
        "no CATALOG/CATALOGS found under {}",
        root.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_subbook_out_of_range_leaves_current_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("CATALOG"),
            {
                let mut data = vec![0u8; 16 + catalog::EB_CATALOG_RECORD_SIZE];
                data[0..2].copy_from_slice(&1u16.to_be_bytes());
                data[16 + 32..16 + 40].copy_from_slice(b"HONMON01");
                data
            },
        )
        .unwrap();
        let mut book = Book::bind(dir.path()).unwrap();
        assert!(book.set_subbook(5).is_err());
        assert!(book.current_subbook().is_err());
    }

    #[test]
    fn bind_detects_eb_catalog() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("catalog;1"),
            vec![0u8; 16 + catalog::EB_CATALOG_RECORD_SIZE],
        )
        .unwrap();
        let book = Book::bind(dir.path()).unwrap();
        assert_eq!(book.disc, DiscKind::Eb);
    }
}
