//! Paged index descent: the B-tree-like traversal shared by every word,
//! exactword, endword, keyword, and multi-search method.

pub mod canon;

use crate::error::{Error, Result};
use crate::position::{Page, Position, PAGE_SIZE};
use crate::zio::ZioStream;
use canon::{Code, Style};

const TAG_CONTINUE: u8 = 0x20;

/// One search method's coordinates within a subbook, per §3.1/§4.6.
#[derive(Debug, Clone, Copy)]
pub struct SearchDescriptor {
    pub start_page: Page,
    pub end_page: Page,
    /// Page of the candidates index, for multi-search leaf groups (0 = absent).
    pub candidates_page: Page,
    pub index_kind: u8,
    pub style: Style,
}

impl SearchDescriptor {
    pub fn is_available(&self) -> bool {
        self.start_page != 0
    }
}

// Latin/mixed leaves always use the prefix comparator against the
// canonicalised query (§4.5); the verbatim single/group comparator applies
// only inside KANA group records, handled directly by `read_kana_entry`.

/// One hit: the article's text position and heading position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub text: Position,
    pub heading: Position,
}

/// Cursor over one in-progress paged descent.
pub struct SearchContext {
    word_canonical: Vec<u8>,
    word_verbatim: Vec<u8>,
    code: Code,
    descriptor: SearchDescriptor,
    page: Page,
    page_kind: u8,
    /// Raw bytes of the current page, refilled on page change.
    buf: Vec<u8>,
    offset: usize,
    entry_count: u16,
    next_entry: u16,
    /// Set while inside a KANA group: the comparator result of the group's
    /// `0x80` header record, consulted by subsequent `0xC0` members.
    group_result: Option<i32>,
    done: bool,
}

impl SearchContext {
    /// Start a descent for `word` against `descriptor`, per §4.5.
    pub fn new(word: &[u8], code: Code, descriptor: SearchDescriptor) -> Result<Self> {
        if word.is_empty() {
            return Err(Error::EmptyWord);
        }
        if word.len() > 255 {
            return Err(Error::TooLongWord(word.len()));
        }
        if !descriptor.is_available() {
            return Err(Error::NoSuchSearchMethod);
        }
        let word_canonical = canon::canonicalize(word, code, &descriptor.style);
        Ok(Self {
            word_canonical,
            word_verbatim: word.to_vec(),
            code,
            descriptor,
            page: descriptor.start_page,
            page_kind: 0,
            buf: Vec::new(),
            offset: 0,
            entry_count: 0,
            next_entry: 0,
            group_result: None,
            done: false,
        })
    }

    fn load_page(&mut self, zio: &mut ZioStream) -> Result<()> {
        let pos = Position::new(self.page, 0);
        zio.lseek(pos.to_offset() as i64, crate::zio::Whence::Start)?;
        let mut buf = vec![0u8; PAGE_SIZE as usize];
        let n = zio.read(&mut buf)?;
        if n < 4 {
            return Err(Error::UnexpectedFormat("short search page".into()));
        }
        self.page_kind = buf[0];
        log::trace!("search: visiting page={} tag={:#04x}", self.page, self.page_kind);
        self.entry_count = be16(&buf[2..4]);
        self.next_entry = 0;
        self.offset = 4;
        self.group_result = None;
        self.buf = buf;
        Ok(())
    }

    /// Descend until the first hit or end of traversal (§4.5, §8 property 6:
    /// once a comparator goes negative, no further entries anywhere match).
    pub fn next_hit(&mut self, zio: &mut ZioStream) -> Result<Option<Hit>> {
        if self.done {
            return Ok(None);
        }
        if self.buf.is_empty() {
            self.load_page(zio)?;
        }
        loop {
            if self.next_entry >= self.entry_count {
                if self.page_kind & TAG_CONTINUE == 0 {
                    self.done = true;
                    return Ok(None);
                }
                self.page += 1;
                self.load_page(zio)?;
                continue;
            }
            match self.page_kind & 0x60 {
                0x00 | 0x40 => {
                    // Intermediate page: descend into the first child whose key >= query.
                    if let Some(child) = self.descend_intermediate()? {
                        self.page = child;
                        self.load_page(zio)?;
                        continue;
                    }
                    self.done = true;
                    return Ok(None);
                }
                _ => {
                    if let Some(hit) = self.read_leaf_entry()? {
                        return Ok(Some(hit));
                    }
                    if self.done {
                        return Ok(None);
                    }
                }
            }
        }
    }

    fn descend_intermediate(&mut self) -> Result<Option<Page>> {
        // Entry layout (§4.5): entry-length bytes of key, then u32 child page.
        // entry-length is carried in the page header's second byte.
        let entry_len = self.buf[1] as usize;
        while self.next_entry < self.entry_count {
            let rec_len = entry_len + 4;
            let start = self.offset;
            if start + rec_len > self.buf.len() {
                return Err(Error::UnexpectedFormat("truncated intermediate entry".into()));
            }
            let key = &self.buf[start..start + entry_len];
            self.offset += rec_len;
            self.next_entry += 1;
            let cmp = canon::compare_prefix(&self.word_canonical, key);
            if cmp <= 0 {
                let child = be32(&self.buf[start + entry_len..start + entry_len + 4]);
                return Ok(Some(child));
            }
        }
        Ok(None)
    }

    fn read_leaf_entry(&mut self) -> Result<Option<Hit>> {
        if is_kana_tag(self.page_kind) {
            self.read_kana_entry()
        } else {
            self.read_plain_entry()
        }
    }

    fn read_plain_entry(&mut self) -> Result<Option<Hit>> {
        let start = self.offset;
        if start >= self.buf.len() {
            return Err(Error::UnexpectedFormat("truncated leaf entry".into()));
        }
        let key_len = self.buf[start] as usize;
        let key_start = start + 1;
        let key_end = key_start + key_len;
        if key_end + 12 > self.buf.len() {
            return Err(Error::UnexpectedFormat("truncated leaf entry".into()));
        }
        let key = self.buf[key_start..key_end].to_vec();
        let text_page = be32(&self.buf[key_end..key_end + 4]);
        let text_offset = be16(&self.buf[key_end + 4..key_end + 6]);
        let heading_page = be32(&self.buf[key_end + 6..key_end + 10]);
        let heading_offset = be16(&self.buf[key_end + 10..key_end + 12]);
        self.offset = key_end + 12;
        self.next_entry += 1;

        let cmp = canon::compare_prefix(&self.word_canonical, &key);
        if cmp < 0 {
            self.done = true;
            return Ok(None);
        }
        if cmp > 0 {
            return Ok(None);
        }
        Ok(Some(Hit {
            text: Position::new(text_page, text_offset),
            heading: Position::new(heading_page, heading_offset),
        }))
    }

    fn read_kana_entry(&mut self) -> Result<Option<Hit>> {
        let start = self.offset;
        if start >= self.buf.len() {
            return Err(Error::UnexpectedFormat("truncated kana entry".into()));
        }
        let group_id = self.buf[start];
        let key_start = start + 1;
        if key_start >= self.buf.len() {
            return Err(Error::UnexpectedFormat("truncated kana entry".into()));
        }
        let key_len = self.buf[start + 1] as usize;
        match group_id {
            0x00 => {
                // Single entry, identical layout to a plain leaf record minus
                // the tag byte already consumed as group_id's sibling.
                let key_data_start = key_start + 1;
                let key_end = key_data_start + key_len;
                if key_end + 12 > self.buf.len() {
                    return Err(Error::UnexpectedFormat("truncated kana entry".into()));
                }
                let key = self.buf[key_data_start..key_end].to_vec();
                let text_page = be32(&self.buf[key_end..key_end + 4]);
                let text_offset = be16(&self.buf[key_end + 4..key_end + 6]);
                let heading_page = be32(&self.buf[key_end + 6..key_end + 10]);
                let heading_offset = be16(&self.buf[key_end + 10..key_end + 12]);
                self.offset = key_end + 12;
                self.next_entry += 1;
                let cmp = canon::compare_exact(&self.word_verbatim, &key);
                if cmp < 0 {
                    self.done = true;
                    return Ok(None);
                }
                if cmp > 0 {
                    return Ok(None);
                }
                Ok(Some(Hit {
                    text: Position::new(text_page, text_offset),
                    heading: Position::new(heading_page, heading_offset),
                }))
            }
            0x80 => {
                let key_data_start = key_start + 1;
                let key_end = key_data_start + key_len;
                if key_end > self.buf.len() {
                    return Err(Error::UnexpectedFormat("truncated kana group header".into()));
                }
                let key = self.buf[key_data_start..key_end].to_vec();
                self.offset = key_end;
                self.next_entry += 1;
                self.group_result = Some(canon::compare_prefix(&self.word_canonical, &key));
                Ok(None)
            }
            0xC0 => {
                let key_data_start = key_start + 1;
                let key_end = key_data_start + key_len;
                if key_end + 12 > self.buf.len() {
                    return Err(Error::UnexpectedFormat("truncated kana group member".into()));
                }
                let key = self.buf[key_data_start..key_end].to_vec();
                let text_page = be32(&self.buf[key_end..key_end + 4]);
                let text_offset = be16(&self.buf[key_end + 4..key_end + 6]);
                let heading_page = be32(&self.buf[key_end + 6..key_end + 10]);
                let heading_offset = be16(&self.buf[key_end + 10..key_end + 12]);
                self.offset = key_end + 12;
                self.next_entry += 1;
                let group_ok = matches!(self.group_result, Some(0));
                let member_ok = canon::compare_exact(&self.word_verbatim, &key) == 0;
                if group_ok && member_ok {
                    return Ok(Some(Hit {
                        text: Position::new(text_page, text_offset),
                        heading: Position::new(heading_page, heading_offset),
                    }));
                }
                Ok(None)
            }
            _ => Err(Error::UnexpectedFormat(format!(
                "bad kana group id {:#04x}",
                group_id
            ))),
        }
    }
}

fn is_kana_tag(tag: u8) -> bool {
    matches!(tag & 0xF0, 0x90 | 0xB0 | 0xD0 | 0xF0)
}

fn be16(bytes: &[u8]) -> u16 {
    u16::from_be_bytes([bytes[0], bytes[1]])
}

fn be32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
