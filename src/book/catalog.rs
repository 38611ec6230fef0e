//! Catalog record parsing (EB 40-byte / EPWING 164-byte records, §6) and the
//! SONY/Waei/Kagakugijutsu character-code heuristics (§4.6).

use bstr::ByteSlice;

use crate::error::{Error, Result};

/// Disc family, determined by which catalog filename was found (`CATALOG`
/// for EB, `CATALOGS` for EPWING).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscKind {
    Eb,
    Epwing,
}

/// Document character code, per §3.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharCode {
    Iso8859_1,
    JisX0208,
    JisX0208Gb2312,
}

pub const EB_CATALOG_RECORD_SIZE: usize = 40;
pub const EPWING_CATALOG_RECORD_SIZE: usize = 164;

/// One subbook entry as parsed straight from the catalog, before any
/// heuristic override is applied.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    /// Title, converted from JIS X 0208 to EUC-JP on ingest.
    pub title: Vec<u8>,
    pub directory: String,
    /// EPWING only: the subbook's index page.
    pub index_page: u32,
    pub narrow_font_files: Vec<String>,
    pub wide_font_files: Vec<String>,
}

/// Parse every record out of a raw catalog file body.
pub fn parse(data: &[u8], disc: DiscKind) -> Result<Vec<CatalogEntry>> {
    match disc {
        DiscKind::Eb => parse_eb(data),
        DiscKind::Epwing => parse_epwing(data),
    }
}

fn subbook_count(data: &[u8]) -> Result<usize> {
    if data.len() < 2 {
        return Err(Error::UnexpectedFormat("catalog too short".into()));
    }
    // Historical source tested `EB_MAX_SUBBOOKS == 0` here after clamping
    // count to the compile-time maximum; that branch is dead (the constant
    // is never zero). We only keep the clamp.
    let count = u16::from_be_bytes([data[0], data[1]]) as usize;
    Ok(count.min(50))
}

fn parse_eb(data: &[u8]) -> Result<Vec<CatalogEntry>> {
    let count = subbook_count(data)?;
    let mut entries = Vec::with_capacity(count);
    for i in 0..count {
        let start = 16 + i * EB_CATALOG_RECORD_SIZE;
        let end = start + EB_CATALOG_RECORD_SIZE;
        if end > data.len() {
            return Err(Error::UnexpectedFormat("truncated EB catalog".into()));
        }
        let record = &data[start..end];
        let title = jis_title_to_euc(&record[2..32]);
        let directory = ascii_field(&record[32..40]);
        entries.push(CatalogEntry {
            title,
            directory,
            index_page: 0,
            narrow_font_files: Vec::new(),
            wide_font_files: Vec::new(),
        });
    }
    Ok(entries)
}

fn parse_epwing(data: &[u8]) -> Result<Vec<CatalogEntry>> {
    let count = subbook_count(data)?;
    let mut entries = Vec::with_capacity(count);
    for i in 0..count {
        let start = 16 + i * EPWING_CATALOG_RECORD_SIZE;
        let end = start + EPWING_CATALOG_RECORD_SIZE;
        if end > data.len() {
            return Err(Error::UnexpectedFormat("truncated EPWING catalog".into()));
        }
        let record = &data[start..end];
        let title = jis_title_to_euc(&record[2..82]);
        let directory = ascii_field(&record[82..90]);
        let index_page = u32::from_be_bytes([record[90], record[91], record[92], record[93]]);

        let mut wide_font_files = Vec::with_capacity(4);
        let mut narrow_font_files = Vec::with_capacity(4);
        for k in 0..4usize {
            let wide_off = 2 + 80 + 18 + k * 8;
            let narrow_off = 2 + 80 + 50 + k * 8;
            wide_font_files.push(ascii_field(&record[wide_off..wide_off + 8]));
            narrow_font_files.push(ascii_field(&record[narrow_off..narrow_off + 8]));
        }

        entries.push(CatalogEntry {
            title,
            directory,
            index_page,
            narrow_font_files,
            wide_font_files,
        });
    }
    Ok(entries)
}

fn ascii_field(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    bytes[..end].trim_end().to_str_lossy().into_owned()
}

/// Convert a big-endian JIS X 0208 title field to EUC-JP by OR-ing 0x8080
/// into each two-byte character; stops at the first NUL/space-padding pair.
pub(crate) fn jis_title_to_euc(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i + 1 < bytes.len() {
        let (b0, b1) = (bytes[i], bytes[i + 1]);
        if b0 == 0 {
            break;
        }
        if b0 < 0x21 || b0 > 0x7e {
            // ASCII padding byte embedded in the title field.
            out.push(b0);
            i += 1;
            continue;
        }
        out.push(b0 | 0x80);
        out.push(b1 | 0x80);
        i += 2;
    }
    out
}

/// Known-broken early titles whose catalog lies about the document
/// character code (§4.6). Matched against the trimmed directory name.
pub fn character_code_override(directory: &str) -> Option<CharCode> {
    match directory {
        // SONY DataDiskMan, Shin Eiwa Waei Chujiten, EB Kagakugijutsu Yougo
        // Daijiten: all three ship a catalog claiming ISO-8859-1 / plain
        // JIS X 0208 when the disc is actually encoded otherwise.
        "DATAPLUS" | "WAEICHUJ" => Some(CharCode::JisX0208),
        "KAGAKU" => Some(CharCode::JisX0208Gb2312),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eb_catalog(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut data = vec![0u8; 16 + entries.len() * EB_CATALOG_RECORD_SIZE];
        data[0..2].copy_from_slice(&(entries.len() as u16).to_be_bytes());
        for (i, (title, dir)) in entries.iter().enumerate() {
            let start = 16 + i * EB_CATALOG_RECORD_SIZE;
            let title_bytes = title.as_bytes();
            data[start + 2..start + 2 + title_bytes.len()].copy_from_slice(title_bytes);
            let dir_bytes = dir.as_bytes();
            data[start + 32..start + 32 + dir_bytes.len()].copy_from_slice(dir_bytes);
        }
        data
    }

    #[test]
    fn parses_directory_and_count() {
        let data = eb_catalog(&[("", "HONMON01"), ("", "HONMON02")]);
        let entries = parse(&data, DiscKind::Eb).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].directory, "HONMON01");
        assert_eq!(entries[1].directory, "HONMON02");
    }

    #[test]
    fn subbook_count_clamped_to_max() {
        let mut data = vec![0u8; 16];
        data[0..2].copy_from_slice(&60u16.to_be_bytes());
        assert_eq!(subbook_count(&data).unwrap(), 50);
    }

    #[test]
    fn truncated_catalog_is_an_error() {
        let data = vec![0u8, 1]; // claims 1 entry, has none
        assert!(parse(&data, DiscKind::Eb).is_err());
    }
}
