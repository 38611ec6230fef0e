//! Query canonicalisation and the three comparator variants used by paged
//! index descent.
//!
//! Canonicalisation folds a query word into the form actually stored in an
//! index, per the ten style flags carried by a search descriptor. The
//! comparators themselves are the systems-language equivalent of
//! `eb_match_canonicalized_word` / `eb_exact_match_canonicalized_word` /
//! `eb_match_word_latin` in the reference implementation: they return zero
//! on a match, negative when the word sorts before the pattern, positive
//! when it sorts after.

/// How one canonicalisation axis treats the characters it governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fold {
    AsIs,
    Convert,
    Delete,
}

/// The ten style flags of a search descriptor (§3.1).
#[derive(Debug, Clone, Copy)]
pub struct Style {
    pub katakana: Fold,
    pub case: Fold,
    pub marks: Fold,
    pub long_vowels: Fold,
    pub double_consonants: Fold,
    pub contracted_sounds: Fold,
    pub voiced_consonants: Fold,
    pub small_vowels: Fold,
    pub p_sounds: Fold,
    pub spaces: Fold,
}

impl Default for Style {
    fn default() -> Self {
        Style {
            katakana: Fold::AsIs,
            case: Fold::Convert,
            marks: Fold::AsIs,
            long_vowels: Fold::AsIs,
            double_consonants: Fold::AsIs,
            contracted_sounds: Fold::AsIs,
            voiced_consonants: Fold::AsIs,
            small_vowels: Fold::AsIs,
            p_sounds: Fold::AsIs,
            spaces: Fold::AsIs,
        }
    }
}

/// Document character code, affecting how canonicalisation treats bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
    Iso8859_1,
    Jis,
}

const EUC_HIRAGANA_ROW: u8 = 0xa4;
const EUC_KATAKANA_ROW: u8 = 0xa5;
/// EUC-JP row for half-width JIS X 0201 kana (second byte of a two-byte
/// `0x8e xx` pair, conventionally treated by this core as row 0x23 per the
/// half-width case-folding rule).
const HALF_WIDTH_ROW: u8 = 0x23;

/// Canonicalise `word` (EUC-JP bytes for [`Code::Jis`], raw ISO-8859-1 bytes
/// otherwise) according to `style`.
pub fn canonicalize(word: &[u8], code: Code, style: &Style) -> Vec<u8> {
    match code {
        Code::Iso8859_1 => word
            .iter()
            .filter_map(|&b| match style.spaces {
                Fold::Delete if b == b' ' => None,
                _ => Some(fold_ascii_case(b, style.case)),
            })
            .collect(),
        Code::Jis => canonicalize_jis(word, style),
    }
}

fn fold_ascii_case(b: u8, case: Fold) -> u8 {
    match case {
        Fold::Convert => b.to_ascii_lowercase(),
        _ => b,
    }
}

fn canonicalize_jis(word: &[u8], style: &Style) -> Vec<u8> {
    let mut out = Vec::with_capacity(word.len());
    let mut i = 0;
    while i < word.len() {
        let b0 = word[i];
        if b0 < 0x80 {
            // ASCII-range byte embedded in a JIS-mode stream.
            if style.spaces == Fold::Delete && b0 == b' ' {
                i += 1;
                continue;
            }
            out.push(fold_ascii_case(b0, style.case));
            i += 1;
            continue;
        }
        if i + 1 >= word.len() {
            out.push(b0);
            i += 1;
            continue;
        }
        let b1 = word[i + 1];
        let row = b0;
        if row == EUC_KATAKANA_ROW {
            match style.katakana {
                Fold::Convert => out.extend_from_slice(&[EUC_HIRAGANA_ROW, b1]),
                Fold::Delete => {}
                Fold::AsIs => out.extend_from_slice(&[b0, b1]),
            }
        } else if row == HALF_WIDTH_ROW {
            // Half-width kana: case-style folding only touches the second
            // (cell) byte, per the spec's row-0x23 carve-out.
            let folded_cell = fold_ascii_case(b1, style.case);
            out.extend_from_slice(&[b0, folded_cell]);
        } else {
            out.extend_from_slice(&[b0, b1]);
        }
        i += 2;
    }
    out
}

/// Prefix comparator: canonical-to-canonical. `pattern` is the page's stored
/// key bytes (not NUL-terminated); `word` is the canonicalised query,
/// conceptually NUL-terminated. Mirrors `eb_match_canonicalized_word`.
pub fn compare_prefix(word: &[u8], pattern: &[u8]) -> i32 {
    for (i, &p) in pattern.iter().enumerate() {
        match word.get(i) {
            None => return 0, // word ended inside pattern: prefix match
            Some(&w) if w != p => return w as i32 - p as i32,
            _ => {}
        }
    }
    // pattern exhausted: next word byte (or 0 if word also ended) decides order
    word.get(pattern.len()).copied().unwrap_or(0) as i32
}

/// Exact-match comparator used for single entries and group members.
/// Verbatim-to-verbatim, tolerating trailing spaces in `pattern`. Mirrors
/// `eb_exact_match_canonicalized_word`.
pub fn compare_exact(word: &[u8], pattern: &[u8]) -> i32 {
    for (i, &p) in pattern.iter().enumerate() {
        match word.get(i) {
            None => {
                let rest_is_blank = pattern[i..].iter().all(|&b| b == b' ' || b == 0);
                return if rest_is_blank { 0 } else { (word.len() as i32) - (pattern.len() as i32) };
            }
            Some(&w) if w != p => return w as i32 - p as i32,
            _ => {}
        }
    }
    word.get(pattern.len()).copied().unwrap_or(0) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_match_stops_at_word_end() {
        assert_eq!(compare_prefix(b"cat", b"catalog"), 0);
        assert_eq!(compare_prefix(b"dog", b"cat"), (b'd' as i32 - b'c' as i32));
    }

    #[test]
    fn exact_match_tolerates_trailing_spaces() {
        assert_eq!(compare_exact(b"cat", b"cat   "), 0);
        assert_eq!(compare_exact(b"cats", b"cat"), 1);
    }

    #[test]
    fn katakana_convert_folds_to_hiragana_row() {
        let style = Style { katakana: Fold::Convert, ..Style::default() };
        let word = [EUC_KATAKANA_ROW, 0xa2]; // some katakana cell
        let out = canonicalize(&word, Code::Jis, &style);
        assert_eq!(out, vec![EUC_HIRAGANA_ROW, 0xa2]);
    }

    #[test]
    fn ascii_case_convert_lowercases() {
        let style = Style::default();
        let out = canonicalize(b"APPLE", Code::Iso8859_1, &style);
        assert_eq!(out, b"apple");
    }
}
