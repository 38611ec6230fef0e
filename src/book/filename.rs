//! ISO-9660 filename candidate generation (§6).
//!
//! Real CD-ROM filesystems may carry a trailing `;1` version suffix and/or a
//! trailing `.` before it. This produces the four candidate spellings for a
//! logical name, in lookup order; resolving a candidate against an actual
//! directory listing is left to the embedding application.

/// The four candidate spellings for logical name `name`, in try order.
pub fn candidates(name: &str) -> [String; 4] {
    [
        name.to_string(),
        format!("{name};1"),
        format!("{name}."),
        format!("{name}.;1"),
    ]
}

/// Find `name` in `entries` (an actual directory listing) case-insensitively,
/// trying each ISO-9660 candidate spelling in order. Returns the matching
/// entry's original spelling.
pub fn resolve<'a>(name: &str, entries: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    let entries: Vec<&str> = entries.into_iter().collect();
    for candidate in candidates(name) {
        if let Some(found) = entries.iter().find(|e| e.eq_ignore_ascii_case(&candidate)) {
            return Some(found);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_in_spec_order() {
        assert_eq!(
            candidates("CATALOG"),
            ["CATALOG", "CATALOG;1", "CATALOG.", "CATALOG.;1"]
        );
    }

    #[test]
    fn resolve_is_case_insensitive() {
        let entries = ["catalog;1", "honmon.ebz;1"];
        assert_eq!(resolve("CATALOG", entries), Some("catalog;1"));
    }

    #[test]
    fn resolve_misses_return_none() {
        let entries = ["honmon;1"];
        assert_eq!(resolve("CATALOG", entries), None);
    }
}
