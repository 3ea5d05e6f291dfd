//! Prefix extraction from the routing table.
//!
//! Each well-formed line of the table has exactly two whitespace-separated
//! fields, `<prefix> <asn>`. Anything else is skipped silently: the feed is
//! third-party data and a single odd line must not break the import.

use std::collections::{BTreeSet, HashSet};

/// Line counters gathered during extraction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractStats {
    pub lines: usize,
    pub malformed: usize,
    pub matched: usize,
}

/// Collect the prefixes announced by any AS in `wanted`.
///
/// AS numbers are compared verbatim against the second field: `64500` and
/// `AS64500` are different tokens. Duplicates collapse by exact string, so
/// two spellings of the same network are both kept.
///
/// # Examples
/// ```
/// use std::collections::HashSet;
/// use nft_prefix_import::extractor::extract;
///
/// let table = "10.0.0.0/8 64500\nbad-line\n192.0.2.0/24 64501\n";
/// let wanted: HashSet<String> = ["64500".to_string()].into();
/// let prefixes = extract(table, &wanted);
/// assert_eq!(prefixes.into_iter().collect::<Vec<_>>(), vec!["10.0.0.0/8"]);
/// ```
pub fn extract(snapshot: &str, wanted: &HashSet<String>) -> BTreeSet<String> {
    extract_with_stats(snapshot, wanted).0
}

/// Same as [`extract`], also reporting how many lines were scanned,
/// skipped as malformed, and matched.
pub fn extract_with_stats(
    snapshot: &str,
    wanted: &HashSet<String>,
) -> (BTreeSet<String>, ExtractStats) {
    let mut prefixes = BTreeSet::new();
    let mut stats = ExtractStats::default();

    for line in table_lines(snapshot) {
        stats.lines += 1;

        let mut fields = line.split_whitespace();
        let (prefix, asn) = match (fields.next(), fields.next(), fields.next()) {
            (Some(prefix), Some(asn), None) => (prefix, asn),
            _ => {
                stats.malformed += 1;
                continue;
            }
        };

        if wanted.contains(asn) {
            stats.matched += 1;
            prefixes.insert(prefix.to_string());
        }
    }

    (prefixes, stats)
}

/// Line terminators accepted in the table, `\r\n` counting as one.
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c'..='\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Split `text` into lines on any [`is_line_break`] character.
/// A trailing terminator does not produce an empty last line.
fn table_lines(text: &str) -> impl Iterator<Item = &str> + '_ {
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let Some(pos) = rest.find(is_line_break) else {
            let line = rest;
            rest = "";
            return Some(line);
        };
        let line = &rest[..pos];
        let terminator = rest[pos..].chars().next()?;
        let mut next = pos + terminator.len_utf8();
        if terminator == '\r' && rest[next..].starts_with('\n') {
            next += 1;
        }
        rest = &rest[next..];
        Some(line)
    })
}
