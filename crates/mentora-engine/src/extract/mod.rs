//! Heading-based section extraction for proposal documents.
//!
//! Matching is ASCII case-insensitive over an upper-cased copy of the text,
//! so every offset found in the copy is a valid offset into the original.
//! Nothing here fails: a section that cannot be located is an empty string.

mod rules;

pub use rules::{SectionRule, SECTION_RULES, TITLE_STOPWORDS, TITLE_WINDOW_END};

use mentora_core::sections::SectionMap;

/// Returned by [`extract_title`] when no line qualifies.
pub const TITLE_NOT_FOUND: &str = "Judul tidak ditemukan";

/// Title window when the document has no abstract heading, in characters.
const TITLE_FALLBACK_CHARS: usize = 2500;
const MIN_TITLE_CHARS: usize = 10;
/// A start-heading line with more dots than this is a table-of-contents entry.
const TOC_MAX_DOTS: usize = 10;
/// An end-heading line is accepted below this many words (or with a digit).
const END_LINE_MAX_WORDS: usize = 5;

/// Extract every section of a proposal.
pub fn extract_sections(text: &str) -> SectionMap {
    let mut sections = SectionMap {
        title: extract_title(text),
        ..SectionMap::default()
    };
    for rule in &SECTION_RULES {
        sections.set(rule.key, extract_section(text, rule.start_keys, rule.end_keys));
    }
    sections
}

/// Pick the title from the cover page: the longest all-caps line before the
/// abstract, else the longest line, skipping short lines and boilerplate.
pub fn extract_title(text: &str) -> String {
    let upper = text.to_ascii_uppercase();
    let window = match find_earliest(&upper, 0, TITLE_WINDOW_END) {
        Some((pos, _)) => &text[..pos],
        None => prefix_chars(text, TITLE_FALLBACK_CHARS),
    };

    let mut longest: Option<(usize, &str)> = None;
    let mut longest_upper: Option<(usize, &str)> = None;
    for line in window.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let chars = line.chars().count();
        if chars < MIN_TITLE_CHARS {
            continue;
        }
        let line_upper = line.to_ascii_uppercase();
        if TITLE_STOPWORDS.iter().any(|w| line_upper.contains(w)) {
            continue;
        }
        if longest.map_or(true, |(n, _)| chars > n) {
            longest = Some((chars, line));
        }
        if is_all_caps(line) && longest_upper.map_or(true, |(n, _)| chars > n) {
            longest_upper = Some((chars, line));
        }
    }

    longest_upper
        .or(longest)
        .map_or(TITLE_NOT_FOUND, |(_, line)| line)
        .to_string()
}

/// Extract the text from the first real occurrence of any start key up to
/// the line holding the first accepted end key.
///
/// A start occurrence whose line contains `...` or more than ten dots is a
/// table-of-contents entry and is skipped. An end occurrence is accepted
/// only when its line (up to the end of the key) has a digit or fewer than
/// five words, so a heading mentioned mid-sentence does not cut the section.
pub fn extract_section(text: &str, start_keys: &[&str], end_keys: &[&str]) -> String {
    let upper = text.to_ascii_uppercase();
    let Some((start, key_len)) = find_start(text, &upper, start_keys) else {
        return String::new();
    };
    let end = find_end(&upper, start + key_len, end_keys).unwrap_or(text.len());
    text[start..end].trim().to_string()
}

fn find_start(text: &str, upper: &str, keys: &[&str]) -> Option<(usize, usize)> {
    let mut cursor = 0;
    loop {
        let (pos, len) = find_earliest(upper, cursor, keys)?;
        let line_end = upper[pos..].find('\n').map_or(upper.len(), |i| pos + i);
        if !is_toc_entry(&text[pos..line_end]) {
            return Some((pos, len));
        }
        cursor = line_end.max(next_char(upper, pos));
    }
}

fn find_end(upper: &str, from: usize, keys: &[&str]) -> Option<usize> {
    let mut cursor = from;
    loop {
        let (pos, len) = find_earliest(upper, cursor, keys)?;
        let line_start = upper[from..pos].rfind('\n').map_or(from, |i| from + i);
        let line = &upper[line_start..pos + len];
        if line.chars().any(char::is_numeric) || line.split_whitespace().count() < END_LINE_MAX_WORDS {
            return Some(line_start);
        }
        cursor = next_char(upper, pos);
    }
}

/// Earliest match of any key at or after `from`, as `(offset, key_len)`.
/// On a tie the key listed first wins.
fn find_earliest(upper: &str, from: usize, keys: &[&str]) -> Option<(usize, usize)> {
    let rest = upper.get(from..)?;
    keys.iter()
        .filter(|k| !k.is_empty())
        .filter_map(|k| rest.find(&k.to_ascii_uppercase()).map(|p| (from + p, k.len())))
        .min_by_key(|&(pos, _)| pos)
}

fn is_toc_entry(line: &str) -> bool {
    line.contains("...") || line.matches('.').count() > TOC_MAX_DOTS
}

/// At least one uppercase letter and no lowercase ones.
fn is_all_caps(line: &str) -> bool {
    line.chars().any(char::is_uppercase) && !line.chars().any(char::is_lowercase)
}

fn prefix_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn next_char(s: &str, pos: usize) -> usize {
    pos + s[pos..].chars().next().map_or(1, char::len_utf8)
}
