use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Header line that opens every WebVTT caption file
const VTT_HEADER: &str = "WEBVTT";

static TIMESTAMP_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{2}:[0-9]{2}").expect("valid timestamp regex"));

static MARKUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid markup regex"));

static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("valid annotation regex"));

/// Convert raw caption file content into deduplicated plain text.
///
/// Drops the header, blank lines and cue timing lines, strips inline `<...>` markup
/// and `[...]` annotations, then keeps the first occurrence of every distinct line.
/// Rolling captions repeat each spoken line across several cues, so only exact
/// repeats are collapsed; near-duplicates survive.
pub fn clean(raw: &str) -> String {
    let mut seen = HashSet::new();
    let mut lines: Vec<String> = Vec::new();

    for line in raw.lines() {
        let trimmed = line.trim();
        if is_structural(trimmed) {
            continue;
        }

        let without_tags = MARKUP_TAG.replace_all(trimmed, "");
        let text = BRACKETED.replace_all(&without_tags, "");
        let text = text.trim();

        // Stripping can expose a header or cue timing, e.g. `<b>WEBVTT</b>`
        if !is_structural(text) && seen.insert(text.to_string()) {
            lines.push(text.to_string());
        }
    }

    lines.join("\n")
}

/// Blank, header and cue timing lines carry no caption text
fn is_structural(line: &str) -> bool {
    line.is_empty() || line == VTT_HEADER || TIMESTAMP_LINE.is_match(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROLLING_VTT: &str = "WEBVTT\nKind: captions\nLanguage: en\n\n\
        00:00:00.000 --> 00:00:02.000 align:start position:0%\n\
        hello<00:00:00.500><c> everyone</c>\n\n\
        00:00:02.000 --> 00:00:04.000 align:start position:0%\n\
        hello everyone\n\
        welcome<00:00:02.800><c> back</c>\n\n\
        00:00:04.000 --> 00:00:06.000\n\
        welcome back\n";

    #[test]
    fn test_drops_header_and_timestamps() {
        let cleaned = clean(ROLLING_VTT);
        assert!(!cleaned.contains("WEBVTT"));
        assert!(!cleaned.contains("-->"));
        assert!(cleaned.lines().all(|line| !TIMESTAMP_LINE.is_match(line)));
    }

    #[test]
    fn test_collapses_rolling_duplicates_in_first_seen_order() {
        assert_eq!(
            clean(ROLLING_VTT),
            "Kind: captions\nLanguage: en\nhello everyone\nwelcome back"
        );
    }

    #[test]
    fn test_strips_markup_tags() {
        assert_eq!(clean("<b>Hello</b> <i>world</i>"), "Hello world");
        assert_eq!(clean("<v Speaker><i>nested</i></v>"), "nested");
    }

    #[test]
    fn test_strips_bracketed_annotations() {
        assert_eq!(clean("[Music] Hello there"), "Hello there");
        assert_eq!(clean("[Applause]\n[Music]"), "");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(clean(""), "");
        assert_eq!(clean("WEBVTT\n\n   \n"), "");
    }

    #[test]
    fn test_srt_cues() {
        let srt = "1\n00:00:01,000 --> 00:00:02,000\nFirst line\n\n2\n00:00:02,000 --> 00:00:03,000\nFirst line\nSecond line\n";
        assert_eq!(clean(srt), "1\nFirst line\n2\nSecond line");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            ROLLING_VTT,
            "<b>Hello</b> <i>world</i>",
            "[Music] Hello there\nHello there\n  spaced  ",
            "a\nb\na\nc\nb",
            "<b>WEBVTT</b>",
            "[Music] 12:30 tonight",
            "<i>00:01</i> --> <i>00:02</i>",
        ];
        for input in inputs {
            let once = clean(input);
            assert_eq!(clean(&once), once);
        }
    }

    #[test]
    fn test_drops_markers_exposed_by_stripping() {
        assert_eq!(clean("<b>WEBVTT</b>\nkept"), "kept");
        assert_eq!(clean("[Music] 12:30 tonight\nkept"), "kept");
        assert_eq!(clean("<c.colorE5E5E5>00:00:05.120</c> --> 00:00:07.000"), "");
    }

    #[test]
    fn test_keeps_lines_starting_with_non_ascii_digits() {
        assert_eq!(clean("١٢:٣٤ مرحبا"), "١٢:٣٤ مرحبا");
        assert_eq!(clean("１２:３４ fullwidth"), "１２:３４ fullwidth");
    }

    #[test]
    fn test_output_lines_are_distinct() {
        let cleaned = clean("x\ny\n<i>x</i>\n[note] y\nz\n");
        let lines: Vec<&str> = cleaned.lines().collect();
        let unique: HashSet<&str> = lines.iter().copied().collect();
        assert_eq!(lines.len(), unique.len());
        assert_eq!(lines, vec!["x", "y", "z"]);
    }
}
