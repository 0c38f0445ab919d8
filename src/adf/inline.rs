use lazy_static::lazy_static;
use regex::{Captures, Regex};

use super::{InlineRun, Mark};

/// Inline formatter: scans a single line of text and emits the sequence of
/// inline runs for it. Stateless; the block segmenter calls it once per
/// non-code line.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchKind {
    Link,
    Code,
    Strong,
    Strike,
    Emphasis,
}

lazy_static! {
    /// Matchers tried at every scan position, in priority order. Every
    /// pattern requires at least one non-delimiter character inside, so
    /// empty forms like `****` never match.
    static ref MATCHERS: Vec<(Regex, MatchKind)> = vec![
        (Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").unwrap(), MatchKind::Link),
        (Regex::new(r"`([^`]+)`").unwrap(), MatchKind::Code),
        (Regex::new(r"\*\*([^*]+)\*\*").unwrap(), MatchKind::Strong),
        (Regex::new(r"__([^_]+)__").unwrap(), MatchKind::Strong),
        (Regex::new(r"~~([^~]+)~~").unwrap(), MatchKind::Strike),
        (Regex::new(r"\*([^*]+)\*").unwrap(), MatchKind::Emphasis),
        (Regex::new(r"_([^_]+)_").unwrap(), MatchKind::Emphasis),
    ];
}

struct InlineMatch<'t> {
    start: usize,
    end: usize,
    caps: Captures<'t>,
    kind: MatchKind,
}

/// Format one line into inline runs. Never returns an empty sequence: a line
/// with no recognized markup comes back as a single plain run.
pub fn format(line: &str) -> Vec<InlineRun> {
    let mut runs = Vec::new();
    let mut rest = line;

    while let Some(found) = earliest_match(rest) {
        if found.start > 0 {
            runs.push(InlineRun::plain(&rest[..found.start]));
        }
        runs.push(run_for(&found));
        rest = &rest[found.end..];
    }

    if !rest.is_empty() || runs.is_empty() {
        runs.push(InlineRun::plain(rest));
    }
    runs
}

/// Find the match closest to the start of `text`. Ties between matchers
/// starting at the same position resolve to the earlier entry in the table.
fn earliest_match(text: &str) -> Option<InlineMatch<'_>> {
    let mut best: Option<InlineMatch<'_>> = None;
    for (pattern, kind) in MATCHERS.iter() {
        if let Some(found) = match_in(pattern, *kind, text) {
            let closer = best.as_ref().is_none_or(|b| found.start < b.start);
            if closer {
                best = Some(found);
            }
        }
    }
    best
}

fn match_in<'t>(pattern: &Regex, kind: MatchKind, text: &'t str) -> Option<InlineMatch<'t>> {
    let caps = pattern.captures(text)?;
    let whole = caps.get(0)?;
    Some(InlineMatch {
        start: whole.start(),
        end: whole.end(),
        caps,
        kind,
    })
}

fn run_for(found: &InlineMatch<'_>) -> InlineRun {
    let inner = found.caps.get(1).map_or("", |m| m.as_str());
    match found.kind {
        MatchKind::Link => {
            let href = found.caps.get(2).map_or("", |m| m.as_str());
            InlineRun::marked(inner, Mark::Link {
                href: href.to_string(),
            })
        }
        MatchKind::Code => InlineRun::marked(inner, Mark::Code),
        MatchKind::Strong => InlineRun::marked(inner, Mark::Strong),
        MatchKind::Strike => InlineRun::marked(inner, Mark::Strike),
        MatchKind::Emphasis => InlineRun::marked(inner, Mark::Emphasis),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_line_passes_through() {
        assert_eq!(format("just text"), vec![InlineRun::plain("just text")]);
    }

    #[test]
    fn test_empty_line_yields_one_run() {
        assert_eq!(format(""), vec![InlineRun::plain("")]);
    }

    #[test]
    fn test_strong_asterisks() {
        assert_eq!(format("**bold**"), vec![InlineRun::marked(
            "bold",
            Mark::Strong
        )]);
    }

    #[test]
    fn test_strong_underscores() {
        assert_eq!(format("__bold__"), vec![InlineRun::marked(
            "bold",
            Mark::Strong
        )]);
    }

    #[test]
    fn test_emphasis_both_delimiters() {
        assert_eq!(format("*em*"), vec![InlineRun::marked("em", Mark::Emphasis)]);
        assert_eq!(format("_em_"), vec![InlineRun::marked("em", Mark::Emphasis)]);
    }

    #[test]
    fn test_strike() {
        assert_eq!(format("~~gone~~"), vec![InlineRun::marked(
            "gone",
            Mark::Strike
        )]);
    }

    #[test]
    fn test_inline_code() {
        assert_eq!(format("`x + 1`"), vec![InlineRun::marked(
            "x + 1",
            Mark::Code
        )]);
    }

    #[test]
    fn test_link_carries_target() {
        assert_eq!(format("[click](http://x)"), vec![InlineRun::marked(
            "click",
            Mark::Link {
                href: "http://x".to_string()
            }
        )]);
    }

    #[test]
    fn test_text_between_and_after_matches() {
        assert_eq!(format("Sub *em* and **strong**"), vec![
            InlineRun::plain("Sub "),
            InlineRun::marked("em", Mark::Emphasis),
            InlineRun::plain(" and "),
            InlineRun::marked("strong", Mark::Strong),
        ]);
    }

    #[test]
    fn test_trailing_plain_text() {
        assert_eq!(format("**a** tail"), vec![
            InlineRun::marked("a", Mark::Strong),
            InlineRun::plain(" tail"),
        ]);
    }

    #[test]
    fn test_double_asterisks_win_over_single() {
        // Both the strong and emphasis patterns could bite into "**x**"; the
        // strong form starts earlier and must win.
        assert_eq!(format("**x**"), vec![InlineRun::marked("x", Mark::Strong)]);
    }

    #[test]
    fn test_code_beats_emphasis_at_same_position() {
        assert_eq!(format("`*not em*`"), vec![InlineRun::marked(
            "*not em*",
            Mark::Code
        )]);
    }

    #[test]
    fn test_empty_delimiters_stay_literal() {
        assert_eq!(format("****"), vec![InlineRun::plain("****")]);
        assert_eq!(format("``"), vec![InlineRun::plain("``")]);
    }

    #[test]
    fn test_unmatched_delimiter_stays_literal() {
        assert_eq!(format("a ** b"), vec![InlineRun::plain("a ** b")]);
    }

    #[test]
    fn test_no_backtracking_into_emitted_text() {
        // The first match consumes through "b*"; the remaining "*c" has no
        // closing delimiter and stays plain.
        assert_eq!(format("*a*b*c"), vec![
            InlineRun::marked("a", Mark::Emphasis),
            InlineRun::plain("b*c"),
        ]);
    }

    #[test]
    fn test_at_most_one_mark_per_run() {
        for run in format("**bold with *inner* text**") {
            assert!(run.marks.len() <= 1);
        }
    }
}
