//! Column arithmetic for rendering match highlights in tab-expanded lines.

use crate::models::{LineFragmentMatch, Range};

pub const DEFAULT_TAB_SIZE: usize = 4;

/// Translate a raw 0-based character offset into the column it occupies once
/// every tab before it is expanded to `tab_size` columns.
///
/// Expects `source_offset <= line.chars().count()`; past the end only the
/// tabs of the whole line are counted.
pub fn adjust_offset_for_tabs(line: &str, source_offset: usize, tab_size: usize) -> usize {
    let tabs = line
        .chars()
        .take(source_offset)
        .filter(|&c| c == '\t')
        .count();
    source_offset + tab_size.max(1).saturating_sub(1) * tabs
}

pub fn expand_tabs(line: &str, tab_size: usize) -> String {
    line.replace('\t', &" ".repeat(tab_size.max(1)))
}

/// Character offset of a byte offset within `line`. Offsets inside a
/// multi-byte character count that character as passed.
pub fn byte_to_char_offset(line: &str, byte_offset: usize) -> usize {
    line.char_indices()
        .take_while(|&(index, _)| index < byte_offset)
        .count()
}

/// Raw 0-based `[start, end)` character columns on `line_number` covered by `ranges`.
///
/// Ranges use 1-based lines and columns; a range spanning several lines
/// covers the rest of its first line, all of its middle lines and the start
/// of its last line.
pub fn match_columns(ranges: &[Range], line_number: u32, line_len: usize) -> Vec<(usize, usize)> {
    let mut spans: Vec<(usize, usize)> = ranges
        .iter()
        .filter(|r| r.start.line_number <= line_number && line_number <= r.end.line_number)
        .map(|r| {
            let start = if r.start.line_number == line_number {
                column_index(r.start.column)
            } else {
                0
            };
            let end = if r.end.line_number == line_number {
                column_index(r.end.column)
            } else {
                line_len
            };
            (start.min(line_len), end.min(line_len))
        })
        .filter(|(start, end)| start < end)
        .collect();
    spans.sort_unstable();
    spans
}

/// Sorted `[start, end)` character columns of byte-offset `fragments` on `line`,
/// clamped to the line.
pub fn fragment_spans(line: &str, fragments: &[LineFragmentMatch]) -> Vec<(usize, usize)> {
    let mut spans: Vec<(usize, usize)> = fragments
        .iter()
        .map(|fragment| {
            let start = fragment.line_offset.min(line.len());
            let end = fragment
                .line_offset
                .saturating_add(fragment.match_length)
                .min(line.len());
            (
                byte_to_char_offset(line, start),
                byte_to_char_offset(line, end),
            )
        })
        .filter(|(start, end)| start < end)
        .collect();
    spans.sort_unstable();
    spans
}

fn column_index(column: u32) -> usize {
    usize::try_from(column.saturating_sub(1)).unwrap_or(usize::MAX)
}

/// Expand tabs in `line` and wrap every span (raw character columns) with `paint`.
///
/// Overlapping spans are merged into the earlier one.
pub fn highlight_line<F>(line: &str, spans: &[(usize, usize)], tab_size: usize, paint: F) -> String
where
    F: Fn(&str) -> String,
{
    let expanded: Vec<char> = expand_tabs(line, tab_size).chars().collect();
    let mut out = String::with_capacity(expanded.len());
    let mut cursor = 0;

    for &(start, end) in spans {
        let start = adjust_offset_for_tabs(line, start, tab_size)
            .max(cursor)
            .min(expanded.len());
        let end = adjust_offset_for_tabs(line, end, tab_size).min(expanded.len());
        if start >= end {
            continue;
        }
        out.extend(&expanded[cursor..start]);
        out.push_str(&paint(&expanded[start..end].iter().collect::<String>()));
        cursor = end;
    }
    out.extend(&expanded[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Position;

    fn range(start: (u32, u32), end: (u32, u32)) -> Range {
        Range {
            start: Position {
                byte_offset: 0,
                line_number: start.0,
                column: start.1,
            },
            end: Position {
                byte_offset: 0,
                line_number: end.0,
                column: end.1,
            },
        }
    }

    #[test]
    fn offset_zero_is_zero() {
        for tab_size in 1..8 {
            assert_eq!(adjust_offset_for_tabs("\t\tx", 0, tab_size), 0);
        }
    }

    #[test]
    fn lines_without_tabs_are_unchanged() {
        assert_eq!(adjust_offset_for_tabs("let x = 1;", 4, 8), 4);
        assert_eq!(adjust_offset_for_tabs("abc\tdef", 3, 4), 3);
    }

    #[test]
    fn each_tab_adds_tab_size_minus_one() {
        assert_eq!(adjust_offset_for_tabs("\tabc", 4, 4), 7);
        assert_eq!(adjust_offset_for_tabs("\t\tabc", 3, 4), 9);
        assert_eq!(adjust_offset_for_tabs("\tabc", 4, 1), 4);
        assert_eq!(adjust_offset_for_tabs("\tabc", 4, 0), 4);
    }

    #[test]
    fn offsets_past_the_end_count_all_tabs() {
        assert_eq!(adjust_offset_for_tabs("\ta", 10, 4), 13);
    }

    #[test]
    fn byte_offsets_map_to_chars() {
        assert_eq!(byte_to_char_offset("héllo", 0), 0);
        assert_eq!(byte_to_char_offset("héllo", 3), 2);
        assert_eq!(byte_to_char_offset("héllo", 2), 2);
        assert_eq!(byte_to_char_offset("abc", 10), 3);
    }

    #[test]
    fn columns_for_single_and_multi_line_ranges() {
        let ranges = [range((2, 5), (2, 9)), range((3, 3), (5, 2))];
        assert!(match_columns(&ranges, 1, 20).is_empty());
        assert_eq!(match_columns(&ranges, 2, 20), vec![(4, 8)]);
        assert_eq!(match_columns(&ranges, 3, 20), vec![(2, 20)]);
        assert_eq!(match_columns(&ranges, 4, 10), vec![(0, 10)]);
        assert_eq!(match_columns(&ranges, 5, 10), vec![(0, 1)]);
    }

    #[test]
    fn highlight_accounts_for_tabs() {
        let rendered = highlight_line("\tfoo bar", &[(1, 4)], 4, |s| format!("[{s}]"));
        assert_eq!(rendered, "    [foo] bar");
    }

    #[test]
    fn highlight_multiple_and_overlapping_spans() {
        let rendered = highlight_line("abcdefgh", &[(0, 2), (1, 4), (6, 8)], 4, |s| {
            format!("<{s}>")
        });
        assert_eq!(rendered, "<ab><cd>ef<gh>");
    }

    fn fragment(line_offset: usize, match_length: usize) -> LineFragmentMatch {
        LineFragmentMatch {
            line_offset,
            offset: 0,
            match_length,
        }
    }

    #[test]
    fn fragment_spans_are_sorted_and_clamped() {
        let line = "foo bar";
        let spans = fragment_spans(line, &[fragment(4, 3), fragment(0, 3)]);
        assert_eq!(spans, vec![(0, 3), (4, 7)]);
        assert_eq!(
            highlight_line(line, &spans, 4, |s| format!("<{s}>")),
            "<foo> <bar>"
        );

        assert_eq!(fragment_spans(line, &[fragment(4, usize::MAX)]), vec![(4, 7)]);
        assert!(fragment_spans(line, &[fragment(usize::MAX, 1)]).is_empty());
    }

    #[test]
    fn fragment_spans_use_character_columns() {
        assert_eq!(fragment_spans("héllo wörld", &[fragment(7, 6)]), vec![(6, 11)]);
    }
}
