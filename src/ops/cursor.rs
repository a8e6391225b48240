use crate::util::unicode;

/// Measures how wide a run of text renders in the live rendering context.
/// Offsets computed with one measure are only meaningful for text laid out
/// with that same measure.
pub trait TextMeasure {
    fn width(&self, text: &str) -> f32;
}

/// Terminal cell metrics: every cell is `cell_width` units wide and text is
/// laid out with the same display-width rules the renderer uses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellMetrics {
    pub cell_width: f32,
}

impl Default for CellMetrics {
    fn default() -> Self {
        CellMetrics { cell_width: 1.0 }
    }
}

impl TextMeasure for CellMetrics {
    fn width(&self, text: &str) -> f32 {
        unicode::display_width(text) as f32 * self.cell_width
    }
}

impl<F: Fn(&str) -> f32> TextMeasure for F {
    fn width(&self, text: &str) -> f32 {
        self(text)
    }
}

/// Character index in `0..=text.chars().count()` whose insertion point is
/// closest to `click_x`, measured from the left edge of the text.
///
/// Walks prefixes left to right and stops at the first one wider than the
/// click; the click then snaps to whichever side of that character is
/// nearer, the right side winning an exact tie. A click past the last
/// character lands at the end.
pub fn locate_offset(text: &str, measure: &impl TextMeasure, click_x: f32) -> usize {
    let len = text.chars().count();
    if len == 0 {
        return 0;
    }

    let mut prev_width = 0.0;
    for (i, byte_end) in prefix_ends(text).enumerate() {
        let width = measure.width(&text[..byte_end]);
        if width > click_x {
            if i == 0 {
                return 0;
            }
            let offset = if click_x - prev_width < width - click_x {
                i - 1
            } else {
                i
            };
            return offset.min(len);
        }
        prev_width = width;
    }
    len
}

/// Byte offset ending each character prefix, starting with the empty one.
fn prefix_ends(text: &str) -> impl Iterator<Item = usize> + '_ {
    std::iter::once(0).chain(text.char_indices().map(|(b, c)| b + c.len_utf8()))
}

/// Convert a character index to a byte offset into `text`, clamped to the end.
pub fn char_to_byte(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map_or(text.len(), |(b, _)| b)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Proportional toy font: 'i' is narrow, 'W' is wide, everything else 10.
    fn proportional(text: &str) -> f32 {
        text.chars()
            .map(|c| match c {
                'i' => 4.0,
                'W' => 16.0,
                _ => 10.0,
            })
            .sum()
    }

    #[test]
    fn empty_text_is_always_zero() {
        let m = CellMetrics::default();
        assert_eq!(locate_offset("", &m, 0.0), 0);
        assert_eq!(locate_offset("", &m, 57.0), 0);
        assert_eq!(locate_offset("", &m, -3.0), 0);
    }

    #[test]
    fn click_left_of_text_is_zero() {
        assert_eq!(locate_offset("hello", &CellMetrics::default(), -5.0), 0);
        assert_eq!(locate_offset("hello", &CellMetrics::default(), 0.0), 0);
    }

    #[test]
    fn click_beyond_text_is_end() {
        let m = CellMetrics::default();
        assert_eq!(locate_offset("hello", &m, 5.0), 5);
        assert_eq!(locate_offset("hello", &m, 500.0), 5);
    }

    #[test]
    fn snaps_to_nearer_side() {
        // "abc" with 10-unit glyphs: boundaries at 0, 10, 20, 30
        let m = CellMetrics { cell_width: 10.0 };
        assert_eq!(locate_offset("abc", &m, 12.0), 1);
        assert_eq!(locate_offset("abc", &m, 18.0), 2);
    }

    #[test]
    fn exact_midpoint_goes_right() {
        let m = CellMetrics { cell_width: 10.0 };
        assert_eq!(locate_offset("abc", &m, 15.0), 2);
    }

    #[test]
    fn terminal_cell_left_edge_lands_before_char() {
        let m = CellMetrics::default();
        // Clicking the cell holding 'b' puts the caret before 'b'
        assert_eq!(locate_offset("abc", &m, 1.0), 1);
    }

    #[test]
    fn uses_the_supplied_measure() {
        // "iW": boundaries at 0, 4, 20
        assert_eq!(locate_offset("iW", &proportional, 11.0), 1);
        assert_eq!(locate_offset("iW", &proportional, 13.0), 2);
        // Same click with uniform cells would pick differently
        let uniform = CellMetrics { cell_width: 10.0 };
        assert_eq!(locate_offset("iW", &uniform, 13.0), 1);
    }

    #[test]
    fn wide_characters_count_as_one_offset() {
        // "你好" is 4 cells, 2 characters
        let m = CellMetrics::default();
        assert_eq!(locate_offset("你好", &m, 2.0), 1);
        assert_eq!(locate_offset("你好", &m, 3.5), 2);
    }

    #[test]
    fn monotonic_in_x() {
        let text = "Plan the quarterly review";
        let m = CellMetrics { cell_width: 7.5 };
        let mut last = 0;
        let mut x = -10.0;
        while x < 250.0 {
            let k = locate_offset(text, &m, x);
            assert!(k >= last, "offset went back at x={x}");
            assert!(k <= text.chars().count());
            last = k;
            x += 0.5;
        }
        assert_eq!(last, text.chars().count());
    }

    #[test]
    fn char_to_byte_clamps_to_end() {
        let s = "a你b";
        assert_eq!(char_to_byte(s, 0), 0);
        assert_eq!(char_to_byte(s, 2), 4);
        assert_eq!(char_to_byte(s, 3), 5);
        assert_eq!(char_to_byte(s, 99), 5);
    }
}
