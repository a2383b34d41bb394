//! Weighted length estimation.
//!
//! Whitespace is free, CJK ideographs count [`CJK_UNIT_WEIGHT`] units and
//! every other character counts one unit.

/// Units counted for a single CJK ideograph.
pub const CJK_UNIT_WEIGHT: usize = 2;

/// Factor converting a configured character limit into a unit budget.
///
/// Limits are tuned for a mixed CJK/ASCII deck; doubling keeps pure ASCII
/// content from being split far too early.
pub const LIMIT_UNIT_FACTOR: usize = 2;

/// Converts a configured character limit into weighted units.
#[inline]
pub const fn weighted_limit_units(limit: usize) -> usize {
    limit.saturating_mul(LIMIT_UNIT_FACTOR)
}

/// Returns the weighted length of `text`.
pub fn weighted_length(text: &str) -> usize {
    text.chars().map(char_units).sum()
}

/// Returns the weighted units of a single character.
#[inline]
pub fn char_units(c: char) -> usize {
    if c.is_whitespace() {
        0
    } else if is_cjk(c) {
        CJK_UNIT_WEIGHT
    } else {
        1
    }
}

/// Returns true for CJK unified and compatibility ideographs.
pub fn is_cjk(c: char) -> bool {
    matches!(
        c as u32,
        0x4E00..=0x9FFF
            | 0x3400..=0x4DBF
            | 0x20000..=0x2A6DF
            | 0x2A700..=0x2B73F
            | 0x2B740..=0x2B81F
            | 0x2B820..=0x2CEAF
            | 0xF900..=0xFAFF
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_counts_characters() {
        assert_eq!(weighted_length("abc!"), 4);
    }

    #[test]
    fn cjk_counts_double() {
        assert_eq!(weighted_length("中文字"), 6);
        assert_eq!(weighted_length("\u{20000}"), 2);
    }

    #[test]
    fn whitespace_is_free() {
        assert_eq!(weighted_length(" a \t b\n"), 2);
        assert_eq!(weighted_length("中 文"), 4);
        assert_eq!(weighted_length("   "), 0);
    }

    #[test]
    fn fullwidth_punctuation_is_single_unit() {
        assert_eq!(weighted_length("。"), 1);
    }

    #[test]
    fn limit_is_doubled() {
        assert_eq!(weighted_limit_units(300), 600);
        assert_eq!(weighted_limit_units(0), 0);
    }
}
