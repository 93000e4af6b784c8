//! Locale tolerant readers for the free text the scraper hands over.
//!
//! Nothing in here fails: text that cannot be read yields `None` (time ranges)
//! or `f64::INFINITY` (prices).

mod price;
mod time_range;

pub use price::parse_price;
pub use time_range::parse_time_range;

use std::borrow::Cow;

/// Decodes scraped bytes, replacing invalid UTF-8 sequences with U+FFFD so that
/// corrupted input simply fails to match later on.
pub fn decode_lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Folds the no-break spaces French pages put around `€` and `h` into plain spaces.
pub(crate) fn clean_text(text: &str) -> Cow<'_, str> {
    if text.contains(['\u{a0}', '\u{202f}', '\u{2007}']) {
        Cow::Owned(text.replace(['\u{a0}', '\u{202f}', '\u{2007}'], " "))
    } else {
        Cow::Borrowed(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_utf8_is_replaced_instead_of_failing() {
        let decoded = decode_lossy(b"D\xe9part entre 06:10 et 14:00");
        assert!(decoded.contains('\u{fffd}'));
        let range = parse_time_range(&decoded).unwrap();
        assert_eq!(range.start_text(), "06:10");
        assert_eq!(range.end_text(), "14:00");
    }

    #[test]
    fn test_no_break_spaces_become_plain_spaces() {
        assert_eq!(clean_text("12,50\u{a0}€"), "12,50 €");
        assert!(matches!(clean_text("12,50 €"), Cow::Borrowed(_)));
    }
}
