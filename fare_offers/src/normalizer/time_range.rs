use crate::entities::TimeRange;
use crate::normalizer::clean_text;
use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};

/// `H`, `H:MM`, `HhMM` or `Hh`; the minutes are optional.
const CLOCK: &str = r"(\d{1,2})(?:\s*[:h]\s*(\d{2})?)?";
const BETWEEN: &str = r"(?:between|entre|tussen|zwischen)";
const AND: &str = r"(?:and|et|en|und|&)";
const DEPARTURE: &str = r"(?:departure|departing|depart|d[ée]part|vertrek|abfahrt)";
const SEPARATOR: &str = r"(?:\s*[-‐–—]\s*|\s+(?:to|à|a|tot|bis)\s+)";

fn build(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .expect("time range pattern to compile")
}

lazy_static! {
    /// Tried in order, the first pattern that yields a valid range wins.
    static ref TIME_RANGE_PATTERNS: Vec<Regex> = vec![
        // "Départ entre 06:10 et 14:00", "Departure between 6:10 and 14:00"
        build(&format!(r"{DEPARTURE}\D{{0,20}}?{BETWEEN}\s+{CLOCK}\s+{AND}\s+{CLOCK}")),
        // "entre 6h10 et 14h", also catches a departure word mangled by a bad encoding
        build(&format!(r"\b{BETWEEN}\s+{CLOCK}\s+{AND}\s+{CLOCK}")),
        // "06:10 - 14:00", "6h10 à 14h", "9 to 12"
        build(&format!(r"\b{CLOCK}{SEPARATOR}{CLOCK}")),
    ];

    /// Calendar dates would otherwise read as `10-14`.
    static ref DATES: Regex =
        Regex::new(r"\b(?:\d{4}-\d{1,2}-\d{1,2}|\d{1,2}[-/.]\d{1,2}[-/.]\d{2,4})\b")
            .expect("DATES to compile");
}

/// Reads the first departure window out of `text`. `None` when nothing matches,
/// which is the normal outcome for fragments without a schedule.
#[tracing::instrument(level = "trace", name = "normalize")]
pub fn parse_time_range(text: &str) -> Option<TimeRange> {
    let text = clean_text(text);
    let text = DATES.replace_all(&text, " ");

    TIME_RANGE_PATTERNS.iter().find_map(|pattern| {
        pattern.captures_iter(&text).find_map(|captures| {
            let number = |index: usize| -> Option<u32> {
                captures
                    .get(index)
                    .map_or(Some(0), |value| value.as_str().parse().ok())
            };
            TimeRange::from_parts(number(1)?, number(2)?, number(3)?, number(4)?)
        })
    })
}
