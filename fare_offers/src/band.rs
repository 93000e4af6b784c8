use crate::entities::{Band, TimeRange};

/// Departures from this hour on are afternoon departures.
const AFTERNOON_STARTS_AT_HOUR: u32 = 14;

const MORNING_KEYWORDS: &[&str] = &[
    "morning",
    "matin",
    "matinée",
    "matinee",
    "ochtend",
    "voormiddag",
    "vormittag",
    "morgens",
    "mañana",
    "manana",
];

const AFTERNOON_KEYWORDS: &[&str] = &[
    "afternoon",
    "après-midi",
    "apres-midi",
    "aprés-midi",
    "après midi",
    "apres midi",
    "middag",
    "nachmittag",
    "tarde",
];

/// Assigns offers to a band from their label first and their departure time second.
///
/// When neither says anything the offer lands in the fallback band. That default
/// (`Band::Morning`) is a business policy rather than something the data proves,
/// which is why it can be swapped with [`BandClassifier::with_fallback`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BandClassifier {
    fallback: Band,
}

impl Default for BandClassifier {
    fn default() -> Self {
        Self {
            fallback: Band::Morning,
        }
    }
}

impl BandClassifier {
    pub fn with_fallback(fallback: Band) -> Self {
        Self { fallback }
    }

    pub fn fallback(&self) -> Band {
        self.fallback
    }

    pub fn classify(&self, label: Option<&str>, time_range: Option<&TimeRange>) -> Band {
        if let Some(band) = label.and_then(band_from_label) {
            return band;
        }
        match time_range {
            Some(range) if range.start_hour() < AFTERNOON_STARTS_AT_HOUR => Band::Morning,
            Some(_) => Band::Afternoon,
            None => self.fallback,
        }
    }
}

/// Classifies with the default fallback policy.
pub fn classify_band(label: Option<&str>, time_range: Option<&TimeRange>) -> Band {
    BandClassifier::default().classify(label, time_range)
}

fn band_from_label(label: &str) -> Option<Band> {
    let label = label.to_lowercase();
    let mentions = |keywords: &[&str]| keywords.iter().any(|keyword| label.contains(keyword));

    if mentions(MORNING_KEYWORDS) {
        Some(Band::Morning)
    } else if mentions(AFTERNOON_KEYWORDS) {
        Some(Band::Afternoon)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn range(start_hour: u32, end_hour: u32) -> TimeRange {
        TimeRange::from_parts(start_hour, 0, end_hour, 0).unwrap()
    }

    #[rstest]
    #[case("Matin", Band::Morning)]
    #[case("Morning departures", Band::Morning)]
    #[case("Ochtend", Band::Morning)]
    #[case("Voormiddag", Band::Morning)]
    #[case("Vormittag", Band::Morning)]
    #[case("APRÈS-MIDI", Band::Afternoon)]
    #[case("Afternoon", Band::Afternoon)]
    #[case("Nachmittag", Band::Afternoon)]
    #[case("Namiddag", Band::Afternoon)]
    fn test_label_keywords_decide_the_band(#[case] label: &str, #[case] expected: Band) {
        assert_eq!(classify_band(Some(label), None), expected);
    }

    #[test]
    fn test_label_wins_over_the_time_range() {
        let afternoon_range = range(15, 18);
        assert_eq!(
            classify_band(Some("Matin"), Some(&afternoon_range)),
            Band::Morning
        );
    }

    #[rstest]
    #[case(6, 14, Band::Morning)]
    #[case(13, 15, Band::Morning)]
    #[case(14, 16, Band::Afternoon)]
    #[case(15, 18, Band::Afternoon)]
    fn test_start_hour_decides_without_a_label(
        #[case] start: u32,
        #[case] end: u32,
        #[case] expected: Band,
    ) {
        assert_eq!(classify_band(None, Some(&range(start, end))), expected);
        assert_eq!(classify_band(Some("Eurostar Snap"), Some(&range(start, end))), expected);
    }

    #[test]
    fn test_no_signal_falls_back_to_morning() {
        assert_eq!(classify_band(None, None), Band::Morning);
        assert_eq!(classify_band(Some(""), None), Band::Morning);
    }

    #[test]
    fn test_fallback_policy_can_be_changed() {
        let classifier = BandClassifier::with_fallback(Band::Unknown);
        assert_eq!(classifier.classify(None, None), Band::Unknown);
        assert_eq!(classifier.classify(None, Some(&range(15, 18))), Band::Afternoon);
    }
}
