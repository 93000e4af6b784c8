use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One price element picked up by the scraper. Every field may be empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawFragment {
    pub price_text: String,
    pub time_text: String,
    pub label_text: String,
    pub container_text: String,
}

impl RawFragment {
    pub fn is_blank(&self) -> bool {
        [
            &self.price_text,
            &self.time_text,
            &self.label_text,
            &self.container_text,
        ]
        .iter()
        .all(|field| field.trim().is_empty())
    }
}

/// A departure window on the 24 hour clock. `start` may be later than `end`,
/// overnight windows are kept exactly as they were published.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(with = "clock_time")]
    start: NaiveTime,
    #[serde(with = "clock_time")]
    end: NaiveTime,
}

impl TimeRange {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Returns `None` when either side is not a valid clock time, e.g. `25:00`.
    pub fn from_parts(
        start_hour: u32,
        start_minute: u32,
        end_hour: u32,
        end_minute: u32,
    ) -> Option<Self> {
        let start = NaiveTime::from_hms_opt(start_hour, start_minute, 0)?;
        let end = NaiveTime::from_hms_opt(end_hour, end_minute, 0)?;
        Some(Self { start, end })
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    pub fn start_hour(&self) -> u32 {
        self.start.hour()
    }

    /// `HH:MM`
    pub fn start_text(&self) -> String {
        self.start.format("%H:%M").to_string()
    }

    /// `HH:MM`
    pub fn end_text(&self) -> String {
        self.end.format("%H:%M").to_string()
    }

    pub fn is_overnight(&self) -> bool {
        self.end < self.start
    }

    /// Widest window covering both: earliest start, latest end.
    pub fn merge(&self, other: &TimeRange) -> TimeRange {
        TimeRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start_text(), self.end_text())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Morning,
    Afternoon,
    Unknown,
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Band::Morning => "morning",
            Band::Afternoon => "afternoon",
            Band::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub band: Band,
    /// `f64::INFINITY` when the price could not be read; it always sorts last.
    #[serde(with = "unknown_price")]
    pub price: f64,
    pub price_text: String,
    pub time_range: Option<TimeRange>,
}

impl Offer {
    pub fn has_known_price(&self) -> bool {
        self.price.is_finite()
    }
}

/// The best offer per band for one route on one date. A `None` band means the
/// date was checked and nothing was found.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyEntry {
    pub route: String,
    pub date: String,
    pub url: String,
    pub morning: Option<Offer>,
    pub afternoon: Option<Offer>,
}

impl DailyEntry {
    pub fn has_availability(&self) -> bool {
        self.morning.is_some() || self.afternoon.is_some()
    }
}

mod clock_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let value = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&value, FORMAT).map_err(serde::de::Error::custom)
    }
}

/// JSON has no infinity, an unknown price travels as `null`.
mod unknown_price {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(price: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        let price = price.is_finite().then_some(*price);
        price.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        let price = Option::<f64>::deserialize(deserializer)?;
        Ok(price.unwrap_or(f64::INFINITY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: (u32, u32), end: (u32, u32)) -> TimeRange {
        TimeRange::from_parts(start.0, start.1, end.0, end.1).unwrap()
    }

    #[test]
    fn test_merge_takes_earliest_start_and_latest_end() {
        let a = range((6, 10), (11, 0));
        let b = range((9, 30), (14, 0));
        let merged = a.merge(&b);
        assert_eq!(merged, range((6, 10), (14, 0)));
        assert_eq!(merged, b.merge(&a));
    }

    #[test]
    fn test_invalid_clock_values_are_rejected() {
        assert!(TimeRange::from_parts(25, 0, 26, 0).is_none());
        assert!(TimeRange::from_parts(10, 75, 11, 0).is_none());
    }

    #[test]
    fn test_overnight_ranges_are_kept_as_published() {
        let overnight = range((22, 15), (1, 5));
        assert!(overnight.is_overnight());
        assert_eq!(overnight.to_string(), "22:15-01:05");
    }

    #[test]
    fn test_unknown_price_round_trips_through_json_as_null() {
        let offer = Offer {
            band: Band::Afternoon,
            price: f64::INFINITY,
            price_text: String::new(),
            time_range: Some(range((15, 0), (18, 0))),
        };
        let json = serde_json::to_value(&offer).unwrap();
        assert_eq!(json["price"], serde_json::Value::Null);
        assert_eq!(json["time_range"]["start"], "15:00");
        assert_eq!(json["band"], "afternoon");

        let back: Offer = serde_json::from_value(json).unwrap();
        assert_eq!(back, offer);
    }

    #[test]
    fn test_missing_fragment_fields_default_to_empty() {
        let fragment: RawFragment = serde_json::from_str(r#"{"price_text": "45 €"}"#).unwrap();
        assert_eq!(fragment.price_text, "45 €");
        assert!(fragment.time_text.is_empty());
        assert!(!fragment.is_blank());
        assert!(RawFragment::default().is_blank());
    }
}
