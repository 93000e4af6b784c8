use chrono::{Datelike, NaiveDate};

/// "Monday 18th August 2025". Anything that is not a `YYYY-MM-DD` date comes
/// back unchanged.
pub fn long_date(raw: &str) -> String {
    match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        Ok(date) => format!(
            "{} {}{} {}",
            date.format("%A"),
            date.day(),
            ordinal_suffix(date.day()),
            date.format("%B %Y")
        ),
        Err(_) => raw.to_string(),
    }
}

fn ordinal_suffix(day: u32) -> &'static str {
    if (11..=13).contains(&(day % 100)) {
        return "th";
    }
    match day % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("2025-08-18", "Monday 18th August 2025")]
    #[case("2025-10-01", "Wednesday 1st October 2025")]
    #[case("2025-10-02", "Thursday 2nd October 2025")]
    #[case("2025-10-03", "Friday 3rd October 2025")]
    #[case("2025-10-11", "Saturday 11th October 2025")]
    #[case("2025-10-12", "Sunday 12th October 2025")]
    #[case("2025-10-13", "Monday 13th October 2025")]
    #[case("2025-10-21", "Tuesday 21st October 2025")]
    #[case("2025-10-22", "Wednesday 22nd October 2025")]
    #[case("2025-10-23", "Thursday 23rd October 2025")]
    #[case("2025-10-31", "Friday 31st October 2025")]
    fn test_long_date_uses_english_ordinals(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(long_date(raw), expected);
    }

    #[rstest]
    #[case("14/10/2025")]
    #[case("2025-02-30")]
    #[case("tomorrow")]
    #[case("")]
    fn test_unparseable_dates_are_returned_unchanged(#[case] raw: &str) {
        assert_eq!(long_date(raw), raw);
    }
}
