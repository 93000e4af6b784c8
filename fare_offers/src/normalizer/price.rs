use crate::normalizer::clean_text;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Space or apostrophe grouped thousands ("1 234,56", "1'234.50") first,
    // then digits joined by dots and commas ("45,00", "1,234.56", "1.234").
    static ref PRICE_TOKEN: Regex =
        Regex::new(r"\d{1,3}(?:[ '’]\d{3})+(?:[.,]\d+)?|\d+(?:[.,]\d+)*")
            .expect("PRICE_TOKEN to compile");
}

/// Reads the first amount in `text`, whatever the currency sign or locale.
/// Returns `f64::INFINITY` when there is no number to read.
pub fn parse_price(text: &str) -> f64 {
    let text = clean_text(text);
    PRICE_TOKEN
        .find(&text)
        .and_then(|token| normalize_separators(token.as_str()).parse::<f64>().ok())
        .filter(|price| price.is_finite())
        .unwrap_or(f64::INFINITY)
}

/// Drops thousands separators and turns the decimal mark, if any, into `.`.
fn normalize_separators(token: &str) -> String {
    let digits: String = token
        .chars()
        .filter(|character| !matches!(character, ' ' | '\'' | '’'))
        .collect();

    let last_dot = digits.rfind('.');
    let last_comma = digits.rfind(',');
    let decimal_mark = match (last_dot, last_comma) {
        (Some(dot), Some(comma)) => Some(if dot > comma { '.' } else { ',' }),
        (Some(_), None) => single_mark_is_decimal(&digits, '.').then_some('.'),
        (None, Some(_)) => single_mark_is_decimal(&digits, ',').then_some(','),
        (None, None) => None,
    };

    match decimal_mark {
        Some(mark) => {
            let (whole, fraction) = digits
                .rsplit_once(mark)
                .unwrap_or((digits.as_str(), ""));
            let whole: String = whole.chars().filter(char::is_ascii_digit).collect();
            format!("{whole}.{fraction}")
        }
        None => digits.chars().filter(char::is_ascii_digit).collect(),
    }
}

/// A lone mark followed by anything but exactly three digits is a decimal mark,
/// `1.234` and `1,234` are read as thousands.
fn single_mark_is_decimal(digits: &str, mark: char) -> bool {
    if digits.matches(mark).count() != 1 {
        return false;
    }
    digits
        .rsplit_once(mark)
        .map_or(false, |(_, fraction)| fraction.len() != 3)
}
