//! Renders the aggregated entries into the HTML body of the alert email.

mod date_format;

pub use date_format::long_date;

use fare_offers::{DailyEntry, Offer};
use itertools::Itertools;

const EMPTY_REPORT: &str = "<p>No availability detected.</p>";
const NO_AVAILABILITY: &str = "No availability";
const PRICE_UNKNOWN: &str = "Price unknown";

const TABLE_STYLE: &str = "border-collapse:collapse;font-family:Arial;font-size:14px";
const HEADER_STYLE: &str = "padding:6px;border:1px solid #ddd;text-align:left";
const CELL_STYLE: &str = "padding:6px;border:1px solid #ddd";

/// One table per route, routes in the order they first appear and rows by
/// ascending date. Never fails.
#[tracing::instrument(skip_all, name = "render", fields(entries = entries.len()))]
pub fn render(entries: &[DailyEntry]) -> String {
    if entries.is_empty() {
        return EMPTY_REPORT.to_string();
    }

    let routes: Vec<&str> = entries
        .iter()
        .map(|entry| entry.route.as_str())
        .unique()
        .collect();
    let mut by_route = entries
        .iter()
        .into_group_map_by(|entry| entry.route.as_str());

    let mut html = String::new();
    for route in routes {
        let rows = by_route.remove(route).unwrap_or_default();
        render_route(&mut html, route, rows);
    }
    html
}

fn render_route(html: &mut String, route: &str, rows: Vec<&DailyEntry>) {
    html.push_str(&format!("<h3>{}</h3>", escape(route)));
    html.push_str(&format!("<table style='{TABLE_STYLE}'><thead><tr>"));
    for header in ["Date", "Morning", "Afternoon"] {
        html.push_str(&format!("<th style='{HEADER_STYLE}'>{header}</th>"));
    }
    html.push_str("</tr></thead><tbody>");

    // stable, so same-date rows keep their input order
    for entry in rows.into_iter().sorted_by(|a, b| a.date.cmp(&b.date)) {
        html.push_str(&format!(
            "<tr><td style='{CELL_STYLE}'>{}</td><td style='{CELL_STYLE}'>{}</td><td style='{CELL_STYLE}'>{}</td></tr>",
            escape(&long_date(&entry.date)),
            slot(entry.morning.as_ref(), &entry.url),
            slot(entry.afternoon.as_ref(), &entry.url),
        ));
    }
    html.push_str("</tbody></table>");
}

fn slot(offer: Option<&Offer>, url: &str) -> String {
    let Some(offer) = offer else {
        return NO_AVAILABILITY.to_string();
    };

    let price = price_label(offer);
    let mut cell = if url.trim().is_empty() {
        escape(&price)
    } else {
        format!("<a href=\"{}\">{}</a>", escape(url.trim()), escape(&price))
    };
    if let Some(range) = &offer.time_range {
        cell.push_str(&format!(
            " between {} and {}",
            range.start_text(),
            range.end_text()
        ));
    }
    cell
}

fn price_label(offer: &Offer) -> String {
    let price_text = offer.price_text.trim();
    if !price_text.is_empty() {
        price_text.to_string()
    } else if offer.has_known_price() {
        format!("{:.2}", offer.price)
    } else {
        PRICE_UNKNOWN.to_string()
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            c => escaped.push(c),
        }
    }
    escaped
}
