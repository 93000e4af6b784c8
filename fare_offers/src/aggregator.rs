use crate::band::BandClassifier;
use crate::entities::{Band, DailyEntry, Offer, RawFragment, TimeRange};
use crate::normalizer::{parse_price, parse_time_range};
use itertools::Itertools;

/// Builds the entry for one route and date with the default band policy.
pub fn aggregate(route: &str, date: &str, url: &str, fragments: Vec<RawFragment>) -> DailyEntry {
    OfferAggregator::default().aggregate(route, date, url, fragments)
}

#[derive(Clone, Copy, Debug, Default)]
pub struct OfferAggregator {
    classifier: BandClassifier,
}

impl OfferAggregator {
    pub fn new(classifier: BandClassifier) -> Self {
        Self { classifier }
    }

    /// Reduces every fragment found for `date` to the cheapest offer per band.
    /// The entry is produced even when nothing was found.
    #[tracing::instrument(skip(self, fragments), name = "aggregate", fields(fragments = fragments.len()))]
    pub fn aggregate(
        &self,
        route: &str,
        date: &str,
        url: &str,
        fragments: Vec<RawFragment>,
    ) -> DailyEntry {
        let offers = fragments
            .into_iter()
            .filter(|fragment| {
                let blank = fragment.is_blank();
                if blank {
                    tracing::debug!("Skipping blank fragment");
                }
                !blank
            })
            .map(|fragment| self.offer_from_fragment(fragment))
            .collect_vec();

        let mut offers_per_band = offers.into_iter().into_group_map_by(|offer| offer.band);

        if let Some(unknown) = offers_per_band.remove(&Band::Unknown) {
            tracing::debug!(count = unknown.len(), "Dropping offers without a band");
        }

        let morning = offers_per_band
            .remove(&Band::Morning)
            .and_then(best_offer);
        let afternoon = offers_per_band
            .remove(&Band::Afternoon)
            .and_then(best_offer);

        tracing::info!(
            morning = morning.is_some(),
            afternoon = afternoon.is_some(),
            "Aggregated offers"
        );

        DailyEntry {
            route: route.to_string(),
            date: date.to_string(),
            url: url.to_string(),
            morning,
            afternoon,
        }
    }

    fn offer_from_fragment(&self, fragment: RawFragment) -> Offer {
        let time_range =
            parse_time_range(&fragment.time_text).or_else(|| parse_time_range(&fragment.container_text));
        let label = Some(fragment.label_text.trim()).filter(|label| !label.is_empty());
        let band = self.classifier.classify(label, time_range.as_ref());
        Offer {
            band,
            price: parse_price(&fragment.price_text),
            price_text: collapse_whitespace(&fragment.price_text),
            time_range,
        }
    }
}

/// Cheapest offer of the band, the first one seen on a tie, carrying the window
/// that covers every offer of the band.
fn best_offer(offers: Vec<Offer>) -> Option<Offer> {
    let window = merge_time_ranges(offers.iter().filter_map(|offer| offer.time_range.as_ref()));

    let cheapest = offers.into_iter().reduce(|best, offer| {
        if offer.price < best.price {
            offer
        } else {
            best
        }
    })?;

    Some(Offer {
        time_range: window,
        ..cheapest
    })
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().join(" ")
}

/// Widest window of a set of ranges, `None` for an empty set.
pub fn merge_time_ranges<'a>(ranges: impl IntoIterator<Item = &'a TimeRange>) -> Option<TimeRange> {
    ranges
        .into_iter()
        .copied()
        .reduce(|merged, range| merged.merge(&range))
}
