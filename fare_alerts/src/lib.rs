pub mod config;

use anyhow::Context;
use fare_offers::{DailyEntry, OfferAggregator, RawFragment};
use notifications::{DeliveryChannelManager, DeliveryReport};
use serde::Deserialize;
use std::path::Path;

use crate::config::Settings;

/// Everything the scraper found for one route on one date.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ScrapedDate {
    pub route: String,
    pub date: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub fragments: Vec<RawFragment>,
}

#[derive(Debug)]
pub struct PipelineRun {
    pub entries: Vec<DailyEntry>,
    /// `None` when delivery was not attempted.
    pub delivery: Option<DeliveryReport>,
}

pub struct FareAlertPipeline {
    aggregator: OfferAggregator,
    delivery: DeliveryChannelManager,
    notify_when_empty: bool,
}

impl FareAlertPipeline {
    pub fn new(
        aggregator: OfferAggregator,
        delivery: DeliveryChannelManager,
        notify_when_empty: bool,
    ) -> Self {
        Self {
            aggregator,
            delivery,
            notify_when_empty,
        }
    }

    pub fn from_settings(settings: Settings) -> Self {
        Self::new(
            OfferAggregator::default(),
            DeliveryChannelManager::from_settings(settings.email),
            settings.pipeline.notify_when_empty,
        )
    }

    /// Aggregates every scraped date, renders the report and mails it.
    /// Delivery problems end up in the returned report, never as an error.
    pub async fn run(&self, scraped: Vec<ScrapedDate>) -> PipelineRun {
        let entries = scraped
            .into_iter()
            .map(|scraped| {
                self.aggregator
                    .aggregate(&scraped.route, &scraped.date, &scraped.url, scraped.fragments)
            })
            .collect::<Vec<_>>();

        let available = entries
            .iter()
            .filter(|entry| entry.has_availability())
            .count();
        tracing::info!(
            "Aggregated {} entries, {available} with availability",
            entries.len()
        );

        if entries.is_empty() && !self.notify_when_empty {
            tracing::info!("Nothing was scraped -> skip email");
            return PipelineRun {
                entries,
                delivery: None,
            };
        }

        let html = notifications::render(&entries);
        let report = self.delivery.deliver(&html).await;
        tracing::info!("Delivery outcome: {:?}", report.outcome);

        PipelineRun {
            entries,
            delivery: Some(report),
        }
    }
}

/// One scheduled run: read the scraper hand-off, run the pipeline, optionally keep
/// the entries. Input and output problems are logged, never returned.
pub async fn run_job(settings: Settings) -> PipelineRun {
    let input_path = settings.pipeline.input_path.clone();
    let output_path = settings.pipeline.output_path.clone();

    let scraped = read_scraped_dates(&input_path).unwrap_or_else(|err| {
        tracing::error!("{err:?}. Continuing with no entries");
        vec![]
    });

    let run = FareAlertPipeline::from_settings(settings).run(scraped).await;

    if let Some(output_path) = output_path {
        if let Err(err) = write_entries(&output_path, &run.entries) {
            tracing::error!("{err:?}");
        }
    }
    run
}

pub fn read_scraped_dates(path: &Path) -> anyhow::Result<Vec<ScrapedDate>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read scraped dates from {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse scraped dates in {}", path.display()))
}

pub fn write_entries(path: &Path, entries: &[DailyEntry]) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(entries)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write entries to {}", path.display()))
}
