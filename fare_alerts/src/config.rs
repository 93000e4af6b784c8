use notifications::EmailSettings;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineSettings {
    /// Scraper hand-off file, a JSON array of scraped dates.
    pub input_path: PathBuf,
    /// Where the aggregated entries are written, if anywhere.
    #[serde(default)]
    pub output_path: Option<PathBuf>,
    #[serde(default)]
    pub notify_when_empty: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub email: EmailSettings,
    pub pipeline: PipelineSettings,
}
