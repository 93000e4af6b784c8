pub mod config;
pub mod delivery;
pub mod report;

pub use config::EmailSettings;
pub use delivery::{
    AttemptOutcome, DeliveryAttempt, DeliveryChannelManager, DeliveryOutcome, DeliveryReport,
};
pub use report::render;
