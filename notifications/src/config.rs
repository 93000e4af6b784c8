use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

const SUBJECT: &str = "New availability detected";

/// Everything the delivery channels need, resolved once at start up and never
/// mutated afterwards.
#[derive(Debug, Deserialize, Clone)]
pub struct EmailSettings {
    #[serde(default)]
    pub sender_email: String,
    #[serde(default = "default_sender_name")]
    pub sender_name: String,
    #[serde(default)]
    pub password: Option<Secret<String>>,
    /// Comma separated, see [`EmailSettings::recipients`].
    #[serde(default)]
    pub recipients: String,
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_host_alt")]
    pub smtp_host_alt: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub ipv4_only: bool,
    #[serde(default)]
    pub sendgrid_api_key: Option<Secret<String>>,
    #[serde(default = "default_sendgrid_url")]
    pub sendgrid_url: Url,
    #[serde(default)]
    pub subject_prefix: String,
    #[serde(default)]
    pub route_label: String,
    #[serde(default = "default_global_retries")]
    pub global_retries: u32,
    #[serde(default = "default_retry_backoff_seconds")]
    pub retry_backoff_seconds: u64,
    #[serde(default = "default_address_backoff_seconds")]
    pub address_backoff_seconds: u64,
    #[serde(default = "default_connection_timeout_seconds")]
    pub connection_timeout_seconds: u64,
}

impl EmailSettings {
    /// Trimmed addresses with the empty ones discarded.
    pub fn recipients(&self) -> Vec<String> {
        parse_recipients(&self.recipients)
    }

    pub fn subject(&self) -> String {
        let route_label = self.route_label.trim();
        let subject = if route_label.is_empty() {
            SUBJECT.to_string()
        } else {
            format!("{SUBJECT} — {route_label}")
        };
        format!("{}{subject}", self.subject_prefix).trim().to_string()
    }

    pub fn sendgrid_api_key(&self) -> Option<&str> {
        exposed(&self.sendgrid_api_key)
    }

    pub fn password(&self) -> Option<&str> {
        exposed(&self.password)
    }

    /// SMTP needs both a sender address and its password.
    pub fn smtp_credentials(&self) -> Option<(&str, &str)> {
        let sender = self.sender_email.trim();
        if sender.is_empty() {
            return None;
        }
        self.password().map(|password| (sender, password))
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff_seconds)
    }

    pub fn address_backoff(&self) -> Duration {
        Duration::from_secs(self.address_backoff_seconds)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_seconds)
    }
}

pub fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|recipient| !recipient.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn exposed(secret: &Option<Secret<String>>) -> Option<&str> {
    secret
        .as_ref()
        .map(|secret| secret.expose_secret().as_str())
        .filter(|value| !value.trim().is_empty())
}

fn default_sender_name() -> String {
    "Eurostar Snap Bot".to_string()
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_host_alt() -> String {
    "smtp.googlemail.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_sendgrid_url() -> Url {
    Url::parse("https://api.sendgrid.com/v3/mail/send").expect("default SendGrid url to be valid")
}

fn default_global_retries() -> u32 {
    2
}

fn default_retry_backoff_seconds() -> u64 {
    5
}

fn default_address_backoff_seconds() -> u64 {
    1
}

fn default_connection_timeout_seconds() -> u64 {
    20
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rstest::rstest;

    pub(crate) fn settings() -> EmailSettings {
        serde_json::from_value(serde_json::json!({
            "sender_email": "bot@example.com",
            "password": "app-password",
            "recipients": "alice@example.com",
            "retry_backoff_seconds": 0,
            "address_backoff_seconds": 0,
        }))
        .unwrap()
    }

    #[rstest]
    #[case("alice@example.com", vec!["alice@example.com"])]
    #[case(" alice@example.com , bob@example.com ", vec!["alice@example.com", "bob@example.com"])]
    #[case("alice@example.com,, ,bob@example.com,", vec!["alice@example.com", "bob@example.com"])]
    #[case("", vec![])]
    #[case(" , ", vec![])]
    fn test_recipients_are_trimmed_and_empties_discarded(
        #[case] raw: &str,
        #[case] expected: Vec<&str>,
    ) {
        assert_eq!(parse_recipients(raw), expected);
    }

    #[test]
    fn test_defaults_match_the_gmail_deployment() {
        let settings: EmailSettings = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(settings.smtp_host, "smtp.gmail.com");
        assert_eq!(settings.smtp_host_alt, "smtp.googlemail.com");
        assert_eq!(settings.smtp_port, 587);
        assert_eq!(settings.global_retries, 2);
        assert_eq!(settings.retry_backoff(), Duration::from_secs(5));
        assert_eq!(settings.connection_timeout(), Duration::from_secs(20));
        assert_eq!(settings.sender_name, "Eurostar Snap Bot");
        assert!(settings.sendgrid_api_key().is_none());
        assert!(settings.smtp_credentials().is_none());
    }

    #[test]
    fn test_blank_secrets_count_as_missing() {
        let settings: EmailSettings = serde_json::from_value(serde_json::json!({
            "sender_email": "bot@example.com",
            "password": "  ",
            "sendgrid_api_key": "",
        }))
        .unwrap();
        assert!(settings.sendgrid_api_key().is_none());
        assert!(settings.smtp_credentials().is_none());
    }

    #[rstest]
    #[case("", "", "New availability detected")]
    #[case("[Eurostar Snap] ", "", "[Eurostar Snap] New availability detected")]
    #[case("", "Paris → Amsterdam", "New availability detected — Paris → Amsterdam")]
    fn test_subject_is_built_from_prefix_and_route(
        #[case] prefix: &str,
        #[case] route: &str,
        #[case] expected: &str,
    ) {
        let settings = EmailSettings {
            subject_prefix: prefix.to_string(),
            route_label: route.to_string(),
            ..settings()
        };
        assert_eq!(settings.subject(), expected);
    }
}
