//! Gets the report out through whichever channel works, in a fixed order:
//! the HTTP email API, then SMTP on the primary host, then SMTP on the alternate
//! host, repeating the SMTP pair for a small number of cycles.
//!
//! Nothing in here returns an error. Every failure is logged, recorded as a
//! [`DeliveryAttempt`] and answered by moving on to the next address, host or
//! channel; the caller only gets a [`DeliveryReport`] back.

pub mod channel;
pub mod sendgrid;
pub mod smtp;

use crate::config::EmailSettings;
use crate::delivery::channel::{
    AddressResolver, Channel, ChannelError, EmailMessage, HttpMailApi, SmtpSubmitter,
};
use crate::delivery::sendgrid::SendGridClient;
use crate::delivery::smtp::{order_addresses, DnsResolver, LettreSubmitter};
use futures::FutureExt;
use secrecy::Secret;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Failure(String),
}

/// One try of one channel against one target (endpoint host, or SMTP address).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryAttempt {
    pub channel: Channel,
    pub target: String,
    pub outcome: AttemptOutcome,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { channel: Channel, target: String },
    Skipped(String),
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryReport {
    pub outcome: DeliveryOutcome,
    pub attempts: Vec<DeliveryAttempt>,
}

impl DeliveryReport {
    pub fn is_delivered(&self) -> bool {
        matches!(self.outcome, DeliveryOutcome::Delivered { .. })
    }
}

enum State {
    Start,
    TryHttp,
    TrySmtpPrimary { cycle: u32 },
    TrySmtpAlternate { cycle: u32 },
}

pub struct DeliveryChannelManager {
    settings: EmailSettings,
    http: Option<Box<dyn HttpMailApi>>,
    resolver: Box<dyn AddressResolver>,
    smtp: Option<Box<dyn SmtpSubmitter>>,
}

impl DeliveryChannelManager {
    pub fn new(
        settings: EmailSettings,
        http: Option<Box<dyn HttpMailApi>>,
        resolver: Box<dyn AddressResolver>,
        smtp: Option<Box<dyn SmtpSubmitter>>,
    ) -> Self {
        Self {
            settings,
            http,
            resolver,
            smtp,
        }
    }

    /// Wires the real channels. HTTP is only available with an API key and SMTP
    /// only with a sender address and password.
    pub fn from_settings(settings: EmailSettings) -> Self {
        let timeout = settings.connection_timeout();
        let http = settings.sendgrid_api_key().map(|api_key| {
            Box::new(SendGridClient::new(
                settings.sendgrid_url.clone(),
                Secret::new(api_key.to_string()),
                timeout,
            )) as Box<dyn HttpMailApi>
        });
        let smtp = settings.smtp_credentials().map(|(sender, password)| {
            Box::new(LettreSubmitter::new(
                sender.to_string(),
                Secret::new(password.to_string()),
                timeout,
            )) as Box<dyn SmtpSubmitter>
        });
        let resolver = Box::new(DnsResolver::new(timeout));
        Self::new(settings, http, resolver, smtp)
    }

    /// Sends `html` to every configured recipient. Never fails and never panics
    /// outward; the outcome is only reported and logged.
    #[tracing::instrument(skip_all, name = "mail")]
    pub async fn deliver(&self, html: &str) -> DeliveryReport {
        let message = EmailMessage {
            sender_email: self.settings.sender_email.trim().to_string(),
            sender_name: self.settings.sender_name.trim().to_string(),
            recipients: self.settings.recipients(),
            subject: self.settings.subject(),
            html: html.to_string(),
        };

        match AssertUnwindSafe(self.run(&message)).catch_unwind().await {
            Ok(report) => report,
            Err(_) => {
                tracing::error!("[fatal] Unexpected mail panic (suppressed)");
                DeliveryReport {
                    outcome: DeliveryOutcome::Failed,
                    attempts: vec![],
                }
            }
        }
    }

    async fn run(&self, message: &EmailMessage) -> DeliveryReport {
        let mut attempts = Vec::new();
        let cycles = self.settings.global_retries.max(1);
        let mut state = State::Start;

        let outcome = loop {
            state = match state {
                State::Start => {
                    if message.recipients.is_empty() {
                        tracing::warn!("[warn] No valid recipients -> skip email");
                        break DeliveryOutcome::Skipped("no valid recipients".to_string());
                    }
                    if self.http.is_some() {
                        State::TryHttp
                    } else {
                        tracing::warn!(
                            "[warn] No email API key configured -> skip HTTPS email, SMTP only"
                        );
                        State::TrySmtpPrimary { cycle: 1 }
                    }
                }
                State::TryHttp => {
                    if let Some(outcome) = self.try_http(message, &mut attempts).await {
                        break outcome;
                    }
                    State::TrySmtpPrimary { cycle: 1 }
                }
                State::TrySmtpPrimary { cycle } => {
                    let Some(smtp) = self.smtp.as_deref() else {
                        tracing::warn!("[warn] Missing sender or password for SMTP -> skip SMTP");
                        break if attempts.is_empty() {
                            DeliveryOutcome::Skipped("no usable delivery channel".to_string())
                        } else {
                            tracing::error!("[err] Email delivery failed. Continuing without crash.");
                            DeliveryOutcome::Failed
                        };
                    };
                    tracing::info!(
                        "Connecting SMTP {}:{} (attempt {cycle}/{cycles})",
                        self.settings.smtp_host,
                        self.settings.smtp_port
                    );
                    let host = &self.settings.smtp_host;
                    if let Some(outcome) = self
                        .try_smtp_host(smtp, Channel::SmtpPrimary, host, message, &mut attempts)
                        .await
                    {
                        break outcome;
                    }
                    State::TrySmtpAlternate { cycle }
                }
                State::TrySmtpAlternate { cycle } => {
                    tracing::info!("Trying ALT host {}", self.settings.smtp_host_alt);
                    let host = &self.settings.smtp_host_alt;
                    let smtp = match self.smtp.as_deref() {
                        Some(smtp) => smtp,
                        None => break DeliveryOutcome::Failed,
                    };
                    if let Some(outcome) = self
                        .try_smtp_host(smtp, Channel::SmtpAlternate, host, message, &mut attempts)
                        .await
                    {
                        break outcome;
                    }
                    if cycle >= cycles {
                        tracing::error!(
                            "[err] Email delivery failed after all attempts. Continuing without crash."
                        );
                        break DeliveryOutcome::Failed;
                    }
                    let backoff = self.settings.retry_backoff();
                    tracing::info!("Global retry in {backoff:?}");
                    tokio::time::sleep(backoff).await;
                    State::TrySmtpPrimary { cycle: cycle + 1 }
                }
            };
        };

        DeliveryReport { outcome, attempts }
    }

    async fn try_http(
        &self,
        message: &EmailMessage,
        attempts: &mut Vec<DeliveryAttempt>,
    ) -> Option<DeliveryOutcome> {
        let http = self.http.as_deref()?;
        let target = http.target();
        tracing::info!("Email API key detected -> trying HTTPS email first via {target}");

        match http.send(message).await {
            Ok(()) => {
                tracing::info!("Email sent via {target}");
                attempts.push(success(Channel::Http, &target));
                Some(DeliveryOutcome::Delivered {
                    channel: Channel::Http,
                    target,
                })
            }
            Err(err) => {
                tracing::warn!("[warn] {target} failed: {err}. Will try SMTP fallback");
                attempts.push(failure(Channel::Http, &target, &err));
                None
            }
        }
    }

    /// Tries every address of `host` in order and stops at the first success.
    async fn try_smtp_host(
        &self,
        smtp: &dyn SmtpSubmitter,
        channel: Channel,
        host: &str,
        message: &EmailMessage,
        attempts: &mut Vec<DeliveryAttempt>,
    ) -> Option<DeliveryOutcome> {
        let port = self.settings.smtp_port;
        let host_target = format!("{host}:{port}");

        let addresses = match self.resolver.resolve(host, port).await {
            Ok(addresses) => order_addresses(addresses, self.settings.ipv4_only),
            Err(err) => {
                tracing::warn!("{err}");
                attempts.push(failure(channel, &host_target, &err));
                return None;
            }
        };
        if addresses.is_empty() {
            let err = ChannelError::NoAddresses {
                host: host.to_string(),
                port,
            };
            tracing::warn!("{err}");
            attempts.push(failure(channel, &host_target, &err));
            return None;
        }

        let total = addresses.len();
        let mut last_error = None;
        for (index, ip) in addresses.into_iter().enumerate() {
            let address = SocketAddr::new(ip, port);
            let family = if ip.is_ipv4() { "IPv4" } else { "IPv6" };
            let target = format!("{host_target} -> {ip}");
            tracing::info!("Trying {host_target} -> {ip} ({family}) [{}/{total}]", index + 1);

            match smtp.submit(host, address, message).await {
                Ok(()) => {
                    tracing::info!("Email sent via {ip}");
                    attempts.push(success(channel, &target));
                    return Some(DeliveryOutcome::Delivered { channel, target });
                }
                Err(err) => {
                    tracing::warn!("Failed via {ip}: {err}");
                    attempts.push(failure(channel, &target, &err));
                    last_error = Some(err);
                    tokio::time::sleep(self.settings.address_backoff()).await;
                }
            }
        }

        if let Some(err) = last_error {
            tracing::warn!("All addresses failed for {host_target}; last error: {err}");
        }
        None
    }
}

fn success(channel: Channel, target: &str) -> DeliveryAttempt {
    DeliveryAttempt {
        channel,
        target: target.to_string(),
        outcome: AttemptOutcome::Success,
    }
}

fn failure(channel: Channel, target: &str, err: &ChannelError) -> DeliveryAttempt {
    DeliveryAttempt {
        channel,
        target: target.to_string(),
        outcome: AttemptOutcome::Failure(err.to_string()),
    }
}
