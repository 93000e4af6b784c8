use async_trait::async_trait;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use thiserror::Error as ThisError;

/// The rendered report together with the envelope every channel needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailMessage {
    pub sender_email: String,
    pub sender_name: String,
    pub recipients: Vec<String>,
    pub subject: String,
    pub html: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    Http,
    SmtpPrimary,
    SmtpAlternate,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Channel::Http => "http",
            Channel::SmtpPrimary => "smtp-primary",
            Channel::SmtpAlternate => "smtp-alternate",
        };
        f.write_str(name)
    }
}

#[derive(ThisError, Debug)]
pub enum ChannelError {
    #[error("DNS resolution failed for {host}:{port}: {reason}")]
    Resolution {
        host: String,
        port: u16,
        reason: String,
    },
    #[error("No addresses to try for {host}:{port}")]
    NoAddresses { host: String, port: u16 },
    #[error("HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("Invalid message: {0}")]
    InvalidMessage(String),
    #[error("SMTP via {address} failed: {reason}")]
    Smtp { address: SocketAddr, reason: String },
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

/// An email API reached over HTTPS, which gets through networks that block
/// outbound SMTP ports.
#[async_trait]
pub trait HttpMailApi: Send + Sync {
    /// Shown in logs and delivery attempts.
    fn target(&self) -> String;

    async fn send(&self, message: &EmailMessage) -> Result<(), ChannelError>;
}

#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// Every address `host` resolves to, in resolver order.
    async fn resolve(&self, host: &str, port: u16) -> Result<Vec<IpAddr>, ChannelError>;
}

#[async_trait]
pub trait SmtpSubmitter: Send + Sync {
    /// One authenticated session against `address`; TLS is validated against `host`.
    async fn submit(
        &self,
        host: &str,
        address: SocketAddr,
        message: &EmailMessage,
    ) -> Result<(), ChannelError>;
}
