use crate::delivery::channel::{AddressResolver, ChannelError, EmailMessage, SmtpSubmitter};
use anyhow::anyhow;
use async_trait::async_trait;
use itertools::Itertools;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use secrecy::{ExposeSecret, Secret};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Port where the TLS handshake happens before any SMTP traffic.
const IMPLICIT_TLS_PORT: u16 = 465;

/// IPv4 first, keeping resolver order within each family, since IPv6 routes
/// are frequently broken on the hosts this runs on. `ipv4_only` drops IPv6.
pub fn order_addresses(addresses: Vec<IpAddr>, ipv4_only: bool) -> Vec<IpAddr> {
    if ipv4_only {
        return addresses.into_iter().filter(IpAddr::is_ipv4).collect();
    }
    addresses
        .into_iter()
        .sorted_by_key(IpAddr::is_ipv6)
        .collect()
}

pub struct DnsResolver {
    timeout: Duration,
}

impl DnsResolver {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl AddressResolver for DnsResolver {
    async fn resolve(&self, host: &str, port: u16) -> Result<Vec<IpAddr>, ChannelError> {
        let resolution_error = |reason: String| ChannelError::Resolution {
            host: host.to_string(),
            port,
            reason,
        };
        let addresses = tokio::time::timeout(self.timeout, tokio::net::lookup_host((host, port)))
            .await
            .map_err(|_| resolution_error(format!("timed out after {:?}", self.timeout)))?
            .map_err(|err| resolution_error(err.to_string()))?;

        Ok(addresses.map(|address| address.ip()).unique().collect())
    }
}

/// Submits over one explicit address with STARTTLS (implicit TLS on 465),
/// validating the certificate against the host name rather than the IP.
pub struct LettreSubmitter {
    username: String,
    password: Secret<String>,
    timeout: Duration,
}

impl LettreSubmitter {
    pub fn new(username: String, password: Secret<String>, timeout: Duration) -> Self {
        Self {
            username,
            password,
            timeout,
        }
    }

    fn transport(
        &self,
        host: &str,
        address: SocketAddr,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>, ChannelError> {
        let tls_parameters = TlsParameters::new(host.to_string()).map_err(|err| {
            ChannelError::Transport(anyhow!("Invalid TLS parameters for {host}: {err}"))
        })?;
        let tls = if address.port() == IMPLICIT_TLS_PORT {
            Tls::Wrapper(tls_parameters)
        } else {
            Tls::Required(tls_parameters)
        };
        let credentials = Credentials::new(
            self.username.clone(),
            self.password.expose_secret().to_string(),
        );

        Ok(
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(address.ip().to_string())
                .port(address.port())
                .tls(tls)
                .credentials(credentials)
                .timeout(Some(self.timeout))
                .build(),
        )
    }
}

#[async_trait]
impl SmtpSubmitter for LettreSubmitter {
    #[tracing::instrument(skip(self, message), level = "debug")]
    async fn submit(
        &self,
        host: &str,
        address: SocketAddr,
        message: &EmailMessage,
    ) -> Result<(), ChannelError> {
        let email = build_message(message)?;
        let transport = self.transport(host, address)?;
        transport
            .send(email)
            .await
            .map(|_| ())
            .map_err(|err| ChannelError::Smtp {
                address,
                reason: err.to_string(),
            })
    }
}

/// Single part HTML message, UTF-8.
pub fn build_message(message: &EmailMessage) -> Result<Message, ChannelError> {
    let invalid = |err: &dyn std::fmt::Display| ChannelError::InvalidMessage(err.to_string());

    let sender = message
        .sender_email
        .trim()
        .parse::<Address>()
        .map_err(|err| invalid(&err))?;
    let name = Some(message.sender_name.trim().to_string()).filter(|name| !name.is_empty());

    let mut builder = Message::builder()
        .from(Mailbox::new(name, sender))
        .subject(message.subject.as_str())
        .header(ContentType::TEXT_HTML);
    for recipient in &message.recipients {
        let mailbox = recipient.parse::<Mailbox>().map_err(|err| invalid(&err))?;
        builder = builder.to(mailbox);
    }

    builder
        .body(message.html.clone())
        .map_err(|err| invalid(&err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn v4(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(142, 250, 0, last))
    }

    fn v6(last: u16) -> IpAddr {
        IpAddr::V6(Ipv6Addr::new(0x2a00, 0x1450, 0, 0, 0, 0, 0, last))
    }

    fn message() -> EmailMessage {
        EmailMessage {
            sender_email: "bot@example.com".to_string(),
            sender_name: "Eurostar Snap Bot".to_string(),
            recipients: vec!["alice@example.com".to_string(), "bob@example.com".to_string()],
            subject: "New availability detected — Paris → Amsterdam".to_string(),
            html: "<p>No availability detected.</p>".to_string(),
        }
    }

    #[test]
    fn test_ipv4_addresses_come_first_in_resolver_order() {
        let ordered = order_addresses(vec![v6(1), v4(1), v6(2), v4(2)], false);
        assert_eq!(ordered, vec![v4(1), v4(2), v6(1), v6(2)]);
    }

    #[test]
    fn test_ipv4_only_drops_ipv6_addresses() {
        let ordered = order_addresses(vec![v6(1), v4(2), v4(1)], true);
        assert_eq!(ordered, vec![v4(2), v4(1)]);
        assert!(order_addresses(vec![v6(1)], true).is_empty());
    }

    #[test]
    fn test_message_carries_headers_and_html_body() {
        let email = build_message(&message()).unwrap();
        let formatted = String::from_utf8(email.formatted()).unwrap();
        assert!(formatted.contains("Eurostar Snap Bot"));
        assert!(formatted.contains("<bot@example.com>"));
        assert!(formatted.contains("alice@example.com"));
        assert!(formatted.contains("bob@example.com"));
        assert!(formatted.contains("Content-Type: text/html; charset=utf-8"));
        assert!(formatted.contains("Subject: "));
    }

    #[test]
    fn test_invalid_addresses_are_reported() {
        let mut bad_sender = message();
        bad_sender.sender_email = "not an address".to_string();
        assert!(matches!(
            build_message(&bad_sender),
            Err(ChannelError::InvalidMessage(_))
        ));

        let mut bad_recipient = message();
        bad_recipient.recipients.push("@".to_string());
        assert!(matches!(
            build_message(&bad_recipient),
            Err(ChannelError::InvalidMessage(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_host_is_a_resolution_failure() {
        let resolver = DnsResolver::new(Duration::from_secs(5));
        let result = resolver.resolve("does-not-exist.invalid", 587).await;
        assert!(matches!(result, Err(ChannelError::Resolution { .. })));
    }

    #[tokio::test]
    async fn test_ip_literals_resolve_to_themselves() {
        let resolver = DnsResolver::new(Duration::from_secs(5));
        let addresses = resolver.resolve("127.0.0.1", 587).await.unwrap();
        assert_eq!(addresses, vec![IpAddr::V4(Ipv4Addr::LOCALHOST)]);
    }
}
