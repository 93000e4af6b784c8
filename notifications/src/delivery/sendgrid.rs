use crate::delivery::channel::{ChannelError, EmailMessage, HttpMailApi};
use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;
use shared_kernel::http_client::HttpClient;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Used when no sender is configured; SendGrid rejects a missing `from`.
const FALLBACK_SENDER: &str = "no-reply@example.com";

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    content_type: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
struct MailSend<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Address<'a>,
    subject: &'a str,
    content: Vec<Content<'a>>,
}

impl<'a> From<&'a EmailMessage> for MailSend<'a> {
    fn from(message: &'a EmailMessage) -> Self {
        let sender = Some(message.sender_email.trim())
            .filter(|sender| !sender.is_empty())
            .unwrap_or(FALLBACK_SENDER);
        let name = Some(message.sender_name.trim()).filter(|name| !name.is_empty());
        MailSend {
            personalizations: vec![Personalization {
                to: message
                    .recipients
                    .iter()
                    .map(|email| Address {
                        email: email.as_str(),
                        name: None,
                    })
                    .collect(),
            }],
            from: Address {
                email: sender,
                name,
            },
            subject: &message.subject,
            content: vec![Content {
                content_type: "text/html",
                value: &message.html,
            }],
        }
    }
}

pub struct SendGridClient {
    url: Url,
    api_key: Secret<String>,
    timeout: Duration,
}

impl SendGridClient {
    pub fn new(url: Url, api_key: Secret<String>, timeout: Duration) -> Self {
        Self {
            url,
            api_key,
            timeout,
        }
    }
}

#[async_trait]
impl HttpMailApi for SendGridClient {
    fn target(&self) -> String {
        self.url.host_str().unwrap_or("sendgrid").to_string()
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn send(&self, message: &EmailMessage) -> Result<(), ChannelError> {
        let api_key = self.api_key.expose_secret();
        let bearer_token = format!("Bearer {api_key}");
        let headers = HashMap::from([("Authorization", bearer_token)]);

        let response = HttpClient::post_json(
            self.url.clone(),
            headers,
            &MailSend::from(message),
            self.timeout,
        )
        .await
        .map_err(|err| ChannelError::Transport(err.into()))?;

        if response.is_success() {
            Ok(())
        } else {
            Err(ChannelError::Rejected {
                status: response.status,
                body: response.body,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn message() -> EmailMessage {
        EmailMessage {
            sender_email: "".to_string(),
            sender_name: "Eurostar Snap Bot".to_string(),
            recipients: vec!["alice@example.com".to_string(), "bob@example.com".to_string()],
            subject: "New availability detected".to_string(),
            html: "<p>No availability detected.</p>".to_string(),
        }
    }

    fn client(server: &MockServer) -> SendGridClient {
        SendGridClient::new(
            Url::parse(&server.url("/v3/mail/send")).unwrap(),
            Secret::new("sg-key".to_string()),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_mail_is_posted_with_bearer_token_and_sendgrid_body() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v3/mail/send")
                .header("authorization", "Bearer sg-key")
                .json_body(json!({
                    "personalizations": [{
                        "to": [{ "email": "alice@example.com" }, { "email": "bob@example.com" }]
                    }],
                    "from": { "email": "no-reply@example.com", "name": "Eurostar Snap Bot" },
                    "subject": "New availability detected",
                    "content": [{ "type": "text/html", "value": "<p>No availability detected.</p>" }]
                }));
            then.status(202);
        });

        let result = client(&server).send(&message()).await;

        mock.assert();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_non_2xx_is_a_rejection_carrying_the_body() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST).path("/v3/mail/send");
            then.status(401).body(r#"{"errors":[{"message":"bad key"}]}"#);
        });

        let result = client(&server).send(&message()).await;

        mock.assert();
        match result {
            Err(ChannelError::Rejected { status, body }) => {
                assert_eq!(status, 401);
                assert!(body.contains("bad key"));
            }
            other => panic!("expected a rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_sent_once_then_rejected() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST).path("/v3/mail/send");
            then.status(500).body("internal error");
        });

        let result = client(&server).send(&message()).await;

        mock.assert_hits(1);
        assert!(matches!(
            result,
            Err(ChannelError::Rejected { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_a_transport_error() {
        let client = SendGridClient::new(
            Url::parse("http://127.0.0.1:9/v3/mail/send").unwrap(),
            Secret::new("sg-key".to_string()),
            Duration::from_secs(1),
        );
        let result = client.send(&message()).await;
        assert!(matches!(result, Err(ChannelError::Transport(_))));
    }
}
