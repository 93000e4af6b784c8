use anyhow::{Context, Error};
use lazy_static::lazy_static;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest_tracing::TracingMiddleware;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error as ThisError;

use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use url::Url;

lazy_static! {
    // Every request goes out exactly once; mail sends are not idempotent.
    static ref CLIENT: ClientWithMiddleware = ClientBuilder::new(reqwest::Client::new())
        .with(TracingMiddleware::default())
        .build();
}

pub struct HttpClient;

#[derive(ThisError, Debug)]
pub enum HttpClientError {
    #[error(transparent)]
    ResponseError(#[from] Error),
    #[error("httpBuilderError {0}")]
    HTTPBuilderError(String),
}

/// Status and raw body of a response; non 2xx statuses are not turned into errors
/// so callers can decide what a rejection means to them.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

struct HeadersMapGenerator(HeaderMap);

impl HeadersMapGenerator {
    fn into_inner(self) -> HeaderMap {
        self.0
    }
}

impl TryFrom<HashMap<&'static str, String>> for HeadersMapGenerator {
    type Error = HttpClientError;

    fn try_from(value: HashMap<&'static str, String>) -> Result<Self, Self::Error> {
        let mut header_map = HeaderMap::new();

        for (key, value) in value.into_iter() {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|err| HttpClientError::HTTPBuilderError(format!("{err} {key}")))?;
            // The value usually carries a credential, keep it out of the error.
            let value = HeaderValue::from_str(&value)
                .map_err(|err| HttpClientError::HTTPBuilderError(format!("{err} for {key}")))?;
            header_map.insert(name, value);
        }
        Ok(Self(header_map))
    }
}

impl HttpClient {
    #[tracing::instrument(skip(headers, body), level = "debug")]
    pub async fn post_json<Body: Serialize + ?Sized>(
        url: Url,
        headers: HashMap<&'static str, String>,
        body: &Body,
        timeout: Duration,
    ) -> Result<HttpResponse, HttpClientError> {
        let generator = HeadersMapGenerator::try_from(headers)?;
        let header_map = generator.into_inner();
        let response = CLIENT
            .post(url.clone())
            .headers(header_map)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {url}"))
            .map_err(HttpClientError::ResponseError)?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .context("Failed to read response body")
            .map_err(HttpClientError::ResponseError)?;

        Ok(HttpResponse { status, body })
    }
}
