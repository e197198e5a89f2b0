//! One HTTPS exchange per request: resolve, connect, send, read.
//!
//! Every request gets its own client with idle pooling disabled, so the connection
//! lives exactly as long as the response being read.

use std::error::Error as StdError;
use std::net::SocketAddr;
use std::time::Duration;

use futures::StreamExt;
use reqwest::{Client, Response};
use serde_json::Value;
use url::{Host, Url};

use super::base::TextSink;
use super::configs::ProviderConfig;
use super::errors::{ProviderError, TransportStage};
use super::stream::StreamDecoder;
use crate::models::content::ContentBlock;

/// Largest error body kept when a request fails
pub const ERROR_BODY_LIMIT: usize = 64 * 1024;
/// Largest streamed body accepted before the exchange is abandoned
pub const STREAM_BODY_LIMIT: usize = 100 * 1024 * 1024;

/// A parsed upstream URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: Url,
    pub host: String,
    pub port: u16,
    /// Path plus query, what goes on the request line
    pub target: String,
}

impl Endpoint {
    pub fn parse(raw: &str) -> Result<Self, ProviderError> {
        let url = Url::parse(raw)
            .map_err(|e| ProviderError::InvalidEndpoint(format!("{raw}: {e}")))?;
        if !matches!(url.scheme(), "https" | "http") {
            return Err(ProviderError::InvalidEndpoint(format!(
                "{raw}: unsupported scheme {}",
                url.scheme()
            )));
        }

        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(ip)) => ip.to_string(),
            Some(Host::Ipv6(ip)) => ip.to_string(),
            None => return Err(ProviderError::InvalidEndpoint(format!("{raw}: missing host"))),
        };
        let port = url
            .port_or_known_default()
            .ok_or_else(|| ProviderError::InvalidEndpoint(format!("{raw}: missing port")))?;
        let target = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };

        Ok(Self {
            url,
            host,
            port,
            target,
        })
    }
}

pub struct Transport {
    endpoint: Endpoint,
    headers: Vec<(&'static str, String)>,
    timeout: Duration,
    insecure_tls: bool,
}

impl Transport {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            endpoint: Endpoint::parse(&config.url)?,
            headers: config.auth_headers(),
            timeout: config.timeout,
            insecure_tls: config.insecure_tls,
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Send the payload and read the whole response as one JSON object.
    ///
    /// A single-element array wrapping an object is unwrapped. An object carrying a
    /// top-level `error` is reported as an API error.
    pub async fn send_buffered(&self, payload: &Value) -> Result<Value, ProviderError> {
        let mut response = self.send(payload, false).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(&mut response).await);
        }
        let body = read_limited(&mut response, STREAM_BODY_LIMIT).await?;
        let body = String::from_utf8_lossy(&body).into_owned();

        let parsed: Value = serde_json::from_str(&body).map_err(|e| ProviderError::TopLevelParse {
            message: e.to_string(),
            body: body.clone(),
        })?;

        let object = match parsed {
            Value::Array(mut items) if matches!(items.first(), Some(Value::Object(_))) => {
                items.swap_remove(0)
            }
            object @ Value::Object(_) => object,
            _ => {
                return Err(ProviderError::shape(format!(
                    "API Response is not a JSON object nor an object array.\nResponse body:\n{body}"
                )))
            }
        };

        if let Some(error) = object.get("error").filter(|error| !error.is_null()) {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(ProviderError::Api { message });
        }

        Ok(object)
    }

    /// Send the payload as a streaming request and run the body through `decoder`
    /// chunk by chunk as it arrives.
    pub async fn send_streaming(
        &self,
        payload: &Value,
        mut decoder: StreamDecoder,
        on_text: TextSink<'_>,
    ) -> Result<Vec<ContentBlock>, ProviderError> {
        let mut response = self.send(payload, true).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(&mut response).await);
        }

        let mut body = response.bytes_stream();
        let mut received = 0usize;
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(classify)?;
            received += chunk.len();
            if received > STREAM_BODY_LIMIT {
                return Err(ProviderError::transport(
                    TransportStage::Io,
                    format!("response body exceeded {STREAM_BODY_LIMIT} bytes"),
                ));
            }
            decoder.feed(&chunk, &mut *on_text);
        }

        Ok(decoder.finish(&mut *on_text))
    }

    async fn send(&self, payload: &Value, stream: bool) -> Result<Response, ProviderError> {
        let client = self.client().await?;

        let mut request = client
            .post(self.endpoint.url.clone())
            .header("content-type", "application/json");
        if stream {
            request = request.header("accept", "text/event-stream");
        }
        for (name, value) in &self.headers {
            request = request.header(*name, value);
        }

        tracing::debug!(host = %self.endpoint.host, target = %self.endpoint.target, stream, "sending request");
        request.json(payload).send().await.map_err(classify)
    }

    /// A single-use client pinned to an address resolved up front, so name
    /// resolution failures are told apart from connection failures.
    async fn client(&self) -> Result<Client, ProviderError> {
        let address = self.resolve().await?;

        Client::builder()
            .timeout(self.timeout)
            .pool_max_idle_per_host(0)
            .min_tls_version(reqwest::tls::Version::TLS_1_2)
            .danger_accept_invalid_certs(self.insecure_tls)
            .resolve(&self.endpoint.host, address)
            .build()
            .map_err(|e| ProviderError::transport(TransportStage::Tls, e.to_string()))
    }

    async fn resolve(&self) -> Result<SocketAddr, ProviderError> {
        let host = self.endpoint.host.as_str();
        tokio::net::lookup_host((host, self.endpoint.port))
            .await
            .map_err(|e| ProviderError::transport(TransportStage::Resolve, format!("{host}: {e}")))?
            .next()
            .ok_or_else(|| {
                ProviderError::transport(TransportStage::Resolve, format!("{host}: no addresses found"))
            })
    }
}

async fn read_limited(response: &mut Response, limit: usize) -> Result<Vec<u8>, ProviderError> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(classify)? {
        let room = limit.saturating_sub(body.len());
        body.extend_from_slice(&chunk[..chunk.len().min(room)]);
        if body.len() >= limit {
            break;
        }
    }
    Ok(body)
}

/// The status always wins over a failure while reading the error body; whatever
/// arrived before the failure is kept.
async fn status_error(response: &mut Response) -> ProviderError {
    let mut body = Vec::new();
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                let room = ERROR_BODY_LIMIT.saturating_sub(body.len());
                body.extend_from_slice(&chunk[..chunk.len().min(room)]);
                if body.len() >= ERROR_BODY_LIMIT {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(error = %e, "error body cut short");
                break;
            }
        }
    }
    ProviderError::HttpStatus {
        code: response.status().as_u16(),
        body: String::from_utf8_lossy(&body).into_owned(),
    }
}

fn classify(error: reqwest::Error) -> ProviderError {
    let message = error_chain(&error);
    let stage = if error.is_connect() {
        let lowered = message.to_lowercase();
        if ["tls", "ssl", "certificate", "handshake"]
            .iter()
            .any(|needle| lowered.contains(needle))
        {
            TransportStage::Tls
        } else {
            TransportStage::Connect
        }
    } else {
        TransportStage::Io
    };
    ProviderError::transport(stage, message)
}

fn error_chain(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
