//! HTTP plumbing shared by the session and the job client.
//!
//! Every request is resolved against one base URL and retried with
//! exponential backoff while the service answers with a transient status or
//! the connection cannot be established.

use bytes::Bytes;
use log::{debug, trace, warn};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use tokio::time::{sleep, timeout};

use crate::config::RetryConfig;
use crate::errors::TransportError;

/// A fully buffered HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Bytes,
}

impl Response {
    /// The service signals success with any status below 400 as long as it
    /// sent something back.
    pub fn is_accepted(&self) -> bool {
        (200..400).contains(&self.status) && !self.body.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub bytes: Bytes,
}

/// Request body. Kept as plain data because a multipart form can be sent
/// only once and every retry needs a fresh one.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Empty,
    Json(serde_json::Value),
    Multipart {
        fields: Vec<(String, String)>,
        file: Option<FilePart>,
    },
}

impl Payload {
    fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Payload::Empty => request,
            Payload::Json(value) => request.json(value),
            Payload::Multipart { fields, file } => {
                let mut form = Form::new();
                for (name, value) in fields {
                    form = form.text(name.clone(), value.clone());
                }
                if let Some(file) = file {
                    let length = file.bytes.len() as u64;
                    let part = Part::stream_with_length(file.bytes.clone(), length)
                        .file_name(file.file_name.clone());
                    form = form.part(file.field.clone(), part);
                }
                request.multipart(form)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Transport {
    base_url: url::Url,
    http_client: reqwest::Client,
    retry: RetryConfig,
}

impl Transport {
    pub fn new(base_url: &str, retry: RetryConfig) -> Result<Transport, TransportError> {
        Transport::with_proxy(base_url, retry, None)
    }

    pub fn with_proxy(
        base_url: &str,
        retry: RetryConfig,
        proxy: Option<&str>,
    ) -> Result<Transport, TransportError> {
        // Paths are joined relative to the base, so it has to end in '/'.
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = url::Url::parse(&base).map_err(|source| TransportError::InvalidUrl {
            path: base_url.to_string(),
            source,
        })?;

        let mut builder = reqwest::Client::builder();
        if let Some(proxy) = proxy {
            let proxy = reqwest::Proxy::all(proxy).map_err(|source| TransportError::Request {
                url: proxy.to_string(),
                source,
            })?;
            builder = builder.proxy(proxy);
        }
        let http_client = builder.build().map_err(|source| TransportError::Request {
            url: base_url.to_string(),
            source,
        })?;

        Ok(Transport {
            base_url,
            http_client,
            retry,
        })
    }

    pub fn base_url(&self) -> &url::Url {
        &self.base_url
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    pub fn resolve(&self, path: &str) -> Result<url::Url, TransportError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|source| TransportError::InvalidUrl {
                path: path.to_string(),
                source,
            })
    }

    /// Sends one logical request, retrying transient failures.
    ///
    /// When the retry budget is spent the last response is returned as is,
    /// or the last connection failure if no response ever arrived.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        headers: HeaderMap,
        payload: &Payload,
    ) -> Result<Response, TransportError> {
        let url = self.resolve(path)?;
        let mut attempt: u32 = 0;

        loop {
            debug!("{method} {url} (attempt {})", attempt + 1);
            let outcome = self.send_once(method.clone(), &url, &headers, payload).await;
            let can_retry = attempt < self.retry.max_retries;

            match outcome {
                Ok(response) if can_retry && self.retry.is_transient(response.status) => {
                    warn!("{method} {url} answered {}, retrying", response.status);
                }
                Ok(response) => {
                    debug!("{method} {url} answered {}", response.status);
                    return Ok(response);
                }
                Err(e) if can_retry && e.is_retryable() => {
                    warn!("{method} {url} failed: {e}, retrying");
                }
                Err(e) => return Err(e),
            }

            let wait = self.retry.backoff(attempt);
            trace!("backing off for {wait:?}");
            sleep(wait).await;
            attempt += 1;
        }
    }

    async fn send_once(
        &self,
        method: Method,
        url: &url::Url,
        headers: &HeaderMap,
        payload: &Payload,
    ) -> Result<Response, TransportError> {
        let request = self
            .http_client
            .request(method, url.clone())
            .headers(headers.clone())
            .header(ACCEPT, HeaderValue::from_static("application/json"));
        let request = payload.apply(request);

        let exchange = async {
            let resp = request.send().await?;
            let status = resp.status().as_u16();
            let body = resp.bytes().await?;
            Ok::<Response, reqwest::Error>(Response { status, body })
        };

        let limit = self.retry.timeout();
        match timeout(limit, exchange).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(source)) => Err(classify(url, source, limit)),
            Err(_) => Err(TransportError::Timeout {
                url: url.to_string(),
                after: limit,
            }),
        }
    }
}

fn classify(url: &url::Url, source: reqwest::Error, limit: std::time::Duration) -> TransportError {
    let url = url.to_string();
    if source.is_timeout() {
        TransportError::Timeout { url, after: limit }
    } else if source.is_connect() {
        TransportError::Connect { url, source }
    } else {
        TransportError::Request { url, source }
    }
}
