//! Client for the IL wrapper deployment, which identifies synchronously.
//!
//! A file is uploaded first and identified by the server-side path the
//! upload returns. The answer carries the flat tool report that
//! [`crate::decode::report`] understands. No job is created and nothing is
//! polled.

use std::path::Path;

use bytes::Bytes;
use log::debug;
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;
use crate::decode::{report, ToolReport};
use crate::errors::{body_text, DecodeError, Error, Result};
use crate::job::upload_name;
use crate::transport::{FilePart, Payload, Transport};

pub const UPLOAD_PATH: &str = "/api/upload";
pub const IDENTIFY_PATH: &str = "/api/identify";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub file_path: String,
    #[serde(default)]
    pub duration_in_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyResponse {
    pub result: String,
    #[serde(default)]
    pub duration_in_ms: u64,
}

impl IdentifyResponse {
    pub fn report(&self) -> std::result::Result<ToolReport, DecodeError> {
        report::parse(&self.result)
    }
}

#[derive(Debug, Clone)]
pub struct WrapperClient {
    transport: Transport,
}

impl WrapperClient {
    pub fn new(transport: Transport) -> WrapperClient {
        WrapperClient { transport }
    }

    pub fn from_config(config: &ClientConfig) -> Result<WrapperClient> {
        let transport = Transport::with_proxy(
            &config.base_url,
            config.retry.clone(),
            config.proxy.as_deref(),
        )?;
        Ok(WrapperClient::new(transport))
    }

    /// Stores the bytes on the server and returns where they landed.
    pub async fn upload(&self, name: &str, bytes: impl Into<Bytes>) -> Result<UploadResponse> {
        let payload = Payload::Multipart {
            fields: Vec::new(),
            file: Some(FilePart {
                field: "file".to_string(),
                file_name: name.to_string(),
                bytes: bytes.into(),
            }),
        };
        let response = self
            .transport
            .send(Method::POST, UPLOAD_PATH, HeaderMap::new(), &payload)
            .await?;
        if response.status != 200 || response.body.is_empty() {
            return Err(Error::Upload {
                status: response.status,
                body: body_text(&response.body),
            });
        }
        let uploaded: UploadResponse = serde_json::from_slice(&response.body)?;
        debug!(
            "uploaded {name} to {} in {}ms",
            uploaded.file_path, uploaded.duration_in_ms
        );
        Ok(uploaded)
    }

    /// Identifies a file already on the server.
    pub async fn identify_path(&self, file_path: &str) -> Result<IdentifyResponse> {
        let payload = Payload::Json(serde_json::json!({ "filePath": file_path }));
        let response = self
            .transport
            .send(Method::POST, IDENTIFY_PATH, HeaderMap::new(), &payload)
            .await?;
        if response.status != 200 || response.body.is_empty() {
            return Err(Error::Identify {
                status: response.status,
                body: body_text(&response.body),
            });
        }
        Ok(serde_json::from_slice(&response.body)?)
    }

    pub async fn identify_bytes(
        &self,
        name: &str,
        bytes: impl Into<Bytes>,
    ) -> Result<IdentifyResponse> {
        let uploaded = self.upload(name, bytes).await?;
        self.identify_path(&uploaded.file_path).await
    }

    pub async fn identify_file(&self, path: impl AsRef<Path>) -> Result<IdentifyResponse> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        self.identify_bytes(&upload_name(path), bytes).await
    }
}
