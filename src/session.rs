//! Bearer credential for the IngestList API.
//!
//! The service does not advertise token lifetimes, so a token is kept until
//! a request is rejected with 401 and then replaced by logging in again.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::config::LoginField;
use crate::errors::{body_text, Error, Result};
use crate::transport::{Payload, Transport};

pub const LOGIN_PATH: &str = "/api/login";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub obtained_at: Instant,
}

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub login_field: LoginField,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .field("login_field", &self.login_field)
            .finish()
    }
}

/// Shared, cloneable login state. Clones see the same cached token.
#[derive(Debug, Clone)]
pub struct Session {
    transport: Transport,
    credentials: Arc<Credentials>,
    credential: Arc<RwLock<Option<Credential>>>,
}

impl Session {
    pub fn new(transport: Transport, credentials: Credentials) -> Session {
        Session {
            transport,
            credentials: Arc::new(credentials),
            credential: Arc::new(RwLock::new(None)),
        }
    }

    /// Starts from a token obtained elsewhere, e.g. by an earlier process.
    pub fn with_token(transport: Transport, credentials: Credentials, token: String) -> Session {
        Session {
            transport,
            credentials: Arc::new(credentials),
            credential: Arc::new(RwLock::new(Some(Credential {
                token,
                obtained_at: Instant::now(),
            }))),
        }
    }

    /// Exchanges the credentials for a new token and caches it.
    ///
    /// The lock is not held during the exchange: concurrent logins each
    /// store an equally valid token and the last write wins.
    pub async fn login(&self) -> Result<Credential> {
        debug!("logging in as {}", self.credentials.username);
        let mut body = serde_json::Map::new();
        body.insert(
            self.credentials.login_field.key().to_string(),
            self.credentials.username.clone().into(),
        );
        body.insert(
            "password".to_string(),
            self.credentials.password.clone().into(),
        );
        let payload = Payload::Json(body.into());
        let response = self
            .transport
            .send(Method::POST, LOGIN_PATH, HeaderMap::new(), &payload)
            .await?;

        #[derive(Deserialize)]
        struct LoginResponse {
            token: Option<String>,
        }

        let auth_error = || Error::Auth {
            status: response.status,
            body: body_text(&response.body),
        };
        if response.status != 200 || response.body.is_empty() {
            warn!("login rejected with status {}", response.status);
            return Err(auth_error());
        }
        let token = serde_json::from_slice::<LoginResponse>(&response.body)
            .ok()
            .and_then(|data| data.token)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                warn!("login response carries no token");
                auth_error()
            })?;

        let credential = Credential {
            token,
            obtained_at: Instant::now(),
        };
        *self.credential.write().await = Some(credential.clone());
        Ok(credential)
    }

    pub async fn current(&self) -> Option<Credential> {
        self.credential.read().await.clone()
    }

    /// The cached token, logging in first if there is none.
    pub async fn token(&self) -> Result<String> {
        if let Some(credential) = self.current().await {
            return Ok(credential.token);
        }
        Ok(self.login().await?.token)
    }

    /// Replaces a token the service rejected. When another task already
    /// swapped it out, the newer token is returned without logging in again.
    pub async fn refresh(&self, rejected: &str) -> Result<String> {
        if let Some(credential) = self.current().await {
            if credential.token != rejected {
                debug!("token already refreshed by a concurrent request");
                return Ok(credential.token);
            }
        }
        warn!("token rejected, logging in again");
        Ok(self.login().await?.token)
    }

    pub async fn reset(&self) {
        *self.credential.write().await = None;
    }

    pub async fn authorized_headers(&self) -> Result<HeaderMap> {
        let token = self.token().await?;
        bearer_headers(&token)
    }
}

pub(crate) fn bearer_headers(token: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    let value =
        HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| Error::InvalidToken)?;
    headers.insert(AUTHORIZATION, value);
    Ok(headers)
}
