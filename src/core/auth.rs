use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use super::errors::CoreError;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
// `drive.file` alone cannot write into folders the account did not create.
const DRIVE_SCOPES: &str =
    "https://www.googleapis.com/auth/drive https://www.googleapis.com/auth/drive.file";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN: Duration = Duration::from_secs(5 * 60);

/// The fields of a Google service-account JSON key this tool needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    sub: Option<&'a str>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at_utc: DateTime<Utc>,
}

impl CachedToken {
    fn is_expiring_within(&self, duration: Duration) -> bool {
        let threshold = Utc::now()
            + chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::minutes(5));
        self.expires_at_utc <= threshold
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

/// Access tokens for Drive via the service-account JWT bearer flow.
pub struct ServiceAccountAuth {
    client: Client,
    key: ServiceAccountKey,
    subject: Option<String>,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    pub fn new(client: Client, key: ServiceAccountKey, subject: Option<String>) -> Self {
        Self {
            client,
            key,
            subject: subject.filter(|s| !s.trim().is_empty()),
            cached: Mutex::new(None),
        }
    }

    pub async fn from_file(
        client: Client,
        path: &Path,
        subject: Option<String>,
    ) -> anyhow::Result<Self> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(CoreError::MissingCredentials(path.display().to_string()).into());
        }

        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read credentials file {}", path.display()))?;
        let key = serde_json::from_str::<ServiceAccountKey>(&raw)
            .with_context(|| format!("invalid service account key in {}", path.display()))?;

        Ok(Self::new(client, key, subject))
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    /// Returns the cached token, or exchanges a fresh assertion when the
    /// cached one is missing or within five minutes of expiry.
    pub async fn access_token(&self) -> anyhow::Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if !token.is_expiring_within(REFRESH_MARGIN) {
                return Ok(token.access_token.clone());
            }
        }

        let fresh = self.request_token().await?;
        let access_token = fresh.access_token.clone();
        *cached = Some(fresh);
        Ok(access_token)
    }

    fn signed_assertion(&self, now: DateTime<Utc>) -> anyhow::Result<String> {
        let iat = now.timestamp();
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: DRIVE_SCOPES,
            aud: &self.key.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
            sub: self.subject.as_deref(),
        };

        let key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .context("service account private key is not a valid RSA PEM")?;
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
            .context("failed to sign service account assertion")
    }

    async fn request_token(&self) -> anyhow::Result<CachedToken> {
        debug!("Requesting access token for {}", self.key.client_email);
        let assertion = self.signed_assertion(Utc::now())?;
        let form = [("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())];

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&form)
            .send()
            .await
            .context("failed to reach Google token endpoint")?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(CoreError::GoogleApi {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let payload = serde_json::from_str::<TokenResponse>(&body)
            .context("failed to parse Google token response")?;

        Ok(CachedToken {
            access_token: payload.access_token,
            expires_at_utc: Utc::now() + chrono::Duration::seconds(payload.expires_in),
        })
    }
}
