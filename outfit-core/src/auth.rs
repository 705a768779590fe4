//! Google service-account authentication (JWT bearer grant).

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{
    error::HttpError,
    retry::{RetryPolicy, with_retry},
};

pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_MINUTES: i64 = 60;

/// The subset of a service-account key file we need.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse Google service account JSON")
    }

    pub fn token_url(&self) -> &str {
        self.token_uri.as_deref().unwrap_or(GOOGLE_TOKEN_URL)
    }

    /// Signed RS256 assertion to trade for an access token.
    pub fn assertion(&self, scope: &str, audience: &str, now: DateTime<Utc>) -> Result<String> {
        let claims = AssertionClaims {
            iss: self.client_email.clone(),
            scope: scope.to_string(),
            aud: audience.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(ASSERTION_LIFETIME_MINUTES)).timestamp(),
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();

        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .context("Service account private key is not a valid RSA PEM")?;

        encode(&header, &claims, &key).context("Failed to sign service account assertion")
    }

    /// Exchange a fresh assertion for a bearer token.
    #[tracing::instrument(skip(self, http), fields(client = %self.client_email))]
    pub async fn access_token(&self, http: &Client, scope: &str, retry: RetryPolicy) -> Result<String> {
        let token_url = self.token_url();
        let assertion = self.assertion(scope, token_url, Utc::now())?;
        let assertion = assertion.as_str();

        let token: TokenResponse = with_retry(retry, "token exchange", move || async move {
            let res = http
                .post(token_url)
                .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion)])
                .send()
                .await
                .context("Failed to send token request to Google")?;

            let status = res.status();
            let body = res.text().await.context("Failed to read token response body")?;
            if !status.is_success() {
                return Err(HttpError::new("Google token", status, &body).into());
            }

            serde_json::from_str(&body).context("Failed to parse token response")
        })
        .await?;

        tracing::debug!("obtained spreadsheet access token");
        Ok(token.access_token)
    }
}
