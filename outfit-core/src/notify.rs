//! SMS delivery.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    config::{Config, Credentials},
    error::HttpError,
    model::Delivery,
};

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// Sends one text message to the configured recipient.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> Result<Delivery>;
}

#[derive(Debug, Deserialize)]
struct TwilioMessage {
    sid: String,
    status: String,
}

pub struct TwilioNotifier {
    http: Client,
    base_url: String,
    account_sid: String,
    auth_token: String,
    from: String,
    to: String,
}

impl std::fmt::Debug for TwilioNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioNotifier")
            .field("account_sid", &self.account_sid)
            .field("from", &self.from)
            .field("to", &self.to)
            .finish_non_exhaustive()
    }
}

impl TwilioNotifier {
    pub fn new(http: Client, credentials: &Credentials) -> Self {
        Self {
            http,
            base_url: TWILIO_API_BASE.to_string(),
            account_sid: credentials.twilio_account_sid.clone(),
            auth_token: credentials.twilio_auth_token.clone(),
            from: credentials.twilio_from_number.clone(),
            to: credentials.recipient_number.clone(),
        }
    }

    pub fn from_config(config: &Config, credentials: &Credentials) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.http.timeout())
            .build()
            .context("Failed to build HTTP client for Twilio")?;

        Ok(Self::new(http, credentials))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn post_message(&self, message: &str) -> Result<Delivery> {
        let url = format!("{}/Accounts/{}/Messages.json", self.base_url, self.account_sid);

        let res = self
            .http
            .post(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[
                ("Body", message),
                ("From", self.from.as_str()),
                ("To", self.to.as_str()),
            ])
            .send()
            .await
            .context("Failed to send request to Twilio")?;

        let status = res.status();
        let body = res.text().await.context("Failed to read Twilio response body")?;

        if !status.is_success() {
            return Err(HttpError::new("Twilio", status, &body).into());
        }

        let parsed: TwilioMessage =
            serde_json::from_str(&body).context("Failed to parse Twilio response JSON")?;

        Ok(Delivery {
            sid: parsed.sid,
            status: parsed.status,
        })
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    #[tracing::instrument(skip(self, message), fields(to = %self.to, chars = message.chars().count()))]
    async fn send(&self, message: &str) -> Result<Delivery> {
        match self.post_message(message).await {
            Ok(delivery) => {
                tracing::info!(sid = %delivery.sid, status = %delivery.status, "SMS accepted");
                Ok(delivery)
            }
            Err(err) => {
                tracing::error!(error = %format!("{err:#}"), "SMS failed");
                Err(err.context("SMS delivery failed"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> Credentials {
        Credentials {
            google_service_account: "{}".into(),
            anthropic_api_key: "sk".into(),
            twilio_account_sid: "AC123".into(),
            twilio_auth_token: "token".into(),
            twilio_from_number: "+15550001111".into(),
            recipient_number: "+61400111222".into(),
        }
    }

    fn notifier(server: &MockServer) -> TwilioNotifier {
        TwilioNotifier::new(Client::new(), &credentials()).with_base_url(server.uri())
    }

    #[tokio::test]
    async fn posts_form_and_returns_delivery() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/Accounts/AC123/Messages.json"))
            .and(header_exists("Authorization"))
            .and(body_string_contains("To=%2B61400111222"))
            .and(body_string_contains("Body=Top%3A+Chambray"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "sid": "SM42",
                "status": "queued"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let delivery = notifier(&server).send("Top: Chambray").await.unwrap();
        assert_eq!(
            delivery,
            Delivery {
                sid: "SM42".into(),
                status: "queued".into()
            }
        );
    }

    #[tokio::test]
    async fn rejection_is_propagated() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string(r#"{"code":21211,"message":"Invalid 'To'"}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = notifier(&server).send("hello").await.unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("SMS delivery failed"));
        assert!(msg.contains("21211"));
    }
}
