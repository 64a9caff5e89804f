//! Delivery abstractions for issued codes.
//!
//! The service calls a [`Notifier`] after the code is stored and every map
//! guard is released. The result is only logged: a failed delivery leaves the
//! code valid so the user can retry.
//!
//! The default notifier for local dev is [`LogNotifier`], which logs the code
//! and returns `Ok(())`. [`TwilioNotifier`] sends an SMS through the Twilio
//! Messages API.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

use super::models::OtpCode;

const TWILIO_API_BASE: &str = "https://api.twilio.com";

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `code` to `identity` or return an error describing the failure.
    async fn send(&self, identity: &str, code: &OtpCode) -> Result<()>;
}

#[derive(Clone, Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, identity: &str, code: &OtpCode) -> Result<()> {
        info!(
            identity = %identity,
            code = %code.expose(),
            "otp notifier send stub"
        );
        Ok(())
    }
}

#[derive(Clone)]
pub struct TwilioOptions {
    pub account_sid: String,
    pub auth_token: SecretString,
    pub from_number: String,
    /// Override for tests or regional edges; defaults to `https://api.twilio.com`.
    pub api_base: Option<String>,
}

impl std::fmt::Debug for TwilioOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioOptions")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"***")
            .field("from_number", &self.from_number)
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Debug)]
pub struct TwilioNotifier {
    client: Client,
    messages_url: Url,
    options: TwilioOptions,
}

impl TwilioNotifier {
    /// # Errors
    /// Returns an error if the API base URL is invalid or the HTTP client
    /// cannot be built.
    pub fn new(options: TwilioOptions, timeout: Duration) -> Result<Self> {
        let base = options.api_base.as_deref().unwrap_or(TWILIO_API_BASE);
        let messages_url = Url::parse(base)
            .and_then(|base| {
                base.join(&format!(
                    "/2010-04-01/Accounts/{}/Messages.json",
                    options.account_sid
                ))
            })
            .with_context(|| format!("Invalid Twilio API base URL: {base}"))?;

        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Failed to build Twilio HTTP client")?;

        Ok(Self {
            client,
            messages_url,
            options,
        })
    }

    #[must_use]
    pub fn messages_url(&self) -> &Url {
        &self.messages_url
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    #[instrument(skip(self, code))]
    async fn send(&self, identity: &str, code: &OtpCode) -> Result<()> {
        let body = format!("Your verification code is {}", code.expose());
        let form = [
            ("To", identity),
            ("From", self.options.from_number.as_str()),
            ("Body", body.as_str()),
        ];

        let response = self
            .client
            .post(self.messages_url.clone())
            .basic_auth(
                &self.options.account_sid,
                Some(self.options.auth_token.expose_secret()),
            )
            .form(&form[..])
            .send()
            .await
            .context("Request to Twilio failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Twilio returned {status}: {error_body}"));
        }

        Ok(())
    }
}
