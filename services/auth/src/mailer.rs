//! Outbound OTP mail delivery
//!
//! Delivery goes through an object-safe `Mailer` trait so the lifecycle
//! handlers never talk to a transport directly and tests can record
//! messages instead of sending them. Production uses a transactional
//! mail HTTP API; development falls back to log-only delivery.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::otp::OTP_TTL_MINUTES;

/// Mail delivery abstraction used by the lifecycle handlers
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver a verification code, or return an error so the caller
    /// can surface the failure distinctly from validation problems.
    async fn send_otp(&self, to_email: &str, username: &str, code: &str) -> Result<()>;
}

/// Mail transport configuration
#[derive(Debug, Clone)]
pub struct MailerConfig {
    /// Endpoint of the transactional mail API
    pub api_url: String,
    /// Bearer key for the mail API
    pub api_key: String,
    /// Sender address
    pub from_address: String,
}

impl MailerConfig {
    /// Create a new MailerConfig from environment variables
    ///
    /// # Environment Variables
    /// - `MAIL_API_URL`: endpoint of the transactional mail API (required)
    /// - `MAIL_API_KEY`: bearer key for the mail API (required)
    /// - `MAIL_FROM`: sender address (required)
    pub fn from_env() -> Result<Self> {
        let api_url = std::env::var("MAIL_API_URL")
            .map_err(|_| anyhow::anyhow!("MAIL_API_URL environment variable not set"))?;
        let api_key = std::env::var("MAIL_API_KEY")
            .map_err(|_| anyhow::anyhow!("MAIL_API_KEY environment variable not set"))?;
        let from_address = std::env::var("MAIL_FROM")
            .map_err(|_| anyhow::anyhow!("MAIL_FROM environment variable not set"))?;

        Ok(MailerConfig {
            api_url,
            api_key,
            from_address,
        })
    }
}

/// Sends mail through a transactional mail HTTP API
#[derive(Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    config: MailerConfig,
}

impl HttpMailer {
    /// Create a new HTTP mailer
    pub fn new(config: MailerConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send_otp(&self, to_email: &str, username: &str, code: &str) -> Result<()> {
        let body = json!({
            "from": self.config.from_address,
            "to": to_email,
            "subject": "Your verification code",
            "text": format!(
                "Hi {username},\n\nYour verification code is {code}. \
                 It expires in {OTP_TTL_MINUTES} minutes.\n"
            ),
        });

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("mail API returned status {}", response.status());
        }

        info!("Verification code sent to {}", to_email);
        Ok(())
    }
}

/// Development mailer that logs the message instead of sending it
#[derive(Clone, Debug)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_otp(&self, to_email: &str, username: &str, code: &str) -> Result<()> {
        info!(
            to_email = %to_email,
            username = %username,
            code = %code,
            "mail send stub"
        );
        Ok(())
    }
}
