use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use karma_engine::pipeline::{DeliveryPolicy, PipelineConfig};

#[derive(Debug, Clone)]
pub struct Config {
    pub token: String,
    pub gateway_url: String,
    pub api_url: String,
    pub reply_queue: usize,
    pub delivery_retries: u32,
    pub fatal_delivery: bool,
}

/// On-disk credential file: `{"token": "..."}`
#[derive(Deserialize)]
struct TokenFile {
    token: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let token = match std::env::var("KARMA_TOKEN") {
            Ok(token) if !token.trim().is_empty() => token.trim().to_string(),
            _ => {
                let path = env_or("KARMA_TOKEN_FILE", "token.json");
                load_token(Path::new(&path))?
            }
        };

        Ok(Self {
            token,
            gateway_url: env_or("KARMA_GATEWAY_URL", "ws://127.0.0.1:3000/gateway"),
            api_url: env_or("KARMA_API_URL", "http://127.0.0.1:3000/api"),
            reply_queue: env_or("KARMA_REPLY_QUEUE", "64")
                .parse()
                .context("KARMA_REPLY_QUEUE must be a number")?,
            delivery_retries: env_or("KARMA_DELIVERY_RETRIES", "2")
                .parse()
                .context("KARMA_DELIVERY_RETRIES must be a number")?,
            fatal_delivery: env_or("KARMA_FATAL_DELIVERY", "false")
                .parse()
                .context("KARMA_FATAL_DELIVERY must be true or false")?,
        })
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            reply_queue: self.reply_queue,
            delivery: DeliveryPolicy {
                retries: self.delivery_retries,
                fatal: self.fatal_delivery,
                ..DeliveryPolicy::default()
            },
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.into())
}

pub fn load_token(path: &Path) -> Result<String> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read token file {}", path.display()))?;
    parse_token(&raw).with_context(|| format!("cannot parse token file {}", path.display()))
}

fn parse_token(raw: &str) -> Result<String> {
    let file: TokenFile = serde_json::from_str(raw)?;
    let token = file.token.trim();
    if token.is_empty() {
        bail!("token is empty");
    }
    Ok(token.to_string())
}
