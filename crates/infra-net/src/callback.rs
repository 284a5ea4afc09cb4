// HTTP poster for verdict callbacks.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use judge_core::error::{AppError, Result};
use judge_core::port::CallbackPoster;

/// Hard timeout on every callback POST. A slow contest frontend must not
/// hold a judge task longer than this.
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(2);

pub struct HttpCallbackPoster {
    client: reqwest::Client,
}

impl HttpCallbackPoster {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(CALLBACK_TIMEOUT)
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CallbackPoster for HttpCallbackPoster {
    async fn post(&self, url: &str, payload: Value) -> Result<()> {
        self.client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::Callback(e.to_string()))?
            .error_for_status()
            .map_err(|e| AppError::Callback(e.to_string()))?;
        Ok(())
    }
}
