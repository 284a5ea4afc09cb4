// DigitalOcean adapter for the Cloud port.
//
// Juries are droplets carrying the `jury` tag. Destruction pops arbitrary
// instances from the tagged set; nothing here knows whether an instance
// currently holds a job.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use judge_core::error::{AppError, Result};
use judge_core::port::Cloud;

const DEFAULT_API_BASE: &str = "https://api.digitalocean.com/v2";

const JURY_TAG: &str = "jury";
const JURY_REGION: &str = "sfo2";
const JURY_IMAGE: &str = "docker-16-04";
const JURY_SIZE: &str = "2gb";

pub struct DigitalOceanCloud {
    client: reqwest::Client,
    token: String,
    api_base: String,
}

impl DigitalOceanCloud {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token: token.into(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Point the adapter at a different API endpoint (tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    async fn tagged_droplets(&self) -> Result<Vec<Droplet>> {
        let response = self
            .client
            .get(format!("{}/droplets", self.api_base))
            .query(&[("tag_name", JURY_TAG)])
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| AppError::Cloud(e.to_string()))?
            .error_for_status()
            .map_err(|e| AppError::Cloud(e.to_string()))?;

        let list: DropletList = response
            .json()
            .await
            .map_err(|e| AppError::Cloud(e.to_string()))?;
        Ok(list.droplets)
    }
}

#[async_trait]
impl Cloud for DigitalOceanCloud {
    async fn current_count(&self) -> Result<u32> {
        Ok(self.tagged_droplets().await?.len() as u32)
    }

    async fn create_jury(&self, name: &str, user_data: &str) -> Result<()> {
        self.client
            .post(format!("{}/droplets", self.api_base))
            .bearer_auth(&self.token)
            .json(&json!({
                "name": name,
                "region": JURY_REGION,
                "image": JURY_IMAGE,
                "size": JURY_SIZE,
                "tags": [JURY_TAG],
                "user_data": user_data,
            }))
            .send()
            .await
            .map_err(|e| AppError::Cloud(e.to_string()))?
            .error_for_status()
            .map_err(|e| AppError::Cloud(e.to_string()))?;
        Ok(())
    }

    async fn destroy_juries(&self, n: u32) -> Result<u32> {
        let mut droplets = self.tagged_droplets().await?;
        let n = (n as usize).min(droplets.len());

        let mut destroyed = 0;
        for _ in 0..n {
            let Some(droplet) = droplets.pop() else {
                break;
            };
            let result = self
                .client
                .delete(format!("{}/droplets/{}", self.api_base, droplet.id))
                .bearer_auth(&self.token)
                .send()
                .await
                .map_err(|e| AppError::Cloud(e.to_string()))?
                .error_for_status();
            match result {
                Ok(_) => destroyed += 1,
                Err(e) => warn!(droplet_id = droplet.id, error = %e, "Droplet destroy failed"),
            }
        }
        Ok(destroyed)
    }
}

#[derive(Debug, Deserialize)]
struct DropletList {
    droplets: Vec<Droplet>,
}

#[derive(Debug, Deserialize)]
struct Droplet {
    id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn droplet_list_deserializes() {
        let body = r#"{"droplets": [{"id": 1, "name": "jury-aa"}, {"id": 2}]}"#;
        let list: DropletList = serde_json::from_str(body).unwrap();
        assert_eq!(list.droplets.len(), 2);
        assert_eq!(list.droplets[0].id, 1);
    }
}
