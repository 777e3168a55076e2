use crate::config::SearchConfig;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Best-effort push of capacity changes to the search collaborator.
///
/// Fired after every commit that changes a ticket's remaining capacity.
/// Failures are logged and swallowed; they never block or roll back the
/// transaction they follow.
pub struct SearchIndexClient {
    client: reqwest::Client,
    base_url: String,
    index: String,
}

impl SearchIndexClient {
    pub fn new(base_url: String, index: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            index,
        }
    }

    /// Build a client from config; `None` when no index URL is configured.
    pub fn from_config(config: &SearchConfig) -> Option<Arc<Self>> {
        config
            .base_url
            .as_ref()
            .map(|url| Arc::new(Self::new(url.clone(), config.index.clone())))
    }

    pub async fn update_remaining_capacity(&self, ticket_id: Uuid, remaining_capacity: i32) {
        let url = format!("{}/{}/_update/{}", self.base_url, self.index, ticket_id);
        let body = json!({ "doc": { "remaining_capacity": remaining_capacity } });

        match self
            .client
            .post(&url)
            .json(&body)
            .timeout(Duration::from_secs(2))
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                debug!(%ticket_id, remaining_capacity, "search index capacity updated");
            }
            Ok(response) => {
                warn!(
                    %ticket_id,
                    status = %response.status(),
                    "search index capacity update rejected"
                );
            }
            Err(err) => {
                warn!(%ticket_id, %err, "search index capacity update failed");
            }
        }
    }
}
