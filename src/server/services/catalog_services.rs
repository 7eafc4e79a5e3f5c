// thin client for the drama catalog, the notifier is the only consumer
use async_trait::async_trait;
use mockall::automock;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, error};

use crate::server::{
    dtos::catalog_dto::{ApiResult, Drama, DramaDetail, DramaEpisode},
    error::{AppResult, Error},
};

/// how far back the ongoing scan looks
const ONGOING_SCAN_LIMIT: u32 = 100;

pub type DynCatalogService = Arc<dyn CatalogServiceTrait + Send + Sync>;

#[automock]
#[async_trait]
pub trait CatalogServiceTrait {
    async fn latest_dramas(&self, limit: u32) -> AppResult<Vec<Drama>>;
    async fn drama_detail(&self, id: &str) -> AppResult<DramaDetail>;
    async fn drama_episodes(&self, id: &str) -> AppResult<Vec<DramaEpisode>>;
    /// latest dramas whose detail says they are still airing, with the episode count filled in
    async fn ongoing_dramas(&self) -> AppResult<Vec<Drama>>;
}

pub struct CatalogService {
    http: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
}

impl CatalogService {
    pub fn new(http: reqwest::Client, api_base: String, api_key: Option<String>) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    async fn fetch_api<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> AppResult<T> {
        let url = format!("{}{}", self.api_base, endpoint);
        debug!("Catalog request: {}", url);

        let mut request = self.http.get(&url).query(params);
        if let Some(api_key) = &self.api_key {
            request = request.header("x-api-key", api_key);
        }

        let response = request.send().await.map_err(|e| {
            Error::InternalServerErrorWithContext(format!("catalog request {} failed: {}", url, e))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::InternalServerErrorWithContext(format!(
                "API Error: {} ({})",
                status.as_u16(),
                url
            )));
        }

        let result: ApiResult<T> = response.json().await.map_err(|e| {
            Error::InternalServerErrorWithContext(format!(
                "failed to parse catalog response {}: {}",
                url, e
            ))
        })?;

        if !result.success {
            return Err(Error::InternalServerErrorWithContext(
                result
                    .message
                    .unwrap_or_else(|| "API request failed".to_string()),
            ));
        }

        result.data.ok_or_else(|| {
            Error::InternalServerErrorWithContext(format!("catalog response {} has no data", url))
        })
    }
}

#[async_trait]
impl CatalogServiceTrait for CatalogService {
    async fn latest_dramas(&self, limit: u32) -> AppResult<Vec<Drama>> {
        self.fetch_api("/drama/latest", &[("limit", limit.to_string())])
            .await
    }

    async fn drama_detail(&self, id: &str) -> AppResult<DramaDetail> {
        self.fetch_api(&format!("/drama/detail/{}", urlencoding::encode(id)), &[])
            .await
    }

    async fn drama_episodes(&self, id: &str) -> AppResult<Vec<DramaEpisode>> {
        self.fetch_api(&format!("/drama/episodes/{}", urlencoding::encode(id)), &[])
            .await
    }

    async fn ongoing_dramas(&self) -> AppResult<Vec<Drama>> {
        let latest = self.latest_dramas(ONGOING_SCAN_LIMIT).await?;
        let mut ongoing = Vec::new();

        // one at a time, the catalog doesn't like bursts
        for drama in latest {
            match self.drama_detail(&drama.id).await {
                Ok(detail) if detail.is_ongoing() => {
                    let episode_count = detail.episode_count();
                    ongoing.push(Drama {
                        status: Some("Ongoing".to_string()),
                        episode_count: Some(episode_count),
                        ..drama
                    });
                }
                Ok(_) => {}
                Err(e) => error!("Failed to get detail for drama {}: {}", drama.id, e),
            }
        }

        debug!("Found {} ongoing dramas", ongoing.len());
        Ok(ongoing)
    }
}
