use std::{num::NonZeroU32, sync::Arc};

use async_trait::async_trait;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use serde::{Deserialize, de::DeserializeOwned};

use crate::error::AppResult;

/// One page of a SWAPI listing.
#[derive(Clone, Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub next: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.next.as_deref().is_some_and(|next| !next.is_empty())
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct SwapiFilm {
    pub url: String,
    pub created: String,
    pub edited: String,
    pub title: String,
    pub episode_id: i32,
    pub director: String,
    pub release_date: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SwapiPlanet {
    pub url: String,
    pub created: String,
    pub edited: String,
    pub name: String,
    #[serde(default)]
    pub climate: String,
    #[serde(default)]
    pub terrain: String,
    #[serde(default)]
    pub films: Vec<String>,
}

/// Paginated access to the external planet and film listings. Pages are 1-based.
#[async_trait]
pub trait ResourceSource: Send + Sync {
    async fn films(&self, page: u32) -> AppResult<Page<SwapiFilm>>;

    async fn planets(&self, page: u32) -> AppResult<Page<SwapiPlanet>>;
}

pub struct SwapiClient {
    client: reqwest::Client,
    base_url: String,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl SwapiClient {
    pub fn new(client: reqwest::Client, base_url: String, rps: u32) -> Self {
        let limiter = Arc::new(RateLimiter::direct(Quota::per_second(
            NonZeroU32::new(rps.max(1)).unwrap_or(NonZeroU32::MIN),
        )));
        Self { client, base_url, limiter }
    }

    fn page_url(&self, resource: &str, page: u32) -> String {
        let base = self.base_url.trim_end_matches('/');
        if page > 1 {
            format!("{base}/{resource}/?page={page}")
        } else {
            format!("{base}/{resource}/")
        }
    }

    async fn get_page<T: DeserializeOwned>(&self, resource: &str, page: u32) -> AppResult<Page<T>> {
        self.limiter.until_ready().await;

        let url = self.page_url(resource, page);
        tracing::debug!(%url, "fetching swapi page");

        let resp: Page<T> =
            self.client.get(url).send().await?.error_for_status()?.json().await?;
        Ok(resp)
    }
}

#[async_trait]
impl ResourceSource for SwapiClient {
    async fn films(&self, page: u32) -> AppResult<Page<SwapiFilm>> {
        self.get_page("films", page).await
    }

    async fn planets(&self, page: u32) -> AppResult<Page<SwapiPlanet>> {
        self.get_page("planets", page).await
    }
}
