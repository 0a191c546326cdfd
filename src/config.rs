use std::net::SocketAddr;

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub swapi_base_url: String,
    pub swapi_rps: u32,
    /// Prefix for the `previous`/`next` links of paginated responses.
    pub public_base_url: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "8080".to_string()).parse().context("PORT")?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://starwars.db?mode=rwc".to_string());

        let swapi_base_url = std::env::var("SWAPI_BASE_URL")
            .unwrap_or_else(|_| "https://swapi.dev/api".to_string());

        let swapi_rps: u32 =
            std::env::var("SWAPI_RPS").ok().and_then(|s| s.parse().ok()).unwrap_or(5);

        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| format!("http://{host}:{port}"));

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            database_url,
            swapi_base_url,
            swapi_rps,
            public_base_url,
        })
    }

    pub fn planets_url(&self) -> String {
        format!("{}/api/planets", self.public_base_url.trim_end_matches('/'))
    }
}
