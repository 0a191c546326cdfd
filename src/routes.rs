use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;

use crate::{
    AppState,
    catalog::{DEFAULT_PAGE, DEFAULT_SIZE, PlanetQuery},
    error::{AppError, AppResult},
    models::{
        HealthResponse, HealthStatus, Pagination, PlanetDto, PlanetResponse, PlanetsResponse,
    },
};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/healthcheck", get(healthcheck))
        .route("/api/planets", get(list_planets))
        .route("/api/planets/{id}", get(get_planet).delete(delete_planet))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    page: Option<String>,
    size: Option<String>,
    #[serde(rename = "loadFilms")]
    load_films: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoadParams {
    #[serde(rename = "loadFilms")]
    load_films: Option<String>,
}

/// Absent, non-numeric or zero values fall back to `default`.
fn positive_or(raw: Option<&str>, default: u32) -> u32 {
    raw.and_then(|s| s.parse::<u32>().ok()).filter(|n| *n >= 1).unwrap_or(default)
}

fn flag(raw: Option<&str>) -> bool {
    raw == Some("true")
}

fn planet_id(raw: &str) -> AppResult<i32> {
    raw.parse::<i32>()
        .ok()
        .filter(|id| *id >= 1)
        .ok_or_else(|| AppError::BadRequest("invalid planet id".to_string()))
}

fn page_link(base: &str, page: u32, query: &PlanetQuery) -> String {
    let mut link = format!("{base}?page={page}");
    if query.size != DEFAULT_SIZE {
        link.push_str(&format!("&size={}", query.size));
    }
    if let Some(name) = &query.name {
        link.push_str(&format!("&name={}", urlencoding::encode(name)));
    }
    if query.load_films {
        link.push_str("&loadFilms=true");
    }
    link
}

pub async fn list_planets(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<PlanetsResponse>> {
    let query = PlanetQuery {
        page: positive_or(params.page.as_deref(), DEFAULT_PAGE),
        size: positive_or(params.size.as_deref(), DEFAULT_SIZE),
        load_films: flag(params.load_films.as_deref()),
        name: params.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
    };

    let page = state.planets.find_planets_and_total(&query).await?;

    let base = state.config.planets_url();
    let previous =
        if query.page > 1 { page_link(&base, query.page - 1, &query) } else { String::new() };
    let next = if page.next { page_link(&base, query.page + 1, &query) } else { String::new() };

    let data: Vec<PlanetDto> =
        page.data.iter().map(|r| PlanetDto::new(&r.planet, &r.films)).collect();

    Ok(Json(PlanetsResponse {
        pagination: Pagination { count: data.len(), total: page.total, previous, next },
        data,
    }))
}

pub async fn get_planet(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<LoadParams>,
) -> AppResult<Json<PlanetResponse>> {
    let id = planet_id(&id)?;
    let record =
        state.planets.find_planet_by_id(id, flag(params.load_films.as_deref())).await?;

    Ok(Json(PlanetResponse { data: PlanetDto::new(&record.planet, &record.films) }))
}

pub async fn delete_planet(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let id = planet_id(&id)?;
    state.planets.delete_planet(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn healthcheck(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    match state.health.ping().await {
        Ok(()) => (StatusCode::OK, Json(HealthResponse { status: HealthStatus::Up })),
        Err(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, Json(HealthResponse { status: HealthStatus::Down }))
        },
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, sync::Mutex};

    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        catalog::{
            Catalog, HealthCheck, PlanetPage, PlanetRecord, PlanetStore,
            tests::{film as sample_film, memory_catalog, planet as sample_planet},
        },
        config::Config,
        entities::planet,
    };

    fn config() -> Arc<Config> {
        Arc::new(Config {
            addr: "127.0.0.1:8080".parse().unwrap(),
            database_url: "sqlite::memory:".to_string(),
            swapi_base_url: "http://swapi.test/api".to_string(),
            swapi_rps: 1,
            public_base_url: "http://localhost:8080".to_string(),
        })
    }

    /// Returns canned results and remembers the last list query.
    #[derive(Default)]
    struct FakeStore {
        page: PlanetPage,
        fail: bool,
        last_query: Mutex<Option<PlanetQuery>>,
        deleted: Mutex<Vec<i32>>,
    }

    #[async_trait]
    impl PlanetStore for FakeStore {
        async fn create_planets(&self, _: Vec<planet::Model>) -> AppResult<u64> {
            Ok(0)
        }

        async fn create_relationships(&self, _: &BTreeMap<i32, Vec<i32>>) -> AppResult<u64> {
            Ok(0)
        }

        async fn find_planets_and_total(&self, query: &PlanetQuery) -> AppResult<PlanetPage> {
            *self.last_query.lock().unwrap() = Some(query.clone());
            if self.fail {
                return Err(anyhow::anyhow!("database is locked").into());
            }
            Ok(self.page.clone())
        }

        async fn find_planet_by_id(&self, id: i32, _: bool) -> AppResult<PlanetRecord> {
            if self.fail {
                return Err(anyhow::anyhow!("database is locked").into());
            }
            self.page
                .data
                .iter()
                .find(|r| r.planet.id == id)
                .cloned()
                .ok_or_else(|| AppError::planet_not_found(id))
        }

        async fn delete_planet(&self, id: i32) -> AppResult<u64> {
            if self.fail {
                return Err(anyhow::anyhow!("database is locked").into());
            }
            self.deleted.lock().unwrap().push(id);
            Ok(1)
        }
    }

    #[async_trait]
    impl HealthCheck for FakeStore {
        async fn ping(&self) -> AppResult<()> {
            if self.fail {
                return Err(anyhow::anyhow!("connection refused").into());
            }
            Ok(())
        }
    }

    fn app(store: Arc<FakeStore>) -> Router {
        router(Arc::new(AppState { config: config(), planets: store.clone(), health: store }))
    }

    fn app_with_catalog(catalog: Catalog) -> Router {
        let catalog = Arc::new(catalog);
        router(Arc::new(AppState { config: config(), planets: catalog.clone(), health: catalog }))
    }

    async fn send(app: Router, method: &str, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri).body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn record(id: i32) -> PlanetRecord {
        PlanetRecord { planet: sample_planet(id, "Tatooine"), films: Vec::new() }
    }

    #[test]
    fn invalid_pagination_falls_back_to_defaults() {
        assert_eq!(positive_or(None, 10), 10);
        assert_eq!(positive_or(Some("abc"), 10), 10);
        assert_eq!(positive_or(Some("0"), 1), 1);
        assert_eq!(positive_or(Some("-3"), 1), 1);
        assert_eq!(positive_or(Some("4"), 1), 4);
        assert_eq!(positive_or(Some(" 3"), 1), 1);
        assert_eq!(positive_or(Some("3 "), 10), 10);
    }

    #[tokio::test]
    async fn list_without_params_uses_defaults_and_has_no_links() {
        let store = Arc::new(FakeStore {
            page: PlanetPage { data: vec![record(1)], total: 1, next: false },
            ..Default::default()
        });

        let (status, body) = send(app(store.clone()), "GET", "/api/planets").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
        assert_eq!(body["total"], 1);
        assert_eq!(body["previous"], "");
        assert_eq!(body["next"], "");
        assert_eq!(body["data"][0]["id"], 1);
        assert_eq!(body["data"][0]["created_at"], "2014-12-09 13:50:49");
        assert_eq!(body["data"][0]["climates"][0], "arid");
        assert!(body["data"][0].get("films").is_none());
        assert_eq!(*store.last_query.lock().unwrap(), Some(PlanetQuery::default()));
    }

    #[tokio::test]
    async fn list_builds_adjacent_page_links() {
        let store = Arc::new(FakeStore {
            page: PlanetPage { data: vec![record(2)], total: 3, next: true },
            ..Default::default()
        });

        let (status, body) =
            send(app(store.clone()), "GET", "/api/planets?page=2&size=1&loadFilms=true").await;

        assert_eq!(status, StatusCode::OK);
        let base = "http://localhost:8080/api/planets";
        assert_eq!(body["previous"], format!("{base}?page=1&size=1&loadFilms=true"));
        assert_eq!(body["next"], format!("{base}?page=3&size=1&loadFilms=true"));
        let query = store.last_query.lock().unwrap().clone().unwrap();
        assert_eq!((query.page, query.size, query.load_films), (2, 1, true));
    }

    #[tokio::test]
    async fn page_links_encode_name_and_omit_default_size() {
        let store = Arc::new(FakeStore {
            page: PlanetPage { data: vec![record(4)], total: 30, next: true },
            ..Default::default()
        });

        let (status, body) =
            send(app(store.clone()), "GET", "/api/planets?page=2&size=10&name=Yavin%20IV").await;

        assert_eq!(status, StatusCode::OK);
        let base = "http://localhost:8080/api/planets";
        assert_eq!(body["previous"], format!("{base}?page=1&name=Yavin%20IV"));
        assert_eq!(body["next"], format!("{base}?page=3&name=Yavin%20IV"));
        let query = store.last_query.lock().unwrap().clone().unwrap();
        assert_eq!(query.name.as_deref(), Some("Yavin IV"));
    }

    #[tokio::test]
    async fn list_passes_name_filter_and_ignores_bad_numbers() {
        let store = Arc::new(FakeStore::default());

        let (status, body) =
            send(app(store.clone()), "GET", "/api/planets?page=x&size=0&name=tatooine").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 0);
        assert_eq!(body["data"], Value::Array(vec![]));
        let query = store.last_query.lock().unwrap().clone().unwrap();
        assert_eq!(query.page, 1);
        assert_eq!(query.size, 10);
        assert_eq!(query.name.as_deref(), Some("tatooine"));
    }

    #[tokio::test]
    async fn list_store_failure_is_internal_error() {
        let store = Arc::new(FakeStore { fail: true, ..Default::default() });

        let (status, body) = send(app(store), "GET", "/api/planets").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal server error");
    }

    #[tokio::test]
    async fn get_rejects_invalid_id() {
        for uri in ["/api/planets/0", "/api/planets/abc", "/api/planets/-1"] {
            let (status, body) = send(app(Arc::new(FakeStore::default())), "GET", uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["error"], "invalid planet id");
        }
    }

    #[tokio::test]
    async fn get_missing_planet_is_not_found() {
        let router = app(Arc::new(FakeStore::default()));
        let (status, body) = send(router, "GET", "/api/planets/7").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "planet 7 not found");
    }

    #[tokio::test]
    async fn get_includes_films_when_loaded() {
        let store = Arc::new(FakeStore {
            page: PlanetPage {
                data: vec![PlanetRecord {
                    planet: sample_planet(1, "Tatooine"),
                    films: vec![sample_film(1)],
                }],
                total: 1,
                next: false,
            },
            ..Default::default()
        });

        let (status, body) = send(app(store), "GET", "/api/planets/1?loadFilms=true").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "Tatooine");
        assert_eq!(body["data"]["films"][0]["release_date"], "1977-05-25");
        assert_eq!(body["data"]["films"][0]["episode"], 1);
    }

    #[tokio::test]
    async fn delete_returns_no_content() {
        let store = Arc::new(FakeStore::default());

        let (status, body) = send(app(store.clone()), "DELETE", "/api/planets/3").await;

        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);
        assert_eq!(*store.deleted.lock().unwrap(), vec![3]);
    }

    #[tokio::test]
    async fn delete_rejects_invalid_id_and_reports_store_failure() {
        let router = app(Arc::new(FakeStore::default()));
        let (status, _) = send(router, "DELETE", "/api/planets/0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let failing = Arc::new(FakeStore { fail: true, ..Default::default() });
        let (status, body) = send(app(failing), "DELETE", "/api/planets/1").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal server error");
    }

    #[tokio::test]
    async fn healthcheck_reports_store_state() {
        let healthy = Arc::new(FakeStore::default());
        let (status, body) = send(app(healthy), "GET", "/api/healthcheck").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "up");

        let failing = Arc::new(FakeStore { fail: true, ..Default::default() });
        let (status, body) = send(app(failing), "GET", "/api/healthcheck").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "down");
    }

    #[tokio::test]
    async fn end_to_end_against_sqlite() {
        let catalog = memory_catalog().await;
        catalog
            .create_planets(vec![sample_planet(1, "Tatooine"), sample_planet(2, "Hoth")])
            .await
            .unwrap();

        let router = app_with_catalog(catalog);

        let (status, body) = send(router.clone(), "GET", "/api/planets").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);

        let (status, _) = send(router.clone(), "DELETE", "/api/planets/2").await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = send(router.clone(), "GET", "/api/planets").await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["data"][0]["name"], "Tatooine");
        assert_eq!(body["next"], "");

        let (status, body) = send(router, "GET", "/api/planets/2").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "planet 2 not found");
    }
}
