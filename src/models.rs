use serde::{Deserialize, Serialize};

use crate::entities::{film, planet};

/// Splits a comma separated source string into trimmed tags and encodes them
/// as a JSON array. An empty source yields `[]`.
pub fn encode_tags(raw: &str) -> String {
    let tags: Vec<&str> =
        if raw.is_empty() { Vec::new() } else { raw.split(',').map(str::trim).collect() };
    serde_json::to_string(&tags).unwrap_or_else(|_| "[]".to_string())
}

pub fn decode_tags(encoded: &str) -> Vec<String> {
    serde_json::from_str(encoded).unwrap_or_default()
}

pub fn format_timestamp(seconds: i64) -> String {
    jiff::Timestamp::from_second(seconds)
        .map(|ts| ts.strftime("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilmDto {
    pub id: i32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub episode: i32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub director: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub release_date: String,
}

impl From<&film::Model> for FilmDto {
    fn from(film: &film::Model) -> Self {
        Self {
            id: film.id,
            created_at: format_timestamp(film.created_at),
            updated_at: format_timestamp(film.updated_at),
            title: film.title.clone(),
            episode: film.episode,
            director: film.director.clone(),
            release_date: film.release_date.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanetDto {
    pub id: i32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub films: Vec<FilmDto>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub climates: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub terrains: Vec<String>,
}

impl PlanetDto {
    pub fn new(planet: &planet::Model, films: &[film::Model]) -> Self {
        Self {
            id: planet.id,
            created_at: format_timestamp(planet.created_at),
            updated_at: format_timestamp(planet.updated_at),
            films: films.iter().map(FilmDto::from).collect(),
            name: planet.name.clone(),
            climates: decode_tags(&planet.climates),
            terrains: decode_tags(&planet.terrains),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    pub count: usize,
    pub total: u64,
    pub previous: String,
    pub next: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanetsResponse {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub data: Vec<PlanetDto>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanetResponse {
    pub data: PlanetDto,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
}

fn is_zero(value: &i32) -> bool {
    *value == 0
}
