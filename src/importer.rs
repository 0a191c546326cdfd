use std::{
    collections::{BTreeMap, BTreeSet},
    future::Future,
};

use anyhow::{Context, anyhow};
use jiff::{
    civil::{Date, DateTime},
    tz::TimeZone,
};
use tracing::{error, info, warn};

use crate::{
    catalog::{FilmStore, PlanetStore},
    entities::{film, planet},
    error::AppResult,
    models::encode_tags,
    swapi::{Page, ResourceSource, SwapiFilm, SwapiPlanet},
};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub films: usize,
    pub planets: usize,
    pub associations: usize,
}

/// Pulls every film and planet from `source` and writes them to the store.
///
/// Any failure aborts the run. Rows written before the failure are kept.
pub async fn run(
    source: &dyn ResourceSource,
    films: &dyn FilmStore,
    planets: &dyn PlanetStore,
) -> AppResult<ImportReport> {
    info!(trace = "importer.run", "starting import");

    let swapi_films = fetch_all(move |page| source.films(page)).await.inspect_err(|err| {
        error!(trace = "importer.run:fetch_films", error = %err, "failed to fetch films")
    })?;

    let film_models = swapi_films
        .iter()
        .map(|f| {
            film_from_swapi(f).inspect_err(|err| {
                error!(
                    trace = "importer.run:parse_film",
                    film_url = %f.url,
                    error = %err,
                    "bad film"
                )
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    let swapi_planets = fetch_all(move |page| source.planets(page)).await.inspect_err(|err| {
        error!(trace = "importer.run:fetch_planets", error = %err, "failed to fetch planets")
    })?;

    let planet_models = swapi_planets
        .iter()
        .map(|p| {
            planet_from_swapi(p).inspect_err(|err| {
                error!(
                    trace = "importer.run:parse_planet",
                    planet_url = %p.url,
                    error = %err,
                    "bad planet"
                )
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    let mut relationships = film_ids_by_planet(&swapi_planets).inspect_err(|err| {
        error!(trace = "importer.run:relationships", error = %err, "bad film reference")
    })?;

    let known_films: BTreeSet<i32> = film_models.iter().map(|f| f.id).collect();
    let dropped = retain_known_films(&mut relationships, &known_films);
    if dropped > 0 {
        warn!(
            trace = "importer.run:relationships",
            dropped,
            "skipping links to films missing from the film listing"
        );
    }

    let report = ImportReport {
        films: film_models.len(),
        planets: planet_models.len(),
        associations: relationships.values().map(Vec::len).sum(),
    };

    films.create_films(film_models).await.inspect_err(|err| {
        error!(trace = "importer.run:create_films", error = %err, "insert failed")
    })?;
    planets.create_planets(planet_models).await.inspect_err(|err| {
        error!(trace = "importer.run:create_planets", error = %err, "insert failed")
    })?;
    planets.create_relationships(&relationships).await.inspect_err(|err| {
        error!(trace = "importer.run:create_relationships", error = %err, "insert failed")
    })?;

    info!(
        trace = "importer.run",
        films = report.films,
        planets = report.planets,
        associations = report.associations,
        "import finished"
    );
    Ok(report)
}

/// Requests pages 1, 2, ... until a page reports no successor.
async fn fetch_all<T, F, Fut>(mut fetch: F) -> AppResult<Vec<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = AppResult<Page<T>>>,
{
    let mut out = Vec::new();
    let mut page = 1;
    loop {
        let res = fetch(page).await?;
        let more = res.has_next();
        out.extend(res.results);
        if !more {
            return Ok(out);
        }
        page += 1;
    }
}

/// Takes the id from the segment before the trailing slash, e.g. `.../planets/1/` is `1`.
pub fn resource_id(url: &str) -> AppResult<i32> {
    let mut segments = url.rsplit('/');
    segments.next();
    let id = segments
        .next()
        .and_then(|segment| segment.parse::<i32>().ok())
        .filter(|id| *id > 0)
        .ok_or_else(|| anyhow!("resource url {url:?} has no numeric id"))?;
    Ok(id)
}

/// `2014-12-10T14:23:31.880000Z` becomes `2014-12-10 14:23:31`.
pub fn normalize_timestamp(raw: &str) -> String {
    let date = raw.replacen('T', " ", 1);
    date.split('.').next().unwrap_or_default().to_string()
}

fn parse_timestamp(raw: &str) -> AppResult<i64> {
    let normalized = normalize_timestamp(raw);
    let dt = DateTime::strptime(TIMESTAMP_FORMAT, &normalized)
        .with_context(|| format!("invalid timestamp {raw:?}"))?;
    Ok(dt.to_zoned(TimeZone::UTC)?.timestamp().as_second())
}

fn parse_date(raw: &str) -> AppResult<String> {
    let date = Date::strptime(DATE_FORMAT, normalize_timestamp(raw))
        .with_context(|| format!("invalid date {raw:?}"))?;
    Ok(date.to_string())
}

pub fn film_from_swapi(swapi: &SwapiFilm) -> AppResult<film::Model> {
    Ok(film::Model {
        id: resource_id(&swapi.url)?,
        created_at: parse_timestamp(&swapi.created)?,
        updated_at: parse_timestamp(&swapi.edited)?,
        title: swapi.title.clone(),
        episode: swapi.episode_id,
        director: swapi.director.clone(),
        release_date: parse_date(&swapi.release_date)?,
    })
}

pub fn planet_from_swapi(swapi: &SwapiPlanet) -> AppResult<planet::Model> {
    Ok(planet::Model {
        id: resource_id(&swapi.url)?,
        created_at: parse_timestamp(&swapi.created)?,
        updated_at: parse_timestamp(&swapi.edited)?,
        deleted_at: None,
        name: swapi.name.clone(),
        climates: encode_tags(&swapi.climate),
        terrains: encode_tags(&swapi.terrain),
    })
}

/// Film ids referenced by each planet, in source order.
pub fn film_ids_by_planet(planets: &[SwapiPlanet]) -> AppResult<BTreeMap<i32, Vec<i32>>> {
    let mut relationships: BTreeMap<i32, Vec<i32>> = BTreeMap::new();
    for planet in planets {
        let planet_id = resource_id(&planet.url)?;
        let film_ids =
            planet.films.iter().map(|url| resource_id(url)).collect::<AppResult<Vec<_>>>()?;
        relationships.entry(planet_id).or_default().extend(film_ids);
    }
    Ok(relationships)
}

/// Drops film ids outside `known`. Returns how many links were removed.
pub fn retain_known_films(
    relationships: &mut BTreeMap<i32, Vec<i32>>,
    known: &BTreeSet<i32>,
) -> usize {
    let mut dropped = 0;
    for film_ids in relationships.values_mut() {
        let before = film_ids.len();
        film_ids.retain(|id| known.contains(id));
        dropped += before - film_ids.len();
    }
    dropped
}
