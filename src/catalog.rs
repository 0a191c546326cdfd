use std::collections::BTreeMap;

use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, LoaderTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, LikeExpr, OnConflict, SimpleExpr},
};
use tracing::{debug, error};

use crate::{
    entities::{film, planet, planet_film},
    error::{AppError, AppResult},
};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_SIZE: u32 = 10;

/// A page request against the planet listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanetQuery {
    pub page: u32,
    pub size: u32,
    pub load_films: bool,
    /// Case-insensitive substring match on the planet name.
    pub name: Option<String>,
}

impl Default for PlanetQuery {
    fn default() -> Self {
        Self { page: DEFAULT_PAGE, size: DEFAULT_SIZE, load_films: false, name: None }
    }
}

impl PlanetQuery {
    pub fn offset(&self) -> u64 {
        if self.page > 1 {
            (u64::from(self.size) * u64::from(self.page - 1)).min(i64::MAX as u64)
        } else {
            0
        }
    }

    /// One row past the page so the caller can tell whether another page follows.
    pub fn limit(&self) -> u64 {
        u64::from(self.size) + 1
    }

    fn condition(&self) -> Condition {
        Condition::all()
            .add(planet::Column::DeletedAt.is_null())
            .add_option(self.name.as_deref().map(name_contains))
    }
}

/// `LIKE '%name%'` with `%`, `_` and `\` in `name` matched literally.
fn name_contains(name: &str) -> SimpleExpr {
    let mut pattern = String::with_capacity(name.len() + 2);
    pattern.push('%');
    for c in name.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');

    Expr::col((planet::Entity, planet::Column::Name)).like(LikeExpr::new(pattern).escape('\\'))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanetRecord {
    pub planet: planet::Model,
    /// Empty unless films were requested.
    pub films: Vec<film::Model>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlanetPage {
    pub data: Vec<PlanetRecord>,
    pub total: u64,
    pub next: bool,
}

#[async_trait]
pub trait FilmStore: Send + Sync {
    async fn create_films(&self, films: Vec<film::Model>) -> AppResult<u64>;
}

#[async_trait]
pub trait PlanetStore: Send + Sync {
    async fn create_planets(&self, planets: Vec<planet::Model>) -> AppResult<u64>;

    /// Links each planet id to the given film ids.
    async fn create_relationships(&self, relationships: &BTreeMap<i32, Vec<i32>>)
    -> AppResult<u64>;

    async fn find_planets_and_total(&self, query: &PlanetQuery) -> AppResult<PlanetPage>;

    async fn find_planet_by_id(&self, id: i32, load_films: bool) -> AppResult<PlanetRecord>;

    /// Soft-deletes every row with this id. Missing ids are not an error.
    async fn delete_planet(&self, id: i32) -> AppResult<u64>;
}

#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn ping(&self) -> AppResult<()>;
}

/// The sea-orm backed store.
#[derive(Clone)]
pub struct Catalog {
    db: DatabaseConnection,
}

impl Catalog {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl FilmStore for Catalog {
    async fn create_films(&self, films: Vec<film::Model>) -> AppResult<u64> {
        if films.is_empty() {
            return Ok(0);
        }

        let models = films.into_iter().map(|f| film::ActiveModel {
            id: Set(f.id),
            created_at: Set(f.created_at),
            updated_at: Set(f.updated_at),
            title: Set(f.title),
            episode: Set(f.episode),
            director: Set(f.director),
            release_date: Set(f.release_date),
        });

        let inserted = film::Entity::insert_many(models)
            .on_conflict(OnConflict::column(film::Column::Id).do_nothing().to_owned())
            .exec_without_returning(&self.db)
            .await
            .inspect_err(|err| {
                error!(trace = "catalog.create_films:insert_many", error = %err, "insert failed")
            })?;

        Ok(inserted)
    }
}

#[async_trait]
impl PlanetStore for Catalog {
    async fn create_planets(&self, planets: Vec<planet::Model>) -> AppResult<u64> {
        if planets.is_empty() {
            return Ok(0);
        }

        let models = planets.into_iter().map(|p| planet::ActiveModel {
            id: Set(p.id),
            created_at: Set(p.created_at),
            updated_at: Set(p.updated_at),
            deleted_at: Set(p.deleted_at),
            name: Set(p.name),
            climates: Set(p.climates),
            terrains: Set(p.terrains),
        });

        let inserted = planet::Entity::insert_many(models)
            .on_conflict(OnConflict::column(planet::Column::Id).do_nothing().to_owned())
            .exec_without_returning(&self.db)
            .await
            .inspect_err(|err| {
                error!(trace = "catalog.create_planets:insert_many", error = %err, "insert failed")
            })?;

        Ok(inserted)
    }

    async fn create_relationships(
        &self,
        relationships: &BTreeMap<i32, Vec<i32>>,
    ) -> AppResult<u64> {
        let models: Vec<planet_film::ActiveModel> = relationships
            .iter()
            .flat_map(|(planet_id, film_ids)| {
                film_ids.iter().map(|film_id| planet_film::ActiveModel {
                    planet_id: Set(*planet_id),
                    film_id: Set(*film_id),
                })
            })
            .collect();

        if models.is_empty() {
            return Ok(0);
        }

        let inserted = planet_film::Entity::insert_many(models)
            .on_conflict(
                OnConflict::columns([planet_film::Column::PlanetId, planet_film::Column::FilmId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .inspect_err(|err| {
                error!(
                    trace = "catalog.create_relationships:insert_many",
                    error = %err,
                    "insert failed"
                )
            })?;

        Ok(inserted)
    }

    async fn find_planets_and_total(&self, query: &PlanetQuery) -> AppResult<PlanetPage> {
        let txn = self.db.begin().await.inspect_err(|err| {
            error!(trace = "catalog.find_planets_and_total:begin", error = %err, "begin failed")
        })?;

        let result = async {
            let mut planets = planet::Entity::find()
                .filter(query.condition())
                .order_by_asc(planet::Column::Id)
                .limit(query.limit())
                .offset(query.offset())
                .all(&txn)
                .await
                .inspect_err(|err| {
                    error!(
                        trace = "catalog.find_planets_and_total:all",
                        error = %err,
                        "query failed"
                    )
                })?;

            let total = planet::Entity::find()
                .filter(query.condition())
                .count(&txn)
                .await
                .inspect_err(|err| {
                    error!(
                        trace = "catalog.find_planets_and_total:count",
                        error = %err,
                        "count failed"
                    )
                })?;

            let next = planets.len() > query.size as usize;
            planets.truncate(query.size as usize);

            let films = if query.load_films {
                planets
                    .load_many_to_many(film::Entity, planet_film::Entity, &txn)
                    .await
                    .inspect_err(|err| {
                        error!(
                            trace = "catalog.find_planets_and_total:load_films",
                            error = %err,
                            "eager load failed"
                        )
                    })?
            } else {
                vec![Vec::new(); planets.len()]
            };

            let data = planets
                .into_iter()
                .zip(films)
                .map(|(planet, films)| PlanetRecord { planet, films })
                .collect();

            Ok::<_, sea_orm::DbErr>(PlanetPage { data, total, next })
        }
        .await;

        match result {
            Ok(page) => {
                txn.commit().await.inspect_err(|err| {
                    error!(
                        trace = "catalog.find_planets_and_total:commit",
                        error = %err,
                        "commit failed"
                    )
                })?;
                Ok(page)
            },
            Err(err) => {
                if let Err(rollback) = txn.rollback().await {
                    error!(
                        trace = "catalog.find_planets_and_total:rollback",
                        error = %rollback,
                        "rollback failed"
                    );
                }
                Err(err.into())
            },
        }
    }

    async fn find_planet_by_id(&self, id: i32, load_films: bool) -> AppResult<PlanetRecord> {
        let planet = planet::Entity::find_by_id(id)
            .filter(planet::Column::DeletedAt.is_null())
            .one(&self.db)
            .await
            .inspect_err(|err| {
                error!(
                    trace = "catalog.find_planet_by_id:one",
                    planet_id = id,
                    error = %err,
                    "query failed"
                )
            })?
            .ok_or_else(|| AppError::planet_not_found(id))?;

        let films = if load_films {
            planet
                .find_related(film::Entity)
                .order_by_asc(film::Column::Id)
                .all(&self.db)
                .await
                .inspect_err(|err| {
                    error!(
                        trace = "catalog.find_planet_by_id:films",
                        planet_id = id,
                        error = %err,
                        "eager load failed"
                    )
                })?
        } else {
            Vec::new()
        };

        Ok(PlanetRecord { planet, films })
    }

    async fn delete_planet(&self, id: i32) -> AppResult<u64> {
        let now = jiff::Timestamp::now().as_second();

        let res = planet::Entity::update_many()
            .col_expr(planet::Column::DeletedAt, Expr::value(now))
            .filter(planet::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .inspect_err(|err| {
                error!(
                    trace = "catalog.delete_planet:update_many",
                    planet_id = id,
                    error = %err,
                    "update failed"
                )
            })?;

        debug!(planet_id = id, rows = res.rows_affected, "planet soft-deleted");
        Ok(res.rows_affected)
    }
}

#[async_trait]
impl HealthCheck for Catalog {
    async fn ping(&self) -> AppResult<()> {
        self.db.ping().await.inspect_err(|err| {
            error!(trace = "catalog.ping", error = %err, "database ping failed")
        })?;
        Ok(())
    }
}
