use sea_orm_migration::prelude::*;

use crate::m20240601_000001_create_catalog::{Planets, PlanetsFilms};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_index(
                Index::create()
                    .name("idx_planets_deleted_at")
                    .table(Planets::Table)
                    .col(Planets::DeletedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_planets_name")
                    .table(Planets::Table)
                    .col(Planets::Name)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_planets_films_film_id")
                    .table(PlanetsFilms::Table)
                    .col(PlanetsFilms::FilmId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_planets_films_film_id").to_owned())
            .await?;
        manager.drop_index(Index::drop().name("idx_planets_name").to_owned()).await?;
        manager.drop_index(Index::drop().name("idx_planets_deleted_at").to_owned()).await?;
        Ok(())
    }
}
