use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Films::Table)
                    .if_not_exists()
                    .col(integer(Films::Id).primary_key())
                    .col(big_integer(Films::CreatedAt))
                    .col(big_integer(Films::UpdatedAt))
                    .col(string(Films::Title))
                    .col(integer(Films::Episode))
                    .col(string(Films::Director))
                    .col(string(Films::ReleaseDate))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Planets::Table)
                    .if_not_exists()
                    .col(integer(Planets::Id).primary_key())
                    .col(big_integer(Planets::CreatedAt))
                    .col(big_integer(Planets::UpdatedAt))
                    .col(big_integer_null(Planets::DeletedAt))
                    .col(string(Planets::Name))
                    .col(text(Planets::Climates))
                    .col(text(Planets::Terrains))
                    .to_owned(),
            )
            .await?;

        // (planet_id, film_id) is the primary key so repeated imports stay idempotent
        manager
            .create_table(
                Table::create()
                    .table(PlanetsFilms::Table)
                    .if_not_exists()
                    .col(integer(PlanetsFilms::PlanetId))
                    .col(integer(PlanetsFilms::FilmId))
                    .primary_key(
                        Index::create().col(PlanetsFilms::PlanetId).col(PlanetsFilms::FilmId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_planets_films_planet")
                            .from(PlanetsFilms::Table, PlanetsFilms::PlanetId)
                            .to(Planets::Table, Planets::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_planets_films_film")
                            .from(PlanetsFilms::Table, PlanetsFilms::FilmId)
                            .to(Films::Table, Films::Id),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(PlanetsFilms::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Planets::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Films::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
pub(crate) enum Films {
    Table,
    Id,
    CreatedAt,
    UpdatedAt,
    Title,
    Episode,
    Director,
    ReleaseDate,
}

#[derive(DeriveIden)]
pub(crate) enum Planets {
    Table,
    Id,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
    Name,
    Climates,
    Terrains,
}

#[derive(DeriveIden)]
pub(crate) enum PlanetsFilms {
    Table,
    PlanetId,
    FilmId,
}
