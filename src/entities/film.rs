use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "films")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    pub created_at: i64,
    pub updated_at: i64,
    pub title: String,
    pub episode: i32,
    pub director: String,
    /// `YYYY-MM-DD`
    pub release_date: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::planet_film::Entity")]
    PlanetFilm,
}

impl Related<super::planet_film::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PlanetFilm.def()
    }
}

impl Related<super::planet::Entity> for Entity {
    fn to() -> RelationDef {
        super::planet_film::Relation::Planet.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::planet_film::Relation::Film.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
