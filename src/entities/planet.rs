use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "planets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    pub created_at: i64,
    pub updated_at: i64,
    /// Soft-delete tombstone, `None` while the planet is active.
    pub deleted_at: Option<i64>,
    pub name: String,
    /// JSON array of strings.
    pub climates: String,
    /// JSON array of strings.
    pub terrains: String,
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

impl Related<super::film::Entity> for Entity {
    fn to() -> RelationDef {
        super::planet_film::Relation::Film.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::planet_film::Relation::Planet.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
