use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::used_words::Entity")]
    UsedWords,
}

impl Related<super::used_words::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UsedWords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
