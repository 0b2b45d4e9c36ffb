//! Platforms a claim circulated on (M:N join, enum valued)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Postgres `platform` enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "platform")]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    #[sea_orm(string_value = "x")]
    X,
    #[sea_orm(string_value = "instagram")]
    Instagram,
    #[sea_orm(string_value = "facebook")]
    Facebook,
    #[sea_orm(string_value = "tiktok")]
    Tiktok,
    #[sea_orm(string_value = "youtube")]
    Youtube,
    #[sea_orm(string_value = "web")]
    Web,
    #[sea_orm(string_value = "reddit")]
    Reddit,
    #[sea_orm(string_value = "whatsapp")]
    Whatsapp,
    #[sea_orm(string_value = "viber")]
    Viber,
    #[sea_orm(string_value = "telegram")]
    Telegram,
    #[sea_orm(string_value = "email")]
    Email,
    #[sea_orm(string_value = "tv")]
    Tv,
    #[sea_orm(string_value = "radio")]
    Radio,
    #[sea_orm(string_value = "print")]
    Print,
    #[sea_orm(string_value = "others")]
    Others,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "article_platform")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub article_id: Uuid,

    #[sea_orm(primary_key, auto_increment = false)]
    pub platform: Platform,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::article::Entity",
        from = "Column::ArticleId",
        to = "super::article::Column::Id",
        on_delete = "Cascade"
    )]
    Article,
}

impl Related<super::article::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Article.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
