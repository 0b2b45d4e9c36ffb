//! Article entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "article")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    /// Rich HTML body
    #[sea_orm(column_type = "Text")]
    pub content: String,

    #[sea_orm(column_type = "Text", unique)]
    pub slug: String,

    /// Meta keywords, not used for matching
    pub keywords: Option<Vec<String>>,

    /// Free text included in search
    #[sea_orm(column_type = "Text", nullable)]
    pub metadata: Option<String>,

    pub is_published: bool,

    pub published_at: Option<DateTimeWithTimeZone>,

    pub event_date_en: Option<Date>,

    /// Nepali calendar date, display only
    #[sea_orm(column_type = "Text", nullable)]
    pub event_date_np: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub og_image: Option<String>,

    pub reporter_id: Option<Uuid>,

    /// Ordering timestamp for the timeline and search
    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::article_media::Entity")]
    Media,

    #[sea_orm(has_many = "super::article_link::Entity")]
    Links,

    #[sea_orm(has_many = "super::article_platform::Entity")]
    Platforms,

    #[sea_orm(has_many = "super::article_tag::Entity")]
    ArticleTags,

    #[sea_orm(has_many = "super::article_author::Entity")]
    ArticleAuthors,
}

impl Related<super::article_media::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Media.def()
    }
}

impl Related<super::article_link::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Links.def()
    }
}

impl Related<super::article_platform::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Platforms.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
