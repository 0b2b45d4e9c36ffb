//! SeaORM entity models
//!
//! Tables read by the public news service. Rows are written by the admin
//! service; nothing here inserts or updates.

mod article;
mod article_author;
mod article_link;
mod article_media;
mod article_platform;
mod article_tag;
mod reporter;
mod tag;

pub use article::{
    Entity as ArticleEntity,
    Model as Article,
    Column as ArticleColumn,
};

pub use article_media::{
    Entity as ArticleMediaEntity,
    Model as ArticleMedia,
    Column as ArticleMediaColumn,
    MediaType,
};

pub use article_link::{
    Entity as ArticleLinkEntity,
    Model as ArticleLink,
    Column as ArticleLinkColumn,
};

pub use article_platform::{
    Entity as ArticlePlatformEntity,
    Model as ArticlePlatform,
    Column as ArticlePlatformColumn,
    Platform,
};

pub use article_tag::{
    Entity as ArticleTagEntity,
    Column as ArticleTagColumn,
};

pub use article_author::{
    Entity as ArticleAuthorEntity,
    Column as ArticleAuthorColumn,
};

pub use tag::{
    Entity as TagEntity,
    Model as Tag,
    Column as TagColumn,
};

pub use reporter::{
    Entity as ReporterEntity,
    Model as Reporter,
    Column as ReporterColumn,
};
