//! Public news read path

pub mod assembler;
pub mod model;
pub mod service;

pub use assembler::{RelationAssembler, Relations};
pub use model::{Author, LinkItem, MediaItem, NewsDetail, NewsSummary};
pub use service::{page_window, NewsService, NEWS_DETAIL, NEWS_LIST, NEWS_SEARCH};
