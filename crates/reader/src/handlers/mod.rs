//! HTTP handlers module

pub mod health;
pub mod news;
pub mod pages;
