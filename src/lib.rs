pub mod api {
    pub mod articles;
    pub mod collection;
    pub mod errors;
    pub mod gallery;
    pub mod homepage;
    pub mod media;
    pub mod schemas;
    pub mod sessions;
}
pub mod app;
pub mod auth {
    pub mod accounts;
    pub mod middleware;
    pub mod models;
}
pub mod config;
pub mod db {
    pub mod homepage;
    pub mod memory;
    pub mod models;
    pub mod query;
    pub mod repository;
}
pub mod demo_seeder;
pub mod error;
pub mod models {
    pub mod publication;
    pub mod slug;
    pub mod timestamp;
}
pub mod policy {
    pub mod access;
    pub mod filter;
}
pub mod presentation {
    pub mod homepage;
    pub mod pages;
    pub mod source;
}
pub mod rendering {
    pub mod markdown;
    pub mod templates;
}
pub mod schema {
    pub mod registry;
}
pub mod storage {
    pub mod client;
}
