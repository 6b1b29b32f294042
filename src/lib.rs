pub mod account;
pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod images;
pub mod mail;
pub mod posts;
pub mod state;
pub mod storage;
pub mod store;
pub mod validation;
