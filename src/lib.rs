pub mod config;
pub mod db;
pub mod error;
pub mod http_client;
pub mod i18n;
pub mod mailer;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod services;
pub mod storage;
pub mod web;

pub use config::Config;
pub use error::{AppError, AppResult};
