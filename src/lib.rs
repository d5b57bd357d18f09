//! Bookclub lending server
//!
//! A REST JSON API for a small book-lending club: members browse the
//! catalog, borrow and return books, and administrators maintain the
//! catalog. Lending decisions live in [`policy`]; persistence sits behind
//! the store traits in [`repository`].

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod policy;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
    pub repository: repository::Repository,
}

impl AppState {
    /// Build services over `repository` and bundle them with the config
    pub fn new(config: AppConfig, repository: repository::Repository) -> Self {
        let services = services::Services::new(repository.clone(), &config);
        Self {
            config: Arc::new(config),
            services: Arc::new(services),
            repository,
        }
    }
}
