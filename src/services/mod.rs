//! Business logic services

pub mod catalog;
pub mod events;
pub mod lending;
pub mod members;

use crate::{config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub lending: lending::LendingService,
    pub members: members::MembersService,
    pub events: events::CatalogEvents,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        let events = events::CatalogEvents::new(config.events.capacity);

        Self {
            catalog: catalog::CatalogService::new(repository.clone(), events.clone()),
            lending: lending::LendingService::new(
                repository.clone(),
                config.lending.clone(),
                events.clone(),
            ),
            members: members::MembersService::new(repository, config.auth.clone()),
            events,
        }
    }
}
