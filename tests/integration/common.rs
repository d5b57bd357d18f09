//! Shared fixtures

use bookclub_server::{
    config::{AppConfig, StorageBackend},
    models::{
        book::{Book, CreateBook},
        member::{LoginRequest, Member, MemberClaims, RegisterRequest, Role},
    },
    policy::LendingPolicy,
    repository::Repository,
    AppState,
};

pub const PASSWORD: &str = "secret-password";

pub fn config_with(lending: LendingPolicy) -> AppConfig {
    let mut config = AppConfig::default();
    config.database.backend = StorageBackend::Memory;
    config.lending = lending;
    config
}

pub fn state_with(lending: LendingPolicy) -> AppState {
    AppState::new(config_with(lending), Repository::in_memory())
}

pub fn state() -> AppState {
    state_with(LendingPolicy::default())
}

pub async fn member(state: &AppState, email: &str, role: Role) -> Member {
    state
        .services
        .members
        .create(
            RegisterRequest {
                email: email.to_string(),
                password: PASSWORD.to_string(),
            },
            role,
        )
        .await
        .expect("create member")
}

pub async fn token(state: &AppState, email: &str) -> String {
    let (token, _) = state
        .services
        .members
        .authenticate(&LoginRequest {
            email: email.to_string(),
            password: PASSWORD.to_string(),
        })
        .await
        .expect("authenticate");
    token
}

pub async fn book(state: &AppState, admin: &Member, title: &str) -> Book {
    let claims = MemberClaims::new(admin, 1);
    state
        .services
        .catalog
        .add_book(
            &claims,
            CreateBook {
                title: title.to_string(),
                author: "Ursula K. Le Guin".to_string(),
                description: "A novel".to_string(),
            },
        )
        .await
        .expect("add book")
}
