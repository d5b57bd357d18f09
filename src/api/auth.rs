//! Authentication endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::member::{LoginRequest, Member, RegisterRequest},
};

use super::AuthenticatedMember;

/// Login response
#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    /// Bearer token for subsequent requests
    pub token: String,
    pub token_type: String,
    pub member: Member,
}

/// Current member with lending status
#[derive(Serialize, ToSchema)]
pub struct MeResponse {
    pub member: Member,
    /// Books currently held
    pub active_borrows: i64,
    /// Maximum number of books that may be held at once
    pub max_borrow: u32,
    /// Whether the lending policy lets this member borrow at all
    pub can_borrow: bool,
}

/// Register a new member account
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Member registered", body = Member),
        (status = 400, description = "Invalid email or password"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    State(state): State<crate::AppState>,
    Json(request): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<Member>)> {
    let member = state.services.members.register(request).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<crate::AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let (token, member) = state.services.members.authenticate(&request).await?;

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        member,
    }))
}

/// Get the authenticated member
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current member", body = MeResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(
    State(state): State<crate::AppState>,
    AuthenticatedMember(claims): AuthenticatedMember,
) -> AppResult<Json<MeResponse>> {
    let member = state.services.members.get_member(claims.member_id).await?;
    let active_borrows = state.services.lending.active_borrow_count(member.id).await?;
    let policy = state.services.lending.policy();

    Ok(Json(MeResponse {
        can_borrow: policy.role_may_borrow(member.role),
        max_borrow: policy.max_borrow,
        active_borrows,
        member,
    }))
}
