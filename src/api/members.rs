//! Member administration endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::member::{Member, UpdateRole},
};

use super::AuthenticatedMember;

/// Change a member's role (admin only)
#[utoipa::path(
    put,
    path = "/members/{id}/role",
    tag = "members",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Member ID")
    ),
    request_body = UpdateRole,
    responses(
        (status = 200, description = "Role updated", body = Member),
        (status = 400, description = "Admins cannot demote themselves", body = crate::error::ErrorResponse),
        (status = 403, description = "Administrator privileges required", body = crate::error::ErrorResponse),
        (status = 404, description = "Member not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_member_role(
    State(state): State<crate::AppState>,
    AuthenticatedMember(claims): AuthenticatedMember,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateRole>,
) -> AppResult<Json<Member>> {
    let updated = state
        .services
        .members
        .update_role(&claims, id, request.role)
        .await?;
    Ok(Json(updated))
}
