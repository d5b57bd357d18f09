//! Members repository for database operations

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::MemberStore;
use crate::{
    error::{AppError, AppResult},
    models::member::{Member, MemberRecord, NewMember, Role},
};

#[derive(Clone)]
pub struct PgMemberStore {
    pool: Pool<Postgres>,
}

impl PgMemberStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MemberStore for PgMemberStore {
    async fn read_member(&self, id: Uuid) -> AppResult<Option<Member>> {
        let member = sqlx::query_as::<_, Member>(
            "SELECT id, email, role, created_at FROM members WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(member)
    }

    async fn find_member_by_email(&self, email: &str) -> AppResult<Option<MemberRecord>> {
        let record = sqlx::query_as::<_, MemberRecord>(
            r#"
            SELECT id, email, role, password_hash, created_at
            FROM members
            WHERE lower(email) = lower($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn update_member_role(&self, id: Uuid, role: Role) -> AppResult<Option<Member>> {
        let member = sqlx::query_as::<_, Member>(
            r#"
            UPDATE members SET role = $2
            WHERE id = $1
            RETURNING id, email, role, created_at
            "#,
        )
        .bind(id)
        .bind(role)
        .fetch_optional(&self.pool)
        .await?;
        Ok(member)
    }

    async fn create_member(&self, member: NewMember) -> AppResult<Member> {
        let created = sqlx::query_as::<_, Member>(
            r#"
            INSERT INTO members (id, email, role, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, role, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&member.email)
        .bind(member.role)
        .bind(&member.password_hash)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::Conflict("Email already registered".to_string())
            }
            other => AppError::Database(other),
        })?;

        Ok(created)
    }
}
