//! Registration and authentication service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::{AdminConfig, AuthConfig},
    error::{AppError, AppResult},
    models::member::{LoginRequest, Member, MemberClaims, MemberRecord, NewMember, RegisterRequest, Role},
    repository::Repository,
};

#[derive(Clone)]
pub struct MembersService {
    repository: Repository,
    config: AuthConfig,
}

impl MembersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Register a new member with the `user` role
    pub async fn register(&self, request: RegisterRequest) -> AppResult<Member> {
        self.create(request, Role::User).await
    }

    /// Create a member with an explicit role
    pub async fn create(&self, request: RegisterRequest, role: Role) -> AppResult<Member> {
        request.validate()?;

        let email = request.email.trim().to_lowercase();
        let password_hash = self.hash_password(&request.password)?;

        let member = self
            .repository
            .members
            .create_member(NewMember {
                email,
                role,
                password_hash,
            })
            .await?;

        tracing::info!(member_id = %member.id, role = %member.role, "Member registered");
        Ok(member)
    }

    /// Authenticate by email and password, returning a JWT and the member
    pub async fn authenticate(&self, request: &LoginRequest) -> AppResult<(String, Member)> {
        let record = self
            .repository
            .members
            .find_member_by_email(request.email.trim())
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

        if !self.verify_password(&record, &request.password)? {
            tracing::debug!(member_id = %record.id, "Password mismatch");
            return Err(AppError::Authentication("Invalid email or password".to_string()));
        }

        let member = Member::from(record);
        let token = MemberClaims::new(&member, self.config.jwt_expiration_hours)
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))?;

        Ok((token, member))
    }

    /// Get member by ID
    pub async fn get_member(&self, id: Uuid) -> AppResult<Member> {
        self.repository
            .members
            .read_member(id)
            .await?
            .ok_or_else(|| AppError::MemberNotFound(format!("Member with id {} not found", id)))
    }

    /// Change a member's role (admin only). Admins cannot demote themselves.
    pub async fn update_role(&self, claims: &MemberClaims, id: Uuid, role: Role) -> AppResult<Member> {
        claims.require_admin()?;
        if claims.member_id == id && role != Role::Admin {
            return Err(AppError::Validation(
                "Administrators cannot remove their own admin role".to_string(),
            ));
        }

        let member = self
            .repository
            .members
            .update_member_role(id, role)
            .await?
            .ok_or_else(|| AppError::MemberNotFound(format!("Member with id {} not found", id)))?;

        tracing::info!(member_id = %member.id, role = %member.role, by = %claims.member_id, "Member role changed");
        Ok(member)
    }

    /// Make sure the configured administrator exists and holds the admin role.
    ///
    /// A missing account is created from `admin.password`; an existing one is
    /// promoted and keeps its password. Returns `None` when no admin is configured.
    pub async fn bootstrap_admin(&self, admin: &AdminConfig) -> AppResult<Option<Member>> {
        let Some(email) = admin.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) else {
            return Ok(None);
        };

        if let Some(record) = self.repository.members.find_member_by_email(email).await? {
            if record.role == Role::Admin {
                tracing::debug!(member_id = %record.id, "Configured admin already present");
                return Ok(Some(record.into()));
            }
            let promoted = self
                .repository
                .members
                .update_member_role(record.id, Role::Admin)
                .await?
                .ok_or_else(|| AppError::MemberNotFound(format!("Member {} vanished", email)))?;
            tracing::info!(member_id = %promoted.id, "Configured admin promoted");
            return Ok(Some(promoted));
        }

        let password = admin.password.clone().ok_or_else(|| {
            AppError::BadRequest("admin.password is required to create the admin account".to_string())
        })?;
        let created = self
            .create(
                RegisterRequest {
                    email: email.to_string(),
                    password,
                },
                Role::Admin,
            )
            .await?;
        Ok(Some(created))
    }

    fn verify_password(&self, record: &MemberRecord, password: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(&record.password_hash)
            .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash a password using Argon2
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }
}
