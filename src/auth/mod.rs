//! Authentication and authorization.
//!
//! JWT bearer tokens carry the caller's user id, optional store binding and
//! role. The [`AuthUser`] extractor verifies the token and is the single
//! place a request's [`TenantScope`] is derived from, so handlers cannot
//! build a scope from request parameters.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, SaltString};
use argon2::{Argon2, PasswordVerifier};
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::entity::prelude::*;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::user;
use crate::errors::ServiceError;
use crate::tenant::TenantScope;
use crate::AppState;

/// Role-based permission set. Kept deliberately coarse: the original system
/// gates whole route families per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    StoresManage,
    StoresRead,
    DistributionsCreate,
    DistributionsResolve,
    DistributionsRead,
    ReturnsCreate,
    ReturnsRead,
    ReturnsResolve,
    ReceivablesRead,
    ReceivablesPost,
    NotificationsRead,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum Role {
    #[sea_orm(string_value = "ADMIN")]
    Admin,
    #[sea_orm(string_value = "MANAGER")]
    Manager,
    #[sea_orm(string_value = "CASHIER")]
    Cashier,
    #[sea_orm(string_value = "ATTENDANT")]
    Attendant,
    #[sea_orm(string_value = "WAREHOUSE")]
    Warehouse,
}

impl Role {
    pub fn can(self, permission: Permission) -> bool {
        use Permission::*;
        match self {
            Role::Admin => true,
            Role::Manager => !matches!(permission, DistributionsCreate),
            Role::Cashier => matches!(
                permission,
                DistributionsRead | ReceivablesRead | ReceivablesPost | NotificationsRead
            ),
            Role::Attendant => matches!(
                permission,
                DistributionsRead
                    | DistributionsResolve
                    | ReturnsCreate
                    | ReturnsRead
                    | NotificationsRead
            ),
            Role::Warehouse => matches!(
                permission,
                DistributionsCreate | DistributionsRead | NotificationsRead
            ),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub store_id: Option<Uuid>,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

pub struct AuthService {
    db: Arc<DbPool>,
    jwt_secret: String,
    jwt_expiration_secs: u64,
}

impl AuthService {
    pub fn new(db: Arc<DbPool>, jwt_secret: String, jwt_expiration_secs: u64) -> Self {
        Self {
            db,
            jwt_secret,
            jwt_expiration_secs,
        }
    }

    /// Verifies credentials and issues a signed token. Credential failures
    /// are indistinguishable to the caller (same message for unknown user,
    /// bad password, and disabled account).
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<String, ServiceError> {
        let user = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&*self.db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::AuthError("Invalid credentials".into()))?;

        if !user.is_active {
            warn!(username, "login attempt on disabled account");
            return Err(ServiceError::AuthError("Invalid credentials".into()));
        }

        verify_password(password, &user.password_hash)?;

        info!(username, "login succeeded");
        self.issue_token(&user)
    }

    pub fn issue_token(&self, user: &user::Model) -> Result<String, ServiceError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.id,
            store_id: user.store_id,
            role: user.role,
            iat: now,
            exp: now + self.jwt_expiration_secs as i64,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::InternalError(format!("Failed to sign token: {}", e)))
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, ServiceError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| ServiceError::AuthError("Invalid or expired token".into()))
    }
}

pub fn hash_password(password: &str) -> Result<String, ServiceError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ServiceError::InternalError(format!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> Result<(), ServiceError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| ServiceError::InternalError(format!("Corrupt password hash: {}", e)))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| ServiceError::AuthError("Invalid credentials".into()))
}

/// Authenticated caller, extracted from the bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub store_id: Option<Uuid>,
    pub role: Role,
}

impl AuthUser {
    /// Tenant scope for this caller: bound to their store, or the privileged
    /// unbound scope for global accounts (admin, warehouse staff).
    pub fn scope(&self) -> TenantScope {
        match self.store_id {
            Some(store_id) => TenantScope::for_store(store_id),
            None => TenantScope::unbound(),
        }
    }

    pub fn require(&self, permission: Permission) -> Result<(), ServiceError> {
        if self.role.can(permission) {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(format!(
                "Role {:?} may not perform this operation",
                self.role
            )))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| ServiceError::AuthError("Missing bearer token".into()))?;

        let claims = state.auth.verify_token(token)?;

        Ok(AuthUser {
            user_id: claims.sub,
            store_id: claims.store_id,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_roundtrip() {
        let hash = hash_password("kain-batik-123").unwrap();
        assert!(verify_password("kain-batik-123", &hash).is_ok());
        assert!(verify_password("wrong", &hash).is_err());
    }

    #[test]
    fn role_permissions_gate_distribution_creation() {
        assert!(Role::Warehouse.can(Permission::DistributionsCreate));
        assert!(!Role::Attendant.can(Permission::DistributionsCreate));
        assert!(Role::Attendant.can(Permission::DistributionsResolve));
        assert!(!Role::Cashier.can(Permission::StoresManage));
        assert!(Role::Admin.can(Permission::StoresManage));
    }

    #[test]
    fn returns_are_not_visible_to_warehouse_staff() {
        assert!(Role::Attendant.can(Permission::ReturnsRead));
        assert!(Role::Manager.can(Permission::ReturnsRead));
        assert!(!Role::Warehouse.can(Permission::ReturnsRead));
        assert!(!Role::Cashier.can(Permission::ReturnsRead));
    }

    #[test]
    fn store_bound_user_gets_bound_scope() {
        let store = Uuid::new_v4();
        let user = AuthUser {
            user_id: Uuid::new_v4(),
            store_id: Some(store),
            role: Role::Attendant,
        };
        assert_eq!(user.scope().store_id(), Some(store));

        let admin = AuthUser {
            user_id: Uuid::new_v4(),
            store_id: None,
            role: Role::Admin,
        };
        assert!(!admin.scope().is_bound());
    }
}
