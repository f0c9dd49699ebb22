use crate::{
    auth::{self, AuthService, Role},
    entities::{user, User},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument};

/// Account service: registration, credential verification, and account reads.
///
/// Emails are stored lowercased, making uniqueness case-insensitive. The
/// password credential is hashed with argon2 at registration and is never
/// returned by any read path.
#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
    auth: Arc<AuthService>,
    event_sender: Arc<EventSender>,
}

impl UserService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        auth: Arc<AuthService>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            db,
            auth,
            event_sender,
        }
    }

    /// Registers a new account.
    ///
    /// Rejects an email already in use (case-insensitively), a role outside
    /// the closed role set, and a password shorter than 8 characters or
    /// without a digit.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterInput) -> Result<UserResponse, ServiceError> {
        let role = Role::from_str(&input.role)
            .map_err(|_| ServiceError::ValidationError("Invalid role value.".to_string()))?;

        validate_password(&input.password)?;

        let email = input.email.to_lowercase();

        let existing = User::find()
            .filter(user::Column::Email.eq(email.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::ValidationError(
                "Email already in use".to_string(),
            ));
        }

        let password_hash = auth::hash_password(&input.password)?;

        let user = user::ActiveModel {
            name: Set(input.name),
            email: Set(email),
            password_hash: Set(password_hash),
            role: Set(role),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        let user = user.insert(&*self.db).await?;

        self.event_sender.send_or_log(Event::UserRegistered(user.id)).await;

        info!("Registered user {} ({})", user.id, user.email);
        Ok(UserResponse::from(user))
    }

    /// Verifies a credential pair and issues a bearer token.
    ///
    /// An unknown email and a wrong password are indistinguishable to the
    /// caller.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<String, ServiceError> {
        let user = User::find()
            .filter(user::Column::Email.eq(email.to_lowercase()))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::Unauthorized("Invalid credentials".to_string()))?;

        if !auth::verify_password(password, &user.password_hash)? {
            return Err(ServiceError::Unauthorized("Invalid credentials".to_string()));
        }

        let token = self.auth.issue_token(&user)?;
        Ok(token)
    }

    /// All accounts. Administrator view.
    pub async fn list_users(&self) -> Result<Vec<UserResponse>, ServiceError> {
        let users = User::find().all(&*self.db).await?;
        Ok(users.into_iter().map(UserResponse::from).collect())
    }

    /// One account by id.
    pub async fn get_user(&self, id: i32) -> Result<UserResponse, ServiceError> {
        User::find_by_id(id)
            .one(&*self.db)
            .await?
            .map(UserResponse::from)
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }
}

fn validate_password(password: &str) -> Result<(), ServiceError> {
    if password.len() < 8 || !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ServiceError::ValidationError(
            "Password must be at least 8 characters long and contain a number.".to_string(),
        ));
    }
    Ok(())
}

/// Input for registering an account
#[derive(Debug, Deserialize)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

/// Account projection safe for responses; never carries the credential.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            role: model.role,
        }
    }
}
