use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::access::resolve_access;
use crate::auth::token::{Claims, TokenError, TokenSigner};
use crate::models::operator::{NewOperator, OperatorProfile};
use crate::repository::OperatorRepository;
use crate::utils::error::AppError;
use crate::utils::validation::FieldErrors;

const MAX_FIELD_CHARS: usize = 255;
const MAX_PHONE_CHARS: usize = 32;
const MIN_PASSWORD_CHARS: usize = 8;

/// Hashed once per authority and checked on unknown-username logins, so they
/// cost the same bcrypt work as a wrong password.
const DECOY_PASSWORD: &str = "no operator has this password";

const INVALID_CREDENTIALS: &str = "Invalid username or password";
const DEVICE_CONFLICT: &str = "You have logged in from another device. Please contact the administrator for further assistance.";

/// Signing material for session tokens, injected at construction.
#[derive(Clone)]
pub struct SessionConfig {
    pub secret: Vec<u8>,
    pub token_ttl: Duration,
    pub password_cost: u32,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .field("password_cost", &self.password_cost)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("validation failed")]
    Validation(FieldErrors),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("operator is bound to another device")]
    DeviceConflict,

    #[error("session token rejected: {0}")]
    Unauthorized(String),

    #[error("operator already exists")]
    AlreadyExists,

    #[error("token error: {0}")]
    Token(#[from] TokenError),

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("{context}")]
    Persistence {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl AuthError {
    fn persistence(context: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| AuthError::Persistence { context, source }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Validation(fields) => AppError::ValidationError(fields),
            AuthError::InvalidCredentials => AppError::AuthError(INVALID_CREDENTIALS.to_string()),
            AuthError::DeviceConflict => AppError::Forbidden(DEVICE_CONFLICT.to_string()),
            AuthError::Unauthorized(reason) => {
                tracing::debug!(%reason, "Session token rejected");
                AppError::AuthError("Unauthorized".to_string())
            }
            AuthError::AlreadyExists => AppError::Conflict("Operator already exists".to_string()),
            AuthError::Token(e) => {
                AppError::InternalServerError(format!("Could not create JWT token: {e}"))
            }
            AuthError::Hashing(e) => {
                AppError::InternalServerError(format!("Password hashing failed: {e}"))
            }
            AuthError::Persistence { context, source } => AppError::database(context, source),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub device_id: Option<String>,
}

impl LoginRequest {
    fn validate(&self) -> Result<&str, FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.bounded("username", &self.username, MAX_FIELD_CHARS);
        errors.bounded("password", &self.password, MAX_FIELD_CHARS);
        let device_id = self.device_id.as_deref().unwrap_or_default();
        errors.bounded("device_id", device_id, MAX_FIELD_CHARS);
        errors.into_result().map(|_| device_id)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: OperatorProfile,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirmation: String,
}

impl RegisterRequest {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.bounded("name", &self.name, MAX_FIELD_CHARS);
        errors.bounded("username", &self.username, MAX_FIELD_CHARS);
        errors.bounded("phone", &self.phone, MAX_PHONE_CHARS);
        errors.bounded("password", &self.password, MAX_FIELD_CHARS);

        if let Some(email) = self.email.as_deref().filter(|e| !e.is_empty()) {
            errors.max_chars("email", email, MAX_FIELD_CHARS);
            if !looks_like_email(email) {
                errors.add("email", "email must be a valid email address.");
            }
        }
        if !self.password.is_empty() && self.password.chars().count() < MIN_PASSWORD_CHARS {
            errors.add(
                "password",
                format!("password must be at least {MIN_PASSWORD_CHARS} characters."),
            );
        }
        if self.password != self.password_confirmation {
            errors.add(
                "password_confirmation",
                "password_confirmation does not match password.",
            );
        }
        errors.into_result()
    }
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !local.is_empty()
        && !host.is_empty()
        && tld.len() >= 2
        && tld.chars().all(|c| c.is_ascii_alphabetic())
        && !email.chars().any(char::is_whitespace)
}

/// Issues and checks operator sessions. One device per operator: a login
/// from a different device is refused until the binding is cleared.
#[derive(Clone)]
pub struct SessionAuthority {
    operators: Arc<dyn OperatorRepository>,
    signer: TokenSigner,
    password_cost: u32,
    decoy_hash: Arc<OnceCell<String>>,
}

impl SessionAuthority {
    pub fn new(operators: Arc<dyn OperatorRepository>, config: SessionConfig) -> Self {
        Self {
            operators,
            signer: TokenSigner::new(config.secret, config.token_ttl),
            password_cost: config.password_cost,
            decoy_hash: Arc::new(OnceCell::new()),
        }
    }

    pub async fn authenticate(&self, request: LoginRequest) -> Result<LoginResponse, AuthError> {
        let device_id = request.validate().map_err(AuthError::Validation)?.to_string();

        let Some(record) = self
            .operators
            .find_by_username(&request.username)
            .await
            .map_err(AuthError::persistence("Failed to load operator"))?
        else {
            let decoy = self
                .decoy_hash
                .get_or_try_init(|| hash_password(DECOY_PASSWORD.to_string(), self.password_cost))
                .await?;
            verify_password(request.password, decoy.clone()).await?;

            info!(username = %request.username, "Login for unknown operator");
            return Err(AuthError::InvalidCredentials);
        };

        if let Some(bound) = record.device_id.as_deref() {
            if bound != device_id {
                warn!(operator_id = record.id, "Login from a second device refused");
                return Err(AuthError::DeviceConflict);
            }
        }

        if !verify_password(request.password, record.password.clone()).await? {
            info!(operator_id = record.id, "Password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.signer.issue(record.id, &record.username, Utc::now())?;
        let access = resolve_access(self.operators.as_ref(), &record)
            .await
            .map_err(AuthError::persistence("Failed to load access grants"))?;

        self.operators
            .bind_device(record.id, &device_id, &token)
            .await
            .map_err(AuthError::persistence("Failed to update device information"))?;

        info!(operator_id = record.id, limited = access.is_limited(), "Operator logged in");

        let mut record = record;
        record.device_id = Some(device_id);
        Ok(LoginResponse {
            token,
            user: OperatorProfile::new(record, access),
        })
    }

    /// Accepts a token only if it is validly signed, unexpired and still the
    /// one persisted for its operator. A newer login revokes older tokens.
    pub async fn authorize(&self, token: &str) -> Result<Claims, AuthError> {
        let claims = self
            .signer
            .verify(token, Utc::now())
            .map_err(|e| AuthError::Unauthorized(e.to_string()))?;

        let record = self
            .operators
            .find_by_id(claims.id)
            .await
            .map_err(AuthError::persistence("Failed to load operator"))?
            .ok_or_else(|| AuthError::Unauthorized("operator no longer exists".to_string()))?;

        if record.device_access_token.as_deref() != Some(token) {
            return Err(AuthError::Unauthorized(
                "token superseded by a newer login".to_string(),
            ));
        }
        Ok(claims)
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<i64, AuthError> {
        request.validate().map_err(AuthError::Validation)?;
        let email = request.email.filter(|e| !e.is_empty());

        let taken = self
            .operators
            .identity_taken(&request.username, email.as_deref(), &request.phone)
            .await
            .map_err(AuthError::persistence("Failed to check operator"))?;
        if taken {
            return Err(AuthError::AlreadyExists);
        }

        let password_hash = hash_password(request.password, self.password_cost).await?;
        let operator = NewOperator {
            name: request.name,
            username: request.username,
            email,
            phone: request.phone,
            password_hash,
        };

        let id = self.operators.insert(&operator).await.map_err(|e| {
            let unique = e
                .as_database_error()
                .map(|db| db.is_unique_violation())
                .unwrap_or(false);
            if unique {
                AuthError::AlreadyExists
            } else {
                AuthError::Persistence {
                    context: "Failed to create operator",
                    source: e,
                }
            }
        })?;

        info!(operator_id = id, "Operator registered");
        Ok(id)
    }
}

/// bcrypt is deliberately slow, so it runs off the async workers. A corrupt
/// stored hash counts as a mismatch.
async fn verify_password(password: String, hash: String) -> Result<bool, AuthError> {
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?;

    match verified {
        Ok(matches) => Ok(matches),
        Err(e) => {
            warn!(error = %e, "Stored password hash is unreadable");
            Ok(false)
        }
    }
}

async fn hash_password(password: String, cost: u32) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
        .map_err(|e| AuthError::Hashing(e.to_string()))
}
