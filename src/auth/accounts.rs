use std::convert::Infallible;

use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use axum::extract::{FromRef, FromRequestParts, State};
use axum::http::request::Parts;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, Key, SameSite};
use axum_extra::extract::SignedCookieJar;
use password_hash::{PasswordHash, SaltString};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::auth::middleware::build_actor;
use crate::auth::models::Actor;
use crate::config::{AccountConfig, AuthConfig};
use crate::error::AppError;

/// Name of the signed session cookie.
pub const SESSION_COOKIE: &str = "christos_session";

/// Built-in accounts available in demo mode when none are configured,
/// as `(id, argon2 hash, role)`. The passwords equal the ids.
const DEMO_ACCOUNTS: &[(&str, &str, &str)] = &[
    (
        "admin",
        "$argon2id$v=19$m=19456,t=2,p=1$EXxbp+dRkveyMjoUzJ3x2Q$0VuqrEFVXtnSNvBnfnb3sEeDcerlrDSrOdG7ZV4VBQc",
        "admin",
    ),
    (
        "editor",
        "$argon2id$v=19$m=19456,t=2,p=1$Xm6FY87ySpCqK1l+liTBLA$30EipYvM3H2SxWNFVSJ/OfzOpBQJsVc9GYHNxEU+9Vs",
        "editor",
    ),
];

/// Argon2id PHC string for a password, with a random salt.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes)
        .map_err(|e| AppError::Internal(format!("Failed to generate salt: {}", e)))?;
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AppError::Internal(format!("Failed to encode salt: {}", e)))?;
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?
        .to_string();
    Ok(phc)
}

/// Check a password against a PHC string. Unparseable hashes never match.
pub fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash.trim()) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring malformed password hash");
            false
        }
    }
}

/// The accounts allowed to sign in.
#[derive(Debug, Clone, Default)]
pub struct AccountDirectory {
    accounts: Vec<AccountConfig>,
}

impl AccountDirectory {
    pub fn new(accounts: Vec<AccountConfig>) -> Self {
        Self { accounts }
    }

    /// Configured accounts, or the demo accounts when demo mode is on and
    /// nothing is configured.
    pub fn from_config(auth: &AuthConfig, demo_mode: bool) -> Self {
        if auth.accounts.is_empty() && demo_mode {
            tracing::warn!(
                "No accounts configured, enabling demo accounts admin/admin and editor/editor"
            );
            return Self::demo();
        }
        Self::new(auth.accounts.clone())
    }

    pub fn demo() -> Self {
        Self::new(
            DEMO_ACCOUNTS
                .iter()
                .map(|(id, hash, role)| AccountConfig {
                    id: id.to_string(),
                    email: format!("{id}@demo.christos.local"),
                    password_hash: hash.to_string(),
                    roles: vec![role.to_string()],
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Check credentials. `login` matches either the account id or its email.
    pub fn authenticate(&self, login: &str, password: &str) -> Result<Actor, AppError> {
        let login = login.trim();

        self.accounts
            .iter()
            .find(|a| a.id == login || a.email.eq_ignore_ascii_case(login))
            .filter(|a| verify_password(&a.password_hash, password))
            .map(|a| build_actor(a.id.clone(), a.email.clone(), &a.roles))
            .ok_or_else(|| AppError::Auth("The email or password provided is incorrect.".into()))
    }
}

/// The caller of a request: `Some` when a valid session cookie is present.
///
/// Missing, malformed and tampered cookies all resolve to an anonymous caller.
#[derive(Debug, Clone)]
pub struct CurrentActor(pub Option<Actor>);

impl CurrentActor {
    pub fn actor(&self) -> Option<&Actor> {
        self.0.as_ref()
    }
}

impl<S> FromRequestParts<S> for CurrentActor
where
    Key: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = SignedCookieJar::from_headers(&parts.headers, Key::from_ref(state));
        let actor = jar
            .get(SESSION_COOKIE)
            .and_then(|cookie| serde_json::from_str::<Actor>(cookie.value()).ok());
        Ok(CurrentActor(actor))
    }
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Account email or id.
    pub email: String,
    pub password: String,
}

/// Login response body.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub user: Actor,
}

/// `POST /api/users/login`: check credentials and set the session cookie.
pub async fn login_handler(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(SignedCookieJar, Json<LoginResponse>), AppError> {
    let user = state.accounts.authenticate(&req.email, &req.password)?;

    let user_json = serde_json::to_string(&user)
        .map_err(|e| AppError::Internal(format!("Failed to serialize user: {}", e)))?;

    let cookie = Cookie::build((SESSION_COOKIE, user_json))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(7))
        .build();

    tracing::info!(user_id = %user.id, "User logged in");

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            message: "Authentication Passed".to_string(),
            user,
        }),
    ))
}

/// `GET /api/users/me`: the signed-in actor, or 401.
pub async fn me_handler(actor: CurrentActor) -> Result<Json<Actor>, AppError> {
    actor
        .0
        .map(Json)
        .ok_or_else(|| AppError::Auth("Not logged in".into()))
}

/// `POST /api/users/logout`: clear the session cookie.
pub async fn logout_handler(jar: SignedCookieJar) -> (SignedCookieJar, Json<serde_json::Value>) {
    let cookie = Cookie::build((SESSION_COOKIE, "")).path("/").build();
    (
        jar.remove(cookie),
        Json(serde_json::json!({ "message": "You have been logged out successfully." })),
    )
}
