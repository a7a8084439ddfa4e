use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequestParts, State},
    http::{request::Parts, HeaderMap, StatusCode},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;
use tracing::{info, warn};

use super::error::ApiError;
use super::metrics;
use super::validation::validate_signup;
use crate::auth::{generate_session_id, generate_token, hash_password, verify_credentials};
use crate::config::AuthConfig;
use crate::db::{AuthResponse, LoginRequest, NewUser, Role, Session, SignupRequest, Store, User};
use crate::AppState;

/// Name of the cookie carrying the login session id
pub const SESSION_COOKIE: &str = "sessionid";

/// Authorization schemes accepted in front of the token
const TOKEN_SCHEMES: [&str; 2] = ["Token", "Bearer"];

/// Signup endpoint
///
/// POST /api/auth/signup
pub async fn signup(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, CookieJar, Json<AuthResponse>), ApiError> {
    let Json(request) = payload?;
    let role = validate_signup(&request)?;

    let password = request.password.unwrap_or_default();
    let password_hash = hash_password(&password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;

    let user = state
        .store
        .create_user(NewUser {
            username: request.username.unwrap_or_default(),
            email: request.email.unwrap_or_default(),
            password_hash,
            role,
        })
        .await?;

    info!(user_id = user.id, username = %user.username, role = %role, "User signed up");

    let (jar, response) = open_session(&state, jar, &user).await?;
    Ok((StatusCode::CREATED, jar, Json(response)))
}

/// Login endpoint
///
/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<AuthResponse>), ApiError> {
    let Json(request) = payload?;

    let user = state.store.find_user_by_username(&request.username).await?;

    // Unknown usernames are checked against a dummy hash, so both failure
    // paths look the same to the caller.
    let verified = verify_credentials(user.as_ref(), &request.password);

    let user = match user {
        Some(user) if verified => user,
        _ => {
            metrics::record_login(false);
            warn!("Failed login attempt");
            return Err(ApiError::invalid_credentials());
        }
    };

    metrics::record_login(true);
    info!(user_id = user.id, "User logged in");

    let (jar, response) = open_session(&state, jar, &user).await?;
    Ok((jar, Json(response)))
}

/// Logout endpoint. Always succeeds, with or without a session.
///
/// POST /api/auth/logout
pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, StatusCode) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        match state.store.delete_session(cookie.value()).await {
            Ok(true) => info!("Session closed"),
            Ok(false) => {}
            Err(e) => warn!(error = %e, "Failed to delete session"),
        }
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, StatusCode::OK)
}

/// Issue (or reuse) the user's token and start a cookie session
async fn open_session(
    state: &AppState,
    jar: CookieJar,
    user: &User,
) -> Result<(CookieJar, AuthResponse), ApiError> {
    let token = state
        .store
        .get_or_create_token(user.id, &generate_token())
        .await?;

    let now = chrono::Utc::now();
    let expires_at = now + chrono::Duration::hours(state.config.auth.session_ttl_hours);

    let session = state
        .store
        .create_session(Session {
            id: generate_session_id(),
            user_id: user.id,
            expires_at: expires_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            created_at: now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        })
        .await?;

    let cookie = Cookie::build((SESSION_COOKIE, session.id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.auth.secure_cookies);

    Ok((jar.add(cookie), AuthResponse::new(user, token.key)))
}

/// Extract the token from the Authorization header
fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get("Authorization")?.to_str().ok()?;
    let (scheme, token) = header.split_once(' ')?;

    if !TOKEN_SCHEMES.iter().any(|known| known.eq_ignore_ascii_case(scheme)) {
        return None;
    }

    Some(token.trim()).filter(|token| !token.is_empty())
}

/// The authenticated user of the current request
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers).ok_or_else(|| {
            ApiError::not_authenticated("Authentication credentials were not provided.")
        })?;

        let user = state
            .store
            .find_user_by_token(token)
            .await?
            .ok_or_else(|| ApiError::not_authenticated("Invalid token."))?;

        Ok(CurrentUser(user))
    }
}

/// Create the configured bootstrap administrator if it does not exist yet
pub async fn ensure_admin_user(store: &dyn Store, config: &AuthConfig) -> anyhow::Result<()> {
    let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) else {
        return Ok(());
    };

    if store.find_user_by_username(username).await?.is_some() {
        return Ok(());
    }

    let password_hash = hash_password(password)
        .map_err(|e| anyhow::anyhow!("Failed to hash admin password: {}", e))?;
    let email = config
        .admin_email
        .clone()
        .unwrap_or_else(|| format!("{}@localhost.localdomain", username));

    let user = store
        .create_user(NewUser {
            username: username.clone(),
            email,
            password_hash,
            role: Role::Admin,
        })
        .await?;

    info!(user_id = user.id, username = %user.username, "Created bootstrap admin user");
    Ok(())
}
