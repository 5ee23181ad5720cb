//! JWT auth for the task API.
//!
//! - Clients register or log in and receive a JWT naming their user id
//! - All task endpoints require `Authorization: Bearer <jwt>`
//! - The middleware resolves the token to an [`AuthUser`] request
//!   extension; handlers never infer the user from anywhere else
//!
//! The token is opaque to the rest of the service: everything downstream
//! of this module only sees the resolved user id.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;

use super::routes::{error_response, AppState};
use super::types::{AuthResponse, LoginRequest, RegisterRequest};

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct Claims {
    /// Subject: the user id, as a decimal string
    sub: String,
    /// Issued-at unix seconds
    iat: i64,
    /// Expiration unix seconds
    exp: i64,
}

/// The authenticated user, inserted into request extensions by
/// [`require_auth`].
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: i64,
}

fn issue_jwt(secret: &str, user_id: i64, ttl_days: i64) -> anyhow::Result<String> {
    let now = Utc::now();
    let exp = now + Duration::days(ttl_days.max(1));
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now.timestamp(),
        exp: exp.timestamp(),
    };
    let token = jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

/// Verify a JWT and resolve it to a user id.
fn verify_jwt(token: &str, secret: &str) -> anyhow::Result<i64> {
    let validation = Validation::default();
    let token_data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;
    let user_id = token_data.claims.sub.parse()?;
    Ok(user_id)
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let user = state
        .accounts
        .register(&req.username, &req.email, &req.password)
        .await
        .map_err(error_response)?;

    let token = issue_jwt(
        &state.config.jwt_secret,
        user.id,
        state.config.token_ttl_days,
    )
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(AuthResponse { user, token }))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let user = state
        .accounts
        .login(&req.email, &req.password)
        .await
        .map_err(error_response)?;

    let token = issue_jwt(
        &state.config.jwt_secret,
        user.id,
        state.config.token_ttl_days,
    )
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(AuthResponse { user, token }))
}

pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    let token = auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
        .unwrap_or("");

    if token.is_empty() {
        return (StatusCode::UNAUTHORIZED, "Missing Authorization header").into_response();
    }

    match verify_jwt(token, &state.config.jwt_secret) {
        Ok(user_id) => {
            req.extensions_mut().insert(AuthUser { id: user_id });
            next.run(req).await
        }
        Err(_) => (StatusCode::UNAUTHORIZED, "Invalid or expired token").into_response(),
    }
}
