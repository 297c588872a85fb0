//! Authentication API Endpoints
//! Mission: Provide registration, login and user management endpoints

use crate::auth::{
    error::AuthError,
    gateway::AuthGateway,
    models::{
        AuthenticatedIdentity, CreateUserRequest, LoginRequest, RegisterRequest, TokenResponse,
        UserResponse,
    },
};
use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::info;

/// Shared auth state
#[derive(Clone)]
pub struct AuthState {
    pub gateway: Arc<AuthGateway>,
}

impl AuthState {
    pub fn new(gateway: Arc<AuthGateway>) -> Self {
        Self { gateway }
    }
}

/// Register endpoint - POST /auth/register
pub async fn register(
    State(state): State<AuthState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AuthError> {
    let user = state
        .gateway
        .register(&payload.username, &payload.email, &payload.password)
        .await?;

    info!(username = %user.username, "User registered");

    Ok((StatusCode::CREATED, Json(UserResponse::from_user(&user))))
}

/// Login endpoint - POST /auth/login
pub async fn login(
    State(state): State<AuthState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    let issued = state
        .gateway
        .issue_token(&payload.username, &payload.password)
        .await?;

    Ok(Json(TokenResponse::bearer(issued)))
}

/// Get current user info - GET /auth/me
///
/// The token proves identity; the profile itself is read from the store so
/// email and creation time are current.
pub async fn get_current_user(
    State(state): State<AuthState>,
    identity: AuthenticatedIdentity,
) -> Result<Json<UserResponse>, AuthError> {
    let user = state
        .gateway
        .store()
        .find_user(&identity.username)
        .await?
        .ok_or_else(|| AuthError::MalformedToken("subject no longer exists".to_string()))?;

    Ok(Json(UserResponse::from_user(&user)))
}

/// List all users - GET /auth/users (Admin only)
pub async fn list_users(
    State(state): State<AuthState>,
    _admin: AuthenticatedIdentity,
) -> Result<Json<Vec<UserResponse>>, AuthError> {
    let users = state.gateway.store().list_users().await?;
    Ok(Json(users.iter().map(UserResponse::from_user).collect()))
}

/// Create user - POST /auth/users (Admin only)
pub async fn create_user(
    State(state): State<AuthState>,
    admin: AuthenticatedIdentity,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AuthError> {
    let user = state
        .gateway
        .create_user(
            &payload.username,
            &payload.email,
            &payload.password,
            payload.is_admin,
        )
        .await?;

    info!(
        created_by = %admin.username,
        username = %user.username,
        is_admin = user.is_admin,
        "User created"
    );

    Ok((StatusCode::CREATED, Json(UserResponse::from_user(&user))))
}
