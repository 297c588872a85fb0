//! Auth Gateway
//! Mission: Verify credentials, mint tokens, and turn bearer headers into identities

use crate::auth::{
    clock::Clock,
    error::AuthError,
    jwt::JwtHandler,
    models::{AuthenticatedIdentity, Credential, IssuedToken, NewUser},
    password::{self, MAX_PASSWORD_BYTES},
    user_store::{UserConflict, UserStore},
};
use crate::config::{AdminBootstrap, TokenSettings};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const MAX_USERNAME_LEN: usize = 50;
pub const MAX_EMAIL_LEN: usize = 100;
pub const MIN_PASSWORD_LEN: usize = 6;

/// Stateless per request: the only shared pieces are immutable settings and
/// the user store handle.
pub struct AuthGateway {
    store: Arc<dyn UserStore>,
    jwt: JwtHandler,
    bcrypt_cost: u32,
    // Verified against when the username is unknown so both paths cost one bcrypt run.
    dummy_hash: String,
}

impl AuthGateway {
    pub async fn new(
        store: Arc<dyn UserStore>,
        token_settings: TokenSettings,
        bcrypt_cost: u32,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AuthError> {
        let dummy_hash = password::hash_password("timing-equalizer", bcrypt_cost).await?;

        Ok(Self {
            store,
            jwt: JwtHandler::new(token_settings, clock),
            bcrypt_cost,
            dummy_hash,
        })
    }

    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    pub fn jwt(&self) -> &JwtHandler {
        &self.jwt
    }

    /// Confirm a username/password pair. Unknown user, wrong password and
    /// inactive account are all `InvalidCredentials`.
    pub async fn verify_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Credential, AuthError> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let Some(user) = self.store.find_user(username).await? else {
            // Outcome is irrelevant here; the call only spends the same bcrypt time.
            let _ = password::verify_password(password, &self.dummy_hash).await;
            warn!(username, reason = "unknown_user", "Failed login attempt");
            return Err(AuthError::InvalidCredentials);
        };

        if !password::verify_password(password, &user.password_hash).await? {
            warn!(username, reason = "bad_password", "Failed login attempt");
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_active {
            warn!(username, reason = "inactive", "Failed login attempt");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Login: verify credentials, then sign a token for the matched user.
    pub async fn issue_token(
        &self,
        username: &str,
        password: &str,
    ) -> Result<IssuedToken, AuthError> {
        let user = self.verify_credentials(username, password).await?;
        let issued = self.jwt.generate_token(&user)?;

        info!(
            username = %user.username,
            is_admin = user.is_admin,
            expires_at = %issued.expires_at,
            "Login successful"
        );
        Ok(issued)
    }

    /// Gate a protected request on its raw `Authorization` header value.
    pub fn validate(&self, authorization: Option<&str>) -> Result<AuthenticatedIdentity, AuthError> {
        let token = bearer_token(authorization)?;
        let claims = self.jwt.validate_token(token)?;
        Ok(AuthenticatedIdentity::from(claims))
    }

    /// Self-service registration. Always creates a regular, active account.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Credential, AuthError> {
        self.create_account(username, email, password, false).await
    }

    /// Admin path; may create another admin.
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        is_admin: bool,
    ) -> Result<Credential, AuthError> {
        self.create_account(username, email, password, is_admin).await
    }

    /// Create the configured admin if the store has no admin yet.
    /// Returns true when an account was created.
    pub async fn bootstrap_admin(&self, admin: &AdminBootstrap) -> Result<bool, AuthError> {
        if self.store.count_admins().await? > 0 {
            debug!("Admin account already present, skipping bootstrap");
            return Ok(false);
        }

        self.create_account(&admin.username, &admin.email, &admin.password, true)
            .await
            .map_err(|e| match e {
                AuthError::Internal(_) => e,
                other => AuthError::Configuration(format!("bootstrap admin rejected: {}", other)),
            })?;

        info!(username = %admin.username, "Bootstrap admin created");
        Ok(true)
    }

    async fn create_account(
        &self,
        username: &str,
        email: &str,
        password: &str,
        is_admin: bool,
    ) -> Result<Credential, AuthError> {
        let username = username.trim();
        let email = email.trim().to_ascii_lowercase();
        validate_new_account(username, &email, password)?;

        // Fast path; the store's unique constraints settle concurrent inserts.
        if self.store.find_user(username).await?.is_some() {
            return Err(AuthError::UsernameTaken);
        }
        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = password::hash_password(password, self.bcrypt_cost).await?;

        let user = self
            .store
            .create_user(NewUser {
                username: username.to_string(),
                email,
                password_hash,
                is_admin,
            })
            .await
            .map_err(|e| match e.downcast_ref::<UserConflict>() {
                Some(UserConflict::Username) => AuthError::UsernameTaken,
                Some(UserConflict::Email) => AuthError::EmailTaken,
                None => AuthError::Internal(e.context("Failed to persist new user")),
            })?;

        Ok(user)
    }
}

/// Extract the token from `Bearer <token>`. The scheme is matched
/// case-insensitively; nothing else is inspected here.
pub fn bearer_token(authorization: Option<&str>) -> Result<&str, AuthError> {
    let value = authorization.ok_or(AuthError::MissingToken)?;

    let (scheme, token) = value
        .trim()
        .split_once(' ')
        .ok_or_else(|| AuthError::MalformedToken("expected `Bearer <token>`".to_string()))?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MalformedToken(format!(
            "unsupported scheme `{}`",
            scheme
        )));
    }

    let token = token.trim();
    if token.is_empty() || token.contains(' ') {
        return Err(AuthError::MalformedToken(
            "bearer token is empty or contains spaces".to_string(),
        ));
    }

    Ok(token)
}

fn validate_new_account(username: &str, email: &str, password: &str) -> Result<(), AuthError> {
    if username.is_empty() || username.chars().count() > MAX_USERNAME_LEN {
        return Err(AuthError::InvalidInput(format!(
            "Username must be 1 to {} characters",
            MAX_USERNAME_LEN
        )));
    }
    if username.chars().any(char::is_whitespace) {
        return Err(AuthError::InvalidInput(
            "Username must not contain whitespace".to_string(),
        ));
    }
    if email.chars().count() > MAX_EMAIL_LEN || !looks_like_email(email) {
        return Err(AuthError::InvalidInput(
            "A valid email address is required".to_string(),
        ));
    }
    if password.len() < MIN_PASSWORD_LEN || password.len() > MAX_PASSWORD_BYTES {
        return Err(AuthError::InvalidInput(format!(
            "Password must be {} to {} bytes",
            MIN_PASSWORD_LEN, MAX_PASSWORD_BYTES
        )));
    }
    Ok(())
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .map(|(host, tld)| !host.is_empty() && !tld.is_empty() && !domain.ends_with('.'))
            .unwrap_or(false)
}
