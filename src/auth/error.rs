//! Authentication Errors
//! Mission: One stable classification for every way a request can be turned away

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Every failure the gateway can report.
///
/// The `kind()` string is part of the wire contract; the `Display` text is
/// for logs only and may carry detail that must not reach the client.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Fatal, startup-time only.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("missing authorization header")]
    MissingToken,

    #[error("malformed token: {0}")]
    MalformedToken(String),

    #[error("token signature does not verify")]
    InvalidSignature,

    #[error("token expired")]
    Expired,

    #[error("admin privileges required")]
    Forbidden,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("username already registered")]
    UsernameTaken,

    #[error("email already registered")]
    EmailTaken,

    /// User store or hashing failure.
    #[error("internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    /// Stable machine-readable classification.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::Configuration(_) => "configuration_error",
            AuthError::InvalidCredentials => "invalid_credentials",
            AuthError::MissingToken => "missing_token",
            AuthError::MalformedToken(_) => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::Expired => "expired",
            AuthError::Forbidden => "forbidden",
            AuthError::InvalidInput(_) => "invalid_input",
            AuthError::UsernameTaken => "username_taken",
            AuthError::EmailTaken => "email_taken",
            AuthError::Internal(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials
            | AuthError::MissingToken
            | AuthError::MalformedToken(_)
            | AuthError::InvalidSignature
            | AuthError::Expired => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::InvalidInput(_) | AuthError::UsernameTaken | AuthError::EmailTaken => {
                StatusCode::BAD_REQUEST
            }
            AuthError::Configuration(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Client-facing message. Never includes which claim or check failed.
    fn public_message(&self) -> String {
        match self {
            AuthError::InvalidCredentials => "Incorrect username or password".to_string(),
            AuthError::MissingToken => "Not authenticated".to_string(),
            AuthError::MalformedToken(_) | AuthError::InvalidSignature => {
                "Could not validate credentials".to_string()
            }
            AuthError::Expired => "Token has expired".to_string(),
            AuthError::Forbidden => "Insufficient permissions".to_string(),
            AuthError::InvalidInput(reason) => reason.clone(),
            AuthError::UsernameTaken => "Username already registered".to_string(),
            AuthError::EmailTaken => "Email already registered".to_string(),
            AuthError::Configuration(_) | AuthError::Internal(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!(kind = self.kind(), error = %self, "Auth request failed");
        } else {
            warn!(kind = self.kind(), detail = %self, "Auth request rejected");
        }

        let body = Json(json!({
            "error": self.kind(),
            "message": self.public_message(),
        }));

        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validator_rejections_map_to_401() {
        for err in [
            AuthError::MissingToken,
            AuthError::MalformedToken("bad scheme".into()),
            AuthError::InvalidSignature,
            AuthError::Expired,
            AuthError::InvalidCredentials,
        ] {
            let response = err.into_response();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(
                response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
                "Bearer"
            );
        }
    }

    #[test]
    fn test_forbidden_and_registration_statuses() {
        assert_eq!(
            AuthError::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AuthError::UsernameTaken.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::Internal(anyhow::anyhow!("disk full"))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_kinds_are_distinct_for_validator_failures() {
        let kinds = [
            AuthError::MissingToken.kind(),
            AuthError::MalformedToken(String::new()).kind(),
            AuthError::InvalidSignature.kind(),
            AuthError::Expired.kind(),
        ];
        for (i, a) in kinds.iter().enumerate() {
            for b in &kinds[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_public_message_hides_detail() {
        let err = AuthError::MalformedToken("claim `exp` missing".into());
        assert!(!err.public_message().contains("exp"));
    }
}
