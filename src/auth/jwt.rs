//! JWT Token Handler
//! Mission: Generate and validate JWT tokens securely

use crate::auth::{
    clock::Clock,
    error::AuthError,
    models::{Claims, Credential, IssuedToken},
};
use crate::config::TokenSettings;
use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// JWT Handler for token operations
pub struct JwtHandler {
    settings: TokenSettings,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl JwtHandler {
    pub fn new(settings: TokenSettings, clock: Arc<dyn Clock>) -> Self {
        let encoding_key = EncodingKey::from_secret(settings.secret_bytes());
        let decoding_key = DecodingKey::from_secret(settings.secret_bytes());

        // Expiry is checked against our own clock in `validate_token`.
        let mut validation = Validation::new(settings.algorithm());
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            settings,
            encoding_key,
            decoding_key,
            validation,
            clock,
        }
    }

    pub fn settings(&self) -> &TokenSettings {
        &self.settings
    }

    /// Generate a JWT token for a user
    pub fn generate_token(&self, user: &Credential) -> Result<IssuedToken, AuthError> {
        let issued_at = self.clock.now();
        let expires_at = issued_at + self.settings.ttl();

        let claims = Claims {
            sub: user.username.clone(),
            is_admin: user.is_admin,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        debug!(
            username = %user.username,
            expires_at = %expires_at,
            "Generating JWT"
        );

        let token = encode(
            &Header::new(self.settings.algorithm()),
            &claims,
            &self.encoding_key,
        )
        .map_err(|e| AuthError::Internal(anyhow::Error::new(e).context("Failed to sign JWT")))?;

        Ok(IssuedToken {
            token,
            issued_at: to_datetime(claims.iat)?,
            expires_at: to_datetime(claims.exp)?,
        })
    }

    /// Validate a JWT token and extract claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let decoded = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(classify_decode_error)?;
        let claims = decoded.claims;

        if claims.sub.trim().is_empty() {
            return Err(AuthError::MalformedToken("empty subject".to_string()));
        }
        if claims.exp <= claims.iat {
            return Err(AuthError::MalformedToken(
                "expiry does not follow issue time".to_string(),
            ));
        }

        let now = self.clock.now();
        if now < to_datetime(claims.iat)? {
            return Err(AuthError::MalformedToken(
                "token issued in the future".to_string(),
            ));
        }
        if now >= to_datetime(claims.exp)? {
            return Err(AuthError::Expired);
        }

        debug!(username = %claims.sub, "Validated JWT");

        Ok(claims)
    }
}

fn to_datetime(secs: i64) -> Result<DateTime<Utc>, AuthError> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| AuthError::MalformedToken(format!("timestamp out of range: {}", secs)))
}

fn classify_decode_error(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => AuthError::InvalidSignature,
        ErrorKind::ExpiredSignature => AuthError::Expired,
        _ => AuthError::MalformedToken(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;
    use chrono::Duration;
    use jsonwebtoken::Algorithm;

    const SECRET: &str = "test-secret-key-0123456789abcdef0123";

    fn create_test_user(is_admin: bool) -> Credential {
        Credential {
            user_id: 1,
            username: "testuser".to_string(),
            email: "testuser@example.com".to_string(),
            password_hash: "hash".to_string(),
            is_active: true,
            is_admin,
            created_at: Utc::now(),
        }
    }

    fn handler_with(secret: &str, alg: Algorithm, clock: Arc<ManualClock>) -> JwtHandler {
        JwtHandler::new(TokenSettings::new(secret, alg, 30).unwrap(), clock)
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_jwt_generation_and_validation() {
        let clock = Arc::new(ManualClock::new(start()));
        let handler = handler_with(SECRET, Algorithm::HS256, clock);
        let user = create_test_user(false);

        let issued = handler.generate_token(&user).unwrap();
        assert_eq!(issued.token.split('.').count(), 3);
        assert_eq!(issued.expires_in_secs(), 30 * 60);

        let claims = handler.validate_token(&issued.token).unwrap();
        assert_eq!(claims.sub, "testuser");
        assert!(!claims.is_admin);
        assert_eq!(claims.iat, start().timestamp());
        assert_eq!(claims.exp, (start() + Duration::minutes(30)).timestamp());
    }

    #[test]
    fn test_header_declares_configured_algorithm() {
        let clock = Arc::new(ManualClock::new(start()));
        let handler = handler_with(SECRET, Algorithm::HS384, clock);
        let issued = handler.generate_token(&create_test_user(true)).unwrap();

        let header = jsonwebtoken::decode_header(&issued.token).unwrap();
        assert_eq!(header.alg, Algorithm::HS384);
        assert_eq!(header.typ.as_deref(), Some("JWT"));
    }

    #[test]
    fn test_token_verifies_with_stock_decoder() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let handler = handler_with(SECRET, Algorithm::HS256, clock);
        let issued = handler.generate_token(&create_test_user(true)).unwrap();

        let decoded = decode::<Claims>(
            &issued.token,
            &DecodingKey::from_secret(SECRET.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap();
        assert_eq!(decoded.claims.sub, "testuser");
        assert!(decoded.claims.is_admin);
    }

    #[test]
    fn test_expiry_boundary() {
        let clock = Arc::new(ManualClock::new(start()));
        let handler = handler_with(SECRET, Algorithm::HS256, clock.clone());
        let issued = handler.generate_token(&create_test_user(false)).unwrap();

        clock.set(issued.expires_at - Duration::seconds(1));
        assert!(handler.validate_token(&issued.token).is_ok());

        clock.set(issued.expires_at - Duration::milliseconds(1));
        assert!(handler.validate_token(&issued.token).is_ok());

        clock.set(issued.expires_at);
        assert!(matches!(
            handler.validate_token(&issued.token),
            Err(AuthError::Expired)
        ));

        clock.advance(Duration::days(1));
        assert!(matches!(
            handler.validate_token(&issued.token),
            Err(AuthError::Expired)
        ));
    }

    #[test]
    fn test_not_valid_before_issue_time() {
        let clock = Arc::new(ManualClock::new(start()));
        let handler = handler_with(SECRET, Algorithm::HS256, clock.clone());
        let issued = handler.generate_token(&create_test_user(false)).unwrap();

        clock.set(start() - Duration::seconds(1));
        assert!(matches!(
            handler.validate_token(&issued.token),
            Err(AuthError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_different_secrets_reject() {
        let clock = Arc::new(ManualClock::new(start()));
        let handler1 = handler_with(SECRET, Algorithm::HS256, clock.clone());
        let handler2 = handler_with("another-secret-key-0123456789abcdef", Algorithm::HS256, clock);

        let issued = handler1.generate_token(&create_test_user(false)).unwrap();
        assert!(matches!(
            handler2.validate_token(&issued.token),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn test_algorithm_mismatch_rejected_as_bad_signature() {
        let clock = Arc::new(ManualClock::new(start()));
        let hs512 = handler_with(SECRET, Algorithm::HS512, clock.clone());
        let hs256 = handler_with(SECRET, Algorithm::HS256, clock);

        let issued = hs512.generate_token(&create_test_user(false)).unwrap();
        assert!(matches!(
            hs256.validate_token(&issued.token),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn test_tampered_claims_rejected() {
        let clock = Arc::new(ManualClock::new(start()));
        let handler = handler_with(SECRET, Algorithm::HS256, clock);
        let regular = handler.generate_token(&create_test_user(false)).unwrap();
        let admin = handler.generate_token(&create_test_user(true)).unwrap();

        // Splice the admin payload onto the regular token's signature.
        let r: Vec<&str> = regular.token.split('.').collect();
        let a: Vec<&str> = admin.token.split('.').collect();
        let forged = format!("{}.{}.{}", r[0], a[1], r[2]);

        assert!(matches!(
            handler.validate_token(&forged),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let clock = Arc::new(ManualClock::new(start()));
        let handler = handler_with(SECRET, Algorithm::HS256, clock);

        for token in ["invalid.token.here", "not-a-jwt", "", "a.b"] {
            assert!(
                matches!(
                    handler.validate_token(token),
                    Err(AuthError::MalformedToken(_))
                ),
                "token {:?} should be malformed",
                token
            );
        }
    }

    #[test]
    fn test_missing_claims_rejected() {
        #[derive(serde::Serialize)]
        struct Partial {
            sub: String,
            exp: i64,
        }

        let clock = Arc::new(ManualClock::new(start()));
        let handler = handler_with(SECRET, Algorithm::HS256, clock);
        let token = encode(
            &Header::new(Algorithm::HS256),
            &Partial {
                sub: "testuser".to_string(),
                exp: (start() + Duration::minutes(5)).timestamp(),
            },
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            handler.validate_token(&token),
            Err(AuthError::MalformedToken(_))
        ));
    }

    #[test]
    fn test_two_tokens_same_instant_are_distinct() {
        let clock = Arc::new(ManualClock::new(start()));
        let handler = handler_with(SECRET, Algorithm::HS256, clock);
        let user = create_test_user(false);

        let a = handler.generate_token(&user).unwrap();
        let b = handler.generate_token(&user).unwrap();
        assert_ne!(a.token, b.token);
        assert!(handler.validate_token(&a.token).is_ok());
        assert!(handler.validate_token(&b.token).is_ok());
    }
}
