//! Authentication Middleware
//! Mission: Protect API endpoints with JWT validation

use crate::auth::{
    api::AuthState,
    authorize::{authorize, Requirement},
    error::AuthError,
    models::AuthenticatedIdentity,
};
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};

/// Validate the bearer token and attach the identity to the request.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let identity = authenticate(&state, &req)?;
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

/// Same as `auth_middleware`, then require the admin flag.
pub async fn admin_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let identity = authenticate(&state, &req)?;
    authorize(&identity, Requirement::Admin)?;
    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

fn authenticate(state: &AuthState, req: &Request) -> Result<AuthenticatedIdentity, AuthError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .map(|value| {
            value.to_str().map_err(|_| {
                AuthError::MalformedToken("authorization header is not visible ASCII".to_string())
            })
        })
        .transpose()?;

    state.gateway.validate(header)
}

/// Handlers behind `auth_middleware` take the identity as an argument.
#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedIdentity
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedIdentity>()
            .cloned()
            .ok_or(AuthError::MissingToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request as HttpRequest};

    #[tokio::test]
    async fn test_identity_extractor_reads_extensions() {
        let mut req = HttpRequest::new(Body::empty());
        req.extensions_mut().insert(AuthenticatedIdentity {
            username: "test".to_string(),
            is_admin: false,
        });
        let (mut parts, _) = req.into_parts();

        let identity = AuthenticatedIdentity::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(identity.username, "test");
    }

    #[tokio::test]
    async fn test_identity_extractor_without_middleware_rejects() {
        let (mut parts, _) = HttpRequest::new(Body::empty()).into_parts();
        assert!(matches!(
            AuthenticatedIdentity::from_request_parts(&mut parts, &()).await,
            Err(AuthError::MissingToken)
        ));
    }
}
