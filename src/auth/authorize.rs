//! Coarse-grained authorization: regular vs admin, nothing finer.

use crate::auth::{error::AuthError, models::AuthenticatedIdentity};

/// What an operation demands of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Authenticated,
    Admin,
}

/// Pure policy check, no IO.
pub fn authorize(identity: &AuthenticatedIdentity, required: Requirement) -> Result<(), AuthError> {
    match required {
        Requirement::Authenticated => Ok(()),
        Requirement::Admin if identity.is_admin => Ok(()),
        Requirement::Admin => Err(AuthError::Forbidden),
    }
}
