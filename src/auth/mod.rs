//! Authentication Module
//! Mission: Secure API access with JWT bearer tokens and an admin gate
//!
//! Request flow: `Unauthenticated -> TokenPresented -> Authenticated ->
//! Authorized | Forbidden`. Any failed step ends the request with a
//! classified `AuthError`; nothing is retried server-side.

pub mod api;
pub mod authorize;
pub mod clock;
pub mod error;
pub mod gateway;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod user_store;

pub use api::AuthState;
pub use authorize::{authorize, Requirement};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::AuthError;
pub use gateway::AuthGateway;
pub use jwt::JwtHandler;
pub use middleware::{admin_middleware, auth_middleware};
pub use models::{AuthenticatedIdentity, Credential};
pub use user_store::{SqliteUserStore, UserConflict, UserStore};
