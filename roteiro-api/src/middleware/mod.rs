pub mod auth;

pub use auth::{admin_auth_middleware, optional_claims, user_auth_middleware, Claims};
