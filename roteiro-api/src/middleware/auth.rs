use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::state::{AppState, AuthConfig};

pub const ADMIN_ROLE: &str = "ADMIN";
pub const USER_ROLE: &str = "USER";

/// Bearer token claims issued by the auth service.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub role: String,
    pub exp: usize,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

fn decode_claims(auth: &AuthConfig, headers: &HeaderMap) -> Result<Claims, StatusCode> {
    let bearer = headers
        .typed_get::<Authorization<Bearer>>()
        .ok_or(StatusCode::UNAUTHORIZED)?;

    decode::<Claims>(
        bearer.token(),
        &DecodingKey::from_secret(auth.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| StatusCode::UNAUTHORIZED)
}

/// Claims of a valid bearer token, if any. Used by public routes that show
/// more to admins.
pub fn optional_claims(auth: &AuthConfig, headers: &HeaderMap) -> Option<Claims> {
    decode_claims(auth, headers).ok()
}

pub fn issue_token(
    auth: &AuthConfig,
    sub: &str,
    email: &str,
    name: Option<&str>,
    role: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: sub.to_string(),
        email: email.to_string(),
        name: name.map(str::to_string),
        role: role.to_string(),
        exp: (Utc::now() + Duration::seconds(auth.expiration as i64)).timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(auth.secret.as_bytes()))
}

/// Any signed-in user.
pub async fn user_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let claims = decode_claims(&state.auth, req.headers())?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let claims = decode_claims(&state.auth, req.headers())?;
    if !claims.is_admin() {
        return Err(StatusCode::FORBIDDEN);
    }
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::AUTHORIZATION;

    fn auth() -> AuthConfig {
        AuthConfig { secret: "test-secret".into(), expiration: 60 }
    }

    #[test]
    fn round_trips_a_signed_token() {
        let token = issue_token(&auth(), "user-1", "ana@example.com", Some("Ana"), ADMIN_ROLE).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, format!("Bearer {token}").parse().unwrap());

        let claims = optional_claims(&auth(), &headers).unwrap();
        assert!(claims.is_admin());
        assert_eq!(claims.name.as_deref(), Some("Ana"));
    }

    #[test]
    fn rejects_foreign_signature() {
        let other = AuthConfig { secret: "other".into(), expiration: 60 };
        let token = issue_token(&other, "user-1", "ana@example.com", None, USER_ROLE).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, format!("Bearer {token}").parse().unwrap());

        assert_eq!(decode_claims(&auth(), &headers).unwrap_err(), StatusCode::UNAUTHORIZED);
        assert!(optional_claims(&auth(), &HeaderMap::new()).is_none());
    }
}
