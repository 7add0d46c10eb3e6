//! Bearer-token authentication. Token issuance lives outside this service;
//! here a presented token is decoded once per request (or once per socket
//! connection) and exchanged for a full user record.

use api_types::User;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, db::users::UserRepository, error::ErrorResponse};

/// Authenticated caller, inserted as a request extension by `require_auth`.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user: User,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: i64,
}

pub fn issue_token(
    secret: &str,
    user_id: Uuid,
    ttl: chrono::Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: user_id,
        exp: (Utc::now() + ttl).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn verify_token(secret: &str, token: &str) -> Result<Uuid, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims.sub)
}

/// Exchange a bearer token for the user it identifies.
pub async fn authenticate(state: &AppState, token: &str) -> Result<User, ErrorResponse> {
    let user_id = verify_token(&state.config().jwt_secret, token)
        .map_err(|_| ErrorResponse::new(StatusCode::UNAUTHORIZED, "invalid credentials"))?;

    UserRepository::find_by_id(state.pool(), user_id)
        .await
        .map_err(|error| {
            tracing::error!(?error, %user_id, "failed to load authenticated user");
            ErrorResponse::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        })?
        .ok_or_else(|| ErrorResponse::new(StatusCode::UNAUTHORIZED, "invalid credentials"))
}

pub async fn require_auth(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ErrorResponse> {
    let Some(TypedHeader(Authorization(bearer))) = bearer else {
        return Err(ErrorResponse::new(
            StatusCode::UNAUTHORIZED,
            "missing bearer token",
        ));
    };

    let user = authenticate(&state, bearer.token()).await?;
    request.extensions_mut().insert(RequestContext { user });
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips_to_the_same_user() {
        let user_id = Uuid::new_v4();
        let token = issue_token("secret", user_id, chrono::Duration::hours(1)).unwrap();
        assert_eq!(verify_token("secret", &token).unwrap(), user_id);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_token("secret", Uuid::new_v4(), chrono::Duration::hours(1)).unwrap();
        assert!(verify_token("other", &token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = issue_token("secret", Uuid::new_v4(), chrono::Duration::hours(-2)).unwrap();
        assert!(verify_token("secret", &token).is_err());
    }
}
