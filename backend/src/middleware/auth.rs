//! Bearer token middleware
//!
//! Tokens are issued elsewhere; this layer only verifies them and turns the
//! claims into the [`Actor`] handed to every ledger operation.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use shared::Actor;
use uuid::Uuid;

use crate::error::{ErrorDetail, ErrorResponse};
use crate::AppState;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

/// Verify a token and return the actor it names
pub fn decode_actor(token: &str, secret: &str) -> Result<Actor, String> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("Invalid token: {}", e))?;

    let user_id =
        Uuid::parse_str(&claims.sub).map_err(|_| "Invalid user ID in token".to_string())?;

    Ok(Actor {
        user_id,
        name: claims.name,
    })
}

/// Authentication middleware that validates JWT tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "));

    let Some(token) = token else {
        return unauthorized_response("Missing or invalid Authorization header");
    };

    let actor = match decode_actor(token, &state.config.jwt.secret) {
        Ok(actor) => actor,
        Err(msg) => {
            tracing::debug!(reason = %msg, "token rejected");
            return unauthorized_response(&msg);
        }
    };

    request.extensions_mut().insert(actor);
    next.run(request).await
}

fn unauthorized_response(message: &str) -> Response {
    let error = ErrorResponse {
        error: ErrorDetail::new("UNAUTHORIZED", message),
    };
    (StatusCode::UNAUTHORIZED, Json(error)).into_response()
}

/// Extractor for the authenticated actor
#[derive(Clone, Debug)]
pub struct CurrentActor(pub Actor);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Actor>()
            .cloned()
            .map(CurrentActor)
            .ok_or_else(|| unauthorized_response("Authentication required"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(sub: &str, secret: &str) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            name: "Store Keeper".to_string(),
            exp: chrono::Utc::now().timestamp() + 3600,
            iat: chrono::Utc::now().timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_decode_actor() {
        let user_id = Uuid::new_v4();
        let actor = decode_actor(&token(&user_id.to_string(), "s3cret"), "s3cret").unwrap();
        assert_eq!(actor.user_id, user_id);
        assert_eq!(actor.name, "Store Keeper");
    }

    #[test]
    fn test_decode_rejects_wrong_secret_and_bad_subject() {
        let user_id = Uuid::new_v4().to_string();
        assert!(decode_actor(&token(&user_id, "s3cret"), "other").is_err());
        assert!(decode_actor(&token("not-a-uuid", "s3cret"), "s3cret").is_err());
    }
}
