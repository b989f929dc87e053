use axum::{
    body::Body as AxumBody,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use jsonwebtoken::{DecodingKey, Validation, decode};
use std::sync::Arc;
use tracing::debug;

use crate::web::models::{AuthenticatedUser, Claims};
use crate::web::{AppState, error::AppError};

pub const TOKEN_COOKIE: &str = "token";

/// Decodes the session cookie when present and stores the result as an
/// `Option<AuthenticatedUser>` extension. Never rejects a request.
pub async fn identify(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut req: Request<AxumBody>,
    next: Next,
) -> Response {
    let user = jar
        .get(TOKEN_COOKIE)
        .and_then(|cookie| decode_token(cookie.value(), &state.config.jwt_secret));
    req.extensions_mut().insert(user);
    next.run(req).await
}

/// Lets the request through only for a logged-in user, exposing it as an
/// `AuthenticatedUser` extension.
pub async fn auth(mut req: Request<AxumBody>, next: Next) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<Option<AuthenticatedUser>>()
        .cloned()
        .flatten()
        .ok_or(AppError::Unauthorized)?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

fn decode_token(token: &str, jwt_secret: &str) -> Option<AuthenticatedUser> {
    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_ref()),
        &Validation::default(),
    ) {
        Ok(token_data) => Some(AuthenticatedUser {
            id: token_data.claims.user_id,
            username: token_data.claims.sub,
        }),
        Err(e) => {
            debug!(error = ?e, "Ignoring invalid session token.");
            None
        }
    }
}
