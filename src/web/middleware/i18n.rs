use axum::{
    body::Body as AxumBody,
    http::{Request, header},
    middleware::Next,
    response::Response,
};

use crate::locale;

/// Picks the message locale from `Accept-Language`, falling back to English,
/// and serves the rest of the request under it.
pub async fn i18n_middleware(req: Request<AxumBody>, next: Next) -> Response {
    let chosen = req
        .headers()
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
        .map(negotiate_locale)
        .unwrap_or(locale::DEFAULT_LOCALE);

    locale::scope(chosen, next.run(req)).await
}

/// First supported language in an `Accept-Language` value.
pub fn negotiate_locale(header_value: &str) -> &'static str {
    header_value
        .split(',')
        .map(|part| part.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
        .find_map(|tag| {
            if tag.starts_with("pt") {
                Some("pt-BR")
            } else if tag.starts_with("en") {
                Some("en")
            } else {
                None
            }
        })
        .unwrap_or(locale::DEFAULT_LOCALE)
}
