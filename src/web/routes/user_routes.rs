use axum::{
    Form, Router,
    extract::{Extension, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;
use tracing::info;

use crate::db::services as db_services;
use crate::services::auth_service;
use crate::validation::{FieldErrors, ProfileForm, RegisterForm};
use crate::web::middleware::auth::TOKEN_COOKIE;
use crate::web::render::{page_context, render};
use crate::web::{AppError, AppState, models::{AuthenticatedUser, LoginForm}};

pub fn create_public_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/user/create/", get(register_page).post(register))
        .route("/user/login/", get(login_page).post(login))
        .route("/user/logout/", post(logout))
}

/// Account pages for the logged-in user.
pub fn create_account_router() -> Router<Arc<AppState>> {
    Router::new().route("/user/update/", get(update_page).post(update))
}

// --- Registration ---

async fn register_page(
    State(app_state): State<Arc<AppState>>,
    Extension(current_user): Extension<Option<AuthenticatedUser>>,
) -> Result<Html<String>, AppError> {
    let mut context = page_context("Register - ", current_user.as_ref());
    context.insert("form", &RegisterForm::default());
    context.insert("errors", &FieldErrors::new());
    render(&app_state.templates, "user/register.html", &context)
}

async fn register(
    State(app_state): State<Arc<AppState>>,
    Extension(current_user): Extension<Option<AuthenticatedUser>>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    match auth_service::register_user(&app_state.db_pool, &form, &app_state.password_policy)
        .await?
    {
        Ok(_) => Ok(Redirect::to("/user/login/").into_response()),
        Err(errors) => {
            let mut context = page_context("Register - ", current_user.as_ref());
            context.insert("form", &form);
            context.insert("errors", &errors);
            Ok(render(&app_state.templates, "user/register.html", &context)?.into_response())
        }
    }
}

// --- Session ---

async fn login_page(State(app_state): State<Arc<AppState>>) -> Result<Html<String>, AppError> {
    let mut context = page_context("Login - ", None);
    context.insert("form", &LoginForm::default());
    context.insert("errors", &FieldErrors::new());
    render(&app_state.templates, "user/login.html", &context)
}

async fn login(
    State(app_state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let (user, token) =
        match auth_service::login_user(&app_state.db_pool, &form, &app_state.config.jwt_secret)
            .await?
        {
            Ok(session) => session,
            Err(errors) => {
                let mut context = page_context("Login - ", None);
                context.insert("form", &form);
                context.insert("errors", &errors);
                return Ok(
                    render(&app_state.templates, "user/login.html", &context)?.into_response(),
                );
            }
        };

    let auth_cookie = Cookie::build((TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(app_state.config.cookie_secure);

    info!(user_id = user.id, "User logged in.");
    Ok((jar.add(auth_cookie), Redirect::to("/")).into_response())
}

async fn logout(jar: CookieJar) -> impl IntoResponse {
    (
        jar.remove(Cookie::build(TOKEN_COOKIE).path("/")),
        Redirect::to("/user/login/"),
    )
}

// --- Profile ---

async fn update_page(
    State(app_state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
) -> Result<Html<String>, AppError> {
    let user = db_services::get_user_by_id(&app_state.db_pool, auth_user.id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let mut context = page_context("Profile - ", Some(&auth_user));
    context.insert("form", &ProfileForm::from_model(&user));
    context.insert("errors", &FieldErrors::new());
    render(&app_state.templates, "user/update.html", &context)
}

async fn update(
    State(app_state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthenticatedUser>,
    Form(form): Form<ProfileForm>,
) -> Result<Response, AppError> {
    let user = db_services::get_user_by_id(&app_state.db_pool, auth_user.id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let errors =
        match auth_service::update_profile(&app_state.db_pool, user, &form, &app_state.password_policy)
            .await?
        {
            Ok(_) => return Ok(Redirect::to("/user/update/").into_response()),
            Err(errors) => errors,
        };

    let mut context = page_context("Profile - ", Some(&auth_user));
    context.insert("form", &form);
    context.insert("errors", &errors);
    Ok(render(&app_state.templates, "user/update.html", &context)?.into_response())
}
