use axum::{
    Form, Router,
    extract::{Extension, Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::db::{entities::category, services};
use crate::validation::{ContactForm, FieldErrors, validate_contact};
use crate::web::render::{page_context, render};
use crate::web::{AppError, AppState, models::{AuthenticatedUser, SearchQuery}};

/// Pages anyone can see.
pub fn create_public_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(index))
        .route("/search/", get(search))
        .route("/{contact_id}/detail/", get(contact_detail))
}

/// Pages that need a logged-in user.
pub fn create_owner_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/contact/create/", get(create_page).post(create_contact))
        .route("/{contact_id}/update/", get(update_page).post(update_contact))
}

async fn index(
    State(app_state): State<Arc<AppState>>,
    Extension(current_user): Extension<Option<AuthenticatedUser>>,
) -> Result<Html<String>, AppError> {
    let contacts =
        services::list_visible_contacts(&app_state.db_pool, app_state.config.index_limit).await?;

    let mut context = page_context("Contatos - ", current_user.as_ref());
    context.insert("contacts", &contacts);
    render(&app_state.templates, "contact/index.html", &context)
}

async fn search(
    State(app_state): State<Arc<AppState>>,
    Extension(current_user): Extension<Option<AuthenticatedUser>>,
    Query(params): Query<SearchQuery>,
) -> Result<Html<String>, AppError> {
    let search_value = params.q.trim();
    if search_value.is_empty() {
        debug!("Empty search query, listing every visible contact.");
    }

    let contacts = services::search_visible_contacts(&app_state.db_pool, search_value).await?;

    let mut context = page_context("Search - ", current_user.as_ref());
    context.insert("contacts", &contacts);
    context.insert("search_value", search_value);
    render(&app_state.templates, "contact/index.html", &context)
}

async fn contact_detail(
    State(app_state): State<Arc<AppState>>,
    Extension(current_user): Extension<Option<AuthenticatedUser>>,
    Path(contact_id): Path<i32>,
) -> Result<Html<String>, AppError> {
    let contact = services::find_visible_contact(&app_state.db_pool, contact_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Contact {contact_id} not found")))?;

    let site_title = format!("{} {} - ", contact.first_name, contact.last_name);
    let mut context = page_context(&site_title, current_user.as_ref());
    context.insert("contact", &contact);
    render(&app_state.templates, "contact/contact.html", &context)
}

// --- Contact form ---

fn render_contact_form(
    app_state: &AppState,
    user: &AuthenticatedUser,
    categories: &[category::Model],
    form: &ContactForm,
    errors: &FieldErrors,
    form_action: &str,
) -> Result<Html<String>, AppError> {
    let mut context = page_context("Contact - ", Some(user));
    context.insert("form", form);
    context.insert("errors", errors);
    context.insert("categories", categories);
    context.insert("form_action", form_action);
    render(&app_state.templates, "contact/create.html", &context)
}

async fn create_page(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Html<String>, AppError> {
    let categories = services::list_categories(&app_state.db_pool).await?;
    render_contact_form(
        &app_state,
        &user,
        &categories,
        &ContactForm::default(),
        &FieldErrors::new(),
        "/contact/create/",
    )
}

async fn create_contact(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Form(form): Form<ContactForm>,
) -> Result<Response, AppError> {
    let categories = services::list_categories(&app_state.db_pool).await?;
    let valid = match validate_contact(&form, &categories) {
        Ok(valid) => valid,
        Err(errors) => {
            let page = render_contact_form(
                &app_state,
                &user,
                &categories,
                &form,
                &errors,
                "/contact/create/",
            )?;
            return Ok(page.into_response());
        }
    };

    let contact = services::create_contact(&app_state.db_pool, Some(user.id), valid).await?;
    info!(contact_id = contact.id, owner_id = user.id, "Contact created.");
    Ok(Redirect::to(&format!("/{}/detail/", contact.id)).into_response())
}

async fn update_page(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(contact_id): Path<i32>,
) -> Result<Html<String>, AppError> {
    let contact = services::find_owned_contact(&app_state.db_pool, contact_id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Contact {contact_id} not found")))?;

    let categories = services::list_categories(&app_state.db_pool).await?;
    render_contact_form(
        &app_state,
        &user,
        &categories,
        &ContactForm::from_model(&contact),
        &FieldErrors::new(),
        &format!("/{contact_id}/update/"),
    )
}

async fn update_contact(
    State(app_state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(contact_id): Path<i32>,
    Form(form): Form<ContactForm>,
) -> Result<Response, AppError> {
    let contact = services::find_owned_contact(&app_state.db_pool, contact_id, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Contact {contact_id} not found")))?;

    let categories = services::list_categories(&app_state.db_pool).await?;
    let valid = match validate_contact(&form, &categories) {
        Ok(valid) => valid,
        Err(errors) => {
            let form_action = format!("/{contact_id}/update/");
            let page = render_contact_form(
                &app_state,
                &user,
                &categories,
                &form,
                &errors,
                &form_action,
            )?;
            return Ok(page.into_response());
        }
    };

    services::update_contact(&app_state.db_pool, contact, valid).await?;
    info!(contact_id, owner_id = user.id, "Contact updated.");
    Ok(Redirect::to(&format!("/{contact_id}/update/")).into_response())
}
