use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, RuntimeErr, Set, TryIntoModel};
use tracing::{info, warn};

use crate::db::{entities::user, services as db_services};
use crate::locale;
use crate::validation::{
    FieldErrors, NewUser, PasswordPolicy, ProfileForm, ProfileUpdate, RegisterForm,
    ValidationError, validate_profile_update, validate_registration,
};
use crate::web::error::AppError;
use crate::web::models::{Claims, LoginForm};

/// Outcome of a form submission: either the saved value or the field errors
/// to show on the re-rendered form.
pub type FormResult<T> = Result<Result<T, FieldErrors>, AppError>;

fn split_validation<T>(result: Result<T, ValidationError>) -> FormResult<T> {
    match result {
        Ok(value) => Ok(Ok(value)),
        Err(ValidationError::Invalid(errors)) => Ok(Err(errors)),
        Err(ValidationError::Database(e)) => Err(e.into()),
    }
}

pub async fn register_user(
    pool: &DatabaseConnection,
    form: &RegisterForm,
    policy: &PasswordPolicy,
) -> FormResult<user::Model> {
    let new_user: NewUser = match split_validation(validate_registration(form, pool, policy).await)? {
        Ok(new_user) => new_user,
        Err(errors) => return Ok(Err(errors)),
    };

    let password_hash = hash(&new_user.password, DEFAULT_COST)
        .map_err(|e| AppError::PasswordHashingError(e.to_string()))?;

    match db_services::create_user(
        pool,
        &new_user.username,
        &new_user.email,
        &new_user.first_name,
        &new_user.last_name,
        &password_hash,
    )
    .await
    {
        Ok(user_model) => {
            info!(user_id = user_model.id, username = %user_model.username, "User registered.");
            Ok(Ok(user_model))
        }
        // Lost a race with a concurrent registration of the same username.
        Err(e) if is_unique_violation(&e) => {
            let mut errors = FieldErrors::new();
            errors.add("username", t!("user.username_taken", locale = locale::current()));
            Ok(Err(errors))
        }
        Err(e) => Err(AppError::DatabaseError(format!("Failed to create user: {e}"))),
    }
}

/// Verifies the credentials and issues a session token. Any failure is
/// reported as a single form-level error.
pub async fn login_user(
    pool: &DatabaseConnection,
    form: &LoginForm,
    jwt_secret: &str,
) -> FormResult<(user::Model, String)> {
    let mut errors = FieldErrors::new();
    if form.username.trim().is_empty() || form.password.is_empty() {
        errors.add("__all__", t!("user.invalid_login", locale = locale::current()));
        return Ok(Err(errors));
    }

    let user = match db_services::get_user_by_username(pool, form.username.trim()).await? {
        Some(u) if u.is_active => u,
        _ => {
            errors.add("__all__", t!("user.invalid_login", locale = locale::current()));
            return Ok(Err(errors));
        }
    };

    let valid_password = verify(&form.password, &user.password_hash)
        .map_err(|e| AppError::InternalServerError(format!("Password verification failed: {e}")))?;
    if !valid_password {
        warn!(username = %user.username, "Failed login attempt.");
        errors.add("__all__", t!("user.invalid_login", locale = locale::current()));
        return Ok(Err(errors));
    }

    let token = create_jwt_for_user(&user, jwt_secret)?;
    Ok(Ok((user, token)))
}

pub fn create_jwt_for_user(user: &user::Model, jwt_secret: &str) -> Result<String, AppError> {
    let now = Utc::now();
    let expiration = (now + Duration::hours(24)).timestamp() as usize;

    let claims = Claims {
        sub: user.username.clone(),
        user_id: user.id,
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_ref()),
    )
    .map_err(|e| AppError::TokenCreationError(e.to_string()))
}

/// Validates a profile edit of `current` and saves it.
pub async fn update_profile(
    pool: &DatabaseConnection,
    current: user::Model,
    form: &ProfileForm,
    policy: &PasswordPolicy,
) -> FormResult<user::Model> {
    let update =
        match split_validation(validate_profile_update(form, &current, pool, policy).await)? {
            Ok(update) => update,
            Err(errors) => return Ok(Err(errors)),
        };

    match save_profile(pool, current, update, true).await {
        Ok(user_model) => Ok(Ok(user_model)),
        Err(AppError::Conflict(_)) => {
            let mut errors = FieldErrors::new();
            errors.add("username", t!("user.username_taken", locale = locale::current()));
            Ok(Err(errors))
        }
        Err(e) => Err(e),
    }
}

/// Applies `update` to `current`. A new password hash is set only when a new
/// password was given; nothing is written unless `commit` is true.
pub async fn save_profile(
    pool: &DatabaseConnection,
    current: user::Model,
    update: ProfileUpdate,
    commit: bool,
) -> Result<user::Model, AppError> {
    let user_id = current.id;
    let mut active: user::ActiveModel = current.into();
    active.first_name = Set(update.first_name);
    active.last_name = Set(update.last_name);
    active.email = Set(update.email);
    active.username = Set(update.username);
    active.updated_at = Set(Utc::now());

    if let Some(password) = update.new_password {
        let password_hash = hash(&password, DEFAULT_COST)
            .map_err(|e| AppError::PasswordHashingError(e.to_string()))?;
        active.password_hash = Set(password_hash);
    }

    if !commit {
        return Ok(active.try_into_model()?);
    }

    let saved = active.update(pool).await.map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("Username is already taken.".to_string())
        } else {
            AppError::from(e)
        }
    })?;
    info!(user_id, "User profile updated.");
    Ok(saved)
}

fn is_unique_violation(err: &DbErr) -> bool {
    match err {
        DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::Database(e)))
        | DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Database(e))) => e.is_unique_violation(),
        _ => false,
    }
}
