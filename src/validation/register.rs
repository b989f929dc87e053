use serde::{Deserialize, Serialize};

use super::{
    FieldErrors, PasswordPolicy, UserAttributes, ValidationError, email, is_email, is_username,
    max_length, required,
};
use crate::db::services::UserDirectory;
use crate::locale;

/// Raw registration submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password1: String,
    #[serde(skip_serializing)]
    pub password2: String,
}

/// A registration that passed every rule; the password is still plain text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
    pub password: String,
}

/// Checks a registration. Email and username must not belong to any
/// existing user.
pub async fn validate_registration<D>(
    form: &RegisterForm,
    directory: &D,
    policy: &PasswordPolicy,
) -> Result<NewUser, ValidationError>
where
    D: UserDirectory + ?Sized,
{
    let mut errors = FieldErrors::new();

    let first_name = required(&mut errors, "first_name", &form.first_name);
    max_length(&mut errors, "first_name", first_name, 150);
    let last_name = required(&mut errors, "last_name", &form.last_name);
    max_length(&mut errors, "last_name", last_name, 150);

    let email_value = required(&mut errors, "email", &form.email);
    max_length(&mut errors, "email", email_value, 254);
    email(&mut errors, "email", email_value);
    if is_email(email_value) && directory.email_in_use(email_value).await? {
        errors.add("email", t!("user.email_taken", locale = locale::current()));
    }

    let username = required(&mut errors, "username", &form.username);
    max_length(&mut errors, "username", username, 150);
    if !username.is_empty() {
        if !is_username(username) {
            errors.add("username", t!("user.invalid_username", locale = locale::current()));
        } else if directory.username_in_use(username).await? {
            errors.add("username", t!("user.username_taken", locale = locale::current()));
        }
    }

    // Passwords are taken verbatim, surrounding whitespace included.
    if form.password1.is_empty() {
        errors.add("password1", t!("validation.required", locale = locale::current()));
    }
    if form.password2.is_empty() {
        errors.add("password2", t!("validation.required", locale = locale::current()));
    } else if !form.password1.is_empty() && form.password1 != form.password2 {
        errors.add("password2", t!("user.password_mismatch", locale = locale::current()));
    } else if !form.password1.is_empty() {
        let attributes = UserAttributes {
            username,
            first_name,
            last_name,
            email: email_value,
        };
        errors.extend("password2", policy.check(&form.password2, &attributes));
    }

    Ok(errors.into_result(NewUser {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: email_value.to_string(),
        username: username.to_string(),
        password: form.password1.clone(),
    })?)
}
