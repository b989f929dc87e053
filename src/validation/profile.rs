use serde::{Deserialize, Serialize};

use super::{
    FieldErrors, PasswordPolicy, UserAttributes, ValidationError, email, is_email, is_username,
    max_length, min_length, required,
};
use crate::db::{entities::user, services::UserDirectory};
use crate::locale;

/// Raw profile-update submission. Both password fields may be left blank.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password1: String,
    #[serde(skip_serializing)]
    pub password2: String,
}

impl ProfileForm {
    pub fn from_model(user: &user::Model) -> Self {
        Self {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            username: user.username.clone(),
            ..Self::default()
        }
    }
}

/// A validated profile change. `new_password` is `None` when the password
/// fields were left blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
    pub new_password: Option<String>,
}

/// Checks an edit of `current`. The email and username are only looked up
/// when they differ from the stored values.
pub async fn validate_profile_update<D>(
    form: &ProfileForm,
    current: &user::Model,
    directory: &D,
    policy: &PasswordPolicy,
) -> Result<ProfileUpdate, ValidationError>
where
    D: UserDirectory + ?Sized,
{
    let mut errors = FieldErrors::new();

    let first_name = required(&mut errors, "first_name", &form.first_name);
    if !first_name.is_empty() && first_name.chars().count() < 2 {
        errors.add("first_name", t!("user.first_name_too_short", locale = locale::current()));
    }
    max_length(&mut errors, "first_name", first_name, 30);

    let last_name = required(&mut errors, "last_name", &form.last_name);
    min_length(&mut errors, "last_name", last_name, 2);
    max_length(&mut errors, "last_name", last_name, 30);

    let email_value = required(&mut errors, "email", &form.email);
    max_length(&mut errors, "email", email_value, 254);
    email(&mut errors, "email", email_value);
    if email_value != current.email
        && is_email(email_value)
        && directory.email_in_use(email_value).await?
    {
        errors.add("email", t!("user.email_taken", locale = locale::current()));
    }

    let username = required(&mut errors, "username", &form.username);
    max_length(&mut errors, "username", username, 150);
    if !username.is_empty() {
        if !is_username(username) {
            errors.add("username", t!("user.invalid_username", locale = locale::current()));
        } else if username != current.username && directory.username_in_use(username).await? {
            errors.add("username", t!("user.username_taken", locale = locale::current()));
        }
    }

    let password1 = form.password1.as_str();
    let password2 = form.password2.as_str();
    if !password1.is_empty() {
        let attributes = UserAttributes {
            username,
            first_name,
            last_name,
            email: email_value,
        };
        errors.extend("password1", policy.check(password1, &attributes));
    }
    if (!password1.is_empty() || !password2.is_empty()) && password1 != password2 {
        errors.add("password2", t!("user.password_mismatch", locale = locale::current()));
    }

    Ok(errors.into_result(ProfileUpdate {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: email_value.to_string(),
        username: username.to_string(),
        new_password: Some(password1)
            .filter(|p| !p.is_empty())
            .map(str::to_string),
    })?)
}
