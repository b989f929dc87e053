//! Input validation for submitted forms.
//!
//! Each form is checked by a plain function that runs independent field
//! rules and cross-field rules into a [`FieldErrors`] accumulator. A form
//! either yields its cleaned value or the full set of field-scoped errors,
//! so the page can be re-rendered with every message at once.

use sea_orm::DbErr;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use validator::ValidateEmail;

use crate::locale;

pub mod contact;
pub mod password;
pub mod profile;
pub mod register;

pub use contact::{ContactForm, ValidContact, validate_contact};
pub use password::{PasswordPolicy, UserAttributes};
pub use profile::{ProfileForm, ProfileUpdate, validate_profile_update};
pub use register::{NewUser, RegisterForm, validate_registration};

/// Field name -> localized messages, in field-name order.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn extend(&mut self, field: &str, messages: impl IntoIterator<Item = String>) {
        for message in messages {
            self.add(field, message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Hands back `value` only when no rule failed.
    pub fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("submitted data is invalid")]
    Invalid(FieldErrors),
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<FieldErrors> for ValidationError {
    fn from(errors: FieldErrors) -> Self {
        ValidationError::Invalid(errors)
    }
}

// --- Shared field rules ---

/// Trims the value and records a "required" error when nothing is left.
pub(crate) fn required<'a>(errors: &mut FieldErrors, field: &str, value: &'a str) -> &'a str {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, t!("validation.required", locale = locale::current()));
    }
    value
}

pub(crate) fn max_length(errors: &mut FieldErrors, field: &str, value: &str, max: usize) {
    let length = value.chars().count();
    if length > max {
        errors.add(
            field,
            t!("validation.max_length", locale = locale::current(), max = max, length = length),
        );
    }
}

pub(crate) fn min_length(errors: &mut FieldErrors, field: &str, value: &str, min: usize) {
    let length = value.chars().count();
    if !value.is_empty() && length < min {
        errors.add(
            field,
            t!("validation.min_length", locale = locale::current(), min = min, length = length),
        );
    }
}

/// HTML5 address shape with a dot-atom local part (no leading, trailing or
/// doubled dots).
pub(crate) fn is_email(value: &str) -> bool {
    if !value.validate_email() {
        return false;
    }
    match value.rsplit_once('@') {
        Some((local, _)) => !local.split('.').any(str::is_empty),
        None => false,
    }
}

pub(crate) fn email(errors: &mut FieldErrors, field: &str, value: &str) {
    if !value.is_empty() && !is_email(value) {
        errors.add(field, t!("validation.invalid_email", locale = locale::current()));
    }
}

/// Letters, digits and `@ . + - _` only.
pub(crate) fn is_username(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}
