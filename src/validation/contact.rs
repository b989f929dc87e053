use serde::{Deserialize, Serialize};

use super::{FieldErrors, email, max_length, required};
use crate::db::entities::category;
use crate::locale;

/// Placeholder value that is never accepted as a first name.
pub const BLOCKED_FIRST_NAME: &str = "ABC";

/// Raw contact submission, exactly as posted by the form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactForm {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    pub description: String,
    pub category: String,
    pub picture: String,
}

/// A contact submission that passed every rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidContact {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    pub description: String,
    pub category_id: Option<i32>,
    pub picture: Option<String>,
}

impl ContactForm {
    /// Pre-fills the form from a stored contact.
    pub fn from_model(contact: &crate::db::entities::contact::Model) -> Self {
        Self {
            first_name: contact.first_name.clone(),
            last_name: contact.last_name.clone(),
            phone: contact.phone.clone(),
            email: contact.email.clone(),
            description: contact.description.clone(),
            category: contact
                .category_id
                .map(|id| id.to_string())
                .unwrap_or_default(),
            picture: contact.picture.clone().unwrap_or_default(),
        }
    }
}

/// Checks a contact submission against the known categories.
pub fn validate_contact(
    form: &ContactForm,
    categories: &[category::Model],
) -> Result<ValidContact, FieldErrors> {
    let mut errors = FieldErrors::new();

    let first_name = required(&mut errors, "first_name", &form.first_name);
    max_length(&mut errors, "first_name", first_name, 50);
    if first_name == BLOCKED_FIRST_NAME {
        errors.add("first_name", t!("contact.first_name_blocked", locale = locale::current()));
    }

    let last_name = form.last_name.trim();
    max_length(&mut errors, "last_name", last_name, 50);

    let phone = required(&mut errors, "phone", &form.phone);
    max_length(&mut errors, "phone", phone, 50);

    let email_value = form.email.trim();
    max_length(&mut errors, "email", email_value, 254);
    email(&mut errors, "email", email_value);

    let category_id = clean_category(&mut errors, &form.category, categories);

    // Cross-field rule, independent of the first_name field rules above.
    if !first_name.is_empty() && first_name == last_name {
        errors.add("last_name", t!("contact.names_equal", locale = locale::current()));
    }

    let picture = Some(form.picture.trim())
        .filter(|p| !p.is_empty())
        .map(str::to_string);

    errors.into_result(ValidContact {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        phone: phone.to_string(),
        email: email_value.to_string(),
        description: form.description.trim().to_string(),
        category_id,
        picture,
    })
}

fn clean_category(
    errors: &mut FieldErrors,
    raw: &str,
    categories: &[category::Model],
) -> Option<i32> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<i32>() {
        Ok(id) if categories.iter().any(|c| c.id == id) => Some(id),
        _ => {
            errors.add("category", t!("validation.invalid_choice", locale = locale::current()));
            None
        }
    }
}
