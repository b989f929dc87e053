//! Message locale of the request being served.
//!
//! The locale lives in a task-local set around each request, so concurrent
//! requests never see each other's language. Code running outside a
//! request scope (startup, tests) gets [`DEFAULT_LOCALE`].

use std::future::Future;

pub const DEFAULT_LOCALE: &str = "en";

tokio::task_local! {
    static REQUEST_LOCALE: &'static str;
}

/// Locale of the current request, or the default outside one.
pub fn current() -> &'static str {
    REQUEST_LOCALE
        .try_with(|locale| *locale)
        .unwrap_or(DEFAULT_LOCALE)
}

/// Runs `fut` with `locale` as the current locale.
pub async fn scope<F: Future>(locale: &'static str, fut: F) -> F::Output {
    REQUEST_LOCALE.scope(locale, fut).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{ContactForm, validate_contact};

    #[tokio::test]
    async fn default_outside_a_request() {
        assert_eq!(current(), "en");
    }

    #[tokio::test]
    async fn scope_sets_and_restores_locale() {
        let inside = scope("pt-BR", async { current() }).await;
        assert_eq!(inside, "pt-BR");
        assert_eq!(current(), "en");
    }

    #[tokio::test]
    async fn validation_messages_follow_scope() {
        let form = ContactForm {
            first_name: "ABC".into(),
            phone: "555".into(),
            ..ContactForm::default()
        };

        let errors = scope("pt-BR", async { validate_contact(&form, &[]).unwrap_err() }).await;
        assert_eq!(errors.get("first_name"), ["Não pode ser ABC"]);

        let errors = validate_contact(&form, &[]).unwrap_err();
        assert_eq!(errors.get("first_name"), ["Cannot be ABC"]);
    }
}
