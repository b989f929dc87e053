pub mod db;
pub mod locale;
pub mod server;
pub mod services;
pub mod validation;
pub mod version;
pub mod web;

#[macro_use]
extern crate rust_i18n;

// Load all translations from the locales directory
i18n!("locales", fallback = "en");
