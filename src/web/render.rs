use axum::response::Html;
use rust_embed::RustEmbed;
use std::collections::HashMap;
use tera::{Context, Tera, Value};

use crate::locale;
use crate::web::{error::AppError, models::AuthenticatedUser};

#[derive(RustEmbed, Clone)]
#[folder = "templates/"]
pub struct Templates;

/// Builds the template engine from the embedded `templates/` folder.
pub fn load_templates() -> Result<Tera, AppError> {
    let mut sources = Vec::new();
    for name in Templates::iter() {
        let Some(file) = Templates::get(&name) else {
            continue;
        };
        let body = String::from_utf8(file.data.into_owned())
            .map_err(|e| AppError::TemplateError(format!("{name} is not UTF-8: {e}")))?;
        sources.push((name.to_string(), body));
    }

    let mut tera = Tera::default();
    tera.add_raw_templates(sources)?;
    tera.register_function("t", translate);
    Ok(tera)
}

/// `{{ t(key="page.search") }}` in templates, resolved in the current locale.
fn translate(args: &HashMap<String, Value>) -> tera::Result<Value> {
    let key = args
        .get("key")
        .and_then(Value::as_str)
        .ok_or_else(|| tera::Error::msg("t() needs a string `key` argument"))?;
    Ok(Value::String(t!(key, locale = locale::current()).into_owned()))
}

/// Context shared by every page.
pub fn page_context(site_title: &str, current_user: Option<&AuthenticatedUser>) -> Context {
    let mut context = Context::new();
    context.insert("site_title", site_title);
    context.insert("current_user", &current_user);
    context
}

pub fn render(tera: &Tera, template: &str, context: &Context) -> Result<Html<String>, AppError> {
    Ok(Html(tera.render(template, context)?))
}
