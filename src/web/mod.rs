use axum::{Router, middleware as axum_middleware, routing::get};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tera::Tera;
use tower_http::trace::TraceLayer;

use crate::server::config::ServerConfig;
use crate::validation::PasswordPolicy;
use crate::web::{
    middleware::{auth, i18n::i18n_middleware},
    routes::*,
};

pub mod error;
pub mod middleware;
pub mod models;
pub mod render;
pub mod routes;

pub use error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DatabaseConnection,
    pub templates: Arc<Tera>,
    pub config: Arc<ServerConfig>,
    pub password_policy: PasswordPolicy,
}

async fn health_check_handler() -> &'static str {
    "OK"
}

pub fn create_axum_router(
    db_pool: DatabaseConnection,
    templates: Arc<Tera>,
    config: Arc<ServerConfig>,
) -> Router {
    let app_state = Arc::new(AppState {
        db_pool,
        templates,
        password_policy: config.password_policy(),
        config,
    });

    let protected = contact_routes::create_owner_router()
        .merge(user_routes::create_account_router())
        .route_layer(axum_middleware::from_fn(auth::auth));

    Router::new()
        .route("/health", get(health_check_handler))
        .merge(contact_routes::create_public_router())
        .merge(user_routes::create_public_router())
        .merge(protected)
        .with_state(app_state.clone())
        .layer(axum_middleware::from_fn(i18n_middleware))
        .layer(axum_middleware::from_fn_with_state(app_state, auth::identify))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{entities::contact, services as db_services, testing::memory_db};
    use crate::web::render::load_templates;
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use chrono::Utc;
    use http_body_util::BodyExt;
    use sea_orm::{ActiveModelTrait, Set};
    use tower::ServiceExt;

    fn test_config() -> Arc<ServerConfig> {
        Arc::new(ServerConfig {
            database_url: "sqlite::memory:".into(),
            listen_addr: "127.0.0.1:0".into(),
            jwt_secret: "test-secret".into(),
            log_dir: "logs".into(),
            password_min_length: 8,
            password_max_similarity: 0.7,
            index_limit: 10,
            cookie_secure: false,
        })
    }

    async fn app(db: &DatabaseConnection) -> Router {
        let templates = Arc::new(load_templates().unwrap());
        create_axum_router(db.clone(), templates, test_config())
    }

    async fn insert_contact(db: &DatabaseConnection, first_name: &str, show: bool) -> contact::Model {
        contact::ActiveModel {
            first_name: Set(first_name.to_string()),
            last_name: Set("Doe".to_string()),
            phone: Set("555-0100".to_string()),
            email: Set(String::new()),
            description: Set(String::new()),
            show: Set(show),
            created_date: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::ACCEPT_LANGUAGE, "en")
            .body(Body::empty())
            .unwrap()
    }

    fn post_form(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::ACCEPT_LANGUAGE, "en")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_check_answers() {
        let db = memory_db().await;
        let response = app(&db).await.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "OK");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_keep_their_own_language() {
        let db = memory_db().await;
        insert_contact(&db, "Visible", true).await;
        let router = app(&db).await;

        let mut handles = Vec::new();
        for i in 0..200 {
            let router = router.clone();
            let language = if i % 2 == 0 { "pt-BR" } else { "en" };
            handles.push(tokio::spawn(async move {
                let request = Request::builder()
                    .uri("/")
                    .header(header::ACCEPT_LANGUAGE, language)
                    .body(Body::empty())
                    .unwrap();
                let response = router.oneshot(request).await.unwrap();
                assert_eq!(response.status(), StatusCode::OK);
                (language, body_text(response).await)
            }));
        }

        for handle in handles {
            let (language, html) = handle.await.unwrap();
            let (expected, other) = match language {
                "pt-BR" => (">Pesquisar</button>", ">Search</button>"),
                _ => (">Search</button>", ">Pesquisar</button>"),
            };
            assert!(html.contains(expected), "{language} page lacks {expected}");
            assert!(!html.contains(other), "{language} page contains {other}");
        }
    }

    #[tokio::test]
    async fn index_lists_only_visible_contacts() {
        let db = memory_db().await;
        insert_contact(&db, "Visible", true).await;
        insert_contact(&db, "Secret", false).await;

        let response = app(&db).await.oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Visible"));
        assert!(!html.contains("Secret"));
    }

    #[tokio::test]
    async fn search_keeps_the_query_in_the_page() {
        let db = memory_db().await;
        insert_contact(&db, "Joe", true).await;
        insert_contact(&db, "Mary", true).await;

        let response = app(&db).await.oneshot(get("/search/?q=%20JOE%20")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("Joe"));
        assert!(!html.contains("Mary"));
        assert!(html.contains("value=\"JOE\""));
    }

    #[tokio::test]
    async fn hidden_contact_detail_is_not_found() {
        let db = memory_db().await;
        let hidden = insert_contact(&db, "Secret", false).await;
        let shown = insert_contact(&db, "Visible", true).await;
        let router = app(&db).await;

        let response = router
            .clone()
            .oneshot(get(&format!("/{}/detail/", hidden.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = router
            .oneshot(get(&format!("/{}/detail/", shown.id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Visible"));
    }

    #[tokio::test]
    async fn protected_pages_redirect_to_login() {
        let db = memory_db().await;
        let router = app(&db).await;

        for uri in ["/contact/create/", "/user/update/"] {
            let response = router.clone().oneshot(get(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(response.headers()[header::LOCATION], "/user/login/");
        }
    }

    #[tokio::test]
    async fn duplicate_email_registration_is_rerendered() {
        let db = memory_db().await;
        db_services::create_user(&db, "joe", "joe@example.com", "Joe", "Doe", "hash")
            .await
            .unwrap();

        let response = app(&db)
            .await
            .oneshot(post_form(
                "/user/create/",
                "first_name=Mary&last_name=Roe&email=joe%40example.com&username=mary\
                 &password1=Kx7%21vRq2%23mPw&password2=Kx7%21vRq2%23mPw",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("errorlist"));
        assert!(html.contains("value=\"mary\""));
    }

    async fn register_and_login(router: &Router, username: &str) -> String {
        let response = router
            .clone()
            .oneshot(post_form(
                "/user/create/",
                &format!(
                    "first_name=Sam&last_name=Roe&email={username}%40example.com&username={username}\
                     &password1=Kx7%21vRq2%23mPw&password2=Kx7%21vRq2%23mPw"
                ),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let response = router
            .clone()
            .oneshot(post_form(
                "/user/login/",
                &format!("username={username}&password=Kx7%21vRq2%23mPw"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    fn with_session(mut request: Request<Body>, session: &str) -> Request<Body> {
        request
            .headers_mut()
            .insert(header::COOKIE, session.parse().unwrap());
        request
    }

    #[tokio::test]
    async fn login_sets_session_cookie_and_unlocks_profile() {
        let db = memory_db().await;
        let router = app(&db).await;

        let session = register_and_login(&router, "joe").await;
        assert!(session.starts_with("token="));

        let response = router
            .oneshot(with_session(get("/user/update/"), &session))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("joe@example.com"));
    }

    #[tokio::test]
    async fn wrong_password_rerenders_login() {
        let db = memory_db().await;
        let router = app(&db).await;
        register_and_login(&router, "joe").await;

        let response = router
            .oneshot(post_form("/user/login/", "username=joe&password=nope"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        assert!(body_text(response).await.contains("errorlist"));
    }

    #[tokio::test]
    async fn contact_form_rejects_blocked_name_and_creates_valid_one() {
        let db = memory_db().await;
        let router = app(&db).await;
        let session = register_and_login(&router, "joe").await;

        let response = router
            .clone()
            .oneshot(with_session(
                post_form("/contact/create/", "first_name=ABC&last_name=ABC&phone=555"),
                &session,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("errorlist"));

        let response = router
            .clone()
            .oneshot(with_session(
                post_form("/contact/create/", "first_name=Ann&last_name=Lee&phone=555"),
                &session,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
        assert!(location.ends_with("/detail/"));

        let response = router.oneshot(get(&location)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("Ann"));
    }

    #[tokio::test]
    async fn only_the_owner_can_edit_a_contact() {
        let db = memory_db().await;
        let router = app(&db).await;
        let owner = register_and_login(&router, "joe").await;
        let stranger = register_and_login(&router, "mary").await;

        let response = router
            .clone()
            .oneshot(with_session(
                post_form("/contact/create/", "first_name=Ann&last_name=Lee&phone=555"),
                &owner,
            ))
            .await
            .unwrap();
        let detail = response.headers()[header::LOCATION].to_str().unwrap().to_string();
        let edit = detail.replace("/detail/", "/update/");

        let response = router
            .clone()
            .oneshot(with_session(get(&edit), &stranger))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = router
            .oneshot(with_session(get(&edit), &owner))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
