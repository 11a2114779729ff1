//! # Tagbox Binary
//!
//! The entry point that assembles the application based on compile-time features.

use actix_web::{web, App, HttpServer};
use std::sync::Arc;
use tb_api::handlers::AppState;
use tb_api::{configure_routes, middleware};

// Feature-gated imports: This is the "Compiled-to-Order" magic
#[cfg(feature = "db-sqlite")]
use tb_db_sqlite::SqliteStore;

#[cfg(feature = "storage-local")]
use tb_storage_local::LocalMediaStore;

#[cfg(feature = "tagger-http")]
use tb_tagger_http::HttpTagSuggester;

#[cfg(feature = "auth-simple")]
use tb_auth_simple::SimpleIdentityProvider;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let bind = env_or("TAGBOX_BIND", "127.0.0.1:8080");

    // 1. Initialize Database Implementation
    #[cfg(feature = "db-sqlite")]
    let store = Arc::new(
        SqliteStore::new(&env_or("TAGBOX_DB_URL", "sqlite:tagbox.db?mode=rwc"))
            .await
            .expect("Failed to init SQLite"),
    );

    // 2. Initialize Storage Implementation
    #[cfg(feature = "storage-local")]
    let media = Arc::new(LocalMediaStore::new(
        env_or("TAGBOX_MEDIA_ROOT", "./data/uploads").into(),
        env_or("TAGBOX_MEDIA_URL_PREFIX", "/static/uploads"),
    ));

    // 3. Initialize Tagging Implementation
    #[cfg(feature = "tagger-http")]
    let tagger = Arc::new(HttpTagSuggester::new(env_or(
        "TAGBOX_TAGGER_URL",
        "http://127.0.0.1:9000/tags",
    )));

    // 4. Initialize Identity Implementation
    #[cfg(feature = "auth-simple")]
    let auth = Arc::new(SimpleIdentityProvider::new(&env_or(
        "TAGBOX_SESSION_SALT",
        "dev-only-salt",
    )));

    // 5. Wrap in AppState (dynamic dispatch; the SQLite plugin serves two ports)
    let state = web::Data::new(AppState {
        posts: store.clone(),
        tags: store,
        media,
        tagger,
        auth,
    });

    log::info!("tagbox starting on http://{bind}");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::standard_middleware())
            .wrap(middleware::cors_policy())
            .configure(configure_routes)
    })
    .bind(bind)?
    .run()
    .await
}
