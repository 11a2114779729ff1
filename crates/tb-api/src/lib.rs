//! # tb-api
//!
//! The web routing and orchestration layer for Tagbox.

pub mod error;
pub mod handlers;
pub mod middleware;

use actix_web::web;

/// Configures the routes for the tagging service.
///
/// # Developer Note
/// We use a scoped configuration to allow the main binary to mount
/// the API under different paths if needed (e.g., /api/v1/).
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("")
            .route("/healthz", web::get().to(handlers::healthz))
            // Tag registry
            .route("/tags", web::get().to(handlers::list_tags))
            .route("/tags", web::post().to(handlers::create_tag))
            // Posts
            .route("/posts", web::post().to(handlers::create_post))
            .route("/posts/mine", web::get().to(handlers::my_posts))
            .route("/posts/{id}", web::patch().to(handlers::update_post))
            // Ranked retrieval
            .route("/search", web::post().to(handlers::search))
            .route("/search/text", web::post().to(handlers::search_text))
            // Media lookup
            .route("/media/{media_id}/url", web::get().to(handlers::media_url)),
    );
}
