use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod error;
pub mod extract;
pub mod handlers;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use extract::JsonBody;
pub use state::AppState;

pub async fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/api/extract-keywords", post(handlers::extract_keywords))
        .route("/api/patent/extract-keywords", post(handlers::extract_keywords))
        .route("/api/patent/generate", post(handlers::generate_patent))
        .route("/api/patent/search", post(handlers::search_patents))
        .route("/api/patent/detail", post(handlers::patent_detail))
        .route("/api/patent/summary", post(handlers::summarize_draft))
        .route("/api/patent/save", post(handlers::save_patent))
        .route("/api/patent/saved", get(handlers::list_saved))
        .route(
            "/api/patent/saved/:id",
            get(handlers::get_saved).delete(handlers::delete_saved),
        )
        .route("/api/patent/reload", get(handlers::reload_patents))
        .route("/api/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

pub mod prelude {
    pub use pd_core::{Error, Result};
    pub use crate::{create_app, AppState};
}
