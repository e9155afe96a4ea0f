// Route definitions

use axum::{Router, extract::FromRef, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::{config::Settings, progress::ProgressSink, taf_api::TafClient};

mod api;

// Shared state handed to every handler
#[derive(Clone, FromRef)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub client: Arc<TafClient>,
    pub progress: Arc<dyn ProgressSink>,
}

pub fn create_router(app_state: AppState) -> Router {
    let api_router = Router::new()
        .route("/export", get(api::export_csv))
        .with_state(app_state.clone());

    Router::new()
        .route("/health", get(api::health))
        .nest("/api", api_router)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
