pub mod analysis;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api` route tree.
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(analysis::router())
}

/// Build the routes that live outside `/api` (health, fixed-input FFT run).
pub fn root_routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(analysis::root_router())
}
