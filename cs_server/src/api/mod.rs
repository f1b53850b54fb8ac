//! HTTP API for the tournament server.
//!
//! Handlers translate requests into [`TournamentManager`] calls and map core
//! errors onto status codes ([`error`]). Identity comes from a bearer token
//! verified by [`middleware::auth_middleware`].
//!
//! # Endpoints
//!
//! ```text
//! GET    /health                                            public
//! GET    /api/v1/tournaments[?status=]                      public
//! GET    /api/v1/tournaments/{id}                           public
//! GET    /api/v1/tournaments/{id}/participants              public
//! GET    /api/v1/tournaments/{id}/matches                   public
//! GET    /api/v1/tournaments/{id}/categories/{cid}/bracket  public
//! GET    /api/v1/tournaments/{id}/eligibility[?partner=]    player
//! POST   /api/v1/tournaments/{id}/registrations             player
//! DELETE /api/v1/participants/{id}                          player (member) or admin
//! POST   /api/v1/tournaments                                admin
//! POST   /api/v1/tournaments/{id}/open                      admin
//! POST   /api/v1/tournaments/{id}/registrations/bulk        admin
//! POST   /api/v1/tournaments/{id}/close                     admin
//! POST   /api/v1/tournaments/{id}/schedule                  admin
//! POST   /api/v1/tournaments/{id}/start                     admin
//! POST   /api/v1/tournaments/{id}/cancel                    admin
//! POST   /api/v1/matches/{id}/start                         admin
//! POST   /api/v1/matches/{id}/result                        admin
//! POST   /api/v1/matches/{id}/walkover                      admin
//! POST   /api/v1/matches/{id}/cancel                        admin
//! GET    /api/v1/templates[?active_only=]                   admin
//! POST   /api/v1/templates                                  admin
//! POST   /api/v1/templates/{id}/active                      admin
//! POST   /api/v1/templates/{id}/generate                    admin
//! ```

pub mod error;
pub mod matches;
pub mod middleware;
pub mod request_id;
pub mod templates;
pub mod tournaments;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{delete, get, post},
};
use courtside::{TournamentManager, auth::TokenVerifier, db::Database};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
///
/// Cloned per request; every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<TournamentManager>,
    pub verifier: Arc<TokenVerifier>,
    /// Present when running against PostgreSQL
    pub database: Option<Database>,
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Example
///
/// ```rust,no_run
/// # use cs_server::api::{create_router, AppState};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// # let state: AppState = unimplemented!();
/// let app = create_router(state);
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    let v1_routes = create_v1_router(state.clone());

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", v1_routes)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn create_v1_router(state: AppState) -> Router<AppState> {
    let public_routes = Router::new()
        .route("/tournaments", get(tournaments::list_tournaments))
        .route("/tournaments/{id}", get(tournaments::get_tournament))
        .route(
            "/tournaments/{id}/participants",
            get(tournaments::list_participants),
        )
        .route("/tournaments/{id}/matches", get(tournaments::list_matches))
        .route(
            "/tournaments/{id}/categories/{category_id}/bracket",
            get(tournaments::get_bracket),
        );

    let player_routes = Router::new()
        .route(
            "/tournaments/{id}/eligibility",
            get(tournaments::check_eligibility),
        )
        .route(
            "/tournaments/{id}/registrations",
            post(tournaments::register),
        )
        .route("/participants/{id}", delete(tournaments::unregister))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    // Layers run outermost first: authenticate, then check the admin flag
    let admin_routes = Router::new()
        .route("/tournaments", post(tournaments::create_tournament))
        .route("/tournaments/{id}/open", post(tournaments::open_registration))
        .route(
            "/tournaments/{id}/registrations/bulk",
            post(tournaments::register_bulk),
        )
        .route(
            "/tournaments/{id}/close",
            post(tournaments::close_registration),
        )
        .route("/tournaments/{id}/schedule", post(tournaments::schedule))
        .route("/tournaments/{id}/start", post(tournaments::start_tournament))
        .route(
            "/tournaments/{id}/cancel",
            post(tournaments::cancel_tournament),
        )
        .route("/matches/{id}/start", post(matches::start_match))
        .route("/matches/{id}/result", post(matches::complete_match))
        .route("/matches/{id}/walkover", post(matches::record_walkover))
        .route("/matches/{id}/cancel", post(matches::cancel_match))
        .route(
            "/templates",
            get(templates::list_templates).post(templates::create_template),
        )
        .route("/templates/{id}/active", post(templates::set_active))
        .route("/templates/{id}/generate", post(templates::generate))
        .layer(axum::middleware::from_fn(middleware::require_admin))
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(player_routes)
        .merge(admin_routes)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the store is reachable, `503 Service Unavailable`
/// otherwise.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (store, db_healthy) = match &state.database {
        Some(db) => ("postgres", db.health_check().await.is_ok()),
        None => ("memory", true),
    };

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "store": store,
        "database": db_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
