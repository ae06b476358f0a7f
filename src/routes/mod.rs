use axum::http::HeaderValue;
use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::{auth::AuthenticatedUser, state::AppState};

pub mod auth;
pub mod health;
pub mod processors;
pub mod stages;
pub mod sync_services;
pub mod tenders;
pub mod types;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = if let Some(origins) = state.config.cors_allowed_origin.as_ref() {
        let headers: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|value| {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| {
                    trimmed
                        .parse::<HeaderValue>()
                        .expect("invalid CORS allowed origin")
                })
            })
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(headers))
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    };

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/me", get(auth::me));

    let tenders_routes = Router::new()
        .route("/", get(tenders::list_tenders).post(tenders::create_tender))
        .route(
            "/:id",
            get(tenders::get_tender).patch(tenders::update_tender),
        )
        .route("/:id/stage", patch(tenders::transition_stage))
        .route("/:id/lines", get(tenders::list_tender_lines));

    let types_routes = Router::new().route("/", get(types::list_types).post(types::create_type));

    let stages_routes =
        Router::new().route("/", get(stages::list_stages).post(stages::create_stage));

    let sync_services_routes = Router::new()
        .route(
            "/",
            get(sync_services::list_services).post(sync_services::create_service),
        )
        .route("/:id", patch(sync_services::update_service))
        .route("/:id/run", post(sync_services::run_service))
        .route("/:id/test", post(sync_services::test_service));

    let processors_routes = Router::new()
        .route(
            "/",
            get(processors::list_processors).post(processors::create_processor),
        )
        .route(
            "/:id/emails",
            get(processors::list_emails).post(processors::ingest_email),
        );

    let protected_state = state.clone();
    let protected_routes = Router::new()
        .nest("/api/tenders", tenders_routes)
        .nest("/api/tender-types", types_routes)
        .nest("/api/tender-stages", stages_routes)
        .nest("/api/sync-services", sync_services_routes)
        .nest("/api/processors", processors_routes)
        .layer(middleware::from_extractor_with_state::<AuthenticatedUser, _>(protected_state));

    Router::new()
        .merge(protected_routes)
        .nest("/api/auth", auth_routes)
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(cors)
}
