use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use rust_prospect_api::api::handlers::{self, AppState};
use rust_prospect_api::config::Config;
use rust_prospect_api::integrations::gateway_client::GatewayProvider;
use rust_prospect_api::integrations::validation::BasicValidationProvider;
use rust_prospect_api::providers::{ProviderRegistry, UnavailableProvider};
use rust_prospect_api::stages::ProviderKind;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const GATEWAY_PROVIDERS: [ProviderKind; 6] = [
    ProviderKind::Hunter,
    ProviderKind::Cobalt,
    ProviderKind::BusinessLicense,
    ProviderKind::PeopleDataLabs,
    ProviderKind::NeverBounce,
    ProviderKind::Apollo,
];

/// Serves the hand-written OpenAPI document.
async fn serve_openapi_spec() -> impl IntoResponse {
    match tokio::fs::read_to_string("openapi.yml").await {
        Ok(content) => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/yaml")],
            content,
        )
            .into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "OpenAPI spec not found").into_response(),
    }
}

/// Serves the Swagger UI HTML page pointing at `/api-docs/openapi.yml`.
async fn serve_swagger_ui() -> impl IntoResponse {
    let html = r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Rust Prospect API - Swagger UI</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css">
    <style>
        body { margin: 0; padding: 0; }
    </style>
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-standalone-preset.js"></script>
    <script>
        window.onload = function() {
            window.ui = SwaggerUIBundle({
                url: "/api-docs/openapi.yml",
                dom_id: '#swagger-ui',
                deepLinking: true,
                presets: [
                    SwaggerUIBundle.presets.apis,
                    SwaggerUIStandalonePreset
                ],
                layout: "StandaloneLayout"
            });
        };
    </script>
</body>
</html>
"#;
    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/html; charset=utf-8")],
        html,
    )
}

/// Registers the gateway-backed providers plus the local ones.
///
/// A gateway client that fails to build is left out; its stages are then
/// reported as skipped "(not configured)".
fn build_registry(config: &Config) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new()
        .with(Arc::new(BasicValidationProvider))
        .with(Arc::new(UnavailableProvider::new(
            "chamber",
            ProviderKind::Chamber,
        )))
        .with(Arc::new(UnavailableProvider::new(
            "trade association",
            ProviderKind::TradeAssociation,
        )));

    for kind in GATEWAY_PROVIDERS {
        match GatewayProvider::new(
            kind,
            config.provider_gateway_url.clone(),
            config.provider_gateway_token.clone(),
            config.provider_timeout(),
        ) {
            Ok(provider) => {
                tracing::info!("✓ Provider {:?} initialized", kind);
                registry.register(Arc::new(provider));
            }
            Err(e) => tracing::error!("❌ Failed to initialize provider {:?}: {}", kind, e),
        }
    }

    registry
}

/// Main entry point for the application.
///
/// Initializes tracing, loads configuration, wires the provider registry,
/// caches, executor and scheduler, then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_prospect_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    let registry = build_registry(&config);
    tracing::info!("Provider registry ready ({} providers)", registry.len());

    let app_state = Arc::new(AppState::new(config.clone(), registry));
    tracing::info!(
        "Caches initialized (capacity {}, classification TTL {}s)",
        config.cache_max_capacity,
        config.classification_cache_ttl_secs
    );

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("invalid rate limiter configuration"))?,
    );

    let protected_routes = Router::new()
        // API Documentation
        .route("/docs", get(serve_swagger_ui))
        .route("/api-docs/openapi.yml", get(serve_openapi_spec))
        // Enrichment endpoints
        .route("/api/v1/enrich", post(handlers::enrich))
        .route("/api/v1/enrich/batch", post(handlers::enrich_batch))
        .route("/api/v1/classify", get(handlers::classify))
        .layer(
            ServiceBuilder::new()
                // Request size limit: 5MB max payload
                .layer(RequestBodyLimitLayer::new(5 * 1024 * 1024))
                // Rate limiting: 10 req/sec per IP, burst of 20
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Health check bypasses rate limiting
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
