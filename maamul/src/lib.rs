//! # maamul: multi-tenant business management backend
//!
//! `maamul` serves the JSON API behind a small-business management app: accounting (accounts and
//! income/expense transactions), manufacturing (bills of materials and raw-material purchases),
//! shop vendors, projects and Telegram chat links. Every business record belongs to exactly one
//! company, and every request acts inside the company of the signed-in user.
//!
//! ## Request flow
//!
//! A request to a tenant route is handled in three steps:
//!
//! 1. The session is resolved from the `maamul_session` cookie (or a Bearer session token) into
//!    a user id, company id and role. No session, or a session without a company, is answered
//!    with 401. A role outside the route's gate is answered with 403.
//! 2. Exactly one storage operation runs, always filtered by the session's company id. A row
//!    owned by another company is indistinguishable from a row that does not exist.
//! 3. The result is wrapped in the `{ success, message, data }` envelope.
//!
//! Errors are caught in one place ([`errors::Error`]), logged, and rendered into the same
//! envelope. Internal failures never leak details and are answered with a generic 500.
//!
//! ## Components
//!
//! - [`api`]: route handlers, request/response models and the response envelope
//! - [`auth`]: password hashing, session tokens, extractors and role gates
//! - [`db`]: the [`Store`](db::handlers::Store) abstraction with PostgreSQL and in-memory backends
//! - [`limits`]: login throttling per client address
//! - [`maintenance`]: out-of-band commands (database check, password reset, model listing)
//!
//! ## Configuration
//!
//! See [`config`]. Settings come from a YAML file merged with `MAAMUL_`-prefixed environment
//! variables; `DATABASE_URL` and `GOOGLE_API_KEY` are read as-is.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod limits;
pub mod maintenance;
pub mod telemetry;
pub mod types;

#[cfg(test)]
pub mod test_utils;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    http::{self, HeaderValue},
    routing::get,
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};

use crate::{
    api::models::users::Role,
    auth::password,
    config::{BootstrapConfig, CorsOrigin},
    db::{
        handlers::{CompanyRepository, Store, UserRepository},
        models::{companies::CompanyCreate, users::UserCreateDBRequest},
    },
    limits::Limiters,
};

pub use config::Config;
pub use db::migrator;

/// Application state shared across all request handlers.
///
/// ```ignore
/// let state = AppState::builder()
///     .store(store)
///     .config(config)
///     .limiters(limiters)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Config,
    #[builder(default)]
    pub limiters: Limiters,
}

/// Create the configured company and administrator unless the admin already exists.
#[instrument(skip_all, fields(admin = %bootstrap.admin_email))]
pub async fn bootstrap(store: &dyn Store, bootstrap: &BootstrapConfig, config: &Config) -> anyhow::Result<()> {
    if store.get_user_by_email(&bootstrap.admin_email).await?.is_some() {
        debug!("Bootstrap admin already exists");
        return Ok(());
    }

    let password_hash =
        password::hash_password(bootstrap.admin_password.clone(), config.auth.password.argon2_params()).await?;

    let company = CompanyCreate {
        name: bootstrap.company_name.clone(),
        phone: None,
        address: None,
    };
    let admin = UserCreateDBRequest {
        company_id: None,
        email: bootstrap.admin_email.clone(),
        name: "Administrator".to_string(),
        role: Role::Admin,
        password_hash: Some(password_hash),
    };
    let (company, _) = store.create_company_with_admin(&company, &admin).await?;
    info!("Created company '{}' with administrator {}", company.name, bootstrap.admin_email);
    Ok(())
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.auth.security.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            CorsOrigin::Url(url) => url.as_str().trim_end_matches('/').parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            http::Method::GET,
            http::Method::POST,
            http::Method::PATCH,
            http::Method::DELETE,
        ])
        .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
        .allow_credentials(config.auth.security.cors.allow_credentials)
        .expose_headers(vec![http::header::LOCATION]);

    if let Some(max_age) = config.auth.security.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router: API routes, site routes, optional metrics, CORS and tracing.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let router = Router::new()
        .merge(api::handlers::site::routes())
        .merge(api::handlers::auth::routes())
        .merge(api::handlers::two_factor::routes())
        .merge(api::handlers::companies::routes())
        .merge(api::handlers::users::routes())
        .merge(api::handlers::tenant_routes())
        .merge(api::handlers::audit_logs::routes())
        .merge(api::handlers::reports::routes())
        .with_state(state.clone());

    let mut router = router.layer(create_cors_layer(&state.config)?);

    if state.config.enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// 1. **Create**: [`Application::new`] connects the store, runs migrations and bootstraps the
///    configured company
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and handles requests until the
///    shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting maamul with configuration: {:#?}", config);
        let store = db::connect(&config).await?;
        Self::new_with_store(config, store).await
    }

    /// Like [`Application::new`] but with an already constructed store.
    pub async fn new_with_store(config: Config, store: Arc<dyn Store>) -> anyhow::Result<Self> {
        if let Some(bootstrap_config) = &config.bootstrap {
            bootstrap(store.as_ref(), bootstrap_config, &config).await?;
        }

        let state = AppState::builder()
            .store(store)
            .config(config.clone())
            .limiters(Limiters::new(&config.auth))
            .build();
        let router = build_router(&state)?;

        Ok(Self { router, config })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "maamul listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
