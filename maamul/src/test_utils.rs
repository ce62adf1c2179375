//! Test utilities: configuration, in-memory app state, fixtures and session headers.

use std::sync::Arc;

use axum_test::TestServer;

use crate::{
    AppState, Application,
    api::models::users::Role,
    auth::{current_user::CurrentSession, session},
    config::{Config, DatabaseConfig, PasswordConfig},
    db::{
        MemoryStore,
        handlers::{CompanyRepository, Store, UserRepository},
        models::{
            companies::{Company, CompanyCreate},
            users::{UserCreateDBRequest, UserDBResponse},
        },
    },
    limits::Limiters,
};

/// Password given to every user created by [`create_test_user`].
pub const TEST_PASSWORD: &str = "test-password-123";

pub fn create_test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        database: DatabaseConfig::Memory,
        secret_key: Some("test-secret-key-for-testing-only".to_string()),
        enable_metrics: false,
        enable_otel_export: false,
        auth: crate::config::AuthConfig {
            allow_registration: true,
            password: PasswordConfig {
                // Fast hashing keeps the suite quick
                argon2_memory_kib: 1024,
                argon2_iterations: 1,
                argon2_parallelism: 1,
                ..Default::default()
            },
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn create_test_state() -> AppState {
    create_test_state_with_config(create_test_config())
}

pub fn create_test_state_with_config(config: Config) -> AppState {
    AppState::builder()
        .store(Arc::new(MemoryStore::new()))
        .limiters(Limiters::new(&config.auth))
        .config(config)
        .build()
}

/// Full application router on a fresh in-memory store.
///
/// The returned state shares the server's store, so fixtures created through it are visible to
/// requests.
pub async fn create_test_app() -> (TestServer, AppState) {
    create_test_app_with_config(create_test_config()).await
}

pub async fn create_test_app_with_config(config: Config) -> (TestServer, AppState) {
    let state = create_test_state_with_config(config.clone());
    let app = Application::new_with_store(config, state.store.clone())
        .await
        .expect("Failed to create application");
    (app.into_test_server(), state)
}

/// A company and its administrator, created directly on `store`.
pub async fn seed_company(store: &dyn Store, name: &str) -> (Company, UserDBResponse) {
    let admin = UserCreateDBRequest {
        company_id: None,
        email: format!("owner-{}@example.com", uuid::Uuid::new_v4()),
        name: format!("{name} owner"),
        role: Role::Admin,
        password_hash: None,
    };
    let company = CompanyCreate {
        name: name.to_string(),
        phone: None,
        address: None,
    };
    store
        .create_company_with_admin(&company, &admin)
        .await
        .expect("Failed to create test company")
}

pub async fn create_test_company(state: &AppState, name: &str) -> Company {
    seed_company(state.store.as_ref(), name).await.0
}

pub async fn create_test_user(state: &AppState, company_id: Option<crate::types::CompanyId>, role: Role) -> UserDBResponse {
    let password_hash = crate::auth::password::hash_string_with_params(
        TEST_PASSWORD,
        Some(state.config.auth.password.argon2_params()),
    )
    .expect("Failed to hash test password");
    let request = UserCreateDBRequest {
        company_id,
        email: format!("user-{}@example.com", uuid::Uuid::new_v4()),
        name: "Test User".to_string(),
        role,
        password_hash: Some(password_hash),
    };
    state.store.create_user(&request).await.expect("Failed to create test user")
}

pub fn session_token_for(state: &AppState, user: &UserDBResponse) -> String {
    let session = CurrentSession {
        id: user.id,
        company_id: user.company_id,
        role: user.role,
        email: user.email.clone(),
    };
    session::create_session_token(&session, &state.config).expect("Failed to create session token")
}

/// `Cookie` header carrying a session for `user`, as accepted by `add_header`.
pub fn auth_cookie(state: &AppState, user: &UserDBResponse) -> (String, String) {
    (
        "cookie".to_string(),
        format!("{}={}", state.config.auth.session.cookie_name, session_token_for(state, user)),
    )
}
