//! Out-of-band commands: database check, password reset and model listing.
//!
//! Each runs once from the command line (see [`crate::config::Command`]) and exits.

use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use url::Url;

use crate::{
    auth::password,
    config::Config,
    db::{self, handlers::Store},
};

/// Connect to the configured store and time a round trip.
#[instrument(skip_all)]
pub async fn check_database(config: &Config) -> anyhow::Result<Duration> {
    let store = db::connect(config).await.context("connect to database")?;
    ping(store.as_ref()).await
}

pub(crate) async fn ping(store: &dyn Store) -> anyhow::Result<Duration> {
    let started = Instant::now();
    store.ping().await.context("ping database")?;
    let latency = started.elapsed();
    info!(latency_ms = latency.as_millis() as u64, "Database reachable");
    Ok(latency)
}

/// Set a new password for `email`. Returns the generated password when none was given.
#[instrument(skip(config, password), fields(email = %email))]
pub async fn reset_password(config: &Config, email: &str, password: Option<String>) -> anyhow::Result<Option<String>> {
    let store = db::connect(config).await.context("connect to database")?;
    reset_password_in(store.as_ref(), config, email, password).await
}

pub(crate) async fn reset_password_in(
    store: &dyn Store,
    config: &Config,
    email: &str,
    new_password: Option<String>,
) -> anyhow::Result<Option<String>> {
    let Some(user) = store.get_user_by_email(email).await? else {
        bail!("no user with email {email}");
    };

    let (plaintext, generated) = match new_password {
        Some(given) => {
            config.auth.password.check_length(&given)?;
            (given, false)
        }
        None => (password::generate_temporary_password(), true),
    };

    let hash = password::hash_password(plaintext.clone(), config.auth.password.argon2_params()).await?;
    if !store.set_password_hash(user.id, &hash).await? {
        bail!("user {email} disappeared while resetting the password");
    }
    info!("Password reset for {}", user.email);

    Ok(generated.then_some(plaintext))
}

/// A model as reported by the Generative Language API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelsPage {
    #[serde(default)]
    models: Vec<ModelInfo>,
    next_page_token: Option<String>,
}

fn http_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    // Already installed by main; tests and library callers may not have done so
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("build HTTP client")
}

/// List every model visible to `GOOGLE_API_KEY`, following pagination.
#[instrument(skip_all, fields(base_url = %config.models.base_url))]
pub async fn list_models(config: &Config) -> anyhow::Result<Vec<ModelInfo>> {
    let Some(api_key) = config.google_api_key.as_deref().filter(|key| !key.is_empty()) else {
        bail!("GOOGLE_API_KEY is not set");
    };
    let client = http_client(config.models.timeout)?;
    let url = format!("{}/v1beta/models", config.models.base_url.trim_end_matches('/'));

    let mut models = Vec::new();
    let mut page_token: Option<String> = None;
    loop {
        let mut query = vec![("key", api_key.to_string())];
        if let Some(token) = &page_token {
            query.push(("pageToken", token.clone()));
        }
        let request_url = Url::parse_with_params(&url, &query).context("build model list URL")?;
        let response = client.get(request_url).send().await.context("request model list")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("model list request failed with {status}: {body}");
        }
        let page: ModelsPage = response.json().await.context("decode model list")?;
        models.extend(page.models);

        match page.next_page_token.filter(|token| !token.is_empty()) {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    info!(count = models.len(), "Listed models");
    Ok(models)
}
