//! DeepCut HTTP surface.
//!
//! Routes:
//! - `POST /api/research`: stream a research run as server-sent events
//! - `GET /api/cron/daily-idea`: secret-guarded automated run, optional email digest
//! - `GET /api/ideas`, `GET|DELETE /api/ideas/{id}`: stored ideas
//! - `GET /health`

pub mod error;
mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use deepcut_core::{Pipeline, RunOutcome};
use deepcut_generation::{GenerationClient, OpenAiClient};
use deepcut_notify::{EmailMessage, Notifier, ResendNotifier, build_email_html, digest_subject};
use deepcut_shared::{AppConfig, Result, Secrets, expand_home};
use deepcut_storage::{IdeaStore, Storage};

/// Sends the daily digest to the configured recipients.
#[derive(Clone)]
pub struct Mailer {
    notifier: Arc<dyn Notifier>,
    from: String,
    to: Vec<String>,
}

impl Mailer {
    pub fn new(notifier: Arc<dyn Notifier>, from: impl Into<String>, to: Vec<String>) -> Self {
        Self {
            notifier,
            from: from.into(),
            to,
        }
    }

    pub async fn send_digest(&self, outcome: &RunOutcome) -> Result<()> {
        let message = EmailMessage {
            from: self.from.clone(),
            to: self.to.clone(),
            subject: digest_subject(&outcome.top_title()),
            html: build_email_html(&outcome.topic, &outcome.package),
        };
        self.notifier.send(&message).await
    }
}

/// Build the digest mailer when an email API key and recipients are configured.
pub fn mailer_from_config(config: &AppConfig, secrets: &Secrets) -> Result<Option<Mailer>> {
    match (&secrets.email_api_key, config.email.to.is_empty()) {
        (Some(key), false) => {
            let notifier = ResendNotifier::new(&config.email, key.clone())?;
            Ok(Some(Mailer::new(
                Arc::new(notifier),
                config.email.from.clone(),
                config.email.to.clone(),
            )))
        }
        (Some(_), true) => {
            warn!("email API key set but no recipients configured, digest disabled");
            Ok(None)
        }
        (None, _) => Ok(None),
    }
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pipeline: Pipeline,
    store: Arc<dyn IdeaStore>,
    cron_secret: Option<String>,
    mailer: Option<Mailer>,
}

impl AppState {
    pub fn new(
        client: Arc<dyn GenerationClient>,
        store: Arc<dyn IdeaStore>,
        cron_secret: Option<String>,
        mailer: Option<Mailer>,
    ) -> Self {
        Self {
            pipeline: Pipeline::new(client, store.clone()),
            store,
            cron_secret,
            mailer,
        }
    }

    /// Wire up the production collaborators from config and resolved secrets.
    pub async fn from_config(config: &AppConfig, secrets: &Secrets) -> Result<Self> {
        let db_path = expand_home(&config.storage.db_path)?;
        let store: Arc<dyn IdeaStore> = Arc::new(Storage::open(&db_path).await?);
        let client: Arc<dyn GenerationClient> = Arc::new(OpenAiClient::new(
            &config.generation,
            secrets.generation_api_key.clone(),
        )?);

        let mailer = mailer_from_config(config, secrets)?;

        Ok(Self::new(client, store, secrets.cron_secret.clone(), mailer))
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/research", post(routes::research))
        .route("/api/cron/daily-idea", get(routes::daily_idea))
        .route("/api/ideas", get(routes::list_ideas))
        .route(
            "/api/ideas/{id}",
            get(routes::get_idea).delete(routes::delete_idea),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(state: AppState, addr: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "deepcut server listening");
    axum::serve(listener, router(state)).await
}
