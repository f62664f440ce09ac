//! HTTP server: shared state, router assembly and the serve loop.

use std::sync::Arc;

use axum::Router;
use chrono::{NaiveDate, NaiveDateTime};
use chrono_tz::Tz;
use salon_adapters::MailAdapter;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::api;
use crate::auth::{auth_routes, TokenService};
use crate::config::{AppConfig, ConfigError};
use crate::database::Database;
use crate::middleware;
use crate::utils::local_now;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<AppConfig>,
    pub mailer: Arc<dyn MailAdapter>,
    pub tokens: Arc<TokenService>,
    pub tz: Tz,
}

impl AppState {
    pub fn new(config: AppConfig, db: Database, mailer: Arc<dyn MailAdapter>) -> Result<Self, ConfigError> {
        let tz = config.booking.tz()?;
        Ok(Self {
            tokens: Arc::new(TokenService::new(&config.auth)),
            config: Arc::new(config),
            db,
            mailer,
            tz,
        })
    }

    /// Wall-clock time at the salon.
    pub fn now(&self) -> NaiveDateTime {
        local_now(self.tz)
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .nest("/auth", auth_routes())
        .merge(api::catalog::routes())
        .merge(api::user::routes())
        .merge(api::booking::routes())
        .merge(api::shop::routes())
        .nest("/admin", api::admin::routes());

    let server_config = state.config.server.clone();
    let app = Router::new().nest("/api", api).with_state(state);
    middleware::apply(app, &server_config)
}

/// Run the HTTP server until Ctrl-C.
pub async fn run(state: AppState) -> std::io::Result<()> {
    let addr = state.config.server.bind_addr.clone();
    let app = router(state);

    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down"),
        Err(err) => {
            warn!("Cannot listen for Ctrl-C, running until killed: {}", err);
            std::future::pending::<()>().await
        }
    }
}
