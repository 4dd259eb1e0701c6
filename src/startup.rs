//! Application Startup
//!
//! Application building and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;

use crate::application::services::{
    TypingService, TypingServiceImpl, VoiceService, VoiceServiceImpl,
};
use crate::config::Settings;
use crate::infrastructure::platform::{HttpMessageSender, MessageSender};
use crate::infrastructure::registry::ConnectionRegistry;
use crate::presentation::http::{handlers::health, routes};
use crate::presentation::middleware::{cors, logging};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ConnectionRegistry>,
    pub typing: Arc<dyn TypingService>,
    pub voice: Arc<dyn VoiceService>,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Wire the services around a fresh registry.
    ///
    /// The message sender is injected so tests can substitute the platform.
    pub fn new(settings: Settings, sender: Arc<dyn MessageSender>) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let typing = Arc::new(TypingServiceImpl::new(
            registry.clone(),
            sender,
            settings.typing.clone(),
        ));
        let voice = Arc::new(VoiceServiceImpl::new(registry.clone(), &settings));

        Self {
            registry,
            typing,
            voice,
            settings: Arc::new(settings),
        }
    }
}

/// Build the full router with middleware applied
pub fn build_router(state: AppState) -> Router {
    let cors_layer = cors::create_cors_layer(&state.settings.cors);
    routes::create_router(state)
        .layer(logging::create_trace_layer())
        .layer(cors_layer)
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        health::init_server_start();

        let sender = Arc::new(HttpMessageSender::new(&settings.platform)?);
        tracing::info!(api_base = %settings.platform.api_base, "Platform client created");

        let addr = settings.server_addr();
        let retention = settings.registry.retention();
        let sweep_interval = settings.registry.sweep_interval();

        let state = AppState::new(settings, sender);
        state.registry.spawn_sweeper(retention, sweep_interval);
        tracing::info!(
            retention_secs = retention.as_secs(),
            sweep_interval_secs = sweep_interval.as_secs(),
            "Registry sweeper started"
        );

        let router = build_router(state);

        let listener = TcpListener::bind(&addr).await?;
        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self { listener, router })
    }

    /// Run the server until stopped
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(self.listener, self.router).await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}
