pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod exam;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod stores;
pub(crate) mod tasks;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use crate::core::{config::Settings, state::AppState, telemetry};
use crate::services::execution::ExecutionClient;
use crate::stores::rest::DocumentStoreClient;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let store = Arc::new(DocumentStoreClient::from_settings(&settings)?);
    let executor = Arc::new(ExecutionClient::from_settings(&settings)?);
    let state = AppState::new(settings, store.clone(), store.clone(), store, executor);

    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        "CodeXam API listening"
    );

    axum::serve(listener, app).with_graceful_shutdown(core::shutdown::shutdown_signal()).await?;

    Ok(())
}
