//! Wedding invitation HTTP service entry point.
//!
//! Wires configuration, storage, the guest directory, and the HTTP router,
//! then serves the site and the metrics listener until shutdown.
use anyhow::Context;
use invitations::api::types::FeatureFlags;
use invitations::app::{AppState, build_router};
use invitations::config::{InvitationsConfig, StorageBackend};
use invitations::directory::GuestDirectory;
use invitations::observability;
use invitations::seed;
use invitations::store::memory::InMemoryStore;
use invitations::store::postgres::PostgresStore;
use invitations::store::{GuestStore, StoreConfig};
use std::future::Future;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = InvitationsConfig::from_env_or_yaml().context("invitations config")?;
    run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

async fn run_with_shutdown<F>(config: InvitationsConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let metrics_handle = observability::init_observability("invitations");
    let state = build_state(config.clone()).await?;
    if let Some(path) = &config.seed_file {
        seed::seed_from_file(&state.directory, path).await?;
    }
    let metrics_task = tokio::spawn(observability::serve_metrics(
        metrics_handle,
        config.metrics_bind,
    ));

    let app = build_router(state);
    let addr = config.bind_addr;
    tracing::info!(%addr, public_url = %config.public_url, "invitations listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tokio::pin!(shutdown);
    tokio::select! {
        result = axum::serve(listener, app.into_make_service()) => {
            result?;
        }
        _ = &mut shutdown => {}
    }

    metrics_task.abort();
    let _ = metrics_task.await;
    Ok(())
}

async fn build_state(config: InvitationsConfig) -> anyhow::Result<AppState> {
    let store_config = StoreConfig {
        changes_limit: config.changes_limit,
        change_retention_max_rows: config.change_retention_max_rows,
    };
    let store: Arc<dyn GuestStore> = match config.storage {
        StorageBackend::Memory => Arc::new(InMemoryStore::new(store_config)),
        StorageBackend::Postgres => {
            let pg = config
                .postgres
                .as_ref()
                .context("postgres configuration missing")?;
            Arc::new(PostgresStore::connect(pg, store_config).await?)
        }
    };
    tracing::info!(backend = store.backend_name(), "guest directory store ready");

    Ok(AppState {
        features: FeatureFlags {
            durable_storage: store.is_durable(),
            live_updates: true,
        },
        directory: GuestDirectory::new(store),
        public_url: config.public_url,
        site: config.site,
        api_version: "v1".to_string(),
    })
}
