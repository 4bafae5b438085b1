use crate::{
    config::Settings, model_service::ModelService, ort_service::OrtModelService,
    routes::api_routes, state::SharedState,
};
use axum::{extract::DefaultBodyLimit, Router};
use tokio::{net::TcpListener, signal};

pub fn build_router<M: ModelService>(
    state: SharedState<M>,
    max_upload_bytes: Option<usize>,
) -> Router {
    let body_limit = match max_upload_bytes {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    api_routes::<M>().with_state(state).layer(body_limit)
}

pub struct HttpServer {
    router: Router,
    listener: TcpListener,
}

impl HttpServer {
    pub async fn new<M: ModelService>(
        state: SharedState<M>,
        settings: &Settings,
    ) -> anyhow::Result<Self> {
        let addr = settings.server.get_address();
        let router = build_router(state, settings.server.max_upload_bytes);
        let listener = TcpListener::bind(&addr).await?;

        Ok(Self { router, listener })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        tracing::info!("Starting model server on {}", self.listener.local_addr()?);

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async {
                shutdown_signal().await;
                tracing::info!("Shutdown signal received, starting graceful shutdown");
            })
            .await?;

        Ok(())
    }
}

/// Loads the model and labels, then serves until a shutdown signal. Any
/// failure before the listener is bound aborts startup.
pub async fn start_server(settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = settings.model.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        anyhow::bail!(e);
    }

    let ort_model_service = match OrtModelService::new(&settings.model) {
        Ok(service) => service,
        Err(e) => {
            tracing::error!("Failed to load model: {}", e);
            return Err(e.into());
        }
    };

    std::fs::create_dir_all(settings.uploads.get_directory())?;
    let state = SharedState::from_settings(ort_model_service, &settings)?;
    let server = HttpServer::new(state, &settings).await?;
    server.run().await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
