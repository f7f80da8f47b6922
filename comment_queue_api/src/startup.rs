use crate::app_config::AppConfig;
use crate::comments::{router, ApiState};
use anyhow::Context;
use axum::Router;
use comment_queue::broker::KafkaBroker;
use comment_queue::connection::ClientFactory;
use comment_queue::producer::Publisher;
use comment_queue::shutdown::ShutdownCoordinator;
use http::HeaderName;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

pub async fn run_until_stopped(config: AppConfig) -> Result<(), anyhow::Error> {
    let address = format!("{}:{}", config.host, config.port);

    let factory = Arc::new(ClientFactory::new(KafkaBroker, config.kafka));
    let state = ApiState {
        publisher: Arc::new(Publisher::new(factory)),
        topic: config.topic.into(),
    };
    let app = with_layers(router(state));

    let shutdown = ShutdownCoordinator::new();
    shutdown
        .listen_for_signals()
        .context("While installing signal handlers")?;

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("While binding {address}"))?;
    info!("Listening {address}");

    let token = shutdown.token();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await
        .context("While serving http")?;

    info!("Http server stopped");
    Ok(())
}

pub fn with_layers(router: Router) -> Router {
    router
        .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid))
}
