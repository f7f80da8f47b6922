use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    triggered: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Returns `true` if this call started the shutdown.
    pub fn trigger(&self) -> bool {
        if self.triggered.swap(true, Ordering::SeqCst) {
            info!("Shutdown already in progress");
            return false;
        }
        self.token.cancel();
        true
    }

    pub fn listen_for_signals(&self) -> Result<JoinHandle<()>, anyhow::Error> {
        let listener = self.signal_listener()?;
        Ok(tokio::task::spawn(listener))
    }

    #[cfg(unix)]
    fn signal_listener(
        &self,
    ) -> Result<impl std::future::Future<Output = ()> + Send + 'static, anyhow::Error> {
        use anyhow::Context;
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).context("While installing SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("While installing SIGINT handler")?;
        let coordinator = self.clone();

        Ok(async move {
            loop {
                let received = tokio::select! {
                    received = sigterm.recv() => received.map(|_| "SIGTERM"),
                    received = sigint.recv() => received.map(|_| "SIGINT"),
                };
                let Some(name) = received else {
                    warn!("Signal stream closed, no longer listening for shutdown");
                    break;
                };
                info!("Received {}, initiating graceful shutdown", name);
                coordinator.trigger();
            }
        })
    }

    #[cfg(not(unix))]
    fn signal_listener(
        &self,
    ) -> Result<impl std::future::Future<Output = ()> + Send + 'static, anyhow::Error> {
        let coordinator = self.clone();

        Ok(async move {
            loop {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("Failed to listen for Ctrl-C: {:?}", e);
                    break;
                }
                info!("Received Ctrl-C, initiating graceful shutdown");
                coordinator.trigger();
            }
        })
    }
}
