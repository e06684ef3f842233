use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use eyre::{Result, WrapErr};
use tokio::{signal, sync::broadcast};

/// Why the proxy server is stopping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGINT / Ctrl+C
    Interrupt,
    /// SIGTERM
    Terminate,
    /// Triggered from code, e.g. by a test harness
    Requested,
}

/// Fans one shutdown signal out to every subscriber.
///
/// The serve loop hands [`GracefulShutdown::wait_for_shutdown_signal`] to axum's
/// `with_graceful_shutdown`, so in-flight proxied requests finish before the listener
/// closes.
#[derive(Clone)]
pub struct GracefulShutdown {
    shutdown_tx: broadcast::Sender<ShutdownReason>,
    shutdown_initiated: Arc<AtomicBool>,
}

impl GracefulShutdown {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(4);
        Self {
            shutdown_tx,
            shutdown_initiated: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ShutdownReason> {
        self.shutdown_tx.subscribe()
    }

    pub fn is_shutdown_initiated(&self) -> bool {
        self.shutdown_initiated.load(Ordering::SeqCst)
    }

    /// Start shutting down. Only the first call has an effect.
    pub fn trigger_shutdown(&self, reason: ShutdownReason) {
        if self
            .shutdown_initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            tracing::info!("Shutdown initiated: {:?}", reason);
            // no subscribers simply means nobody is waiting
            let _ = self.shutdown_tx.send(reason);
        } else {
            tracing::debug!("Shutdown already initiated, ignoring {:?}", reason);
        }
    }

    /// Listen for SIGINT and SIGTERM until one arrives.
    pub async fn run_signal_handler(&self) -> Result<()> {
        tracing::debug!("Signal handler started, listening for SIGINT and SIGTERM");

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal as unix_signal};
            let mut sigterm = unix_signal(SignalKind::terminate())
                .wrap_err("Failed to register SIGTERM handler")?;
            tokio::select! {
                result = signal::ctrl_c() => {
                    result.wrap_err("Failed to listen for Ctrl+C")?;
                    self.trigger_shutdown(ShutdownReason::Interrupt);
                }
                _ = sigterm.recv() => self.trigger_shutdown(ShutdownReason::Terminate),
            }
        }

        #[cfg(not(unix))]
        {
            signal::ctrl_c()
                .await
                .wrap_err("Failed to listen for Ctrl+C")?;
            self.trigger_shutdown(ShutdownReason::Interrupt);
        }

        Ok(())
    }

    /// Resolve once shutdown has been initiated.
    pub async fn wait_for_shutdown_signal(&self) -> ShutdownReason {
        let mut receiver = self.subscribe();
        if self.is_shutdown_initiated() {
            return ShutdownReason::Requested;
        }
        match receiver.recv().await {
            Ok(reason) => reason,
            Err(_) => {
                tracing::warn!("Shutdown channel closed unexpectedly");
                ShutdownReason::Requested
            }
        }
    }
}

impl Default for GracefulShutdown {
    fn default() -> Self {
        Self::new()
    }
}
