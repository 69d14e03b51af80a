//! Stop signal shared by the HTTP server and the expiry sweep.

use tokio::sync::broadcast;

/// Fans a single stop request out to every subscribed task.
pub struct ShutdownController {
    tx: broadcast::Sender<()>,
}

impl ShutdownController {
    pub fn new() -> Self {
        Self {
            tx: broadcast::channel(1).0,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Ask every subscriber to stop. Repeated calls are harmless.
    pub fn shutdown(&self) {
        let notified = self.tx.send(()).unwrap_or(0);
        tracing::debug!(notified, "shutdown requested");
    }

    /// Block until the process is asked to terminate, then stop everything.
    pub async fn wait_for_signal(&self) {
        let name = termination_signal().await;
        tracing::info!(signal = name, "stopping agora daemon");
        self.shutdown();
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
async fn termination_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(stream) => Some(stream),
        Err(e) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable; only Ctrl-C stops the daemon");
            None
        }
    };
    let sigterm = async {
        match term.as_mut() {
            Some(stream) => {
                stream.recv().await;
            }
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => "SIGINT",
        _ = sigterm => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn termination_signal() -> &'static str {
    let _ = tokio::signal::ctrl_c().await;
    "ctrl-c"
}
