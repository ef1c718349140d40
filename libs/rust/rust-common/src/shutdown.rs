//! Signal handling for graceful shutdown.

use std::future::Future;
use std::time::Duration;

use tokio::signal;
use tracing::{error, info, warn};

/// Waits for SIGTERM or SIGINT.
///
/// If a handler cannot be installed the failure is logged and that signal
/// source is ignored; the other one still triggers shutdown.
pub async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            info!("Received SIGTERM, initiating shutdown");
        }
    }
}

/// Drives `server` (which must itself stop once `wait_for_signal` resolves)
/// and bounds how long in-flight requests may take to drain after the signal.
pub async fn run_until_drained<F, E>(server: F, drain_timeout: Duration)
where
    F: Future<Output = Result<(), E>> + Send,
    E: std::fmt::Display,
{
    let mut server = std::pin::pin!(server);

    tokio::select! {
        result = &mut server => {
            report(result);
            return;
        }
        () = wait_for_signal() => {
            info!(timeout = ?drain_timeout, "Draining in-flight requests");
        }
    }

    match tokio::time::timeout(drain_timeout, server).await {
        Ok(result) => report(result),
        Err(_) => warn!("Shutdown timeout reached, dropping remaining connections"),
    }
}

fn report<E: std::fmt::Display>(result: Result<(), E>) {
    match result {
        Ok(()) => info!("Server stopped normally"),
        Err(e) => error!(error = %e, "Server error"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_completion_returns_without_signal() {
        let server = async { Ok::<(), std::io::Error>(()) };
        tokio::time::timeout(
            Duration::from_secs(1),
            run_until_drained(server, Duration::from_secs(1)),
        )
        .await
        .unwrap();
    }
}
