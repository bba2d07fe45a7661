//! Termination signals that abort the installer.

use tokio::signal::unix::{signal, SignalKind};

/// Resolves with the name of the first termination signal received.
pub(super) async fn shutdown_signal() -> &'static str {
    let interrupt = tokio::signal::ctrl_c();
    let quit = wait_for(SignalKind::quit());
    let hangup = wait_for(SignalKind::hangup());
    let terminate = wait_for(SignalKind::terminate());

    tokio::select! {
        Ok(()) = interrupt => "SIGINT",
        _ = quit => "SIGQUIT",
        _ = hangup => "SIGHUP",
        _ = terminate => "SIGTERM",
    }
}

async fn wait_for(kind: SignalKind) {
    match signal(kind) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(err) => {
            tracing::warn!(?kind, "signal handler unavailable: {err}");
            std::future::pending::<()>().await;
        }
    }
}
