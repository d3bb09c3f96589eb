//! Cooperative termination.
//!
//! SIGTERM only cancels a token; the supervisor loop notices it between
//! iterations and drains. Nothing runs on the signal-handling context.

use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;

/// Install the SIGTERM handler and return the token it cancels.
///
/// Registration happens before this returns, so a failure surfaces at
/// startup. Must be called inside a tokio runtime.
pub fn install_termination_handler() -> std::io::Result<CancellationToken> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let token = CancellationToken::new();
    let stop = token.clone();

    tokio::spawn(async move {
        if sigterm.recv().await.is_some() {
            tracing::info!("received SIGTERM, draining before exit");
            stop.cancel();
        }
    });

    Ok(token)
}
