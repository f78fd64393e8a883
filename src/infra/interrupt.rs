use anyhow::{Context, Result};
use std::thread;

use crate::domain::cancel::CancellationToken;

/// Cancel `token` on the first Ctrl-C.
///
/// The signal is awaited on a small current-thread tokio runtime living
/// on its own thread, so the training loop stays fully synchronous.
pub fn install_ctrl_c(token: CancellationToken) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build signal runtime")?;

    thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || {
            runtime.block_on(async {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        tracing::warn!("Ctrl+C, saving snapshot");
                        token.cancel();
                    }
                    Err(err) => tracing::error!("Cannot listen for Ctrl+C: {err}"),
                }
            });
        })
        .context("Failed to spawn signal thread")?;
    Ok(())
}
