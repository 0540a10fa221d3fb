use domain_duplicator::InterruptHandle;
use tokio::task::JoinHandle;

/// Forward the first SIGINT/SIGTERM to the run's interrupt handle.
///
/// The returned task should be aborted once the run has finished.
pub(crate) fn spawn_interrupt_listener(handle: InterruptHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        wait_for_shutdown().await;
        log::warn!("Interrupt received, stopping after in-flight work...");
        handle.interrupt();
    })
}

#[cfg(unix)]
async fn wait_for_shutdown() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                () = ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(err) => {
            log::warn!("SIGTERM handler unavailable: {err}");
            ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown() {
    ctrl_c().await;
}

async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::warn!("Ctrl-C handler unavailable: {err}");
        std::future::pending::<()>().await;
    }
}
