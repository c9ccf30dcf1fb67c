//! Signal handling for graceful shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal;
use tracing::info;

/// Shutdown progress shared between the signal handler and the tick loop.
#[derive(Debug, Clone, Default)]
pub struct ShutdownState {
    shutdown_initiated: Arc<AtomicBool>,
    shutdown_complete: Arc<AtomicBool>,
}

impl ShutdownState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once a signal was received; the tick loop stops.
    pub fn is_shutdown_initiated(&self) -> bool {
        self.shutdown_initiated.load(Ordering::Acquire)
    }

    /// Returns true once the component has left the exercise.
    pub fn is_shutdown_complete(&self) -> bool {
        self.shutdown_complete.load(Ordering::Acquire)
    }

    pub fn initiate_shutdown(&self) {
        self.shutdown_initiated.store(true, Ordering::Release);
        info!("🛑 Shutdown initiated - no further ticks will run");
    }

    pub fn complete_shutdown(&self) {
        self.shutdown_complete.store(true, Ordering::Release);
        info!("✅ Left the exercise - ready for final cleanup");
    }
}

/// Waits for SIGINT or SIGTERM (Ctrl+C on Windows).
pub async fn setup_signal_handlers() -> std::io::Result<ShutdownState> {
    let shutdown_state = setup_signal_handlers_silent().await?;
    info!("📡 Received shutdown signal - initiating graceful shutdown");
    Ok(shutdown_state)
}

pub async fn setup_signal_handlers_silent() -> std::io::Result<ShutdownState> {
    let shutdown_state = ShutdownState::new();

    #[cfg(unix)]
    {
        use signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => (),
            _ = sigterm.recv() => ()
        }
    }

    #[cfg(windows)]
    signal::ctrl_c().await?;

    shutdown_state.initiate_shutdown();
    Ok(shutdown_state)
}
