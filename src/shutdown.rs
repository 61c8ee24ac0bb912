//! Cooperative shutdown.
//!
//! SIGINT/SIGTERM latch a flag that the daemon polls at exactly two
//! checkpoints: before starting a stage, and while sleeping between
//! cycles. A stage that is already running is never interrupted by
//! shutdown; the current child finishes and its result is still recorded.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;
use tracing::info;

/// Latched shutdown flag shared between the signal tasks and the daemon.
///
/// Once set it never reverts for the lifetime of the process.
#[derive(Clone, Default)]
pub struct ShutdownFlag {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    requested: AtomicBool,
    notify: Notify,
}

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_requested(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }

    /// Latch the flag and wake any task waiting in [`notified`](Self::notified).
    pub fn request(&self) {
        self.inner.requested.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Wait until shutdown is requested. Returns immediately if the flag
    /// is already latched.
    pub async fn notified(&self) {
        let mut notified = std::pin::pin!(self.inner.notify.notified());
        // Register before checking the flag so a request landing in
        // between cannot be missed.
        notified.as_mut().enable();
        if self.is_requested() {
            return;
        }
        notified.await;
    }
}

/// Install SIGINT/SIGTERM handlers that latch the flag.
///
/// Must be called from within the runtime; the spawned listener tasks live
/// for the rest of the process.
pub fn install_signal_handlers(flag: &ShutdownFlag) -> std::io::Result<()> {
    let interrupt = flag.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received interrupt signal, finishing current operation");
            interrupt.request();
        }
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut term = signal(SignalKind::terminate())?;
        let terminate = flag.clone();
        tokio::spawn(async move {
            if term.recv().await.is_some() {
                info!("received terminate signal, finishing current operation");
                terminate.request();
            }
        });
    }

    Ok(())
}
