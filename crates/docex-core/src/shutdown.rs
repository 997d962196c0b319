//! Graceful shutdown: interruption signals fire a run-wide cancellation token

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio_util::sync::CancellationToken;

const RUNNING: u8 = 0;
const SHUTTING_DOWN: u8 = 1;
const EXITED: u8 = 2;

/// Lifecycle of a run with respect to interruption
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownState {
    Running,
    ShuttingDown,
    Exited,
}

/// Owns the `Running -> ShuttingDown -> Exited` state machine.
///
/// The coordinator never touches the sink or the progress ledger itself. It
/// cancels the token handed to the scheduler, and the scheduler's coordinating
/// task performs the flush when it observes the cancellation.
#[derive(Clone, Debug)]
pub struct ShutdownCoordinator {
    state: Arc<AtomicU8>,
    token: CancellationToken,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(RUNNING)),
            token: CancellationToken::new(),
        }
    }

    /// Token observed by the scheduler
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn state(&self) -> ShutdownState {
        match self.state.load(Ordering::Acquire) {
            RUNNING => ShutdownState::Running,
            SHUTTING_DOWN => ShutdownState::ShuttingDown,
            _ => ShutdownState::Exited,
        }
    }

    /// Check if shutdown was requested
    pub fn is_shutdown_requested(&self) -> bool {
        self.state() != ShutdownState::Running
    }

    /// Transition `Running -> ShuttingDown` and cancel the token.
    ///
    /// Returns `false` when shutdown was already underway (repeated signals).
    pub fn request_shutdown(&self) -> bool {
        let first = self
            .state
            .compare_exchange(RUNNING, SHUTTING_DOWN, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if first {
            self.token.cancel();
        }
        first
    }

    /// Final transition, once the flush after an interruption is done
    pub fn mark_exited(&self) {
        self.state.store(EXITED, Ordering::Release);
    }

    /// Spawn a listener thread turning SIGINT/SIGTERM into [`request_shutdown`].
    ///
    /// [`request_shutdown`]: ShutdownCoordinator::request_shutdown
    #[cfg(unix)]
    pub fn listen_for_signals(&self) -> std::io::Result<()> {
        use signal_hook::consts::{SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;

        let mut signals = Signals::new([SIGINT, SIGTERM])?;
        let coordinator = self.clone();
        std::thread::Builder::new()
            .name("signal-listener".into())
            .spawn(move || {
                for signal in signals.forever() {
                    if coordinator.request_shutdown() {
                        log::warn!("Received signal {signal}, shutting down gracefully...");
                    } else {
                        log::debug!("Shutdown already in progress, ignoring signal {signal}");
                    }
                }
            })?;
        Ok(())
    }

    #[cfg(not(unix))]
    pub fn listen_for_signals(&self) -> std::io::Result<()> {
        log::debug!("Signal handling not supported on this platform");
        Ok(())
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_running() {
        let coordinator = ShutdownCoordinator::new();
        assert_eq!(coordinator.state(), ShutdownState::Running);
        assert!(!coordinator.is_shutdown_requested());
        assert!(!coordinator.token().is_cancelled());
    }

    #[test]
    fn first_request_cancels_token() {
        let coordinator = ShutdownCoordinator::new();
        let token = coordinator.token();
        assert!(coordinator.request_shutdown());
        assert_eq!(coordinator.state(), ShutdownState::ShuttingDown);
        assert!(token.is_cancelled());
    }

    #[test]
    fn repeated_request_is_noop() {
        let coordinator = ShutdownCoordinator::new();
        assert!(coordinator.request_shutdown());
        assert!(!coordinator.request_shutdown());
        assert_eq!(coordinator.state(), ShutdownState::ShuttingDown);
    }

    #[test]
    fn request_after_exit_is_noop() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.request_shutdown();
        coordinator.mark_exited();
        assert!(!coordinator.request_shutdown());
        assert_eq!(coordinator.state(), ShutdownState::Exited);
    }

    #[test]
    fn clones_share_state() {
        let coordinator = ShutdownCoordinator::new();
        let other = coordinator.clone();
        other.request_shutdown();
        assert!(coordinator.is_shutdown_requested());
    }
}
