//! Ctrl-C handling scoped to one dispatch run.
//!
//! On Unix the SIGINT action is swapped in with `sigaction` when the run
//! starts and the previous action is put back when the guard drops, so the
//! process behaves after the run exactly as it did before it. The signal
//! handler itself only bumps a counter; a listener task turns a change in the
//! counter into a cancelled token.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[cfg(unix)]
mod imp {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

    static INTERRUPTS: AtomicUsize = AtomicUsize::new(0);

    extern "C" fn record_interrupt(_signal: nix::libc::c_int) {
        INTERRUPTS.fetch_add(1, Ordering::SeqCst);
    }

    pub(super) fn interrupts() -> usize {
        INTERRUPTS.load(Ordering::SeqCst)
    }

    pub(super) struct Installed {
        previous: SigAction,
    }

    pub(super) fn install() -> std::io::Result<Installed> {
        let action = SigAction::new(
            SigHandler::Handler(record_interrupt),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );
        // SAFETY: the handler only touches an atomic, which is async-signal-safe.
        let previous = unsafe { sigaction(Signal::SIGINT, &action) }?;
        Ok(Installed { previous })
    }

    impl Installed {
        pub(super) fn restore(&self) -> std::io::Result<()> {
            // SAFETY: reinstates the action that was active before `install`.
            unsafe { sigaction(Signal::SIGINT, &self.previous) }?;
            Ok(())
        }
    }
}

#[cfg(not(unix))]
mod imp {
    use std::sync::atomic::{AtomicUsize, Ordering};

    static INTERRUPTS: AtomicUsize = AtomicUsize::new(0);

    pub(super) fn interrupts() -> usize {
        INTERRUPTS.load(Ordering::SeqCst)
    }

    pub(super) struct Installed {
        listener: tokio::task::JoinHandle<()>,
    }

    pub(super) fn install() -> std::io::Result<Installed> {
        let listener = tokio::spawn(async {
            while tokio::signal::ctrl_c().await.is_ok() {
                INTERRUPTS.fetch_add(1, Ordering::SeqCst);
            }
        });
        Ok(Installed { listener })
    }

    impl Installed {
        pub(super) fn restore(&self) -> std::io::Result<()> {
            self.listener.abort();
            Ok(())
        }
    }
}

/// Interrupt handling for one dispatch run.
///
/// Dropping the guard stops the listener and restores the SIGINT action that
/// was in place when [`install_interrupt_handler`] was called.
pub struct InterruptGuard {
    installed: imp::Installed,
    listener: JoinHandle<()>,
}

impl std::fmt::Debug for InterruptGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterruptGuard")
            .field("listener", &self.listener)
            .finish_non_exhaustive()
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        self.listener.abort();
        if let Err(e) = self.installed.restore() {
            tracing::warn!(error = %e, "Failed to restore previous SIGINT handler");
        }
    }
}

/// Cancel `token` when Ctrl-C (SIGINT) is received.
///
/// The handler is in place by the time this returns. In-flight jobs are not
/// interrupted; workers observe the token before claiming their next job.
pub fn install_interrupt_handler(token: CancellationToken) -> Result<InterruptGuard> {
    let seen = imp::interrupts();
    let installed = imp::install()?;

    let listener = tokio::spawn(async move {
        let mut poll = tokio::time::interval(POLL_INTERVAL);
        loop {
            tokio::select! {
                _ = poll.tick() => {
                    if imp::interrupts() != seen {
                        tracing::warn!("Received SIGINT, stopping after in-flight jobs finish");
                        token.cancel();
                        break;
                    }
                }
                _ = token.cancelled() => break,
            }
        }
    });

    Ok(InterruptGuard {
        installed,
        listener,
    })
}
