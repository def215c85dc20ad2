//! Cooperative shutdown
//!
//! A shared running flag polled once per acquisition cycle. It is flipped by
//! an OS signal or by a replay source running out of data; nothing in flight
//! is interrupted.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

/// Process-wide running flag, cloned into every component that observes or
/// requests shutdown
#[derive(Debug, Clone)]
pub struct ShutdownFlag {
    running: Arc<AtomicBool>,
}

impl Default for ShutdownFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownFlag {
    /// New flag in the running state
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Whether the loop should keep going
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Request shutdown. Returns `true` for the call that flipped the flag.
    pub fn stop(&self) -> bool {
        self.running.swap(false, Ordering::SeqCst)
    }
}

/// Stop `flag` on Ctrl-C, and on SIGTERM where available.
///
/// The listeners are registered before this returns, so a signal arriving
/// before the spawned task first runs is still caught. Spawns a task on the
/// current runtime.
pub fn install_signal_handlers(flag: ShutdownFlag) -> io::Result<JoinHandle<()>> {
    let mut listener = SignalListener::register()?;
    Ok(tokio::spawn(async move {
        listener.recv().await;
        if flag.stop() {
            info!("shutdown requested, finishing current cycle");
        }
    }))
}

#[cfg(unix)]
struct SignalListener {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl SignalListener {
    fn register() -> io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    async fn recv(&mut self) {
        tokio::select! {
            _ = self.interrupt.recv() => {}
            _ = self.terminate.recv() => {}
        }
    }
}

#[cfg(windows)]
struct SignalListener {
    ctrl_c: tokio::signal::windows::CtrlC,
}

#[cfg(windows)]
impl SignalListener {
    fn register() -> io::Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
        })
    }

    async fn recv(&mut self) {
        self.ctrl_c.recv().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_flips_once() {
        let flag = ShutdownFlag::new();
        let observer = flag.clone();
        assert!(observer.is_running());

        assert!(flag.stop());
        assert!(!flag.stop());
        assert!(!observer.is_running());
    }

    #[tokio::test]
    async fn test_handlers_register_before_spawn() {
        let flag = ShutdownFlag::new();
        let handle = install_signal_handlers(flag.clone()).unwrap();

        // Nothing has been delivered yet
        tokio::task::yield_now().await;
        assert!(flag.is_running());
        assert!(!handle.is_finished());
        handle.abort();
    }
}
