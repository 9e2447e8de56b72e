//! Operator interrupt handling.
//!
//! The launcher never dies on SIGINT / SIGTERM / SIGHUP while a stage is
//! running: it forwards the received signal to the current child and keeps
//! waiting, so the child's exit status still becomes the launcher's exit
//! status. Between stages the recorded interrupt stops the pipeline before the
//! next stage starts.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};

/// Foreground child bookkeeping shared with the signal handler.
///
/// Only atomics and `kill(2)` are touched from handler context. A signal that
/// arrives while no child is registered stays pending and is delivered to the
/// next child on registration, exactly once.
struct Forwarder {
    /// Pid of the child in the foreground, 0 when none
    child: AtomicU32,
    interrupted: AtomicBool,
    /// Signal not yet delivered to any child, 0 when none
    pending: AtomicI32,
}

impl Forwarder {
    const fn new() -> Self {
        Self {
            child: AtomicU32::new(0),
            interrupted: AtomicBool::new(false),
            pending: AtomicI32::new(0),
        }
    }

    fn on_signal(&self, sig: i32) {
        self.interrupted.store(true, Ordering::SeqCst);
        self.pending.store(sig, Ordering::SeqCst);
        let pid = self.child.load(Ordering::SeqCst);
        if pid != 0 && self.pending.swap(0, Ordering::SeqCst) != 0 {
            forward(pid, sig);
        }
    }

    fn register(&self, pid: u32) {
        self.child.store(pid, Ordering::SeqCst);
        let sig = self.pending.swap(0, Ordering::SeqCst);
        if sig != 0 {
            forward(pid, sig);
        }
    }

    fn clear(&self, pid: u32) {
        let _ = self
            .child
            .compare_exchange(pid, 0, Ordering::SeqCst, Ordering::SeqCst);
    }

    fn interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }
}

static FORWARDER: Forwarder = Forwarder::new();

/// Install the process-wide handlers. Call once, before the first stage.
#[cfg(unix)]
pub fn install() -> std::io::Result<()> {
    use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

    extern "C" fn handle(sig: std::ffi::c_int) {
        FORWARDER.on_signal(sig);
    }

    let action = SigAction::new(SigHandler::Handler(handle), SaFlags::SA_RESTART, SigSet::empty());
    for sig in [Signal::SIGINT, Signal::SIGTERM, Signal::SIGHUP] {
        // SAFETY: the handler only touches atomics and calls kill(2), both async-signal-safe.
        unsafe { sigaction(sig, &action) }?;
    }
    tracing::debug!("Signal handlers installed (SIGINT, SIGTERM, SIGHUP)");
    Ok(())
}

/// Install the process-wide Ctrl+C handler. Call once, before the first stage.
#[cfg(not(unix))]
pub fn install() -> std::io::Result<()> {
    ctrlc::set_handler(|| FORWARDER.on_signal(2))
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
}

/// Whether a terminating signal has been received since startup.
pub fn interrupted() -> bool {
    FORWARDER.interrupted()
}

/// Make `pid` the foreground child; delivers a signal received just before.
pub(crate) fn register_child(pid: u32) {
    FORWARDER.register(pid);
}

/// Forget `pid` if it is still the registered child.
pub(crate) fn clear_child(pid: u32) {
    FORWARDER.clear(pid);
}

#[cfg(unix)]
fn forward(pid: u32, sig: i32) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let (Ok(raw), Ok(signal)) = (i32::try_from(pid), Signal::try_from(sig)) else {
        return;
    };
    let _ = kill(Pid::from_raw(raw), signal);
}

// Console control events already reach every process on the console.
#[cfg(not(unix))]
fn forward(_pid: u32, _sig: i32) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clear_only_clears_matching_pid() {
        let f = Forwarder::new();
        f.register(4242);
        f.clear(1);
        assert_eq!(f.child.load(Ordering::SeqCst), 4242);
        f.clear(4242);
        assert_eq!(f.child.load(Ordering::SeqCst), 0);
        assert!(!f.interrupted());
    }

    #[cfg(unix)]
    fn sleeper() -> std::process::Child {
        std::process::Command::new("/bin/sh")
            .args(["-c", "exec sleep 5"])
            .spawn()
            .unwrap()
    }

    #[cfg(unix)]
    #[test]
    fn test_signal_forwarded_to_registered_child() {
        use crate::process::ProcessExit;

        let f = Forwarder::new();
        let mut child = sleeper();
        f.register(child.id());
        f.on_signal(2);
        assert!(f.interrupted());
        let exit = ProcessExit::from(child.wait().unwrap());
        assert_eq!(exit, ProcessExit::Signal(2));
        assert_eq!(f.pending.load(Ordering::SeqCst), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_signal_before_registration_reaches_next_child() {
        use crate::process::ProcessExit;

        let f = Forwarder::new();
        f.on_signal(15);
        assert!(f.interrupted());
        let mut child = sleeper();
        f.register(child.id());
        let exit = ProcessExit::from(child.wait().unwrap());
        assert_eq!(exit, ProcessExit::Signal(15));
        assert_eq!(f.pending.load(Ordering::SeqCst), 0);
    }
}
