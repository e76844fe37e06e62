//! A gate that holds dev requests while a build pass is running.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug)]
struct GateState {
    open: Mutex<bool>,
    changed: Condvar,
}

/// Open/closed flag that readers can block on.
///
/// Clones share state. A new gate is open.
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    state: Arc<GateState>,
}

impl ReadinessGate {
    pub fn new() -> Self {
        ReadinessGate {
            state: Arc::new(GateState {
                open: Mutex::new(true),
                changed: Condvar::new(),
            }),
        }
    }

    /// Hold readers until [`ReadinessGate::open`] is called.
    pub fn close(&self) {
        *self.state.open.lock().unwrap_or_else(PoisonError::into_inner) = false;
    }

    /// Release all waiting readers.
    pub fn open(&self) {
        *self.state.open.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.state.changed.notify_all();
    }

    pub fn is_open(&self) -> bool {
        *self.state.open.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until the gate is open.
    pub fn wait(&self) {
        let guard = self.state.open.lock().unwrap_or_else(PoisonError::into_inner);
        let _guard = self
            .state
            .changed
            .wait_while(guard, |open| !*open)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Block until the gate is open or `timeout` elapses. Returns whether it opened.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = self.state.open.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = self
            .state
            .changed
            .wait_timeout_while(guard, timeout, |open| !*open)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }

    /// Close the gate until the returned guard is dropped.
    pub fn hold(&self) -> GateGuard {
        self.close();
        GateGuard { gate: self.clone() }
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        ReadinessGate::new()
    }
}

/// Reopens its gate on drop, including on early return.
#[must_use = "the gate reopens as soon as the guard is dropped"]
pub struct GateGuard {
    gate: ReadinessGate,
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        self.gate.open();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_new_gate_is_open() {
        let gate = ReadinessGate::new();
        assert!(gate.is_open());
        gate.wait();
        assert!(gate.wait_timeout(Duration::from_millis(1)));
    }

    #[test]
    fn test_closed_gate_times_out() {
        let gate = ReadinessGate::new();
        gate.close();
        assert!(!gate.wait_timeout(Duration::from_millis(20)));
    }

    #[test]
    fn test_open_releases_waiters() {
        let gate = ReadinessGate::new();
        gate.close();

        let waiter = {
            let gate = gate.clone();
            thread::spawn(move || gate.wait_timeout(Duration::from_secs(10)))
        };

        thread::sleep(Duration::from_millis(20));
        gate.open();
        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_guard_reopens() {
        let gate = ReadinessGate::new();
        {
            let _held = gate.hold();
            assert!(!gate.is_open());
        }
        assert!(gate.is_open());
    }
}
