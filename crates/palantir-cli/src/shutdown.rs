//! Interruptible sleeps for the watch loop.

use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// A one-way shutdown flag whose waits wake immediately when it fires.
pub struct ShutdownSignal {
    state: Mutex<bool>,
    condvar: Condvar,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    /// Fire the signal, waking every waiter.
    pub fn notify(&self) {
        if let Ok(mut stopped) = self.state.lock() {
            *stopped = true;
        }
        self.condvar.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.state.lock().map(|stopped| *stopped).unwrap_or(true)
    }

    /// Sleep up to `duration`. Returns `true` when the signal fired.
    pub fn wait(&self, duration: Duration) -> bool {
        let Ok(guard) = self.state.lock() else {
            return true;
        };
        match self
            .condvar
            .wait_timeout_while(guard, duration, |stopped| !*stopped)
        {
            Ok((stopped, _)) => *stopped,
            Err(_) => true,
        }
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_wait_times_out_without_signal() {
        let signal = ShutdownSignal::new();
        let start = Instant::now();
        assert!(!signal.wait(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_notify_interrupts_wait() {
        let signal = Arc::new(ShutdownSignal::new());
        let waiter = {
            let signal = Arc::clone(&signal);
            thread::spawn(move || signal.wait(Duration::from_secs(10)))
        };
        thread::sleep(Duration::from_millis(20));
        signal.notify();
        assert!(waiter.join().unwrap());
        assert!(signal.is_shutdown());
    }

    #[test]
    fn test_wait_after_notify_returns_immediately() {
        let signal = ShutdownSignal::new();
        signal.notify();
        let start = Instant::now();
        assert!(signal.wait(Duration::from_secs(5)));
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
