//! One-shot rendezvous between a blocked engine thread and the authority
//! reply thread.
//!
//! The interception call site needs an immediate return value, but the
//! authority channel replies asynchronously on an arbitrary thread. The
//! rendezvous parks the caller until the reply lands or the timeout fires.
//! Both halves are move-only: a value can be delivered at most once, and a
//! waiter can wait at most once.

use crate::error::{InterceptError, InterceptResult};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::time::Duration;

/// Create a connected completer/waiter pair.
pub fn rendezvous<T: Send + 'static>() -> (Completer<T>, Waiter<T>) {
    // Capacity 1 so completing never blocks the reply thread.
    let (tx, rx) = mpsc::sync_channel(1);
    (Completer { tx }, Waiter { rx })
}

/// The delivery half. Dropped without [`Completer::complete`], the waiter
/// wakes with [`InterceptError::ReplyAbandoned`].
pub struct Completer<T> {
    tx: SyncSender<T>,
}

impl<T> Completer<T> {
    /// Deliver the value. If the waiter already gave up, the value is
    /// dropped silently.
    pub fn complete(self, value: T) {
        let _ = self.tx.send(value);
    }
}

/// The blocking half.
pub struct Waiter<T> {
    rx: Receiver<T>,
}

impl<T> Waiter<T> {
    /// Park the calling thread until the value arrives or `timeout`
    /// elapses.
    pub fn wait(self, timeout: Duration) -> InterceptResult<T> {
        self.rx.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => InterceptError::ReplyTimeout(timeout),
            RecvTimeoutError::Disconnected => InterceptError::ReplyAbandoned,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_complete_before_wait_is_buffered() {
        let (completer, waiter) = rendezvous();
        completer.complete(42);
        assert_eq!(waiter.wait(Duration::from_millis(10)).unwrap(), 42);
    }

    #[test]
    fn test_complete_from_another_thread() {
        let (completer, waiter) = rendezvous();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            completer.complete("reply");
        });
        assert_eq!(waiter.wait(Duration::from_secs(2)).unwrap(), "reply");
        handle.join().unwrap();
    }

    #[test]
    fn test_wait_times_out() {
        let (_completer, waiter) = rendezvous::<u8>();
        match waiter.wait(Duration::from_millis(10)) {
            Err(InterceptError::ReplyTimeout(_)) => {}
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn test_dropped_completer_wakes_the_waiter() {
        let (completer, waiter) = rendezvous::<u8>();
        drop(completer);
        match waiter.wait(Duration::from_secs(2)) {
            Err(InterceptError::ReplyAbandoned) => {}
            other => panic!("expected abandoned, got {other:?}"),
        }
    }

    #[test]
    fn test_late_completion_is_dropped_silently() {
        let (completer, waiter) = rendezvous();
        assert!(waiter.wait(Duration::from_millis(5)).is_err());
        completer.complete(1);
    }
}
