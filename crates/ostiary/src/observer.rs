//! In-process observers for forwarded engine events.

use ostiary_core::{KeyEvent, RendererExitDetail};
use std::sync::{Arc, Mutex};

/// Receives engine events the session forwards verbatim. Every method has
/// an empty default so implementors subscribe only to what they need.
pub trait NavigationObserver: Send + Sync {
    fn on_navigation_started(&self, _url: &str) {}
    fn on_navigation_finished(&self, _url: &str) {}
    fn on_visited_history(&self, _url: Option<&str>, _is_reload: bool) {}
    fn on_load_error(&self, _url: &str, _code: i64, _message: &str) {}
    fn on_http_error(&self, _url: &str, _status_code: u16, _description: &str) {}
    fn on_page_commit_visible(&self, _url: &str) {}
    fn on_zoom_changed(&self, _old_scale: f64, _new_scale: f64) {}
    fn on_login_request(&self, _realm: &str, _account: Option<&str>, _args: &str) {}
    fn on_renderer_exit(&self, _detail: &RendererExitDetail) {}
    fn on_key_event(&self, _event: &KeyEvent) {}
}

/// A clearable observer list shared across the session and its pending
/// reply closures.
#[derive(Clone, Default)]
pub struct ObserverSet {
    observers: Arc<Mutex<Vec<Arc<dyn NavigationObserver>>>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, observer: Arc<dyn NavigationObserver>) {
        if let Ok(mut observers) = self.observers.lock() {
            observers.push(observer);
        }
    }

    /// Drop all observers. Disposal calls this first so late authority
    /// replies notify nobody.
    pub fn clear(&self) {
        if let Ok(mut observers) = self.observers.lock() {
            observers.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.observers
            .lock()
            .map(|observers| observers.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke `notify` on a snapshot of the current observers. The lock is
    /// released before any callback runs, so observers may register or
    /// clear from inside one.
    pub fn each(&self, notify: impl Fn(&dyn NavigationObserver)) {
        let snapshot: Vec<_> = match self.observers.lock() {
            Ok(observers) => observers.clone(),
            Err(_) => return,
        };
        for observer in &snapshot {
            notify(observer.as_ref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingObserver {
        started: AtomicUsize,
    }

    impl NavigationObserver for CountingObserver {
        fn on_navigation_started(&self, _url: &str) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_each_reaches_every_observer() {
        let set = ObserverSet::new();
        let a = Arc::new(CountingObserver::default());
        let b = Arc::new(CountingObserver::default());
        set.register(a.clone());
        set.register(b.clone());

        set.each(|observer| observer.on_navigation_started("https://a/"));

        assert_eq!(a.started.load(Ordering::SeqCst), 1);
        assert_eq!(b.started.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clear_empties_the_set() {
        let set = ObserverSet::new();
        let observer = Arc::new(CountingObserver::default());
        set.register(observer.clone());
        assert_eq!(set.len(), 1);

        set.clear();
        assert!(set.is_empty());

        set.each(|observer| observer.on_navigation_started("https://a/"));
        assert_eq!(observer.started.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_clones_share_one_set() {
        let set = ObserverSet::new();
        let clone = set.clone();
        clone.register(Arc::new(CountingObserver::default()));
        assert_eq!(set.len(), 1);
    }
}
