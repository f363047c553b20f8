//! Ordered change callbacks.
//!
//! Subsystems that derive state from configuration (logging filters, drain
//! timings) register a callback once and are re-run on every change.
//! Callbacks run on the caller's thread, in registration order, with no
//! isolation: a panicking callback stops the remaining ones and unwinds into
//! the caller of [`ChangeNotifier::notify_changed`].

use tracing::debug;

use crate::store::ConfigStore;

type Callback = Box<dyn Fn(&ConfigStore) + Send + Sync>;

/// Append-only list of change callbacks.
#[derive(Default)]
pub struct ChangeNotifier {
    callbacks: Vec<Callback>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback`. It runs after every callback registered before it.
    pub fn add_on_change_callback<F>(&mut self, callback: F)
    where
        F: Fn(&ConfigStore) + Send + Sync + 'static,
    {
        self.callbacks.push(Box::new(callback));
    }

    /// Run every callback once with `cfg`.
    ///
    /// Takes `&mut self` so two notifications can never interleave without
    /// the caller arranging it.
    pub fn notify_changed(&mut self, cfg: &ConfigStore) {
        debug!(callbacks = self.callbacks.len(), "Notifying config change");
        for callback in &self.callbacks {
            callback(cfg);
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::sync::{Arc, Mutex};

    fn recorder(
        log: &Arc<Mutex<Vec<String>>>,
        name: &'static str,
    ) -> impl Fn(&ConfigStore) + Send + Sync + 'static {
        let log = Arc::clone(log);
        move |cfg: &ConfigStore| {
            let (level, _) = cfg.get("gop", "log_level", "INFO");
            log.lock().unwrap().push(format!("{name}:{level}"));
        }
    }

    #[test]
    fn test_callbacks_run_in_registration_order_once_per_notify() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut notifier = ChangeNotifier::new();
        notifier.add_on_change_callback(recorder(&log, "first"));
        notifier.add_on_change_callback(recorder(&log, "second"));
        notifier.add_on_change_callback(recorder(&log, "third"));

        let mut cfg = ConfigStore::default();
        notifier.notify_changed(&cfg);
        cfg.override_value("gop", "log_level", "DEBUG");
        notifier.notify_changed(&cfg);

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "first:INFO",
                "second:INFO",
                "third:INFO",
                "first:DEBUG",
                "second:DEBUG",
                "third:DEBUG",
            ]
        );
    }

    #[test]
    fn test_panicking_callback_aborts_the_rest() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut notifier = ChangeNotifier::new();
        notifier.add_on_change_callback(recorder(&log, "first"));
        notifier.add_on_change_callback(|_| panic!("callback failed"));
        notifier.add_on_change_callback(recorder(&log, "third"));

        let cfg = ConfigStore::default();
        let result = catch_unwind(AssertUnwindSafe(|| notifier.notify_changed(&cfg)));

        assert!(result.is_err());
        assert_eq!(*log.lock().unwrap(), vec!["first:INFO"]);
    }

    #[test]
    fn test_empty_notifier_is_a_no_op() {
        let mut notifier = ChangeNotifier::new();
        assert!(notifier.is_empty());
        notifier.notify_changed(&ConfigStore::default());
        assert_eq!(notifier.len(), 0);
    }
}
