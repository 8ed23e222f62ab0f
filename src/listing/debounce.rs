use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Handle for one scheduled emission. Superseded by the next `schedule` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceToken(u64);

/// Delays a changing value until it has been quiet for a fixed period.
///
/// Settled values are published on a `watch` channel; a value equal to the
/// last published one is not re-published. Dropping the debouncer cancels
/// any pending emission.
pub struct Debouncer<T> {
    quiet: Duration,
    tx: Arc<watch::Sender<T>>,
    version: Arc<AtomicU64>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl<T> Debouncer<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new(initial: T, quiet: Duration) -> (Self, watch::Receiver<T>) {
        let (tx, rx) = watch::channel(initial);
        let debouncer = Self {
            quiet,
            tx: Arc::new(tx),
            version: Arc::new(AtomicU64::new(0)),
            pending: Mutex::new(None),
        };
        (debouncer, rx)
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }

    /// Publish `value` after the quiet period unless another value arrives first.
    /// Must be called from within a tokio runtime.
    pub fn schedule(&self, value: T) -> DebounceToken {
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        let tx = Arc::clone(&self.tx);
        let current = Arc::clone(&self.version);
        let quiet = self.quiet;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            if current.load(Ordering::SeqCst) != version {
                return;
            }
            tx.send_if_modified(|settled| {
                if *settled == value {
                    false
                } else {
                    *settled = value;
                    true
                }
            });
        });

        if let Some(previous) = self.pending.lock().replace(handle) {
            previous.abort();
        }
        DebounceToken(version)
    }

    /// Drop any pending emission.
    pub fn cancel(&self) {
        self.version.fetch_add(1, Ordering::SeqCst);
        if let Some(previous) = self.pending.lock().take() {
            previous.abort();
        }
    }

    /// Cancel pending work and overwrite the settled value without notifying receivers.
    pub fn reset(&self, value: T) {
        self.cancel();
        self.tx.send_if_modified(|settled| {
            *settled = value;
            false
        });
    }

    pub fn is_pending(&self, token: DebounceToken) -> bool {
        self.version.load(Ordering::SeqCst) == token.0
            && self
                .pending
                .lock()
                .as_ref()
                .is_some_and(|handle| !handle.is_finished())
    }

    /// Last settled value.
    pub fn settled(&self) -> T {
        self.tx.borrow().clone()
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.version.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.pending.get_mut().take() {
            handle.abort();
        }
    }
}
