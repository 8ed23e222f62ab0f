use super::cache::DEFAULT_STALE_TIME;
use super::debounce::Debouncer;
use super::feed::{FetchOutcome, FileFeed, DEFAULT_PAGE_SIZE};
use super::fetch::PageSource;
use super::search::{LocationBar, SearchSync, SyncOutcome, SEARCH_DEBOUNCE};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

/// Quiet period between a URL change and the listing query following it.
pub const FETCH_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Keystrokes -> URL.
    pub search_debounce: Duration,
    /// URL -> listing query.
    pub fetch_debounce: Duration,
    pub stale_time: Duration,
    pub page_size: u32,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            search_debounce: SEARCH_DEBOUNCE,
            fetch_debounce: FETCH_DEBOUNCE,
            stale_time: DEFAULT_STALE_TIME,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A settled keystroke sequence reached the URL.
    UrlSynced(SyncOutcome),
    /// The URL's search text reached the listing.
    SearchApplied {
        search: String,
        outcome: FetchOutcome,
    },
}

/// The search box, the URL and a file feed wired together.
///
/// Two debounce stages run in sequence: keystrokes settle into the URL, then
/// the URL settles into the listing query.
pub struct ListingSession<L, S> {
    search: SearchSync<L>,
    feed: Arc<FileFeed<S>>,
    fetch_debounce: Debouncer<String>,
    fetch_rx: watch::Receiver<String>,
}

impl<L: LocationBar, S: PageSource> ListingSession<L, S> {
    pub fn new(location: L, feed: Arc<FileFeed<S>>, timings: &Timings) -> Self {
        let search = SearchSync::new(location, timings.search_debounce);
        let (fetch_debounce, fetch_rx) = Debouncer::new(search.search(), timings.fetch_debounce);
        Self {
            search,
            feed,
            fetch_debounce,
            fetch_rx,
        }
    }

    pub fn feed(&self) -> &Arc<FileFeed<S>> {
        &self.feed
    }

    pub fn search_input(&self) -> &str {
        self.search.input()
    }

    pub fn location(&self) -> &L {
        self.search.location()
    }

    /// Bind vendor and token and load page 1 for the search already in the URL.
    pub async fn open(&self, vendor: &str, token: &str) -> FetchOutcome {
        self.feed.set_search(&self.search.search()).await;
        self.feed.set_context(vendor, token).await
    }

    pub fn type_search(&mut self, text: &str) {
        self.search.on_input(text);
    }

    /// The URL was changed by navigation.
    pub fn location_changed(&mut self) {
        self.search.on_location_changed();
        self.fetch_debounce.schedule(self.search.search());
    }

    /// Wait for the next stage of the pipeline to settle and apply it.
    pub async fn next_event(&mut self) -> SessionEvent {
        tokio::select! {
            outcome = self.search.next_settled() => {
                self.fetch_debounce.schedule(self.search.search());
                SessionEvent::UrlSynced(outcome)
            }
            Ok(()) = self.fetch_rx.changed() => {
                let search = self.fetch_rx.borrow_and_update().clone();
                debug!(%search, "search settled, updating listing");
                let outcome = self.feed.set_search(&search).await;
                SessionEvent::SearchApplied { search, outcome }
            }
        }
    }

    pub async fn on_sentinel(&self, ratio: f32) -> FetchOutcome {
        self.feed.on_sentinel(ratio).await
    }

    /// Teardown: cancel pending debounces and stop the scroll trigger.
    pub fn close(&self) {
        self.search.cancel();
        self.fetch_debounce.cancel();
        self.feed.close();
    }
}
