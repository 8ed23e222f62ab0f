use super::cache::{Completion, FetchRequest, InfiniteList, ListPhase, QueryKey, Ticket};
use super::fetch::PageSource;
use super::schema::FileItem;
use super::scroll::{LoadState, ScrollTrigger};
use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// What a feed call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Nothing was requested (not ready, no next page, or already in flight).
    Skipped,
    Applied,
    /// The response belonged to a superseded request.
    Discarded,
    Failed,
}

impl From<Completion> for FetchOutcome {
    fn from(c: Completion) -> Self {
        match c {
            Completion::Applied => Self::Applied,
            Completion::Discarded => Self::Discarded,
            Completion::Failed => Self::Failed,
        }
    }
}

/// Owned copy of the list state for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct ListSnapshot {
    pub phase: ListPhase,
    pub files: Vec<FileItem>,
    pub has_next_page: bool,
    pub is_loading: bool,
    pub is_fetching_next_page: bool,
    pub is_error: bool,
    pub error: Option<String>,
    pub total_files: Option<u64>,
}

struct FeedState {
    list: InfiniteList,
    trigger: ScrollTrigger,
    vendor: String,
    token: String,
    search: String,
}

impl FeedState {
    fn key(&self) -> Option<QueryKey> {
        if self.vendor.is_empty() || self.token.is_empty() {
            return None;
        }
        Some(QueryKey::new(&self.vendor, &self.search))
    }

    fn load_state(&self) -> LoadState {
        LoadState {
            has_next_page: self.list.has_next_page(),
            is_fetching_next_page: self.list.is_fetching_next_page(),
        }
    }

    fn issued(&self, req: Option<FetchRequest>) -> Option<(FetchRequest, String)> {
        req.map(|r| (r, self.token.clone()))
    }
}

/// A vendor's file listing: the page cache, its fetch context and the scroll trigger.
///
/// The state lock is never held across an await; concurrent callers see the
/// in-flight ticket and back off.
pub struct FileFeed<S> {
    source: S,
    page_size: u32,
    state: Mutex<FeedState>,
}

impl<S: PageSource> FileFeed<S> {
    pub fn new(source: S, page_size: u32, stale_time: Duration) -> Self {
        Self {
            source,
            page_size: page_size.max(1),
            state: Mutex::new(FeedState {
                list: InfiniteList::new(stale_time),
                trigger: ScrollTrigger::default(),
                vendor: String::new(),
                token: String::new(),
                search: String::new(),
            }),
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Set vendor and bearer token. Fetching starts once both are non-empty.
    pub async fn set_context(&self, vendor: &str, token: &str) -> FetchOutcome {
        let issued = {
            let mut st = self.state.lock();
            st.vendor = vendor.trim().to_string();
            st.token = token.trim().to_string();
            let key = st.key();
            let req = st.list.set_key(key);
            st.issued(req)
        };
        self.run(issued).await
    }

    /// Set the search text. A changed key restarts at page 1.
    pub async fn set_search(&self, search: &str) -> FetchOutcome {
        let issued = {
            let mut st = self.state.lock();
            st.search = search.to_string();
            let key = st.key();
            let req = st.list.set_key(key);
            st.issued(req)
        };
        self.run(issued).await
    }

    pub async fn fetch_next_page(&self) -> FetchOutcome {
        let issued = {
            let mut st = self.state.lock();
            let req = st.list.fetch_next_page();
            st.issued(req)
        };
        self.run(issued).await
    }

    /// Retry / manual refresh of the current key.
    pub async fn refetch(&self) -> FetchOutcome {
        let issued = {
            let mut st = self.state.lock();
            let req = st.list.refetch();
            st.issued(req)
        };
        self.run(issued).await
    }

    /// Refresh in the background if the data is older than the stale window.
    pub async fn revalidate(&self) -> FetchOutcome {
        let issued = {
            let mut st = self.state.lock();
            let req = st.list.revalidate(Instant::now());
            st.issued(req)
        };
        self.run(issued).await
    }

    /// Sentinel visibility report from the view.
    pub async fn on_sentinel(&self, ratio: f32) -> FetchOutcome {
        let fire = {
            let mut st = self.state.lock();
            let load = st.load_state();
            st.trigger.on_intersection(ratio, load)
        };
        if !fire {
            return FetchOutcome::Skipped;
        }
        self.fetch_next_page().await
    }

    /// Teardown: stop reacting to sentinel reports.
    pub fn close(&self) {
        self.state.lock().trigger.disconnect();
    }

    pub fn with_list<R>(&self, f: impl FnOnce(&InfiniteList) -> R) -> R {
        f(&self.state.lock().list)
    }

    pub fn files(&self) -> Vec<FileItem> {
        self.with_list(|list| list.files().cloned().collect())
    }

    pub fn snapshot(&self) -> ListSnapshot {
        self.with_list(|list| ListSnapshot {
            phase: list.phase(),
            files: list.files().cloned().collect(),
            has_next_page: list.has_next_page(),
            is_loading: list.is_loading(),
            is_fetching_next_page: list.is_fetching_next_page(),
            is_error: list.is_error(),
            error: list.error().map(str::to_string),
            total_files: list.pages().last().and_then(|p| p.total_files),
        })
    }

    async fn run(&self, issued: Option<(FetchRequest, String)>) -> FetchOutcome {
        let Some((req, token)) = issued else {
            return FetchOutcome::Skipped;
        };
        let query = req.query(&token, self.page_size);
        debug!(
            vendor = %query.vendor,
            page = query.page,
            search = %query.search,
            "fetching files page"
        );

        let guard = InFlight {
            state: &self.state,
            ticket: Some(req.ticket.clone()),
        };
        let result = self.source.fetch_page(&query).await;
        guard.disarm();

        let mut st = self.state.lock();
        match result {
            Ok(Some(page)) => {
                let completion = st.list.complete(&req.ticket, Ok(page), Instant::now());
                if completion == Completion::Applied {
                    st.trigger.rearm();
                }
                completion.into()
            }
            Ok(None) => {
                st.list.abandon(&req.ticket);
                FetchOutcome::Skipped
            }
            Err(err) => {
                warn!(vendor = %query.vendor, page = query.page, error = %err, "files page failed");
                st.list.complete(&req.ticket, Err(err), Instant::now()).into()
            }
        }
    }
}

/// Releases the ticket if the fetch future is dropped mid-request.
struct InFlight<'a> {
    state: &'a Mutex<FeedState>,
    ticket: Option<Ticket>,
}

impl InFlight<'_> {
    fn disarm(mut self) {
        self.ticket = None;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            self.state.lock().list.cancel(&ticket);
        }
    }
}
