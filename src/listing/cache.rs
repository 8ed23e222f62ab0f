//! Infinite list of fetched pages for one (vendor, search) key.
//!
//! The list never performs I/O. It hands out [`FetchRequest`]s and accepts
//! their results through [`InfiniteList::complete`]; a result whose ticket no
//! longer matches the in-flight ticket is dropped.

use super::fetch::{FetchError, PageQuery};
use super::schema::{FileItem, Page};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// How long a successful result counts as fresh.
pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(5 * 60);

/// Trim and collapse internal whitespace runs to a single space.
pub fn normalize_search(search: &str) -> String {
    search.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Identity of a listing. A different key is a different query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    vendor: String,
    search: String,
}

impl QueryKey {
    pub fn new(vendor: &str, search: &str) -> Self {
        Self {
            vendor: vendor.to_string(),
            search: normalize_search(search),
        }
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    pub fn search(&self) -> &str {
        &self.search
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListPhase {
    /// No key (vendor or token missing).
    Idle,
    LoadingFirstPage,
    Ready,
    LoadingNextPage,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    FirstPage,
    NextPage,
    /// Page 1 again for a key that may already hold pages.
    Refresh,
    /// Background page-1 refresh; later cached pages are kept.
    Revalidate,
}

/// Identifies one issued fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    id: u64,
    key: QueryKey,
    page: u32,
    kind: FetchKind,
}

impl Ticket {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn kind(&self) -> FetchKind {
        self.kind
    }
}

/// A fetch the caller should perform and report back.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub ticket: Ticket,
}

impl FetchRequest {
    pub fn query(&self, token: &str, limit: u32) -> PageQuery {
        PageQuery {
            vendor: self.ticket.key.vendor.clone(),
            token: token.to_string(),
            limit,
            page: self.ticket.page,
            search: self.ticket.key.search.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// Superseded ticket or out-of-order page; nothing changed.
    Discarded,
    Failed,
}

/// What the UI should render.
#[derive(Debug, Clone, PartialEq)]
pub enum ListView<'a> {
    NotReady,
    Loading,
    Failed { message: &'a str },
    Empty,
    Files {
        files: Vec<&'a FileItem>,
        has_more: bool,
        loading_more: bool,
    },
}

#[derive(Debug, Clone)]
struct CachedPage {
    number: u32,
    page: Page,
}

#[derive(Debug)]
pub struct InfiniteList {
    key: Option<QueryKey>,
    pages: Vec<CachedPage>,
    phase: ListPhase,
    in_flight: Option<Ticket>,
    error: Option<String>,
    fetched_at: Option<Instant>,
    stale_time: Duration,
    next_ticket: u64,
}

impl Default for InfiniteList {
    fn default() -> Self {
        Self::new(DEFAULT_STALE_TIME)
    }
}

impl InfiniteList {
    pub fn new(stale_time: Duration) -> Self {
        Self {
            key: None,
            pages: Vec::new(),
            phase: ListPhase::Idle,
            in_flight: None,
            error: None,
            fetched_at: None,
            stale_time,
            next_ticket: 0,
        }
    }

    pub fn key(&self) -> Option<&QueryKey> {
        self.key.as_ref()
    }

    pub fn phase(&self) -> ListPhase {
        self.phase
    }

    /// Switch to `key`. A different key drops every cached page and requests page 1.
    pub fn set_key(&mut self, key: Option<QueryKey>) -> Option<FetchRequest> {
        if self.key == key {
            return None;
        }
        debug!(?key, "listing key changed, discarding {} page(s)", self.pages.len());
        self.pages.clear();
        self.in_flight = None;
        self.error = None;
        self.fetched_at = None;
        self.key = key;

        if self.key.is_none() {
            self.phase = ListPhase::Idle;
            return None;
        }
        self.phase = ListPhase::LoadingFirstPage;
        self.issue(1, FetchKind::FirstPage)
    }

    /// Request the page after the last cached one.
    ///
    /// No-op while any fetch is in flight, before the first page has loaded,
    /// or once the server reported no next page.
    pub fn fetch_next_page(&mut self) -> Option<FetchRequest> {
        if self.in_flight.is_some() || self.phase != ListPhase::Ready {
            return None;
        }
        let next = self.next_page_number()?;
        self.phase = ListPhase::LoadingNextPage;
        self.issue(next, FetchKind::NextPage)
    }

    /// Re-request page 1 for the current key. Cached pages stay visible until it lands.
    pub fn refetch(&mut self) -> Option<FetchRequest> {
        self.key.as_ref()?;
        if matches!(
            self.in_flight.as_ref().map(Ticket::kind),
            Some(FetchKind::FirstPage | FetchKind::Refresh | FetchKind::Revalidate)
        ) {
            return None;
        }
        self.error = None;
        if self.pages.is_empty() {
            self.phase = ListPhase::LoadingFirstPage;
            self.issue(1, FetchKind::FirstPage)
        } else {
            // A pending next-page request is superseded by the refresh.
            self.phase = ListPhase::Ready;
            self.issue(1, FetchKind::Refresh)
        }
    }

    /// Background refresh once the fresh window has passed.
    ///
    /// Only page 1 is re-requested and it replaces the cached first page in
    /// place, so a list scrolled several pages deep keeps its length.
    pub fn revalidate(&mut self, now: Instant) -> Option<FetchRequest> {
        if self.phase != ListPhase::Ready || self.in_flight.is_some() || !self.is_stale(now) {
            return None;
        }
        debug!(pages = self.pages.len(), "listing is stale, revalidating first page");
        self.issue(1, FetchKind::Revalidate)
    }

    pub fn is_stale(&self, now: Instant) -> bool {
        self.fetched_at
            .map_or(true, |at| now.saturating_duration_since(at) >= self.stale_time)
    }

    /// Apply the result of an issued fetch.
    pub fn complete(
        &mut self,
        ticket: &Ticket,
        result: Result<Page, FetchError>,
        now: Instant,
    ) -> Completion {
        if !self.is_current(ticket) {
            debug!(page = ticket.page, "discarding response for superseded request");
            return Completion::Discarded;
        }
        self.in_flight = None;

        match result {
            Ok(page) => match ticket.kind {
                FetchKind::FirstPage | FetchKind::Refresh => {
                    self.pages = vec![CachedPage {
                        number: ticket.page,
                        page,
                    }];
                    self.settle(now)
                }
                FetchKind::Revalidate => {
                    if self.pages.first().is_some_and(|p| p.number == ticket.page) {
                        self.pages[0].page = page;
                    } else {
                        self.pages = vec![CachedPage {
                            number: ticket.page,
                            page,
                        }];
                    }
                    self.settle(now)
                }
                FetchKind::NextPage => {
                    let last = self.pages.last().map_or(0, |p| p.number);
                    if ticket.page <= last {
                        debug!(page = ticket.page, last, "discarding out-of-order page");
                        self.phase = ListPhase::Ready;
                        return Completion::Discarded;
                    }
                    self.pages.push(CachedPage {
                        number: ticket.page,
                        page,
                    });
                    self.settle(now)
                }
            },
            Err(err) if ticket.kind == FetchKind::Revalidate => {
                debug!(error = %err, "background revalidation failed, keeping cached pages");
                self.phase = ListPhase::Ready;
                Completion::Failed
            }
            Err(err) => {
                debug!(page = ticket.page, error = %err, "listing fetch failed");
                self.error = Some(err.to_string());
                self.phase = ListPhase::Error;
                Completion::Failed
            }
        }
    }

    /// The source declined to fetch (not ready). Nothing is shown as an error.
    pub fn abandon(&mut self, ticket: &Ticket) {
        if !self.is_current(ticket) {
            return;
        }
        self.in_flight = None;
        self.phase = if self.pages.is_empty() {
            ListPhase::Idle
        } else {
            ListPhase::Ready
        };
    }

    /// The caller gave up on an issued fetch before it completed.
    ///
    /// Cached pages stay as they were. With nothing cached the list surfaces
    /// an error so the explicit retry (`refetch`) is available.
    pub fn cancel(&mut self, ticket: &Ticket) {
        if !self.is_current(ticket) {
            return;
        }
        debug!(page = ticket.page, kind = ?ticket.kind, "listing fetch cancelled");
        self.in_flight = None;
        if self.pages.is_empty() {
            self.error = Some("request cancelled before it completed".to_string());
            self.phase = ListPhase::Error;
        } else {
            self.phase = ListPhase::Ready;
        }
    }

    pub fn pages(&self) -> impl Iterator<Item = &Page> {
        self.pages.iter().map(|p| &p.page)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Every cached file, in page order then server order.
    pub fn files(&self) -> impl Iterator<Item = &FileItem> {
        self.pages().flat_map(|p| p.files.iter())
    }

    pub fn has_next_page(&self) -> bool {
        self.next_page_number().is_some()
    }

    /// True only while the first page of a key is pending.
    pub fn is_loading(&self) -> bool {
        self.phase == ListPhase::LoadingFirstPage
    }

    pub fn is_fetching_next_page(&self) -> bool {
        self.phase == ListPhase::LoadingNextPage
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(
            self.in_flight.as_ref().map(Ticket::kind),
            Some(FetchKind::Refresh | FetchKind::Revalidate)
        )
    }

    pub fn is_error(&self) -> bool {
        self.phase == ListPhase::Error
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn view(&self) -> ListView<'_> {
        match self.phase {
            ListPhase::Idle => ListView::NotReady,
            ListPhase::LoadingFirstPage => ListView::Loading,
            ListPhase::Error => ListView::Failed {
                message: self.error.as_deref().unwrap_or("Error loading files"),
            },
            ListPhase::Ready | ListPhase::LoadingNextPage => {
                let files: Vec<&FileItem> = self.files().collect();
                if files.is_empty() && !self.has_next_page() {
                    ListView::Empty
                } else {
                    ListView::Files {
                        files,
                        has_more: self.has_next_page(),
                        loading_more: self.is_fetching_next_page(),
                    }
                }
            }
        }
    }

    fn next_page_number(&self) -> Option<u32> {
        let last = self.pages.last()?;
        if !last.page.has_next_page {
            return None;
        }
        last.page.next_page
    }

    fn is_current(&self, ticket: &Ticket) -> bool {
        self.key.as_ref() == Some(&ticket.key) && self.in_flight.as_ref() == Some(ticket)
    }

    fn settle(&mut self, now: Instant) -> Completion {
        self.phase = ListPhase::Ready;
        self.error = None;
        self.fetched_at = Some(now);
        Completion::Applied
    }

    fn issue(&mut self, page: u32, kind: FetchKind) -> Option<FetchRequest> {
        let key = self.key.clone()?;
        self.next_ticket += 1;
        let ticket = Ticket {
            id: self.next_ticket,
            key,
            page,
            kind,
        };
        self.in_flight = Some(ticket.clone());
        Some(FetchRequest { ticket })
    }
}
