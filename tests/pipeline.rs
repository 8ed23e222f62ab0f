use async_trait::async_trait;
use parking_lot::Mutex;
use reportshare::listing::search::SharedLocation;
use reportshare::listing::{
    FetchError, FetchOutcome, FileFeed, FileItem, FileKind, ListingSession, LocationBar,
    MemoryLocation, Page, PageQuery, PageSource, SessionEvent, SyncOutcome, Timings, VendorRef,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// 25 files per search term, served `limit` at a time after a short delay.
#[derive(Default)]
struct Catalog {
    calls: Mutex<Vec<PageQuery>>,
}

#[async_trait]
impl PageSource for Catalog {
    async fn fetch_page(&self, query: &PageQuery) -> Result<Option<Page>, FetchError> {
        if !query.is_ready() {
            return Ok(None);
        }
        self.calls.lock().push(query.clone());
        sleep(Duration::from_millis(20)).await;

        let total = 25;
        let limit = query.limit as usize;
        let start = (query.page as usize - 1) * limit;
        let end = (start + limit).min(total);
        let has_next_page = end < total;
        Ok(Some(Page {
            files: (start..end)
                .map(|i| file(&query.vendor, &query.search, i))
                .collect(),
            has_next_page,
            next_page: has_next_page.then_some(query.page + 1),
            total_files: Some(total as u64),
        }))
    }
}

fn file(vendor: &str, search: &str, index: usize) -> FileItem {
    let id = format!("{vendor}/{search}/{index}");
    FileItem {
        id: id.clone(),
        name: format!("{index}.docx"),
        size: 10,
        path: String::new(),
        url: format!("https://s3/{index}.docx"),
        vendor_id: vendor.to_string(),
        shared_at: "2024-06-01T09:00:00Z".into(),
        shared_by_id: "u1".into(),
        shared_by: "Lin".into(),
        shared_on: "Jun 1, 2024".into(),
        vendor: VendorRef {
            id: vendor.to_string(),
            name: vendor.to_string(),
        },
        kind: FileKind::Docx,
    }
}

fn ids(feed: &FileFeed<Catalog>) -> Vec<String> {
    feed.files().into_iter().map(|f| f.id).collect()
}

fn session(
    query: &str,
) -> (
    ListingSession<SharedLocation<MemoryLocation>, Catalog>,
    Arc<FileFeed<Catalog>>,
) {
    let timings = Timings::default();
    let feed = Arc::new(FileFeed::new(
        Catalog::default(),
        timings.page_size,
        timings.stale_time,
    ));
    let location = SharedLocation::new(MemoryLocation::new(query));
    (
        ListingSession::new(location, Arc::clone(&feed), &timings),
        feed,
    )
}

#[tokio::test(start_paused = true)]
async fn scrolling_appends_the_second_page_in_order() {
    let (session, feed) = session("");
    assert_eq!(session.open("Pentagon", "tok").await, FetchOutcome::Applied);

    let first = feed.snapshot();
    assert_eq!(first.files.len(), 10);
    assert!(first.has_next_page);

    assert_eq!(session.on_sentinel(1.0).await, FetchOutcome::Applied);
    let expected: Vec<String> = (0..20).map(|i| format!("Pentagon//{i}")).collect();
    assert_eq!(ids(&feed), expected);
}

#[tokio::test(start_paused = true)]
async fn new_search_resets_pagination() {
    let (mut session, feed) = session("");
    session.open("Pentagon", "tok").await;
    session.on_sentinel(1.0).await;
    assert_eq!(feed.files().len(), 20);

    session.type_search("  invoices ");
    assert_eq!(
        session.next_event().await,
        SessionEvent::UrlSynced(SyncOutcome::Updated("invoices".into()))
    );
    assert_eq!(session.location().query(), "value=invoices");
    session.next_event().await;

    let expected: Vec<String> = (0..10).map(|i| format!("Pentagon/invoices/{i}")).collect();
    assert_eq!(ids(&feed), expected);

    assert_eq!(feed.with_list(|l| l.page_count()), 1);
    assert_eq!(
        feed.with_list(|l| l.key().map(|k| k.search().to_string())),
        Some("invoices".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn vendor_switch_drops_previous_vendor_pages() {
    let (session, feed) = session("");
    session.open("Pentagon", "tok").await;
    session.on_sentinel(1.0).await;

    assert_eq!(feed.set_context("Acme", "tok").await, FetchOutcome::Applied);
    assert!(ids(&feed).iter().all(|id| id.starts_with("Acme/")));
    assert_eq!(feed.files().len(), 10);
}

#[tokio::test(start_paused = true)]
async fn stops_at_the_last_page_even_if_sentinel_stays_visible() {
    let (session, feed) = session("");
    session.open("Pentagon", "tok").await;

    let mut outcomes = Vec::new();
    for _ in 0..5 {
        outcomes.push(session.on_sentinel(1.0).await);
    }
    assert_eq!(
        outcomes,
        vec![
            FetchOutcome::Applied,
            FetchOutcome::Applied,
            FetchOutcome::Skipped,
            FetchOutcome::Skipped,
            FetchOutcome::Skipped,
        ]
    );
    assert_eq!(feed.files().len(), 25);
    assert!(!feed.snapshot().has_next_page);
}

#[tokio::test(start_paused = true)]
async fn refetch_is_idempotent() {
    let (session, feed) = session("value=q1");
    session.open("Pentagon", "tok").await;
    let before = ids(&feed);

    assert_eq!(feed.refetch().await, FetchOutcome::Applied);
    assert_eq!(ids(&feed), before);
    assert_eq!(feed.with_list(|l| l.page_count()), 1);
}

#[tokio::test(start_paused = true)]
async fn closed_session_stops_paging() {
    let (session, feed) = session("");
    session.open("Pentagon", "tok").await;
    session.close();
    assert_eq!(session.on_sentinel(1.0).await, FetchOutcome::Skipped);
    assert_eq!(feed.files().len(), 10);
}
