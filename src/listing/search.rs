//! Search text <-> `?value=` query parameter binding.
//!
//! The query parameter is the source of truth. The input text is a mirror
//! that updates on every keystroke and reaches the URL through a debouncer.

use super::debounce::Debouncer;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

/// Query parameter holding the search text.
pub const SEARCH_PARAM: &str = "value";

/// Quiet period between the last keystroke and the URL update.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(500);

/// Ordered, decoded query-string pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Parse a query string, with or without the leading `?`.
    ///
    /// `+` decodes to a space. Pairs that do not decode to UTF-8 are dropped.
    pub fn parse(query: &str) -> Self {
        let pairs = query
            .trim_start_matches('?')
            .split('&')
            .filter(|part| !part.is_empty())
            .filter_map(|part| {
                let (name, value) = part.split_once('=').unwrap_or((part, ""));
                Some((decode(name)?, decode(value)?))
            })
            .collect();
        Self { pairs }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Replace every occurrence of `name` with a single pair, keeping its position.
    pub fn set(&mut self, name: &str, value: &str) {
        match self.pairs.iter().position(|(n, _)| n == name) {
            Some(idx) => {
                self.pairs[idx].1 = value.to_string();
                let mut seen = 0;
                self.pairs.retain(|(n, _)| {
                    if n != name {
                        return true;
                    }
                    seen += 1;
                    seen == 1
                });
            }
            None => self.pairs.push((name.to_string(), value.to_string())),
        }
    }

    pub fn remove(&mut self, name: &str) {
        self.pairs.retain(|(n, _)| n != name);
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Encoded form without the leading `?`.
    pub fn encode(&self) -> String {
        self.pairs
            .iter()
            .map(|(n, v)| format!("{}={}", urlencoding::encode(n), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

fn decode(raw: &str) -> Option<String> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced).ok().map(|s| s.into_owned())
}

/// Trimmed search text held in a query string. Absent or undecodable means empty.
pub fn search_from_query(query: &str) -> String {
    QueryParams::parse(query)
        .get(SEARCH_PARAM)
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

/// The address bar the search state lives in.
pub trait LocationBar: Send {
    /// Current query string, without the leading `?`.
    fn query(&self) -> String;

    /// Replace the current history entry's query string.
    fn replace_query(&mut self, query: String);
}

/// In-memory history used by the CLI and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryLocation {
    entries: Vec<String>,
    cursor: usize,
    replacements: usize,
}

impl MemoryLocation {
    pub fn new(query: &str) -> Self {
        Self {
            entries: vec![query.trim_start_matches('?').to_string()],
            cursor: 0,
            replacements: 0,
        }
    }

    /// Navigate to a new entry (drops any forward history).
    pub fn push(&mut self, query: &str) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(query.trim_start_matches('?').to_string());
        self.cursor = self.entries.len() - 1;
    }

    pub fn back(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    pub fn history_len(&self) -> usize {
        self.entries.len()
    }

    pub fn replacements(&self) -> usize {
        self.replacements
    }
}

impl LocationBar for MemoryLocation {
    fn query(&self) -> String {
        self.entries.get(self.cursor).cloned().unwrap_or_default()
    }

    fn replace_query(&mut self, query: String) {
        self.replacements += 1;
        match self.entries.get_mut(self.cursor) {
            Some(entry) => *entry = query,
            None => self.entries.push(query),
        }
    }
}

/// A location shared between the synchronizer and whoever drives navigation.
#[derive(Debug, Default)]
pub struct SharedLocation<L>(Arc<Mutex<L>>);

impl<L> Clone for SharedLocation<L> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<L> SharedLocation<L> {
    pub fn new(location: L) -> Self {
        Self(Arc::new(Mutex::new(location)))
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut L) -> R) -> R {
        f(&mut self.0.lock())
    }
}

impl<L: LocationBar> LocationBar for SharedLocation<L> {
    fn query(&self) -> String {
        self.0.lock().query()
    }

    fn replace_query(&mut self, query: String) {
        self.0.lock().replace_query(query);
    }
}

/// Result of applying a settled input value to the URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// URL already held this value.
    Unchanged,
    /// Parameter removed.
    Cleared,
    Updated(String),
}

pub struct SearchSync<L> {
    location: L,
    input: String,
    debouncer: Debouncer<String>,
    settled: watch::Receiver<String>,
}

impl<L: LocationBar> SearchSync<L> {
    pub fn new(location: L, quiet: Duration) -> Self {
        let input = search_from_query(&location.query());
        let (debouncer, settled) = Debouncer::new(input.clone(), quiet);
        Self {
            location,
            input,
            debouncer,
            settled,
        }
    }

    /// Text shown in the search field.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Trimmed search text currently in the URL.
    pub fn search(&self) -> String {
        search_from_query(&self.location.query())
    }

    pub fn location(&self) -> &L {
        &self.location
    }

    /// A keystroke: the field updates now, the URL after the quiet period.
    pub fn on_input(&mut self, text: &str) {
        self.input = text.to_string();
        self.debouncer.schedule(text.to_string());
    }

    /// The URL changed outside this synchronizer (back/forward, link).
    /// Pending keystrokes are dropped and the field is re-read from the URL.
    pub fn on_location_changed(&mut self) {
        self.input = self.search();
        self.debouncer.reset(self.input.clone());
        self.settled.mark_unchanged();
        debug!(search = %self.input, "search field re-initialised from location");
    }

    /// Drop a pending keystroke without touching the URL. The field keeps its text.
    pub fn cancel(&self) {
        self.debouncer.cancel();
    }

    /// Write a settled value to the URL with replace semantics.
    pub fn apply(&mut self, settled: &str) -> SyncOutcome {
        let value = settled.trim();
        if value == self.search() {
            return SyncOutcome::Unchanged;
        }

        let mut params = QueryParams::parse(&self.location.query());
        let outcome = if value.is_empty() {
            params.remove(SEARCH_PARAM);
            SyncOutcome::Cleared
        } else {
            params.set(SEARCH_PARAM, value);
            SyncOutcome::Updated(value.to_string())
        };
        self.location.replace_query(params.encode());
        debug!(?outcome, "search parameter synchronised");
        outcome
    }

    /// Wait for the next settled input and apply it. Cancel-safe.
    pub async fn next_settled(&mut self) -> SyncOutcome {
        if self.settled.changed().await.is_err() {
            // Sender lives in `self.debouncer`; unreachable while `self` exists.
            std::future::pending::<()>().await;
        }
        let value = self.settled.borrow_and_update().clone();
        self.apply(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[test]
    fn query_params_round_trip_and_order() {
        let mut params = QueryParams::parse("?tab=files&value=q3+report&x=%2Fa");
        assert_eq!(params.get("value"), Some("q3 report"));
        assert_eq!(params.get("x"), Some("/a"));

        params.set("value", "annual");
        assert_eq!(params.encode(), "tab=files&value=annual&x=%2Fa");
        params.remove("value");
        assert_eq!(params.encode(), "tab=files&x=%2Fa");
    }

    #[test]
    fn set_collapses_duplicates() {
        let mut params = QueryParams::parse("value=a&value=b&k=1");
        params.set("value", "c");
        assert_eq!(params.encode(), "value=c&k=1");
    }

    #[test]
    fn malformed_param_is_empty_search() {
        assert_eq!(search_from_query("value=%FF%FE"), "");
        assert_eq!(search_from_query(""), "");
        assert_eq!(search_from_query("value=%20%20report%20"), "report");
    }

    #[tokio::test]
    async fn apply_trims_sets_and_clears() {
        let mut sync = SearchSync::new(MemoryLocation::new("tab=files"), SEARCH_DEBOUNCE);

        assert_eq!(
            sync.apply("  report  "),
            SyncOutcome::Updated("report".to_string())
        );
        assert_eq!(sync.location().query(), "tab=files&value=report");

        assert_eq!(sync.apply("report "), SyncOutcome::Unchanged);

        assert_eq!(sync.apply("   "), SyncOutcome::Cleared);
        assert_eq!(sync.location().query(), "tab=files");
        assert_eq!(sync.apply(""), SyncOutcome::Unchanged);
    }

    #[tokio::test]
    async fn url_updates_replace_history() {
        let mut sync = SearchSync::new(MemoryLocation::new(""), SEARCH_DEBOUNCE);
        sync.apply("a");
        sync.apply("ab");
        assert_eq!(sync.location().history_len(), 1);
        assert_eq!(sync.location().replacements(), 2);
    }

    #[tokio::test]
    async fn field_initialises_from_url() {
        let sync = SearchSync::new(MemoryLocation::new("?value=%20q3%20"), SEARCH_DEBOUNCE);
        assert_eq!(sync.input(), "q3");
        assert_eq!(sync.search(), "q3");
    }

    #[tokio::test(start_paused = true)]
    async fn keystrokes_settle_once() {
        let mut sync = SearchSync::new(MemoryLocation::new(""), SEARCH_DEBOUNCE);
        for text in ["a", "ab", "abc"] {
            sync.on_input(text);
            assert_eq!(sync.input(), text);
            sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(sync.search(), "");

        let outcome = sync.next_settled().await;
        assert_eq!(outcome, SyncOutcome::Updated("abc".to_string()));
        assert_eq!(sync.location().query(), "value=abc");
        assert_eq!(sync.location().replacements(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_keystroke_never_settles() {
        let mut sync = SearchSync::new(MemoryLocation::new("value=q3"), SEARCH_DEBOUNCE);
        sync.on_input("q4");
        sync.cancel();

        let settled = tokio::time::timeout(Duration::from_secs(2), sync.next_settled()).await;
        assert!(settled.is_err());
        assert_eq!(sync.input(), "q4");
        assert_eq!(sync.location().query(), "value=q3");
    }

    #[tokio::test(start_paused = true)]
    async fn back_navigation_reinitialises_field() {
        let shared = SharedLocation::new(MemoryLocation::new("value=first"));
        let mut sync = SearchSync::new(shared.clone(), SEARCH_DEBOUNCE);
        shared.with(|loc| loc.push("value=second"));
        sync.on_location_changed();
        assert_eq!(sync.input(), "second");

        sync.on_input("typed");
        shared.with(|loc| loc.back());
        sync.on_location_changed();
        assert_eq!(sync.input(), "first");

        // the dropped keystroke never reaches the URL
        sleep(Duration::from_secs(1)).await;
        assert_eq!(sync.search(), "first");
    }
}
