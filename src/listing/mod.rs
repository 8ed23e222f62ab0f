//! Vendor file listing
//!
//! Paginated fetches against the files endpoint, the infinite page cache,
//! debounced search state bound to the URL, and the scroll trigger that
//! asks for more.

pub mod cache;
pub mod debounce;
pub mod feed;
pub mod fetch;
pub mod kind;
pub mod schema;
pub mod scroll;
pub mod search;
pub mod session;
pub mod storage;

pub use cache::{normalize_search, InfiniteList, ListPhase, ListView, QueryKey};
pub use feed::{FetchOutcome, FileFeed, ListSnapshot};
pub use fetch::{FetchError, FilesClient, PageQuery, PageSource};
pub use kind::FileKind;
pub use schema::{FileItem, FileRecord, Page, VendorRef};
pub use search::{LocationBar, MemoryLocation, SearchSync, SyncOutcome};
pub use session::{ListingSession, SessionEvent, Timings};
pub use storage::StorageDomain;
