use super::kind::FileKind;
use super::storage::StorageDomain;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// `sharedOn` text used when `sharedAt` is not a valid timestamp.
pub const INVALID_DATE: &str = "Invalid Date";

/// Vendor name shown when the API omits the vendor relation.
pub const UNKNOWN_VENDOR: &str = "Unknown Vendor";

/// A file as returned by the files endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: String,
    pub name: String,
    /// MIME string as stored at upload time.
    #[serde(rename = "type")]
    pub mime_type: String,
    pub size: u64,
    /// Storage-relative object key.
    pub url: String,
    pub path: String,
    pub shared_at: String,
    pub shared_by_id: String,
    pub vendor_id: String,
    pub shared_by: Author,
    #[serde(default)]
    pub vendor: Option<VendorRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: String,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorRef {
    pub id: String,
    pub name: String,
}

impl VendorRef {
    pub fn unknown() -> Self {
        Self {
            id: String::new(),
            name: UNKNOWN_VENDOR.to_string(),
        }
    }
}

/// Body of `GET /files`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesResponse {
    pub files: Vec<FileRecord>,
    pub has_next_page: bool,
    pub next_page: Option<u32>,
    #[serde(default)]
    pub current_page: Option<u32>,
    #[serde(default)]
    pub total_files: Option<u64>,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub has_prev_page: bool,
    #[serde(default)]
    pub prev_page: Option<u32>,
}

/// Presentation shape of a file. Built once per fetched record and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileItem {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub path: String,
    /// Absolute, storage-domain-prefixed URL.
    pub url: String,
    pub vendor_id: String,
    pub shared_at: String,
    pub shared_by_id: String,
    /// Display name of the uploader.
    pub shared_by: String,
    /// Short date, e.g. `Jan 5, 2024`.
    pub shared_on: String,
    pub vendor: VendorRef,
    #[serde(rename = "type")]
    pub kind: FileKind,
}

impl FileRecord {
    pub fn into_item(self, storage: &StorageDomain) -> FileItem {
        let shared_on = format_shared_on(&self.shared_at);
        let kind = FileKind::from_mime(&self.mime_type);
        let url = storage.absolute_url(&self.url);
        let vendor = match self.vendor {
            Some(v) => VendorRef {
                id: v.id,
                name: if v.name.is_empty() {
                    UNKNOWN_VENDOR.to_string()
                } else {
                    v.name
                },
            },
            None => VendorRef::unknown(),
        };

        FileItem {
            id: self.id,
            name: self.name,
            size: self.size,
            path: self.path,
            url,
            vendor_id: self.vendor_id,
            shared_at: self.shared_at,
            shared_by_id: self.shared_by_id,
            shared_by: self.shared_by.full_name,
            shared_on,
            vendor,
            kind,
        }
    }
}

/// One page of the listing, as produced by a single fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub files: Vec<FileItem>,
    pub has_next_page: bool,
    /// Server cursor for the following page.
    pub next_page: Option<u32>,
    #[serde(default)]
    pub total_files: Option<u64>,
}

impl Page {
    /// Transform a raw response. Pagination fields are passed through as the server sent them.
    pub fn from_response(resp: FilesResponse, storage: &StorageDomain) -> Self {
        Self {
            files: resp
                .files
                .into_iter()
                .map(|record| record.into_item(storage))
                .collect(),
            has_next_page: resp.has_next_page,
            next_page: resp.next_page,
            total_files: resp.total_files,
        }
    }
}

/// `Jan 5, 2024`. Rendered in UTC so the same record always yields the same label.
pub fn format_shared_on(shared_at: &str) -> String {
    match DateTime::<FixedOffset>::parse_from_rfc3339(shared_at.trim()) {
        Ok(ts) => ts.with_timezone(&Utc).format("%b %-d, %Y").to_string(),
        Err(_) => INVALID_DATE.to_string(),
    }
}
