/// Base URL of the object store that holds uploaded reports.
///
/// The files endpoint returns object keys; the UI needs fetchable URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageDomain {
    base: String,
}

impl StorageDomain {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim().trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Absolute URL for a storage key. Keys that are already absolute are returned untouched.
    pub fn absolute_url(&self, key: &str) -> String {
        let key = key.trim();
        if is_absolute(key) || (!self.base.is_empty() && key.starts_with(&self.base)) {
            return key.to_string();
        }
        format!("{}/{}", self.base, key.trim_start_matches('/'))
    }
}

fn is_absolute(key: &str) -> bool {
    key.starts_with("https://") || key.starts_with("http://")
}
