use serde::{Deserialize, Serialize};

// ============================================================================
// Paging
// ============================================================================

/// One slice request against a remote result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSpec {
    pub page_size: u32,
    pub start_index: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_ascending: Option<bool>,
}

impl PageSpec {
    pub fn new(page_size: u32, start_index: u64) -> Self {
        Self {
            page_size,
            start_index,
            sort_field: None,
            sort_ascending: None,
        }
    }

    pub fn sorted_by(mut self, field: &str, ascending: bool) -> Self {
        self.sort_field = Some(field.to_string());
        self.sort_ascending = Some(ascending);
        self
    }
}

/// Walks a result set in fixed-size steps from offset zero. Owned by the
/// search routine that drives it.
#[derive(Debug, Clone)]
pub struct PageCursor {
    page: PageSpec,
    total: u64,
    fetched_pages: u64,
}

impl PageCursor {
    pub fn new(page_size: u32, total: u64) -> Self {
        Self {
            page: PageSpec::new(page_size.max(1), 0),
            total,
            fetched_pages: 0,
        }
    }

    pub fn sorted_by(mut self, field: &str, ascending: bool) -> Self {
        self.page = self.page.sorted_by(field, ascending);
        self
    }

    pub fn page_size(&self) -> u32 {
        self.page.page_size
    }

    pub fn max_pages(&self) -> u64 {
        self.total.div_ceil(u64::from(self.page.page_size))
    }

    /// Returns the next page to fetch, or `None` once the whole result set
    /// has been covered.
    pub fn next_page(&mut self) -> Option<PageSpec> {
        if self.page.start_index >= self.total || self.fetched_pages >= self.max_pages() {
            return None;
        }
        let page = self.page.clone();
        self.page.start_index += u64::from(self.page.page_size);
        self.fetched_pages += 1;
        Some(page)
    }

    /// Stops the walk early, e.g. after a short or empty page.
    pub fn finish(&mut self) {
        self.page.start_index = self.total;
    }
}

// ============================================================================
// Filters
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFilterSpec {
    pub name_pattern: String,
}

impl UserFilterSpec {
    pub fn new(name_pattern: impl Into<String>) -> Self {
        Self {
            name_pattern: name_pattern.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupFilterSpec {
    pub name_pattern: String,
}

impl GroupFilterSpec {
    pub fn new(name_pattern: impl Into<String>) -> Self {
        Self {
            name_pattern: name_pattern.into(),
        }
    }
}
