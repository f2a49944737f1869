//! Page cursor for draining one day of stories
//!
//! The listing API has no continuation token. A day is finished when a page
//! comes back shorter than the requested page size. A hard page ceiling
//! bounds the loop even if the source keeps returning full pages.

use crate::fetcher::PageRequest;
use tracing::{debug, warn};

/// Default number of stories per page
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Maximum number of pages requested for a single day
pub const MAX_PAGES: u32 = 1_000;

/// What to do after a page has been consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// The page was full; request the next one
    Continue,
    /// The page was short; the day is drained
    EndOfData,
    /// The page ceiling was hit while pages were still full
    PageCapReached,
}

/// Tracks position within one day's pages
#[derive(Debug, Clone)]
pub struct PageCursor {
    template: PageRequest,
    next_page: u32,
    max_pages: u32,
    items_seen: u64,
    finished: bool,
}

impl PageCursor {
    /// Start a cursor at page 0 of `template`'s day.
    pub fn new(template: PageRequest, max_pages: u32) -> Self {
        Self {
            template: template.with_page(0),
            next_page: 0,
            max_pages,
            items_seen: 0,
            finished: max_pages == 0,
        }
    }

    /// Request for the next page, or `None` once the day is finished.
    pub fn next_request(&self) -> Option<PageRequest> {
        if self.finished {
            return None;
        }
        Some(self.template.with_page(self.next_page))
    }

    /// Record that the current page returned `len` stories.
    pub fn advance(&mut self, len: usize) -> PageOutcome {
        let page = self.next_page;
        self.items_seen += len as u64;
        self.next_page += 1;

        if len < self.template.page_size as usize {
            debug!(
                date = %self.template.date,
                page = page,
                len = len,
                total = self.items_seen,
                "Short page received, day complete"
            );
            self.finished = true;
            return PageOutcome::EndOfData;
        }

        if self.next_page >= self.max_pages {
            warn!(
                date = %self.template.date,
                max_pages = self.max_pages,
                total = self.items_seen,
                "Page ceiling reached with full pages still arriving"
            );
            self.finished = true;
            return PageOutcome::PageCapReached;
        }

        PageOutcome::Continue
    }

    /// Number of pages consumed so far
    pub fn pages_fetched(&self) -> u32 {
        self.next_page
    }

    /// Total stories reported through [`advance`](Self::advance)
    pub fn items_seen(&self) -> u64 {
        self.items_seen
    }

    /// Whether no further request will be issued
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
