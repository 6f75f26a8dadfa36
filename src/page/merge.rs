use tracing::{debug, trace};

use crate::observer::RangeChange;

/// Pagination state of the loaded-objects collection.
///
/// Page `k` occupies `[k * page_size, k * page_size + len(k))`.
#[derive(Debug)]
pub(crate) struct PageState<T> {
    objects: Vec<T>,

    /// Highest page merged so far, `None` before the first page
    current_page: Option<usize>,

    has_next_page: bool,
}

/// Result of merging one page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Merge {
    pub change: RangeChange,

    /// Items dropped from the end because a reload came back shorter
    pub truncated: Option<RangeChange>,

    pub replaced: bool,

    /// First index of the merged items
    pub start: usize,
    pub visible: usize,
}

impl<T> PageState<T> {
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            current_page: None,
            has_next_page: true,
        }
    }

    pub fn objects(&self) -> &[T] {
        &self.objects
    }

    pub fn current_page(&self) -> Option<usize> {
        self.current_page
    }

    pub fn has_next_page(&self) -> bool {
        self.has_next_page
    }

    /// Page requested by the next sequential load
    pub fn next_page(&self) -> usize {
        self.current_page.map_or(0, |page| page + 1)
    }

    /// Whether `page` has been merged before
    pub fn is_loaded(&self, page: usize) -> bool {
        self.current_page.is_some_and(|current| page <= current)
    }

    /// Merge the raw results of a fetch for `page`.
    ///
    /// `results` were fetched with a limit of `page_size + 1`; a surplus item
    /// means more pages exist and is dropped. A page that was merged before
    /// replaces its slot. If such a reload of an earlier page comes back
    /// short, the pages after it no longer exist: they are dropped and the
    /// cursor moves back to `page`.
    pub fn apply_page(&mut self, page: usize, mut results: Vec<T>, page_size: usize) -> Merge {
        let has_more = results.len() > page_size;
        results.truncate(page_size);

        if self.is_loaded(page) {
            self.replace_page(page, results, page_size, has_more)
        } else {
            self.current_page = Some(page);
            self.has_next_page = has_more;
            self.append_page(page, results, page_size)
        }
    }

    fn replace_page(
        &mut self,
        page: usize,
        results: Vec<T>,
        page_size: usize,
        has_more: bool,
    ) -> Merge {
        let len = self.objects.len();
        let start = len.min(page_size * page);
        let visible = results.len();

        let end = len.min(start + page_size);
        self.objects.splice(start..end, results);

        if self.current_page == Some(page) || visible < page_size {
            self.current_page = Some(page);
            self.has_next_page = has_more;
            self.objects.truncate(start + visible);
        }

        let truncated = (self.objects.len() < len).then(|| {
            let kept = self.objects.len();
            debug!(page, kept, removed = len - kept, "reload came back short, dropped tail");
            RangeChange::Removed {
                start: kept,
                count: len - kept,
            }
        });

        trace!(page, start, visible, "replaced page");
        Merge {
            change: RangeChange::Changed {
                start,
                count: visible,
            },
            truncated,
            replaced: true,
            start,
            visible,
        }
    }

    fn append_page(&mut self, page: usize, results: Vec<T>, page_size: usize) -> Merge {
        let start = page_size * page;
        let len = self.objects.len();
        let visible = results.len();

        if len != start {
            debug!(page, start, len, "page arrived out of order, appending at end");
        }
        self.objects.extend(results);
        trace!(page, start = len, visible, "inserted page");
        Merge {
            change: RangeChange::Inserted {
                start: len,
                count: visible,
            },
            truncated: None,
            replaced: false,
            start: len,
            visible,
        }
    }
}
