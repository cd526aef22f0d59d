//! Client-side window over a list of materialized records.
//!
//! The window is UI state: several windows can look at the same store (one per
//! scroll container), so it lives outside of the store.

use crate::config::StoreKind;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaginationMode {
    /// The window grows: "show more" keeps what was already shown.
    #[default]
    Infinite,
    /// The window slides: one page at a time.
    Paged,
}

/// How a new source relates to the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowChange {
    /// Same prefix, same or greater length: the window is left alone.
    Append,
    /// Anything else: the window snaps back to the first page.
    Replace,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListWindow<K = usize> {
    displayed_start: usize,
    displayed_end: Option<usize>,
    initial_page_size: Option<usize>,
    per_page: Option<usize>,
    mode: PaginationMode,
    last_keys: Vec<K>,
}

impl<K> Default for ListWindow<K> {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl<K> ListWindow<K> {
    /// A window showing `initial_page_size` records and moving by `per_page`.
    pub fn new(initial_page_size: Option<usize>, per_page: Option<usize>, mode: PaginationMode) -> Self {
        Self {
            displayed_start: 0,
            displayed_end: initial_page_size,
            initial_page_size,
            per_page,
            mode,
            last_keys: Vec::new(),
        }
    }

    /// A window that always shows everything.
    pub fn unbounded() -> Self {
        Self::new(None, None, PaginationMode::Infinite)
    }

    pub fn paged(per_page: usize) -> Self {
        Self::new(Some(per_page), Some(per_page), PaginationMode::Paged)
    }

    pub fn infinite(per_page: usize) -> Self {
        Self::new(Some(per_page), Some(per_page), PaginationMode::Infinite)
    }

    pub fn displayed_start(&self) -> usize {
        self.displayed_start
    }

    pub fn displayed_end(&self) -> Option<usize> {
        self.displayed_end
    }

    pub fn per_page(&self) -> Option<usize> {
        self.per_page
    }

    pub fn mode(&self) -> PaginationMode {
        self.mode
    }

    /// The slice of `source` currently in the window.
    pub fn displayed<'a, R>(&self, source: &'a [R]) -> &'a [R] {
        let start = self.displayed_start.min(source.len());
        let end = self.displayed_end.unwrap_or(source.len()).min(source.len()).max(start);
        &source[start..end]
    }

    pub fn has_more_before(&self) -> bool {
        self.displayed_start > 0
    }

    pub fn has_more_after(&self, source_len: usize) -> bool {
        matches!(self.displayed_end, Some(end) if end < source_len)
    }

    /// Whether the next "show more" should fetch from the server: only once the
    /// window is within one page of the end of the materialized records.
    pub fn has_more_to_load(&self, kind: StoreKind, current_count: usize, total_count: usize) -> bool {
        if kind != StoreKind::Server || total_count <= current_count {
            return false;
        }
        match (self.displayed_end, self.per_page) {
            (Some(end), Some(per_page)) => current_count.saturating_sub(end) < per_page,
            _ => true,
        }
    }

    /// Back to the first page.
    pub fn reset(&mut self) {
        self.displayed_start = 0;
        self.displayed_end = self.initial_page_size;
    }

    pub fn handle_first(&mut self) {
        self.reset();
    }

    pub fn handle_previous(&mut self) {
        let (Some(per_page), Some(end)) = (self.per_page, self.displayed_end) else {
            return;
        };
        match self.mode {
            PaginationMode::Paged => {
                self.displayed_start = self.displayed_start.saturating_sub(per_page);
                self.displayed_end = Some(self.displayed_start + per_page);
            }
            PaginationMode::Infinite => {
                let floor = self.initial_page_size.unwrap_or(per_page);
                self.displayed_end = Some(end.saturating_sub(per_page).max(floor));
            }
        }
    }

    /// Jumps to the end of the source. Server stores cannot jump: the end of a
    /// lazily fetched collection is not known.
    pub fn handle_last(&mut self, source_len: usize, kind: StoreKind) {
        if kind == StoreKind::Server {
            return;
        }
        let Some(per_page) = self.per_page else {
            return;
        };
        if source_len == 0 {
            return;
        }
        match self.mode {
            PaginationMode::Paged => {
                let start = (source_len.saturating_sub(1) / per_page.max(1)) * per_page;
                self.displayed_start = start.min(source_len);
                self.displayed_end = Some((start + per_page).min(source_len).max(self.displayed_start));
            }
            PaginationMode::Infinite => {
                self.displayed_end = Some(source_len);
            }
        }
    }

    /// Window half of "next": grows the window (infinite) or slides it (paged),
    /// provided there is something past the current end.
    pub fn advance(&mut self, source_len: usize) {
        let (Some(per_page), Some(end)) = (self.per_page, self.displayed_end) else {
            return;
        };
        if end >= source_len {
            return;
        }
        if self.mode == PaginationMode::Paged {
            self.displayed_start += per_page;
        }
        self.displayed_end = Some(end + per_page);
    }
}

impl<K: PartialEq> ListWindow<K> {
    /// Compares a new source with the previous one. An append leaves the window
    /// untouched; a replace resets it to the first page.
    pub fn observe<R>(&mut self, source: &[R], key: impl Fn(&R) -> K) -> WindowChange {
        let keys = source.iter().map(key).collect::<Vec<_>>();
        let shared = self.last_keys.len().min(keys.len());
        let same_prefix = self.last_keys[..shared] == keys[..shared];
        let change = if same_prefix && keys.len() >= self.last_keys.len() {
            WindowChange::Append
        } else {
            WindowChange::Replace
        };
        if change == WindowChange::Replace {
            self.reset();
        }
        self.last_keys = keys;
        change
    }
}

/// Index, inside the displayed records, of the record whose visibility arms the
/// next fetch.
pub fn sentinel_index(visible_count: usize, offset_from_end: usize) -> Option<usize> {
    if visible_count == 0 {
        return None;
    }
    Some(visible_count - 1 - offset_from_end.min(visible_count - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_keeps_window_and_replace_resets_it() {
        let mut window: ListWindow<i32> = ListWindow::new(Some(2), Some(2), PaginationMode::Infinite);
        assert_eq!(window.observe(&[1, 2, 3], |x| *x), WindowChange::Append);
        assert_eq!(window.displayed(&[1, 2, 3]), &[1, 2]);

        let appended = [1, 2, 3, 4, 5];
        assert_eq!(window.observe(&appended, |x| *x), WindowChange::Append);
        assert_eq!((window.displayed_start(), window.displayed_end()), (0, Some(2)));
        assert!(window.has_more_after(appended.len()));

        window.advance(appended.len());
        assert_eq!(window.displayed_end(), Some(4));
        assert_eq!(window.observe(&[9, 9, 9], |x| *x), WindowChange::Replace);
        assert_eq!((window.displayed_start(), window.displayed_end()), (0, Some(2)));
    }

    #[test]
    fn test_shrink_is_a_replace() {
        let mut window: ListWindow<i32> = ListWindow::infinite(2);
        window.observe(&[1, 2, 3], |x| *x);
        window.advance(3);
        assert_eq!(window.observe(&[1, 2], |x| *x), WindowChange::Replace);
        assert_eq!(window.displayed_end(), Some(2));
    }

    #[test]
    fn test_unbounded_window_shows_everything() {
        let window: ListWindow = ListWindow::unbounded();
        assert_eq!(window.displayed(&[1, 2, 3]), &[1, 2, 3]);
        assert!(!window.has_more_before());
        assert!(!window.has_more_after(3));
    }

    #[test]
    fn test_paged_navigation() {
        let source = (0..7).collect::<Vec<_>>();
        let mut window: ListWindow = ListWindow::paged(3);
        window.advance(source.len());
        assert_eq!(window.displayed(&source), &[3, 4, 5]);
        assert!(window.has_more_before());

        window.handle_last(source.len(), StoreKind::Local);
        assert_eq!(window.displayed(&source), &[6]);
        window.advance(source.len());
        assert_eq!(window.displayed(&source), &[6]);

        window.handle_previous();
        assert_eq!(window.displayed(&source), &[3, 4, 5]);
        window.handle_previous();
        window.handle_previous();
        assert_eq!(window.displayed(&source), &[0, 1, 2]);

        window.handle_last(source.len(), StoreKind::Server);
        assert_eq!(window.displayed(&source), &[0, 1, 2]);
    }

    #[test]
    fn test_infinite_navigation() {
        let source = (0..7).collect::<Vec<_>>();
        let mut window: ListWindow = ListWindow::infinite(3);
        window.advance(source.len());
        assert_eq!(window.displayed(&source).len(), 6);
        window.handle_previous();
        assert_eq!(window.displayed(&source).len(), 3);
        window.handle_previous();
        assert_eq!(window.displayed(&source).len(), 3);
        window.handle_last(source.len(), StoreKind::Local);
        assert_eq!(window.displayed(&source).len(), 7);
        window.handle_first();
        assert_eq!(window.displayed(&source).len(), 3);
    }

    #[test]
    fn test_last_on_empty_source_keeps_first_page() {
        let mut window: ListWindow<i32> = ListWindow::paged(3);
        let empty: [i32; 0] = [];
        window.observe(&empty, |x| *x);
        window.handle_last(0, StoreKind::Local);
        assert_eq!((window.displayed_start(), window.displayed_end()), (0, Some(3)));

        let source = [1, 2, 3, 4];
        assert_eq!(window.observe(&source, |x| *x), WindowChange::Append);
        assert_eq!(window.displayed(&source), &[1, 2, 3]);
    }

    #[test]
    fn test_has_more_to_load() {
        let window: ListWindow = ListWindow::infinite(10);
        // 50 materialized, 10 shown: plenty left locally
        assert!(!window.has_more_to_load(StoreKind::Server, 50, 200));
        // within one page of the edge
        assert!(window.has_more_to_load(StoreKind::Server, 15, 200));
        // everything fetched
        assert!(!window.has_more_to_load(StoreKind::Server, 15, 15));
        assert!(!window.has_more_to_load(StoreKind::Local, 15, 200));
        assert!(ListWindow::<usize>::unbounded().has_more_to_load(StoreKind::Server, 50, 200));
    }

    #[test]
    fn test_sentinel_index() {
        assert_eq!(sentinel_index(0, 3), None);
        assert_eq!(sentinel_index(10, 3), Some(6));
        assert_eq!(sentinel_index(2, 5), Some(0));
        assert_eq!(sentinel_index(4, 0), Some(3));
    }
}
