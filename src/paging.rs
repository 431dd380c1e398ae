/// Forward-only cursor pager with a hard page ceiling.
///
/// Upstreams hand back an opaque cursor per page and an empty cursor at
/// the end. A buggy or adversarial upstream that keeps returning cursors
/// must not pin a cycle, so the pager also stops at `max_pages` no matter
/// what the upstream says.
#[derive(Debug)]
pub struct CursorPager {
    max_pages: usize,
    pages_fetched: usize,
    cursor: Option<String>,
    exhausted: bool,
}

impl CursorPager {
    pub fn new(max_pages: usize) -> Self {
        Self {
            max_pages,
            pages_fetched: 0,
            cursor: None,
            exhausted: false,
        }
    }

    /// Cursor to send with the next request. None on the first page.
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn should_fetch(&self) -> bool {
        !self.exhausted && self.pages_fetched < self.max_pages
    }

    /// Record a fetched page. An absent or empty next-cursor ends paging.
    pub fn record_page(&mut self, next_cursor: Option<String>) {
        self.pages_fetched += 1;
        match next_cursor {
            Some(c) if !c.is_empty() => self.cursor = Some(c),
            _ => {
                self.cursor = None;
                self.exhausted = true;
            }
        }
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// True when paging stopped because of the ceiling, not the upstream.
    pub fn hit_ceiling(&self) -> bool {
        !self.exhausted && self.pages_fetched >= self.max_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_has_no_cursor() {
        let pager = CursorPager::new(10);
        assert!(pager.should_fetch());
        assert_eq!(pager.cursor(), None);
    }

    #[test]
    fn empty_cursor_ends_paging() {
        let mut pager = CursorPager::new(10);
        pager.record_page(Some("abc".to_string()));
        assert_eq!(pager.cursor(), Some("abc"));
        assert!(pager.should_fetch());

        pager.record_page(Some(String::new()));
        assert!(!pager.should_fetch());
        assert!(!pager.hit_ceiling());
        assert_eq!(pager.pages_fetched(), 2);
    }

    #[test]
    fn ceiling_stops_a_cursor_that_never_ends() {
        let mut pager = CursorPager::new(3);
        let mut pages = 0;
        while pager.should_fetch() {
            pager.record_page(Some(format!("cursor-{pages}")));
            pages += 1;
        }
        assert_eq!(pages, 3);
        assert!(pager.hit_ceiling());
    }
}
