//! Rollback Cursor
//!
//! Wraps an event iterator, numbering delivered events and allowing the last
//! one to be handed back once. The traversal engine reads one event ahead to
//! find out whether a closing tag is its own; when it belongs to an ancestor
//! the event is rolled back so the ancestor's traversal sees it again.

/// Iterator adapter with an iteration counter and one-step pushback
#[derive(Debug)]
pub struct RollbackCursor<I: Iterator> {
    inner: I,
    /// Number of events delivered, rollbacks subtracted
    iteration: u64,
    last: Option<I::Item>,
    rolled_back: bool,
}

impl<I> RollbackCursor<I>
where
    I: Iterator,
    I::Item: Clone,
{
    pub fn new(inner: I) -> Self {
        RollbackCursor {
            inner,
            iteration: 0,
            last: None,
            rolled_back: false,
        }
    }

    /// Current value of the iteration counter
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Hand the last delivered event back: the next call to `next` returns it
    /// again. Does nothing before the first delivery; a second rollback without
    /// an intervening `next` has no further effect.
    pub fn rollback(&mut self) {
        if self.last.is_none() || self.rolled_back {
            return;
        }
        self.rolled_back = true;
        self.iteration -= 1;
    }

    /// Access the wrapped iterator
    pub fn get_mut(&mut self) -> &mut I {
        &mut self.inner
    }
}

impl<I> Iterator for RollbackCursor<I>
where
    I: Iterator,
    I::Item: Clone,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        if self.rolled_back {
            self.rolled_back = false;
            self.iteration += 1;
            return self.last.clone();
        }
        let item = self.inner.next()?;
        self.iteration += 1;
        self.last = Some(item.clone());
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_iterations() {
        let mut cursor = RollbackCursor::new(["a", "b", "c"].into_iter());
        assert_eq!(cursor.iteration(), 0);
        assert_eq!(cursor.next(), Some("a"));
        assert_eq!(cursor.iteration(), 1);
        assert_eq!(cursor.next(), Some("b"));
        assert_eq!(cursor.iteration(), 2);
    }

    #[test]
    fn test_rollback_replays_last() {
        let mut cursor = RollbackCursor::new(0..5);
        assert_eq!(cursor.next(), Some(0));
        assert_eq!(cursor.next(), Some(1));
        cursor.rollback();
        assert_eq!(cursor.iteration(), 1);
        assert_eq!(cursor.next(), Some(1));
        assert_eq!(cursor.iteration(), 2);
        assert_eq!(cursor.next(), Some(2));
    }

    #[test]
    fn test_rollback_is_single_step() {
        let mut cursor = RollbackCursor::new(0..5);
        cursor.next();
        cursor.next();
        cursor.rollback();
        cursor.rollback();
        assert_eq!(cursor.iteration(), 1);
        assert_eq!(cursor.next(), Some(1));
        assert_eq!(cursor.next(), Some(2));
    }

    #[test]
    fn test_rollback_before_first_is_noop() {
        let mut cursor = RollbackCursor::new(0..3);
        cursor.rollback();
        assert_eq!(cursor.iteration(), 0);
        assert_eq!(cursor.next(), Some(0));
        assert_eq!(cursor.iteration(), 1);
    }

    #[test]
    fn test_rollback_at_end() {
        let mut cursor = RollbackCursor::new(0..1);
        assert_eq!(cursor.next(), Some(0));
        assert_eq!(cursor.next(), None);
        cursor.rollback();
        assert_eq!(cursor.next(), Some(0));
        assert_eq!(cursor.next(), None);
    }
}
