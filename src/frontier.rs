//! Shared crawl frontier: the admission set and the pending-URL queue.
//!
//! Two independently locked structures, matching how they are used: workers
//! hold the set lock only for the admission check and the queue lock only
//! for the enqueue, so link extraction in one worker never serializes
//! against dequeueing in the loop.

use std::collections::{HashSet, VecDeque};

use parking_lot::Mutex;

use crate::urls::PageUrl;

/// Set of URL hashes that have ever been admitted to the queue.
///
/// Admission is the dedup point of the whole crawler: a hash enters this set
/// exactly once, and only the caller that inserted it may enqueue the URL.
#[derive(Debug, Default)]
pub struct VisitedSet {
    hashes: Mutex<HashSet<u32>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to admit a hash. Returns true exactly once per hash, handing the
    /// caller the duty to enqueue the URL; every later call returns false.
    pub fn try_admit(&self, hash: u32) -> bool {
        self.hashes.lock().insert(hash)
    }

    pub fn contains(&self, hash: u32) -> bool {
        self.hashes.lock().contains(&hash)
    }

    pub fn len(&self) -> usize {
        self.hashes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// FIFO of admitted URLs waiting for a connection.
#[derive(Debug, Default)]
pub struct CrawlQueue {
    urls: Mutex<VecDeque<PageUrl>>,
}

impl CrawlQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, url: PageUrl) {
        self.urls.lock().push_back(url);
    }

    /// Take the oldest queued URL. `None` means no work right now, not an
    /// error; more URLs may arrive from workers still running.
    pub fn pop_front(&self) -> Option<PageUrl> {
        self.urls.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.urls.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn page(path: &str) -> PageUrl {
        PageUrl::parse(&format!("http://test.local{path}")).unwrap()
    }

    #[test]
    fn test_try_admit_returns_true_exactly_once() {
        let visited = VisitedSet::new();
        assert!(visited.try_admit(42));
        assert!(!visited.try_admit(42));
        assert!(visited.try_admit(43));
        assert_eq!(visited.len(), 2);
        assert!(visited.contains(42));
        assert!(!visited.contains(99));
    }

    #[test]
    fn test_concurrent_admission_admits_one_winner() {
        let visited = Arc::new(VisitedSet::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let visited = Arc::clone(&visited);
                thread::spawn(move || visited.try_admit(7))
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join())
            .filter(|result| matches!(result, Ok(true)))
            .count();
        assert_eq!(wins, 1);
        assert_eq!(visited.len(), 1);
    }

    #[test]
    fn test_queue_is_fifo() {
        let queue = CrawlQueue::new();
        queue.push(page("/first"));
        queue.push(page("/second"));
        queue.push(page("/third"));

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.pop_front().unwrap().file(), "/first");
        assert_eq!(queue.pop_front().unwrap().file(), "/second");
        assert_eq!(queue.pop_front().unwrap().file(), "/third");
        assert!(queue.pop_front().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_admit_then_enqueue_never_duplicates() {
        let visited = Arc::new(VisitedSet::new());
        let queue = Arc::new(CrawlQueue::new());
        let url = page("/contested");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let visited = Arc::clone(&visited);
                let queue = Arc::clone(&queue);
                let url = url.clone();
                thread::spawn(move || {
                    if visited.try_admit(url.hash()) {
                        queue.push(url);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(queue.len(), 1);
        assert_eq!(visited.len(), 1);
    }
}
