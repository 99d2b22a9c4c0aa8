//! Single-slot, overwrite-on-publish handoff between workers.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Holds at most one value. Publishing replaces whatever is there and never
/// waits for a reader; readers never wait for a writer longer than the swap.
#[derive(Debug)]
pub struct Mailbox<T> {
    slot: Mutex<Option<T>>,
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    // A panicking holder cannot leave the Option half-written.
    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the content, returning the value that was never read.
    pub fn publish(&self, value: T) -> Option<T> {
        self.lock().replace(value)
    }

    /// Move the content out, leaving the slot empty.
    pub fn take(&self) -> Option<T> {
        self.lock().take()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_none()
    }
}

impl<T: Clone> Mailbox<T> {
    /// Copy of the content, leaving it in place for other readers.
    pub fn latest(&self) -> Option<T> {
        self.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_publish_overwrites() {
        let mailbox = Mailbox::new();
        assert_eq!(mailbox.publish(1), None);
        assert_eq!(mailbox.publish(2), Some(1));
        assert_eq!(mailbox.take(), Some(2));
        assert!(mailbox.is_empty());
        assert_eq!(mailbox.take(), None);
    }

    #[test]
    fn test_latest_does_not_consume() {
        let mailbox = Mailbox::new();
        mailbox.publish("frame".to_string());
        assert_eq!(mailbox.latest().as_deref(), Some("frame"));
        assert_eq!(mailbox.latest().as_deref(), Some("frame"));
        assert!(!mailbox.is_empty());
    }

    #[test]
    fn test_concurrent_publishers_leave_one_value() {
        let mailbox = Arc::new(Mailbox::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let mailbox = Arc::clone(&mailbox);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        mailbox.publish(t * 1000 + i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let last = mailbox.take().unwrap();
        assert_eq!(last % 1000, 99);
        assert!(mailbox.is_empty());
    }
}
