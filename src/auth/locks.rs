use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-subject async locks. Entries exist only while someone holds or
/// waits for the subject's lock.
#[derive(Default)]
pub struct SubjectLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

pub struct SubjectGuard<'a> {
    owner: &'a SubjectLocks,
    subject: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl SubjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, subject: &str) -> SubjectGuard<'_> {
        let lock = self
            .locks
            .lock()
            .entry(subject.to_string())
            .or_default()
            .clone();
        let guard = lock.lock_owned().await;

        SubjectGuard {
            owner: self,
            subject: subject.to_string(),
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().len()
    }
}

impl Drop for SubjectGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();

        let mut locks = self.owner.locks.lock();
        // Waiters clone the Arc under this map lock, so a count of one means
        // nobody else is interested in this subject.
        if locks
            .get(&self.subject)
            .is_some_and(|l| Arc::strong_count(l) == 1)
        {
            locks.remove(&self.subject);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn entries_are_dropped_after_release() {
        let locks = SubjectLocks::new();
        {
            let _a = locks.lock("a@x.com").await;
            let _b = locks.lock("b@x.com").await;
            assert_eq!(locks.len(), 2);
        }
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn same_subject_is_serialised() {
        let locks = Arc::new(SubjectLocks::new());
        let order = Arc::new(Mutex::new(Vec::new()));

        let first = locks.lock("a@x.com").await;

        let task = {
            let locks = locks.clone();
            let order = order.clone();
            tokio::spawn(async move {
                let _g = locks.lock("a@x.com").await;
                order.lock().push("second");
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        order.lock().push("first");
        drop(first);

        task.await.unwrap();
        assert_eq!(*order.lock(), vec!["first", "second"]);
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn different_subjects_do_not_block() {
        let locks = SubjectLocks::new();
        let _a = locks.lock("a@x.com").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.lock("b@x.com")).await;
        assert!(b.is_ok());
    }
}
