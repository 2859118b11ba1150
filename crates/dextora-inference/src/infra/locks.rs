//! Per-student async locks
//!
//! Serializes the read-modify-write cycle of one student across every
//! connection while leaving other students untouched.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct StudentLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl StudentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `student_id`
    pub async fn acquire(&self, student_id: &str) -> OwnedMutexGuard<()> {
        // clone the Arc out so the shard guard is released before awaiting
        let lock = self
            .locks
            .entry(student_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Drop locks nobody holds or waits on
    pub fn release_idle(&self) -> usize {
        let before = self.locks.len();
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before.saturating_sub(self.locks.len())
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_student_is_serialized() {
        let locks = StudentLocks::new();
        let _held = locks.acquire("STU_1").await;

        let second = tokio::time::timeout(Duration::from_millis(20), locks.acquire("STU_1")).await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn test_different_students_do_not_block() {
        let locks = StudentLocks::new();
        let _held = locks.acquire("STU_1").await;

        let other = tokio::time::timeout(Duration::from_millis(20), locks.acquire("STU_2")).await;
        assert!(other.is_ok());
    }

    #[tokio::test]
    async fn test_release_idle_keeps_held_locks() {
        let locks = StudentLocks::new();
        let held = locks.acquire("STU_1").await;
        drop(locks.acquire("STU_2").await);

        assert_eq!(locks.release_idle(), 1);
        assert_eq!(locks.len(), 1);

        drop(held);
        assert_eq!(locks.release_idle(), 1);
        assert!(locks.is_empty());
    }
}
