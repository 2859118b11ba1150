//! Session Memory
//!
//! Process-wide map from student to the most recently decoded profile.
//! Only the trend engine reads it. Entries never expire unless a TTL is
//! configured.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use dextora_common::Profile;

#[derive(Debug, Clone)]
struct MemoryEntry {
    profile: Profile,
    updated_at: Instant,
}

/// Keyed store of previous profiles
#[derive(Debug, Default)]
pub struct SessionMemory {
    entries: DashMap<String, MemoryEntry>,
    ttl: Option<Duration>,
}

impl SessionMemory {
    /// Memory that keeps entries for the life of the process
    pub fn new() -> Self {
        Self::default()
    }

    /// Memory whose entries go stale `ttl` after their last update
    pub fn with_ttl(ttl: Option<Duration>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    fn is_live(&self, entry: &MemoryEntry, now: Instant) -> bool {
        match self.ttl {
            Some(ttl) => now.duration_since(entry.updated_at) < ttl,
            None => true,
        }
    }

    /// Previous profile for a student, if still live
    pub fn get(&self, student_id: &str) -> Option<Profile> {
        let now = Instant::now();
        self.entries
            .get(student_id)
            .filter(|e| self.is_live(e, now))
            .map(|e| e.profile.clone())
    }

    /// Store `profile` and return the live profile it replaced, atomically per key
    pub fn replace(&self, student_id: &str, profile: Profile) -> Option<Profile> {
        let now = Instant::now();
        let previous = self.entries.insert(
            student_id.to_string(),
            MemoryEntry {
                profile,
                updated_at: now,
            },
        );
        previous
            .filter(|e| self.is_live(e, now))
            .map(|e| e.profile)
    }

    pub fn remove(&self, student_id: &str) -> Option<Profile> {
        self.entries.remove(student_id).map(|(_, e)| e.profile)
    }

    /// Drop stale entries; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        if self.ttl.is_none() {
            return 0;
        }
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| self.is_live(e, now));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dextora_common::METRIC_COUNT;

    fn profile(value: f64) -> Profile {
        Profile::from_scores([value; METRIC_COUNT])
    }

    #[test]
    fn test_replace_returns_previous() {
        let memory = SessionMemory::new();
        assert!(memory.replace("STU_1", profile(10.0)).is_none());

        let previous = memory.replace("STU_1", profile(20.0)).unwrap();
        assert_eq!(previous.mastery(), 10.0);
        assert_eq!(memory.get("STU_1").unwrap().mastery(), 20.0);
    }

    #[test]
    fn test_students_are_independent() {
        let memory = SessionMemory::new();
        memory.replace("STU_1", profile(10.0));
        assert!(memory.replace("STU_2", profile(30.0)).is_none());
        assert_eq!(memory.len(), 2);
    }

    #[test]
    fn test_no_ttl_never_purges() {
        let memory = SessionMemory::new();
        memory.replace("STU_1", profile(10.0));
        assert_eq!(memory.purge_expired(), 0);
        assert!(memory.get("STU_1").is_some());
    }

    #[test]
    fn test_ttl_hides_and_purges_stale_entries() {
        let memory = SessionMemory::with_ttl(Some(Duration::ZERO));
        memory.replace("STU_1", profile(10.0));

        assert!(memory.get("STU_1").is_none());
        assert!(memory.replace("STU_1", profile(20.0)).is_none());
        assert_eq!(memory.purge_expired(), 1);
        assert!(memory.is_empty());
    }
}
